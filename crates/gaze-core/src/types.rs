//! Plain value types shared across the pipeline.

use serde::{Deserialize, Serialize};

use crate::{Pt2, Real};

/// Normalized gaze direction for one frame, both axes in `[0, 1]`.
///
/// `(0, 0)` is looking toward the top-left of the screen, `(1, 1)` toward the
/// bottom-right.
pub type GazeSample = Pt2;

/// A position on screen, in pixels.
pub type ScreenPoint = Pt2;

/// Which eye a measurement or command refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Which eye(s) contribute to a gaze estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeSelector {
    Left,
    Right,
    #[default]
    Both,
}

impl From<Eye> for EyeSelector {
    fn from(eye: Eye) -> Self {
        match eye {
            Eye::Left => Self::Left,
            Eye::Right => Self::Right,
        }
    }
}

/// Screen size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenGeometry {
    pub width: Real,
    pub height: Real,
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

impl ScreenGeometry {
    pub fn new(width: Real, height: Real) -> Self {
        Self { width, height }
    }

    /// Unscaled linear mapping `screen = gaze * (width, height)`.
    pub fn scale(&self, gaze: &GazeSample) -> ScreenPoint {
        ScreenPoint::new(gaze.x * self.width, gaze.y * self.height)
    }

    /// Inverse of [`scale`](Self::scale): pixels to `[0, 1]` screen fractions.
    pub fn normalize(&self, p: &ScreenPoint) -> Pt2 {
        Pt2::new(p.x / self.width, p.y / self.height)
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    /// Clamp to the addressable pixel range `[0, w-1] x [0, h-1]`.
    pub fn clamp(&self, p: &ScreenPoint) -> ScreenPoint {
        let max_x = (self.width - 1.0).max(0.0);
        let max_y = (self.height - 1.0).max(0.0);
        ScreenPoint::new(p.x.clamp(0.0, max_x), p.y.clamp(0.0, max_y))
    }
}

/// One calibration pairing of an averaged gaze sample with its on-screen target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub gaze: GazeSample,
    pub screen: ScreenPoint,
}

impl Correspondence {
    pub fn new(gaze: GazeSample, screen: ScreenPoint) -> Self {
        Self { gaze, screen }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_pointer_on_screen() {
        let screen = ScreenGeometry::new(800.0, 600.0);
        let p = screen.clamp(&ScreenPoint::new(-10.0, 900.0));
        assert_eq!(p, ScreenPoint::new(0.0, 599.0));
    }

    #[test]
    fn scale_and_normalize_are_inverse() {
        let screen = ScreenGeometry::default();
        let g = GazeSample::new(0.3, 0.8);
        let back = screen.normalize(&screen.scale(&g));
        assert!((back - g).norm() < 1e-12);
    }

    #[test]
    fn eye_selector_serializes_snake_case() {
        let json = serde_json::to_string(&EyeSelector::Both).unwrap();
        assert_eq!(json, "\"both\"");
        assert_eq!(EyeSelector::from(Eye::Right), EyeSelector::Right);
        assert_eq!(Eye::Left.other(), Eye::Right);
    }
}
