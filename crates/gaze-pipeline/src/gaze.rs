//! Iris position to normalized gaze.
//!
//! Each eye's iris center is located relative to that eye's rigid landmarks:
//! horizontally as a fraction along the image-left to image-right corner axis,
//! vertically
//! as the share of the lid-to-lid span lying above the iris. Both are 0.5 for
//! a centered iris. A gain around 0.5 then stretches the small physical range
//! of iris motion to the full `[0, 1]` range.

use gaze_core::{centroid, Eye, EyeLayout, EyeSelector, FaceLayout, GazeSample, Pt2, Real};
use log::trace;

use crate::config::GazeConfig;

const NEUTRAL: Real = 0.5;

/// Raw (pre-gain) iris position of one eye.
///
/// Falls back to 0.5 on any axis whose reference distance is zero.
pub fn iris_position(landmarks: &[Pt2], eye: &EyeLayout) -> Pt2 {
    let iris = centroid(&eye.iris_points(landmarks)).unwrap_or_else(Pt2::origin);
    let first = landmarks[eye.first_corner()];
    let second = landmarks[eye.second_corner()];

    let axis = second - first;
    let axis_len2 = axis.norm_squared();
    let horizontal = if axis_len2 > 0.0 {
        (iris - first).dot(&axis) / axis_len2
    } else {
        trace!("degenerate eye corners, horizontal gaze held at center");
        NEUTRAL
    };

    let to_top = (iris - landmarks[eye.upper_lid()]).norm();
    let to_bottom = (iris - landmarks[eye.lower_lid()]).norm();
    let span = to_top + to_bottom;
    let vertical = if span > 0.0 {
        to_top / span
    } else {
        trace!("degenerate lid span, vertical gaze held at center");
        NEUTRAL
    };

    Pt2::new(horizontal, vertical)
}

fn apply_gain(raw: Real, gain: Real) -> Real {
    let v = NEUTRAL + (raw - NEUTRAL) * gain;
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        NEUTRAL
    }
}

/// Stateless converter from a frame's landmarks to a [`GazeSample`].
#[derive(Debug, Clone)]
pub struct GazeNormalizer {
    layout: FaceLayout,
    sensitivity: Real,
}

impl GazeNormalizer {
    pub fn new(layout: FaceLayout, sensitivity: Real) -> Self {
        Self {
            layout,
            sensitivity,
        }
    }

    pub fn from_config(config: &GazeConfig) -> Self {
        Self::new(config.layout, config.sensitivity)
    }

    pub fn layout(&self) -> &FaceLayout {
        &self.layout
    }

    /// Normalized gaze in `[0, 1]²` from the selected eye(s).
    ///
    /// `landmarks` must satisfy [`FaceLayout::accepts`].
    pub fn normalize(&self, landmarks: &[Pt2], eyes: EyeSelector) -> GazeSample {
        let raw = match eyes {
            EyeSelector::Left => self.raw(landmarks, Eye::Left),
            EyeSelector::Right => self.raw(landmarks, Eye::Right),
            EyeSelector::Both => {
                let l = self.raw(landmarks, Eye::Left);
                let r = self.raw(landmarks, Eye::Right);
                Pt2::from((l.coords + r.coords) / 2.0)
            }
        };
        GazeSample::new(
            apply_gain(raw.x, self.sensitivity),
            apply_gain(raw.y, self.sensitivity),
        )
    }

    fn raw(&self, landmarks: &[Pt2], eye: Eye) -> Pt2 {
        iris_position(landmarks, self.layout.eye(eye))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaze_core::synthetic::{face_landmarks, looking_at, EyePose};

    fn normalizer(sensitivity: Real) -> GazeNormalizer {
        GazeNormalizer::new(FaceLayout::default(), sensitivity)
    }

    #[test]
    fn centered_iris_maps_to_center() {
        let lm = looking_at(&FaceLayout::default(), 0.5, 0.5);
        let g = normalizer(2.5).normalize(&lm, EyeSelector::Both);
        assert!((g - GazeSample::new(0.5, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn unit_gain_reports_raw_position() {
        let lm = looking_at(&FaceLayout::default(), 0.3, 0.5);
        let g = normalizer(1.0).normalize(&lm, EyeSelector::Both);
        assert!((g.x - 0.3).abs() < 1e-12);
        assert!((g.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn vertical_axis_increases_downward() {
        let lm = looking_at(&FaceLayout::default(), 0.5, 0.6);
        let g = normalizer(2.0).normalize(&lm, EyeSelector::Both);
        assert!((g.y - 0.7).abs() < 1e-12);
    }

    #[test]
    fn gain_saturates_at_the_edges() {
        let layout = FaceLayout::default();
        let n = normalizer(2.5);

        let right = n.normalize(&looking_at(&layout, 0.95, 0.5), EyeSelector::Both);
        assert_eq!(right.x, 1.0);
        assert!((right.y - 0.5).abs() < 1e-12);

        let up = n.normalize(&looking_at(&layout, 0.5, 0.02), EyeSelector::Both);
        assert_eq!(up.y, 0.0);
    }

    #[test]
    fn output_stays_in_unit_square_for_extreme_inputs() {
        let layout = FaceLayout::default();
        for &(h, v) in &[(-3.0, 0.5), (4.0, 0.5), (0.5, -2.0), (0.5, 5.0), (10.0, -10.0)] {
            let lm = looking_at(&layout, h, v);
            for gain in [0.5, 1.0, 2.5, 40.0] {
                let g = normalizer(gain).normalize(&lm, EyeSelector::Both);
                assert!((0.0..=1.0).contains(&g.x), "x {} for {:?}", g.x, (h, v));
                assert!((0.0..=1.0).contains(&g.y), "y {} for {:?}", g.y, (h, v));
            }
        }
    }

    #[test]
    fn eye_selector_picks_one_eye() {
        let layout = FaceLayout::default();
        let lm = face_landmarks(&layout, &EyePose::open(0.2, 0.5), &EyePose::open(0.6, 0.5));
        let n = normalizer(1.0);
        assert!((n.normalize(&lm, EyeSelector::Left).x - 0.2).abs() < 1e-12);
        assert!((n.normalize(&lm, EyeSelector::Right).x - 0.6).abs() < 1e-12);
        assert!((n.normalize(&lm, EyeSelector::Both).x - 0.4).abs() < 1e-12);
    }

    #[test]
    fn degenerate_eye_falls_back_to_center() {
        let layout = FaceLayout::default();
        let mut lm = looking_at(&layout, 0.5, 0.5);
        for eye in [&layout.left, &layout.right] {
            for &i in eye.ring.iter().chain(eye.iris.iter()) {
                lm[i] = Pt2::new(0.5, 0.4);
            }
        }
        let g = normalizer(2.5).normalize(&lm, EyeSelector::Both);
        assert_eq!(g, GazeSample::new(0.5, 0.5));
    }
}
