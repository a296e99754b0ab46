//! Eye openness from lid geometry.

use gaze_core::{Eye, EyeLayout, FaceLayout, Pt2, Real};
use log::trace;

/// Standard eye-aspect-ratio: the two lid-to-lid distances over twice the
/// corner-to-corner distance.
///
/// Returns 0 when the corners coincide.
pub fn eye_aspect_ratio(landmarks: &[Pt2], eye: &EyeLayout) -> Real {
    let width = (landmarks[eye.first_corner()] - landmarks[eye.second_corner()]).norm();
    if width == 0.0 {
        trace!("degenerate eye width, reporting a closed eye");
        return 0.0;
    }
    let lids: Real = eye
        .lid_pairs()
        .iter()
        .map(|&(lower, upper)| (landmarks[lower] - landmarks[upper]).norm())
        .sum();
    lids / (2.0 * width)
}

/// Per-frame EAR for both eyes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EyeOpenness {
    pub left: Real,
    pub right: Real,
}

#[derive(Debug, Clone)]
pub struct EyelidAnalyzer {
    layout: FaceLayout,
}

impl EyelidAnalyzer {
    pub fn new(layout: FaceLayout) -> Self {
        Self { layout }
    }

    pub fn ear(&self, landmarks: &[Pt2], eye: Eye) -> Real {
        eye_aspect_ratio(landmarks, self.layout.eye(eye))
    }

    pub fn openness(&self, landmarks: &[Pt2]) -> EyeOpenness {
        EyeOpenness {
            left: self.ear(landmarks, Eye::Left),
            right: self.ear(landmarks, Eye::Right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaze_core::synthetic::{face_landmarks, EyePose};

    #[test]
    fn ear_follows_lid_opening() {
        let layout = FaceLayout::default();
        let lm = face_landmarks(&layout, &EyePose::centered(), &EyePose::closed());
        let open = EyelidAnalyzer::new(layout).openness(&lm);
        assert!((open.left - EyePose::OPEN_EAR).abs() < 1e-12);
        assert!((open.right - EyePose::CLOSED_EAR).abs() < 1e-12);
    }

    #[test]
    fn zero_width_eye_reads_as_closed() {
        let layout = FaceLayout::default();
        let mut lm = face_landmarks(&layout, &EyePose::centered(), &EyePose::centered());
        lm[layout.left.second_corner()] = lm[layout.left.first_corner()];
        assert_eq!(eye_aspect_ratio(&lm, &layout.left), 0.0);
    }
}
