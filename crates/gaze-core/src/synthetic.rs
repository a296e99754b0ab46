//! Deterministic synthetic face landmarks.
//!
//! Builds landmark sets with a prescribed iris position and lid opening for
//! each eye, laid out according to a [`FaceLayout`]. Used by tests across the
//! workspace and by the trace replay tool.

use crate::{EyeLayout, FaceLayout, Pt2, Real, EYE_RING_LEN};

/// Pose of a single synthetic eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyePose {
    /// Iris position along the corner axis, 0 at the first (image-left) corner, 1 at the second.
    pub horizontal: Real,
    /// Iris position between the lids, 0 at the upper lid, 1 at the lower.
    pub vertical: Real,
    /// Eye-aspect-ratio the lids are placed to produce.
    pub aspect_ratio: Real,
}

impl EyePose {
    pub const OPEN_EAR: Real = 0.3;
    pub const CLOSED_EAR: Real = 0.1;

    pub fn open(horizontal: Real, vertical: Real) -> Self {
        Self {
            horizontal,
            vertical,
            aspect_ratio: Self::OPEN_EAR,
        }
    }

    pub fn centered() -> Self {
        Self::open(0.5, 0.5)
    }

    pub fn closed() -> Self {
        Self {
            aspect_ratio: Self::CLOSED_EAR,
            ..Self::centered()
        }
    }
}

/// Image-space placement of a synthetic eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyePlacement {
    pub center: Pt2,
    pub half_width: Real,
}

impl EyePlacement {
    pub fn left() -> Self {
        Self {
            center: Pt2::new(0.6, 0.4),
            half_width: 0.04,
        }
    }

    pub fn right() -> Self {
        Self {
            center: Pt2::new(0.4, 0.4),
            half_width: 0.04,
        }
    }
}

/// Write one eye into `landmarks`.
///
/// The first corner sits at `center - half_width` on the x axis and the lids
/// are straight lines at `center.y -/+ half_height`, where
/// `half_height = aspect_ratio * half_width`. The vertical iris position is
/// exact when `horizontal == 0.5`.
pub fn place_eye(landmarks: &mut [Pt2], layout: &EyeLayout, at: &EyePlacement, pose: &EyePose) {
    let w = at.half_width;
    let h = pose.aspect_ratio * w;
    let x0 = at.center.x - w;
    let top = at.center.y - h;
    let bottom = at.center.y + h;

    for (k, &idx) in layout.ring.iter().enumerate() {
        landmarks[idx] = match k {
            0 => Pt2::new(x0, at.center.y),
            8 => Pt2::new(x0 + 2.0 * w, at.center.y),
            1..=7 => Pt2::new(x0 + 2.0 * w * k as Real / 8.0, bottom),
            _ => Pt2::new(
                x0 + 2.0 * w * (EYE_RING_LEN - k) as Real / 8.0,
                top,
            ),
        };
    }

    let iris = Pt2::new(x0 + 2.0 * w * pose.horizontal, top + 2.0 * h * pose.vertical);
    let r = 0.3 * w;
    let ring = [
        Pt2::new(iris.x + r, iris.y),
        Pt2::new(iris.x, iris.y - r),
        Pt2::new(iris.x - r, iris.y),
        Pt2::new(iris.x, iris.y + r),
    ];
    for (&idx, p) in layout.iris.iter().zip(ring) {
        landmarks[idx] = p;
    }
}

/// Full landmark set with both eyes posed; other landmarks sit at the image center.
pub fn face_landmarks(layout: &FaceLayout, left: &EyePose, right: &EyePose) -> Vec<Pt2> {
    let len = layout.landmark_count.max(layout.required_len());
    let mut landmarks = vec![Pt2::new(0.5, 0.5); len];
    place_eye(&mut landmarks, &layout.left, &EyePlacement::left(), left);
    place_eye(&mut landmarks, &layout.right, &EyePlacement::right(), right);
    landmarks
}

/// Both eyes open and looking at the same normalized position.
pub fn looking_at(layout: &FaceLayout, horizontal: Real, vertical: Real) -> Vec<Pt2> {
    let pose = EyePose::open(horizontal, vertical);
    face_landmarks(layout, &pose, &pose)
}
