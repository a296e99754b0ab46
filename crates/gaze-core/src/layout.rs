//! Landmark index layout for the eye regions of a face mesh.
//!
//! The landmark detector produces a fixed-size, stably numbered point list per
//! frame. Which indices belong to which eye is configuration, not something
//! discovered at runtime.

use serde::{Deserialize, Serialize};

use crate::{Eye, Pt2};

/// Number of points in an eye contour ring.
pub const EYE_RING_LEN: usize = 16;
/// Number of points in an iris ring.
pub const IRIS_RING_LEN: usize = 4;
/// Points produced by the face mesh with iris refinement enabled.
pub const FACE_MESH_LANDMARKS: usize = 478;

/// Indices of one eye's contour and iris landmarks.
///
/// Ring ordering follows the image, not the anatomy: index 0 is the corner
/// with the smaller image x (inner for the left eye, outer for the right),
/// 1..=7 run along the lower lid, 8 is the other corner and 9..=15 run back
/// along the upper lid. Position 4 is the lower-lid midpoint and 12 the
/// upper-lid midpoint. Both eyes share this orientation, so their iris
/// positions can be averaged directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeLayout {
    pub ring: [usize; EYE_RING_LEN],
    pub iris: [usize; IRIS_RING_LEN],
}

impl EyeLayout {
    pub fn face_mesh_left() -> Self {
        Self {
            ring: [
                362, 382, 381, 380, 374, 373, 390, 249, 263, 466, 388, 387, 386, 385, 384, 398,
            ],
            iris: [474, 475, 476, 477],
        }
    }

    pub fn face_mesh_right() -> Self {
        Self {
            ring: [
                33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246,
            ],
            iris: [469, 470, 471, 472],
        }
    }

    /// Image-left corner of the eye.
    pub fn first_corner(&self) -> usize {
        self.ring[0]
    }

    /// Image-right corner of the eye.
    pub fn second_corner(&self) -> usize {
        self.ring[8]
    }

    pub fn upper_lid(&self) -> usize {
        self.ring[12]
    }

    pub fn lower_lid(&self) -> usize {
        self.ring[4]
    }

    /// Lower/upper lid pairs used for the eye-aspect-ratio.
    pub fn lid_pairs(&self) -> [(usize, usize); 2] {
        [(self.ring[1], self.ring[15]), (self.ring[2], self.ring[14])]
    }

    /// Largest landmark index referenced by this eye.
    pub fn max_index(&self) -> usize {
        self.ring
            .iter()
            .chain(self.iris.iter())
            .copied()
            .max()
            .unwrap_or(0)
    }

    pub fn iris_points(&self, landmarks: &[Pt2]) -> [Pt2; IRIS_RING_LEN] {
        self.iris.map(|i| landmarks[i])
    }
}

/// Eye layouts for both eyes of a face mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceLayout {
    pub left: EyeLayout,
    pub right: EyeLayout,
    /// Number of landmarks the detector produces per frame.
    pub landmark_count: usize,
}

impl Default for FaceLayout {
    fn default() -> Self {
        Self {
            left: EyeLayout::face_mesh_left(),
            right: EyeLayout::face_mesh_right(),
            landmark_count: FACE_MESH_LANDMARKS,
        }
    }
}

impl FaceLayout {
    pub fn eye(&self, eye: Eye) -> &EyeLayout {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }

    /// Minimum landmark slice length needed to evaluate both eyes.
    pub fn required_len(&self) -> usize {
        self.left.max_index().max(self.right.max_index()) + 1
    }

    /// Whether a landmark set is long enough to be indexed with this layout.
    pub fn accepts(&self, landmarks: &[Pt2]) -> bool {
        landmarks.len() >= self.required_len()
    }
}
