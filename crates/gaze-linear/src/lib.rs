//! Linear homography estimation for gaze-to-screen calibration.
//!
//! - [`math`]: Hartley normalization of 2D point sets.
//! - [`HomographySolver`]: normalized DLT and DLT inside RANSAC.
//! - [`HomographyFitter`]: the capability a calibration procedure depends on,
//!   with robust and plain least-squares implementations.

mod fitter;
mod homography;
pub mod math;

pub use fitter::*;
pub use homography::*;
