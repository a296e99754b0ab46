//! Core math and data primitives for gaze-driven pointer control.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Pt2`, `Mat3`, ...) and homogeneous helpers,
//! - the per-frame data model (`GazeSample`, `ScreenPoint`, `Correspondence`, ...),
//! - the landmark index layout of the eye regions (`FaceLayout`, `EyeLayout`),
//! - a generic RANSAC engine (`ransac`, [`Estimator`]).

/// Landmark index layout for the eye regions.
mod layout;
/// Linear algebra type aliases and helpers.
mod math;
/// Generic RANSAC engine and traits.
mod ransac;
/// Deterministic synthetic landmark generation for tests and replay tools.
pub mod synthetic;
/// Plain value types shared across the pipeline.
mod types;

pub use layout::*;
pub use math::*;
pub use ransac::*;
pub use types::*;
