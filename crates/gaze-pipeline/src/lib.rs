//! Real-time gaze-to-pointer pipeline.
//!
//! One frame of face landmarks flows through:
//!
//! 1. [`GazeNormalizer`]: iris position to a normalized [`GazeSample`](gaze_core::GazeSample),
//! 2. [`EyelidAnalyzer`]: eye aspect ratios,
//! 3. [`ActionStateMachine`]: closure patterns to clicks and drags,
//! 4. [`CalibrationSession`]: five-point homography calibration and gaze-to-screen mapping,
//! 5. [`AdaptiveSmoother`]: speed-adaptive jitter filtering.
//!
//! [`PointerController`] wires them together and hands results to a [`PointerSink`].
//!
//! ```no_run
//! use std::time::Instant;
//! use gaze_pipeline::{PointerConfig, PointerController};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut controller = PointerController::new(PointerConfig::default())?;
//! let out = controller.process_frame(None, Instant::now());
//! assert!(out.pointer.is_none());
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod calibration;
pub mod config;
pub mod controller;
pub mod eyelid;
pub mod gaze;
pub mod smoother;

pub use action::{ActionPhase, ActionState, ActionStateMachine, PointerAction};
pub use calibration::{
    calibration_targets, CalibrationError, CalibrationReport, CalibrationSession,
    CalibrationState, ConfirmOutcome, CALIBRATION_POINTS,
};
pub use config::{
    ActionConfig, CalibrationConfig, GazeConfig, PointerConfig, SmootherConfig,
};
pub use controller::{FrameOutput, PointerController, PointerSink};
pub use eyelid::{eye_aspect_ratio, EyeOpenness, EyelidAnalyzer};
pub use gaze::{iris_position, GazeNormalizer};
pub use smoother::{smoothing_factor, AdaptiveSmoother, FilterState};
