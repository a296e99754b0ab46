//! Tunable parameters of the pointer pipeline.
//!
//! Every struct deserializes with `#[serde(default)]`, so a JSON file only
//! needs the fields it overrides.

use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use gaze_core::{FaceLayout, RansacOptions, Real, ScreenGeometry};
use serde::{Deserialize, Serialize};

/// Blink/wink thresholds for the action state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Eye-aspect-ratio below which an eye counts as closed.
    pub ear_threshold: Real,
    /// Minimum closed frames for a click.
    pub click_frames: u32,
    /// Closed frames after which a hold becomes a drag.
    pub drag_start_frames: u32,
    /// Frames ignored after a click.
    pub blink_cooldown_frames: u32,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.22,
            click_frames: 2,
            drag_start_frames: 12,
            blink_cooldown_frames: 5,
        }
    }
}

impl ActionConfig {
    /// Whether a closure of `frames` frames is click-length.
    pub fn is_click(&self, frames: u32) -> bool {
        (self.click_frames..self.drag_start_frames).contains(&frames)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Gain applied around the gaze center; higher needs less eye movement.
    pub sensitivity: Real,
    pub layout: FaceLayout,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            sensitivity: 2.5,
            layout: FaceLayout::default(),
        }
    }
}

/// Adaptive smoother parameters. Cutoffs are in Hz, `beta` in Hz per
/// pixel/second of pointer speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherConfig {
    pub min_cutoff: Real,
    pub beta: Real,
    pub derivative_cutoff: Real,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            min_cutoff: 1.0,
            beta: 0.007,
            derivative_cutoff: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Inset of the corner targets from the screen edges, in pixels.
    pub margin: Real,
    /// Robust fit options; `thresh` is the inlier reprojection error in pixels.
    pub ransac: RansacOptions,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            margin: 50.0,
            ransac: RansacOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    pub screen: ScreenGeometry,
    pub actions: ActionConfig,
    pub gaze: GazeConfig,
    pub smoothing: SmootherConfig,
    pub calibration: CalibrationConfig,
}

impl PointerConfig {
    /// Reject values the pipeline cannot operate with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.screen;
        ensure!(
            s.width > 0.0 && s.height > 0.0,
            "screen size must be positive (got {}x{})",
            s.width,
            s.height
        );

        let a = &self.actions;
        ensure!(a.ear_threshold > 0.0, "ear_threshold must be positive");
        ensure!(a.click_frames > 0, "click_frames must be at least 1");
        ensure!(
            a.drag_start_frames > a.click_frames,
            "drag_start_frames ({}) must exceed click_frames ({})",
            a.drag_start_frames,
            a.click_frames
        );

        ensure!(
            self.gaze.sensitivity.is_finite() && self.gaze.sensitivity > 0.0,
            "gaze sensitivity must be positive"
        );

        let f = &self.smoothing;
        ensure!(f.min_cutoff > 0.0, "min_cutoff must be positive");
        ensure!(f.derivative_cutoff > 0.0, "derivative_cutoff must be positive");
        ensure!(f.beta >= 0.0, "beta must not be negative");

        let c = &self.calibration;
        ensure!(
            c.margin >= 0.0 && 2.0 * c.margin < s.width.min(s.height),
            "calibration margin {} does not fit a {}x{} screen",
            c.margin,
            s.width,
            s.height
        );
        ensure!(c.ransac.thresh > 0.0, "ransac threshold must be positive");
        ensure!(
            c.ransac.min_inliers >= 4,
            "ransac min_inliers must be at least 4 for a homography"
        );
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid pointer config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("in config {}", path.display()))
    }
}
