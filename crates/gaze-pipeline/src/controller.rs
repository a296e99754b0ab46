//! Per-frame orchestration of the pipeline components.

use std::time::Instant;

use anyhow::Result;
use gaze_core::{EyeSelector, GazeSample, Pt2, ScreenPoint};
use gaze_linear::{HomographyFitter, RansacHomographyFitter};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::action::{ActionState, ActionStateMachine, PointerAction};
use crate::calibration::{CalibrationError, CalibrationSession, ConfirmOutcome};
use crate::config::PointerConfig;
use crate::eyelid::EyelidAnalyzer;
use crate::gaze::GazeNormalizer;
use crate::smoother::{AdaptiveSmoother, FilterState};

/// Output driver: OS cursor, recorder, test double.
pub trait PointerSink {
    fn move_to(&mut self, position: ScreenPoint);
    fn perform(&mut self, action: PointerAction);
}

/// What one frame produced.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameOutput {
    /// Smoothed, clamped pointer position. `None` without a face or while calibrating.
    pub pointer: Option<ScreenPoint>,
    pub action: Option<PointerAction>,
    pub gaze: Option<GazeSample>,
    pub calibrating: bool,
}

/// Owns all pipeline state and runs one frame at a time.
#[derive(Debug, Clone)]
pub struct PointerController<F = RansacHomographyFitter> {
    config: PointerConfig,
    normalizer: GazeNormalizer,
    eyelids: EyelidAnalyzer,
    actions: ActionStateMachine,
    calibration: CalibrationSession<F>,
    smoother: AdaptiveSmoother,
}

impl PointerController {
    /// Validate `config` and build a controller with the robust homography fitter.
    pub fn new(config: PointerConfig) -> Result<Self> {
        config.validate()?;
        let calibration = CalibrationSession::new(config.screen, &config.calibration);
        Ok(Self::assemble(config, calibration))
    }
}

impl<F: HomographyFitter> PointerController<F> {
    pub fn with_fitter(config: PointerConfig, fitter: F) -> Result<Self> {
        config.validate()?;
        let calibration =
            CalibrationSession::with_fitter(config.screen, config.calibration.margin, fitter);
        Ok(Self::assemble(config, calibration))
    }

    fn assemble(config: PointerConfig, calibration: CalibrationSession<F>) -> Self {
        Self {
            normalizer: GazeNormalizer::from_config(&config.gaze),
            eyelids: EyelidAnalyzer::new(config.gaze.layout),
            actions: ActionStateMachine::new(config.actions.clone()),
            smoother: AdaptiveSmoother::new(config.smoothing.clone()),
            calibration,
            config,
        }
    }

    /// Run one frame. `landmarks` is `None` when no face was detected.
    ///
    /// While calibrating, the frame's gaze feeds the current calibration
    /// point and neither actions nor pointer positions are produced.
    pub fn process_frame(&mut self, landmarks: Option<&[Pt2]>, now: Instant) -> FrameOutput {
        let calibrating = self.calibration.is_active();
        let idle = FrameOutput {
            calibrating,
            ..FrameOutput::default()
        };

        let Some(landmarks) = landmarks else {
            return idle;
        };
        let layout = self.normalizer.layout();
        if !layout.accepts(landmarks) {
            warn!(
                "skipping frame with {} landmarks, layout needs {}",
                landmarks.len(),
                layout.required_len()
            );
            return idle;
        }

        if calibrating {
            let gaze = self.normalizer.normalize(landmarks, EyeSelector::Both);
            self.calibration.record_sample(gaze);
            return FrameOutput {
                gaze: Some(gaze),
                ..idle
            };
        }

        let open = self.eyelids.openness(landmarks);
        let action = self.actions.update(open.left, open.right);

        let gaze = self
            .normalizer
            .normalize(landmarks, self.actions.state().tracking_eyes());
        let target = self.calibration.map(&gaze);
        let smoothed = self.smoother.smooth(target, now);

        FrameOutput {
            pointer: Some(self.config.screen.clamp(&smoothed)),
            action,
            gaze: Some(gaze),
            calibrating: false,
        }
    }

    /// [`process_frame`](Self::process_frame), forwarding the result to `sink`.
    pub fn drive<S: PointerSink + ?Sized>(
        &mut self,
        landmarks: Option<&[Pt2]>,
        now: Instant,
        sink: &mut S,
    ) -> FrameOutput {
        let out = self.process_frame(landmarks, now);
        if let Some(p) = out.pointer {
            sink.move_to(p);
        }
        if let Some(a) = out.action {
            sink.perform(a);
        }
        out
    }

    /// Restart calibration at the first target.
    ///
    /// Returns [`PointerAction::StopDrag`] if a drag was in progress; the
    /// caller must forward it to the output driver.
    pub fn start_calibration(&mut self) -> Option<PointerAction> {
        let stop = self.actions.reset();
        if stop.is_some() {
            debug!("drag ended by calibration start");
        }
        self.smoother.reset();
        self.calibration.start();
        stop
    }

    /// Confirm the current calibration target.
    pub fn confirm_calibration_point(&mut self) -> Result<ConfirmOutcome, CalibrationError> {
        let outcome = self.calibration.confirm_point()?;
        if outcome == ConfirmOutcome::Completed {
            self.smoother.reset();
        }
        Ok(outcome)
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibration.is_active()
    }

    pub fn calibration(&self) -> &CalibrationSession<F> {
        &self.calibration
    }

    pub fn action_state(&self) -> &ActionState {
        self.actions.state()
    }

    pub fn smoother_state(&self) -> &FilterState {
        self.smoother.state()
    }

    pub fn config(&self) -> &PointerConfig {
        &self.config
    }
}
