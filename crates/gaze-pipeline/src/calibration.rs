//! Five-point gaze-to-screen calibration.
//!
//! The user fixates each target in turn (top-left, top-right, center,
//! bottom-left, bottom-right) while the caller feeds gaze samples; confirming a
//! target averages its samples into one [`Correspondence`]. After the fifth
//! confirmation a homography is fitted with a [`HomographyFitter`] and used by
//! [`CalibrationSession::map`] until the next calibration.

use gaze_core::{
    apply_homography, centroid, Correspondence, GazeSample, Mat3, Pt2, Real, ScreenGeometry,
    ScreenPoint,
};
use gaze_linear::{
    reprojection_error, HomographyError, HomographyFitter, RansacHomographyFitter,
};
use log::{info, trace, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CalibrationConfig;

pub const CALIBRATION_POINTS: usize = 5;

/// Minimum correspondences for a projective fit.
const MIN_FIT_POINTS: usize = 4;

/// Targets in protocol order: four corners inset by `margin`, plus the center.
pub fn calibration_targets(
    screen: &ScreenGeometry,
    margin: Real,
) -> [ScreenPoint; CALIBRATION_POINTS] {
    let (w, h) = (screen.width, screen.height);
    [
        ScreenPoint::new(margin, margin),
        ScreenPoint::new(w - margin, margin),
        screen.center(),
        ScreenPoint::new(margin, h - margin),
        ScreenPoint::new(w - margin, h - margin),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationState {
    #[default]
    Inactive,
    Active {
        point_index: usize,
    },
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalibrationError {
    #[error("calibration is not active")]
    NotActive,
    #[error("no gaze samples recorded for calibration point {point}")]
    InsufficientSamples { point: usize },
    #[error("need at least 4 calibration points to fit a homography, got {got}")]
    InsufficientPoints { got: usize },
    #[error("homography fit failed: {0}")]
    Fit(#[from] HomographyError),
}

impl CalibrationError {
    /// Whether the caller should collect more data and retry.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            Self::InsufficientSamples { .. }
                | Self::InsufficientPoints { .. }
                | Self::Fit(HomographyError::NotEnoughPoints(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The point was recorded; `next_point` is now being collected.
    Advanced { next_point: usize },
    /// The last point was recorded and the homography is installed.
    Completed,
}

/// Summary of a successful calibration fit.
///
/// A homography has eight degrees of freedom, so four inliers determine it
/// exactly and leave nothing to cross-check it with: `rms_error` is then zero
/// whether or not the kept points were good. With the five-target protocol a
/// corrupted center and a corrupted corner both end in that state, and the
/// report cannot tell which one happened. See [`has_redundancy`](Self::has_redundancy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub homography: Mat3,
    pub correspondences: Vec<Correspondence>,
    /// Correspondences the fit kept; the rest were rejected as outliers.
    pub inliers: Vec<usize>,
    /// Per-correspondence error in pixels, outliers included.
    pub reprojection_errors: Vec<Real>,
    /// RMS error over the inliers, in pixels.
    pub rms_error: Real,
}

impl CalibrationReport {
    /// Whether more inliers were kept than the fit needs, so that
    /// `rms_error` actually measures agreement between them.
    pub fn has_redundancy(&self) -> bool {
        self.inliers.len() > MIN_FIT_POINTS
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationSession<F = RansacHomographyFitter> {
    screen: ScreenGeometry,
    targets: [ScreenPoint; CALIBRATION_POINTS],
    fitter: F,
    state: CalibrationState,
    samples: Vec<GazeSample>,
    correspondences: Vec<Correspondence>,
    homography: Option<Mat3>,
    report: Option<CalibrationReport>,
}

impl CalibrationSession {
    /// Session with the robust RANSAC fitter configured from `config`.
    pub fn new(screen: ScreenGeometry, config: &CalibrationConfig) -> Self {
        Self::with_fitter(
            screen,
            config.margin,
            RansacHomographyFitter::new(config.ransac.clone()),
        )
    }
}

impl<F: HomographyFitter> CalibrationSession<F> {
    pub fn with_fitter(screen: ScreenGeometry, margin: Real, fitter: F) -> Self {
        Self {
            screen,
            targets: calibration_targets(&screen, margin),
            fitter,
            state: CalibrationState::Inactive,
            samples: Vec::new(),
            correspondences: Vec::with_capacity(CALIBRATION_POINTS),
            homography: None,
            report: None,
        }
    }

    /// Begin (or restart) calibration at the first target.
    ///
    /// Discards buffered samples, recorded correspondences and any installed
    /// homography.
    pub fn start(&mut self) {
        self.state = CalibrationState::Active { point_index: 0 };
        self.samples.clear();
        self.correspondences.clear();
        self.homography = None;
        self.report = None;
        info!("calibration started, {} targets", CALIBRATION_POINTS);
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CalibrationState::Active { .. })
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Buffer one gaze sample for the current target. Ignored unless active.
    pub fn record_sample(&mut self, gaze: GazeSample) {
        if self.is_active() {
            self.samples.push(gaze);
        }
    }

    /// Samples buffered for the current target.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Average the buffered samples into a correspondence for the current
    /// target and advance; fits the homography after the last target.
    ///
    /// With no buffered samples nothing changes and the point must be
    /// retried. A failed final fit leaves the session inactive with no
    /// homography.
    pub fn confirm_point(&mut self) -> Result<ConfirmOutcome, CalibrationError> {
        let CalibrationState::Active { point_index } = self.state else {
            return Err(CalibrationError::NotActive);
        };

        let Some(mean) = centroid(&self.samples) else {
            warn!("calibration point {point_index}: no gaze samples, retry");
            return Err(CalibrationError::InsufficientSamples { point: point_index });
        };

        let target = self.targets[point_index];
        info!(
            "calibration point {point_index}: {} samples, gaze ({:.3}, {:.3}) -> ({:.0}, {:.0})",
            self.samples.len(),
            mean.x,
            mean.y,
            target.x,
            target.y
        );
        self.correspondences.push(Correspondence::new(mean, target));
        self.samples.clear();

        let next_point = point_index + 1;
        if next_point < CALIBRATION_POINTS {
            self.state = CalibrationState::Active {
                point_index: next_point,
            };
            return Ok(ConfirmOutcome::Advanced { next_point });
        }

        match self.fit().map(|_| ()) {
            Ok(()) => Ok(ConfirmOutcome::Completed),
            Err(e) => {
                warn!("calibration failed: {e}");
                self.state = CalibrationState::Inactive;
                Err(e)
            }
        }
    }

    /// Fit a homography to the recorded correspondences and install it.
    ///
    /// On failure the previous mapping and state are kept.
    pub fn fit(&mut self) -> Result<&CalibrationReport, CalibrationError> {
        let got = self.correspondences.len();
        if got < MIN_FIT_POINTS {
            return Err(CalibrationError::InsufficientPoints { got });
        }

        let fit = self.fitter.fit(&self.correspondences)?;
        let reprojection_errors: Vec<Real> = self
            .correspondences
            .iter()
            .map(|c| reprojection_error(&fit.h, &c.gaze, &c.screen))
            .collect();

        info!(
            "calibration complete: {} of {} points kept, rms {:.2} px",
            fit.inliers.len(),
            got,
            fit.inlier_rms
        );
        if fit.inliers.len() <= MIN_FIT_POINTS {
            let rejected: Vec<usize> = (0..got).filter(|i| !fit.inliers.contains(i)).collect();
            warn!(
                "calibration points {rejected:?} rejected; the remaining {} fix the map exactly \
                 with no redundant check, recalibrate if the pointer is off",
                fit.inliers.len()
            );
        }

        self.homography = Some(fit.h);
        self.state = CalibrationState::Complete;
        let report = self.report.insert(CalibrationReport {
            homography: fit.h,
            correspondences: self.correspondences.clone(),
            inliers: fit.inliers,
            reprojection_errors,
            rms_error: fit.inlier_rms,
        });
        Ok(report)
    }

    /// Map a gaze sample to screen pixels.
    ///
    /// Without a homography, or where it maps to infinity, this is
    /// [`ScreenGeometry::scale`].
    pub fn map(&self, gaze: &GazeSample) -> ScreenPoint {
        let Some(h) = &self.homography else {
            return self.screen.scale(gaze);
        };
        match apply_homography(h, gaze) {
            Some(p) if p.x.is_finite() && p.y.is_finite() => p,
            _ => {
                trace!("gaze ({:.3}, {:.3}) on the homography horizon", gaze.x, gaze.y);
                self.screen.scale(gaze)
            }
        }
    }

    pub fn homography(&self) -> Option<&Mat3> {
        self.homography.as_ref()
    }

    pub fn report(&self) -> Option<&CalibrationReport> {
        self.report.as_ref()
    }

    pub fn correspondences(&self) -> &[Correspondence] {
        &self.correspondences
    }

    pub fn targets(&self) -> &[ScreenPoint; CALIBRATION_POINTS] {
        &self.targets
    }

    /// Target the user should be looking at, in pixels.
    pub fn current_target(&self) -> Option<ScreenPoint> {
        match self.state {
            CalibrationState::Active { point_index } => Some(self.targets[point_index]),
            _ => None,
        }
    }

    /// [`current_target`](Self::current_target) as screen fractions in `[0, 1]`.
    pub fn current_target_normalized(&self) -> Option<Pt2> {
        self.current_target().map(|p| self.screen.normalize(&p))
    }

    /// `(confirmed points, total points)`.
    pub fn progress(&self) -> (usize, usize) {
        (self.correspondences.len(), CALIBRATION_POINTS)
    }

    pub fn screen(&self) -> &ScreenGeometry {
        &self.screen
    }
}
