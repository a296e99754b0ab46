//! Homography fitting as a swappable capability.
//!
//! A calibration procedure only needs "turn these correspondences into a
//! transform, or tell me why not". [`HomographyFitter`] captures that so the
//! fitting algorithm can change without touching the calibration protocol.

use gaze_core::{Correspondence, Pt2, RansacOptions, Real};
use log::debug;

use crate::homography::{
    reprojection_error, HomographyError, HomographyFit, HomographySolver,
};

pub trait HomographyFitter {
    /// Fit a gaze-to-screen homography.
    ///
    /// Fails with [`HomographyError::NotEnoughPoints`] for fewer than four
    /// correspondences.
    fn fit(&self, correspondences: &[Correspondence]) -> Result<HomographyFit, HomographyError>;
}

fn split(correspondences: &[Correspondence]) -> (Vec<Pt2>, Vec<Pt2>) {
    correspondences.iter().map(|c| (c.gaze, c.screen)).unzip()
}

/// Outlier-tolerant fitting: normalized DLT inside RANSAC.
#[derive(Debug, Clone, Default)]
pub struct RansacHomographyFitter {
    pub opts: RansacOptions,
}

impl RansacHomographyFitter {
    pub fn new(opts: RansacOptions) -> Self {
        Self { opts }
    }
}

impl HomographyFitter for RansacHomographyFitter {
    fn fit(&self, correspondences: &[Correspondence]) -> Result<HomographyFit, HomographyError> {
        let (src, dst) = split(correspondences);
        let fit = HomographySolver::dlt_ransac(&src, &dst, &self.opts)?;
        debug!(
            "homography: {} of {} correspondences kept, rms {:.2}",
            fit.inliers.len(),
            correspondences.len(),
            fit.inlier_rms
        );
        Ok(fit)
    }
}

/// Plain algebraic least squares over every correspondence.
///
/// Not robust: a single bad correspondence skews the whole map.
#[derive(Debug, Clone, Copy, Default)]
pub struct DltHomographyFitter;

impl HomographyFitter for DltHomographyFitter {
    fn fit(&self, correspondences: &[Correspondence]) -> Result<HomographyFit, HomographyError> {
        let (src, dst) = split(correspondences);
        let h = HomographySolver::dlt(&src, &dst)?;
        let errors: Vec<Real> = src
            .iter()
            .zip(&dst)
            .map(|(s, d)| reprojection_error(&h, s, d))
            .collect();
        let inlier_rms =
            (errors.iter().map(|e| e * e).sum::<Real>() / errors.len() as Real).sqrt();
        Ok(HomographyFit {
            h,
            inliers: (0..correspondences.len()).collect(),
            inlier_rms,
        })
    }
}
