//! Homography estimation (plane-to-plane projective transform).
//!
//! Implements the normalized Direct Linear Transform (DLT) and a robust
//! RANSAC wrapper. The homography `H` maps **source points** (gaze samples in
//! the unit square) to **destination points** (screen pixels): `x' ~ H x`.
//!
//! Normalization is applied internally for numerical stability and the
//! output is de-normalized and scaled so that `H[2,2] == 1` when possible.

use gaze_core::{
    apply_homography, ransac, to_homogeneous, Estimator, Mat3, Pt2, RansacOptions, Real,
};
use nalgebra::DMatrix;
use thiserror::Error;

use crate::math::{has_collinear_triple, normalize_points_2d};

/// Relative area below which a sample triple counts as collinear.
const COLLINEAR_REL_TOL: Real = 1e-6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HomographyError {
    #[error("need at least 4 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("source and destination point counts differ ({0} vs {1})")]
    LengthMismatch(usize, usize),
    #[error("degenerate point configuration")]
    DegenerateConfiguration,
    #[error("svd failed")]
    SvdFailed,
    #[error("ransac failed to find a consensus homography")]
    NoConsensus,
}

/// A fitted homography together with its support.
#[derive(Debug, Clone, PartialEq)]
pub struct HomographyFit {
    pub h: Mat3,
    /// Indices of the correspondences consistent with `h`.
    pub inliers: Vec<usize>,
    /// RMS reprojection error over the inliers, in destination units.
    pub inlier_rms: Real,
}

/// Entry point for homography estimation.
#[derive(Debug, Clone, Copy)]
pub struct HomographySolver;

/// Estimate `H` such that `dst ~ H src` using normalized DLT.
pub fn dlt_homography(src: &[Pt2], dst: &[Pt2]) -> Result<Mat3, HomographyError> {
    HomographySolver::dlt(src, dst)
}

/// Estimate a homography using DLT inside a RANSAC loop.
pub fn dlt_homography_ransac(
    src: &[Pt2],
    dst: &[Pt2],
    opts: &RansacOptions,
) -> Result<HomographyFit, HomographyError> {
    HomographySolver::dlt_ransac(src, dst, opts)
}

/// Euclidean distance between `H src` and `dst`; infinite if `src` maps to infinity.
pub fn reprojection_error(h: &Mat3, src: &Pt2, dst: &Pt2) -> Real {
    apply_homography(h, src)
        .map(|p| (p - dst).norm())
        .unwrap_or(f64::INFINITY)
}

/// How far `h` departs from an affine map over `points`.
///
/// Zero for an affine `h`; grows with the spread of the homogeneous weight
/// `w = h31 x + h32 y + h33` across the points. Infinite when `w` changes sign
/// (the horizon line crosses the point set) or vanishes.
pub fn projective_distortion(h: &Mat3, points: &[Pt2]) -> Real {
    let weights: Vec<Real> = points.iter().map(|p| (h * to_homogeneous(p)).z).collect();
    let Some(&first) = weights.first() else {
        return 0.0;
    };
    if weights
        .iter()
        .any(|w| w.abs() <= f64::EPSILON || w.signum() != first.signum())
    {
        return f64::INFINITY;
    }
    let (lo, hi) = weights
        .iter()
        .map(|w| w.abs())
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), w| (lo.min(w), hi.max(w)));
    (hi / lo).ln()
}

fn check_lengths(src: &[Pt2], dst: &[Pt2]) -> Result<(), HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::LengthMismatch(src.len(), dst.len()));
    }
    if src.len() < 4 {
        return Err(HomographyError::NotEnoughPoints(src.len()));
    }
    Ok(())
}

impl HomographySolver {
    /// Estimate `H` such that `dst ~ H src` using the normalized DLT.
    ///
    /// Uses Hartley normalization and solves `A h = 0` via SVD of the design
    /// matrix. Exactly four correspondences give an exact fit; more give the
    /// algebraic least-squares solution.
    pub fn dlt(src: &[Pt2], dst: &[Pt2]) -> Result<Mat3, HomographyError> {
        check_lengths(src, dst)?;
        let n = src.len();

        let (src_n, t_s) =
            normalize_points_2d(src).ok_or(HomographyError::DegenerateConfiguration)?;
        let (dst_n, t_d) =
            normalize_points_2d(dst).ok_or(HomographyError::DegenerateConfiguration)?;

        // Pad to at least 9 rows so the SVD yields a full V.
        let rows = (2 * n).max(9);
        let mut a = DMatrix::<f64>::zeros(rows, 9);

        for (i, (ps, pd)) in src_n.iter().zip(dst_n.iter()).enumerate() {
            let (x, y) = (ps.x, ps.y);
            let (u, v) = (pd.x, pd.y);

            let r0 = 2 * i;
            let r1 = 2 * i + 1;

            a[(r0, 0)] = -x;
            a[(r0, 1)] = -y;
            a[(r0, 2)] = -1.0;
            a[(r0, 6)] = u * x;
            a[(r0, 7)] = u * y;
            a[(r0, 8)] = u;

            a[(r1, 3)] = -x;
            a[(r1, 4)] = -y;
            a[(r1, 5)] = -1.0;
            a[(r1, 6)] = v * x;
            a[(r1, 7)] = v * y;
            a[(r1, 8)] = v;
        }

        // Singular vector of the smallest singular value (nalgebra sorts descending).
        let svd = a.svd(false, true);
        let v_t = svd.v_t.ok_or(HomographyError::SvdFailed)?;
        let h_vec = v_t.row(v_t.nrows() - 1);

        let mut h_mat = Mat3::zeros();
        for r in 0..3 {
            for c in 0..3 {
                h_mat[(r, c)] = h_vec[3 * r + c];
            }
        }

        let t_d_inv = t_d.try_inverse().ok_or(HomographyError::SvdFailed)?;
        h_mat = t_d_inv * h_mat * t_s;

        let scale = h_mat[(2, 2)];
        if scale.abs() > f64::EPSILON {
            h_mat /= scale;
        }

        if h_mat.iter().any(|v| !v.is_finite()) || h_mat.determinant().abs() <= f64::EPSILON {
            return Err(HomographyError::DegenerateConfiguration);
        }

        Ok(h_mat)
    }

    /// Estimate a homography using DLT inside a RANSAC loop.
    ///
    /// The residual is the Euclidean reprojection error in destination units.
    /// Candidates with equal support are separated by
    /// [`projective_distortion`] over the source points, preferring the
    /// least-warped model.
    pub fn dlt_ransac(
        src: &[Pt2],
        dst: &[Pt2],
        opts: &RansacOptions,
    ) -> Result<HomographyFit, HomographyError> {
        check_lengths(src, dst)?;

        struct HomographyDatum {
            src: Pt2,
            dst: Pt2,
        }

        struct HomographyEst;

        impl HomographyEst {
            fn solve(data: &[HomographyDatum], indices: &[usize]) -> Option<Mat3> {
                let (src, dst): (Vec<Pt2>, Vec<Pt2>) =
                    indices.iter().map(|&i| (data[i].src, data[i].dst)).unzip();
                HomographySolver::dlt(&src, &dst).ok()
            }
        }

        impl Estimator for HomographyEst {
            type Datum = HomographyDatum;
            type Model = Mat3;

            const MIN_SAMPLES: usize = 4;

            fn fit(data: &[Self::Datum], sample_indices: &[usize]) -> Option<Self::Model> {
                Self::solve(data, sample_indices)
            }

            fn residual(model: &Self::Model, datum: &Self::Datum) -> f64 {
                reprojection_error(model, &datum.src, &datum.dst)
            }

            fn is_degenerate(data: &[Self::Datum], sample_indices: &[usize]) -> bool {
                let src: Vec<Pt2> = sample_indices.iter().map(|&i| data[i].src).collect();
                let dst: Vec<Pt2> = sample_indices.iter().map(|&i| data[i].dst).collect();
                has_collinear_triple(&src, COLLINEAR_REL_TOL)
                    || has_collinear_triple(&dst, COLLINEAR_REL_TOL)
            }

            fn refit(data: &[Self::Datum], inliers: &[usize]) -> Option<Self::Model> {
                if inliers.len() < Self::MIN_SAMPLES {
                    return None;
                }
                Self::solve(data, inliers)
            }

            fn penalty(model: &Self::Model, data: &[Self::Datum], _inliers: &[usize]) -> f64 {
                let src: Vec<Pt2> = data.iter().map(|d| d.src).collect();
                projective_distortion(model, &src)
            }
        }

        let data: Vec<HomographyDatum> = src
            .iter()
            .zip(dst.iter())
            .map(|(&src, &dst)| HomographyDatum { src, dst })
            .collect();

        let res = ransac::<HomographyEst>(&data, opts);
        match res.model {
            Some(h) if res.success => Ok(HomographyFit {
                h,
                inliers: res.inliers,
                inlier_rms: res.inlier_rms,
            }),
            _ => Err(HomographyError::NoConsensus),
        }
    }
}
