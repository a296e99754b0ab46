//! Generic, model-agnostic RANSAC implementation.
//!
//! Implement [`Estimator`] for a model and call [`ransac`] with the data and
//! some [`RansacOptions`]. The engine never panics on failure: when no
//! consensus is found the returned [`RansacResult`] has `success == false`.
//!
//! Two sampling strategies are used:
//! - when the number of distinct minimal subsets fits into `max_iters`, every
//!   subset is evaluated exactly once (fully deterministic, used for the
//!   five-point calibration protocol);
//! - otherwise subsets are drawn at random from a seeded RNG with the usual
//!   adaptive iteration bound.
//!
//! Candidates are ranked by inlier count, then by inlier RMS, then by
//! [`Estimator::penalty`] when the RMS values are indistinguishable. With very
//! small data sets a minimal sample fits its own points exactly, so several
//! candidates tie on count and RMS and only the penalty can separate them.

use log::debug;
use rand::prelude::IndexedRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration parameters for the generic RANSAC engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacOptions {
    /// Maximum number of iterations (also the exhaustive-enumeration budget).
    pub max_iters: usize,
    /// Inlier residual threshold.
    pub thresh: f64,
    /// Minimum number of inliers required to accept a model.
    pub min_inliers: usize,
    /// Desired confidence level in `[0, 1]` for the random strategy.
    pub confidence: f64,
    /// Random-number generator seed (for reproducibility).
    pub seed: u64,
    /// If `true`, refit the model on all inliers before scoring.
    pub refit_on_inliers: bool,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            thresh: 25.0,
            min_inliers: 4,
            confidence: 0.99,
            seed: 1_234_567,
            refit_on_inliers: true,
        }
    }
}

/// Output of a RANSAC run.
///
/// Check [`success`](Self::success) before using the model; if it is `false`,
/// [`model`](Self::model) is `None` and the other fields are unspecified.
#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    /// Whether a consensus set satisfying the options was found.
    pub success: bool,
    /// Best model found (if any).
    pub model: Option<M>,
    /// Indices of inlier data points.
    pub inliers: Vec<usize>,
    /// Root-mean-square residual over inliers.
    pub inlier_rms: f64,
    /// Number of iterations actually performed.
    pub iters: usize,
}

impl<M> Default for RansacResult<M> {
    fn default() -> Self {
        Self {
            success: false,
            model: None,
            inliers: Vec::new(),
            inlier_rms: f64::INFINITY,
            iters: 0,
        }
    }
}

/// Generic estimator for RANSAC-like methods.
pub trait Estimator {
    type Datum;
    type Model;

    /// Minimal number of samples needed to estimate a model.
    const MIN_SAMPLES: usize;

    /// Fit a model from a subset of data indices.
    ///
    /// Return `None` if the subset is degenerate or fitting fails.
    fn fit(data: &[Self::Datum], sample_indices: &[usize]) -> Option<Self::Model>;

    /// Non-negative residual for one datum, in the units of `opts.thresh`.
    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64;

    /// Optional degeneracy check on the sample subset.
    fn is_degenerate(_data: &[Self::Datum], _sample_indices: &[usize]) -> bool {
        false
    }

    /// Optional refit on the full inlier set.
    fn refit(_data: &[Self::Datum], _inliers: &[usize]) -> Option<Self::Model> {
        None
    }

    /// Implausibility of a model, lower is better. Only consulted to break
    /// ties between candidates with equal support.
    fn penalty(_model: &Self::Model, _data: &[Self::Datum], _inliers: &[usize]) -> f64 {
        0.0
    }
}

struct Candidate<M> {
    model: M,
    inliers: Vec<usize>,
    rms: f64,
    penalty: f64,
}

impl<M> Candidate<M> {
    /// RMS differences below `rms_tol` are treated as ties.
    fn beats(&self, best: Option<&Candidate<M>>, rms_tol: f64) -> bool {
        let Some(best) = best else {
            return true;
        };
        if self.inliers.len() != best.inliers.len() {
            return self.inliers.len() > best.inliers.len();
        }
        if (self.rms - best.rms).abs() > rms_tol || self.penalty == best.penalty {
            return self.rms < best.rms;
        }
        self.penalty < best.penalty
    }
}

fn rms(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::INFINITY;
    }
    let ss: f64 = vals.iter().map(|&v| v * v).sum();
    (ss / (vals.len() as f64)).sqrt()
}

fn collect_inliers<E: Estimator>(
    model: &E::Model,
    data: &[E::Datum],
    thresh: f64,
) -> (Vec<usize>, Vec<f64>) {
    let mut inliers = Vec::with_capacity(data.len());
    let mut residuals = Vec::with_capacity(data.len());
    for (i, datum) in data.iter().enumerate() {
        let r = E::residual(model, datum);
        if r <= thresh {
            inliers.push(i);
            residuals.push(r);
        }
    }
    (inliers, residuals)
}

fn evaluate<E: Estimator>(
    data: &[E::Datum],
    sample: &[usize],
    opts: &RansacOptions,
) -> Option<Candidate<E::Model>> {
    if E::is_degenerate(data, sample) {
        return None;
    }
    let model = E::fit(data, sample)?;
    let (inliers, residuals) = collect_inliers::<E>(&model, data, opts.thresh);
    if inliers.len() < opts.min_inliers {
        return None;
    }

    let (model, inliers, residuals) = match opts
        .refit_on_inliers
        .then(|| E::refit(data, &inliers))
        .flatten()
    {
        Some(refit) => {
            let (refit_inliers, refit_residuals) =
                collect_inliers::<E>(&refit, data, opts.thresh);
            if refit_inliers.len() >= inliers.len() {
                (refit, refit_inliers, refit_residuals)
            } else {
                (model, inliers, residuals)
            }
        }
        None => (model, inliers, residuals),
    };

    let penalty = E::penalty(&model, data, &inliers);
    Some(Candidate {
        model,
        rms: rms(&residuals),
        inliers,
        penalty,
    })
}

/// Number of `k`-subsets of `n` items, saturating at `usize::MAX`.
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc * (n - i) as u128 / (i + 1) as u128;
        if acc > usize::MAX as u128 {
            return usize::MAX;
        }
    }
    acc as usize
}

/// Advance `idx` to the next `k`-combination of `0..n` in lexicographic order.
fn next_combination(idx: &mut [usize], n: usize) -> bool {
    let k = idx.len();
    let mut i = k;
    while i > 0 {
        i -= 1;
        if idx[i] < n - k + i {
            idx[i] += 1;
            for j in i + 1..k {
                idx[j] = idx[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

/// Dynamic iteration bound from the current inlier ratio.
fn calculate_iterations(
    confidence: f64,
    inlier_ratio: f64,
    min_samples: usize,
    iters_so_far: usize,
    max_iters: usize,
) -> usize {
    if confidence <= 0.0 || inlier_ratio <= 0.0 {
        return max_iters;
    }

    let denom = (1.0 - inlier_ratio.powf(min_samples as f64)).max(1e-12).ln();
    if denom >= 0.0 {
        return max_iters;
    }

    let n_iter = ((1.0 - confidence).ln() / denom).ceil() as usize;
    n_iter.clamp(iters_so_far, max_iters)
}

/// Run RANSAC for a given [`Estimator`] implementation.
///
/// Returns a failed [`RansacResult`] if there is insufficient data or no
/// candidate reaches `opts.min_inliers`.
pub fn ransac<E: Estimator>(data: &[E::Datum], opts: &RansacOptions) -> RansacResult<E::Model> {
    let k = E::MIN_SAMPLES;
    if k == 0 || data.len() < k {
        return RansacResult::default();
    }

    let rms_tol = 0.1 * opts.thresh;
    let mut best: Option<Candidate<E::Model>> = None;
    let mut num_iters = 0;

    let subsets = binomial(data.len(), k);
    if subsets <= opts.max_iters {
        let mut sample: Vec<usize> = (0..k).collect();
        loop {
            num_iters += 1;
            if let Some(c) = evaluate::<E>(data, &sample, opts) {
                if c.beats(best.as_ref(), rms_tol) {
                    best = Some(c);
                }
            }
            if !next_combination(&mut sample, data.len()) {
                break;
            }
        }
    } else {
        let all_indices: Vec<usize> = (0..data.len()).collect();
        let mut sample = vec![0usize; k];
        let mut rng = StdRng::seed_from_u64(opts.seed);
        let mut dynamic_max_iters = opts.max_iters;

        while num_iters < dynamic_max_iters {
            num_iters += 1;
            all_indices
                .as_slice()
                .choose_multiple(&mut rng, k)
                .enumerate()
                .for_each(|(slot, &idx)| sample[slot] = idx);

            let Some(c) = evaluate::<E>(data, &sample, opts) else {
                continue;
            };
            if !c.beats(best.as_ref(), rms_tol) {
                continue;
            }
            let inlier_ratio = c.inliers.len() as f64 / data.len() as f64;
            best = Some(c);
            dynamic_max_iters = calculate_iterations(
                opts.confidence,
                inlier_ratio,
                k,
                num_iters,
                opts.max_iters,
            );
        }
    }

    match best {
        Some(c) => {
            debug!(
                "ransac: {} / {} inliers, rms {:.4}, penalty {:.4}, {} iterations",
                c.inliers.len(),
                data.len(),
                c.rms,
                c.penalty,
                num_iters
            );
            RansacResult {
                success: true,
                model: Some(c.model),
                inliers: c.inliers,
                inlier_rms: c.rms,
                iters: num_iters,
            }
        }
        None => {
            debug!("ransac: no consensus after {} iterations", num_iters);
            RansacResult {
                iters: num_iters,
                ..RansacResult::default()
            }
        }
    }
}
