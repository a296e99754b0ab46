//! Speed-adaptive low-pass filtering of the pointer target.
//!
//! A first-order low-pass whose cutoff rises with the (itself low-passed)
//! pointer speed: `cutoff = min_cutoff + beta * |speed|`. While the gaze
//! rests, the low cutoff suppresses tracking jitter; during a saccade the
//! cutoff rises and lag drops. Each axis gets its own cutoff, timing is shared.

use std::f64::consts::PI;
use std::time::Instant;

use gaze_core::{Pt2, Real, Vec2};
use log::trace;

use crate::config::SmootherConfig;

/// Exponential smoothing factor for a first-order low-pass with the given
/// cutoff (Hz) sampled every `dt` seconds.
pub fn smoothing_factor(dt: Real, cutoff: Real) -> Real {
    let r = 2.0 * PI * cutoff * dt;
    r / (r + 1.0)
}

/// Move `a` of the way from `prev` to `target`, never past either end.
fn ease(prev: Real, target: Real, a: Real) -> Real {
    (prev + a * (target - prev)).clamp(prev.min(target), prev.max(target))
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterState {
    pub last_position: Option<Pt2>,
    /// Smoothed velocity, units per second.
    pub last_derivative: Vec2,
    pub last_timestamp: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct AdaptiveSmoother {
    config: SmootherConfig,
    state: FilterState,
}

impl AdaptiveSmoother {
    pub fn new(config: SmootherConfig) -> Self {
        Self {
            config,
            state: FilterState::default(),
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn config(&self) -> &SmootherConfig {
        &self.config
    }

    /// Forget all history; the next sample passes through unchanged.
    pub fn reset(&mut self) {
        self.state = FilterState::default();
    }

    /// Filter one target position observed at `now`.
    ///
    /// If `now` is not after the previous timestamp the previous output is
    /// returned and the state is left untouched.
    pub fn smooth(&mut self, target: Pt2, now: Instant) -> Pt2 {
        let (Some(prev), Some(t_prev)) = (self.state.last_position, self.state.last_timestamp)
        else {
            self.state = FilterState {
                last_position: Some(target),
                last_derivative: Vec2::zeros(),
                last_timestamp: Some(now),
            };
            return target;
        };

        let dt = match now.checked_duration_since(t_prev) {
            Some(d) if !d.is_zero() => d.as_secs_f64(),
            _ => {
                trace!("non-increasing frame time, holding pointer");
                return prev;
            }
        };

        let cfg = &self.config;
        let raw = (target - prev) / dt;
        let a_d = smoothing_factor(dt, cfg.derivative_cutoff);
        let derivative = raw * a_d + self.state.last_derivative * (1.0 - a_d);

        let a_x = smoothing_factor(dt, cfg.min_cutoff + cfg.beta * derivative.x.abs());
        let a_y = smoothing_factor(dt, cfg.min_cutoff + cfg.beta * derivative.y.abs());
        let out = Pt2::new(
            ease(prev.x, target.x, a_x),
            ease(prev.y, target.y, a_y),
        );

        self.state = FilterState {
            last_position: Some(out),
            last_derivative: derivative,
            last_timestamp: Some(now),
        };
        out
    }
}
