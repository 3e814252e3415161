// fuzzy-pid: A self-tuning fuzzy PID controller library written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Running gains, universe scaling and the gain adapter.

use crate::inference::Adjustment;
use crate::partition::SET_COUNT;
use crate::FuzzyPidError;

/// Half-width of the normalized universe, `N / 2` in integer arithmetic.
pub const UNIVERSE_HALF_WIDTH: f64 = (SET_COUNT / 2) as f64;

/// Ki is halved whenever an update pushes it above this value.
pub const KI_CEILING: f64 = 1.2;

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Gains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Gains { kp, ki, kd }
    }

    pub(crate) fn validate(&self) -> Result<(), FuzzyPidError> {
        if !(self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()) {
            return Err(FuzzyPidError::InvalidParameter(
                "initial gains must be finite numbers",
            ));
        }
        if self.kp < 0.0 || self.ki < 0.0 || self.kd < 0.0 {
            return Err(FuzzyPidError::InvalidParameter(
                "initial gains must be non-negative",
            ));
        }
        if self.ki > KI_CEILING {
            return Err(FuzzyPidError::InvalidParameter(
                "initial Ki must not exceed the Ki ceiling",
            ));
        }
        Ok(())
    }
}

/// Coefficients of the incremental PID recurrence
/// `du = A e(k) + B e(k-1) + C e(k-2)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Coefficients {
    pub fn from_gains(gains: &Gains) -> Self {
        Coefficients {
            a: gains.kp + gains.ki + gains.kd,
            b: -(2.0 * gains.kd + gains.kp),
            c: gains.kd,
        }
    }
}

/// Physical ranges mapped onto the fuzzy universes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniverseLimits {
    /// Largest expected error magnitude.
    pub e_max: f64,
    /// Largest expected error-rate magnitude.
    pub de_max: f64,
    /// Largest Kp change per cycle.
    pub delta_kp_max: f64,
    /// Largest Ki change per cycle.
    pub delta_ki_max: f64,
    /// Largest Kd change per cycle.
    pub delta_kd_max: f64,
}

impl UniverseLimits {
    pub(crate) fn validate(&self) -> Result<(), FuzzyPidError> {
        if !(self.e_max.is_finite() && self.e_max > 0.0) {
            return Err(FuzzyPidError::InvalidParameter(
                "e_max must be a positive finite number",
            ));
        }
        if !(self.de_max.is_finite() && self.de_max > 0.0) {
            return Err(FuzzyPidError::InvalidParameter(
                "de_max must be a positive finite number",
            ));
        }
        for delta in [self.delta_kp_max, self.delta_ki_max, self.delta_kd_max] {
            if !(delta.is_finite() && delta >= 0.0) {
                return Err(FuzzyPidError::InvalidParameter(
                    "gain delta limits must be non-negative finite numbers",
                ));
            }
        }
        // One halving per step must be enough to restore the ceiling
        if self.delta_ki_max > KI_CEILING {
            return Err(FuzzyPidError::InvalidParameter(
                "delta_ki_max must not exceed the Ki ceiling",
            ));
        }
        Ok(())
    }

    /// Per-cycle delta limits as an [`Adjustment`].
    pub fn delta_limits(&self) -> Adjustment {
        Adjustment {
            kp: self.delta_kp_max,
            ki: self.delta_ki_max,
            kd: self.delta_kd_max,
        }
    }
}

/// Scale factors between physical values and the normalized universe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniverseScales {
    pub ke: f64,
    pub kde: f64,
    pub ku_p: f64,
    pub ku_i: f64,
    pub ku_d: f64,
}

impl UniverseScales {
    pub fn from_limits(limits: &UniverseLimits) -> Self {
        UniverseScales {
            ke: UNIVERSE_HALF_WIDTH / limits.e_max,
            kde: UNIVERSE_HALF_WIDTH / limits.de_max,
            ku_p: limits.delta_kp_max / UNIVERSE_HALF_WIDTH,
            ku_i: limits.delta_ki_max / UNIVERSE_HALF_WIDTH,
            ku_d: limits.delta_kd_max / UNIVERSE_HALF_WIDTH,
        }
    }
}

/// Turns normalized rule outputs into bounded gain updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainAdapter {
    scales: UniverseScales,
    limits: Adjustment,
}

impl GainAdapter {
    pub fn new(limits: &UniverseLimits) -> Self {
        GainAdapter {
            scales: UniverseScales::from_limits(limits),
            limits: limits.delta_limits(),
        }
    }

    pub fn scales(&self) -> &UniverseScales {
        &self.scales
    }

    /// Scale, clamp and accumulate `normalized` into `gains`.
    ///
    /// Gains never drop below zero, and Ki is halved once it exceeds
    /// [`KI_CEILING`]. Returns the clamped deltas that were added.
    pub fn apply(&self, gains: &mut Gains, normalized: Adjustment) -> Adjustment {
        let delta = Adjustment {
            kp: bounded_delta(self.scales.ku_p * normalized.kp, self.limits.kp),
            ki: bounded_delta(self.scales.ku_i * normalized.ki, self.limits.ki),
            kd: bounded_delta(self.scales.ku_d * normalized.kd, self.limits.kd),
        };

        gains.kp = (gains.kp + delta.kp).max(0.0);
        gains.ki = (gains.ki + delta.ki).max(0.0);
        gains.kd = (gains.kd + delta.kd).max(0.0);

        if gains.ki > KI_CEILING {
            gains.ki /= 2.0;
        }

        delta
    }
}

fn bounded_delta(delta: f64, max: f64) -> f64 {
    if delta.is_nan() {
        0.0
    } else {
        delta.clamp(-max, max)
    }
}
