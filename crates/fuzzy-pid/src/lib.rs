// fuzzy-pid: A self-tuning fuzzy PID controller library written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::Arc;
use std::sync::Mutex;

use log::{debug, trace, warn};

pub mod gains;
pub mod inference;
pub mod membership;
pub mod partition;
pub mod rules;

#[cfg(feature = "debugging")]
mod debug;

#[cfg(feature = "debugging")]
pub use debug::{ControllerDebugger, DebugConfig, TuningSnapshot};

pub use gains::{Coefficients, GainAdapter, Gains, UniverseLimits, UniverseScales, KI_CEILING};
pub use inference::Adjustment;
pub use membership::{Gaussian, MembershipFunction, ShapeKind, Trapezoid, Triangle};
pub use partition::{Activation, ActiveSet, LinguisticPartition, Partitions, SET_COUNT};
pub use rules::{Level, RuleTable, RuleTables};

/// The control increment is kept within this fraction of the target.
pub const OUTPUT_BOUND_RATIO: f64 = 0.95;

/// Error type for fuzzy PID configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum FuzzyPidError {
    /// Invalid parameter value (NaN, infinity, or out of allowed range)
    InvalidParameter(&'static str),
    /// Unknown membership shape identifier
    InvalidShape(String),
    /// Parameter sequence of the wrong length for its shape
    ParameterCount { expected: usize, actual: usize },
    /// Shape that inference cannot evaluate for an input variable
    UnsupportedShape(ShapeKind),
    /// Rule level outside of -3..=3
    InvalidRuleLevel(i32),
    /// Rule table that is not 7 x 7
    RuleTableShape { rows: usize, cols: usize },
    /// Mutex was poisoned, indicating a panic in another thread
    MutexPoisoned,
}

impl std::fmt::Display for FuzzyPidError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FuzzyPidError::InvalidParameter(param) => write!(f, "Invalid parameter: {}", param),
            FuzzyPidError::InvalidShape(shape) => {
                write!(f, "Invalid membership shape: {:?}", shape)
            }
            FuzzyPidError::ParameterCount { expected, actual } => write!(
                f,
                "Expected {} membership parameters, got {}",
                expected, actual
            ),
            FuzzyPidError::UnsupportedShape(shape) => write!(
                f,
                "Membership shape {} is not supported for inference inputs",
                shape
            ),
            FuzzyPidError::InvalidRuleLevel(level) => {
                write!(f, "Rule level {} is outside of -3..=3", level)
            }
            FuzzyPidError::RuleTableShape { rows, cols } => write!(
                f,
                "Rule table must be {n}x{n}, got {}x{}",
                rows,
                cols,
                n = SET_COUNT
            ),
            FuzzyPidError::MutexPoisoned => write!(f, "Mutex was poisoned"),
        }
    }
}

impl std::error::Error for FuzzyPidError {}

/// Configuration for a fuzzy PID controller.
///
/// Uses a builder pattern; validation happens in [`FuzzyPidController::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    limits: UniverseLimits,
    initial_gains: Gains,
    rule_tables: RuleTables,
    partitions: Partitions,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            limits: UniverseLimits {
                e_max: 1200.0,
                de_max: 650.0,
                delta_kp_max: 0.3,
                delta_ki_max: 1.0,
                delta_kd_max: 0.6,
            },
            initial_gains: Gains::new(0.01, 0.02, 0.01),
            rule_tables: RuleTables::default(),
            partitions: Partitions::default(),
        }
    }
}

impl ControllerConfig {
    /// Create a configuration with the default ranges, gains, rule tables
    /// and standard triangular partitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the error magnitude mapped onto the edge of the fuzzy universe.
    pub fn with_error_limit(mut self, e_max: f64) -> Self {
        self.limits.e_max = e_max;
        self
    }

    /// Set the error-rate magnitude mapped onto the edge of the fuzzy universe.
    pub fn with_error_rate_limit(mut self, de_max: f64) -> Self {
        self.limits.de_max = de_max;
        self
    }

    /// Set the largest change of Kp, Ki and Kd allowed in a single cycle.
    pub fn with_delta_limits(mut self, kp: f64, ki: f64, kd: f64) -> Self {
        self.limits.delta_kp_max = kp;
        self.limits.delta_ki_max = ki;
        self.limits.delta_kd_max = kd;
        self
    }

    /// Set all five universe limits at once.
    pub fn with_universe_limits(mut self, limits: UniverseLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the gains the controller starts from (and returns to on reset).
    pub fn with_initial_gains(mut self, kp: f64, ki: f64, kd: f64) -> Self {
        self.initial_gains = Gains::new(kp, ki, kd);
        self
    }

    pub fn with_rule_tables(mut self, tables: RuleTables) -> Self {
        self.rule_tables = tables;
        self
    }

    pub fn with_partitions(mut self, partitions: Partitions) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn limits(&self) -> &UniverseLimits {
        &self.limits
    }

    pub fn initial_gains(&self) -> &Gains {
        &self.initial_gains
    }

    fn validate(&self) -> Result<(), FuzzyPidError> {
        self.limits.validate()?;
        self.initial_gains.validate()?;
        self.partitions.validate()
    }
}

/// Statistics about the controller's performance, counted in cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStatistics {
    pub cycles: u64,                  // Number of completed steps
    pub average_error: f64,           // Average absolute error
    pub max_error: f64,               // Largest absolute error seen
    pub rise_cycles: Option<u64>,     // Cycle the error first fell inside the threshold
    pub settling_cycles: Option<u64>, // Cycle since which it stayed inside
}

/// A non-thread-safe self-tuning fuzzy PID controller.
///
/// Please use ThreadSafeFuzzyPidController when a controller has to be
/// shared between threads.
///
/// Every call to [`step`](Self::step) runs one cycle of:
/// 1. scale the error and its change onto the fuzzy universe `[-3, 3]`
/// 2. fuzzify both against their linguistic partitions
/// 3. infer normalized Kp/Ki/Kd adjustments from the rule tables
/// 4. scale, clamp and accumulate them into the running gains
/// 5. evaluate the incremental PID law
///    `du = (A e(k) + B e(k-1) + C e(k-2)) / Ke`
///
/// where `A = Kp + Ki + Kd`, `B = -(2 Kd + Kp)` and `C = Kd`.
pub struct FuzzyPidController {
    config: ControllerConfig,
    adapter: GainAdapter,
    gains: Gains,
    coefficients: Coefficients,
    last_adjustment: Adjustment,

    target: f64,
    actual: f64,
    error: f64,       // Scaled error of the latest cycle
    error_rate: f64,  // Scaled error rate of the latest cycle
    error_prev1: f64, // Scaled error one cycle back
    error_prev2: f64, // Scaled error two cycles back
    last_output: f64,

    // Statistics tracking
    cycle_count: u64,
    error_sum: f64,
    max_error: f64,
    rise_cycle: Option<u64>,
    settle_cycle: Option<u64>,
    settled_threshold: f64, // Absolute error threshold for considering "settled"

    // Debugging
    #[cfg(feature = "debugging")]
    debugger: Option<ControllerDebugger>,
}

impl FuzzyPidController {
    /// Create a controller, rejecting invalid ranges, gains or partitions.
    pub fn new(config: ControllerConfig) -> Result<Self, FuzzyPidError> {
        config.validate()?;

        let adapter = GainAdapter::new(&config.limits);
        let gains = config.initial_gains;
        debug!(
            "fuzzy PID controller created: gains {:?}, scales {:?}",
            gains,
            adapter.scales()
        );

        Ok(FuzzyPidController {
            adapter,
            gains,
            coefficients: Coefficients::from_gains(&gains),
            last_adjustment: Adjustment::default(),
            target: 0.0,
            actual: 0.0,
            error: 0.0,
            error_rate: 0.0,
            error_prev1: 0.0,
            error_prev2: 0.0,
            last_output: 0.0,
            cycle_count: 0,
            error_sum: 0.0,
            max_error: 0.0,
            rise_cycle: None,
            settle_cycle: None,
            settled_threshold: 0.05,
            #[cfg(feature = "debugging")]
            debugger: None,
            config,
        })
    }

    /// Run one control cycle and return the control increment.
    ///
    /// # Arguments
    /// * `target` - The commanded value for this cycle
    /// * `measurement` - The measured process value
    ///
    /// # Returns
    /// The increment to add to the process input. It is bounded by
    /// `±0.95 * |target|` unless the target is zero.
    ///
    /// # Note
    /// The error rate is the difference between consecutive calls, not a
    /// derivative over time; call at a fixed cadence. A cycle with a
    /// non-finite target or measurement is skipped and returns 0.
    ///
    /// The default rule tables assume a positive target approached from
    /// below. With a negative target they can drive the process away from
    /// it; the output bound still holds.
    pub fn step(&mut self, target: f64, measurement: f64) -> f64 {
        if !(target.is_finite() && measurement.is_finite()) {
            warn!(
                "skipping cycle with non-finite input: target {}, measurement {}",
                target, measurement
            );
            return 0.0;
        }

        self.target = target;
        self.actual = measurement;

        let raw_error = target - measurement;
        self.update_statistics(raw_error);

        // The rate is taken against the stored (scaled) previous error
        // before the current error is scaled.
        let raw_rate = raw_error - self.error_prev1;
        let scales = *self.adapter.scales();
        self.error = scales.ke * raw_error;
        self.error_rate = scales.kde * raw_rate;

        let partitions = &self.config.partitions;
        let error_sets = partitions.error.fuzzify(self.error);
        let rate_sets = partitions.error_rate.fuzzify(self.error_rate);
        let normalized = inference::infer(&self.config.rule_tables, &error_sets, &rate_sets);

        self.last_adjustment = self.adapter.apply(&mut self.gains, normalized);
        self.coefficients = Coefficients::from_gains(&self.gains);

        let Coefficients { a, b, c } = self.coefficients;
        let mut output =
            (a * self.error + b * self.error_prev1 + c * self.error_prev2) / scales.ke;
        if output.is_nan() {
            output = 0.0;
        }
        if target != 0.0 {
            let bound = OUTPUT_BOUND_RATIO * target.abs();
            output = output.clamp(-bound, bound);
        }

        self.error_prev2 = self.error_prev1;
        self.error_prev1 = self.error;
        self.last_output = output;

        trace!(
            "cycle {}: e {:.6}, de {:.6}, gains {:?}, output {:.6}",
            self.cycle_count,
            self.error,
            self.error_rate,
            self.gains,
            output
        );

        #[cfg(feature = "debugging")]
        if let Some(mut debugger) = self.debugger.take() {
            debugger.log_cycle(self);
            self.debugger = Some(debugger);
        }

        output
    }

    /// Reset gains to their initial values and clear history and statistics.
    pub fn reset(&mut self) {
        self.gains = self.config.initial_gains;
        self.coefficients = Coefficients::from_gains(&self.gains);
        self.last_adjustment = Adjustment::default();
        self.target = 0.0;
        self.actual = 0.0;
        self.error = 0.0;
        self.error_rate = 0.0;
        self.error_prev1 = 0.0;
        self.error_prev2 = 0.0;
        self.last_output = 0.0;
        self.cycle_count = 0;
        self.error_sum = 0.0;
        self.max_error = 0.0;
        self.rise_cycle = None;
        self.settle_cycle = None;
        debug!("fuzzy PID controller reset to gains {:?}", self.gains);
    }

    /// Replace the three rule tables.
    pub fn set_rule_tables(&mut self, tables: RuleTables) {
        self.config.rule_tables = tables;
        debug!("rule tables replaced");
    }

    /// Replace the five linguistic partitions.
    ///
    /// # Returns
    ///
    /// An error, leaving the current partitions untouched, if the error or
    /// error-rate partition is not triangular.
    pub fn set_partitions(&mut self, partitions: Partitions) -> Result<(), FuzzyPidError> {
        partitions.validate()?;
        self.config.partitions = partitions;
        debug!("linguistic partitions replaced");
        Ok(())
    }

    pub fn kp(&self) -> f64 {
        self.gains.kp
    }

    pub fn ki(&self) -> f64 {
        self.gains.ki
    }

    pub fn kd(&self) -> f64 {
        self.gains.kd
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    /// The A, B and C coefficients derived from the current gains.
    pub fn coefficients(&self) -> Coefficients {
        self.coefficients
    }

    /// The gain deltas applied in the latest cycle.
    pub fn last_adjustment(&self) -> Adjustment {
        self.last_adjustment
    }

    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    pub fn scales(&self) -> &UniverseScales {
        self.adapter.scales()
    }

    pub fn limits(&self) -> &UniverseLimits {
        &self.config.limits
    }

    pub fn rule_tables(&self) -> &RuleTables {
        &self.config.rule_tables
    }

    pub fn partitions(&self) -> &Partitions {
        &self.config.partitions
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn actual(&self) -> f64 {
        self.actual
    }

    /// Scaled error of the latest cycle.
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Scaled error rate of the latest cycle.
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Scaled errors one and two cycles back, as used by the next cycle.
    pub fn error_history(&self) -> (f64, f64) {
        (self.error_prev1, self.error_prev2)
    }

    /// Get the controller statistics.
    pub fn get_statistics(&self) -> ControllerStatistics {
        let average_error = if self.cycle_count > 0 {
            self.error_sum / self.cycle_count as f64
        } else {
            0.0
        };

        ControllerStatistics {
            cycles: self.cycle_count,
            average_error,
            max_error: self.max_error,
            rise_cycles: self.rise_cycle,
            settling_cycles: self.settle_cycle,
        }
    }

    /// Set the absolute error threshold for considering the system "settled".
    pub fn set_settled_threshold(&mut self, threshold: f64) -> Result<(), FuzzyPidError> {
        if !threshold.is_finite() {
            return Err(FuzzyPidError::InvalidParameter(
                "settled threshold must be a finite number",
            ));
        }
        self.settled_threshold = threshold.abs();
        Ok(())
    }

    fn update_statistics(&mut self, error: f64) {
        self.cycle_count += 1;
        self.error_sum += error.abs();

        if error.abs() > self.max_error {
            self.max_error = error.abs();
        }

        let inside = error.abs() <= self.settled_threshold;
        if inside && self.rise_cycle.is_none() {
            self.rise_cycle = Some(self.cycle_count);
        }

        if inside {
            if self.settle_cycle.is_none() {
                self.settle_cycle = Some(self.cycle_count);
            }
        } else {
            // Leaving the band after settling restarts the settling clock
            self.settle_cycle = None;
        }
    }

    #[cfg(feature = "debugging")]
    pub fn with_debugging(mut self, debug_config: DebugConfig) -> Self {
        self.debugger = Some(ControllerDebugger::new(debug_config));
        self
    }
}

/// Thread-safe version of the fuzzy PID controller.
///
/// Lets a sampling thread drive the controller while another thread reads
/// its gains and statistics. Calls are serialized; the control law itself
/// still expects one caller stepping it at a regular cadence.
pub struct ThreadSafeFuzzyPidController {
    controller: Arc<Mutex<FuzzyPidController>>,
}

impl Clone for ThreadSafeFuzzyPidController {
    fn clone(&self) -> Self {
        ThreadSafeFuzzyPidController {
            controller: Arc::clone(&self.controller),
        }
    }
}

impl ThreadSafeFuzzyPidController {
    /// Create a new thread-safe fuzzy PID controller.
    pub fn new(config: ControllerConfig) -> Result<Self, FuzzyPidError> {
        Ok(ThreadSafeFuzzyPidController {
            controller: Arc::new(Mutex::new(FuzzyPidController::new(config)?)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FuzzyPidController>, FuzzyPidError> {
        self.controller
            .lock()
            .map_err(|_| FuzzyPidError::MutexPoisoned)
    }

    /// Run one control cycle, see [`FuzzyPidController::step`].
    pub fn step(&self, target: f64, measurement: f64) -> Result<f64, FuzzyPidError> {
        let mut controller = self.lock()?;
        Ok(controller.step(target, measurement))
    }

    /// Reset the controller state.
    pub fn reset(&self) -> Result<(), FuzzyPidError> {
        self.lock()?.reset();
        Ok(())
    }

    /// Get the increment returned by the latest cycle.
    pub fn get_control_signal(&self) -> Result<f64, FuzzyPidError> {
        Ok(self.lock()?.last_output())
    }

    pub fn gains(&self) -> Result<Gains, FuzzyPidError> {
        Ok(self.lock()?.gains())
    }

    pub fn coefficients(&self) -> Result<Coefficients, FuzzyPidError> {
        Ok(self.lock()?.coefficients())
    }

    pub fn set_rule_tables(&self, tables: RuleTables) -> Result<(), FuzzyPidError> {
        self.lock()?.set_rule_tables(tables);
        Ok(())
    }

    pub fn set_partitions(&self, partitions: Partitions) -> Result<(), FuzzyPidError> {
        self.lock()?.set_partitions(partitions)
    }

    /// Get the controller statistics.
    pub fn get_statistics(&self) -> Result<ControllerStatistics, FuzzyPidError> {
        Ok(self.lock()?.get_statistics())
    }

    /// Configure debugging if the debugging feature is enabled
    #[cfg(feature = "debugging")]
    pub fn with_debugging(self, debug_config: DebugConfig) -> Result<Self, FuzzyPidError> {
        self.lock()?.debugger = Some(ControllerDebugger::new(debug_config));
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn reference_controller() -> FuzzyPidController {
        FuzzyPidController::new(ControllerConfig::new()).unwrap()
    }

    #[test]
    fn test_first_cycle() {
        let mut controller = reference_controller();

        let output = controller.step(500.0, 0.0);

        // e = 3/1200 * 500, de = 3/650 * 500
        assert!((controller.error() - 1.25).abs() < 1e-12);
        assert!((controller.error_rate() - 500.0 * 3.0 / 650.0).abs() < 1e-12);
        assert!((output - 468.846153846153).abs() < 1e-9);

        // Kp was driven to zero, Ki and Kd grew
        assert_eq!(controller.kp(), 0.0);
        assert!((controller.ki() - 0.846923076923077).abs() < 1e-9);
        assert!((controller.kd() - 0.090769230769231).abs() < 1e-9);

        let c = controller.coefficients();
        assert!((c.a - (controller.kp() + controller.ki() + controller.kd())).abs() < 1e-15);
        assert!((c.b + 2.0 * controller.kd() + controller.kp()).abs() < 1e-15);
        assert_eq!(c.c, controller.kd());

        // History shifted exactly once
        assert_eq!(controller.error_history(), (controller.error(), 0.0));
        assert_eq!(controller.target(), 500.0);
        assert_eq!(controller.actual(), 0.0);
    }

    #[test]
    fn test_convergence_to_target() {
        let mut controller = reference_controller();
        let limits = *controller.limits();

        let target = 500.0;
        let mut actual = 0.0;
        let mut previous = actual;

        for _ in 0..60 {
            let output = controller.step(target, actual);
            actual += output;

            // Monotonic approach from below
            assert!(actual >= previous - 1e-9, "{} fell below {}", actual, previous);
            assert!(actual <= target + 1e-9, "{} overshot the target", actual);
            assert!(output.abs() <= OUTPUT_BOUND_RATIO * target);

            let delta = controller.last_adjustment();
            assert!(delta.kp.abs() <= limits.delta_kp_max);
            assert!(delta.ki.abs() <= limits.delta_ki_max);
            assert!(delta.kd.abs() <= limits.delta_kd_max);

            let gains = controller.gains();
            assert!(gains.kp >= 0.0 && gains.ki >= 0.0 && gains.kd >= 0.0);
            assert!(gains.ki <= KI_CEILING);

            previous = actual;
        }

        assert!((actual - target).abs() < 1e-6);
    }

    #[test]
    fn test_zero_error_steady_state() {
        let mut controller = reference_controller();

        for _ in 0..10 {
            let output = controller.step(500.0, 500.0);
            assert_eq!(output, 0.0);
        }

        // Only the zero set fires, so Kp and Ki are left alone
        assert_eq!(controller.kp(), 0.01);
        assert_eq!(controller.ki(), 0.02);
        assert_eq!(controller.error_history(), (0.0, 0.0));
    }

    #[test]
    fn test_output_settles_after_reaching_target() {
        let mut controller = reference_controller();
        let mut actual = 0.0;
        for _ in 0..30 {
            actual += controller.step(500.0, actual);
        }

        let mut outputs = Vec::new();
        for _ in 0..5 {
            outputs.push(controller.step(500.0, 500.0).abs());
        }
        assert!(outputs.iter().all(|o| *o < 1e-6));
    }

    #[test]
    fn test_determinism() {
        let mut first = reference_controller();
        let mut second = reference_controller();

        let samples = [(500.0, 0.0), (500.0, 480.0), (520.0, 505.0), (10.0, 30.0)];
        for &(target, measurement) in samples.iter().cycle().take(40) {
            let a = first.step(target, measurement);
            let b = second.step(target, measurement);
            assert_eq!(a.to_bits(), b.to_bits());
            assert_eq!(first.gains(), second.gains());
        }
    }

    #[test]
    fn test_output_bound() {
        let mut controller = reference_controller();

        // Error far beyond the rate universe: no adjustment, large raw output
        let output = controller.step(1.0, -1000.0);
        assert_eq!(output, OUTPUT_BOUND_RATIO);
        assert_eq!(controller.last_adjustment(), Adjustment::default());
        assert_eq!(controller.gains(), Gains::new(0.01, 0.02, 0.01));

        let output = controller.step(-1.0, 1000.0);
        assert!(output.abs() <= OUTPUT_BOUND_RATIO);
    }

    #[test]
    fn test_zero_target_skips_clamp() {
        let mut controller = reference_controller();

        let output = controller.step(0.0, 10.0);
        assert!(output.is_finite());
        assert!((output + 0.171153846153846).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_input_is_ignored() {
        let mut controller = reference_controller();
        controller.step(500.0, 0.0);
        let gains = controller.gains();
        let history = controller.error_history();

        assert_eq!(controller.step(f64::NAN, 0.0), 0.0);
        assert_eq!(controller.step(500.0, f64::INFINITY), 0.0);

        assert_eq!(controller.gains(), gains);
        assert_eq!(controller.error_history(), history);
        assert_eq!(controller.get_statistics().cycles, 1);
    }

    #[test]
    fn test_reset() {
        let mut controller = reference_controller();
        let mut actual = 0.0;
        for _ in 0..5 {
            actual += controller.step(500.0, actual);
        }
        assert_ne!(controller.gains(), Gains::new(0.01, 0.02, 0.01));

        controller.reset();

        assert_eq!(controller.gains(), Gains::new(0.01, 0.02, 0.01));
        assert_eq!(controller.error_history(), (0.0, 0.0));
        assert_eq!(controller.get_statistics().cycles, 0);

        // A reset controller replays the same sequence
        let mut fresh = reference_controller();
        assert_eq!(controller.step(500.0, 0.0), fresh.step(500.0, 0.0));
    }

    #[test]
    fn test_config_validation() {
        assert!(FuzzyPidController::new(ControllerConfig::new().with_error_limit(0.0)).is_err());
        assert!(
            FuzzyPidController::new(ControllerConfig::new().with_error_rate_limit(f64::NAN))
                .is_err()
        );
        assert!(
            FuzzyPidController::new(ControllerConfig::new().with_delta_limits(0.3, -1.0, 0.6))
                .is_err()
        );
        assert_eq!(
            FuzzyPidController::new(ControllerConfig::new().with_initial_gains(-0.1, 0.0, 0.0))
                .err(),
            Some(FuzzyPidError::InvalidParameter(
                "initial gains must be non-negative"
            ))
        );

        // One halving cannot bring these back under the Ki ceiling
        assert_eq!(
            FuzzyPidController::new(ControllerConfig::new().with_initial_gains(0.01, 5.0, 0.01))
                .err(),
            Some(FuzzyPidError::InvalidParameter(
                "initial Ki must not exceed the Ki ceiling"
            ))
        );
        assert_eq!(
            FuzzyPidController::new(ControllerConfig::new().with_delta_limits(0.3, 2.0, 0.6))
                .err(),
            Some(FuzzyPidError::InvalidParameter(
                "delta_ki_max must not exceed the Ki ceiling"
            ))
        );
        assert!(FuzzyPidController::new(
            ControllerConfig::new()
                .with_initial_gains(0.0, KI_CEILING, 0.0)
                .with_delta_limits(0.3, KI_CEILING, 0.6)
        )
        .is_ok());

        let gaussian: Vec<f64> = (0..SET_COUNT).flat_map(|i| [0.5, i as f64 - 3.0]).collect();
        let partitions = Partitions {
            error_rate: LinguisticPartition::from_flat(ShapeKind::Gaussian, &gaussian).unwrap(),
            ..Partitions::default()
        };
        let config = ControllerConfig::new().with_partitions(partitions.clone());
        assert_eq!(
            FuzzyPidController::new(config).err(),
            Some(FuzzyPidError::UnsupportedShape(ShapeKind::Gaussian))
        );

        let mut controller = reference_controller();
        assert!(controller.set_partitions(partitions).is_err());
        assert_eq!(controller.partitions(), &Partitions::default());
    }

    #[test]
    fn test_output_partitions_are_inert() {
        let gaussian: Vec<f64> = (0..SET_COUNT).flat_map(|i| [0.5, i as f64 - 3.0]).collect();
        let odd_output = LinguisticPartition::from_flat(ShapeKind::Gaussian, &gaussian).unwrap();
        let partitions = Partitions {
            delta_kp: odd_output.clone(),
            delta_ki: odd_output.clone(),
            delta_kd: odd_output,
            ..Partitions::default()
        };

        let mut plain = reference_controller();
        let mut custom =
            FuzzyPidController::new(ControllerConfig::new().with_partitions(partitions)).unwrap();

        let mut actual = 0.0;
        for _ in 0..10 {
            let a = plain.step(500.0, actual);
            let b = custom.step(500.0, actual);
            assert_eq!(a, b);
            actual += a;
        }
    }

    #[test]
    fn test_custom_rule_tables() {
        let zero = RuleTable::from_grid(&[[0; 7]; 7]).unwrap();
        let tables = RuleTables {
            kp: zero,
            ki: zero,
            kd: zero,
        };

        let mut controller = reference_controller();
        controller.set_rule_tables(tables);
        assert_eq!(controller.rule_tables(), &tables);

        // With all-zero rules the gains are frozen
        let mut actual = 0.0;
        for _ in 0..5 {
            actual += controller.step(500.0, actual);
            assert_eq!(controller.gains(), Gains::new(0.01, 0.02, 0.01));
        }
    }

    #[test]
    fn test_ki_ceiling_with_aggressive_rules() {
        let push_up = RuleTable::from_grid(&[[3; 7]; 7]).unwrap();
        let tables = RuleTables {
            kp: push_up,
            ki: push_up,
            kd: push_up,
        };
        let config = ControllerConfig::new().with_rule_tables(tables);
        let mut controller = FuzzyPidController::new(config).unwrap();

        let mut actual = 0.0;
        for _ in 0..50 {
            actual += controller.step(500.0, actual);
            assert!(controller.ki() <= KI_CEILING);
            assert!(controller.ki() >= 0.0);
        }
    }

    #[test]
    fn test_statistics() {
        let mut controller = reference_controller();
        let mut actual = 0.0;

        for _ in 0..10 {
            actual += controller.step(500.0, actual);
        }

        let stats = controller.get_statistics();
        assert_eq!(stats.cycles, 10);
        assert_eq!(stats.max_error, 500.0);
        assert!(stats.average_error > 0.0);
        // Errors seen: 500, 31.2, 2.6, 0.21, 0.016, ...
        assert_eq!(stats.rise_cycles, Some(5));
        assert_eq!(stats.settling_cycles, Some(5));

        // A disturbance restarts the settling count
        controller.step(500.0, 400.0);
        assert_eq!(controller.get_statistics().settling_cycles, None);
        assert_eq!(controller.get_statistics().rise_cycles, Some(5));

        assert!(controller.set_settled_threshold(f64::NAN).is_err());
        assert!(controller.set_settled_threshold(-1.0).is_ok());
    }

    #[test]
    fn test_thread_safe_controller() {
        let controller = ThreadSafeFuzzyPidController::new(ControllerConfig::new()).unwrap();

        // Clone controller for thread
        let thread_controller = controller.clone();

        let handle = thread::spawn(move || {
            let mut actual = 0.0;
            for _ in 0..50 {
                match thread_controller.step(500.0, actual) {
                    Ok(output) => actual += output,
                    Err(e) => panic!("Failed to step: {:?}", e),
                }
                thread::sleep(Duration::from_millis(1));
            }
            actual
        });

        // Meanwhile, read from the controller in the main thread
        for _ in 0..10 {
            let gains = controller.gains().expect("Failed to read gains");
            assert!(gains.kp >= 0.0 && gains.ki >= 0.0 && gains.kd >= 0.0);
            let _ = controller
                .get_control_signal()
                .expect("Failed to get control signal");
            thread::sleep(Duration::from_millis(5));
        }

        let actual = handle.join().unwrap();
        assert!((actual - 500.0).abs() < 1e-6);

        let stats = controller
            .get_statistics()
            .expect("Failed to get statistics");
        assert_eq!(stats.cycles, 50);

        controller.reset().unwrap();
        assert_eq!(controller.get_statistics().unwrap().cycles, 0);
        assert_eq!(controller.get_control_signal().unwrap(), 0.0);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            FuzzyPidError::RuleTableShape { rows: 6, cols: 7 }.to_string(),
            "Rule table must be 7x7, got 6x7"
        );
        assert_eq!(
            FuzzyPidError::UnsupportedShape(ShapeKind::Gaussian).to_string(),
            "Membership shape gaussmf is not supported for inference inputs"
        );
    }
}
