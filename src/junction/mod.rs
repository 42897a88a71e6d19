//! Josephson junction models.
//!
//! In normalized units a resistively and capacitively shunted junction obeys
//!
//! ```text
//! dφ/dt = v
//! b·dv/dt = i − v − sin(φ)
//! ```
//!
//! where `b` is the Stewart-McCumber damping constant (`b < 1` overdamped,
//! `b > 1` underdamped). [`Junction`] adds optional thermal noise and an
//! optional frequency-dependent shunt on top of this; [`JunctionArray`]
//! couples a grid of nodes through a shared damping matrix.
//!
//! Both implement [`Model`], the contract the sweep drivers consume.

mod array;
mod noise;
mod single;

pub use array::JunctionArray;
pub use noise::NoiseSource;
pub use single::{FrequencyCoupling, Junction, JunctionBuilder, ThermalNoise};

use std::f64::consts::TAU;
use std::fmt;

use crate::error::{JjsimError, Result};
use crate::solver::Method;
use crate::{DEFAULT_DT, DEFAULT_SETTLING_FRACTION};

/// Operations every simulated device exposes to a driver.
pub trait Model {
    /// Apply a bias current for `duration` time units and return the voltage
    /// averaged over the trailing settling window.
    fn apply_bias_current(&mut self, current: f64, duration: f64) -> Result<f64>;

    /// Apply a bias current for a single timestep and return the new
    /// `(phase, voltage)` pair.
    fn sample_phase_voltage(&mut self, current: f64) -> Result<(f64, f64)>;

    /// Variant tag.
    fn kind(&self) -> ModelKind;

    /// Human-readable summary of the physical parameters.
    fn info(&self) -> String;

    /// Dimensionless temperature (zero for noiseless models).
    fn temperature(&self) -> f64;

    /// Integration timestep.
    fn dt(&self) -> f64;
}

/// Which kind of device a model represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Plain shunted junction
    Simple,
    /// Junction with a thermal noise current
    Noisy,
    /// Junction with a frequency-dependent shunt
    FrequencyDependent,
    /// Frequency-dependent junction with thermal noise in both current paths
    NoisyFrequencyDependent,
    /// Grid of coupled junction nodes
    Array,
}

impl ModelKind {
    /// Short tag written into data file headers.
    pub fn tag(&self) -> &'static str {
        match self {
            ModelKind::Simple => "simple",
            ModelKind::Noisy => "noisy",
            ModelKind::FrequencyDependent => "freq dep",
            ModelKind::NoisyFrequencyDependent => "noisy freq dep",
            ModelKind::Array => "array",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Integration settings shared by every model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationConfig {
    /// Integration scheme.
    pub method: Method,
    /// Fixed timestep.
    pub dt: f64,
    /// Trailing fraction of a bias-current run that is averaged.
    pub settling_fraction: f64,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            method: Method::default(),
            dt: DEFAULT_DT,
            settling_fraction: DEFAULT_SETTLING_FRACTION,
        }
    }
}

impl IntegrationConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the integration scheme.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the timestep.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set the settling window as a fraction of each run.
    ///
    /// Earlier steps are treated as transient and discarded.
    /// - 0.4 (default): average over the last two fifths
    /// - 0.2: only the last fifth, for slowly settling junctions
    pub fn with_settling_fraction(mut self, fraction: f64) -> Self {
        self.settling_fraction = fraction;
        self
    }

    /// Check the settings before a model is built from them.
    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(JjsimError::invalid_parameter(
                "dt",
                format!("timestep must be positive, got {}", self.dt),
            ));
        }
        if !(self.settling_fraction > 0.0 && self.settling_fraction <= 1.0) {
            return Err(JjsimError::invalid_parameter(
                "settling_fraction",
                format!("must lie in (0, 1], got {}", self.settling_fraction),
            ));
        }
        Ok(())
    }

    /// Work out how many steps a run of `duration` takes and which of them
    /// are averaged.
    pub(crate) fn plan(&self, duration: f64) -> Result<RunPlan> {
        let steps = if duration.is_finite() && duration > 0.0 {
            step_count(duration, self.dt)
        } else {
            0
        };
        let window = (steps as f64 * self.settling_fraction).floor() as usize;
        if window == 0 {
            return Err(JjsimError::SettlingWindow {
                steps,
                fraction: self.settling_fraction,
            });
        }
        Ok(RunPlan {
            steps,
            window,
            window_start: steps - window,
        })
    }
}

/// Step schedule for one bias-current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunPlan {
    /// Total number of timesteps
    pub steps: usize,
    /// Number of trailing steps whose voltage is averaged
    pub window: usize,
    /// Index of the first averaged step
    pub window_start: usize,
}

/// `ceil(duration / dt)`, ignoring rounding noise in the quotient.
pub(crate) fn step_count(duration: f64, dt: f64) -> usize {
    let ratio = duration / dt;
    let nearest = ratio.round();
    if (ratio - nearest).abs() <= 1e-9 * nearest.max(1.0) {
        nearest as usize
    } else {
        ratio.ceil() as usize
    }
}

/// Reduce a phase to `[0, 2π)`.
pub fn wrap_phase(phase: f64) -> f64 {
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly 2π for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_phase_range() {
        for &p in &[0.0, -1e-18, -0.5, 7.0, -100.0, 1e6, TAU, -TAU, 3.0 * TAU + 0.25] {
            let w = wrap_phase(p);
            assert!((0.0..TAU).contains(&w), "{p} wrapped to {w}");
        }
        assert_eq!(wrap_phase(1.0), 1.0);
    }

    #[test]
    fn test_plan_counts_steps() {
        let config = IntegrationConfig::default();
        let plan = config.plan(1000.0).unwrap();
        assert_eq!(plan.steps, 100_000);
        assert_eq!(plan.window, 40_000);
        assert_eq!(plan.window_start, 60_000);

        // Partial steps round up
        let plan = config.plan(0.125).unwrap();
        assert_eq!(plan.steps, 13);
        assert_eq!(plan.window, 5);

        // 0.07 / 0.01 evaluates just above 7
        assert_eq!(config.plan(0.07).unwrap().steps, 7);
    }

    #[test]
    fn test_plan_empty_window() {
        let config = IntegrationConfig::default();
        assert!(matches!(
            config.plan(0.02),
            Err(JjsimError::SettlingWindow { steps: 2, .. })
        ));
        assert!(config.plan(0.0).is_err());
        assert!(config.plan(-5.0).is_err());
        assert!(config.plan(f64::NAN).is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(IntegrationConfig::default().validate().is_ok());
        assert!(IntegrationConfig::default().with_dt(0.0).validate().is_err());
        assert!(IntegrationConfig::default().with_dt(-0.1).validate().is_err());
        assert!(IntegrationConfig::default()
            .with_settling_fraction(0.0)
            .validate()
            .is_err());
        assert!(IntegrationConfig::default()
            .with_settling_fraction(1.5)
            .validate()
            .is_err());
        assert!(IntegrationConfig::default()
            .with_settling_fraction(1.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(ModelKind::Simple.to_string(), "simple");
        assert_eq!(ModelKind::NoisyFrequencyDependent.tag(), "noisy freq dep");
    }
}
