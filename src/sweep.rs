//! Bias-current sweeps over ensembles of models.
//!
//! A sweep drives every model through the same sequence of currents and
//! records the ensemble-averaged voltage at each point. Models keep their
//! state between points, so a downward sweep after an upward one traces the
//! hysteresis of underdamped junctions.

use tracing::trace;

use crate::error::{JjsimError, Result};
use crate::junction::{step_count, Model};

/// Largest number of currents a single sweep direction may visit.
pub const MAX_SWEEP_POINTS: usize = 10_000_000;

/// A range of bias currents `start, start + step, ...` below `stop`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRange {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl SweepRange {
    /// Create a range, checking that it is finite, has a positive step and
    /// visits at most [`MAX_SWEEP_POINTS`] currents.
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(JjsimError::invalid_parameter(
                "step",
                format!("current step must be positive, got {step}"),
            ));
        }
        if !(start.is_finite() && stop.is_finite()) {
            return Err(JjsimError::invalid_parameter(
                "range",
                format!("current range must be finite, got {start}..{stop}"),
            ));
        }
        let span = (stop - start).max(0.0) / step;
        if span > MAX_SWEEP_POINTS as f64 {
            return Err(JjsimError::invalid_parameter(
                "step",
                format!(
                    "{start}..{stop} in steps of {step} exceeds {MAX_SWEEP_POINTS} points"
                ),
            ));
        }
        Ok(Self { start, stop, step })
    }

    /// Currents from `start` while below `stop`.
    pub fn upward(&self) -> Vec<f64> {
        (0..=MAX_SWEEP_POINTS)
            .map(|k| self.start + k as f64 * self.step)
            .take_while(|&i| i < self.stop)
            .collect()
    }

    /// Currents from `stop` while above `start`.
    pub fn downward(&self) -> Vec<f64> {
        (0..=MAX_SWEEP_POINTS)
            .map(|k| self.stop - k as f64 * self.step)
            .take_while(|&i| i > self.start)
            .collect()
    }
}

/// Result of driving every model at one bias current.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    /// Applied bias current
    pub current: f64,
    /// Mean of the individual voltages
    pub mean_voltage: f64,
    /// Average voltage of each model, in model order
    pub voltages: Vec<f64>,
}

/// Apply one current to every model.
fn sweep_point<M: Model>(models: &mut [M], current: f64, duration: f64) -> Result<SweepPoint> {
    let voltages = models
        .iter_mut()
        .map(|m| m.apply_bias_current(current, duration))
        .collect::<Result<Vec<f64>>>()?;
    let mean_voltage = voltages.iter().sum::<f64>() / voltages.len() as f64;
    trace!(current, mean_voltage, "sweep point");
    Ok(SweepPoint {
        current,
        mean_voltage,
        voltages,
    })
}

fn sweep<M: Model>(models: &mut [M], duration: f64, currents: &[f64]) -> Result<Vec<SweepPoint>> {
    if models.is_empty() {
        return Err(JjsimError::invalid_parameter(
            "models",
            "a sweep needs at least one model",
        ));
    }
    currents
        .iter()
        .map(|&i| sweep_point(models, i, duration))
        .collect()
}

/// IV curve: raise the current through `range` and record each point.
pub fn iv_curve<M: Model>(
    models: &mut [M],
    duration: f64,
    range: &SweepRange,
) -> Result<Vec<SweepPoint>> {
    sweep(models, duration, &range.upward())
}

/// Hysteresis loop: the upward IV curve followed by the downward return.
pub fn hysteresis<M: Model>(
    models: &mut [M],
    duration: f64,
    range: &SweepRange,
) -> Result<Vec<SweepPoint>> {
    let mut currents = range.upward();
    currents.extend(range.downward());
    sweep(models, duration, &currents)
}

/// Trace a phase portrait at constant bias.
///
/// Steps the model one timestep at a time for `duration`, keeping every
/// `every`-th `(phase, voltage)` sample. `stop` is checked after each step
/// and ends the trace early when it returns true.
pub fn phase_portrait<M, F>(
    model: &mut M,
    current: f64,
    duration: f64,
    every: usize,
    mut stop: F,
) -> Result<Vec<(f64, f64)>>
where
    M: Model + ?Sized,
    F: FnMut(f64, f64) -> bool,
{
    if every == 0 {
        return Err(JjsimError::invalid_parameter(
            "every",
            "sample interval must be at least 1",
        ));
    }
    if !(duration.is_finite() && duration >= 0.0) {
        return Err(JjsimError::invalid_parameter(
            "duration",
            format!("must be non-negative, got {duration}"),
        ));
    }

    let steps = step_count(duration, model.dt());
    let mut samples = Vec::with_capacity(steps / every + 1);
    for n in 1..=steps {
        let (phase, voltage) = model.sample_phase_voltage(current)?;
        if n % every == 0 {
            samples.push((phase, voltage));
        }
        if stop(phase, voltage) {
            break;
        }
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::junction::{IntegrationConfig, Junction, ModelKind};

    /// Model whose voltage is its bias current.
    struct Ohmic {
        calls: usize,
        dt: f64,
    }

    impl Ohmic {
        fn new() -> Self {
            Self { calls: 0, dt: 0.5 }
        }
    }

    impl Model for Ohmic {
        fn apply_bias_current(&mut self, current: f64, _duration: f64) -> Result<f64> {
            self.calls += 1;
            Ok(current)
        }

        fn sample_phase_voltage(&mut self, current: f64) -> Result<(f64, f64)> {
            self.calls += 1;
            Ok((self.calls as f64, current))
        }

        fn kind(&self) -> ModelKind {
            ModelKind::Simple
        }

        fn info(&self) -> String {
            "ohmic".to_string()
        }

        fn temperature(&self) -> f64 {
            0.0
        }

        fn dt(&self) -> f64 {
            self.dt
        }
    }

    #[test]
    fn test_range_upward_and_downward() {
        let range = SweepRange::new(0.0, 1.0, 0.25).unwrap();
        assert_eq!(range.upward(), vec![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(range.downward(), vec![1.0, 0.75, 0.5, 0.25]);
    }

    #[test]
    fn test_range_validation() {
        assert!(SweepRange::new(0.0, 1.0, 0.0).is_err());
        assert!(SweepRange::new(0.0, 1.0, -0.1).is_err());
        assert!(SweepRange::new(f64::NAN, 1.0, 0.1).is_err());
        assert!(SweepRange::new(2.0, 1.0, 0.1).unwrap().upward().is_empty());
    }

    #[test]
    fn test_range_point_limit() {
        assert!(matches!(
            SweepRange::new(0.0, 1.0, 1e-12),
            Err(JjsimError::InvalidParameter { .. })
        ));
        // A reversed range visits nothing, whatever the step
        assert!(SweepRange::new(1.0, 0.0, 1e-12).is_ok());

        let range = SweepRange::new(0.0, 1.0, 1e-6).unwrap();
        assert_eq!(range.upward().len(), 1_000_000);
    }

    #[test]
    fn test_iv_curve_averages_ensemble() {
        let mut models = vec![Ohmic::new(), Ohmic::new()];
        let range = SweepRange::new(0.0, 1.0, 0.5).unwrap();
        let points = iv_curve(&mut models, 10.0, &range).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[1].current, 0.5);
        assert_eq!(points[1].mean_voltage, 0.5);
        assert_eq!(points[1].voltages, vec![0.5, 0.5]);
        assert!(models.iter().all(|m| m.calls == 2));
    }

    #[test]
    fn test_hysteresis_goes_up_then_down() {
        let mut models = vec![Ohmic::new()];
        let range = SweepRange::new(0.0, 1.0, 0.5).unwrap();
        let currents: Vec<f64> = hysteresis(&mut models, 10.0, &range)
            .unwrap()
            .iter()
            .map(|p| p.current)
            .collect();
        assert_eq!(currents, vec![0.0, 0.5, 1.0, 0.5]);
    }

    #[test]
    fn test_empty_ensemble() {
        let mut models: Vec<Ohmic> = Vec::new();
        let range = SweepRange::new(0.0, 1.0, 0.5).unwrap();
        assert!(iv_curve(&mut models, 10.0, &range).is_err());
    }

    #[test]
    fn test_sweep_propagates_model_errors() {
        let mut models = vec![Junction::new(1.0).unwrap()];
        let range = SweepRange::new(0.0, 1.0, 0.5).unwrap();
        // Duration too short for a settling window
        assert!(matches!(
            iv_curve(&mut models, 0.01, &range),
            Err(JjsimError::SettlingWindow { .. })
        ));
    }

    #[test]
    fn test_phase_portrait_sampling() {
        let mut model = Ohmic::new();
        // 10 steps of dt = 0.5, keep every 3rd
        let samples = phase_portrait(&mut model, 2.0, 5.0, 3, |_, _| false).unwrap();
        assert_eq!(samples, vec![(3.0, 2.0), (6.0, 2.0), (9.0, 2.0)]);
        assert_eq!(model.calls, 10);
    }

    #[test]
    fn test_phase_portrait_step_count_matches_bias_runs() {
        // 0.07 / 0.01 evaluates just above 7
        let mut model = Ohmic { calls: 0, dt: 0.01 };
        phase_portrait(&mut model, 1.0, 0.07, 1, |_, _| false).unwrap();
        assert_eq!(model.calls, 7);
    }

    #[test]
    fn test_phase_portrait_stops_early() {
        let mut model = Ohmic::new();
        let samples = phase_portrait(&mut model, 1.0, 100.0, 1, |phase, _| phase >= 4.0).unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(model.calls, 4);
    }

    #[test]
    fn test_junction_ensemble_iv_curve() {
        let config = IntegrationConfig::default();
        let mut models: Vec<Junction> = (0..3)
            .map(|_| Junction::builder(0.5).with_config(config).build().unwrap())
            .collect();
        let range = SweepRange::new(0.0, 3.0, 1.0).unwrap();
        let points = iv_curve(&mut models, 100.0, &range).unwrap();

        assert_eq!(points.len(), 3);
        assert!(points[0].mean_voltage.abs() < 1e-6);
        assert!(points[2].mean_voltage > points[1].mean_voltage);
        // Identical noiseless junctions agree exactly
        assert!(points[2].voltages.iter().all(|&v| v == points[2].voltages[0]));
    }
}
