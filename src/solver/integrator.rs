//! Fixed-step explicit integrators.
//!
//! Both schemes take the current state by reference and return a new state
//! vector; every stage is built fresh so a derivative function with side
//! effects (noise draws) is called exactly once per stage.

use std::fmt;
use std::str::FromStr;

use crate::error::{JjsimError, Result};

/// Integration scheme used to advance a model by one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// Explicit (forward) Euler, first order
    Euler,
    /// Classical four-stage Runge-Kutta, fourth order
    #[default]
    RungeKutta4,
}

impl Method {
    /// Advance `state` by one step of size `dt` starting at time `t`.
    pub fn step<F>(self, state: &[f64], f: F, dt: f64, t: f64) -> Result<Vec<f64>>
    where
        F: FnMut(&[f64], f64) -> Result<Vec<f64>>,
    {
        match self {
            Method::Euler => step_euler(state, f, dt, t),
            Method::RungeKutta4 => step_rk4(state, f, dt, t),
        }
    }

    /// Short name used in reports and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Method::Euler => "euler",
            Method::RungeKutta4 => "rk4",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Method {
    type Err = JjsimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "euler" => Ok(Self::Euler),
            "rk4" | "runge-kutta" | "rungekutta4" => Ok(Self::RungeKutta4),
            other => Err(JjsimError::invalid_parameter(
                "method",
                format!("unknown integration method '{other}' (expected 'euler' or 'rk4')"),
            )),
        }
    }
}

/// Evaluate the derivative and check it has the same length as the state.
fn evaluate<F>(f: &mut F, state: &[f64], t: f64) -> Result<Vec<f64>>
where
    F: FnMut(&[f64], f64) -> Result<Vec<f64>>,
{
    let dx = f(state, t)?;
    if dx.len() != state.len() {
        return Err(JjsimError::dimension_mismatch(
            "derivative function",
            state.len(),
            dx.len(),
        ));
    }
    Ok(dx)
}

/// `state + scale * dx`, as a new vector.
fn offset(state: &[f64], dx: &[f64], scale: f64) -> Vec<f64> {
    state.iter().zip(dx).map(|(x, d)| x + scale * d).collect()
}

/// One explicit Euler step: `state + dt * f(state, t)`.
pub fn step_euler<F>(state: &[f64], mut f: F, dt: f64, t: f64) -> Result<Vec<f64>>
where
    F: FnMut(&[f64], f64) -> Result<Vec<f64>>,
{
    let k1 = evaluate(&mut f, state, t)?;
    Ok(offset(state, &k1, dt))
}

/// One classical Runge-Kutta step.
///
/// Stages are evaluated at `t`, `t + dt/2` (twice) and `t + dt` and combined
/// with weights `1, 2, 2, 1` over 6.
pub fn step_rk4<F>(state: &[f64], mut f: F, dt: f64, t: f64) -> Result<Vec<f64>>
where
    F: FnMut(&[f64], f64) -> Result<Vec<f64>>,
{
    let half = 0.5 * dt;

    let k1 = evaluate(&mut f, state, t)?;
    let k2 = evaluate(&mut f, &offset(state, &k1, half), t + half)?;
    let k3 = evaluate(&mut f, &offset(state, &k2, half), t + half)?;
    let k4 = evaluate(&mut f, &offset(state, &k3, dt), t + dt)?;

    Ok(state
        .iter()
        .enumerate()
        .map(|(n, x)| x + dt / 6.0 * (k1[n] + 2.0 * k2[n] + 2.0 * k3[n] + k4[n]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Period of the pendulum below released from rest at phase 0.5.
    const PERIOD: f64 = 6.382789697677741;

    /// Undamped, unforced pendulum: phase'' = -sin(phase).
    fn pendulum(x: &[f64], _t: f64) -> Result<Vec<f64>> {
        Ok(vec![x[1], -x[0].sin()])
    }

    fn energy(x: &[f64]) -> f64 {
        0.5 * x[1] * x[1] - x[0].cos()
    }

    fn integrate(method: Method, dt: f64, horizon: f64) -> Vec<f64> {
        let mut x = vec![0.5, 0.0];
        let steps = (horizon / dt).round() as usize;
        for n in 0..steps {
            x = method.step(&x, pendulum, dt, n as f64 * dt).unwrap();
        }
        x
    }

    fn energy_drift(method: Method, dt: f64) -> f64 {
        let x = integrate(method, dt, PERIOD);
        (energy(&x) - energy(&[0.5, 0.0])).abs()
    }

    fn global_error(method: Method, dt: f64) -> f64 {
        // 64, 128 and 1024 steps of the same horizon
        let horizon = 6.4;
        let reference = integrate(method, 0.1 / 16.0, horizon);
        let x = integrate(method, dt, horizon);
        x.iter()
            .zip(&reference)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_rk4_conserves_pendulum_energy() {
        let drift = energy_drift(Method::RungeKutta4, 0.01);
        assert!(drift < 1e-8, "rk4 drift {drift:e}");
    }

    #[test]
    fn test_rk4_is_fourth_order() {
        let coarse = global_error(Method::RungeKutta4, 0.1);
        let fine = global_error(Method::RungeKutta4, 0.05);

        assert!(coarse > 1e-7, "coarse error {coarse:e}");
        let ratio = coarse / fine;
        assert!(ratio > 12.0 && ratio < 20.0, "ratio {ratio}");
    }

    #[test]
    fn test_euler_drift_is_first_order() {
        let coarse = energy_drift(Method::Euler, 0.01);
        let fine = energy_drift(Method::Euler, 0.005);

        assert!(coarse > 1e-3);
        let ratio = coarse / fine;
        assert!(ratio > 1.5 && ratio < 2.5, "ratio {ratio}");
    }

    #[test]
    fn test_rk4_beats_euler() {
        let rk4 = energy_drift(Method::RungeKutta4, 0.01);
        let euler = energy_drift(Method::Euler, 0.01);
        assert!(euler > 1000.0 * rk4);
    }

    #[test]
    fn test_rk4_exponential_decay() {
        // x' = -x, x(1) = e^-1
        let mut x = vec![1.0];
        let dt = 0.1;
        for n in 0..10 {
            x = step_rk4(&x, |s: &[f64], _| Ok(vec![-s[0]]), dt, n as f64 * dt).unwrap();
        }
        assert_relative_eq!(x[0], (-1.0f64).exp(), epsilon = 1e-6);
    }

    #[test]
    fn test_rk4_stage_times() {
        let mut times = Vec::new();
        step_rk4(
            &[0.0],
            |_: &[f64], t| {
                times.push(t);
                Ok(vec![1.0])
            },
            0.5,
            1.0,
        )
        .unwrap();
        assert_eq!(times, vec![1.0, 1.25, 1.25, 1.5]);
    }

    #[test]
    fn test_euler_calls_derivative_once() {
        let mut calls = 0;
        let x = step_euler(
            &[1.0, 2.0],
            |_: &[f64], _| {
                calls += 1;
                Ok(vec![1.0, -1.0])
            },
            0.5,
            0.0,
        )
        .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(x, vec![1.5, 1.5]);
    }

    #[test]
    fn test_wrong_derivative_length_is_an_error() {
        let result = step_rk4(&[0.0, 0.0], |_: &[f64], _| Ok(vec![1.0]), 0.1, 0.0);
        assert!(matches!(
            result,
            Err(JjsimError::DimensionMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));

        let result = step_euler(&[0.0], |_: &[f64], _| Ok(vec![1.0, 2.0]), 0.1, 0.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("euler".parse::<Method>().unwrap(), Method::Euler);
        assert_eq!("RK4".parse::<Method>().unwrap(), Method::RungeKutta4);
        assert!("midpoint".parse::<Method>().is_err());
    }
}
