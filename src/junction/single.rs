//! Single junction with optional thermal noise and frequency-dependent shunt.
//!
//! The variant is not a type of its own: a [`Junction`] carries a capability
//! set, and which capabilities are present decides its dynamics.
//!
//! | noise | coupling | kind                        | state                 |
//! |-------|----------|-----------------------------|-----------------------|
//! | no    | no       | `simple`                    | `[φ, v]`              |
//! | yes   | no       | `noisy`                     | `[φ, v]`              |
//! | no    | yes      | `freq dep`                  | `[φ, v, v_c]`         |
//! | yes   | yes      | `noisy freq dep`            | `[φ, v, v_c]`         |
//!
//! The frequency-dependent shunt adds a series RC branch whose capacitor
//! voltage `v_c` relaxes towards the junction voltage:
//!
//! ```text
//! b·dv/dt  = i − v − sin(φ) − d·(v − v_c)
//! dv_c/dt  = e·(v − v_c)
//! ```

use tracing::debug;

use crate::error::{JjsimError, Result};

use super::{wrap_phase, IntegrationConfig, Model, ModelKind, NoiseSource};

const PHASE: usize = 0;
const VOLTAGE: usize = 1;
const CAP_VOLTAGE: usize = 2;

/// Thermal noise current with standard deviation `sig = sqrt(2·temp/dt)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalNoise {
    sig: f64,
}

impl ThermalNoise {
    /// Noise for a dimensionless temperature at a given timestep.
    pub fn from_temperature(temperature: f64, dt: f64) -> Result<Self> {
        if !(temperature.is_finite() && temperature >= 0.0) {
            return Err(JjsimError::invalid_parameter(
                "temperature",
                format!("must be non-negative, got {temperature}"),
            ));
        }
        Ok(Self {
            sig: (2.0 * temperature / dt).sqrt(),
        })
    }

    /// Standard deviation of the noise current.
    pub fn std_dev(&self) -> f64 {
        self.sig
    }

    /// Temperature this noise corresponds to at timestep `dt`.
    pub fn temperature(&self, dt: f64) -> f64 {
        self.sig * self.sig * dt / 2.0
    }
}

/// Coupling coefficients of the frequency-dependent shunt.
///
/// Only obtainable through the validating constructors:
///
/// ```compile_fail
/// let c = jjsim::FrequencyCoupling { d: -1.0, e: f64::NAN };
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyCoupling {
    d: f64,
    e: f64,
}

impl FrequencyCoupling {
    /// Use coupling coefficients directly.
    pub fn new(d: f64, e: f64) -> Result<Self> {
        if !(d.is_finite() && d >= 0.0) {
            return Err(JjsimError::invalid_parameter(
                "d",
                format!("coupling must be non-negative, got {d}"),
            ));
        }
        if !(e.is_finite() && e >= 0.0) {
            return Err(JjsimError::invalid_parameter(
                "e",
                format!("relaxation rate must be non-negative, got {e}"),
            ));
        }
        Ok(Self { d, e })
    }

    /// Derive the coefficients from the shunt quality factor `q1` and the
    /// time-constant ratio `rho`, with `Q0 = sqrt(b)`.
    pub fn from_quality(damping: f64, q1: f64, rho: f64) -> Result<Self> {
        if !(damping.is_finite() && damping > 0.0) {
            return Err(JjsimError::invalid_parameter(
                "b",
                format!("damping constant must be positive, got {damping}"),
            ));
        }
        if !(q1.is_finite() && q1 > 0.0) {
            return Err(JjsimError::invalid_parameter(
                "q1",
                format!("quality factor must be positive, got {q1}"),
            ));
        }
        let q0 = damping.sqrt();
        Self::new(q0 / q1 - 1.0, rho / damping)
    }

    /// Coupling strength `Q0/Q1 − 1`.
    pub fn d(&self) -> f64 {
        self.d
    }

    /// Relaxation rate `rho/Q0²` of the shunt capacitor.
    pub fn e(&self) -> f64 {
        self.e
    }
}

/// Parameters of the right-hand side. Copied into each step so the
/// derivative can run while the noise source is borrowed mutably.
#[derive(Debug, Clone, Copy)]
struct Dynamics {
    damping: f64,
    current: f64,
    noise: Option<ThermalNoise>,
    coupling: Option<FrequencyCoupling>,
}

impl Dynamics {
    fn kind(&self) -> ModelKind {
        match (self.noise, self.coupling) {
            (None, None) => ModelKind::Simple,
            (Some(_), None) => ModelKind::Noisy,
            (None, Some(_)) => ModelKind::FrequencyDependent,
            (Some(_), Some(_)) => ModelKind::NoisyFrequencyDependent,
        }
    }

    fn state_len(&self) -> usize {
        if self.coupling.is_some() {
            3
        } else {
            2
        }
    }

    /// Right-hand side of the junction ODE. Noise is drawn fresh on every
    /// call, so each RK4 stage sees an independent sample.
    fn derivative(&self, x: &[f64], _t: f64, source: &mut NoiseSource) -> Vec<f64> {
        let b = self.damping;
        let i = self.current;
        let phase = x[PHASE];
        let v = x[VOLTAGE];

        match (self.noise, self.coupling) {
            (None, None) => vec![v, (i - v - phase.sin()) / b],
            (Some(noise), None) => {
                let i_n = source.gaussian(noise.sig);
                vec![v, (i + i_n - v - phase.sin()) / b]
            }
            (None, Some(c)) => {
                let v_c = x[CAP_VOLTAGE];
                vec![
                    v,
                    (i - v - phase.sin() - c.d * (v - v_c)) / b,
                    c.e * (v - v_c),
                ]
            }
            (Some(noise), Some(c)) => {
                // One source split across the junction and the shunt branch
                let v_c = x[CAP_VOLTAGE];
                let i_n = source.gaussian(noise.sig);
                let i_s = source.gaussian(noise.sig * c.d.sqrt());
                vec![
                    v,
                    (i + i_n + i_s - v - phase.sin() - c.d * (v - v_c)) / b,
                    c.e * (v - v_c - i_s / c.d),
                ]
            }
        }
    }
}

/// Builder for [`Junction`].
#[derive(Debug, Clone)]
pub struct JunctionBuilder {
    damping: f64,
    phase: f64,
    voltage: f64,
    cap_voltage: f64,
    temperature: Option<f64>,
    coupling: Option<FrequencyCoupling>,
    config: IntegrationConfig,
    source: Option<NoiseSource>,
}

impl JunctionBuilder {
    /// Start a junction with damping constant `b`.
    pub fn new(damping: f64) -> Self {
        Self {
            damping,
            phase: 0.0,
            voltage: 0.0,
            cap_voltage: 0.0,
            temperature: None,
            coupling: None,
            config: IntegrationConfig::default(),
            source: None,
        }
    }

    /// Set the initial phase and voltage.
    pub fn with_initial_state(mut self, phase: f64, voltage: f64) -> Self {
        self.phase = phase;
        self.voltage = voltage;
        self
    }

    /// Set the initial shunt capacitor voltage (frequency-dependent only).
    pub fn with_capacitor_voltage(mut self, cap_voltage: f64) -> Self {
        self.cap_voltage = cap_voltage;
        self
    }

    /// Add thermal noise at the given dimensionless temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Add a frequency-dependent shunt.
    pub fn with_coupling(mut self, coupling: FrequencyCoupling) -> Self {
        self.coupling = Some(coupling);
        self
    }

    /// Set the integration settings.
    pub fn with_config(mut self, config: IntegrationConfig) -> Self {
        self.config = config;
        self
    }

    /// Inject the noise source. Defaults to one seeded from OS entropy.
    pub fn with_noise_source(mut self, source: NoiseSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Validate the parameters and build the junction.
    pub fn build(self) -> Result<Junction> {
        self.config.validate()?;

        if !(self.damping.is_finite() && self.damping > 0.0) {
            return Err(JjsimError::invalid_parameter(
                "b",
                format!("damping constant must be positive, got {}", self.damping),
            ));
        }

        let noise = self
            .temperature
            .map(|temp| ThermalNoise::from_temperature(temp, self.config.dt))
            .transpose()?;

        if let (Some(_), Some(c)) = (noise, self.coupling) {
            // The shunt noise enters the capacitor equation divided by d
            if c.d <= 0.0 {
                return Err(JjsimError::invalid_parameter(
                    "d",
                    "noisy frequency-dependent junctions need d > 0",
                ));
            }
        }

        let dynamics = Dynamics {
            damping: self.damping,
            current: 0.0,
            noise,
            coupling: self.coupling,
        };

        let mut state = vec![self.phase, self.voltage];
        if dynamics.coupling.is_some() {
            state.push(self.cap_voltage);
        }

        let junction = Junction {
            dynamics,
            state,
            config: self.config,
            source: self.source.unwrap_or_default(),
            time: 0.0,
        };
        debug!(kind = %junction.kind(), info = %junction.info(), "built junction");
        Ok(junction)
    }
}

/// A single Josephson junction.
#[derive(Debug, Clone)]
pub struct Junction {
    /// Damping, bias and capability set
    dynamics: Dynamics,
    /// `[φ, v]` or `[φ, v, v_c]`
    state: Vec<f64>,
    /// Integration settings
    config: IntegrationConfig,
    /// Thermal noise generator
    source: NoiseSource,
    /// Elapsed simulated time
    time: f64,
}

impl Junction {
    /// Plain junction with default integration settings.
    pub fn new(damping: f64) -> Result<Self> {
        JunctionBuilder::new(damping).build()
    }

    /// Start building a junction with damping constant `b`.
    pub fn builder(damping: f64) -> JunctionBuilder {
        JunctionBuilder::new(damping)
    }

    /// Stewart-McCumber damping constant.
    pub fn damping(&self) -> f64 {
        self.dynamics.damping
    }

    /// Bias current applied by the most recent call.
    pub fn current(&self) -> f64 {
        self.dynamics.current
    }

    /// Current phase.
    pub fn phase(&self) -> f64 {
        self.state[PHASE]
    }

    /// Current voltage.
    pub fn voltage(&self) -> f64 {
        self.state[VOLTAGE]
    }

    /// Shunt capacitor voltage, if the junction has a frequency-dependent shunt.
    pub fn capacitor_voltage(&self) -> Option<f64> {
        self.state.get(CAP_VOLTAGE).copied()
    }

    /// Full state vector.
    pub fn state(&self) -> &[f64] {
        &self.state
    }

    /// Thermal noise, if any.
    pub fn noise(&self) -> Option<ThermalNoise> {
        self.dynamics.noise
    }

    /// Frequency-dependent shunt, if any.
    pub fn coupling(&self) -> Option<FrequencyCoupling> {
        self.dynamics.coupling
    }

    /// Integration settings.
    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    /// Simulated time elapsed since construction.
    pub fn elapsed(&self) -> f64 {
        self.time
    }

    /// Length of this junction's state vector.
    pub fn state_len(&self) -> usize {
        self.dynamics.state_len()
    }

    /// Advance `state` by one timestep.
    fn advance(&mut self, state: &[f64]) -> Result<Vec<f64>> {
        let dynamics = self.dynamics;
        let source = &mut self.source;
        let next = self.config.method.step(
            state,
            |x, t| Ok(dynamics.derivative(x, t, source)),
            self.config.dt,
            self.time,
        )?;
        self.time += self.config.dt;
        Ok(next)
    }
}

impl Model for Junction {
    fn apply_bias_current(&mut self, current: f64, duration: f64) -> Result<f64> {
        let plan = self.config.plan(duration)?;
        self.dynamics.current = current;

        let mut state = self.state.clone();
        let mut sum = 0.0;
        for n in 0..plan.steps {
            state = self.advance(&state)?;
            if n >= plan.window_start {
                sum += state[VOLTAGE];
            }
        }

        state[PHASE] = wrap_phase(state[PHASE]);
        self.state = state;

        let average = sum / plan.window as f64;
        debug!(
            current,
            duration,
            steps = plan.steps,
            average,
            "applied bias current"
        );
        Ok(average)
    }

    fn sample_phase_voltage(&mut self, current: f64) -> Result<(f64, f64)> {
        self.dynamics.current = current;
        let state = self.state.clone();
        let mut state = self.advance(&state)?;
        state[PHASE] = wrap_phase(state[PHASE]);
        self.state = state;
        Ok((self.state[PHASE], self.state[VOLTAGE]))
    }

    fn kind(&self) -> ModelKind {
        self.dynamics.kind()
    }

    fn info(&self) -> String {
        let mut out = format!("b = {}", self.dynamics.damping);
        if self.dynamics.noise.is_some() {
            out.push_str(&format!(", temp = {}", self.temperature()));
        }
        if let Some(c) = self.dynamics.coupling {
            out.push_str(&format!(", d = {}, e = {}", c.d, c.e));
        }
        out
    }

    fn temperature(&self) -> f64 {
        self.dynamics
            .noise
            .map_or(0.0, |noise| noise.temperature(self.config.dt))
    }

    fn dt(&self) -> f64 {
        self.config.dt
    }
}
