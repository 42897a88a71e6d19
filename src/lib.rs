//! # jjsim
//!
//! A fixed-step simulator for Josephson junctions and junction arrays.
//!
//! This library provides:
//! - Euler and classical Runge-Kutta integration of the junction equations
//! - Simple, thermally noisy, frequency-dependent and noisy
//!   frequency-dependent junction models
//! - Grids of junction nodes coupled through a damping matrix
//! - Bias-current sweeps for IV curves, hysteresis loops and phase portraits
//!
//! ## Architecture
//!
//! - [`solver`] - Dense linear algebra and the fixed-step integrators
//! - [`junction`] - Single junctions, junction arrays and their noise source
//! - [`sweep`] - Bias-current sweeps over ensembles of models
//! - [`report`] - Flat text output of sweep results (CLI only)
//!
//! ## Usage
//!
//! ```no_run
//! use jjsim::{IntegrationConfig, Junction, Model};
//!
//! let mut junction = Junction::builder(1.0)
//!     .with_config(IntegrationConfig::default().with_dt(0.01))
//!     .build()?;
//! let voltage = junction.apply_bias_current(2.0, 1000.0)?;
//! println!("<v> = {voltage}");
//! # Ok::<(), jjsim::JjsimError>(())
//! ```
//!
//! ### Native CLI
//!
//! ```bash
//! jjsim iv --b 1.0 --temp 0.05 --count 10 --stop 3.0 --output data/iv.dat
//! ```
//!
//! ## Units
//!
//! Time is measured in units of the inverse plasma frequency, current in
//! units of the critical current and voltage so that `dφ/dt = v`.

pub mod error;
pub mod junction;
pub mod solver;
pub mod sweep;

#[cfg(feature = "cli")]
pub mod report;

// Re-export main types for convenience
pub use error::{JjsimError, Result};
pub use junction::{
    FrequencyCoupling, IntegrationConfig, Junction, JunctionArray, Model, ModelKind, NoiseSource,
};
pub use solver::{Matrix, Method};

/// Default integration timestep
pub const DEFAULT_DT: f64 = 0.01;

/// Default trailing fraction of a run over which voltage is averaged
pub const DEFAULT_SETTLING_FRACTION: f64 = 0.4;

/// Default duration of one bias-current application
pub const DEFAULT_DURATION: f64 = 1000.0;
