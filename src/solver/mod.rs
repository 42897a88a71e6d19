//! Numerical engine: dense linear algebra and fixed-step ODE integration.
//!
//! ## Integration
//!
//! Every model is a first-order system `x' = f(x, t)` over a flat state
//! vector. [`Method`] advances that vector by one fixed step `dt` using
//! either explicit Euler or classical RK4:
//!
//! ```text
//! k1 = f(x,            t)
//! k2 = f(x + dt/2·k1,  t + dt/2)
//! k3 = f(x + dt/2·k2,  t + dt/2)
//! k4 = f(x + dt·k3,    t + dt)
//! x' = x + dt/6·(k1 + 2k2 + 2k3 + k4)
//! ```
//!
//! ## Linear algebra
//!
//! Junction arrays couple their nodes through a damping matrix `B`. The
//! inverse `B⁻¹` is computed once by Gauss-Jordan elimination with partial
//! pivoting, after which each derivative evaluation is a single
//! matrix-vector product.

mod integrator;
mod matrix;

pub use integrator::{step_euler, step_rk4, Method};
pub use matrix::Matrix;

/// Pivot magnitude at or below which a matrix is treated as singular.
pub const SINGULAR_TOLERANCE: f64 = 1e-10;
