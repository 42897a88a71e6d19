//! Grid of junction nodes coupled through a shared damping matrix.
//!
//! Nodes are indexed row-major over a `rows × columns` grid. Every pair of
//! neighbours (right neighbour in the same row, node directly below) carries
//! a circulating current
//!
//! ```text
//! c_ab = sin(φ_a − φ_b) + (v_a − v_b)
//! ```
//!
//! which leaves `a` and enters `b`. The net current into each node, together
//! with its share `Iex[k]·i` of the external bias, drives the voltages
//! through the inverse damping matrix: `dv/dt = B⁻¹ · net`.

use tracing::{debug, warn};

use crate::error::{JjsimError, Result};
use crate::solver::Matrix;

use super::{wrap_phase, IntegrationConfig, Model, ModelKind};

/// Tolerance on the sum of the current distribution weights.
const DISTRIBUTION_BALANCE_TOLERANCE: f64 = 1e-9;

/// Topology and coupling of the grid; immutable after construction.
#[derive(Debug, Clone)]
struct Grid {
    rows: usize,
    columns: usize,
    /// Inverse of the damping matrix
    inverse: Matrix,
    /// External current weight per node
    distribution: Vec<f64>,
}

impl Grid {
    fn nodes(&self) -> usize {
        self.rows * self.columns
    }

    /// Right-hand side for the flat state `[φ_0..φ_{N-1}, v_0..v_{N-1}]`.
    fn derivative(&self, x: &[f64], current: f64) -> Result<Vec<f64>> {
        let n = self.nodes();
        let (phases, voltages) = x.split_at(n);

        let mut net: Vec<f64> = self.distribution.iter().map(|w| w * current).collect();
        let mut circulate = |a: usize, b: usize| {
            let c = (phases[a] - phases[b]).sin() + (voltages[a] - voltages[b]);
            net[a] -= c;
            net[b] += c;
        };

        for row in 0..self.rows {
            for col in 0..self.columns {
                let a = row * self.columns + col;
                if col + 1 < self.columns {
                    circulate(a, a + 1);
                }
                if row + 1 < self.rows {
                    circulate(a, a + self.columns);
                }
            }
        }

        let dv = self.inverse.mul_vec(&net)?;

        let mut dx = Vec::with_capacity(2 * n);
        dx.extend_from_slice(voltages);
        dx.extend(dv);
        Ok(dx)
    }
}

/// A `rows × columns` array of coupled junction nodes.
#[derive(Debug, Clone)]
pub struct JunctionArray {
    grid: Grid,
    /// Damping matrix as supplied
    damping: Matrix,
    /// `[φ_0..φ_{N-1}, v_0..v_{N-1}]`
    state: Vec<f64>,
    /// Applied bias current
    current: f64,
    /// Integration settings
    config: IntegrationConfig,
    /// Elapsed simulated time
    time: f64,
}

impl JunctionArray {
    /// Create an array from its damping matrix and external current
    /// distribution.
    ///
    /// The distribution weights conventionally sum to zero (positive weights
    /// to +1, negative to −1); this is not enforced.
    pub fn new(
        rows: usize,
        columns: usize,
        damping: Matrix,
        distribution: Vec<f64>,
        config: IntegrationConfig,
    ) -> Result<Self> {
        config.validate()?;

        if rows == 0 || columns == 0 {
            return Err(JjsimError::invalid_parameter(
                "rows/columns",
                format!("grid must have at least one node, got {rows} x {columns}"),
            ));
        }
        let n = rows * columns;

        if !damping.is_square() || damping.rows() != n {
            return Err(JjsimError::invalid_parameter(
                "damping",
                format!(
                    "damping matrix must be {n} x {n}, got {} x {}",
                    damping.rows(),
                    damping.cols()
                ),
            ));
        }
        if distribution.len() != n {
            return Err(JjsimError::invalid_parameter(
                "distribution",
                format!("expected {n} weights, got {}", distribution.len()),
            ));
        }

        let balance: f64 = distribution.iter().sum();
        if balance.abs() > DISTRIBUTION_BALANCE_TOLERANCE {
            warn!(balance, "current distribution does not sum to zero");
        }

        let inverse = damping.invert()?;

        debug!(rows, columns, dt = config.dt, "built junction array");
        Ok(Self {
            grid: Grid {
                rows,
                columns,
                inverse,
                distribution,
            },
            damping,
            state: vec![0.0; 2 * n],
            current: 0.0,
            config,
            time: 0.0,
        })
    }

    /// Array with a diagonal damping matrix `b·I`, fed at the first node and
    /// drained at the last.
    pub fn diagonal(rows: usize, columns: usize, damping: f64, config: IntegrationConfig) -> Result<Self> {
        if !(damping.is_finite() && damping > 0.0) {
            return Err(JjsimError::invalid_parameter(
                "b",
                format!("damping constant must be positive, got {damping}"),
            ));
        }
        let n = rows * columns;
        let mut matrix = Matrix::zeros(n, n);
        for k in 0..n {
            matrix.set(k, k, damping);
        }
        let mut distribution = vec![0.0; n];
        if n > 1 {
            distribution[0] = 1.0;
            distribution[n - 1] = -1.0;
        }
        Self::new(rows, columns, matrix, distribution, config)
    }

    /// Replace the initial phases (voltages are left as they are).
    pub fn with_phases(mut self, phases: &[f64]) -> Result<Self> {
        let n = self.nodes();
        if phases.len() != n {
            return Err(JjsimError::dimension_mismatch("initial phases", n, phases.len()));
        }
        self.state[..n].copy_from_slice(phases);
        Ok(self)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.grid.rows
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        self.grid.columns
    }

    /// Number of nodes.
    pub fn nodes(&self) -> usize {
        self.grid.nodes()
    }

    /// The damping matrix.
    pub fn damping(&self) -> &Matrix {
        &self.damping
    }

    /// The precomputed inverse of the damping matrix.
    pub fn inverse_damping(&self) -> &Matrix {
        &self.grid.inverse
    }

    /// Bias current applied by the most recent call.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Node phases.
    pub fn phases(&self) -> &[f64] {
        &self.state[..self.nodes()]
    }

    /// Node voltages.
    pub fn voltages(&self) -> &[f64] {
        &self.state[self.nodes()..]
    }

    /// Simulated time elapsed since construction.
    pub fn elapsed(&self) -> f64 {
        self.time
    }

    /// Voltage across the array: first node minus last node.
    fn observed_voltage(state: &[f64], n: usize) -> f64 {
        state[n] - state[2 * n - 1]
    }

    fn advance(&mut self, state: &[f64]) -> Result<Vec<f64>> {
        let grid = &self.grid;
        let current = self.current;
        let next = self.config.method.step(
            state,
            |x, _t| grid.derivative(x, current),
            self.config.dt,
            self.time,
        )?;
        self.time += self.config.dt;
        Ok(next)
    }

    fn wrap_phases(&self, state: &mut [f64]) {
        for phase in &mut state[..self.nodes()] {
            *phase = wrap_phase(*phase);
        }
    }
}

impl Model for JunctionArray {
    fn apply_bias_current(&mut self, current: f64, duration: f64) -> Result<f64> {
        let plan = self.config.plan(duration)?;
        self.current = current;
        let n = self.nodes();

        let mut state = self.state.clone();
        let mut sum = 0.0;
        for step in 0..plan.steps {
            state = self.advance(&state)?;
            if step >= plan.window_start {
                sum += Self::observed_voltage(&state, n);
            }
        }

        self.wrap_phases(&mut state);
        self.state = state;

        let average = sum / plan.window as f64;
        debug!(
            current,
            duration,
            steps = plan.steps,
            average,
            "applied bias current to array"
        );
        Ok(average)
    }

    fn sample_phase_voltage(&mut self, current: f64) -> Result<(f64, f64)> {
        self.current = current;
        let n = self.nodes();

        let state = self.state.clone();
        let mut state = self.advance(&state)?;
        self.wrap_phases(&mut state);
        self.state = state;

        let phase = wrap_phase(self.state[0] - self.state[n - 1]);
        Ok((phase, Self::observed_voltage(&self.state, n)))
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Array
    }

    fn info(&self) -> String {
        format!(
            "rows = {}, columns = {}, dt = {}",
            self.grid.rows, self.grid.columns, self.config.dt
        )
    }

    fn temperature(&self) -> f64 {
        0.0
    }

    fn dt(&self) -> f64 {
        self.config.dt
    }
}
