//! jjsim - Josephson junction simulator
//!
//! Sweeps bias current across ensembles of junctions and writes the results
//! as flat text files.
//!
//! # Usage
//!
//! ```bash
//! jjsim iv --b 1.0 --temp 0.05 --count 10 --stop 3.0 --output data/iv.dat
//! jjsim hyst --b 4.0 --stop 2.0 --per-junction --output data/hyst.dat
//! jjsim phase --b 1.0 --current 1.5 --duration 200 --output data/phase.dat
//! jjsim array-iv --rows 2 --columns 3 --stop 4.0 --output data/array.dat
//! ```

use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use jjsim::{
    error::Result,
    report::{write_phase_portraits, write_sweep, SweepHeader},
    sweep::{hysteresis, iv_curve, phase_portrait, SweepPoint, SweepRange},
    FrequencyCoupling, IntegrationConfig, Junction, JunctionArray, Method, Model, NoiseSource,
    DEFAULT_DT, DEFAULT_DURATION, DEFAULT_SETTLING_FRACTION,
};

/// Josephson junction simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// IV curve averaged over an ensemble of junctions
    Iv {
        #[command(flatten)]
        junction: JunctionArgs,
        #[command(flatten)]
        sweep: SweepArgs,
    },
    /// IV curve swept up and back down
    Hyst {
        #[command(flatten)]
        junction: JunctionArgs,
        #[command(flatten)]
        sweep: SweepArgs,
    },
    /// Phase portraits at constant bias current
    Phase {
        #[command(flatten)]
        junction: JunctionArgs,
        /// Bias current
        #[arg(long, default_value_t = 0.01)]
        current: f64,
        /// Time to trace each junction for
        #[arg(long, default_value_t = DEFAULT_DURATION)]
        duration: f64,
        /// Keep every n-th step
        #[arg(long, default_value_t = 1)]
        every: usize,
        /// Stop a trace once |v| exceeds this voltage
        #[arg(long)]
        max_voltage: Option<f64>,
        /// Data file to write
        #[arg(short, long, default_value = "phase.dat")]
        output: PathBuf,
    },
    /// IV curve of a grid of coupled junctions
    ArrayIv {
        /// Grid rows
        #[arg(long, default_value_t = 1)]
        rows: usize,
        /// Grid columns
        #[arg(long, default_value_t = 2)]
        columns: usize,
        /// Damping constant on the diagonal of the damping matrix
        #[arg(long = "b", default_value_t = 1.0)]
        damping: f64,
        #[command(flatten)]
        integration: IntegrationArgs,
        #[command(flatten)]
        sweep: SweepArgs,
        /// Sweep back down after reaching the top current
        #[arg(long)]
        hysteresis: bool,
    },
}

/// Integration settings shared by every subcommand.
#[derive(Args, Debug)]
struct IntegrationArgs {
    /// Integration timestep
    #[arg(long, default_value_t = DEFAULT_DT)]
    dt: f64,
    /// Integration method (euler or rk4)
    #[arg(long, default_value = "rk4")]
    method: Method,
    /// Trailing fraction of each run that is averaged
    #[arg(long, default_value_t = DEFAULT_SETTLING_FRACTION)]
    settling: f64,
}

impl IntegrationArgs {
    fn config(&self) -> IntegrationConfig {
        IntegrationConfig::new()
            .with_dt(self.dt)
            .with_method(self.method)
            .with_settling_fraction(self.settling)
    }
}

/// Physical parameters of each junction in the ensemble.
#[derive(Args, Debug)]
struct JunctionArgs {
    /// Stewart-McCumber damping constant
    #[arg(long = "b", default_value_t = 1.0)]
    damping: f64,
    /// Dimensionless temperature (adds thermal noise)
    #[arg(long)]
    temp: Option<f64>,
    /// Shunt coupling d = Q0/Q1 - 1 (adds a frequency-dependent shunt)
    #[arg(long, conflicts_with = "q1")]
    d: Option<f64>,
    /// Shunt relaxation rate e, used with --d
    #[arg(long, default_value_t = 1.0)]
    e: f64,
    /// Shunt quality factor Q1 (adds a frequency-dependent shunt)
    #[arg(long)]
    q1: Option<f64>,
    /// Time-constant ratio rho, used with --q1
    #[arg(long, default_value_t = 1.0)]
    rho: f64,
    /// Number of junctions in the ensemble
    #[arg(long, default_value_t = 1)]
    count: usize,
    /// Seed for the noise sources (junction k uses seed + k)
    #[arg(long)]
    seed: Option<u64>,
    #[command(flatten)]
    integration: IntegrationArgs,
}

impl JunctionArgs {
    fn coupling(&self) -> Result<Option<FrequencyCoupling>> {
        match (self.d, self.q1) {
            (Some(d), _) => FrequencyCoupling::new(d, self.e).map(Some),
            (None, Some(q1)) => FrequencyCoupling::from_quality(self.damping, q1, self.rho).map(Some),
            (None, None) => Ok(None),
        }
    }

    fn build(&self) -> Result<Vec<Junction>> {
        let coupling = self.coupling()?;
        (0..self.count)
            .map(|k| {
                let mut builder = Junction::builder(self.damping)
                    .with_config(self.integration.config())
                    .with_noise_source(match self.seed {
                        Some(seed) => NoiseSource::seeded(seed.wrapping_add(k as u64)),
                        None => NoiseSource::from_entropy(),
                    });
                if let Some(temp) = self.temp {
                    builder = builder.with_temperature(temp);
                }
                if let Some(c) = coupling {
                    builder = builder.with_coupling(c);
                }
                builder.build()
            })
            .collect()
    }
}

/// Bias-current sweep settings.
#[derive(Args, Debug)]
struct SweepArgs {
    /// Duration of each bias application
    #[arg(long, default_value_t = DEFAULT_DURATION)]
    duration: f64,
    /// First bias current
    #[arg(long, default_value_t = 0.0)]
    start: f64,
    /// Sweep up to (not including) this current
    #[arg(long, default_value_t = 1.5)]
    stop: f64,
    /// Current step
    #[arg(long, default_value_t = 0.01)]
    step: f64,
    /// Also write every individual junction voltage
    #[arg(long)]
    per_junction: bool,
    /// Data file to write
    #[arg(short, long, default_value = "iv.dat")]
    output: PathBuf,
}

fn run_sweep<M: Model>(
    title: &str,
    models: &mut [M],
    sweep: &SweepArgs,
    go_back_down: bool,
) -> Result<()> {
    let range = SweepRange::new(sweep.start, sweep.stop, sweep.step)?;
    let (kind, info, dt) = match models.first() {
        Some(m) => (m.kind(), m.info(), m.dt()),
        None => {
            return Err(jjsim::JjsimError::invalid_parameter(
                "count",
                "need at least one junction",
            ))
        }
    };

    info!(title, count = models.len(), %kind, %info, "starting sweep");
    let started_at = Local::now();
    let started = Instant::now();
    let points: Vec<SweepPoint> = if go_back_down {
        hysteresis(models, sweep.duration, &range)?
    } else {
        iv_curve(models, sweep.duration, &range)?
    };

    let header = SweepHeader {
        title: title.to_string(),
        count: models.len(),
        kind,
        info,
        dt,
        duration: sweep.duration,
        range,
        started: started_at,
        runtime: started.elapsed(),
    };
    let path = write_sweep(&sweep.output, &header, &points, sweep.per_junction)?;
    info!(path = %path.display(), seconds = header.runtime.as_secs_f64(), "sweep done");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jjsim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Iv { junction, sweep } => {
            let mut models = junction.build()?;
            let title = if sweep.per_junction {
                "IV Plot with individual junctions"
            } else {
                "IV Plot"
            };
            run_sweep(title, &mut models, &sweep, false)
        }

        Command::Hyst { junction, sweep } => {
            let mut models = junction.build()?;
            let title = if sweep.per_junction {
                "Hysteric IV Plot with individual junctions"
            } else {
                "Hysteric IV Plot"
            };
            run_sweep(title, &mut models, &sweep, true)
        }

        Command::Phase {
            junction,
            current,
            duration,
            every,
            max_voltage,
            output,
        } => {
            let mut models = junction.build()?;
            let limit = max_voltage.unwrap_or(f64::INFINITY);
            let portraits = models
                .iter_mut()
                .map(|m| phase_portrait(m, current, duration, every, |_, v| v.abs() > limit))
                .collect::<Result<Vec<_>>>()?;
            let path = write_phase_portraits(&output, &portraits)?;
            info!(path = %path.display(), junctions = portraits.len(), "phase portraits done");
            Ok(())
        }

        Command::ArrayIv {
            rows,
            columns,
            damping,
            integration,
            sweep,
            hysteresis,
        } => {
            let array = JunctionArray::diagonal(rows, columns, damping, integration.config())?;
            let mut models = [array];
            let title = if hysteresis {
                "Hysteric Array IV Plot"
            } else {
                "Array IV Plot"
            };
            run_sweep(title, &mut models, &sweep, hysteresis)
        }
    }
}
