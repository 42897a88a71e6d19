//! Flat text output for the CLI frontend.
//!
//! Sweep files start with a short header describing the run, followed by
//! whitespace-delimited `current voltage` rows:
//!
//! ```text
//! IV Plot
//! No. of Junctions:   10
//! Type of Junctions:  noisy
//! Junctions Info:     b = 1, temp = 0.05
//! dt, T:              0.01, 1000
//! current range, di:  0-3, 0.01
//! Date:               3/5/2024
//! Time:               14:07
//! Runtime:            12.345
//!
//! Current    Voltage
//! (i)        (v)
//! 0.00000    +0.00000000
//! ```
//!
//! Phase portrait files hold `phase voltage` rows, one block per junction,
//! separated by blank lines.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, Timelike};
use tracing::info;

use crate::error::{JjsimError, Result};
use crate::junction::ModelKind;
use crate::sweep::{SweepPoint, SweepRange};

/// Run description written at the top of a sweep file.
#[derive(Debug, Clone)]
pub struct SweepHeader {
    /// First line of the file
    pub title: String,
    /// Number of models in the ensemble
    pub count: usize,
    /// Kind of the models
    pub kind: ModelKind,
    /// Parameter summary of the first model
    pub info: String,
    /// Integration timestep
    pub dt: f64,
    /// Duration of each bias application
    pub duration: f64,
    /// Swept current range
    pub range: SweepRange,
    /// Local time the sweep started
    pub started: DateTime<Local>,
    /// Wall-clock time the sweep took
    pub runtime: Duration,
}

/// Render a sweep as text. With `per_model`, each row is followed by a line
/// holding every individual model voltage.
pub fn format_sweep(header: &SweepHeader, points: &[SweepPoint], per_model: bool) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(out, "{}", header.title);
    let _ = writeln!(out, "No. of Junctions:   {}", header.count);
    let _ = writeln!(out, "Type of Junctions:  {}", header.kind);
    let _ = writeln!(out, "Junctions Info:     {}", header.info);
    let _ = writeln!(out, "dt, T:              {}, {}", header.dt, header.duration);
    let _ = writeln!(
        out,
        "current range, di:  {}-{}, {}",
        header.range.start, header.range.stop, header.range.step
    );
    let started = &header.started;
    let _ = writeln!(
        out,
        "Date:               {}/{}/{}",
        started.month(),
        started.day(),
        started.year()
    );
    let _ = writeln!(
        out,
        "Time:               {}:{:02}",
        started.hour(),
        started.minute()
    );
    let _ = writeln!(out, "Runtime:            {:.3}", header.runtime.as_secs_f64());
    let _ = writeln!(out);
    let _ = writeln!(out, "Current    Voltage");
    let _ = writeln!(out, "(i)        (v)");

    for point in points {
        let _ = writeln!(out, "{:.5}    {:+.8}", point.current, point.mean_voltage);
        if per_model {
            for v in &point.voltages {
                let _ = write!(out, "    {v:+.8}");
            }
            let _ = writeln!(out);
        }
    }
    out
}

/// Render phase portraits as text, one block per model.
pub fn format_phase_portraits(portraits: &[Vec<(f64, f64)>]) -> String {
    let mut out = String::new();
    for portrait in portraits {
        for (phase, voltage) in portrait {
            let _ = writeln!(out, "{phase:.8} {voltage:.8}");
        }
        let _ = writeln!(out);
    }
    out
}

/// Write a sweep to a fresh file next to `path`. Returns the path written.
pub fn write_sweep(
    path: &Path,
    header: &SweepHeader,
    points: &[SweepPoint],
    per_model: bool,
) -> Result<PathBuf> {
    write_text(path, &format_sweep(header, points, per_model))
}

/// Write phase portraits to a fresh file next to `path`. Returns the path written.
pub fn write_phase_portraits(path: &Path, portraits: &[Vec<(f64, f64)>]) -> Result<PathBuf> {
    write_text(path, &format_phase_portraits(portraits))
}

fn write_text(path: &Path, text: &str) -> Result<PathBuf> {
    let target = unique_path(path)?;
    fs::write(&target, text).map_err(|e| JjsimError::file_write(target.display().to_string(), e))?;
    info!(path = %target.display(), "wrote data file");
    Ok(target)
}

/// Pick a path that does not exist yet, creating missing parent directories.
///
/// If `path` is taken, `_2`, `_3`, ... is appended to the file stem:
/// `run.dat` becomes `run_2.dat`, then `run_3.dat`.
pub fn unique_path(path: &Path) -> Result<PathBuf> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .map_err(|e| JjsimError::file_write(dir.display().to_string(), e))?;
        }
    }

    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut k = 2;
    loop {
        let name = match &extension {
            Some(ext) => format!("{stem}_{k}.{ext}"),
            None => format!("{stem}_{k}"),
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
        k += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn header() -> SweepHeader {
        SweepHeader {
            title: "IV Plot".to_string(),
            count: 2,
            kind: ModelKind::Noisy,
            info: "b = 1, temp = 0.05".to_string(),
            dt: 0.01,
            duration: 1000.0,
            range: SweepRange::new(0.0, 1.0, 0.5).unwrap(),
            started: Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).single().unwrap(),
            runtime: Duration::from_millis(1500),
        }
    }

    fn points() -> Vec<SweepPoint> {
        vec![
            SweepPoint {
                current: 0.0,
                mean_voltage: 0.0,
                voltages: vec![0.0, 0.0],
            },
            SweepPoint {
                current: 0.5,
                mean_voltage: 0.25,
                voltages: vec![0.1, 0.4],
            },
        ]
    }

    #[test]
    fn test_format_sweep() {
        let text = format_sweep(&header(), &points(), false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "IV Plot");
        assert_eq!(lines[2], "Type of Junctions:  noisy");
        assert_eq!(lines[4], "dt, T:              0.01, 1000");
        assert_eq!(lines[5], "current range, di:  0-1, 0.5");
        assert_eq!(lines[6], "Date:               3/5/2024");
        assert_eq!(lines[7], "Time:               14:07");
        assert_eq!(lines[8], "Runtime:            1.500");
        assert_eq!(lines[9], "");
        assert_eq!(lines[12], "0.00000    +0.00000000");
        assert_eq!(lines[13], "0.50000    +0.25000000");
        assert_eq!(lines.len(), 14);
    }

    #[test]
    fn test_format_sweep_per_model() {
        let text = format_sweep(&header(), &points(), true);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[14], "0.50000    +0.25000000");
        assert_eq!(lines[15], "    +0.10000000    +0.40000000");
    }

    #[test]
    fn test_format_phase_portraits() {
        let text = format_phase_portraits(&[vec![(0.5, -1.0)], vec![(1.0, 2.0), (1.5, 2.5)]]);
        assert_eq!(
            text,
            "0.50000000 -1.00000000\n\n1.00000000 2.00000000\n1.50000000 2.50000000\n\n"
        );
    }

    #[test]
    fn test_unique_path_numbers_existing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("run.dat");

        let first = write_sweep(&path, &header(), &points(), false).unwrap();
        assert_eq!(first, path);

        let second = write_sweep(&path, &header(), &points(), false).unwrap();
        assert_eq!(second, tmp.path().join("nested").join("run_2.dat"));

        let third = write_phase_portraits(&path, &[]).unwrap();
        assert_eq!(third, tmp.path().join("nested").join("run_3.dat"));
    }

    #[test]
    fn test_unique_path_without_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("portrait");
        fs::write(&path, "").unwrap();
        assert_eq!(unique_path(&path).unwrap(), tmp.path().join("portrait_2"));
    }
}
