// fusion_sim/src/simulation/replay.rs

//! Parser for recorded measurement logs.
//!
//! One measurement per line, whitespace separated:
//!
//! ```text
//! L  x    y                t  gt_px gt_py gt_vx gt_vy
//! R  rho  phi  rho_dot     t  gt_px gt_py gt_vx gt_vy
//! ```
//!
//! `t` is in microseconds. Any columns after the four ground truth values
//! (some logs append yaw and yaw rate) are ignored. Blank lines and lines
//! starting with `#` are skipped.

use fusion_core::error::FilterError;
use fusion_core::messages::{MeasurementMessage, SensorKind};
use fusion_core::types::Timestamp;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::simulation::truth::{CartesianTruth, LabeledMeasurement};

const TRUTH_COLUMNS: usize = 4;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("line {line}: {source}")]
    Measurement {
        line: usize,
        #[source]
        source: FilterError,
    },
}

pub fn load_log(path: &Path) -> Result<Vec<LabeledMeasurement>, ReplayError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_log(&text)
}

/// Parses a whole log. Fails on the first malformed line.
pub fn parse_log(text: &str) -> Result<Vec<LabeledMeasurement>, ReplayError> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| parse_line(i + 1, line).transpose())
        .collect()
}

/// Parses one line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<LabeledMeasurement>, ReplayError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let parse_error = |reason: String| ReplayError::Parse {
        line: line_no,
        reason,
    };

    let mut tokens = line.split_whitespace();
    let kind = match tokens.next() {
        Some("L") => SensorKind::Lidar,
        Some("R") => SensorKind::Radar,
        Some(other) => return Err(parse_error(format!("unknown sensor tag `{other}`"))),
        None => return Ok(None),
    };

    let fields: Vec<&str> = tokens.collect();
    let dim = kind.measurement_dim();
    let needed = dim + 1 + TRUTH_COLUMNS;
    if fields.len() < needed {
        return Err(parse_error(format!(
            "{kind} record needs {needed} values after the tag, got {}",
            fields.len()
        )));
    }

    let number = |s: &str| {
        s.parse::<f64>()
            .map_err(|e| parse_error(format!("invalid number `{s}`: {e}")))
    };

    let raw = fields[..dim]
        .iter()
        .map(|s| number(s.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    let timestamp_us: Timestamp = fields[dim]
        .parse()
        .map_err(|e| parse_error(format!("invalid timestamp `{}`: {e}", fields[dim])))?;
    let truth = fields[dim + 1..needed]
        .iter()
        .map(|s| number(s.trim()))
        .collect::<Result<Vec<_>, _>>()?;

    let message = MeasurementMessage::from_raw(kind, timestamp_us, &raw).map_err(|source| {
        ReplayError::Measurement {
            line: line_no,
            source,
        }
    })?;

    Ok(Some(LabeledMeasurement {
        message,
        truth: CartesianTruth::from_column_slice(&truth),
    }))
}
