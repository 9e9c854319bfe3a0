//! Conversion of raw benchmark harness output into measurements.

pub mod cargo;
pub mod custom;
pub mod go;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{Direction, Measurement};

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("No benchmark results found in {format} output")]
    NoBenchmarks { format: ToolFormat },

    #[error("Line {line_no}: {reason}: '{line}'")]
    InvalidLine {
        line_no: usize,
        line: String,
        reason: String,
    },

    #[error("Invalid benchmark JSON: {0}")]
    InvalidJson(String),

    #[error("Unknown output format '{0}'")]
    UnknownFormat(String),
}

/// Output format of a benchmark harness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolFormat {
    #[serde(rename = "go")]
    Go,
    #[serde(rename = "cargo")]
    Cargo,
    #[serde(rename = "customSmallerIsBetter")]
    CustomSmallerIsBetter,
    #[serde(rename = "customBiggerIsBetter")]
    CustomBiggerIsBetter,
}

impl ToolFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolFormat::Go => "go",
            ToolFormat::Cargo => "cargo",
            ToolFormat::CustomSmallerIsBetter => "customSmallerIsBetter",
            ToolFormat::CustomBiggerIsBetter => "customBiggerIsBetter",
        }
    }

    /// Direction implied by the format itself, if any. Harness formats
    /// report times, so they defer to the configured policy.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            ToolFormat::CustomSmallerIsBetter => Some(Direction::LowerIsBetter),
            ToolFormat::CustomBiggerIsBetter => Some(Direction::HigherIsBetter),
            ToolFormat::Go | ToolFormat::Cargo => None,
        }
    }
}

impl fmt::Display for ToolFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "go" => Ok(ToolFormat::Go),
            "cargo" => Ok(ToolFormat::Cargo),
            "customSmallerIsBetter" => Ok(ToolFormat::CustomSmallerIsBetter),
            "customBiggerIsBetter" => Ok(ToolFormat::CustomBiggerIsBetter),
            other => Err(ExtractError::UnknownFormat(other.to_string())),
        }
    }
}

/// Extract every measurement from `output`; an output with none is an error
pub fn extract(format: ToolFormat, output: &str) -> Result<Vec<Measurement>, ExtractError> {
    let measurements = match format {
        ToolFormat::Go => go::parse(output)?,
        ToolFormat::Cargo => cargo::parse(output)?,
        ToolFormat::CustomSmallerIsBetter | ToolFormat::CustomBiggerIsBetter => {
            custom::parse(output)?
        }
    };

    if measurements.is_empty() {
        return Err(ExtractError::NoBenchmarks { format });
    }
    Ok(measurements)
}

/// Parse a number that may carry thousands separators
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
