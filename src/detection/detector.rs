//! Regression classification.
//!
//! The detector is a pure function of a new entry, the baseline window read
//! from history before that entry was stored, and the detection config. It
//! performs no I/O and every input has a verdict, so it cannot fail.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::detection::{BaselineStats, DetectionConfig};
use crate::models::{Direction, Entry, Measurement};
use crate::storage::{HistoryPoint, HistoryView};

/// Classification of one measurement against its baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No prior values: first observation
    Baseline,
    Stable,
    Improved,
    Regressed,
    /// Ratio undefined (zero reference or zero higher-is-better value)
    Indeterminate,
    /// Unit differs from the previous observation; not comparable
    UnitChanged,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Baseline => "baseline",
            Verdict::Stable => "stable",
            Verdict::Improved => "improved",
            Verdict::Regressed => "regressed",
            Verdict::Indeterminate => "indeterminate",
            Verdict::UnitChanged => "unit_changed",
        };
        f.write_str(label)
    }
}

/// Per-measurement classification record handed to reporting collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementReport {
    pub name: String,
    pub unit: String,
    pub value: f64,
    pub verdict: Verdict,
    pub direction: Direction,
    pub threshold: f64,
    /// Median of the baseline window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<f64>,
    /// Greater than 1 means worse, whatever the direction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<BaselineStats>,
}

/// Prior points per measurement name, newest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineWindow {
    series: HashMap<String, Vec<HistoryPoint>>,
}

impl BaselineWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, points: Vec<HistoryPoint>) {
        self.series.insert(name.into(), points);
    }

    pub fn insert_view(&mut self, view: &HistoryView) {
        self.insert(view.name(), view.to_vec());
    }

    pub fn points(&self, name: &str) -> &[HistoryPoint] {
        self.series.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Counts of each verdict in one ingestion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictSummary {
    pub baseline: usize,
    pub stable: usize,
    pub improved: usize,
    pub regressed: usize,
    pub indeterminate: usize,
    pub unit_changed: usize,
}

impl VerdictSummary {
    pub fn from_reports(reports: &[MeasurementReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            match report.verdict {
                Verdict::Baseline => summary.baseline += 1,
                Verdict::Stable => summary.stable += 1,
                Verdict::Improved => summary.improved += 1,
                Verdict::Regressed => summary.regressed += 1,
                Verdict::Indeterminate => summary.indeterminate += 1,
                Verdict::UnitChanged => summary.unit_changed += 1,
            }
        }
        summary
    }

    pub fn has_regressions(&self) -> bool {
        self.regressed > 0
    }
}

/// Regression detector with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct RegressionDetector {
    config: DetectionConfig,
}

impl RegressionDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Classify every measurement of `entry`, in entry order
    pub fn classify_entry(&self, entry: &Entry, window: &BaselineWindow) -> Vec<MeasurementReport> {
        entry
            .measurements
            .iter()
            .map(|m| self.classify(&entry.tool, m, window.points(&m.name)))
            .collect()
    }

    /// Classify one measurement against prior points (newest first)
    pub fn classify(
        &self,
        tool: &str,
        measurement: &Measurement,
        prior: &[HistoryPoint],
    ) -> MeasurementReport {
        let direction = self.config.direction_for(tool, &measurement.name);
        let threshold = self.config.threshold_for(&measurement.name);
        let mut report = MeasurementReport {
            name: measurement.name.clone(),
            unit: measurement.unit.clone(),
            value: measurement.value,
            verdict: Verdict::Baseline,
            direction,
            threshold,
            reference: None,
            ratio: None,
            previous_unit: None,
            baseline: None,
        };

        let Some(latest) = prior.first() else {
            return report;
        };

        if latest.unit != measurement.unit {
            report.verdict = Verdict::UnitChanged;
            report.previous_unit = Some(latest.unit.clone());
            return report;
        }

        // Only the run of values since the last unit change is comparable
        let values: Vec<f64> = prior
            .iter()
            .take_while(|p| p.unit == measurement.unit)
            .take(self.config.window_size)
            .map(|p| p.value)
            .collect();

        let Some(stats) = BaselineStats::from_values(&values) else {
            return report;
        };
        let reference = stats.median;
        report.reference = Some(reference);
        report.baseline = Some(stats);

        match regression_ratio(measurement.value, reference, direction) {
            Some(ratio) => {
                report.ratio = Some(ratio);
                report.verdict = classify_ratio(ratio, threshold);
            }
            None => report.verdict = Verdict::Indeterminate,
        }
        report
    }
}

/// `value / reference` for lower-is-better metrics and `reference / value`
/// for higher-is-better ones; `None` when undefined.
///
/// Both operands must be positive (a lower-is-better value may be zero).
/// Across a sign change the quotient is negative and would read as an
/// improvement, so that case is undefined too.
pub fn regression_ratio(value: f64, reference: f64, direction: Direction) -> Option<f64> {
    if reference <= 0.0 {
        return None;
    }
    let ratio = match direction {
        Direction::LowerIsBetter if value >= 0.0 => value / reference,
        Direction::HigherIsBetter if value > 0.0 => reference / value,
        _ => return None,
    };
    ratio.is_finite().then_some(ratio)
}

pub fn classify_ratio(ratio: f64, threshold: f64) -> Verdict {
    if ratio > 1.0 + threshold {
        Verdict::Regressed
    } else if ratio < 1.0 - threshold {
        Verdict::Improved
    } else {
        Verdict::Stable
    }
}
