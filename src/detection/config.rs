use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Direction;

/// Configuration for regression detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Number of prior values forming the baseline
    pub window_size: usize,
    /// Relative change tolerated before a verdict flips (0.10 = 10%)
    pub threshold: f64,
    /// Per-benchmark threshold overrides, keyed by measurement name
    pub thresholds: HashMap<String, f64>,
    /// Which way each metric improves
    pub directions: DirectionPolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            threshold: 0.10,
            thresholds: HashMap::new(),
            directions: DirectionPolicy::default(),
        }
    }
}

impl DetectionConfig {
    pub fn threshold_for(&self, name: &str) -> f64 {
        self.thresholds.get(name).copied().unwrap_or(self.threshold)
    }

    pub fn direction_for(&self, tool: &str, name: &str) -> Direction {
        self.directions.resolve(tool, name)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 {
            return Err("window_size must be greater than 0".to_string());
        }
        validate_threshold("threshold", self.threshold)?;
        for (name, threshold) in &self.thresholds {
            validate_threshold(&format!("thresholds.{}", name), *threshold)?;
        }
        Ok(())
    }
}

fn validate_threshold(field: &str, threshold: f64) -> Result<(), String> {
    if !threshold.is_finite() || !(0.0..1.0).contains(&threshold) {
        return Err(format!("{} must be within [0, 1), got {}", field, threshold));
    }
    Ok(())
}

/// Direction lookup: benchmark name first, then tool, then the default.
///
/// Direction is always configured, never guessed from units or values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionPolicy {
    pub default: Direction,
    pub tools: HashMap<String, Direction>,
    pub benchmarks: HashMap<String, Direction>,
}

impl DirectionPolicy {
    pub fn resolve(&self, tool: &str, name: &str) -> Direction {
        self.benchmarks
            .get(name)
            .or_else(|| self.tools.get(tool))
            .copied()
            .unwrap_or(self.default)
    }

    pub fn with_tool(mut self, tool: impl Into<String>, direction: Direction) -> Self {
        self.tools.insert(tool.into(), direction);
        self
    }

    pub fn with_benchmark(mut self, name: impl Into<String>, direction: Direction) -> Self {
        self.benchmarks.insert(name.into(), direction);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benchmark_direction_overrides_tool() {
        let policy = DirectionPolicy::default()
            .with_tool("benchmarkjs", Direction::HigherIsBetter)
            .with_benchmark("bundle_size", Direction::LowerIsBetter);

        assert_eq!(policy.resolve("benchmarkjs", "parse"), Direction::HigherIsBetter);
        assert_eq!(policy.resolve("benchmarkjs", "bundle_size"), Direction::LowerIsBetter);
        assert_eq!(policy.resolve("go", "parse"), Direction::LowerIsBetter);
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let mut config = DetectionConfig::default();
        assert!(config.validate().is_ok());

        config.threshold = 1.0;
        assert!(config.validate().is_err());

        config.threshold = 0.1;
        config.thresholds.insert("noisy".to_string(), f64::NAN);
        assert!(config.validate().is_err());

        config.thresholds.clear();
        config.window_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_yaml() {
        let yaml = r#"
threshold: 0.2
directions:
  tools:
    customBiggerIsBetter: higher_is_better
"#;
        let config: DetectionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.window_size, 5);
        assert_eq!(config.threshold, 0.2);
        assert_eq!(
            config.direction_for("customBiggerIsBetter", "x"),
            Direction::HigherIsBetter
        );
    }
}
