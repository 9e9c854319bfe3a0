use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::detection::DirectionPolicy;
use crate::models::{CommitInfo, Direction, Entry, Measurement};

/// Entry as received from a CI collaborator, before validation.
///
/// Every field is optional so that a missing field is reported as a
/// validation issue alongside all the others instead of stopping at the
/// first deserialization error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub commit: Option<CommitInfo>,
    /// Epoch milliseconds; the ingestion time is used when absent
    #[serde(default)]
    pub date: Option<i64>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub benches: Option<Vec<RawMeasurement>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub extra: Option<String>,
}

impl From<Measurement> for RawMeasurement {
    fn from(m: Measurement) -> Self {
        Self {
            name: Some(m.name),
            value: Some(m.value),
            unit: Some(m.unit),
            range: m.range,
            extra: m.extra,
        }
    }
}

impl From<Entry> for RawEntry {
    fn from(entry: Entry) -> Self {
        Self {
            commit: Some(entry.commit),
            date: Some(entry.timestamp.timestamp_millis()),
            tool: Some(entry.tool),
            benches: Some(entry.measurements.into_iter().map(Into::into).collect()),
        }
    }
}

/// Turns a [`RawEntry`] into a well-formed [`Entry`] or the full list of
/// problems with it
pub struct EntryValidator<'a> {
    directions: &'a DirectionPolicy,
}

impl<'a> EntryValidator<'a> {
    pub fn new(directions: &'a DirectionPolicy) -> Self {
        Self { directions }
    }

    /// `tool_hint` is the partition named by the caller (URL path, CLI flag);
    /// it must agree with the payload's own `tool` when both are present.
    pub fn validate(
        &self,
        raw: RawEntry,
        tool_hint: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Entry, Vec<String>> {
        let mut issues = Vec::new();

        let tool = match (tool_hint.map(str::trim), raw.tool.as_deref().map(str::trim)) {
            (Some(hint), Some(own)) if hint != own => {
                issues.push(format!(
                    "tool '{}' in payload does not match requested tool '{}'",
                    own, hint
                ));
                String::new()
            }
            (Some(tool), _) | (None, Some(tool)) => tool.to_string(),
            (None, None) => String::new(),
        };
        if tool.is_empty() && issues.is_empty() {
            issues.push("tool is missing".to_string());
        }

        let mut commit = raw.commit.unwrap_or_default();
        commit.id = commit.id.trim().to_string();
        if commit.id.is_empty() {
            issues.push("commit.id is missing".to_string());
        }

        let timestamp = match raw.date {
            Some(millis) => match Utc.timestamp_millis_opt(millis).single() {
                Some(ts) => ts,
                None => {
                    issues.push(format!("date {} is out of range", millis));
                    now
                }
            },
            None => now,
        };

        let raw_benches = raw.benches.unwrap_or_default();
        if raw_benches.is_empty() {
            issues.push("benches must contain at least one measurement".to_string());
        }

        let mut measurements = Vec::with_capacity(raw_benches.len());
        let mut seen = HashSet::new();
        for (index, raw_measurement) in raw_benches.into_iter().enumerate() {
            if let Some(m) = self.validate_measurement(&tool, index, raw_measurement, &mut issues) {
                if !seen.insert(m.name.clone()) {
                    issues.push(format!("benches[{}].name '{}' is duplicated", index, m.name));
                    continue;
                }
                measurements.push(m);
            }
        }

        if !issues.is_empty() {
            return Err(issues);
        }

        Ok(Entry {
            commit,
            timestamp,
            tool,
            measurements,
        })
    }

    fn validate_measurement(
        &self,
        tool: &str,
        index: usize,
        raw: RawMeasurement,
        issues: &mut Vec<String>,
    ) -> Option<Measurement> {
        let before = issues.len();

        let name = raw.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() {
            issues.push(format!("benches[{}].name is missing", index));
        }

        let unit = raw.unit.map(|u| u.trim().to_string()).unwrap_or_default();
        if unit.is_empty() {
            issues.push(format!("benches[{}].unit is missing", index));
        }

        let value = match raw.value {
            None => {
                issues.push(format!("benches[{}].value is missing", index));
                0.0
            }
            Some(v) if !v.is_finite() => {
                issues.push(format!("benches[{}].value is not finite", index));
                0.0
            }
            Some(v) => v,
        };

        if value < 0.0 && self.directions.resolve(tool, &name) == Direction::LowerIsBetter {
            issues.push(format!(
                "benches[{}].value {} is negative for lower-is-better metric",
                index, value
            ));
        }

        if issues.len() > before {
            return None;
        }

        Some(Measurement {
            name,
            value,
            unit,
            range: raw.range,
            extra: raw.extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn raw(json: &str) -> RawEntry {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_valid_entry() {
        let policy = DirectionPolicy::default();
        let entry = EntryValidator::new(&policy)
            .validate(
                raw(r#"{"commit":{"id":"c1"},"date":1000,"tool":"go",
                    "benches":[{"name":" BenchmarkA ","value":12.0,"unit":"ns/op","extra":"100 times"}]}"#),
                None,
                now(),
            )
            .unwrap();

        assert_eq!(entry.tool, "go");
        assert_eq!(entry.timestamp.timestamp_millis(), 1000);
        assert_eq!(entry.measurements[0].name, "BenchmarkA");
        assert_eq!(entry.measurements[0].extra.as_deref(), Some("100 times"));
    }

    #[test]
    fn test_commit_id_is_trimmed() {
        let policy = DirectionPolicy::default();
        let validator = EntryValidator::new(&policy);

        let entry = validator
            .validate(
                raw(r#"{"commit":{"id":"  c1 "},"tool":"go","benches":[{"name":"A","value":1.0,"unit":"ns/op"}]}"#),
                None,
                now(),
            )
            .unwrap();
        assert_eq!(entry.commit.id, "c1");

        let issues = validator
            .validate(
                raw(r#"{"commit":{"id":"   "},"tool":"go","benches":[{"name":"A","value":1.0,"unit":"ns/op"}]}"#),
                None,
                now(),
            )
            .unwrap_err();
        assert_eq!(issues, vec!["commit.id is missing".to_string()]);
    }

    #[test]
    fn test_collects_every_issue() {
        let policy = DirectionPolicy::default();
        let issues = EntryValidator::new(&policy)
            .validate(
                raw(r#"{"benches":[{"name":"A","value":-1.0,"unit":"ns/op"},{"value":1.0},{"name":"A","value":2.0,"unit":"ns/op"}]}"#),
                None,
                now(),
            )
            .unwrap_err();

        let joined = issues.join("\n");
        assert!(joined.contains("tool is missing"));
        assert!(joined.contains("commit.id is missing"));
        assert!(joined.contains("benches[0].value -1 is negative"));
        assert!(joined.contains("benches[1].name is missing"));
        assert!(joined.contains("benches[1].unit is missing"));
        // benches[0] was rejected, so the third one is the first valid "A"
        assert!(!joined.contains("duplicated"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let policy = DirectionPolicy::default();
        let issues = EntryValidator::new(&policy)
            .validate(
                raw(r#"{"commit":{"id":"c1"},"tool":"go","benches":[
                    {"name":"A","value":1.0,"unit":"ns/op"},
                    {"name":"A","value":2.0,"unit":"ns/op"}]}"#),
                None,
                now(),
            )
            .unwrap_err();
        assert_eq!(issues, vec!["benches[1].name 'A' is duplicated".to_string()]);
    }

    #[test]
    fn test_empty_benches_and_non_finite_values() {
        let policy = DirectionPolicy::default();
        let validator = EntryValidator::new(&policy);

        let issues = validator
            .validate(raw(r#"{"commit":{"id":"c1"},"tool":"go","benches":[]}"#), None, now())
            .unwrap_err();
        assert_eq!(issues, vec!["benches must contain at least one measurement".to_string()]);

        let entry = RawEntry {
            commit: Some(CommitInfo::new("c1")),
            date: None,
            tool: Some("go".to_string()),
            benches: Some(vec![Measurement::new("A", f64::INFINITY, "ns/op").into()]),
        };
        let issues = validator.validate(entry, None, now()).unwrap_err();
        assert_eq!(issues, vec!["benches[0].value is not finite".to_string()]);
    }

    #[test]
    fn test_negative_allowed_for_higher_is_better() {
        let policy = DirectionPolicy::default().with_tool("delta", Direction::HigherIsBetter);
        let entry = EntryValidator::new(&policy)
            .validate(
                raw(r#"{"commit":{"id":"c1"},"benches":[{"name":"gain","value":-3.5,"unit":"%"}]}"#),
                Some("delta"),
                now(),
            )
            .unwrap();
        assert_eq!(entry.measurements[0].value, -3.5);
    }

    #[test]
    fn test_tool_hint_must_match_payload() {
        let policy = DirectionPolicy::default();
        let validator = EntryValidator::new(&policy);
        let body = r#"{"commit":{"id":"c1"},"tool":"go","benches":[{"name":"A","value":1.0,"unit":"ns/op"}]}"#;

        assert!(validator.validate(raw(body), Some("go"), now()).is_ok());
        let issues = validator.validate(raw(body), Some("js-bench"), now()).unwrap_err();
        assert!(issues[0].contains("does not match"));
    }

    #[test]
    fn test_missing_date_uses_ingestion_time() {
        let policy = DirectionPolicy::default();
        let entry = EntryValidator::new(&policy)
            .validate(
                raw(r#"{"commit":{"id":"c1"},"tool":"go","benches":[{"name":"A","value":1.0,"unit":"ns/op"}]}"#),
                None,
                now(),
            )
            .unwrap();
        assert_eq!(entry.timestamp, now());
    }
}
