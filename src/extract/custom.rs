use super::ExtractError;
use crate::models::Measurement;

/// Parse a JSON array of `{name, value, unit, range?, extra?}` objects
pub fn parse(output: &str) -> Result<Vec<Measurement>, ExtractError> {
    serde_json::from_str(output.trim()).map_err(|e| ExtractError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_custom_json() {
        let measurements = parse(
            r#"[
                {"name": "My Custom Bench", "unit": "Megabytes", "value": 100, "range": "3", "extra": "Value for Tooltip: 25"},
                {"name": "Throughput", "unit": "ops/sec", "value": 1532.5}
            ]"#,
        )
        .unwrap();

        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements[0].value, 100.0);
        assert_eq!(measurements[0].range.as_deref(), Some("3"));
        assert_eq!(measurements[1].extra, None);
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(matches!(parse(r#"{"name":"x"}"#), Err(ExtractError::InvalidJson(_))));
    }
}
