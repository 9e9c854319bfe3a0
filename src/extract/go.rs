use tracing::debug;

use super::{parse_number, ExtractError};
use crate::models::Measurement;

/// Parse `go test -bench` output.
///
/// ```text
/// BenchmarkFib10-8   	 3000000	       413 ns/op	      16 B/op	       1 allocs/op
/// ```
///
/// The first metric becomes the measurement; the iteration count and any
/// further metrics are kept in `extra`.
pub fn parse(output: &str) -> Result<Vec<Measurement>, ExtractError> {
    let mut measurements = Vec::new();

    for (index, line) in output.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(name) = tokens.first() else {
            continue;
        };
        if !name.starts_with("Benchmark") || tokens.len() < 4 {
            continue;
        }
        let Ok(iterations) = tokens[1].parse::<u64>() else {
            debug!(line = index + 1, "Skipping Benchmark line without iteration count");
            continue;
        };

        let metrics = &tokens[2..];
        if metrics.len() % 2 != 0 {
            return Err(ExtractError::InvalidLine {
                line_no: index + 1,
                line: line.to_string(),
                reason: "metrics must be value/unit pairs".to_string(),
            });
        }

        let value = parse_number(metrics[0]).ok_or_else(|| ExtractError::InvalidLine {
            line_no: index + 1,
            line: line.to_string(),
            reason: format!("'{}' is not a number", metrics[0]),
        })?;

        let mut extra = format!("{} times", iterations);
        for pair in metrics[2..].chunks(2) {
            extra.push_str(&format!("\n{} {}", pair[0], pair[1]));
        }

        measurements.push(Measurement::new(*name, value, metrics[1]).with_extra(extra));
    }

    Ok(measurements)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "goos: linux
goarch: amd64
pkg: github.com/example/fib
BenchmarkFib10-8   	 3000000	       413 ns/op	      16 B/op	       1 allocs/op
BenchmarkFib20-8   	   30000	     52049 ns/op
PASS
ok  	github.com/example/fib	3.021s
";

    #[test]
    fn test_parse_go_output() {
        let measurements = parse(OUTPUT).unwrap();
        assert_eq!(measurements.len(), 2);

        let first = &measurements[0];
        assert_eq!(first.name, "BenchmarkFib10-8");
        assert_eq!(first.value, 413.0);
        assert_eq!(first.unit, "ns/op");
        assert_eq!(
            first.extra.as_deref(),
            Some("3000000 times\n16 B/op\n1 allocs/op")
        );

        assert_eq!(measurements[1].value, 52049.0);
        assert_eq!(measurements[1].extra.as_deref(), Some("30000 times"));
    }

    #[test]
    fn test_bad_metric_value() {
        let err = parse("BenchmarkX-4  100  fast ns/op\n").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidLine { line_no: 1, .. }));
    }

    #[test]
    fn test_ignores_log_lines() {
        let measurements = parse("BenchmarkX starting warmup\n").unwrap();
        assert!(measurements.is_empty());
    }
}
