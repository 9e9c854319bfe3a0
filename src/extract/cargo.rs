use super::{parse_number, ExtractError};
use crate::models::Measurement;

const MARKER: &str = " ... bench:";

/// Parse libtest bench output:
/// `test bench_fib_10 ... bench:         135 ns/iter (+/- 24)`
pub fn parse(output: &str) -> Result<Vec<Measurement>, ExtractError> {
    let mut measurements = Vec::new();

    for (index, line) in output.lines().enumerate() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("test ") else {
            continue;
        };
        let Some((name, result)) = rest.split_once(MARKER) else {
            continue;
        };

        let invalid = |reason: &str| ExtractError::InvalidLine {
            line_no: index + 1,
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let mut tokens = result.split_whitespace();
        let value = tokens
            .next()
            .and_then(parse_number)
            .ok_or_else(|| invalid("missing bench value"))?;
        let unit = tokens.next().ok_or_else(|| invalid("missing bench unit"))?;

        let mut measurement = Measurement::new(name.trim(), value, unit);
        if let (Some("(+/-"), Some(dev)) = (tokens.next(), tokens.next()) {
            let dev = dev.trim_end_matches(')').replace(',', "");
            measurement = measurement.with_range(format!("± {}", dev));
        }
        measurements.push(measurement);
    }

    Ok(measurements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cargo_output() {
        let output = "
running 3 tests
test tests::it_works ... ignored
test bench_fib_10 ... bench:         135 ns/iter (+/- 24)
test bench_fib_20 ... bench:      16,502 ns/iter (+/- 1,120)

test result: ok. 0 passed; 0 failed; 1 ignored; 2 measured; 0 filtered out
";
        let measurements = parse(output).unwrap();
        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements[0].name, "bench_fib_10");
        assert_eq!(measurements[0].value, 135.0);
        assert_eq!(measurements[0].unit, "ns/iter");
        assert_eq!(measurements[0].range.as_deref(), Some("± 24"));
        assert_eq!(measurements[1].value, 16502.0);
        assert_eq!(measurements[1].range.as_deref(), Some("± 1120"));
    }

    #[test]
    fn test_missing_value() {
        let err = parse("test broken ... bench: \n").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidLine { reason, .. } if reason == "missing bench value"));
    }
}
