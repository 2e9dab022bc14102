use regex::RegexBuilder;

use super::types::{Assertion, AssertionKind, AssertionResult, ExpectedValue, Observed, Operator};

/// Compiled size cap for user-supplied patterns
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Evaluate one assertion against an observed response.
///
/// Never fails: every input yields a definite `passed` flag and a message.
pub fn evaluate(assertion: &Assertion, observed: &Observed<'_>) -> AssertionResult {
    let (passed, message) = match assertion.kind {
        AssertionKind::Status => match observed.status_code {
            Some(code) => compare_numeric(assertion, f64::from(code), "Status"),
            None => (false, "No status code available".to_string()),
        },
        AssertionKind::ResponseTime => match observed.response_time_ms {
            // Precision loss only past 2^53 ms.
            #[allow(clippy::cast_precision_loss)]
            Some(millis) => compare_numeric(assertion, millis as f64, "Response time"),
            None => (false, "No response time available".to_string()),
        },
        AssertionKind::Header => evaluate_header(assertion, observed),
        AssertionKind::Body => match observed.body {
            Some(body) => compare_text(assertion.operator, body, &assertion.value, "Body"),
            None => (false, "No body available".to_string()),
        },
        AssertionKind::Unknown => (false, "Invalid assertion type".to_string()),
    };

    AssertionResult { passed, message, assertion: assertion.clone() }
}

/// Evaluate every assertion; one failing never stops the rest.
pub fn evaluate_all(assertions: &[Assertion], observed: &Observed<'_>) -> Vec<AssertionResult> {
    assertions.iter().map(|assertion| evaluate(assertion, observed)).collect()
}

fn evaluate_header(assertion: &Assertion, observed: &Observed<'_>) -> (bool, String) {
    let Some(property) = assertion.property.as_deref().filter(|p| !p.trim().is_empty()) else {
        return (false, "Header assertion requires a property".to_string());
    };
    let Some(headers) = observed.headers else {
        return (false, "No headers available".to_string());
    };

    // Stored names are lower-case; users write them however they like.
    let value = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(property))
        .map(|(_, value)| value);

    match value {
        Some(value) => {
            compare_text(assertion.operator, value, &assertion.value, &format!("Header {property}"))
        }
        None => (false, format!("Header {property} not found")),
    }
}

#[allow(clippy::float_cmp)]
fn compare_numeric(assertion: &Assertion, actual: f64, label: &str) -> (bool, String) {
    let Some(expected) = assertion.value.as_number() else {
        return (
            false,
            format!("{label} expected value \"{}\" is not a number", assertion.value.as_text()),
        );
    };
    let (a, e) = (format_number(actual), format_number(expected));

    match assertion.operator {
        Operator::Equals => (actual == expected, format!("{label} {a} equals {e}")),
        Operator::NotEquals => (actual != expected, format!("{label} {a} not equals {e}")),
        Operator::GreaterThan => (actual > expected, format!("{label} {a} greater than {e}")),
        Operator::LessThan => (actual < expected, format!("{label} {a} less than {e}")),
        Operator::GreaterThanOrEqual => (actual >= expected, format!("{label} {a} >= {e}")),
        Operator::LessThanOrEqual => (actual <= expected, format!("{label} {a} <= {e}")),
        Operator::Contains | Operator::NotContains | Operator::Matches | Operator::Unknown => (
            false,
            format!("Operator {} is not supported for {} assertions", assertion.operator, label),
        ),
    }
}

fn compare_text(
    operator: Operator,
    actual: &str,
    expected: &ExpectedValue,
    label: &str,
) -> (bool, String) {
    let expected = expected.as_text();

    match operator {
        Operator::Equals => (actual == expected, format!("{label} equals expected value")),
        Operator::NotEquals => (actual != expected, format!("{label} not equals expected value")),
        Operator::Contains => (actual.contains(&expected), format!("{label} contains \"{expected}\"")),
        Operator::NotContains => {
            (!actual.contains(&expected), format!("{label} does not contain \"{expected}\""))
        }
        Operator::Matches => match RegexBuilder::new(&expected).size_limit(PATTERN_SIZE_LIMIT).build()
        {
            Ok(pattern) => (pattern.is_match(actual), format!("{label} matches pattern {expected}")),
            Err(error) => (false, format!("Invalid regex pattern: {error}")),
        },
        Operator::GreaterThan
        | Operator::LessThan
        | Operator::GreaterThanOrEqual
        | Operator::LessThanOrEqual
        | Operator::Unknown => {
            (false, format!("Operator {operator} is not supported for {label} assertions"))
        }
    }
}

/// Integral values print without a fractional part (`404`, not `404.0`).
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        let integral = value as i64;
        integral.to_string()
    } else {
        value.to_string()
    }
}
