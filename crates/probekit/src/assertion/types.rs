use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// What part of the observed response an assertion looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssertionKind {
    Status,
    Header,
    Body,
    ResponseTime,
    /// Any kind this build does not know about; always fails
    #[serde(other)]
    Unknown,
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssertionKind::Status => "status",
            AssertionKind::Header => "header",
            AssertionKind::Body => "body",
            AssertionKind::ResponseTime => "responseTime",
            AssertionKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    Matches,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::Contains => "contains",
            Operator::NotContains => "notContains",
            Operator::Matches => "matches",
            Operator::GreaterThan => "greaterThan",
            Operator::LessThan => "lessThan",
            Operator::GreaterThanOrEqual => "greaterThanOrEqual",
            Operator::LessThanOrEqual => "lessThanOrEqual",
            Operator::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Expected value of an assertion, as written by the user (string or number)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpectedValue {
    Number(serde_json::Number),
    Text(String),
}

impl ExpectedValue {
    /// Numeric view; text is parsed leniently (surrounding whitespace ignored)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ExpectedValue::Number(n) => n.as_f64(),
            ExpectedValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// String view; numbers render without a trailing `.0`
    pub fn as_text(&self) -> String {
        match self {
            ExpectedValue::Number(n) => n.to_string(),
            ExpectedValue::Text(s) => s.clone(),
        }
    }
}

impl From<u16> for ExpectedValue {
    fn from(value: u16) -> Self {
        ExpectedValue::Number(value.into())
    }
}

impl From<u64> for ExpectedValue {
    fn from(value: u64) -> Self {
        ExpectedValue::Number(value.into())
    }
}

impl From<&str> for ExpectedValue {
    fn from(value: &str) -> Self {
        ExpectedValue::Text(value.to_string())
    }
}

impl From<String> for ExpectedValue {
    fn from(value: String) -> Self {
        ExpectedValue::Text(value)
    }
}

/// A typed pass/fail rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    #[serde(rename = "type", alias = "kind")]
    pub kind: AssertionKind,

    #[serde(rename = "condition", alias = "operator")]
    pub operator: Operator,

    pub value: ExpectedValue,

    /// Header name for header assertions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

impl Assertion {
    pub fn new(kind: AssertionKind, operator: Operator, value: impl Into<ExpectedValue>) -> Self {
        Self { kind, operator, value: value.into(), property: None }
    }

    pub fn status(operator: Operator, value: impl Into<ExpectedValue>) -> Self {
        Self::new(AssertionKind::Status, operator, value)
    }

    pub fn header(
        name: impl Into<String>,
        operator: Operator,
        value: impl Into<ExpectedValue>,
    ) -> Self {
        Self { property: Some(name.into()), ..Self::new(AssertionKind::Header, operator, value) }
    }

    pub fn body(operator: Operator, value: impl Into<ExpectedValue>) -> Self {
        Self::new(AssertionKind::Body, operator, value)
    }

    pub fn response_time(operator: Operator, millis: u64) -> Self {
        Self::new(AssertionKind::ResponseTime, operator, millis)
    }
}

/// Outcome of evaluating one assertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionResult {
    pub passed: bool,
    pub message: String,
    pub assertion: Assertion,
}

/// What a probe observed; `None` fields were not available for this protocol
#[derive(Debug, Clone, Copy, Default)]
pub struct Observed<'a> {
    pub status_code: Option<u16>,
    pub headers: Option<&'a BTreeMap<String, String>>,
    pub body: Option<&'a str>,
    pub response_time_ms: Option<u64>,
}
