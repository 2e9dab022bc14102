//! Assertion rules and their evaluation.
//!
//! An assertion is a typed rule (kind + operator + expected value) applied
//! to what a probe observed. Evaluation is pure and total: malformed
//! patterns, missing headers and unsupported operator/kind pairs all come
//! back as a failed result with a message, never as an error.

pub mod evaluator;
pub mod types;

pub use evaluator::{evaluate, evaluate_all};
pub use types::{Assertion, AssertionKind, AssertionResult, ExpectedValue, Observed, Operator};
