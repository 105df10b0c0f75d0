//! Assertion expressions and their evaluation.
//!
//! An expression is `<reference><operator><literal>`, for example
//! `$.firstName==john` or `response.header.content-type:json`.
//! Operators are tried in this order:
//!
//! | operator | meaning                                  |
//! |----------|------------------------------------------|
//! | `===`    | trimmed, case-sensitive equality         |
//! | `==`     | trimmed, case-insensitive equality       |
//! | `:`      | trimmed value contains trimmed literal   |
//!
//! The expression must split into exactly two parts on its operator,
//! otherwise it is skipped.

mod extract;

pub use extract::{ExtractionError, Reference, HEADER_PREFIX};

use std::fmt;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, warn};

use crate::results::{AssertionOutcome, AssertionStatus};
use crate::transport::ResponseSnapshot;

/// Comparison operator of an assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Exact,
    Loose,
    Contains,
}

impl Operator {
    /// Precedence order; `==` is a substring of `===`.
    const ALL: [Operator; 3] = [Operator::Exact, Operator::Loose, Operator::Contains];

    pub fn delimiter(&self) -> &'static str {
        match self {
            Operator::Exact => "===",
            Operator::Loose => "==",
            Operator::Contains => ":",
        }
    }

    /// Compares trimmed operands.
    pub fn compare(&self, actual: &str, expected: &str) -> bool {
        let actual = actual.trim();
        let expected = expected.trim();
        match self {
            Operator::Exact => actual == expected,
            Operator::Loose => actual.to_lowercase() == expected.to_lowercase(),
            Operator::Contains => actual.contains(expected),
        }
    }

    fn describe(&self, actual: &str, expected: &str, passed: bool) -> String {
        let actual = actual.trim();
        let expected = expected.trim();
        match (self, passed) {
            (Operator::Exact, true) => format!("'{}' equals '{}'", actual, expected),
            (Operator::Exact, false) => {
                format!("expected '{}' but got '{}'", expected, actual)
            }
            (Operator::Loose, true) => {
                format!("'{}' equals '{}' (ignoring case)", actual, expected)
            }
            (Operator::Loose, false) => {
                format!("expected '{}' (ignoring case) but got '{}'", expected, actual)
            }
            (Operator::Contains, true) => format!("'{}' contains '{}'", actual, expected),
            (Operator::Contains, false) => {
                format!("expected '{}' to contain '{}'", actual, expected)
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.delimiter())
    }
}

/// Why an expression cannot be evaluated.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no operator found (expected '===', '==' or ':')")]
    NoOperator,

    #[error("'{0}' must split the expression into exactly two parts")]
    AmbiguousSplit(Operator),

    #[error(transparent)]
    Reference(#[from] ExtractionError),
}

/// A parsed assertion expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    /// Original text
    pub expression: String,
    pub operator: Operator,
    pub reference: Reference,
    /// Right-hand literal, untrimmed
    pub expected: String,
}

impl Assertion {
    pub fn parse(expression: &str) -> Result<Self, ParseError> {
        let operator = Operator::ALL
            .into_iter()
            .find(|op| expression.contains(op.delimiter()))
            .ok_or(ParseError::NoOperator)?;

        let parts: Vec<&str> = expression.split(operator.delimiter()).collect();
        let [left, right] = parts.as_slice() else {
            return Err(ParseError::AmbiguousSplit(operator));
        };

        Ok(Self {
            expression: expression.to_string(),
            operator,
            reference: Reference::parse(left)?,
            expected: right.to_string(),
        })
    }

    /// Evaluates the assertion against a response.
    ///
    /// A value that cannot be extracted compares as the empty string and
    /// the reason is appended to the message.
    pub fn evaluate(&self, response: &ResponseSnapshot) -> AssertionOutcome {
        let started = Instant::now();

        let (actual, extraction_note) = match self.reference.extract(response) {
            Ok(value) => (value, None),
            Err(e) => {
                warn!(expression = %self.expression, error = %e, "Could not extract assertion value");
                (String::new(), Some(e.to_string()))
            }
        };

        let passed = self.operator.compare(&actual, &self.expected);
        let mut message = self.operator.describe(&actual, &self.expected, passed);
        if let Some(note) = extraction_note {
            message.push_str(" (");
            message.push_str(&note);
            message.push(')');
        }

        debug!(expression = %self.expression, passed, "Evaluated assertion");

        AssertionOutcome {
            name: self.expression.clone(),
            status: if passed {
                AssertionStatus::Passed
            } else {
                AssertionStatus::Failed
            },
            message,
            duration: started.elapsed().as_millis() as u64,
        }
    }
}

/// Parses and evaluates one expression.
///
/// Expressions that do not parse come back as `Skipped` with the reason.
pub fn evaluate(expression: &str, response: &ResponseSnapshot) -> AssertionOutcome {
    match Assertion::parse(expression) {
        Ok(assertion) => assertion.evaluate(response),
        Err(e) => {
            warn!(expression, error = %e, "Skipping malformed assertion");
            AssertionOutcome {
                name: expression.to_string(),
                status: AssertionStatus::Skipped,
                message: format!("skipped: {}", e),
                duration: 0,
            }
        }
    }
}
