use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verdict of one assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionStatus {
    Passed,
    Failed,
    /// The expression could not be evaluated at all. Recorded for
    /// visibility but not counted in the summary's `tests`.
    Skipped,
}

/// Outcome of evaluating one assertion expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionOutcome {
    /// The expression text as declared
    pub name: String,
    pub status: AssertionStatus,
    /// Human-readable comparison
    pub message: String,
    /// Evaluation time in milliseconds
    #[serde(default)]
    pub duration: u64,
}

/// Pass/fail counters for one run of one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub tests: u32,
    pub passed: u32,
    pub failed: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub skipped: u32,
    /// When the case started
    pub start: DateTime<Utc>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Summary {
    /// Creates zeroed counters starting now.
    pub fn start_now() -> Self {
        Self {
            tests: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            start: Utc::now(),
        }
    }

    /// Counts one outcome.
    pub fn record(&mut self, status: AssertionStatus) {
        match status {
            AssertionStatus::Passed => {
                self.tests += 1;
                self.passed += 1;
            }
            AssertionStatus::Failed => {
                self.tests += 1;
                self.failed += 1;
            }
            AssertionStatus::Skipped => self.skipped += 1,
        }
    }
}

/// Ordered assertion outcomes plus their summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub results: Vec<AssertionOutcome>,
    pub summary: Summary,
}

impl ResultSet {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            summary: Summary::start_now(),
        }
    }

    /// Appends an outcome and updates the counters.
    pub fn push(&mut self, outcome: AssertionOutcome) {
        self.summary.record(outcome.status);
        self.results.push(outcome);
    }
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::new()
    }
}

/// The record of one execution of one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    /// Name of the test case this result belongs to
    pub test_case: String,
    /// HTTP status of the response; absent if no response arrived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Raw response body
    #[serde(default)]
    pub body: String,
    /// Raw response headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub result_set: ResultSet,
    /// Why the request never produced a response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaseResult {
    /// A result for a case whose request could not be completed.
    ///
    /// No assertion is evaluated, so all counters stay at zero.
    pub fn request_failed(test_case: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            test_case: test_case.into(),
            status: None,
            body: String::new(),
            headers: BTreeMap::new(),
            result_set: ResultSet::new(),
            error: Some(error.into()),
        }
    }

    pub fn summary(&self) -> &Summary {
        &self.result_set.summary
    }

    /// True when the request succeeded and no assertion failed.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.result_set.summary.failed == 0
    }
}

/// Latest summary of every executed case in a suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteResultDocument {
    /// Case name to its most recent summary
    #[serde(default)]
    pub results: BTreeMap<String, Summary>,
    pub updated: DateTime<Utc>,
}

impl SuiteResultDocument {
    /// An empty document, as created alongside a new suite.
    pub fn empty() -> Self {
        Self {
            results: BTreeMap::new(),
            updated: Utc::now(),
        }
    }

    /// Replaces the entry for the result's case with its summary.
    pub fn apply(&mut self, result: &CaseResult) {
        self.results
            .insert(result.test_case.clone(), result.summary().clone());
        self.updated = Utc::now();
    }
}

/// Append-only run history of one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResultDocument {
    pub test_case_id: String,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub results: Vec<CaseResult>,
}

impl CaseResultDocument {
    pub fn empty(test_case_id: impl Into<String>) -> Self {
        Self {
            test_case_id: test_case_id.into(),
            updated: Utc::now(),
            results: Vec::new(),
        }
    }

    /// Appends a run; earlier entries are never touched.
    pub fn append(&mut self, result: CaseResult) {
        self.results.push(result);
        self.updated = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: AssertionStatus) -> AssertionOutcome {
        AssertionOutcome {
            name: "x==y".to_string(),
            status,
            message: String::new(),
            duration: 0,
        }
    }

    #[test]
    fn test_skipped_not_counted_as_test() {
        let mut set = ResultSet::new();
        set.push(outcome(AssertionStatus::Passed));
        set.push(outcome(AssertionStatus::Failed));
        set.push(outcome(AssertionStatus::Skipped));

        assert_eq!(set.summary.tests, 2);
        assert_eq!(set.summary.passed, 1);
        assert_eq!(set.summary.failed, 1);
        assert_eq!(set.summary.skipped, 1);
        assert_eq!(set.results.len(), 3);
    }

    #[test]
    fn test_request_failed_has_zero_counts() {
        let result = CaseResult::request_failed("t1", "connection refused");
        assert_eq!(result.summary().tests, 0);
        assert_eq!(result.summary().passed, 0);
        assert!(result.error.is_some());
        assert!(!result.is_success());
    }

    #[test]
    fn test_suite_document_keeps_latest_summary() {
        let mut doc = SuiteResultDocument::empty();
        let mut first = CaseResult::request_failed("t1", "boom");
        first.error = None;
        first.result_set.push(outcome(AssertionStatus::Passed));
        doc.apply(&first);
        let before = doc.updated;

        let mut second = first.clone();
        second.result_set = ResultSet::new();
        second.result_set.push(outcome(AssertionStatus::Failed));
        doc.apply(&second);

        assert_eq!(doc.results.len(), 1);
        assert_eq!(doc.results["t1"].failed, 1);
        assert_eq!(doc.results["t1"].passed, 0);
        assert!(doc.updated >= before);
    }

    #[test]
    fn test_case_result_wire_names() {
        let result = CaseResult::request_failed("t1", "timeout");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["testCase"], "t1");
        assert!(json.get("resultSet").is_some());
        assert!(json.get("status").is_none());
    }
}
