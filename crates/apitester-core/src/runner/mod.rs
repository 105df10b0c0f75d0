mod case;

pub use case::{CaseExecutor, CaseState};

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::aggregator::{AggregationError, ResultsAggregator};
use crate::cancel::CancelToken;
use crate::results::CaseResult;
use crate::storage::Storage;
use crate::suite::TestSuite;
use crate::transport::HttpTransport;

/// Destination for case results as they complete.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, suite_id: &str, result: &CaseResult) -> Result<(), AggregationError>;
}

#[async_trait]
impl<S: Storage> ResultSink for ResultsAggregator<S> {
    async fn record(&self, suite_id: &str, result: &CaseResult) -> Result<(), AggregationError> {
        ResultsAggregator::record(self, suite_id, result).await
    }
}

/// A case whose result could not be recorded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    pub test_case: String,
    pub error: String,
}

/// Outcome of one suite run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteRun {
    pub suite_id: String,
    /// Case results in suite order
    pub results: Vec<CaseResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RecordFailure>,
    /// True if the run stopped early on request
    pub cancelled: bool,
}

impl SuiteRun {
    /// True when every executed case succeeded and every result was recorded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.results.iter().all(CaseResult::is_success)
    }
}

/// Runs the cases of a suite one after another.
///
/// Case N+1 starts only after case N has been recorded, so observers see
/// completions in suite order.
pub struct SuiteRunner<T: HttpTransport> {
    executor: CaseExecutor<T>,
    sink: Option<Arc<dyn ResultSink>>,
}

impl<T: HttpTransport> SuiteRunner<T> {
    /// Creates a runner that does not record results anywhere.
    pub fn new(executor: CaseExecutor<T>) -> Self {
        Self {
            executor,
            sink: None,
        }
    }

    /// Creates a runner that records every result in `sink`.
    pub fn with_sink(executor: CaseExecutor<T>, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            executor,
            sink: Some(sink),
        }
    }

    /// Runs `suite` to completion or until `cancel` fires between cases.
    ///
    /// A case that fails to execute or to record never stops the run.
    pub async fn run(&self, suite: &TestSuite, mut cancel: CancelToken) -> SuiteRun {
        info!(suite = %suite.id, cases = suite.tests.len(), "Starting suite run");

        let mut run = SuiteRun {
            suite_id: suite.id.clone(),
            results: Vec::with_capacity(suite.tests.len()),
            failures: Vec::new(),
            cancelled: false,
        };

        for case in &suite.tests {
            if cancel.is_cancelled() {
                info!(suite = %suite.id, next_case = %case.name, "Suite run cancelled");
                run.cancelled = true;
                break;
            }

            let Some(result) = self.executor.execute(&suite.id, case).await else {
                debug!(suite = %suite.id, case = %case.name, "Skipping case without url");
                continue;
            };

            if let Some(sink) = &self.sink {
                match sink.record(&suite.id, &result).await {
                    Ok(()) => {
                        debug!(case = %case.name, state = %CaseState::Recorded, "Case state");
                    }
                    Err(e) => {
                        error!(suite = %suite.id, case = %case.name, error = %e, "Could not record result");
                        run.failures.push(RecordFailure {
                            test_case: case.name.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }

            run.results.push(result);
        }

        info!(
            suite = %suite.id,
            executed = run.results.len(),
            failures = run.failures.len(),
            cancelled = run.cancelled,
            "Suite run finished"
        );

        run
    }
}
