use std::fmt;

use tracing::{debug, warn};

use crate::assertion;
use crate::results::{CaseResult, ResultSet};
use crate::suite::TestCase;
use crate::transport::{HttpTransport, PreparedRequest};

/// Lifecycle of one test case within a run.
///
/// Cases move linearly: Pending → Requested → Evaluated → Recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    /// Not started
    Pending,
    /// Request issued, waiting for the response
    Requested,
    /// All assertions evaluated
    Evaluated,
    /// Result handed to the result sink
    Recorded,
}

impl CaseState {
    /// Returns the next state, or None once recorded.
    pub fn next(&self) -> Option<CaseState> {
        match self {
            CaseState::Pending => Some(CaseState::Requested),
            CaseState::Requested => Some(CaseState::Evaluated),
            CaseState::Evaluated => Some(CaseState::Recorded),
            CaseState::Recorded => None,
        }
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaseState::Pending => "pending",
            CaseState::Requested => "requested",
            CaseState::Evaluated => "evaluated",
            CaseState::Recorded => "recorded",
        };
        f.write_str(name)
    }
}

/// Runs a single test case: one request, then every assertion in order.
pub struct CaseExecutor<T: HttpTransport> {
    transport: T,
    correlation_header: Option<String>,
}

impl<T: HttpTransport> CaseExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            correlation_header: None,
        }
    }

    /// Tags outbound requests with `{suiteId}.{caseName}` in `header`.
    pub fn with_correlation_header(mut self, header: Option<String>) -> Self {
        self.correlation_header = header;
        self
    }

    /// Executes `case` and returns its result, or `None` if the case has
    /// no url and therefore nothing to run.
    ///
    /// Never fails: a request that produces no response becomes a result
    /// with an `error` and no evaluated assertions.
    pub async fn execute(&self, suite_id: &str, case: &TestCase) -> Option<CaseResult> {
        let mut request = PreparedRequest::from_case(case)?;
        if let Some(header) = &self.correlation_header {
            request = request.with_default_header(header, format!("{}.{}", suite_id, case.name));
        }

        let mut result_set = ResultSet::new();
        let state = advance(case, CaseState::Pending);

        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(case = %case.name, url = %request.url, error = %e, "Request failed");
                return Some(CaseResult::request_failed(&case.name, e.to_string()));
            }
        };

        for expression in &case.assertions {
            result_set.push(assertion::evaluate(expression, &response));
        }
        advance(case, state);

        Some(CaseResult {
            test_case: case.name.clone(),
            status: Some(response.status),
            body: response.body,
            headers: response.headers,
            result_set,
            error: None,
        })
    }
}

fn advance(case: &TestCase, state: CaseState) -> CaseState {
    let next = state.next().unwrap_or(state);
    debug!(case = %case.name, from = %state, to = %next, "Case state");
    next
}
