use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::aggregator::{AggregationError, ResultsAggregator};
use crate::broadcast::{Broadcaster, ChannelKey, Subscription};
use crate::cancel::CancelRegistry;
use crate::config::{Config, RunnerConfig};
use crate::results::{CaseResult, CaseResultDocument, SuiteResultDocument};
use crate::runner::{CaseExecutor, ResultSink, SuiteRun, SuiteRunner};
use crate::storage::{FileStorage, Storage, StorageError};
use crate::suite::{SuiteError, SuiteSummary, TestSuite};
use crate::transport::{HttpTransport, ReqwestTransport, TransportError};

/// Manages suites, their runs, and their results.
///
/// Provides the operations the HTTP service exposes, with automatic
/// persistence and live updates.
pub struct SuiteManager<S: Storage> {
    storage: Arc<S>,
    aggregator: Arc<ResultsAggregator<S>>,
    cancels: CancelRegistry,
    transport: Arc<dyn HttpTransport>,
    correlation_header: Option<String>,
}

impl SuiteManager<FileStorage> {
    /// Creates a manager backed by files and a reqwest transport.
    pub fn from_config(config: &Config) -> Result<Self, ManagerError> {
        let storage = FileStorage::with_config(config.storage.clone());
        let transport = ReqwestTransport::new(&config.runner)?;
        Ok(Self::new(storage, Arc::new(transport), &config.runner))
    }
}

impl<S: Storage + 'static> SuiteManager<S> {
    /// Creates a new SuiteManager with the given storage and transport.
    pub fn new(storage: S, transport: Arc<dyn HttpTransport>, runner: &RunnerConfig) -> Self {
        let storage = Arc::new(storage);
        let aggregator = Arc::new(ResultsAggregator::new(
            storage.clone(),
            Arc::new(Broadcaster::new()),
        ));

        Self {
            storage,
            aggregator,
            cancels: CancelRegistry::new(),
            transport,
            correlation_header: runner.correlation_header_name(),
        }
    }

    pub fn aggregator(&self) -> &Arc<ResultsAggregator<S>> {
        &self.aggregator
    }

    /// Creates a suite with a fresh id and an empty result document.
    pub fn create_suite(&self, mut suite: TestSuite) -> Result<TestSuite, ManagerError> {
        suite.validate()?;
        suite.assign_id();
        self.storage.save_suite(&suite)?;
        info!(suite = %suite.id, cases = suite.tests.len(), "Created suite");
        Ok(suite)
    }

    /// Gets a suite by ID.
    pub fn get_suite(&self, id: &str) -> Result<TestSuite, ManagerError> {
        Ok(self.storage.load_suite(id)?)
    }

    /// Replaces the whole suite stored under `id`, creating it if absent.
    pub fn replace_suite(&self, id: &str, mut suite: TestSuite) -> Result<TestSuite, ManagerError> {
        suite.validate()?;
        suite.id = id.to_string();
        self.storage.save_suite(&suite)?;
        Ok(suite)
    }

    /// Deletes a suite and all of its results.
    pub async fn delete_suite(&self, id: &str) -> Result<(), ManagerError> {
        self.storage.delete_suite(id)?;
        self.aggregator.forget(id).await;
        info!(suite = id, "Deleted suite");
        Ok(())
    }

    /// Lists all suites.
    pub fn list_suites(&self) -> Result<Vec<SuiteSummary>, ManagerError> {
        Ok(self.storage.list_suites()?)
    }

    /// Gets the latest summary of every executed case.
    pub fn get_results(&self, id: &str) -> Result<SuiteResultDocument, ManagerError> {
        Ok(self.storage.load_suite_results(id)?)
    }

    /// Gets the run history of one case.
    pub fn get_case_history(&self, id: &str, case_id: &str) -> Result<CaseResultDocument, ManagerError> {
        if !self.storage.suite_exists(id)? {
            return Err(StorageError::SuiteNotFound(id.to_string()).into());
        }
        Ok(self.storage.load_case_history(id, case_id)?)
    }

    /// Loads and runs a stored suite.
    pub async fn run_suite(&self, id: &str) -> Result<SuiteRun, ManagerError> {
        let suite = self.storage.load_suite(id)?;
        Ok(self.run(&suite).await)
    }

    /// Runs `suite`, recording every result under its id.
    ///
    /// The run can be stopped between cases with [`cancel_run`](Self::cancel_run).
    pub async fn run(&self, suite: &TestSuite) -> SuiteRun {
        let (token, _guard) = self.cancels.start(&suite.id);
        self.runner().run(suite, token).await
    }

    /// True while a run of `id` is in flight.
    pub fn is_running(&self, id: &str) -> bool {
        self.cancels.is_running(id)
    }

    /// Requests cancellation of every in-flight run of `id`.
    pub fn cancel_run(&self, id: &str) -> bool {
        self.cancels.cancel(id)
    }

    /// Records a result produced outside this process.
    pub async fn record_external_result(&self, id: &str, result: CaseResult) -> Result<(), ManagerError> {
        if !self.storage.suite_exists(id)? {
            return Err(StorageError::SuiteNotFound(id.to_string()).into());
        }
        self.aggregator.record(id, &result).await?;
        Ok(())
    }

    /// Subscribes to live updates on `key`.
    pub async fn subscribe(&self, key: ChannelKey) -> Subscription {
        self.aggregator.broadcaster().subscribe(key).await
    }

    fn runner(&self) -> SuiteRunner<Arc<dyn HttpTransport>> {
        let executor = CaseExecutor::new(self.transport.clone())
            .with_correlation_header(self.correlation_header.clone());
        let sink: Arc<dyn ResultSink> = self.aggregator.clone();
        SuiteRunner::with_sink(executor, sink)
    }
}

/// Errors that can occur in SuiteManager operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid suite: {0}")]
    Suite(#[from] SuiteError),

    #[error("Could not record result: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

impl ManagerError {
    /// True if the error means the requested suite or document does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ManagerError::Storage(e) => e.is_not_found(),
            ManagerError::Aggregation(AggregationError::MissingResults(_)) => true,
            ManagerError::Aggregation(AggregationError::Storage(e)) => e.is_not_found(),
            _ => false,
        }
    }

    /// True if the caller sent something invalid.
    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            ManagerError::Suite(_) | ManagerError::Storage(StorageError::InvalidId(_))
        )
    }
}
