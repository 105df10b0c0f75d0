//! Merges case results into the stored result documents and fans the
//! updated documents out to live subscribers.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::broadcast::{Broadcaster, ChannelKey};
use crate::results::{CaseResult, CaseResultDocument, SuiteResultDocument};
use crate::storage::{Storage, StorageError};

/// Errors raised while recording a case result.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Suite {0} has no result document")]
    MissingResults(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Writes case results into the suite summary and the case history.
///
/// Both documents are read-modify-written whole, so writes for the same
/// suite id are serialized through a per-suite lock. Runs of different
/// suites proceed independently.
pub struct ResultsAggregator<S: Storage> {
    storage: Arc<S>,
    broadcaster: Arc<Broadcaster>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: Storage> ResultsAggregator<S> {
    pub fn new(storage: Arc<S>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            storage,
            broadcaster,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    async fn suite_lock(&self, suite_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(suite_id.to_string())
            .or_default()
            .clone()
    }

    /// Drops the lock entry of a deleted suite.
    pub async fn forget(&self, suite_id: &str) {
        self.locks.lock().await.remove(suite_id);
    }

    /// Records one case result in both documents.
    ///
    /// The suite summary is written and published before the case history.
    /// A suite without a result document (never created, or deleted
    /// mid-run) gets nothing written. Otherwise a failure in one write does
    /// not prevent the other; the first error is returned.
    pub async fn record(&self, suite_id: &str, result: &CaseResult) -> Result<(), AggregationError> {
        let lock = self.suite_lock(suite_id).await;
        let _guard = lock.lock().await;

        let summary = self.update_suite_summary_locked(suite_id, result).await;
        if let Err(AggregationError::MissingResults(_)) = summary {
            warn!(suite = suite_id, case = %result.test_case, "Dropping result for suite without result document");
            return summary.map(|_| ());
        }
        let history = self
            .append_case_history_locked(suite_id, &result.test_case, result.clone())
            .await;

        summary?;
        history?;
        Ok(())
    }

    /// Replaces the suite document's entry for the result's case.
    ///
    /// The suite must already have a result document.
    pub async fn update_suite_summary(
        &self,
        suite_id: &str,
        result: &CaseResult,
    ) -> Result<SuiteResultDocument, AggregationError> {
        let lock = self.suite_lock(suite_id).await;
        let _guard = lock.lock().await;
        self.update_suite_summary_locked(suite_id, result).await
    }

    /// Appends the result to the case's history, creating it if needed.
    pub async fn append_case_history(
        &self,
        suite_id: &str,
        case_id: &str,
        result: CaseResult,
    ) -> Result<CaseResultDocument, AggregationError> {
        let lock = self.suite_lock(suite_id).await;
        let _guard = lock.lock().await;
        self.append_case_history_locked(suite_id, case_id, result).await
    }

    async fn update_suite_summary_locked(
        &self,
        suite_id: &str,
        result: &CaseResult,
    ) -> Result<SuiteResultDocument, AggregationError> {
        let mut doc = match self.storage.load_suite_results(suite_id) {
            Ok(doc) => doc,
            Err(StorageError::ResultsNotFound(_)) => {
                return Err(AggregationError::MissingResults(suite_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        doc.apply(result);
        self.storage.save_suite_results(suite_id, &doc)?;
        debug!(suite = suite_id, case = %result.test_case, "Updated suite summary");

        self.fan_out(&ChannelKey::suite(suite_id), &doc).await;
        Ok(doc)
    }

    async fn append_case_history_locked(
        &self,
        suite_id: &str,
        case_id: &str,
        result: CaseResult,
    ) -> Result<CaseResultDocument, AggregationError> {
        let mut doc = self.storage.load_case_history(suite_id, case_id)?;

        doc.append(result);
        self.storage.save_case_history(suite_id, case_id, &doc)?;
        debug!(suite = suite_id, case = case_id, runs = doc.results.len(), "Appended case history");

        self.fan_out(&ChannelKey::case(suite_id, case_id), &doc).await;
        Ok(doc)
    }

    async fn fan_out<T: serde::Serialize>(&self, key: &ChannelKey, doc: &T) {
        match self.broadcaster.publish(key, doc).await {
            Ok(delivered) if delivered > 0 => {
                debug!(key = %key, delivered, "Published update");
            }
            Ok(_) => {}
            Err(e) => warn!(key = %key, error = %e, "Could not serialize update"),
        }
    }
}
