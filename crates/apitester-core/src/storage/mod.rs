mod error;
mod file;

pub use error::StorageError;
pub use file::FileStorage;

use crate::results::{CaseResultDocument, SuiteResultDocument};
use crate::suite::{SuiteSummary, TestSuite};

/// Trait for suite and result document stores.
///
/// Documents are read and written whole; callers that read-modify-write
/// must serialize those cycles themselves.
pub trait Storage: Send + Sync {
    /// Returns true if a suite with this id is stored.
    fn suite_exists(&self, id: &str) -> Result<bool, StorageError>;

    /// Loads a suite definition.
    fn load_suite(&self, id: &str) -> Result<TestSuite, StorageError>;

    /// Saves (overwrites) a suite definition.
    ///
    /// Also creates an empty result document if the suite has none yet.
    fn save_suite(&self, suite: &TestSuite) -> Result<(), StorageError>;

    /// Deletes a suite together with all of its result documents.
    fn delete_suite(&self, id: &str) -> Result<(), StorageError>;

    /// Lists stored suites.
    fn list_suites(&self) -> Result<Vec<SuiteSummary>, StorageError>;

    /// Loads the suite-level result document.
    fn load_suite_results(&self, id: &str) -> Result<SuiteResultDocument, StorageError>;

    /// Saves the suite-level result document.
    fn save_suite_results(&self, id: &str, doc: &SuiteResultDocument) -> Result<(), StorageError>;

    /// Loads a case history, or an empty one if the case never ran.
    fn load_case_history(&self, id: &str, case_id: &str) -> Result<CaseResultDocument, StorageError>;

    /// Saves a case history.
    fn save_case_history(
        &self,
        id: &str,
        case_id: &str,
        doc: &CaseResultDocument,
    ) -> Result<(), StorageError>;
}
