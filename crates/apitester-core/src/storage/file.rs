use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::StorageConfig;
use crate::results::{CaseResultDocument, SuiteResultDocument};
use crate::suite::{SuiteSummary, TestSuite};

use super::error::StorageError;
use super::Storage;

/// File-based storage implementation.
///
/// Every suite owns one directory under the data root:
/// ```text
/// {data_dir}/{suite-id}/
///   tests.yaml                 # Suite definition
///   results.yaml               # Latest summary per case
///   cases/{case}.yaml          # Append-only history per case
/// ```
pub struct FileStorage {
    config: StorageConfig,
}

impl FileStorage {
    /// Creates a FileStorage with default file names rooted at `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self::with_config(StorageConfig::rooted_at(data_dir))
    }

    /// Creates a new FileStorage with custom configuration.
    pub fn with_config(config: StorageConfig) -> Self {
        Self { config }
    }

    fn root(&self) -> PathBuf {
        PathBuf::from(&self.config.data_dir)
    }

    /// Returns the path to a suite's directory, rejecting ids that would
    /// escape the data root.
    fn suite_dir(&self, id: &str) -> Result<PathBuf, StorageError> {
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && !id.contains(['/', '\\'])
            && !id.contains("..");
        if !valid {
            return Err(StorageError::InvalidId(id.to_string()));
        }
        Ok(self.config.suite_path(id))
    }

    fn suite_file(&self, id: &str) -> Result<PathBuf, StorageError> {
        Ok(self.suite_dir(id)?.join(&self.config.suite_file))
    }

    fn results_file(&self, id: &str) -> Result<PathBuf, StorageError> {
        Ok(self.suite_dir(id)?.join(&self.config.results_file))
    }

    fn case_file(&self, id: &str, case_id: &str) -> Result<PathBuf, StorageError> {
        Ok(self
            .suite_dir(id)?
            .join(&self.config.cases_dir)
            .join(format!("{}.yaml", encode_file_name(case_id))))
    }

    /// Ensures a directory exists.
    fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        }
        Ok(())
    }

    fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent)?;
        }
        let yaml = serde_yaml::to_string(value)?;
        fs::write(path, yaml).map_err(|e| StorageError::io(path, e))
    }

    fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
        let yaml = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        Ok(serde_yaml::from_str(&yaml)?)
    }
}

/// Maps a case name onto a safe file name; anything outside
/// `[A-Za-z0-9_-]` is percent-encoded byte by byte.
fn encode_file_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{:02X}", byte);
        }
    }
    encoded
}

impl Storage for FileStorage {
    fn suite_exists(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.suite_file(id)?.exists())
    }

    fn load_suite(&self, id: &str) -> Result<TestSuite, StorageError> {
        let path = self.suite_file(id)?;
        if !path.exists() {
            return Err(StorageError::SuiteNotFound(id.to_string()));
        }
        Self::read_yaml(&path)
    }

    fn save_suite(&self, suite: &TestSuite) -> Result<(), StorageError> {
        Self::write_yaml(&self.suite_file(&suite.id)?, suite)?;

        let results = self.results_file(&suite.id)?;
        if !results.exists() {
            Self::write_yaml(&results, &SuiteResultDocument::empty())?;
        }

        Ok(())
    }

    fn delete_suite(&self, id: &str) -> Result<(), StorageError> {
        let dir = self.suite_dir(id)?;
        if !dir.exists() {
            return Err(StorageError::SuiteNotFound(id.to_string()));
        }

        fs::remove_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))
    }

    fn list_suites(&self) -> Result<Vec<SuiteSummary>, StorageError> {
        let root = self.root();
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();

        let entries = fs::read_dir(&root).map_err(|e| StorageError::io(&root, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&root, e))?;
            let path = entry.path();

            if path.is_dir() {
                if let Some(id) = path.file_name().and_then(|n| n.to_str()) {
                    match self.load_suite(id) {
                        Ok(suite) => summaries.push(suite.to_summary()),
                        Err(_) => continue, // Skip directories without a readable suite
                    }
                }
            }
        }

        summaries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        Ok(summaries)
    }

    fn load_suite_results(&self, id: &str) -> Result<SuiteResultDocument, StorageError> {
        let path = self.results_file(id)?;
        if !path.exists() {
            return Err(StorageError::ResultsNotFound(id.to_string()));
        }
        Self::read_yaml(&path)
    }

    fn save_suite_results(&self, id: &str, doc: &SuiteResultDocument) -> Result<(), StorageError> {
        Self::write_yaml(&self.results_file(id)?, doc)
    }

    fn load_case_history(&self, id: &str, case_id: &str) -> Result<CaseResultDocument, StorageError> {
        let path = self.case_file(id, case_id)?;
        if !path.exists() {
            return Ok(CaseResultDocument::empty(case_id));
        }
        Self::read_yaml(&path)
    }

    fn save_case_history(
        &self,
        id: &str,
        case_id: &str,
        doc: &CaseResultDocument,
    ) -> Result<(), StorageError> {
        Self::write_yaml(&self.case_file(id, case_id)?, doc)
    }
}
