//! Resolves the left-hand side of an assertion into a comparable string.

use serde_json::Value;
use thiserror::Error;

use crate::transport::ResponseSnapshot;

/// Prefix selecting a response header.
pub const HEADER_PREFIX: &str = "response.header.";

/// Where an assertion reads its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// JSONPath query against the response body, e.g. `$.user.name`
    JsonPath(String),
    /// Response header, e.g. `response.header.content-type`
    Header(String),
}

impl Reference {
    pub fn parse(raw: &str) -> Result<Self, ExtractionError> {
        let raw = raw.trim();
        if raw.starts_with('$') {
            return Ok(Reference::JsonPath(raw.to_string()));
        }
        match raw.strip_prefix(HEADER_PREFIX) {
            Some(name) if !name.is_empty() => Ok(Reference::Header(name.to_string())),
            _ => Err(ExtractionError::UnsupportedReference(raw.to_string())),
        }
    }

    /// Reads the referenced value from a response.
    pub fn extract(&self, response: &ResponseSnapshot) -> Result<String, ExtractionError> {
        match self {
            Reference::JsonPath(path) => extract_json_path(&response.body, path),
            Reference::Header(name) => response
                .header(name)
                .map(str::to_string)
                .ok_or_else(|| ExtractionError::MissingHeader(name.clone())),
        }
    }
}

/// Why a value could not be read from the response.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid JSONPath '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("JSONPath '{0}' matched nothing")]
    NoMatch(String),

    #[error("response header '{0}' not present")]
    MissingHeader(String),

    #[error("unsupported reference '{0}' (expected '$...' or 'response.header.<name>')")]
    UnsupportedReference(String),
}

/// Evaluates `path` against `body` and returns the first match as text.
fn extract_json_path(body: &str, path: &str) -> Result<String, ExtractionError> {
    let document: Value = serde_json::from_str(body)?;

    let matches = jsonpath_lib::select(&document, path).map_err(|e| ExtractionError::InvalidPath {
        path: path.to_string(),
        reason: format!("{:?}", e),
    })?;

    matches
        .first()
        .map(|value| value_to_text(value))
        .ok_or_else(|| ExtractionError::NoMatch(path.to_string()))
}

/// Strings compare by their content, everything else by its JSON text.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
