use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

/// A named, ordered collection of test cases.
///
/// The id is assigned once on creation and never changes afterwards;
/// updates replace the whole suite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    /// Opaque identifier, empty until the suite is created
    #[serde(default)]
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Test cases in execution order
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

impl TestSuite {
    /// Creates an unsaved suite with no id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            tests: Vec::new(),
        }
    }

    /// Adds a test case (builder style).
    pub fn with_case(mut self, case: TestCase) -> Self {
        self.tests.push(case);
        self
    }

    /// Assigns a fresh id.
    pub fn assign_id(&mut self) -> &str {
        self.id = Uuid::new_v4().to_string();
        &self.id
    }

    /// Looks up a case by its name.
    pub fn case(&self, name: &str) -> Option<&TestCase> {
        self.tests.iter().find(|c| c.name == name)
    }

    /// Checks the structural rules a suite must meet before it is stored.
    ///
    /// Case names are the join key for result history, so they must be
    /// present and unique.
    pub fn validate(&self) -> Result<(), SuiteError> {
        let mut seen = HashSet::new();
        for (index, case) in self.tests.iter().enumerate() {
            if case.name.trim().is_empty() {
                return Err(SuiteError::MissingCaseName { index });
            }
            if !seen.insert(case.name.as_str()) {
                return Err(SuiteError::DuplicateCaseName(case.name.clone()));
            }
        }
        Ok(())
    }

    /// Parses a suite from YAML (JSON is valid YAML, so both work).
    pub fn from_yaml(text: &str) -> Result<Self, SuiteError> {
        let suite: TestSuite = serde_yaml::from_str(text)?;
        suite.validate()?;
        Ok(suite)
    }

    /// Converts the suite to a summary (for listings).
    pub fn to_summary(&self) -> SuiteSummary {
        SuiteSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            cases: self.tests.len(),
        }
    }
}

/// A lightweight summary of a suite for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub id: String,
    pub name: String,
    pub cases: usize,
}

/// One HTTP request plus the assertions to check against its response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Unique within the suite
    pub name: String,
    /// Base URL; cases without one are skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Appended to `url`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default)]
    pub verb: Verb,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestBody>,
    /// Assertion expressions, evaluated in order
    #[serde(default)]
    pub assertions: Vec<String>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_verb(mut self, verb: Verb) -> Self {
        self.verb = verb;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.request = Some(body);
        self
    }

    pub fn with_assertion(mut self, expression: impl Into<String>) -> Self {
        self.assertions.push(expression.into());
        self
    }

    /// Full request URL (`url` + `path`), or `None` when the case has no url.
    pub fn target_url(&self) -> Option<String> {
        let base = self.url.as_deref()?.trim();
        if base.is_empty() {
            return None;
        }
        if self.path.is_empty() {
            return Some(base.to_string());
        }
        match (base.ends_with('/'), self.path.starts_with('/')) {
            (true, true) => Some(format!("{}{}", base, &self.path[1..])),
            _ => Some(format!("{}{}", base, self.path)),
        }
    }
}

/// Request payload of a test case.
///
/// Strings are sent verbatim; any other value is sent as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    Text(String),
    Json(serde_json::Value),
}

impl RequestBody {
    /// Serialized body and the content type it implies.
    pub fn encode(&self) -> (String, Option<&'static str>) {
        match self {
            RequestBody::Text(text) => (text.clone(), None),
            RequestBody::Json(value) => (value.to_string(), Some("application/json")),
        }
    }
}

/// HTTP method of a test case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Verb {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::Head => "HEAD",
            Verb::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "PATCH" => Ok(Verb::Patch),
            "DELETE" => Ok(Verb::Delete),
            "HEAD" => Ok(Verb::Head),
            "OPTIONS" => Ok(Verb::Options),
            _ => Err(SuiteError::UnknownVerb(s.to_string())),
        }
    }
}

impl Serialize for Verb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Verb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Reasons a suite definition is rejected.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("Test case at position {index} has no name")]
    MissingCaseName { index: usize },

    #[error("Test case name '{0}' is used more than once")]
    DuplicateCaseName(String),

    #[error("Unknown HTTP verb: {0}")]
    UnknownVerb(String),

    #[error("Malformed suite: {0}")]
    Malformed(#[from] serde_yaml::Error),
}
