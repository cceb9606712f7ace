//! Core data models shared by the binding and ingestion workflow.
//!
//! The first half holds the client-side types (index identifiers, sources,
//! binding state); the second half mirrors the JSON bodies the backend
//! returns from its three endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Application-level success code carried in every backend body.
pub const CODE_SUCCESS: i64 = 200;

/// Opaque identifier of a backend-side vector index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorIndexId(String);

impl VectorIndexId {
    /// Wraps a raw identifier. Returns `None` for blank input, which the
    /// query string can produce (`?vector_index=`).
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VectorIndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One ingested unit (a URL or a file) recorded against a vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeSource {
    pub id: String,
    pub title: String,
    pub included: bool,
}

/// Association between the page session and a backend index.
///
/// Owned by [`crate::page::KnowledgePage`]; other components only read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionBindingState {
    Unbound,
    Validating(VectorIndexId),
    Bound(VectorIndexId),
    Invalid(VectorIndexId),
}

impl SessionBindingState {
    pub fn bound_index(&self) -> Option<&VectorIndexId> {
        match self {
            SessionBindingState::Bound(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, SessionBindingState::Bound(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionBindingState::Unbound => "unbound",
            SessionBindingState::Validating(_) => "validating",
            SessionBindingState::Bound(_) => "bound",
            SessionBindingState::Invalid(_) => "invalid",
        }
    }
}

// ============ Wire types ============

/// Body of `GET /check_vector_store/{index}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckStoreResponse {
    pub code: i64,
    #[serde(default)]
    pub data: Option<CheckStoreData>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckStoreData {
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

/// Body of `POST /knowledge/url` and `POST /knowledge/file`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestResponse {
    pub code: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub index_name: Option<String>,
    #[serde(default)]
    pub example_questions: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl IngestResponse {
    /// Human-readable failure text, preferring `error` over `message`.
    pub fn failure_message(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone())
    }
}

/// JSON request body for `POST /knowledge/url`.
#[derive(Debug, Clone, Serialize)]
pub struct UrlIngestRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
}
