//! Ingestion client: submit a URL or a file to create or extend an index.
//!
//! Both operations validate input before touching the network, then map the
//! backend's `code` onto [`KbError`]. What to do with a success (navigate
//! or append) is the page controller's decision, not this module's.

use anyhow::Context;
use std::path::Path;
use tracing::{debug, warn};

use crate::backend::KnowledgeBackend;
use crate::error::KbError;
use crate::models::{IngestResponse, UrlIngestRequest, VectorIndexId, CODE_SUCCESS};

/// File selected for upload. The original file name travels with the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Reads a file from disk, keeping its base name.
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Not a file path: {}", path.display()))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self { file_name, bytes })
    }
}

/// Result of a successful ingestion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub title: String,
    /// Index the backend wrote into; `None` only if the body omitted it.
    pub index: Option<VectorIndexId>,
    pub example_questions: Vec<String>,
}

/// Submits `url` for ingestion, into `bound` when a bound index exists.
pub async fn submit_url(
    backend: &dyn KnowledgeBackend,
    url: &str,
    bound: Option<&VectorIndexId>,
) -> Result<IngestOutcome, KbError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(KbError::validation("missing URL"));
    }

    let request = UrlIngestRequest {
        url: url.to_string(),
        index_name: bound.map(|id| id.as_str().to_string()),
    };
    let response = backend.ingest_url(&request).await?;
    interpret(response, url)
}

/// Uploads `file` for ingestion, into `bound` when a bound index exists.
pub async fn submit_file(
    backend: &dyn KnowledgeBackend,
    file: Option<&UploadFile>,
    bound: Option<&VectorIndexId>,
) -> Result<IngestOutcome, KbError> {
    let file = file.ok_or_else(|| KbError::validation("missing file"))?;

    let response = backend.ingest_file(file, bound).await?;
    interpret(response, &file.file_name)
}

fn interpret(response: IngestResponse, fallback_title: &str) -> Result<IngestOutcome, KbError> {
    if response.code != CODE_SUCCESS {
        warn!(code = response.code, "ingestion rejected");
        return Err(KbError::rejected(response.failure_message()));
    }

    let title = response
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| fallback_title.to_string());
    let index = response.index_name.and_then(VectorIndexId::new);
    debug!(%title, index = ?index, "ingestion accepted");

    Ok(IngestOutcome {
        title,
        index,
        example_questions: response.example_questions,
    })
}

/// Index name the backend derives from a document title.
///
/// Lowercases, drops everything but ASCII letters, digits and whitespace,
/// joins words with `_`, appends `_index_name`, and caps the result at 50
/// characters. Informational only: the client never sends it.
pub fn preview_index_name(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();

    let mut name = words.join("_");
    name.push_str("_index_name");

    let collapsed = name
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    collapsed.chars().take(50).collect()
}
