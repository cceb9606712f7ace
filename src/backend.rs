//! Backend access: the [`KnowledgeBackend`] trait and its HTTP implementation.
//!
//! The backend does the real work (fetching, embedding, indexing). This
//! module only speaks its wire protocol:
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `GET`  | `/` | none |
//! | `GET`  | `/check_vector_store/{index}` | none |
//! | `POST` | `/knowledge/url` | JSON `{url, index_name?}` |
//! | `POST` | `/knowledge/file` | multipart `file`, `index_name?` |
//!
//! Application outcome is signalled by the `code` field inside the body, not
//! by the HTTP status, so any body that decodes is handed back as-is and the
//! caller interprets `code`. A body that fails to decode is a transport
//! failure ([`KbError::Network`]).

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::KbError;
use crate::ingest::UploadFile;
use crate::models::{CheckStoreResponse, IngestResponse, UrlIngestRequest, VectorIndexId};

/// Operations the page session needs from the backend.
///
/// [`HttpBackend`] is the production implementation; tests substitute an
/// in-memory fake.
#[async_trait]
pub trait KnowledgeBackend: Send + Sync {
    /// Liveness probe. Returns the backend's greeting message.
    async fn ping(&self) -> Result<String, KbError>;

    /// Looks up an index and the sources recorded against it.
    async fn check_vector_store(&self, index: &VectorIndexId)
        -> Result<CheckStoreResponse, KbError>;

    /// Submits a URL for ingestion, optionally into an existing index.
    async fn ingest_url(&self, request: &UrlIngestRequest) -> Result<IngestResponse, KbError>;

    /// Uploads a file for ingestion, optionally into an existing index.
    async fn ingest_file(
        &self,
        file: &UploadFile,
        index: Option<&VectorIndexId>,
    ) -> Result<IngestResponse, KbError>;
}

/// [`KnowledgeBackend`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: Url, timeout: Option<Duration>) -> Result<Self, KbError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let base_url = config.base_url()?;
        let timeout = config.backend.timeout_secs.map(Duration::from_secs);
        Ok(Self::new(base_url, timeout)?)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, KbError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| KbError::Network(format!("base URL cannot hold a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, KbError> {
    let status = response.status();
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        KbError::Network(format!(
            "malformed response (HTTP {}): {}",
            status.as_u16(),
            e
        ))
    })
}

#[derive(serde::Deserialize)]
struct PingResponse {
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
impl KnowledgeBackend for HttpBackend {
    async fn ping(&self) -> Result<String, KbError> {
        let url = self.endpoint(&[])?;
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        let body: PingResponse = decode(response).await?;
        Ok(body.message.unwrap_or_else(|| "ok".to_string()))
    }

    async fn check_vector_store(
        &self,
        index: &VectorIndexId,
    ) -> Result<CheckStoreResponse, KbError> {
        let url = self.endpoint(&["check_vector_store", index.as_str()])?;
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    async fn ingest_url(&self, request: &UrlIngestRequest) -> Result<IngestResponse, KbError> {
        let url = self.endpoint(&["knowledge", "url"])?;
        debug!(%url, target_url = %request.url, index = ?request.index_name, "POST");
        let response = self.client.post(url).json(request).send().await?;
        decode(response).await
    }

    async fn ingest_file(
        &self,
        file: &UploadFile,
        index: Option<&VectorIndexId>,
    ) -> Result<IngestResponse, KbError> {
        let url = self.endpoint(&["knowledge", "file"])?;
        debug!(%url, file = %file.file_name, bytes = file.bytes.len(), index = ?index, "POST multipart");

        let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        let mut form = Form::new().part("file", part);
        if let Some(index) = index {
            form = form.text("index_name", index.as_str().to_string());
        }

        let response = self.client.post(url).multipart(form).send().await?;
        decode(response).await
    }
}
