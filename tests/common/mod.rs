//! Mock knowledge backend shared by the integration tests.
//!
//! Serves the same endpoints as the real service, backed by an in-memory
//! map of index name to source list, and records every ingestion request.

#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Index the mock assigns when a URL is ingested without `index_name`.
pub const NEW_URL_INDEX: &str = "doc_a_index_name";
/// Index the mock assigns when a file is uploaded without `index_name`.
pub const NEW_FILE_INDEX: &str = "upload_index_name";
/// Submitting this URL makes the mock answer with `code: 500`.
pub const FAILING_URL: &str = "https://fail.example/";
/// Checking this index makes the mock answer with a non-JSON body.
pub const GARBLED_INDEX: &str = "garbled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: Option<String>,
    pub index_name: Option<String>,
    pub size: usize,
}

#[derive(Default)]
pub struct MockInner {
    pub stores: HashMap<String, Vec<String>>,
    pub url_requests: Vec<Value>,
    pub uploads: Vec<Upload>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    pub inner: Arc<Mutex<MockInner>>,
}

impl MockBackend {
    pub fn with_store(self, index: &str, sources: &[&str]) -> Self {
        self.inner.lock().unwrap().stores.insert(
            index.to_string(),
            sources.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn url_requests(&self) -> Vec<Value> {
        self.inner.lock().unwrap().url_requests.clone()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.inner.lock().unwrap().uploads.clone()
    }

    pub fn sources(&self, index: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .stores
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    /// Binds to an ephemeral local port and serves until the handle is aborted.
    pub async fn spawn(self) -> (String, JoinHandle<()>) {
        let app = Router::new()
            .route("/", get(handle_root))
            .route("/check_vector_store/{index}", get(handle_check))
            .route("/knowledge/url", post(handle_url))
            .route("/knowledge/file", post(handle_file))
            .with_state(self);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        (format!("http://{}", addr), handle)
    }
}

/// A base URL nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn handle_root() -> Json<Value> {
    Json(json!({ "message": "Hello World" }))
}

async fn handle_check(State(mock): State<MockBackend>, Path(index): Path<String>) -> Response {
    if index == GARBLED_INDEX {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    }
    let inner = mock.inner.lock().unwrap();
    match inner.stores.get(&index) {
        Some(sources) => Json(json!({
            "message": "success",
            "code": 200,
            "data": { "sources": sources },
        }))
        .into_response(),
        None => Json(json!({
            "error": format!("Collection {} not found", index),
            "code": 404,
        }))
        .into_response(),
    }
}

async fn handle_url(State(mock): State<MockBackend>, Json(body): Json<Value>) -> Json<Value> {
    let mut inner = mock.inner.lock().unwrap();
    inner.url_requests.push(body.clone());

    let url = body["url"].as_str().unwrap_or_default().to_string();
    if url == FAILING_URL {
        return Json(json!({
            "error": "Failed to process URL: boom",
            "code": 500,
        }));
    }

    let index = body["index_name"]
        .as_str()
        .unwrap_or(NEW_URL_INDEX)
        .to_string();
    inner.stores.entry(index.clone()).or_default().push(url);

    Json(json!({
        "title": "Doc A",
        "index_name": index,
        "code": 200,
        "example_questions": ["What is Doc A about?"],
    }))
}

async fn handle_file(State(mock): State<MockBackend>, mut multipart: Multipart) -> Json<Value> {
    let mut upload = Upload {
        file_name: None,
        index_name: None,
        size: 0,
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some("file") => {
                upload.file_name = field.file_name().map(String::from);
                upload.size = field.bytes().await.unwrap().len();
            }
            Some("index_name") => {
                upload.index_name = Some(field.text().await.unwrap());
            }
            _ => {}
        }
    }

    let mut inner = mock.inner.lock().unwrap();
    let index = upload
        .index_name
        .clone()
        .unwrap_or_else(|| NEW_FILE_INDEX.to_string());
    let source = upload.file_name.clone().unwrap_or_default();
    inner.stores.entry(index.clone()).or_default().push(source);
    inner.uploads.push(upload);

    // No title: the client falls back to the original file name.
    Json(json!({ "index_name": index, "code": 200 }))
}
