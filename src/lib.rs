//! # Knowledge Desk
//!
//! Client-side workflow for attaching a chat session to a backend vector
//! index and registering knowledge sources (URLs or uploaded documents)
//! against it.
//!
//! The backend performs ingestion, indexing and retrieval. This crate
//! implements the session side: resolving which index the page refers to,
//! keeping the local source list consistent with the server, submitting new
//! sources, and carrying a newly created index forward in the page address.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ SessionBinding │──▶│ IndexBinder  │──▶│ SourceRegistry   │
//! │ (page URL)     │   └──────┬───────┘   └──────────────────┘
//! └───────┬────────┘          │
//!         │            ┌──────▼───────┐   ┌──────────────────┐
//!         │            │ KnowledgePage│──▶│ ModalWorkflow    │
//!         │            └──────┬───────┘   └──────────────────┘
//!         ▼                   ▼
//! ┌────────────────┐   ┌──────────────┐
//! │ Redirect       │   │ ingest +     │──▶ backend HTTP API
//! │ Controller     │   │ HttpBackend  │
//! └────────────────┘   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types and wire bodies |
//! | [`location`] | Page location as a session-binding value |
//! | [`backend`] | Backend trait and HTTP client |
//! | [`binder`] | Index validation on page load |
//! | [`registry`] | Ordered source list |
//! | [`ingest`] | URL and file submission |
//! | [`redirect`] | Bind-and-reload and strip-and-reload |
//! | [`modal`] | Add-source modal state machine |
//! | [`notify`] | User notifications |
//! | [`page`] | Page controller tying it all together |

pub mod backend;
pub mod binder;
pub mod config;
pub mod error;
pub mod ingest;
pub mod location;
pub mod modal;
pub mod models;
pub mod notify;
pub mod page;
pub mod redirect;
pub mod registry;
