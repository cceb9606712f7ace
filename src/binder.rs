//! Index binder: decides whether the page refers to a usable backend index.
//!
//! The identifier comes from the page location. A present identifier is
//! checked against `/check_vector_store/{index}` exactly once per page
//! load; the verdict is remembered and never re-queried. A failed check
//! is not retried here; the page redirects to a clean location instead.

use std::collections::HashMap;
use tracing::{info, warn};

use crate::backend::KnowledgeBackend;
use crate::error::KbError;
use crate::location::SessionBinding;
use crate::models::{SessionBindingState, VectorIndexId, CODE_SUCCESS};

/// What the binder concluded for the current location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindResult {
    /// No identifier in the location.
    NoIndex,
    /// Identifier validated; carries the titles already recorded against it.
    Bound {
        index: VectorIndexId,
        sources: Vec<String>,
    },
    /// Identifier present but rejected or unreachable.
    Invalid { index: VectorIndexId, error: KbError },
}

impl BindResult {
    /// Binding state this result settles into.
    pub fn state(&self) -> SessionBindingState {
        match self {
            BindResult::NoIndex => SessionBindingState::Unbound,
            BindResult::Bound { index, .. } => SessionBindingState::Bound(index.clone()),
            BindResult::Invalid { index, .. } => SessionBindingState::Invalid(index.clone()),
        }
    }

    /// Whether the page falls back to the fresh-registration experience.
    pub fn needs_registration(&self) -> bool {
        !matches!(self, BindResult::Bound { .. })
    }
}

#[derive(Debug, Default)]
pub struct IndexBinder {
    verdicts: HashMap<VectorIndexId, Result<Vec<String>, KbError>>,
}

impl IndexBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identifiers checked against the backend so far.
    pub fn checked(&self) -> usize {
        self.verdicts.len()
    }

    /// Whether `index` already has a verdict, so binding it again issues no
    /// request.
    pub fn is_checked(&self, index: &VectorIndexId) -> bool {
        self.verdicts.contains_key(index)
    }

    /// Resolves `binding` to a [`BindResult`].
    pub async fn bind(
        &mut self,
        backend: &dyn KnowledgeBackend,
        binding: &SessionBinding,
    ) -> BindResult {
        let Some(index) = binding.index_id() else {
            info!("no vector index in location");
            return BindResult::NoIndex;
        };

        if !self.is_checked(&index) {
            let verdict = validate(backend, &index).await;
            self.verdicts.insert(index.clone(), verdict);
        }

        match self.verdicts.get(&index) {
            Some(Ok(sources)) => {
                info!(%index, sources = sources.len(), "vector index bound");
                BindResult::Bound {
                    index,
                    sources: sources.clone(),
                }
            }
            Some(Err(error)) => {
                warn!(%index, %error, "vector index invalid");
                BindResult::Invalid {
                    index,
                    error: error.clone(),
                }
            }
            None => BindResult::NoIndex,
        }
    }
}

async fn validate(
    backend: &dyn KnowledgeBackend,
    index: &VectorIndexId,
) -> Result<Vec<String>, KbError> {
    let invalid = |reason: String| KbError::IndexInvalid {
        index: index.to_string(),
        reason,
    };

    let response = backend
        .check_vector_store(index)
        .await
        .map_err(|e| invalid(e.to_string()))?;

    if response.code != CODE_SUCCESS {
        let reason = response
            .error
            .or(response.message)
            .unwrap_or_else(|| format!("code {}", response.code));
        return Err(invalid(reason));
    }

    response
        .data
        .and_then(|d| d.sources)
        .ok_or_else(|| invalid("response carried no source list".to_string()))
}
