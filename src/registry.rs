//! Source registry: the ordered list of knowledge sources for the bound index.
//!
//! Entries are only ever added or have their `included` flag flipped; there
//! is no removal or reordering. The `included` flag is local state that no
//! request consumes yet.

use uuid::Uuid;

use crate::models::KnowledgeSource;

#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<KnowledgeSource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole sequence with `source-<n>` entries, all included.
    pub fn initialize<I, S>(&mut self, titles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = titles
            .into_iter()
            .enumerate()
            .map(|(i, title)| KnowledgeSource {
                id: format!("source-{}", i),
                title: title.into(),
                included: true,
            })
            .collect();
    }

    /// Appends a new included entry with a fresh id and returns it.
    pub fn append(&mut self, title: impl Into<String>) -> &KnowledgeSource {
        let id = loop {
            let candidate = format!("source-{}", Uuid::new_v4().simple());
            if !self.contains(&candidate) {
                break candidate;
            }
        };
        self.sources.push(KnowledgeSource {
            id,
            title: title.into(),
            included: true,
        });
        &self.sources[self.sources.len() - 1]
    }

    /// Sets `included` on the entry with `id`. Returns whether it existed.
    pub fn set_included(&mut self, id: &str, value: bool) -> bool {
        match self.sources.iter_mut().find(|s| s.id == id) {
            Some(source) => {
                source.included = value;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sources.iter().any(|s| s.id == id)
    }

    pub fn sources(&self) -> &[KnowledgeSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
