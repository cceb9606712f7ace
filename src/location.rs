//! Page location as an explicit session-binding value.
//!
//! The page address is the only persisted session state: the index
//! identifier rides in a single query parameter. [`SessionBinding`] reads,
//! splices, and strips that parameter without touching any other part of
//! the URL, so the binder and the redirect controller can be driven by a
//! plain value instead of a live address bar.

use reqwest::Url;

use crate::models::VectorIndexId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBinding {
    location: Url,
    param: String,
}

impl SessionBinding {
    pub fn new(location: Url, param: impl Into<String>) -> Self {
        Self {
            location,
            param: param.into(),
        }
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    /// Index identifier carried by the location, if any.
    ///
    /// The first occurrence wins; a blank value counts as absent.
    pub fn index_id(&self) -> Option<VectorIndexId> {
        self.location
            .query_pairs()
            .find(|(key, _)| key == self.param.as_str())
            .and_then(|(_, value)| VectorIndexId::new(value.into_owned()))
    }

    /// Location with the parameter set to `index`, other pairs preserved.
    pub fn with_index(&self, index: &VectorIndexId) -> Url {
        let mut url = self.without_index();
        url.query_pairs_mut()
            .append_pair(&self.param, index.as_str());
        url
    }

    /// Location with every occurrence of the parameter removed.
    pub fn without_index(&self) -> Url {
        let kept: Vec<(String, String)> = self
            .location
            .query_pairs()
            .filter(|(key, _)| key != self.param.as_str())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut url = self.location.clone();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
        url
    }
}
