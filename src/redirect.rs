//! Session redirect controller.
//!
//! Carries a freshly created index forward by splicing it into the page
//! location, and strips a stale identifier after a delay so the user can
//! read the error first. Both end in a full navigation, which discards the
//! current page session.

use reqwest::Url;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::KbError;
use crate::location::SessionBinding;
use crate::models::VectorIndexId;

/// Performs a full page navigation.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: Url);
}

/// Navigator that records targets instead of leaving the page.
///
/// Used by the CLI (which prints where the page would go) and by tests.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<Url>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<Url> {
        self.visits
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Url> {
        self.visits().pop()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: Url) {
        if let Ok(mut visits) = self.visits.lock() {
            visits.push(target);
        }
    }
}

#[derive(Clone)]
pub struct RedirectController {
    navigator: Arc<dyn Navigator>,
    strip_delay: Duration,
}

impl RedirectController {
    pub fn new(navigator: Arc<dyn Navigator>, strip_delay: Duration) -> Self {
        Self {
            navigator,
            strip_delay,
        }
    }

    /// Navigates to `binding`'s location with `index` spliced in.
    ///
    /// Refuses when the location already carries an identifier, which would
    /// otherwise loop. A blank parameter is replaced.
    pub fn bind_and_reload(
        &self,
        binding: &SessionBinding,
        index: &VectorIndexId,
    ) -> Result<Url, KbError> {
        if let Some(existing) = binding.index_id() {
            return Err(KbError::AlreadyBound(existing.to_string()));
        }

        let target = binding.with_index(index);
        info!(%target, "binding new index, reloading");
        self.navigator.navigate(target.clone());
        Ok(target)
    }

    /// Schedules navigation to `binding`'s location without the parameter
    /// after the configured delay. The timer always fires once scheduled.
    pub fn strip_and_reload(&self, binding: &SessionBinding) -> (Url, JoinHandle<()>) {
        let target = binding.without_index();
        let navigator = Arc::clone(&self.navigator);
        let delay = self.strip_delay;
        let scheduled = target.clone();

        info!(%target, delay_ms = delay.as_millis() as u64, "scheduling strip-and-reload");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(scheduled);
        });
        (target, handle)
    }
}
