//! Notification feed shown to the user (toasts).

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::KbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Generic text for transport failures; details go to the log only.
pub const CONNECTIVITY_MESSAGE: &str = "Could not reach the knowledge service. Check your connection and try again.";

#[derive(Debug, Clone, Default)]
pub struct Notifications {
    items: Vec<Notification>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: Level, message: impl Into<String>) {
        let message = message.into();
        match level {
            Level::Error => error!(%message, "notify"),
            Level::Warning => warn!(%message, "notify"),
            Level::Success | Level::Info => info!(%message, "notify"),
        }
        self.items.push(Notification {
            level,
            message,
            at: Utc::now(),
        });
    }

    /// Surfaces an error the way the page presents it: validation as a
    /// warning, transport failures as a generic connectivity message.
    pub fn push_error(&mut self, err: &KbError) {
        match err {
            KbError::Validation(msg) => self.push(Level::Warning, msg.clone()),
            KbError::Network(detail) => {
                warn!(%detail, "transport failure");
                self.push(Level::Error, CONNECTIVITY_MESSAGE);
            }
            other => self.push(Level::Error, other.to_string()),
        }
    }

    /// Removes the notification at `index`. Returns whether it existed.
    pub fn dismiss(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.items.remove(index);
            true
        } else {
            false
        }
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn last(&self) -> Option<&Notification> {
        self.items.last()
    }
}
