//! Add-source modal workflow.
//!
//! ```text
//!            open / forced            submit ok, bound
//!  Closed ──────────────────▶ Open(tab) ───────────────▶ Closed
//!                               │
//!                               │ submit ok, unbound
//!                               ▼
//!                          Navigating(url)   (terminal)
//! ```
//!
//! Visibility is `explicitly opened || forced`, where forced is a pure
//! function of the binding state ([`must_force_open`]). Cancelling clears
//! the explicit flag only, so an unbound page keeps the modal on screen.
//!
//! Submissions are split into begin/finish so a request can be in flight
//! while the user keeps interacting. Each submission carries the modal's
//! epoch; reopening the modal bumps the epoch and a stale result is
//! discarded when it lands.

use reqwest::Url;

use crate::error::KbError;
use crate::models::SessionBindingState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    File,
    Url,
}

impl Tab {
    pub fn label(self) -> &'static str {
        match self {
            Tab::File => "file",
            Tab::Url => "url",
        }
    }
}

/// Observable state of the modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Open(Tab),
    /// The page is leaving; nothing further happens on this instance.
    Navigating(Url),
}

/// Whether the binding state alone requires the modal to be shown.
pub fn must_force_open(state: &SessionBindingState) -> bool {
    !state.is_bound()
}

/// Handle for one in-flight submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub tab: Tab,
    epoch: u64,
}

#[derive(Debug, Clone)]
pub struct ModalWorkflow {
    opened: bool,
    tab: Tab,
    pending: Option<Tab>,
    epoch: u64,
    navigating: Option<Url>,
    auto_opened: bool,
}

impl Default for ModalWorkflow {
    fn default() -> Self {
        Self {
            opened: false,
            tab: Tab::File,
            pending: None,
            epoch: 0,
            navigating: None,
            auto_opened: false,
        }
    }
}

impl ModalWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, binding: &SessionBindingState) -> ModalState {
        if let Some(url) = &self.navigating {
            return ModalState::Navigating(url.clone());
        }
        if self.opened || must_force_open(binding) {
            ModalState::Open(self.tab)
        } else {
            ModalState::Closed
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.navigating.is_some()
    }

    /// True while any submission is in flight; both submit controls are
    /// disabled then.
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Opens on explicit user action.
    pub fn open(&mut self, tab: Tab) {
        if self.is_terminal() {
            return;
        }
        if !self.opened {
            self.epoch += 1;
        }
        self.opened = true;
        self.tab = tab;
    }

    /// Opens once per page load when the binder found no usable index.
    /// Later calls are no-ops.
    pub fn auto_open(&mut self) {
        if self.auto_opened {
            return;
        }
        self.auto_opened = true;
        self.open(Tab::File);
    }

    pub fn select_tab(&mut self, tab: Tab) {
        if !self.is_terminal() {
            self.tab = tab;
        }
    }

    /// Explicit cancel. An in-flight request is abandoned, not aborted: its
    /// result still arrives and is handled by [`ModalWorkflow::finish`].
    pub fn cancel(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.opened = false;
        self.pending = None;
    }

    /// Starts a submission from `tab`. Fails while another is in flight.
    pub fn begin(&mut self, tab: Tab) -> Result<Submission, KbError> {
        if self.is_terminal() {
            return Err(KbError::validation("page is navigating away"));
        }
        if let Some(busy) = self.pending {
            return Err(KbError::validation(format!(
                "a {} submission is already in flight",
                busy.label()
            )));
        }
        self.pending = Some(tab);
        Ok(Submission {
            tab,
            epoch: self.epoch,
        })
    }

    /// Ends `submission`. Returns `false` when its result is stale and
    /// must be discarded.
    pub fn finish(&mut self, submission: Submission) -> bool {
        if self.is_terminal() || submission.epoch != self.epoch {
            return false;
        }
        if self.pending == Some(submission.tab) {
            self.pending = None;
        }
        true
    }

    /// Success that stays on this page: close.
    pub fn close_after_success(&mut self) {
        self.opened = false;
    }

    /// Success that navigates away: terminal.
    pub fn enter_navigating(&mut self, target: Url) {
        self.pending = None;
        self.navigating = Some(target);
    }
}
