//! Page controller: one browser-page session against the knowledge backend.
//!
//! [`KnowledgePage`] owns the [`SessionBindingState`] and wires the binder,
//! source registry, ingestion client, redirect controller, modal workflow,
//! and notification feed together. It is the UI boundary: every
//! [`KbError`] is turned into a notification here and returned to the
//! caller as a value, never raised further.
//!
//! ```text
//!   load() ──▶ IndexBinder ──▶ Bound ─────▶ registry.initialize(sources)
//!                          └─▶ NoIndex ───▶ modal.auto_open()
//!                          └─▶ Invalid ───▶ notify + strip_and_reload (delayed)
//!
//!   submit_*() ──▶ ingest ──▶ unbound: bind_and_reload ──▶ Navigating (terminal)
//!                         └─▶ bound:   registry.append + modal close
//! ```

use reqwest::Url;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::KnowledgeBackend;
use crate::binder::{BindResult, IndexBinder};
use crate::config::Config;
use crate::error::KbError;
use crate::ingest::{self, IngestOutcome, UploadFile};
use crate::location::SessionBinding;
use crate::modal::{ModalState, ModalWorkflow, Submission, Tab};
use crate::models::{KnowledgeSource, SessionBindingState, VectorIndexId};
use crate::notify::{Level, Notifications};
use crate::redirect::{Navigator, RedirectController};
use crate::registry::SourceRegistry;

/// Outcome of a completed submission, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The page was unbound; it is now navigating to the new index.
    Navigated(Url),
    /// The source was recorded against the bound index.
    Appended(KnowledgeSource),
    /// The modal was reopened while the request was in flight.
    Discarded,
}

/// Request payload captured when a submission begins.
#[derive(Debug, Clone)]
pub enum Payload {
    Url(String),
    File(Option<UploadFile>),
}

/// A begun submission. Hand it to the backend with [`KnowledgePage::run`]
/// or drive it manually and finish with [`KnowledgePage::complete`].
#[derive(Debug, Clone)]
pub struct PendingSubmit {
    pub submission: Submission,
    pub payload: Payload,
    pub bound: Option<VectorIndexId>,
}

pub struct KnowledgePage {
    binding: SessionBinding,
    state: SessionBindingState,
    backend: Arc<dyn KnowledgeBackend>,
    binder: IndexBinder,
    registry: SourceRegistry,
    modal: ModalWorkflow,
    notifications: Notifications,
    redirect: RedirectController,
    pending_redirect: Option<JoinHandle<()>>,
    example_questions: Vec<String>,
}

impl KnowledgePage {
    pub fn new(
        binding: SessionBinding,
        backend: Arc<dyn KnowledgeBackend>,
        redirect: RedirectController,
    ) -> Self {
        Self {
            binding,
            state: SessionBindingState::Unbound,
            backend,
            binder: IndexBinder::new(),
            registry: SourceRegistry::new(),
            modal: ModalWorkflow::new(),
            notifications: Notifications::new(),
            redirect,
            pending_redirect: None,
            example_questions: Vec::new(),
        }
    }

    /// Builds a page for `location` using the session settings in `config`.
    pub fn from_config(
        config: &Config,
        location: Url,
        backend: Arc<dyn KnowledgeBackend>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let binding = SessionBinding::new(location, config.session.index_param.clone());
        let redirect = RedirectController::new(
            navigator,
            std::time::Duration::from_millis(config.session.redirect_delay_ms),
        );
        Self::new(binding, backend, redirect)
    }

    // ============ Read side ============

    pub fn binding(&self) -> &SessionBinding {
        &self.binding
    }

    pub fn state(&self) -> &SessionBindingState {
        &self.state
    }

    /// Sources of the bound index; empty while not bound.
    pub fn sources(&self) -> &[KnowledgeSource] {
        if self.state.is_bound() {
            self.registry.sources()
        } else {
            &[]
        }
    }

    pub fn modal_state(&self) -> ModalState {
        self.modal.state(&self.state)
    }

    pub fn is_loading(&self) -> bool {
        self.modal.is_loading()
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn example_questions(&self) -> &[String] {
        &self.example_questions
    }

    /// Number of index lookups issued by this page.
    pub fn validations_issued(&self) -> usize {
        self.binder.checked()
    }

    /// Takes the scheduled strip-and-reload, if any, so the caller can wait
    /// for it.
    pub fn take_pending_redirect(&mut self) -> Option<JoinHandle<()>> {
        self.pending_redirect.take()
    }

    // ============ Binding ============

    /// Publishes `Validating` when the location's identifier still needs a
    /// backend lookup, and returns that identifier.
    pub fn begin_load(&mut self) -> Option<VectorIndexId> {
        let index = self.binding.index_id()?;
        if self.binder.is_checked(&index) {
            return None;
        }
        debug!(%index, "validating vector index");
        self.state = SessionBindingState::Validating(index.clone());
        Some(index)
    }

    /// Runs the index binder for the page location.
    ///
    /// Calling this again on the same page does not re-query the backend.
    pub async fn load(&mut self) -> BindResult {
        self.begin_load();
        let backend = Arc::clone(&self.backend);
        let result = self.binder.bind(backend.as_ref(), &self.binding).await;

        let already_settled = self.state == result.state();
        self.state = result.state();

        match &result {
            BindResult::NoIndex => {
                self.modal.auto_open();
            }
            BindResult::Bound { sources, .. } => {
                if !already_settled {
                    self.registry.initialize(sources.iter().cloned());
                }
            }
            BindResult::Invalid { error, .. } => {
                if !already_settled {
                    self.notifications.push_error(error);
                    let (_, handle) = self.redirect.strip_and_reload(&self.binding);
                    self.pending_redirect = Some(handle);
                }
                self.modal.auto_open();
            }
        }
        result
    }

    // ============ Modal ============

    pub fn open_modal(&mut self, tab: Tab) {
        self.modal.open(tab);
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.modal.select_tab(tab);
    }

    pub fn cancel_modal(&mut self) {
        self.modal.cancel();
    }

    pub fn dismiss_notification(&mut self, index: usize) -> bool {
        self.notifications.dismiss(index)
    }

    // ============ Registry ============

    /// Toggles a source's inclusion flag. Unknown ids are ignored.
    pub fn set_included(&mut self, id: &str, value: bool) -> bool {
        self.registry.set_included(id, value)
    }

    // ============ Submission ============

    /// Submits a URL through the modal's URL tab.
    pub async fn submit_url(&mut self, url: &str) -> Result<SubmitOutcome, KbError> {
        let pending = self.begin(Tab::Url, Payload::Url(url.to_string()))?;
        self.run(pending).await
    }

    /// Uploads a file through the modal's file tab.
    pub async fn submit_file(&mut self, file: Option<UploadFile>) -> Result<SubmitOutcome, KbError> {
        let pending = self.begin(Tab::File, Payload::File(file))?;
        self.run(pending).await
    }

    /// Marks a submission as in flight and captures what will be sent.
    ///
    /// Refused while the location carries an identifier that is not bound:
    /// a request sent then would create an index the page cannot adopt.
    pub fn begin(&mut self, tab: Tab, payload: Payload) -> Result<PendingSubmit, KbError> {
        self.modal.open(tab);
        if !self.state.is_bound() {
            if let Some(existing) = self.binding.index_id() {
                let err = KbError::AlreadyBound(existing.to_string());
                self.notifications.push_error(&err);
                return Err(err);
            }
        }
        let submission = self.modal.begin(tab).inspect_err(|err| {
            self.notifications.push_error(err);
        })?;
        Ok(PendingSubmit {
            submission,
            payload,
            bound: self.state.bound_index().cloned(),
        })
    }

    /// Performs the network call for `pending` and applies its result.
    pub async fn run(&mut self, pending: PendingSubmit) -> Result<SubmitOutcome, KbError> {
        let backend = Arc::clone(&self.backend);
        let result = execute(backend.as_ref(), &pending).await;
        self.complete(pending.submission, result)
    }

    /// Applies a finished request to the page.
    pub fn complete(
        &mut self,
        submission: Submission,
        result: Result<IngestOutcome, KbError>,
    ) -> Result<SubmitOutcome, KbError> {
        if !self.modal.finish(submission) {
            debug!(tab = submission.tab.label(), "discarding stale submission result");
            return Ok(SubmitOutcome::Discarded);
        }

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.notifications.push_error(&err);
                return Err(err);
            }
        };

        match self.apply_success(outcome) {
            Ok(done) => Ok(done),
            Err(err) => {
                self.notifications.push_error(&err);
                Err(err)
            }
        }
    }

    fn apply_success(&mut self, outcome: IngestOutcome) -> Result<SubmitOutcome, KbError> {
        self.example_questions = outcome.example_questions.clone();

        if self.binding.index_id().is_none() {
            let index = outcome.index.ok_or_else(|| {
                KbError::BackendRejected("response carried no index_name".to_string())
            })?;
            let target = self.redirect.bind_and_reload(&self.binding, &index)?;
            self.modal.enter_navigating(target.clone());
            return Ok(SubmitOutcome::Navigated(target));
        }

        if !self.state.is_bound() {
            let existing = self.binding.index_id().map(|i| i.to_string()).unwrap_or_default();
            return Err(KbError::AlreadyBound(existing));
        }

        let source = self.registry.append(outcome.title).clone();
        info!(id = %source.id, title = %source.title, "source added");
        let mut message = format!("Added \"{}\"", source.title);
        if !self.example_questions.is_empty() {
            message.push_str(". Try asking: ");
            message.push_str(&self.example_questions.join(" | "));
        }
        self.notifications.push(Level::Success, message);
        self.modal.close_after_success();
        Ok(SubmitOutcome::Appended(source))
    }
}

async fn execute(
    backend: &dyn KnowledgeBackend,
    pending: &PendingSubmit,
) -> Result<IngestOutcome, KbError> {
    let bound = pending.bound.as_ref();
    match &pending.payload {
        Payload::Url(url) => ingest::submit_url(backend, url, bound).await,
        Payload::File(file) => ingest::submit_file(backend, file.as_ref(), bound).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{Call, FakeBackend};
    use crate::models::IngestResponse;
    use crate::notify::CONNECTIVITY_MESSAGE;
    use crate::redirect::RecordingNavigator;
    use std::time::Duration;

    struct Harness {
        page: KnowledgePage,
        backend: Arc<FakeBackend>,
        nav: Arc<RecordingNavigator>,
    }

    fn harness(location: &str, backend: FakeBackend) -> Harness {
        let backend = Arc::new(backend);
        let nav = Arc::new(RecordingNavigator::new());
        let page = KnowledgePage::new(
            SessionBinding::new(Url::parse(location).unwrap(), "vector_index"),
            backend.clone(),
            RedirectController::new(nav.clone(), Duration::from_millis(2000)),
        );
        Harness { page, backend, nav }
    }

    fn doc_a() -> Result<IngestResponse, KbError> {
        Ok(IngestResponse {
            code: 200,
            title: Some("Doc A".into()),
            index_name: Some("idx1".into()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_no_index_opens_modal_without_request() {
        let mut h = harness("http://localhost:3000/", FakeBackend::new());
        let result = h.page.load().await;

        assert_eq!(result, BindResult::NoIndex);
        assert_eq!(h.page.state(), &SessionBindingState::Unbound);
        assert_eq!(h.page.modal_state(), ModalState::Open(Tab::File));
        assert!(h.page.sources().is_empty());
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_valid_index_binds_and_populates_registry() {
        let backend = FakeBackend::new().with_store("idx1", &["https://a.example", "b.pdf"]);
        let mut h = harness("http://localhost:3000/?vector_index=idx1", backend);

        let result = h.page.load().await;
        assert!(!result.needs_registration());
        assert!(h.page.state().is_bound());
        assert_eq!(h.page.modal_state(), ModalState::Closed);

        let sources = h.page.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].id, "source-0");
        assert_eq!(sources[1].title, "b.pdf");
        assert!(sources.iter().all(|s| s.included));
    }

    #[tokio::test]
    async fn test_reload_does_not_requery() {
        let backend = FakeBackend::new().with_store("idx1", &["a"]);
        let mut h = harness("http://localhost:3000/?vector_index=idx1", backend);

        h.page.load().await;
        h.page.set_included("source-0", false);
        h.page.load().await;

        assert_eq!(h.backend.calls(), vec![Call::Check("idx1".into())]);
        assert_eq!(h.page.validations_issued(), 1);
        assert!(!h.page.sources()[0].included, "registry must not be re-initialized");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_index_notifies_and_strips_after_delay() {
        let mut h = harness("http://localhost:3000/?vector_index=bad-id", FakeBackend::new());

        let result = h.page.load().await;
        assert!(matches!(result, BindResult::Invalid { .. }));
        assert_eq!(
            h.page.state(),
            &SessionBindingState::Invalid(VectorIndexId::new("bad-id").unwrap())
        );
        assert!(matches!(h.page.modal_state(), ModalState::Open(_)));
        assert_eq!(h.page.notifications().last().unwrap().level, Level::Error);
        assert!(h.nav.visits().is_empty());

        let redirect = h.page.take_pending_redirect().unwrap();
        redirect.await.unwrap();
        assert_eq!(h.nav.last().unwrap().as_str(), "http://localhost:3000/");
    }

    #[tokio::test]
    async fn test_validating_is_published_before_lookup() {
        let backend = FakeBackend::new().with_store("idx1", &["a"]);
        let mut h = harness("http://localhost:3000/?vector_index=idx1", backend);

        let index = h.page.begin_load();
        assert_eq!(index, VectorIndexId::new("idx1"));
        assert_eq!(
            h.page.state(),
            &SessionBindingState::Validating(VectorIndexId::new("idx1").unwrap())
        );
        assert!(h.page.sources().is_empty());
        assert!(h.backend.calls().is_empty());

        h.page.load().await;
        assert!(h.page.state().is_bound());
        assert_eq!(h.page.sources().len(), 1);
        assert!(h.page.begin_load().is_none(), "a checked index is not validated again");
        assert!(h.page.state().is_bound());
    }

    #[tokio::test]
    async fn test_no_index_never_validates() {
        let mut h = harness("http://localhost:3000/", FakeBackend::new());
        assert!(h.page.begin_load().is_none());
        assert_eq!(h.page.state(), &SessionBindingState::Unbound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_on_validation_is_invalid() {
        let backend = FakeBackend::new()
            .with_check("idx1", Err(KbError::Network("connection refused".into())));
        let mut h = harness("http://localhost:3000/?vector_index=idx1", backend);

        let result = h.page.load().await;
        match result {
            BindResult::Invalid { error, .. } => {
                assert!(matches!(error, KbError::IndexInvalid { .. }))
            }
            other => panic!("expected invalid, got {:?}", other),
        }
        assert!(h.page.take_pending_redirect().is_some());
    }

    #[tokio::test]
    async fn test_first_ingestion_navigates_without_appending() {
        let backend = FakeBackend::new().with_ingest(doc_a());
        let mut h = harness("http://localhost:3000/", backend);
        h.page.load().await;

        let outcome = h.page.submit_url("https://a.example").await.unwrap();
        let target = Url::parse("http://localhost:3000/?vector_index=idx1").unwrap();
        assert_eq!(outcome, SubmitOutcome::Navigated(target.clone()));
        assert_eq!(h.nav.visits(), vec![target.clone()]);
        assert_eq!(h.page.modal_state(), ModalState::Navigating(target));
        assert!(h.page.registry.is_empty());
        assert_eq!(
            h.backend.calls(),
            vec![Call::Url {
                url: "https://a.example".into(),
                index: None
            }]
        );

        assert!(h.page.submit_url("https://b.example").await.is_err());
    }

    #[tokio::test]
    async fn test_blank_index_param_binds_on_first_ingestion() {
        let backend = FakeBackend::new().with_ingest(doc_a());
        let mut h = harness("http://localhost:3000/?vector_index=", backend);

        assert_eq!(h.page.load().await, BindResult::NoIndex);
        assert_eq!(h.page.state(), &SessionBindingState::Unbound);
        assert!(h.page.take_pending_redirect().is_none());

        let outcome = h.page.submit_url("https://a.example").await.unwrap();
        let target = Url::parse("http://localhost:3000/?vector_index=idx1").unwrap();
        assert_eq!(outcome, SubmitOutcome::Navigated(target.clone()));
        assert_eq!(h.nav.visits(), vec![target]);
        assert_eq!(
            h.backend.calls(),
            vec![Call::Url {
                url: "https://a.example".into(),
                index: None
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_page_refuses_submission_without_request() {
        let backend = FakeBackend::new().with_ingest(doc_a());
        let mut h = harness("http://localhost:3000/?vector_index=bad-id", backend);
        h.page.load().await;

        let err = h.page.submit_url("https://a.example").await.unwrap_err();
        assert_eq!(err, KbError::AlreadyBound("bad-id".into()));
        assert_eq!(h.backend.calls(), vec![Call::Check("bad-id".into())]);
        assert!(!h.page.is_loading());
        assert_eq!(h.page.notifications().last().unwrap().level, Level::Error);
    }

    #[tokio::test]
    async fn test_validating_page_refuses_submission_without_request() {
        let backend = FakeBackend::new()
            .with_store("idx1", &[])
            .with_ingest(doc_a());
        let mut h = harness("http://localhost:3000/?vector_index=idx1", backend);
        h.page.begin_load();

        let err = h
            .page
            .begin(Tab::Url, Payload::Url("https://a.example".into()))
            .unwrap_err();
        assert_eq!(err, KbError::AlreadyBound("idx1".into()));
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bound_ingestion_appends_and_closes() {
        let backend = FakeBackend::new()
            .with_store("idx1", &["first"])
            .with_ingest(doc_a());
        let mut h = harness("http://localhost:3000/?vector_index=idx1", backend);
        h.page.load().await;
        h.page.open_modal(Tab::Url);

        let outcome = h.page.submit_url("https://a.example").await.unwrap();
        match outcome {
            SubmitOutcome::Appended(source) => assert_eq!(source.title, "Doc A"),
            other => panic!("expected append, got {:?}", other),
        }
        assert!(h.nav.visits().is_empty());
        assert_eq!(h.page.modal_state(), ModalState::Closed);
        assert_eq!(h.page.sources().len(), 2);
        assert_eq!(h.page.sources()[1].title, "Doc A");
        assert_eq!(
            h.backend.calls().last().unwrap(),
            &Call::Url {
                url: "https://a.example".into(),
                index: Some("idx1".into())
            }
        );
    }

    #[tokio::test]
    async fn test_empty_url_warns_without_request() {
        let mut h = harness("http://localhost:3000/", FakeBackend::new().with_ingest(doc_a()));
        h.page.load().await;

        let err = h.page.submit_url("").await.unwrap_err();
        assert_eq!(err, KbError::Validation("missing URL".into()));
        assert!(h.backend.calls().is_empty());
        assert_eq!(h.page.notifications().last().unwrap().level, Level::Warning);
        assert!(!h.page.is_loading());
    }

    #[tokio::test]
    async fn test_file_transport_failure_keeps_modal_open() {
        let backend = FakeBackend::new()
            .with_store("idx1", &["first"])
            .with_ingest(Err(KbError::Network("connection reset".into())));
        let mut h = harness("http://localhost:3000/?vector_index=idx1", backend);
        h.page.load().await;
        h.page.open_modal(Tab::File);

        let file = UploadFile::new("notes.md", b"# hi".to_vec());
        let err = h.page.submit_file(Some(file)).await.unwrap_err();
        assert!(matches!(err, KbError::Network(_)));
        assert_eq!(h.page.sources().len(), 1);
        assert_eq!(h.page.modal_state(), ModalState::Open(Tab::File));
        assert_eq!(
            h.page.notifications().last().unwrap().message,
            CONNECTIVITY_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_backend_rejection_keeps_modal_open() {
        let backend = FakeBackend::new()
            .with_store("idx1", &[])
            .with_ingest(Ok(IngestResponse {
                code: 400,
                error: Some("Failed to load content from URL".into()),
                ..Default::default()
            }));
        let mut h = harness("http://localhost:3000/?vector_index=idx1", backend);
        h.page.load().await;
        h.page.open_modal(Tab::Url);

        let err = h.page.submit_url("https://a.example").await.unwrap_err();
        assert_eq!(
            err,
            KbError::BackendRejected("Failed to load content from URL".into())
        );
        assert_eq!(h.page.modal_state(), ModalState::Open(Tab::Url));
        assert!(h.page.sources().is_empty());
    }

    #[tokio::test]
    async fn test_stale_result_is_discarded() {
        let backend = FakeBackend::new().with_store("idx1", &[]);
        let mut h = harness("http://localhost:3000/?vector_index=idx1", backend);
        h.page.load().await;

        let pending = h
            .page
            .begin(Tab::Url, Payload::Url("https://a.example".into()))
            .unwrap();
        assert!(h.page.is_loading());
        assert!(h.page.begin(Tab::File, Payload::File(None)).is_err());

        h.page.cancel_modal();
        h.page.open_modal(Tab::File);

        let outcome = IngestOutcome {
            title: "Doc A".into(),
            index: VectorIndexId::new("idx1"),
            example_questions: vec![],
        };
        let done = h.page.complete(pending.submission, Ok(outcome)).unwrap();
        assert_eq!(done, SubmitOutcome::Discarded);
        assert!(h.page.sources().is_empty());
    }

    #[tokio::test]
    async fn test_example_questions_are_kept() {
        let backend = FakeBackend::new()
            .with_store("idx1", &[])
            .with_ingest(Ok(IngestResponse {
                code: 200,
                title: Some("Doc A".into()),
                index_name: Some("idx1".into()),
                example_questions: vec!["What is A?".into(), "Why A?".into()],
                ..Default::default()
            }));
        let mut h = harness("http://localhost:3000/?vector_index=idx1", backend);
        h.page.load().await;

        h.page.submit_url("https://a.example").await.unwrap();
        assert_eq!(h.page.example_questions().len(), 2);
        let note = h.page.notifications().last().unwrap();
        assert_eq!(note.level, Level::Success);
        assert!(note.message.contains("What is A?"));
    }

    #[tokio::test]
    async fn test_unbound_success_without_index_name_is_rejected() {
        let backend = FakeBackend::new().with_ingest(Ok(IngestResponse {
            code: 200,
            title: Some("Doc A".into()),
            ..Default::default()
        }));
        let mut h = harness("http://localhost:3000/", backend);
        h.page.load().await;

        let err = h.page.submit_url("https://a.example").await.unwrap_err();
        assert!(matches!(err, KbError::BackendRejected(_)));
        assert!(h.nav.visits().is_empty());
        assert!(matches!(h.page.modal_state(), ModalState::Open(_)));
    }
}
