//! The widget itself: composes the store, detector, drag manager,
//! renderer, and answer channel behind a single event-driven controller.
//!
//! Ordering on startup: the view is always rebuilt from the persisted
//! snapshot before any identity detection runs, so a returning user never
//! sees the detection UI flash when their identity was already resolved
//! in an earlier session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pagebot_core::{Config, Message, Result, Sender, Snapshot, WidgetPosition};
use pagebot_page::{dom, observe, DetectorState, IdentityOutcome};
use pagebot_storage::SnapshotStore;

use crate::attachment;
use crate::backend::{AnswerBackend, AskRequest};
use crate::drag::{DragManager, DragSurface, Point, Size};
use crate::render;

/// Fixed identifier for the widget's root element on the host page. A
/// page that already carries it is never mounted twice.
pub const WIDGET_ROOT_ID: &str = "pagebot-widget-root";

const SEND_FAILED_TEXT: &str = "Could not reach the assistant. Please try again.";

#[derive(Debug, Clone)]
pub enum UiEvent {
    /// External "open" signal from the companion control surface.
    Open,
    Toggle,
    Send { text: String },
    Paste { bytes: Vec<u8> },
    PointerDown { surface: DragSurface, pointer: Point },
    PointerMove { pointer: Point },
    PointerUp,
    Logout,
    PageChanged { html: String },
}

/// Notifications for whatever surface hosts the widget.
#[derive(Debug, Clone)]
pub enum WidgetUpdate {
    Restored { open: bool, messages: usize },
    OpenChanged(bool),
    MessageAppended { sender: Sender, html: String },
    TypingChanged(bool),
    ErrorShown { html: String },
    IdentityChanged { name: Option<String> },
    PositionChanged(WidgetPosition),
    LogCleared,
}

/// What the widget currently displays, in order. Errors and the typing
/// indicator are view-only: they never enter the persisted message log.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewBlock {
    Message { sender: Sender, html: String },
    Error { html: String },
    Typing,
}

struct DetectorHandle {
    cancel: CancellationToken,
    mutations: mpsc::Sender<String>,
    outcome: oneshot::Receiver<Option<IdentityOutcome>>,
}

pub struct WidgetController {
    config: Config,
    store: SnapshotStore,
    backend: Arc<dyn AnswerBackend>,
    updates: mpsc::Sender<WidgetUpdate>,
    snapshot: Snapshot,
    view: Vec<ViewBlock>,
    page_html: String,
    page_content: String,
    pending_attachment: Option<String>,
    drag: DragManager,
    detector: Option<DetectorHandle>,
    detector_state: DetectorState,
}

enum Step {
    Event(Option<UiEvent>),
    Detection(Option<IdentityOutcome>),
}

impl WidgetController {
    /// Mount the widget against a host page. Idempotent: if the page
    /// already carries the widget root identifier, nothing is mounted and
    /// None is returned.
    pub fn mount(
        config: Config,
        store: SnapshotStore,
        backend: Arc<dyn AnswerBackend>,
        updates: mpsc::Sender<WidgetUpdate>,
        page_html: &str,
    ) -> Option<Self> {
        if page_has_widget_root(page_html) {
            info!(root = WIDGET_ROOT_ID, "Widget already present on page, not mounting again");
            return None;
        }

        let snapshot = store.load();
        let drag = DragManager::new(
            Size {
                width: config.widget.viewport_width,
                height: config.widget.viewport_height,
            },
            Size {
                width: config.widget.width,
                height: config.widget.height,
            },
        );
        let page_content = dom::page_text(page_html, config.backend.page_content_limit);

        Some(Self {
            config,
            store,
            backend,
            updates,
            snapshot,
            view: Vec::new(),
            page_html: page_html.to_string(),
            page_content,
            pending_attachment: None,
            drag,
            detector: None,
            detector_state: DetectorState::ScanningSelectors,
        })
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn view(&self) -> &[ViewBlock] {
        &self.view
    }

    pub fn detector_state(&self) -> DetectorState {
        self.detector_state
    }

    /// Drive the widget until the event stream closes.
    pub async fn run(mut self, mut events: mpsc::Receiver<UiEvent>) -> Result<()> {
        self.restore().await?;

        loop {
            let step = match self.detector.as_mut() {
                Some(handle) => tokio::select! {
                    ev = events.recv() => Step::Event(ev),
                    out = &mut handle.outcome => Step::Detection(out.ok().flatten()),
                },
                None => Step::Event(events.recv().await),
            };

            match step {
                Step::Event(None) => break,
                Step::Event(Some(ev)) => self.handle_event(ev).await?,
                Step::Detection(outcome) => self.finish_detection(outcome).await?,
            }
        }
        Ok(())
    }

    /// Rebuild the view from the restored snapshot, and only then start
    /// identity detection if no identity was carried over.
    async fn restore(&mut self) -> Result<()> {
        for message in self.snapshot.messages.clone() {
            self.view.push(ViewBlock::Message {
                sender: message.sender,
                html: render::render_message(&message),
            });
        }
        self.emit(WidgetUpdate::Restored {
            open: self.snapshot.is_open,
            messages: self.snapshot.messages.len(),
        })
        .await;

        match &self.snapshot.user {
            Some(name) => {
                debug!(user = %name, "Identity restored from snapshot, skipping detection");
                self.detector_state = DetectorState::Resolved;
            }
            None => self.spawn_detection(),
        }
        Ok(())
    }

    fn spawn_detection(&mut self) {
        let (mutations_tx, mutations_rx) = mpsc::channel(16);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let task = observe::resolve_identity(
            self.page_html.clone(),
            mutations_rx,
            Duration::from_millis(self.config.detection.timeout_ms),
            cancel.clone(),
            self.config.detection.fallback_name.clone(),
        );
        tokio::spawn(async move {
            let _ = outcome_tx.send(task.await);
        });

        self.detector_state = DetectorState::ScanningSelectors;
        self.detector = Some(DetectorHandle {
            cancel,
            mutations: mutations_tx,
            outcome: outcome_rx,
        });
    }

    async fn finish_detection(&mut self, outcome: Option<IdentityOutcome>) -> Result<()> {
        self.detector = None;
        let Some(outcome) = outcome else {
            // Cancelled; logout already reset the state.
            return Ok(());
        };

        self.detector_state = if outcome.is_fallback() {
            DetectorState::FallbackGuest
        } else {
            DetectorState::Resolved
        };
        info!(user = %outcome.name, source = ?outcome.source, "Identity resolved");
        self.snapshot.user = Some(outcome.name.clone());
        self.persist();
        self.emit(WidgetUpdate::IdentityChanged {
            name: Some(outcome.name),
        })
        .await;
        Ok(())
    }

    async fn handle_event(&mut self, event: UiEvent) -> Result<()> {
        match event {
            UiEvent::Open => {
                if !self.snapshot.is_open {
                    self.snapshot.is_open = true;
                    self.persist();
                    self.emit(WidgetUpdate::OpenChanged(true)).await;
                }
            }
            UiEvent::Toggle => {
                self.snapshot.is_open = !self.snapshot.is_open;
                self.persist();
                self.emit(WidgetUpdate::OpenChanged(self.snapshot.is_open)).await;
            }
            UiEvent::Send { text } => self.handle_send(text).await?,
            UiEvent::Paste { bytes } => {
                // Non-image content is dropped silently, by contract.
                if let Some(data_uri) = attachment::attachment_from_paste(&bytes) {
                    self.pending_attachment = Some(data_uri);
                }
            }
            UiEvent::PointerDown { surface, pointer } => {
                self.drag.press(surface, &self.snapshot.position, pointer);
            }
            UiEvent::PointerMove { pointer } => {
                if let Some(position) = self.drag.motion(pointer) {
                    self.emit(WidgetUpdate::PositionChanged(position)).await;
                }
            }
            UiEvent::PointerUp => {
                if let Some(position) = self.drag.release() {
                    self.snapshot.position = position;
                    self.persist();
                    self.emit(WidgetUpdate::PositionChanged(position)).await;
                }
            }
            UiEvent::Logout => self.handle_logout().await?,
            UiEvent::PageChanged { html } => {
                self.page_content = dom::page_text(&html, self.config.backend.page_content_limit);
                if let Some(handle) = &self.detector {
                    // Best effort: a full buffer just means the detector is
                    // behind on revisions it would scan anyway.
                    let _ = handle.mutations.try_send(html.clone());
                }
                self.page_html = html;
            }
        }
        Ok(())
    }

    async fn handle_send(&mut self, text: String) -> Result<()> {
        let text = text.trim().to_string();
        let image = self.pending_attachment.take();
        if text.is_empty() && image.is_none() {
            return Ok(());
        }

        let message = match &image {
            Some(data_uri) => Message::user_with_image(Some(&text), data_uri),
            None => Message::user(&text),
        };
        self.snapshot.messages.push(message.clone());
        self.persist();
        self.push_message(&message).await;

        self.set_typing(true).await;
        let request = AskRequest {
            message: text,
            image,
            page_content: self.page_content.clone(),
            user_name: self.current_user_name(),
        };
        let result = self.backend.ask(&request).await;
        self.set_typing(false).await;

        match result {
            Ok(answer) => {
                let reply = Message::bot(&answer);
                self.snapshot.messages.push(reply.clone());
                self.persist();
                self.push_message(&reply).await;
            }
            Err(e) => {
                warn!(error = %e, "Answer request failed");
                let html = render::render_error(SEND_FAILED_TEXT);
                self.view.push(ViewBlock::Error { html: html.clone() });
                self.emit(WidgetUpdate::ErrorShown { html }).await;
            }
        }
        Ok(())
    }

    /// Logout wipes the conversation and the inferred identity, then
    /// re-enters detection from the top.
    async fn handle_logout(&mut self) -> Result<()> {
        if let Some(handle) = self.detector.take() {
            handle.cancel.cancel();
        }
        self.snapshot.messages.clear();
        self.snapshot.user = None;
        self.persist();
        self.view.clear();
        self.pending_attachment = None;
        self.emit(WidgetUpdate::LogCleared).await;
        self.emit(WidgetUpdate::IdentityChanged { name: None }).await;
        self.spawn_detection();
        Ok(())
    }

    fn current_user_name(&self) -> String {
        self.snapshot
            .user
            .clone()
            .unwrap_or_else(|| self.config.detection.fallback_name.clone())
    }

    async fn push_message(&mut self, message: &Message) {
        let html = render::render_message(message);
        self.view.push(ViewBlock::Message {
            sender: message.sender,
            html: html.clone(),
        });
        self.emit(WidgetUpdate::MessageAppended {
            sender: message.sender,
            html,
        })
        .await;
    }

    async fn set_typing(&mut self, typing: bool) {
        if typing {
            self.view.push(ViewBlock::Typing);
        } else {
            self.view.retain(|block| *block != ViewBlock::Typing);
        }
        self.emit(WidgetUpdate::TypingChanged(typing)).await;
    }

    /// Snapshot writes are whole-unit and last-write-wins; a failed write
    /// is logged and the widget stays interactive.
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.snapshot) {
            warn!(error = %e, "Failed to persist widget snapshot");
        }
    }

    async fn emit(&self, update: WidgetUpdate) {
        let _ = self.updates.send(update).await;
    }
}

fn page_has_widget_root(html: &str) -> bool {
    html.contains(&format!("id=\"{}\"", WIDGET_ROOT_ID))
        || html.contains(&format!("id='{}'", WIDGET_ROOT_ID))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pagebot_core::{Error, Paths};

    struct EchoBackend;

    #[async_trait]
    impl AnswerBackend for EchoBackend {
        async fn ask(&self, request: &AskRequest) -> Result<String> {
            Ok(format!("echo: {}", request.message))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl AnswerBackend for FailingBackend {
        async fn ask(&self, _request: &AskRequest) -> Result<String> {
            Err(Error::Transport("connection refused".to_string()))
        }
    }

    const HOST_PAGE: &str = r#"<html><body>
        <h1>Transport Department</h1>
        <p>Renew licenses and permits online.</p>
    </body></html>"#;

    fn controller_with(
        dir: &tempfile::TempDir,
        backend: Arc<dyn AnswerBackend>,
    ) -> (WidgetController, mpsc::Receiver<WidgetUpdate>) {
        let store = SnapshotStore::new(Paths::with_base(dir.path().to_path_buf()));
        let (updates_tx, updates_rx) = mpsc::channel(64);
        let controller = WidgetController::mount(
            Config::default(),
            store,
            backend,
            updates_tx,
            HOST_PAGE,
        )
        .unwrap();
        (controller, updates_rx)
    }

    #[tokio::test]
    async fn test_mount_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(Paths::with_base(dir.path().to_path_buf()));
        let (updates_tx, _updates_rx) = mpsc::channel(8);
        let page = format!(
            r#"<html><body><div id="{}"></div></body></html>"#,
            WIDGET_ROOT_ID
        );
        assert!(WidgetController::mount(
            Config::default(),
            store,
            Arc::new(EchoBackend),
            updates_tx,
            &page,
        )
        .is_none());
    }

    #[tokio::test]
    async fn test_send_appends_user_and_bot_messages() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, mut updates) = controller_with(&dir, Arc::new(EchoBackend));

        controller
            .handle_event(UiEvent::Send { text: "hello".to_string() })
            .await
            .unwrap();

        assert_eq!(controller.snapshot().messages.len(), 2);
        assert_eq!(controller.snapshot().messages[0].sender, Sender::User);
        assert_eq!(controller.snapshot().messages[1].sender, Sender::Bot);
        assert_eq!(
            controller.snapshot().messages[1].text.as_deref(),
            Some("echo: hello")
        );

        // Typing indicator went up and came down around the request.
        let mut saw_typing_on = false;
        let mut saw_typing_off = false;
        while let Ok(update) = updates.try_recv() {
            match update {
                WidgetUpdate::TypingChanged(true) => saw_typing_on = true,
                WidgetUpdate::TypingChanged(false) => {
                    assert!(saw_typing_on);
                    saw_typing_off = true;
                }
                _ => {}
            }
        }
        assert!(saw_typing_off);
        assert!(!controller.view().contains(&ViewBlock::Typing));
    }

    #[tokio::test]
    async fn test_transport_failure_shows_one_error_and_no_success() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _updates) = controller_with(&dir, Arc::new(FailingBackend));

        controller
            .handle_event(UiEvent::Send { text: "hello".to_string() })
            .await
            .unwrap();

        // The user message is logged; no bot entry is fabricated.
        assert_eq!(controller.snapshot().messages.len(), 1);
        assert_eq!(controller.snapshot().messages[0].sender, Sender::User);

        let errors: Vec<_> = controller
            .view()
            .iter()
            .filter(|block| matches!(block, ViewBlock::Error { .. }))
            .collect();
        assert_eq!(errors.len(), 1);

        // The widget stays interactive: a retry behaves the same way.
        controller
            .handle_event(UiEvent::Send { text: "again".to_string() })
            .await
            .unwrap();
        assert_eq!(controller.snapshot().messages.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_send_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _updates) = controller_with(&dir, Arc::new(EchoBackend));

        controller
            .handle_event(UiEvent::Send { text: "   ".to_string() })
            .await
            .unwrap();
        assert!(controller.snapshot().messages.is_empty());
    }

    #[tokio::test]
    async fn test_non_image_paste_leaves_attachment_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _updates) = controller_with(&dir, Arc::new(EchoBackend));

        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
        controller
            .handle_event(UiEvent::Paste { bytes: png.to_vec() })
            .await
            .unwrap();
        let pending = controller.pending_attachment.clone();
        assert!(pending.is_some());

        controller
            .handle_event(UiEvent::Paste { bytes: b"plain text".to_vec() })
            .await
            .unwrap();
        assert_eq!(controller.pending_attachment, pending);
        assert!(controller
            .view()
            .iter()
            .all(|block| !matches!(block, ViewBlock::Error { .. })));
    }

    #[tokio::test]
    async fn test_pasted_image_rides_next_send_then_clears() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _updates) = controller_with(&dir, Arc::new(EchoBackend));

        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
        controller
            .handle_event(UiEvent::Paste { bytes: png.to_vec() })
            .await
            .unwrap();
        controller
            .handle_event(UiEvent::Send { text: "what is this?".to_string() })
            .await
            .unwrap();

        assert!(controller.snapshot().messages[0].image.is_some());
        assert!(controller.pending_attachment.is_none());
    }

    #[tokio::test]
    async fn test_restore_precedes_detection_and_skips_when_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(Paths::with_base(dir.path().to_path_buf()));
        let mut saved = Snapshot::default();
        saved.user = Some("Anita".to_string());
        saved.messages.push(Message::user("earlier question"));
        store.save(&saved).unwrap();

        let (mut controller, mut updates) = controller_with(&dir, Arc::new(EchoBackend));
        controller.restore().await.unwrap();

        assert_eq!(controller.view().len(), 1);
        assert!(controller.detector.is_none());
        assert_eq!(controller.detector_state(), DetectorState::Resolved);
        assert!(matches!(
            updates.try_recv(),
            Ok(WidgetUpdate::Restored { open: false, messages: 1 })
        ));
    }

    #[tokio::test]
    async fn test_restore_spawns_detection_when_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _updates) = controller_with(&dir, Arc::new(EchoBackend));
        controller.restore().await.unwrap();

        assert!(controller.detector.is_some());
        assert_eq!(controller.detector_state(), DetectorState::ScanningSelectors);
    }

    #[tokio::test]
    async fn test_logout_clears_log_and_restarts_detection() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _updates) = controller_with(&dir, Arc::new(EchoBackend));

        controller.snapshot.user = Some("Anita".to_string());
        controller.detector_state = DetectorState::Resolved;
        controller
            .handle_event(UiEvent::Send { text: "hello".to_string() })
            .await
            .unwrap();
        assert!(!controller.snapshot().messages.is_empty());

        controller.handle_event(UiEvent::Logout).await.unwrap();

        assert!(controller.snapshot().messages.is_empty());
        assert!(controller.snapshot().user.is_none());
        assert!(controller.view().is_empty());
        assert_eq!(controller.detector_state(), DetectorState::ScanningSelectors);
        assert!(controller.detector.is_some());

        // The cleared snapshot is what landed on disk.
        let store = SnapshotStore::new(Paths::with_base(dir.path().to_path_buf()));
        let reloaded = store.load();
        assert!(reloaded.messages.is_empty());
        assert!(reloaded.user.is_none());
    }

    #[tokio::test]
    async fn test_drag_release_persists_position() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _updates) = controller_with(&dir, Arc::new(EchoBackend));

        controller
            .handle_event(UiEvent::PointerDown {
                surface: DragSurface::Header,
                pointer: Point { x: 1000.0, y: 500.0 },
            })
            .await
            .unwrap();
        controller
            .handle_event(UiEvent::PointerMove {
                pointer: Point { x: 600.0, y: 300.0 },
            })
            .await
            .unwrap();
        controller.handle_event(UiEvent::PointerUp).await.unwrap();

        let position = controller.snapshot().position;
        assert!(matches!(position, WidgetPosition::Absolute { .. }));

        let store = SnapshotStore::new(Paths::with_base(dir.path().to_path_buf()));
        assert_eq!(store.load().position, position);
    }

    #[tokio::test]
    async fn test_page_changed_updates_page_content() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _updates) = controller_with(&dir, Arc::new(EchoBackend));

        controller
            .handle_event(UiEvent::PageChanged {
                html: "<html><body><p>Passport services</p></body></html>".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(controller.page_content, "Passport services");
    }
}
