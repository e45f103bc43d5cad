//! Session Controller
//!
//! The orchestrator. Owns the message sequence and is its only writer, runs
//! the single-in-flight send policy, and coordinates the store, the response
//! generator, and the reveal engine.
//!
//! # Architecture
//!
//! ```text
//!  SurfaceEvent ──► SessionController ──► SurfaceMessage ──► renderer
//!                    │   ▲         │
//!          spawn     │   │ events  │ save / clear
//!                    ▼   │         ▼
//!                 Scheduler    PersistentStore
//!          (responses, reveal ticks, greeting)
//! ```
//!
//! All state changes happen inside `&mut self` methods, so the controller is
//! a single logical thread. The only suspension points are the scheduled
//! tasks, and they report back through [`ScheduledEvent`]s that the owner of
//! the controller feeds to [`SessionController::handle_scheduled`] (or lets
//! [`SessionController::process_next_event`] do it).
//!
//! # States
//!
//! - **Idle**: accepts input
//! - **Awaiting**: a placeholder is in flight, further sends are dropped
//! - **Clearing**: the sequence was wiped and a greeting is due; a send here
//!   supersedes the greeting

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::capabilities::DictationCapability;
use crate::events::{InputOrigin, SurfaceEvent};
use crate::messages::{Author, MessageId, NotifyLevel, SessionState, SurfaceMessage};
use crate::responder::{ResponderError, ResponseGenerator};
use crate::reveal::{RevealEngine, DEFAULT_TICK};
use crate::scheduler::{ScheduledEvent, Scheduler, TimerKey};
use crate::session::{ChatMessage, Session};
use crate::store::{KeyValueBackend, PersistentStore};
use crate::validation::{InputLimits, InputValidator, ValidationResult};

/// Greeting shown when there is no saved conversation
pub const DEFAULT_GREETING: &str = "Hey there! I'm your AI buddy. Ask me anything! I can help you with questions, have conversations, or just chat about whatever's on your mind. 🤖✨";

/// Greeting shown after the conversation was cleared
pub const DEFAULT_CLEARED_GREETING: &str =
    "Chat cleared! I'm ready for our new conversation. What would you like to talk about?";

/// Reply substituted when the generator fails
pub const DEFAULT_APOLOGY: &str =
    "I'm sorry, I'm having trouble responding right now. Please try again in a moment.";

/// Delay between a clear and the new greeting
pub const DEFAULT_CLEAR_GREETING_DELAY: Duration = Duration::from_millis(500);

/// Input hint while a reply is in flight
pub const HINT_THINKING: &str = "AI is thinking...";

/// Input hint while idle
pub const HINT_READY: &str = "Type your message...";

/// Controller configuration
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Greeting for an empty restored session
    pub greeting: String,
    /// Greeting inserted after a clear
    pub cleared_greeting: String,
    /// Substitute text for a failed reply
    pub apology: String,
    /// Delay before the post-clear greeting
    pub clear_greeting_delay: Duration,
    /// Interval between reveal steps
    pub reveal_tick: Duration,
    /// Whether restored assistant messages are revealed again
    pub reveal_restored: bool,
    /// Input limits
    pub limits: InputLimits,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            cleared_greeting: DEFAULT_CLEARED_GREETING.to_string(),
            apology: DEFAULT_APOLOGY.to_string(),
            clear_greeting_delay: DEFAULT_CLEAR_GREETING_DELAY,
            reveal_tick: DEFAULT_TICK,
            reveal_restored: false,
            limits: InputLimits::default(),
        }
    }
}

/// What happened to a send request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// User message and placeholder were appended
    Sent {
        /// The new user message
        user_id: MessageId,
        /// The placeholder awaiting the reply
        placeholder_id: MessageId,
    },
    /// Input was empty after trimming
    Blank,
    /// A reply is already in flight
    Busy,
    /// Input failed validation
    Rejected(String),
}

impl SendOutcome {
    /// Whether the message entered the session
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// A message as the renderer should draw it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    /// Message ID
    pub id: MessageId,
    /// Message author
    pub author: Author,
    /// Text to display (the visible prefix while revealing)
    pub text: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Whether this is the in-flight placeholder
    pub placeholder: bool,
    /// Whether the text is still being revealed (show a typing cursor)
    pub revealing: bool,
}

/// Everything a renderer needs to draw the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    /// Messages in display order
    pub messages: Vec<RenderedMessage>,
    /// Whether input is disabled
    pub loading: bool,
    /// Controller state
    pub state: SessionState,
    /// Placeholder text for the input box
    pub input_hint: String,
    /// Number of finalized messages
    pub message_count: usize,
}

/// The conversation orchestrator
pub struct SessionController<G, B>
where
    G: ResponseGenerator + ?Sized + 'static,
    B: KeyValueBackend,
{
    config: SessionConfig,
    session: Session,
    store: PersistentStore<B>,
    responder: Arc<G>,
    reveal: RevealEngine,
    scheduler: Scheduler,
    validator: InputValidator,
    surface_tx: mpsc::UnboundedSender<SurfaceMessage>,
    state: SessionState,
}

impl<G, B> SessionController<G, B>
where
    G: ResponseGenerator + ?Sized + 'static,
    B: KeyValueBackend,
{
    /// Create a controller, restoring the saved conversation
    ///
    /// An empty restore is replaced by a single greeting. The renderer
    /// receives a [`SurfaceMessage::Snapshot`] before anything else.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: SessionConfig,
        responder: Arc<G>,
        store: PersistentStore<B>,
        surface_tx: mpsc::UnboundedSender<SurfaceMessage>,
    ) -> Self {
        let restored = store.load();
        let restored_count = restored.len();

        let mut controller = Self {
            reveal: RevealEngine::new(config.reveal_tick),
            validator: InputValidator::new(config.limits.clone()),
            session: Session::from_messages(restored),
            scheduler: Scheduler::new(),
            state: SessionState::Idle,
            config,
            store,
            responder,
            surface_tx,
        };

        if controller.session.is_empty() {
            let greeting = ChatMessage::assistant(controller.config.greeting.clone());
            controller.session.append(greeting.clone());
            controller.persist();
            controller.emit_snapshot();
            controller.start_reveal(&greeting);
        } else {
            controller.emit_snapshot();
            if controller.config.reveal_restored {
                let restored: Vec<ChatMessage> = controller.session.messages().to_vec();
                for message in &restored {
                    controller.start_reveal(message);
                }
            }
        }

        tracing::info!(
            responder = controller.responder.name(),
            backend = controller.store.backend().name(),
            restored = restored_count,
            "Session controller ready"
        );

        controller
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Send a typed message
    pub fn send(&mut self, text: &str) -> SendOutcome {
        self.send_from(text, InputOrigin::Typed)
    }

    /// Send a message from a specific input origin
    ///
    /// Appends the user message and a placeholder as one step, persists,
    /// then requests the reply. Blank input and input arriving while a reply
    /// is in flight change nothing and tell the surface nothing.
    pub fn send_from(&mut self, text: &str, origin: InputOrigin) -> SendOutcome {
        if !self.state.accepts_input() || self.session.has_placeholder() {
            tracing::debug!(?origin, state = ?self.state, "Reply in flight, dropping send");
            return SendOutcome::Busy;
        }

        let text = match self.validator.validate_message(text) {
            ValidationResult::Valid(text) => text,
            ValidationResult::Blank => {
                tracing::trace!(?origin, "Ignoring blank input");
                return SendOutcome::Blank;
            }
            ValidationResult::Invalid(reason) => {
                tracing::warn!(?origin, reason = %reason, "Rejected user input");
                self.notify(NotifyLevel::Warning, reason.clone());
                return SendOutcome::Rejected(reason);
            }
        };

        if self.scheduler.cancel_greetings() > 0 {
            tracing::debug!("Send superseded the pending greeting");
        }

        let Some((user_id, placeholder_id)) = self.session.begin_exchange(text.clone()) else {
            return SendOutcome::Busy;
        };

        for id in [&user_id, &placeholder_id] {
            if let Some(message) = self.session.get(id) {
                self.emit(SurfaceMessage::Appended {
                    message: message.clone(),
                });
            }
        }
        self.persist();

        self.set_state(SessionState::Awaiting);
        self.emit(SurfaceMessage::Loading { loading: true });

        tracing::debug!(
            ?origin,
            user_id = %user_id,
            placeholder_id = %placeholder_id,
            "Requesting reply"
        );
        self.scheduler
            .spawn_response(placeholder_id.clone(), Arc::clone(&self.responder), text);

        SendOutcome::Sent {
            user_id,
            placeholder_id,
        }
    }

    /// Wipe the conversation and schedule a fresh greeting
    ///
    /// Always succeeds. A reply still in flight is left to finish and is
    /// discarded when it arrives.
    pub fn clear(&mut self) {
        let reveals = self.scheduler.cancel_reveals();
        self.reveal.cancel_all();
        self.scheduler.cancel_greetings();

        let abandoned = self.session.placeholder_id().cloned();
        self.session.clear();

        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to remove session snapshot");
        }

        self.emit(SurfaceMessage::Cleared);
        if abandoned.is_some() {
            self.emit(SurfaceMessage::Loading { loading: false });
        }
        self.set_state(SessionState::Clearing);

        let generation = self.session.generation();
        self.scheduler.schedule_once(
            TimerKey::Greeting(generation),
            self.config.clear_greeting_delay,
            ScheduledEvent::GreetingDue { generation },
        );

        tracing::debug!(
            generation,
            cancelled_reveals = reveals,
            abandoned_reply = ?abandoned,
            "Session cleared"
        );
    }

    /// Dispatch a surface event
    ///
    /// Returns `false` once the surface asked to quit.
    pub fn handle_event(&mut self, event: SurfaceEvent) -> bool {
        match event {
            SurfaceEvent::UserMessage { content, origin } => {
                self.send_from(&content, origin);
                true
            }
            SurfaceEvent::ClearRequested => {
                self.clear();
                true
            }
            SurfaceEvent::QuitRequested => {
                self.shutdown();
                false
            }
        }
    }

    /// Take one transcript from `dictation` and send it
    ///
    /// Returns `None` if dictation is unavailable or produced nothing.
    pub async fn dictate<D>(&mut self, dictation: &D) -> Option<SendOutcome>
    where
        D: DictationCapability + ?Sized,
    {
        if !dictation.is_available() {
            self.notify(NotifyLevel::Info, "Speech input is not available");
            return None;
        }

        let transcript = dictation.next_transcript().await?;
        Some(self.send_from(&transcript, InputOrigin::Dictated))
    }

    // ========================================================================
    // Scheduled Effects
    // ========================================================================

    /// Wait for the next scheduled event without handling it
    pub async fn next_scheduled(&mut self) -> Option<ScheduledEvent> {
        self.scheduler.next().await
    }

    /// Apply a scheduled event
    pub fn handle_scheduled(&mut self, event: ScheduledEvent) {
        let key = event.key();
        match event {
            ScheduledEvent::ResponseReady {
                placeholder_id,
                result,
            } => {
                self.scheduler.finish(&key);
                self.complete_exchange(placeholder_id, result);
            }
            ScheduledEvent::RevealTick { id, last } => {
                if last {
                    self.scheduler.finish(&key);
                }
                if let Some(frame) = self.reveal.advance(&id) {
                    self.emit(SurfaceMessage::Reveal {
                        id,
                        visible: frame.visible,
                        revealed: frame.revealed,
                        total: frame.total,
                    });
                }
            }
            ScheduledEvent::GreetingDue { generation } => {
                self.scheduler.finish(&key);
                self.greet_after_clear(generation);
            }
        }
    }

    /// Wait for and apply the next scheduled event
    ///
    /// Returns `false` without waiting when nothing is scheduled.
    pub async fn process_next_event(&mut self) -> bool {
        if let Some(event) = self.scheduler.try_next() {
            self.handle_scheduled(event);
            return true;
        }
        if self.scheduler.pending() == 0 {
            return false;
        }
        match self.scheduler.next().await {
            Some(event) => {
                self.handle_scheduled(event);
                true
            }
            None => false,
        }
    }

    /// Apply every event that is already queued, returning how many
    pub fn poll_scheduled(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.scheduler.try_next() {
            self.handle_scheduled(event);
            handled += 1;
        }
        handled
    }

    /// Process events until nothing is scheduled
    pub async fn run_until_settled(&mut self) {
        while self.process_next_event().await {}
    }

    fn complete_exchange(
        &mut self,
        placeholder_id: MessageId,
        result: Result<String, ResponderError>,
    ) {
        let text = match result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    placeholder_id = %placeholder_id,
                    "Reply failed, apologizing"
                );
                self.config.apology.clone()
            }
        };

        let Some(message) = self.session.resolve_placeholder(&placeholder_id, text) else {
            tracing::debug!(placeholder_id = %placeholder_id, "Discarding stale reply");
            return;
        };

        self.emit(SurfaceMessage::Replaced {
            placeholder_id,
            message: message.clone(),
        });
        self.persist();
        self.set_state(SessionState::Idle);
        self.emit(SurfaceMessage::Loading { loading: false });
        self.start_reveal(&message);
    }

    fn greet_after_clear(&mut self, generation: u64) {
        if generation != self.session.generation() || !self.session.is_empty() {
            tracing::debug!(generation, "Dropping superseded greeting");
            return;
        }

        let greeting = ChatMessage::assistant(self.config.cleared_greeting.clone());
        self.session.append(greeting.clone());
        self.emit(SurfaceMessage::Appended {
            message: greeting.clone(),
        });
        self.persist();
        self.set_state(SessionState::Idle);
        self.start_reveal(&greeting);
    }

    fn start_reveal(&mut self, message: &ChatMessage) {
        if !message.is_revealable() {
            return;
        }
        let Some(total) = self.reveal.attach(message.id.clone(), message.text.clone()) else {
            return;
        };

        self.emit(SurfaceMessage::Reveal {
            id: message.id.clone(),
            visible: String::new(),
            revealed: 0,
            total,
        });
        self.scheduler
            .schedule_ticks(message.id.clone(), self.reveal.tick_interval(), total);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.session.persistable()) {
            tracing::warn!(
                error = %e,
                key = self.store.key(),
                "Failed to persist session, continuing in memory"
            );
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "Session state change");
            self.state = state;
            self.emit(SurfaceMessage::State { state });
        }
    }

    fn notify(&self, level: NotifyLevel, message: impl Into<String>) {
        self.emit(SurfaceMessage::Notify {
            level,
            message: message.into(),
        });
    }

    fn emit_snapshot(&self) {
        self.emit(SurfaceMessage::Snapshot {
            messages: self.session.messages().to_vec(),
        });
    }

    fn emit(&self, message: SurfaceMessage) {
        if self.surface_tx.send(message).is_err() {
            tracing::trace!("Surface receiver dropped");
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Messages in order, placeholder included
    pub fn messages(&self) -> &[ChatMessage] {
        self.session.messages()
    }

    /// Number of finalized messages
    pub fn message_count(&self) -> usize {
        self.session.message_count()
    }

    /// Whether a reply is in flight
    pub fn is_loading(&self) -> bool {
        self.session.has_placeholder()
    }

    /// Current controller state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of clears so far
    pub fn generation(&self) -> u64 {
        self.session.generation()
    }

    /// Placeholder text for the input box
    pub fn input_hint(&self) -> &'static str {
        if self.is_loading() {
            HINT_THINKING
        } else {
            HINT_READY
        }
    }

    /// Text the renderer should show for message `id`
    pub fn visible_text(&self, id: &MessageId) -> Option<&str> {
        self.reveal
            .visible_text(id)
            .or_else(|| self.session.get(id).map(|m| m.text.as_str()))
    }

    /// Whether message `id` is still being revealed
    pub fn is_revealing(&self, id: &MessageId) -> bool {
        self.reveal.is_revealing(id)
    }

    /// Number of scheduled tasks
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    /// Configuration in use
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Everything a renderer needs, in one value
    pub fn view(&self) -> SessionView {
        let messages = self
            .session
            .messages()
            .iter()
            .map(|m| RenderedMessage {
                id: m.id.clone(),
                author: m.author,
                text: self
                    .reveal
                    .visible_text(&m.id)
                    .unwrap_or(&m.text)
                    .to_string(),
                timestamp: m.timestamp,
                placeholder: m.placeholder,
                revealing: self.reveal.is_revealing(&m.id),
            })
            .collect();

        SessionView {
            messages,
            loading: self.is_loading(),
            state: self.state,
            input_hint: self.input_hint().to_string(),
            message_count: self.message_count(),
        }
    }

    /// Stop every scheduled task
    pub fn shutdown(&mut self) {
        tracing::info!(pending = self.scheduler.pending(), "Shutting down session controller");
        self.scheduler.shutdown();
        self.reveal.cancel_all();
    }
}
