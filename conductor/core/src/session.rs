//! Session State
//!
//! The ordered message sequence and the bookkeeping around the single
//! in-flight placeholder.
//!
//! # Design Philosophy
//!
//! A session is plain data. It knows nothing about timers, persistence or
//! renderers; the controller drives it and decides when to persist. Keeping
//! it synchronous means every operation here is atomic from the point of view
//! of any observer.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::messages::{Author, MessageId};

/// A message in the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Message content
    pub text: String,
    /// Who wrote this message
    pub author: Author,
    /// When the message was created (millisecond precision)
    pub timestamp: DateTime<Utc>,
    /// Whether this is an in-flight reply awaiting completion
    #[serde(default)]
    pub placeholder: bool,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Author::User, text.into(), false)
    }

    /// Create a finalized assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Author::Assistant, text.into(), false)
    }

    /// Create an empty assistant placeholder
    pub fn placeholder() -> Self {
        Self::new(Author::Assistant, String::new(), true)
    }

    fn new(author: Author, text: String, placeholder: bool) -> Self {
        Self {
            id: MessageId::new(),
            text,
            author,
            timestamp: now_ms(),
            placeholder,
        }
    }

    /// Whether this message is shown through the reveal engine
    #[must_use]
    pub fn is_revealable(&self) -> bool {
        self.author == Author::Assistant && !self.placeholder
    }
}

/// A conversation session
#[derive(Clone, Debug, Default)]
pub struct Session {
    /// Conversation history in insertion order
    messages: Vec<ChatMessage>,
    /// Current in-flight placeholder (if any)
    placeholder_id: Option<MessageId>,
    /// Bumped on every clear, so work scheduled before a clear can tell
    generation: u64,
}

impl Session {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session from restored messages
    ///
    /// Placeholders never survive a restore.
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages: messages.into_iter().filter(|m| !m.placeholder).collect(),
            placeholder_id: None,
            generation: 0,
        }
    }

    /// Append a finalized message
    pub fn append(&mut self, message: ChatMessage) -> MessageId {
        debug_assert!(!message.placeholder, "use begin_exchange for placeholders");
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Append a user message and its placeholder as one step
    ///
    /// Returns `None` without touching the sequence if a placeholder already
    /// exists.
    pub fn begin_exchange(&mut self, text: impl Into<String>) -> Option<(MessageId, MessageId)> {
        if self.placeholder_id.is_some() {
            return None;
        }

        let user = ChatMessage::user(text);
        let placeholder = ChatMessage::placeholder();
        let user_id = user.id.clone();
        let placeholder_id = placeholder.id.clone();

        self.messages.push(user);
        self.messages.push(placeholder);
        self.placeholder_id = Some(placeholder_id.clone());

        Some((user_id, placeholder_id))
    }

    /// Replace the placeholder with a final assistant message
    ///
    /// Returns `None` when `placeholder_id` is not the current placeholder,
    /// which is how stale completions are recognized.
    pub fn resolve_placeholder(
        &mut self,
        placeholder_id: &MessageId,
        text: impl Into<String>,
    ) -> Option<ChatMessage> {
        if self.placeholder_id.as_ref() != Some(placeholder_id) {
            return None;
        }

        let idx = self.messages.iter().position(|m| &m.id == placeholder_id)?;
        let message = ChatMessage::assistant(text);
        self.messages[idx] = message.clone();
        self.placeholder_id = None;

        Some(message)
    }

    /// Discard every message and start a new generation
    pub fn clear(&mut self) {
        self.messages.clear();
        self.placeholder_id = None;
        self.generation += 1;
    }

    /// Current generation (number of clears so far)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current placeholder ID
    pub fn placeholder_id(&self) -> Option<&MessageId> {
        self.placeholder_id.as_ref()
    }

    /// Check if a reply is in flight
    pub fn has_placeholder(&self) -> bool {
        self.placeholder_id.is_some()
    }

    /// Get message by ID
    pub fn get(&self, id: &MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Get all messages, placeholder included
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Messages that may be written to the store
    pub fn persistable(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|m| !m.placeholder)
            .cloned()
            .collect()
    }

    /// Number of messages excluding the placeholder
    pub fn message_count(&self) -> usize {
        self.messages.iter().filter(|m| !m.placeholder).count()
    }

    /// Whether the sequence is empty (placeholder included)
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Current time truncated to whole milliseconds
///
/// Snapshots store millisecond precision, so truncating at creation keeps
/// restored messages equal to the originals.
pub fn now_ms() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_exchange_appends_pair() {
        let mut session = Session::new();

        let (user_id, placeholder_id) = session.begin_exchange("Hello").unwrap();
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.placeholder_id(), Some(&placeholder_id));

        let user = session.get(&user_id).unwrap();
        assert_eq!(user.author, Author::User);
        assert_eq!(user.text, "Hello");

        let placeholder = session.get(&placeholder_id).unwrap();
        assert!(placeholder.placeholder);
        assert_eq!(placeholder.author, Author::Assistant);
    }

    #[test]
    fn test_second_exchange_rejected_while_in_flight() {
        let mut session = Session::new();
        session.begin_exchange("first").unwrap();

        assert!(session.begin_exchange("second").is_none());
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_resolve_replaces_in_place() {
        let mut session = Session::new();
        session.append(ChatMessage::assistant("greeting"));
        let (_, placeholder_id) = session.begin_exchange("question").unwrap();

        let reply = session.resolve_placeholder(&placeholder_id, "answer").unwrap();

        assert!(!session.has_placeholder());
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[2], reply);
        assert_ne!(reply.id, placeholder_id);
        assert!(session.get(&placeholder_id).is_none());
    }

    #[test]
    fn test_resolve_with_stale_id_is_ignored() {
        let mut session = Session::new();
        let (_, stale) = session.begin_exchange("before clear").unwrap();
        session.clear();
        let (_, _current) = session.begin_exchange("after clear").unwrap();

        assert!(session.resolve_placeholder(&stale, "late").is_none());
        assert!(session.has_placeholder());
        assert!(session.messages().iter().all(|m| m.text != "late"));
    }

    #[test]
    fn test_clear_bumps_generation() {
        let mut session = Session::new();
        session.append(ChatMessage::user("hi"));
        assert_eq!(session.generation(), 0);

        session.clear();
        assert!(session.is_empty());
        assert_eq!(session.generation(), 1);
    }

    #[test]
    fn test_persistable_excludes_placeholder() {
        let mut session = Session::new();
        session.begin_exchange("hi").unwrap();

        let persisted = session.persistable();
        assert_eq!(persisted.len(), 1);
        assert!(!persisted[0].placeholder);
        assert_eq!(session.message_count(), 1);
    }

    #[test]
    fn test_timestamps_have_millisecond_precision() {
        let message = ChatMessage::user("tick");
        assert_eq!(message.timestamp.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_from_messages_drops_placeholders() {
        let restored = Session::from_messages(vec![
            ChatMessage::user("kept"),
            ChatMessage::placeholder(),
        ]);
        assert_eq!(restored.messages().len(), 1);
        assert!(!restored.has_placeholder());
    }
}
