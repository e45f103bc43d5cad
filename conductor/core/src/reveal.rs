//! Reveal Engine
//!
//! Incremental disclosure of assistant text, one character per tick, for the
//! perceived "typing" effect.
//!
//! # Design Philosophy
//!
//! The engine is pure bookkeeping: it never owns a timer. The scheduler
//! delivers ticks keyed by message id and the controller feeds them to
//! [`RevealEngine::advance`]. A tick for a message the engine no longer
//! tracks yields nothing, so late ticks after a cancel are harmless.
//!
//! Each reveal is one-shot and forward-only. Once a message has been
//! attached it can never be attached again, even after it completes.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::messages::MessageId;

/// Default interval between two reveal steps
pub const DEFAULT_TICK: Duration = Duration::from_millis(30);

/// One emitted step of a reveal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevealFrame {
    /// Characters visible after this step
    pub revealed: usize,
    /// Characters in the full text
    pub total: usize,
    /// The visible prefix
    pub visible: String,
}

/// Reveal state for a single message
#[derive(Clone, Debug)]
pub struct Reveal {
    text: String,
    /// Byte offset after each character
    ends: Vec<usize>,
    revealed: usize,
}

impl Reveal {
    /// Start a reveal with nothing visible
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let ends = text.char_indices().map(|(i, c)| i + c.len_utf8()).collect();
        Self {
            text,
            ends,
            revealed: 0,
        }
    }

    /// Characters in the full text
    pub fn total(&self) -> usize {
        self.ends.len()
    }

    /// Characters visible so far
    pub fn revealed(&self) -> usize {
        self.revealed
    }

    /// Whether the full text is visible
    pub fn is_complete(&self) -> bool {
        self.revealed >= self.total()
    }

    /// The currently visible prefix
    pub fn visible(&self) -> &str {
        match self.revealed {
            0 => "",
            n => &self.text[..self.ends[n - 1]],
        }
    }

    /// Reveal one more character
    ///
    /// Returns `None` once the reveal is complete.
    pub fn tick(&mut self) -> Option<RevealFrame> {
        if self.is_complete() {
            return None;
        }
        self.revealed += 1;
        Some(RevealFrame {
            revealed: self.revealed,
            total: self.total(),
            visible: self.visible().to_string(),
        })
    }
}

/// Tracks every reveal in progress
#[derive(Debug)]
pub struct RevealEngine {
    active: HashMap<MessageId, Reveal>,
    /// Messages that were attached once and may not be attached again
    spent: HashSet<MessageId>,
    tick: Duration,
}

impl Default for RevealEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl RevealEngine {
    /// Create an engine stepping every `tick`
    pub fn new(tick: Duration) -> Self {
        Self {
            active: HashMap::new(),
            spent: HashSet::new(),
            tick,
        }
    }

    /// Interval between steps
    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    /// Begin revealing `text` for message `id`
    ///
    /// Returns the number of ticks needed, or `None` when nothing needs to be
    /// scheduled (empty text, or the message was already attached).
    pub fn attach(&mut self, id: MessageId, text: impl Into<String>) -> Option<usize> {
        if !self.spent.insert(id.clone()) {
            tracing::debug!(message_id = %id, "Ignoring repeated reveal attach");
            return None;
        }

        let reveal = Reveal::new(text);
        let total = reveal.total();
        if total == 0 {
            return None;
        }

        self.active.insert(id, reveal);
        Some(total)
    }

    /// Apply one tick to message `id`
    ///
    /// Returns `None` for messages that are not being revealed.
    pub fn advance(&mut self, id: &MessageId) -> Option<RevealFrame> {
        let reveal = self.active.get_mut(id)?;
        let frame = reveal.tick();
        if reveal.is_complete() {
            self.active.remove(id);
        }
        frame
    }

    /// Stop every reveal and forget every attached message
    pub fn cancel_all(&mut self) -> Vec<MessageId> {
        self.spent.clear();
        self.active.drain().map(|(id, _)| id).collect()
    }

    /// Visible prefix of a message still being revealed
    pub fn visible_text(&self, id: &MessageId) -> Option<&str> {
        self.active.get(id).map(Reveal::visible)
    }

    /// Whether message `id` is still being revealed
    pub fn is_revealing(&self, id: &MessageId) -> bool {
        self.active.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_is_monotonic_and_ends_at_full_length() {
        let mut reveal = Reveal::new("Hola!");
        let mut lengths = Vec::new();

        while let Some(frame) = reveal.tick() {
            assert_eq!(frame.visible.chars().count(), frame.revealed);
            lengths.push(frame.revealed);
        }

        assert_eq!(lengths, vec![1, 2, 3, 4, 5]);
        assert_eq!(reveal.visible(), "Hola!");
        assert!(reveal.tick().is_none());
    }

    #[test]
    fn test_reveal_steps_by_character_not_byte() {
        let mut reveal = Reveal::new("ñ🤖é");
        assert_eq!(reveal.total(), 3);

        assert_eq!(reveal.tick().unwrap().visible, "ñ");
        assert_eq!(reveal.tick().unwrap().visible, "ñ🤖");
        let last = reveal.tick().unwrap();
        assert_eq!(last.visible, "ñ🤖é");
        assert_eq!(last.revealed, last.total);
    }

    #[test]
    fn test_engine_removes_finished_reveals() {
        let mut engine = RevealEngine::default();
        let id = MessageId::new();

        assert_eq!(engine.attach(id.clone(), "ab"), Some(2));
        assert_eq!(engine.visible_text(&id), Some(""));

        engine.advance(&id).unwrap();
        let last = engine.advance(&id).unwrap();
        assert_eq!(last.revealed, last.total);
        assert!(!engine.is_revealing(&id));
        assert!(engine.advance(&id).is_none());
    }

    #[test]
    fn test_engine_is_not_restartable() {
        let mut engine = RevealEngine::default();
        let id = MessageId::new();

        engine.attach(id.clone(), "a");
        engine.advance(&id);
        assert_eq!(engine.attach(id.clone(), "again"), None);
        assert!(!engine.is_revealing(&id));
    }

    #[test]
    fn test_cancel_all_discards_pending_ticks() {
        let mut engine = RevealEngine::default();
        let first = MessageId::new();
        let second = MessageId::new();

        engine.attach(first.clone(), "long text");
        engine.attach(second.clone(), "two");
        engine.advance(&first);

        let mut cancelled = engine.cancel_all();
        cancelled.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        let mut expected = vec![first.clone(), second.clone()];
        expected.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(cancelled, expected);

        for id in [&first, &second] {
            assert!(engine.advance(id).is_none());
            assert!(engine.visible_text(id).is_none());
        }
    }

    #[test]
    fn test_cancel_all_allows_reattach() {
        let mut engine = RevealEngine::default();
        let id = MessageId::new();

        engine.attach(id.clone(), "one");
        engine.cancel_all();
        assert_eq!(engine.attach(id.clone(), "one"), Some(3));
    }

    #[test]
    fn test_empty_text_needs_no_ticks() {
        let mut engine = RevealEngine::default();
        let id = MessageId::new();
        assert_eq!(engine.attach(id.clone(), ""), None);
        assert!(!engine.is_revealing(&id));
    }
}
