//! Transcript Renderer
//!
//! Turns [`SurfaceMessage`]s into terminal text. The renderer is a read-only
//! consumer: it keeps just enough state to print reveal frames as a growing
//! line instead of reprinting the whole prefix each tick.
//!
//! Messages that arrive in a snapshot are printed in full; their reveal
//! frames, if any, are ignored. Control characters in message text are
//! printed escaped so a message can never drive the terminal.

use std::collections::{HashMap, HashSet};

use parley_core::{Author, ChatMessage, MessageId, NotifyLevel, SessionView, SurfaceMessage};

const ASSISTANT_PREFIX: &str = "assistant: ";
const USER_PREFIX: &str = "you: ";

/// Incremental transcript printer
#[derive(Debug, Default)]
pub struct Renderer {
    /// Messages already printed in full
    shown: HashSet<MessageId>,
    /// Characters printed so far for each revealing message
    progress: HashMap<MessageId, usize>,
    /// Message whose line is currently open
    open_line: Option<MessageId>,
}

impl Renderer {
    /// Create a renderer with nothing printed
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to write for a line the terminal itself produced
    pub fn text(&mut self, text: &str) -> String {
        let mut out = self.close_line();
        out.push_str(text);
        if !text.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    /// Text to write for `message`
    pub fn render(&mut self, message: &SurfaceMessage) -> String {
        match message {
            SurfaceMessage::Snapshot { messages } => {
                let mut out = self.close_line();
                for m in messages {
                    self.shown.insert(m.id.clone());
                    out.push_str(&line_for(m));
                }
                out
            }
            SurfaceMessage::Appended { message } if message.placeholder => {
                let mut out = self.close_line();
                out.push_str("  (thinking...)\n");
                out
            }
            SurfaceMessage::Appended { message } if message.author == Author::User => {
                self.shown.insert(message.id.clone());
                let mut out = self.close_line();
                out.push_str(&line_for(message));
                out
            }
            SurfaceMessage::Reveal {
                id,
                visible,
                revealed,
                total,
            } => self.render_frame(id, visible, *revealed, *total),
            SurfaceMessage::Cleared => {
                let mut out = self.close_line();
                self.shown.clear();
                self.progress.clear();
                out.push_str("--- chat cleared ---\n");
                out
            }
            SurfaceMessage::Notify { level, message } => {
                let mut out = self.close_line();
                out.push_str(&format!("[{}] {message}\n", level_label(*level)));
                out
            }
            // Assistant text arrives through reveal frames
            SurfaceMessage::Appended { .. }
            | SurfaceMessage::Replaced { .. }
            | SurfaceMessage::Loading { .. }
            | SurfaceMessage::State { .. } => String::new(),
        }
    }

    fn render_frame(&mut self, id: &MessageId, visible: &str, revealed: usize, total: usize) -> String {
        if self.shown.contains(id) {
            return String::new();
        }

        let mut out = String::new();
        if self.open_line.as_ref() != Some(id) {
            out.push_str(&self.close_line());
            out.push_str(ASSISTANT_PREFIX);
            self.open_line = Some(id.clone());
        }

        let printed = self.progress.entry(id.clone()).or_insert(0);
        let fresh: String = visible.chars().skip(*printed).collect();
        out.push_str(&escape_controls(&fresh));
        *printed = revealed;

        if revealed >= total {
            out.push('\n');
            self.open_line = None;
            self.progress.remove(id);
            self.shown.insert(id.clone());
        }
        out
    }

    fn close_line(&mut self) -> String {
        match self.open_line.take() {
            Some(_) => "\n".to_string(),
            None => String::new(),
        }
    }
}

/// Full transcript for `/history`
pub fn history(view: &SessionView) -> String {
    let mut out = format!(
        "--- {} messages ({}) ---\n",
        view.message_count,
        view.state.description()
    );
    for m in view.messages.iter().filter(|m| !m.placeholder) {
        let prefix = match m.author {
            Author::User => USER_PREFIX,
            Author::Assistant => ASSISTANT_PREFIX,
        };
        let cursor = if m.revealing { "▌" } else { "" };
        out.push_str(&format!(
            "[{}] {prefix}{}{cursor}\n",
            m.timestamp.format("%H:%M"),
            escape_controls(&m.text)
        ));
    }
    out
}

fn line_for(message: &ChatMessage) -> String {
    let prefix = match message.author {
        Author::User => USER_PREFIX,
        Author::Assistant => ASSISTANT_PREFIX,
    };
    format!("{prefix}{}\n", escape_controls(&message.text))
}

fn escape_controls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() && c != '\n' && c != '\t' {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

fn level_label(level: NotifyLevel) -> &'static str {
    match level {
        NotifyLevel::Info => "info",
        NotifyLevel::Warning => "warning",
        NotifyLevel::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use parley_core::SessionState;

    use super::*;

    fn frame(id: &MessageId, text: &str, revealed: usize) -> SurfaceMessage {
        SurfaceMessage::Reveal {
            id: id.clone(),
            visible: text.chars().take(revealed).collect(),
            revealed,
            total: text.chars().count(),
        }
    }

    #[test]
    fn test_frames_print_only_new_characters() {
        let mut renderer = Renderer::new();
        let id = MessageId::new();

        let mut out = String::new();
        for n in 0..=3 {
            out.push_str(&renderer.render(&frame(&id, "Hi!", n)));
        }

        assert_eq!(out, "assistant: Hi!\n");
    }

    #[test]
    fn test_snapshot_messages_skip_reveal() {
        let mut renderer = Renderer::new();
        let greeting = ChatMessage::assistant("Hello");

        let out = renderer.render(&SurfaceMessage::Snapshot {
            messages: vec![greeting.clone()],
        });
        assert_eq!(out, "assistant: Hello\n");
        assert_eq!(renderer.render(&frame(&greeting.id, "Hello", 1)), "");
    }

    #[test]
    fn test_interrupted_line_is_closed() {
        let mut renderer = Renderer::new();
        let id = MessageId::new();

        let mut out = renderer.render(&frame(&id, "Hello", 2));
        out.push_str(&renderer.render(&SurfaceMessage::Cleared));

        assert_eq!(out, "assistant: He\n--- chat cleared ---\n");
    }

    #[test]
    fn test_local_text_closes_open_line() {
        let mut renderer = Renderer::new();
        let id = MessageId::new();

        let mut out = renderer.render(&frame(&id, "Hello", 2));
        out.push_str(&renderer.text("theme: Dark"));
        out.push_str(&renderer.render(&frame(&id, "Hello", 5)));

        assert_eq!(out, "assistant: He\ntheme: Dark\nassistant: llo\n");
    }

    #[test]
    fn test_escape_sequences_are_not_interpreted() {
        let mut renderer = Renderer::new();
        let out = renderer.render(&SurfaceMessage::Appended {
            message: ChatMessage::user("colour \u{1b}[31mred"),
        });
        assert_eq!(out, "you: colour \\u{1b}[31mred\n");
    }

    #[test]
    fn test_history_lists_finished_messages() {
        let view = SessionView {
            messages: Vec::new(),
            loading: false,
            state: SessionState::Idle,
            input_hint: "Type your message...".to_string(),
            message_count: 0,
        };
        assert_eq!(history(&view), "--- 0 messages (Ready) ---\n");
    }

    #[test]
    fn test_notify() {
        let mut renderer = Renderer::new();
        let out = renderer.render(&SurfaceMessage::Notify {
            level: NotifyLevel::Warning,
            message: "Message too large".to_string(),
        });
        assert_eq!(out, "[warning] Message too large\n");
    }
}
