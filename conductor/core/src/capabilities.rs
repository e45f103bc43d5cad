//! Injected Capabilities
//!
//! Speech capture and theming live outside the core. The controller only
//! talks to them through these traits: dictation hands over finished
//! transcripts, and the theme is a preference the core never reads.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Source of transcribed speech
#[async_trait]
pub trait DictationCapability: Send + Sync {
    /// Whether speech input can be used at all
    fn is_available(&self) -> bool;

    /// Wait for the next finished transcript
    ///
    /// Returns `None` when dictation stopped without producing text.
    async fn next_transcript(&self) -> Option<String>;
}

/// Dictation replaying a fixed queue of transcripts
#[derive(Debug, Default)]
pub struct ScriptedDictation {
    transcripts: Mutex<VecDeque<String>>,
}

impl ScriptedDictation {
    /// Create a dictation source that yields `transcripts` in order
    pub fn new<I, S>(transcripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            transcripts: Mutex::new(transcripts.into_iter().map(Into::into).collect()),
        }
    }

    /// Queue another transcript
    pub fn push(&self, transcript: impl Into<String>) {
        self.transcripts.lock().push_back(transcript.into());
    }
}

#[async_trait]
impl DictationCapability for ScriptedDictation {
    fn is_available(&self) -> bool {
        true
    }

    async fn next_transcript(&self) -> Option<String> {
        self.transcripts.lock().pop_front()
    }
}

/// Color scheme
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background
    #[default]
    Light,
    /// Dark background
    Dark,
}

impl Theme {
    /// The other theme
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Theme preference holder
pub trait ThemeCapability: Send + Sync {
    /// Current theme
    fn current(&self) -> Theme;

    /// Switch theme, returning the new one
    fn toggle(&self) -> Theme;
}

/// In-process theme preference
#[derive(Debug, Default)]
pub struct StaticTheme {
    theme: Mutex<Theme>,
}

impl StaticTheme {
    /// Start with `theme`
    pub fn new(theme: Theme) -> Self {
        Self {
            theme: Mutex::new(theme),
        }
    }
}

impl ThemeCapability for StaticTheme {
    fn current(&self) -> Theme {
        *self.theme.lock()
    }

    fn toggle(&self) -> Theme {
        let mut theme = self.theme.lock();
        *theme = theme.toggled();
        *theme
    }
}
