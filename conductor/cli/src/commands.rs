//! Input line parsing

/// What a line typed at the prompt asks for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Plain text to send
    Say(String),
    /// `/clear`
    Clear,
    /// `/quit` or `/exit`
    Quit,
    /// `/theme`
    Theme,
    /// `/dictate <text>` feeds text through the dictation path
    Dictate(String),
    /// `/history`
    History,
    /// `/help`
    Help,
    /// Anything else starting with `/`
    Unknown(String),
}

impl Command {
    /// Parse one input line
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "clear" => Self::Clear,
            "quit" | "exit" => Self::Quit,
            "theme" => Self::Theme,
            "dictate" => Self::Dictate(arg.to_string()),
            "history" => Self::History,
            "help" => Self::Help,
            _ => Self::Unknown(name.to_string()),
        }
    }
}

/// Text shown by `/help`
pub const HELP: &str = "\
Commands:
  /clear            wipe the conversation
  /dictate <text>   send text as if it were spoken
  /history          list the conversation
  /theme            toggle light/dark
  /quit             leave
";
