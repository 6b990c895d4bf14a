/// The bot's fixed command vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Link,
    Remake,
    Scan,
}

impl Command {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/link" => Some(Self::Link),
            "/remake" => Some(Self::Remake),
            "/scan" => Some(Self::Scan),
            _ => None,
        }
    }

    /// Commands that only make sense in a one-to-one chat. `/scan` is
    /// exempt: the admin check gates it, not the chat type.
    pub fn private_only(self) -> bool {
        !matches!(self, Self::Scan)
    }
}

/// Parse the leading command out of a message text.
///
/// Accepts `/cmd` and `/cmd@botname`; a foreign `@suffix` means the command
/// is addressed to a different bot and parses to `None`, as does anything
/// outside the vocabulary. Trailing arguments are tolerated and ignored.
pub fn parse_command(text: &str, bot_username: &str) -> Option<Command> {
    let first = text.trim().split_whitespace().next()?;
    if !first.starts_with('/') {
        return None;
    }

    let (word, suffix) = match first.split_once('@') {
        Some((word, suffix)) => (word, Some(suffix)),
        None => (first, None),
    };
    if suffix.is_some_and(|s| s != bot_username) {
        return None;
    }

    Command::from_word(word)
}
