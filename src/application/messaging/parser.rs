//! Message parser - Turns prefixed text into command invocations

use once_cell::sync::Lazy;
use regex_lite::Regex;

static USER_MENTION: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^<@!?(\d+)>$").ok());

/// A prefixed message split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The prefix that matched
    pub prefix: String,
    /// The word right after the prefix
    pub name: String,
    /// Everything after the command name, leading whitespace removed
    pub args: String,
}

/// Parses incoming message text against a set of accepted prefixes
#[derive(Debug, Clone, Default)]
pub struct MessageParser;

impl MessageParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a message. Returns `None` for anything that is not a command.
    ///
    /// The longest matching prefix wins so `!!` is not shadowed by `!`.
    pub fn parse(&self, text: &str, prefixes: &[String]) -> Option<Invocation> {
        let mut candidates: Vec<&String> = prefixes.iter().filter(|p| !p.is_empty()).collect();
        candidates.sort_by_key(|p| std::cmp::Reverse(p.len()));

        let prefix = candidates.into_iter().find(|p| text.starts_with(p.as_str()))?;
        let rest = &text[prefix.len()..];

        let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let name = &rest[..name_end];
        if name.is_empty() {
            return None;
        }

        Some(Invocation {
            prefix: prefix.clone(),
            name: name.to_string(),
            args: rest[name_end..].trim_start().to_string(),
        })
    }
}

/// Parse `<@id>`, `<@!id>` or a bare numeric id
pub fn parse_user_id(word: &str) -> Option<u64> {
    if let Some(caps) = USER_MENTION.as_ref().and_then(|re| re.captures(word)) {
        return caps.get(1)?.as_str().parse().ok();
    }
    if !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit()) {
        return word.parse().ok();
    }
    None
}

/// Cursor over a command's argument string.
///
/// Words are whitespace separated; a word starting with `"` runs to the
/// closing quote.
#[derive(Debug, Clone, Default)]
pub struct Args {
    raw: String,
    pos: usize,
}

impl Args {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            pos: 0,
        }
    }

    /// Unconsumed input, leading whitespace removed
    pub fn remaining(&self) -> &str {
        self.raw[self.pos..].trim_start()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining().is_empty()
    }

    fn scan(&self) -> Option<(String, usize)> {
        let start = self.raw.len() - self.remaining().len();
        let rest = &self.raw[start..];
        if rest.is_empty() {
            return None;
        }

        if let Some(quoted) = rest.strip_prefix('"') {
            return match quoted.find('"') {
                Some(end) => Some((quoted[..end].to_string(), start + 1 + end + 1)),
                None => Some((quoted.to_string(), self.raw.len())),
            };
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        Some((rest[..end].to_string(), start + end))
    }

    pub fn peek_word(&self) -> Option<String> {
        self.scan().map(|(word, _)| word)
    }

    pub fn next_word(&mut self) -> Option<String> {
        let (word, end) = self.scan()?;
        self.pos = end;
        Some(word)
    }

    /// Consume everything that is left, trimmed; `None` if nothing is
    pub fn rest(&mut self) -> Option<String> {
        let rest = self.remaining().trim_end().to_string();
        self.pos = self.raw.len();
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }

    /// Consume the next word only if it is a user reference
    pub fn next_user(&mut self) -> Option<u64> {
        let (word, end) = self.scan()?;
        let id = parse_user_id(&word)?;
        self.pos = end;
        Some(id)
    }
}
