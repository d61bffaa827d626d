use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Sentinel token marking the start of an utterance.
pub const BEGIN: &str = "__BEGIN__";
/// Sentinel token marking the end of an utterance.
pub const END: &str = "__END__";

// ASCII only: a Unicode `\w` would also match kana and kanji.
static ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_ ]+$").unwrap());

/// Returns true for the BEGIN and END markers.
pub fn is_sentinel(token: &str) -> bool {
    token == BEGIN || token == END
}

/// Wrap an alphanumeric run in single spaces so it cannot fuse with the
/// neighbouring tokens once a walk concatenates them back together.
///
/// Idempotent: an already padded token is trimmed before re-padding.
/// Sentinels are never padded.
pub fn pad_token(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_sentinel(trimmed) {
        trimmed.to_string()
    } else if !trimmed.is_empty() && ALPHANUMERIC.is_match(trimmed) {
        format!(" {} ", trimmed)
    } else {
        raw.to_string()
    }
}

/// Three consecutive token positions of an utterance.
///
/// `n2` follows `n1` when `n2.first() == n1.second()` and
/// `n2.second() == n1.third()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node(pub [String; 3]);

impl Node {
    pub fn new(a: impl Into<String>, b: impl Into<String>, c: impl Into<String>) -> Self {
        Self([a.into(), b.into(), c.into()])
    }

    pub fn first(&self) -> &str {
        &self.0[0]
    }

    pub fn second(&self) -> &str {
        &self.0[1]
    }

    pub fn third(&self) -> &str {
        &self.0[2]
    }

    /// Returns true if `token` sits at any of the three positions.
    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    /// Leading bigram, used as the forward-adjacency key.
    pub fn head(&self) -> (&str, &str) {
        (self.first(), self.second())
    }

    /// Trailing bigram, used as the backward-adjacency key.
    pub fn tail(&self) -> (&str, &str) {
        (self.second(), self.third())
    }

    /// Concatenation of all three tokens, sentinels included.
    pub fn joined(&self) -> String {
        self.0.concat()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?}, {:?})", self.0[0], self.0[1], self.0[2])
    }
}
