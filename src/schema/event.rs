use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for account IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(pub u64);

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of stream item an event is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventKind {
    /// An ordinary posted status.
    #[default]
    Status,
    /// Someone started following `target`.
    Follow,
    /// Any other stream notification; carried through, never acted on.
    Other(String),
}

/// A single inbound item from the stream transport.
///
/// Every field is optional: the transport delivers deletions, friend lists
/// and notifications through the same channel as statuses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub kind: EventKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub author_id: Option<AuthorId>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub in_reply_to_author_id: Option<AuthorId>,
    /// Followed account, for `EventKind::Follow`.
    #[serde(default)]
    pub target_id: Option<AuthorId>,
    /// Tokens extracted from `text` by the tokenizer collaborator.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Event {
    /// A plain status with text and a known author.
    pub fn status(id: u64, author: AuthorId, text: &str) -> Self {
        Self {
            id: Some(id),
            text: Some(text.to_string()),
            author_id: Some(author),
            ..Self::default()
        }
    }

    /// Builder-style: mark this event as a reply to `author`.
    pub fn replying_to(mut self, author: AuthorId) -> Self {
        self.in_reply_to_author_id = Some(author);
        self
    }

    /// Builder-style: attach the author's screen name.
    pub fn named(mut self, name: &str) -> Self {
        self.author_name = Some(name.to_string());
        self
    }

    /// A follow notification from `source` to `target`.
    pub fn follow(source: AuthorId, target: AuthorId) -> Self {
        Self {
            kind: EventKind::Follow,
            author_id: Some(source),
            target_id: Some(target),
            ..Self::default()
        }
    }

    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn is_authored_by(&self, id: AuthorId) -> bool {
        self.author_id == Some(id)
    }

    /// Text prefix addressing the author, e.g. `"@alice "`; empty when the
    /// screen name is unknown.
    pub fn mention(&self) -> String {
        match self.author_name.as_deref() {
            Some(name) if !name.is_empty() => format!("@{} ", name),
            _ => String::new(),
        }
    }
}

/// What the bot should do in response to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    None,
    Reply {
        text: String,
        in_reply_to_id: Option<u64>,
    },
    Tweet {
        text: String,
    },
    /// Follow `user` back; post `text` as a greeting when one could be generated.
    FollowAndGreet {
        user: AuthorId,
        text: Option<String>,
    },
}

impl Action {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
