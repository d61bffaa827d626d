/// Bot configuration — RON loading and validation.
use chrono::Duration;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::corpus::DEFAULT_CAPACITY;
use crate::core::markov::Strategy;
use crate::schema::event::AuthorId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid keyword pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// The bot's own account; its events are never acted on.
    pub self_id: AuthorId,
    #[serde(default)]
    pub screen_name: String,
    /// Utterances kept in the corpus.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub popular: PopularConfig,
    #[serde(default)]
    pub tweet: TweetConfig,
    #[serde(default)]
    pub keywords: Vec<KeywordRule>,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Popularity ranking window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopularConfig {
    /// Number of most recent corpus tokens that are counted.
    pub recent: usize,
    /// Anchor words are drawn from this many top-ranked entries.
    pub ranking: usize,
}

impl Default for PopularConfig {
    fn default() -> Self {
        Self {
            recent: 2000,
            ranking: 10,
        }
    }
}

/// Which generator an autonomous tweet uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TweetMode {
    Random,
    Popular,
    /// Flip a coin per tweet.
    #[default]
    Either,
}

impl TweetMode {
    pub fn pick<R: Rng + ?Sized>(self, rng: &mut R) -> Strategy {
        match self {
            Self::Random => Strategy::Random,
            Self::Popular => Strategy::Popular,
            Self::Either => {
                if rng.gen_bool(0.5) {
                    Strategy::Random
                } else {
                    Strategy::Popular
                }
            }
        }
    }
}

/// Cadence and anti-spam limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweetConfig {
    /// Events one author may send inside the runaway window before the bot
    /// stops answering them.
    pub runaway_count: usize,
    pub runaway_minutes: u32,
    pub min_count: u64,
    pub min_minutes: u32,
    pub max_count: u64,
    pub max_minutes: u32,
    pub mode: TweetMode,
}

impl Default for TweetConfig {
    fn default() -> Self {
        Self {
            runaway_count: 5,
            runaway_minutes: 1,
            min_count: 5,
            min_minutes: 10,
            max_count: 50,
            max_minutes: 60,
            mode: TweetMode::Either,
        }
    }
}

impl TweetConfig {
    pub fn runaway_window(&self) -> Duration {
        Duration::minutes(i64::from(self.runaway_minutes))
    }

    pub fn min_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.min_minutes))
    }

    pub fn max_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.max_minutes))
    }
}

/// Canned replies sent when an incoming text matches `pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub pattern: String,
    pub messages: Vec<String>,
}

impl KeywordRule {
    /// Compile the pattern. A rule without messages is rejected too, since
    /// it could match without ever producing a reply.
    pub fn compile(&self) -> Result<Regex, ConfigError> {
        if self.messages.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "keyword rule '{}' has no messages",
                self.pattern
            )));
        }
        Regex::new(&self.pattern).map_err(|source| ConfigError::Pattern {
            pattern: self.pattern.clone(),
            source,
        })
    }
}

impl BotConfig {
    /// Minimal configuration with every other setting at its default.
    pub fn new(self_id: AuthorId) -> Self {
        Self {
            self_id,
            screen_name: String::new(),
            capacity: DEFAULT_CAPACITY,
            popular: PopularConfig::default(),
            tweet: TweetConfig::default(),
            keywords: Vec::new(),
        }
    }

    /// Load and validate a configuration from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<BotConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse and validate a configuration from a RON string.
    pub fn parse_ron(input: &str) -> Result<BotConfig, ConfigError> {
        let config: BotConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".to_string()));
        }
        if self.popular.ranking == 0 {
            return Err(ConfigError::Invalid(
                "popular.ranking must be at least 1".to_string(),
            ));
        }
        for rule in &self.keywords {
            rule.compile()?;
        }
        Ok(())
    }
}
