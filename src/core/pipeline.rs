/// The bot pipeline: Event → Action orchestration.
///
/// Wires together corpus rotation, keyword extraction, the cadence policy
/// and text generation. Each inbound event is processed to completion
/// before the next one.
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::cadence::CadencePolicy;
use crate::core::cleaner;
use crate::core::config::{BotConfig, ConfigError};
use crate::core::corpus::{Corpus, CorpusError};
use crate::core::markov::Generator;
use crate::core::source::CorpusSource;
use crate::core::tokenizer::{Tokenizer, WhitespaceTokenizer};
use crate::schema::event::{Action, Event};
use crate::schema::token::pad_token;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
    #[error("no configuration given")]
    MissingConfig,
}

/// The top-level bot engine. Built via `BotEngine::builder()`.
pub struct BotEngine {
    config: BotConfig,
    corpus: Corpus,
    policy: CadencePolicy,
    tokenizer: Box<dyn Tokenizer>,
    rng: StdRng,
}

/// Builder for constructing a `BotEngine`.
pub struct BotEngineBuilder {
    config: Option<BotConfig>,
    config_path: Option<String>,
    tokenizer: Option<Box<dyn Tokenizer>>,
    seed: Option<u64>,
    seed_texts: Vec<String>,
    started_at: Option<DateTime<Utc>>,
}

impl BotEngine {
    pub fn builder() -> BotEngineBuilder {
        BotEngineBuilder {
            config: None,
            config_path: None,
            tokenizer: None,
            seed: None,
            seed_texts: Vec::new(),
            started_at: None,
        }
    }

    /// Process one event at the current wall-clock time.
    pub fn handle(&mut self, event: Event) -> Result<Action, PipelineError> {
        self.handle_at(event, Utc::now())
    }

    /// Process one event as if it arrived at `now`.
    pub fn handle_at(&mut self, mut event: Event, now: DateTime<Utc>) -> Result<Action, PipelineError> {
        let from_self = event.is_authored_by(self.config.self_id);

        // 1. Learn from everyone but ourselves
        if !from_self {
            self.corpus.rotate(event.text.as_deref(), self.tokenizer.as_ref())?;
        }

        // 2. Keywords for reply anchoring
        if event.keywords.is_empty() && event.has_text() && !from_self {
            event.keywords = self.extract_keywords(event.text.as_deref().unwrap_or_default())?;
        }

        // 3. Decide and generate
        let generator = Generator::new(&self.corpus).with_popularity(self.config.popular);
        let action = self.policy.handle(&event, now, &generator, &mut self.rng);
        if !action.is_none() {
            debug!(?action, "action produced");
        }
        Ok(action)
    }

    fn extract_keywords(&self, text: &str) -> Result<Vec<String>, PipelineError> {
        let tokens = self
            .tokenizer
            .tokenize(&cleaner::clean(text))
            .map_err(CorpusError::from)?;
        Ok(tokens
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| pad_token(t))
            .collect())
    }

    /// A generator over the current corpus.
    pub fn generator(&self) -> Generator<'_> {
        Generator::new(&self.corpus).with_popularity(self.config.popular)
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn policy(&self) -> &CadencePolicy {
        &self.policy
    }
}

impl BotEngineBuilder {
    pub fn with_config(mut self, config: BotConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load the configuration from a RON file at build time.
    pub fn config_file(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seed texts, newest first. Appends to any texts given before.
    pub fn with_seed_texts<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed_texts.extend(texts.into_iter().map(Into::into));
        self
    }

    /// Pull seed texts from `source` right away, bounded by `limit`.
    pub fn seed_from(
        mut self,
        source: &dyn CorpusSource,
        limit: usize,
    ) -> Result<Self, PipelineError> {
        self.seed_texts.extend(source.load_recent(limit)?);
        Ok(self)
    }

    /// Time the cadence clock starts from; defaults to now.
    pub fn started_at(mut self, now: DateTime<Utc>) -> Self {
        self.started_at = Some(now);
        self
    }

    pub fn build(self) -> Result<BotEngine, PipelineError> {
        let config = match (self.config, self.config_path) {
            (Some(config), _) => {
                config.validate()?;
                config
            }
            (None, Some(path)) => BotConfig::load_from_ron(std::path::Path::new(&path))?,
            (None, None) => return Err(PipelineError::MissingConfig),
        };

        let tokenizer = self
            .tokenizer
            .unwrap_or_else(|| Box::new(WhitespaceTokenizer));
        let corpus = Corpus::load(&self.seed_texts, config.capacity, tokenizer.as_ref())?;
        if corpus.is_empty() {
            warn!("corpus is empty; generation will produce nothing until events arrive");
        }

        let policy = CadencePolicy::from_config(&config, self.started_at.unwrap_or_else(Utc::now))?;
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(BotEngine {
            config,
            corpus,
            policy,
            tokenizer,
            rng,
        })
    }
}
