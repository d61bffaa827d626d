/// Trigram walker — synthesizes text by chaining corpus nodes.
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::core::config::PopularConfig;
use crate::core::corpus::Corpus;
use crate::core::popularity;
use crate::schema::token::{pad_token, Node, BEGIN, END};

/// Longest output a walk may produce, measured after cleaning.
pub const MAX_LENGTH: usize = 140;
/// Safety limit on walk steps; tokens that clean away to nothing never
/// advance the length bound.
const MAX_STEPS: usize = MAX_LENGTH * 3;

static IGNORE_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[\]{}‘’“”〈〉《》「」『』【】〔〕〘〙〚〛［］｛｝]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Strip sentinels and bracket punctuation, collapse whitespace, trim.
pub fn clean(text: &str) -> String {
    let text = text.replace(BEGIN, "").replace(END, "");
    let text = IGNORE_BRACKETS.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn cleaned_len(text: &str) -> usize {
    clean(text).chars().count()
}

/// Clean and cut to [`MAX_LENGTH`] characters. Only a start node made of
/// oversized tokens ever needs the cut.
fn bounded(text: &str) -> String {
    let cleaned = clean(text);
    if cleaned.chars().count() <= MAX_LENGTH {
        return cleaned;
    }
    let cut: String = cleaned.chars().take(MAX_LENGTH).collect();
    cut.trim_end().to_string()
}

/// How an autonomous tweet is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Walk forward from a random utterance opening.
    Random,
    /// Walk both ways from a popular anchor word.
    Popular,
}

/// Generates text from a corpus snapshot.
///
/// Borrowing the corpus keeps generation read-only; randomness is passed
/// into every call so seeded runs are reproducible.
#[derive(Debug, Clone, Copy)]
pub struct Generator<'a> {
    corpus: &'a Corpus,
    popular: PopularConfig,
}

impl<'a> Generator<'a> {
    pub fn new(corpus: &'a Corpus) -> Self {
        Self {
            corpus,
            popular: PopularConfig::default(),
        }
    }

    pub fn with_popularity(mut self, popular: PopularConfig) -> Self {
        self.popular = popular;
        self
    }

    pub fn corpus(&self) -> &'a Corpus {
        self.corpus
    }

    fn walk_forward<R: Rng + ?Sized>(&self, start: &Node, rng: &mut R) -> String {
        let mut text = start.joined();
        let mut node = start;
        for _ in 0..MAX_STEPS {
            let Some(next) = self.corpus.next_node(node, rng) else {
                break;
            };
            let candidate = format!("{}{}", text, next.third());
            if cleaned_len(&candidate) > MAX_LENGTH {
                break;
            }
            text = candidate;
            if next.third() == END {
                break;
            }
            node = next;
        }
        text
    }

    fn walk_backward<R: Rng + ?Sized>(&self, start: &Node, rng: &mut R) -> String {
        let mut text = String::new();
        let mut node = start;
        for _ in 0..MAX_STEPS {
            let Some(prev) = self.corpus.prev_node(node, rng) else {
                break;
            };
            if prev.first() == BEGIN {
                break;
            }
            let candidate = format!("{}{}", prev.first(), text);
            if cleaned_len(&candidate) > MAX_LENGTH {
                break;
            }
            text = candidate;
            node = prev;
        }
        text
    }

    /// Walk forward from `start` (its own three tokens included) until END,
    /// a dead end, or the length bound.
    pub fn generate_forward<R: Rng + ?Sized>(&self, start: &Node, rng: &mut R) -> String {
        bounded(&self.walk_forward(start, rng))
    }

    /// Walk backward from `start`, prepending the tokens that lead up to it.
    /// Stops before an utterance opening; `start` itself is not included.
    pub fn generate_backward<R: Rng + ?Sized>(&self, start: &Node, rng: &mut R) -> String {
        clean(&self.walk_backward(start, rng))
    }

    /// Bidirectional walk anchored on a node containing `word`.
    ///
    /// [`MAX_LENGTH`] bounds each half separately, so the joined text may
    /// run up to twice that. Returns `None` only when no stored node
    /// contains the word.
    pub fn generate_from_word<R: Rng + ?Sized>(&self, word: &str, rng: &mut R) -> Option<String> {
        let node = self.corpus.find_node(word, rng)?;
        let backward = self.walk_backward(node, rng);
        let forward = self.walk_forward(node, rng);
        Some(clean(&format!("{}{}", backward, forward)))
    }

    pub fn generate_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        let start = self.corpus.first_node(rng)?;
        Some(self.generate_forward(start, rng))
    }

    pub fn generate_popular<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        let word = self.popular_word(rng)?;
        debug!(anchor = %word.trim(), "popular anchor");
        self.generate_from_word(&word, rng)
    }

    pub fn generate<R: Rng + ?Sized>(&self, strategy: Strategy, rng: &mut R) -> Option<String> {
        match strategy {
            Strategy::Random => self.generate_random(rng),
            Strategy::Popular => self.generate_popular(rng),
        }
    }

    /// Anchored reply: prefer the best-ranked popular word that also appears
    /// in `keywords`, otherwise the single most popular word.
    pub fn generate_reply<R: Rng + ?Sized>(&self, keywords: &[String], rng: &mut R) -> Option<String> {
        let ranking = self.popular_words(None);
        let padded: Vec<String> = keywords.iter().map(|k| pad_token(k)).collect();
        let (anchor, _) = ranking
            .iter()
            .find(|(word, _)| padded.contains(word))
            .or_else(|| ranking.first())?;
        debug!(anchor = %anchor.trim(), "reply anchor");
        self.generate_from_word(anchor, rng)
    }

    /// Ranked `(token, count)` pairs over the configured recent window, or
    /// over `recent_tokens` when given.
    pub fn popular_words(&self, recent_tokens: Option<&[String]>) -> Vec<(String, usize)> {
        match recent_tokens {
            Some(tokens) => popularity::rank(tokens.iter().map(String::as_str)),
            None => popularity::popular_words(self.corpus, self.popular.recent),
        }
    }

    pub fn popular_word<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        let ranking = self.popular_words(None);
        popularity::popular_word(&ranking, self.popular.ranking, rng).map(str::to_string)
    }
}
