/// Corpus seeding — where the initial utterances come from.
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::corpus::CorpusError;

/// A store of past texts, queried once at startup.
pub trait CorpusSource {
    /// Up to `limit` recent texts, newest first. The bot's own posts are
    /// expected to be excluded already.
    fn load_recent(&self, limit: usize) -> Result<Vec<String>, CorpusError>;
}

/// Texts held in memory, newest first.
impl CorpusSource for [String] {
    fn load_recent(&self, limit: usize) -> Result<Vec<String>, CorpusError> {
        Ok(self.iter().take(limit).cloned().collect())
    }
}

/// One utterance per line; the last line is the newest.
///
/// Blank lines are dropped. Lines starting with `#` are comments.
#[derive(Debug, Clone)]
pub struct TextFileSource {
    path: PathBuf,
}

impl TextFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusSource for TextFileSource {
    fn load_recent(&self, limit: usize) -> Result<Vec<String>, CorpusError> {
        let contents = fs::read_to_string(&self.path)?;
        Ok(contents
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
            .rev()
            .take(limit)
            .map(str::to_string)
            .collect())
    }
}
