/// Tokenizer capability — the morphological analyser is an external collaborator.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenizeError {
    #[error("tokenizer unavailable: {0}")]
    Unavailable(String),
}

/// Splits cleaned text into an ordered sequence of tokens.
///
/// Implementations wrap whatever analyser the host has at hand; the corpus
/// only relies on the output order being stable for a given input.
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError>;
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError> {
        Ok(self(text))
    }
}

/// Punctuation characters that are tokenized as separate tokens.
const PUNCTUATION: &[char] = &[
    '.', '!', '?', ',', ';', ':', '"', '(', ')', '。', '、', '！', '？', '「', '」', '（', '）',
];

/// Splits on whitespace and peels punctuation off into its own tokens.
///
/// Good enough for space-delimited languages and for text that has already
/// been run through a segmenter in "wakati" (space separated) mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError> {
        let mut tokens = Vec::new();
        for word in text.split_whitespace() {
            let mut remaining = word;
            while let Some(first) = remaining.chars().next() {
                if PUNCTUATION.contains(&first) {
                    tokens.push(first.to_string());
                    remaining = &remaining[first.len_utf8()..];
                    continue;
                }

                // Find end of word (before punctuation)
                if let Some(pos) = remaining.find(|c: char| PUNCTUATION.contains(&c)) {
                    tokens.push(remaining[..pos].to_string());
                    remaining = &remaining[pos..];
                } else {
                    tokens.push(remaining.to_string());
                    break;
                }
            }
        }
        Ok(tokens)
    }
}
