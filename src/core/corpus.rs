/// Bounded trigram corpus — rotating utterances with bigram-indexed adjacency.
///
/// Every stored utterance is cut into overlapping three-token windows. The
/// windows of all utterances form one search space, so a walk can hop from
/// one source text to another wherever they share a bigram.
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::debug;

use crate::core::cleaner;
use crate::core::tokenizer::{TokenizeError, Tokenizer};
use crate::schema::token::{pad_token, Node, BEGIN, END};

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("tokenizer error: {0}")]
    Tokenize(#[from] TokenizeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Number of utterances kept when the host does not say otherwise.
pub const DEFAULT_CAPACITY: usize = 3200;

/// Input to [`normalize`]: raw text, or a sequence that is already tokenized.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Text(&'a str),
    Tokens(&'a [String]),
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(text: &'a str) -> Self {
        Source::Text(text)
    }
}

impl<'a> From<&'a [String]> for Source<'a> {
    fn from(tokens: &'a [String]) -> Self {
        Source::Tokens(tokens)
    }
}

/// Turn text (or tokens) into the node list of one utterance.
///
/// Raw text is cleaned and tokenized first. Alphanumeric tokens are padded,
/// BEGIN/END are added unless already present, and the sequence is cut into
/// windows of three. Always yields at least one node.
pub fn normalize<'a>(
    source: impl Into<Source<'a>>,
    tokenizer: &dyn Tokenizer,
) -> Result<Vec<Node>, CorpusError> {
    match source.into() {
        Source::Text(text) => {
            let tokens = tokenizer.tokenize(&cleaner::clean(text))?;
            Ok(normalize_tokens(&tokens))
        }
        Source::Tokens(tokens) => Ok(normalize_tokens(tokens)),
    }
}

fn normalize_tokens(tokens: &[String]) -> Vec<Node> {
    let mut padded: Vec<String> = tokens
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| pad_token(t))
        .collect();

    if padded.first().map(String::as_str) != Some(BEGIN) {
        padded.insert(0, BEGIN.to_string());
    }
    if padded.last().map(String::as_str) != Some(END) {
        padded.push(END.to_string());
    }
    // (BEGIN, END, END) for input that cleaned away to nothing
    while padded.len() < 3 {
        padded.push(END.to_string());
    }

    padded
        .windows(3)
        .map(|w| Node::new(w[0].clone(), w[1].clone(), w[2].clone()))
        .collect()
}

/// One cleaned, tokenized source text. Owns its nodes.
#[derive(Debug, Clone)]
pub struct Utterance {
    id: u64,
    nodes: Vec<Node>,
}

impl Utterance {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The token sequence the nodes were cut from, sentinels included.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        let lead = self.nodes.first().into_iter().flat_map(|n| n.0.iter());
        let rest = self.nodes.iter().skip(1).map(|n| &n.0[2]);
        lead.chain(rest).map(String::as_str)
    }
}

/// Position of a node: utterance serial plus offset within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeRef {
    utterance: u64,
    index: usize,
}

type Bigram = (String, String);

fn bigram(pair: (&str, &str)) -> Bigram {
    (pair.0.to_string(), pair.1.to_string())
}

/// Candidate lists for each kind of lookup. Sampling uniformly from a list
/// is the same as sampling uniformly from a linear scan over all nodes.
#[derive(Debug, Clone, Default)]
struct NodeIndex {
    starts: Vec<NodeRef>,
    by_head: FxHashMap<Bigram, Vec<NodeRef>>,
    by_tail: FxHashMap<Bigram, Vec<NodeRef>>,
    by_token: FxHashMap<String, Vec<NodeRef>>,
}

impl NodeIndex {
    fn insert(&mut self, utterance: &Utterance) {
        for (index, node) in utterance.nodes.iter().enumerate() {
            let at = NodeRef {
                utterance: utterance.id,
                index,
            };
            if node.first() == BEGIN {
                self.starts.push(at);
            }
            self.by_head.entry(bigram(node.head())).or_default().push(at);
            self.by_tail.entry(bigram(node.tail())).or_default().push(at);
            for (i, token) in node.0.iter().enumerate() {
                // a node is one candidate even if the token repeats inside it
                if !node.0[..i].contains(token) {
                    self.by_token.entry(token.clone()).or_default().push(at);
                }
            }
        }
    }

    fn remove(&mut self, utterance: &Utterance) {
        let id = utterance.id;
        self.starts.retain(|r| r.utterance != id);
        for node in &utterance.nodes {
            prune(&mut self.by_head, &bigram(node.head()), id);
            prune(&mut self.by_tail, &bigram(node.tail()), id);
            for token in &node.0 {
                prune(&mut self.by_token, token, id);
            }
        }
    }
}

fn prune<K>(map: &mut FxHashMap<K, Vec<NodeRef>>, key: &K, utterance: u64)
where
    K: std::hash::Hash + Eq,
{
    if let Some(refs) = map.get_mut(key) {
        refs.retain(|r| r.utterance != utterance);
        if refs.is_empty() {
            map.remove(key);
        }
    }
}

/// Ring buffer of utterances, newest first.
///
/// Holds at most `capacity` utterances; inserting past that evicts the
/// oldest. After the initial load this is only changed through [`Corpus::rotate`].
#[derive(Debug, Clone)]
pub struct Corpus {
    utterances: VecDeque<Utterance>,
    capacity: usize,
    next_id: u64,
    index: NodeIndex,
}

impl Default for Corpus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Corpus {
    pub fn new(capacity: usize) -> Self {
        Self {
            utterances: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 0,
            index: NodeIndex::default(),
        }
    }

    /// Build a corpus from texts ordered newest first, as a store returns
    /// them. Blank texts are skipped; at most `capacity` are kept.
    pub fn load<I, S>(texts: I, capacity: usize, tokenizer: &dyn Tokenizer) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut corpus = Self::new(capacity);
        let mut normalized = Vec::new();
        for text in texts {
            if normalized.len() == capacity {
                break;
            }
            let text = text.as_ref();
            if text.trim().is_empty() {
                continue;
            }
            normalized.push(normalize(text, tokenizer)?);
        }
        // oldest first so the newest ends up at the front
        for nodes in normalized.into_iter().rev() {
            corpus.push_front(nodes);
        }
        debug!(
            utterances = corpus.len(),
            nodes = corpus.node_count(),
            "corpus loaded"
        );
        Ok(corpus)
    }

    /// Ingest a new utterance at the front, evicting the oldest once full.
    /// Absent or empty text is a no-op.
    pub fn rotate(
        &mut self,
        text: Option<&str>,
        tokenizer: &dyn Tokenizer,
    ) -> Result<&mut Self, CorpusError> {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return Ok(self);
        };
        let nodes = normalize(text, tokenizer)?;
        self.push_front(nodes);
        Ok(self)
    }

    /// Like [`Corpus::rotate`] for input that is already tokenized.
    pub fn rotate_tokens(&mut self, tokens: &[String]) -> &mut Self {
        if !tokens.is_empty() {
            self.push_front(normalize_tokens(tokens));
        }
        self
    }

    fn push_front(&mut self, nodes: Vec<Node>) {
        let utterance = Utterance {
            id: self.next_id,
            nodes,
        };
        self.next_id += 1;
        self.index.insert(&utterance);
        self.utterances.push_front(utterance);

        while self.utterances.len() > self.capacity {
            if let Some(evicted) = self.utterances.pop_back() {
                self.index.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Utterances, newest first.
    pub fn utterances(&self) -> impl Iterator<Item = &Utterance> {
        self.utterances.iter()
    }

    /// Size of the flattened node space.
    pub fn node_count(&self) -> usize {
        self.utterances.iter().map(|u| u.nodes.len()).sum()
    }

    /// Tokens of all utterances in corpus order (newest utterance first).
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.utterances.iter().flat_map(Utterance::tokens)
    }

    fn resolve(&self, at: NodeRef) -> Option<&Node> {
        // ids are contiguous: the front holds next_id - 1
        let newest = self.next_id.checked_sub(1)?;
        let position = usize::try_from(newest.checked_sub(at.utterance)?).ok()?;
        self.utterances.get(position)?.nodes.get(at.index)
    }

    fn resolve_all<'a>(&'a self, refs: Option<&'a Vec<NodeRef>>) -> Vec<&'a Node> {
        refs.map(|refs| refs.iter().filter_map(|r| self.resolve(*r)).collect())
            .unwrap_or_default()
    }

    fn sample<R: Rng + ?Sized>(&self, refs: Option<&Vec<NodeRef>>, rng: &mut R) -> Option<&Node> {
        let at = refs?.choose(rng)?;
        self.resolve(*at)
    }

    /// Nodes that open an utterance.
    pub fn first_nodes(&self) -> Vec<&Node> {
        self.resolve_all(Some(&self.index.starts))
    }

    /// Nodes `n` with `n[0] == node[1]` and `n[1] == node[2]`.
    pub fn next_nodes(&self, node: &Node) -> Vec<&Node> {
        self.resolve_all(self.index.by_head.get(&bigram(node.tail())))
    }

    /// Nodes `n` with `n[1] == node[0]` and `n[2] == node[1]`.
    pub fn prev_nodes(&self, node: &Node) -> Vec<&Node> {
        self.resolve_all(self.index.by_tail.get(&bigram(node.head())))
    }

    /// Nodes containing `word` (padded the same way stored tokens are).
    pub fn find_nodes(&self, word: &str) -> Vec<&Node> {
        self.resolve_all(self.index.by_token.get(&pad_token(word)))
    }

    pub fn first_node<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Node> {
        self.sample(Some(&self.index.starts), rng)
    }

    pub fn next_node<R: Rng + ?Sized>(&self, node: &Node, rng: &mut R) -> Option<&Node> {
        self.sample(self.index.by_head.get(&bigram(node.tail())), rng)
    }

    pub fn prev_node<R: Rng + ?Sized>(&self, node: &Node, rng: &mut R) -> Option<&Node> {
        self.sample(self.index.by_tail.get(&bigram(node.head())), rng)
    }

    pub fn find_node<R: Rng + ?Sized>(&self, word: &str, rng: &mut R) -> Option<&Node> {
        self.sample(self.index.by_token.get(&pad_token(word)), rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tokenizer::WhitespaceTokenizer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn corpus_of(texts: &[&str], capacity: usize) -> Corpus {
        Corpus::load(texts.iter().copied(), capacity, &WhitespaceTokenizer).unwrap()
    }

    fn flat(corpus: &Corpus) -> Vec<&Node> {
        corpus.utterances().flat_map(|u| u.nodes().iter()).collect()
    }

    #[test]
    fn normalize_adds_sentinels_and_windows() {
        let nodes = normalize("ねこ が 好き", &WhitespaceTokenizer).unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::new(BEGIN, "ねこ", "が"),
                Node::new("ねこ", "が", "好き"),
                Node::new("が", "好き", END),
            ]
        );
    }

    #[test]
    fn normalize_pads_alphanumeric_runs() {
        let nodes = normalize("rust は 2015 から", &WhitespaceTokenizer).unwrap();
        assert_eq!(nodes[0], Node::new(BEGIN, " rust ", "は"));
        assert_eq!(nodes[1].third(), " 2015 ");
    }

    #[test]
    fn normalize_cleans_before_tokenizing() {
        let nodes = normalize("@bob hi #tag", &WhitespaceTokenizer).unwrap();
        assert_eq!(nodes, vec![Node::new(BEGIN, " hi ", END)]);
    }

    #[test]
    fn normalize_short_input_yields_one_node() {
        assert_eq!(
            normalize("", &WhitespaceTokenizer).unwrap(),
            vec![Node::new(BEGIN, END, END)]
        );
        assert_eq!(
            normalize("x", &WhitespaceTokenizer).unwrap(),
            vec![Node::new(BEGIN, " x ", END)]
        );
    }

    #[test]
    fn normalize_tokens_is_idempotent_on_sentinels() {
        let tokens: Vec<String> = [BEGIN, "a", "b", END].iter().map(|s| s.to_string()).collect();
        let nodes = normalize(tokens.as_slice(), &WhitespaceTokenizer).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0], Node::new(BEGIN, " a ", " b "));
        assert_eq!(nodes[1], Node::new(" a ", " b ", END));
    }

    #[test]
    fn normalize_is_deterministic() {
        let a = normalize("RT @x: y\n今日 は 晴れ", &WhitespaceTokenizer).unwrap();
        let b = normalize("RT @x: y\n今日 は 晴れ", &WhitespaceTokenizer).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tokenizer_failure_propagates() {
        struct Broken;
        impl Tokenizer for Broken {
            fn tokenize(&self, _: &str) -> Result<Vec<String>, TokenizeError> {
                Err(TokenizeError::Unavailable("mecab gone".to_string()))
            }
        }
        let mut corpus = Corpus::new(4);
        assert!(matches!(
            corpus.rotate(Some("hi"), &Broken),
            Err(CorpusError::Tokenize(_))
        ));
        assert!(corpus.is_empty());
    }

    #[test]
    fn load_keeps_newest_first_and_caps() {
        let corpus = corpus_of(&["c b", "b a", "", "a z", "z y"], 3);
        assert_eq!(corpus.len(), 3);
        let firsts: Vec<&str> = corpus.utterances().map(|u| u.nodes()[0].second()).collect();
        assert_eq!(firsts, vec![" c ", " b ", " a "]);
    }

    #[test]
    fn rotate_evicts_oldest_and_preserves_size() {
        let mut corpus = corpus_of(&["one two", "three four", "five six"], 3);
        corpus.rotate(Some("seven eight"), &WhitespaceTokenizer).unwrap();
        assert_eq!(corpus.len(), 3);
        assert!(corpus.find_nodes("five").is_empty());
        assert_eq!(corpus.find_nodes("seven").len(), 2);
        assert_eq!(corpus.utterances().next().unwrap().nodes()[0].second(), " seven ");

        for i in 0..20 {
            corpus.rotate(Some(format!("w{} x", i).as_str()), &WhitespaceTokenizer).unwrap();
            assert_eq!(corpus.len(), 3);
        }
    }

    #[test]
    fn rotate_ignores_empty_and_absent() {
        let mut corpus = corpus_of(&["one two"], 2);
        corpus.rotate(None, &WhitespaceTokenizer).unwrap();
        corpus.rotate(Some(""), &WhitespaceTokenizer).unwrap();
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn rotate_grows_until_capacity() {
        let mut corpus = Corpus::new(2);
        corpus.rotate(Some("a"), &WhitespaceTokenizer).unwrap();
        assert_eq!(corpus.len(), 1);
        corpus.rotate(Some("b"), &WhitespaceTokenizer).unwrap();
        corpus.rotate(Some("c"), &WhitespaceTokenizer).unwrap();
        assert_eq!(corpus.len(), 2);
    }

    #[test]
    fn index_matches_linear_scan() {
        let mut corpus = corpus_of(&["a b c d", "x b c y", "b c", "a b"], 3);
        corpus.rotate_tokens(&["q".to_string(), "b".to_string(), "c".to_string()]);
        let all = flat(&corpus);

        for node in &all {
            let mut expected_next: Vec<&Node> = all
                .iter()
                .copied()
                .filter(|n| n.first() == node.second() && n.second() == node.third())
                .collect();
            let mut next = corpus.next_nodes(node);
            expected_next.sort_by_key(|n| n.joined());
            next.sort_by_key(|n| n.joined());
            assert_eq!(next, expected_next);

            let mut expected_prev: Vec<&Node> = all
                .iter()
                .copied()
                .filter(|n| n.second() == node.first() && n.third() == node.second())
                .collect();
            let mut prev = corpus.prev_nodes(node);
            expected_prev.sort_by_key(|n| n.joined());
            prev.sort_by_key(|n| n.joined());
            assert_eq!(prev, expected_prev);
        }

        let starts = all.iter().filter(|n| n.first() == BEGIN).count();
        assert_eq!(corpus.first_nodes().len(), starts);
    }

    #[test]
    fn next_node_branches_across_utterances() {
        let corpus = corpus_of(&["a b c", "x a b d"], 10);
        let start = Node::new(BEGIN, " a ", " b ");
        let thirds: Vec<&str> = corpus.next_nodes(&start).iter().map(|n| n.third()).collect();
        assert_eq!(thirds.len(), 2);
        assert!(thirds.contains(&" c "));
        assert!(thirds.contains(&" d "));

        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            seen.insert(corpus.next_node(&start, &mut rng).unwrap().third().to_string());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn find_node_pads_query() {
        let corpus = corpus_of(&["hello ねこ"], 10);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(corpus.find_node("hello", &mut rng).is_some());
        assert!(corpus.find_node(" hello ", &mut rng).is_some());
        assert!(corpus.find_node("ねこ", &mut rng).is_some());
        assert!(corpus.find_node("いぬ", &mut rng).is_none());
    }

    #[test]
    fn find_nodes_counts_a_node_once() {
        let corpus = corpus_of(&["a a a"], 10);
        // (BEGIN a a), (a a a), (a a END)
        assert_eq!(corpus.find_nodes("a").len(), 3);
    }

    #[test]
    fn empty_corpus_has_no_candidates() {
        let corpus = Corpus::new(10);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(corpus.first_node(&mut rng).is_none());
        assert!(corpus.find_node("a", &mut rng).is_none());
        assert!(corpus
            .next_node(&Node::new(BEGIN, "a", "b"), &mut rng)
            .is_none());
    }

    #[test]
    fn utterance_tokens_round_trip() {
        let corpus = corpus_of(&["a b c"], 10);
        let tokens: Vec<&str> = corpus.tokens().collect();
        assert_eq!(tokens, vec![BEGIN, " a ", " b ", " c ", END]);
    }
}
