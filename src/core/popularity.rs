/// Popularity ranker — frequent content tokens over the recent corpus.
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

use crate::core::corpus::Corpus;
use crate::schema::token::is_sentinel;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9 ]+$").unwrap());
// hiragana-only tokens are particles and inflections, not topics
static KANA_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{Hiragana}ー〜 ]+$").unwrap());
static SIGN_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{P}\p{S}\s　ー﹏]+$").unwrap());

/// Returns true for tokens worth anchoring a generation on.
pub fn is_content_token(token: &str) -> bool {
    !token.trim().is_empty()
        && !is_sentinel(token)
        && !NUMBER.is_match(token)
        && !KANA_ONLY.is_match(token)
        && !SIGN_ONLY.is_match(token)
}

/// Count content tokens and rank those seen more than once, most frequent
/// first. Ties keep the order in which tokens were first encountered.
pub fn rank<'t, I>(tokens: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'t str>,
{
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for token in tokens.into_iter().filter(|t| is_content_token(t)) {
        *counts.entry(token).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(token, count)| (token.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Rank the `window` most recent tokens of the corpus.
pub fn popular_words(corpus: &Corpus, window: usize) -> Vec<(String, usize)> {
    rank(corpus.tokens().take(window))
}

/// Uniformly pick one of the top `cutoff` ranked tokens.
pub fn popular_word<'r, R: Rng + ?Sized>(
    ranking: &'r [(String, usize)],
    cutoff: usize,
    rng: &mut R,
) -> Option<&'r str> {
    let top = &ranking[..cutoff.min(ranking.len())];
    top.choose(rng).map(|(token, _)| token.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tokenizer::WhitespaceTokenizer;
    use crate::schema::token::{BEGIN, END};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn filters_noise_tokens() {
        assert!(!is_content_token(BEGIN));
        assert!(!is_content_token(END));
        assert!(!is_content_token(" 2024 "));
        assert!(!is_content_token("から"));
        assert!(!is_content_token("。"));
        assert!(!is_content_token("!!"));
        assert!(!is_content_token("ーー"));
        assert!(!is_content_token(" "));
        assert!(is_content_token("ラーメン"));
        assert!(is_content_token("猫"));
        assert!(is_content_token(" rust "));
    }

    #[test]
    fn rank_drops_singletons_and_sorts() {
        let tokens = ["a", "b", "b", "c", "c", "c", "d", "a"];
        let ranked = rank(tokens.iter().copied());
        assert_eq!(
            ranked,
            vec![
                ("c".to_string(), 3),
                ("a".to_string(), 2),
                ("b".to_string(), 2),
            ]
        );
    }

    #[test]
    fn rank_ties_keep_encounter_order() {
        let ranked = rank(["y", "x", "x", "y"].iter().copied());
        assert_eq!(ranked[0].0, "y");
        assert_eq!(ranked[1].0, "x");
    }

    #[test]
    fn rank_excludes_filtered_tokens_even_when_frequent() {
        let ranked = rank(["の", "の", "1", "1", "、", "、", "猫", "猫"].iter().copied());
        assert_eq!(ranked, vec![("猫".to_string(), 2)]);
    }

    #[test]
    fn window_uses_most_recent_tokens() {
        let corpus = Corpus::load(
            ["猫 猫", "犬 犬 犬"].iter().copied(),
            10,
            &WhitespaceTokenizer,
        )
        .unwrap();
        // newest utterance is "猫 猫": BEGIN 猫 猫 END
        assert_eq!(popular_words(&corpus, 4), vec![("猫".to_string(), 2)]);
        let all = popular_words(&corpus, 100);
        assert_eq!(all[0], ("犬".to_string(), 3));
        assert_eq!(all[1], ("猫".to_string(), 2));
    }

    #[test]
    fn popular_word_respects_cutoff() {
        let ranking = vec![
            ("a".to_string(), 5),
            ("b".to_string(), 4),
            ("c".to_string(), 3),
        ];
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let word = popular_word(&ranking, 2, &mut rng).unwrap();
            assert!(word == "a" || word == "b");
        }
        assert_eq!(popular_word(&ranking, 1, &mut rng), Some("a"));
        assert_eq!(popular_word(&[], 3, &mut rng), None);
    }
}
