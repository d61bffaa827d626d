/// Property tests — corpus normalisation and generation bounds.
use chatter_engine::core::corpus::{normalize, Corpus};
use chatter_engine::core::markov::{Generator, MAX_LENGTH};
use chatter_engine::core::popularity::{is_content_token, rank};
use chatter_engine::core::tokenizer::WhitespaceTokenizer;
use chatter_engine::schema::token::{pad_token, BEGIN, END};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn arb_word() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}",
        "[ぁ-ん]{1,3}",
        "[ァ-ン]{2,5}",
        Just("猫".to_string()),
        Just("ラーメン".to_string()),
        Just("。".to_string()),
        Just("42".to_string()),
    ]
}

fn arb_utterance() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_word(), 1..40).prop_map(|words| words.join(" "))
}

fn arb_corpus_texts() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_utterance(), 1..30)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn normalize_frames_and_is_deterministic(text in arb_utterance()) {
        let nodes = normalize(text.as_str(), &WhitespaceTokenizer).unwrap();
        prop_assert!(!nodes.is_empty());
        prop_assert_eq!(nodes[0].first(), BEGIN);
        prop_assert!(nodes[nodes.len() - 1].contains(END));
        let again = normalize(text.as_str(), &WhitespaceTokenizer).unwrap();
        prop_assert_eq!(nodes, again);
    }

    #[test]
    fn walks_are_bounded(texts in arb_corpus_texts(), seed in any::<u64>()) {
        let corpus = Corpus::load(&texts, 64, &WhitespaceTokenizer).unwrap();
        let generator = Generator::new(&corpus);
        let mut rng = StdRng::seed_from_u64(seed);
        let starts: Vec<_> = corpus
            .utterances()
            .flat_map(|u| u.nodes().iter())
            .take(50)
            .cloned()
            .collect();
        for node in &starts {
            let text = generator.generate_forward(node, &mut rng);
            prop_assert!(text.chars().count() <= MAX_LENGTH, "{} chars: {}", text.chars().count(), text);
            let text = generator.generate_backward(node, &mut rng);
            prop_assert!(text.chars().count() <= MAX_LENGTH, "{} chars: {}", text.chars().count(), text);
        }
        if let Some(text) = generator.generate_random(&mut rng) {
            prop_assert!(text.chars().count() <= MAX_LENGTH);
        }
    }

    #[test]
    fn from_word_is_none_only_when_absent(
        texts in arb_corpus_texts(),
        extra in prop::collection::vec(arb_utterance(), 0..10),
        word in arb_word(),
        seed in any::<u64>(),
    ) {
        // small capacity so the later rotations evict
        let mut corpus = Corpus::load(&texts, 8, &WhitespaceTokenizer).unwrap();
        for text in &extra {
            corpus.rotate(Some(text.as_str()), &WhitespaceTokenizer).unwrap();
        }
        let generator = Generator::new(&corpus);
        let mut rng = StdRng::seed_from_u64(seed);
        let padded = pad_token(&word);
        let present = corpus
            .utterances()
            .flat_map(|u| u.nodes())
            .any(|n| n.contains(&padded));
        prop_assert_eq!(generator.generate_from_word(&word, &mut rng).is_some(), present);
    }

    #[test]
    fn rotate_keeps_size_at_capacity(texts in arb_corpus_texts(), extra in prop::collection::vec(arb_utterance(), 1..20)) {
        let capacity = texts.len();
        let mut corpus = Corpus::load(&texts, capacity, &WhitespaceTokenizer).unwrap();
        prop_assert_eq!(corpus.len(), capacity);
        for text in &extra {
            corpus.rotate(Some(text.as_str()), &WhitespaceTokenizer).unwrap();
            prop_assert_eq!(corpus.len(), capacity);
        }
    }

    #[test]
    fn ranking_has_no_filtered_or_single_tokens(words in prop::collection::vec(arb_word(), 0..200)) {
        let ranked = rank(words.iter().map(String::as_str));
        for (token, count) in &ranked {
            prop_assert!(*count > 1);
            prop_assert!(is_content_token(token));
        }
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].1 >= pair[1].1);
        }
    }
}
