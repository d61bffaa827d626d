/// Babble — prints generations from a corpus file.
///
/// Usage: babble --input <timeline.txt> [--count <n>] [--seed <n>] [--word <w>] [--popular] [--verbose]
use chatter_engine::core::corpus::{Corpus, DEFAULT_CAPACITY};
use chatter_engine::core::markov::{Generator, Strategy};
use chatter_engine::core::source::{CorpusSource, TextFileSource};
use chatter_engine::core::tokenizer::WhitespaceTokenizer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::process;

const USAGE: &str =
    "Usage: babble --input <timeline.txt> [--count <n>] [--seed <n>] [--word <w>] [--popular] [--verbose]";

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut input = None;
    let mut count = 5usize;
    let mut seed = None;
    let mut word = None;
    let mut strategy = Strategy::Random;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" if i + 1 < args.len() => {
                i += 1;
                input = Some(args[i].clone());
            }
            "--count" if i + 1 < args.len() => {
                i += 1;
                count = args[i].parse().unwrap_or_else(|_| {
                    eprintln!("Error: --count must be a number");
                    process::exit(1);
                });
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = Some(args[i].parse().unwrap_or_else(|_| {
                    eprintln!("Error: --seed must be a number");
                    process::exit(1);
                }));
            }
            "--word" if i + 1 < args.len() => {
                i += 1;
                word = Some(args[i].clone());
            }
            "--popular" => strategy = Strategy::Popular,
            "--verbose" | "-v" => verbose = true,
            "--help" | "-h" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("{}", USAGE);
                process::exit(1);
            }
        }
        i += 1;
    }

    init_tracing(verbose);

    let input_path = input.unwrap_or_else(|| {
        eprintln!("Error: --input is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let texts = TextFileSource::new(&input_path)
        .load_recent(DEFAULT_CAPACITY)
        .unwrap_or_else(|e| {
            eprintln!("Error reading corpus '{}': {}", input_path, e);
            process::exit(1);
        });
    let corpus = Corpus::load(&texts, DEFAULT_CAPACITY, &WhitespaceTokenizer).unwrap_or_else(|e| {
        eprintln!("Error building corpus: {}", e);
        process::exit(1);
    });
    println!(
        "Loaded {} utterances ({} nodes) from '{}'",
        corpus.len(),
        corpus.node_count(),
        input_path
    );

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let generator = Generator::new(&corpus);

    if strategy == Strategy::Popular && word.is_none() {
        let ranking = generator.popular_words(None);
        let top: Vec<String> = ranking
            .iter()
            .take(10)
            .map(|(token, n)| format!("{}({})", token.trim(), n))
            .collect();
        println!("Popular: {}", top.join(" "));
    }
    println!();

    for n in 1..=count {
        let text = match word.as_deref() {
            Some(word) => generator.generate_from_word(word, &mut rng),
            None => generator.generate(strategy, &mut rng),
        };
        match text {
            Some(text) => println!("{:>3}. {}", n, text),
            None => println!("{:>3}. (nothing)", n),
        }
    }
}
