/// Replay — feeds recorded events through the bot and prints its actions.
///
/// Usage: replay --config <bot.ron> --corpus <timeline.txt> [--events <events.ron>] [--seed <n>] [--verbose]
///
/// Events are read one RON `Event` per line, from `--events` or stdin.
/// Blank lines and lines starting with `//` are skipped. Each event is
/// stamped one minute after the previous, so cadence limits come into play.
use chatter_engine::core::pipeline::BotEngine;
use chatter_engine::core::source::TextFileSource;
use chatter_engine::schema::event::{Action, Event};
use chrono::{Duration, Utc};
use std::io::{self, BufRead, BufReader};
use std::process;

fn print_usage() {
    println!(
        "Usage: replay --config <bot.ron> --corpus <timeline.txt> [--events <events.ron>] [--seed <n>] [--verbose]"
    );
}

fn parse_seed(value: &str) -> Result<u64, String> {
    value
        .parse()
        .map_err(|_| format!("--seed must be a number, got '{}'", value))
}

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
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut config_path = None;
    let mut corpus_path = None;
    let mut events_path = None;
    let mut seed: u64 = 42;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--corpus" if i + 1 < args.len() => {
                i += 1;
                corpus_path = Some(args[i].clone());
            }
            "--events" if i + 1 < args.len() => {
                i += 1;
                events_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = parse_seed(&args[i]).unwrap_or_else(|e| {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                });
            }
            "--verbose" | "-v" => verbose = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    init_tracing(verbose);

    let (Some(config_path), Some(corpus_path)) = (config_path, corpus_path) else {
        eprintln!("Error: --config and --corpus are required");
        print_usage();
        process::exit(1);
    };

    let mut builder = BotEngine::builder().config_file(&config_path).seed(seed);
    builder = builder
        .seed_from(&TextFileSource::new(&corpus_path), usize::MAX)
        .unwrap_or_else(|e| {
            eprintln!("Error reading corpus '{}': {}", corpus_path, e);
            process::exit(1);
        });
    let start = Utc::now();
    let mut bot = builder.started_at(start).build().unwrap_or_else(|e| {
        eprintln!("Error building bot: {}", e);
        process::exit(1);
    });
    eprintln!(
        "Loaded {} utterances; acting as {}",
        bot.corpus().len(),
        bot.config().self_id
    );

    let reader: Box<dyn BufRead> = match events_path {
        Some(path) => match std::fs::File::open(&path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                eprintln!("Error opening events '{}': {}", path, e);
                process::exit(1);
            }
        },
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut minute = 0i64;
    for (line_no, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Error reading events: {}", e);
                process::exit(1);
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let event: Event = match ron::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                eprintln!("line {}: {}", line_no + 1, e);
                continue;
            }
        };

        minute += 1;
        let now = start + Duration::minutes(minute);
        match bot.handle_at(event, now) {
            Ok(Action::None) => println!("[{:>4}m] -", minute),
            Ok(Action::Reply {
                text,
                in_reply_to_id,
            }) => match in_reply_to_id {
                Some(id) => println!("[{:>4}m] reply to {}: {}", minute, id, text),
                None => println!("[{:>4}m] reply: {}", minute, text),
            },
            Ok(Action::Tweet { text }) => println!("[{:>4}m] tweet: {}", minute, text),
            Ok(Action::FollowAndGreet { user, text }) => match text {
                Some(text) => println!("[{:>4}m] follow {} and greet: {}", minute, user, text),
                None => println!("[{:>4}m] follow {}", minute, user),
            },
            Err(e) => eprintln!("line {}: {}", line_no + 1, e),
        }
    }
}
