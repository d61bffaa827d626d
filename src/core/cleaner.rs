/// Text cleaner — strips stream boilerplate before tokenization.
use regex::Regex;
use std::sync::LazyLock;

static RETWEET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:RT|QT):? @[0-9A-Za-z_]+[^\n]*\n?").unwrap());
static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@[0-9A-Za-z_]+").unwrap());
static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[0-9A-Za-z_Ａ-Ｚａ-ｚ０-９ぁ-ヶ亜-黑]+").unwrap());
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9+.\-]*://[^\s]+").unwrap());

/// Applied in order; a quote prefix must go before its mention is stripped.
static PATTERNS: LazyLock<[&'static Regex; 4]> =
    LazyLock::new(|| [&*RETWEET, &*MENTION, &*HASHTAG, &*URL]);

const CHARACTER_REFERENCES: &[(&str, &str)] = &[("&amp;", "&"), ("&lt;", "<"), ("&gt;", ">")];

/// Remove quote/retweet prefixes, mentions, hashtags and URLs, then decode
/// the character references the stream escapes.
pub fn clean(raw: &str) -> String {
    let mut text = raw.to_string();
    for pattern in PATTERNS.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    for (from, to) in CHARACTER_REFERENCES {
        text = text.replace(from, to);
    }
    text
}
