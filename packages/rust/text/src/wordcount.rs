//! Word counting over flattened page text.
//!
//! Two passes: URL-shaped substrings collapse to the literal token `url`, then
//! a punctuation-aware tokenizer counts words. CJK characters count one word
//! each since those scripts do not separate words with spaces.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

/// Replacement for every URL found in the text.
const URL_TOKEN: &str = "url";

/// Full-width and typographic punctuation that never forms part of a word.
const WIDE_PUNCTUATION: &[char] = &[
    '，', '。', '：', '；', '！', '？', '、', '“', '”', '‘', '’', '（', '）', '【', '】', '《',
    '》', '「', '」', '『', '』', '…', '—', '～', '￥',
];

/// Count the words in `text`.
///
/// Punctuation is dropped without breaking the word it sits in, so `a·b`
/// stays one word. `extra_punctuation` is added to the built-in set; a lone
/// `·` only stops counting as a word of its own when it is listed.
pub fn count_words(text: &str, extra_punctuation: &[char]) -> usize {
    let text = substitute_urls(text);
    count_tokens(&text, extra_punctuation)
}

// ---------------------------------------------------------------------------
// Pass 1: URL substitution
// ---------------------------------------------------------------------------

/// Replace every URL with [`URL_TOKEN`] so its path segments are not counted.
fn substitute_urls(text: &str) -> Cow<'_, str> {
    static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?i)\b(?:[a-z][a-z0-9+.\-]*://|www\.)[^\s<>"]+"#).expect("valid regex")
    });

    URL_RE.replace_all(text, |caps: &Captures<'_>| {
        let candidate = &caps[0];
        if is_url(candidate) {
            URL_TOKEN.to_string()
        } else {
            candidate.to_string()
        }
    })
}

fn is_url(candidate: &str) -> bool {
    let parsed = if candidate
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("www."))
    {
        Url::parse(&format!("http://{candidate}"))
    } else {
        Url::parse(candidate)
    };

    parsed.is_ok_and(|url| url.host_str().is_some_and(|host| !host.is_empty()))
}

// ---------------------------------------------------------------------------
// Pass 2: tokenizing
// ---------------------------------------------------------------------------

fn count_tokens(text: &str, extra_punctuation: &[char]) -> usize {
    let mut count = 0;
    let mut in_word = false;

    for ch in text.chars() {
        if is_punctuation(ch, extra_punctuation) {
            continue;
        }
        if ch.is_whitespace() {
            in_word = false;
        } else if is_cjk(ch) {
            count += 1;
            in_word = false;
        } else if !in_word {
            count += 1;
            in_word = true;
        }
    }

    count
}

/// Characters dropped before counting. Only whitespace and CJK characters end
/// a word.
fn is_punctuation(ch: char, extra: &[char]) -> bool {
    ch.is_ascii_punctuation() || WIDE_PUNCTUATION.contains(&ch) || extra.contains(&ch)
}

fn is_cjk(ch: char) -> bool {
    matches!(ch,
        '\u{3040}'..='\u{30FF}'     // hiragana, katakana
        | '\u{3400}'..='\u{4DBF}'   // CJK extension A
        | '\u{4E00}'..='\u{9FFF}'   // CJK unified ideographs
        | '\u{AC00}'..='\u{D7AF}'   // hangul syllables
        | '\u{F900}'..='\u{FAFF}'   // CJK compatibility ideographs
        | '\u{20000}'..='\u{2A6DF}' // CJK extension B
    )
}
