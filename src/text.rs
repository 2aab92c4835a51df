use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Promotional badges marketplaces splice into titles and summaries.
/// Matched case-insensitively.
const BADGES: &[&str] = &[
    "검수가능", "검수 가능", "검수완료", "검수 완료",
    "배송비포함", "배송비 포함", "무료배송",
    "AD", "광고", "파워링크",
];

// Pre-compiled regex for whitespace normalization (compile once, use many times)
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Invalid whitespace regex pattern")
});

static BADGE_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = BADGES
        .iter()
        .map(|b| regex::escape(b))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){}", alternation)).expect("Invalid badge regex pattern")
});

static NON_DIGIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^0-9]").expect("Invalid digit regex pattern")
});

/// Strip promotional badges, collapse whitespace runs to one space, and trim.
///
/// Runs to a fixpoint: removing one badge can join its neighbours into
/// another badge ("검수AD가능" becomes "검수 가능"), so a single pass would
/// not be idempotent.
pub fn clean_text(content: &str) -> String {
    let mut current = collapse_whitespace(content);
    loop {
        let next = collapse_whitespace(&BADGE_RE.replace_all(&current, " "));
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Collapse multiple spaces/newlines into a single space and trim
pub fn collapse_whitespace(content: &str) -> String {
    WHITESPACE_RE.replace_all(content, " ").trim().to_string()
}

/// Build a lookup key for place names.
///
/// NFC-composes the input, then keeps only Hangul syllables, ASCII letters
/// and ASCII digits, so "상계 1동", "상계1동" and a decomposed-jamo rendering
/// all collide. Returns `None` when nothing usable remains.
pub fn normalize_key(content: &str) -> Option<String> {
    let key: String = content
        .nfc()
        .filter(|c| is_hangul_syllable(*c) || c.is_ascii_alphanumeric())
        .collect();

    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Parse every digit in the string as one integer ("450,000원" -> 450000).
/// Returns 0 when there are no digits or the number overflows.
pub fn to_int(content: &str) -> u64 {
    let digits = NON_DIGIT_RE.replace_all(content, "");
    digits.parse().unwrap_or(0)
}

pub(crate) fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// Take a window of `before` chars ahead of `start` and `after` chars past
/// `end` (byte offsets from a regex match), respecting char boundaries.
pub(crate) fn char_window(content: &str, start: usize, end: usize, before: usize, after: usize) -> &str {
    let from = content[..start]
        .char_indices()
        .rev()
        .nth(before.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let from = if before == 0 { start } else { from };

    let to = content[end..]
        .char_indices()
        .nth(after)
        .map(|(i, _)| end + i)
        .unwrap_or(content.len());

    &content[from..to]
}
