//! Utility functions for CLI commands

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use junggo::JunggoError;

/// "1,250,000원"
pub fn format_krw(amount: f64) -> String {
    let whole = amount.round().max(0.0) as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}원", grouped)
}

/// Truncate a string to max_len characters (not bytes), adding "..." if truncated.
/// Safe for non-ASCII content (Hangul etc).
pub fn truncate_str(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        chars[..max_len].iter().collect()
    } else {
        format!("{}...", chars[..max_len - 3].iter().collect::<String>())
    }
}

/// Parse a YYYY-MM-DD command-line date
pub fn parse_date_arg(s: &str) -> junggo::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| JunggoError::QueryError(format!("Invalid date '{}'. Use YYYY-MM-DD", s)))
}

/// Read a whole input file, or stdin for "-"
pub fn read_input(path: &Path) -> junggo::Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        return Ok(input);
    }
    Ok(std::fs::read_to_string(path)?)
}
