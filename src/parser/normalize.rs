//! Field-level normalization of scraped cell text.
//!
//! Every function here is pure; callers decide what a failure means for the
//! surrounding row.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::config::Vocabulary;
use crate::error::ParseError;
use crate::record::Category;

static YEAR_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());

/// Full-date formats, tried in order. The four-digit-year forms come first so
/// "01/02/2024" never reads as year 20.
const DAY_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%y",
    "%d-%m-%y",
];

/// Parse a report date. Month-only text resolves to the 1st, year-only text
/// (or text that merely contains a 20xx token) to January 1.
pub fn parse_date(text: &str) -> Result<NaiveDate, ParseError> {
    let t = text.trim();
    if t.is_empty() {
        return Err(ParseError::Date(text.to_string()));
    }

    for fmt in DAY_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            if fmt.contains("%Y") && d.year() < 1000 {
                continue;
            }
            return Ok(d);
        }
    }

    // "Jan 2024", "January 2024", "Jan-2024"
    let spaced = t.replace('-', " ");
    if let Ok(d) = NaiveDate::parse_from_str(&format!("1 {}", spaced), "%d %b %Y") {
        return Ok(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("1 {}", spaced), "%d %B %Y") {
        return Ok(d);
    }

    if t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()) {
        if let Some(d) = t.parse::<i32>().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)) {
            return Ok(d);
        }
    }

    YEAR_TOKEN_RE
        .captures(t)
        .and_then(|caps| caps[1].parse::<i32>().ok())
        .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
        .ok_or_else(|| ParseError::Date(text.to_string()))
}

/// Map free-form category text onto the canonical classes. Unknown labels
/// are returned upper-cased as `Category::Other` so they stay visible.
pub fn normalize_category(text: &str, vocab: &Vocabulary) -> Option<Category> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lookup = trimmed
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    match vocab.category_synonyms.get(&lookup) {
        Some(c) => Some(c.clone()),
        None => Some(Category::from_canonical(&trimmed.to_uppercase())),
    }
}

/// Parse a registration count such as "1,23,456" or "12,345.0 units".
/// Returns `None` when nothing numeric is left, never zero.
pub fn parse_count(text: &str) -> Option<u64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    if cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return cleaned.parse::<u64>().ok();
    }
    let n: f64 = cleaned.parse().ok()?;
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    Some(n.trunc() as u64)
}
