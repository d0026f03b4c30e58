//! SQL extraction from raw model output.
//!
//! Models wrap their answer in prose, code fences or trailing commentary.
//! The extractor keeps the span from the first whole-word `SELECT` or `WITH`
//! up to and including the last `;`.

use regex::Regex;
use std::sync::OnceLock;

fn start_keyword() -> Option<&'static Regex> {
    static START: OnceLock<Option<Regex>> = OnceLock::new();
    START
        .get_or_init(|| Regex::new(r"(?i)\b(SELECT|WITH)\b").ok())
        .as_ref()
}

/// Extracts the SQL statement from a model response.
///
/// Returns an empty string when the response is empty or contains no
/// `SELECT`/`WITH` keyword. Without a `;` everything after the keyword is
/// kept. The result is trimmed.
pub fn extract_sql(raw: &str) -> String {
    let Some(found) = start_keyword().and_then(|re| re.find(raw)) else {
        return String::new();
    };

    let candidate = &raw[found.start()..];
    let candidate = match candidate.rfind(';') {
        Some(pos) => &candidate[..=pos],
        None => candidate,
    };

    candidate.trim().to_string()
}
