//! Log-safe summaries of JSON payloads.

use serde_json::Value;

const ELLIPSIS: &str = "...";

/// Serializes `value` compactly, truncating to at most `limit` bytes.
///
/// Truncation respects UTF-8 boundaries and appends `...`, which is counted
/// within the limit. Limits shorter than the marker yield a clipped marker.
#[must_use]
pub fn summarize_json(value: &Value, limit: usize) -> String {
    let rendered = value.to_string();
    if rendered.len() <= limit {
        return rendered;
    }

    if limit < ELLIPSIS.len() {
        return ELLIPSIS[..limit].to_owned();
    }

    let mut cut = limit - ELLIPSIS.len();
    while !rendered.is_char_boundary(cut) {
        cut -= 1;
    }

    let mut summary = String::with_capacity(cut + ELLIPSIS.len());
    summary.push_str(&rendered[..cut]);
    summary.push_str(ELLIPSIS);
    summary
}
