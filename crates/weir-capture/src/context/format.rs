//! Body and header block formatting for context documents.

use crate::capture::record::Headers;
use std::time::Duration;

/// Per-body character ceiling inside a context document.
pub const BODY_CHAR_LIMIT: usize = 10_000;

/// Markdown fence language tag for a MIME type. Unknown types get an
/// untagged fence.
pub fn language_tag(mime_type: Option<&str>) -> &'static str {
    let Some(mime) = mime_type else { return "" };
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if essence.contains("json") {
        "json"
    } else if essence.contains("html") {
        "html"
    } else if essence.contains("xml") {
        "xml"
    } else if essence.contains("javascript") {
        "javascript"
    } else if essence.contains("css") {
        "css"
    } else {
        ""
    }
}

/// Pretty-print bodies tagged as JSON; anything that fails to parse stays
/// verbatim.
pub fn pretty_if_json(text: &str, tag: &str) -> String {
    if tag == "json" {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
            if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                return pretty;
            }
        }
    }
    text.to_string()
}

/// Clip to the character ceiling, appending a notice citing the original
/// length. Counts characters, not bytes, so multibyte text never splits.
pub fn clip_body(text: &str, limit: usize) -> String {
    let total = text.chars().count();
    if total <= limit {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(limit).collect();
    clipped.push_str(&format!("\n... [truncated, {total} chars total]"));
    clipped
}

/// Fenced code block with an optional language tag.
pub fn fenced_block(text: &str, tag: &str) -> String {
    format!("```{tag}\n{text}\n```")
}

/// One `Name: value` line per header, in capture order.
pub fn headers_block(headers: &Headers) -> String {
    if headers.is_empty() {
        return "(none)".to_string();
    }
    headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_millis(duration: Duration) -> String {
    format!("{} ms", duration.as_millis())
}

pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else if bytes < GIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else {
        format!("{:.1} GB", bytes as f64 / GIB as f64)
    }
}
