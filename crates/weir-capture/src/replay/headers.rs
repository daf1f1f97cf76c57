//! Outbound header policy for replayed requests.

use crate::capture::record::Headers;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use tracing::debug;

// Connection-management and transport-controlled headers that an
// application-level client must not set by hand. Mirrors the browser's
// forbidden-header list, which is where replayed captures come from.
static FORBIDDEN_HEADERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "accept-charset",
        "accept-encoding",
        "access-control-request-headers",
        "access-control-request-method",
        "connection",
        "content-length",
        "cookie",
        "cookie2",
        "date",
        "dnt",
        "expect",
        "host",
        "keep-alive",
        "origin",
        "referer",
        "te",
        "trailer",
        "transfer-encoding",
        "upgrade",
        "via",
    ]
    .into_iter()
    .collect()
});

const FORBIDDEN_PREFIXES: [&str; 2] = ["proxy-", "sec-"];

/// Whether a header may not be set on an outbound replay.
pub fn is_forbidden(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    FORBIDDEN_HEADERS.contains(lower.as_str())
        || FORBIDDEN_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Drop forbidden headers, keeping everything else in order.
pub fn strip_forbidden(headers: &Headers) -> Headers {
    Headers::from_pairs(headers.iter().filter_map(|(name, value)| {
        if is_forbidden(name) {
            debug!(header = %name, "stripping forbidden header from replay");
            None
        } else {
            Some((name.to_string(), value.to_string()))
        }
    }))
}
