//! Protocol subtype detection for normalized requests.
//!
//! Flags are computed once at admission from whatever data is resident at
//! that instant; a response body loaded later never re-runs classification.

use super::record::Headers;
use url::Url;

/// Subtype flags derived from one exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_graphql: bool,
    pub is_websocket: bool,
}

/// Classify from the request side of an exchange. `body` is the request
/// body, when one was captured.
pub fn classify(method: &str, url: &str, headers: &Headers, body: Option<&str>) -> Classification {
    Classification {
        is_graphql: is_graphql(method, url, headers, body),
        is_websocket: is_websocket_upgrade(headers),
    }
}

fn is_websocket_upgrade(headers: &Headers) -> bool {
    headers
        .get("upgrade")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"))
}

fn is_graphql(method: &str, url: &str, headers: &Headers, body: Option<&str>) -> bool {
    if path_contains_graphql(url) {
        return true;
    }
    // POST to a /graphql endpoint with a JSON content type counts even when
    // the body was not captured.
    if method.eq_ignore_ascii_case("POST")
        && has_json_content_type(headers)
        && url.to_ascii_lowercase().contains("/graphql")
    {
        return true;
    }
    body.is_some_and(has_graphql_query_field)
}

fn path_contains_graphql(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase().contains("/graphql"),
        // Relative or otherwise unparseable URL: match against the raw string.
        Err(_) => url.to_ascii_lowercase().contains("/graphql"),
    }
}

fn has_json_content_type(headers: &Headers) -> bool {
    headers
        .get("content-type")
        .is_some_and(|v| v.to_ascii_lowercase().contains("json"))
}

/// True when the body parses as JSON and carries a string-typed `query`
/// field, the wire shape shared by GraphQL queries and mutations.
fn has_graphql_query_field(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("query").map(|q| q.is_string()))
        .unwrap_or(false)
}
