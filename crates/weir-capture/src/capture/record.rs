//! Normalized capture records - the store's unit of truth.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Ordered header collection. Capture order and key casing are preserved as
/// seen on the wire; lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Append a header, keeping the given casing. Repeated names are kept as
    /// separate entries, like Set-Cookie on the wire.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Phase-level timing breakdown for one exchange.
///
/// Phases can overlap on the wire, so no exact-sum relation to the total
/// duration is guaranteed or enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTimings {
    pub queued: Duration,
    pub dns: Duration,
    pub connect: Duration,
    pub tls: Duration,
    pub send: Duration,
    pub wait: Duration,
    pub receive: Duration,
}

impl PhaseTimings {
    /// Sum of all phases, for display only. Saturates instead of overflowing.
    pub fn total(&self) -> Duration {
        [self.dns, self.connect, self.tls, self.send, self.wait, self.receive]
            .into_iter()
            .fold(self.queued, Duration::saturating_add)
    }
}

/// Coarse resource classification reported by the capture source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    Xhr,
    Fetch,
    WebSocket,
    #[default]
    Other,
}

impl ResourceType {
    /// Parse the capture source's free-form type hint. Unknown hints map to
    /// `Other` rather than failing.
    pub fn from_hint(hint: &str) -> Self {
        match hint.to_ascii_lowercase().as_str() {
            "document" | "main_frame" | "sub_frame" => Self::Document,
            "stylesheet" | "css" => Self::Stylesheet,
            "image" | "img" => Self::Image,
            "media" => Self::Media,
            "font" => Self::Font,
            "script" => Self::Script,
            "xhr" | "xmlhttprequest" => Self::Xhr,
            "fetch" => Self::Fetch,
            "websocket" | "ws" => Self::WebSocket,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Stylesheet => "stylesheet",
            Self::Image => "image",
            Self::Media => "media",
            Self::Font => "font",
            Self::Script => "script",
            Self::Xhr => "xhr",
            Self::Fetch => "fetch",
            Self::WebSocket => "websocket",
            Self::Other => "other",
        }
    }
}

/// Fetch-on-demand access to a response body still held by the capture
/// source. Implementations must tolerate being called well after capture.
#[async_trait]
pub trait BodyFetch: Send + Sync {
    async fn fetch(&self) -> Result<String, BodyFetchError>;
}

#[derive(Debug, Clone, Error)]
pub enum BodyFetchError {
    /// The capture source discarded the body (page navigated, tab closed).
    #[error("capture source no longer holds this body: {0}")]
    Gone(String),
    #[error("body fetch failed: {0}")]
    Failed(String),
}

/// Handle to a response body left at the capture source. Loading never
/// mutates the owning record; callers decide whether to cache the result.
#[derive(Clone)]
pub struct DeferredBody {
    size: u64,
    fetch: Arc<dyn BodyFetch>,
}

impl DeferredBody {
    pub fn new(size: u64, fetch: Arc<dyn BodyFetch>) -> Self {
        Self { size, fetch }
    }

    /// Declared size in bytes, known before the body is loaded.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub async fn load(&self) -> Result<String, BodyFetchError> {
        self.fetch.fetch().await
    }
}

impl fmt::Debug for DeferredBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredBody")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Stored state of a response body.
#[derive(Debug, Clone, Default)]
pub enum ResponseBody {
    /// Body text held in memory.
    Resident(String),
    /// No body exists for this exchange.
    #[default]
    Absent,
    /// Body exceeds the inline threshold and stays at the capture source.
    Deferred(DeferredBody),
}

impl ResponseBody {
    pub fn is_resident(&self) -> bool {
        matches!(self, Self::Resident(_))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// Resident text, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Resident(text) => Some(text),
            _ => None,
        }
    }
}

// Deferred handles cannot round-trip through serde; records serialize the
// body state and declared size instead of the handle.
impl Serialize for ResponseBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Resident(text) => {
                let mut s = serializer.serialize_struct("ResponseBody", 2)?;
                s.serialize_field("state", "resident")?;
                s.serialize_field("text", text)?;
                s.end()
            }
            Self::Absent => {
                let mut s = serializer.serialize_struct("ResponseBody", 1)?;
                s.serialize_field("state", "absent")?;
                s.end()
            }
            Self::Deferred(deferred) => {
                let mut s = serializer.serialize_struct("ResponseBody", 2)?;
                s.serialize_field("state", "deferred")?;
                s.serialize_field("size", &deferred.size())?;
                s.end()
            }
        }
    }
}

/// One fully normalized request/response exchange.
///
/// Records are immutable once admitted; the store hands out `Arc` clones.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedRequest {
    pub id: String,
    pub captured_at: DateTime<Utc>,
    pub method: String,
    pub url: String,
    pub request_headers: Headers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    pub request_body_size: u64,
    pub status: u16,
    pub status_text: String,
    pub response_headers: Headers,
    pub response_body: ResponseBody,
    pub response_body_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub timings: PhaseTimings,
    pub duration: Duration,
    pub resource_type: ResourceType,
    pub is_graphql: bool,
    pub is_websocket: bool,
    pub is_replayed: bool,
}

impl CapturedRequest {
    /// True unless the response body is still deferred at the capture source.
    pub fn has_full_body(&self) -> bool {
        !self.response_body.is_deferred()
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}
