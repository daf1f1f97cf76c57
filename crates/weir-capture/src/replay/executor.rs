//! Re-issues edited requests and renders outcomes as capture records.

use super::headers::strip_forbidden;
use crate::capture::classify::classify;
use crate::capture::record::{
    CapturedRequest, Headers, PhaseTimings, ResourceType, ResponseBody,
};
use chrono::Utc;
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Editable description of a request to re-issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySpec {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Headers,
    /// Only sent for methods that conventionally carry a body.
    #[serde(default)]
    pub body: Option<String>,
}

/// Categorized replay failure. Every variant is directly displayable.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("request blocked: {0}")]
    Blocked(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("replay failed: {0}")]
    Other(String),
}

impl ReplayError {
    /// Stable category token for UI layers.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::Blocked(_) => "blocked",
            Self::Network(_) => "network",
            Self::Other(_) => "other",
        }
    }
}

/// Issues replay calls and shapes outcomes into records ready for
/// admission.
pub struct ReplayExecutor {
    client: Client,
}

impl Default for ReplayExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayExecutor {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Validate, strip forbidden headers, issue the call, and render the
    /// outcome as a new record with `is_replayed` set. Failures come back
    /// categorized; nothing is thrown past this boundary.
    pub async fn replay(&self, spec: &ReplaySpec) -> Result<CapturedRequest, ReplayError> {
        let url = Url::parse(&spec.url).map_err(|e| ReplayError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ReplayError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        let method = Method::from_bytes(spec.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| ReplayError::Other(format!("unsupported method '{}'", spec.method)))?;

        let outbound_headers = strip_forbidden(&spec.headers);
        let body = if carries_body(&method) {
            spec.body.clone()
        } else {
            if spec.body.is_some() {
                debug!(method = %method, "dropping body for bodyless method");
            }
            None
        };

        let mut request = self.client.request(method.clone(), url.clone());
        for (name, value) in outbound_headers.iter() {
            request = request.header(name, value);
        }
        if let Some(body) = &body {
            request = request.body(body.clone());
        }

        info!(method = %method, url = %url, "replaying request");
        let started = Instant::now();
        let response = request.send().await.map_err(categorize)?;
        let status = response.status();
        let response_headers = collect_headers(response.headers());
        let bytes = response.bytes().await.map_err(categorize)?;
        let duration = started.elapsed();

        let mime_type = response_headers
            .get("content-type")
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_string());
        let response_body = if bytes.is_empty() {
            ResponseBody::Absent
        } else {
            ResponseBody::Resident(String::from_utf8_lossy(&bytes).into_owned())
        };

        // Fine-grained phase timing is unavailable for a client-side call;
        // approximate with an 80/20 wait/receive split of the total.
        let wait = duration.mul_f64(0.8);
        let timings = PhaseTimings {
            wait,
            receive: duration.saturating_sub(wait),
            ..PhaseTimings::default()
        };

        let classification = classify(
            method.as_str(),
            url.as_str(),
            &outbound_headers,
            body.as_deref(),
        );
        let request_body_size = body.as_ref().map(|b| b.len() as u64).unwrap_or(0);

        Ok(CapturedRequest {
            id: Uuid::new_v4().to_string(),
            captured_at: Utc::now(),
            method: method.to_string(),
            url: url.to_string(),
            request_headers: outbound_headers,
            request_body: body,
            request_body_size,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            response_headers,
            response_body,
            response_body_size: bytes.len() as u64,
            mime_type,
            timings,
            duration,
            resource_type: ResourceType::Fetch,
            is_graphql: classification.is_graphql,
            is_websocket: classification.is_websocket,
            is_replayed: true,
        })
    }
}

fn carries_body(method: &Method) -> bool {
    matches!(method.as_str(), "POST" | "PUT" | "PATCH")
}

fn collect_headers(map: &reqwest::header::HeaderMap) -> Headers {
    Headers::from_pairs(map.iter().map(|(name, value)| {
        (
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )
    }))
}

fn categorize(err: reqwest::Error) -> ReplayError {
    if err.is_timeout() {
        ReplayError::Network(format!("request timed out: {err}"))
    } else if err.is_connect() {
        ReplayError::Network(format!("connection failed: {err}"))
    } else if err.is_builder() || err.is_request() {
        // refused before anything left the client
        ReplayError::Blocked(err.to_string())
    } else {
        ReplayError::Other(err.to_string())
    }
}
