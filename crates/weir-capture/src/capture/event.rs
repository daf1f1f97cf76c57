//! Raw traffic events as handed over by the external capture API.

use super::record::{BodyFetch, Headers, PhaseTimings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Response body access for one raw event.
#[derive(Clone, Default)]
pub enum RawBody {
    /// Body text travelled inline with the event.
    Inline(String),
    /// Body must be fetched back from the capture source on demand.
    Remote(Arc<dyn BodyFetch>),
    /// No body exists for this exchange.
    #[default]
    None,
}

impl fmt::Debug for RawBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(text) => f.debug_tuple("Inline").field(&text.len()).finish(),
            Self::Remote(_) => f.write_str("Remote(..)"),
            Self::None => f.write_str("None"),
        }
    }
}

/// Phase timings in float milliseconds as reported by the capture source.
/// Missing phases are conventionally reported as negative values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTimings {
    pub queued_ms: f64,
    pub dns_ms: f64,
    pub connect_ms: f64,
    pub tls_ms: f64,
    pub send_ms: f64,
    pub wait_ms: f64,
    pub receive_ms: f64,
}

impl Default for RawTimings {
    fn default() -> Self {
        Self {
            queued_ms: -1.0,
            dns_ms: -1.0,
            connect_ms: -1.0,
            tls_ms: -1.0,
            send_ms: -1.0,
            wait_ms: -1.0,
            receive_ms: -1.0,
        }
    }
}

impl RawTimings {
    /// Convert to durations. Negative and non-finite values clamp to zero,
    /// values beyond `Duration` range to `Duration::MAX`.
    pub fn normalized(&self) -> PhaseTimings {
        PhaseTimings {
            queued: millis_to_duration(self.queued_ms),
            dns: millis_to_duration(self.dns_ms),
            connect: millis_to_duration(self.connect_ms),
            tls: millis_to_duration(self.tls_ms),
            send: millis_to_duration(self.send_ms),
            wait: millis_to_duration(self.wait_ms),
            receive: millis_to_duration(self.receive_ms),
        }
    }
}

/// Clamping float-millisecond conversion shared by timings and durations.
/// Capture sources report milliseconds as untrusted floats, so out-of-range
/// input clamps instead of aborting.
pub(crate) fn millis_to_duration(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// One intercepted exchange, unfiltered and unclassified.
#[derive(Debug, Clone, Default)]
pub struct RawTrafficEvent {
    pub method: String,
    pub url: String,
    pub request_headers: Headers,
    pub request_body: Option<String>,
    pub status: u16,
    pub status_text: String,
    pub response_headers: Headers,
    pub response_body: RawBody,
    /// Declared response size in bytes, known even when the body is remote.
    pub response_body_size: u64,
    pub mime_type: Option<String>,
    pub timings: RawTimings,
    pub duration_ms: f64,
    /// Free-form resource type hint, e.g. "xhr" or "Document".
    pub resource_type_hint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_phases_clamp_to_zero() {
        let raw = RawTimings {
            dns_ms: -1.0,
            wait_ms: 154.2,
            ..RawTimings::default()
        };
        let timings = raw.normalized();
        assert_eq!(timings.dns, Duration::ZERO);
        assert_eq!(timings.queued, Duration::ZERO);
        assert_eq!(timings.wait, Duration::from_secs_f64(154.2 / 1000.0));
    }

    #[test]
    fn test_non_finite_phases_clamp_to_zero() {
        let raw = RawTimings {
            connect_ms: f64::NAN,
            tls_ms: f64::INFINITY,
            ..RawTimings::default()
        };
        let timings = raw.normalized();
        assert_eq!(timings.connect, Duration::ZERO);
        assert_eq!(timings.tls, Duration::ZERO);
    }

    #[test]
    fn test_overlarge_phases_clamp_to_duration_max() {
        let raw = RawTimings {
            queued_ms: 1e300,
            wait_ms: 12.0,
            ..RawTimings::default()
        };
        let timings = raw.normalized();
        assert_eq!(timings.queued, Duration::MAX);
        assert_eq!(timings.wait, Duration::from_millis(12));
        assert_eq!(timings.total(), Duration::MAX);
    }
}
