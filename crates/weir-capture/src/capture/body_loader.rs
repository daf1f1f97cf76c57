//! Response body resolution: eager below a size threshold, deferred above.

use super::event::RawBody;
use super::record::{BodyFetch, BodyFetchError, DeferredBody, ResponseBody};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Bodies at or above this size stay at the capture source until asked for.
pub const DEFAULT_INLINE_THRESHOLD: u64 = 500 * 1024;

/// Applies the inline-size threshold to response bodies.
#[derive(Debug, Clone, Copy)]
pub struct BodyLoader {
    threshold: u64,
}

impl Default for BodyLoader {
    fn default() -> Self {
        Self::new(DEFAULT_INLINE_THRESHOLD)
    }
}

impl BodyLoader {
    pub fn new(threshold: u64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Resolve a raw body into its stored representation. Body content is
    /// best-effort: a failed fetch degrades to an absent body and admission
    /// proceeds.
    pub async fn resolve(&self, body: RawBody, declared_size: u64) -> ResponseBody {
        match body {
            RawBody::None => ResponseBody::Absent,
            RawBody::Inline(text) if declared_size < self.threshold => {
                ResponseBody::Resident(text)
            }
            // Inline but oversized: stash behind a ready-made handle so the
            // threshold governs what the store holds resident, regardless of
            // how the body arrived.
            RawBody::Inline(text) => ResponseBody::Deferred(DeferredBody::new(
                declared_size,
                Arc::new(StashedBody(text)),
            )),
            RawBody::Remote(fetch) if declared_size < self.threshold => {
                match fetch.fetch().await {
                    Ok(text) => ResponseBody::Resident(text),
                    Err(err) => {
                        warn!(%err, "eager body fetch failed; storing record without body");
                        ResponseBody::Absent
                    }
                }
            }
            RawBody::Remote(fetch) => {
                ResponseBody::Deferred(DeferredBody::new(declared_size, fetch))
            }
        }
    }
}

/// Ready handle for bodies that arrived inline but exceed the threshold.
struct StashedBody(String);

#[async_trait]
impl BodyFetch for StashedBody {
    async fn fetch(&self) -> Result<String, BodyFetchError> {
        Ok(self.0.clone())
    }
}
