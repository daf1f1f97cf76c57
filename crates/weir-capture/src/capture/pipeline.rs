//! Single admission path from raw traffic events into the store.

use super::body_loader::BodyLoader;
use super::classify::classify;
use super::event::{millis_to_duration, RawTrafficEvent};
use super::record::{CapturedRequest, ResourceType};
use super::store::CaptureStore;
use crate::config::{CaptureScope, CaptureSettings, ExcludePatterns};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Normalizes raw traffic into records and feeds the store. Everything that
/// becomes a stored record passes through here exactly once.
pub struct CapturePipeline {
    store: Arc<CaptureStore>,
    loader: BodyLoader,
    excludes: ExcludePatterns,
    scope: CaptureScope,
}

impl CapturePipeline {
    pub fn new(store: Arc<CaptureStore>, settings: &CaptureSettings) -> Self {
        Self {
            store,
            loader: BodyLoader::new(settings.inline_body_threshold),
            excludes: ExcludePatterns::compile(&settings.exclude_patterns),
            scope: settings.scope,
        }
    }

    pub fn store(&self) -> &Arc<CaptureStore> {
        &self.store
    }

    /// Filter, normalize, and admit one event. Returns the admitted record
    /// id, or `None` when the event was filtered out or capture is paused.
    pub async fn ingest(&self, event: RawTrafficEvent) -> Option<String> {
        let resource_type = ResourceType::from_hint(&event.resource_type_hint);
        if !self.scope.includes(resource_type) {
            debug!(url = %event.url, ?resource_type, "event outside capture scope");
            return None;
        }
        if self.excludes.matches(&event.url) {
            debug!(url = %event.url, "event excluded by pattern");
            return None;
        }

        let record = self.normalize(event, resource_type).await;
        let id = record.id.clone();
        self.store.admit(record).then_some(id)
    }

    /// Admit a replay outcome. Replays bypass scope and exclusion filtering,
    /// which govern passive capture only; pause and capacity still apply.
    pub fn admit_outcome(&self, record: CapturedRequest) -> bool {
        self.store.admit(record)
    }

    async fn normalize(
        &self,
        event: RawTrafficEvent,
        resource_type: ResourceType,
    ) -> CapturedRequest {
        let classification = classify(
            &event.method,
            &event.url,
            &event.request_headers,
            event.request_body.as_deref(),
        );
        let response_body = self
            .loader
            .resolve(event.response_body, event.response_body_size)
            .await;
        let request_body_size = event
            .request_body
            .as_ref()
            .map(|b| b.len() as u64)
            .unwrap_or(0);

        CapturedRequest {
            id: Uuid::new_v4().to_string(),
            captured_at: Utc::now(),
            method: event.method,
            url: event.url,
            request_headers: event.request_headers,
            request_body: event.request_body,
            request_body_size,
            status: event.status,
            status_text: event.status_text,
            response_headers: event.response_headers,
            response_body,
            response_body_size: event.response_body_size,
            mime_type: event.mime_type,
            timings: event.timings.normalized(),
            duration: millis_to_duration(event.duration_ms),
            resource_type,
            is_graphql: classification.is_graphql,
            is_websocket: classification.is_websocket,
            is_replayed: false,
        }
    }
}
