//! End-to-end tests for the capture pipeline: raw traffic events in,
//! sanitized context documents out.

use std::sync::Arc;
use weir_capture::capture::{Headers, RawBody, RawTrafficEvent, DEFAULT_CAPACITY, MIN_CAPACITY};
use weir_capture::config::CaptureSettings;
use weir_capture::{CapturePipeline, CaptureStore, ContextBuilder, SanitizeEngine, Settings};

fn event(method: &str, url: &str, body: &str) -> RawTrafficEvent {
    RawTrafficEvent {
        method: method.to_string(),
        url: url.to_string(),
        status: 200,
        status_text: "OK".to_string(),
        response_headers: Headers::from_pairs([("Content-Type", "application/json")]),
        response_body: RawBody::Inline(body.to_string()),
        response_body_size: body.len() as u64,
        mime_type: Some("application/json".to_string()),
        duration_ms: 42.0,
        resource_type_hint: "fetch".to_string(),
        ..RawTrafficEvent::default()
    }
}

fn pipeline() -> (Arc<CaptureStore>, CapturePipeline) {
    let store = Arc::new(CaptureStore::new());
    let pipeline = CapturePipeline::new(Arc::clone(&store), &CaptureSettings::default());
    (store, pipeline)
}

#[tokio::test]
async fn test_overflow_evicts_oldest_and_clears_marks() {
    let store = Arc::new(CaptureStore::with_capacity(MIN_CAPACITY));
    let pipeline = CapturePipeline::new(Arc::clone(&store), &CaptureSettings::default());

    let first = pipeline
        .ingest(event("GET", "https://api.test/0", "{}"))
        .await
        .unwrap();
    store.toggle_favorite(&first);
    store.toggle_selected(&first);

    for i in 1..=MIN_CAPACITY {
        pipeline
            .ingest(event("GET", &format!("https://api.test/{i}"), "{}"))
            .await
            .unwrap();
    }

    assert_eq!(store.len(), MIN_CAPACITY);
    assert!(store.get(&first).is_none());
    assert!(!store.is_favorite(&first));
    assert!(!store.is_selected(&first));

    // survivors keep arrival order
    let records = store.records();
    assert!(records[0].url.ends_with("/1"));
    assert!(records[MIN_CAPACITY - 1]
        .url
        .ends_with(&format!("/{MIN_CAPACITY}")));
}

#[tokio::test]
async fn test_overflow_at_default_capacity() {
    let (store, pipeline) = pipeline();
    assert_eq!(store.capacity(), DEFAULT_CAPACITY);

    let first = pipeline
        .ingest(event("GET", "https://api.test/0", "{}"))
        .await
        .unwrap();
    store.toggle_favorite(&first);

    // 500 further admissions push the first record out
    for i in 1..=DEFAULT_CAPACITY {
        pipeline
            .ingest(event("GET", &format!("https://api.test/{i}"), "{}"))
            .await
            .unwrap();
    }

    assert_eq!(store.len(), DEFAULT_CAPACITY);
    assert!(store.get(&first).is_none());
    assert!(!store.is_favorite(&first));

    let records = store.records();
    assert!(records[0].url.ends_with("/1"));
    assert!(records[DEFAULT_CAPACITY - 1]
        .url
        .ends_with(&format!("/{DEFAULT_CAPACITY}")));
}

#[tokio::test]
async fn test_pause_blocks_capture_until_resumed() {
    let (store, pipeline) = pipeline();

    store.set_paused(true);
    assert!(pipeline
        .ingest(event("GET", "https://api.test/dropped", "{}"))
        .await
        .is_none());
    assert!(store.is_empty());

    store.set_paused(false);
    assert!(pipeline
        .ingest(event("GET", "https://api.test/kept", "{}"))
        .await
        .is_some());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_filter_and_selection_flow() {
    let (store, pipeline) = pipeline();

    pipeline
        .ingest(event("GET", "https://api.test/users", "{}"))
        .await
        .unwrap();
    pipeline
        .ingest(event("POST", "https://api.test/orders", "{}"))
        .await
        .unwrap();
    pipeline
        .ingest(event("GET", "https://cdn.test/logo.png", ""))
        .await
        .unwrap();

    store.set_filter("post");
    let filtered = store.filtered();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].method, "POST");

    store.select_matching("api.test");
    let selected = store.selected_records();
    assert_eq!(selected.len(), 2);
    assert!(selected[0].url.contains("/users"));
    assert!(selected[1].url.contains("/orders"));
}

#[tokio::test]
async fn test_stats_reflect_captured_traffic() {
    let (store, pipeline) = pipeline();

    let mut graphql = event("POST", "https://api.test/graphql", r#"{"data":{}}"#);
    graphql.request_body = Some(r#"{"query":"{ viewer { id } }"}"#.to_string());
    pipeline.ingest(graphql).await.unwrap();

    let mut failed = event("GET", "https://api.test/missing", "");
    failed.status = 404;
    failed.status_text = "Not Found".to_string();
    pipeline.ingest(failed).await.unwrap();

    pipeline
        .ingest(event("GET", "https://api.test/users", "{}"))
        .await
        .unwrap();

    let stats = store.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.graphql, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.by_method.get("GET"), Some(&2));
    assert_eq!(stats.by_method.get("POST"), Some(&1));
    assert_eq!(stats.by_status.get(&404), Some(&1));
}

#[tokio::test]
async fn test_sanitized_context_document() {
    let (store, pipeline) = pipeline();

    let mut login = event(
        "POST",
        "https://api.test/login",
        r#"{"token":"abc-123-secret"}"#,
    );
    login.request_headers = Headers::from_pairs([
        ("Content-Type", "application/json"),
        ("Authorization", "Bearer sk-live-very-secret"),
    ]);
    login.request_body = Some(r#"{"password":"hunter2"}"#.to_string());
    pipeline.ingest(login).await.unwrap();

    pipeline
        .ingest(event("GET", "https://api.test/users", r#"{"ok":true}"#))
        .await
        .unwrap();

    let engine = SanitizeEngine::compile(&Settings::default().sanitize_rules);
    let sanitized: Vec<_> = store
        .records()
        .iter()
        .map(|record| engine.sanitize_request(record))
        .collect();
    let text = ContextBuilder::new().build(&sanitized).render();

    assert!(text.contains("# Network capture summary"));
    assert!(text.contains("- Requests: 2"));
    assert!(text.contains("## 1. POST https://api.test/login"));
    assert!(text.contains("## 2. GET https://api.test/users"));

    assert!(text.contains("Bearer [REDACTED]"));
    assert!(text.contains(r#""password": "[REDACTED]""#));
    assert!(text.contains(r#""token": "[REDACTED]""#));
    assert!(!text.contains("sk-live-very-secret"));
    assert!(!text.contains("hunter2"));
    assert!(!text.contains("abc-123-secret"));
}

#[test]
fn test_empty_capture_renders_placeholder() {
    let store = CaptureStore::new();
    let records: Vec<_> = store
        .records()
        .iter()
        .map(|record| (**record).clone())
        .collect();
    let doc = ContextBuilder::new().build(&records);
    assert_eq!(doc.render(), "No requests captured.");
}

#[tokio::test]
async fn test_clear_resets_records_but_keeps_settings() {
    let (store, pipeline) = pipeline();

    let id = pipeline
        .ingest(event("GET", "https://api.test/users", "{}"))
        .await
        .unwrap();
    store.toggle_favorite(&id);
    store.set_filter("users");

    store.clear();
    assert!(store.is_empty());
    assert!(!store.is_favorite(&id));
    assert_eq!(store.filter_text(), "users");

    // capture keeps working after a clear
    assert!(pipeline
        .ingest(event("GET", "https://api.test/again", "{}"))
        .await
        .is_some());
}
