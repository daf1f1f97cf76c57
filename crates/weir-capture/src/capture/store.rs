//! Bounded, ordered capture store with FIFO eviction.

use super::record::CapturedRequest;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 500;
pub const MIN_CAPACITY: usize = 100;
pub const MAX_CAPACITY: usize = 2000;

/// Everything guarded by one lock so eviction and side-table cleanup are a
/// single critical section; a concurrent reader never observes a favorited
/// id whose record is already gone.
#[derive(Debug)]
struct StoreState {
    records: VecDeque<Arc<CapturedRequest>>,
    favorites: HashSet<String>,
    selected: HashSet<String>,
    capacity: usize,
    paused: bool,
    filter: String,
}

/// Bounded in-memory store of captured exchanges, oldest first.
#[derive(Debug)]
pub struct CaptureStore {
    state: RwLock<StoreState>,
}

impl Default for CaptureStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl CaptureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a capacity clamped to the allowed range.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(StoreState {
                records: VecDeque::new(),
                favorites: HashSet::new(),
                selected: HashSet::new(),
                capacity: capacity.clamp(MIN_CAPACITY, MAX_CAPACITY),
                paused: false,
                filter: String::new(),
            }),
        }
    }

    /// Append a record, evicting from the front once over capacity. Returns
    /// false when capture is paused and the record was dropped.
    pub fn admit(&self, record: CapturedRequest) -> bool {
        let mut state = self.state.write();
        if state.paused {
            debug!(id = %record.id, "capture paused; record dropped");
            return false;
        }
        state.records.push_back(Arc::new(record));
        Self::evict_over_capacity(&mut state);
        true
    }

    fn evict_over_capacity(state: &mut StoreState) {
        while state.records.len() > state.capacity {
            if let Some(evicted) = state.records.pop_front() {
                state.favorites.remove(&evicted.id);
                state.selected.remove(&evicted.id);
                debug!(id = %evicted.id, "evicted oldest record");
            }
        }
    }

    /// Change capacity (clamped); shrinking evicts oldest records down to
    /// the new bound with the same side-table cleanup as admission.
    pub fn set_capacity(&self, capacity: usize) {
        let mut state = self.state.write();
        state.capacity = capacity.clamp(MIN_CAPACITY, MAX_CAPACITY);
        Self::evict_over_capacity(&mut state);
    }

    pub fn capacity(&self) -> usize {
        self.state.read().capacity
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.write().paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().paused
    }

    /// Flip favorite membership; unknown ids are ignored.
    pub fn toggle_favorite(&self, id: &str) {
        let mut state = self.state.write();
        if !state.records.iter().any(|r| r.id == id) {
            return;
        }
        if !state.favorites.remove(id) {
            state.favorites.insert(id.to_string());
        }
    }

    /// Flip selection membership; unknown ids are ignored.
    pub fn toggle_selected(&self, id: &str) {
        let mut state = self.state.write();
        if !state.records.iter().any(|r| r.id == id) {
            return;
        }
        if !state.selected.remove(id) {
            state.selected.insert(id.to_string());
        }
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.state.read().favorites.contains(id)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.state.read().selected.contains(id)
    }

    /// Drop all records and both side-tables. The pause flag and filter are
    /// left as they are.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.records.clear();
        state.favorites.clear();
        state.selected.clear();
        debug!("capture store cleared");
    }

    pub fn get(&self, id: &str) -> Option<Arc<CapturedRequest>> {
        self.state
            .read()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// All records in capture order.
    pub fn records(&self) -> Vec<Arc<CapturedRequest>> {
        self.state.read().records.iter().cloned().collect()
    }

    /// Ordered subsequence matching `predicate` against method, URL, or
    /// status as a case-insensitive substring. Empty predicate matches all.
    pub fn filter(&self, predicate: &str) -> Vec<Arc<CapturedRequest>> {
        let needle = predicate.to_lowercase();
        self.state
            .read()
            .records
            .iter()
            .filter(|r| matches_predicate(r, &needle))
            .cloned()
            .collect()
    }

    /// Replace the selection with exactly the ids matching `predicate`.
    pub fn select_matching(&self, predicate: &str) {
        let needle = predicate.to_lowercase();
        let mut state = self.state.write();
        state.selected = state
            .records
            .iter()
            .filter(|r| matches_predicate(r, &needle))
            .map(|r| r.id.clone())
            .collect();
    }

    /// Selected records in capture order.
    pub fn selected_records(&self) -> Vec<Arc<CapturedRequest>> {
        let state = self.state.read();
        state
            .records
            .iter()
            .filter(|r| state.selected.contains(&r.id))
            .cloned()
            .collect()
    }

    /// Remember the UI's current search predicate.
    pub fn set_filter(&self, predicate: impl Into<String>) {
        self.state.write().filter = predicate.into();
    }

    pub fn filter_text(&self) -> String {
        self.state.read().filter.clone()
    }

    /// Records matching the stored search predicate.
    pub fn filtered(&self) -> Vec<Arc<CapturedRequest>> {
        let predicate = self.filter_text();
        self.filter(&predicate)
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    /// Aggregate counters over the current contents.
    pub fn stats(&self) -> CaptureStats {
        let state = self.state.read();
        CaptureStats::collect(state.records.iter().map(|r| r.as_ref()))
    }
}

fn matches_predicate(record: &CapturedRequest, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    record.method.to_lowercase().contains(needle)
        || record.url.to_lowercase().contains(needle)
        || record.status.to_string().contains(needle)
}

/// Aggregate counters for a set of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureStats {
    pub total: usize,
    pub by_method: BTreeMap<String, usize>,
    pub by_status: BTreeMap<u16, usize>,
    pub graphql: usize,
    pub websocket: usize,
    pub errors: usize,
    pub total_response_bytes: u64,
    pub total_duration: Duration,
}

impl CaptureStats {
    pub fn collect<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a CapturedRequest>,
    {
        let mut stats = Self::default();
        for record in records {
            stats.total += 1;
            *stats.by_method.entry(record.method.clone()).or_default() += 1;
            *stats.by_status.entry(record.status).or_default() += 1;
            if record.is_graphql {
                stats.graphql += 1;
            }
            if record.is_websocket {
                stats.websocket += 1;
            }
            if record.is_error() {
                stats.errors += 1;
            }
            stats.total_response_bytes = stats
                .total_response_bytes
                .saturating_add(record.response_body_size);
            stats.total_duration = stats.total_duration.saturating_add(record.duration);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::record::{Headers, PhaseTimings, ResourceType, ResponseBody};
    use chrono::Utc;

    fn record(id: &str, method: &str, url: &str, status: u16) -> CapturedRequest {
        CapturedRequest {
            id: id.to_string(),
            captured_at: Utc::now(),
            method: method.to_string(),
            url: url.to_string(),
            request_headers: Headers::new(),
            request_body: None,
            request_body_size: 0,
            status,
            status_text: String::new(),
            response_headers: Headers::new(),
            response_body: ResponseBody::Absent,
            response_body_size: 0,
            mime_type: None,
            timings: PhaseTimings::default(),
            duration: Duration::from_millis(10),
            resource_type: ResourceType::Fetch,
            is_graphql: false,
            is_websocket: false,
            is_replayed: false,
        }
    }

    fn small_store() -> CaptureStore {
        // MIN_CAPACITY is the smallest reachable bound
        CaptureStore::with_capacity(MIN_CAPACITY)
    }

    #[test]
    fn test_admit_appends_in_order() {
        let store = CaptureStore::new();
        assert!(store.admit(record("a", "GET", "https://x.test/1", 200)));
        assert!(store.admit(record("b", "GET", "https://x.test/2", 200)));

        let ids: Vec<_> = store.records().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let store = small_store();
        for i in 0..MIN_CAPACITY + 1 {
            store.admit(record(&format!("r{i}"), "GET", "https://x.test/", 200));
        }

        assert_eq!(store.len(), MIN_CAPACITY);
        assert!(store.get("r0").is_none());
        assert!(store.get("r1").is_some());
        // newest record survived
        assert!(store.get(&format!("r{MIN_CAPACITY}")).is_some());
    }

    #[test]
    fn test_eviction_purges_side_tables() {
        let store = small_store();
        store.admit(record("first", "GET", "https://x.test/", 200));
        store.toggle_favorite("first");
        store.toggle_selected("first");
        assert!(store.is_favorite("first"));
        assert!(store.is_selected("first"));

        for i in 0..MIN_CAPACITY {
            store.admit(record(&format!("r{i}"), "GET", "https://x.test/", 200));
        }

        assert!(store.get("first").is_none());
        assert!(!store.is_favorite("first"));
        assert!(!store.is_selected("first"));
    }

    #[test]
    fn test_paused_drops_silently() {
        let store = CaptureStore::new();
        store.admit(record("kept", "GET", "https://x.test/", 200));
        store.set_paused(true);
        assert!(!store.admit(record("dropped", "GET", "https://x.test/", 200)));

        assert_eq!(store.len(), 1);
        assert!(store.get("dropped").is_none());

        // resuming does not resurrect the dropped record
        store.set_paused(false);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_capacity_is_clamped() {
        let store = CaptureStore::with_capacity(5);
        assert_eq!(store.capacity(), MIN_CAPACITY);

        store.set_capacity(1_000_000);
        assert_eq!(store.capacity(), MAX_CAPACITY);
    }

    #[test]
    fn test_shrinking_capacity_evicts_oldest() {
        let store = CaptureStore::with_capacity(MAX_CAPACITY);
        for i in 0..MIN_CAPACITY + 50 {
            store.admit(record(&format!("r{i}"), "GET", "https://x.test/", 200));
        }

        store.set_capacity(MIN_CAPACITY);
        assert_eq!(store.len(), MIN_CAPACITY);
        assert!(store.get("r49").is_none());
        assert!(store.get("r50").is_some());
    }

    #[test]
    fn test_toggle_unknown_id_is_noop() {
        let store = CaptureStore::new();
        store.toggle_favorite("ghost");
        store.toggle_selected("ghost");
        assert!(!store.is_favorite("ghost"));
        assert!(!store.is_selected("ghost"));
    }

    #[test]
    fn test_toggle_flips_membership() {
        let store = CaptureStore::new();
        store.admit(record("a", "GET", "https://x.test/", 200));

        store.toggle_favorite("a");
        assert!(store.is_favorite("a"));
        store.toggle_favorite("a");
        assert!(!store.is_favorite("a"));
    }

    #[test]
    fn test_clear_empties_everything() {
        let store = CaptureStore::new();
        store.admit(record("a", "GET", "https://x.test/", 200));
        store.toggle_favorite("a");
        store.toggle_selected("a");

        store.clear();
        assert!(store.is_empty());
        assert!(!store.is_favorite("a"));
        assert!(!store.is_selected("a"));
    }

    #[test]
    fn test_filter_matches_method_url_status() {
        let store = CaptureStore::new();
        store.admit(record("a", "GET", "https://api.test/users", 200));
        store.admit(record("b", "POST", "https://api.test/users", 201));
        store.admit(record("c", "GET", "https://cdn.test/app.js", 404));

        let by_method = store.filter("post");
        assert_eq!(by_method.len(), 1);
        assert_eq!(by_method[0].id, "b");

        let by_url = store.filter("CDN.test");
        assert_eq!(by_url.len(), 1);
        assert_eq!(by_url[0].id, "c");

        let by_status = store.filter("404");
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].id, "c");
    }

    #[test]
    fn test_empty_predicate_returns_all_in_order() {
        let store = CaptureStore::new();
        store.admit(record("a", "GET", "https://x.test/1", 200));
        store.admit(record("b", "GET", "https://x.test/2", 200));

        let all = store.filter("");
        let ids: Vec<_> = all.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_select_matching_replaces_selection() {
        let store = CaptureStore::new();
        store.admit(record("a", "GET", "https://api.test/users", 200));
        store.admit(record("b", "POST", "https://api.test/users", 201));
        store.toggle_selected("a");

        store.select_matching("post");
        assert!(!store.is_selected("a"));
        assert!(store.is_selected("b"));
    }

    #[test]
    fn test_selected_records_in_capture_order() {
        let store = CaptureStore::new();
        store.admit(record("a", "GET", "https://x.test/1", 200));
        store.admit(record("b", "GET", "https://x.test/2", 200));
        store.admit(record("c", "GET", "https://x.test/3", 200));
        store.toggle_selected("c");
        store.toggle_selected("a");

        let ids: Vec<_> = store
            .selected_records()
            .iter()
            .map(|r| r.id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_stored_filter_predicate() {
        let store = CaptureStore::new();
        store.admit(record("a", "GET", "https://api.test/users", 200));
        store.admit(record("b", "GET", "https://cdn.test/app.js", 200));

        store.set_filter("api");
        assert_eq!(store.filter_text(), "api");
        let matched = store.filtered();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "a");
    }

    #[test]
    fn test_stats_aggregation() {
        let store = CaptureStore::new();
        store.admit(record("a", "GET", "https://x.test/1", 200));
        store.admit(record("b", "GET", "https://x.test/2", 500));
        let mut gql = record("c", "POST", "https://x.test/graphql", 200);
        gql.is_graphql = true;
        gql.response_body_size = 1024;
        store.admit(gql);

        let stats = store.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_method.get("GET"), Some(&2));
        assert_eq!(stats.by_method.get("POST"), Some(&1));
        assert_eq!(stats.by_status.get(&200), Some(&2));
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.graphql, 1);
        assert_eq!(stats.total_response_bytes, 1024);
        assert_eq!(stats.total_duration, Duration::from_millis(30));
    }

    #[test]
    fn test_stats_saturate_on_extreme_values() {
        let mut huge = record("a", "GET", "https://x.test/huge", 200);
        huge.duration = Duration::MAX;
        huge.response_body_size = u64::MAX;
        let small = record("b", "GET", "https://x.test/small", 200);

        let stats = CaptureStats::collect([&huge, &small]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.total_duration, Duration::MAX);
        assert_eq!(stats.total_response_bytes, u64::MAX);
    }
}
