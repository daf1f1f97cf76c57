//! Capture pipeline: raw traffic events in, normalized records in a bounded
//! store out.

pub mod body_loader;
pub mod classify;
pub mod event;
pub mod pipeline;
pub mod record;
pub mod store;

pub use body_loader::{BodyLoader, DEFAULT_INLINE_THRESHOLD};
pub use classify::{classify, Classification};
pub use event::{RawBody, RawTimings, RawTrafficEvent};
pub use pipeline::CapturePipeline;
pub use record::{
    BodyFetch, BodyFetchError, CapturedRequest, DeferredBody, Headers, PhaseTimings,
    ResourceType, ResponseBody,
};
pub use store::{CaptureStats, CaptureStore, DEFAULT_CAPACITY, MAX_CAPACITY, MIN_CAPACITY};
