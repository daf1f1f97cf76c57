//! Replay: re-issue an edited request and shape the outcome into a record.

pub mod executor;
pub mod headers;

pub use executor::{ReplayError, ReplayExecutor, ReplaySpec, DEFAULT_TIMEOUT};
pub use headers::{is_forbidden, strip_forbidden};
