//! Weir: bounded capture, redaction, and model-context assembly for
//! intercepted HTTP and WebSocket traffic.
//!
//! The pipeline is capture -> classify -> store, with three consumers:
//! redaction + context building for model calls, and replay for re-issuing
//! edited requests. The store is the only shared mutable state; everything
//! else is a pure function over its inputs.

pub mod capture;
pub mod config;
pub mod context;
pub mod replay;
pub mod sanitize;

// Re-export the surface a hosting layer wires together
pub use capture::{CapturePipeline, CaptureStore, CapturedRequest, RawTrafficEvent};
pub use config::{Settings, SettingsStore};
pub use context::{ContextBuilder, ContextDocument};
pub use replay::{ReplayError, ReplayExecutor, ReplaySpec};
pub use sanitize::{SanitizeEngine, SanitizeRule};
