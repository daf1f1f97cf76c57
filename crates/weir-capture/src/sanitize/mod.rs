//! Redaction: ordered regex rules applied before anything leaves the tool.

pub mod engine;
pub mod rules;

pub use engine::{sanitize, SanitizeEngine, SanitizePreview};
pub use rules::{default_rules, merge_with_defaults, SanitizeRule};
