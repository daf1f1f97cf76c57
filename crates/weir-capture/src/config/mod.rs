//! Settings consumed by the capture pipeline.
//!
//! Persistence goes through the [`SettingsStore`] contract; the core only
//! ever sees a loaded [`Settings`] value.

mod patterns;
mod store;

pub use patterns::ExcludePatterns;
pub use store::{JsonFileStore, SettingsError, SettingsStore};

use crate::capture::body_loader::DEFAULT_INLINE_THRESHOLD;
use crate::capture::record::ResourceType;
use crate::capture::store::{DEFAULT_CAPACITY, MAX_CAPACITY, MIN_CAPACITY};
use crate::context::builder::DEFAULT_TOKEN_BUDGET;
use crate::sanitize::rules::{default_rules, merge_with_defaults, SanitizeRule};
use serde::{Deserialize, Serialize};

/// Everything a hosting layer can configure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub capture: CaptureSettings,
    /// Ordered rule list; order is the application order.
    pub sanitize_rules: Vec<SanitizeRule>,
    pub context: ContextSettings,
    /// Active model provider id, passed through to the call transport.
    pub provider: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            capture: CaptureSettings::default(),
            sanitize_rules: default_rules(),
            context: ContextSettings::default(),
            provider: "anthropic".to_string(),
        }
    }
}

impl Settings {
    /// Bring a loaded value back into range: clamp the capacity and
    /// reconcile the rule list with the built-in set.
    pub fn normalized(mut self) -> Self {
        self.capture.capacity = self.capture.capacity.clamp(MIN_CAPACITY, MAX_CAPACITY);
        self.sanitize_rules = merge_with_defaults(self.sanitize_rules);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    pub scope: CaptureScope,
    pub capacity: usize,
    /// Glob-or-regex strings tested against the full URL.
    pub exclude_patterns: Vec<String>,
    /// Response bodies at or above this many bytes stay deferred.
    pub inline_body_threshold: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            scope: CaptureScope::Everything,
            capacity: DEFAULT_CAPACITY,
            exclude_patterns: Vec::new(),
            inline_body_threshold: DEFAULT_INLINE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextSettings {
    pub token_budget: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            token_budget: DEFAULT_TOKEN_BUDGET,
        }
    }
}

/// Which resource types passive capture admits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureScope {
    #[default]
    Everything,
    /// Only XHR and fetch traffic, the usual API-debugging view.
    XhrFetchOnly,
}

impl CaptureScope {
    pub fn includes(self, resource_type: ResourceType) -> bool {
        match self {
            Self::Everything => true,
            Self::XhrFetchOnly => {
                matches!(resource_type, ResourceType::Xhr | ResourceType::Fetch)
            }
        }
    }
}
