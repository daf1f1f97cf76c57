//! Sanitization rule definitions and the built-in default set.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One redaction directive. Rules run in list order, each over the output of
/// the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeRule {
    pub id: String,
    pub label: String,
    /// Regular expression, compiled case-insensitively at apply time.
    pub pattern: String,
    /// Replacement text; may reference capture groups as `$1`, `$2`.
    pub replacement: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Built-in rules may be disabled but never deleted.
    #[serde(default)]
    pub built_in: bool,
}

fn default_enabled() -> bool {
    true
}

impl SanitizeRule {
    /// A user-defined rule, enabled from the start.
    pub fn custom(
        id: impl Into<String>,
        label: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            pattern: pattern.into(),
            replacement: replacement.into(),
            enabled: true,
            built_in: false,
        }
    }

    fn built_in(id: &str, label: &str, pattern: &str, replacement: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            enabled: true,
            built_in: true,
        }
    }
}

/// The built-in rule set, most specific first so a narrow match (a whole
/// private key block) is consumed before a broader rule can split it.
pub fn default_rules() -> Vec<SanitizeRule> {
    vec![
        SanitizeRule::built_in(
            "private-key",
            "Private key block",
            r"-----BEGIN [A-Z ]*PRIVATE KEY-----[\s\S]*?-----END [A-Z ]*PRIVATE KEY-----",
            "[REDACTED PRIVATE KEY]",
        ),
        SanitizeRule::built_in(
            "aws-access-key",
            "AWS access key id",
            r"\b(AKIA|ASIA)[0-9A-Z]{16}\b",
            "[REDACTED]",
        ),
        SanitizeRule::built_in(
            "bearer-token",
            "Bearer token",
            r"bearer\s+[a-z0-9._~+/\-]+=*",
            "Bearer [REDACTED]",
        ),
        SanitizeRule::built_in(
            "auth-scheme",
            "Authorization credentials",
            r"(basic|digest|negotiate|ntlm)\s+[a-z0-9+/=._\-]+",
            "$1 [REDACTED]",
        ),
        SanitizeRule::built_in(
            "json-secret",
            "Secret and token fields",
            r#""(access_token|refresh_token|id_token|client_secret|api_key|apikey|token|secret)"\s*:\s*"[^"]*""#,
            r#""$1": "[REDACTED]""#,
        ),
        SanitizeRule::built_in(
            "password",
            "Password fields",
            r#""(password|passwd|pwd)"\s*:\s*"[^"]*""#,
            r#""$1": "[REDACTED]""#,
        ),
        SanitizeRule::built_in(
            "api-key",
            "API key assignment",
            r#"(api[_-]?key|apikey|x-api-key)(["']?\s*[:=]\s*["']?)[a-z0-9_\-]{8,}"#,
            "$1$2[REDACTED]",
        ),
        SanitizeRule::built_in(
            "session-cookie",
            "Session cookie value",
            r#"\b(session_id|sessionid|jsessionid|phpsessid|csrftoken|xsrf-token|auth_token|session|sid)=[^;\s"]+"#,
            "$1=[REDACTED]",
        ),
    ]
}

/// Reconcile a persisted rule list with the built-in set. Stored built-ins
/// keep their position and enabled flag but are restored to their canonical
/// pattern and replacement; built-ins missing from storage are appended;
/// stored rules claiming to be built-in under an unknown id are dropped.
pub fn merge_with_defaults(stored: Vec<SanitizeRule>) -> Vec<SanitizeRule> {
    let defaults = default_rules();
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<SanitizeRule> = Vec::with_capacity(stored.len() + defaults.len());

    for rule in stored {
        if let Some(canonical) = defaults.iter().find(|d| d.id == rule.id) {
            if seen.insert(rule.id.clone()) {
                let mut kept = canonical.clone();
                kept.enabled = rule.enabled;
                merged.push(kept);
            }
        } else if !rule.built_in {
            merged.push(rule);
        }
        // stale built-in ids fall through and disappear
    }

    for canonical in defaults {
        if !seen.contains(&canonical.id) {
            merged.push(canonical);
        }
    }
    merged
}
