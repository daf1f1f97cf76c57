//! URL exclusion patterns: direct regex first, glob-style fallback.

use regex::Regex;
use tracing::warn;

/// Compiled exclusion list tested against full URLs.
#[derive(Debug, Default)]
pub struct ExcludePatterns {
    compiled: Vec<Regex>,
}

impl ExcludePatterns {
    /// Compile each pattern as a regular expression; when that fails, retry
    /// with glob-style escaping (`*` matches any run, `?` any character).
    /// Patterns failing both ways are skipped with a warning.
    pub fn compile(patterns: &[String]) -> Self {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            if pattern.is_empty() {
                continue;
            }
            match Regex::new(pattern) {
                Ok(regex) => compiled.push(regex),
                Err(_) => match Regex::new(&glob_to_regex(pattern)) {
                    Ok(regex) => compiled.push(regex),
                    Err(err) => {
                        warn!(%pattern, %err, "skipping unusable exclusion pattern");
                    }
                },
            }
        }
        Self { compiled }
    }

    pub fn matches(&self, url: &str) -> bool {
        self.compiled.iter().any(|regex| regex.is_match(url))
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// Unanchored translation, so `*.example.com` behaves as a substring
/// wildcard against full URLs.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    for ch in glob.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(&ch.to_string())),
        }
    }
    out
}
