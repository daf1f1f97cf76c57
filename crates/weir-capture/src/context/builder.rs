//! Bounded markdown document assembly for model calls.
//!
//! Input records are expected to be sanitized already; the builder only
//! shapes and sizes, it never redacts.

use super::format::{
    clip_body, fenced_block, format_bytes, format_millis, headers_block, language_tag,
    pretty_if_json, BODY_CHAR_LIMIT,
};
use crate::capture::record::{CapturedRequest, ResponseBody};
use crate::capture::store::CaptureStats;
use serde::Serialize;

pub const DEFAULT_TOKEN_BUDGET: usize = 50_000;
/// Fixed characters-per-token ratio used for the size estimate.
pub const CHARS_PER_TOKEN: usize = 4;

pub const NO_REQUESTS_MESSAGE: &str = "No requests captured.";
pub const TRUNCATION_NOTICE: &str =
    "[Context truncated to fit the size budget; trailing requests were omitted.]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Summary,
    Request,
}

/// One markdown block of the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSection {
    pub kind: SectionKind,
    pub text: String,
}

/// The artifact handed to the model-call transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDocument {
    /// Summary first, then one section per included request.
    pub sections: Vec<ContextSection>,
    pub token_estimate: usize,
    pub truncated: bool,
}

impl ContextDocument {
    /// Full text: sections joined by blank lines, with the truncation notice
    /// appended when sections were dropped.
    pub fn render(&self) -> String {
        render_sections(&self.sections, self.truncated)
    }
}

fn render_sections(sections: &[ContextSection], truncated: bool) -> String {
    let mut text = sections
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    if truncated {
        text.push_str("\n\n");
        text.push_str(TRUNCATION_NOTICE);
    }
    text
}

pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Assembles context documents under a token budget.
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder {
    budget: usize,
    body_limit: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            budget: DEFAULT_TOKEN_BUDGET,
            body_limit: BODY_CHAR_LIMIT,
        }
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Build a document from sanitized records, in the order given. Never
    /// fails: zero records yields a document saying so.
    pub fn build<'a, I>(&self, records: I) -> ContextDocument
    where
        I: IntoIterator<Item = &'a CapturedRequest>,
    {
        let records: Vec<&CapturedRequest> = records.into_iter().collect();
        if records.is_empty() {
            return ContextDocument {
                sections: vec![ContextSection {
                    kind: SectionKind::Summary,
                    text: NO_REQUESTS_MESSAGE.to_string(),
                }],
                token_estimate: estimate_tokens(NO_REQUESTS_MESSAGE),
                truncated: false,
            };
        }

        let stats = CaptureStats::collect(records.iter().copied());
        let mut sections = Vec::with_capacity(records.len() + 1);
        sections.push(summary_section(&stats));
        for (index, record) in records.iter().enumerate() {
            sections.push(self.request_section(index + 1, record));
        }

        // Cut whole trailing request sections until the estimate fits; the
        // summary is never cut.
        let mut truncated = false;
        loop {
            let text = render_sections(&sections, truncated);
            let estimate = estimate_tokens(&text);
            if estimate <= self.budget || sections.len() <= 1 {
                return ContextDocument {
                    sections,
                    token_estimate: estimate,
                    truncated,
                };
            }
            sections.pop();
            truncated = true;
        }
    }

    fn request_section(&self, index: usize, record: &CapturedRequest) -> ContextSection {
        let mut text = format!("## {index}. {} {}\n\n", record.method, record.url);

        let mut status_line = format!("{} {}", record.status, record.status_text)
            .trim_end()
            .to_string();
        status_line.push_str(&format!(
            " | {} | {} | {}",
            format_millis(record.duration),
            format_bytes(record.response_body_size),
            record.resource_type.as_str()
        ));
        if record.is_graphql {
            status_line.push_str(" | GraphQL");
        }
        if record.is_websocket {
            status_line.push_str(" | WebSocket");
        }
        if record.is_replayed {
            status_line.push_str(" | replayed");
        }
        text.push_str(&status_line);
        text.push_str("\n\n");

        text.push_str("Request headers:\n\n");
        text.push_str(&fenced_block(&headers_block(&record.request_headers), ""));
        text.push_str("\n\n");

        if let Some(body) = &record.request_body {
            let tag = language_tag(record.request_headers.get("content-type"));
            text.push_str("Request body:\n\n");
            text.push_str(&self.body_block(body, tag));
            text.push_str("\n\n");
        }

        text.push_str("Response headers:\n\n");
        text.push_str(&fenced_block(&headers_block(&record.response_headers), ""));
        text.push_str("\n\n");

        match &record.response_body {
            ResponseBody::Resident(body) => {
                let tag = language_tag(record.mime_type.as_deref());
                text.push_str("Response body:\n\n");
                text.push_str(&self.body_block(body, tag));
            }
            ResponseBody::Absent => text.push_str("(no response body)"),
            ResponseBody::Deferred(deferred) => {
                text.push_str(&format!(
                    "(response body not loaded, {})",
                    format_bytes(deferred.size())
                ));
            }
        }

        ContextSection {
            kind: SectionKind::Request,
            text,
        }
    }

    fn body_block(&self, body: &str, tag: &str) -> String {
        let formatted = pretty_if_json(body, tag);
        fenced_block(&clip_body(&formatted, self.body_limit), tag)
    }
}

fn summary_section(stats: &CaptureStats) -> ContextSection {
    let methods = stats
        .by_method
        .iter()
        .map(|(method, count)| format!("{method} ({count})"))
        .collect::<Vec<_>>()
        .join(", ");
    let statuses = stats
        .by_status
        .iter()
        .map(|(status, count)| format!("{status} ({count})"))
        .collect::<Vec<_>>()
        .join(", ");

    let text = format!(
        "# Network capture summary\n\n\
         - Requests: {}\n\
         - Methods: {}\n\
         - Statuses: {}\n\
         - Errors (status >= 400): {}\n\
         - GraphQL: {}, WebSocket: {}\n\
         - Total response size: {}\n\
         - Total duration: {}",
        stats.total,
        methods,
        statuses,
        stats.errors,
        stats.graphql,
        stats.websocket,
        format_bytes(stats.total_response_bytes),
        format_millis(stats.total_duration),
    );

    ContextSection {
        kind: SectionKind::Summary,
        text,
    }
}
