//! Weir - capture, sanitize, and contextualize intercepted HTTP traffic
//!
//! # Usage
//!
//! ```bash
//! # Re-send a request and print the captured outcome as JSON
//! weir replay https://api.example.com/users -X POST \
//!     -H "Content-Type: application/json" -d '{"name":"ada"}'
//!
//! # Build a model-ready context document from a capture export
//! weir context captures.json
//!
//! # List the active sanitize rules
//! weir rules
//!
//! # Preview what the rules would redact in a file
//! weir rules --test response.json
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use weir_capture::capture::{Headers, RawBody, RawTimings};
use weir_capture::config::JsonFileStore;
use weir_capture::{
    CapturePipeline, CaptureStore, CapturedRequest, ContextBuilder, RawTrafficEvent,
    ReplayExecutor, ReplaySpec, SanitizeEngine, Settings, SettingsStore,
};

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Weir traffic capture toolkit
#[derive(Parser, Debug)]
#[command(name = "weir")]
#[command(
    author,
    version,
    about = "Capture, sanitize, and replay intercepted HTTP traffic"
)]
struct Cli {
    /// Settings file (JSON). Built-in defaults apply when omitted.
    #[arg(short, long, global = true, env = "WEIR_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-send a request and print the captured outcome as JSON
    Replay {
        /// Target URL
        url: String,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Request header as "Name: value" (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body, sent for POST, PUT, and PATCH
        #[arg(short = 'd', long)]
        body: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,

        /// Print the outcome without applying sanitize rules
        #[arg(long)]
        raw: bool,
    },

    /// Build a context document from a JSON capture export
    Context {
        /// File containing a JSON array of capture events
        file: PathBuf,

        /// Token budget override
        #[arg(short, long)]
        budget: Option<usize>,

        /// Build the document without applying sanitize rules
        #[arg(long)]
        raw: bool,
    },

    /// List sanitize rules, or preview them against a file
    Rules {
        /// Show what the rules would redact in this file
        #[arg(long, value_name = "FILE")]
        test: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;

    match cli.command {
        Command::Replay {
            url,
            method,
            headers,
            body,
            timeout,
            raw,
        } => run_replay(&settings, url, method, &headers, body, timeout, raw).await,
        Command::Context { file, budget, raw } => run_context(&settings, &file, budget, raw).await,
        Command::Rules { test } => run_rules(&settings, test.as_deref()),
    }
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => JsonFileStore::new(path)
            .load()
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

async fn run_replay(
    settings: &Settings,
    url: String,
    method: String,
    header_args: &[String],
    body: Option<String>,
    timeout: u64,
    raw: bool,
) -> anyhow::Result<()> {
    let spec = ReplaySpec {
        method,
        url,
        headers: parse_headers(header_args)?,
        body,
    };

    let executor = ReplayExecutor::with_timeout(Duration::from_secs(timeout));
    match executor.replay(&spec).await {
        Ok(record) => {
            let record = if raw {
                record
            } else {
                SanitizeEngine::compile(&settings.sanitize_rules).sanitize_request(&record)
            };
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Err(err) => anyhow::bail!("replay failed ({}): {err}", err.category()),
    }
}

async fn run_context(
    settings: &Settings,
    file: &Path,
    budget: Option<usize>,
    raw: bool,
) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let events: Vec<EventRecord> = serde_json::from_str(&json)
        .with_context(|| format!("{} is not a valid capture export", file.display()))?;

    let store = Arc::new(CaptureStore::with_capacity(settings.capture.capacity));
    let pipeline = CapturePipeline::new(Arc::clone(&store), &settings.capture);
    for event in events {
        pipeline.ingest(event.into_event()).await;
    }

    let engine = SanitizeEngine::compile(&settings.sanitize_rules);
    let prepared: Vec<CapturedRequest> = store
        .records()
        .iter()
        .map(|record| {
            if raw {
                (**record).clone()
            } else {
                engine.sanitize_request(record)
            }
        })
        .collect();

    let budget = budget.unwrap_or(settings.context.token_budget);
    let document = ContextBuilder::new().with_budget(budget).build(&prepared);
    if document.truncated {
        eprintln!(
            "{YELLOW}Note:{RESET} context truncated to fit the {budget} token budget \
             ({} tokens kept)",
            document.token_estimate
        );
    }
    println!("{}", document.render());
    Ok(())
}

fn run_rules(settings: &Settings, test: Option<&Path>) -> anyhow::Result<()> {
    match test {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let engine = SanitizeEngine::compile(&settings.sanitize_rules);
            let preview = engine.preview(&text);

            if preview.matched_rules.is_empty() {
                println!("{GREEN}No rules matched.{RESET}");
            } else {
                println!("{BOLD}Matched rules:{RESET}");
                for label in &preview.matched_rules {
                    println!("  {YELLOW}-{RESET} {label}");
                }
                println!();
                println!("{}", preview.output);
            }
        }
        None => {
            // an enabled rule missing from the compiled set has an invalid pattern
            let compiled = SanitizeEngine::compile(&settings.sanitize_rules).rule_ids();
            for rule in &settings.sanitize_rules {
                let state = if !rule.enabled {
                    format!("{DIM}disabled{RESET}")
                } else if compiled.contains(&rule.id) {
                    format!("{GREEN}enabled {RESET}")
                } else {
                    format!("{YELLOW}invalid {RESET}")
                };
                let origin = if rule.built_in { "built-in" } else { "custom  " };
                println!(
                    "{state}  {DIM}{origin}{RESET}  {BOLD}{:<18}{RESET}  {}",
                    rule.id, rule.label
                );
            }
        }
    }
    Ok(())
}

/// Parse repeatable `-H "Name: value"` arguments.
fn parse_headers(args: &[String]) -> anyhow::Result<Headers> {
    let mut headers = Headers::new();
    for arg in args {
        let (name, value) = arg
            .split_once(':')
            .with_context(|| format!("invalid header {arg:?}, expected \"Name: value\""))?;
        headers.insert(name.trim(), value.trim());
    }
    Ok(headers)
}

/// On-disk shape of one event in a capture export file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EventRecord {
    method: String,
    url: String,
    request_headers: Vec<(String, String)>,
    request_body: Option<String>,
    status: u16,
    status_text: String,
    response_headers: Vec<(String, String)>,
    response_body: Option<String>,
    response_body_size: Option<u64>,
    mime_type: Option<String>,
    timings: RawTimings,
    duration_ms: f64,
    resource_type: String,
}

impl EventRecord {
    fn into_event(self) -> RawTrafficEvent {
        let response_body_size = self.response_body_size.unwrap_or_else(|| {
            self.response_body
                .as_ref()
                .map(|body| body.len() as u64)
                .unwrap_or(0)
        });
        RawTrafficEvent {
            method: self.method,
            url: self.url,
            request_headers: Headers::from_pairs(self.request_headers),
            request_body: self.request_body,
            status: self.status,
            status_text: self.status_text,
            response_headers: Headers::from_pairs(self.response_headers),
            response_body: match self.response_body {
                Some(text) => RawBody::Inline(text),
                None => RawBody::None,
            },
            response_body_size,
            mime_type: self.mime_type,
            timings: self.timings,
            duration_ms: self.duration_ms,
            resource_type_hint: self.resource_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers() {
        let parsed = parse_headers(&[
            "Content-Type: application/json".to_string(),
            "X-Empty:".to_string(),
        ])
        .unwrap();
        assert_eq!(parsed.get("content-type"), Some("application/json"));
        assert_eq!(parsed.get("x-empty"), Some(""));
    }

    #[test]
    fn test_parse_headers_rejects_missing_colon() {
        assert!(parse_headers(&["NotAHeader".to_string()]).is_err());
    }

    #[test]
    fn test_event_record_accepts_sparse_json() {
        let record: EventRecord = serde_json::from_str(
            r#"{"method":"GET","url":"https://api.test/users","status":200}"#,
        )
        .unwrap();
        let event = record.into_event();
        assert_eq!(event.method, "GET");
        assert_eq!(event.status, 200);
        assert!(matches!(event.response_body, RawBody::None));
        assert_eq!(event.response_body_size, 0);
    }

    #[test]
    fn test_event_record_infers_body_size() {
        let record: EventRecord = serde_json::from_str(
            r#"{"method":"GET","url":"https://api.test/u","status":200,"responseBody":"abcd"}"#,
        )
        .unwrap();
        let event = record.into_event();
        assert_eq!(event.response_body_size, 4);
        assert!(matches!(event.response_body, RawBody::Inline(_)));
    }
}
