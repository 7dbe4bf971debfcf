//! Command-line surface for the engine.
//!
//! Maps flags onto a [`ThoughtRequest`], runs it through a
//! [`ThinkingEngine`] and renders either the response or an
//! [`ErrorReport`](crate::error::ErrorReport) as JSON.

use clap::Parser;
use serde::de::DeserializeOwned;

use crate::engine::ThinkingEngine;
use crate::error::{AppError, ValidationError};
use crate::model::{AssumptionPayload, ThoughtRequest};
use crate::storage::Storage;

/// CLI for dynamic problem-solving through sequential thoughts.
///
/// Output is always JSON.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ultrathink", disable_version_flag = true)]
pub struct Cli {
    /// Your current thinking step (required)
    #[arg(short = 't', long)]
    pub thought: Option<String>,

    /// Total thoughts estimated/needed (required)
    #[arg(short = 'n', long = "total")]
    pub total: Option<i64>,

    /// Session ID for continuity (omit to create new session)
    #[arg(short = 's', long)]
    pub session_id: Option<String>,

    /// Override auto-numbering (auto-assigned if omitted)
    #[arg(long)]
    pub thought_number: Option<i64>,

    /// Confidence level (0.0-1.0)
    #[arg(short = 'c', long)]
    pub confidence: Option<f64>,

    /// Mark this thought as a revision
    #[arg(long, overrides_with = "no_revision")]
    pub is_revision: bool,

    /// Clear the revision flag
    #[arg(long, overrides_with = "is_revision", hide = true)]
    pub no_revision: bool,

    /// Thought number being revised (use with --is-revision)
    #[arg(long)]
    pub revises: Option<i64>,

    /// Thought number to branch from
    #[arg(long)]
    pub branch_from: Option<i64>,

    /// Identifier for the branch (use with --branch-from)
    #[arg(long)]
    pub branch_id: Option<String>,

    /// Explanation for doubts or concerns
    #[arg(long)]
    pub uncertainty_notes: Option<String>,

    /// What was achieved or expected
    #[arg(long)]
    pub outcome: Option<String>,

    /// JSON array of assumption objects
    #[arg(long)]
    pub assumptions: Option<String>,

    /// JSON array of assumption IDs this thought depends on
    #[arg(long)]
    pub depends_on: Option<String>,

    /// JSON array of assumption IDs proven false
    #[arg(long)]
    pub invalidates: Option<String>,

    /// Flag if more thoughts are needed beyond estimate
    #[arg(long, overrides_with = "no_needs_more")]
    pub needs_more: bool,

    /// Clear the needs-more flag
    #[arg(long, overrides_with = "needs_more", hide = true)]
    pub no_needs_more: bool,

    /// Override auto-assignment of next_thought_needed
    #[arg(long, overrides_with = "no_next_needed")]
    pub next_needed: bool,

    /// Force next_thought_needed to false
    #[arg(long, overrides_with = "next_needed", hide = true)]
    pub no_next_needed: bool,

    /// Directory holding session records (overrides ULTRATHINK_SESSIONS_DIR)
    #[arg(long)]
    pub sessions_dir: Option<std::path::PathBuf>,

    /// Show version and exit
    #[arg(short = 'v', long)]
    pub version: bool,
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: u8,
    /// JSON document to print
    pub output: String,
}

impl CliResult {
    /// Create a success result with the given output.
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: output.into(),
        }
    }

    /// Create an error result rendered from an application error.
    pub fn failure(err: &AppError) -> Self {
        let output = serde_json::to_string_pretty(&err.report())
            .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err.kind()));
        Self {
            exit_code: 1,
            output,
        }
    }

    /// Whether the result should be written to stderr.
    pub fn is_error(&self) -> bool {
        self.exit_code != 0
    }
}

impl Cli {
    /// True when neither a thought nor the version flag was supplied.
    pub fn wants_help(&self) -> bool {
        !self.version && self.thought.is_none() && self.total.is_none()
    }

    /// Convert flags into a request.
    pub fn into_request(self) -> Result<ThoughtRequest, ValidationError> {
        let thought = self
            .thought
            .ok_or_else(|| ValidationError::field("thought", "--thought is required"))?;
        let total_thoughts = self
            .total
            .ok_or_else(|| ValidationError::field("total_thoughts", "--total is required"))?;

        Ok(ThoughtRequest {
            thought,
            total_thoughts,
            session_id: self.session_id,
            thought_number: self.thought_number,
            confidence: self.confidence,
            uncertainty_notes: self.uncertainty_notes,
            outcome: self.outcome,
            is_revision: flag_pair(self.is_revision, self.no_revision),
            revises_thought: self.revises,
            branch_from_thought: self.branch_from,
            branch_id: self.branch_id,
            assumptions: parse_json_list::<AssumptionPayload>(
                "assumptions",
                self.assumptions.as_deref(),
            )?,
            depends_on_assumptions: parse_json_list(
                "depends_on_assumptions",
                self.depends_on.as_deref(),
            )?,
            invalidates_assumptions: parse_json_list(
                "invalidates_assumptions",
                self.invalidates.as_deref(),
            )?,
            needs_more_thoughts: flag_pair(self.needs_more, self.no_needs_more),
            next_thought_needed: flag_pair(self.next_needed, self.no_next_needed),
        })
    }
}

/// Collapse a `--flag/--no-flag` pair into an optional override.
fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

/// Parse a JSON-array option. Absent, empty and `null` all mean "no items".
pub fn parse_json_list<T: DeserializeOwned>(
    field: &str,
    raw: Option<&str>,
) -> Result<Vec<T>, ValidationError> {
    let raw = match raw.map(str::trim) {
        None | Some("") | Some("null") => return Ok(Vec::new()),
        Some(raw) => raw,
    };

    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
        ValidationError::value(field, raw, format!("must be valid JSON. Error: {}", e))
    })?;
    if !value.is_array() {
        return Err(ValidationError::value(field, raw, "must be a JSON array"));
    }
    serde_json::from_value(value).map_err(|e| ValidationError::value(field, raw, e.to_string()))
}

/// Version document printed by `--version`.
pub fn version_json() -> String {
    serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }).to_string()
}

/// Execute one invocation against the given engine.
pub async fn execute<S: Storage>(cli: Cli, engine: &ThinkingEngine<S>) -> CliResult {
    if cli.version {
        return CliResult::success(version_json());
    }

    let request = match cli.into_request() {
        Ok(request) => request,
        Err(e) => return CliResult::failure(&AppError::from(e)),
    };

    match engine.handle(request).await {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(json) => CliResult::success(json),
            Err(e) => CliResult::failure(&AppError::Internal {
                message: e.to_string(),
            }),
        },
        Err(e) => CliResult::failure(&e),
    }
}
