use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Assumption;

/// Result of processing one thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtResponse {
    /// Session handle for continuation.
    pub session_id: String,
    /// Resolved number of the recorded thought.
    pub thought_number: u32,
    /// Total estimate after any upward adjustment.
    pub total_thoughts: u32,
    /// Whether another thought is expected.
    pub next_thought_needed: bool,
    /// Active branch identifiers.
    pub branches: Vec<String>,
    /// Number of thoughts in the session.
    pub thought_history_length: usize,
    /// Echoed confidence of the thought.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Echoed uncertainty notes.
    #[serde(default)]
    pub uncertainty_notes: Option<String>,
    /// Echoed outcome.
    #[serde(default)]
    pub outcome: Option<String>,
    /// Every assumption tracked in the session.
    #[serde(default)]
    pub all_assumptions: BTreeMap<String, Assumption>,
    /// Critical, low-confidence, unverified assumption ids.
    #[serde(default)]
    pub risky_assumptions: Vec<String>,
    /// Assumption ids known to be false.
    #[serde(default)]
    pub falsified_assumptions: Vec<String>,
    /// Cross-session references that could not be resolved.
    #[serde(default)]
    pub unresolved_references: Vec<String>,
    /// Warnings raised while resolving cross-session references.
    #[serde(default)]
    pub cross_session_warnings: Vec<String>,
}
