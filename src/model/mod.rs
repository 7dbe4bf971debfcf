//! Domain model for sequential reasoning sessions.
//!
//! This module defines the value types that flow through the engine:
//! assumption identifiers and references, [`Assumption`], [`Thought`],
//! the persisted [`SessionRecord`], plus the request/response shapes in
//! [`request`] and [`response`]. Everything here is pure construction and
//! local validation; nothing consults other thoughts or storage.

mod request;
mod response;


pub use request::*;
pub use response::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of a session handle.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Assumptions below this confidence are candidates for the risky set.
pub const RISK_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Check a session handle against the allow-list.
///
/// Returns the reason the handle is rejected, or `None` when it is usable as
/// a record key. Only ASCII letters, digits, `-` and `_` are accepted, so a
/// valid handle can never contain a path separator or `..` segment.
pub fn session_id_violation(session_id: &str) -> Option<String> {
    if session_id.is_empty() {
        return Some("Session ID cannot be empty".to_string());
    }
    if session_id.len() > MAX_SESSION_ID_LEN {
        return Some(format!(
            "Session ID too long (max {} characters)",
            MAX_SESSION_ID_LEN
        ));
    }
    if !session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Some(
            "must contain only alphanumeric characters, hyphens, and underscores".to_string(),
        );
    }
    None
}

/// A local assumption identifier of the form `A<number>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssumptionId(String);

impl AssumptionId {
    /// Parse a local assumption id.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let digits = raw
            .strip_prefix('A')
            .ok_or_else(|| format!("'{}' must match A<number> (e.g. 'A1')", raw))?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("'{}' must match A<number> (e.g. 'A1')", raw));
        }
        Ok(Self(raw.to_string()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AssumptionId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AssumptionId> for String {
    fn from(id: AssumptionId) -> Self {
        id.0
    }
}

impl std::fmt::Display for AssumptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An assumption owned by another session, addressed as `<handle>:A<number>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrossSessionRef {
    /// Handle of the owning session.
    pub session_id: String,
    /// Assumption id inside the owning session.
    pub assumption_id: AssumptionId,
}

impl std::fmt::Display for CrossSessionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.session_id, self.assumption_id)
    }
}

/// Reference to an assumption from a thought's `depends_on` or
/// `invalidates` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AssumptionRef {
    /// Assumption in the same session.
    Local(AssumptionId),
    /// Assumption in another session (read-only).
    CrossSession(CrossSessionRef),
}

impl AssumptionRef {
    /// Parse `A<n>` or `<handle>:A<n>`, splitting at the first colon.
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.split_once(':') {
            None => AssumptionId::parse(raw).map(AssumptionRef::Local),
            Some((session_id, local)) => {
                if let Some(reason) = session_id_violation(session_id) {
                    return Err(format!("'{}' has an invalid session part: {}", raw, reason));
                }
                let assumption_id = AssumptionId::parse(local)?;
                Ok(AssumptionRef::CrossSession(CrossSessionRef {
                    session_id: session_id.to_string(),
                    assumption_id,
                }))
            }
        }
    }

    /// Local id, if this reference stays inside the session.
    pub fn as_local(&self) -> Option<&AssumptionId> {
        match self {
            AssumptionRef::Local(id) => Some(id),
            AssumptionRef::CrossSession(_) => None,
        }
    }
}

impl TryFrom<String> for AssumptionRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AssumptionRef> for String {
    fn from(reference: AssumptionRef) -> Self {
        reference.to_string()
    }
}

impl std::fmt::Display for AssumptionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssumptionRef::Local(id) => write!(f, "{}", id),
            AssumptionRef::CrossSession(r) => write!(f, "{}", r),
        }
    }
}

/// Verification state of an assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Not yet checked.
    Unverified,
    /// Checked and holds.
    VerifiedTrue,
    /// Checked and does not hold.
    VerifiedFalse,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Unverified => write!(f, "unverified"),
            VerificationStatus::VerifiedTrue => write!(f, "verified_true"),
            VerificationStatus::VerifiedFalse => write!(f, "verified_false"),
        }
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unverified" => Ok(VerificationStatus::Unverified),
            "verified_true" => Ok(VerificationStatus::VerifiedTrue),
            "verified_false" => Ok(VerificationStatus::VerifiedFalse),
            _ => Err(format!("Unknown verification status: {}", s)),
        }
    }
}

/// A falsifiable premise underlying one or more thoughts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumption {
    /// Local identifier (`A<number>`), immutable once created.
    pub id: AssumptionId,
    /// The assumption being made.
    pub text: String,
    /// Whether the reasoning collapses if this assumption is false.
    #[serde(default = "default_true")]
    pub critical: bool,
    /// Confidence (0.0-1.0) that the assumption holds.
    #[serde(default = "default_assumption_confidence")]
    pub confidence: f64,
    /// Whether the assumption can be checked by testing or research.
    #[serde(default)]
    pub verifiable: bool,
    /// Why the assumption is believed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// Verification outcome, if any.
    #[serde(default)]
    pub verification_status: Option<VerificationStatus>,
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_assumption_confidence() -> f64 {
    1.0
}

impl Assumption {
    /// Create an assumption with default flags (critical, full confidence).
    pub fn new(id: AssumptionId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            critical: true,
            confidence: default_assumption_confidence(),
            verifiable: false,
            evidence: None,
            verification_status: None,
        }
    }

    /// Set the critical flag
    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    /// Set the confidence, clamped to 0.0-1.0
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the verifiable flag
    pub fn with_verifiable(mut self, verifiable: bool) -> Self {
        self.verifiable = verifiable;
        self
    }

    /// Set the evidence
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    /// Set the verification status
    pub fn with_status(mut self, status: VerificationStatus) -> Self {
        self.verification_status = Some(status);
        self
    }

    /// Whether the assumption has been checked either way.
    pub fn is_verified(&self) -> bool {
        matches!(
            self.verification_status,
            Some(VerificationStatus::VerifiedTrue) | Some(VerificationStatus::VerifiedFalse)
        )
    }

    /// Whether the assumption has been proven false.
    pub fn is_falsified(&self) -> bool {
        self.verification_status == Some(VerificationStatus::VerifiedFalse)
    }

    /// Critical, below the confidence threshold, and not verified true.
    pub fn is_risky(&self) -> bool {
        self.critical
            && self.confidence < RISK_CONFIDENCE_THRESHOLD
            && self.verification_status != Some(VerificationStatus::VerifiedTrue)
    }
}

/// One immutable step in a reasoning sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thought {
    /// The thinking step text.
    pub thought: String,
    /// Position in the sequence.
    pub thought_number: u32,
    /// Total estimate at the time this thought was recorded.
    pub total_thoughts: u32,
    /// Whether another step was expected after this one.
    pub next_thought_needed: bool,
    /// Whether this thought revises an earlier one.
    #[serde(default)]
    pub is_revision: bool,
    /// Number of the thought being revised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revises_thought: Option<u32>,
    /// Number of the thought this branch starts from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_from_thought: Option<u32>,
    /// Branch identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    /// Caller hint that the estimate was too low.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_more_thoughts: Option<bool>,
    /// Confidence (0.0-1.0) in this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Doubts or concerns about this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty_notes: Option<String>,
    /// What was achieved or expected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    /// Assumption payload carried by this thought, as submitted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assumptions: Vec<Assumption>,
    /// Assumptions this thought relies on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on_assumptions: Vec<AssumptionRef>,
    /// Assumptions this thought proves false.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalidates_assumptions: Vec<AssumptionRef>,
}

impl Thought {
    /// Whether this thought starts or continues a named branch.
    pub fn is_branch(&self) -> bool {
        self.branch_from_thought.is_some() && self.branch_id.is_some()
    }

    /// Whether this thought ends the sequence.
    pub fn is_final(&self) -> bool {
        !self.next_thought_needed
    }
}

/// Durable shape of one session, as written by [`crate::storage::Storage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session handle.
    pub session_id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last recorded thought.
    pub updated_at: DateTime<Utc>,
    /// Ordered, append-only thought history.
    #[serde(default)]
    pub thoughts: Vec<Thought>,
    /// Assumptions keyed by local id.
    #[serde(default)]
    pub assumptions: std::collections::BTreeMap<String, Assumption>,
    /// Active branch ids in first-seen order.
    #[serde(default)]
    pub branches: Vec<String>,
    /// Cross-session references that could not be resolved.
    #[serde(default)]
    pub unresolved_references: Vec<String>,
    /// Warnings raised while resolving cross-session references.
    #[serde(default)]
    pub cross_session_warnings: Vec<String>,
}

impl SessionRecord {
    /// Create an empty record for the given handle.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            created_at: now,
            updated_at: now,
            thoughts: Vec::new(),
            assumptions: std::collections::BTreeMap::new(),
            branches: Vec::new(),
            unresolved_references: Vec::new(),
            cross_session_warnings: Vec::new(),
        }
    }
}

/// Validate a session handle supplied in a request.
pub(crate) fn validate_session_id(session_id: &str) -> Result<(), ValidationError> {
    match session_id_violation(session_id) {
        Some(reason) => Err(ValidationError::value("session_id", session_id, reason)),
        None => Ok(()),
    }
}
