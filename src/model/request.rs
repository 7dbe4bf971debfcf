use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{
    default_assumption_confidence, default_true, validate_session_id, Assumption, AssumptionId,
    AssumptionRef, VerificationStatus,
};
use crate::error::ValidationError;

/// Raw assumption payload as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssumptionPayload {
    /// Local id (`A<number>`)
    pub id: String,
    /// The assumption being made
    pub text: String,
    /// Defaults to true
    #[serde(default = "default_true")]
    pub critical: bool,
    /// Must lie in 0.0-1.0; defaults to 1.0
    #[serde(default = "default_assumption_confidence")]
    pub confidence: f64,
    /// Whether the assumption can be checked
    #[serde(default)]
    pub verifiable: bool,
    /// Supporting evidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// Verification outcome, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<VerificationStatus>,
}

impl AssumptionPayload {
    /// Create a payload with default flags.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
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

    /// Set the confidence (not clamped; out-of-range values fail validation)
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
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

    fn validate(self, index: usize) -> Result<Assumption, ValidationError> {
        let field = format!("assumptions[{}]", index);

        if self.id.contains(':') {
            return Err(ValidationError::value(
                format!("{}.id", field),
                &self.id,
                "assumptions can only be created with local ids (A<number>)",
            ));
        }
        let id = AssumptionId::parse(&self.id)
            .map_err(|reason| ValidationError::value(format!("{}.id", field), &self.id, reason))?;

        if self.text.trim().is_empty() {
            return Err(ValidationError::field(
                format!("{}.text", field),
                "text must be a non-empty string",
            ));
        }
        check_unit_interval(&format!("{}.confidence", field), self.confidence)?;

        Ok(Assumption {
            id,
            text: self.text,
            critical: self.critical,
            confidence: self.confidence,
            verifiable: self.verifiable,
            evidence: self.evidence,
            verification_status: self.verification_status,
        })
    }
}

/// One request from the external caller, before validation.
///
/// Counters are signed so that zero and negative values reach validation and
/// fail with a field-level error instead of a deserialization error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThoughtRequest {
    /// The thinking step text (required)
    pub thought: String,
    /// Estimated total thoughts (required, >= 1)
    pub total_thoughts: i64,
    /// Session handle; a new session is created when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Override for auto-numbering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_number: Option<i64>,
    /// Confidence in this step (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Doubts or concerns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty_notes: Option<String>,
    /// What was achieved or expected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    /// Explicit revision flag; implied by `revises_thought`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_revision: Option<bool>,
    /// Thought being revised
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revises_thought: Option<i64>,
    /// Thought to branch from (requires `branch_id`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_from_thought: Option<i64>,
    /// Branch identifier (requires `branch_from_thought`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    /// Assumptions to create or update
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assumptions: Vec<AssumptionPayload>,
    /// `A<n>` or `<handle>:A<n>` ids this thought relies on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on_assumptions: Vec<String>,
    /// `A<n>` or `<handle>:A<n>` ids proven false
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalidates_assumptions: Vec<String>,
    /// Hint that the estimate was too low
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_more_thoughts: Option<bool>,
    /// Override for the derived next-needed flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_thought_needed: Option<bool>,
}

/// Branch origin of a validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSpec {
    /// Thought the branch diverges from.
    pub from_thought: u32,
    /// Branch identifier.
    pub branch_id: String,
}

/// A request whose fields have passed local validation.
///
/// Produced only by [`ThoughtRequest::validate`]; the session layer never
/// sees unvalidated input.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    /// Session to continue, `None` to start one.
    pub session_id: Option<String>,
    /// Non-blank thought text.
    pub thought: String,
    /// Caller's total estimate.
    pub total_thoughts: u32,
    /// Explicit number, `None` for auto-numbering.
    pub thought_number: Option<u32>,
    /// Confidence in this step.
    pub confidence: Option<f64>,
    /// Doubts or concerns.
    pub uncertainty_notes: Option<String>,
    /// What was achieved or expected.
    pub outcome: Option<String>,
    /// Resolved revision flag.
    pub is_revision: bool,
    /// Thought being revised.
    pub revises_thought: Option<u32>,
    /// Branch origin, when branching.
    pub branch: Option<BranchSpec>,
    /// Validated assumption payload.
    pub assumptions: Vec<Assumption>,
    /// Parsed dependency references.
    pub depends_on: Vec<AssumptionRef>,
    /// Parsed invalidation references.
    pub invalidates: Vec<AssumptionRef>,
    /// Caller hint, stored only.
    pub needs_more_thoughts: Option<bool>,
    /// Override for the derived next-needed flag.
    pub next_thought_needed: Option<bool>,
}

impl ThoughtRequest {
    /// Create a request with the two required fields.
    pub fn new(thought: impl Into<String>, total_thoughts: i64) -> Self {
        Self {
            thought: thought.into(),
            total_thoughts,
            ..Default::default()
        }
    }

    /// Continue an existing session
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Override the thought number
    pub fn with_thought_number(mut self, number: i64) -> Self {
        self.thought_number = Some(number);
        self
    }

    /// Set the confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Mark as a revision of an earlier thought
    pub fn revising(mut self, thought_number: i64) -> Self {
        self.is_revision = Some(true);
        self.revises_thought = Some(thought_number);
        self
    }

    /// Branch from an earlier thought
    pub fn branching(mut self, from_thought: i64, branch_id: impl Into<String>) -> Self {
        self.branch_from_thought = Some(from_thought);
        self.branch_id = Some(branch_id.into());
        self
    }

    /// Add an assumption payload
    pub fn with_assumption(mut self, assumption: AssumptionPayload) -> Self {
        self.assumptions.push(assumption);
        self
    }

    /// Add a dependency on an assumption id
    pub fn depending_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on_assumptions.push(id.into());
        self
    }

    /// Mark an assumption id as proven false
    pub fn invalidating(mut self, id: impl Into<String>) -> Self {
        self.invalidates_assumptions.push(id.into());
        self
    }

    /// Override the next-needed flag
    pub fn with_next_needed(mut self, next_needed: bool) -> Self {
        self.next_thought_needed = Some(next_needed);
        self
    }

    /// Validate every field locally and produce a [`ValidatedRequest`].
    pub fn validate(self) -> Result<ValidatedRequest, ValidationError> {
        if self.thought.trim().is_empty() {
            return Err(ValidationError::field(
                "thought",
                "thought must be a non-empty string",
            ));
        }

        let total_thoughts = positive("total_thoughts", self.total_thoughts)?;
        let thought_number = self
            .thought_number
            .map(|n| positive("thought_number", n))
            .transpose()?;

        if let Some(session_id) = &self.session_id {
            validate_session_id(session_id)?;
        }
        if let Some(confidence) = self.confidence {
            check_unit_interval("confidence", confidence)?;
        }

        let revises_thought = self
            .revises_thought
            .map(|n| positive("revises_thought", n))
            .transpose()?;
        let is_revision = match (self.is_revision, revises_thought) {
            (Some(false), Some(target)) => {
                return Err(ValidationError::value(
                    "revises_thought",
                    target.to_string(),
                    "revises_thought requires is_revision",
                ));
            }
            (Some(flag), _) => flag,
            (None, target) => target.is_some(),
        };

        let branch = match (self.branch_from_thought, self.branch_id) {
            (None, None) => None,
            (Some(from), Some(branch_id)) => {
                let from_thought = positive("branch_from_thought", from)?;
                if branch_id.trim().is_empty() {
                    return Err(ValidationError::field(
                        "branch_id",
                        "branch_id must be a non-empty string",
                    ));
                }
                Some(BranchSpec {
                    from_thought,
                    branch_id,
                })
            }
            (Some(from), None) => {
                return Err(ValidationError::value(
                    "branch_id",
                    from.to_string(),
                    "branch_from_thought requires branch_id",
                ));
            }
            (None, Some(branch_id)) => {
                return Err(ValidationError::value(
                    "branch_from_thought",
                    branch_id,
                    "branch_id requires branch_from_thought",
                ));
            }
        };

        let mut seen = HashSet::new();
        let mut assumptions = Vec::with_capacity(self.assumptions.len());
        for (index, payload) in self.assumptions.into_iter().enumerate() {
            let assumption = payload.validate(index)?;
            if !seen.insert(assumption.id.clone()) {
                return Err(ValidationError::value(
                    format!("assumptions[{}].id", index),
                    assumption.id.as_str(),
                    "duplicate assumption id in request",
                ));
            }
            assumptions.push(assumption);
        }

        let depends_on = parse_refs("depends_on_assumptions", &self.depends_on_assumptions)?;
        let invalidates = parse_refs("invalidates_assumptions", &self.invalidates_assumptions)?;

        Ok(ValidatedRequest {
            session_id: self.session_id,
            thought: self.thought,
            total_thoughts,
            thought_number,
            confidence: self.confidence,
            uncertainty_notes: self.uncertainty_notes,
            outcome: self.outcome,
            is_revision,
            revises_thought,
            branch,
            assumptions,
            depends_on,
            invalidates,
            needs_more_thoughts: self.needs_more_thoughts,
            next_thought_needed: self.next_thought_needed,
        })
    }
}

fn positive(field: &str, value: i64) -> Result<u32, ValidationError> {
    if value < 1 {
        return Err(ValidationError::value(
            field,
            value.to_string(),
            "must be greater than or equal to 1",
        ));
    }
    u32::try_from(value)
        .map_err(|_| ValidationError::value(field, value.to_string(), "value is too large"))
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::value(
            field,
            value.to_string(),
            "must be between 0.0 and 1.0",
        ));
    }
    Ok(())
}

fn parse_refs(field: &str, raw: &[String]) -> Result<Vec<AssumptionRef>, ValidationError> {
    let mut refs: Vec<AssumptionRef> = Vec::with_capacity(raw.len());
    for id in raw {
        let reference =
            AssumptionRef::parse(id).map_err(|reason| ValidationError::value(field, id, reason))?;
        // repeated ids collapse to one edge
        if !refs.contains(&reference) {
            refs.push(reference);
        }
    }
    Ok(refs)
}
