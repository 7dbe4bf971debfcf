//! Session state aggregate.
//!
//! [`SessionState`] holds every thought and assumption of one session and
//! enforces the cross-entity invariants: revision and branch targets must
//! already exist, local assumption references must resolve, assumption core
//! fields stay immutable. Cross-session references are not resolved here;
//! [`SessionState::apply`] hands them back as [`PendingReference`]s for the
//! engine to resolve against storage.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::Utc;
use tracing::debug;

use crate::error::ReferenceError;
use crate::model::{
    Assumption, AssumptionRef, CrossSessionRef, SessionRecord, Thought, ValidatedRequest,
    VerificationStatus,
};

/// Which thought field a cross-session reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceRelation {
    /// Listed in `depends_on_assumptions`.
    DependsOn,
    /// Listed in `invalidates_assumptions`.
    Invalidates,
}

/// A cross-session reference collected during [`SessionState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReference {
    /// The foreign `handle:A<n>` reference.
    pub reference: CrossSessionRef,
    /// Field the reference was listed in.
    pub relation: ReferenceRelation,
}

/// Outcome of a successful [`SessionState::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedThought {
    /// The thought as appended to history.
    pub thought: Thought,
    /// Cross-session references left for the caller to resolve.
    pub pending: Vec<PendingReference>,
}

/// In-memory aggregate of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    record: SessionRecord,
}

impl SessionState {
    /// Start an empty session under the given handle.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            record: SessionRecord::new(session_id),
        }
    }

    /// Rebuild the aggregate from a persisted record.
    pub fn from_record(record: SessionRecord) -> Self {
        Self { record }
    }

    /// Session handle.
    pub fn session_id(&self) -> &str {
        &self.record.session_id
    }

    /// Borrow the durable representation.
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// Consume into the durable representation.
    pub fn into_record(self) -> SessionRecord {
        self.record
    }

    /// Thought history in append order.
    pub fn thoughts(&self) -> &[Thought] {
        &self.record.thoughts
    }

    /// Number of thoughts in history.
    pub fn thought_count(&self) -> usize {
        self.record.thoughts.len()
    }

    /// Look up a thought by number.
    pub fn thought(&self, number: u32) -> Option<&Thought> {
        self.record
            .thoughts
            .iter()
            .find(|t| t.thought_number == number)
    }

    /// Look up an assumption by local id.
    pub fn assumption(&self, id: &str) -> Option<&Assumption> {
        self.record.assumptions.get(id)
    }

    /// Every assumption keyed by local id.
    pub fn all_assumptions(&self) -> &BTreeMap<String, Assumption> {
        &self.record.assumptions
    }

    /// Active branch ids in first-seen order.
    pub fn branches(&self) -> &[String] {
        &self.record.branches
    }

    /// Thought numbers recorded on a branch, in history order.
    pub fn branch_thoughts(&self, branch_id: &str) -> Vec<u32> {
        self.record
            .thoughts
            .iter()
            .filter(|t| t.is_branch() && t.branch_id.as_deref() == Some(branch_id))
            .map(|t| t.thought_number)
            .collect()
    }

    /// Ids of assumptions that are critical, low-confidence and not
    /// verified true. Computed on every call.
    pub fn risky_assumptions(&self) -> Vec<String> {
        self.record
            .assumptions
            .iter()
            .filter(|(_, a)| a.is_risky())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Ids ever listed in a thought's local `invalidates`, plus any
    /// assumption currently marked `verified_false`.
    pub fn falsified_assumptions(&self) -> Vec<String> {
        let mut ids: BTreeSet<String> = self
            .record
            .thoughts
            .iter()
            .flat_map(|t| t.invalidates_assumptions.iter())
            .filter_map(|r| r.as_local().map(|id| id.to_string()))
            .collect();
        ids.extend(
            self.record
                .assumptions
                .iter()
                .filter(|(_, a)| a.is_falsified())
                .map(|(id, _)| id.clone()),
        );
        ids.into_iter().collect()
    }

    /// Cross-session references that never resolved.
    pub fn unresolved_references(&self) -> &[String] {
        &self.record.unresolved_references
    }

    /// Warnings accumulated over the session.
    pub fn cross_session_warnings(&self) -> &[String] {
        &self.record.cross_session_warnings
    }

    /// Record a cross-session reference that could not be resolved.
    pub fn record_unresolved(&mut self, reference: &CrossSessionRef) {
        let reference = reference.to_string();
        if !self.record.unresolved_references.contains(&reference) {
            self.record.unresolved_references.push(reference);
        }
    }

    /// Record a non-fatal cross-session warning.
    pub fn record_warning(&mut self, warning: impl Into<String>) {
        self.record.cross_session_warnings.push(warning.into());
    }

    /// Apply a validated request and append the resulting thought.
    ///
    /// All checks run before any mutation: on `Err` the aggregate is left
    /// exactly as it was.
    pub fn apply(&mut self, request: &ValidatedRequest) -> Result<AppliedThought, ReferenceError> {
        // Only explicit numbers are checked for collisions; auto-numbering
        // follows history length even after an upward override.
        let thought_number = match request.thought_number {
            Some(number) if self.thought(number).is_some() => {
                return Err(ReferenceError::DuplicateThoughtNumber { number });
            }
            Some(number) => number,
            None => self.next_thought_number(),
        };

        let total_thoughts = request.total_thoughts.max(thought_number);
        let next_thought_needed = request
            .next_thought_needed
            .unwrap_or(thought_number < total_thoughts);

        if let Some(target) = request.revises_thought {
            if self.thought(target).is_none() {
                return Err(ReferenceError::RevisionTargetMissing {
                    target,
                    available: self.thought_numbers(),
                });
            }
        }
        if let Some(branch) = &request.branch {
            if self.thought(branch.from_thought).is_none() {
                return Err(ReferenceError::BranchOriginMissing {
                    target: branch.from_thought,
                    available: self.thought_numbers(),
                });
            }
        }

        let mut pending = Vec::new();

        for reference in &request.depends_on {
            match reference {
                AssumptionRef::Local(id) => {
                    if !self.record.assumptions.contains_key(id.as_str()) {
                        return Err(ReferenceError::AssumptionMissing {
                            id: id.to_string(),
                            relation: "depend on".to_string(),
                            available: self.record.assumptions.keys().cloned().collect(),
                        });
                    }
                }
                AssumptionRef::CrossSession(r) => pending.push(PendingReference {
                    reference: r.clone(),
                    relation: ReferenceRelation::DependsOn,
                }),
            }
        }

        for assumption in &request.assumptions {
            self.check_immutable_fields(assumption)?;
        }

        let introduced: HashSet<&str> = request.assumptions.iter().map(|a| a.id.as_str()).collect();
        for reference in &request.invalidates {
            match reference {
                AssumptionRef::Local(id) => {
                    let known = self.record.assumptions.contains_key(id.as_str())
                        || introduced.contains(id.as_str());
                    if !known {
                        let mut available: BTreeSet<String> =
                            self.record.assumptions.keys().cloned().collect();
                        available.extend(introduced.iter().map(|s| s.to_string()));
                        return Err(ReferenceError::AssumptionMissing {
                            id: id.to_string(),
                            relation: "invalidate".to_string(),
                            available: available.into_iter().collect(),
                        });
                    }
                }
                AssumptionRef::CrossSession(r) => pending.push(PendingReference {
                    reference: r.clone(),
                    relation: ReferenceRelation::Invalidates,
                }),
            }
        }

        // Everything below mutates; nothing past this point can fail.
        for assumption in &request.assumptions {
            self.upsert_assumption(assumption);
        }
        for id in request.invalidates.iter().filter_map(|r| r.as_local()) {
            if let Some(existing) = self.record.assumptions.get_mut(id.as_str()) {
                existing.verification_status = Some(VerificationStatus::VerifiedFalse);
            }
        }

        let thought = Thought {
            thought: request.thought.clone(),
            thought_number,
            total_thoughts,
            next_thought_needed,
            is_revision: request.is_revision,
            revises_thought: request.revises_thought,
            branch_from_thought: request.branch.as_ref().map(|b| b.from_thought),
            branch_id: request.branch.as_ref().map(|b| b.branch_id.clone()),
            needs_more_thoughts: request.needs_more_thoughts,
            confidence: request.confidence,
            uncertainty_notes: request.uncertainty_notes.clone(),
            outcome: request.outcome.clone(),
            assumptions: request.assumptions.clone(),
            depends_on_assumptions: request.depends_on.clone(),
            invalidates_assumptions: request.invalidates.clone(),
        };

        if let Some(branch) = &request.branch {
            if !self.record.branches.contains(&branch.branch_id) {
                self.record.branches.push(branch.branch_id.clone());
            }
        }
        self.record.thoughts.push(thought.clone());
        self.record.updated_at = Utc::now();

        debug!(
            session_id = %self.record.session_id,
            thought_number,
            total_thoughts,
            pending = pending.len(),
            "Thought applied"
        );

        Ok(AppliedThought { thought, pending })
    }

    fn next_thought_number(&self) -> u32 {
        u32::try_from(self.record.thoughts.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1)
    }

    fn thought_numbers(&self) -> Vec<u32> {
        let mut numbers: Vec<u32> = self
            .record
            .thoughts
            .iter()
            .map(|t| t.thought_number)
            .collect();
        numbers.sort_unstable();
        numbers
    }

    fn check_immutable_fields(&self, incoming: &Assumption) -> Result<(), ReferenceError> {
        let Some(existing) = self.record.assumptions.get(incoming.id.as_str()) else {
            return Ok(());
        };
        if existing.text != incoming.text {
            return Err(ReferenceError::ImmutableAssumptionField {
                id: incoming.id.to_string(),
                field: "text".to_string(),
                existing: existing.text.clone(),
                new: incoming.text.clone(),
            });
        }
        if existing.critical != incoming.critical {
            return Err(ReferenceError::ImmutableAssumptionField {
                id: incoming.id.to_string(),
                field: "critical".to_string(),
                existing: existing.critical.to_string(),
                new: incoming.critical.to_string(),
            });
        }
        Ok(())
    }

    fn upsert_assumption(&mut self, incoming: &Assumption) {
        match self.record.assumptions.get_mut(incoming.id.as_str()) {
            Some(existing) => {
                existing.confidence = incoming.confidence;
                existing.evidence = incoming.evidence.clone();
                existing.verification_status = incoming.verification_status;
            }
            None => {
                self.record
                    .assumptions
                    .insert(incoming.id.to_string(), incoming.clone());
            }
        }
    }
}
