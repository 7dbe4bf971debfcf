//! Request orchestration.
//!
//! [`ThinkingEngine::handle`] is the single entry point: it validates the
//! request, opens or creates the addressed session, applies the thought,
//! resolves cross-session references read-only against storage, persists
//! the session and builds the [`ThoughtResponse`]. Nothing is persisted
//! unless every step before the save succeeds.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppResult, StorageError};
use crate::model::{CrossSessionRef, Thought, ThoughtRequest, ThoughtResponse};
use crate::session::{PendingReference, ReferenceRelation, SessionState};
use crate::storage::Storage;

/// Sequential-thinking engine over an injectable [`Storage`].
#[derive(Debug, Clone)]
pub struct ThinkingEngine<S> {
    storage: S,
}

impl<S: Storage> ThinkingEngine<S> {
    /// Create an engine backed by the given storage.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Borrow the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Process one request end to end.
    pub async fn handle(&self, request: ThoughtRequest) -> AppResult<ThoughtResponse> {
        let request = request.validate()?;

        let mut session = self.open_session(request.session_id.as_deref()).await?;
        let applied = session.apply(&request)?;
        self.resolve_pending(&mut session, &applied.pending).await;

        self.storage.save(session.record()).await?;

        info!(
            session_id = %session.session_id(),
            thought_number = applied.thought.thought_number,
            total_thoughts = applied.thought.total_thoughts,
            history = session.thought_count(),
            "Thought recorded"
        );

        Ok(build_response(&session, &applied.thought))
    }

    async fn open_session(&self, session_id: Option<&str>) -> AppResult<SessionState> {
        match session_id {
            None => {
                let session_id = Uuid::new_v4().to_string();
                debug!(session_id = %session_id, "Starting new session");
                Ok(SessionState::new(session_id))
            }
            Some(id) => match self.storage.load(id).await? {
                Some(record) => Ok(SessionState::from_record(record)),
                None => Err(StorageError::SessionNotFound {
                    session_id: id.to_string(),
                }
                .into()),
            },
        }
    }

    async fn resolve_pending(&self, session: &mut SessionState, pending: &[PendingReference]) {
        for item in pending {
            match item.relation {
                ReferenceRelation::Invalidates => {
                    let warning = format!(
                        "Cannot invalidate cross-session assumption {}: cross-session invalidation not supported",
                        item.reference
                    );
                    warn!(session_id = %session.session_id(), reference = %item.reference, "Cross-session invalidation refused");
                    session.record_unresolved(&item.reference);
                    session.record_warning(warning);
                }
                ReferenceRelation::DependsOn => {
                    if self.dependency_exists(session, &item.reference).await {
                        debug!(reference = %item.reference, "Cross-session dependency resolved");
                    } else {
                        session.record_unresolved(&item.reference);
                    }
                }
            }
        }
    }

    /// Read-only lookup of a foreign assumption. Foreign field values are
    /// never copied into the local session.
    async fn dependency_exists(&self, session: &SessionState, reference: &CrossSessionRef) -> bool {
        let assumption_id = reference.assumption_id.as_str();

        if reference.session_id == session.session_id() {
            return session.assumption(assumption_id).is_some();
        }

        match self.storage.load(&reference.session_id).await {
            Ok(Some(record)) => record.assumptions.contains_key(assumption_id),
            Ok(None) => {
                debug!(reference = %reference, "Referenced session does not exist");
                false
            }
            Err(e) => {
                warn!(reference = %reference, error = %e, "Failed to load referenced session");
                false
            }
        }
    }
}

/// Build the caller-facing response for the thought just recorded.
pub fn build_response(session: &SessionState, thought: &Thought) -> ThoughtResponse {
    ThoughtResponse {
        session_id: session.session_id().to_string(),
        thought_number: thought.thought_number,
        total_thoughts: thought.total_thoughts,
        next_thought_needed: thought.next_thought_needed,
        branches: session.branches().to_vec(),
        thought_history_length: session.thought_count(),
        confidence: thought.confidence,
        uncertainty_notes: thought.uncertainty_notes.clone(),
        outcome: thought.outcome.clone(),
        all_assumptions: session.all_assumptions().clone(),
        risky_assumptions: session.risky_assumptions(),
        falsified_assumptions: session.falsified_assumptions(),
        unresolved_references: session.unresolved_references().to_vec(),
        cross_session_warnings: session.cross_session_warnings().to_vec(),
    }
}
