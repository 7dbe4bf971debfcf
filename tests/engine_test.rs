//! End-to-end tests for the thinking engine over file storage.
//!
//! Each test gets a fresh sessions directory; engines built on the same
//! directory model independent invocations of the CLI.

use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

use ultrathink::error::{AppError, ReferenceError, StorageError};
use ultrathink::model::{AssumptionPayload, ThoughtRequest, VerificationStatus};
use ultrathink::storage::{FileStorage, Storage};
use ultrathink::ThinkingEngine;

fn engine_in(dir: &TempDir) -> ThinkingEngine<FileStorage> {
    ThinkingEngine::new(FileStorage::with_root(dir.path()))
}

async fn persisted_len(engine: &ThinkingEngine<FileStorage>, session_id: &str) -> usize {
    engine
        .storage()
        .load(session_id)
        .await
        .unwrap()
        .map(|r| r.thoughts.len())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_session_walkthrough() {
    let dir = tempdir().unwrap();
    let engine = engine_in(&dir);

    // Thought 1 opens a session.
    let first = engine
        .handle(ThoughtRequest::new("Frame the problem", 3))
        .await
        .unwrap();
    assert_eq!(first.thought_number, 1);
    assert!(first.next_thought_needed);
    let sid = first.session_id.clone();

    // Thought 2 revises thought 1.
    let mut revision = ThoughtRequest::new("Reframe", 3).with_session(&sid);
    revision.is_revision = Some(true);
    revision.revises_thought = Some(1);
    let second = engine.handle(revision).await.unwrap();
    assert_eq!(second.thought_history_length, 2);

    let record = engine.storage().load(&sid).await.unwrap().unwrap();
    assert!(record.thoughts[1].is_revision);
    assert_eq!(record.thoughts[1].revises_thought, Some(1));

    // A forward revision is rejected and nothing is persisted.
    let err = engine
        .handle(ThoughtRequest::new("Bad", 3).with_session(&sid).revising(99))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Reference(ReferenceError::RevisionTargetMissing { target: 99, .. })
    ));
    assert_eq!(err.report().error, "reference_error");
    assert_eq!(persisted_len(&engine, &sid).await, 2);

    // A risky assumption appears, then disappears once verified.
    let third = engine
        .handle(
            ThoughtRequest::new("Assume X", 4)
                .with_session(&sid)
                .with_assumption(
                    AssumptionPayload::new("A1", "X is true")
                        .with_critical(true)
                        .with_confidence(0.5),
                ),
        )
        .await
        .unwrap();
    assert_eq!(third.risky_assumptions, vec!["A1".to_string()]);

    let fourth = engine
        .handle(
            ThoughtRequest::new("X checked", 4)
                .with_session(&sid)
                .with_assumption(
                    AssumptionPayload::new("A1", "X is true")
                        .with_confidence(0.5)
                        .with_status(VerificationStatus::VerifiedTrue),
                )
                .depending_on("A1"),
        )
        .await
        .unwrap();
    assert!(fourth.risky_assumptions.is_empty());
    assert_eq!(
        fourth.all_assumptions["A1"].verification_status,
        Some(VerificationStatus::VerifiedTrue)
    );

    // Unknown foreign dependency is recorded, the request still succeeds.
    let fifth = engine
        .handle(
            ThoughtRequest::new("Lean on other work", 6)
                .with_session(&sid)
                .depending_on("otherhandle:A1"),
        )
        .await
        .unwrap();
    assert_eq!(
        fifth.unresolved_references,
        vec!["otherhandle:A1".to_string()]
    );
    assert!(fifth.cross_session_warnings.is_empty());

    // Cross-session invalidation always degrades to a warning.
    let sixth = engine
        .handle(
            ThoughtRequest::new("Other work is wrong", 6)
                .with_session(&sid)
                .invalidating("otherhandle:A1"),
        )
        .await
        .unwrap();
    assert_eq!(
        sixth.unresolved_references,
        vec!["otherhandle:A1".to_string()]
    );
    assert_eq!(sixth.cross_session_warnings.len(), 1);
    assert!(sixth.cross_session_warnings[0].contains("otherhandle:A1"));
    assert!(sixth.falsified_assumptions.is_empty());
    assert_eq!(sixth.thought_history_length, 6);
}

#[tokio::test]
async fn test_auto_numbering_is_sequential() {
    let dir = tempdir().unwrap();
    let engine = engine_in(&dir);

    let first = engine.handle(ThoughtRequest::new("t", 5)).await.unwrap();
    let mut numbers = vec![first.thought_number];
    for _ in 0..4 {
        let response = engine
            .handle(ThoughtRequest::new("t", 5).with_session(&first.session_id))
            .await
            .unwrap();
        numbers.push(response.thought_number);
    }

    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_last_thought_closes_and_total_is_raised() {
    let dir = tempdir().unwrap();
    let engine = engine_in(&dir);

    let first = engine.handle(ThoughtRequest::new("t", 2)).await.unwrap();
    let second = engine
        .handle(ThoughtRequest::new("t", 2).with_session(&first.session_id))
        .await
        .unwrap();
    assert_eq!(second.thought_number, 2);
    assert!(!second.next_thought_needed);

    let third = engine
        .handle(ThoughtRequest::new("one more", 2).with_session(&first.session_id))
        .await
        .unwrap();
    assert_eq!(third.thought_number, 3);
    assert_eq!(third.total_thoughts, 3);
    assert!(!third.next_thought_needed);

    let forced = engine
        .handle(
            ThoughtRequest::new("keep going", 2)
                .with_session(&first.session_id)
                .with_next_needed(true),
        )
        .await
        .unwrap();
    assert!(forced.next_thought_needed);
}

#[tokio::test]
async fn test_state_survives_new_engine_instance() {
    let dir = tempdir().unwrap();

    let sid = {
        let engine = engine_in(&dir);
        let response = engine
            .handle(
                ThoughtRequest::new("Assume", 3)
                    .with_assumption(AssumptionPayload::new("A1", "Y holds")),
            )
            .await
            .unwrap();
        response.session_id
    };

    let engine = engine_in(&dir);
    let response = engine
        .handle(
            ThoughtRequest::new("Y was wrong", 3)
                .with_session(&sid)
                .invalidating("A1"),
        )
        .await
        .unwrap();

    assert_eq!(response.thought_number, 2);
    assert_eq!(response.falsified_assumptions, vec!["A1".to_string()]);
    assert_eq!(
        response.all_assumptions["A1"].verification_status,
        Some(VerificationStatus::VerifiedFalse)
    );
}

#[tokio::test]
async fn test_cross_session_dependency_resolves_when_present() {
    let dir = tempdir().unwrap();
    let engine = engine_in(&dir);

    let other = engine
        .handle(
            ThoughtRequest::new("Shared premise", 2)
                .with_assumption(AssumptionPayload::new("A1", "Z holds").with_confidence(0.3)),
        )
        .await
        .unwrap();

    let reference = format!("{}:A1", other.session_id);
    let response = engine
        .handle(ThoughtRequest::new("Build on it", 2).depending_on(&reference))
        .await
        .unwrap();

    assert!(response.unresolved_references.is_empty());
    assert!(response.all_assumptions.is_empty());
    assert!(response.risky_assumptions.is_empty());

    let missing = format!("{}:A9", other.session_id);
    let response = engine
        .handle(ThoughtRequest::new("Build on nothing", 2).depending_on(&missing))
        .await
        .unwrap();
    assert_eq!(response.unresolved_references, vec![missing]);
}

#[tokio::test]
async fn test_branches_are_tracked() {
    let dir = tempdir().unwrap();
    let engine = engine_in(&dir);

    let first = engine.handle(ThoughtRequest::new("root", 4)).await.unwrap();
    let sid = first.session_id;

    let branch = engine
        .handle(ThoughtRequest::new("alt path", 4).with_session(&sid).branching(1, "alt"))
        .await
        .unwrap();
    assert_eq!(branch.branches, vec!["alt".to_string()]);

    let err = engine
        .handle(ThoughtRequest::new("from nowhere", 4).with_session(&sid).branching(7, "b2"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Reference(ReferenceError::BranchOriginMissing { .. })
    ));
    assert_eq!(persisted_len(&engine, &sid).await, 2);
}

#[tokio::test]
async fn test_unknown_and_malformed_handles() {
    let dir = tempdir().unwrap();
    let engine = engine_in(&dir);

    let err = engine
        .handle(ThoughtRequest::new("x", 3).with_session("does-not-exist"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Storage(StorageError::SessionNotFound { .. })
    ));
    assert_eq!(err.report().error, "not_found");

    let err = engine
        .handle(ThoughtRequest::new("x", 3).with_session("../../etc"))
        .await
        .unwrap_err();
    let report = err.report();
    assert_eq!(report.error, "validation_error");
    assert_eq!(report.field.as_deref(), Some("session_id"));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_missing_local_dependency_is_rejected() {
    let dir = tempdir().unwrap();
    let engine = engine_in(&dir);

    let err = engine
        .handle(ThoughtRequest::new("x", 3).depending_on("A4"))
        .await
        .unwrap_err();
    match err {
        AppError::Reference(ReferenceError::AssumptionMissing { id, .. }) => assert_eq!(id, "A4"),
        other => panic!("expected AssumptionMissing, got {:?}", other),
    }
    assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
}
