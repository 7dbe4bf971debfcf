//! # UltraThink
//!
//! A sequential-reasoning session engine. Callers submit discrete numbered
//! thoughts, link them into revisions and branches, attach falsifiable
//! assumptions with confidence and verification state, and resume the whole
//! structure across independent invocations through a session handle.
//!
//! ## Features
//!
//! - **Auto-numbering**: thought numbers, total estimates and the next-needed
//!   flag are derived when not supplied
//! - **Revisions & Branches**: references to earlier thoughts are checked
//!   against history, forward references are rejected
//! - **Assumption Tracking**: risky and falsified sets are derived on every
//!   read from confidence, criticality and verification state
//! - **Cross-Session References**: `<session>:A<n>` dependencies resolve
//!   read-only against other sessions; cross-session invalidation degrades to
//!   a warning
//! - **Atomic Persistence**: one JSON record per session, replaced via
//!   temp-file + rename
//!
//! ## Architecture
//!
//! ```text
//! CLI → ThinkingEngine → SessionState (apply)
//!              ↓
//!        Storage (JSON files / memory)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use ultrathink::{ThinkingEngine, ThoughtRequest};
//! use ultrathink::storage::MemoryStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = ThinkingEngine::new(MemoryStorage::new());
//!     let first = engine.handle(ThoughtRequest::new("Frame the problem", 3)).await?;
//!     let second = engine
//!         .handle(ThoughtRequest::new("Refine", 3).with_session(&first.session_id))
//!         .await?;
//!     assert_eq!(second.thought_number, 2);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Command-line surface (flag parsing and JSON rendering).
pub mod cli;
/// Configuration management.
pub mod config;
/// Request orchestration.
pub mod engine;
/// Error types and result aliases for the application.
pub mod error;
/// Domain model: assumptions, thoughts, requests, responses, records.
pub mod model;
/// Session state aggregate.
pub mod session;
/// Session persistence.
pub mod storage;

pub use config::Config;
pub use engine::ThinkingEngine;
pub use error::{AppError, AppResult};
pub use model::{ThoughtRequest, ThoughtResponse};
pub use session::SessionState;
