use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong.
        message: String,
    },

    /// Request rejected before any session is touched.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Request refers to state the session does not hold.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Unexpected failure, such as response serialization.
    #[error("Internal error: {message}")]
    Internal {
        /// What failed.
        message: String,
    },
}

/// Field-level validation errors, raised before any session is touched
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A field is missing or malformed.
    #[error("Validation failed: {field} - {reason}")]
    InvalidField {
        /// Request field name.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A field carries an unacceptable value.
    #[error("Validation failed: {field} = '{value}' - {reason}")]
    InvalidValue {
        /// Request field name.
        field: String,
        /// Offending value as text.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ValidationError {
    /// Build an error that names only the failing field.
    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build an error that names the failing field and the offending value.
    pub fn value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Name of the failing field.
    pub fn field_name(&self) -> &str {
        match self {
            ValidationError::InvalidField { field, .. } => field,
            ValidationError::InvalidValue { field, .. } => field,
        }
    }
}

/// Reference errors: a thought points at state that does not exist or
/// conflicts with what the session already holds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReferenceError {
    /// `revises_thought` names a thought not in history.
    #[error("Cannot revise thought {target}: {}", describe_available(.available))]
    RevisionTargetMissing {
        /// Requested thought number.
        target: u32,
        /// Thought numbers present in history.
        available: Vec<u32>,
    },

    /// `branch_from_thought` names a thought not in history.
    #[error("Cannot branch from thought {target}: {}", describe_available(.available))]
    BranchOriginMissing {
        /// Requested thought number.
        target: u32,
        /// Thought numbers present in history.
        available: Vec<u32>,
    },

    /// An explicit `thought_number` is already taken.
    #[error("Thought number {number} already exists in this session")]
    DuplicateThoughtNumber {
        /// The colliding number.
        number: u32,
    },

    /// A local assumption id does not exist.
    #[error(
        "Cannot {relation} assumption {id}: assumption not found. Available: {}",
        list_or_none(.available)
    )]
    AssumptionMissing {
        /// Missing assumption id.
        id: String,
        /// How the thought referred to it.
        relation: String,
        /// Known assumption ids.
        available: Vec<String>,
    },

    /// A payload tried to change an immutable assumption field.
    #[error(
        "Cannot update assumption {id}: {field} mismatch. Existing: '{existing}', New: '{new}'. Core assumption fields (text, critical) are immutable"
    )]
    ImmutableAssumptionField {
        /// Assumption id.
        id: String,
        /// Field name.
        field: String,
        /// Stored value.
        existing: String,
        /// Rejected value.
        new: String,
    },
}

fn describe_available(available: &[u32]) -> String {
    if available.is_empty() {
        "no thoughts exist in this session yet. To continue an existing session, pass the session_id parameter".to_string()
    } else {
        format!(
            "thought not found in this session. Available thoughts: {:?}",
            available
        )
    }
}

fn list_or_none(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        format!("{:?}", available)
    }
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Handle outside the allow-list.
    #[error("Invalid session ID '{session_id}': {reason}")]
    InvalidSessionId {
        /// Rejected handle.
        session_id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No record exists for the handle.
    #[error("Session not found: {session_id}")]
    SessionNotFound {
        /// Requested handle.
        session_id: String,
    },

    /// The stored record cannot be read back.
    #[error("Session record {session_id} is corrupted: {message}")]
    Corrupted {
        /// Handle of the record.
        session_id: String,
        /// Parse or consistency failure.
        message: String,
    },

    /// Filesystem failure.
    #[error("I/O failure on {path}: {source}")]
    Io {
        /// Path involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Record serialization failure.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structured error object handed to the external caller.
///
/// `error` is a stable machine-readable kind; `field` and `value` are only
/// present when the failure is attributable to a specific input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error kind (`validation_error`, `reference_error`, `not_found`, ...).
    pub error: String,
    /// Failing request field, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Offending value, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl AppError {
    /// Stable error kind used in [`ErrorReport::error`].
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config { .. } => "config_error",
            AppError::Validation(_) => "validation_error",
            AppError::Reference(_) => "reference_error",
            AppError::Storage(StorageError::InvalidSessionId { .. }) => "validation_error",
            AppError::Storage(StorageError::SessionNotFound { .. }) => "not_found",
            AppError::Storage(_) => "storage_error",
            AppError::Internal { .. } => "internal_error",
        }
    }

    /// Convert into the structured error object for the caller.
    pub fn report(&self) -> ErrorReport {
        let (field, value) = match self {
            AppError::Validation(ValidationError::InvalidField { field, .. }) => {
                (Some(field.clone()), None)
            }
            AppError::Validation(ValidationError::InvalidValue { field, value, .. }) => {
                (Some(field.clone()), Some(value.clone()))
            }
            AppError::Reference(err) => reference_location(err),
            AppError::Storage(StorageError::InvalidSessionId { session_id, .. })
            | AppError::Storage(StorageError::SessionNotFound { session_id }) => {
                (Some("session_id".to_string()), Some(session_id.clone()))
            }
            _ => (None, None),
        };

        ErrorReport {
            error: self.kind().to_string(),
            field,
            value,
            message: self.to_string(),
        }
    }
}

fn reference_location(err: &ReferenceError) -> (Option<String>, Option<String>) {
    match err {
        ReferenceError::RevisionTargetMissing { target, .. } => {
            (Some("revises_thought".to_string()), Some(target.to_string()))
        }
        ReferenceError::BranchOriginMissing { target, .. } => (
            Some("branch_from_thought".to_string()),
            Some(target.to_string()),
        ),
        ReferenceError::DuplicateThoughtNumber { number } => {
            (Some("thought_number".to_string()), Some(number.to_string()))
        }
        ReferenceError::AssumptionMissing { id, relation, .. } => {
            let field = if relation == "invalidate" {
                "invalidates_assumptions"
            } else {
                "depends_on_assumptions"
            };
            (Some(field.to_string()), Some(id.clone()))
        }
        ReferenceError::ImmutableAssumptionField { id, .. } => {
            (Some("assumptions".to_string()), Some(id.clone()))
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "missing dir".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: missing dir");

        let err = AppError::Internal {
            message: "unexpected".to_string(),
        };
        assert_eq!(err.to_string(), "Internal error: unexpected");
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::field("thought", "must be a non-empty string");
        assert_eq!(
            err.to_string(),
            "Validation failed: thought - must be a non-empty string"
        );

        let err = ValidationError::value("confidence", "1.5", "must be between 0.0 and 1.0");
        assert_eq!(
            err.to_string(),
            "Validation failed: confidence = '1.5' - must be between 0.0 and 1.0"
        );
        assert_eq!(err.field_name(), "confidence");
    }

    #[test]
    fn test_reference_error_display_empty_session() {
        let err = ReferenceError::RevisionTargetMissing {
            target: 1,
            available: vec![],
        };
        assert!(err.to_string().starts_with("Cannot revise thought 1: no thoughts exist"));
        assert!(err.to_string().contains("pass the session_id parameter"));
    }

    #[test]
    fn test_reference_error_display_lists_available() {
        let err = ReferenceError::BranchOriginMissing {
            target: 99,
            available: vec![1, 2],
        };
        assert_eq!(
            err.to_string(),
            "Cannot branch from thought 99: thought not found in this session. Available thoughts: [1, 2]"
        );

        let err = ReferenceError::AssumptionMissing {
            id: "A3".to_string(),
            relation: "depend on".to_string(),
            available: vec![],
        };
        assert_eq!(
            err.to_string(),
            "Cannot depend on assumption A3: assumption not found. Available: none"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::SessionNotFound {
            session_id: "sess-123".to_string(),
        };
        assert_eq!(err.to_string(), "Session not found: sess-123");

        let err = StorageError::InvalidSessionId {
            session_id: "../x".to_string(),
            reason: "bad".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid session ID '../x': bad");
    }

    #[test]
    fn test_report_for_validation_error() {
        let err: AppError = ValidationError::value("total_thoughts", "0", "must be >= 1").into();
        let report = err.report();
        assert_eq!(report.error, "validation_error");
        assert_eq!(report.field.as_deref(), Some("total_thoughts"));
        assert_eq!(report.value.as_deref(), Some("0"));
    }

    #[test]
    fn test_report_for_reference_error() {
        let err: AppError = ReferenceError::RevisionTargetMissing {
            target: 99,
            available: vec![1, 2],
        }
        .into();
        let report = err.report();
        assert_eq!(report.error, "reference_error");
        assert_eq!(report.field.as_deref(), Some("revises_thought"));
        assert_eq!(report.value.as_deref(), Some("99"));
    }

    #[test]
    fn test_report_for_storage_errors() {
        let err: AppError = StorageError::InvalidSessionId {
            session_id: "../../etc".to_string(),
            reason: "bad".to_string(),
        }
        .into();
        assert_eq!(err.report().error, "validation_error");

        let err: AppError = StorageError::SessionNotFound {
            session_id: "missing".to_string(),
        }
        .into();
        assert_eq!(err.report().error, "not_found");

        let err: AppError = StorageError::Corrupted {
            session_id: "s".to_string(),
            message: "eof".to_string(),
        }
        .into();
        let report = err.report();
        assert_eq!(report.error, "storage_error");
        assert!(report.field.is_none());
    }

    #[test]
    fn test_report_serialization_skips_absent_location() {
        let err = AppError::Internal {
            message: "boom".to_string(),
        };
        let json = serde_json::to_value(err.report()).unwrap();
        assert_eq!(json["error"], "internal_error");
        assert!(json.get("field").is_none());
        assert!(json.get("value").is_none());
    }
}
