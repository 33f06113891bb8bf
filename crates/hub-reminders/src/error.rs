use thiserror::Error;

use crate::types::ReminderStatus;

/// Errors that can occur within the reminder subsystem.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Metadata column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Builder input failed validation.
    #[error("Invalid reminder: {0}")]
    InvalidReminder(String),

    /// No reminder with the given external reference exists.
    #[error("Reminder not found: {refid}")]
    NotFound { refid: String },

    /// The operation is not defined for the reminder's current status.
    #[error("Cannot {op} a {from} reminder")]
    IllegalTransition {
        op: &'static str,
        from: ReminderStatus,
    },

    /// A stored enum column holds a value this build does not know.
    #[error("Unknown {field} value: {value}")]
    UnknownValue { field: &'static str, value: String },

    /// A stored timestamp is not valid RFC 3339.
    #[error("Invalid timestamp {value}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// The notification collaborator rejected or dropped a notice.
    #[error("Notification failed: {0}")]
    Notification(String),

    /// A programming error, e.g. computing a recurrence for a non-repeating reminder.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReminderError {
    /// Short error code string for CLI and log output.
    pub fn code(&self) -> &'static str {
        match self {
            ReminderError::Database(_) => "DATABASE_ERROR",
            ReminderError::Serialization(_) => "SERIALIZATION_ERROR",
            ReminderError::InvalidReminder(_) => "INVALID_REMINDER",
            ReminderError::NotFound { .. } => "NOT_FOUND",
            ReminderError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            ReminderError::UnknownValue { .. } => "UNKNOWN_VALUE",
            ReminderError::InvalidTimestamp { .. } => "INVALID_TIMESTAMP",
            ReminderError::Notification(_) => "NOTIFICATION_FAILED",
            ReminderError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReminderError>;
