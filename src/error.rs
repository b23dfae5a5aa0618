//! Error types for the survey bot, one enum per concern.

use std::path::PathBuf;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Outbound delivery errors (text, image, file).
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Failed to send {kind} to {phone_number}: {reason}")]
    SendFailed {
        kind: &'static str,
        phone_number: String,
        reason: String,
    },

    #[error("Provider rejected {kind} to {phone_number}: {reason}")]
    Rejected {
        kind: &'static str,
        phone_number: String,
        reason: String,
    },

    #[error("Failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Question source errors. Never escape the source boundary; callers see an empty list.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Question source unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed question sheet: {0}")]
    Malformed(String),
}

/// Failures while recording an inbound answer.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("No question index found in message")]
    NoQuestionIndex,

    #[error("Question index {index} is out of range ({available} questions available)")]
    QuestionIndexOutOfRange { index: usize, available: usize },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Staff roster import errors.
#[derive(Debug, thiserror::Error)]
pub enum RosterImportError {
    #[error("Failed to read roster {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed roster CSV: {0}")]
    Malformed(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Report compilation errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("A report compilation is already running")]
    AlreadyRunning,

    #[error("Failed to render report: {0}")]
    Render(String),

    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<csv::Error> for ReportError {
    fn from(e: csv::Error) -> Self {
        ReportError::Render(e.to_string())
    }
}
