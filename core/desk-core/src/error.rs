//! Error types for desk-core operations.
//! Gate rejections are distinguished from backend failures so callers can
//! tell "you may not run this" apart from "this ran and failed".

use std::path::PathBuf;

/// All errors that can occur in desk-core operations.
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    // ─────────────────────────────────────────────────────────────────────
    // Gate Errors
    // ─────────────────────────────────────────────────────────────────────
    /// The activity gate rejected the operation. The underlying request was
    /// never dispatched.
    #[error("User is not active. Contact the system administrator.")]
    InactiveUser,

    /// The remote status lookup failed. Internal: callers of the gate never
    /// see this directly, it is recovered by failing closed.
    #[error("Status lookup failed: {details}")]
    StatusLookupFailed { details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Remote Service Errors
    // ─────────────────────────────────────────────────────────────────────
    /// The remote data service rejected an operation it received.
    #[error("Backend error{}: {message}", code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Backend {
        code: Option<String>,
        message: String,
    },

    #[error("HTTP transport error: {context}: {details}")]
    Http { context: String, details: String },

    /// A query expecting exactly one row matched none.
    #[error("No matching row in table {table}")]
    RowNotFound { table: String },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Configuration write failed: {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing configuration value: {0}")]
    ConfigMissing(&'static str),

    // ─────────────────────────────────────────────────────────────────────
    // Data Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("An order needs at least one line")]
    EmptyOrder,

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DeskError {
    /// True when this error is the gate's rejection rather than a failure of
    /// the operation itself.
    pub fn is_gate_rejection(&self) -> bool {
        matches!(self, DeskError::InactiveUser)
    }
}

/// Convenience type alias for Results using DeskError.
pub type Result<T> = std::result::Result<T, DeskError>;

// Conversion for string error compatibility
impl From<DeskError> for String {
    fn from(err: DeskError) -> String {
        err.to_string()
    }
}
