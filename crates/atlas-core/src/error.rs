//! Error handling for the Atlas core
//!
//! Three families of failure exist. Configuration errors (store missing,
//! duplicate fact ids) are fatal at startup. Shape errors are programming
//! errors such as compiling a condition for a fact kind the compiler does not
//! support. Store errors are queries that cannot be prepared or executed.
//! Missing data is never an error: it resolves to documented fallbacks.

use std::fmt;
use thiserror::Error;

/// Error type for Atlas core operations
#[derive(Error, Debug, Clone)]
pub enum AtlasError {
    /// The store or the fact configuration is unusable
    #[error("Configuration error: {message}")]
    Configuration { message: String, setting: Option<String> },

    /// A value does not have the shape its fact or caller requires
    #[error("Shape error: {message}")]
    Shape { message: String, fact_id: Option<String> },

    /// A store query could not be prepared or executed
    #[error("Store error: {message}")]
    Store { message: String, operation: Option<String>, sql: Option<String> },

    /// A filter document or other input could not be decoded
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::High => write!(f, "HIGH"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Result type alias for core operations
pub type AtlasResult<T> = Result<T, AtlasError>;

impl AtlasError {
    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AtlasError::Configuration { .. } => "configuration",
            AtlasError::Shape { .. } => "shape",
            AtlasError::Store { .. } => "store",
            AtlasError::Serialization { .. } => "serialization",
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AtlasError::Configuration { .. } => ErrorSeverity::Critical,
            AtlasError::Shape { .. } => ErrorSeverity::Critical,
            AtlasError::Store { .. } => ErrorSeverity::High,
            AtlasError::Serialization { .. } => ErrorSeverity::Medium,
        }
    }

    /// Only bad user input can be fixed without restarting or changing code
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AtlasError::Serialization { .. })
    }

    pub fn configuration(setting: &str, message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into(), setting: Some(setting.to_string()) }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape { message: message.into(), fact_id: None }
    }

    pub fn shape_for_fact(fact_id: &str, message: impl Into<String>) -> Self {
        Self::Shape { message: message.into(), fact_id: Some(fact_id.to_string()) }
    }

    pub fn store(operation: &str, message: impl Into<String>) -> Self {
        Self::Store { message: message.into(), operation: Some(operation.to_string()), sql: None }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }
}

impl From<rusqlite::Error> for AtlasError {
    fn from(err: rusqlite::Error) -> Self {
        AtlasError::Store { message: err.to_string(), operation: None, sql: None }
    }
}

impl From<serde_json::Error> for AtlasError {
    fn from(err: serde_json::Error) -> Self {
        AtlasError::serialization(format!("JSON error: {err}"))
    }
}

impl From<std::io::Error> for AtlasError {
    fn from(err: std::io::Error) -> Self {
        AtlasError::Configuration { message: format!("I/O error: {err}"), setting: None }
    }
}

/// Extension trait for adding context to store results
pub trait ResultExt<T> {
    /// Attach the failing operation and SQL text to a store error
    fn with_query_context(self, operation: &str, sql: &str) -> AtlasResult<T>;
}

impl<T> ResultExt<T> for AtlasResult<T> {
    fn with_query_context(self, operation: &str, sql: &str) -> AtlasResult<T> {
        self.map_err(|mut err| {
            if let AtlasError::Store { operation: op, sql: text, .. } = &mut err {
                *op = Some(operation.to_string());
                *text = Some(sql.to_string());
            }
            err
        })
    }
}
