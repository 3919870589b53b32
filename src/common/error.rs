//! Error types for apiprobe
//!
//! These are the fatal errors: anything that stops a run before the first
//! probe is sent. Failures of individual probes are recorded as data in the
//! ledger (see [`crate::harness::FailureKind`]) and never surface here.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for apiprobe
#[derive(Error, Debug)]
pub enum Error {
    // === Target Errors ===
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Unknown category '{0}'. Known categories: auth, trips, bookings, admin, payments, database")]
    UnknownCategory(String),

    // === Scenario Errors ===
    #[error("Invalid scenario '{name}': {reason}")]
    Scenario { name: String, reason: String },

    #[error("Duplicate probe '{probe}' in category '{category}'")]
    DuplicateProbe { category: String, probe: String },

    // === Session Errors ===
    #[error("Login for identity '{0}' returned no session cookie")]
    AuthError(String),

    #[error("Identity '{0}' has not logged in")]
    IdentityNotFound(String),

    // === File Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Failed to write file '{path}': {error}")]
    FileWrite { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create an invalid base URL error
    pub fn invalid_base_url(url: &str, reason: &str) -> Self {
        Self::InvalidBaseUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a scenario validation error
    pub fn scenario(name: &str, reason: impl Into<String>) -> Self {
        Self::Scenario {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create a file write error
    pub fn file_write(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::FileWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
