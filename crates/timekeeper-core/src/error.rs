//! Core error types for timekeeper-core.
//!
//! Nothing in the scheduler core is fatal. Validation errors are surfaced to
//! the caller with state left untouched; environment and persistence errors
//! are degraded around by the callers that hit them.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Core error type for timekeeper-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A capability the host does not provide (threads, OS notifications).
    #[error("Environment unavailable: {capability}: {message}")]
    EnvironmentUnavailable { capability: String, message: String },

    /// Settings storage failures
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The scheduler service task has shut down.
    #[error("Scheduler service is not running")]
    ServiceClosed,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn environment(capability: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::EnvironmentUnavailable {
            capability: capability.into(),
            message: message.into(),
        }
    }
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Point offset outside the accepted range
    #[error("Time {time_ms}ms is outside the accepted range {min_ms}..={max_ms}ms")]
    TimeOutOfRange { time_ms: u64, min_ms: u64, max_ms: u64 },

    /// No point with this id
    #[error("Unknown notification point: {0}")]
    UnknownPoint(Uuid),

    /// No preset with this id
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Settings storage errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to read settings from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write settings to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings record is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
