//! Core error types for slice-core.
//!
//! This module defines the error hierarchy using thiserror. Reminder
//! failures are kept in their own enum because the UI reports them as
//! non-blocking notices rather than hard failures.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for slice-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plan service errors
    #[error("Plan service error: {0}")]
    Plan(#[from] PlanError),

    /// Reminder engine errors
    #[error("Reminder error: {0}")]
    Reminder(#[from] ReminderError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// The connection mutex was poisoned by a panicking writer
    #[error("Database connection poisoned")]
    Poisoned,
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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Errors talking to the remote plan service.
#[derive(Error, Debug)]
pub enum PlanError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("{method} {url} -> {status}{}", body_suffix(.body))]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("Malformed plan payload: {0}")]
    Malformed(String),

    /// No anonymous user id has been registered yet
    #[error("No user id registered; run `slice-cli auth login` first")]
    MissingUser,

    /// Keyring access failed
    #[error("Credential store error: {0}")]
    Credentials(String),

    /// Invalid base URL
    #[error("Invalid plan service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Failures of the reminder reconciliation engine.
///
/// Every variant is a reported result; none of them is fatal to the host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReminderError {
    /// The user (or OS) did not grant notification permission.
    #[error("Notification permission not granted")]
    PermissionDenied,

    /// The OS refused one or more trigger registrations. Whatever was
    /// scheduled has been recorded.
    #[error("Scheduled {scheduled} of {requested} reminders: {message}")]
    SchedulingFailed {
        scheduled: usize,
        requested: usize,
        message: String,
    },

    /// Old triggers could not be cancelled; their ids are still recorded.
    #[error("Failed to cancel {remaining} reminder(s): {message}")]
    CancelFailed { remaining: usize, message: String },

    /// The persistence layer failed a read or write.
    #[error("Reminder store unavailable: {0}")]
    StoreUnavailable(String),

    /// The plan no longer exists or its payload is unusable.
    #[error("Plan '{plan_id}' is unavailable: {reason}")]
    StalePlanState { plan_id: String, reason: String },

    /// The plan service could not be reached or answered with an error.
    /// Nothing is disabled on this path; the plan may well still exist.
    #[error("Could not read plan: {0}")]
    PlanFetchFailed(String),

    /// Reminders were requested for a plan with no incomplete day.
    #[error("Plan '{plan_id}' is already completed")]
    PlanCompleted { plan_id: String },

    /// An OS call did not answer within the configured bound.
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },
}

impl ReminderError {
    /// Short, user-facing reason suitable for a non-blocking notice.
    pub fn user_message(&self) -> String {
        match self {
            ReminderError::PermissionDenied => {
                "Notification permission not granted. Reminders are off, but your plan still works."
                    .to_string()
            }
            ReminderError::SchedulingFailed { scheduled, requested, .. } => format!(
                "Only {scheduled} of {requested} reminders could be scheduled."
            ),
            ReminderError::CancelFailed { .. } => {
                "Old reminders could not be removed. Try again.".to_string()
            }
            ReminderError::StoreUnavailable(_) => {
                "Reminder settings could not be saved. Try again.".to_string()
            }
            ReminderError::StalePlanState { .. } => {
                "This plan is no longer available, so its reminders were turned off.".to_string()
            }
            ReminderError::PlanFetchFailed(_) => {
                "Could not reach the plan service. Try again.".to_string()
            }
            ReminderError::PlanCompleted { .. } => {
                "This plan is already complete. Nothing left to remind you about.".to_string()
            }
            ReminderError::Timeout { .. } => {
                "The system took too long to respond. Try again.".to_string()
            }
        }
    }
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" | {body}")
    }
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<DatabaseError> for ReminderError {
    fn from(err: DatabaseError) -> Self {
        ReminderError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for ReminderError {
    fn from(err: serde_json::Error) -> Self {
        ReminderError::StoreUnavailable(format!("corrupt record: {err}"))
    }
}

impl From<keyring::Error> for PlanError {
    fn from(err: keyring::Error) -> Self {
        PlanError::Credentials(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
