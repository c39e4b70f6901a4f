//! Error types for the curator engine.
//!
//! Refusals that protect the cross-file invariants (`AlreadyCurated`,
//! `StateCollision`) are distinct variants so review surfaces can tell the
//! user *why* an action was rejected instead of showing a generic failure.

use crate::model::IdentityKey;
use crate::repository::CurationState;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the curator library.
#[derive(Debug, Error)]
pub enum CuratorError {
    // Record errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Storage errors
    #[error("Malformed mapping file {path:?} at line {line}: {message}")]
    Format {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Curation errors
    #[error("Mapping not found in {state}: {key}")]
    MappingNotFound {
        key: IdentityKey,
        state: CurationState,
    },

    #[error("Mapping is already curated as {state}: {key}")]
    AlreadyCurated {
        key: IdentityKey,
        state: CurationState,
    },

    #[error("Mapping is curated in more than one state ({}): {key}", format_states(.states))]
    StateCollision {
        key: IdentityKey,
        states: Vec<CurationState>,
    },

    // Project errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to acquire project lock {path:?}: {message}")]
    Lock { path: PathBuf, message: String },

    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for curator operations.
pub type Result<T> = std::result::Result<T, CuratorError>;

fn format_states(states: &[CurationState]) -> String {
    states
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<std::io::Error> for CuratorError {
    fn from(err: std::io::Error) -> Self {
        CuratorError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for CuratorError {
    fn from(err: serde_json::Error) -> Self {
        CuratorError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl CuratorError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CuratorError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a validation error for a record field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CuratorError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable reason code.
    ///
    /// Review surfaces map these to user-facing messages:
    /// - `not_found`: the mapping is not where the action expected it
    /// - `already_curated`: the mapping has a different curated state already
    /// - `state_collision`: the files disagree and need a manual fix
    pub fn code(&self) -> &'static str {
        match self {
            CuratorError::Validation { .. } => "validation",
            CuratorError::Format { .. } => "format",
            CuratorError::NotFound(_) | CuratorError::MappingNotFound { .. } => "not_found",
            CuratorError::FileExists(_) => "file_exists",
            CuratorError::AlreadyCurated { .. } => "already_curated",
            CuratorError::StateCollision { .. } => "state_collision",
            CuratorError::Config { .. } => "config",
            CuratorError::Lock { .. } => "lock",
            CuratorError::Git { .. } => "git",
            CuratorError::Io { .. } | CuratorError::Json { .. } | CuratorError::Other(_) => {
                "internal"
            }
        }
    }

    /// Whether this error is a refusal that protects a curation invariant.
    ///
    /// Refusals are never resolved automatically; the caller has to choose a
    /// different operation (for example `recurate` instead of `curate`).
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            CuratorError::AlreadyCurated { .. } | CuratorError::StateCollision { .. }
        )
    }
}
