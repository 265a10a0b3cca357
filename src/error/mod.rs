//! Error types for `issue_store`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types.
//! - Every mutator either fully succeeds or leaves disk unchanged; the
//!   error taxonomy here mirrors that contract — each variant names a
//!   condition checked *before* any write takes place, except `Io`, which
//!   can in principle surface mid-write (the atomic rename in
//!   [`crate::store::layout`] bounds the damage to "old file still there").

use std::path::PathBuf;
use thiserror::Error;

/// The error taxonomy an `IssueStore` caller can observe.
#[derive(Error, Debug)]
pub enum BeadsError {
    /// No issue with that ID, or no issue matching a prefix.
    #[error("issue not found: {id}")]
    NotFound { id: String },

    /// A prefix matched more than one live ID.
    #[error("ambiguous prefix {prefix:?}: matches {matches:?}")]
    Ambiguous { prefix: String, matches: Vec<String> },

    /// `Create` was given an ID that already belongs to a live issue.
    #[error("issue already exists: {id}")]
    AlreadyExists { id: String },

    /// `CreateTombstone` was called on an issue that is already a tombstone.
    #[error("issue already tombstoned: {id}")]
    AlreadyTombstoned { id: String },

    /// The requested dependency would introduce a cycle.
    #[error("adding {from} -> {to} would create a dependency cycle")]
    Cycle { from: String, to: String },

    /// A hierarchical create/reparent would exceed the configured depth.
    #[error("{id} would exceed the maximum hierarchy depth of {max}")]
    MaxDepthExceeded { id: String, max: usize },

    /// A field value falls outside its recognised/configured set.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// Lock acquisition on an issue ID timed out.
    #[error("timed out waiting for lock on {id}")]
    Busy { id: String },

    /// Underlying filesystem failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML (de)serialization failure.
    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl BeadsError {
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether a caller can plausibly fix this by changing their input,
    /// as opposed to it indicating a bug or environment failure.
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Ambiguous { .. }
                | Self::AlreadyExists { .. }
                | Self::AlreadyTombstoned { .. }
                | Self::Cycle { .. }
                | Self::MaxDepthExceeded { .. }
                | Self::InvalidField { .. }
        )
    }
}

/// `Result` alias using [`BeadsError`].
pub type Result<T> = std::result::Result<T, BeadsError>;
