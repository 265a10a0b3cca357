//! `issue_store` — a file-backed issue store with a typed dependency
//! graph, hierarchical IDs, soft-delete/tombstone lifecycle, and an
//! atomic per-issue modify protocol.
//!
//! The command-line surface, JSON/YAML display formatting, and git
//! integration are external collaborators and live outside this crate;
//! this crate is the store itself.

pub mod config;
pub mod error;
pub mod id;
pub mod logging;
pub mod model;
pub mod store;
pub mod validation;

pub use error::{BeadsError, Result};
pub use model::{Comment, Dependency, DependencyKind, Draft, Issue, IssueType, Priority, Status};
pub use store::{BlockedIssue, FileStore, IssueStore, ListFilter};
