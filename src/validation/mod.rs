//! Validation helpers for `issue_store`.
//!
//! These routines enforce the field-level constraints from spec §3.1/§3.2
//! and return structured errors without touching storage. They are called
//! from [`crate::store::modify`] as step 5 of the modify protocol.

use crate::config::StoreConfig;
use crate::error::{BeadsError, Result};
use crate::model::Issue;

/// Validates an issue's fields and the recognised/custom type & status
/// sets against a [`StoreConfig`].
pub struct IssueValidator;

impl IssueValidator {
    /// Validate an issue, returning the first violation found.
    ///
    /// # Errors
    ///
    /// Returns [`BeadsError::InvalidField`] describing the first violated
    /// constraint.
    pub fn validate(issue: &Issue, config: &StoreConfig) -> Result<()> {
        if issue.title.trim().is_empty() {
            return Err(BeadsError::invalid_field("title", "cannot be empty"));
        }
        if issue.title.len() > 500 {
            return Err(BeadsError::invalid_field("title", "exceeds 500 characters"));
        }
        if let Some(description) = &issue.description {
            if description.len() > 102_400 {
                return Err(BeadsError::invalid_field("description", "exceeds 100KB"));
            }
        }
        if !issue.priority.in_range() {
            return Err(BeadsError::invalid_field(
                "priority",
                format!("must be 0-4, got {}", issue.priority.0),
            ));
        }
        if !config.accepts_type(issue.issue_type.as_str()) {
            return Err(BeadsError::invalid_field(
                "type",
                format!("{:?} is not a recognised or configured custom type", issue.issue_type.as_str()),
            ));
        }
        // tombstone may only be set by CreateTombstone, never via Modify;
        // the caller (store::modify) checks this against the prior status
        // so this only guards the unconditional "never accept it as a
        // freestanding status name" half of the rule.
        if issue.status.as_str() != "tombstone" && !config.accepts_status(issue.status.as_str()) {
            return Err(BeadsError::invalid_field(
                "status",
                format!("{:?} is not a recognised or configured custom status", issue.status.as_str()),
            ));
        }
        if issue.updated_at < issue.created_at {
            return Err(BeadsError::invalid_field(
                "updated_at",
                "cannot be before created_at",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for label in &issue.labels {
            if !seen.insert(label.as_str()) {
                return Err(BeadsError::invalid_field(
                    "labels",
                    format!("{label:?} is duplicated"),
                ));
            }
        }

        Ok(())
    }

    /// Deduplicate labels in place, preserving first-seen order
    /// (spec §3.2: "Labels are unique per issue").
    pub fn dedupe_labels(issue: &mut Issue) {
        let mut seen = std::collections::HashSet::new();
        issue.labels.retain(|label| seen.insert(label.clone()));
    }
}
