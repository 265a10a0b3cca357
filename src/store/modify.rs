//! The Modify protocol: the single atomic read-modify-write primitive
//! every mutation funnels through (spec §4.4).
//!
//! 1. Acquire the per-ID lock.
//! 2. Locate the issue's current file.
//! 3. Load and deserialize it.
//! 4. Apply the caller's transform.
//! 5. Reject a direct transition into `tombstone` (only `CreateTombstone`
//!    may do that).
//! 6. Validate the result.
//! 7. Relocate/write atomically if the status bucket changed.
//! 8. Release the lock.

use chrono::Utc;

use crate::error::{BeadsError, Result};
use crate::model::{Issue, Status};
use crate::validation::IssueValidator;

use super::layout::{self, Bucket};
use super::FileStore;

pub(super) fn modify(
    store: &FileStore,
    id: &str,
    transform: &mut dyn FnMut(&mut Issue) -> Result<()>,
) -> Result<()> {
    store.locks.with_lock(id, || {
        let (path, bucket) = layout::locate(&store.project_dir, id)?;
        let mut issue = layout::read_issue(&path)?;
        let prior_status = issue.status.clone();

        transform(&mut issue)?;

        if issue.status == Status::Tombstone && prior_status != Status::Tombstone {
            return Err(BeadsError::invalid_field(
                "status",
                "cannot transition to tombstone via Modify; use CreateTombstone",
            ));
        }

        IssueValidator::dedupe_labels(&mut issue);

        let status_changed = issue.status != prior_status;
        issue.updated_at = Utc::now();
        if issue.status == Status::Closed && prior_status != Status::Closed {
            issue.closed_at = Some(issue.updated_at);
        } else if issue.status != Status::Closed && prior_status == Status::Closed {
            issue.closed_at = None;
            issue.close_reason = None;
        }

        IssueValidator::validate(&issue, &store.config)?;

        let new_bucket = Bucket::for_status(&issue.status);
        if status_changed && new_bucket != bucket {
            let new_path = layout::path_for(&store.project_dir, new_bucket, id);
            layout::atomic_write(&new_path, &issue)?;
            layout::remove_file(&path)?;
        } else {
            layout::atomic_write(&path, &issue)?;
        }

        Ok(())
    })
}
