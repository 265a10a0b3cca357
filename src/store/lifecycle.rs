//! Identifier allocation and the create/close/delete/tombstone primitives
//! (spec §4.1, §4.5).

use chrono::Utc;

use crate::error::{BeadsError, Result};
use crate::id;
use crate::model::{Draft, Issue, Status};
use crate::validation::IssueValidator;

use super::layout::{self, Bucket};
use super::{FileStore, IssueStore};

const MAX_SLUG_ATTEMPTS: usize = 64;

/// Allocate a fresh root ID: `<prefix>-<random slug>`, retrying on
/// collision against any of the three buckets (spec §4.1).
///
/// # Errors
///
/// Returns [`BeadsError::InvalidField`] if no unique slug was found after
/// [`MAX_SLUG_ATTEMPTS`] tries.
pub fn next_root_id(store: &FileStore) -> Result<String> {
    for _ in 0..MAX_SLUG_ATTEMPTS {
        let candidate = format!(
            "{}-{}",
            store.config.id_prefix,
            id::generate_slug(store.config.id_length)
        );
        if !id_exists_anywhere(store, &candidate)? {
            return Ok(candidate);
        }
    }
    Err(BeadsError::invalid_field(
        "id",
        "exhausted slug generation attempts without finding a unique ID",
    ))
}

/// Allocate the next child ID under `parent`: `<parent>.<n>`, where `n` is
/// one greater than the highest existing direct child ordinal.
///
/// # Errors
///
/// Returns [`BeadsError::NotFound`] if `parent` does not exist,
/// [`BeadsError::AlreadyTombstoned`] if it is a tombstone, or
/// [`BeadsError::MaxDepthExceeded`] if the child would exceed the
/// configured hierarchy depth.
pub fn next_child_id(store: &FileStore, parent: &str) -> Result<String> {
    let parent_issue = store.get(parent)?;
    if parent_issue.status == Status::Tombstone {
        return Err(BeadsError::AlreadyTombstoned {
            id: parent.to_string(),
        });
    }

    let parsed_parent = id::parse(parent, Some(&store.config.allowed_prefixes), true)?;
    if parsed_parent.depth() + 1 > store.config.max_depth {
        return Err(BeadsError::MaxDepthExceeded {
            id: parent.to_string(),
            max: store.config.max_depth,
        });
    }

    let mut max_ordinal = 0u32;
    for bucket in Bucket::ALL {
        for existing_id in layout::list_ids(&store.project_dir, bucket)? {
            let Ok(parsed) = id::parse(&existing_id, Some(&store.config.allowed_prefixes), true) else {
                continue;
            };
            if parsed.is_direct_child_of(&parsed_parent) {
                if let Some(&last) = parsed.ordinals.last() {
                    max_ordinal = max_ordinal.max(last);
                }
            }
        }
    }

    Ok(id::child_id(parent, max_ordinal + 1))
}

fn id_exists_anywhere(store: &FileStore, candidate_id: &str) -> Result<bool> {
    match layout::locate(&store.project_dir, candidate_id) {
        Ok(_) => Ok(true),
        Err(BeadsError::NotFound { .. }) => Ok(false),
        Err(other) => Err(other),
    }
}

fn id_exists_live(store: &FileStore, candidate_id: &str) -> Result<bool> {
    for bucket in [Bucket::Open, Bucket::Closed] {
        if layout::path_for(&store.project_dir, bucket, candidate_id).is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Create a new issue. If `draft.id` is empty, a fresh root ID is
/// allocated. If the ID names a tombstone, the issue is resurrected in
/// place (spec §4.5, S5): the old tombstone file is removed and `draft`
/// is written fresh under the same ID, open, with tombstone fields unset.
/// `issue_type`/`priority` omitted on the draft (`None`) fall back to
/// `StoreConfig::default_type`/`default_priority` (spec §6.3); an omitted
/// `status` falls back to `open`.
///
/// # Errors
///
/// Returns [`BeadsError::AlreadyExists`] if the ID already names a live
/// (non-tombstoned) issue, or any validation failure from
/// [`IssueValidator`].
pub fn create(store: &FileStore, draft: Draft) -> Result<String> {
    let requested_id = draft.id.clone();
    let target_id = if requested_id.is_empty() {
        next_root_id(store)?
    } else {
        id::parse(&requested_id, Some(&store.config.allowed_prefixes), false)?;
        requested_id
    };

    if draft.status == Some(Status::Tombstone) {
        return Err(BeadsError::invalid_field(
            "status",
            "cannot create directly into tombstone; use CreateTombstone",
        ));
    }

    store.locks.with_lock(&target_id, || {
        if id_exists_live(store, &target_id)? {
            return Err(BeadsError::AlreadyExists { id: target_id.clone() });
        }

        // Resurrection: remove a stale tombstone sharing this ID first.
        let deleted_path = layout::path_for(&store.project_dir, Bucket::Deleted, &target_id);
        if deleted_path.is_file() {
            layout::remove_file(&deleted_path)?;
        }

        let now = Utc::now();
        let mut issue = Issue::new(target_id.clone(), draft.title.clone());
        issue.issue_type = draft.issue_type.clone().unwrap_or_else(|| store.config.default_type.clone());
        issue.priority = draft.priority.unwrap_or(store.config.default_priority);
        issue.status = draft.status.clone().unwrap_or_default();
        issue.assignee = draft.assignee.clone();
        issue.created_by = draft.created_by.clone();
        issue.owner = draft.owner.clone();
        issue.labels = draft.labels.clone();
        issue.description = draft.description.clone();
        issue.ephemeral = draft.ephemeral;
        issue.await_type = draft.await_type.clone();
        issue.await_id = draft.await_id.clone();
        issue.timeout_ns = draft.timeout_ns;
        issue.created_at = now;
        issue.updated_at = now;
        IssueValidator::dedupe_labels(&mut issue);

        IssueValidator::validate(&issue, &store.config)?;

        let path = layout::path_for(&store.project_dir, Bucket::for_status(&issue.status), &target_id);
        layout::atomic_write(&path, &issue)?;
        Ok(target_id.clone())
    })
}

/// Close an issue (spec §4.5): sets `status = closed`, stamps
/// `closed_at`, and records an optional reason.
///
/// # Errors
///
/// Propagates [`super::modify`] failures, including [`BeadsError::NotFound`].
pub fn close(store: &FileStore, id: &str, reason: Option<String>) -> Result<()> {
    let mut transform = move |issue: &mut Issue| {
        issue.status = Status::Closed;
        issue.close_reason = reason.clone();
        Ok(())
    };
    store.modify(id, &mut transform)
}

/// Hard-delete an issue: removes its file outright, with no tombstone
/// left behind. Callers are responsible for dependency cleanup first
/// (see [`super::cascade`]).
///
/// # Errors
///
/// Returns [`BeadsError::NotFound`] if the issue does not exist.
pub fn delete(store: &FileStore, id: &str) -> Result<()> {
    store.locks.with_lock(id, || {
        let (path, _bucket) = layout::locate(&store.project_dir, id)?;
        layout::remove_file(&path)
    })
}

/// Soft-delete an issue: relocates it to `deleted/`, recording
/// `original_type`, `deleted_at`, `deleted_by`, and `delete_reason`
/// (spec §4.5).
///
/// # Errors
///
/// Returns [`BeadsError::AlreadyTombstoned`] if the issue is already a
/// tombstone.
pub fn create_tombstone(store: &FileStore, id: &str, deleted_by: Option<String>, reason: Option<String>) -> Result<()> {
    store.locks.with_lock(id, || {
        let (path, bucket) = layout::locate(&store.project_dir, id)?;
        let mut issue = layout::read_issue(&path)?;

        if issue.status == Status::Tombstone {
            return Err(BeadsError::AlreadyTombstoned { id: id.to_string() });
        }

        let original_type = issue.issue_type.as_str().to_string();
        let now = Utc::now();
        issue.original_type = Some(original_type);
        issue.status = Status::Tombstone;
        issue.deleted_at = Some(now);
        issue.deleted_by = deleted_by;
        issue.delete_reason = reason;
        issue.updated_at = now;

        let new_path = layout::path_for(&store.project_dir, Bucket::Deleted, id);
        layout::atomic_write(&new_path, &issue)?;
        if new_path != path {
            layout::remove_file(&path)?;
        }
        let _ = bucket;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_store;
    use super::*;

    #[test]
    fn create_without_id_allocates_a_root_id() {
        let store = test_store();
        let id = create(&store, Draft::new(String::new(), "New issue")).unwrap();
        assert!(id::is_valid_id_format(&id));
        assert_eq!(store.get(&id).unwrap().title, "New issue");
    }

    #[test]
    fn create_with_explicit_id_rejects_duplicate() {
        let store = test_store();
        create(&store, Draft::new("bd-fixd", "First")).unwrap();
        let err = create(&store, Draft::new("bd-fixd", "Second")).unwrap_err();
        assert!(matches!(err, BeadsError::AlreadyExists { .. }));
    }

    #[test]
    fn next_child_id_increments_ordinal() {
        let store = test_store();
        create(&store, Draft::new("bd-root", "Root")).unwrap();
        let first = next_child_id(&store, "bd-root").unwrap();
        assert_eq!(first, "bd-root.1");
        create(&store, Draft::new(first, "Child 1")).unwrap();
        let second = next_child_id(&store, "bd-root").unwrap();
        assert_eq!(second, "bd-root.2");
    }

    #[test]
    fn next_child_id_respects_max_depth() {
        let mut store = test_store();
        store.config.max_depth = 1;
        create(&store, Draft::new("bd-root", "Root")).unwrap();
        create(&store, Draft::new("bd-root.1", "Child")).unwrap();
        let err = next_child_id(&store, "bd-root.1").unwrap_err();
        assert!(matches!(err, BeadsError::MaxDepthExceeded { .. }));
    }

    #[test]
    fn close_sets_closed_at_and_moves_bucket() {
        let store = test_store();
        create(&store, Draft::new("bd-clse", "To close")).unwrap();
        close(&store, "bd-clse", Some("done".to_string())).unwrap();
        let issue = store.get("bd-clse").unwrap();
        assert_eq!(issue.status, Status::Closed);
        assert!(issue.closed_at.is_some());
        assert_eq!(issue.close_reason.as_deref(), Some("done"));
    }

    #[test]
    fn create_tombstone_then_resurrection_restores_open_issue() {
        let store = test_store();
        create(&store, Draft::new("bd-ress", "Original")).unwrap();
        create_tombstone(&store, "bd-ress", Some("alice".to_string()), Some("dup".to_string())).unwrap();
        assert_eq!(store.get("bd-ress").unwrap().status, Status::Tombstone);

        let resurrected_id = create(&store, Draft::new("bd-ress", "Resurrected")).unwrap();
        assert_eq!(resurrected_id, "bd-ress");
        let issue = store.get("bd-ress").unwrap();
        assert_eq!(issue.status, Status::Open);
        assert_eq!(issue.title, "Resurrected");
        assert!(issue.deleted_at.is_none());
    }

    #[test]
    fn create_tombstone_twice_fails() {
        let store = test_store();
        create(&store, Draft::new("bd-twic", "x")).unwrap();
        create_tombstone(&store, "bd-twic", None, None).unwrap();
        let err = create_tombstone(&store, "bd-twic", None, None).unwrap_err();
        assert!(matches!(err, BeadsError::AlreadyTombstoned { .. }));
    }

    #[test]
    fn hard_delete_removes_the_file_entirely() {
        let store = test_store();
        create(&store, Draft::new("bd-hard", "x")).unwrap();
        delete(&store, "bd-hard").unwrap();
        assert!(matches!(store.get("bd-hard"), Err(BeadsError::NotFound { .. })));
    }

    #[test]
    fn create_applies_configured_defaults_when_draft_omits_them() {
        let mut store = test_store();
        store.config.default_priority = crate::model::Priority::HIGH;
        store.config.default_type = crate::model::IssueType::Bug;

        create(&store, Draft::new("bd-dflt", "Untyped")).unwrap();
        let issue = store.get("bd-dflt").unwrap();
        assert_eq!(issue.priority, crate::model::Priority::HIGH);
        assert_eq!(issue.issue_type, crate::model::IssueType::Bug);
    }

    #[test]
    fn create_honors_explicit_priority_and_type_over_defaults() {
        let mut store = test_store();
        store.config.default_priority = crate::model::Priority::HIGH;
        store.config.default_type = crate::model::IssueType::Bug;

        let mut draft = Draft::new("bd-expl", "Typed");
        draft.priority = Some(crate::model::Priority::LOW);
        draft.issue_type = Some(crate::model::IssueType::Chore);
        create(&store, draft).unwrap();

        let issue = store.get("bd-expl").unwrap();
        assert_eq!(issue.priority, crate::model::Priority::LOW);
        assert_eq!(issue.issue_type, crate::model::IssueType::Chore);
    }
}
