//! The store: a filesystem-backed, lock-guarded implementation of the
//! operations in spec §6.4, built from the primitives in this module's
//! children.
//!
//! [`FileStore`] owns a project directory (`<beads_dir>/<project-name>`,
//! containing `open/`, `closed/`, `deleted/`) and a loaded [`StoreConfig`].
//! Every mutation funnels through [`modify::modify`] (or the dedicated
//! create/tombstone/delete primitives in [`lifecycle`]), which serializes
//! concurrent access per issue ID via [`locks::LockTable`].

pub mod layout;
pub mod locks;

mod cascade;
mod dependency;
mod lifecycle;
mod modify;
mod query;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::model::{DependencyKind, Draft, Issue, Status};

use layout::Bucket;
use locks::LockTable;

/// Default wait before a contended lock surfaces [`crate::BeadsError::Busy`].
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// A filter for [`IssueStore::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Which status buckets to scan. Empty means `open` only (spec §4.6).
    pub buckets: Vec<Bucket>,
    /// Restrict to an exact status value, after bucket selection.
    pub status: Option<Status>,
    /// Whether the `deleted` bucket may be scanned even when `buckets` is
    /// empty. Ignored once `buckets` is explicitly non-empty.
    pub include_tombstoned: bool,
}

impl ListFilter {
    #[must_use]
    pub fn open() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn closed() -> Self {
        Self {
            buckets: vec![Bucket::Closed],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn deleted() -> Self {
        Self {
            buckets: vec![Bucket::Deleted],
            include_tombstoned: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn all_buckets() -> Self {
        Self {
            buckets: Bucket::ALL.to_vec(),
            include_tombstoned: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }
}

/// An open issue together with the list of still-open IDs blocking it
/// (spec §4.6, `Blocked()`).
#[derive(Debug, Clone)]
pub struct BlockedIssue {
    pub issue: Issue,
    pub blocking: Vec<String>,
}

/// The operations a store implementation exposes (spec §6.4). Kept
/// object-safe (no generics on trait methods) so callers can hold
/// `Box<dyn IssueStore>`.
pub trait IssueStore {
    /// Ensure the on-disk layout exists.
    fn init(&self) -> Result<()>;

    /// Create a new issue, returning its (possibly freshly allocated) ID.
    fn create(&self, draft: Draft) -> Result<String>;

    /// Fetch a single issue by exact ID.
    fn get(&self, id: &str) -> Result<Issue>;

    /// List issues matching `filter`.
    fn list(&self, filter: &ListFilter) -> Result<Vec<Issue>>;

    /// Atomically load, transform, validate, and persist an issue.
    fn modify(&self, id: &str, transform: &mut dyn FnMut(&mut Issue) -> Result<()>) -> Result<()>;

    /// Close an issue, with an optional reason.
    fn close(&self, id: &str, reason: Option<String>) -> Result<()>;

    /// Hard-delete an issue outright.
    fn delete(&self, id: &str) -> Result<()>;

    /// Soft-delete (tombstone) an issue.
    fn create_tombstone(&self, id: &str, deleted_by: Option<String>, reason: Option<String>) -> Result<()>;

    /// Add a typed dependency edge `a <kind> b`.
    fn add_dependency(&self, a: &str, b: &str, kind: DependencyKind) -> Result<()>;

    /// Remove every edge between `a` and `b`.
    fn remove_dependency(&self, a: &str, b: &str) -> Result<()>;

    /// Allocate (without creating) the next child ID under `parent`.
    fn get_next_child_id(&self, parent: &str) -> Result<String>;

    /// Append a comment to an issue.
    fn add_comment(&self, id: &str, author: Option<String>, text: String) -> Result<()>;

    /// Resolve a prefix to exactly one live ID.
    fn find_by_prefix(&self, prefix: &str) -> Result<String>;

    /// Open, non-ephemeral issues with no open `blocks` dependency.
    fn ready(&self) -> Result<Vec<Issue>>;

    /// Open, non-ephemeral issues with at least one open `blocks` dependency.
    fn blocked(&self) -> Result<Vec<BlockedIssue>>;

    /// Direct children of `id`, in edge-insertion order.
    fn children(&self, id: &str) -> Result<Vec<String>>;

    /// Case-insensitive substring search over title (and, unless
    /// `title_only`, description).
    fn search(&self, query: &str, title_only: bool) -> Result<Vec<Issue>>;

    /// Soft- or hard-delete `id` and everything transitively dependent on
    /// it, repairing textual references and cross-set edges in survivors.
    fn cascade_delete(&self, id: &str, hard: bool, deleted_by: Option<String>, reason: Option<String>) -> Result<Vec<String>>;
}

/// A filesystem-backed [`IssueStore`] rooted at `<beads_dir>/<project>`.
pub struct FileStore {
    project_dir: PathBuf,
    config: StoreConfig,
    locks: LockTable,
}

impl FileStore {
    /// Open a store for `project_name` under `beads_dir`, loading
    /// `<beads_dir>/config.yaml` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but fails to parse.
    pub fn open(beads_dir: &Path, project_name: &str) -> Result<Self> {
        let config = StoreConfig::load(beads_dir)?;
        Ok(Self {
            project_dir: beads_dir.join(project_name),
            config,
            locks: LockTable::new(DEFAULT_LOCK_TIMEOUT),
        })
    }

    /// Build a store directly from an already-loaded config, bypassing
    /// disk for the config layer (used by tests and embedders that manage
    /// configuration themselves).
    #[must_use]
    pub fn with_config(project_dir: PathBuf, config: StoreConfig) -> Self {
        Self {
            project_dir,
            config,
            locks: LockTable::new(DEFAULT_LOCK_TIMEOUT),
        }
    }

    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl IssueStore for FileStore {
    fn init(&self) -> Result<()> {
        layout::ensure_layout(&self.project_dir)
    }

    fn create(&self, draft: Draft) -> Result<String> {
        lifecycle::create(self, draft)
    }

    fn get(&self, id: &str) -> Result<Issue> {
        let (path, _bucket) = layout::locate(&self.project_dir, id)?;
        layout::read_issue(&path)
    }

    fn list(&self, filter: &ListFilter) -> Result<Vec<Issue>> {
        query::list(self, filter)
    }

    fn modify(&self, id: &str, transform: &mut dyn FnMut(&mut Issue) -> Result<()>) -> Result<()> {
        modify::modify(self, id, transform)
    }

    fn close(&self, id: &str, reason: Option<String>) -> Result<()> {
        lifecycle::close(self, id, reason)
    }

    fn delete(&self, id: &str) -> Result<()> {
        lifecycle::delete(self, id)
    }

    fn create_tombstone(&self, id: &str, deleted_by: Option<String>, reason: Option<String>) -> Result<()> {
        lifecycle::create_tombstone(self, id, deleted_by, reason)
    }

    fn add_dependency(&self, a: &str, b: &str, kind: DependencyKind) -> Result<()> {
        dependency::add_dependency(self, a, b, kind)
    }

    fn remove_dependency(&self, a: &str, b: &str) -> Result<()> {
        dependency::remove_dependency(self, a, b)
    }

    fn get_next_child_id(&self, parent: &str) -> Result<String> {
        lifecycle::next_child_id(self, parent)
    }

    fn add_comment(&self, id: &str, author: Option<String>, text: String) -> Result<()> {
        let mut transform = move |issue: &mut Issue| {
            let next_comment_id = issue.comments.last().map_or(1, |c| c.id + 1);
            issue.comments.push(crate::model::Comment {
                id: next_comment_id,
                author: author.clone(),
                text: text.clone(),
                created_at: chrono::Utc::now(),
            });
            Ok(())
        };
        self.modify(id, &mut transform)
    }

    fn find_by_prefix(&self, prefix: &str) -> Result<String> {
        query::find_by_prefix(self, prefix)
    }

    fn ready(&self) -> Result<Vec<Issue>> {
        query::ready(self)
    }

    fn blocked(&self) -> Result<Vec<BlockedIssue>> {
        query::blocked(self)
    }

    fn children(&self, id: &str) -> Result<Vec<String>> {
        query::children(self, id)
    }

    fn search(&self, query: &str, title_only: bool) -> Result<Vec<Issue>> {
        query::search(self, query, title_only)
    }

    fn cascade_delete(&self, id: &str, hard: bool, deleted_by: Option<String>, reason: Option<String>) -> Result<Vec<String>> {
        cascade::cascade_delete(self, id, hard, deleted_by, reason)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A `FileStore` rooted in a fresh temp directory, layout initialized,
    /// default config. Leaks the `TempDir` into the returned store's path
    /// by leaking the guard itself, since submodule unit tests only need
    /// the directory to outlive the test function's stack frame.
    pub(crate) fn test_store() -> FileStore {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("proj");
        std::mem::forget(temp);
        let store = FileStore::with_config(project_dir, StoreConfig::default());
        store.init().unwrap();
        store
    }

    #[test]
    fn init_creates_all_three_buckets() {
        let store = test_store();
        assert!(store.project_dir().join("open").is_dir());
        assert!(store.project_dir().join("closed").is_dir());
        assert!(store.project_dir().join("deleted").is_dir());
    }

    #[test]
    fn create_get_round_trip() {
        let store = test_store();
        let id = store.create(Draft::new("bd-test", "Hello")).unwrap();
        let issue = store.get(&id).unwrap();
        assert_eq!(issue.title, "Hello");
        assert_eq!(issue.status, Status::Open);
    }

    #[test]
    fn list_default_filter_returns_only_open() {
        let store = test_store();
        store.create(Draft::new("bd-open", "x")).unwrap();
        let closed_id = store.create(Draft::new("bd-clsd", "y")).unwrap();
        store.close(&closed_id, None).unwrap();

        let open_issues = store.list(&ListFilter::open()).unwrap();
        assert_eq!(open_issues.len(), 1);
        assert_eq!(open_issues[0].id, "bd-open");
    }

    #[test]
    fn add_comment_numbers_monotonically() {
        let store = test_store();
        store.create(Draft::new("bd-note", "x")).unwrap();
        store.add_comment("bd-note", Some("alice".into()), "first".into()).unwrap();
        store.add_comment("bd-note", Some("bob".into()), "second".into()).unwrap();
        let issue = store.get("bd-note").unwrap();
        assert_eq!(issue.comments.len(), 2);
        assert_eq!(issue.comments[0].id, 1);
        assert_eq!(issue.comments[1].id, 2);
    }
}
