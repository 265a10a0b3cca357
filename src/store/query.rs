//! Read-only query primitives (spec §4.6): listing, prefix lookup,
//! readiness, blocking, hierarchy, and text search.

use crate::error::{BeadsError, Result};
use crate::model::{DependencyKind, Issue, Status};

use super::layout::{self, Bucket};
use super::{BlockedIssue, FileStore, IssueStore, ListFilter};

pub(super) fn list(store: &FileStore, filter: &ListFilter) -> Result<Vec<Issue>> {
    let buckets: Vec<Bucket> = if filter.buckets.is_empty() {
        vec![Bucket::Open]
    } else {
        filter.buckets.clone()
    };

    let mut issues = Vec::new();
    for bucket in buckets {
        for id in layout::list_ids(&store.project_dir, bucket)? {
            let path = layout::path_for(&store.project_dir, bucket, &id);
            let issue = layout::read_issue(&path)?;
            if let Some(status) = &filter.status {
                if &issue.status != status {
                    continue;
                }
            }
            issues.push(issue);
        }
    }
    issues.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(issues)
}

/// Resolve a (possibly partial) prefix to exactly one live issue ID.
/// Tombstoned issues are not matched (spec §4.6).
///
/// # Errors
///
/// Returns [`BeadsError::NotFound`] for no match, or
/// [`BeadsError::Ambiguous`] for more than one.
pub(super) fn find_by_prefix(store: &FileStore, prefix: &str) -> Result<String> {
    let mut matches = Vec::new();
    for bucket in [Bucket::Open, Bucket::Closed] {
        for id in layout::list_ids(&store.project_dir, bucket)? {
            if id.starts_with(prefix) {
                matches.push(id);
            }
        }
    }
    matches.sort();
    matches.dedup();
    match matches.len() {
        0 => Err(BeadsError::NotFound { id: prefix.to_string() }),
        1 => Ok(matches.into_iter().next().unwrap()),
        _ => Err(BeadsError::Ambiguous {
            prefix: prefix.to_string(),
            matches,
        }),
    }
}

fn is_eligible_root(issue: &Issue) -> bool {
    issue.status == Status::Open && !issue.ephemeral
}

/// Open, non-ephemeral issues with no open `blocks` dependency
/// (spec §4.6, glossary "Ready").
pub(super) fn ready(store: &FileStore) -> Result<Vec<Issue>> {
    let mut out = Vec::new();
    for id in layout::list_ids(&store.project_dir, Bucket::Open)? {
        let issue = store.get(&id)?;
        if !is_eligible_root(&issue) {
            continue;
        }
        let mut blocked = false;
        for dep in &issue.dependencies {
            if dep.kind != DependencyKind::Blocks {
                continue;
            }
            if let Ok(target) = store.get(&dep.id) {
                if target.status != Status::Closed && target.status != Status::Tombstone {
                    blocked = true;
                    break;
                }
            }
        }
        if !blocked {
            out.push(issue);
        }
    }
    Ok(out)
}

/// Open, non-ephemeral issues with at least one still-open `blocks`
/// dependency, together with the list of blocking IDs (spec §4.6).
pub(super) fn blocked(store: &FileStore) -> Result<Vec<BlockedIssue>> {
    let mut out = Vec::new();
    for id in layout::list_ids(&store.project_dir, Bucket::Open)? {
        let issue = store.get(&id)?;
        if !is_eligible_root(&issue) {
            continue;
        }
        let mut blocking = Vec::new();
        for dep in &issue.dependencies {
            if dep.kind != DependencyKind::Blocks {
                continue;
            }
            if let Ok(target) = store.get(&dep.id) {
                if target.status != Status::Closed && target.status != Status::Tombstone {
                    blocking.push(dep.id.clone());
                }
            }
        }
        if !blocking.is_empty() {
            out.push(BlockedIssue { issue, blocking });
        }
    }
    Ok(out)
}

pub(super) fn children(store: &FileStore, id: &str) -> Result<Vec<String>> {
    let issue = store.get(id)?;
    Ok(issue.children().into_iter().map(str::to_string).collect())
}

/// Case-insensitive substring search over title (and, unless
/// `title_only`, description), across open and closed issues.
pub(super) fn search(store: &FileStore, query: &str, title_only: bool) -> Result<Vec<Issue>> {
    let needle = query.to_lowercase();
    let mut out = Vec::new();
    for bucket in [Bucket::Open, Bucket::Closed] {
        for id in layout::list_ids(&store.project_dir, bucket)? {
            let path = layout::path_for(&store.project_dir, bucket, &id);
            let issue = layout::read_issue(&path)?;
            let title_hit = issue.title.to_lowercase().contains(&needle);
            let description_hit = !title_only
                && issue
                    .description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle));
            if title_hit || description_hit {
                out.push(issue);
            }
        }
    }
    out.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_store;
    use super::*;
    use crate::model::Draft;

    #[test]
    fn ready_excludes_blocked_and_ephemeral() {
        let store = test_store();
        store.create(Draft::new("bd-goal", "Goal")).unwrap();
        store.create(Draft::new("bd-dep1", "Dependency")).unwrap();
        store
            .add_dependency("bd-goal", "bd-dep1", DependencyKind::Blocks)
            .unwrap();

        let mut ephemeral = Draft::new("bd-ephm", "Ephemeral");
        ephemeral.ephemeral = true;
        store.create(ephemeral).unwrap();

        let ready_ids: Vec<String> = ready(&store).unwrap().into_iter().map(|i| i.id).collect();
        assert!(ready_ids.contains(&"bd-dep1".to_string()));
        assert!(!ready_ids.contains(&"bd-goal".to_string()));
        assert!(!ready_ids.contains(&"bd-ephm".to_string()));
    }

    #[test]
    fn blocked_reports_blocking_ids() {
        let store = test_store();
        store.create(Draft::new("bd-goal", "Goal")).unwrap();
        store.create(Draft::new("bd-dep1", "Dependency")).unwrap();
        store
            .add_dependency("bd-goal", "bd-dep1", DependencyKind::Blocks)
            .unwrap();

        let blocked_issues = blocked(&store).unwrap();
        assert_eq!(blocked_issues.len(), 1);
        assert_eq!(blocked_issues[0].issue.id, "bd-goal");
        assert_eq!(blocked_issues[0].blocking, vec!["bd-dep1".to_string()]);
    }

    #[test]
    fn ready_includes_issue_once_blocker_closes() {
        let store = test_store();
        store.create(Draft::new("bd-goal", "Goal")).unwrap();
        store.create(Draft::new("bd-dep1", "Dependency")).unwrap();
        store
            .add_dependency("bd-goal", "bd-dep1", DependencyKind::Blocks)
            .unwrap();
        store.close("bd-dep1", None).unwrap();

        let ready_ids: Vec<String> = ready(&store).unwrap().into_iter().map(|i| i.id).collect();
        assert!(ready_ids.contains(&"bd-goal".to_string()));
    }

    #[test]
    fn find_by_prefix_disambiguates() {
        let store = test_store();
        store.create(Draft::new("bd-abc1", "x")).unwrap();
        store.create(Draft::new("bd-abc2", "x")).unwrap();
        let err = find_by_prefix(&store, "bd-abc").unwrap_err();
        assert!(matches!(err, BeadsError::Ambiguous { .. }));
        assert_eq!(find_by_prefix(&store, "bd-abc1").unwrap(), "bd-abc1");
    }

    #[test]
    fn search_matches_title_case_insensitively() {
        let store = test_store();
        store.create(Draft::new("bd-srch", "Fix Login Bug")).unwrap();
        let hits = search(&store, "login", false).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "bd-srch");
    }
}
