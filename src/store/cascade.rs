//! Cascade delete and textual reference repair (spec §4.7).

use std::collections::HashSet;

use regex::Regex;

use crate::error::Result;
use crate::model::Issue;

use super::{dependency, FileStore, IssueStore};

/// Gather every issue transitively reachable by following inbound edges
/// from `id` (its dependents, their dependents, ...), not including `id`
/// itself (spec §4.7, "CollectDependentsRecursive").
///
/// # Errors
///
/// Propagates lookup failures other than a missing issue, which is
/// treated as a dead end.
pub(super) fn collect_dependents_recursive(store: &FileStore, id: &str) -> Result<HashSet<String>> {
    let mut visited = HashSet::new();
    let mut stack = vec![id.to_string()];
    while let Some(current) = stack.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        if let Ok(issue) = store.get(&current) {
            for dep in &issue.dependents {
                if !visited.contains(&dep.id) {
                    stack.push(dep.id.clone());
                }
            }
        }
    }
    visited.remove(id);
    Ok(visited)
}

/// Replace bare occurrences of `id` in `text` with `[deleted:<id>]`,
/// respecting word boundaries so `bd-abcd` inside `bd-abcd2` is left
/// alone (spec §4.7).
///
/// The trailing boundary is checked against `text` directly rather than
/// captured by the regex: `regex` has no lookaround, and a captured
/// `post` group would consume the boundary character, so two occurrences
/// separated by exactly one separator (`"bd-abcd bd-abcd"`) would only
/// ever match the first — the second has no character left to satisfy
/// `pre`. Only the id itself is consumed on a match; the boundary
/// character is copied through untouched and remains available as the
/// next match's `pre`.
fn rewrite_references(text: &str, id: &str) -> String {
    let pattern = format!(r"(?P<pre>^|[^A-Za-z0-9_-])(?P<id>{})", regex::escape(id));
    // Compiled per call: ids are not known ahead of time, unlike the
    // fixed patterns in `crate::id` that justify a `Lazy` there.
    let re = Regex::new(&pattern).expect("generated pattern is always valid");

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(caps) = re.captures_at(text, pos) {
        let full = caps.get(0).unwrap();
        let pre = caps.name("pre").unwrap();
        let id_match = caps.name("id").unwrap();

        let followed_by_boundary = text[id_match.end()..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'));

        if followed_by_boundary {
            out.push_str(&text[pos..pre.end()]);
            out.push_str(&format!("[deleted:{id}]"));
            pos = id_match.end();
        } else {
            // Not a real match (e.g. `bd-abcd` inside `bd-abcd2`); copy
            // one character forward and keep scanning past it so an
            // overlapping later occurrence is still found.
            out.push_str(&text[pos..full.start() + 1]);
            pos = full.start() + 1;
        }
    }
    out.push_str(&text[pos..]);
    out
}

fn linked_survivors(store: &FileStore, to_delete: &HashSet<String>) -> Result<HashSet<String>> {
    let mut survivors = HashSet::new();
    for doomed_id in to_delete {
        let Ok(issue) = store.get(doomed_id) else { continue };
        for dep in issue.dependencies.iter().chain(issue.dependents.iter()) {
            if !to_delete.contains(&dep.id) {
                survivors.insert(dep.id.clone());
            }
        }
    }
    Ok(survivors)
}

/// Cascade-delete `id` and every issue transitively dependent on it.
/// Surviving issues that share an edge with a member of the deleted set
/// have those edges removed and any textual `<id>` references in their
/// description rewritten to `[deleted:<id>]`. Each member of the deleted
/// set is then soft-deleted (`hard = false`) or hard-deleted.
///
/// # Errors
///
/// Propagates any failure from the underlying dependency, modify, or
/// lifecycle calls; a partially applied cascade can leave some members
/// deleted and others not (spec §4.7 does not guarantee all-or-nothing
/// across the set).
pub fn cascade_delete(
    store: &FileStore,
    id: &str,
    hard: bool,
    deleted_by: Option<String>,
    reason: Option<String>,
) -> Result<Vec<String>> {
    let mut to_delete = collect_dependents_recursive(store, id)?;
    to_delete.insert(id.to_string());

    let survivors = linked_survivors(store, &to_delete)?;

    for survivor_id in &survivors {
        for doomed_id in &to_delete {
            dependency::remove_dependency(store, survivor_id, doomed_id)?;
            dependency::remove_dependency(store, doomed_id, survivor_id)?;
        }

        let to_delete_ref = to_delete.clone();
        let mut rewrite = move |issue: &mut Issue| {
            if let Some(description) = issue.description.clone() {
                let mut rewritten = description;
                for doomed_id in &to_delete_ref {
                    rewritten = rewrite_references(&rewritten, doomed_id);
                }
                issue.description = Some(rewritten);
            }
            Ok(())
        };
        store.modify(survivor_id, &mut rewrite)?;
    }

    let mut processed = Vec::new();
    let mut ordered: Vec<String> = to_delete.into_iter().collect();
    ordered.sort();
    for doomed_id in ordered {
        if hard {
            store.delete(&doomed_id)?;
        } else {
            store.create_tombstone(&doomed_id, deleted_by.clone(), reason.clone())?;
        }
        processed.push(doomed_id);
    }

    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_store;
    use super::*;
    use crate::model::{DependencyKind, Draft};

    #[test]
    fn collect_dependents_recursive_follows_inbound_chain() {
        let store = test_store();
        for id in ["bd-root", "bd-mid1", "bd-leaf"] {
            store.create(Draft::new(id, "x")).unwrap();
        }
        store
            .add_dependency("bd-mid1", "bd-root", DependencyKind::Blocks)
            .unwrap();
        store
            .add_dependency("bd-leaf", "bd-mid1", DependencyKind::Blocks)
            .unwrap();

        let dependents = collect_dependents_recursive(&store, "bd-root").unwrap();
        assert!(dependents.contains("bd-mid1"));
        assert!(dependents.contains("bd-leaf"));
        assert!(!dependents.contains("bd-root"));
    }

    #[test]
    fn cascade_delete_soft_deletes_root_and_dependents() {
        let store = test_store();
        for id in ["bd-root", "bd-mid1"] {
            store.create(Draft::new(id, "x")).unwrap();
        }
        store
            .add_dependency("bd-mid1", "bd-root", DependencyKind::Blocks)
            .unwrap();

        let processed = cascade_delete(&store, "bd-root", false, Some("alice".to_string()), None).unwrap();
        assert!(processed.contains(&"bd-root".to_string()));
        assert!(processed.contains(&"bd-mid1".to_string()));
        assert_eq!(store.get("bd-root").unwrap().status, crate::model::Status::Tombstone);
        assert_eq!(store.get("bd-mid1").unwrap().status, crate::model::Status::Tombstone);
    }

    #[test]
    fn cascade_delete_rewrites_surviving_references_and_strips_edges() {
        let store = test_store();
        store.create(Draft::new("bd-root", "Root")).unwrap();
        let mut survivor = Draft::new("bd-surv", "Survivor");
        survivor.description = Some("See bd-root for context.".to_string());
        store.create(survivor).unwrap();
        store
            .add_dependency("bd-surv", "bd-root", DependencyKind::Related)
            .unwrap();

        cascade_delete(&store, "bd-root", true, None, None).unwrap();

        let surv = store.get("bd-surv").unwrap();
        assert_eq!(surv.description.as_deref(), Some("See [deleted:bd-root] for context."));
        assert!(!surv.has_dependency("bd-root"));
        assert!(!surv.has_dependent("bd-root"));
    }

    #[test]
    fn rewrite_references_respects_word_boundaries() {
        let text = "Blocked by bd-abcd, not bd-abcd2.";
        let rewritten = rewrite_references(text, "bd-abcd");
        assert_eq!(rewritten, "Blocked by [deleted:bd-abcd], not bd-abcd2.");
    }

    #[test]
    fn rewrite_references_rewrites_adjacent_duplicates_separated_by_one_char() {
        assert_eq!(
            rewrite_references("bd-abcd bd-abcd", "bd-abcd"),
            "[deleted:bd-abcd] [deleted:bd-abcd]"
        );
        assert_eq!(
            rewrite_references("bd-abcd,bd-abcd", "bd-abcd"),
            "[deleted:bd-abcd],[deleted:bd-abcd]"
        );
    }
}
