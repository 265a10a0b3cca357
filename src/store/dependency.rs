//! The typed dependency graph: cycle detection and edge mutation
//! (spec §4.3).

use std::collections::HashSet;

use crate::error::{BeadsError, Result};
use crate::model::{Dependency, DependencyKind};

use super::{FileStore, IssueStore};

/// Whether adding a direction-preserving edge `from -> to` would close a
/// cycle, i.e. whether `to` can already reach `from` by following
/// non-symmetric outbound edges. `related`/`relates-to` are excluded from
/// the traversal (spec §4.3: cycle detection runs over the union of all
/// direction-preserving edge types).
pub(super) fn would_create_cycle(store: &FileStore, from: &str, to: &str) -> Result<bool> {
    if from == to {
        return Ok(true);
    }
    let mut visited = HashSet::new();
    let mut stack = vec![to.to_string()];
    while let Some(current) = stack.pop() {
        if current == from {
            return Ok(true);
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        let Ok(issue) = store.get(&current) else {
            continue;
        };
        for dep in &issue.dependencies {
            if !dep.kind.is_symmetric() && !visited.contains(&dep.id) {
                stack.push(dep.id.clone());
            }
        }
    }
    Ok(false)
}

/// Depth of `id` in the parent-child tree: number of `parent-child` hops
/// to the root ancestor.
fn graph_depth(store: &FileStore, id: &str) -> Result<usize> {
    let mut depth = 0;
    let mut current = id.to_string();
    let mut seen = HashSet::new();
    while let Ok(issue) = store.get(&current) {
        if let Some(parent) = issue.parent() {
            if !seen.insert(current.clone()) {
                break; // defensive: single-parent invariant should prevent this
            }
            depth += 1;
            current = parent.to_string();
        } else {
            break;
        }
    }
    Ok(depth)
}

fn is_ancestor_of(store: &FileStore, candidate: &str, of: &str) -> Result<bool> {
    let mut current = of.to_string();
    let mut seen = HashSet::new();
    while let Ok(issue) = store.get(&current) {
        let Some(parent) = issue.parent() else { break };
        if parent == candidate {
            return Ok(true);
        }
        if !seen.insert(parent.to_string()) {
            break;
        }
        current = parent.to_string();
    }
    Ok(false)
}

fn is_descendant_of(store: &FileStore, candidate: &str, of: &str) -> Result<bool> {
    is_ancestor_of(store, of, candidate)
}

/// Add a typed edge: `a <kind> b` (spec §4.3, "A is a child of B" etc).
/// Writes both the outbound edge on `a` and the inverse edge on `b`,
/// acquiring the two per-issue locks in lexicographic ID order to
/// preclude deadlock with a concurrent call on the same pair (spec §5).
/// Idempotent: a pre-existing identical edge is a no-op.
///
/// # Errors
///
/// Returns [`BeadsError::Cycle`] if the edge would close a cycle,
/// [`BeadsError::MaxDepthExceeded`] if a `parent-child` edge would exceed
/// the configured depth, or [`BeadsError::InvalidField`] if `a` already
/// has a parent or `b` is already an ancestor/descendant of `a`.
pub fn add_dependency(store: &FileStore, a: &str, b: &str, kind: DependencyKind) -> Result<()> {
    if store
        .get(a)?
        .dependencies
        .iter()
        .any(|d| d.id == b && d.kind == kind)
    {
        return Ok(());
    }

    if !kind.is_symmetric() && would_create_cycle(store, a, b)? {
        return Err(BeadsError::Cycle {
            from: a.to_string(),
            to: b.to_string(),
        });
    }

    if kind == DependencyKind::ParentChild {
        let issue_a = store.get(a)?;
        if issue_a.parent().is_some() {
            return Err(BeadsError::invalid_field(
                "parent",
                format!("{a} already has a parent"),
            ));
        }
        if is_descendant_of(store, b, a)? {
            return Err(BeadsError::invalid_field(
                "parent",
                format!("{b} is already a descendant of {a}"),
            ));
        }
        if is_ancestor_of(store, b, a)? {
            return Err(BeadsError::invalid_field(
                "parent",
                format!("{b} is already an ancestor of {a}"),
            ));
        }
        let resulting_depth = graph_depth(store, b)? + 1;
        if resulting_depth > store.config.max_depth {
            return Err(BeadsError::MaxDepthExceeded {
                id: a.to_string(),
                max: store.config.max_depth,
            });
        }
    }

    let a_owned = a.to_string();
    let b_owned = b.to_string();
    let mut add_outbound = move |issue: &mut crate::model::Issue| {
        if !issue.dependencies.iter().any(|d| d.id == b_owned && d.kind == kind) {
            issue.dependencies.push(Dependency::new(b_owned.clone(), kind));
        }
        Ok(())
    };
    let mut add_inbound = move |issue: &mut crate::model::Issue| {
        if !issue.dependents.iter().any(|d| d.id == a_owned && d.kind == kind) {
            issue.dependents.push(Dependency::new(a_owned.clone(), kind));
        }
        Ok(())
    };

    if a <= b {
        store.modify(a, &mut add_outbound)?;
        store.modify(b, &mut add_inbound)?;
    } else {
        store.modify(b, &mut add_inbound)?;
        store.modify(a, &mut add_outbound)?;
    }
    Ok(())
}

/// Remove every edge between `a` and `b`, in both directions, regardless
/// of type. Idempotent: absent edges are a no-op (spec §4.3).
///
/// # Errors
///
/// Propagates lookup or I/O failures from the underlying modify calls.
pub fn remove_dependency(store: &FileStore, a: &str, b: &str) -> Result<()> {
    let a_has_edge = store.get(a).map(|i| i.has_dependency(b)).unwrap_or(false);
    let b_has_edge = store.get(b).map(|i| i.has_dependency(a)).unwrap_or(false);
    if !a_has_edge && !b_has_edge {
        return Ok(());
    }

    let b_owned = b.to_string();
    let a_owned = a.to_string();
    let mut strip_a = move |issue: &mut crate::model::Issue| {
        issue.dependencies.retain(|d| d.id != b_owned);
        issue.dependents.retain(|d| d.id != b_owned);
        Ok(())
    };
    let mut strip_b = move |issue: &mut crate::model::Issue| {
        issue.dependencies.retain(|d| d.id != a_owned);
        issue.dependents.retain(|d| d.id != a_owned);
        Ok(())
    };

    if a <= b {
        store.modify(a, &mut strip_a)?;
        store.modify(b, &mut strip_b)?;
    } else {
        store.modify(b, &mut strip_b)?;
        store.modify(a, &mut strip_a)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_store;
    use super::*;
    use crate::model::{Draft, Status};

    #[test]
    fn add_and_query_simple_blocks_edge() {
        let store = test_store();
        store.create(Draft::new("bd-aaaa", "A")).unwrap();
        store.create(Draft::new("bd-bbbb", "B")).unwrap();
        add_dependency(&store, "bd-aaaa", "bd-bbbb", DependencyKind::Blocks).unwrap();

        assert!(store.get("bd-aaaa").unwrap().has_dependency("bd-bbbb"));
        assert!(store.get("bd-bbbb").unwrap().has_dependent("bd-aaaa"));
    }

    #[test]
    fn rejects_direct_cycle() {
        let store = test_store();
        store.create(Draft::new("bd-aaaa", "A")).unwrap();
        store.create(Draft::new("bd-bbbb", "B")).unwrap();
        add_dependency(&store, "bd-aaaa", "bd-bbbb", DependencyKind::Blocks).unwrap();
        let err = add_dependency(&store, "bd-bbbb", "bd-aaaa", DependencyKind::Blocks).unwrap_err();
        assert!(matches!(err, BeadsError::Cycle { .. }));
    }

    #[test]
    fn rejects_transitive_cycle_across_three_nodes() {
        let store = test_store();
        for id in ["bd-aaaa", "bd-bbbb", "bd-cccc"] {
            store.create(Draft::new(id, "x")).unwrap();
        }
        add_dependency(&store, "bd-aaaa", "bd-bbbb", DependencyKind::Blocks).unwrap();
        add_dependency(&store, "bd-bbbb", "bd-cccc", DependencyKind::Blocks).unwrap();
        let err = add_dependency(&store, "bd-cccc", "bd-aaaa", DependencyKind::Blocks).unwrap_err();
        assert!(matches!(err, BeadsError::Cycle { .. }));
    }

    #[test]
    fn symmetric_related_edges_are_exempt_from_cycle_check() {
        let store = test_store();
        store.create(Draft::new("bd-aaaa", "A")).unwrap();
        store.create(Draft::new("bd-bbbb", "B")).unwrap();
        add_dependency(&store, "bd-aaaa", "bd-bbbb", DependencyKind::Related).unwrap();
        add_dependency(&store, "bd-bbbb", "bd-aaaa", DependencyKind::Related).unwrap();
    }

    #[test]
    fn parent_child_rejects_second_parent() {
        let store = test_store();
        for id in ["bd-aaaa", "bd-bbbb", "bd-cccc"] {
            store.create(Draft::new(id, "x")).unwrap();
        }
        add_dependency(&store, "bd-aaaa", "bd-bbbb", DependencyKind::ParentChild).unwrap();
        let err = add_dependency(&store, "bd-aaaa", "bd-cccc", DependencyKind::ParentChild).unwrap_err();
        assert!(matches!(err, BeadsError::InvalidField { .. }));
    }

    #[test]
    fn remove_dependency_is_idempotent() {
        let store = test_store();
        store.create(Draft::new("bd-aaaa", "A")).unwrap();
        store.create(Draft::new("bd-bbbb", "B")).unwrap();
        remove_dependency(&store, "bd-aaaa", "bd-bbbb").unwrap();
        add_dependency(&store, "bd-aaaa", "bd-bbbb", DependencyKind::Blocks).unwrap();
        remove_dependency(&store, "bd-aaaa", "bd-bbbb").unwrap();
        remove_dependency(&store, "bd-aaaa", "bd-bbbb").unwrap();
        assert!(!store.get("bd-aaaa").unwrap().has_dependency("bd-bbbb"));
    }

    #[test]
    fn add_then_remove_restores_empty_edge_set() {
        let store = test_store();
        store.create(Draft::new("bd-aaaa", "A")).unwrap();
        store.create(Draft::new("bd-bbbb", "B")).unwrap();
        add_dependency(&store, "bd-aaaa", "bd-bbbb", DependencyKind::Tracks).unwrap();
        remove_dependency(&store, "bd-aaaa", "bd-bbbb").unwrap();
        assert!(store.get("bd-aaaa").unwrap().dependencies.is_empty());
        assert!(store.get("bd-bbbb").unwrap().dependents.is_empty());
        assert_eq!(store.get("bd-aaaa").unwrap().status, Status::Open);
    }
}
