//! Invariant checks for populated graphs.
//!
//! Each check returns human-readable error strings so a failing test shows
//! every broken invariant at once.

use std::collections::HashSet;

use gitonto_core::graph::{EntityKind, Relation, Tag};
use gitonto_core::registry::EntityRegistry;

/// Classification tags agree with graph structure.
pub fn check_tags(registry: &EntityRegistry) -> Vec<String> {
    let mut errors = Vec::new();

    for (idx, node) in registry.nodes_of_kind(EntityKind::Commit) {
        let parents = registry.targets(idx, Relation::Parent).len();
        if node.has_tag(Tag::MergeCommit) != (parents >= 2) {
            errors.push(format!("{}: MergeCommit tag disagrees with {} parents", node.id(), parents));
        }
        if node.has_tag(Tag::InitialCommit) != (parents == 0) {
            errors.push(format!("{}: InitialCommit tag disagrees with {} parents", node.id(), parents));
        }
        if node.has_tag(Tag::MergeCommit) && node.has_tag(Tag::InitialCommit) {
            errors.push(format!("{}: both MergeCommit and InitialCommit", node.id()));
        }
    }

    for (idx, node) in registry.nodes_of_kind(EntityKind::Branch) {
        let merged = registry.merged_into(idx).is_some();
        if node.has_tag(Tag::UnmergedBranch) == merged {
            errors.push(format!("{}: UnmergedBranch tag disagrees with merge target", node.id()));
        }
    }

    for (_, node) in registry.nodes() {
        for tag in &node.tags {
            if tag.applies_to() != node.kind() {
                errors.push(format!("{}: tag {} on a {}", node.id(), tag, node.kind()));
            }
        }
    }

    errors
}

/// Structural invariants: unique ids, single owning branch, same-repo merges.
pub fn check_structure(registry: &EntityRegistry) -> Vec<String> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for (_, node) in registry.nodes() {
        if !seen.insert(node.id()) {
            errors.push(format!("duplicate node id {}", node.id()));
        }
    }

    for (idx, node) in registry.nodes_of_kind(EntityKind::Commit) {
        let owners = registry.sources(idx, Relation::HasCommit).len();
        if owners > 1 {
            errors.push(format!("{}: owned by {} branches", node.id(), owners));
        }
        if registry.targets(idx, Relation::Parent).contains(&idx) {
            errors.push(format!("{}: is its own parent", node.id()));
        }
    }

    for (idx, node) in registry.nodes_of_kind(EntityKind::Branch) {
        if let Some(target) = registry.merged_into(idx) {
            let target_repo = registry.node(target).and_then(|t| t.key.repo_id());
            if target_repo != node.key.repo_id() {
                errors.push(format!("{}: merged across repositories", node.id()));
            }
            if target == idx {
                errors.push(format!("{}: merged into itself", node.id()));
            }
        }
    }

    errors
}

/// After concurrency detection every user carries an explicit verdict.
pub fn check_user_verdicts(registry: &EntityRegistry) -> Vec<String> {
    registry
        .nodes_of_kind(EntityKind::User)
        .filter_map(|(_, node)| {
            let user = node.as_user()?;
            match user.concurrent_contributor {
                None => Some(format!("{}: no concurrency verdict", node.id())),
                Some(flag) if flag != node.has_tag(Tag::ConcurrentContributor) => {
                    Some(format!("{}: verdict disagrees with tag", node.id()))
                }
                Some(_) => None,
            }
        })
        .collect()
}

/// All invariant checks for a graph produced by the full pipeline.
pub fn check_invariants(registry: &EntityRegistry) -> Vec<String> {
    let mut errors = check_tags(registry);
    errors.extend(check_structure(registry));
    errors.extend(check_user_verdicts(registry));
    errors
}

/// Panic with every broken invariant listed.
pub fn assert_invariants(registry: &EntityRegistry) {
    let errors = check_invariants(registry);
    assert!(
        errors.is_empty(),
        "graph invariants violated:\n  {}",
        errors.join("\n  ")
    );
}
