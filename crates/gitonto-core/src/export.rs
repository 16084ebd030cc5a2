//! JSON snapshot export of a populated graph.
//!
//! Layout:
//!
//! ```json
//! {
//!   "schema_version": "1.0",
//!   "nodes": [{ "id": "commit_abc", "kind": "commit", "attributes": {..}, "tags": ["MergeCommit"] }],
//!   "edges": [{ "source": "repo_1", "target": "repo_1__branch_main", "relation": "hasBranch" }]
//! }
//! ```
//!
//! Nodes appear in creation order and edges in insertion order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::graph::{Edge, EntityKind, Tag};
use crate::registry::EntityRegistry;

/// Errors that can occur while writing a snapshot.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to encode the graph
    #[error("Failed to serialize graph: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failed to write the snapshot file
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One exported node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: String,
    pub kind: EntityKind,
    pub attributes: serde_json::Value,
    pub tags: Vec<Tag>,
}

/// A complete graph document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub schema_version: String,
    pub nodes: Vec<SnapshotNode>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Capture the registry's nodes and edges.
    pub fn from_registry(registry: &EntityRegistry) -> Result<Self, ExportError> {
        let nodes = registry
            .nodes()
            .map(|(_, node)| {
                Ok(SnapshotNode {
                    id: node.id(),
                    kind: node.kind(),
                    attributes: serde_json::to_value(&node.attrs)?,
                    tags: node.tags.iter().copied().collect(),
                })
            })
            .collect::<Result<Vec<_>, ExportError>>()?;

        Ok(Self {
            schema_version: registry.schema_version().to_string(),
            nodes,
            edges: registry.iter_edges().collect(),
        })
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, ExportError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Nodes of one kind
    pub fn nodes_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &SnapshotNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }
}

/// Write the registry as a snapshot file, creating parent directories.
pub fn write_snapshot(
    registry: &EntityRegistry,
    path: &Path,
    pretty: bool,
) -> Result<GraphSnapshot, ExportError> {
    let snapshot = GraphSnapshot::from_registry(registry)?;
    let json = snapshot.to_json(pretty)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, json).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        "Wrote snapshot with {} nodes and {} edges to {}",
        snapshot.nodes.len(),
        snapshot.edges.len(),
        path.display()
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeKey, Relation};
    use tempfile::TempDir;

    fn small_registry() -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        let repo = registry.get_or_create(NodeKey::repository(1));
        let branch = registry.get_or_create(NodeKey::branch(1, "feature/x"));
        registry.link(repo, branch, Relation::HasBranch);
        registry
            .node_mut(branch)
            .unwrap()
            .set_tag(Tag::UnmergedBranch, true);
        registry
    }

    #[test]
    fn test_snapshot_layout() {
        let snapshot = GraphSnapshot::from_registry(&small_registry()).unwrap();
        assert_eq!(snapshot.schema_version, "1.0");
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.nodes[0].id, "repo_1");
        assert_eq!(snapshot.nodes[1].id, "repo_1__branch_feature_x");
        assert_eq!(snapshot.nodes[1].tags, vec![Tag::UnmergedBranch]);
        assert_eq!(snapshot.nodes[1].attributes["name"], "feature/x");
        assert_eq!(snapshot.edges[0].relation, Relation::HasBranch);
    }

    #[test]
    fn test_snapshot_ids_unique_for_similar_branch_names() {
        let mut registry = EntityRegistry::new();
        let repo = registry.get_or_create(NodeKey::repository(1));
        for name in ["feature/x", "feature_x"] {
            let branch = registry.get_or_create(NodeKey::branch(1, name));
            registry.link(repo, branch, Relation::HasBranch);
        }

        let snapshot = GraphSnapshot::from_registry(&registry).unwrap();
        let ids: std::collections::HashSet<&str> =
            snapshot.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(ids.len(), 3);
        assert_eq!(snapshot.edges.len(), 2);
    }

    #[test]
    fn test_snapshot_is_deterministic() {
        let a = GraphSnapshot::from_registry(&small_registry()).unwrap().to_json(false).unwrap();
        let b = GraphSnapshot::from_registry(&small_registry()).unwrap().to_json(false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("graph.json");
        let written = write_snapshot(&small_registry(), &path, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: GraphSnapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, written);
        assert_eq!(parsed.nodes_of_kind(EntityKind::Branch).count(), 1);
    }
}
