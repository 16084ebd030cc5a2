//! Entity registry: the arena that owns every node of the knowledge graph.
//!
//! Nodes live in a `petgraph::StableGraph` and are addressed either by their
//! [`NodeKey`] or by the `NodeIndex` the arena hands out. Relations are
//! directed edges weighted by [`Relation`]; they reference nodes by index, so
//! cycles and forward references need no shared ownership.
//!
//! Every multi-valued traversal returns nodes in edge insertion order. The
//! builder inserts edges in record order, so "first branch of a repository"
//! means the first branch record that was accepted.

use std::collections::{BTreeSet, HashMap};

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;

use crate::graph::{Edge, EntityKind, Node, NodeKey, RepoId, Relation, Tag, GRAPH_SCHEMA_VERSION};

/// Arena of graph nodes with key-based identity.
///
/// `get_or_create` is the only way nodes enter the registry, so for any key
/// there is at most one node, and every reference to that key (a parent SHA
/// seen before its own commit record, for example) resolves to it.
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    /// The underlying petgraph instance
    graph: StableGraph<Node, Relation, petgraph::Directed>,

    /// Map from natural key to NodeIndex for O(1) lookup
    index: HashMap<NodeKey, NodeIndex>,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            index: HashMap::new(),
        }
    }

    pub fn schema_version(&self) -> &'static str {
        GRAPH_SCHEMA_VERSION
    }

    // ------------------------------------------------------------------------
    // Node Operations
    // ------------------------------------------------------------------------

    /// Return the node for `key`, allocating a placeholder if absent.
    pub fn get_or_create(&mut self, key: NodeKey) -> NodeIndex {
        self.get_or_create_tracked(key).0
    }

    /// Like [`get_or_create`](Self::get_or_create), also reporting whether
    /// the node was allocated by this call.
    pub fn get_or_create_tracked(&mut self, key: NodeKey) -> (NodeIndex, bool) {
        if let Some(&idx) = self.index.get(&key) {
            return (idx, false);
        }
        let idx = self.graph.add_node(Node::placeholder(key.clone()));
        self.index.insert(key, idx);
        (idx, true)
    }

    /// Get the NodeIndex for a key
    pub fn lookup(&self, key: &NodeKey) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.index.contains_key(key)
    }

    /// Get a node by its key
    pub fn get(&self, key: &NodeKey) -> Option<&Node> {
        self.lookup(key).and_then(|idx| self.graph.node_weight(idx))
    }

    /// Get a node by its NodeIndex
    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    /// Get a mutable node by its NodeIndex
    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut Node> {
        self.graph.node_weight_mut(idx)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of nodes of one kind
    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.graph.node_weights().filter(|n| n.kind() == kind).count()
    }

    /// Iterate over all nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.graph
            .node_indices()
            .filter_map(move |idx| self.graph.node_weight(idx).map(|n| (idx, n)))
    }

    /// Iterate over nodes of one kind in creation order
    pub fn nodes_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.nodes().filter(move |(_, n)| n.kind() == kind)
    }

    /// Indices of all nodes of one kind, for passes that mutate while iterating
    pub fn indices_of_kind(&self, kind: EntityKind) -> Vec<NodeIndex> {
        self.nodes_of_kind(kind).map(|(idx, _)| idx).collect()
    }

    // ------------------------------------------------------------------------
    // Edge Operations
    // ------------------------------------------------------------------------

    /// Add an edge unless an identical one (same endpoints and relation)
    /// already exists. Returns the index of the new or existing edge.
    pub fn link(&mut self, source: NodeIndex, target: NodeIndex, relation: Relation) -> EdgeIndex {
        if let Some(existing) = self
            .graph
            .edges_connecting(source, target)
            .find(|e| *e.weight() == relation)
        {
            return existing.id();
        }
        self.graph.add_edge(source, target, relation)
    }

    /// Replace every outgoing `relation` edge of `source` with one to `target`.
    pub fn relink(&mut self, source: NodeIndex, target: NodeIndex, relation: Relation) -> EdgeIndex {
        let stale: Vec<EdgeIndex> = self
            .graph
            .edges_directed(source, Direction::Outgoing)
            .filter(|e| *e.weight() == relation && e.target() != target)
            .map(|e| e.id())
            .collect();
        for edge in stale {
            self.graph.remove_edge(edge);
        }
        self.link(source, target, relation)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of edges carrying one relation
    pub fn count_relation(&self, relation: Relation) -> usize {
        self.graph
            .edge_references()
            .filter(|e| *e.weight() == relation)
            .count()
    }

    /// Iterate over all edges as (source, target, relation), ordered by edge index.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, Relation)> + '_ {
        self.graph.edge_indices().filter_map(move |e| {
            let (source, target) = self.graph.edge_endpoints(e)?;
            Some((source, target, *self.graph.edge_weight(e)?))
        })
    }

    /// Iterate over all edges as exported `Edge` structs.
    pub fn iter_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges().filter_map(move |(s, t, relation)| {
            Some(Edge {
                source: self.node(s)?.id(),
                target: self.node(t)?.id(),
                relation,
            })
        })
    }

    /// Targets of outgoing `relation` edges, in insertion order.
    pub fn targets(&self, idx: NodeIndex, relation: Relation) -> Vec<NodeIndex> {
        self.neighbors_ordered(idx, relation, Direction::Outgoing)
    }

    /// Sources of incoming `relation` edges, in insertion order.
    pub fn sources(&self, idx: NodeIndex, relation: Relation) -> Vec<NodeIndex> {
        self.neighbors_ordered(idx, relation, Direction::Incoming)
    }

    /// First target of an outgoing `relation` edge.
    pub fn target(&self, idx: NodeIndex, relation: Relation) -> Option<NodeIndex> {
        self.targets(idx, relation).into_iter().next()
    }

    /// First source of an incoming `relation` edge.
    pub fn source(&self, idx: NodeIndex, relation: Relation) -> Option<NodeIndex> {
        self.sources(idx, relation).into_iter().next()
    }

    // petgraph walks adjacency lists newest-first; sort by edge index to
    // recover insertion order.
    fn neighbors_ordered(&self, idx: NodeIndex, relation: Relation, dir: Direction) -> Vec<NodeIndex> {
        let mut found: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, dir)
            .filter(|e| *e.weight() == relation)
            .map(|e| {
                let other = match dir {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.id(), other)
            })
            .collect();
        found.sort_by_key(|(edge, _)| *edge);
        found.into_iter().map(|(_, node)| node).collect()
    }

    // ------------------------------------------------------------------------
    // Traversal Operations
    // ------------------------------------------------------------------------

    /// Branch indices of a repository, in insertion order
    pub fn branch_indices(&self, repo: RepoId) -> Vec<NodeIndex> {
        self.lookup(&NodeKey::repository(repo))
            .map(|idx| self.targets(idx, Relation::HasBranch))
            .unwrap_or_default()
    }

    /// Branches of a repository, in insertion order
    pub fn branches_of(&self, repo: RepoId) -> Vec<&Node> {
        self.resolve_all(self.branch_indices(repo))
    }

    /// Commits owned by a branch, in insertion order
    pub fn commits_of(&self, repo: RepoId, branch: &str) -> Vec<&Node> {
        self.lookup(&NodeKey::branch(repo, branch))
            .map(|idx| self.resolve_all(self.targets(idx, Relation::HasCommit)))
            .unwrap_or_default()
    }

    /// Parent commits, in insertion order
    pub fn parents_of(&self, sha: &str) -> Vec<&Node> {
        self.lookup(&NodeKey::commit(sha))
            .map(|idx| self.resolve_all(self.targets(idx, Relation::Parent)))
            .unwrap_or_default()
    }

    pub fn author_of(&self, sha: &str) -> Option<&Node> {
        let idx = self.lookup(&NodeKey::commit(sha))?;
        self.node(self.target(idx, Relation::AuthoredBy)?)
    }

    pub fn committer_of(&self, sha: &str) -> Option<&Node> {
        let idx = self.lookup(&NodeKey::commit(sha))?;
        self.node(self.target(idx, Relation::CommittedBy)?)
    }

    /// Derived tags of a node
    pub fn tags_of(&self, key: &NodeKey) -> Option<&BTreeSet<Tag>> {
        self.get(key).map(|n| &n.tags)
    }

    /// The branch that owns a commit
    pub fn owning_branch(&self, commit: NodeIndex) -> Option<NodeIndex> {
        self.source(commit, Relation::HasCommit)
    }

    /// The branch a branch has been merged into
    pub fn merged_into(&self, branch: NodeIndex) -> Option<NodeIndex> {
        self.target(branch, Relation::MergedInto)
    }

    /// The repository a branch, issue or pull request belongs to
    pub fn repository_of(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.source(idx, Relation::HasBranch)
            .or_else(|| self.source(idx, Relation::HasIssue))
            .or_else(|| self.source(idx, Relation::HasPullRequest))
    }

    fn resolve_all(&self, indices: Vec<NodeIndex>) -> Vec<&Node> {
        indices.into_iter().filter_map(|idx| self.node(idx)).collect()
    }

    // ------------------------------------------------------------------------
    // Low-level Access
    // ------------------------------------------------------------------------

    /// Get a reference to the underlying petgraph
    pub fn inner(&self) -> &StableGraph<Node, Relation, petgraph::Directed> {
        &self.graph
    }
}
