//! Graph Schema Definitions for the Git Activity Ontology
//!
//! This module defines the node and relation vocabulary of the knowledge
//! graph: entity kinds, their natural keys, per-kind attributes, the
//! relations that connect them, and the derived classification tags.
//!
//! Schema Version: 1.0
//!
//! Nodes are stored in the [`EntityRegistry`](crate::registry::EntityRegistry)
//! arena and addressed by their [`NodeKey`]; relations never embed owning
//! pointers, so cyclic structures (parent chains, merge targets) are plain
//! edges.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version constant
pub const GRAPH_SCHEMA_VERSION: &str = "1.0";

/// External repository identifier (the hosting service's numeric id).
pub type RepoId = u64;

// ============================================================================
// Entity Kinds
// ============================================================================

/// Kinds of entities stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Repository,
    Branch,
    User,
    Commit,
    File,
    Issue,
    PullRequest,
}

impl EntityKind {
    /// All kinds, in population order.
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Repository,
        EntityKind::User,
        EntityKind::Branch,
        EntityKind::Commit,
        EntityKind::File,
        EntityKind::Issue,
        EntityKind::PullRequest,
    ];

    /// Get the ontology class name
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Repository => "Repository",
            EntityKind::Branch => "Branch",
            EntityKind::User => "User",
            EntityKind::Commit => "Commit",
            EntityKind::File => "File",
            EntityKind::Issue => "Issue",
            EntityKind::PullRequest => "PullRequest",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Natural Keys
// ============================================================================

/// Natural key of a node, namespaced by kind.
///
/// Two keys of different kinds never collide even when their payloads are
/// equal (repository `7` and issue `7` are distinct nodes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    Repository(RepoId),
    Branch { repo: RepoId, name: String },
    User(String),
    Commit(String),
    /// A file touch: one record per (commit, path) pair.
    File { commit: String, path: String },
    Issue(u64),
    PullRequest(u64),
}

impl NodeKey {
    pub fn repository(id: RepoId) -> Self {
        NodeKey::Repository(id)
    }

    pub fn branch(repo: RepoId, name: impl Into<String>) -> Self {
        NodeKey::Branch {
            repo,
            name: name.into(),
        }
    }

    pub fn user(login: impl Into<String>) -> Self {
        NodeKey::User(login.into())
    }

    pub fn commit(sha: impl Into<String>) -> Self {
        NodeKey::Commit(sha.into())
    }

    pub fn file(commit: impl Into<String>, path: impl Into<String>) -> Self {
        NodeKey::File {
            commit: commit.into(),
            path: path.into(),
        }
    }

    pub fn issue(id: u64) -> Self {
        NodeKey::Issue(id)
    }

    pub fn pull_request(id: u64) -> Self {
        NodeKey::PullRequest(id)
    }

    /// The entity kind this key addresses.
    pub fn kind(&self) -> EntityKind {
        match self {
            NodeKey::Repository(_) => EntityKind::Repository,
            NodeKey::Branch { .. } => EntityKind::Branch,
            NodeKey::User(_) => EntityKind::User,
            NodeKey::Commit(_) => EntityKind::Commit,
            NodeKey::File { .. } => EntityKind::File,
            NodeKey::Issue(_) => EntityKind::Issue,
            NodeKey::PullRequest(_) => EntityKind::PullRequest,
        }
    }

    /// Repository that owns this key, for kinds whose key carries one.
    pub fn repo_id(&self) -> Option<RepoId> {
        match self {
            NodeKey::Repository(id) => Some(*id),
            NodeKey::Branch { repo, .. } => Some(*repo),
            _ => None,
        }
    }

    /// Individual name used in exported graphs.
    ///
    /// Follows the ontology's individual naming: `repo_<id>`,
    /// `repo_<id>__branch_<name>`, `user_<login>`, `commit_<sha>`,
    /// `<sha>__<path>`, `issue_<id>`, `pr_<id>`. Inside names `/` becomes `_`
    /// and `%`, `_` and space are percent-escaped, so distinct keys never
    /// share an id (`feature/x` is `feature_x`, `feature_x` is `feature%5Fx`).
    pub fn iri(&self) -> String {
        match self {
            NodeKey::Repository(id) => format!("repo_{}", id),
            NodeKey::Branch { repo, name } => {
                format!("repo_{}__branch_{}", repo, escape_name(name, true))
            }
            NodeKey::User(login) => format!("user_{}", escape_name(login, true)),
            NodeKey::Commit(sha) => format!("commit_{}", escape_name(sha, true)),
            // The SHA half never contains `_`, so the first `__` is the separator
            NodeKey::File { commit, path } => format!(
                "{}__{}",
                escape_name(commit, false),
                escape_name(path, true)
            ),
            NodeKey::Issue(id) => format!("issue_{}", id),
            NodeKey::PullRequest(id) => format!("pr_{}", id),
        }
    }
}

/// Escape one name segment of an individual id.
fn escape_name(name: &str, slash_as_underscore: bool) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '/' if slash_as_underscore => out.push('_'),
            '/' => out.push_str("%2F"),
            '%' => out.push_str("%25"),
            '_' => out.push_str("%5F"),
            ' ' => out.push_str("%20"),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iri())
    }
}

// ============================================================================
// Relations
// ============================================================================

/// Directed relations between entities.
///
/// Inverse directions (`onBranch`, `belongsTo`) are answered by incoming-edge
/// traversal rather than stored twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Relation {
    /// Repository → Branch
    HasBranch,
    /// Branch → Commit (first-seen owning branch only)
    HasCommit,
    /// Commit → parent Commit
    Parent,
    /// Commit → User
    AuthoredBy,
    /// Commit → User
    CommittedBy,
    /// Commit → File touch
    UpdatesFile,
    /// Repository → Issue
    HasIssue,
    /// Repository → PullRequest
    HasPullRequest,
    /// Issue/PullRequest → User
    OpenedBy,
    /// PullRequest → Branch
    HasBaseBranch,
    /// PullRequest → Branch
    HasHeadBranch,
    /// Branch → Branch in the same repository
    MergedInto,
}

impl Relation {
    /// Get the ontology property name
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::HasBranch => "hasBranch",
            Relation::HasCommit => "hasCommit",
            Relation::Parent => "parent",
            Relation::AuthoredBy => "authoredBy",
            Relation::CommittedBy => "committedBy",
            Relation::UpdatesFile => "updatesFile",
            Relation::HasIssue => "hasIssue",
            Relation::HasPullRequest => "hasPullRequest",
            Relation::OpenedBy => "openedBy",
            Relation::HasBaseBranch => "hasBaseBranch",
            Relation::HasHeadBranch => "hasHeadBranch",
            Relation::MergedInto => "mergedInto",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Classification Tags
// ============================================================================

/// Derived classifications. These are set-membership markers computed by
/// the classification and concurrency passes, never read from input data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tag {
    MergeCommit,
    InitialCommit,
    SecurityCommit,
    UnmergedBranch,
    MergedPullRequest,
    ConcurrentContributor,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::MergeCommit => "MergeCommit",
            Tag::InitialCommit => "InitialCommit",
            Tag::SecurityCommit => "SecurityCommit",
            Tag::UnmergedBranch => "UnmergedBranch",
            Tag::MergedPullRequest => "MergedPullRequest",
            Tag::ConcurrentContributor => "ConcurrentContributor",
        }
    }

    /// The entity kind this tag classifies.
    pub fn applies_to(&self) -> EntityKind {
        match self {
            Tag::MergeCommit | Tag::InitialCommit | Tag::SecurityCommit => EntityKind::Commit,
            Tag::UnmergedBranch => EntityKind::Branch,
            Tag::MergedPullRequest => EntityKind::PullRequest,
            Tag::ConcurrentContributor => EntityKind::User,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "mergecommit" => Ok(Tag::MergeCommit),
            "initialcommit" => Ok(Tag::InitialCommit),
            "securitycommit" => Ok(Tag::SecurityCommit),
            "unmergedbranch" => Ok(Tag::UnmergedBranch),
            "mergedpullrequest" => Ok(Tag::MergedPullRequest),
            "concurrentcontributor" => Ok(Tag::ConcurrentContributor),
            _ => Err(format!("unknown tag '{}'", s)),
        }
    }
}

// ============================================================================
// Attributes
// ============================================================================

/// Repository attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepositoryAttrs {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub language: String,
    pub stars: u64,
    pub forks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Branch attributes. The owning repository and name live in the key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchAttrs {
    pub name: String,
    pub is_default: bool,
    /// Head commit SHA reported by the branch listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_sha: Option<String>,
}

/// Commit attributes.
///
/// A commit first referenced as a parent is a placeholder
/// (`populated == false`) until its own record is processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitAttrs {
    pub sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Raw date string as supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Parsed date; `None` when absent or malformed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Initial-commit flag from the source data (advisory only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_initial_hint: Option<bool>,
    pub populated: bool,
}

/// User attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserAttrs {
    pub login: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// `None` until the concurrency pass has evaluated this user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrent_contributor: Option<bool>,
}

/// Per-commit file touch attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileTouchAttrs {
    pub path: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
}

/// Issue attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueAttrs {
    pub title: String,
    pub state: String,
}

/// Pull request attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullRequestAttrs {
    pub title: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<String>,
}

impl PullRequestAttrs {
    /// Whether a non-empty merge timestamp is present.
    pub fn has_merge_timestamp(&self) -> bool {
        self.merged_at.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

/// Kind-specific attributes of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Attributes {
    Repository(RepositoryAttrs),
    Branch(BranchAttrs),
    User(UserAttrs),
    Commit(CommitAttrs),
    File(FileTouchAttrs),
    Issue(IssueAttrs),
    PullRequest(PullRequestAttrs),
}

impl Attributes {
    /// Empty attributes for a freshly allocated node, seeded from its key.
    pub fn placeholder(key: &NodeKey) -> Self {
        match key {
            NodeKey::Repository(_) => Attributes::Repository(RepositoryAttrs::default()),
            NodeKey::Branch { name, .. } => Attributes::Branch(BranchAttrs {
                name: name.clone(),
                ..Default::default()
            }),
            NodeKey::User(login) => Attributes::User(UserAttrs {
                login: login.clone(),
                ..Default::default()
            }),
            NodeKey::Commit(sha) => Attributes::Commit(CommitAttrs {
                sha: sha.clone(),
                ..Default::default()
            }),
            NodeKey::File { path, .. } => Attributes::File(FileTouchAttrs {
                path: path.clone(),
                ..Default::default()
            }),
            NodeKey::Issue(_) => Attributes::Issue(IssueAttrs::default()),
            NodeKey::PullRequest(_) => Attributes::PullRequest(PullRequestAttrs::default()),
        }
    }
}

// ============================================================================
// Node
// ============================================================================

/// A node in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Natural key (identity)
    pub key: NodeKey,

    /// Kind-specific attributes
    pub attrs: Attributes,

    /// Derived classifications
    pub tags: BTreeSet<Tag>,
}

impl Node {
    /// Allocate a node with default attributes for its key.
    pub fn placeholder(key: NodeKey) -> Self {
        let attrs = Attributes::placeholder(&key);
        Self {
            key,
            attrs,
            tags: BTreeSet::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.key.kind()
    }

    /// Exported individual name
    pub fn id(&self) -> String {
        self.key.iri()
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Set or clear a tag. Returns true if the tag set changed.
    pub fn set_tag(&mut self, tag: Tag, present: bool) -> bool {
        if present {
            self.tags.insert(tag)
        } else {
            self.tags.remove(&tag)
        }
    }

    pub fn as_repository(&self) -> Option<&RepositoryAttrs> {
        match &self.attrs {
            Attributes::Repository(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_branch(&self) -> Option<&BranchAttrs> {
        match &self.attrs {
            Attributes::Branch(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&UserAttrs> {
        match &self.attrs {
            Attributes::User(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_user_mut(&mut self) -> Option<&mut UserAttrs> {
        match &mut self.attrs {
            Attributes::User(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_commit(&self) -> Option<&CommitAttrs> {
        match &self.attrs {
            Attributes::Commit(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_commit_mut(&mut self) -> Option<&mut CommitAttrs> {
        match &mut self.attrs {
            Attributes::Commit(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileTouchAttrs> {
        match &self.attrs {
            Attributes::File(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_issue(&self) -> Option<&IssueAttrs> {
        match &self.attrs {
            Attributes::Issue(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_pull_request(&self) -> Option<&PullRequestAttrs> {
        match &self.attrs {
            Attributes::PullRequest(a) => Some(a),
            _ => None,
        }
    }

    /// Whether this is a commit referenced only as a parent so far.
    pub fn is_placeholder_commit(&self) -> bool {
        self.as_commit().is_some_and(|c| !c.populated)
    }
}

// ============================================================================
// Edge
// ============================================================================

/// An edge between two nodes, addressed by their exported ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub relation: Relation,
}
