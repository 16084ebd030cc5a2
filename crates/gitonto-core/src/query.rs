//! Canned traversal queries over a populated registry.
//!
//! Each query walks the registry with the traversal operations and returns
//! plain row structs. Orderings are deterministic: counts descending, ties
//! broken by name.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::stable_graph::NodeIndex;
use serde::Serialize;

use crate::graph::{EntityKind, NodeKey, RepoId, Relation, Tag};
use crate::records::parse_timestamp;
use crate::registry::EntityRegistry;

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryRow {
    pub repo_id: RepoId,
    pub name: String,
    pub language: String,
    pub stars: u64,
    pub forks: u64,
    pub branches: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchRow {
    pub repo_id: RepoId,
    pub name: String,
    pub is_default: bool,
    pub commits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_into: Option<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRow {
    pub sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<RepoId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub tags: Vec<Tag>,
}

/// A named entity with a count (repositories, users, files).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountRow {
    pub name: String,
    pub count: usize,
}

/// A repository and how many of its branches are still unmerged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmergedBranchesRow {
    pub repo_id: RepoId,
    pub name: String,
    pub unmerged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeEdgeRow {
    pub repo_id: RepoId,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestRow {
    pub pr_id: u64,
    pub title: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
}

// ============================================================================
// Helpers
// ============================================================================

fn repository_name(registry: &EntityRegistry, repo: RepoId) -> String {
    registry
        .get(&NodeKey::repository(repo))
        .and_then(|n| n.as_repository())
        .map(|r| r.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| NodeKey::repository(repo).iri())
}

fn branch_name(registry: &EntityRegistry, idx: NodeIndex) -> Option<String> {
    registry.node(idx)?.as_branch().map(|b| b.name.clone())
}

fn user_login(registry: &EntityRegistry, idx: NodeIndex) -> Option<String> {
    registry.node(idx)?.as_user().map(|u| u.login.clone())
}

fn commit_row(registry: &EntityRegistry, idx: NodeIndex) -> Option<CommitRow> {
    let node = registry.node(idx)?;
    let commit = node.as_commit()?;
    let branch = registry.owning_branch(idx);
    Some(CommitRow {
        sha: commit.sha.clone(),
        message: commit.message.clone(),
        date: commit.date.clone(),
        author: registry
            .target(idx, Relation::AuthoredBy)
            .and_then(|u| user_login(registry, u)),
        repo_id: branch.and_then(|b| registry.node(b)?.key.repo_id()),
        branch: branch.and_then(|b| branch_name(registry, b)),
        tags: node.tags.iter().copied().collect(),
    })
}

fn commits_where<F>(registry: &EntityRegistry, predicate: F) -> Vec<CommitRow>
where
    F: Fn(NodeIndex) -> bool,
{
    registry
        .indices_of_kind(EntityKind::Commit)
        .into_iter()
        .filter(|idx| predicate(*idx))
        .filter_map(|idx| commit_row(registry, idx))
        .collect()
}

fn has_tag(registry: &EntityRegistry, idx: NodeIndex, tag: Tag) -> bool {
    registry.node(idx).is_some_and(|n| n.has_tag(tag))
}

fn sorted_counts(counts: BTreeMap<String, usize>) -> Vec<CountRow> {
    let mut rows: Vec<CountRow> = counts
        .into_iter()
        .map(|(name, count)| CountRow { name, count })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    rows
}

/// Distinct repositories each user authored commits in.
fn repositories_per_author(registry: &EntityRegistry) -> BTreeMap<String, BTreeSet<RepoId>> {
    let mut per_user: BTreeMap<String, BTreeSet<RepoId>> = BTreeMap::new();
    for idx in registry.indices_of_kind(EntityKind::Commit) {
        let login = registry
            .target(idx, Relation::AuthoredBy)
            .and_then(|u| user_login(registry, u));
        let repo = registry
            .owning_branch(idx)
            .and_then(|b| registry.node(b)?.key.repo_id());
        if let (Some(login), Some(repo)) = (login, repo) {
            per_user.entry(login).or_default().insert(repo);
        }
    }
    per_user
}

// ============================================================================
// Repository and branch listings
// ============================================================================

/// All repositories in creation order.
pub fn repositories(registry: &EntityRegistry) -> Vec<RepositoryRow> {
    registry
        .nodes_of_kind(EntityKind::Repository)
        .filter_map(|(_, node)| {
            let repo_id = node.key.repo_id()?;
            let attrs = node.as_repository()?;
            Some(RepositoryRow {
                repo_id,
                name: attrs.name.clone(),
                language: attrs.language.clone(),
                stars: attrs.stars,
                forks: attrs.forks,
                branches: registry.branch_indices(repo_id).len(),
            })
        })
        .collect()
}

/// The `limit` repositories with the most forks.
pub fn most_forked(registry: &EntityRegistry, limit: usize) -> Vec<RepositoryRow> {
    let mut rows = repositories(registry);
    rows.sort_by(|a, b| b.forks.cmp(&a.forks).then_with(|| a.repo_id.cmp(&b.repo_id)));
    rows.truncate(limit);
    rows
}

/// Branches of a repository in insertion order.
pub fn branches(registry: &EntityRegistry, repo: RepoId) -> Vec<BranchRow> {
    registry
        .branch_indices(repo)
        .into_iter()
        .filter_map(|idx| {
            let node = registry.node(idx)?;
            let attrs = node.as_branch()?;
            Some(BranchRow {
                repo_id: repo,
                name: attrs.name.clone(),
                is_default: attrs.is_default,
                commits: registry.targets(idx, Relation::HasCommit).len(),
                merged_into: registry
                    .merged_into(idx)
                    .and_then(|t| branch_name(registry, t)),
                tags: node.tags.iter().copied().collect(),
            })
        })
        .collect()
}

/// Branches flagged as default, across all repositories.
pub fn default_branches(registry: &EntityRegistry) -> Vec<BranchRow> {
    repositories(registry)
        .into_iter()
        .flat_map(|r| branches(registry, r.repo_id))
        .filter(|b| b.is_default)
        .collect()
}

/// Repositories with more than `threshold` unmerged branches.
///
/// One row per repository id; repositories sharing a name stay separate.
pub fn repositories_with_unmerged_branches(
    registry: &EntityRegistry,
    threshold: usize,
) -> Vec<UnmergedBranchesRow> {
    let mut rows: Vec<UnmergedBranchesRow> = repositories(registry)
        .into_iter()
        .map(|r| UnmergedBranchesRow {
            unmerged: registry
                .branch_indices(r.repo_id)
                .into_iter()
                .filter(|b| has_tag(registry, *b, Tag::UnmergedBranch))
                .count(),
            name: repository_name(registry, r.repo_id),
            repo_id: r.repo_id,
        })
        .filter(|row| row.unmerged > threshold)
        .collect();
    rows.sort_by(|a, b| {
        b.unmerged
            .cmp(&a.unmerged)
            .then_with(|| a.repo_id.cmp(&b.repo_id))
    });
    rows
}

/// `mergedInto` pairs across all repositories.
pub fn merge_graph(registry: &EntityRegistry) -> Vec<MergeEdgeRow> {
    registry
        .edges()
        .filter(|(_, _, relation)| *relation == Relation::MergedInto)
        .filter_map(|(source, target, _)| {
            Some(MergeEdgeRow {
                repo_id: registry.node(source)?.key.repo_id()?,
                source: branch_name(registry, source)?,
                target: branch_name(registry, target)?,
            })
        })
        .collect()
}

// ============================================================================
// Commit queries
// ============================================================================

/// Commits owned by a branch.
pub fn commits_of_branch(registry: &EntityRegistry, repo: RepoId, branch: &str) -> Vec<CommitRow> {
    registry
        .lookup(&NodeKey::branch(repo, branch))
        .map(|b| {
            registry
                .targets(b, Relation::HasCommit)
                .into_iter()
                .filter_map(|c| commit_row(registry, c))
                .collect()
        })
        .unwrap_or_default()
}

/// Parents of a commit.
pub fn parents(registry: &EntityRegistry, sha: &str) -> Vec<CommitRow> {
    registry
        .lookup(&NodeKey::commit(sha))
        .map(|c| {
            registry
                .targets(c, Relation::Parent)
                .into_iter()
                .filter_map(|p| commit_row(registry, p))
                .collect()
        })
        .unwrap_or_default()
}

pub fn merge_commits(registry: &EntityRegistry) -> Vec<CommitRow> {
    commits_where(registry, |idx| has_tag(registry, idx, Tag::MergeCommit))
}

/// Security commits; each row carries its owning branch.
pub fn security_commits(registry: &EntityRegistry) -> Vec<CommitRow> {
    commits_where(registry, |idx| has_tag(registry, idx, Tag::SecurityCommit))
}

/// Initial commits that belong to a branch, ordered by repository.
pub fn initial_commits(registry: &EntityRegistry) -> Vec<CommitRow> {
    let mut rows = commits_where(registry, |idx| {
        has_tag(registry, idx, Tag::InitialCommit) && registry.owning_branch(idx).is_some()
    });
    rows.sort_by_key(|r| r.repo_id);
    rows
}

/// Commits whose author login matches, case-insensitively.
pub fn commits_by_author(registry: &EntityRegistry, login: &str) -> Vec<CommitRow> {
    let wanted = login.to_lowercase();
    commits_where(registry, |idx| {
        registry
            .target(idx, Relation::AuthoredBy)
            .and_then(|u| user_login(registry, u))
            .is_some_and(|l| l.to_lowercase() == wanted)
    })
}

/// Commits whose message contains `keyword`, case-insensitively.
pub fn search_commits(registry: &EntityRegistry, keyword: &str) -> Vec<CommitRow> {
    let needle = keyword.to_lowercase();
    commits_where(registry, |idx| {
        registry
            .node(idx)
            .and_then(|n| n.as_commit())
            .and_then(|c| c.message.as_deref())
            .is_some_and(|m| m.to_lowercase().contains(&needle))
    })
}

/// The `limit` most frequently touched file paths.
pub fn most_modified_files(registry: &EntityRegistry, limit: usize) -> Vec<CountRow> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for (_, node) in registry.nodes_of_kind(EntityKind::File) {
        if let Some(file) = node.as_file() {
            *counts.entry(file.path.clone()).or_insert(0) += 1;
        }
    }
    let mut rows = sorted_counts(counts);
    rows.truncate(limit);
    rows
}

// ============================================================================
// Contributor queries
// ============================================================================

/// Users who authored commits in at least `min_repositories` repositories.
pub fn multi_repository_contributors(
    registry: &EntityRegistry,
    min_repositories: usize,
) -> Vec<CountRow> {
    let counts = repositories_per_author(registry)
        .into_iter()
        .map(|(login, repos)| (login, repos.len()))
        .filter(|(_, count)| *count >= min_repositories)
        .collect();
    sorted_counts(counts)
}

/// The `limit` users with the most authored commits.
pub fn top_contributors(registry: &EntityRegistry, limit: usize) -> Vec<CountRow> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for idx in registry.indices_of_kind(EntityKind::User) {
        let authored = registry.sources(idx, Relation::AuthoredBy).len();
        if authored > 0 {
            if let Some(login) = user_login(registry, idx) {
                counts.insert(login, authored);
            }
        }
    }
    let mut rows = sorted_counts(counts);
    rows.truncate(limit);
    rows
}

/// Concurrent contributors with the number of repositories they touched.
pub fn concurrent_contributors(registry: &EntityRegistry) -> Vec<CountRow> {
    let per_user = repositories_per_author(registry);
    let counts = registry
        .nodes_of_kind(EntityKind::User)
        .filter(|(_, n)| n.has_tag(Tag::ConcurrentContributor))
        .filter_map(|(_, n)| {
            let login = n.as_user()?.login.clone();
            let repos = per_user.get(&login).map_or(0, |r| r.len());
            Some((login, repos))
        })
        .collect();
    sorted_counts(counts)
}

/// Users who authored both a merge commit and a security commit.
pub fn merge_and_security_authors(registry: &EntityRegistry) -> Vec<String> {
    let authors_with = |tag: Tag| -> BTreeSet<String> {
        registry
            .indices_of_kind(EntityKind::Commit)
            .into_iter()
            .filter(|idx| has_tag(registry, *idx, tag))
            .filter_map(|idx| {
                registry
                    .target(idx, Relation::AuthoredBy)
                    .and_then(|u| user_login(registry, u))
            })
            .collect()
    };
    authors_with(Tag::MergeCommit)
        .intersection(&authors_with(Tag::SecurityCommit))
        .cloned()
        .collect()
}

// ============================================================================
// Pull request queries
// ============================================================================

/// Pull requests tagged as merged, newest merge first.
pub fn merged_pull_requests(registry: &EntityRegistry) -> Vec<PullRequestRow> {
    let mut rows: Vec<PullRequestRow> = registry
        .nodes_of_kind(EntityKind::PullRequest)
        .filter(|(_, n)| n.has_tag(Tag::MergedPullRequest))
        .filter_map(|(idx, n)| {
            let NodeKey::PullRequest(pr_id) = &n.key else {
                return None;
            };
            let attrs = n.as_pull_request()?;
            Some(PullRequestRow {
                pr_id: *pr_id,
                title: attrs.title.clone(),
                state: attrs.state.clone(),
                merged_at: attrs.merged_at.clone(),
                base: registry
                    .target(idx, Relation::HasBaseBranch)
                    .and_then(|b| branch_name(registry, b)),
                head: registry
                    .target(idx, Relation::HasHeadBranch)
                    .and_then(|b| branch_name(registry, b)),
            })
        })
        .collect();

    // Unparseable timestamps sort last.
    rows.sort_by(|a, b| {
        let ta = a.merged_at.as_deref().and_then(parse_timestamp);
        let tb = b.merged_at.as_deref().and_then(parse_timestamp);
        tb.cmp(&ta).then_with(|| a.pr_id.cmp(&b.pr_id))
    });
    rows
}
