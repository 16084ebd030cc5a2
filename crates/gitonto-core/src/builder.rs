//! Graph Builder for Git Activity Graphs
//!
//! This module provides the `GraphBuilder` struct for populating an
//! [`EntityRegistry`] from a [`Dataset`] of flat records.
//!
//! ## Stages
//!
//! Records are applied in a fixed order because later stages look up nodes
//! created by earlier ones:
//!
//! 1. repositories
//! 2. users
//! 3. branches (attached to their repository)
//! 4. commits (attached to their branch, author and committer)
//! 5. parent links (second pass over accepted commit records)
//! 6. file touches (attached to their commit)
//! 7. issues and pull requests (attached to repository and opener)
//! 8. pull request branch resolution and merge targets
//!
//! Unknown foreign keys never fail the build: the record or relation is
//! dropped and counted in the [`IngestReport`].
//!
//! ## Usage
//!
//! ```ignore
//! use gitonto_core::builder::GraphBuilder;
//! use gitonto_core::records::{DataFiles, Dataset};
//! use std::path::Path;
//!
//! let dataset = Dataset::load_dir(Path::new("data"), &DataFiles::default())?;
//! let (registry, report) = GraphBuilder::new().build(&dataset);
//! ```

use petgraph::stable_graph::NodeIndex;
use tracing::{debug, info};

use crate::graph::{
    Attributes, BranchAttrs, CommitAttrs, EntityKind, FileTouchAttrs, IssueAttrs, NodeKey,
    PullRequestAttrs, Relation, RepositoryAttrs, UserAttrs,
};
use crate::records::{parse_timestamp, CommitRecord, Dataset, PullRequestRecord};
use crate::registry::EntityRegistry;
use crate::report::{DropReason, IngestReport};
use crate::resolver::{BranchResolver, BranchRole, ResolverConfig};

const DEFAULT_LANGUAGE: &str = "Unknown";
const DEFAULT_ISSUE_TITLE: &str = "Untitled";
const DEFAULT_PR_TITLE: &str = "Untitled PR";
const DEFAULT_STATE: &str = "open";
const DEFAULT_FILE_STATUS: &str = "modified";

// ============================================================================
// Builder Configuration
// ============================================================================

/// Configuration for the graph builder.
#[derive(Debug, Clone, Default)]
pub struct BuilderConfig {
    /// Branch resolution settings for pull request references
    pub resolver: ResolverConfig,
}

// ============================================================================
// Graph Builder
// ============================================================================

/// Populates an entity registry from record batches.
pub struct GraphBuilder {
    config: BuilderConfig,
    resolver: BranchResolver,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    /// Create a builder with custom configuration.
    pub fn with_config(config: BuilderConfig) -> Self {
        let resolver = BranchResolver::new(&config.resolver);
        Self { config, resolver }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Build a fresh registry from a dataset.
    pub fn build(&self, dataset: &Dataset) -> (EntityRegistry, IngestReport) {
        let mut registry = EntityRegistry::new();
        let report = self.populate(&mut registry, dataset);
        (registry, report)
    }

    /// Apply every stage of a dataset to an existing registry.
    pub fn populate(&self, registry: &mut EntityRegistry, dataset: &Dataset) -> IngestReport {
        let mut report = IngestReport::default();
        for (kind, count) in &dataset.malformed {
            report.record_drops(*kind, DropReason::Malformed, *count);
        }

        self.add_repositories(registry, dataset, &mut report);
        self.add_users(registry, dataset, &mut report);
        self.add_branches(registry, dataset, &mut report);
        let accepted = self.add_commits(registry, dataset, &mut report);
        self.link_parents(registry, &accepted, &mut report);
        self.add_files(registry, dataset, &mut report);
        self.add_issues(registry, dataset, &mut report);
        let pulls = self.add_pull_requests(registry, dataset, &mut report);
        self.resolve_pull_request_branches(registry, &pulls, &mut report);

        self.log_summary(registry, &report);
        report
    }

    // ------------------------------------------------------------------------
    // Stage 1: repositories
    // ------------------------------------------------------------------------

    fn add_repositories(
        &self,
        registry: &mut EntityRegistry,
        dataset: &Dataset,
        report: &mut IngestReport,
    ) {
        for record in &dataset.repositories {
            let Some(repo_id) = record.repo_id else {
                debug!("Skipping repository record without id");
                report.record_drop(EntityKind::Repository, DropReason::MissingField);
                continue;
            };

            let (idx, created) = registry.get_or_create_tracked(NodeKey::repository(repo_id));
            if !created {
                debug!("Duplicate repository record {}", repo_id);
                report.record_drop(EntityKind::Repository, DropReason::Duplicate);
                continue;
            }

            if let Some(node) = registry.node_mut(idx) {
                node.attrs = Attributes::Repository(RepositoryAttrs {
                    name: record.repo_name.clone().unwrap_or_default(),
                    description: record.repo_description.clone(),
                    language: record
                        .repo_language
                        .clone()
                        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
                    stars: record.repo_stars.unwrap_or(0),
                    forks: record.repo_forks.unwrap_or(0),
                    url: record.repo_url.clone(),
                });
            }
            report.record_created(EntityKind::Repository);
        }

        info!(
            "Created {} repositories",
            report.created(EntityKind::Repository)
        );
    }

    // ------------------------------------------------------------------------
    // Stage 2: users
    // ------------------------------------------------------------------------

    fn add_users(&self, registry: &mut EntityRegistry, dataset: &Dataset, report: &mut IngestReport) {
        for record in &dataset.users {
            let Some(login) = record.user_login.as_deref() else {
                report.record_drop(EntityKind::User, DropReason::MissingField);
                continue;
            };

            let (idx, created) = registry.get_or_create_tracked(NodeKey::user(login));
            if !created {
                report.record_drop(EntityKind::User, DropReason::Duplicate);
                continue;
            }

            if let Some(node) = registry.node_mut(idx) {
                node.attrs = Attributes::User(UserAttrs {
                    login: login.to_string(),
                    url: record.user_url.clone(),
                    concurrent_contributor: None,
                });
            }
            report.record_created(EntityKind::User);
        }

        info!(
            "Created {} users ({} repeated logins skipped)",
            report.created(EntityKind::User),
            report.dropped(EntityKind::User, DropReason::Duplicate)
        );
    }

    // ------------------------------------------------------------------------
    // Stage 3: branches
    // ------------------------------------------------------------------------

    fn add_branches(
        &self,
        registry: &mut EntityRegistry,
        dataset: &Dataset,
        report: &mut IngestReport,
    ) {
        for record in &dataset.branches {
            let (Some(repo_id), Some(name)) = (record.repo_id, record.branch_name.as_deref()) else {
                report.record_drop(EntityKind::Branch, DropReason::MissingField);
                continue;
            };

            let Some(repo_idx) = registry.lookup(&NodeKey::repository(repo_id)) else {
                debug!("Dropping branch {} of unknown repository {}", name, repo_id);
                report.record_drop(EntityKind::Branch, DropReason::UnknownRepository);
                continue;
            };

            let (idx, created) = registry.get_or_create_tracked(NodeKey::branch(repo_id, name));
            if !created {
                debug!("Duplicate branch record {}/{}", repo_id, name);
                report.record_drop(EntityKind::Branch, DropReason::Duplicate);
                continue;
            }

            if let Some(node) = registry.node_mut(idx) {
                node.attrs = Attributes::Branch(BranchAttrs {
                    name: name.to_string(),
                    is_default: record.is_default.unwrap_or(false),
                    head_sha: record.commit_sha.clone(),
                });
            }
            registry.link(repo_idx, idx, Relation::HasBranch);
            report.record_created(EntityKind::Branch);
        }

        info!(
            "Created {} branches ({} dropped)",
            report.created(EntityKind::Branch),
            report.dropped_total(EntityKind::Branch)
        );
    }

    // ------------------------------------------------------------------------
    // Stage 4: commits
    // ------------------------------------------------------------------------

    /// Returns the records that populated a commit, in input order, paired
    /// with the commit's index.
    fn add_commits<'a>(
        &self,
        registry: &mut EntityRegistry,
        dataset: &'a Dataset,
        report: &mut IngestReport,
    ) -> Vec<(NodeIndex, &'a CommitRecord)> {
        let mut accepted = Vec::new();

        for record in &dataset.commits {
            let (Some(sha), Some(repo_id), Some(branch_name)) = (
                record.commit_sha.as_deref(),
                record.repo_id,
                record.branch_name.as_deref(),
            ) else {
                report.record_drop(EntityKind::Commit, DropReason::MissingField);
                continue;
            };

            let Some(branch_idx) = registry.lookup(&NodeKey::branch(repo_id, branch_name)) else {
                let reason = if registry.contains(&NodeKey::repository(repo_id)) {
                    DropReason::UnknownBranch
                } else {
                    DropReason::UnknownRepository
                };
                debug!("Dropping commit {} on {}/{}: {}", sha, repo_id, branch_name, reason);
                report.record_drop(EntityKind::Commit, reason);
                continue;
            };

            let idx = registry.get_or_create(NodeKey::commit(sha));
            let already_populated = registry
                .node(idx)
                .and_then(|n| n.as_commit())
                .is_some_and(|c| c.populated);

            if already_populated {
                debug!("Commit {} seen again on {}, keeping first record", sha, branch_name);
                report.record_merged(EntityKind::Commit);
                continue;
            }

            if let Some(node) = registry.node_mut(idx) {
                node.attrs = Attributes::Commit(CommitAttrs {
                    sha: sha.to_string(),
                    message: record.commit_message.clone(),
                    date: record.commit_date.clone(),
                    timestamp: record.commit_date.as_deref().and_then(parse_timestamp),
                    is_initial_hint: record.is_initial,
                    populated: true,
                });
            }

            if registry.owning_branch(idx).is_none() {
                registry.link(branch_idx, idx, Relation::HasCommit);
            }

            match self.link_user(registry, idx, record.commit_author_login.as_deref(), Relation::AuthoredBy) {
                UserLink::Linked | UserLink::Absent => {}
                UserLink::Unknown => report.unresolved_authors += 1,
            }
            match self.link_user(
                registry,
                idx,
                record.commit_committer_login.as_deref(),
                Relation::CommittedBy,
            ) {
                UserLink::Linked | UserLink::Absent => {}
                UserLink::Unknown => report.unresolved_committers += 1,
            }

            report.record_created(EntityKind::Commit);
            accepted.push((idx, record));
        }

        info!(
            "Created {} commits ({} repeated, {} dropped, {} unknown authors)",
            report.created(EntityKind::Commit),
            report.merged(EntityKind::Commit),
            report.dropped_total(EntityKind::Commit),
            report.unresolved_authors
        );
        accepted
    }

    fn link_user(
        &self,
        registry: &mut EntityRegistry,
        source: NodeIndex,
        login: Option<&str>,
        relation: Relation,
    ) -> UserLink {
        let Some(login) = login else {
            return UserLink::Absent;
        };
        match registry.lookup(&NodeKey::user(login)) {
            Some(user) => {
                registry.link(source, user, relation);
                UserLink::Linked
            }
            None => {
                debug!("No user '{}' for {} relation", login, relation);
                UserLink::Unknown
            }
        }
    }

    // ------------------------------------------------------------------------
    // Stage 5: parent links
    // ------------------------------------------------------------------------

    fn link_parents(
        &self,
        registry: &mut EntityRegistry,
        accepted: &[(NodeIndex, &CommitRecord)],
        report: &mut IngestReport,
    ) {
        let mut parent_links = 0;

        for (child, record) in accepted {
            let Some(parents) = record.commit_parents.as_ref() else {
                continue;
            };
            for parent_sha in parents.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
                let parent = registry.get_or_create(NodeKey::commit(parent_sha));
                if parent == *child {
                    debug!("Ignoring self-parent link on {}", parent_sha);
                    continue;
                }
                registry.link(*child, parent, Relation::Parent);
                parent_links += 1;
            }
        }

        report.placeholder_commits = registry
            .nodes_of_kind(EntityKind::Commit)
            .filter(|(_, n)| n.is_placeholder_commit())
            .count();

        info!(
            "Linked {} parent references ({} placeholder commits)",
            parent_links, report.placeholder_commits
        );
    }

    // ------------------------------------------------------------------------
    // Stage 6: file touches
    // ------------------------------------------------------------------------

    fn add_files(&self, registry: &mut EntityRegistry, dataset: &Dataset, report: &mut IngestReport) {
        for record in &dataset.files {
            let (Some(sha), Some(path)) = (record.commit_sha.as_deref(), record.file_name.as_deref())
            else {
                report.record_drop(EntityKind::File, DropReason::MissingField);
                continue;
            };

            let Some(commit_idx) = registry.lookup(&NodeKey::commit(sha)) else {
                debug!("Dropping file {} of unknown commit {}", path, sha);
                report.record_drop(EntityKind::File, DropReason::UnknownCommit);
                continue;
            };

            let (idx, created) = registry.get_or_create_tracked(NodeKey::file(sha, path));
            if !created {
                report.record_drop(EntityKind::File, DropReason::Duplicate);
                continue;
            }

            if let Some(node) = registry.node_mut(idx) {
                node.attrs = Attributes::File(FileTouchAttrs {
                    path: path.to_string(),
                    status: record
                        .file_status
                        .clone()
                        .unwrap_or_else(|| DEFAULT_FILE_STATUS.to_string()),
                    additions: record.file_additions.unwrap_or(0),
                    deletions: record.file_deletions.unwrap_or(0),
                    changes: record.file_changes.unwrap_or(0),
                });
            }
            registry.link(commit_idx, idx, Relation::UpdatesFile);
            report.record_created(EntityKind::File);
        }

        info!(
            "Created {} file touches ({} dropped)",
            report.created(EntityKind::File),
            report.dropped_total(EntityKind::File)
        );
    }

    // ------------------------------------------------------------------------
    // Stage 7: issues and pull requests
    // ------------------------------------------------------------------------

    fn add_issues(&self, registry: &mut EntityRegistry, dataset: &Dataset, report: &mut IngestReport) {
        for record in &dataset.issues {
            let (Some(issue_id), Some(repo_id)) = (record.issue_id, record.repo_id) else {
                report.record_drop(EntityKind::Issue, DropReason::MissingField);
                continue;
            };

            let Some(repo_idx) = registry.lookup(&NodeKey::repository(repo_id)) else {
                debug!("Dropping issue {} of unknown repository {}", issue_id, repo_id);
                report.record_drop(EntityKind::Issue, DropReason::UnknownRepository);
                continue;
            };

            let (idx, created) = registry.get_or_create_tracked(NodeKey::issue(issue_id));
            if !created {
                report.record_drop(EntityKind::Issue, DropReason::Duplicate);
                continue;
            }

            if let Some(node) = registry.node_mut(idx) {
                node.attrs = Attributes::Issue(IssueAttrs {
                    title: record
                        .title
                        .clone()
                        .unwrap_or_else(|| DEFAULT_ISSUE_TITLE.to_string()),
                    state: record.state.clone().unwrap_or_else(|| DEFAULT_STATE.to_string()),
                });
            }
            registry.link(repo_idx, idx, Relation::HasIssue);
            if let UserLink::Unknown =
                self.link_user(registry, idx, record.user_login.as_deref(), Relation::OpenedBy)
            {
                report.unresolved_openers += 1;
            }
            report.record_created(EntityKind::Issue);
        }

        info!(
            "Created {} issues ({} dropped)",
            report.created(EntityKind::Issue),
            report.dropped_total(EntityKind::Issue)
        );
    }

    fn add_pull_requests<'a>(
        &self,
        registry: &mut EntityRegistry,
        dataset: &'a Dataset,
        report: &mut IngestReport,
    ) -> Vec<(NodeIndex, u64, &'a PullRequestRecord)> {
        let mut accepted = Vec::new();

        for record in &dataset.pull_requests {
            let (Some(pr_id), Some(repo_id)) = (record.pr_id, record.repo_id) else {
                report.record_drop(EntityKind::PullRequest, DropReason::MissingField);
                continue;
            };

            let Some(repo_idx) = registry.lookup(&NodeKey::repository(repo_id)) else {
                debug!("Dropping pull request {} of unknown repository {}", pr_id, repo_id);
                report.record_drop(EntityKind::PullRequest, DropReason::UnknownRepository);
                continue;
            };

            let (idx, created) = registry.get_or_create_tracked(NodeKey::pull_request(pr_id));
            if !created {
                report.record_drop(EntityKind::PullRequest, DropReason::Duplicate);
                continue;
            }

            if let Some(node) = registry.node_mut(idx) {
                node.attrs = Attributes::PullRequest(PullRequestAttrs {
                    title: record
                        .title
                        .clone()
                        .unwrap_or_else(|| DEFAULT_PR_TITLE.to_string()),
                    state: record.state.clone().unwrap_or_else(|| DEFAULT_STATE.to_string()),
                    merged_at: record.merged_at.clone(),
                });
            }
            registry.link(repo_idx, idx, Relation::HasPullRequest);
            if let UserLink::Unknown =
                self.link_user(registry, idx, record.user_login.as_deref(), Relation::OpenedBy)
            {
                report.unresolved_openers += 1;
            }
            report.record_created(EntityKind::PullRequest);
            accepted.push((idx, repo_id, record));
        }

        info!(
            "Created {} pull requests ({} dropped)",
            report.created(EntityKind::PullRequest),
            report.dropped_total(EntityKind::PullRequest)
        );
        accepted
    }

    // ------------------------------------------------------------------------
    // Stage 8: branch resolution
    // ------------------------------------------------------------------------

    fn resolve_pull_request_branches(
        &self,
        registry: &mut EntityRegistry,
        pulls: &[(NodeIndex, u64, &PullRequestRecord)],
        report: &mut IngestReport,
    ) {
        for (pr_idx, repo_id, record) in pulls {
            let base = self.resolver.resolve(
                registry,
                *repo_id,
                record.base_branch.as_deref(),
                BranchRole::Base,
            );
            let head = self.resolver.resolve(
                registry,
                *repo_id,
                record.head_branch.as_deref(),
                BranchRole::Head,
            );
            report.base_resolution.record(base.map(|m| m.tier));
            report.head_resolution.record(head.map(|m| m.tier));

            if let Some(base) = base {
                registry.link(*pr_idx, base.branch, Relation::HasBaseBranch);
            }
            if let Some(head) = head {
                if head.tier.is_low_confidence() {
                    debug!(
                        "Head branch of pull request {:?} guessed by fallback",
                        record.pr_id
                    );
                }
                registry.link(*pr_idx, head.branch, Relation::HasHeadBranch);
            }

            let merged = record.merged_at.as_deref().is_some_and(|s| !s.trim().is_empty());
            if let (Some(base), Some(head), true) = (base, head, merged) {
                if base.branch == head.branch {
                    debug!(
                        "Pull request {:?} resolves head and base to the same branch",
                        record.pr_id
                    );
                    continue;
                }
                registry.relink(head.branch, base.branch, Relation::MergedInto);
            }
        }

        report.merged_branches = registry.count_relation(Relation::MergedInto);

        info!(
            "Resolved pull request branches: {} base, {} head, {} unresolved base, {} unresolved head, {} merged branches",
            report.base_resolution.resolved(),
            report.head_resolution.resolved(),
            report.base_resolution.unresolved,
            report.head_resolution.unresolved,
            report.merged_branches
        );
    }

    fn log_summary(&self, registry: &EntityRegistry, report: &IngestReport) {
        info!("Graph summary:");
        for kind in EntityKind::ALL {
            info!(
                "  {}: {} nodes ({} records dropped)",
                kind,
                registry.count_of(kind),
                report.dropped_total(kind)
            );
        }
        info!("  Edges: {}", registry.edge_count());
    }
}

enum UserLink {
    Linked,
    Absent,
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BranchRecord, FileRecord, IssueRecord, RepoRecord, UserRecord};
    use crate::resolver::MatchTier;

    fn repo(id: u64) -> RepoRecord {
        RepoRecord {
            repo_id: Some(id),
            repo_name: Some(format!("repo-{}", id)),
            ..Default::default()
        }
    }

    fn user(login: &str) -> UserRecord {
        UserRecord {
            user_login: Some(login.to_string()),
            ..Default::default()
        }
    }

    fn branch(repo: u64, name: &str) -> BranchRecord {
        BranchRecord {
            repo_id: Some(repo),
            branch_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn commit(repo: u64, branch: &str, sha: &str, parents: &[&str]) -> CommitRecord {
        CommitRecord {
            repo_id: Some(repo),
            branch_name: Some(branch.to_string()),
            commit_sha: Some(sha.to_string()),
            commit_message: Some(format!("commit {}", sha)),
            commit_date: Some("2024-01-01T00:00:00Z".to_string()),
            commit_parents: Some(parents.iter().map(|p| p.to_string()).collect()),
            ..Default::default()
        }
    }

    fn pull(id: u64, repo: u64, base: &str, head: &str, merged: bool) -> PullRequestRecord {
        PullRequestRecord {
            pr_id: Some(id),
            repo_id: Some(repo),
            state: Some(if merged { "closed" } else { "open" }.to_string()),
            merged_at: merged.then(|| "2024-02-01T00:00:00Z".to_string()),
            base_branch: Some(base.to_string()),
            head_branch: Some(head.to_string()),
            ..Default::default()
        }
    }

    fn basic_dataset() -> Dataset {
        Dataset {
            repositories: vec![repo(1)],
            users: vec![user("alice")],
            branches: vec![branch(1, "main"), branch(1, "dev")],
            commits: vec![
                commit(1, "main", "c1", &[]),
                commit(1, "dev", "c2", &["c1"]),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_build_basic_graph() {
        let (registry, report) = GraphBuilder::new().build(&basic_dataset());

        assert_eq!(registry.count_of(EntityKind::Repository), 1);
        assert_eq!(registry.count_of(EntityKind::Branch), 2);
        assert_eq!(registry.count_of(EntityKind::Commit), 2);
        assert_eq!(report.created(EntityKind::Commit), 2);
        assert_eq!(report.placeholder_commits, 0);
        assert_eq!(registry.parents_of("c2")[0].id(), "commit_c1");
        assert_eq!(registry.commits_of(1, "dev")[0].id(), "commit_c2");
    }

    #[test]
    fn test_repository_without_id_is_counted() {
        let mut dataset = basic_dataset();
        dataset.repositories.push(RepoRecord::default());
        dataset.repositories.push(repo(1));
        let (_, report) = GraphBuilder::new().build(&dataset);

        assert_eq!(report.dropped(EntityKind::Repository, DropReason::MissingField), 1);
        assert_eq!(report.dropped(EntityKind::Repository, DropReason::Duplicate), 1);
    }

    #[test]
    fn test_repository_defaults() {
        let (registry, _) = GraphBuilder::new().build(&basic_dataset());
        let attrs = registry
            .get(&NodeKey::repository(1))
            .unwrap()
            .as_repository()
            .unwrap()
            .clone();
        assert_eq!(attrs.language, "Unknown");
        assert_eq!(attrs.stars, 0);
    }

    #[test]
    fn test_duplicate_user_first_record_wins() {
        let mut dataset = basic_dataset();
        dataset.users = vec![
            UserRecord {
                user_url: Some("https://first".to_string()),
                ..user("alice")
            },
            UserRecord {
                user_url: Some("https://second".to_string()),
                ..user("alice")
            },
        ];
        let (registry, report) = GraphBuilder::new().build(&dataset);

        let alice = registry.get(&NodeKey::user("alice")).unwrap();
        assert_eq!(alice.as_user().unwrap().url.as_deref(), Some("https://first"));
        assert_eq!(report.dropped(EntityKind::User, DropReason::Duplicate), 1);
    }

    #[test]
    fn test_branch_of_unknown_repository_is_dropped() {
        let mut dataset = basic_dataset();
        dataset.branches.push(branch(99, "main"));
        let (registry, report) = GraphBuilder::new().build(&dataset);

        assert!(!registry.contains(&NodeKey::branch(99, "main")));
        assert_eq!(report.dropped(EntityKind::Branch, DropReason::UnknownRepository), 1);
    }

    #[test]
    fn test_commit_on_unknown_branch_is_dropped() {
        let mut dataset = basic_dataset();
        dataset.commits.push(commit(1, "ghost", "c9", &["c1"]));
        let (registry, report) = GraphBuilder::new().build(&dataset);

        assert!(!registry.contains(&NodeKey::commit("c9")));
        assert_eq!(report.dropped(EntityKind::Commit, DropReason::UnknownBranch), 1);
    }

    #[test]
    fn test_forward_parent_reference_is_single_node() {
        let mut dataset = basic_dataset();
        dataset.commits = vec![
            commit(1, "main", "child", &["parent"]),
            commit(1, "main", "parent", &[]),
        ];
        let (registry, report) = GraphBuilder::new().build(&dataset);

        assert_eq!(registry.count_of(EntityKind::Commit), 2);
        let parents = registry.parents_of("child");
        assert_eq!(parents.len(), 1);
        let parent = parents[0].as_commit().unwrap();
        assert!(parent.populated);
        assert_eq!(parent.message.as_deref(), Some("commit parent"));
        assert_eq!(report.placeholder_commits, 0);
    }

    #[test]
    fn test_unseen_parent_stays_placeholder() {
        let mut dataset = basic_dataset();
        dataset.commits = vec![commit(1, "main", "c1", &["outside-history"])];
        let (registry, report) = GraphBuilder::new().build(&dataset);

        let placeholder = registry.get(&NodeKey::commit("outside-history")).unwrap();
        assert!(placeholder.is_placeholder_commit());
        assert!(registry.owning_branch(registry.lookup(&NodeKey::commit("outside-history")).unwrap()).is_none());
        assert_eq!(report.placeholder_commits, 1);
    }

    #[test]
    fn test_repeated_commit_keeps_first_branch_and_attributes() {
        let mut dataset = basic_dataset();
        let mut again = commit(1, "dev", "c1", &["c2"]);
        again.commit_message = Some("overwritten?".to_string());
        dataset.commits.push(again);
        let (registry, report) = GraphBuilder::new().build(&dataset);

        let c1 = registry.get(&NodeKey::commit("c1")).unwrap();
        assert_eq!(c1.as_commit().unwrap().message.as_deref(), Some("commit c1"));
        assert!(registry.parents_of("c1").is_empty());
        assert_eq!(registry.commits_of(1, "main").len(), 1);
        assert_eq!(report.merged(EntityKind::Commit), 1);
    }

    #[test]
    fn test_duplicate_parent_shas_produce_one_edge() {
        let mut dataset = basic_dataset();
        dataset.commits = vec![
            commit(1, "main", "p", &[]),
            commit(1, "main", "c", &["p", "p"]),
        ];
        let (registry, _) = GraphBuilder::new().build(&dataset);
        assert_eq!(registry.parents_of("c").len(), 1);
    }

    #[test]
    fn test_unknown_author_leaves_relation_unset() {
        let mut dataset = basic_dataset();
        dataset.commits[0].commit_author_login = Some("alice".to_string());
        dataset.commits[1].commit_author_login = Some("mallory".to_string());
        let (registry, report) = GraphBuilder::new().build(&dataset);

        assert_eq!(registry.author_of("c1").unwrap().id(), "user_alice");
        assert!(registry.author_of("c2").is_none());
        assert_eq!(report.unresolved_authors, 1);
    }

    #[test]
    fn test_malformed_date_keeps_commit() {
        let mut dataset = basic_dataset();
        dataset.commits[0].commit_date = Some("not a date".to_string());
        let (registry, _) = GraphBuilder::new().build(&dataset);

        let c1 = registry.get(&NodeKey::commit("c1")).unwrap().as_commit().unwrap();
        assert!(c1.timestamp.is_none());
        assert_eq!(c1.date.as_deref(), Some("not a date"));
    }

    #[test]
    fn test_files_attach_to_known_commits() {
        let mut dataset = basic_dataset();
        dataset.files = vec![
            FileRecord {
                commit_sha: Some("c1".to_string()),
                file_name: Some("src/lib.rs".to_string()),
                file_additions: Some(10),
                ..Default::default()
            },
            FileRecord {
                commit_sha: Some("nope".to_string()),
                file_name: Some("README.md".to_string()),
                ..Default::default()
            },
        ];
        let (registry, report) = GraphBuilder::new().build(&dataset);

        let touch = registry.get(&NodeKey::file("c1", "src/lib.rs")).unwrap();
        assert_eq!(touch.as_file().unwrap().status, "modified");
        assert_eq!(touch.as_file().unwrap().additions, 10);
        assert_eq!(report.dropped(EntityKind::File, DropReason::UnknownCommit), 1);
    }

    #[test]
    fn test_issue_of_unknown_repository_is_dropped() {
        let mut dataset = basic_dataset();
        dataset.issues = vec![
            IssueRecord {
                issue_id: Some(1),
                repo_id: Some(1),
                user_login: Some("alice".to_string()),
                ..Default::default()
            },
            IssueRecord {
                issue_id: Some(2),
                repo_id: Some(42),
                ..Default::default()
            },
        ];
        let (registry, report) = GraphBuilder::new().build(&dataset);

        let issue = registry.get(&NodeKey::issue(1)).unwrap();
        assert_eq!(issue.as_issue().unwrap().title, "Untitled");
        assert_eq!(issue.as_issue().unwrap().state, "open");
        assert!(!registry.contains(&NodeKey::issue(2)));
        assert_eq!(report.dropped(EntityKind::Issue, DropReason::UnknownRepository), 1);
    }

    #[test]
    fn test_merged_pull_request_sets_merge_target() {
        let mut dataset = basic_dataset();
        dataset.pull_requests = vec![pull(10, 1, "main", "dev", true)];
        let (registry, report) = GraphBuilder::new().build(&dataset);

        let dev = registry.lookup(&NodeKey::branch(1, "dev")).unwrap();
        let main = registry.lookup(&NodeKey::branch(1, "main")).unwrap();
        assert_eq!(registry.merged_into(dev), Some(main));
        assert_eq!(registry.merged_into(main), None);
        assert_eq!(report.base_resolution.by_tier.get(&MatchTier::Exact), Some(&1));
        assert_eq!(report.merged_branches, 1);
    }

    #[test]
    fn test_open_pull_request_links_branches_only() {
        let mut dataset = basic_dataset();
        dataset.pull_requests = vec![pull(10, 1, "main", "dev", false)];
        let (registry, _) = GraphBuilder::new().build(&dataset);

        let pr = registry.lookup(&NodeKey::pull_request(10)).unwrap();
        assert!(registry.target(pr, Relation::HasBaseBranch).is_some());
        assert!(registry.target(pr, Relation::HasHeadBranch).is_some());
        assert_eq!(registry.count_relation(Relation::MergedInto), 0);
    }

    #[test]
    fn test_later_merge_overwrites_target() {
        let mut dataset = basic_dataset();
        dataset.branches.push(branch(1, "release"));
        dataset.pull_requests = vec![
            pull(10, 1, "main", "dev", true),
            pull(11, 1, "release", "dev", true),
        ];
        let (registry, _) = GraphBuilder::new().build(&dataset);

        let dev = registry.lookup(&NodeKey::branch(1, "dev")).unwrap();
        let release = registry.lookup(&NodeKey::branch(1, "release")).unwrap();
        assert_eq!(registry.merged_into(dev), Some(release));
    }

    #[test]
    fn test_pull_request_of_unknown_repository_is_dropped() {
        let mut dataset = basic_dataset();
        dataset.pull_requests = vec![pull(10, 7, "main", "dev", true)];
        let (registry, report) = GraphBuilder::new().build(&dataset);

        assert!(!registry.contains(&NodeKey::pull_request(10)));
        assert_eq!(
            report.dropped(EntityKind::PullRequest, DropReason::UnknownRepository),
            1
        );
    }

    #[test]
    fn test_malformed_counts_flow_into_report() {
        let mut dataset = basic_dataset();
        dataset.malformed.insert(EntityKind::Commit, 2);
        let (_, report) = GraphBuilder::new().build(&dataset);
        assert_eq!(report.dropped(EntityKind::Commit, DropReason::Malformed), 2);
    }
}
