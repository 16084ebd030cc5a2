//! Constraint validation for populated graphs.
//!
//! Checks the cardinality and consistency restrictions of the ontology
//! against a registry and collects every finding. Placeholder commits
//! (parents outside the loaded history) are expected in partial datasets
//! and only produce warnings.

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::graph::{EntityKind, Relation, Tag};
use crate::registry::EntityRegistry;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Violation,
}

/// The constraint a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Repository `hasBranch min 1`
    RepositoryHasBranch,
    /// Branch `hasCommit min 1`
    BranchHasCommit,
    /// Commit `onBranch exactly 1`
    CommitOnOneBranch,
    /// Commit `authoredBy min 1`
    CommitHasAuthor,
    /// `mergedInto` stays inside one repository
    MergeWithinRepository,
    /// `MergeCommit` and `InitialCommit` are disjoint
    DisjointCommitTags,
    /// Commit known only as a parent reference
    PlaceholderCommit,
}

impl Constraint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Constraint::RepositoryHasBranch => "repository_has_branch",
            Constraint::BranchHasCommit => "branch_has_commit",
            Constraint::CommitOnOneBranch => "commit_on_one_branch",
            Constraint::CommitHasAuthor => "commit_has_author",
            Constraint::MergeWithinRepository => "merge_within_repository",
            Constraint::DisjointCommitTags => "disjoint_commit_tags",
            Constraint::PlaceholderCommit => "placeholder_commit",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub constraint: Constraint,
    /// Exported id of the offending node
    pub node: String,
    pub message: String,
}

/// Result of validating a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// True when there are no violations (warnings are allowed)
    pub conforms: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn violations(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Violation)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn count(&self, constraint: Constraint) -> usize {
        self.issues
            .iter()
            .filter(|i| i.constraint == constraint)
            .count()
    }
}

struct Collector {
    issues: Vec<ValidationIssue>,
}

impl Collector {
    fn push(&mut self, severity: Severity, constraint: Constraint, node: String, message: String) {
        self.issues.push(ValidationIssue {
            severity,
            constraint,
            node,
            message,
        });
    }
}

/// Validate every constraint over the registry.
pub fn validate(registry: &EntityRegistry) -> ValidationReport {
    let mut out = Collector { issues: Vec::new() };

    for (idx, node) in registry.nodes_of_kind(EntityKind::Repository) {
        if registry.targets(idx, Relation::HasBranch).is_empty() {
            out.push(
                Severity::Violation,
                Constraint::RepositoryHasBranch,
                node.id(),
                "repository has no branches".to_string(),
            );
        }
    }

    for (idx, node) in registry.nodes_of_kind(EntityKind::Branch) {
        if registry.targets(idx, Relation::HasCommit).is_empty() {
            out.push(
                Severity::Violation,
                Constraint::BranchHasCommit,
                node.id(),
                "branch has no commits".to_string(),
            );
        }

        if let Some(target) = registry.merged_into(idx) {
            let source_repo = node.key.repo_id();
            let target_repo = registry.node(target).and_then(|t| t.key.repo_id());
            if source_repo != target_repo {
                out.push(
                    Severity::Violation,
                    Constraint::MergeWithinRepository,
                    node.id(),
                    format!(
                        "merged into a branch of another repository ({:?})",
                        target_repo
                    ),
                );
            }
        }
    }

    for (idx, node) in registry.nodes_of_kind(EntityKind::Commit) {
        if node.has_tag(Tag::MergeCommit) && node.has_tag(Tag::InitialCommit) {
            out.push(
                Severity::Violation,
                Constraint::DisjointCommitTags,
                node.id(),
                "commit is tagged both MergeCommit and InitialCommit".to_string(),
            );
        }

        if node.is_placeholder_commit() {
            out.push(
                Severity::Warning,
                Constraint::PlaceholderCommit,
                node.id(),
                "commit is referenced as a parent but has no record".to_string(),
            );
            continue;
        }

        let branches = registry.sources(idx, Relation::HasCommit).len();
        if branches != 1 {
            out.push(
                Severity::Violation,
                Constraint::CommitOnOneBranch,
                node.id(),
                format!("commit is on {} branches, expected exactly 1", branches),
            );
        }
        if registry.target(idx, Relation::AuthoredBy).is_none() {
            out.push(
                Severity::Violation,
                Constraint::CommitHasAuthor,
                node.id(),
                "commit has no author".to_string(),
            );
        }
    }

    let conforms = !out.issues.iter().any(|i| i.severity == Severity::Violation);
    let report = ValidationReport {
        conforms,
        issues: out.issues,
    };
    info!(
        "Validation: conforms={} ({} violations, {} warnings)",
        report.conforms,
        report.violations().count(),
        report.warnings().count()
    );
    report
}
