//! Classification Engine
//!
//! Derivation rules applied to a fully built registry. Each rule sets or
//! clears exactly one tag from the current graph state, so running the pass
//! again yields the same tag sets.
//!
//! | Tag                 | Rule                                          |
//! |---------------------|-----------------------------------------------|
//! | `MergeCommit`       | commit has two or more parents                |
//! | `InitialCommit`     | commit has no parents                         |
//! | `SecurityCommit`    | message contains a configured keyword         |
//! | `UnmergedBranch`    | branch has no merge target                    |
//! | `MergedPullRequest` | state is `closed` and a merge timestamp is set |

use serde::Serialize;
use tracing::info;

use crate::graph::{EntityKind, Relation, Tag};
use crate::registry::EntityRegistry;

/// Configuration for the classification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Keywords matched case-insensitively against commit messages
    pub security_keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            security_keywords: vec!["security".to_string(), "vulnerability".to_string()],
        }
    }
}

/// Tag counts after a classification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    pub merge_commits: usize,
    pub initial_commits: usize,
    pub security_commits: usize,
    pub unmerged_branches: usize,
    pub merged_pull_requests: usize,
}

/// Applies derivation rules to a registry.
#[derive(Debug, Clone)]
pub struct Classifier {
    keywords: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            keywords: config
                .security_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Whether a commit message mentions any security keyword.
    pub fn is_security_message(&self, message: &str) -> bool {
        let folded = message.to_lowercase();
        self.keywords.iter().any(|k| folded.contains(k.as_str()))
    }

    /// Run every rule over the registry.
    pub fn classify(&self, registry: &mut EntityRegistry) -> ClassificationSummary {
        let mut summary = ClassificationSummary::default();

        for idx in registry.indices_of_kind(EntityKind::Commit) {
            let parent_count = registry.targets(idx, Relation::Parent).len();
            let Some(node) = registry.node_mut(idx) else {
                continue;
            };
            let security = node
                .as_commit()
                .and_then(|c| c.message.as_deref())
                .is_some_and(|m| self.is_security_message(m));

            node.set_tag(Tag::MergeCommit, parent_count >= 2);
            node.set_tag(Tag::InitialCommit, parent_count == 0);
            node.set_tag(Tag::SecurityCommit, security);

            summary.merge_commits += usize::from(parent_count >= 2);
            summary.initial_commits += usize::from(parent_count == 0);
            summary.security_commits += usize::from(security);
        }

        for idx in registry.indices_of_kind(EntityKind::Branch) {
            let unmerged = registry.merged_into(idx).is_none();
            if let Some(node) = registry.node_mut(idx) {
                node.set_tag(Tag::UnmergedBranch, unmerged);
                summary.unmerged_branches += usize::from(unmerged);
            }
        }

        for idx in registry.indices_of_kind(EntityKind::PullRequest) {
            let Some(node) = registry.node_mut(idx) else {
                continue;
            };
            let merged = node
                .as_pull_request()
                .is_some_and(|pr| pr.state.eq_ignore_ascii_case("closed") && pr.has_merge_timestamp());
            node.set_tag(Tag::MergedPullRequest, merged);
            summary.merged_pull_requests += usize::from(merged);
        }

        info!(
            "Classified: {} merge commits, {} initial commits, {} security commits, {} unmerged branches, {} merged pull requests",
            summary.merge_commits,
            summary.initial_commits,
            summary.security_commits,
            summary.unmerged_branches,
            summary.merged_pull_requests
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Attributes, CommitAttrs, NodeKey, PullRequestAttrs};
    use petgraph::stable_graph::NodeIndex;

    fn add_commit(registry: &mut EntityRegistry, sha: &str, message: &str) -> NodeIndex {
        let idx = registry.get_or_create(NodeKey::commit(sha));
        registry.node_mut(idx).unwrap().attrs = Attributes::Commit(CommitAttrs {
            sha: sha.to_string(),
            message: Some(message.to_string()),
            populated: true,
            ..Default::default()
        });
        idx
    }

    fn tags(registry: &EntityRegistry, key: NodeKey) -> Vec<Tag> {
        registry.tags_of(&key).unwrap().iter().copied().collect()
    }

    #[test]
    fn test_parent_count_rules() {
        let mut registry = EntityRegistry::new();
        let a = add_commit(&mut registry, "a", "init");
        let b = add_commit(&mut registry, "b", "work");
        let m = add_commit(&mut registry, "m", "Merge branch 'dev'");
        registry.link(b, a, Relation::Parent);
        registry.link(m, a, Relation::Parent);
        registry.link(m, b, Relation::Parent);

        let summary = Classifier::default().classify(&mut registry);

        assert_eq!(tags(&registry, NodeKey::commit("a")), vec![Tag::InitialCommit]);
        assert!(tags(&registry, NodeKey::commit("b")).is_empty());
        assert_eq!(tags(&registry, NodeKey::commit("m")), vec![Tag::MergeCommit]);
        assert_eq!(summary.merge_commits, 1);
        assert_eq!(summary.initial_commits, 1);
    }

    #[test]
    fn test_security_keywords() {
        let classifier = Classifier::default();
        assert!(classifier.is_security_message("Fix SQL injection vulnerability"));
        assert!(classifier.is_security_message("SECURITY: bump openssl"));
        assert!(!classifier.is_security_message("Update README"));
    }

    #[test]
    fn test_custom_keywords() {
        let classifier = Classifier::new(&ClassifierConfig {
            security_keywords: vec!["Auth".to_string(), "  ".to_string()],
        });
        assert!(classifier.is_security_message("fix oauth token refresh"));
        assert!(!classifier.is_security_message("fix vulnerability"));
        assert!(!classifier.is_security_message("anything"));
    }

    #[test]
    fn test_unmerged_branch_tracks_merge_target() {
        let mut registry = EntityRegistry::new();
        let main = registry.get_or_create(NodeKey::branch(1, "main"));
        let dev = registry.get_or_create(NodeKey::branch(1, "dev"));
        registry.link(dev, main, Relation::MergedInto);

        let classifier = Classifier::default();
        let summary = classifier.classify(&mut registry);
        assert_eq!(summary.unmerged_branches, 1);
        assert!(registry.node(main).unwrap().has_tag(Tag::UnmergedBranch));
        assert!(!registry.node(dev).unwrap().has_tag(Tag::UnmergedBranch));
    }

    #[test]
    fn test_merged_pull_request_requires_closed_and_timestamp() {
        let mut registry = EntityRegistry::new();
        let cases = [
            (1, "closed", Some("2024-01-01T00:00:00Z"), true),
            (2, "closed", None, false),
            (3, "open", Some("2024-01-01T00:00:00Z"), false),
            (4, "CLOSED", Some("2024-01-01T00:00:00Z"), true),
        ];
        for (id, state, merged_at, _) in cases {
            let idx = registry.get_or_create(NodeKey::pull_request(id));
            registry.node_mut(idx).unwrap().attrs = Attributes::PullRequest(PullRequestAttrs {
                title: "t".to_string(),
                state: state.to_string(),
                merged_at: merged_at.map(str::to_string),
            });
        }

        Classifier::default().classify(&mut registry);

        for (id, _, _, expected) in cases {
            let node = registry.get(&NodeKey::pull_request(id)).unwrap();
            assert_eq!(node.has_tag(Tag::MergedPullRequest), expected, "pr {}", id);
        }
    }

    #[test]
    fn test_classification_is_idempotent() {
        let mut registry = EntityRegistry::new();
        let a = add_commit(&mut registry, "a", "security fix");
        let b = add_commit(&mut registry, "b", "more");
        registry.link(b, a, Relation::Parent);
        registry.get_or_create(NodeKey::branch(1, "main"));

        let classifier = Classifier::default();
        let first = classifier.classify(&mut registry);
        let snapshot: Vec<_> = registry.nodes().map(|(_, n)| n.tags.clone()).collect();
        let second = classifier.classify(&mut registry);
        let again: Vec<_> = registry.nodes().map(|(_, n)| n.tags.clone()).collect();

        assert_eq!(first, second);
        assert_eq!(snapshot, again);
    }

    #[test]
    fn test_reclassification_clears_stale_tags() {
        let mut registry = EntityRegistry::new();
        let main = registry.get_or_create(NodeKey::branch(1, "main"));
        let dev = registry.get_or_create(NodeKey::branch(1, "dev"));
        let classifier = Classifier::default();

        classifier.classify(&mut registry);
        assert!(registry.node(dev).unwrap().has_tag(Tag::UnmergedBranch));

        registry.link(dev, main, Relation::MergedInto);
        classifier.classify(&mut registry);
        assert!(!registry.node(dev).unwrap().has_tag(Tag::UnmergedBranch));
    }
}
