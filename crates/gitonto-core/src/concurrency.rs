//! Concurrency Detector
//!
//! Flags users who were active in several repositories during overlapping
//! periods. Activity is every commit with a known author, a parsed
//! timestamp and an owning branch. Per (user, repository) the timestamps
//! collapse into one closed interval `[first, last]`.
//!
//! Two overlap rules are available:
//!
//! - [`OverlapRule::PairwiseCount`]: at least `min_pairs` pairs of
//!   repository intervals overlap.
//! - [`OverlapRule::Simultaneous`]: at some instant, at least
//!   `min_repositories` intervals are active at once.
//!
//! Either way a user needs activity in `min_repositories` distinct
//! repositories to be considered. Every user node receives an explicit
//! verdict, so "evaluated and false" differs from "never evaluated".

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::graph::{EntityKind, NodeKey, RepoId, Relation, Tag};
use crate::registry::EntityRegistry;

/// How overlapping repository intervals are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapRule {
    /// Count overlapping interval pairs
    PairwiseCount { min_pairs: usize },
    /// Require `min_repositories` intervals active at a single instant
    Simultaneous,
}

/// Configuration for concurrency detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyConfig {
    pub min_repositories: usize,
    pub rule: OverlapRule,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            min_repositories: 3,
            rule: OverlapRule::PairwiseCount { min_pairs: 3 },
        }
    }
}

/// A user's activity span in one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityInterval {
    pub repository: RepoId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ActivityInterval {
    /// Closed-interval overlap: touching endpoints count.
    pub fn overlaps(&self, other: &ActivityInterval) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Result of a detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConcurrencyReport {
    /// User nodes that received a verdict
    pub evaluated_users: usize,
    /// Users active in enough repositories to be considered
    pub candidates: usize,
    /// Logins tagged as concurrent contributors, sorted
    pub concurrent: Vec<String>,
    /// Commits left out for lack of author, timestamp or branch
    pub skipped_commits: usize,
}

/// Number of overlapping interval pairs.
pub fn count_overlapping_pairs(intervals: &[ActivityInterval]) -> usize {
    let mut count = 0;
    for (i, a) in intervals.iter().enumerate() {
        for b in &intervals[i + 1..] {
            if a.overlaps(b) {
                count += 1;
            }
        }
    }
    count
}

/// Largest number of intervals active at one instant.
pub fn max_simultaneous(intervals: &[ActivityInterval]) -> usize {
    // (time, 0 = start, 1 = end): starts sort before ends at the same
    // instant so touching intervals count as overlapping.
    let mut events: Vec<(DateTime<Utc>, u8)> = intervals
        .iter()
        .flat_map(|iv| [(iv.start, 0u8), (iv.end, 1u8)])
        .collect();
    events.sort();

    let mut active = 0usize;
    let mut best = 0usize;
    for (_, kind) in events {
        if kind == 0 {
            active += 1;
            best = best.max(active);
        } else {
            active = active.saturating_sub(1);
        }
    }
    best
}

/// Detects concurrent contributors and tags user nodes.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyDetector {
    config: ConcurrencyConfig,
}

impl ConcurrencyDetector {
    pub fn new(config: ConcurrencyConfig) -> Self {
        Self { config }
    }

    /// Whether a set of per-repository intervals qualifies.
    pub fn qualifies(&self, intervals: &[ActivityInterval]) -> bool {
        if intervals.len() < self.config.min_repositories {
            return false;
        }
        match self.config.rule {
            OverlapRule::PairwiseCount { min_pairs } => {
                count_overlapping_pairs(intervals) >= min_pairs
            }
            OverlapRule::Simultaneous => {
                max_simultaneous(intervals) >= self.config.min_repositories
            }
        }
    }

    /// Gather timestamps per user login and repository.
    ///
    /// Returns the activity map and the number of commits skipped.
    pub fn collect_activity(
        &self,
        registry: &EntityRegistry,
    ) -> (BTreeMap<String, BTreeMap<RepoId, Vec<DateTime<Utc>>>>, usize) {
        let mut activity: BTreeMap<String, BTreeMap<RepoId, Vec<DateTime<Utc>>>> = BTreeMap::new();
        let mut skipped = 0;

        for (idx, node) in registry.nodes_of_kind(EntityKind::Commit) {
            let Some(timestamp) = node.as_commit().and_then(|c| c.timestamp) else {
                skipped += 1;
                continue;
            };
            let login = registry
                .target(idx, Relation::AuthoredBy)
                .and_then(|u| registry.node(u))
                .and_then(|u| match &u.key {
                    NodeKey::User(login) => Some(login.clone()),
                    _ => None,
                });
            let repo = registry
                .owning_branch(idx)
                .and_then(|b| registry.node(b))
                .and_then(|b| b.key.repo_id());

            match (login, repo) {
                (Some(login), Some(repo)) => activity
                    .entry(login)
                    .or_default()
                    .entry(repo)
                    .or_default()
                    .push(timestamp),
                _ => skipped += 1,
            }
        }

        (activity, skipped)
    }

    /// Collapse per-repository timestamps into `[min, max]` intervals.
    pub fn intervals(per_repo: &BTreeMap<RepoId, Vec<DateTime<Utc>>>) -> Vec<ActivityInterval> {
        per_repo
            .iter()
            .filter_map(|(repo, times)| {
                Some(ActivityInterval {
                    repository: *repo,
                    start: *times.iter().min()?,
                    end: *times.iter().max()?,
                })
            })
            .collect()
    }

    /// Evaluate every user node and record the verdict.
    pub fn detect(&self, registry: &mut EntityRegistry) -> ConcurrencyReport {
        let (activity, skipped) = self.collect_activity(registry);
        let mut report = ConcurrencyReport {
            skipped_commits: skipped,
            ..Default::default()
        };

        for idx in registry.indices_of_kind(EntityKind::User) {
            let Some(node) = registry.node_mut(idx) else {
                continue;
            };
            let NodeKey::User(login) = &node.key else {
                continue;
            };
            let login = login.clone();

            let intervals = activity
                .get(&login)
                .map(Self::intervals)
                .unwrap_or_default();
            if intervals.len() >= self.config.min_repositories {
                report.candidates += 1;
            }
            let concurrent = self.qualifies(&intervals);
            if concurrent {
                debug!("{} is concurrent across {} repositories", login, intervals.len());
                report.concurrent.push(login);
            }

            node.set_tag(Tag::ConcurrentContributor, concurrent);
            if let Some(user) = node.as_user_mut() {
                user.concurrent_contributor = Some(concurrent);
            }
            report.evaluated_users += 1;
        }

        report.concurrent.sort();
        info!(
            "Concurrency: {} users evaluated, {} candidates, {} concurrent ({} commits skipped)",
            report.evaluated_users,
            report.candidates,
            report.concurrent.len(),
            report.skipped_commits
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(month: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, d, 0, 0, 0).unwrap()
    }

    fn iv(repo: RepoId, start: DateTime<Utc>, end: DateTime<Utc>) -> ActivityInterval {
        ActivityInterval {
            repository: repo,
            start,
            end,
        }
    }

    #[test]
    fn test_three_mutually_overlapping_repositories() {
        let intervals = [
            iv(1, day(1, 1), day(1, 10)),
            iv(2, day(1, 5), day(1, 15)),
            iv(3, day(1, 8), day(1, 20)),
        ];
        assert_eq!(count_overlapping_pairs(&intervals), 3);
        assert!(ConcurrencyDetector::default().qualifies(&intervals));
    }

    #[test]
    fn test_disjoint_intervals_do_not_qualify() {
        let intervals = [
            iv(1, day(1, 1), day(1, 2)),
            iv(2, day(3, 1), day(3, 2)),
            iv(3, day(6, 1), day(6, 2)),
        ];
        assert_eq!(count_overlapping_pairs(&intervals), 0);
        assert!(!ConcurrencyDetector::default().qualifies(&intervals));
    }

    #[test]
    fn test_two_repositories_never_qualify() {
        let intervals = [iv(1, day(1, 1), day(12, 1)), iv(2, day(1, 1), day(12, 1))];
        let detector = ConcurrencyDetector::default();
        assert!(!detector.qualifies(&intervals));

        let simultaneous = ConcurrencyDetector::new(ConcurrencyConfig {
            rule: OverlapRule::Simultaneous,
            ..Default::default()
        });
        assert!(!simultaneous.qualifies(&intervals));
    }

    #[test]
    fn test_touching_endpoints_overlap() {
        let a = iv(1, day(1, 1), day(1, 5));
        let b = iv(2, day(1, 5), day(1, 9));
        assert!(a.overlaps(&b));
        assert_eq!(max_simultaneous(&[a, b]), 2);
    }

    #[test]
    fn test_pairwise_and_simultaneous_rules_differ() {
        // Chain A-B, B-C, C-D overlap pairwise but never three at once.
        let intervals = [
            iv(1, day(1, 1), day(1, 10)),
            iv(2, day(1, 9), day(1, 20)),
            iv(3, day(1, 19), day(1, 30)),
            iv(4, day(1, 29), day(2, 10)),
        ];
        assert_eq!(count_overlapping_pairs(&intervals), 3);
        assert_eq!(max_simultaneous(&intervals), 2);

        assert!(ConcurrencyDetector::default().qualifies(&intervals));
        let strict = ConcurrencyDetector::new(ConcurrencyConfig {
            min_repositories: 3,
            rule: OverlapRule::Simultaneous,
        });
        assert!(!strict.qualifies(&intervals));
    }

    #[test]
    fn test_intervals_use_min_and_max() {
        let mut per_repo = BTreeMap::new();
        per_repo.insert(7, vec![day(3, 1), day(1, 1), day(2, 1)]);
        let intervals = ConcurrencyDetector::intervals(&per_repo);
        assert_eq!(intervals, vec![iv(7, day(1, 1), day(3, 1))]);
    }

    #[test]
    fn test_detect_marks_every_user() {
        use crate::graph::{Attributes, CommitAttrs};

        let mut registry = EntityRegistry::new();
        let busy = registry.get_or_create(NodeKey::user("busy"));
        let idle = registry.get_or_create(NodeKey::user("idle"));

        let spans = [(1, day(1, 1), day(1, 10)), (2, day(1, 5), day(1, 15)), (3, day(1, 8), day(1, 20))];
        for (repo, start, end) in spans {
            let repo_idx = registry.get_or_create(NodeKey::repository(repo));
            let branch = registry.get_or_create(NodeKey::branch(repo, "main"));
            registry.link(repo_idx, branch, Relation::HasBranch);
            for (n, ts) in [start, end].into_iter().enumerate() {
                let sha = format!("{}-{}", repo, n);
                let c = registry.get_or_create(NodeKey::commit(sha.clone()));
                registry.node_mut(c).unwrap().attrs = Attributes::Commit(CommitAttrs {
                    sha,
                    timestamp: Some(ts),
                    populated: true,
                    ..Default::default()
                });
                registry.link(branch, c, Relation::HasCommit);
                registry.link(c, busy, Relation::AuthoredBy);
            }
        }

        let report = ConcurrencyDetector::default().detect(&mut registry);

        assert_eq!(report.evaluated_users, 2);
        assert_eq!(report.candidates, 1);
        assert_eq!(report.concurrent, vec!["busy".to_string()]);
        assert!(registry.node(busy).unwrap().has_tag(Tag::ConcurrentContributor));
        let idle_node = registry.node(idle).unwrap();
        assert!(!idle_node.has_tag(Tag::ConcurrentContributor));
        assert_eq!(idle_node.as_user().unwrap().concurrent_contributor, Some(false));
    }

    #[test]
    fn test_commits_without_timestamp_are_skipped() {
        let mut registry = EntityRegistry::new();
        registry.get_or_create(NodeKey::commit("placeholder"));
        let (activity, skipped) = ConcurrencyDetector::default().collect_activity(&registry);
        assert!(activity.is_empty());
        assert_eq!(skipped, 1);
    }
}
