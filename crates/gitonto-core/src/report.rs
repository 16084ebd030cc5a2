//! Ingest accounting: what the builder created, merged and dropped.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::graph::EntityKind;
use crate::resolver::MatchTier;

/// Why a record did not produce (or update) a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// A key field (id, SHA, name) was absent
    MissingField,
    /// The owning repository was never registered
    UnknownRepository,
    /// The owning branch was never registered
    UnknownBranch,
    /// The owning commit was never registered
    UnknownCommit,
    /// A record with the same key was already accepted
    Duplicate,
    /// The element could not be decoded
    Malformed,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingField => "missing_field",
            DropReason::UnknownRepository => "unknown_repository",
            DropReason::UnknownBranch => "unknown_branch",
            DropReason::UnknownCommit => "unknown_commit",
            DropReason::Duplicate => "duplicate",
            DropReason::Malformed => "malformed",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind record accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindReport {
    /// Nodes created (or, for commits, placeholders filled) from records
    pub created: usize,
    /// Records that repeated an accepted key and were merged into it
    pub merged: usize,
    pub dropped: BTreeMap<DropReason, usize>,
}

impl KindReport {
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }
}

/// Outcome of branch resolution for one role (base or head).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionTally {
    pub by_tier: BTreeMap<MatchTier, usize>,
    pub unresolved: usize,
}

impl ResolutionTally {
    pub fn record(&mut self, tier: Option<MatchTier>) {
        match tier {
            Some(tier) => *self.by_tier.entry(tier).or_insert(0) += 1,
            None => self.unresolved += 1,
        }
    }

    pub fn resolved(&self) -> usize {
        self.by_tier.values().sum()
    }
}

/// Everything the builder observed while populating a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub kinds: BTreeMap<EntityKind, KindReport>,
    /// Commits whose author login named no registered user
    pub unresolved_authors: usize,
    pub unresolved_committers: usize,
    /// Issues and pull requests whose opener named no registered user
    pub unresolved_openers: usize,
    /// Commits known only as parents at the end of population
    pub placeholder_commits: usize,
    pub base_resolution: ResolutionTally,
    pub head_resolution: ResolutionTally,
    /// Branches that received a merge target
    pub merged_branches: usize,
}

impl IngestReport {
    pub fn record_created(&mut self, kind: EntityKind) {
        self.kinds.entry(kind).or_default().created += 1;
    }

    pub fn record_merged(&mut self, kind: EntityKind) {
        self.kinds.entry(kind).or_default().merged += 1;
    }

    pub fn record_drop(&mut self, kind: EntityKind, reason: DropReason) {
        self.record_drops(kind, reason, 1);
    }

    pub fn record_drops(&mut self, kind: EntityKind, reason: DropReason, count: usize) {
        if count == 0 {
            return;
        }
        *self
            .kinds
            .entry(kind)
            .or_default()
            .dropped
            .entry(reason)
            .or_insert(0) += count;
    }

    pub fn created(&self, kind: EntityKind) -> usize {
        self.kinds.get(&kind).map_or(0, |k| k.created)
    }

    pub fn merged(&self, kind: EntityKind) -> usize {
        self.kinds.get(&kind).map_or(0, |k| k.merged)
    }

    pub fn dropped(&self, kind: EntityKind, reason: DropReason) -> usize {
        self.kinds
            .get(&kind)
            .and_then(|k| k.dropped.get(&reason))
            .copied()
            .unwrap_or(0)
    }

    pub fn dropped_total(&self, kind: EntityKind) -> usize {
        self.kinds.get(&kind).map_or(0, |k| k.dropped_total())
    }
}
