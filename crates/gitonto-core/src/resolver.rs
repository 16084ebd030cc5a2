//! Branch resolution for pull request references.
//!
//! Pull request records name their base and head branches as free text.
//! The resolver maps that text onto a branch of the pull request's
//! repository by trying, in order:
//!
//! 1. case-insensitive exact name match
//! 2. case-insensitive substring match (the text occurs inside the name)
//! 3. base only: a branch with a default name (`main`, `master`)
//! 4. head only, when enabled: any branch without a default name
//!
//! Within a tier the first branch in insertion order wins. Tier 4 is a low
//! confidence guess and is reported as such.

use std::fmt;

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::graph::RepoId;
use crate::registry::EntityRegistry;

/// Which side of a pull request is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchRole {
    Base,
    Head,
}

/// The rule that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Substring,
    DefaultName,
    AnyNonDefault,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::Substring => "substring",
            MatchTier::DefaultName => "default_name",
            MatchTier::AnyNonDefault => "any_non_default",
        }
    }

    pub fn is_low_confidence(&self) -> bool {
        matches!(self, MatchTier::AnyNonDefault)
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved branch reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchMatch {
    pub branch: NodeIndex,
    pub tier: MatchTier,
}

/// Configuration for branch resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Names treated as a repository's default branch (compared case-insensitively)
    pub default_branch_names: Vec<String>,
    /// Allow the any-non-default fallback for head branches
    pub head_fallback: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_branch_names: vec!["main".to_string(), "master".to_string()],
            head_fallback: true,
        }
    }
}

/// Resolves free-text branch references against a registry.
#[derive(Debug, Clone)]
pub struct BranchResolver {
    default_names: Vec<String>,
    head_fallback: bool,
}

impl Default for BranchResolver {
    fn default() -> Self {
        Self::new(&ResolverConfig::default())
    }
}

impl BranchResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            default_names: config
                .default_branch_names
                .iter()
                .map(|n| n.trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
            head_fallback: config.head_fallback,
        }
    }

    fn is_default_name(&self, name_lower: &str) -> bool {
        self.default_names.iter().any(|d| d == name_lower)
    }

    /// Resolve `text` to a branch of repository `repo`.
    ///
    /// Absent or blank text skips the name tiers and goes straight to the
    /// role's fallback. A repository without branches never resolves.
    pub fn resolve(
        &self,
        registry: &EntityRegistry,
        repo: RepoId,
        text: Option<&str>,
        role: BranchRole,
    ) -> Option<BranchMatch> {
        let candidates: Vec<(NodeIndex, String)> = registry
            .branch_indices(repo)
            .into_iter()
            .filter_map(|idx| {
                let name = registry.node(idx)?.as_branch()?.name.to_lowercase();
                Some((idx, name))
            })
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let needle = text.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty());

        if let Some(needle) = needle.as_deref() {
            if let Some((idx, _)) = candidates.iter().find(|(_, name)| name == needle) {
                return Some(BranchMatch {
                    branch: *idx,
                    tier: MatchTier::Exact,
                });
            }
            if let Some((idx, _)) = candidates.iter().find(|(_, name)| name.contains(needle)) {
                return Some(BranchMatch {
                    branch: *idx,
                    tier: MatchTier::Substring,
                });
            }
        }

        match role {
            BranchRole::Base => candidates
                .iter()
                .find(|(_, name)| self.is_default_name(name))
                .map(|(idx, _)| BranchMatch {
                    branch: *idx,
                    tier: MatchTier::DefaultName,
                }),
            BranchRole::Head if self.head_fallback => candidates
                .iter()
                .find(|(_, name)| !self.is_default_name(name))
                .map(|(idx, _)| BranchMatch {
                    branch: *idx,
                    tier: MatchTier::AnyNonDefault,
                }),
            BranchRole::Head => None,
        }
    }
}
