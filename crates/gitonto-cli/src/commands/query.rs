//! Query command - Canned traversal queries over the populated graph

use anyhow::Result;
use clap::{Args, Subcommand};
use gitonto_core::graph::{NodeKey, Tag};
use gitonto_core::query::{
    self, BranchRow, CommitRow, CountRow, RepositoryRow, UnmergedBranchesRow,
};
use gitonto_core::RepoId;

use super::{populate_graph, print_rows};
use crate::GlobalOptions;

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    #[command(subcommand)]
    query: QueryKind,

    /// Output rows as JSON
    #[arg(long, global = true)]
    json: bool,
}

/// Available queries
#[derive(Subcommand, Debug)]
pub enum QueryKind {
    /// Repositories with branch counts
    Repos {
        /// Only the N most forked repositories
        #[arg(long)]
        most_forked: Option<usize>,
    },

    /// Branches of a repository
    Branches {
        /// Repository id
        repo: RepoId,
    },

    /// Commits owned by a branch, oldest first
    Commits {
        /// Repository id
        repo: RepoId,
        /// Branch name
        branch: String,
    },

    /// Parents of a commit
    Parents {
        /// Commit SHA
        sha: String,
    },

    /// Commits authored by a user
    Author {
        /// User login
        login: String,
    },

    /// Classification tags of a commit
    Tags {
        /// Commit SHA
        sha: String,
    },

    /// Commits whose message contains a keyword
    Search {
        /// Keyword (case-insensitive)
        keyword: String,
    },

    /// Merge commits
    Merges,

    /// Security commits with their branch
    Security,

    /// Initial commits per repository
    Initial,

    /// Repositories with more than N unmerged branches
    Unmerged {
        /// Minimum number of unmerged branches to exceed
        #[arg(long, default_value_t = 0)]
        threshold: usize,
    },

    /// Branch merge graph (source → target)
    MergeGraph,

    /// Merged pull requests, newest first
    MergedPrs,

    /// Most frequently modified files
    Files {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Users with the most authored commits
    TopContributors {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Users who authored commits in at least N repositories
    MultiRepo {
        #[arg(long, default_value_t = 3)]
        min: usize,
    },

    /// Users tagged as concurrent contributors
    Concurrent,

    /// Users who authored both merge and security commits
    MergeSecurityAuthors,
}

/// Execute the query command
pub fn execute(args: QueryArgs, global: GlobalOptions) -> Result<()> {
    let (_, graph) = populate_graph(&global)?;
    let registry = &graph.registry;
    let json = args.json;

    match args.query {
        QueryKind::Repos { most_forked } => {
            let rows = match most_forked {
                Some(n) => query::most_forked(registry, n),
                None => query::repositories(registry),
            };
            print_rows(&rows, json, render_repository)
        }
        QueryKind::Branches { repo } => {
            print_rows(&query::branches(registry, repo), json, render_branch)
        }
        QueryKind::Commits { repo, branch } => print_rows(
            &query::commits_of_branch(registry, repo, &branch),
            json,
            render_commit,
        ),
        QueryKind::Parents { sha } => {
            print_rows(&query::parents(registry, &sha), json, render_commit)
        }
        QueryKind::Author { login } => print_rows(
            &query::commits_by_author(registry, &login),
            json,
            render_commit,
        ),
        QueryKind::Tags { sha } => {
            let tags: Vec<Tag> = registry
                .tags_of(&NodeKey::commit(&sha))
                .map(|t| t.iter().copied().collect())
                .ok_or_else(|| anyhow::anyhow!("Unknown commit: {}", sha))?;
            print_rows(&tags, json, |t| t.to_string())
        }
        QueryKind::Search { keyword } => print_rows(
            &query::search_commits(registry, &keyword),
            json,
            render_commit,
        ),
        QueryKind::Merges => print_rows(&query::merge_commits(registry), json, render_commit),
        QueryKind::Security => {
            print_rows(&query::security_commits(registry), json, render_commit)
        }
        QueryKind::Initial => print_rows(&query::initial_commits(registry), json, render_commit),
        QueryKind::Unmerged { threshold } => print_rows(
            &query::repositories_with_unmerged_branches(registry, threshold),
            json,
            render_unmerged,
        ),
        QueryKind::MergeGraph => print_rows(&query::merge_graph(registry), json, |e| {
            format!("repo {}: {} → {}", e.repo_id, e.source, e.target)
        }),
        QueryKind::MergedPrs => print_rows(&query::merged_pull_requests(registry), json, |pr| {
            format!(
                "#{} {} [{}] {} → {} at {}",
                pr.pr_id,
                pr.title,
                pr.state,
                pr.head.as_deref().unwrap_or("?"),
                pr.base.as_deref().unwrap_or("?"),
                pr.merged_at.as_deref().unwrap_or("-"),
            )
        }),
        QueryKind::Files { limit } => print_rows(
            &query::most_modified_files(registry, limit),
            json,
            render_count,
        ),
        QueryKind::TopContributors { limit } => print_rows(
            &query::top_contributors(registry, limit),
            json,
            render_count,
        ),
        QueryKind::MultiRepo { min } => print_rows(
            &query::multi_repository_contributors(registry, min),
            json,
            render_count,
        ),
        QueryKind::Concurrent => print_rows(
            &query::concurrent_contributors(registry),
            json,
            render_count,
        ),
        QueryKind::MergeSecurityAuthors => print_rows(
            &query::merge_and_security_authors(registry),
            json,
            |login| login.clone(),
        ),
    }
}

fn render_repository(r: &RepositoryRow) -> String {
    format!(
        "{:>6}  {:<24} {:<12} ★{:<6} forks {:<6} branches {}",
        r.repo_id, r.name, r.language, r.stars, r.forks, r.branches
    )
}

fn render_branch(b: &BranchRow) -> String {
    let mut line = format!("{}{} ({} commits)", b.name, if b.is_default { " *" } else { "" }, b.commits);
    if let Some(ref target) = b.merged_into {
        line.push_str(&format!(" merged into {}", target));
    }
    line
}

fn render_commit(c: &CommitRow) -> String {
    let location = match (c.repo_id, c.branch.as_deref()) {
        (Some(repo), Some(branch)) => format!("{}/{}", repo, branch),
        (Some(repo), None) => repo.to_string(),
        _ => "-".to_string(),
    };
    let first_line = c
        .message
        .as_deref()
        .and_then(|m| m.lines().next())
        .unwrap_or("");
    format!(
        "{:<12} {:<20} {:<12} {}",
        c.sha,
        location,
        c.author.as_deref().unwrap_or("-"),
        first_line
    )
}

fn render_count(row: &CountRow) -> String {
    format!("{:>6}  {}", row.count, row.name)
}

fn render_unmerged(row: &UnmergedBranchesRow) -> String {
    format!("{:>6}  {} (repo {})", row.unmerged, row.name, row.repo_id)
}
