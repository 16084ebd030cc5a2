//! Fluent construction of in-memory datasets.

use gitonto_core::records::{
    BranchRecord, CommitRecord, Dataset, FileRecord, IssueRecord, PullRequestRecord, RepoRecord,
    UserRecord,
};

/// Builds a [`Dataset`] record by record, in the order calls are made.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    dataset: Dataset,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repo(mut self, id: u64, name: &str) -> Self {
        self.dataset.repositories.push(RepoRecord {
            repo_id: Some(id),
            repo_name: Some(name.to_string()),
            ..Default::default()
        });
        self
    }

    pub fn user(mut self, login: &str) -> Self {
        self.dataset.users.push(UserRecord {
            user_login: Some(login.to_string()),
            ..Default::default()
        });
        self
    }

    pub fn branch(mut self, repo: u64, name: &str) -> Self {
        self.dataset.branches.push(BranchRecord {
            repo_id: Some(repo),
            branch_name: Some(name.to_string()),
            ..Default::default()
        });
        self
    }

    /// Add a commit authored by `author` at `date` (RFC 3339).
    pub fn commit(
        mut self,
        repo: u64,
        branch: &str,
        sha: &str,
        author: &str,
        date: &str,
        parents: &[&str],
    ) -> Self {
        self.dataset.commits.push(CommitRecord {
            repo_id: Some(repo),
            branch_name: Some(branch.to_string()),
            commit_sha: Some(sha.to_string()),
            commit_message: Some(format!("commit {}", sha)),
            commit_date: Some(date.to_string()),
            commit_author_login: Some(author.to_string()),
            commit_committer_login: Some(author.to_string()),
            commit_parent_count: Some(parents.len() as u64),
            commit_parents: Some(parents.iter().map(|p| p.to_string()).collect()),
            is_initial: Some(parents.is_empty()),
        });
        self
    }

    /// Replace the message of the most recently added commit.
    pub fn message(mut self, message: &str) -> Self {
        if let Some(last) = self.dataset.commits.last_mut() {
            last.commit_message = Some(message.to_string());
        }
        self
    }

    pub fn file(mut self, sha: &str, path: &str) -> Self {
        self.dataset.files.push(FileRecord {
            commit_sha: Some(sha.to_string()),
            file_name: Some(path.to_string()),
            ..Default::default()
        });
        self
    }

    pub fn issue(mut self, id: u64, repo: u64, opener: &str) -> Self {
        self.dataset.issues.push(IssueRecord {
            issue_id: Some(id),
            repo_id: Some(repo),
            user_login: Some(opener.to_string()),
            ..Default::default()
        });
        self
    }

    /// Add a pull request; `merged_at` of `None` leaves it unmerged.
    pub fn pull(
        mut self,
        id: u64,
        repo: u64,
        base: &str,
        head: &str,
        merged_at: Option<&str>,
    ) -> Self {
        self.dataset.pull_requests.push(PullRequestRecord {
            pr_id: Some(id),
            repo_id: Some(repo),
            title: Some(format!("pr {}", id)),
            state: Some(if merged_at.is_some() { "closed" } else { "open" }.to_string()),
            user_login: None,
            merged_at: merged_at.map(str::to_string),
            base_branch: Some(base.to_string()),
            head_branch: Some(head.to_string()),
        });
        self
    }

    pub fn build(self) -> Dataset {
        self.dataset
    }
}
