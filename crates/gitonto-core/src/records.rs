//! Input records for graph population.
//!
//! A [`Dataset`] holds seven flat record batches as extracted from a code
//! hosting service: repositories, users, branches, commits, file changes,
//! issues and pull requests. Every field is optional at this layer; the
//! builder decides what a missing field means for each kind.
//!
//! Batches are loaded from JSON array files. Each element is decoded on its
//! own, so one bad element drops that record only.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::graph::EntityKind;

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while loading a dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A batch file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A batch file is not valid JSON
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A batch file's top-level value is not an array
    #[error("Expected a JSON array in {0}")]
    NotAnArray(PathBuf),

    /// A required batch file does not exist
    #[error("Required {kind} data file not found: {path}")]
    MissingBatch { kind: EntityKind, path: PathBuf },
}

// ============================================================================
// Records
// ============================================================================

/// Repository record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoRecord {
    #[serde(deserialize_with = "flexible_id")]
    pub repo_id: Option<u64>,
    #[serde(deserialize_with = "non_empty")]
    pub repo_name: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub repo_description: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub repo_language: Option<String>,
    pub repo_stars: Option<u64>,
    pub repo_forks: Option<u64>,
    #[serde(deserialize_with = "non_empty")]
    pub repo_url: Option<String>,
}

/// User record. The same login may appear once per repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    #[serde(deserialize_with = "non_empty")]
    pub user_login: Option<String>,
    #[serde(deserialize_with = "flexible_id")]
    pub repo_id: Option<u64>,
    #[serde(deserialize_with = "flexible_id")]
    pub user_id: Option<u64>,
    #[serde(deserialize_with = "non_empty")]
    pub user_url: Option<String>,
}

/// Branch record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchRecord {
    #[serde(deserialize_with = "flexible_id")]
    pub repo_id: Option<u64>,
    #[serde(deserialize_with = "non_empty")]
    pub branch_name: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub commit_sha: Option<String>,
    pub is_default: Option<bool>,
}

/// Commit record, listed under the branch it was fetched from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitRecord {
    #[serde(deserialize_with = "flexible_id")]
    pub repo_id: Option<u64>,
    #[serde(deserialize_with = "non_empty")]
    pub branch_name: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub commit_sha: Option<String>,
    pub commit_message: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub commit_date: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub commit_author_login: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub commit_committer_login: Option<String>,
    pub commit_parent_count: Option<u64>,
    pub commit_parents: Option<Vec<String>>,
    pub is_initial: Option<bool>,
}

/// File change record: one per (commit, path)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRecord {
    #[serde(deserialize_with = "flexible_id")]
    pub repo_id: Option<u64>,
    #[serde(deserialize_with = "non_empty")]
    pub commit_sha: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub file_name: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub file_status: Option<String>,
    pub file_additions: Option<u64>,
    pub file_deletions: Option<u64>,
    pub file_changes: Option<u64>,
}

/// Issue record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueRecord {
    #[serde(deserialize_with = "flexible_id")]
    pub issue_id: Option<u64>,
    #[serde(deserialize_with = "flexible_id")]
    pub repo_id: Option<u64>,
    #[serde(deserialize_with = "non_empty")]
    pub title: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub state: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub user_login: Option<String>,
}

/// Pull request record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestRecord {
    #[serde(deserialize_with = "flexible_id")]
    pub pr_id: Option<u64>,
    #[serde(deserialize_with = "flexible_id")]
    pub repo_id: Option<u64>,
    #[serde(deserialize_with = "non_empty")]
    pub title: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub state: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub user_login: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub merged_at: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub base_branch: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub head_branch: Option<String>,
}

/// Accept an id as a JSON number or a numeric string; empty string is absent.
fn flexible_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Number(u64),
        Text(String),
    }

    match Option::<IdRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IdRepr::Number(n)) => Ok(Some(n)),
        Some(IdRepr::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed.parse().map(Some).map_err(de::Error::custom)
            }
        }
    }
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

/// Offset-free layouts, read as UTC.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO-8601 timestamp. RFC 3339 input keeps its offset; a bare
/// `YYYY-MM-DDTHH:MM:SS[.fff]` is taken as UTC. Malformed input yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

// ============================================================================
// Dataset
// ============================================================================

/// File names of each batch inside a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    pub repositories: String,
    pub users: String,
    pub branches: String,
    pub commits: String,
    pub files: String,
    pub issues: String,
    pub pull_requests: String,
}

impl Default for DataFiles {
    fn default() -> Self {
        Self {
            repositories: "repos.json".to_string(),
            users: "users.json".to_string(),
            branches: "branches.json".to_string(),
            commits: "commits.json".to_string(),
            files: "files.json".to_string(),
            issues: "issues.json".to_string(),
            pull_requests: "pulls.json".to_string(),
        }
    }
}

/// The seven record batches that populate one graph.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub repositories: Vec<RepoRecord>,
    pub users: Vec<UserRecord>,
    pub branches: Vec<BranchRecord>,
    pub commits: Vec<CommitRecord>,
    pub files: Vec<FileRecord>,
    pub issues: Vec<IssueRecord>,
    pub pull_requests: Vec<PullRequestRecord>,
    /// Elements that could not be decoded, per kind
    pub malformed: BTreeMap<EntityKind, usize>,
}

impl Dataset {
    /// Load all batches from `dir`.
    ///
    /// Repositories, branches and commits are required. Users, file changes,
    /// issues and pull requests default to empty when their file is absent.
    pub fn load_dir(dir: &Path, files: &DataFiles) -> Result<Self, LoadError> {
        let mut dataset = Dataset::default();

        dataset.repositories =
            dataset.load_batch(dir, &files.repositories, EntityKind::Repository, true)?;
        dataset.users = dataset.load_batch(dir, &files.users, EntityKind::User, false)?;
        dataset.branches = dataset.load_batch(dir, &files.branches, EntityKind::Branch, true)?;
        dataset.commits = dataset.load_batch(dir, &files.commits, EntityKind::Commit, true)?;
        dataset.files = dataset.load_batch(dir, &files.files, EntityKind::File, false)?;
        dataset.issues = dataset.load_batch(dir, &files.issues, EntityKind::Issue, false)?;
        dataset.pull_requests =
            dataset.load_batch(dir, &files.pull_requests, EntityKind::PullRequest, false)?;

        info!(
            "Loaded dataset from {}: {} repos, {} users, {} branches, {} commits, {} files, {} issues, {} pulls",
            dir.display(),
            dataset.repositories.len(),
            dataset.users.len(),
            dataset.branches.len(),
            dataset.commits.len(),
            dataset.files.len(),
            dataset.issues.len(),
            dataset.pull_requests.len()
        );

        Ok(dataset)
    }

    fn load_batch<T: DeserializeOwned>(
        &mut self,
        dir: &Path,
        file_name: &str,
        kind: EntityKind,
        required: bool,
    ) -> Result<Vec<T>, LoadError> {
        let path = dir.join(file_name);
        if !path.exists() {
            if required {
                return Err(LoadError::MissingBatch { kind, path });
            }
            debug!("No {} batch at {}, using empty batch", kind, path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let (records, malformed) = decode_batch(&content).map_err(|e| match e {
            BatchError::Json(source) => LoadError::Json {
                path: path.clone(),
                source,
            },
            BatchError::NotAnArray => LoadError::NotAnArray(path.clone()),
        })?;

        if malformed > 0 {
            debug!("Skipped {} malformed {} records in {}", malformed, kind, path.display());
            *self.malformed.entry(kind).or_insert(0) += malformed;
        }
        Ok(records)
    }

    /// Total number of records across all batches
    pub fn record_count(&self) -> usize {
        self.repositories.len()
            + self.users.len()
            + self.branches.len()
            + self.commits.len()
            + self.files.len()
            + self.issues.len()
            + self.pull_requests.len()
    }
}

enum BatchError {
    Json(serde_json::Error),
    NotAnArray,
}

/// Decode a JSON array element by element, counting elements that fail.
fn decode_batch<T: DeserializeOwned>(content: &str) -> Result<(Vec<T>, usize), BatchError> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(BatchError::Json)?;
    let serde_json::Value::Array(items) = value else {
        return Err(BatchError::NotAnArray);
    };

    let mut records = Vec::with_capacity(items.len());
    let mut malformed = 0;
    for item in items {
        match serde_json::from_value(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!("Malformed record: {}", e);
                malformed += 1;
            }
        }
    }
    Ok((records, malformed))
}
