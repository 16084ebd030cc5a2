//! GitOnto Core - Git activity datasets as a typed knowledge graph
//!
//! This crate provides the core functionality for graph population:
//! - Record loading for repository, user, branch, commit, file, issue and pull request batches
//! - An entity registry with natural-key identity and ordered traversals
//! - Staged graph construction with per-kind drop accounting
//! - Branch resolution for pull request references
//! - Classification rules and concurrent-contributor detection
//! - Canned queries, constraint validation and JSON snapshot export

pub mod builder;
pub mod classify;
pub mod concurrency;
pub mod export;
pub mod graph;
pub mod pipeline;
pub mod query;
pub mod records;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod validate;

// Re-exports for convenience
pub use graph::{
    Attributes, Edge, EntityKind, Node, NodeKey, Relation, RepoId, Tag, GRAPH_SCHEMA_VERSION,
};
pub use registry::EntityRegistry;

// Input re-exports
pub use records::{DataFiles, Dataset, LoadError};

// Builder re-exports
pub use builder::{BuilderConfig, GraphBuilder};
pub use report::{DropReason, IngestReport};
pub use resolver::{BranchResolver, BranchRole, MatchTier, ResolverConfig};

// Derivation re-exports
pub use classify::{ClassificationSummary, Classifier, ClassifierConfig};
pub use concurrency::{ConcurrencyConfig, ConcurrencyDetector, ConcurrencyReport, OverlapRule};

// Pipeline and output re-exports
pub use export::{write_snapshot, ExportError, GraphSnapshot};
pub use pipeline::{Pipeline, PipelineConfig, PopulatedGraph};
pub use validate::{validate, Severity, ValidationReport};
