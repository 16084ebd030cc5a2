//! Common test utilities for integration tests.
//!
//! This module provides dataset builders, fixture paths and graph
//! invariant checks shared across integration test files.

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod dataset_builder;
pub mod graph_checks;

use std::path::PathBuf;

// Re-export commonly used items
pub use dataset_builder::DatasetBuilder;
pub use graph_checks::{assert_invariants, check_invariants};

/// Path to the sample dataset fixture directory.
pub fn sample_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("sample_data")
}
