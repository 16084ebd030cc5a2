//! End-to-end population: build, classify, detect concurrency.

use serde::Serialize;
use tracing::info;

use crate::builder::{BuilderConfig, GraphBuilder};
use crate::classify::{ClassificationSummary, Classifier, ClassifierConfig};
use crate::concurrency::{ConcurrencyConfig, ConcurrencyDetector, ConcurrencyReport};
use crate::records::Dataset;
use crate::registry::EntityRegistry;
use crate::report::IngestReport;

/// Configuration for every pass of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub builder: BuilderConfig,
    pub classifier: ClassifierConfig,
    pub concurrency: ConcurrencyConfig,
}

/// A populated registry with the reports of each pass.
#[derive(Debug, Clone)]
pub struct PopulatedGraph {
    pub registry: EntityRegistry,
    pub ingest: IngestReport,
    pub classification: ClassificationSummary,
    pub concurrency: ConcurrencyReport,
}

impl PopulatedGraph {
    /// The reports without the registry, for printing.
    pub fn summary(&self) -> PipelineSummary<'_> {
        PipelineSummary {
            ingest: &self.ingest,
            classification: &self.classification,
            concurrency: &self.concurrency,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PipelineSummary<'a> {
    pub ingest: &'a IngestReport,
    pub classification: &'a ClassificationSummary,
    pub concurrency: &'a ConcurrencyReport,
}

/// Runs the passes in their fixed order over one dataset.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Populate a fresh registry from `dataset` and derive all tags.
    pub fn run(&self, dataset: &Dataset) -> PopulatedGraph {
        info!("Populating graph from {} records", dataset.record_count());

        let builder = GraphBuilder::with_config(self.config.builder.clone());
        let (mut registry, ingest) = builder.build(dataset);

        let classification = Classifier::new(&self.config.classifier).classify(&mut registry);
        let concurrency = ConcurrencyDetector::new(self.config.concurrency).detect(&mut registry);

        info!(
            "Pipeline complete: {} nodes, {} edges",
            registry.node_count(),
            registry.edge_count()
        );

        PopulatedGraph {
            registry,
            ingest,
            classification,
            concurrency,
        }
    }
}
