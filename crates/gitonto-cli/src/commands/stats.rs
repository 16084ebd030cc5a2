//! Stats command - Node and edge counts

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use gitonto_core::registry::EntityRegistry;
use gitonto_core::EntityKind;
use serde::Serialize;

use super::populate_graph;
use crate::GlobalOptions;

/// Arguments for the stats command
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Node counts per kind and edge counts per relation
#[derive(Debug, Serialize)]
pub struct GraphStats {
    pub schema_version: &'static str,
    pub nodes: BTreeMap<String, usize>,
    pub edges: BTreeMap<String, usize>,
    pub total_nodes: usize,
    pub total_edges: usize,
}

impl GraphStats {
    pub fn collect(registry: &EntityRegistry) -> Self {
        let nodes = EntityKind::ALL
            .iter()
            .map(|kind| (kind.as_str().to_string(), registry.count_of(*kind)))
            .collect();

        let mut edges: BTreeMap<String, usize> = BTreeMap::new();
        for (_, _, relation) in registry.edges() {
            *edges.entry(relation.as_str().to_string()).or_default() += 1;
        }

        Self {
            schema_version: registry.schema_version(),
            nodes,
            edges,
            total_nodes: registry.node_count(),
            total_edges: registry.edge_count(),
        }
    }
}

/// Execute the stats command
pub fn execute(args: StatsArgs, global: GlobalOptions) -> Result<()> {
    let (_, graph) = populate_graph(&global)?;
    let stats = GraphStats::collect(&graph.registry);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Graph Statistics (schema {})", stats.schema_version);
    println!("================\n");
    println!("Nodes: {}", stats.total_nodes);
    for (kind, count) in &stats.nodes {
        println!("  {:<16} {}", kind, count);
    }
    println!("\nEdges: {}", stats.total_edges);
    for (relation, count) in &stats.edges {
        println!("  {:<16} {}", relation, count);
    }

    Ok(())
}
