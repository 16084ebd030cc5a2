//! Populate command - Build the graph and write a JSON snapshot

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use gitonto_core::{write_snapshot, PopulatedGraph};

use super::{populate_graph, print_info, resolve_workspace};
use crate::GlobalOptions;

/// Arguments for the populate command
#[derive(Args, Debug)]
pub struct PopulateArgs {
    /// Snapshot output file (defaults to output.snapshot_path)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Pretty-print the snapshot JSON
    #[arg(long)]
    pretty: bool,

    /// Print the population summary as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the populate command
pub fn execute(args: PopulateArgs, global: GlobalOptions) -> Result<()> {
    let (config, graph) = populate_graph(&global)?;

    let output = match args.output {
        Some(path) => path,
        None => config.snapshot_path(&resolve_workspace()?),
    };
    let pretty = args.pretty || config.output.pretty;

    write_snapshot(&graph.registry, &output, pretty)
        .with_context(|| format!("Failed to write snapshot to {}", output.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&graph.summary())?);
    } else {
        print_summary(&graph);
    }
    print_info(&format!("Graph written to {}", output.display()), global.quiet);

    Ok(())
}

fn print_summary(graph: &PopulatedGraph) {
    let ingest = &graph.ingest;

    println!("Ingest");
    println!("======\n");
    for (kind, report) in &ingest.kinds {
        let mut line = format!("{:<13} created {:>6}", kind.as_str(), report.created);
        if report.merged > 0 {
            line.push_str(&format!("  merged {}", report.merged));
        }
        for (reason, count) in &report.dropped {
            line.push_str(&format!("  {} {}", reason, count));
        }
        println!("{}", line);
    }
    println!();
    println!("Placeholder commits:   {}", ingest.placeholder_commits);
    println!("Unresolved authors:    {}", ingest.unresolved_authors);
    println!("Unresolved committers: {}", ingest.unresolved_committers);
    println!("Unresolved openers:    {}", ingest.unresolved_openers);
    println!(
        "PR branches resolved:  base {}/{}  head {}/{}",
        ingest.base_resolution.resolved(),
        ingest.base_resolution.resolved() + ingest.base_resolution.unresolved,
        ingest.head_resolution.resolved(),
        ingest.head_resolution.resolved() + ingest.head_resolution.unresolved,
    );
    for (tier, count) in &ingest.head_resolution.by_tier {
        if tier.is_low_confidence() {
            println!("  low-confidence head matches ({}): {}", tier, count);
        }
    }

    let c = &graph.classification;
    println!("\nClassification");
    println!("==============\n");
    println!("Merge commits:         {}", c.merge_commits);
    println!("Initial commits:       {}", c.initial_commits);
    println!("Security commits:      {}", c.security_commits);
    println!("Unmerged branches:     {}", c.unmerged_branches);
    println!("Merged pull requests:  {}", c.merged_pull_requests);

    let cc = &graph.concurrency;
    println!(
        "Concurrent contributors: {} of {} users",
        cc.concurrent.len(),
        cc.evaluated_users
    );
}
