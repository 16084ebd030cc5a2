//! Validate command - Check the graph against ontology constraints
//!
//! Exits non-zero when any violation is found; warnings alone pass.

use anyhow::Result;
use clap::Args;
use gitonto_core::validate::{validate, Severity};

use super::populate_graph;
use crate::GlobalOptions;

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Output the report as JSON
    #[arg(long)]
    json: bool,

    /// Hide warnings
    #[arg(long)]
    violations_only: bool,
}

/// Execute the validate command
pub fn execute(args: ValidateArgs, global: GlobalOptions) -> Result<()> {
    let (_, graph) = populate_graph(&global)?;
    let report = validate(&graph.registry);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for issue in &report.issues {
            let label = match issue.severity {
                Severity::Violation => "violation",
                Severity::Warning if args.violations_only => continue,
                Severity::Warning => "warning",
            };
            println!(
                "{:<9} {:<24} {}: {}",
                label, issue.constraint, issue.node, issue.message
            );
        }
        println!(
            "\n{} violation(s), {} warning(s)",
            report.violations().count(),
            report.warnings().count()
        );
    }

    if !report.conforms {
        anyhow::bail!(
            "graph does not conform: {} violation(s)",
            report.violations().count()
        );
    }

    if !args.json {
        println!("Graph conforms.");
    }
    Ok(())
}
