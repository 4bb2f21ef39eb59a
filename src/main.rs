use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use treeport::cli::commands::export_options;
use treeport::cli::{Cli, Commands};
use treeport::config::StorageConfig;
use treeport::storage::ContentManager;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("treeport=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(cli: Cli) -> treeport::Result<()> {
    let config = StorageConfig::resolve(cli.db).ok_or_else(|| {
        treeport::TreeportError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine data directory",
        ))
    })?;
    let manager = ContentManager::open(config)?;

    match cli.command {
        Commands::Export {
            site,
            source,
            file,
            no_tidy,
            children_only,
            filter,
            workspace,
        } => {
            let options = export_options(no_tidy, children_only, filter);
            let stats = manager.export(&site, &workspace, &source, &file, &options)?;

            println!("Export finished");
            println!("  Nodes: {}", stats.nodes);
            if stats.pruned > 0 {
                println!("  Filtered: {}", stats.pruned);
            }
            println!(
                "  Resources: {} ({} files written)",
                stats.resources, stats.resource_files
            );

            Ok(())
        }

        Commands::Import {
            site,
            target,
            file,
            filter,
            workspace,
        } => {
            let result = manager.import(&site, &workspace, &target, &file, filter.as_ref())?;

            println!("Import finished");
            println!("  Created: {}", result.nodes_created);
            println!("  Updated: {}", result.nodes_updated);
            if result.nodes_skipped > 0 {
                println!("  Filtered: {}", result.nodes_skipped);
            }
            if result.identifiers_reassigned > 0 {
                println!("  New identifiers: {}", result.identifiers_reassigned);
            }
            println!("  Resources: {}", result.resources_attached);
            for warning in &result.warnings {
                println!("  Warning: {} {}: {}", warning.path, warning.property, warning.message);
            }

            Ok(())
        }
    }
}
