use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_WORKSPACE;
use crate::content::NodeTypeFilter;
use crate::exchange::ExportOptions;

#[derive(Parser, Debug)]
#[command(name = "treeport")]
#[command(about = "Export and import content trees as XML with external resources")]
#[command(version)]
pub struct Cli {
    /// SQLite database (defaults to the platform data directory)
    #[arg(long, global = true, env = "TREEPORT_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a node and its descendants to an XML file
    Export {
        /// Node name of the site
        #[arg(long)]
        site: String,

        /// Identifier of the node to export
        #[arg(long)]
        source: String,

        /// Target file; resources go to a Resources directory next to it
        #[arg(long)]
        file: PathBuf,

        /// Write the document without indentation
        #[arg(long)]
        no_tidy: bool,

        /// Export only the descendants of the source node
        #[arg(long)]
        children_only: bool,

        /// Node types to export, e.g. "Neos.Neos:Page,!Neos.Neos:Shortcut"
        #[arg(long, value_parser = parse_filter)]
        filter: Option<NodeTypeFilter>,

        #[arg(long, default_value = DEFAULT_WORKSPACE)]
        workspace: String,
    },

    /// Import nodes from an XML file below an existing node
    Import {
        #[arg(long)]
        site: String,

        /// Identifier of the node to import into
        #[arg(long)]
        target: String,

        #[arg(long)]
        file: PathBuf,

        /// Node types to import
        #[arg(long, value_parser = parse_filter)]
        filter: Option<NodeTypeFilter>,

        #[arg(long, default_value = DEFAULT_WORKSPACE)]
        workspace: String,
    },
}

fn parse_filter(s: &str) -> Result<NodeTypeFilter, String> {
    NodeTypeFilter::parse(s).map_err(|e| e.to_string())
}

/// Serializer options for the export flags.
pub fn export_options(
    no_tidy: bool,
    children_only: bool,
    filter: Option<NodeTypeFilter>,
) -> ExportOptions {
    ExportOptions {
        tidy: !no_tidy,
        include_root: !children_only,
        node_type_filter: filter,
    }
}
