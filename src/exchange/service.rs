use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::config::resources_dir_for;
use crate::content::NodeTypeFilter;
use crate::db::{NodeRow, Repository};
use crate::error::{Result, TreeportError};

use super::export::{ExportOptions, ExportStats, serialize};
use super::import::{ImportResult, deserialize};
use super::resources::ResourceStore;

/// Export the subtree at `root` into `filename`, with resources written to
/// the sibling `Resources` directory.
///
/// The document is written to a temporary file next to `filename` and only
/// moved into place once the export succeeded.
pub fn export_to_file(
    repo: &Repository,
    root: &NodeRow,
    filename: &Path,
    options: &ExportOptions,
) -> Result<ExportStats> {
    if repo.get_node_by_path(&root.workspace, &root.path)?.is_none() {
        return Err(TreeportError::PathNotFound {
            workspace: root.workspace.clone(),
            path: root.path.to_string(),
        });
    }

    let resources_dir = resources_dir_for(filename);
    fs::create_dir_all(&resources_dir)?;
    let mut resources = ResourceStore::new(resources_dir);

    let parent = match filename.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    info!(
        path = %root.path,
        workspace = %root.workspace,
        file = %filename.display(),
        "Starting export"
    );

    let temp = NamedTempFile::new_in(parent)?;
    let stats = {
        let mut out = BufWriter::new(temp.as_file());
        let stats = serialize(
            repo,
            &root.path,
            &root.workspace,
            &mut out,
            &mut resources,
            options,
        )?;
        out.flush()?;
        stats
    };
    temp.persist(filename).map_err(|e| e.error)?;

    info!(
        nodes = stats.nodes,
        pruned = stats.pruned,
        resource_files = stats.resource_files,
        "Export finished"
    );
    Ok(stats)
}

/// Import the document at `filename` below `target`, reading resources from
/// the sibling `Resources` directory.
pub fn import_from_file(
    repo: &Repository,
    target: &NodeRow,
    filename: &Path,
    filter: Option<&NodeTypeFilter>,
) -> Result<ImportResult> {
    if !filename.is_file() {
        return Err(TreeportError::FileNotFound {
            path: filename.to_path_buf(),
        });
    }

    let resources = ResourceStore::new(resources_dir_for(filename));
    let reader = BufReader::new(File::open(filename)?);

    info!(
        path = %target.path,
        workspace = %target.workspace,
        file = %filename.display(),
        "Starting import"
    );

    let result = deserialize(
        repo,
        reader,
        &target.workspace,
        &target.path,
        &resources,
        filter,
    )?;

    info!(
        created = result.nodes_created,
        updated = result.nodes_updated,
        skipped = result.nodes_skipped,
        warnings = result.warnings.len(),
        "Import finished"
    );
    Ok(result)
}
