use directories::ProjectDirs;
use std::path::PathBuf;

/// Name of the resources directory written next to an export document.
pub const RESOURCES_DIR_NAME: &str = "Resources";

/// Workspace used when the caller does not name one.
pub const DEFAULT_WORKSPACE: &str = "live";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl StorageConfig {
    pub fn default_paths() -> Option<StorageConfig> {
        let proj_dirs = ProjectDirs::from("", "", "treeport")?;
        let data_dir = proj_dirs.data_dir();

        Some(StorageConfig {
            db_path: data_dir.join("content.db"),
        })
    }

    /// Use an explicit database path, falling back to the platform data dir.
    pub fn resolve(db_path: Option<PathBuf>) -> Option<StorageConfig> {
        match db_path {
            Some(db_path) => Some(StorageConfig { db_path }),
            None => StorageConfig::default_paths(),
        }
    }

    pub fn ensure_dirs_exist(&self) -> std::io::Result<()> {
        if let Some(parent) = self.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// The resources directory that belongs to a document file.
pub fn resources_dir_for(document: &std::path::Path) -> PathBuf {
    document
        .parent()
        .map(|dir| dir.join(RESOURCES_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(RESOURCES_DIR_NAME))
}
