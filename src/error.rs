use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("No site with node name \"{node_name}\" found")]
    SiteNotFound { node_name: String },

    #[error("Workspace not found: {name}")]
    WorkspaceNotFound { name: String },

    #[error("No node with identifier \"{identifier}\" found")]
    NodeNotFound { identifier: String },

    #[error("No node at path {path} in workspace {workspace}")]
    PathNotFound { workspace: String, path: String },

    #[error("File \"{}\" not found", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Node already exists at {path}")]
    NodeAlreadyExists { path: String },

    #[error("Invalid node path: {path}")]
    InvalidNodePath { path: String },

    #[error("Invalid node name: {name}")]
    InvalidNodeName { name: String },

    #[error("Invalid node type filter: {0}")]
    InvalidFilter(String),

    #[error("Unsupported export format version: {version}")]
    UnsupportedFormat { version: String },

    #[error("Resource missing: {}", path.display())]
    ResourceMissing { path: PathBuf },

    #[error("SHA-256 mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error(
        "Parse error at byte {position} in {element}: {message} ({nodes_applied} nodes already imported)"
    )]
    Parse {
        position: u64,
        element: String,
        message: String,
        nodes_applied: usize,
    },
}

impl TreeportError {
    /// True for the "does not exist" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TreeportError::SiteNotFound { .. }
                | TreeportError::WorkspaceNotFound { .. }
                | TreeportError::NodeNotFound { .. }
                | TreeportError::PathNotFound { .. }
                | TreeportError::FileNotFound { .. }
        )
    }

    /// Resource problems that skip one property instead of failing an import.
    pub fn is_recoverable_resource_error(&self) -> bool {
        matches!(
            self,
            TreeportError::ResourceMissing { .. } | TreeportError::ChecksumMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TreeportError>;
