pub mod export;
pub mod format;
pub mod import;
pub mod resources;
pub mod service;

pub use export::{ExportOptions, ExportStats, serialize};
pub use format::{FORMAT_VERSION, NodeHeader};
pub use import::{ImportResult, ImportWarning, deserialize};
pub use resources::ResourceStore;
pub use service::{export_to_file, import_from_file};

#[cfg(test)]
pub(crate) mod fixtures;
