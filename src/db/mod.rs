pub mod repository;
pub mod schema;

pub use repository::{NodeData, NodeRow, Repository, SaveOutcome, SiteRow};
pub use schema::run_migrations;
