pub mod cli;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod exchange;
pub mod storage;

pub use error::{Result, TreeportError};
