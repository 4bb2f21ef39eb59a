pub mod manager;

pub use manager::{ContentContext, ContentManager};
