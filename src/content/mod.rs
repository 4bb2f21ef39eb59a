pub mod filter;
pub mod path;
pub mod value;

pub use filter::NodeTypeFilter;
pub use path::{NodePath, validate_name};
pub use value::{Property, PropertyType, PropertyValue, Resource};
