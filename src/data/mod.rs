pub mod catalog;
pub mod fleet_spec;

pub use catalog::{ItemCatalog, ItemStats};
pub use fleet_spec::FleetSpec;
