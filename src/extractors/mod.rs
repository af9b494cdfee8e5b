// src/extractors/mod.rs
pub mod section;
pub mod tables;

// Re-export key extraction functions for convenience
pub use section::{find_after_element, find_after_heading, find_section, header_years};
pub use tables::CategoryNaming;
