// src/aqr/mod.rs
pub mod reader;
pub mod table;
pub mod workbook;

#[cfg(test)]
pub(crate) mod fixtures;

pub use reader::{AqrReader, Frequency};
pub use table::{IndexKey, Table, TableRow};
