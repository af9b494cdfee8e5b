// src/lib.rs
//! Readers for published company data.
//!
//! [`MarketscreenerReader`] resolves a company through the site search and
//! scrapes its profile page (board, managers, shareholders, sector, sales
//! breakdowns) and its paginated news listings. [`AqrReader`] downloads the
//! AQR research data-set workbooks and returns their sheets as tables.

pub mod aqr;
pub mod extractors;
pub mod marketscreener;
pub mod storage;
pub mod utils;

pub use aqr::{AqrReader, Table};
pub use marketscreener::{MarketscreenerReader, NewsCategory, ReaderConfig};
pub use utils::{AppError, ReaderError};
