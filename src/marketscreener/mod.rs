// src/marketscreener/mod.rs
pub mod client;
pub mod models;
pub mod news;
pub mod reader;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export key reader types for convenience
pub use client::{FileSource, HttpSource, PageSource, ReaderConfig};
pub use models::{
    BreakdownTable, EntityReference, NewsDate, NewsItem, NewsSource, QuoteHeader, RosterRecord, ShareholderRecord,
};
pub use news::{NewsCategory, NewsFeed};
pub use reader::{resolve, MarketscreenerReader};
