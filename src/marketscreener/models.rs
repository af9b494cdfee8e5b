// src/marketscreener/models.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A company resolved through the site search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReference {
    pub name: String,
    pub url: String, // Canonical profile URL
}

impl EntityReference {
    /// Last path segment of the profile URL, e.g. `APPLE-INC-4849`.
    pub fn slug(&self) -> String {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(self.name.as_str())
            .to_string()
    }
}

/// One line of a board or management roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRecord {
    pub name: String,
    pub title: String,
    pub age: Option<u32>,
    pub joined: Option<i32>, // Year
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareholderRecord {
    pub company: String,
    pub shares: u64,
    pub percentage: f64, // Fraction in [0, 1]
}

/// Year -> category -> amount in currency units. `None` where the page shows "-".
pub type BreakdownTable = BTreeMap<i32, BTreeMap<String, Option<f64>>>;

/// Identification and last price from the quote header of a company page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteHeader {
    pub name: String,
    pub ticker: String,
    pub isin: String,
    pub price: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsSource {
    pub name: Option<String>,
    pub abbreviation: Option<String>,
}

/// Publication date of a news item, as ISO date or unix timestamp depending on the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NewsDate {
    Iso(String),
    Timestamp(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub date: NewsDate,
    pub source: NewsSource,
    pub url: String,
}
