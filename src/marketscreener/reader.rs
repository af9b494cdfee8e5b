// src/marketscreener/reader.rs
use crate::extractors::section::{cell_text, find_section};
use crate::extractors::tables::{
    parse_breakdown, parse_industries, parse_quote_header, parse_roster, parse_shareholders, CategoryNaming,
};
use crate::marketscreener::client::{HttpSource, PageSource, ReaderConfig};
use crate::marketscreener::models::{BreakdownTable, EntityReference, QuoteHeader, RosterRecord, ShareholderRecord};
use crate::marketscreener::news::{NewsCategory, NewsFeed};
use crate::utils::error::ReaderError;
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::BTreeMap;

// --- Section headings on the company page ---
pub const BOARD_HEADING: &str = "Members of the board";
pub const MANAGERS_HEADING: &str = "Managers";
pub const SHAREHOLDERS_HEADING: &str = "Shareholders";
pub const REGIONS_HEADING: &str = "Sales per region";
pub const SEGMENTS_HEADING: &str = "Sales per Business";
pub const SECTOR_HEADING: &str = "Sector";

static SEARCH_RESULT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("table.table.table--small.table--hover.table--centered.table--bordered tbody tr")
        .expect("Failed to compile SEARCH_RESULT_SELECTOR")
});

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a").expect("Failed to compile LINK_SELECTOR")
});

static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("td").expect("Failed to compile CELL_SELECTOR")
});

/// Looks `identifier` up through the site search and returns the first hit.
pub fn resolve<S: PageSource>(source: &S, config: &ReaderConfig, identifier: &str) -> Result<EntityReference, ReaderError> {
    let html = source.get(&config.absolute_url("/search/"), &[("q", identifier)])?;
    let document = Html::parse_document(&html);

    let link = document
        .select(&SEARCH_RESULT_SELECTOR)
        .next()
        .and_then(|row| row.select(&CELL_SELECTOR).next())
        .and_then(|cell| cell.select(&LINK_SELECTOR).next())
        .ok_or_else(|| ReaderError::NotFound(identifier.to_string()))?;
    let href = link
        .value()
        .attr("href")
        .ok_or_else(|| ReaderError::NotFound(identifier.to_string()))?;

    let entity = EntityReference {
        name: cell_text(link),
        url: config.absolute_url(href),
    };
    tracing::info!("Resolved '{}' to {} ({})", identifier, entity.name, entity.url);
    Ok(entity)
}

/// Reader for the company pages of one entity.
///
/// The entity is resolved on construction. The profile and financials pages are
/// fetched at most once each, on first use, and kept for the reader's lifetime.
pub struct MarketscreenerReader<S: PageSource = HttpSource> {
    source: S,
    config: ReaderConfig,
    entity: EntityReference,
    company_page: OnceCell<Html>,
    financial_page: OnceCell<Html>,
    quote_header: OnceCell<QuoteHeader>,
    industry: OnceCell<String>,
}

impl MarketscreenerReader<HttpSource> {
    pub fn new(identifier: &str) -> Result<Self, ReaderError> {
        Self::with_config(identifier, ReaderConfig::from_env())
    }

    pub fn with_config(identifier: &str, config: ReaderConfig) -> Result<Self, ReaderError> {
        let source = HttpSource::new(&config)?;
        Self::with_source(source, config, identifier)
    }
}

impl<S: PageSource> MarketscreenerReader<S> {
    pub fn with_source(source: S, config: ReaderConfig, identifier: &str) -> Result<Self, ReaderError> {
        let entity = resolve(&source, &config, identifier)?;
        Ok(Self {
            source,
            config,
            entity,
            company_page: OnceCell::new(),
            financial_page: OnceCell::new(),
            quote_header: OnceCell::new(),
            industry: OnceCell::new(),
        })
    }

    pub fn entity(&self) -> &EntityReference {
        &self.entity
    }

    fn entity_url(&self, path: &str) -> String {
        format!("{}/{}", self.entity.url.trim_end_matches('/'), path)
    }

    fn fetch_page(&self, path: &str) -> Result<Html, ReaderError> {
        let html = self.source.get(&self.entity_url(path), &[])?;
        Ok(Html::parse_document(&html))
    }

    fn company_page(&self) -> Result<&Html, ReaderError> {
        self.company_page.get_or_try_init(|| self.fetch_page("company/"))
    }

    fn financial_page(&self) -> Result<&Html, ReaderError> {
        self.financial_page.get_or_try_init(|| self.fetch_page("financials/"))
    }

    pub fn board_members(&self) -> Result<Vec<RosterRecord>, ReaderError> {
        let rows = find_section(self.company_page()?, BOARD_HEADING)?;
        Ok(parse_roster(&rows)?)
    }

    pub fn managers(&self) -> Result<Vec<RosterRecord>, ReaderError> {
        let rows = find_section(self.company_page()?, MANAGERS_HEADING)?;
        Ok(parse_roster(&rows)?)
    }

    pub fn shareholders(&self) -> Result<Vec<ShareholderRecord>, ReaderError> {
        let rows = find_section(self.company_page()?, SHAREHOLDERS_HEADING)?;
        Ok(parse_shareholders(&rows)?)
    }

    /// Sales per region. Region names are title-cased.
    pub fn country_information(&self) -> Result<BreakdownTable, ReaderError> {
        let rows = find_section(self.company_page()?, REGIONS_HEADING)?;
        Ok(parse_breakdown(&rows, CategoryNaming::TitleCase)?)
    }

    /// Sales per business segment. Segment names are kept as printed.
    pub fn segment_information(&self) -> Result<BreakdownTable, ReaderError> {
        let rows = find_section(self.company_page()?, SEGMENTS_HEADING)?;
        Ok(parse_breakdown(&rows, CategoryNaming::Verbatim)?)
    }

    /// Sector classification, broadest first. Remembers the last entry as the industry.
    pub fn industry_information(&self) -> Result<Vec<String>, ReaderError> {
        let rows = find_section(self.company_page()?, SECTOR_HEADING)?;
        let chain = parse_industries(&rows)?;
        if let Some(industry) = chain.last() {
            self.industry.get_or_init(|| industry.clone());
        }
        Ok(chain)
    }

    pub fn industry(&self) -> Result<&str, ReaderError> {
        if self.industry.get().is_none() {
            self.industry_information()?;
        }
        self.industry
            .get()
            .map(String::as_str)
            .ok_or_else(|| ReaderError::DataUnavailable(format!("no industry listed for '{}'", self.entity.name)))
    }

    /// Name, codes and last price. Parsed from whichever page is already loaded,
    /// the financials page otherwise.
    pub fn quote_header(&self) -> Result<&QuoteHeader, ReaderError> {
        self.quote_header.get_or_try_init(|| {
            let document = match (self.financial_page.get(), self.company_page.get()) {
                (Some(financials), _) => financials,
                (None, Some(company)) => company,
                (None, None) => self.financial_page()?,
            };
            Ok(parse_quote_header(document)?)
        })
    }

    /// Display name as shown in the page title.
    pub fn name(&self) -> Result<&str, ReaderError> {
        Ok(self.quote_header()?.name.as_str())
    }

    /// News listing for `category`, newest first, down to `start` (unix seconds).
    ///
    /// The category is validated before any request is made.
    pub fn news(&self, category: &str, start: i64, as_timestamp: bool) -> Result<NewsFeed<'_, S>, ReaderError> {
        let category: NewsCategory = category.parse()?;
        let heading = match category {
            NewsCategory::Sector => category.heading(self.industry()?),
            NewsCategory::OfficialPublications => category.heading(""),
            _ => category.heading(self.name()?),
        };
        tracing::info!("Reading {} news for {} under '{}'", category.as_str(), self.entity.name, heading);

        Ok(NewsFeed::new(
            &self.source,
            &self.config,
            self.entity_url(category.path()),
            heading,
            start,
            as_timestamp,
            chrono::Local::now().date_naive(),
        ))
    }

    /// Every company-page table keyed by name. Sections the entity does not
    /// have are left out; any other failure aborts.
    pub fn tables(&self) -> Result<BTreeMap<String, serde_json::Value>, ReaderError> {
        let mut tables = BTreeMap::new();
        insert_table(&mut tables, "board_members", self.board_members())?;
        insert_table(&mut tables, "managers", self.managers())?;
        insert_table(&mut tables, "shareholders", self.shareholders())?;
        insert_table(&mut tables, "industries", self.industry_information())?;
        insert_table(&mut tables, "regions", self.country_information())?;
        insert_table(&mut tables, "segments", self.segment_information())?;
        // Last, so the already loaded company page serves the header.
        insert_table(&mut tables, "quote", self.quote_header())?;
        Ok(tables)
    }
}

fn insert_table<T: Serialize>(
    tables: &mut BTreeMap<String, serde_json::Value>,
    name: &str,
    result: Result<T, ReaderError>,
) -> Result<(), ReaderError> {
    match result {
        Ok(table) => {
            let value = serde_json::to_value(table).map_err(|e| ReaderError::Parse(e.to_string()))?;
            tables.insert(name.to_string(), value);
            Ok(())
        }
        Err(err) if err.is_data_unavailable() => {
            tracing::warn!("Skipping '{}': {}", name, err);
            Ok(())
        }
        Err(err) => Err(err),
    }
}
