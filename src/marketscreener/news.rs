// src/marketscreener/news.rs
use crate::extractors::section::{cell_text, cells, find_section};
use crate::marketscreener::client::{PageSource, ReaderConfig};
use crate::marketscreener::models::{NewsDate, NewsItem, NewsSource};
use crate::utils::error::ReaderError;
use chrono::{Datelike, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::VecDeque;
use std::str::FromStr;

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a").expect("Failed to compile LINK_SELECTOR")
});

static BOLD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("b").expect("Failed to compile BOLD_SELECTOR")
});

static DIV_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div").expect("Failed to compile DIV_SELECTOR")
});

// Present only while there are older pages.
static NEXT_PAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("span.nPageTable a.nPageEndTab").expect("Failed to compile NEXT_PAGE_SELECTOR")
});

/// News listings available on a company page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsCategory {
    MostRelevant,
    All,
    Analysts,
    OtherLanguages,
    PressReleases,
    OfficialPublications,
    Sector,
}

impl NewsCategory {
    pub const ALL: [NewsCategory; 7] = [
        NewsCategory::MostRelevant,
        NewsCategory::All,
        NewsCategory::Analysts,
        NewsCategory::OtherLanguages,
        NewsCategory::PressReleases,
        NewsCategory::OfficialPublications,
        NewsCategory::Sector,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::MostRelevant => "most_relevant",
            NewsCategory::All => "all",
            NewsCategory::Analysts => "analysts",
            NewsCategory::OtherLanguages => "other_languages",
            NewsCategory::PressReleases => "press_releases",
            NewsCategory::OfficialPublications => "official_publications",
            NewsCategory::Sector => "sector",
        }
    }

    /// Path segment of the listing below the company URL.
    pub fn path(&self) -> &'static str {
        match self {
            NewsCategory::MostRelevant => "news-quality",
            NewsCategory::All => "news-history",
            NewsCategory::Analysts => "news-broker-research",
            NewsCategory::OtherLanguages => "news-other-languages",
            NewsCategory::PressReleases => "news-communiques",
            NewsCategory::OfficialPublications => "news-publications",
            NewsCategory::Sector => "news-sector",
        }
    }

    fn heading_prefix(&self) -> &'static str {
        match self {
            NewsCategory::MostRelevant => "Most relevant news about",
            NewsCategory::All => "All news about",
            NewsCategory::Analysts => "Analyst Recommendations on",
            NewsCategory::OtherLanguages => "News in other languages on",
            NewsCategory::PressReleases => "Communiqués de presse de la société",
            NewsCategory::OfficialPublications => "Official Publications",
            NewsCategory::Sector => "Sector news",
        }
    }

    /// Heading above the listing table. `subject` is the company display name,
    /// or the industry for sector news; official publications use neither.
    pub fn heading(&self, subject: &str) -> String {
        match self {
            NewsCategory::OfficialPublications => self.heading_prefix().to_string(),
            _ => format!("{} {}", self.heading_prefix(), subject),
        }
    }
}

impl FromStr for NewsCategory {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NewsCategory::ALL
            .iter()
            .find(|category| category.as_str() == s)
            .copied()
            .ok_or_else(|| {
                let known: Vec<&str> = NewsCategory::ALL.iter().map(|c| c.as_str()).collect();
                ReaderError::InvalidArgument(format!(
                    "news category '{}' must be one of: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Normalizes a listing date.
///
/// "14:32" (time only) is today, "03/21" is that month and day in the current
/// year, a bare "2019" is January 1 of that year.
pub fn normalize_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, ReaderError> {
    let raw = raw.trim();
    if raw.contains(':') {
        return Ok(today);
    }
    if raw.contains('/') {
        let with_year = format!("{}/{}", raw, today.year());
        return NaiveDate::parse_from_str(&with_year, "%m/%d/%Y")
            .map_err(|e| ReaderError::Parse(format!("invalid news date '{}': {}", raw, e)));
    }
    raw.parse::<i32>()
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        .ok_or_else(|| ReaderError::Parse(format!("invalid news date '{}'", raw)))
}

/// Unix timestamp of midnight UTC on `date`.
pub fn date_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Linked title and optional source badge of one listing row.
struct ListingRow {
    title: String,
    url: String,
    source: NewsSource,
}

/// Date cell of a listing row. Read on its own so rows past the cutoff are
/// never parsed further.
fn row_date(row_cells: &[ElementRef], today: NaiveDate) -> Result<NaiveDate, ReaderError> {
    let date_cell = row_cells
        .first()
        .ok_or_else(|| ReaderError::Parse("news row has no cells".to_string()))?;
    normalize_date(&cell_text(*date_cell), today)
}

fn parse_row(row_cells: &[ElementRef], config: &ReaderConfig) -> Result<ListingRow, ReaderError> {
    if row_cells.len() < 3 {
        return Err(ReaderError::Parse(format!("news row has {} cells, expected 3", row_cells.len())));
    }

    let link = row_cells[1]
        .select(&LINK_SELECTOR)
        .next()
        .ok_or_else(|| ReaderError::Parse("news row has no link".to_string()))?;
    let href = link
        .value()
        .attr("href")
        .ok_or_else(|| ReaderError::Parse("news link has no href".to_string()))?;
    let mut title = cell_text(link);
    // Bold prefixes render as "Label : text"
    if link.select(&BOLD_SELECTOR).next().is_some() {
        title = title.replace(" :", ":");
    }

    let source = match row_cells[2].select(&DIV_SELECTOR).next() {
        Some(badge) => NewsSource {
            name: badge
                .value()
                .attr("title")
                .map(|name| name.replace('©', "").trim().to_string()),
            abbreviation: Some(cell_text(badge)),
        },
        None => NewsSource { name: None, abbreviation: None },
    };

    Ok(ListingRow {
        title,
        url: config.absolute_url(href),
        source,
    })
}

/// Lazy walk over a paginated news listing, newest first.
///
/// Pages are fetched only when the buffered items run out. The feed ends at
/// the first item older than the cutoff, when the listing has no further
/// page, or after the first error.
pub struct NewsFeed<'a, S: PageSource> {
    source: &'a S,
    config: &'a ReaderConfig,
    listing_url: String,
    heading: String,
    start: i64,
    as_timestamp: bool,
    today: NaiveDate,
    page: u32,
    buffer: VecDeque<NewsItem>,
    has_next_page: bool,
    cutoff_reached: bool,
}

impl<'a, S: PageSource> NewsFeed<'a, S> {
    pub(crate) fn new(
        source: &'a S,
        config: &'a ReaderConfig,
        listing_url: String,
        heading: String,
        start: i64,
        as_timestamp: bool,
        today: NaiveDate,
    ) -> Self {
        Self {
            source,
            config,
            listing_url,
            heading,
            start,
            as_timestamp,
            today,
            page: 0,
            buffer: VecDeque::new(),
            has_next_page: true,
            cutoff_reached: false,
        }
    }

    /// Number of listing pages fetched so far.
    pub fn pages_fetched(&self) -> u32 {
        self.page
    }

    fn fetch_next_page(&mut self) -> Result<(), ReaderError> {
        self.page += 1;
        let url = format!("{}/fpage={}", self.listing_url, self.page);
        let html = self.source.get(&url, &[])?;
        let document = Html::parse_document(&html);

        let rows = find_section(&document, &self.heading)?;
        for row in rows {
            let row_cells = cells(row);
            let published = row_date(&row_cells, self.today)?;
            let timestamp = date_timestamp(published);
            if timestamp < self.start {
                tracing::debug!("Reached cutoff on page {} at {}", self.page, published);
                self.cutoff_reached = true;
                break;
            }

            let listing = parse_row(&row_cells, self.config)?;
            let date = if self.as_timestamp {
                NewsDate::Timestamp(timestamp)
            } else {
                NewsDate::Iso(published.format("%Y-%m-%d").to_string())
            };
            self.buffer.push_back(NewsItem {
                title: listing.title,
                date,
                source: listing.source,
                url: listing.url,
            });
        }

        self.has_next_page = document.select(&NEXT_PAGE_SELECTOR).next().is_some();
        tracing::debug!(
            "News page {} buffered {} items, next page: {}",
            self.page,
            self.buffer.len(),
            self.has_next_page
        );
        Ok(())
    }
}

impl<'a, S: PageSource> Iterator for NewsFeed<'a, S> {
    type Item = Result<NewsItem, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.cutoff_reached || !self.has_next_page {
                return None;
            }
            if let Err(err) = self.fetch_next_page() {
                self.buffer.clear();
                self.has_next_page = false;
                return Some(Err(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketscreener::fixtures::{news_page, news_row, FakeSource};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn feed<'a>(source: &'a FakeSource, config: &'a ReaderConfig, start: NaiveDate) -> NewsFeed<'a, FakeSource> {
        NewsFeed::new(
            source,
            config,
            "https://ms.test/quote/stock/ACME-1/news-history".to_string(),
            "All news about ACME".to_string(),
            date_timestamp(start),
            false,
            today(),
        )
    }

    #[test]
    fn test_normalize_date_formats() {
        assert_eq!(normalize_date("14:32", today()).unwrap(), today());
        assert_eq!(
            normalize_date("03/21", today()).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 21).unwrap()
        );
        assert_eq!(
            normalize_date(" 2019 ", today()).unwrap(),
            NaiveDate::from_ymd_opt(2019, 1, 1).unwrap()
        );
        assert!(matches!(normalize_date("yesterday", today()), Err(ReaderError::Parse(_))));
        assert!(matches!(normalize_date("13/45", today()), Err(ReaderError::Parse(_))));
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("sector".parse::<NewsCategory>().unwrap(), NewsCategory::Sector);
        assert_eq!("all".parse::<NewsCategory>().unwrap().path(), "news-history");
        assert!(matches!("weather".parse::<NewsCategory>(), Err(ReaderError::InvalidArgument(_))));
    }

    #[test]
    fn test_category_headings() {
        assert_eq!(NewsCategory::All.heading("ACME"), "All news about ACME");
        assert_eq!(NewsCategory::Sector.heading("Semiconductors"), "Sector news Semiconductors");
        assert_eq!(NewsCategory::OfficialPublications.heading("ACME"), "Official Publications");
    }

    #[test]
    fn test_parse_row_fields() {
        let html = news_page(
            "All news about ACME",
            &[
                r#"<tr><td>06/14</td><td><a href="/news/acme-1"><b>ACME</b> : beats estimates</a></td><td><div title="©Reuters">RE</div></td></tr>"#.to_string(),
            ],
            false,
        );
        let source = FakeSource::new().page("https://ms.test/quote/stock/ACME-1/news-history/fpage=1", &html);
        let config = ReaderConfig::default().with_base_url("https://ms.test");

        let items: Vec<NewsItem> = feed(&source, &config, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "ACME: beats estimates");
        assert_eq!(items[0].date, NewsDate::Iso("2024-06-14".to_string()));
        assert_eq!(items[0].url, "https://ms.test/news/acme-1");
        assert_eq!(items[0].source.name.as_deref(), Some("Reuters"));
        assert_eq!(items[0].source.abbreviation.as_deref(), Some("RE"));
    }

    #[test]
    fn test_row_without_source_badge() {
        let html = news_page("All news about ACME", &[news_row("14:05", "Intraday note", "/news/2")], false);
        let source = FakeSource::new().page("https://ms.test/quote/stock/ACME-1/news-history/fpage=1", &html);
        let config = ReaderConfig::default().with_base_url("https://ms.test");

        let item = feed(&source, &config, today()).next().unwrap().unwrap();
        assert_eq!(item.date, NewsDate::Iso("2024-06-15".to_string()));
        assert_eq!(item.source, NewsSource { name: None, abbreviation: None });
    }

    #[test]
    fn test_cutoff_on_first_page_skips_second_page() {
        let page1 = news_page(
            "All news about ACME",
            &[
                news_row("14:05", "Today", "/news/1"),
                news_row("06/10", "Last week", "/news/2"),
                news_row("05/01", "Too old", "/news/3"),
            ],
            true,
        );
        let source = FakeSource::new().page("https://ms.test/quote/stock/ACME-1/news-history/fpage=1", &page1);
        let config = ReaderConfig::default().with_base_url("https://ms.test");

        let titles: Vec<String> = feed(&source, &config, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .map(|item| item.unwrap().title)
            .collect();

        assert_eq!(titles, vec!["Today", "Last week"]);
        assert_eq!(source.requests().len(), 1);
    }

    #[test]
    fn test_rows_past_cutoff_are_not_parsed() {
        let page1 = news_page(
            "All news about ACME",
            &[
                news_row("06/14", "One", "/news/1"),
                "<tr><td>2019</td><td>archived</td><td></td></tr>".to_string(),
            ],
            true,
        );
        let source = FakeSource::new().page("https://ms.test/quote/stock/ACME-1/news-history/fpage=1", &page1);
        let config = ReaderConfig::default().with_base_url("https://ms.test");

        let results: Vec<Result<NewsItem, ReaderError>> =
            feed(&source, &config, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).collect();

        let titles: Vec<String> = results.into_iter().map(|item| item.unwrap().title).collect();
        assert_eq!(titles, vec!["One"]);
        assert_eq!(source.requests().len(), 1);
    }

    #[test]
    fn test_fetches_next_page_while_cutoff_not_reached() {
        let page1 = news_page(
            "All news about ACME",
            &[news_row("06/14", "One", "/news/1"), news_row("06/12", "Two", "/news/2")],
            true,
        );
        let page2 = news_page(
            "All news about ACME",
            &[news_row("06/03", "Three", "/news/3"), news_row("2023", "Old", "/news/4")],
            true,
        );
        let source = FakeSource::new()
            .page("https://ms.test/quote/stock/ACME-1/news-history/fpage=1", &page1)
            .page("https://ms.test/quote/stock/ACME-1/news-history/fpage=2", &page2);
        let config = ReaderConfig::default().with_base_url("https://ms.test");

        let mut news = feed(&source, &config, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        let titles: Vec<String> = news.by_ref().map(|item| item.unwrap().title).collect();

        assert_eq!(titles, vec!["One", "Two", "Three"]);
        assert_eq!(news.pages_fetched(), 2);
        assert_eq!(source.requests().len(), 2);
    }

    #[test]
    fn test_stops_when_no_next_page() {
        let page1 = news_page("All news about ACME", &[news_row("06/14", "One", "/news/1")], false);
        let source = FakeSource::new().page("https://ms.test/quote/stock/ACME-1/news-history/fpage=1", &page1);
        let config = ReaderConfig::default().with_base_url("https://ms.test");

        let count = feed(&source, &config, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()).count();

        assert_eq!(count, 1);
        assert_eq!(source.requests().len(), 1);
    }

    #[test]
    fn test_pages_fetched_lazily() {
        let page1 = news_page("All news about ACME", &[news_row("06/14", "One", "/news/1")], true);
        let source = FakeSource::new().page("https://ms.test/quote/stock/ACME-1/news-history/fpage=1", &page1);
        let config = ReaderConfig::default().with_base_url("https://ms.test");

        let mut news = feed(&source, &config, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert!(source.requests().is_empty());

        let first = news.next().unwrap().unwrap();
        assert_eq!(first.title, "One");
        assert_eq!(source.requests().len(), 1);
    }

    #[test]
    fn test_page_error_ends_feed() {
        let page1 = news_page("All news about ACME", &[news_row("06/14", "One", "/news/1")], true);
        let source = FakeSource::new().page("https://ms.test/quote/stock/ACME-1/news-history/fpage=1", &page1);
        let config = ReaderConfig::default().with_base_url("https://ms.test");

        let results: Vec<Result<NewsItem, ReaderError>> =
            feed(&source, &config, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()).collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ReaderError::Http(_))));
    }

    #[test]
    fn test_timestamps_requested() {
        let page1 = news_page("All news about ACME", &[news_row("2024", "New year", "/news/1")], false);
        let source = FakeSource::new().page("https://ms.test/quote/stock/ACME-1/news-history/fpage=1", &page1);
        let config = ReaderConfig::default().with_base_url("https://ms.test");

        let mut news = NewsFeed::new(
            &source,
            &config,
            "https://ms.test/quote/stock/ACME-1/news-history".to_string(),
            "All news about ACME".to_string(),
            0,
            true,
            today(),
        );

        let item = news.next().unwrap().unwrap();
        assert_eq!(item.date, NewsDate::Timestamp(1_704_067_200)); // 2024-01-01T00:00:00Z
    }
}
