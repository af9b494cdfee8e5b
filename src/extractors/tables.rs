// src/extractors/tables.rs
//! Turns section rows into typed records.
//!
//! The page uses "-" for missing figures. It is converted to `None` here and
//! nowhere else.

use crate::extractors::section::{cell_text, cells, find_after_element, header_years};
use crate::marketscreener::models::{BreakdownTable, QuoteHeader, RosterRecord, ShareholderRecord};
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::str::FromStr;

const PLACEHOLDER: &str = "-";
const MILLIONS: f64 = 1e6;

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a").expect("Failed to compile LINK_SELECTOR")
});

static SPAN_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("span").expect("Failed to compile SPAN_SELECTOR")
});

static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1").expect("Failed to compile H1_SELECTOR")
});

static CODES_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.bc_pos span.bc_add").expect("Failed to compile CODES_SELECTOR")
});

static PRICE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("span.last.variation--no-bg.txt-bold").expect("Failed to compile PRICE_SELECTOR")
});

// "APPLE INC. (AAPL)" -> "APPLE INC. "
static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(.+)\(.+\)").expect("Failed to compile NAME_RE")
});

/// How breakdown category labels are rendered.
///
/// Regions are title-cased while business segments keep the page's casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryNaming {
    TitleCase,
    Verbatim,
}

/// Parses a cell that holds either a value or the "-" placeholder.
fn parse_optional<T: FromStr>(text: &str, what: &str) -> Result<Option<T>, ExtractError> {
    if text == PLACEHOLDER {
        return Ok(None);
    }
    text.parse::<T>()
        .map(Some)
        .map_err(|_| ExtractError::HtmlParseError(format!("invalid {} '{}'", what, text)))
}

fn strip_separators(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Parses an amount in millions, whitespace thousands separators allowed.
fn parse_amount(text: &str) -> Result<Option<f64>, ExtractError> {
    if text == PLACEHOLDER {
        return Ok(None);
    }
    strip_separators(text)
        .parse::<f64>()
        .map(|millions| Some(millions * MILLIONS))
        .map_err(|_| ExtractError::HtmlParseError(format!("invalid amount '{}'", text)))
}

fn require_cells<'a>(row: ElementRef<'a>, count: usize, table: &str) -> Result<Vec<ElementRef<'a>>, ExtractError> {
    let row_cells = cells(row);
    if row_cells.len() < count {
        return Err(ExtractError::HtmlParseError(format!(
            "{} row has {} cells, expected {}",
            table,
            row_cells.len(),
            count
        )));
    }
    Ok(row_cells)
}

/// Capitalizes the first letter of every alphabetic run and lowercases the rest.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }
    result
}

/// Board or management roster: name, title, age, joined. The header row is skipped.
pub fn parse_roster(rows: &[ElementRef]) -> Result<Vec<RosterRecord>, ExtractError> {
    rows.iter()
        .skip(1)
        .map(|row| {
            let row_cells = require_cells(*row, 4, "roster")?;
            Ok(RosterRecord {
                name: cell_text(row_cells[0]),
                title: cell_text(row_cells[1]),
                age: parse_optional(&cell_text(row_cells[2]), "age")?,
                joined: parse_optional(&cell_text(row_cells[3]), "joined year")?,
            })
        })
        .collect()
}

/// Breakdown of sales per year and category.
///
/// The first row carries the years, the last row is the total and is dropped.
/// Value cells alternate with delta cells, so the value for year `i` sits in
/// cell `1 + 2i`.
pub fn parse_breakdown(rows: &[ElementRef], naming: CategoryNaming) -> Result<BreakdownTable, ExtractError> {
    let (header, rest) = rows
        .split_first()
        .ok_or_else(|| ExtractError::HtmlParseError("breakdown table has no header row".to_string()))?;
    let years = header_years(*header)?;

    let mut table: BreakdownTable = years.iter().map(|year| (*year, BTreeMap::new())).collect();

    let data_rows = &rest[..rest.len().saturating_sub(1)];
    for row in data_rows {
        let row_cells = cells(*row);
        let label = row_cells
            .first()
            .map(|cell| cell_text(*cell))
            .ok_or_else(|| ExtractError::HtmlParseError("breakdown row has no cells".to_string()))?;
        let category = match naming {
            CategoryNaming::TitleCase => title_case(&label),
            CategoryNaming::Verbatim => label,
        };

        let value_cells = row_cells.get(1..row_cells.len().saturating_sub(1)).unwrap_or(&[]);
        for (index, cell) in value_cells.iter().step_by(2).enumerate() {
            let year = years.get(index).ok_or_else(|| {
                ExtractError::HtmlParseError(format!("'{}' has more values than year columns", category))
            })?;
            let amount = parse_amount(&cell_text(*cell))?;
            table.entry(*year).or_default().insert(category.clone(), amount);
        }
    }

    Ok(table)
}

/// Shareholders: company, share count ("1,234,567"), stake ("7.1234%").
pub fn parse_shareholders(rows: &[ElementRef]) -> Result<Vec<ShareholderRecord>, ExtractError> {
    rows.iter()
        .skip(1)
        .map(|row| {
            let row_cells = require_cells(*row, 3, "shareholder")?;
            let shares_text = cell_text(row_cells[1]);
            let shares = shares_text
                .replace(',', "")
                .parse::<u64>()
                .map_err(|_| ExtractError::HtmlParseError(format!("invalid share count '{}'", shares_text)))?;
            Ok(ShareholderRecord {
                company: cell_text(row_cells[0]),
                shares,
                percentage: parse_percentage(&cell_text(row_cells[2]))?,
            })
        })
        .collect()
}

/// "12.3456%" -> 0.1235 (fraction, four decimals).
pub fn parse_percentage(text: &str) -> Result<f64, ExtractError> {
    let value = text
        .replace('%', "")
        .trim()
        .parse::<f64>()
        .map_err(|_| ExtractError::HtmlParseError(format!("invalid percentage '{}'", text)))?;
    Ok((value / 100.0 * 10_000.0).round() / 10_000.0)
}

/// Sector chain from the broadest classification to the most specific one.
pub fn parse_industries(rows: &[ElementRef]) -> Result<Vec<String>, ExtractError> {
    rows.iter()
        .map(|row| {
            let link = cells(*row)
                .last()
                .and_then(|cell| cell.select(&LINK_SELECTOR).next())
                .ok_or_else(|| ExtractError::HtmlParseError("sector row has no link".to_string()))?;
            Ok(cell_text(link))
        })
        .collect()
}

/// Parses the quote header present on every company page.
pub fn parse_quote_header(document: &Html) -> Result<QuoteHeader, ExtractError> {
    let codes = document
        .select(&CODES_SELECTOR)
        .next()
        .ok_or_else(|| ExtractError::HtmlParseError("quote header has no ticker/ISIN block".to_string()))?;
    let code_spans: Vec<ElementRef> = codes.select(&SPAN_SELECTOR).collect();
    let (ticker, isin) = match code_spans.as_slice() {
        [ticker, isin] => (cell_text(*ticker), cell_text(*isin)),
        other => {
            return Err(ExtractError::HtmlParseError(format!(
                "expected ticker and ISIN, found {} codes",
                other.len()
            )))
        }
    };

    let title = document
        .select(&H1_SELECTOR)
        .next()
        .and_then(|h1| h1.parent().and_then(ElementRef::wrap))
        .ok_or_else(|| ExtractError::HtmlParseError("quote header has no title".to_string()))?;
    let title_text = cell_text(title);
    let name = NAME_RE
        .captures(&title_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .ok_or_else(|| ExtractError::HtmlParseError(format!("unexpected title '{}'", title_text)))?;

    let price_tag = document
        .select(&PRICE_SELECTOR)
        .next()
        .ok_or_else(|| ExtractError::HtmlParseError("quote header has no price".to_string()))?;
    let price_text = cell_text(price_tag);
    let price = strip_separators(&price_text)
        .parse::<f64>()
        .map_err(|_| ExtractError::HtmlParseError(format!("invalid price '{}'", price_text)))?;

    let currency = find_after_element(document, price_tag, |el| el.value().name() == "td")
        .map(cell_text)
        .ok_or_else(|| ExtractError::HtmlParseError("quote header has no currency".to_string()))?;

    Ok(QuoteHeader { name, ticker, isin, price, currency })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::section::find_section;

    const ROSTER_HTML: &str = r#"
        <html><body>
        <table>
          <tr><td><b>Members of the board</b></td></tr>
          <tr><td>
            <table>
              <tr><td>Name</td><td>Title</td><td>Age</td><td>Since</td></tr>
              <tr><td> Arthur Levinson </td><td> Chairman </td><td>73</td><td>2000</td></tr>
              <tr><td>New Director</td><td>Director</td><td>-</td><td>-</td></tr>
            </table>
          </td></tr>
        </table>
        </body></html>
    "#;

    fn breakdown_html(heading: &str, header: &str, rows: &str) -> String {
        format!(
            "<html><body><table><tr><td><b>{}</b></td></tr><tr><td><table><tr>{}</tr>{}</table></td></tr></table></body></html>",
            heading, header, rows
        )
    }

    #[test]
    fn test_roster_placeholders_are_absent() {
        let document = Html::parse_document(ROSTER_HTML);
        let rows = find_section(&document, "Members of the board").unwrap();

        let roster = parse_roster(&rows).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(
            roster[0],
            RosterRecord {
                name: "Arthur Levinson".to_string(),
                title: "Chairman".to_string(),
                age: Some(73),
                joined: Some(2000),
            }
        );
        assert_eq!(roster[1].age, None);
        assert_eq!(roster[1].joined, None);
    }

    #[test]
    fn test_roster_rejects_short_row() {
        let document = Html::parse_document(
            "<html><body><b>Managers</b><table><tr><td>h</td></tr><tr><td>Only name</td></tr></table></body></html>",
        );
        let rows = find_section(&document, "Managers").unwrap();
        assert!(matches!(parse_roster(&rows), Err(ExtractError::HtmlParseError(_))));
    }

    #[test]
    fn test_breakdown_with_delta_column() {
        let html = breakdown_html(
            "Sales per region",
            "<td>Region</td><td><b>2022</b></td><td><b>2023</b></td><td>Delta</td>",
            "<tr><td>UNITED STATES</td><td>1 000.5</td><td>+2%</td><td>1 020</td><td>+3%</td></tr>\
             <tr><td>rest of world</td><td>-</td><td></td><td>250</td><td></td></tr>\
             <tr><td>Total</td><td>9</td><td></td><td>9</td><td></td></tr>",
        );
        let document = Html::parse_document(&html);
        let rows = find_section(&document, "Sales per region").unwrap();

        let table = parse_breakdown(&rows, CategoryNaming::TitleCase).unwrap();
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec![2022, 2023]);
        assert_eq!(table[&2022]["United States"], Some(1_000.5e6));
        assert_eq!(table[&2023]["United States"], Some(1_020e6));
        assert_eq!(table[&2022]["Rest Of World"], None);
        assert_eq!(table[&2023]["Rest Of World"], Some(250e6));
        assert!(!table[&2022].contains_key("Total"));
    }

    #[test]
    fn test_breakdown_without_delta_keeps_segment_names() {
        let html = breakdown_html(
            "Sales per Business",
            "<td>Segment</td><td><b>2021</b></td><td><b>2022</b></td>",
            "<tr><td>iPhone</td><td>190</td><td></td><td>205</td><td></td></tr>\
             <tr><td>Total</td><td>1</td><td></td><td>1</td><td></td></tr>",
        );
        let document = Html::parse_document(&html);
        let rows = find_section(&document, "Sales per Business").unwrap();

        let table = parse_breakdown(&rows, CategoryNaming::Verbatim).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[&2021]["iPhone"], Some(190e6));
        assert_eq!(table[&2022]["iPhone"], Some(205e6));
    }

    #[test]
    fn test_breakdown_years_match_header_labels() {
        let html = breakdown_html(
            "Sales per region",
            "<td>Region</td><td><b>2019</b></td><td><b>2020</b></td><td><b>2021</b></td><td>Delta</td>",
            "<tr><td>Total</td><td>1</td><td></td><td>1</td><td></td><td>1</td><td></td></tr>",
        );
        let document = Html::parse_document(&html);
        let rows = find_section(&document, "Sales per region").unwrap();

        let table = parse_breakdown(&rows, CategoryNaming::TitleCase).unwrap();
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec![2019, 2020, 2021]);
        assert!(table.values().all(|categories| categories.is_empty()));
    }

    #[test]
    fn test_shareholders() {
        let document = Html::parse_document(
            r#"<html><body><b>Shareholders</b><table>
                <tr><td>Name</td><td>Equities</td><td>%</td></tr>
                <tr><td> The Vanguard Group </td><td>1,311,062,604</td><td>8.4323%</td></tr>
                <tr><td>BlackRock</td><td>1,000</td><td>100%</td></tr>
            </table></body></html>"#,
        );
        let rows = find_section(&document, "Shareholders").unwrap();

        let holders = parse_shareholders(&rows).unwrap();
        assert_eq!(holders[0].company, "The Vanguard Group");
        assert_eq!(holders[0].shares, 1_311_062_604);
        assert_eq!(holders[0].percentage, 0.0843);
        assert_eq!(holders[1].percentage, 1.0);
    }

    #[test]
    fn test_percentage_rounding_stays_in_unit_interval() {
        for (text, expected) in [("0%", 0.0), ("12.3456%", 0.1235), ("99.99999%", 1.0), ("0.004%", 0.0)] {
            let value = parse_percentage(text).unwrap();
            assert_eq!(value, expected, "for {}", text);
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("UNITED STATES"), "United States");
        assert_eq!(title_case("asia-pacific"), "Asia-Pacific");
        assert_eq!(title_case("o'neil 2nd"), "O'Neil 2Nd");
    }

    #[test]
    fn test_industries() {
        let document = Html::parse_document(
            r#"<html><body><b>Sector</b><div><table>
                <tr><td>Sector</td><td><a href="/a">Technology</a></td></tr>
                <tr><td>Industry</td><td><a href="/b">Computers, Phones &amp; Household Electronics</a></td></tr>
            </table></div></body></html>"#,
        );
        let rows = find_section(&document, "Sector").unwrap();

        let chain = parse_industries(&rows).unwrap();
        assert_eq!(chain, vec!["Technology", "Computers, Phones & Household Electronics"]);
    }

    #[test]
    fn test_quote_header() {
        let document = Html::parse_document(
            r#"<html><body>
                <div class="bc_pos"><span class="bc_add"><span> AAPL </span><span>US0378331005</span></span></div>
                <div><h1>APPLE INC.</h1> (AAPL)</div>
                <table><tr>
                  <td><span class="last variation--no-bg txt-bold">189.84</span></td>
                  <td> USD </td>
                </tr></table>
            </body></html>"#,
        );

        let header = parse_quote_header(&document).unwrap();
        assert_eq!(
            header,
            QuoteHeader {
                name: "APPLE INC.".to_string(),
                ticker: "AAPL".to_string(),
                isin: "US0378331005".to_string(),
                price: 189.84,
                currency: "USD".to_string(),
            }
        );
    }
}
