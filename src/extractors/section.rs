// src/extractors/section.rs

// --- Imports ---
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use scraper::{node::Node, ElementRef, Html, Selector};

// --- CSS Selectors (Lazy Static) ---
static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("tr").expect("Failed to compile ROW_SELECTOR")
});

static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("td").expect("Failed to compile CELL_SELECTOR")
});

static BOLD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("b").expect("Failed to compile BOLD_SELECTOR")
});

/// Trailing header cell of breakdowns that carry a year-over-year column.
const DELTA_HEADER: &str = "Delta";

/// Visible text of an element, with non-breaking spaces folded and the ends trimmed.
pub fn cell_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

/// All `td` cells of a row, nested ones included.
pub fn cells(row: ElementRef) -> Vec<ElementRef> {
    row.select(&CELL_SELECTOR).collect()
}

/// Locates the first bold heading (a text node directly inside `<b>`) whose
/// trimmed content is exactly `heading` and returns the nearest element after
/// it (document order) accepted by `predicate`.
pub fn find_after_heading<'a, P>(document: &'a Html, heading: &str, predicate: P) -> Option<ElementRef<'a>>
where
    P: Fn(&ElementRef<'a>) -> bool,
{
    let mut nodes = document.tree.root().descendants();
    let heading_node = nodes
        .by_ref()
        .find(|node| {
            matches!(node.value(), Node::Text(text) if text.trim() == heading)
                && node
                    .parent()
                    .and_then(ElementRef::wrap)
                    .map_or(false, |parent| parent.value().name() == "b")
        });

    if heading_node.is_none() {
        tracing::debug!("Heading '{}' not present in document", heading);
        return None;
    }

    nodes.filter_map(ElementRef::wrap).find(|element| predicate(element))
}

/// Returns the nearest element after `anchor` (document order, anchor's own
/// descendants included) accepted by `predicate`.
pub fn find_after_element<'a, P>(document: &'a Html, anchor: ElementRef<'a>, predicate: P) -> Option<ElementRef<'a>>
where
    P: Fn(&ElementRef<'a>) -> bool,
{
    let mut nodes = document.tree.root().descendants();
    nodes.by_ref().find(|node| node.id() == anchor.id())?;
    nodes.filter_map(ElementRef::wrap).find(|element| predicate(element))
}

/// Finds the table that follows the heading `heading` and returns its rows,
/// header row included.
///
/// A missing heading means the entity has no such data category, which is
/// reported as `SectionNotFound` rather than a parse failure.
pub fn find_section<'a>(document: &'a Html, heading: &str) -> Result<Vec<ElementRef<'a>>, ExtractError> {
    let table = find_after_heading(document, heading, |element| element.value().name() == "table")
        .ok_or_else(|| ExtractError::SectionNotFound(format!("no table under heading '{}'", heading)))?;

    let rows: Vec<ElementRef> = table.select(&ROW_SELECTOR).collect();
    tracing::debug!("Section '{}' has {} rows", heading, rows.len());
    Ok(rows)
}

/// Reads the year columns of a breakdown header row.
///
/// The first cell is the category label. When the last cell reads "Delta" it is
/// a year-over-year column and is not a year.
pub fn header_years(header: ElementRef) -> Result<Vec<i32>, ExtractError> {
    let header_cells = cells(header);
    let ends_with_delta = header_cells
        .last()
        .map(|cell| cell_text(*cell) == DELTA_HEADER)
        .unwrap_or(false);

    let end = if ends_with_delta { header_cells.len() - 1 } else { header_cells.len() };
    let year_cells = header_cells.get(1..end).unwrap_or(&[]);

    year_cells
        .iter()
        .map(|cell| {
            let bold = cell
                .select(&BOLD_SELECTOR)
                .next()
                .ok_or_else(|| ExtractError::HtmlParseError("year header cell has no bold label".to_string()))?;
            let text = cell_text(bold);
            text.parse::<i32>()
                .map_err(|_| ExtractError::HtmlParseError(format!("invalid year label '{}'", text)))
        })
        .collect()
}
