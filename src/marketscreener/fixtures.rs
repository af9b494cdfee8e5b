// src/marketscreener/fixtures.rs
//! Canned pages and an in-memory page source for tests.

use crate::marketscreener::client::PageSource;
use crate::utils::error::ReaderError;
use std::cell::RefCell;
use std::collections::HashMap;

/// Serves registered bodies by URL (query string appended) and records every request.
/// Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeSource {
    pages: HashMap<String, String>,
    requests: RefCell<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl PageSource for FakeSource {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String, ReaderError> {
        let key = if query.is_empty() {
            url.to_string()
        } else {
            let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            format!("{}?{}", url, pairs.join("&"))
        };
        self.requests.borrow_mut().push(key.clone());
        self.pages
            .get(&key)
            .cloned()
            .ok_or(ReaderError::Http(reqwest::StatusCode::NOT_FOUND))
    }
}

/// Heading row followed by a row holding the data table, as the site lays out its sections.
pub fn section(heading: &str, rows: &str) -> String {
    format!(
        "<table><tr><td><b>{}</b></td></tr><tr><td><table>{}</table></td></tr></table>",
        heading, rows
    )
}

pub fn search_page(rows: &str) -> String {
    format!(
        r#"<html><body><table class="table table--small table--hover table--centered table--bordered">
           <thead><tr><th>Name</th></tr></thead><tbody>{}</tbody></table></body></html>"#,
        rows
    )
}

pub fn quote_header(name: &str, ticker: &str) -> String {
    format!(
        r#"<div class="bc_pos"><span class="bc_add"><span>{ticker}</span><span>US0000000001</span></span></div>
           <div><h1>{name}</h1> ({ticker})</div>
           <table><tr><td><span class="last variation--no-bg txt-bold">42.5</span></td><td>USD</td></tr></table>"#,
        name = name,
        ticker = ticker
    )
}

pub fn page(body: &str) -> String {
    format!("<html><body>{}</body></html>", body)
}

pub fn news_row(date: &str, title: &str, href: &str) -> String {
    format!(
        r#"<tr><td>{}</td><td><a href="{}">{}</a></td><td></td></tr>"#,
        date, href, title
    )
}

pub fn news_page(heading: &str, rows: &[String], has_next: bool) -> String {
    let nav = if has_next {
        r##"<span class="nPageTable"><a href="#">1</a><a class="nPageEndTab" href="#">&gt;</a></span>"##
    } else {
        r##"<span class="nPageTable"><a href="#">1</a></span>"##
    };
    page(&format!("{}{}", section(heading, &rows.concat()), nav))
}
