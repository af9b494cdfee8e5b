// src/aqr/fixtures.rs
//! The sample workbook and an in-memory file source for tests.
//!
//! `testdata/aqr_datasets.xlsx` holds eleven small sheets:
//! - the seven factor sheets (`BAB Factors`, `MKT`, `SMB`, `HML FF`,
//!   `HML Devil`, `UMD`, `RF`), each with a header at row 19 and monthly dates
//!   from 2020-01-31;
//! - `10 Portfolios Formed on Quality` with a US block and a Global block
//!   under the same column names;
//! - the two ESG frontier sheets with four date-led blocks each;
//! - `Century of Factor Premia` with dates written as text.

use crate::marketscreener::client::FileSource;
use crate::utils::error::ReaderError;
use std::cell::RefCell;
use std::collections::HashMap;

pub const FIXTURE_WORKBOOK: &[u8] = include_bytes!("../../testdata/aqr_datasets.xlsx");

/// Serves registered files by URL and records every request. Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeFiles {
    files: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl FakeFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, url: &str, body: &[u8]) -> Self {
        self.files.insert(url.to_string(), body.to_vec());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl FileSource for FakeFiles {
    fn download(&self, url: &str) -> Result<Vec<u8>, ReaderError> {
        self.requests.borrow_mut().push(url.to_string());
        self.files
            .get(url)
            .cloned()
            .ok_or(ReaderError::Http(reqwest::StatusCode::NOT_FOUND))
    }
}
