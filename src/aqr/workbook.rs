// src/aqr/workbook.rs
use crate::aqr::table::Sheet;
use crate::utils::error::ReaderError;
use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::io::Cursor;

/// A downloaded workbook (xlsx or legacy xls) held in memory.
pub struct Workbook {
    sheets: Sheets<Cursor<Vec<u8>>>,
}

impl Workbook {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ReaderError> {
        let sheets = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        Ok(Self { sheets })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    /// Reads worksheet `name`, skipping `skip_rows` rows counted from the top of the sheet.
    pub fn sheet(&mut self, name: &str, skip_rows: usize) -> Result<Sheet, ReaderError> {
        if !self.sheet_names().iter().any(|sheet| sheet == name) {
            return Err(ReaderError::Parse(format!("workbook has no sheet '{}'", name)));
        }
        let range = self.sheets.worksheet_range(name)?;

        // The range starts at the first used cell; pad it back out to A1 so
        // row and column positions match the sheet.
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<Data>> = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells = vec![Data::Empty; start_col as usize];
            cells.extend_from_slice(row);
            rows.push(cells);
        }

        Sheet::from_rows(name, rows, skip_rows)
    }
}
