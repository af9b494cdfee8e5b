// src/aqr/table.rs

// --- Imports ---
use crate::utils::error::ReaderError;
use calamine::{Data, DataType};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Text date layouts seen in the data sets' first column.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y-%m-%d %H:%M:%S"];

/// Row label of a table: a calendar date for time series, the cell text otherwise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum IndexKey {
    Date(NaiveDate),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub index: IndexKey,
    pub values: Vec<Option<f64>>,
}

/// A numeric table labelled by its first column. Empty or non-numeric cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub index_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let position = self.columns.iter().position(|column| column == name)?;
        Some(self.rows.iter().map(|row| row.values[position]).collect())
    }

    pub fn index(&self) -> Vec<&IndexKey> {
        self.rows.iter().map(|row| &row.index).collect()
    }

    /// Keeps only `columns`, in the given order. Rows are kept as they are.
    pub fn select(&self, columns: &[&str]) -> Result<Table, ReaderError> {
        let positions = columns
            .iter()
            .map(|name| column_position(&self.columns, name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Table {
            index_name: self.index_name.clone(),
            columns: columns.iter().map(|name| name.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| TableRow {
                    index: row.index.clone(),
                    values: positions.iter().map(|&position| row.values[position]).collect(),
                })
                .collect(),
        })
    }

    pub fn rename(mut self, names: &[&str]) -> Result<Table, ReaderError> {
        if names.len() != self.columns.len() {
            return Err(ReaderError::InvalidArgument(format!(
                "{} column names given for {} columns",
                names.len(),
                self.columns.len()
            )));
        }
        self.columns = names.iter().map(|name| name.to_string()).collect();
        Ok(self)
    }

    /// Converts text labels in the index to dates. Fails on the first label that is not a date.
    pub fn with_date_index(mut self) -> Result<Table, ReaderError> {
        for row in &mut self.rows {
            if let IndexKey::Label(label) = &row.index {
                let date = parse_date(label)
                    .ok_or_else(|| ReaderError::Parse(format!("'{}' is not a date", label)))?;
                row.index = IndexKey::Date(date);
            }
        }
        Ok(self)
    }

    /// Side-by-side join on the index. Every label of every table appears once,
    /// sorted; a table with no row for a label contributes `None`s.
    pub fn join(tables: Vec<Table>) -> Table {
        let width: usize = tables.iter().map(|table| table.columns.len()).sum();
        let index_name = tables.first().map(|table| table.index_name.clone()).unwrap_or_default();
        let mut columns = Vec::with_capacity(width);
        let mut joined: BTreeMap<IndexKey, Vec<Option<f64>>> = BTreeMap::new();

        let mut offset = 0;
        for table in tables {
            for row in table.rows {
                let values = joined.entry(row.index).or_insert_with(|| vec![None; width]);
                values[offset..offset + row.values.len()].copy_from_slice(&row.values);
            }
            offset += table.columns.len();
            columns.extend(table.columns);
        }

        Table {
            index_name,
            columns,
            rows: joined.into_iter().map(|(index, values)| TableRow { index, values }).collect(),
        }
    }
}

/// One worksheet read from its header row down: `columns` are the header
/// names, `rows` the non-blank rows under it.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<String>,
    rows: Vec<Vec<Data>>,
}

impl Sheet {
    /// Builds a sheet from rows laid out from cell A1.
    ///
    /// The first `skip_rows` rows are preamble. The header is the first
    /// non-blank row after them, blank rows below it are dropped. Header
    /// cells that are empty become `Unnamed: <column>` and repeated names get
    /// a `.1`, `.2`, ... suffix in order of appearance.
    pub fn from_rows(name: &str, rows: Vec<Vec<Data>>, skip_rows: usize) -> Result<Self, ReaderError> {
        let mut rows = rows.into_iter().skip(skip_rows).filter(|row| !is_blank(row));

        let mut header = rows.next().ok_or_else(|| {
            ReaderError::Parse(format!("sheet '{}' has no header row after {} skipped rows", name, skip_rows))
        })?;
        while matches!(header.last(), Some(Data::Empty)) {
            header.pop();
        }

        let columns = dedupe_names(
            header
                .iter()
                .enumerate()
                .map(|(position, cell)| header_name(position, cell))
                .collect(),
        );
        let rows: Vec<Vec<Data>> = rows.collect();
        tracing::debug!("Sheet '{}': {} columns, {} rows", name, columns.len(), rows.len());

        Ok(Self { name: name.to_string(), columns, rows })
    }

    /// The sheet as a table labelled by its first column.
    pub fn indexed(&self) -> Result<Table, ReaderError> {
        let (index_name, value_columns) = self
            .columns
            .split_first()
            .ok_or_else(|| ReaderError::Parse(format!("sheet '{}' has an empty header", self.name)))?;

        let rows = self
            .rows
            .iter()
            .map(|row| TableRow {
                index: index_key(row.first().unwrap_or(&Data::Empty)),
                values: (1..self.columns.len()).map(|position| cell_value(row.get(position))).collect(),
            })
            .collect();

        Ok(Table {
            index_name: index_name.clone(),
            columns: value_columns.to_vec(),
            rows,
        })
    }

    /// A block of the sheet: the first of `columns` is the index, the rest
    /// are the values. Rows missing any of them are dropped.
    pub fn block(&self, columns: &[&str]) -> Result<Table, ReaderError> {
        let (index_name, value_names) = columns
            .split_first()
            .ok_or_else(|| ReaderError::InvalidArgument("a block needs an index column".to_string()))?;
        let index_position = column_position(&self.columns, index_name)?;
        let positions = value_names
            .iter()
            .map(|name| column_position(&self.columns, name))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = self
            .rows
            .iter()
            .filter_map(|row| {
                let index_cell = row.get(index_position).filter(|cell| !cell.is_empty())?;
                let values = positions
                    .iter()
                    .map(|&position| cell_value(row.get(position)))
                    .collect::<Option<Vec<f64>>>()?;
                Some(TableRow {
                    index: index_key(index_cell),
                    values: values.into_iter().map(Some).collect(),
                })
            })
            .collect();

        Ok(Table {
            index_name: index_name.to_string(),
            columns: value_names.iter().map(|name| name.to_string()).collect(),
            rows,
        })
    }
}

fn column_position(columns: &[String], name: &str) -> Result<usize, ReaderError> {
    columns
        .iter()
        .position(|column| column == name)
        .ok_or_else(|| ReaderError::Parse(format!("column '{}' not found", name)))
}

fn is_blank(row: &[Data]) -> bool {
    row.iter().all(|cell| cell.is_empty())
}

fn header_name(position: usize, cell: &Data) -> String {
    match cell {
        Data::Empty => format!("Unnamed: {}", position),
        Data::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 { name } else { format!("{}.{}", name, count) };
            *count += 1;
            unique
        })
        .collect()
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(text, format)
            .ok()
            .or_else(|| chrono::NaiveDateTime::parse_from_str(text, format).ok().map(|dt| dt.date()))
    })
}

fn index_key(cell: &Data) -> IndexKey {
    match cell {
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_date() {
            Some(date) => IndexKey::Date(date),
            None => IndexKey::Label(cell.to_string()),
        },
        Data::Empty => IndexKey::Label(String::new()),
        Data::String(text) => IndexKey::Label(text.trim().to_string()),
        other => IndexKey::Label(other.to_string()),
    }
}

fn cell_value(cell: Option<&Data>) -> Option<f64> {
    match cell? {
        Data::Float(value) => Some(*value),
        Data::Int(value) => Some(*value as f64),
        Data::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
