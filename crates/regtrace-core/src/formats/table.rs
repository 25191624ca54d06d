//! Header-addressed CSV tables.
//!
//! Every artifact this crate reads is looked up by column name, never by
//! position, so producers may add or reorder columns freely.

use crate::TraceError;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::BTreeMap;
use std::io::Read;

/// A fully loaded CSV table with a name-to-index header lookup.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    index: BTreeMap<String, usize>,
    rows: Vec<StringRecord>,
}

impl Table {
    /// Read a whole table. `name` is only used in error messages.
    ///
    /// Cells and headers are trimmed; every row must have as many fields as
    /// the header.
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, TraceError> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(false)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();

        let rows = csv_reader
            .records()
            .collect::<Result<Vec<_>, csv::Error>>()?;

        Ok(Self {
            name: name.to_string(),
            headers,
            index,
            rows,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Position of a required column.
    pub fn column(&self, column: &str) -> Result<usize, TraceError> {
        self.index
            .get(column)
            .copied()
            .ok_or_else(|| TraceError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Cell of a required column in row `row`.
    pub fn cell(&self, row: usize, column: &str) -> Result<&str, TraceError> {
        let col = self.column(column)?;
        self.rows
            .get(row)
            .and_then(|record| record.get(col))
            .ok_or_else(|| {
                TraceError::ConsistencyCheck(format!(
                    "{}: row {} has no '{}' cell",
                    self.name, row, column
                ))
            })
    }

    /// The last row as a header-keyed map, or `None` for an empty table.
    #[must_use]
    pub fn last_row(&self) -> Option<BTreeMap<String, String>> {
        self.rows.last().map(|record| {
            self.headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const SAMPLE: &str = "a, b ,c\n1,\"[0,1]\",x\n2,\"[]\", y\n";

    #[test]
    fn looks_up_cells_by_name() {
        let table = Table::from_reader("sample", SAMPLE.as_bytes()).expect("read");
        assert_eq!(table.len(), 2);
        assert_eq!(table.headers(), ["a", "b", "c"]);
        assert_eq!(table.cell(0, "b").expect("cell"), "[0,1]");
        assert_eq!(table.cell(1, "c").expect("cell"), "y");
    }

    #[test]
    fn missing_column_names_table() {
        let table = Table::from_reader("sample", SAMPLE.as_bytes()).expect("read");
        match table.column("zzz") {
            Err(TraceError::MissingColumn { table, column }) => {
                assert_eq!(table, "sample");
                assert_eq!(column, "zzz");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn last_row_is_keyed_by_header() {
        let table = Table::from_reader("sample", SAMPLE.as_bytes()).expect("read");
        let last = table.last_row().expect("row");
        assert_eq!(last.get("a").map(String::as_str), Some("2"));
        assert_eq!(last.get("b").map(String::as_str), Some("[]"));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let result = Table::from_reader("ragged", "a,b\n1,2,3\n".as_bytes());
        assert!(matches!(result, Err(TraceError::CsvError(_))));
    }

    #[test]
    fn empty_table() {
        let table = Table::from_reader("empty", "a,b\n".as_bytes()).expect("read");
        assert!(table.is_empty());
        assert!(table.last_row().is_none());
    }
}
