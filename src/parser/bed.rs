//! BED-like record loader with configurable columns and gzip support.
//!
//! Any delimited format works as long as chromosome, start and stop sit in
//! known columns. Blank, comment, `track` and `browser` lines are skipped; any
//! other line that does not parse aborts the load with its line number.

use log::info;
use std::io::BufRead;
use std::path::Path;

use crate::config::ColumnMapping;
use crate::error::Result;
use crate::parser::util::{open_input, should_skip_line, split_fields};
use crate::store::{IntervalStore, LoadFilter};
use crate::types::Interval;

/// Streaming reader turning delimited lines into intervals.
pub struct IntervalReader {
    reader: Box<dyn BufRead + Send>,
    columns: ColumnMapping,
    line_number: usize,
    line: String,
}

impl IntervalReader {
    /// Create a reader over a file path (supports .gz and `-` for stdin).
    pub fn new(path: &Path, columns: ColumnMapping) -> Result<Self> {
        let reader = open_input(path)?;
        Ok(Self::from_reader(reader, columns))
    }

    /// Create a reader over any buffered source.
    pub fn from_reader(reader: Box<dyn BufRead + Send>, columns: ColumnMapping) -> Self {
        IntervalReader {
            reader,
            columns,
            line_number: 0,
            line: String::new(),
        }
    }

    /// Read the next interval, or `None` at end of input.
    pub fn next_interval(&mut self) -> Result<Option<Interval>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim_end_matches(['\n', '\r']);
            if should_skip_line(trimmed) {
                continue;
            }

            let fields = split_fields(trimmed);
            return Interval::from_fields(fields, &self.columns, self.line_number).map(Some);
        }
    }

}

impl Iterator for IntervalReader {
    type Item = Result<Interval>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_interval().transpose()
    }
}

/// Load a whole file into a store. The first bad line aborts the load.
pub fn load_store(
    path: &Path,
    columns: ColumnMapping,
    filter: LoadFilter<'_>,
) -> Result<IntervalStore> {
    let intervals = IntervalReader::new(path, columns)?.collect::<Result<Vec<_>>>()?;
    let store = IntervalStore::from_intervals(intervals, filter);
    info!(
        "Loaded {} intervals on {} chromosomes from {}",
        store.total_count(),
        store.chromosomes().count(),
        path.display()
    );
    Ok(store)
}

/// Load intervals from a reader into a store.
pub fn read_store(
    reader: Box<dyn BufRead + Send>,
    columns: ColumnMapping,
    filter: LoadFilter<'_>,
) -> Result<IntervalStore> {
    let intervals = IntervalReader::from_reader(reader, columns).collect::<Result<Vec<_>>>()?;
    Ok(IntervalStore::from_intervals(intervals, filter))
}
