//! Output formatting for gops results.
//!
//! Every record becomes one or more tab-separated lines. Interval fields are
//! written back exactly as read (coordinates rewritten for clipped segments);
//! operations append their own columns after them.

use anyhow::{Context, Result};

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::parser::util::STDIO_PATH;
use crate::types::{Interval, Record};

/// Placeholder for every field of a missing side in outer-join rows.
pub const MISSING_FIELD: &str = ".";

/// Field counts of the two inputs, used to pad outer-join rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputLayout {
    pub first_width: usize,
    pub second_width: usize,
}

/// Open the output destination; `-` means stdout.
pub fn create_writer(path: &Path) -> Result<Box<dyn Write + Send>> {
    if path.as_os_str() == STDIO_PATH {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn push_fields(line: &mut String, interval: &Interval) {
    for (i, field) in interval.extra.iter().enumerate() {
        if i > 0 || !line.is_empty() {
            line.push('\t');
        }
        line.push_str(field.trim_end());
    }
}

fn push_missing(line: &mut String, width: usize) {
    for _ in 0..width.max(1) {
        if !line.is_empty() {
            line.push('\t');
        }
        line.push_str(MISSING_FIELD);
    }
}

fn push_column(line: &mut String, value: impl std::fmt::Display) {
    line.push('\t');
    line.push_str(&value.to_string());
}

/// Format one record. Cluster members produce one line each, joined by `\n`.
pub fn format_record(record: &Record, layout: &OutputLayout) -> String {
    let mut line = String::new();

    match record {
        Record::Interval(interval) => push_fields(&mut line, interval),
        Record::Sourced(sourced) => {
            push_fields(&mut line, &sourced.interval);
            push_column(&mut line, sourced.source.as_str());
        }
        Record::Join(joined) => {
            match &joined.first {
                Some(a) => push_fields(&mut line, a),
                None => push_missing(&mut line, layout.first_width),
            }
            match &joined.second {
                Some(b) => push_fields(&mut line, b),
                None => push_missing(&mut line, layout.second_width),
            }
        }
        Record::Coverage(coverage) => {
            push_fields(&mut line, &coverage.interval);
            push_column(&mut line, coverage.overlap_bp);
            push_column(&mut line, format!("{:.2}", coverage.percentage));
        }
        Record::Proximity(nearest) => {
            push_fields(&mut line, &nearest.query);
            push_fields(&mut line, &nearest.target);
            push_column(&mut line, nearest.distance);
        }
        Record::Cluster(cluster) => {
            let lines: Vec<String> = cluster
                .members
                .iter()
                .map(|member| {
                    let mut member_line = String::new();
                    push_fields(&mut member_line, member);
                    push_column(&mut member_line, cluster.id);
                    member_line
                })
                .collect();
            line = lines.join("\n");
        }
        Record::BaseCoverage(coverage) => {
            line.push_str(&coverage.chrom);
            push_column(&mut line, coverage.covered_bp);
        }
    }

    line
}

/// Number of output lines a record produces.
pub fn line_count(record: &Record) -> usize {
    match record {
        Record::Cluster(cluster) => cluster.members.len(),
        _ => 1,
    }
}

/// Write one record, returning the number of lines written.
pub fn write_record<W: Write + ?Sized>(writer: &mut W, record: &Record, layout: &OutputLayout) -> Result<usize> {
    let lines = line_count(record);
    if lines > 0 {
        writeln!(writer, "{}", format_record(record, layout))?;
    }
    Ok(lines)
}

/// Write all records in order, returning the number of lines written.
pub fn write_records<W, I>(writer: &mut W, records: I, layout: &OutputLayout) -> Result<usize>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = Record>,
{
    let mut lines = 0;
    for record in records {
        lines += write_record(writer, &record, layout)?;
    }
    Ok(lines)
}
