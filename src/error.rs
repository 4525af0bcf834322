//! Error kinds raised by the interval engine.
//!
//! Parsing and validation errors are fatal for a run: they surface while a
//! store is being built, before any result line is produced. The absence of a
//! match is never an error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntervalError {
    #[error("line {line}: cannot parse {field} value '{value}', expected {}", expected_value(.field))]
    MalformedRecord {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: invalid range (start {start}, stop {stop}): {}", range_problem(.start, .stop))]
    InvalidRange { line: usize, start: i64, stop: i64 },

    #[error("line {line}: {field} column {column} is out of range for a record with {fields} fields")]
    ColumnIndexOutOfRange {
        line: usize,
        field: &'static str,
        column: usize,
        fields: usize,
    },

    #[error("chromosome '{0}' has no length in the chromosome build")]
    UnknownChromosome(String),

    #[error("{0} contains no intervals")]
    EmptyInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IntervalError>;

fn expected_value(field: &&'static str) -> &'static str {
    match *field {
        "strand" => "'+', '-' or '.'",
        "length" => "a non-negative integer",
        _ => "an integer",
    }
}

fn range_problem(start: &i64, stop: &i64) -> &'static str {
    if *start < 0 {
        "start is negative"
    } else if start > stop {
        "start is greater than stop"
    } else {
        "empty range"
    }
}
