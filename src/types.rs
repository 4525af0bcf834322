//! Core data structures for gops.
//!
//! This module contains the interval model shared by every operation and the
//! typed result records the operations produce.

use std::fmt;
use std::str::FromStr;

use crate::config::ColumnMapping;
use crate::error::{IntervalError, Result};

/// Strand orientation for genomic features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Positive,
    Negative,
    /// `.`: strand not known or not applicable.
    Unknown,
}

/// Error type for parsing strand from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStrandError;

impl fmt::Display for ParseStrandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid strand: expected '+', '-' or '.'")
    }
}

impl std::error::Error for ParseStrandError {}

impl FromStr for Strand {
    type Err = ParseStrandError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Positive),
            "-" => Ok(Strand::Negative),
            "." => Ok(Strand::Unknown),
            _ => Err(ParseStrandError),
        }
    }
}

impl Strand {
    /// Convert strand to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Positive => "+",
            Strand::Negative => "-",
            Strand::Unknown => ".",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A genomic interval in 0-based, half-open coordinates.
///
/// `extra` holds every raw field of the source record, so whole records can be
/// written back unchanged. Derived intervals (clipped segments) keep the
/// fields of the record they came from with the coordinates rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub chrom: String,
    pub start: i64,
    pub stop: i64,
    pub strand: Option<Strand>,
    pub extra: Vec<String>,
    /// Where chrom/start/stop/strand live inside `extra`.
    pub columns: ColumnMapping,
    /// 1-based source line, 0 for intervals built in code.
    pub line: usize,
}

impl Interval {
    /// Create a bare three-column interval.
    pub fn new(chrom: impl Into<String>, start: i64, stop: i64) -> Self {
        debug_assert!(start <= stop, "interval start after stop");
        let chrom = chrom.into();
        Interval {
            extra: vec![chrom.clone(), start.to_string(), stop.to_string()],
            chrom,
            start,
            stop,
            strand: None,
            columns: ColumnMapping::default(),
            line: 0,
        }
    }

    /// Create a bare interval carrying a strand column.
    pub fn stranded(chrom: impl Into<String>, start: i64, stop: i64, strand: Strand) -> Self {
        let mut interval = Interval::new(chrom, start, stop);
        interval.extra.push(strand.as_str().to_string());
        interval.columns.strand = Some(3);
        interval.strand = Some(strand);
        interval
    }

    /// A bare three-column interval written in the coordinate convention of
    /// `columns`: merged runs and gaps of a 1-based input get a 1-based start.
    pub fn derived(chrom: impl Into<String>, start: i64, stop: i64, columns: &ColumnMapping) -> Self {
        let mut interval = Interval::new(chrom, start, stop);
        interval.columns.one_based = columns.one_based;
        interval.extra[interval.columns.start] = (start + interval.columns.start_offset()).to_string();
        interval
    }

    /// Build an interval from the raw fields of a delimited record.
    ///
    /// Fails with `ColumnIndexOutOfRange` when a mapped column is missing,
    /// `MalformedRecord` when coordinates or strand do not parse, and
    /// `InvalidRange` when the (0-based) start is negative or past the stop.
    pub fn from_fields(extra: Vec<String>, columns: &ColumnMapping, line: usize) -> Result<Self> {
        let mut required = vec![
            ("chrom", columns.chrom),
            ("start", columns.start),
            ("stop", columns.stop),
        ];
        if let Some(strand) = columns.strand {
            required.push(("strand", strand));
        }
        if let Some((field, column)) = required.into_iter().find(|(_, c)| *c >= extra.len()) {
            return Err(IntervalError::ColumnIndexOutOfRange {
                line,
                field,
                column,
                fields: extra.len(),
            });
        }

        let raw_start = parse_coordinate(&extra[columns.start], "start", line)?;
        let stop = parse_coordinate(&extra[columns.stop], "stop", line)?;
        let start = raw_start
            .checked_sub(columns.start_offset())
            .ok_or(IntervalError::InvalidRange {
                line,
                start: raw_start,
                stop,
            })?;
        if start < 0 || start > stop {
            return Err(IntervalError::InvalidRange { line, start, stop });
        }

        let strand = match columns.strand {
            Some(col) => Some(extra[col].trim().parse::<Strand>().map_err(|_| {
                IntervalError::MalformedRecord {
                    line,
                    field: "strand",
                    value: extra[col].clone(),
                }
            })?),
            None => None,
        };

        Ok(Interval {
            chrom: extra[columns.chrom].trim().to_string(),
            start,
            stop,
            strand,
            extra,
            columns: *columns,
            line,
        })
    }

    /// Copy of this record with new coordinates written into its fields.
    pub fn with_bounds(&self, start: i64, stop: i64) -> Interval {
        let mut interval = self.clone();
        interval.start = start;
        interval.stop = stop;
        interval.extra[self.columns.start] = (start + self.columns.start_offset()).to_string();
        interval.extra[self.columns.stop] = stop.to_string();
        interval
    }

    /// Interval length in bp (`stop - start`).
    pub fn length(&self) -> i64 {
        self.stop - self.start
    }

    /// Half-open overlap test on the same chromosome.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.chrom == other.chrom && self.start < other.stop && other.start < self.stop
    }

    /// Number of bases shared with `other`, 0 when disjoint.
    pub fn overlap_len(&self, other: &Interval) -> i64 {
        if self.chrom != other.chrom {
            return 0;
        }
        (self.stop.min(other.stop) - self.start.max(other.start)).max(0)
    }

    /// Gap in bp between the two intervals; 0 if they overlap or touch.
    ///
    /// Intervals on different chromosomes are infinitely far apart.
    pub fn distance_to(&self, other: &Interval) -> i64 {
        if self.chrom != other.chrom {
            return i64::MAX;
        }
        if self.overlaps(other) {
            0
        } else if other.start >= self.stop {
            other.start - self.stop
        } else {
            (self.start - other.stop).max(0)
        }
    }

    /// Number of raw fields in the source record.
    pub fn width(&self) -> usize {
        self.extra.len()
    }

    /// Coordinates as a tuple, handy for comparisons.
    pub fn span(&self) -> (i64, i64) {
        (self.start, self.stop)
    }
}

fn parse_coordinate(value: &str, field: &'static str, line: usize) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| IntervalError::MalformedRecord {
            line,
            field,
            value: value.to_string(),
        })
}

/// Which input a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    First,
    Second,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::First => "1",
            Source::Second => "2",
        }
    }
}

/// A record annotated with its input (union without merging).
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedInterval {
    pub source: Source,
    pub interval: Interval,
}

/// A joined pair. One side is `None` only for outer-join fill rows.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRecord {
    pub first: Option<Interval>,
    pub second: Option<Interval>,
}

/// Overlap totals for one first-input interval.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRecord {
    pub interval: Interval,
    pub overlap_bp: i64,
    /// `overlap_bp / length * 100`, rounded to two decimals.
    pub percentage: f64,
}

/// Nearest target found for a query interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityRecord {
    pub query: Interval,
    pub target: Interval,
    pub distance: i64,
}

/// Members of one reported cluster, numbered from 1 within a chromosome.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRecord {
    pub id: usize,
    pub members: Vec<Interval>,
}

/// Bases covered by the merged first input on one chromosome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseCoverageRecord {
    pub chrom: String,
    pub covered_bp: i64,
}

/// Any record an operation can hand to the output adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Interval(Interval),
    Sourced(SourcedInterval),
    Join(JoinRecord),
    Coverage(CoverageRecord),
    Proximity(ProximityRecord),
    Cluster(ClusterRecord),
    BaseCoverage(BaseCoverageRecord),
}
