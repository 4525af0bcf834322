//! Operation dispatch.
//!
//! The engine owns nothing: it borrows the loaded stores and the
//! configuration, decides which chromosomes to visit and in what order, and
//! runs the configured operation on each one. Chromosomes are independent, so
//! they can be processed on any number of threads as long as the results are
//! emitted in plan order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use rayon::prelude::*;

use crate::config::{Operation, OperationConfig, OverlapMode, UnionMode};
use crate::error::{IntervalError, Result};
use crate::ops;
use crate::output::OutputLayout;
use crate::store::{ChromIntervals, ChromosomeBuild, IntervalStore};
use crate::types::{BaseCoverageRecord, Interval, Record};

/// Shared flag checked between chromosomes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs one configured operation over borrowed inputs.
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    config: &'a OperationConfig,
    first: &'a IntervalStore,
    second: Option<&'a IntervalStore>,
    build: Option<&'a ChromosomeBuild>,
}

impl<'a> Engine<'a> {
    /// Validate the configuration against the inputs it was given.
    pub fn new(
        config: &'a OperationConfig,
        first: &'a IntervalStore,
        second: Option<&'a IntervalStore>,
        build: Option<&'a ChromosomeBuild>,
    ) -> Result<Self> {
        config.validate()?;
        let operation = &config.operation;

        if operation.uses_second_input() {
            let store = second.ok_or_else(|| {
                IntervalError::InvalidConfig(format!("{} needs a second input", operation.name()))
            })?;
            if operation.requires_second_input() {
                store.require_non_empty("second input")?;
            }
        }
        if matches!(operation, Operation::Complement) && build.is_none() {
            return Err(IntervalError::InvalidConfig(
                "complement needs a chromosome build".to_string(),
            ));
        }
        if let Some(chrom) = &config.restrict_chrom {
            if first.is_empty() {
                warn!("No intervals on {} in the first input", chrom);
            }
        }

        Ok(Engine {
            config,
            first,
            second,
            build,
        })
    }

    pub fn config(&self) -> &'a OperationConfig {
        self.config
    }

    /// Field widths used to pad outer-join rows.
    pub fn layout(&self) -> OutputLayout {
        OutputLayout {
            first_width: self.first.width(),
            second_width: self.second.map_or(0, IntervalStore::width),
        }
    }

    /// Chromosomes to process, in output order.
    ///
    /// First-input chromosomes always come first in order of appearance.
    /// Union and right-filled joins add second-input chromosomes; complement
    /// adds build chromosomes absent from the first input and fails upfront
    /// when a first-input chromosome has no length.
    pub fn plan(&self) -> Result<Vec<String>> {
        let mut chroms: Vec<String> = self.first.chromosomes().map(str::to_string).collect();

        match &self.config.operation {
            Operation::Union(_) => self.extend_with_second(&mut chroms),
            Operation::Join(fill) if fill.keeps_right() => self.extend_with_second(&mut chroms),
            Operation::Complement => {
                let build = self.build()?;
                for chrom in &chroms {
                    build.require(chrom)?;
                }
                let restrict = self.config.restrict_chrom.as_deref();
                let extra: Vec<String> = build
                    .chromosomes()
                    .filter(|c| !self.first.contains(c))
                    .filter(|c| restrict.map_or(true, |r| r == *c))
                    .map(str::to_string)
                    .collect();
                chroms.extend(extra);
            }
            _ => {}
        }

        Ok(chroms)
    }

    fn extend_with_second(&self, chroms: &mut Vec<String>) {
        if let Some(second) = self.second {
            chroms.extend(
                second
                    .chromosomes()
                    .filter(|c| !self.first.contains(c))
                    .map(str::to_string),
            );
        }
    }

    fn build(&self) -> Result<&'a ChromosomeBuild> {
        self.build.ok_or_else(|| {
            IntervalError::InvalidConfig("complement needs a chromosome build".to_string())
        })
    }

    fn second_for(&self, chrom: &str) -> &'a ChromIntervals {
        match self.second {
            Some(store) => store.get_or_empty(chrom),
            None => ChromIntervals::empty(),
        }
    }

    /// Run the operation on one chromosome.
    pub fn run_chromosome(&self, chrom: &str) -> Result<Vec<Record>> {
        let first = self.first.get_or_empty(chrom);
        let second = self.second_for(chrom);
        let size = &self.config.size;

        let records: Vec<Record> = match &self.config.operation {
            Operation::Union(UnionMode::Merge { distance }) => {
                intervals(ops::union_merge(first, second, *distance, &self.config.columns1))
            }
            Operation::Union(UnionMode::Lists) => ops::union_lists(first, second)
                .into_iter()
                .map(Record::Sourced)
                .collect(),
            Operation::Intersect(OverlapMode::Segments) => {
                intervals(ops::intersect_segments(first, second, size.min_size))
            }
            Operation::Intersect(OverlapMode::Whole) => intervals(ops::intersect_whole(first, second)),
            Operation::Subtract(OverlapMode::Segments) => {
                intervals(ops::subtract_segments(first, second, size.min_size))
            }
            Operation::Subtract(OverlapMode::Whole) => intervals(ops::subtract_whole(first, second)),
            Operation::Complement => {
                let length = self.build()?.require(chrom)?;
                intervals(ops::complement(
                    chrom,
                    first,
                    length,
                    size.min_size,
                    &self.config.columns1,
                ))
            }
            Operation::Join(fill) => ops::join(first, second, *fill)
                .into_iter()
                .map(Record::Join)
                .collect(),
            Operation::CoverageDensity { merge_targets } => {
                ops::coverage_density(first, second, *merge_targets)
                    .into_iter()
                    .map(Record::Coverage)
                    .collect()
            }
            Operation::Proximity(params) => ops::proximity(first, second, params)
                .into_iter()
                .map(Record::Proximity)
                .collect(),
            Operation::Cluster(params) => ops::cluster(first, params),
            Operation::BaseCoverage => {
                if first.is_empty() {
                    Vec::new()
                } else {
                    vec![Record::BaseCoverage(BaseCoverageRecord {
                        chrom: chrom.to_string(),
                        covered_bp: ops::base_coverage(first),
                    })]
                }
            }
        };

        let records = if self.config.operation.is_set_operation() && size.restrict {
            records
                .into_iter()
                .filter(|r| record_length(r).map_or(true, |len| size.accepts(len)))
                .collect()
        } else {
            records
        };

        debug!(
            "{}: {} records on {}",
            self.config.operation.name(),
            records.len(),
            chrom
        );
        Ok(records)
    }

    /// Run every planned chromosome on the rayon pool, keeping plan order.
    pub fn run(&self, cancel: &CancelToken) -> Result<impl Iterator<Item = Record>> {
        let plan = self.plan()?;
        let per_chrom = plan
            .par_iter()
            .map(|chrom| {
                if cancel.is_cancelled() {
                    return Err(IntervalError::Cancelled);
                }
                self.run_chromosome(chrom)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(per_chrom.into_iter().flatten())
    }

    /// Run every planned chromosome on the calling thread.
    pub fn run_sequential(&self, cancel: &CancelToken) -> Result<impl Iterator<Item = Record>> {
        let mut per_chrom = Vec::new();
        for chrom in self.plan()? {
            if cancel.is_cancelled() {
                return Err(IntervalError::Cancelled);
            }
            per_chrom.push(self.run_chromosome(&chrom)?);
        }
        Ok(per_chrom.into_iter().flatten())
    }
}

fn intervals(intervals: Vec<Interval>) -> Vec<Record> {
    intervals.into_iter().map(Record::Interval).collect()
}

fn record_length(record: &Record) -> Option<i64> {
    match record {
        Record::Interval(i) => Some(i.length()),
        Record::Sourced(s) => Some(s.interval.length()),
        _ => None,
    }
}
