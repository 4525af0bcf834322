//! Per-chromosome interval collections.
//!
//! A store is built once from loaded intervals and never mutated afterwards.
//! Sorting happens here, so every operation can rely on ascending
//! `(start, stop)` order without checking it.

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{IntervalError, Result};
use crate::types::Interval;

/// Chromosome-keyed map that remembers first-appearance order.
pub type ChromMap<V> = IndexMap<String, V, ahash::RandomState>;

static EMPTY: ChromIntervals = ChromIntervals {
    intervals: Vec::new(),
    max_len: 0,
    by_stop: Vec::new(),
};

/// Sorted intervals of a single chromosome.
#[derive(Debug, Clone, Default)]
pub struct ChromIntervals {
    intervals: Vec<Interval>,
    /// Longest interval, bounds how far back an overlap search must look.
    max_len: i64,
    /// Indices into `intervals` ordered by (stop, start).
    by_stop: Vec<usize>,
}

impl ChromIntervals {
    /// Sort `intervals` by `(start, stop)`. Ties keep their input order.
    pub fn new(mut intervals: Vec<Interval>) -> Self {
        intervals.sort_by(|a, b| a.start.cmp(&b.start).then(a.stop.cmp(&b.stop)));
        let max_len = intervals.iter().map(Interval::length).max().unwrap_or(0);

        let mut by_stop: Vec<usize> = (0..intervals.len()).collect();
        by_stop.sort_by(|&a, &b| intervals[a].stop.cmp(&intervals[b].stop).then(a.cmp(&b)));

        ChromIntervals {
            intervals,
            max_len,
            by_stop,
        }
    }

    /// A shared empty collection for chromosomes missing from one input.
    pub fn empty() -> &'static ChromIntervals {
        &EMPTY
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn max_len(&self) -> i64 {
        self.max_len
    }

    pub(crate) fn by_stop(&self) -> &[usize] {
        &self.by_stop
    }
}

/// Records a store drops while it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadFilter<'a> {
    /// Keep only this chromosome.
    pub restrict_chrom: Option<&'a str>,
    /// Keep zero-length records. Only a minimum size of 0 permits them.
    pub keep_empty: bool,
}

impl<'a> LoadFilter<'a> {
    /// Keep only `chrom`.
    pub fn chrom(chrom: &'a str) -> Self {
        LoadFilter {
            restrict_chrom: Some(chrom),
            ..Self::default()
        }
    }

    fn keeps_chrom(&self, chrom: &str) -> bool {
        self.restrict_chrom.map_or(true, |c| c == chrom)
    }
}

/// Intervals of one input, bucketed by chromosome.
#[derive(Debug, Clone, Default)]
pub struct IntervalStore {
    chroms: ChromMap<ChromIntervals>,
    total: usize,
    width: usize,
}

impl IntervalStore {
    /// Bucket and sort intervals, dropping what `filter` excludes.
    pub fn from_intervals<I>(intervals: I, filter: LoadFilter<'_>) -> Self
    where
        I: IntoIterator<Item = Interval>,
    {
        let mut buckets: ChromMap<Vec<Interval>> = ChromMap::default();
        let mut width = 0;
        let mut skipped = 0usize;
        let mut empty = 0usize;

        for interval in intervals {
            if !filter.keeps_chrom(&interval.chrom) {
                skipped += 1;
                continue;
            }
            if interval.length() == 0 && !filter.keep_empty {
                empty += 1;
                continue;
            }
            width = width.max(interval.width());
            buckets
                .entry(interval.chrom.clone())
                .or_default()
                .push(interval);
        }

        if skipped > 0 {
            debug!("Dropped {} intervals outside the restricted chromosome", skipped);
        }
        if empty > 0 {
            warn!("Dropped {} zero-length intervals (kept only with a minimum size of 0)", empty);
        }

        let mut total = 0;
        let chroms = buckets
            .into_iter()
            .map(|(chrom, intervals)| {
                total += intervals.len();
                (chrom, ChromIntervals::new(intervals))
            })
            .collect();

        IntervalStore {
            chroms,
            total,
            width,
        }
    }

    /// Chromosome names in order of first appearance.
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.chroms.keys().map(String::as_str)
    }

    /// Intervals of `chrom` ascending by start; empty for unknown chromosomes.
    pub fn intervals_for(&self, chrom: &str) -> std::slice::Iter<'_, Interval> {
        self.get_or_empty(chrom).iter()
    }

    pub fn get(&self, chrom: &str) -> Option<&ChromIntervals> {
        self.chroms.get(chrom)
    }

    pub fn get_or_empty(&self, chrom: &str) -> &ChromIntervals {
        self.chroms.get(chrom).unwrap_or(ChromIntervals::empty())
    }

    pub fn contains(&self, chrom: &str) -> bool {
        self.chroms.contains_key(chrom)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChromIntervals)> {
        self.chroms.iter().map(|(c, i)| (c.as_str(), i))
    }

    pub fn total_count(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Field count of the widest record.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Fail with `EmptyInput` when the store has no intervals.
    pub fn require_non_empty(&self, label: &str) -> Result<()> {
        if self.is_empty() {
            return Err(IntervalError::EmptyInput(label.to_string()));
        }
        Ok(())
    }
}

/// Chromosome lengths of a genome build.
#[derive(Debug, Clone, Default)]
pub struct ChromosomeBuild {
    lengths: ChromMap<i64>,
}

impl ChromosomeBuild {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chrom: impl Into<String>, length: i64) {
        self.lengths.insert(chrom.into(), length);
    }

    pub fn length(&self, chrom: &str) -> Option<i64> {
        self.lengths.get(chrom).copied()
    }

    /// Length of `chrom`, or `UnknownChromosome`.
    pub fn require(&self, chrom: &str) -> Result<i64> {
        self.length(chrom)
            .ok_or_else(|| IntervalError::UnknownChromosome(chrom.to_string()))
    }

    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.lengths.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for ChromosomeBuild {
    fn from_iter<T: IntoIterator<Item = (S, i64)>>(iter: T) -> Self {
        let mut build = ChromosomeBuild::new();
        for (chrom, length) in iter {
            build.insert(chrom, length);
        }
        build
    }
}
