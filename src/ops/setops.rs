//! Set operations: union, intersection, subtraction, complement.
//!
//! Every function works on one chromosome. The first input drives the output
//! order; the second input is only ever queried through the Overlap Engine.

use crate::config::ColumnMapping;
use crate::ops::overlap::{covered_bases, find_overlapping, has_overlap, merge_spans};
use crate::store::{ChromIntervals, IntervalStore};
use crate::types::{Interval, Source, SourcedInterval};

/// Both inputs merged into ascending, non-overlapping runs, written in the
/// coordinate convention of `columns`.
pub fn union_merge(
    first: &ChromIntervals,
    second: &ChromIntervals,
    distance: i64,
    columns: &ColumnMapping,
) -> Vec<Interval> {
    let Some(chrom) = first.iter().chain(second.iter()).next().map(|i| i.chrom.clone()) else {
        return Vec::new();
    };

    let spans = merge_sorted(first.as_slice(), second.as_slice())
        .into_iter()
        .map(|(_, interval)| interval.span());
    merge_spans(spans, distance)
        .into_iter()
        .map(|(start, stop)| Interval::derived(chrom.clone(), start, stop, columns))
        .collect()
}

/// Original records of both inputs, interleaved by position and labeled by source.
pub fn union_lists(first: &ChromIntervals, second: &ChromIntervals) -> Vec<SourcedInterval> {
    merge_sorted(first.as_slice(), second.as_slice())
        .into_iter()
        .map(|(source, interval)| SourcedInterval {
            source,
            interval: interval.clone(),
        })
        .collect()
}

/// Stable two-way merge of two sorted slices; the first input wins ties.
fn merge_sorted<'a>(first: &'a [Interval], second: &'a [Interval]) -> Vec<(Source, &'a Interval)> {
    let mut merged = Vec::with_capacity(first.len() + second.len());
    let (mut i, mut j) = (0, 0);
    while i < first.len() && j < second.len() {
        if second[j].span() < first[i].span() {
            merged.push((Source::Second, &second[j]));
            j += 1;
        } else {
            merged.push((Source::First, &first[i]));
            i += 1;
        }
    }
    merged.extend(first[i..].iter().map(|a| (Source::First, a)));
    merged.extend(second[j..].iter().map(|b| (Source::Second, b)));
    merged
}

/// For each first-input interval, the parts shared with each overlapping target.
pub fn intersect_segments(first: &ChromIntervals, second: &ChromIntervals, min_size: i64) -> Vec<Interval> {
    let mut results = Vec::new();
    for a in first.iter() {
        for b in find_overlapping(a, second) {
            let start = a.start.max(b.start);
            let stop = a.stop.min(b.stop);
            if stop - start >= min_size {
                results.push(a.with_bounds(start, stop));
            }
        }
    }
    results
}

/// First-input intervals with at least one overlap, each reported once.
pub fn intersect_whole(first: &ChromIntervals, second: &ChromIntervals) -> Vec<Interval> {
    first
        .iter()
        .filter(|a| has_overlap(a, second))
        .cloned()
        .collect()
}

/// For each first-input interval, the parts not covered by any target.
pub fn subtract_segments(first: &ChromIntervals, second: &ChromIntervals, min_size: i64) -> Vec<Interval> {
    let mut results = Vec::new();
    for a in first.iter() {
        let covered = merge_spans(find_overlapping(a, second).map(Interval::span), 0);
        if covered.is_empty() {
            if a.length() >= min_size {
                results.push(a.clone());
            }
            continue;
        }

        let mut pos = a.start;
        for (start, stop) in covered {
            if start - pos >= min_size && start > pos {
                results.push(a.with_bounds(pos, start));
            }
            pos = pos.max(stop);
        }
        if a.stop - pos >= min_size && a.stop > pos {
            results.push(a.with_bounds(pos, a.stop));
        }
    }
    results
}

/// First-input intervals with no overlap at all.
pub fn subtract_whole(first: &ChromIntervals, second: &ChromIntervals) -> Vec<Interval> {
    first
        .iter()
        .filter(|a| !has_overlap(a, second))
        .cloned()
        .collect()
}

/// Gaps between the merged intervals of one chromosome, from 0 to `length`.
///
/// Intervals reaching past the chromosome end are clipped to it. Gaps are
/// written in the coordinate convention of `columns`.
pub fn complement(
    chrom: &str,
    intervals: &ChromIntervals,
    length: i64,
    min_size: i64,
    columns: &ColumnMapping,
) -> Vec<Interval> {
    let spans = intervals
        .iter()
        .filter(|i| i.start < length)
        .map(|i| (i.start, i.stop.min(length)));

    let mut gaps = Vec::new();
    let mut pos = 0;
    for (start, stop) in merge_spans(spans, 0) {
        if start > pos && start - pos >= min_size {
            gaps.push(Interval::derived(chrom, pos, start, columns));
        }
        pos = pos.max(stop);
    }
    if length > pos && length - pos >= min_size {
        gaps.push(Interval::derived(chrom, pos, length, columns));
    }
    gaps
}

/// Bases covered by one chromosome's merged intervals.
pub fn base_coverage(intervals: &ChromIntervals) -> i64 {
    covered_bases(&merge_spans(intervals.iter().map(Interval::span), 0))
}

/// Bases covered by the merged intervals of a whole store.
pub fn total_base_coverage(store: &IntervalStore) -> i64 {
    store.iter().map(|(_, intervals)| base_coverage(intervals)).sum()
}
