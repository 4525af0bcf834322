//! Overlap Engine: the primitives every other operation is built on.
//!
//! Targets are one chromosome's intervals sorted by start. A query first
//! binary-searches to the earliest target that could still reach it (its
//! start minus the longest target length), then scans forward while targets
//! start before the query stops. Cost per query is O(log n + k) plus the few
//! long-interval candidates inside the look-back window.

use crate::store::ChromIntervals;
use crate::types::Interval;

/// Index of the first interval whose start is `>= search_start`.
pub fn find_search_start_index(intervals: &[Interval], search_start: i64) -> usize {
    intervals.partition_point(|i| i.start < search_start)
}

/// Iterator over targets overlapping a half-open range, ascending by start.
pub struct Overlaps<'a> {
    targets: &'a [Interval],
    pos: usize,
    start: i64,
    stop: i64,
}

impl<'a> Iterator for Overlaps<'a> {
    type Item = &'a Interval;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(target) = self.targets.get(self.pos) {
            if target.start >= self.stop {
                // Sorted by start: nothing further can overlap
                self.pos = self.targets.len();
                return None;
            }
            self.pos += 1;
            if target.stop > self.start {
                return Some(target);
            }
        }
        None
    }
}

/// All targets overlapping `[start, stop)`.
pub fn overlapping(targets: &ChromIntervals, start: i64, stop: i64) -> Overlaps<'_> {
    let slice = targets.as_slice();
    let search_start = start.saturating_sub(targets.max_len());
    Overlaps {
        targets: slice,
        pos: find_search_start_index(slice, search_start),
        start,
        stop,
    }
}

/// All targets lying inside `[start, stop]`, zero-length ones at either end included.
pub fn contained_in(targets: &ChromIntervals, start: i64, stop: i64) -> impl Iterator<Item = &Interval> {
    let slice = targets.as_slice();
    slice[find_search_start_index(slice, start)..]
        .iter()
        .take_while(move |t| t.start <= stop)
        .filter(move |t| t.stop <= stop)
}

/// All targets overlapping `query`. Targets must be on the query's chromosome.
pub fn find_overlapping<'a>(query: &Interval, targets: &'a ChromIntervals) -> Overlaps<'a> {
    overlapping(targets, query.start, query.stop)
}

/// Whether any target overlaps `query`.
pub fn has_overlap(query: &Interval, targets: &ChromIntervals) -> bool {
    find_overlapping(query, targets).next().is_some()
}

/// Merge sorted `(start, stop)` spans into maximal runs.
///
/// Spans separated by a gap of at most `distance` bp are joined; with
/// `distance == 0` touching spans (`[10,20)`, `[20,30)`) merge as well.
pub fn merge_spans<I>(spans: I, distance: i64) -> Vec<(i64, i64)>
where
    I: IntoIterator<Item = (i64, i64)>,
{
    let mut merged: Vec<(i64, i64)> = Vec::new();
    for (start, stop) in spans {
        match merged.last_mut() {
            Some(current) if start <= current.1.saturating_add(distance) => {
                debug_assert!(start >= current.0, "spans must be sorted by start");
                current.1 = current.1.max(stop);
            }
            _ => merged.push((start, stop)),
        }
    }
    merged
}

/// Merge one chromosome's sorted intervals into non-overlapping runs.
///
/// The result carries only chromosome and coordinates, in the coordinate
/// convention of the input: a merged run has no single source record.
pub fn merge_overlapping(intervals: &[Interval], distance: i64) -> Vec<Interval> {
    let Some(first) = intervals.first() else {
        return Vec::new();
    };
    merge_spans(intervals.iter().map(Interval::span), distance)
        .into_iter()
        .map(|(start, stop)| Interval::derived(first.chrom.clone(), start, stop, &first.columns))
        .collect()
}

/// Total bases covered by non-overlapping spans.
pub fn covered_bases(spans: &[(i64, i64)]) -> i64 {
    spans.iter().map(|(start, stop)| stop - start).sum()
}
