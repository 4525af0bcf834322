//! Nearest-target search.
//!
//! Without a window the search is unbounded: the closest target anywhere on
//! the chromosome, where overlapping and touching targets are at distance 0.
//! With a window only targets intersecting `[start - upstream, stop +
//! downstream)` count, or lying fully inside it when `within` is set. Ties go
//! to the smaller start, then the smaller stop, then the earlier record.

use crate::config::ProximityParams;
use crate::ops::overlap::{contained_in, find_overlapping, overlapping};
use crate::store::ChromIntervals;
use crate::types::{Interval, ProximityRecord, Strand};

/// Nearest target for every first-input interval that has one.
pub fn proximity(
    first: &ChromIntervals,
    second: &ChromIntervals,
    params: &ProximityParams,
) -> Vec<ProximityRecord> {
    first
        .iter()
        .filter_map(|query| {
            nearest(query, second, params).map(|(target, distance)| ProximityRecord {
                query: query.clone(),
                target: target.clone(),
                distance,
            })
        })
        .collect()
}

/// Nearest target of `query` and its distance.
pub fn nearest<'a>(
    query: &Interval,
    targets: &'a ChromIntervals,
    params: &ProximityParams,
) -> Option<(&'a Interval, i64)> {
    if params.is_bounded() {
        nearest_in_window(query, targets, params)
    } else {
        nearest_unbounded(query, targets, params)
    }
}

/// Search window of `query`, clamped at 0.
///
/// For strand-aware searches a `-` query swaps the two flanks, so upstream
/// always points against the direction of transcription.
pub fn search_window(query: &Interval, params: &ProximityParams) -> (i64, i64) {
    let upstream = params.upstream.unwrap_or(0);
    let downstream = params.downstream.unwrap_or(0);
    let (left, right) = if params.strand_aware && query.strand == Some(Strand::Negative) {
        (downstream, upstream)
    } else {
        (upstream, downstream)
    };
    (
        query.start.saturating_sub(left).max(0),
        query.stop.saturating_add(right),
    )
}

fn strand_matches(query: &Interval, target: &Interval, params: &ProximityParams) -> bool {
    if !params.same_strand {
        return true;
    }
    match (query.strand, target.strand) {
        (Some(q), Some(t)) if q != Strand::Unknown && t != Strand::Unknown => q == t,
        _ => true,
    }
}

/// Ordering key: distance first, then position.
fn rank(query: &Interval, target: &Interval) -> (i64, i64, i64) {
    (query.distance_to(target), target.start, target.stop)
}

/// Keep `candidate` only when it ranks strictly better, so earlier records win ties.
fn closer<'a>(best: Option<&'a Interval>, candidate: &'a Interval, query: &Interval) -> Option<&'a Interval> {
    match best {
        Some(current) if rank(query, current) <= rank(query, candidate) => Some(current),
        _ => Some(candidate),
    }
}

fn nearest_in_window<'a>(
    query: &Interval,
    targets: &'a ChromIntervals,
    params: &ProximityParams,
) -> Option<(&'a Interval, i64)> {
    let (lo, hi) = search_window(query, params);
    let admissible = |best: Option<&'a Interval>, t: &'a Interval| {
        if strand_matches(query, t, params) {
            closer(best, t, query)
        } else {
            best
        }
    };
    // Containment also admits zero-length targets sitting on a window edge
    let best = if params.within {
        contained_in(targets, lo, hi).fold(None, admissible)
    } else {
        overlapping(targets, lo, hi).fold(None, admissible)
    };
    best.map(|t| (t, query.distance_to(t)))
}

fn nearest_unbounded<'a>(
    query: &Interval,
    targets: &'a ChromIntervals,
    params: &ProximityParams,
) -> Option<(&'a Interval, i64)> {
    // Sorted by (start, stop): the first admissible overlap is the best one
    let hit = find_overlapping(query, targets).find(|t| strand_matches(query, t, params));

    let slice = targets.as_slice();

    // Downstream side: first target starting at or after the query end
    let right = slice[slice.partition_point(|t| t.start < query.stop)..]
        .iter()
        .find(|t| strand_matches(query, t, params));

    // Upstream side: the admissible target with the largest stop, earliest among equals
    let by_stop = targets.by_stop();
    let bound = by_stop.partition_point(|&i| slice[i].stop <= query.start);
    let mut left: Option<&Interval> = None;
    for &index in by_stop[..bound].iter().rev() {
        let candidate = &slice[index];
        if let Some(found) = left {
            if candidate.stop != found.stop {
                break;
            }
        }
        if strand_matches(query, candidate, params) {
            left = Some(candidate);
        }
    }

    // A touching left neighbour ties with overlaps and may start earlier
    [left, hit, right]
        .into_iter()
        .flatten()
        .fold(None, |best, t| closer(best, t, query))
        .map(|t| (t, query.distance_to(t)))
}
