//! Relational operations: overlap join and coverage density.

use crate::config::JoinFill;
use crate::ops::overlap::{find_overlapping, has_overlap, merge_overlapping};
use crate::store::ChromIntervals;
use crate::types::{CoverageRecord, Interval, JoinRecord};

/// Every overlapping `(first, second)` pair, first-input order.
///
/// Fill modes add outer-join rows: unmatched first-input records (left) and,
/// after all pairs, unmatched second-input records (right).
pub fn join(first: &ChromIntervals, second: &ChromIntervals, fill: JoinFill) -> Vec<JoinRecord> {
    let mut results = Vec::new();

    for a in first.iter() {
        let before = results.len();
        results.extend(find_overlapping(a, second).map(|b| JoinRecord {
            first: Some(a.clone()),
            second: Some(b.clone()),
        }));
        if results.len() == before && fill.keeps_left() {
            results.push(JoinRecord {
                first: Some(a.clone()),
                second: None,
            });
        }
    }

    if fill.keeps_right() {
        results.extend(
            second
                .iter()
                .filter(|b| !has_overlap(b, first))
                .map(|b| JoinRecord {
                    first: None,
                    second: Some(b.clone()),
                }),
        );
    }

    results
}

/// Overlap totals of every first-input interval against the targets.
///
/// Without `merge_targets` each overlapping target contributes its own
/// overlap, so overlapping targets are counted more than once.
pub fn coverage_density(
    first: &ChromIntervals,
    second: &ChromIntervals,
    merge_targets: bool,
) -> Vec<CoverageRecord> {
    let merged;
    let targets = if merge_targets {
        merged = ChromIntervals::new(merge_overlapping(second.as_slice(), 0));
        &merged
    } else {
        second
    };

    first
        .iter()
        .map(|a| {
            let overlap_bp: i64 = find_overlapping(a, targets).map(|b| a.overlap_len(b)).sum();
            CoverageRecord {
                interval: a.clone(),
                overlap_bp,
                percentage: coverage_percentage(overlap_bp, a.length()),
            }
        })
        .collect()
}

/// `overlap_bp / length * 100`, rounded half away from zero to two decimals.
///
/// Zero-length intervals report 0.
pub fn coverage_percentage(overlap_bp: i64, length: i64) -> f64 {
    if length <= 0 {
        return 0.0;
    }
    let percentage = overlap_bp as f64 / length as f64 * 100.0;
    (percentage * 100.0).round() / 100.0
}

/// Number of overlapping pairs, counted from the first input's side.
pub fn count_overlapping_pairs(first: &ChromIntervals, second: &ChromIntervals) -> usize {
    first
        .iter()
        .map(|a: &Interval| find_overlapping(a, second).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrom(spans: &[(i64, i64)]) -> ChromIntervals {
        ChromIntervals::new(
            spans
                .iter()
                .map(|&(s, e)| Interval::new("chr1", s, e))
                .collect(),
        )
    }

    fn pairs(records: &[JoinRecord]) -> Vec<(Option<(i64, i64)>, Option<(i64, i64)>)> {
        records
            .iter()
            .map(|r| {
                (
                    r.first.as_ref().map(Interval::span),
                    r.second.as_ref().map(Interval::span),
                )
            })
            .collect()
    }

    #[test]
    fn test_join_many_to_many() {
        let a = chrom(&[(0, 100), (50, 150)]);
        let b = chrom(&[(40, 60), (90, 95), (200, 300)]);
        assert_eq!(
            pairs(&join(&a, &b, JoinFill::None)),
            vec![
                (Some((0, 100)), Some((40, 60))),
                (Some((0, 100)), Some((90, 95))),
                (Some((50, 150)), Some((40, 60))),
                (Some((50, 150)), Some((90, 95))),
            ]
        );
    }

    #[test]
    fn test_join_fill_modes() {
        let a = chrom(&[(0, 10), (100, 110)]);
        let b = chrom(&[(5, 8), (500, 510)]);

        assert_eq!(
            pairs(&join(&a, &b, JoinFill::Left)),
            vec![(Some((0, 10)), Some((5, 8))), (Some((100, 110)), None)]
        );
        assert_eq!(
            pairs(&join(&a, &b, JoinFill::Right)),
            vec![(Some((0, 10)), Some((5, 8))), (None, Some((500, 510)))]
        );
        assert_eq!(join(&a, &b, JoinFill::Both).len(), 3);
    }

    #[test]
    fn test_pair_count_is_symmetric() {
        let a = chrom(&[(0, 100), (50, 150), (300, 400)]);
        let b = chrom(&[(40, 60), (90, 95), (120, 310)]);
        let joined = join(&a, &b, JoinFill::None).len();
        assert_eq!(joined, count_overlapping_pairs(&a, &b));
        assert_eq!(joined, count_overlapping_pairs(&b, &a));
    }

    #[test]
    fn test_coverage_density() {
        let a = chrom(&[(0, 100), (200, 300), (400, 403)]);
        let b = chrom(&[(10, 30), (50, 60), (250, 400)]);
        let records = coverage_density(&a, &b, false);

        assert_eq!(records[0].overlap_bp, 30);
        assert_eq!(records[0].percentage, 30.0);
        assert_eq!(records[1].overlap_bp, 50);
        assert_eq!(records[1].percentage, 50.0);
        // No overlap is still reported
        assert_eq!(records[2].overlap_bp, 0);
        assert_eq!(records[2].percentage, 0.0);
    }

    #[test]
    fn test_coverage_counts_overlapping_targets_twice() {
        let a = chrom(&[(0, 100)]);
        let b = chrom(&[(0, 80), (20, 100)]);
        let summed = coverage_density(&a, &b, false);
        assert_eq!(summed[0].overlap_bp, 160);
        assert_eq!(summed[0].percentage, 160.0);

        let merged = coverage_density(&a, &b, true);
        assert_eq!(merged[0].overlap_bp, 100);
        assert_eq!(merged[0].percentage, 100.0);
    }

    #[test]
    fn test_coverage_percentage_rounding() {
        assert_eq!(coverage_percentage(1, 3), 33.33);
        assert_eq!(coverage_percentage(2, 3), 66.67);
        assert_eq!(coverage_percentage(5, 0), 0.0);
    }
}
