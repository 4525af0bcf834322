//! Unit tests for the public gops API.
//!
//! Grouped by component: loading, overlap engine, set operations,
//! relational operations, proximity, clustering and the engine itself.

use std::io::{BufRead, BufReader, Cursor};

use pretty_assertions::assert_eq;
use rstest::*;

use gops::config::{
    ClusterOutput, ClusterParams, ColumnMapping, JoinFill, Operation, OperationConfig,
    OverlapMode, ProximityParams, SizeFilter, UnionMode,
};
use gops::engine::{CancelToken, Engine};
use gops::error::IntervalError;
use gops::ops;
use gops::output::{format_record, OutputLayout};
use gops::parser::{read_build, read_store};
use gops::store::{ChromIntervals, ChromosomeBuild, IntervalStore, LoadFilter};
use gops::types::{Interval, Record, Strand};

// -------------------------------------------------------------------------
// Helper functions
// -------------------------------------------------------------------------

fn reader(content: &str) -> Box<dyn BufRead + Send> {
    Box::new(BufReader::new(Cursor::new(content.as_bytes().to_vec())))
}

fn store_from(content: &str) -> IntervalStore {
    read_store(reader(content), ColumnMapping::default(), LoadFilter::default()).unwrap()
}

fn chrom(spans: &[(i64, i64)]) -> ChromIntervals {
    ChromIntervals::new(
        spans
            .iter()
            .map(|&(s, e)| Interval::new("chr1", s, e))
            .collect(),
    )
}

fn spans(intervals: &[Interval]) -> Vec<(i64, i64)> {
    intervals.iter().map(Interval::span).collect()
}

fn run(config: &OperationConfig, first: &IntervalStore, second: Option<&IntervalStore>) -> Vec<String> {
    let engine = Engine::new(config, first, second, None).unwrap();
    let layout = engine.layout();
    engine
        .run(&CancelToken::new())
        .unwrap()
        .map(|r| format_record(&r, &layout))
        .collect()
}

/// A fixed pseudo-random interval set, so properties are checked on more
/// than hand-picked cases.
fn scattered(seed: u64, count: usize) -> Vec<(i64, i64)> {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 33) as i64
    };
    (0..count)
        .map(|_| {
            let start = next() % 10_000;
            let len = 1 + next() % 300;
            (start, start + len)
        })
        .collect()
}

// -------------------------------------------------------------------------
// 1. Loading
// -------------------------------------------------------------------------

mod test_loading {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case("chr1\tabc\t200\n", "start")]
    #[case("chr1\t100\tx\n", "stop")]
    fn test_malformed_coordinates(#[case] content: &str, #[case] expected_field: &str) {
        let err = read_store(reader(content), ColumnMapping::default(), LoadFilter::default()).unwrap_err();
        match err {
            IntervalError::MalformedRecord { line, field, .. } => {
                assert_eq!(line, 1);
                assert_eq!(field, expected_field);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_invalid_range_reports_line() {
        let err = read_store(
            reader("# header\nchr1\t1\t2\nchr1\t300\t200\n"),
            ColumnMapping::default(),
            LoadFilter::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            IntervalError::InvalidRange { line: 3, start: 300, stop: 200 }
        ));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_column_out_of_range() {
        let columns = ColumnMapping {
            stop: 4,
            ..ColumnMapping::default()
        };
        let err = read_store(reader("chr1\t1\t2\n"), columns, LoadFilter::default()).unwrap_err();
        assert!(matches!(
            err,
            IntervalError::ColumnIndexOutOfRange { line: 1, field: "stop", column: 4, fields: 3 }
        ));
    }

    #[test]
    fn test_skips_headers_and_keeps_fields() {
        let store = store_from("track name=x\nbrowser position chr1\n\nchr1\t5\t9\tname\t0\t-\n");
        assert_eq!(store.total_count(), 1);
        assert_eq!(store.width(), 6);
        let interval = store.intervals_for("chr1").next().unwrap();
        assert_eq!(interval.extra[3], "name");
    }

    #[test]
    fn test_gff_is_converted_to_half_open() {
        let gff = "chr1\tsrc\tgene\t1\t100\t.\t-\t.\tID=g1\n";
        let store = read_store(reader(gff), ColumnMapping::gff(), LoadFilter::default()).unwrap();
        let gene = store.intervals_for("chr1").next().unwrap();
        assert_eq!(gene.span(), (0, 100));
        assert_eq!(gene.length(), 100);
        assert_eq!(gene.strand, Some(Strand::Negative));
    }

    #[test]
    fn test_restrict_chrom_at_load() {
        let store = read_store(
            reader("chr1\t0\t10\nchr2\t0\t10\nchr2\t20\t30\n"),
            ColumnMapping::default(),
            LoadFilter::chrom("chr2"),
        )
        .unwrap();
        assert_eq!(store.chromosomes().collect::<Vec<_>>(), vec!["chr2"]);
        assert_eq!(store.total_count(), 2);
    }

    #[test]
    fn test_zero_length_records_follow_min_size() {
        let content = "chr1\t50\t50\nchr1\t70\t80\n";
        let build: ChromosomeBuild = vec![("chr1", 100)].into_iter().collect();

        let config = OperationConfig::new(Operation::Complement);
        let store = read_store(reader(content), ColumnMapping::default(), config.load_filter()).unwrap();
        assert_eq!(store.total_count(), 1);

        // Complementing twice gives back what was loaded
        let gaps = ops::complement("chr1", store.get_or_empty("chr1"), 100, 1, &config.columns1);
        assert_eq!(spans(&gaps), vec![(0, 70), (80, 100)]);
        let back = ops::complement("chr1", &ChromIntervals::new(gaps), 100, 1, &config.columns1);
        assert_eq!(spans(&back), vec![(70, 80)]);

        let engine = Engine::new(&config, &store, None, Some(&build)).unwrap();
        let layout = engine.layout();
        let lines: Vec<_> = engine
            .run(&CancelToken::new())
            .unwrap()
            .map(|r| format_record(&r, &layout))
            .collect();
        assert_eq!(lines, vec!["chr1\t0\t70", "chr1\t80\t100"]);

        let mut config = OperationConfig::new(Operation::Intersect(OverlapMode::Whole));
        config.size.min_size = 0;
        let store = read_store(reader(content), ColumnMapping::default(), config.load_filter()).unwrap();
        assert_eq!(store.total_count(), 2);
    }

    #[test]
    fn test_build_loader() {
        let build = read_build(Cursor::new("chr1\t1000\nchr2\t500\n")).unwrap();
        assert_eq!(build.length("chr1"), Some(1000));
        assert!(matches!(
            build.require("chr3"),
            Err(IntervalError::UnknownChromosome(_))
        ));
    }
}

// -------------------------------------------------------------------------
// 2. Overlap engine
// -------------------------------------------------------------------------

mod test_overlap_engine {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case(&[(1, 5), (3, 9), (9, 12), (20, 22)])]
    #[case(&[(0, 100), (10, 20), (30, 40), (100, 101)])]
    #[case(&[(7, 7), (7, 8), (50, 60)])]
    fn test_merge_is_idempotent(#[case] input: &[(i64, i64)]) {
        let store = chrom(input);
        let once = ops::merge_overlapping(store.as_slice(), 0);
        let twice = ops::merge_overlapping(&once, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_is_idempotent_on_scattered_input() {
        let store = chrom(&scattered(7, 500));
        let once = ops::merge_overlapping(store.as_slice(), 0);
        let twice = ops::merge_overlapping(&once, 0);
        assert_eq!(spans(&once), spans(&twice));
        // Runs are ascending and separated by real gaps
        assert!(once.windows(2).all(|w| w[0].stop < w[1].start));
    }

    #[test]
    fn test_find_overlapping_matches_brute_force() {
        let targets = chrom(&scattered(11, 400));
        for &(s, e) in &scattered(13, 100) {
            let query = Interval::new("chr1", s, e);
            let mut expected: Vec<_> = targets
                .iter()
                .filter(|t| t.overlaps(&query))
                .map(Interval::span)
                .collect();
            expected.sort();
            let mut found: Vec<_> = ops::find_overlapping(&query, &targets)
                .map(Interval::span)
                .collect();
            found.sort();
            assert_eq!(found, expected, "query {:?}", (s, e));
        }
    }
}

// -------------------------------------------------------------------------
// 3. Set operations
// -------------------------------------------------------------------------

mod test_set_operations {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_intersect_and_subtract_scenario() {
        let a = chrom(&[(100, 200)]);
        let b = chrom(&[(150, 180)]);
        assert_eq!(spans(&ops::intersect_segments(&a, &b, 1)), vec![(150, 180)]);
        assert_eq!(
            spans(&ops::subtract_segments(&a, &b, 1)),
            vec![(100, 150), (180, 200)]
        );
    }

    #[test]
    fn test_union_merges_touching() {
        let a = chrom(&[(10, 20), (20, 30)]);
        assert_eq!(
            spans(&ops::union_merge(&a, ChromIntervals::empty(), 0, &ColumnMapping::default())),
            vec![(10, 30)]
        );
    }

    #[rstest]
    #[case(1, 2)]
    #[case(3, 5)]
    #[case(17, 19)]
    fn test_whole_operations_partition_first_input(#[case] seed_a: u64, #[case] seed_b: u64) {
        let a = chrom(&scattered(seed_a, 200));
        let b = chrom(&scattered(seed_b, 50));

        let kept = ops::intersect_whole(&a, &b);
        let dropped = ops::subtract_whole(&a, &b);
        assert_eq!(kept.len() + dropped.len(), a.len());

        let mut rebuilt: Vec<_> = kept.iter().chain(dropped.iter()).map(Interval::span).collect();
        rebuilt.sort();
        assert_eq!(rebuilt, spans(a.as_slice()));
        assert!(kept.iter().all(|k| !dropped.contains(k)));
    }

    #[test]
    fn test_complement_round_trip() {
        let length = 12_000;
        let a = chrom(&scattered(23, 150));

        let columns = ColumnMapping::default();
        let gaps = ops::complement("chr1", &a, length, 0, &columns);
        let back = ops::complement("chr1", &ChromIntervals::new(gaps), length, 0, &columns);
        let merged = ops::merge_overlapping(a.as_slice(), 0);
        assert_eq!(spans(&back), spans(&merged));
    }

    #[test]
    fn test_total_base_coverage() {
        let store = store_from("chr1\t0\t10\nchr1\t5\t15\nchr2\t0\t100\n");
        assert_eq!(ops::total_base_coverage(&store), 115);
    }
}

// -------------------------------------------------------------------------
// 4. Relational operations
// -------------------------------------------------------------------------

mod test_relational {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_join_pair_count_matches_both_directions() {
        let a = chrom(&scattered(31, 150));
        let b = chrom(&scattered(37, 150));

        let joined = ops::join(&a, &b, JoinFill::None).len();
        let from_a: usize = a.iter().map(|x| ops::find_overlapping(x, &b).count()).sum();
        let from_b: usize = b.iter().map(|y| ops::find_overlapping(y, &a).count()).sum();
        assert_eq!(joined, from_a);
        assert_eq!(joined, from_b);
    }

    #[test]
    fn test_coverage_bounds_with_disjoint_targets() {
        let a = chrom(&scattered(41, 200));
        let b = ChromIntervals::new(ops::merge_overlapping(chrom(&scattered(43, 100)).as_slice(), 0));

        for record in ops::coverage_density(&a, &b, false) {
            let length = record.interval.length();
            assert!(record.overlap_bp <= length);
            assert!(record.percentage >= 0.0 && record.percentage <= 100.0);
            if record.overlap_bp == length {
                assert_eq!(record.percentage, 100.0);
            }
        }
    }

    #[test]
    fn test_coverage_zero_overlap_reported() {
        let a = chrom(&[(0, 10)]);
        let b = chrom(&[(50, 60)]);
        let records = ops::coverage_density(&a, &b, false);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].overlap_bp, 0);
        assert_eq!(records[0].percentage, 0.0);
    }

    #[rstest]
    #[case(1, 3, 33.33)]
    #[case(1, 8, 12.5)]
    #[case(2, 3, 66.67)]
    #[case(0, 10, 0.0)]
    fn test_percentage_rounding(#[case] bp: i64, #[case] length: i64, #[case] expected: f64) {
        assert_eq!(ops::coverage_percentage(bp, length), expected);
    }
}

// -------------------------------------------------------------------------
// 5. Proximity
// -------------------------------------------------------------------------

mod test_proximity {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_omitted_when_nothing_in_window() {
        let a = chrom(&[(1000, 1100)]);
        let b = chrom(&[(0, 10)]);
        let params = ProximityParams {
            upstream: Some(100),
            downstream: Some(100),
            ..Default::default()
        };
        assert!(ops::proximity(&a, &b, &params).is_empty());
    }

    #[test]
    fn test_unbounded_matches_brute_force() {
        let a = chrom(&scattered(51, 60));
        let b = chrom(&scattered(53, 40));
        let params = ProximityParams::default();

        for query in a.iter() {
            let expected = b
                .iter()
                .min_by_key(|t| (query.distance_to(t), t.start, t.stop))
                .map(|t| (t.span(), query.distance_to(t)));
            let found = ops::nearest(query, &b, &params).map(|(t, d)| (t.span(), d));
            assert_eq!(found, expected, "query {:?}", query.span());
        }
    }

    #[test]
    fn test_strand_aware_upstream() {
        let query = Interval::stranded("chr1", 1000, 1100, Strand::Negative);
        let a = ChromIntervals::new(vec![query]);
        // Left of a '-' feature is downstream, right is upstream
        let b = chrom(&[(900, 950), (1300, 1400)]);
        let params = ProximityParams {
            upstream: Some(500),
            downstream: Some(0),
            strand_aware: true,
            ..Default::default()
        };
        let records = ops::proximity(&a, &b, &params);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target.span(), (1300, 1400));
        assert_eq!(records[0].distance, 200);
    }
}

// -------------------------------------------------------------------------
// 6. Clustering
// -------------------------------------------------------------------------

mod test_clustering {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cluster_scenario() {
        let input = chrom(&[(0, 10), (15, 25), (1000, 1010)]);
        let clusters = ops::find_clusters(input.as_slice(), 10, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(spans(clusters[0].members()), vec![(0, 10), (15, 25)]);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(5, 2)]
    #[case(50, 3)]
    fn test_cluster_validity(#[case] cluster_size: i64, #[case] num_region: usize) {
        let input = chrom(&scattered(61, 300));
        for cluster in ops::find_clusters(input.as_slice(), cluster_size, num_region) {
            assert!(cluster.len() >= num_region);
            let mut max_stop = i64::MIN;
            for member in cluster.members() {
                if max_stop != i64::MIN {
                    assert!(member.start - max_stop <= cluster_size);
                }
                max_stop = max_stop.max(member.stop);
            }
        }
    }

    #[test]
    fn test_single_mode_reports_bounding_interval() {
        let input = chrom(&[(0, 10), (15, 25), (1000, 1010)]);
        let params = ClusterParams {
            cluster_size: 10,
            num_region: 2,
            output: ClusterOutput::Bounding,
        };
        assert_eq!(
            ops::cluster(&input, &params),
            vec![Record::Interval(Interval::new("chr1", 0, 25))]
        );
    }
}

// -------------------------------------------------------------------------
// 7. Engine and configuration
// -------------------------------------------------------------------------

mod test_engine {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_invalid_configs_rejected() {
        let a = store_from("chr1\t0\t10\n");

        let mut config = OperationConfig::new(Operation::Subtract(OverlapMode::Whole));
        config.size = SizeFilter {
            min_size: 10,
            max_size: Some(5),
            restrict: true,
        };
        assert!(matches!(
            Engine::new(&config, &a, Some(&a), None),
            Err(IntervalError::InvalidConfig(_))
        ));

        let config = OperationConfig::new(Operation::Cluster(ClusterParams {
            num_region: 0,
            ..Default::default()
        }));
        assert!(matches!(
            Engine::new(&config, &a, None, None),
            Err(IntervalError::InvalidConfig(_))
        ));

        let mut config = OperationConfig::new(Operation::BaseCoverage);
        config.columns1 = ColumnMapping {
            stop: 1,
            ..ColumnMapping::default()
        };
        assert!(matches!(
            Engine::new(&config, &a, None, None),
            Err(IntervalError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_secondary_for_join() {
        let a = store_from("chr1\t0\t10\n");
        let b = store_from("");
        let config = OperationConfig::new(Operation::Join(JoinFill::None));
        assert!(matches!(
            Engine::new(&config, &a, Some(&b), None),
            Err(IntervalError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_join_output_keeps_both_records() {
        let a = store_from("chr1\t0\t100\tpeakA\nchr1\t500\t600\tpeakB\n");
        let b = store_from("chr1\t50\t60\tgene1\t0\t+\n");

        let config = OperationConfig::new(Operation::Join(JoinFill::None));
        assert_eq!(
            run(&config, &a, Some(&b)),
            vec!["chr1\t0\t100\tpeakA\tchr1\t50\t60\tgene1\t0\t+"]
        );

        let config = OperationConfig::new(Operation::Join(JoinFill::Left));
        assert_eq!(
            run(&config, &a, Some(&b)),
            vec![
                "chr1\t0\t100\tpeakA\tchr1\t50\t60\tgene1\t0\t+",
                "chr1\t500\t600\tpeakB\t.\t.\t.\t.\t.\t.",
            ]
        );
    }

    #[test]
    fn test_union_lists_output() {
        let a = store_from("chr1\t10\t20\n");
        let b = store_from("chr1\t5\t8\nchr2\t0\t1\n");
        let config = OperationConfig::new(Operation::Union(UnionMode::Lists));
        assert_eq!(
            run(&config, &a, Some(&b)),
            vec!["chr1\t5\t8\t2", "chr1\t10\t20\t1", "chr2\t0\t1\t2"]
        );
    }

    #[test]
    fn test_coverage_output() {
        let a = store_from("chr1\t0\t3\n");
        let b = store_from("chr1\t2\t10\n");
        let config = OperationConfig::new(Operation::CoverageDensity {
            merge_targets: false,
        });
        assert_eq!(run(&config, &a, Some(&b)), vec!["chr1\t0\t3\t1\t33.33"]);
    }

    #[test]
    fn test_complement_with_build() {
        let a = store_from("chr1\t100\t200\n");
        let build: ChromosomeBuild = vec![("chr1", 300), ("chr2", 50)].into_iter().collect();
        let config = OperationConfig::new(Operation::Complement);
        let engine = Engine::new(&config, &a, None, Some(&build)).unwrap();
        let layout = OutputLayout::default();
        let lines: Vec<_> = engine
            .run(&CancelToken::new())
            .unwrap()
            .map(|r| format_record(&r, &layout))
            .collect();
        assert_eq!(lines, vec!["chr1\t0\t100", "chr1\t200\t300", "chr2\t0\t50"]);
    }

    #[test]
    fn test_empty_first_input_yields_nothing() {
        let a = store_from("");
        let b = store_from("chr1\t0\t10\n");
        let config = OperationConfig::new(Operation::Intersect(OverlapMode::Segments));
        assert!(run(&config, &a, Some(&b)).is_empty());
    }
}
