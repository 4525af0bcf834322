//! Interval operations, each working on one chromosome at a time.

pub mod cluster;
pub mod overlap;
pub mod proximity;
pub mod relational;
pub mod setops;

pub use cluster::{cluster, find_clusters, Cluster};
pub use overlap::{find_overlapping, has_overlap, merge_overlapping, overlapping};
pub use proximity::{nearest, proximity};
pub use relational::{coverage_density, coverage_percentage, join};
pub use setops::{
    base_coverage, complement, intersect_segments, intersect_whole, subtract_segments,
    subtract_whole, total_base_coverage, union_lists, union_merge,
};
