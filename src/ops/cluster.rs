//! Single-input clustering.
//!
//! Intervals are walked in sorted order. An interval joins the current
//! cluster when the gap between its start and the furthest stop seen so far
//! is at most `cluster_size`; overlapping intervals always join.

use crate::config::{ClusterOutput, ClusterParams};
use crate::store::ChromIntervals;
use crate::types::{ClusterRecord, Interval, Record};

/// A run of sorted intervals forming one cluster.
#[derive(Debug, Clone, Copy)]
pub struct Cluster<'a> {
    members: &'a [Interval],
    stop: i64,
}

impl<'a> Cluster<'a> {
    pub fn members(&self) -> &'a [Interval] {
        self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// One interval from the first member's start to the furthest stop.
    pub fn bounding(&self) -> Option<Interval> {
        let first = self.members.first()?;
        Some(Interval::derived(
            first.chrom.clone(),
            first.start,
            self.stop,
            &first.columns,
        ))
    }

    /// Shortest member; the earliest one on ties.
    pub fn smallest(&self) -> Option<&'a Interval> {
        self.members
            .iter()
            .reduce(|best, i| if i.length() < best.length() { i } else { best })
    }

    /// Longest member; the earliest one on ties.
    pub fn largest(&self) -> Option<&'a Interval> {
        self.members
            .iter()
            .reduce(|best, i| if i.length() > best.length() { i } else { best })
    }
}

/// Clusters of sorted `intervals` with at least `num_region` members.
pub fn find_clusters(intervals: &[Interval], cluster_size: i64, num_region: usize) -> Vec<Cluster<'_>> {
    let mut clusters = Vec::new();
    let Some(first) = intervals.first() else {
        return clusters;
    };

    let mut begin = 0;
    let mut max_stop = first.stop;
    for (index, interval) in intervals.iter().enumerate().skip(1) {
        if interval.start - max_stop > cluster_size {
            push_cluster(&mut clusters, &intervals[begin..index], max_stop, num_region);
            begin = index;
            max_stop = interval.stop;
        } else {
            max_stop = max_stop.max(interval.stop);
        }
    }
    push_cluster(&mut clusters, &intervals[begin..], max_stop, num_region);

    clusters
}

fn push_cluster<'a>(clusters: &mut Vec<Cluster<'a>>, members: &'a [Interval], stop: i64, num_region: usize) {
    if members.len() >= num_region {
        clusters.push(Cluster { members, stop });
    }
}

/// Cluster one chromosome and shape the result per `params.output`.
///
/// Members output numbers clusters from 1 in positional order.
pub fn cluster(intervals: &ChromIntervals, params: &ClusterParams) -> Vec<Record> {
    let clusters = find_clusters(intervals.as_slice(), params.cluster_size, params.num_region);

    match params.output {
        ClusterOutput::Bounding => clusters
            .iter()
            .filter_map(Cluster::bounding)
            .map(Record::Interval)
            .collect(),
        ClusterOutput::Smallest => clusters
            .iter()
            .filter_map(Cluster::smallest)
            .map(|i| Record::Interval(i.clone()))
            .collect(),
        ClusterOutput::Largest => clusters
            .iter()
            .filter_map(Cluster::largest)
            .map(|i| Record::Interval(i.clone()))
            .collect(),
        ClusterOutput::Members => clusters
            .iter()
            .enumerate()
            .map(|(index, c)| {
                Record::Cluster(ClusterRecord {
                    id: index + 1,
                    members: c.members().to_vec(),
                })
            })
            .collect(),
    }
}
