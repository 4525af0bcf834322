//! Operation configuration.
//!
//! An [`OperationConfig`] is built once, validated, and then shared read-only
//! by every worker. The selected [`Operation`] carries only the parameters it
//! needs, so invalid flag combinations cannot be expressed.

use std::fmt;
use std::str::FromStr;

use crate::error::{IntervalError, Result};
use crate::store::LoadFilter;

/// Column positions (0-based) of the interval fields in a delimited record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub chrom: usize,
    pub start: usize,
    pub stop: usize,
    pub strand: Option<usize>,
    /// Records use 1-based closed coordinates (GFF/GTF).
    pub one_based: bool,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        ColumnMapping {
            chrom: 0,
            start: 1,
            stop: 2,
            strand: None,
            one_based: false,
        }
    }
}

impl ColumnMapping {
    /// Standard GFF/GTF layout: seqname, start, end and strand in columns 1, 4, 5 and 7.
    pub fn gff() -> Self {
        ColumnMapping {
            chrom: 0,
            start: 3,
            stop: 4,
            strand: Some(6),
            one_based: true,
        }
    }

    /// Highest column index a record must provide.
    pub fn max_index(&self) -> usize {
        let max = self.chrom.max(self.start).max(self.stop);
        match self.strand {
            Some(strand) => max.max(strand),
            None => max,
        }
    }

    /// Offset added to a 0-based start when writing it back into a record.
    pub fn start_offset(&self) -> i64 {
        if self.one_based {
            1
        } else {
            0
        }
    }

    /// Reject mappings that point two fields at the same column.
    pub fn validate(&self, label: &str) -> Result<()> {
        let mut columns = vec![
            ("chrom", self.chrom),
            ("start", self.start),
            ("stop", self.stop),
        ];
        if let Some(strand) = self.strand {
            columns.push(("strand", strand));
        }
        for (i, (name_a, col_a)) in columns.iter().enumerate() {
            for (name_b, col_b) in &columns[i + 1..] {
                if col_a == col_b {
                    return Err(IntervalError::InvalidConfig(format!(
                        "{label}: {name_a} and {name_b} both use column {col_a}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Length bounds applied to produced intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeFilter {
    /// Generated segments shorter than this are never emitted.
    pub min_size: i64,
    pub max_size: Option<i64>,
    /// Apply both bounds to every record a set operation emits.
    pub restrict: bool,
}

impl Default for SizeFilter {
    fn default() -> Self {
        SizeFilter {
            min_size: 1,
            max_size: None,
            restrict: false,
        }
    }
}

impl SizeFilter {
    /// Whether a generated segment of `length` bp is long enough to report.
    pub fn admits_segment(&self, length: i64) -> bool {
        length >= self.min_size
    }

    /// Post-filter for set operation output. A no-op unless `restrict` is set.
    pub fn accepts(&self, length: i64) -> bool {
        if !self.restrict {
            return true;
        }
        length >= self.min_size && self.max_size.map_or(true, |max| length <= max)
    }
}

/// How union combines the two inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionMode {
    /// Merge overlapping runs; intervals separated by at most `distance` bp merge too.
    Merge { distance: i64 },
    /// Emit the original records of both inputs without merging.
    Lists,
}

/// Granularity of intersection and subtraction results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapMode {
    /// Clip to the overlapping (or uncovered) sub-segments.
    Segments,
    /// Report whole first-input records.
    Whole,
}

/// Which unmatched records a join keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinFill {
    #[default]
    None,
    Left,
    Right,
    Both,
}

impl JoinFill {
    pub fn keeps_left(&self) -> bool {
        matches!(self, JoinFill::Left | JoinFill::Both)
    }

    pub fn keeps_right(&self) -> bool {
        matches!(self, JoinFill::Right | JoinFill::Both)
    }
}

/// Error type for parsing a join fill mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseJoinFillError;

impl fmt::Display for ParseJoinFillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid fill mode: expected 'none', 'left', 'right' or 'both'")
    }
}

impl std::error::Error for ParseJoinFillError {}

impl FromStr for JoinFill {
    type Err = ParseJoinFillError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(JoinFill::None),
            "left" => Ok(JoinFill::Left),
            "right" => Ok(JoinFill::Right),
            "both" => Ok(JoinFill::Both),
            _ => Err(ParseJoinFillError),
        }
    }
}

/// Parameters for nearest-feature search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProximityParams {
    /// Window upstream of the query, in bp. `None` on both sides means unbounded.
    pub upstream: Option<i64>,
    pub downstream: Option<i64>,
    /// Only accept targets lying completely inside the window.
    pub within: bool,
    /// Orient the window by the query strand (upstream is to the right on `-`).
    pub strand_aware: bool,
    /// Require the target strand to match the query strand when both are known.
    pub same_strand: bool,
}

impl ProximityParams {
    pub fn is_bounded(&self) -> bool {
        self.upstream.is_some() || self.downstream.is_some()
    }
}

/// Shape of the clustering output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterOutput {
    /// One interval spanning each cluster.
    Bounding,
    /// Every member, tagged with its cluster number.
    #[default]
    Members,
    /// The shortest member of each cluster.
    Smallest,
    /// The longest member of each cluster.
    Largest,
}

/// Error type for parsing a cluster output mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseClusterOutputError;

impl fmt::Display for ParseClusterOutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid cluster output: expected 'bounding', 'members', 'smallest' or 'largest'"
        )
    }
}

impl std::error::Error for ParseClusterOutputError {}

impl FromStr for ClusterOutput {
    type Err = ParseClusterOutputError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bounding" | "merged" => Ok(ClusterOutput::Bounding),
            "members" => Ok(ClusterOutput::Members),
            "smallest" => Ok(ClusterOutput::Smallest),
            "largest" => Ok(ClusterOutput::Largest),
            _ => Err(ParseClusterOutputError),
        }
    }
}

/// Parameters for single-input clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterParams {
    /// Largest gap (bp) allowed between a member and the rest of its cluster.
    pub cluster_size: i64,
    /// Minimum number of members for a cluster to be reported.
    pub num_region: usize,
    pub output: ClusterOutput,
}

impl Default for ClusterParams {
    fn default() -> Self {
        ClusterParams {
            cluster_size: 1,
            num_region: 2,
            output: ClusterOutput::Members,
        }
    }
}

/// The operation to run, with exactly the parameters it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Union(UnionMode),
    Intersect(OverlapMode),
    Subtract(OverlapMode),
    Complement,
    Join(JoinFill),
    CoverageDensity { merge_targets: bool },
    Proximity(ProximityParams),
    Cluster(ClusterParams),
    BaseCoverage,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Union(_) => "union",
            Operation::Intersect(_) => "intersect",
            Operation::Subtract(_) => "subtract",
            Operation::Complement => "complement",
            Operation::Join(_) => "join",
            Operation::CoverageDensity { .. } => "coverage",
            Operation::Proximity(_) => "proximity",
            Operation::Cluster(_) => "cluster",
            Operation::BaseCoverage => "basecoverage",
        }
    }

    /// Whether the operation reads a second input at all.
    pub fn uses_second_input(&self) -> bool {
        !matches!(
            self,
            Operation::Complement | Operation::Cluster(_) | Operation::BaseCoverage
        )
    }

    /// Whether an empty second input makes the operation meaningless.
    pub fn requires_second_input(&self) -> bool {
        match self {
            Operation::Intersect(_)
            | Operation::CoverageDensity { .. }
            | Operation::Proximity(_) => true,
            Operation::Join(fill) => !fill.keeps_right(),
            _ => false,
        }
    }

    /// Set operations honor the `restrict` size post-filter.
    pub fn is_set_operation(&self) -> bool {
        matches!(
            self,
            Operation::Union(_)
                | Operation::Intersect(_)
                | Operation::Subtract(_)
                | Operation::Complement
        )
    }
}

/// Immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct OperationConfig {
    /// Column layout of the first input.
    pub columns1: ColumnMapping,
    /// Column layout of the second input.
    pub columns2: ColumnMapping,
    pub size: SizeFilter,
    /// Only this chromosome is loaded and processed.
    pub restrict_chrom: Option<String>,
    pub operation: Operation,
}

impl Default for OperationConfig {
    fn default() -> Self {
        OperationConfig {
            columns1: ColumnMapping::default(),
            columns2: ColumnMapping::default(),
            size: SizeFilter::default(),
            restrict_chrom: None,
            operation: Operation::Union(UnionMode::Merge { distance: 0 }),
        }
    }
}

impl OperationConfig {
    /// Create a config for `operation` with default columns and size bounds.
    pub fn new(operation: Operation) -> Self {
        OperationConfig {
            operation,
            ..Self::default()
        }
    }

    /// What the loaders drop: other chromosomes under a restriction, and
    /// zero-length records unless the minimum size is 0.
    pub fn load_filter(&self) -> LoadFilter<'_> {
        LoadFilter {
            restrict_chrom: self.restrict_chrom.as_deref(),
            keep_empty: self.size.min_size == 0,
        }
    }

    /// Check every parameter once, before any input is read.
    pub fn validate(&self) -> Result<()> {
        self.columns1.validate("first input")?;
        if self.operation.uses_second_input() {
            self.columns2.validate("second input")?;
        }

        if self.size.min_size < 0 {
            return Err(IntervalError::InvalidConfig(
                "minimum size cannot be negative".to_string(),
            ));
        }
        if let Some(max) = self.size.max_size {
            if max < self.size.min_size {
                return Err(IntervalError::InvalidConfig(format!(
                    "maximum size {} is lower than minimum size {}",
                    max, self.size.min_size
                )));
            }
        }
        if matches!(self.restrict_chrom.as_deref(), Some("")) {
            return Err(IntervalError::InvalidConfig(
                "chromosome restriction cannot be empty".to_string(),
            ));
        }

        match &self.operation {
            Operation::Union(UnionMode::Merge { distance }) if *distance < 0 => {
                Err(IntervalError::InvalidConfig(
                    "merge distance cannot be negative".to_string(),
                ))
            }
            Operation::Proximity(params) => {
                let negative = [params.upstream, params.downstream]
                    .iter()
                    .any(|w| w.is_some_and(|w| w < 0));
                if negative {
                    return Err(IntervalError::InvalidConfig(
                        "proximity windows cannot be negative".to_string(),
                    ));
                }
                if params.within && !params.is_bounded() {
                    return Err(IntervalError::InvalidConfig(
                        "--within needs an upstream or downstream window".to_string(),
                    ));
                }
                Ok(())
            }
            Operation::Cluster(params) => {
                if params.cluster_size < 0 {
                    return Err(IntervalError::InvalidConfig(
                        "cluster distance cannot be negative".to_string(),
                    ));
                }
                if params.num_region == 0 {
                    return Err(IntervalError::InvalidConfig(
                        "minimum cluster size must be at least 1".to_string(),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_filter_follows_min_size() {
        let mut config = OperationConfig::default();
        assert_eq!(config.load_filter(), LoadFilter::default());

        config.size.min_size = 0;
        config.restrict_chrom = Some("chr3".to_string());
        let filter = config.load_filter();
        assert!(filter.keep_empty);
        assert_eq!(filter.restrict_chrom, Some("chr3"));
    }

    #[test]
    fn test_default_config() {
        let config = OperationConfig::default();
        assert_eq!(config.columns1, ColumnMapping::default());
        assert_eq!(config.size.min_size, 1);
        assert_eq!(config.size.max_size, None);
        assert!(!config.size.restrict);
        assert!(config.restrict_chrom.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_below_min_is_rejected() {
        let mut config = OperationConfig::new(Operation::Intersect(OverlapMode::Whole));
        config.size.min_size = 10;
        config.size.max_size = Some(5);
        assert!(matches!(
            config.validate(),
            Err(IntervalError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let mut config = OperationConfig::default();
        config.columns2.strand = Some(1);
        assert!(config.validate().is_err());

        // Second-input columns are ignored for single-input operations
        config.operation = Operation::Complement;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_within_requires_window() {
        let params = ProximityParams {
            within: true,
            ..Default::default()
        };
        let config = OperationConfig::new(Operation::Proximity(params));
        assert!(config.validate().is_err());

        let params = ProximityParams {
            within: true,
            downstream: Some(100),
            ..Default::default()
        };
        let config = OperationConfig::new(Operation::Proximity(params));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cluster_needs_one_region() {
        let params = ClusterParams {
            num_region: 0,
            ..Default::default()
        };
        let config = OperationConfig::new(Operation::Cluster(params));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_size_filter() {
        let filter = SizeFilter {
            min_size: 10,
            max_size: Some(100),
            restrict: false,
        };
        // Not restricting: everything passes the post-filter
        assert!(filter.accepts(1));
        assert!(filter.accepts(1000));
        assert!(!filter.admits_segment(9));

        let filter = SizeFilter {
            restrict: true,
            ..filter
        };
        assert!(!filter.accepts(9));
        assert!(filter.accepts(10));
        assert!(filter.accepts(100));
        assert!(!filter.accepts(101));
    }

    #[test]
    fn test_restrict_without_bounds_is_noop() {
        let filter = SizeFilter {
            min_size: 0,
            max_size: None,
            restrict: true,
        };
        assert!(filter.accepts(0));
        assert!(filter.accepts(i64::MAX));
    }

    #[test]
    fn test_gff_mapping() {
        let mapping = ColumnMapping::gff();
        assert_eq!(mapping.max_index(), 6);
        assert_eq!(mapping.start_offset(), 1);
        assert_eq!(ColumnMapping::default().max_index(), 2);
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("left".parse::<JoinFill>(), Ok(JoinFill::Left));
        assert_eq!("BOTH".parse::<JoinFill>(), Ok(JoinFill::Both));
        assert!("outer".parse::<JoinFill>().is_err());
        assert_eq!("merged".parse::<ClusterOutput>(), Ok(ClusterOutput::Bounding));
        assert_eq!("largest".parse::<ClusterOutput>(), Ok(ClusterOutput::Largest));
        assert!("all".parse::<ClusterOutput>().is_err());
    }

    #[test]
    fn test_operation_inputs() {
        assert!(!Operation::Complement.uses_second_input());
        assert!(Operation::Subtract(OverlapMode::Whole).uses_second_input());
        assert!(!Operation::Subtract(OverlapMode::Whole).requires_second_input());
        assert!(Operation::Join(JoinFill::Left).requires_second_input());
        assert!(!Operation::Join(JoinFill::Right).requires_second_input());
        assert!(Operation::Complement.is_set_operation());
        assert!(!Operation::Join(JoinFill::None).is_set_operation());
    }
}
