//! CLI entry point for gops.
//!
//! Global options (inputs, columns, size bounds, threads) come first, then
//! one subcommand per operation with its own parameters.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::info;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use gops::config::{
    ClusterOutput, ClusterParams, ColumnMapping, JoinFill, Operation, OperationConfig,
    OverlapMode, ProximityParams, SizeFilter, UnionMode,
};
use gops::engine::{CancelToken, Engine};
use gops::output::{create_writer, write_record, write_records, OutputLayout};
use gops::parser::util::STDIO_PATH;
use gops::parser::{load_build, load_store};
use gops::types::Record;

/// BED convention for the strand column.
const BED_STRAND_COLUMN: usize = 5;

/// Genomic interval operations.
///
/// Runs set and relational operations over BED-like or GFF interval files.
/// Columns are 0-based indices into each tab-separated record.
#[derive(Parser, Debug)]
#[command(name = "gops")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// First interval file ('-' reads stdin, '.gz' is decompressed)
    #[arg(short = 'a', long = "input1")]
    input1: PathBuf,

    /// Second interval file, for operations comparing two inputs
    #[arg(short = 'b', long = "input2")]
    input2: Option<PathBuf>,

    /// Output file ('-' writes stdout)
    #[arg(short = 'o', long = "output", default_value = "-")]
    output: PathBuf,

    /// Chromosome column of the first input
    #[arg(long = "chrom-col1")]
    chrom_col1: Option<usize>,

    /// Start column of the first input
    #[arg(long = "start-col1")]
    start_col1: Option<usize>,

    /// Stop column of the first input
    #[arg(long = "stop-col1")]
    stop_col1: Option<usize>,

    /// Strand column of the first input
    #[arg(long = "strand-col1")]
    strand_col1: Option<usize>,

    /// Chromosome column of the second input
    #[arg(long = "chrom-col2")]
    chrom_col2: Option<usize>,

    /// Start column of the second input
    #[arg(long = "start-col2")]
    start_col2: Option<usize>,

    /// Stop column of the second input
    #[arg(long = "stop-col2")]
    stop_col2: Option<usize>,

    /// Strand column of the second input
    #[arg(long = "strand-col2")]
    strand_col2: Option<usize>,

    /// Read the first input as GFF (1-based, columns 1/4/5/7)
    #[arg(long = "gff1")]
    gff1: bool,

    /// Read the second input as GFF
    #[arg(long = "gff2")]
    gff2: bool,

    /// Minimum length of generated segments
    #[arg(short = 'm', long = "min-size", default_value = "1")]
    min_size: i64,

    /// Maximum length kept by --restrict
    #[arg(short = 'M', long = "max-size")]
    max_size: Option<i64>,

    /// Drop set-operation results outside [min-size, max-size]
    #[arg(long = "restrict")]
    restrict: bool,

    /// Only load and process this chromosome
    #[arg(short = 'c', long = "chrom")]
    chrom: Option<String>,

    /// Number of worker threads (0 = auto-detect, 1 = sequential)
    #[arg(long = "threads", short = 'j', default_value = "8")]
    threads: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge both inputs (or list them side by side with --lists)
    Union {
        /// Keep every record and tag it with its input instead of merging
        #[arg(long = "lists")]
        lists: bool,

        /// Also merge runs separated by at most this many bp
        #[arg(short = 'd', long = "distance", default_value = "0")]
        distance: i64,
    },
    /// Parts of the first input covered by the second
    Intersect {
        /// Report whole first-input records instead of the shared pieces
        #[arg(long = "whole")]
        whole: bool,
    },
    /// Parts of the first input not covered by the second
    Subtract {
        /// Report whole first-input records with no overlap at all
        #[arg(long = "whole")]
        whole: bool,
    },
    /// Gaps between the first input's intervals
    Complement {
        /// Chromosome lengths file (name and length per line)
        #[arg(short = 'g', long = "build")]
        build: PathBuf,
    },
    /// Every overlapping pair of records
    Join {
        /// Outer-join rows for unmatched records: none, left, right or both
        #[arg(long = "fill", default_value = "none")]
        fill: JoinFill,
    },
    /// Bases of each first-input record covered by the second input
    Coverage {
        /// Merge overlapping targets so no base is counted twice
        #[arg(long = "merge-targets")]
        merge_targets: bool,
    },
    /// Nearest second-input record for each first-input record
    Proximity {
        /// Search window upstream of each record, in bp
        #[arg(short = 'u', long = "upstream")]
        upstream: Option<i64>,

        /// Search window downstream of each record, in bp
        #[arg(short = 'd', long = "downstream")]
        downstream: Option<i64>,

        /// Only accept records lying fully inside the window
        #[arg(long = "within")]
        within: bool,

        /// Orient the window by the strand of each record
        #[arg(long = "strand-aware")]
        strand_aware: bool,

        /// Only accept records on the same strand
        #[arg(long = "same-strand")]
        same_strand: bool,
    },
    /// Groups of nearby first-input records
    Cluster {
        /// Largest gap allowed inside a cluster, in bp
        #[arg(short = 'd', long = "distance", default_value = "1")]
        distance: i64,

        /// Smallest number of records in a reported cluster
        #[arg(short = 'n', long = "min-regions", default_value = "2")]
        min_regions: usize,

        /// What to report: members, bounding, smallest or largest
        #[arg(long = "mode", default_value = "members")]
        mode: ClusterOutput,

        /// Report one bounding interval per cluster (same as --mode bounding)
        #[arg(long = "single", conflicts_with = "mode")]
        single: bool,
    },
    /// Bases covered by the first input, per chromosome
    Basecoverage,
}

impl Command {
    fn operation(&self) -> Operation {
        match self {
            Command::Union { lists: true, .. } => Operation::Union(UnionMode::Lists),
            Command::Union { distance, .. } => Operation::Union(UnionMode::Merge {
                distance: *distance,
            }),
            Command::Intersect { whole } => Operation::Intersect(overlap_mode(*whole)),
            Command::Subtract { whole } => Operation::Subtract(overlap_mode(*whole)),
            Command::Complement { .. } => Operation::Complement,
            Command::Join { fill } => Operation::Join(*fill),
            Command::Coverage { merge_targets } => Operation::CoverageDensity {
                merge_targets: *merge_targets,
            },
            Command::Proximity {
                upstream,
                downstream,
                within,
                strand_aware,
                same_strand,
            } => Operation::Proximity(ProximityParams {
                upstream: *upstream,
                downstream: *downstream,
                within: *within,
                strand_aware: *strand_aware,
                same_strand: *same_strand,
            }),
            Command::Cluster {
                distance,
                min_regions,
                mode,
                single,
            } => Operation::Cluster(ClusterParams {
                cluster_size: *distance,
                num_region: *min_regions,
                output: if *single { ClusterOutput::Bounding } else { *mode },
            }),
            Command::Basecoverage => Operation::BaseCoverage,
        }
    }

    /// Stranded proximity searches read the BED strand column unless told otherwise.
    fn default_strand(&self) -> Option<usize> {
        match self {
            Command::Proximity {
                strand_aware,
                same_strand,
                ..
            } if *strand_aware || *same_strand => Some(BED_STRAND_COLUMN),
            _ => None,
        }
    }
}

fn overlap_mode(whole: bool) -> OverlapMode {
    if whole {
        OverlapMode::Whole
    } else {
        OverlapMode::Segments
    }
}

/// Resolve one input's columns: GFF or BED defaults, then explicit overrides.
fn column_mapping(
    gff: bool,
    overrides: [Option<usize>; 4],
    default_strand: Option<usize>,
) -> ColumnMapping {
    let base = if gff {
        ColumnMapping::gff()
    } else {
        ColumnMapping {
            strand: default_strand,
            ..ColumnMapping::default()
        }
    };
    let [chrom, start, stop, strand] = overrides;
    ColumnMapping {
        chrom: chrom.unwrap_or(base.chrom),
        start: start.unwrap_or(base.start),
        stop: stop.unwrap_or(base.stop),
        strand: strand.or(base.strand),
        one_based: base.one_based,
    }
}

fn build_config(args: &Args) -> OperationConfig {
    let default_strand = args.command.default_strand();
    OperationConfig {
        columns1: column_mapping(
            args.gff1,
            [args.chrom_col1, args.start_col1, args.stop_col1, args.strand_col1],
            default_strand,
        ),
        columns2: column_mapping(
            args.gff2,
            [args.chrom_col2, args.start_col2, args.stop_col2, args.strand_col2],
            default_strand,
        ),
        size: SizeFilter {
            min_size: args.min_size,
            max_size: args.max_size,
            restrict: args.restrict,
        },
        restrict_chrom: args.chrom.clone(),
        operation: args.command.operation(),
    }
}

fn check_input(path: &Path) -> Result<()> {
    if path.as_os_str() != STDIO_PATH && !path.exists() {
        bail!("Input file not found: {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = build_config(&args);
    config.validate()?;
    let operation = config.operation;

    // Validate inputs
    check_input(&args.input1)?;
    let input2 = if operation.uses_second_input() {
        let path = args
            .input2
            .as_deref()
            .with_context(|| format!("{} needs a second input (-b/--input2)", operation.name()))?;
        check_input(path)?;
        if args.input1.as_os_str() == STDIO_PATH && path.as_os_str() == STDIO_PATH {
            bail!("Only one input can be read from stdin");
        }
        Some(path)
    } else {
        None
    };

    let filter = config.load_filter();
    let first = load_store(&args.input1, config.columns1, filter)
        .with_context(|| format!("Failed to load {}", args.input1.display()))?;
    let second = match input2 {
        Some(path) => Some(
            load_store(path, config.columns2, filter)
                .with_context(|| format!("Failed to load {}", path.display()))?,
        ),
        None => None,
    };
    let build = match &args.command {
        Command::Complement { build } => Some(
            load_build(build).with_context(|| format!("Failed to load {}", build.display()))?,
        ),
        _ => None,
    };

    let engine = Engine::new(&config, &first, second.as_ref(), build.as_ref())?;

    // Determine thread count
    let num_threads = if args.threads == 0 {
        num_cpus::get()
    } else {
        args.threads
    };

    let started = Instant::now();
    let lines_written = if num_threads == 1 {
        run_sequential(&engine, &args.output)?
    } else {
        run_parallel(&engine, &args.output, num_threads)?
    };

    info!(
        "{}: wrote {} lines in {:.2?}",
        operation.name(),
        lines_written,
        started.elapsed()
    );
    Ok(())
}

/// Sequential implementation: every chromosome in plan order on this thread.
fn run_sequential(engine: &Engine<'_>, output: &Path) -> Result<usize> {
    let records = engine.run_sequential(&CancelToken::new())?;

    let mut writer = create_writer(output)?;
    let lines_written = write_records(&mut writer, records, &engine.layout())
        .context("Failed to write output")?;
    writer.flush().context("Failed to flush output")?;
    Ok(lines_written)
}

/// Work item for the parallel pipeline.
struct WorkItem {
    /// Sequence number for ordering (plan order).
    seq_id: u64,
    /// Chromosome to process.
    chrom: String,
}

/// Result from processing a work item.
struct WorkResult {
    /// Sequence number matching the input WorkItem.
    seq_id: u64,
    records: gops::Result<Vec<Record>>,
}

/// Parallel implementation using per-chromosome work distribution.
///
/// Chromosomes are handed to a pool of workers over a bounded channel; a
/// writer thread buffers out-of-order results and emits them in plan order,
/// so the output is byte-for-byte the sequential one.
fn run_parallel(engine: &Engine<'_>, output: &Path, num_threads: usize) -> Result<usize> {
    info!("Using parallel mode with {} threads", num_threads);

    // Fails upfront (e.g. unknown chromosome) before any output is created
    let plan = engine.plan()?;
    let layout = engine.layout();
    let cancel = CancelToken::new();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .context("Failed to create thread pool")?;

    // Create channels
    let (work_tx, work_rx): (Sender<WorkItem>, Receiver<WorkItem>) = bounded(100);
    let (result_tx, result_rx): (Sender<WorkResult>, Receiver<WorkResult>) =
        bounded(num_threads * 4);

    let (pool, layout, cancel) = (&pool, &layout, &cancel);
    thread::scope(|scope| -> Result<usize> {
        let writer_handle =
            scope.spawn(move || write_results_ordered(output, result_rx, layout, cancel));

        // Workers own the only receivers and senders, so both channels close
        // as soon as the pool is done.
        let workers_handle = scope.spawn(move || {
            pool.scope(|s| {
                for _ in 0..num_threads {
                    let work_rx = work_rx.clone();
                    let result_tx = result_tx.clone();
                    s.spawn(move |_| worker_loop(engine, work_rx, result_tx, cancel));
                }
            });
        });

        // Producer: one work item per chromosome
        for (seq_id, chrom) in plan.into_iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            let work_item = WorkItem {
                seq_id: seq_id as u64,
                chrom,
            };
            if work_tx.send(work_item).is_err() {
                break;
            }
        }

        // Close work channel to signal workers to exit
        drop(work_tx);

        workers_handle
            .join()
            .map_err(|_| anyhow!("Worker thread panicked"))?;
        writer_handle
            .join()
            .map_err(|_| anyhow!("Writer thread panicked"))?
    })
}

/// Worker loop: receives chromosomes and sends their records.
fn worker_loop(
    engine: &Engine<'_>,
    work_rx: Receiver<WorkItem>,
    result_tx: Sender<WorkResult>,
    cancel: &CancelToken,
) {
    while let Ok(work_item) = work_rx.recv() {
        if cancel.is_cancelled() {
            break;
        }

        let work_result = WorkResult {
            seq_id: work_item.seq_id,
            records: engine.run_chromosome(&work_item.chrom),
        };
        if result_tx.send(work_result).is_err() {
            break;
        }
    }
}

/// Write results in order, buffering out-of-order results.
///
/// Any failure cancels the workers before returning.
fn write_results_ordered(
    output: &Path,
    result_rx: Receiver<WorkResult>,
    layout: &OutputLayout,
    cancel: &CancelToken,
) -> Result<usize> {
    let written = write_in_order(output, result_rx, layout);
    if written.is_err() {
        cancel.cancel();
    }
    written
}

fn write_in_order(
    output: &Path,
    result_rx: Receiver<WorkResult>,
    layout: &OutputLayout,
) -> Result<usize> {
    let mut writer = create_writer(output)?;

    // Buffer for out-of-order results
    let mut pending: BTreeMap<u64, gops::Result<Vec<Record>>> = BTreeMap::new();
    let mut next_expected: u64 = 0;
    let mut lines_written: usize = 0;

    for result in result_rx {
        pending.insert(result.seq_id, result.records);

        // Write all ready consecutive results
        while let Some(records) = pending.remove(&next_expected) {
            for record in &records? {
                lines_written +=
                    write_record(&mut writer, record, layout).context("Failed to write output")?;
            }
            next_expected += 1;
        }
    }

    writer.flush().context("Failed to flush output")?;
    Ok(lines_written)
}
