//! gops - Genomic interval operations library.
//!
//! This library loads BED-like (or GFF) interval files into per-chromosome
//! stores and runs set and relational operations over them: union,
//! intersection, subtraction, complement, overlap join, coverage density,
//! nearest-feature search, clustering and base coverage.
//!
//! # Features
//!
//! - Configurable chromosome/start/stop/strand columns, gzip and stdin input
//! - 0-based half-open coordinates throughout; GFF is converted on load
//! - One shared overlap engine (binary search plus bounded look-back)
//! - Chromosomes processed independently, in parallel, with ordered output
//!
//! # Example
//!
//! ```ignore
//! use gops::config::{Operation, OperationConfig, OverlapMode};
//! use gops::engine::{CancelToken, Engine};
//! use gops::output::write_records;
//! use gops::parser::load_store;
//! use std::path::Path;
//!
//! let config = OperationConfig::new(Operation::Intersect(OverlapMode::Segments));
//! let first = load_store(Path::new("peaks.bed"), config.columns1, config.load_filter())?;
//! let second = load_store(Path::new("genes.bed"), config.columns2, config.load_filter())?;
//!
//! let engine = Engine::new(&config, &first, Some(&second), None)?;
//! let records = engine.run(&CancelToken::new())?;
//! write_records(&mut std::io::stdout(), records, &engine.layout())?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod ops;
pub mod output;
pub mod parser;
pub mod store;
pub mod types;

pub use config::{
    ClusterOutput, ClusterParams, ColumnMapping, JoinFill, Operation, OperationConfig, OverlapMode,
    ProximityParams, SizeFilter, UnionMode,
};
pub use engine::{CancelToken, Engine};
pub use error::{IntervalError, Result};
pub use parser::IntervalReader;
pub use store::{ChromIntervals, ChromosomeBuild, IntervalStore, LoadFilter};
pub use types::{Interval, Record, Strand};
