//! Loaders for interval files and chromosome builds.

pub mod bed;
pub mod genome;
pub mod util;

pub use bed::{load_store, read_store, IntervalReader};
pub use genome::{load_build, read_build};
