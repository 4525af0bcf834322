//! Utility functions for file parsing.

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Path understood as standard input (or standard output when writing).
pub const STDIO_PATH: &str = "-";

/// Creates a buffered reader that automatically handles gzip-compressed files.
///
/// Paths ending in ".gz" are wrapped in a gzip decoder (multi-member, so
/// bgzip output works too).
pub fn create_buffered_reader(file: File, path: &Path) -> Box<dyn BufRead + Send> {
    if path.to_string_lossy().ends_with(".gz") {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    }
}

/// Open `path` for buffered reading; `-` means standard input.
pub fn open_input(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    if path.as_os_str() == STDIO_PATH {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path)?;
    Ok(create_buffered_reader(file, path))
}

/// Whether a line carries no record: blank, comment, or UCSC track/browser line.
pub fn should_skip_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("track")
        || trimmed.starts_with("browser")
}

/// Split a record into fields on tabs, or on whitespace when it has no tab.
pub fn split_fields(line: &str) -> Vec<String> {
    if line.contains('\t') {
        line.split('\t').map(|s| s.to_string()).collect()
    } else {
        line.split_whitespace().map(|s| s.to_string()).collect()
    }
}
