//! Chromosome build loader (`chrom.sizes` style: name and length per line).

use log::info;
use std::io::BufRead;
use std::path::Path;

use crate::error::{IntervalError, Result};
use crate::parser::util::{open_input, should_skip_line, split_fields};
use crate::store::ChromosomeBuild;

/// Load chromosome lengths from a file.
pub fn load_build(path: &Path) -> Result<ChromosomeBuild> {
    let build = read_build(open_input(path)?)?;
    info!("Loaded {} chromosome lengths from {}", build.len(), path.display());
    Ok(build)
}

/// Parse chromosome lengths from a reader. Later duplicates overwrite earlier ones.
pub fn read_build<R: BufRead>(reader: R) -> Result<ChromosomeBuild> {
    let mut build = ChromosomeBuild::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        if should_skip_line(&line) {
            continue;
        }

        let fields = split_fields(line.trim_end());
        if fields.len() < 2 {
            return Err(IntervalError::ColumnIndexOutOfRange {
                line: line_number,
                field: "length",
                column: 1,
                fields: fields.len(),
            });
        }

        let length: i64 = fields[1]
            .trim()
            .parse()
            .ok()
            .filter(|l| *l >= 0)
            .ok_or_else(|| IntervalError::MalformedRecord {
                line: line_number,
                field: "length",
                value: fields[1].clone(),
            })?;
        build.insert(fields[0].trim(), length);
    }

    Ok(build)
}
