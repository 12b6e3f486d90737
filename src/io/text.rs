//! Delimited text ingestion.

use crate::column::Column;
use crate::table::Table;
use crate::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Largest text file accepted, in bytes. Offsets into the character buffer
/// are signed 32-bit, so the payload must stay well under `i32::MAX`.
const MAX_TEXT_BYTES: u64 = 1 << 30;

/// Reads a UTF-8 text file into a single-column table named `"text"`.
///
/// With a delimiter, the file splits into one row per occurrence, each row
/// keeping its trailing delimiter; the remainder after the last occurrence
/// is the final row. With no delimiter (or an empty one), the whole file is
/// one row. Files larger than 2^30 bytes fail with [`Error::Range`].
pub fn read_text(path: impl AsRef<Path>, delimiter: Option<&str>) -> Result<Table> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)?;
    if metadata.len() > MAX_TEXT_BYTES {
        return Err(Error::Range(format!(
            "text file {} is {} bytes, limit is {}",
            path.display(),
            metadata.len(),
            MAX_TEXT_BYTES
        )));
    }
    let bytes = std::fs::read(path)?;
    debug!("read {} bytes from {}", bytes.len(), path.display());
    let content = std::str::from_utf8(&bytes)?;

    let column = match delimiter {
        Some(delimiter) if !delimiter.is_empty() => {
            let rows: Vec<&str> = content.split_inclusive(delimiter).collect();
            Column::from_strings(&rows)
        }
        _ => Column::from_strings(&[content]),
    };

    let mut table = Table::new();
    table.append_column("text", column)?;
    Ok(table)
}
