//! UTF-8 string column storage.
//!
//! A `Utf8` column holds no data buffer of its own; its storage lives in two
//! children: an `Int32` offsets column with `length + 1` rows and a `Uint8`
//! character column. Row `i` spans character bytes
//! `[offsets[i], offsets[i + 1])`.

use super::Column;
use crate::buffer::Buffer;
use crate::mask::ValidityBuilder;
use crate::types::DataType;
use crate::{Error, Result};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// Incrementally builds a `Utf8` column.
pub(crate) struct Utf8Builder {
    offsets: Vec<i32>,
    chars: Vec<u8>,
    validity: ValidityBuilder,
}

impl Utf8Builder {
    pub fn new(rows: usize) -> Self {
        let mut offsets = Vec::with_capacity(rows + 1);
        offsets.push(0);
        Self {
            offsets,
            chars: Vec::new(),
            validity: ValidityBuilder::new(rows),
        }
    }

    pub fn append(&mut self, s: &str) {
        self.chars.extend_from_slice(s.as_bytes());
        self.offsets.push(self.chars.len() as i32);
        self.validity.push(true);
    }

    /// Appends a null row; its character span is empty.
    pub fn append_null(&mut self) {
        self.offsets.push(self.chars.len() as i32);
        self.validity.push(false);
    }

    pub fn finish(self) -> Column {
        let length = self.offsets.len() - 1;
        Column::new_utf8(
            self.offsets,
            self.chars,
            self.validity.finish().map(|(bits, _)| bits),
            length,
        )
    }
}

impl Column {
    pub(crate) fn new_utf8(
        offsets: Vec<i32>,
        chars: Vec<u8>,
        mask: Option<Vec<u8>>,
        length: usize,
    ) -> Column {
        debug_assert_eq!(offsets.len(), length + 1);
        Column {
            dtype: DataType::Utf8,
            data: None,
            mask: mask.map(|bits| Arc::new(Buffer::from_vec(bits))),
            offset: 0,
            length,
            null_count: AtomicU64::new(u64::MAX),
            children: vec![Column::from_slice(&offsets), Column::from_slice(&chars)],
            disposed: false,
        }
    }

    /// Builds a non-nullable string column from host strings.
    pub fn from_strings<S: AsRef<str>>(values: &[S]) -> Column {
        let mut builder = Utf8Builder::new(values.len());
        for v in values {
            builder.append(v.as_ref());
        }
        builder.finish()
    }

    /// Builds a string column from host strings with null markers.
    pub fn from_string_options<S: AsRef<str>>(values: &[Option<S>]) -> Column {
        let mut builder = Utf8Builder::new(values.len());
        for v in values {
            match v {
                Some(s) => builder.append(s.as_ref()),
                None => builder.append_null(),
            }
        }
        builder.finish()
    }

    /// Borrowed string at `row`, `None` for a null row. `Utf8` columns only.
    pub fn string_at(&self, row: usize) -> Result<Option<&str>> {
        self.ensure_live()?;
        if self.dtype != DataType::Utf8 {
            return Err(Error::TypeError(format!(
                "string_at requires a Utf8 column, got {}",
                self.dtype.name()
            )));
        }
        if row >= self.len() {
            return Err(Error::Range(format!(
                "row {} out of bounds for length {}",
                row,
                self.len()
            )));
        }
        if !self.valid_at(row) {
            return Ok(None);
        }
        let abs = self.view_offset() + row;
        let start = self.children[0].value_i64(abs)? as usize;
        let end = self.children[0].value_i64(abs + 1)? as usize;
        let chars = self.children[1].data_buffer()?;
        let bytes = &chars.as_slice()[start..end];
        Ok(Some(std::str::from_utf8(bytes)?))
    }
}
