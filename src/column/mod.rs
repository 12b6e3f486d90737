//! # Column Module
//!
//! The core columnar value: a typed, nullable, possibly-nested sequence of
//! elements with zero-copy view slicing.
//!
//! A `Column` is a *view*: it holds reference-counted handles to its data and
//! mask buffers plus an `offset`/`length` window, so slicing never copies and
//! several columns may share one underlying buffer. Transforming operations
//! (arithmetic, cast, gather, codecs) always produce new, independently-owned
//! columns and never mutate their operands; mutation happens only through the
//! explicitly named in-place operations, which verify exclusive buffer
//! ownership first.
//!
//! Nested layouts:
//!
//! | Type | Children |
//! |------|----------|
//! | `Utf8` | `[offsets: Int32, chars: Uint8]` |
//! | `List(T)` | `[offsets: Int32, values: T]` |
//! | `Dictionary(K)` | `[indices: Int32, keys: K]` |

pub mod binaryop;
pub mod convert;
pub mod fill;
pub mod gather;
pub mod reduce;
pub mod strings;
pub mod unaryop;

pub use binaryop::{BinaryOp, Rhs};
pub use fill::{ReplaceNulls, Replacement};
pub use reduce::Interpolation;
pub use unaryop::UnaryOp;

use crate::buffer::{Buffer, FixedSize};
use crate::mask::{self, ValidityBuilder};
use crate::scalar::{Scalar, ScalarValue};
use crate::types::{DataType, ToDataType};
use crate::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const NULL_COUNT_UNKNOWN: u64 = u64::MAX;

/// A typed, nullable, sliceable columnar value.
pub struct Column {
    dtype: DataType,
    data: Option<Arc<Buffer>>,
    mask: Option<Arc<Buffer>>,
    offset: usize,
    length: usize,
    null_count: AtomicU64,
    children: Vec<Column>,
    disposed: bool,
}

impl Clone for Column {
    /// Cheap view clone: buffers are shared, not copied.
    fn clone(&self) -> Self {
        Self {
            dtype: self.dtype.clone(),
            data: self.data.clone(),
            mask: self.mask.clone(),
            offset: self.offset,
            length: self.length,
            null_count: AtomicU64::new(self.null_count.load(Ordering::Relaxed)),
            children: self.children.clone(),
            disposed: self.disposed,
        }
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("dtype", &self.dtype.name())
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("nullable", &self.mask.is_some())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl Column {
    /// Builds a column from raw buffers.
    ///
    /// `mask` is a bitmask where a set bit marks a valid row, addressed as
    /// `(mask[i / 8] >> (i % 8)) & 1` with `i` buffer-absolute. When
    /// `null_count` is `None` it is computed lazily on first access.
    pub fn from_parts(
        dtype: DataType,
        data: Option<Buffer>,
        mask: Option<Buffer>,
        offset: usize,
        length: usize,
        null_count: Option<usize>,
        children: Vec<Column>,
    ) -> Result<Self> {
        if let Some(width) = dtype.size_of() {
            let data = data.ok_or_else(|| {
                Error::TypeError(format!("{} column requires a data buffer", dtype.name()))
            })?;
            let capacity = data.len() / width;
            if offset + length > capacity {
                return Err(Error::Range(format!(
                    "view [{}, {}) exceeds buffer capacity of {} elements",
                    offset,
                    offset + length,
                    capacity
                )));
            }
            if !children.is_empty() {
                return Err(Error::TypeError(format!(
                    "{} column cannot have children",
                    dtype.name()
                )));
            }
            let col = Self {
                dtype,
                data: Some(Arc::new(data)),
                mask: None,
                offset,
                length,
                null_count: AtomicU64::new(0),
                children,
                disposed: false,
            };
            return col.attach_mask(mask, null_count);
        }

        // Variable-width types carry their storage in children.
        match dtype {
            DataType::Utf8 | DataType::List(_) => {
                if data.is_some() {
                    return Err(Error::TypeError(format!(
                        "{} column stores data in children, not a data buffer",
                        dtype.name()
                    )));
                }
                if children.len() != 2 || *children[0].dtype() != DataType::Int32 {
                    return Err(Error::TypeError(format!(
                        "{} column requires [Int32 offsets, values] children",
                        dtype.name()
                    )));
                }
                if children[0].len() < offset + length + 1 && length > 0 {
                    return Err(Error::Range(format!(
                        "offsets child has {} rows, need at least {}",
                        children[0].len(),
                        offset + length + 1
                    )));
                }
                if dtype == DataType::Utf8 && *children[1].dtype() != DataType::Uint8 {
                    return Err(Error::TypeError(
                        "Utf8 column requires a Uint8 characters child".to_string(),
                    ));
                }
                // Offsets must describe spans that exist in the values child.
                if length > 0 {
                    let mut prev = children[0].value_i64(offset)?;
                    if prev < 0 {
                        return Err(Error::Range(format!("negative offset {}", prev)));
                    }
                    for row in offset + 1..=offset + length {
                        let next = children[0].value_i64(row)?;
                        if next < prev {
                            return Err(Error::Range(format!(
                                "offsets must be non-decreasing, got {} after {}",
                                next, prev
                            )));
                        }
                        prev = next;
                    }
                    if prev > children[1].len() as i64 {
                        return Err(Error::Range(format!(
                            "offsets end at {} but the values child has {} rows",
                            prev,
                            children[1].len()
                        )));
                    }
                }
            }
            DataType::Dictionary(_) => {
                if children.len() != 2 || *children[0].dtype() != DataType::Int32 {
                    return Err(Error::TypeError(
                        "Dictionary column requires [Int32 indices, keys] children".to_string(),
                    ));
                }
                if children[0].len() < offset + length {
                    return Err(Error::Range(format!(
                        "indices child has {} rows, need at least {}",
                        children[0].len(),
                        offset + length
                    )));
                }
            }
            _ => unreachable!(),
        }

        let col = Self {
            dtype,
            data: None,
            mask: None,
            offset,
            length,
            null_count: AtomicU64::new(0),
            children,
            disposed: false,
        };
        col.attach_mask(mask, null_count)
    }

    fn attach_mask(mut self, mask: Option<Buffer>, null_count: Option<usize>) -> Result<Self> {
        match mask {
            None => {
                if null_count.unwrap_or(0) != 0 {
                    return Err(Error::TypeError(
                        "non-zero null count requires a null mask".to_string(),
                    ));
                }
                self.null_count = AtomicU64::new(0);
            }
            Some(mask) => {
                let needed = mask::mask_len(self.offset + self.length);
                if mask.len() < needed {
                    return Err(Error::Range(format!(
                        "null mask has {} bytes, need at least {}",
                        mask.len(),
                        needed
                    )));
                }
                if let Some(n) = null_count {
                    if n > self.length {
                        return Err(Error::Range(format!(
                            "null count {} exceeds length {}",
                            n, self.length
                        )));
                    }
                }
                self.mask = Some(Arc::new(mask));
                self.null_count = AtomicU64::new(match null_count {
                    Some(n) => n as u64,
                    None => NULL_COUNT_UNKNOWN,
                });
            }
        }
        Ok(self)
    }

    /// Internal constructor for freshly computed fixed-width results.
    pub(crate) fn new_fixed(
        dtype: DataType,
        bytes: Vec<u8>,
        mask: Option<(Vec<u8>, usize)>,
        length: usize,
    ) -> Self {
        debug_assert!(dtype.is_fixed_width());
        Self {
            dtype,
            data: Some(Arc::new(Buffer::from_vec(bytes))),
            mask: mask
                .as_ref()
                .map(|(bits, _)| Arc::new(Buffer::from_vec(bits.clone()))),
            offset: 0,
            length,
            null_count: AtomicU64::new(mask.map(|(_, n)| n as u64).unwrap_or(0)),
            children: Vec::new(),
            disposed: false,
        }
    }

    /// Builds a non-nullable column from a typed host slice.
    pub fn from_slice<T: FixedSize + ToDataType>(values: &[T]) -> Self {
        Self::new_fixed(
            T::to_dtype(),
            Buffer::from_elements(values).as_slice().to_vec(),
            None,
            values.len(),
        )
    }

    /// Builds a column from host values with null markers.
    ///
    /// The null mask is synthesized here; this is the only way nullable host
    /// sequences enter the engine, so element data never carries null
    /// sentinels alongside an explicit mask.
    pub fn from_options<T: FixedSize + ToDataType + Default>(values: &[Option<T>]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * T::WIDTH);
        let mut validity = ValidityBuilder::new(values.len());
        for v in values {
            validity.push(v.is_some());
            v.unwrap_or_default().write_to(&mut bytes);
        }
        Self::new_fixed(T::to_dtype(), bytes, validity.finish(), values.len())
    }

    /// Builds a non-nullable Bool8 column.
    pub fn from_bools(values: &[bool]) -> Self {
        let bytes: Vec<u8> = values.iter().map(|&b| b as u8).collect();
        Self::new_fixed(DataType::Bool8, bytes, None, values.len())
    }

    /// Builds a nullable Bool8 column.
    pub fn from_bool_options(values: &[Option<bool>]) -> Self {
        let mut bytes = Vec::with_capacity(values.len());
        let mut validity = ValidityBuilder::new(values.len());
        for v in values {
            validity.push(v.is_some());
            bytes.push(v.unwrap_or(false) as u8);
        }
        Self::new_fixed(DataType::Bool8, bytes, validity.finish(), values.len())
    }

    /// Fills a column with `size` values starting at `init`, advancing by
    /// `step` (1 when `None`).
    pub fn sequence(size: usize, init: &Scalar, step: Option<&Scalar>) -> Result<Self> {
        let dtype = init.dtype().clone();
        if !dtype.is_numeric() {
            return Err(Error::TypeError(format!(
                "sequence requires a numeric type, got {}",
                dtype.name()
            )));
        }
        let init_value = init
            .value()
            .ok_or_else(|| Error::TypeError("sequence requires a valid init scalar".to_string()))?;
        if let Some(step) = step {
            if step.dtype() != &dtype {
                return Err(Error::TypeError(format!(
                    "sequence step type {} does not match init type {}",
                    step.dtype().name(),
                    dtype.name()
                )));
            }
        }

        let width = dtype.size_of().unwrap();
        let mut bytes = Vec::with_capacity(size * width);
        if dtype.is_float() {
            let init = scalar_f64(init_value);
            let step = step.and_then(|s| s.value()).map(scalar_f64).unwrap_or(1.0);
            for i in 0..size {
                push_f64_as(&mut bytes, &dtype, init + step * i as f64);
            }
        } else if dtype.is_unsigned_integer() {
            let init = scalar_u64(init_value);
            let step = step.and_then(|s| s.value()).map(scalar_u64).unwrap_or(1);
            for i in 0..size {
                push_u64_as(&mut bytes, &dtype, init.wrapping_add(step.wrapping_mul(i as u64)));
            }
        } else {
            let init = scalar_i64(init_value);
            let step = step.and_then(|s| s.value()).map(scalar_i64).unwrap_or(1);
            for i in 0..size {
                push_i64_as(&mut bytes, &dtype, init.wrapping_add(step.wrapping_mul(i as i64)));
            }
        }
        Ok(Self::new_fixed(dtype, bytes, None, size))
    }

    /// Builds a list column from host slices; a `None` entry is a null row.
    pub fn from_list_slices<T: FixedSize + ToDataType>(items: &[Option<&[T]>]) -> Self {
        let mut offsets = Vec::with_capacity(items.len() + 1);
        let mut values = Vec::new();
        let mut validity = ValidityBuilder::new(items.len());
        offsets.push(0i32);
        for item in items {
            validity.push(item.is_some());
            if let Some(slice) = item {
                values.extend_from_slice(slice);
            }
            offsets.push(values.len() as i32);
        }
        Self {
            dtype: DataType::list(T::to_dtype()),
            data: None,
            mask: validity
                .finish()
                .map(|(bits, _)| Arc::new(Buffer::from_vec(bits))),
            offset: 0,
            length: items.len(),
            null_count: AtomicU64::new(NULL_COUNT_UNKNOWN),
            children: vec![Column::from_slice(&offsets), Column::from_slice(&values)],
            disposed: false,
        }
    }

    /// Builds a dictionary-encoded column from a keys column and Int32
    /// indices into it.
    pub fn dictionary(keys: Column, indices: Column) -> Result<Self> {
        if *indices.dtype() != DataType::Int32 {
            return Err(Error::TypeError(format!(
                "dictionary indices must be Int32, got {}",
                indices.dtype().name()
            )));
        }
        let length = indices.len();
        let mask = indices.view_mask_rebased();
        let indices = indices.copy()?;
        let dtype = DataType::dictionary(keys.dtype().clone());
        let col = Self {
            dtype,
            data: None,
            mask: None,
            offset: 0,
            length,
            null_count: AtomicU64::new(0),
            children: vec![indices, keys],
            disposed: false,
        };
        col.attach_mask(mask.map(|(bits, _)| Buffer::from_vec(bits)), None)
    }

    // ------------------------------------------------------------------
    // View properties
    // ------------------------------------------------------------------

    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// First logical row of this view within the underlying buffer.
    pub fn view_offset(&self) -> usize {
        self.offset
    }

    /// Whether this column can hold nulls (has a mask).
    pub fn nullable(&self) -> bool {
        self.mask.is_some()
    }

    pub fn has_nulls(&self) -> bool {
        self.null_count() > 0
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Result<&Column> {
        self.children
            .get(index)
            .ok_or_else(|| Error::Range(format!("no child at index {}", index)))
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(Error::UseAfterDispose)
        } else {
            Ok(())
        }
    }

    pub(crate) fn data_buffer(&self) -> Result<&Arc<Buffer>> {
        self.data
            .as_ref()
            .ok_or_else(|| Error::TypeError(format!("{} column has no data buffer", self.dtype.name())))
    }

    pub(crate) fn mask_buffer(&self) -> Option<&Arc<Buffer>> {
        self.mask.as_ref()
    }

    /// Number of null rows in this view, computed lazily from the mask and
    /// cached. The cache is reset whenever validity changes, never stale.
    pub fn null_count(&self) -> usize {
        let Some(mask) = &self.mask else { return 0 };
        let cached = self.null_count.load(Ordering::Relaxed);
        if cached != NULL_COUNT_UNKNOWN {
            return cached as usize;
        }
        let count = mask::count_unset_bits(mask.as_slice(), self.offset, self.length);
        self.null_count.store(count as u64, Ordering::Relaxed);
        count
    }

    /// Row validity relative to this view. Caller guarantees `row < length`.
    pub(crate) fn valid_at(&self, row: usize) -> bool {
        match &self.mask {
            None => true,
            Some(mask) => mask::bit_is_set(mask.as_slice(), self.offset + row),
        }
    }

    pub fn is_null_at(&self, row: usize) -> Result<bool> {
        self.ensure_live()?;
        if row >= self.length {
            return Err(Error::Range(format!(
                "row {} out of bounds for length {}",
                row, self.length
            )));
        }
        Ok(!self.valid_at(row))
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Explicitly releases this column's ownership of its data, mask and
    /// child buffers. Recursive and idempotent; storage shared with sibling
    /// views survives until the last holder releases it. Every later
    /// operation on this column fails with [`Error::UseAfterDispose`].
    pub fn dispose(&mut self) {
        self.data = None;
        self.mask = None;
        for child in &mut self.children {
            child.dispose();
        }
        self.disposed = true;
    }

    /// Zero-copy sub-view: shares the underlying buffers.
    pub fn slice(&self, offset: usize, length: usize) -> Result<Column> {
        self.ensure_live()?;
        if offset + length > self.length {
            return Err(Error::Range(format!(
                "slice [{}, {}) out of bounds for length {}",
                offset,
                offset + length,
                self.length
            )));
        }
        let mut view = self.clone();
        view.offset = self.offset + offset;
        view.length = length;
        view.null_count = AtomicU64::new(if self.mask.is_some() {
            NULL_COUNT_UNKNOWN
        } else {
            0
        });
        Ok(view)
    }

    // ------------------------------------------------------------------
    // In-place null bookkeeping
    // ------------------------------------------------------------------

    /// Verifies no other live view aliases this column's buffers.
    pub(crate) fn require_exclusive(&self) -> Result<()> {
        if let Some(data) = &self.data {
            if Arc::strong_count(data) != 1 {
                return Err(Error::Aliasing(
                    "data buffer is shared with another live view".to_string(),
                ));
            }
        }
        if let Some(mask) = &self.mask {
            if Arc::strong_count(mask) != 1 {
                return Err(Error::Aliasing(
                    "null mask buffer is shared with another live view".to_string(),
                ));
            }
        }
        for child in &self.children {
            child.require_exclusive()?;
        }
        Ok(())
    }

    /// Overrides the cached null count; `None` marks it unknown, forcing a
    /// mask scan on next access. Requires exclusive buffer ownership.
    pub fn set_null_count(&mut self, null_count: Option<usize>) -> Result<()> {
        self.ensure_live()?;
        self.require_exclusive()?;
        match null_count {
            None => self
                .null_count
                .store(if self.mask.is_some() { NULL_COUNT_UNKNOWN } else { 0 }, Ordering::Relaxed),
            Some(n) => {
                if n > self.length {
                    return Err(Error::Range(format!(
                        "null count {} exceeds length {}",
                        n, self.length
                    )));
                }
                if n > 0 && self.mask.is_none() {
                    return Err(Error::TypeError(
                        "non-zero null count requires a null mask".to_string(),
                    ));
                }
                self.null_count.store(n as u64, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Replaces the null mask in place. `None` clears it (no nulls possible).
    ///
    /// When `null_count` is `None` the mask is scanned over
    /// `[offset, offset + length)` to compute it. Requires exclusive buffer
    /// ownership; a shared view fails with [`Error::Aliasing`].
    pub fn set_null_mask(&mut self, mask: Option<Buffer>, null_count: Option<usize>) -> Result<()> {
        self.ensure_live()?;
        self.require_exclusive()?;
        match mask {
            None => {
                self.mask = None;
                self.null_count.store(0, Ordering::Relaxed);
            }
            Some(mask) => {
                let needed = mask::mask_len(self.offset + self.length);
                if mask.len() < needed {
                    return Err(Error::Range(format!(
                        "null mask has {} bytes, need at least {}",
                        mask.len(),
                        needed
                    )));
                }
                let count = match null_count {
                    Some(n) => {
                        if n > self.length {
                            return Err(Error::Range(format!(
                                "null count {} exceeds length {}",
                                n, self.length
                            )));
                        }
                        n
                    }
                    None => mask::count_unset_bits(mask.as_slice(), self.offset, self.length),
                };
                self.mask = Some(Arc::new(mask));
                self.null_count.store(count as u64, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------

    /// Host value at `row`, `None` for a null row.
    pub fn value_at(&self, row: usize) -> Result<Option<ScalarValue>> {
        self.ensure_live()?;
        if row >= self.length {
            return Err(Error::Range(format!(
                "row {} out of bounds for length {}",
                row, self.length
            )));
        }
        if !self.valid_at(row) {
            return Ok(None);
        }
        Ok(Some(match &self.dtype {
            DataType::Bool8 => ScalarValue::Bool(self.value_i64(row)? != 0),
            d if d.is_signed_integer() => ScalarValue::Int(self.value_i64(row)?),
            d if d.is_unsigned_integer() => ScalarValue::Uint(self.value_u64(row)?),
            d if d.is_float() => ScalarValue::Float(self.value_f64(row)?),
            DataType::Utf8 => match self.string_at(row)? {
                Some(s) => ScalarValue::Utf8(s.to_string()),
                None => return Ok(None),
            },
            DataType::Dictionary(_) => {
                // Children are addressed by the parent's absolute row.
                let index = self.children[0].value_i64(self.offset + row)?;
                match self.children[1].value_at(index as usize)? {
                    Some(v) => v,
                    None => return Ok(None),
                }
            }
            DataType::List(_) => {
                return Err(Error::TypeError(
                    "list rows are not host scalars; use list_at".to_string(),
                ))
            }
            _ => unreachable!(),
        }))
    }

    /// The list at `row` as a zero-copy view of the values child.
    pub fn list_at(&self, row: usize) -> Result<Option<Column>> {
        self.ensure_live()?;
        if !matches!(self.dtype, DataType::List(_)) {
            return Err(Error::TypeError(format!(
                "list_at requires a List column, got {}",
                self.dtype.name()
            )));
        }
        if row >= self.length {
            return Err(Error::Range(format!(
                "row {} out of bounds for length {}",
                row, self.length
            )));
        }
        if !self.valid_at(row) {
            return Ok(None);
        }
        let start = self.children[0].value_i64(self.offset + row)? as usize;
        let end = self.children[0].value_i64(self.offset + row + 1)? as usize;
        Ok(Some(self.children[1].slice(start, end - start)?))
    }

    /// Row-major materialization of the whole view for host consumption.
    pub fn to_host(&self) -> Result<Vec<Option<ScalarValue>>> {
        self.ensure_live()?;
        (0..self.length).map(|row| self.value_at(row)).collect()
    }

    /// Reads row `row` widened to `i64`. Internal; fixed-width types only,
    /// caller guarantees bounds.
    pub(crate) fn value_i64(&self, row: usize) -> Result<i64> {
        let data = self.data_buffer()?;
        let i = self.offset + row;
        Ok(match self.dtype {
            DataType::Bool8 => data.get::<u8>(i)? as i64,
            DataType::Int8 => data.get::<i8>(i)? as i64,
            DataType::Int16 => data.get::<i16>(i)? as i64,
            DataType::Int32 => data.get::<i32>(i)? as i64,
            DataType::Int64 => data.get::<i64>(i)?,
            DataType::Uint8 => data.get::<u8>(i)? as i64,
            DataType::Uint16 => data.get::<u16>(i)? as i64,
            DataType::Uint32 => data.get::<u32>(i)? as i64,
            DataType::Uint64 => data.get::<u64>(i)? as i64,
            DataType::Float32 => data.get::<f32>(i)? as i64,
            DataType::Float64 => data.get::<f64>(i)? as i64,
            _ => {
                return Err(Error::TypeError(format!(
                    "{} is not a fixed-width type",
                    self.dtype.name()
                )))
            }
        })
    }

    /// Reads row `row` widened to `u64` (signed values sign-extend then
    /// reinterpret, two's-complement).
    pub(crate) fn value_u64(&self, row: usize) -> Result<u64> {
        Ok(match self.dtype {
            DataType::Uint64 => self.data_buffer()?.get::<u64>(self.offset + row)?,
            DataType::Float32 | DataType::Float64 => self.value_f64(row)? as u64,
            _ => self.value_i64(row)? as u64,
        })
    }

    /// Reads row `row` widened to `f64`.
    pub(crate) fn value_f64(&self, row: usize) -> Result<f64> {
        let data = self.data_buffer()?;
        let i = self.offset + row;
        Ok(match self.dtype {
            DataType::Float32 => data.get::<f32>(i)? as f64,
            DataType::Float64 => data.get::<f64>(i)?,
            DataType::Uint64 => data.get::<u64>(i)? as f64,
            _ => self.value_i64(row)? as f64,
        })
    }

    // ------------------------------------------------------------------
    // Validity-derived columns
    // ------------------------------------------------------------------

    /// Bool8 column, `true` where the row is null. Output is non-nullable.
    pub fn is_null(&self) -> Result<Column> {
        self.ensure_live()?;
        let bytes: Vec<u8> = (0..self.length).map(|row| !self.valid_at(row) as u8).collect();
        Ok(Column::new_fixed(DataType::Bool8, bytes, None, self.length))
    }

    /// Bool8 column, `true` where the row is valid. Output is non-nullable.
    pub fn is_valid(&self) -> Result<Column> {
        self.ensure_live()?;
        let bytes: Vec<u8> = (0..self.length).map(|row| self.valid_at(row) as u8).collect();
        Ok(Column::new_fixed(DataType::Bool8, bytes, None, self.length))
    }

    fn require_float(&self, what: &str) -> Result<()> {
        if !self.dtype.is_float() {
            return Err(Error::TypeError(format!(
                "{} requires a floating-point column, got {}",
                what,
                self.dtype.name()
            )));
        }
        Ok(())
    }

    /// Bool8 column, `true` where the value is NaN. Floating columns only.
    pub fn is_nan(&self) -> Result<Column> {
        self.ensure_live()?;
        self.require_float("is_nan")?;
        let mut bytes = Vec::with_capacity(self.length);
        for row in 0..self.length {
            bytes.push((self.valid_at(row) && self.value_f64(row)?.is_nan()) as u8);
        }
        Ok(Column::new_fixed(DataType::Bool8, bytes, None, self.length))
    }

    /// Bool8 column, `true` where the value is not NaN. Floating columns only.
    pub fn is_not_nan(&self) -> Result<Column> {
        self.ensure_live()?;
        self.require_float("is_not_nan")?;
        let mut bytes = Vec::with_capacity(self.length);
        for row in 0..self.length {
            bytes.push((self.valid_at(row) && !self.value_f64(row)?.is_nan()) as u8);
        }
        Ok(Column::new_fixed(DataType::Bool8, bytes, None, self.length))
    }

    /// Converts NaN values into null rows, updating mask and null count.
    ///
    /// Element storage at newly-nulled positions is unspecified; callers must
    /// not depend on it. Data is shared zero-copy with the source.
    pub fn nans_to_nulls(&self) -> Result<Column> {
        self.ensure_live()?;
        self.require_float("nans_to_nulls")?;
        let mut bits = vec![0u8; mask::mask_len(self.offset + self.length)];
        let mut nulls = 0usize;
        for row in 0..self.length {
            if self.valid_at(row) && !self.value_f64(row)?.is_nan() {
                mask::set_bit(&mut bits, self.offset + row);
            } else {
                nulls += 1;
            }
        }
        let mut out = self.clone();
        if nulls == 0 {
            out.mask = None;
            out.null_count = AtomicU64::new(0);
        } else {
            out.mask = Some(Arc::new(Buffer::from_vec(bits)));
            out.null_count = AtomicU64::new(nulls as u64);
        }
        Ok(out)
    }

    /// Packs a Bool8 column into a validity bitmask; null rows pack as unset.
    /// Returns the mask buffer and its unset-bit count.
    pub fn bools_to_mask(&self) -> Result<(Buffer, usize)> {
        self.ensure_live()?;
        if self.dtype != DataType::Bool8 {
            return Err(Error::TypeError(format!(
                "bools_to_mask requires Bool8, got {}",
                self.dtype.name()
            )));
        }
        let mut bits = vec![0u8; mask::mask_len(self.length)];
        let mut unset = 0usize;
        for row in 0..self.length {
            if self.valid_at(row) && self.value_i64(row)? != 0 {
                mask::set_bit(&mut bits, row);
            } else {
                unset += 1;
            }
        }
        Ok((Buffer::from_vec(bits), unset))
    }

    // ------------------------------------------------------------------
    // Copies
    // ------------------------------------------------------------------

    /// Rebuilds this view's validity as a mask starting at bit 0.
    /// Returns `None` when the view has no nulls.
    pub(crate) fn view_mask_rebased(&self) -> Option<(Vec<u8>, usize)> {
        self.mask.as_ref()?;
        let mut builder = ValidityBuilder::new(self.length);
        for row in 0..self.length {
            builder.push(self.valid_at(row));
        }
        builder.finish()
    }

    /// Deep copy of this view into independently-owned buffers.
    pub fn copy(&self) -> Result<Column> {
        self.ensure_live()?;
        match &self.dtype {
            d if d.is_fixed_width() => {
                let width = d.size_of().unwrap();
                let data = self.data_buffer()?;
                let start = self.offset * width;
                let bytes = data.as_slice()[start..start + self.length * width].to_vec();
                Ok(Column::new_fixed(
                    d.clone(),
                    bytes,
                    self.view_mask_rebased(),
                    self.length,
                ))
            }
            DataType::Utf8 => {
                let mut builder = strings::Utf8Builder::new(self.length);
                for row in 0..self.length {
                    match self.string_at(row)? {
                        Some(s) => builder.append(s),
                        None => builder.append_null(),
                    }
                }
                Ok(builder.finish())
            }
            DataType::List(_) => {
                let first = self.children[0].value_i64(self.offset)? as usize;
                let last = self.children[0].value_i64(self.offset + self.length)? as usize;
                let offsets: Result<Vec<i32>> = (0..=self.length)
                    .map(|row| {
                        Ok(self.children[0].value_i64(self.offset + row)? as i32 - first as i32)
                    })
                    .collect();
                let values = self.children[1].slice(first, last - first)?.copy()?;
                Column::from_parts(
                    self.dtype.clone(),
                    None,
                    self.view_mask_rebased()
                        .map(|(bits, _)| Buffer::from_vec(bits)),
                    0,
                    self.length,
                    None,
                    vec![Column::from_slice(&offsets?), values],
                )
            }
            DataType::Dictionary(_) => {
                let indices = self.children[0].slice(self.offset, self.length)?.copy()?;
                let keys = self.children[1].copy()?;
                Column::from_parts(
                    self.dtype.clone(),
                    None,
                    self.view_mask_rebased()
                        .map(|(bits, _)| Buffer::from_vec(bits)),
                    0,
                    self.length,
                    None,
                    vec![indices, keys],
                )
            }
            _ => unreachable!(),
        }
    }

    /// Concatenates `other` to the end of this column, returning a new one.
    pub fn concat(&self, other: &Column) -> Result<Column> {
        self.ensure_live()?;
        other.ensure_live()?;
        if self.dtype != other.dtype {
            return Err(Error::TypeError(format!(
                "cannot concat {} to {}",
                other.dtype.name(),
                self.dtype.name()
            )));
        }
        match &self.dtype {
            d if d.is_fixed_width() => {
                let width = d.size_of().unwrap();
                let mut bytes = Vec::with_capacity((self.length + other.length) * width);
                let a = self.data_buffer()?;
                bytes.extend_from_slice(
                    &a.as_slice()[self.offset * width..(self.offset + self.length) * width],
                );
                let b = other.data_buffer()?;
                bytes.extend_from_slice(
                    &b.as_slice()[other.offset * width..(other.offset + other.length) * width],
                );
                let mut validity = ValidityBuilder::new(self.length + other.length);
                for row in 0..self.length {
                    validity.push(self.valid_at(row));
                }
                for row in 0..other.length {
                    validity.push(other.valid_at(row));
                }
                Ok(Column::new_fixed(
                    d.clone(),
                    bytes,
                    validity.finish(),
                    self.length + other.length,
                ))
            }
            DataType::Utf8 => {
                let mut builder = strings::Utf8Builder::new(self.length + other.length);
                for col in [self, other] {
                    for row in 0..col.length {
                        match col.string_at(row)? {
                            Some(s) => builder.append(s),
                            None => builder.append_null(),
                        }
                    }
                }
                Ok(builder.finish())
            }
            _ => Err(Error::TypeError(format!(
                "concat is not supported for {}",
                self.dtype.name()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Cast
    // ------------------------------------------------------------------

    /// Casts between fixed-width numeric/boolean types.
    ///
    /// String conversions must use the codec operations; nested and
    /// dictionary targets fail with [`Error::UnsupportedCast`]. Narrowing
    /// integer casts wrap (two's-complement truncation).
    pub fn cast(&self, to: &DataType) -> Result<Column> {
        self.ensure_live()?;
        if !crate::types::cast_supported(&self.dtype, to) {
            return Err(Error::UnsupportedCast {
                from: self.dtype.name(),
                to: to.name(),
            });
        }
        if *to == self.dtype {
            return self.copy();
        }
        let width = to.size_of().unwrap();
        let mut bytes = Vec::with_capacity(self.length * width);
        for row in 0..self.length {
            if !self.valid_at(row) {
                push_i64_as(&mut bytes, to, 0);
                continue;
            }
            if to.is_float() {
                push_f64_as(&mut bytes, to, self.value_f64(row)?);
            } else if to.is_unsigned_integer() {
                push_u64_as(&mut bytes, to, self.value_u64(row)?);
            } else {
                push_i64_as(&mut bytes, to, self.value_i64(row)?);
            }
        }
        Ok(Column::new_fixed(
            to.clone(),
            bytes,
            self.view_mask_rebased(),
            self.length,
        ))
    }
}

// ----------------------------------------------------------------------
// Narrowing element writers shared by the compute kernels
// ----------------------------------------------------------------------

pub(crate) fn push_i64_as(out: &mut Vec<u8>, dtype: &DataType, v: i64) {
    match dtype {
        DataType::Bool8 => ((v != 0) as u8).write_to(out),
        DataType::Int8 => (v as i8).write_to(out),
        DataType::Int16 => (v as i16).write_to(out),
        DataType::Int32 => (v as i32).write_to(out),
        DataType::Int64 => v.write_to(out),
        DataType::Uint8 => (v as u8).write_to(out),
        DataType::Uint16 => (v as u16).write_to(out),
        DataType::Uint32 => (v as u32).write_to(out),
        DataType::Uint64 => (v as u64).write_to(out),
        DataType::Float32 => (v as f32).write_to(out),
        DataType::Float64 => (v as f64).write_to(out),
        _ => unreachable!("non-fixed-width result type"),
    }
}

pub(crate) fn push_u64_as(out: &mut Vec<u8>, dtype: &DataType, v: u64) {
    match dtype {
        DataType::Bool8 => ((v != 0) as u8).write_to(out),
        DataType::Float32 => (v as f32).write_to(out),
        DataType::Float64 => (v as f64).write_to(out),
        _ => push_i64_as(out, dtype, v as i64),
    }
}

pub(crate) fn push_f64_as(out: &mut Vec<u8>, dtype: &DataType, v: f64) {
    match dtype {
        DataType::Bool8 => ((v != 0.0) as u8).write_to(out),
        DataType::Float32 => (v as f32).write_to(out),
        DataType::Float64 => v.write_to(out),
        d if d.is_unsigned_integer() => push_u64_as(out, d, v as u64),
        d => push_i64_as(out, d, v as i64),
    }
}

pub(crate) fn scalar_i64(v: &ScalarValue) -> i64 {
    match v {
        ScalarValue::Bool(b) => *b as i64,
        ScalarValue::Int(i) => *i,
        ScalarValue::Uint(u) => *u as i64,
        ScalarValue::Float(f) => *f as i64,
        ScalarValue::Utf8(_) => 0,
    }
}

pub(crate) fn scalar_u64(v: &ScalarValue) -> u64 {
    match v {
        ScalarValue::Uint(u) => *u,
        ScalarValue::Float(f) => *f as u64,
        other => scalar_i64(other) as u64,
    }
}

pub(crate) fn scalar_f64(v: &ScalarValue) -> f64 {
    match v {
        ScalarValue::Bool(b) => *b as u8 as f64,
        ScalarValue::Int(i) => *i as f64,
        ScalarValue::Uint(u) => *u as f64,
        ScalarValue::Float(f) => *f,
        ScalarValue::Utf8(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice() {
        let col = Column::from_slice(&[1i32, 2, 3, 4]);
        assert_eq!(*col.dtype(), DataType::Int32);
        assert_eq!(col.len(), 4);
        assert!(!col.nullable());
        assert_eq!(col.value_at(2).unwrap(), Some(ScalarValue::Int(3)));
    }

    #[test]
    fn test_from_options_synthesizes_mask() {
        let col = Column::from_options(&[Some(1i32), None, Some(3)]);
        assert!(col.nullable());
        assert_eq!(col.null_count(), 1);
        assert_eq!(col.value_at(0).unwrap(), Some(ScalarValue::Int(1)));
        assert_eq!(col.value_at(1).unwrap(), None);
        assert_eq!(col.value_at(2).unwrap(), Some(ScalarValue::Int(3)));
    }

    #[test]
    fn test_from_parts_bounds_validation() {
        let data = Buffer::from_elements(&[1i32, 2, 3]);
        assert!(Column::from_parts(DataType::Int32, Some(data), None, 1, 3, None, vec![]).is_err());

        let data = Buffer::from_elements(&[1i32, 2, 3]);
        let col =
            Column::from_parts(DataType::Int32, Some(data), None, 1, 2, None, vec![]).unwrap();
        assert_eq!(col.value_at(0).unwrap(), Some(ScalarValue::Int(2)));
    }

    #[test]
    fn test_from_parts_validates_string_offsets() {
        let chars = Column::from_slice(&[b'a']);
        // Span [0, 100) exceeds the one-byte characters child.
        let offsets = Column::from_slice(&[0i32, 100]);
        assert!(matches!(
            Column::from_parts(DataType::Utf8, None, None, 0, 1, None, vec![offsets, chars.clone()]),
            Err(Error::Range(_))
        ));
        // Offsets must not go backwards.
        let offsets = Column::from_slice(&[0i32, 2, 1]);
        let two_chars = Column::from_slice(&[b'a', b'b']);
        assert!(matches!(
            Column::from_parts(DataType::Utf8, None, None, 0, 2, None, vec![offsets, two_chars]),
            Err(Error::Range(_))
        ));
        // A well-formed layout still constructs and reads.
        let offsets = Column::from_slice(&[0i32, 1]);
        let col =
            Column::from_parts(DataType::Utf8, None, None, 0, 1, None, vec![offsets, chars])
                .unwrap();
        assert_eq!(col.string_at(0).unwrap(), Some("a"));
    }

    #[test]
    fn test_slice_is_zero_copy() {
        let col = Column::from_slice(&[10i64, 20, 30, 40, 50]);
        let view = col.slice(1, 3).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.value_at(0).unwrap(), Some(ScalarValue::Int(20)));
        assert_eq!(view.value_at(2).unwrap(), Some(ScalarValue::Int(40)));
        // Same underlying allocation.
        assert!(Arc::ptr_eq(
            col.data.as_ref().unwrap(),
            view.data.as_ref().unwrap()
        ));
    }

    #[test]
    fn test_shared_buffer_survives_sibling_dispose() {
        let col = Column::from_slice(&[1i32, 2, 3, 4]);
        let mut a = col.slice(0, 2).unwrap();
        let b = col.slice(1, 3).unwrap();
        a.dispose();
        assert!(a.value_at(0).is_err());
        assert!(matches!(a.value_at(0), Err(Error::UseAfterDispose)));
        // Sibling view still reads the shared storage.
        assert_eq!(b.value_at(0).unwrap(), Some(ScalarValue::Int(2)));
        assert_eq!(b.value_at(2).unwrap(), Some(ScalarValue::Int(4)));
    }

    #[test]
    fn test_dispose_is_idempotent_and_recursive() {
        let mut col = Column::from_strings(&["a", "b"]);
        col.dispose();
        col.dispose();
        assert!(col.is_disposed());
        assert!(col.children.iter().all(|c| c.is_disposed()));
    }

    #[test]
    fn test_slice_null_count_recomputed() {
        let col = Column::from_options(&[Some(1i32), None, None, Some(4)]);
        let view = col.slice(1, 2).unwrap();
        assert_eq!(view.null_count(), 2);
        let view = col.slice(3, 1).unwrap();
        assert_eq!(view.null_count(), 0);
    }

    #[test]
    fn test_set_null_mask_scan() {
        let mut col = Column::from_slice(&[1i32, 2, 3]);
        let mut bits = vec![0u8; 1];
        mask::set_bit(&mut bits, 0);
        mask::set_bit(&mut bits, 2);
        col.set_null_mask(Some(Buffer::from_vec(bits)), None).unwrap();
        assert_eq!(col.null_count(), 1);
        assert!(col.is_null_at(1).unwrap());
    }

    #[test]
    fn test_set_null_mask_on_shared_view_fails() {
        let mut col = Column::from_slice(&[1i32, 2, 3]);
        let _view = col.slice(0, 2).unwrap();
        let result = col.set_null_mask(Some(Buffer::with_len(1)), Some(0));
        assert!(matches!(result, Err(Error::Aliasing(_))));
    }

    #[test]
    fn test_is_null_is_valid() {
        let col = Column::from_options(&[Some(1i32), None, Some(3)]);
        let nulls = col.is_null().unwrap();
        assert_eq!(*nulls.dtype(), DataType::Bool8);
        assert!(!nulls.nullable());
        assert_eq!(nulls.null_count(), 0);
        assert_eq!(
            nulls.to_host().unwrap(),
            vec![
                Some(ScalarValue::Bool(false)),
                Some(ScalarValue::Bool(true)),
                Some(ScalarValue::Bool(false)),
            ]
        );
        let valid = col.is_valid().unwrap();
        assert_eq!(
            valid.to_host().unwrap(),
            vec![
                Some(ScalarValue::Bool(true)),
                Some(ScalarValue::Bool(false)),
                Some(ScalarValue::Bool(true)),
            ]
        );
    }

    #[test]
    fn test_nans_to_nulls() {
        let col = Column::from_slice(&[1.0f64, f64::NAN, 3.0]);
        let out = col.nans_to_nulls().unwrap();
        assert_eq!(out.null_count(), 1);
        assert_eq!(out.value_at(1).unwrap(), None);
        assert_eq!(out.value_at(2).unwrap(), Some(ScalarValue::Float(3.0)));
        // Integer columns are rejected.
        assert!(Column::from_slice(&[1i32]).nans_to_nulls().is_err());
    }

    #[test]
    fn test_cast_numeric() {
        let col = Column::from_slice(&[1i32, -2, 300]);
        let as_f64 = col.cast(&DataType::Float64).unwrap();
        assert_eq!(as_f64.value_at(1).unwrap(), Some(ScalarValue::Float(-2.0)));
        // Narrowing wraps.
        let as_i8 = col.cast(&DataType::Int8).unwrap();
        assert_eq!(as_i8.value_at(2).unwrap(), Some(ScalarValue::Int(44)));
    }

    #[test]
    fn test_cast_rejects_strings_and_nested() {
        let col = Column::from_slice(&[1i32]);
        assert!(matches!(
            col.cast(&DataType::Utf8),
            Err(Error::UnsupportedCast { .. })
        ));
        assert!(matches!(
            col.cast(&DataType::dictionary(DataType::Int32)),
            Err(Error::UnsupportedCast { .. })
        ));
        let strings = Column::from_strings(&["1"]);
        assert!(matches!(
            strings.cast(&DataType::Int32),
            Err(Error::UnsupportedCast { .. })
        ));
    }

    #[test]
    fn test_cast_preserves_nulls() {
        let col = Column::from_options(&[Some(1i32), None]);
        let out = col.cast(&DataType::Int64).unwrap();
        assert_eq!(out.null_count(), 1);
        assert_eq!(out.value_at(1).unwrap(), None);
    }

    #[test]
    fn test_concat() {
        let a = Column::from_options(&[Some(1i32), None]);
        let b = Column::from_slice(&[3i32, 4]);
        let out = a.concat(&b).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out.null_count(), 1);
        assert_eq!(out.value_at(3).unwrap(), Some(ScalarValue::Int(4)));
        assert!(a.concat(&Column::from_slice(&[1.0f32])).is_err());
    }

    #[test]
    fn test_sequence() {
        let col = Column::sequence(4, &Scalar::int32(0), None).unwrap();
        assert_eq!(*col.dtype(), DataType::Int32);
        assert_eq!(
            col.to_host().unwrap(),
            vec![
                Some(ScalarValue::Int(0)),
                Some(ScalarValue::Int(1)),
                Some(ScalarValue::Int(2)),
                Some(ScalarValue::Int(3)),
            ]
        );
        let stepped =
            Column::sequence(3, &Scalar::float64(1.0), Some(&Scalar::float64(0.5))).unwrap();
        assert_eq!(
            stepped.to_host().unwrap(),
            vec![
                Some(ScalarValue::Float(1.0)),
                Some(ScalarValue::Float(1.5)),
                Some(ScalarValue::Float(2.0)),
            ]
        );
    }

    #[test]
    fn test_copy_rebases_view() {
        let col = Column::from_options(&[Some(1i32), None, Some(3), Some(4)]);
        let view = col.slice(1, 2).unwrap();
        let copy = view.copy().unwrap();
        assert_eq!(copy.view_offset(), 0);
        assert_eq!(copy.to_host().unwrap(), view.to_host().unwrap());
    }

    #[test]
    fn test_bools_to_mask() {
        let col = Column::from_bool_options(&[Some(true), Some(false), None, Some(true)]);
        let (buf, unset) = col.bools_to_mask().unwrap();
        assert_eq!(unset, 2);
        assert!(mask::bit_is_set(buf.as_slice(), 0));
        assert!(!mask::bit_is_set(buf.as_slice(), 1));
        assert!(!mask::bit_is_set(buf.as_slice(), 2));
        assert!(mask::bit_is_set(buf.as_slice(), 3));
    }

    #[test]
    fn test_dictionary_column() {
        let keys = Column::from_strings(&["low", "mid", "high"]);
        let indices = Column::from_options(&[Some(0i32), Some(2), None, Some(1)]);
        let col = Column::dictionary(keys, indices).unwrap();
        assert_eq!(col.len(), 4);
        assert_eq!(
            col.value_at(1).unwrap(),
            Some(ScalarValue::Utf8("high".to_string()))
        );
        assert_eq!(col.value_at(2).unwrap(), None);
    }

    #[test]
    fn test_list_column() {
        let col =
            Column::from_list_slices(&[Some(&[1i32, 2][..]), None, Some(&[3, 4, 5][..])]);
        assert_eq!(col.len(), 3);
        let first = col.list_at(0).unwrap().unwrap();
        assert_eq!(
            first.to_host().unwrap(),
            vec![Some(ScalarValue::Int(1)), Some(ScalarValue::Int(2))]
        );
        assert!(col.list_at(1).unwrap().is_none());
        let last = col.list_at(2).unwrap().unwrap();
        assert_eq!(last.len(), 3);
    }
}
