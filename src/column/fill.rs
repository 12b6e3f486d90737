//! Range fill and null/NaN replacement.

use super::strings::Utf8Builder;
use super::{push_f64_as, push_i64_as, push_u64_as, scalar_f64, scalar_i64, scalar_u64, Column};
use crate::mask::{self, ValidityBuilder};
use crate::scalar::Scalar;
use crate::types::DataType;
use crate::{Error, Result};
use std::sync::Arc;

/// Source of replacement values for [`Column::replace_nulls`].
pub enum ReplaceNulls<'a> {
    /// Every null row takes this scalar's value (or stays null for a null
    /// scalar).
    Scalar(&'a Scalar),
    /// Each null row takes the same row of this column.
    Column(&'a Column),
    /// Forward fill: each null row takes the nearest preceding valid value.
    Preceding,
    /// Backward fill: each null row takes the nearest following valid value.
    Following,
}

/// Source of replacement values for [`Column::replace_nans`].
pub enum Replacement<'a> {
    Scalar(&'a Scalar),
    Column(&'a Column),
}

impl Column {
    fn check_fill_range(&self, begin: usize, end: usize) -> Result<()> {
        if begin > end || end > self.len() {
            return Err(Error::Range(format!(
                "fill range [{}, {}) invalid for length {}",
                begin,
                end,
                self.len()
            )));
        }
        Ok(())
    }

    fn check_fill_value(&self, value: &Scalar) -> Result<()> {
        if value.dtype() != self.dtype() {
            return Err(Error::TypeError(format!(
                "cannot fill {} column with {} value",
                self.dtype().name(),
                value.dtype().name()
            )));
        }
        Ok(())
    }

    /// Returns a copy with rows `[begin, end)` set to `value`. A null scalar
    /// nulls the range.
    pub fn fill(&self, value: &Scalar, begin: usize, end: usize) -> Result<Column> {
        self.ensure_live()?;
        self.check_fill_range(begin, end)?;
        self.check_fill_value(value)?;
        match self.dtype() {
            d if d.is_fixed_width() => {
                let width = d.size_of().unwrap();
                let mut bytes = Vec::with_capacity(self.len() * width);
                let mut validity = ValidityBuilder::new(self.len());
                for row in 0..self.len() {
                    if (begin..end).contains(&row) {
                        match value.value() {
                            Some(v) => {
                                push_scalar(&mut bytes, d, v);
                                validity.push(true);
                            }
                            None => {
                                push_i64_as(&mut bytes, d, 0);
                                validity.push(false);
                            }
                        }
                    } else if self.valid_at(row) {
                        let data = self.data_buffer()?;
                        let start = (self.view_offset() + row) * width;
                        bytes.extend_from_slice(&data.as_slice()[start..start + width]);
                        validity.push(true);
                    } else {
                        push_i64_as(&mut bytes, d, 0);
                        validity.push(false);
                    }
                }
                Ok(Column::new_fixed(
                    d.clone(),
                    bytes,
                    validity.finish(),
                    self.len(),
                ))
            }
            DataType::Utf8 => {
                let fill_value = match value.value() {
                    Some(crate::scalar::ScalarValue::Utf8(s)) => Some(s.as_str()),
                    Some(_) => unreachable!("type checked above"),
                    None => None,
                };
                let mut builder = Utf8Builder::new(self.len());
                for row in 0..self.len() {
                    let v = if (begin..end).contains(&row) {
                        fill_value
                    } else {
                        self.string_at(row)?
                    };
                    match v {
                        Some(s) => builder.append(s),
                        None => builder.append_null(),
                    }
                }
                Ok(builder.finish())
            }
            other => Err(Error::TypeError(format!(
                "fill is not supported for {}",
                other.name()
            ))),
        }
    }

    /// Sets rows `[begin, end)` to `value` in this column's own storage.
    ///
    /// Fixed-width columns only. Fails with [`Error::Aliasing`] when the data
    /// or mask buffer is shared with another live view.
    pub fn fill_in_place(&mut self, value: &Scalar, begin: usize, end: usize) -> Result<()> {
        self.ensure_live()?;
        self.check_fill_range(begin, end)?;
        self.check_fill_value(value)?;
        if !self.dtype().is_fixed_width() {
            return Err(Error::TypeError(format!(
                "fill_in_place is not supported for {}",
                self.dtype().name()
            )));
        }
        self.require_exclusive()?;

        let dtype = self.dtype().clone();
        let offset = self.view_offset();
        let total = offset + self.len();

        match value.value() {
            Some(v) => {
                let width = dtype.size_of().unwrap();
                let mut element = Vec::with_capacity(width);
                push_scalar(&mut element, &dtype, v);
                {
                    let data = self
                        .data
                        .as_mut()
                        .ok_or_else(|| Error::TypeError("column has no data buffer".to_string()))?;
                    let data = Arc::get_mut(data).ok_or_else(|| {
                        Error::Aliasing("data buffer is shared with another live view".to_string())
                    })?;
                    for row in begin..end {
                        let start = (offset + row) * width;
                        data.as_mut_slice()[start..start + width].copy_from_slice(&element);
                    }
                }
                if let Some(mask) = self.mask.as_mut() {
                    let mask = Arc::get_mut(mask).ok_or_else(|| {
                        Error::Aliasing("null mask buffer is shared with another live view".to_string())
                    })?;
                    for row in begin..end {
                        mask::set_bit(mask.as_mut_slice(), offset + row);
                    }
                }
            }
            None => {
                // Nulling a range needs a mask; synthesize an all-valid one
                // when the column has none yet.
                if self.mask.is_none() {
                    let mut bits = vec![0u8; mask::mask_len(total)];
                    for i in 0..total {
                        mask::set_bit(&mut bits, i);
                    }
                    self.mask = Some(Arc::new(crate::buffer::Buffer::from_vec(bits)));
                }
                let mask = self.mask.as_mut().unwrap();
                let mask = Arc::get_mut(mask).ok_or_else(|| {
                    Error::Aliasing("null mask buffer is shared with another live view".to_string())
                })?;
                for row in begin..end {
                    mask::clear_bit(mask.as_mut_slice(), offset + row);
                }
            }
        }
        self.null_count
            .store(u64::MAX, std::sync::atomic::Ordering::Relaxed);
        // Resolve the cache eagerly while we hold the exclusive handle.
        self.null_count();
        Ok(())
    }

    /// Returns a copy with null rows replaced according to `policy`.
    pub fn replace_nulls(&self, policy: ReplaceNulls<'_>) -> Result<Column> {
        self.ensure_live()?;
        match &policy {
            ReplaceNulls::Scalar(value) => self.check_fill_value(value)?,
            ReplaceNulls::Column(other) => {
                other.ensure_live()?;
                if other.dtype() != self.dtype() {
                    return Err(Error::TypeError(format!(
                        "cannot replace nulls in {} column from {} column",
                        self.dtype().name(),
                        other.dtype().name()
                    )));
                }
                if other.len() != self.len() {
                    return Err(Error::ShapeMismatch {
                        expected: self.len(),
                        actual: other.len(),
                    });
                }
            }
            _ => {}
        }

        match self.dtype() {
            d if d.is_fixed_width() => {
                let width = d.size_of().unwrap();
                let data = self.data_buffer()?;
                let element = |row: usize| -> &[u8] {
                    let start = (self.view_offset() + row) * width;
                    &data.as_slice()[start..start + width]
                };
                let mut bytes = Vec::with_capacity(self.len() * width);
                let mut validity = ValidityBuilder::new(self.len());

                // For backward fill, know each null row's successor up front.
                let following = match policy {
                    ReplaceNulls::Following => Some(self.following_valid_rows()),
                    _ => None,
                };
                let mut preceding: Option<usize> = None;

                for row in 0..self.len() {
                    if self.valid_at(row) {
                        bytes.extend_from_slice(element(row));
                        validity.push(true);
                        preceding = Some(row);
                        continue;
                    }
                    match &policy {
                        ReplaceNulls::Scalar(value) => match value.value() {
                            Some(v) => {
                                push_scalar(&mut bytes, d, v);
                                validity.push(true);
                            }
                            None => {
                                push_i64_as(&mut bytes, d, 0);
                                validity.push(false);
                            }
                        },
                        ReplaceNulls::Column(other) => {
                            if other.valid_at(row) {
                                let src = other.data_buffer()?;
                                let start = (other.view_offset() + row) * width;
                                bytes.extend_from_slice(&src.as_slice()[start..start + width]);
                                validity.push(true);
                            } else {
                                push_i64_as(&mut bytes, d, 0);
                                validity.push(false);
                            }
                        }
                        ReplaceNulls::Preceding => match preceding {
                            Some(p) => {
                                bytes.extend_from_slice(element(p));
                                validity.push(true);
                            }
                            None => {
                                push_i64_as(&mut bytes, d, 0);
                                validity.push(false);
                            }
                        },
                        ReplaceNulls::Following => {
                            match following.as_ref().unwrap()[row] {
                                Some(n) => {
                                    bytes.extend_from_slice(element(n));
                                    validity.push(true);
                                }
                                None => {
                                    push_i64_as(&mut bytes, d, 0);
                                    validity.push(false);
                                }
                            }
                        }
                    }
                }
                Ok(Column::new_fixed(
                    d.clone(),
                    bytes,
                    validity.finish(),
                    self.len(),
                ))
            }
            DataType::Utf8 => {
                let following = match policy {
                    ReplaceNulls::Following => Some(self.following_valid_rows()),
                    _ => None,
                };
                let mut preceding: Option<usize> = None;
                let mut builder = Utf8Builder::new(self.len());
                for row in 0..self.len() {
                    if let Some(s) = self.string_at(row)? {
                        builder.append(s);
                        preceding = Some(row);
                        continue;
                    }
                    let replacement: Option<String> = match &policy {
                        ReplaceNulls::Scalar(value) => match value.value() {
                            Some(crate::scalar::ScalarValue::Utf8(s)) => Some(s.clone()),
                            _ => None,
                        },
                        ReplaceNulls::Column(other) => {
                            other.string_at(row)?.map(str::to_string)
                        }
                        ReplaceNulls::Preceding => match preceding {
                            Some(p) => self.string_at(p)?.map(str::to_string),
                            None => None,
                        },
                        ReplaceNulls::Following => match following.as_ref().unwrap()[row] {
                            Some(n) => self.string_at(n)?.map(str::to_string),
                            None => None,
                        },
                    };
                    match replacement {
                        Some(s) => builder.append(&s),
                        None => builder.append_null(),
                    }
                }
                Ok(builder.finish())
            }
            other => Err(Error::TypeError(format!(
                "replace_nulls is not supported for {}",
                other.name()
            ))),
        }
    }

    /// For each row, the nearest valid row at or after it.
    fn following_valid_rows(&self) -> Vec<Option<usize>> {
        let mut out = vec![None; self.len()];
        let mut next = None;
        for row in (0..self.len()).rev() {
            if self.valid_at(row) {
                next = Some(row);
            }
            out[row] = next;
        }
        out
    }

    /// Returns a copy with NaN values replaced. Floating columns only; the
    /// replacement must match the column's type.
    pub fn replace_nans(&self, replacement: Replacement<'_>) -> Result<Column> {
        self.ensure_live()?;
        if !self.dtype().is_float() {
            return Err(Error::TypeError(format!(
                "replace_nans requires a floating-point column, got {}",
                self.dtype().name()
            )));
        }
        match &replacement {
            Replacement::Scalar(value) => self.check_fill_value(value)?,
            Replacement::Column(other) => {
                other.ensure_live()?;
                if other.dtype() != self.dtype() {
                    return Err(Error::TypeError(format!(
                        "cannot replace NaNs in {} column from {} column",
                        self.dtype().name(),
                        other.dtype().name()
                    )));
                }
                if other.len() != self.len() {
                    return Err(Error::ShapeMismatch {
                        expected: self.len(),
                        actual: other.len(),
                    });
                }
            }
        }

        let dtype = self.dtype().clone();
        let width = dtype.size_of().unwrap();
        let mut bytes = Vec::with_capacity(self.len() * width);
        let mut validity = ValidityBuilder::new(self.len());
        for row in 0..self.len() {
            if !self.valid_at(row) {
                push_f64_as(&mut bytes, &dtype, 0.0);
                validity.push(false);
                continue;
            }
            let v = self.value_f64(row)?;
            if !v.is_nan() {
                push_f64_as(&mut bytes, &dtype, v);
                validity.push(true);
                continue;
            }
            match &replacement {
                Replacement::Scalar(value) => match value.value() {
                    Some(r) => {
                        push_f64_as(&mut bytes, &dtype, scalar_f64(r));
                        validity.push(true);
                    }
                    None => {
                        push_f64_as(&mut bytes, &dtype, 0.0);
                        validity.push(false);
                    }
                },
                Replacement::Column(other) => {
                    if other.valid_at(row) {
                        push_f64_as(&mut bytes, &dtype, other.value_f64(row)?);
                        validity.push(true);
                    } else {
                        push_f64_as(&mut bytes, &dtype, 0.0);
                        validity.push(false);
                    }
                }
            }
        }
        Ok(Column::new_fixed(dtype, bytes, validity.finish(), self.len()))
    }
}

fn push_scalar(out: &mut Vec<u8>, dtype: &DataType, v: &crate::scalar::ScalarValue) {
    if dtype.is_float() {
        push_f64_as(out, dtype, scalar_f64(v));
    } else if dtype.is_unsigned_integer() {
        push_u64_as(out, dtype, scalar_u64(v));
    } else {
        push_i64_as(out, dtype, scalar_i64(v));
    }
}
