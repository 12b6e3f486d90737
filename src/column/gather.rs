//! Row selection: gather, scatter and boolean filtering.

use super::strings::Utf8Builder;
use super::Column;
use crate::mask::ValidityBuilder;
use crate::scalar::ScalarValue;
use crate::types::DataType;
use crate::{Error, Result};
use tracing::debug;

impl Column {
    /// Reorders rows by an integer selection column.
    ///
    /// A negative index `k` addresses row `k + len`. A null selection row
    /// produces a null output row. Out-of-bounds indices produce null rows
    /// when `nullify_out_of_bounds` is set and fail with [`Error::Range`]
    /// otherwise.
    pub fn gather(&self, selection: &Column, nullify_out_of_bounds: bool) -> Result<Column> {
        self.ensure_live()?;
        selection.ensure_live()?;
        if !selection.dtype().is_integer() {
            return Err(Error::TypeError(format!(
                "gather selection must be an integer column, got {}",
                selection.dtype().name()
            )));
        }
        debug!(
            "gather {} rows from {} column of {}",
            selection.len(),
            self.dtype().name(),
            self.len()
        );

        // Resolve every selection row up front; the per-type loops below
        // only see in-bounds indices or None.
        let mut rows: Vec<Option<usize>> = Vec::with_capacity(selection.len());
        for i in 0..selection.len() {
            if !selection.valid_at(i) {
                rows.push(None);
                continue;
            }
            let mut idx = selection.value_i64(i)?;
            if idx < 0 {
                idx += self.len() as i64;
            }
            if idx < 0 || idx as usize >= self.len() {
                if nullify_out_of_bounds {
                    rows.push(None);
                    continue;
                }
                return Err(Error::Range(format!(
                    "gather index {} out of bounds for length {}",
                    selection.value_i64(i)?,
                    self.len()
                )));
            }
            rows.push(Some(idx as usize));
        }

        match self.dtype() {
            d if d.is_fixed_width() => {
                let width = d.size_of().unwrap();
                let data = self.data_buffer()?;
                let mut bytes = Vec::with_capacity(rows.len() * width);
                let mut validity = ValidityBuilder::new(rows.len());
                for row in &rows {
                    match row {
                        Some(idx) if self.valid_at(*idx) => {
                            let start = (self.view_offset() + idx) * width;
                            bytes.extend_from_slice(&data.as_slice()[start..start + width]);
                            validity.push(true);
                        }
                        _ => {
                            bytes.extend(std::iter::repeat(0u8).take(width));
                            validity.push(false);
                        }
                    }
                }
                Ok(Column::new_fixed(
                    d.clone(),
                    bytes,
                    validity.finish(),
                    rows.len(),
                ))
            }
            DataType::Utf8 => {
                let mut builder = Utf8Builder::new(rows.len());
                for row in &rows {
                    match row {
                        Some(idx) => match self.string_at(*idx)? {
                            Some(s) => builder.append(s),
                            None => builder.append_null(),
                        },
                        None => builder.append_null(),
                    }
                }
                Ok(builder.finish())
            }
            DataType::List(_) => {
                let mut offsets: Vec<i32> = Vec::with_capacity(rows.len() + 1);
                offsets.push(0);
                let mut value_rows: Vec<i64> = Vec::new();
                let mut validity = ValidityBuilder::new(rows.len());
                for row in &rows {
                    match row {
                        Some(idx) if self.valid_at(*idx) => {
                            let abs = self.view_offset() + idx;
                            let start = self.children[0].value_i64(abs)?;
                            let end = self.children[0].value_i64(abs + 1)?;
                            value_rows.extend(start..end);
                            validity.push(true);
                        }
                        _ => validity.push(false),
                    }
                    offsets.push(value_rows.len() as i32);
                }
                let values = self
                    .children[1]
                    .gather(&Column::from_slice(&value_rows), false)?;
                Column::from_parts(
                    self.dtype().clone(),
                    None,
                    validity
                        .finish()
                        .map(|(bits, _)| crate::buffer::Buffer::from_vec(bits)),
                    0,
                    rows.len(),
                    None,
                    vec![Column::from_slice(&offsets), values],
                )
            }
            DataType::Dictionary(_) => {
                // Reorder the indices, keep the keys intact.
                let mut index_bytes = Vec::with_capacity(rows.len() * 4);
                let mut validity = ValidityBuilder::new(rows.len());
                for row in &rows {
                    match row {
                        Some(idx) if self.valid_at(*idx) => {
                            let v = self.children[0].value_i64(self.view_offset() + idx)? as i32;
                            index_bytes.extend_from_slice(&v.to_le_bytes());
                            validity.push(true);
                        }
                        _ => {
                            index_bytes.extend_from_slice(&0i32.to_le_bytes());
                            validity.push(false);
                        }
                    }
                }
                let indices =
                    Column::new_fixed(DataType::Int32, index_bytes, None, rows.len());
                Column::from_parts(
                    self.dtype().clone(),
                    None,
                    validity
                        .finish()
                        .map(|(bits, _)| crate::buffer::Buffer::from_vec(bits)),
                    0,
                    rows.len(),
                    None,
                    vec![indices, self.children[1].clone()],
                )
            }
            _ => unreachable!(),
        }
    }

    /// Writes `source[i]` into position `positions[i]` of a copy of this
    /// column. Positions must be in bounds (negative indices wrap once);
    /// out-of-bounds positions fail with [`Error::Range`].
    pub fn scatter(&self, source: &Column, positions: &Column) -> Result<Column> {
        self.ensure_live()?;
        source.ensure_live()?;
        positions.ensure_live()?;
        if !positions.dtype().is_integer() {
            return Err(Error::TypeError(format!(
                "scatter positions must be an integer column, got {}",
                positions.dtype().name()
            )));
        }
        if source.dtype() != self.dtype() {
            return Err(Error::TypeError(format!(
                "cannot scatter {} values into {} column",
                source.dtype().name(),
                self.dtype().name()
            )));
        }
        if source.len() != positions.len() {
            return Err(Error::ShapeMismatch {
                expected: positions.len(),
                actual: source.len(),
            });
        }

        let mut resolved = Vec::with_capacity(positions.len());
        for i in 0..positions.len() {
            if !positions.valid_at(i) {
                return Err(Error::TypeError(
                    "scatter positions must not contain nulls".to_string(),
                ));
            }
            let mut pos = positions.value_i64(i)?;
            if pos < 0 {
                pos += self.len() as i64;
            }
            if pos < 0 || pos as usize >= self.len() {
                return Err(Error::Range(format!(
                    "scatter position {} out of bounds for length {}",
                    positions.value_i64(i)?,
                    self.len()
                )));
            }
            resolved.push(pos as usize);
        }

        match self.dtype() {
            d if d.is_fixed_width() => {
                let width = d.size_of().unwrap();
                let data = self.data_buffer()?;
                let start = self.view_offset() * width;
                let mut bytes = data.as_slice()[start..start + self.len() * width].to_vec();
                let mut valid: Vec<bool> = (0..self.len()).map(|r| self.valid_at(r)).collect();
                let src_data = source.data_buffer()?;
                for (i, &pos) in resolved.iter().enumerate() {
                    let src_start = (source.view_offset() + i) * width;
                    bytes[pos * width..(pos + 1) * width]
                        .copy_from_slice(&src_data.as_slice()[src_start..src_start + width]);
                    valid[pos] = source.valid_at(i);
                }
                Ok(Column::new_fixed(
                    d.clone(),
                    bytes,
                    crate::mask::mask_from_bools(&valid),
                    self.len(),
                ))
            }
            DataType::Utf8 => {
                let mut out: Vec<Option<String>> = (0..self.len())
                    .map(|r| self.string_at(r).map(|s| s.map(str::to_string)))
                    .collect::<Result<_>>()?;
                for (i, &pos) in resolved.iter().enumerate() {
                    out[pos] = source.string_at(i)?.map(str::to_string);
                }
                Ok(Column::from_string_options(&out))
            }
            other => Err(Error::TypeError(format!(
                "scatter is not supported for {}",
                other.name()
            ))),
        }
    }

    /// Keeps the rows where a Bool8 selection is true; null selection rows
    /// drop the row.
    pub fn apply_boolean_mask(&self, selection: &Column) -> Result<Column> {
        self.ensure_live()?;
        selection.ensure_live()?;
        if *selection.dtype() != DataType::Bool8 {
            return Err(Error::TypeError(format!(
                "boolean mask must be Bool8, got {}",
                selection.dtype().name()
            )));
        }
        if selection.len() != self.len() {
            return Err(Error::ShapeMismatch {
                expected: self.len(),
                actual: selection.len(),
            });
        }
        let mut keep: Vec<i64> = Vec::new();
        for row in 0..selection.len() {
            if selection.valid_at(row) && selection.value_i64(row)? != 0 {
                keep.push(row as i64);
            }
        }
        self.gather(&Column::from_slice(&keep), false)
    }

    /// Removes null rows.
    pub fn drop_nulls(&self) -> Result<Column> {
        self.ensure_live()?;
        let mut keep: Vec<i64> = Vec::new();
        for row in 0..self.len() {
            if self.valid_at(row) {
                keep.push(row as i64);
            }
        }
        self.gather(&Column::from_slice(&keep), false)
    }

    /// Removes NaN rows (nulls are kept). Floating columns only.
    pub fn drop_nans(&self) -> Result<Column> {
        self.ensure_live()?;
        if !self.dtype().is_float() {
            return Err(Error::TypeError(format!(
                "drop_nans requires a floating-point column, got {}",
                self.dtype().name()
            )));
        }
        let mut keep: Vec<i64> = Vec::new();
        for row in 0..self.len() {
            if !self.valid_at(row) || !self.value_f64(row)?.is_nan() {
                keep.push(row as i64);
            }
        }
        self.gather(&Column::from_slice(&keep), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_fixed_width() {
        let col = Column::from_slice(&[10i32, 20, 30, 40]);
        let sel = Column::from_slice(&[3i32, 0, 2]);
        let out = col.gather(&sel, false).unwrap();
        assert_eq!(
            out.to_host().unwrap(),
            vec![
                Some(ScalarValue::Int(40)),
                Some(ScalarValue::Int(10)),
                Some(ScalarValue::Int(30)),
            ]
        );
    }

    #[test]
    fn test_gather_negative_indices() {
        let col = Column::from_slice(&[10i32, 20, 30, 40]);
        let sel = Column::from_slice(&[-1i32, -4]);
        let out = col.gather(&sel, false).unwrap();
        assert_eq!(
            out.to_host().unwrap(),
            vec![Some(ScalarValue::Int(40)), Some(ScalarValue::Int(10))]
        );
    }

    #[test]
    fn test_gather_out_of_bounds() {
        let col = Column::from_slice(&[10i32, 20]);
        let sel = Column::from_slice(&[0i32, 5]);
        assert!(matches!(col.gather(&sel, false), Err(Error::Range(_))));
        let out = col.gather(&sel, true).unwrap();
        assert_eq!(
            out.to_host().unwrap(),
            vec![Some(ScalarValue::Int(10)), None]
        );
    }

    #[test]
    fn test_gather_null_selection_rows() {
        let col = Column::from_slice(&[10i32, 20, 30]);
        let sel = Column::from_options(&[Some(1i32), None]);
        let out = col.gather(&sel, false).unwrap();
        assert_eq!(
            out.to_host().unwrap(),
            vec![Some(ScalarValue::Int(20)), None]
        );
    }

    #[test]
    fn test_gather_strings() {
        let col = Column::from_string_options(&[Some("a"), None, Some("c")]);
        let sel = Column::from_slice(&[2i32, 1, 0, 2]);
        let out = col.gather(&sel, false).unwrap();
        assert_eq!(out.string_at(0).unwrap(), Some("c"));
        assert_eq!(out.string_at(1).unwrap(), None);
        assert_eq!(out.string_at(2).unwrap(), Some("a"));
        assert_eq!(out.string_at(3).unwrap(), Some("c"));
    }

    #[test]
    fn test_gather_lists() {
        let col =
            Column::from_list_slices(&[Some(&[1i32, 2][..]), Some(&[3][..]), Some(&[4, 5, 6][..])]);
        let sel = Column::from_slice(&[2i32, 0]);
        let out = col.gather(&sel, false).unwrap();
        let first = out.list_at(0).unwrap().unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first.value_at(0).unwrap(), Some(ScalarValue::Int(4)));
        let second = out.list_at(1).unwrap().unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second.value_at(1).unwrap(), Some(ScalarValue::Int(2)));
    }

    #[test]
    fn test_gather_dictionary_keeps_keys() {
        let keys = Column::from_strings(&["x", "y", "z"]);
        let indices = Column::from_slice(&[0i32, 1, 2, 1]);
        let col = Column::dictionary(keys, indices).unwrap();
        let sel = Column::from_slice(&[3i32, 0]);
        let out = col.gather(&sel, false).unwrap();
        assert_eq!(out.child(1).unwrap().len(), 3);
        assert_eq!(
            out.value_at(0).unwrap(),
            Some(ScalarValue::Utf8("y".to_string()))
        );
        assert_eq!(
            out.value_at(1).unwrap(),
            Some(ScalarValue::Utf8("x".to_string()))
        );
    }

    #[test]
    fn test_gather_on_view() {
        let col = Column::from_slice(&[0i32, 10, 20, 30, 40]);
        let view = col.slice(1, 3).unwrap();
        let sel = Column::from_slice(&[2i32, 0]);
        let out = view.gather(&sel, false).unwrap();
        assert_eq!(
            out.to_host().unwrap(),
            vec![Some(ScalarValue::Int(30)), Some(ScalarValue::Int(10))]
        );
    }

    #[test]
    fn test_scatter() {
        let col = Column::from_slice(&[1i32, 2, 3, 4]);
        let src = Column::from_options(&[Some(90i32), None]);
        let pos = Column::from_slice(&[1i32, -1]);
        let out = col.scatter(&src, &pos).unwrap();
        assert_eq!(
            out.to_host().unwrap(),
            vec![
                Some(ScalarValue::Int(1)),
                Some(ScalarValue::Int(90)),
                Some(ScalarValue::Int(3)),
                None,
            ]
        );
        // Source is untouched.
        assert_eq!(col.value_at(1).unwrap(), Some(ScalarValue::Int(2)));
    }

    #[test]
    fn test_scatter_strings() {
        let col = Column::from_strings(&["a", "b", "c"]);
        let src = Column::from_strings(&["Z"]);
        let pos = Column::from_slice(&[0i32]);
        let out = col.scatter(&src, &pos).unwrap();
        assert_eq!(out.string_at(0).unwrap(), Some("Z"));
        assert_eq!(out.string_at(1).unwrap(), Some("b"));
    }

    #[test]
    fn test_scatter_bounds_checked() {
        let col = Column::from_slice(&[1i32, 2]);
        let src = Column::from_slice(&[9i32]);
        let pos = Column::from_slice(&[7i32]);
        assert!(matches!(col.scatter(&src, &pos), Err(Error::Range(_))));
    }

    #[test]
    fn test_apply_boolean_mask() {
        let col = Column::from_slice(&[1i32, 2, 3, 4]);
        let mask = Column::from_bool_options(&[Some(true), Some(false), None, Some(true)]);
        let out = col.apply_boolean_mask(&mask).unwrap();
        assert_eq!(
            out.to_host().unwrap(),
            vec![Some(ScalarValue::Int(1)), Some(ScalarValue::Int(4))]
        );
    }

    #[test]
    fn test_drop_nulls() {
        let col = Column::from_options(&[Some(1i32), None, Some(3)]);
        let out = col.drop_nulls().unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.null_count(), 0);
    }

    #[test]
    fn test_drop_nans_keeps_nulls() {
        let col = Column::from_options(&[Some(1.0f64), Some(f64::NAN), None]);
        let out = col.drop_nans().unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.value_at(0).unwrap(), Some(ScalarValue::Float(1.0)));
        assert_eq!(out.value_at(1).unwrap(), None);
        assert!(Column::from_slice(&[1i32]).drop_nans().is_err());
    }
}
