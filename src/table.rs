//! Ordered collections of equal-length named columns.

use crate::column::Column;
use crate::column::strings::Utf8Builder;
use crate::scalar::ScalarValue;
use crate::types::DataType;
use crate::{Error, Result};
use tracing::debug;

/// An ordered name-to-column mapping where every column has the same length.
#[derive(Debug, Default, Clone)]
pub struct Table {
    columns: Vec<(String, Column)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from named columns, validating name uniqueness and
    /// equal lengths.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self> {
        let mut table = Self::new();
        for (name, column) in columns {
            table.append_column(name, column)?;
        }
        Ok(table)
    }

    /// Appends a column; the first column fixes the table's row count.
    pub fn append_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        column.ensure_live()?;
        if self.column(&name).is_some() {
            return Err(Error::TypeError(format!(
                "table already has a column named {:?}",
                name
            )));
        }
        if let Some((_, first)) = self.columns.first() {
            if column.len() != first.len() {
                return Err(Error::ShapeMismatch {
                    expected: first.len(),
                    actual: column.len(),
                });
            }
        }
        self.columns.push((name, column));
        Ok(())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|(_, c)| c.len()).unwrap_or(0)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index).map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Reorders every column by the same selection (see [`Column::gather`]).
    pub fn gather(&self, selection: &Column, nullify_out_of_bounds: bool) -> Result<Table> {
        debug!(
            "gather {} rows across {} columns",
            selection.len(),
            self.num_columns()
        );
        let mut out = Table::new();
        for (name, column) in &self.columns {
            out.append_column(name.clone(), column.gather(selection, nullify_out_of_bounds)?)?;
        }
        Ok(out)
    }

    /// Joins the string columns of this table row-wise into one string
    /// column, `separator` between the parts.
    ///
    /// With `null_repr` set, null parts render as that string; without it, a
    /// row with any null part is null. When `separate_nulls` is false, no
    /// separator is emitted before a rendered null part.
    pub fn concatenate(
        &self,
        separator: &str,
        null_repr: Option<&str>,
        separate_nulls: bool,
    ) -> Result<Column> {
        if self.columns.is_empty() {
            return Err(Error::TypeError(
                "concatenate requires at least one column".to_string(),
            ));
        }
        for (name, column) in &self.columns {
            column.ensure_live()?;
            if *column.dtype() != DataType::Utf8 {
                return Err(Error::TypeError(format!(
                    "concatenate requires Utf8 columns, column {:?} is {}",
                    name,
                    column.dtype().name()
                )));
            }
        }

        let mut builder = Utf8Builder::new(self.num_rows());
        'rows: for row in 0..self.num_rows() {
            let mut out = String::new();
            let mut first = true;
            for (_, column) in &self.columns {
                match column.string_at(row)? {
                    Some(s) => {
                        if !first {
                            out.push_str(separator);
                        }
                        out.push_str(s);
                        first = false;
                    }
                    None => {
                        let Some(repr) = null_repr else {
                            builder.append_null();
                            continue 'rows;
                        };
                        if separate_nulls && !first {
                            out.push_str(separator);
                        }
                        out.push_str(repr);
                        first = false;
                    }
                }
            }
            builder.append(&out);
        }
        Ok(builder.finish())
    }

    /// Row-major materialization; each row holds one value per column.
    pub fn to_host(&self) -> Result<Vec<Vec<Option<ScalarValue>>>> {
        let mut rows = Vec::with_capacity(self.num_rows());
        for row in 0..self.num_rows() {
            let mut values = Vec::with_capacity(self.num_columns());
            for (_, column) in &self.columns {
                values.push(column.value_at(row)?);
            }
            rows.push(values);
        }
        Ok(rows)
    }
}
