//! Reductions and cumulative scans.
//!
//! Null rows are skipped; a reduction over an empty or all-null column
//! yields `None`. Cumulative scans carry the running value across null rows,
//! which stay null in the output.

use super::{push_f64_as, push_i64_as, push_u64_as, Column};
use crate::mask::ValidityBuilder;
use crate::scalar::ScalarValue;
use crate::types::DataType;
use crate::{Error, Result};
use std::collections::HashSet;

/// Quantile interpolation strategy between bracketing data points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Lower,
    Higher,
    Nearest,
    Midpoint,
}

#[derive(Clone, Copy, PartialEq)]
enum Domain {
    Int,
    Uint,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanOp {
    Sum,
    Product,
    Min,
    Max,
}

/// Hashable canonical element for distinct counting. Floats normalize NaN
/// to a single pattern and -0.0 to 0.0 before taking bits.
#[derive(Hash, PartialEq, Eq)]
enum DistinctKey {
    Int(i64),
    Uint(u64),
    Float(u64),
    Bool(bool),
    Str(String),
}

impl Column {
    fn reduce_domain(&self) -> Result<Domain> {
        if self.dtype().is_float() {
            Ok(Domain::Float)
        } else if self.dtype().is_unsigned_integer() {
            Ok(Domain::Uint)
        } else if self.dtype().is_numeric() || *self.dtype() == DataType::Bool8 {
            Ok(Domain::Int)
        } else {
            Err(Error::TypeError(format!(
                "reduction requires a numeric or boolean column, got {}",
                self.dtype().name()
            )))
        }
    }

    fn wrap_domain_value(&self, domain: Domain, i: i64, u: u64, f: f64) -> ScalarValue {
        match domain {
            Domain::Float => ScalarValue::Float(f),
            Domain::Uint => ScalarValue::Uint(u),
            Domain::Int => {
                if *self.dtype() == DataType::Bool8 {
                    ScalarValue::Bool(i != 0)
                } else {
                    ScalarValue::Int(i)
                }
            }
        }
    }

    /// Valid rows as `f64`, for the floating-point statistics.
    fn valid_f64s(&self) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(self.len() - self.null_count());
        for row in 0..self.len() {
            if self.valid_at(row) {
                out.push(self.value_f64(row)?);
            }
        }
        Ok(out)
    }

    /// Smallest valid value, `None` when no row is valid.
    pub fn min(&self) -> Result<Option<ScalarValue>> {
        Ok(self.minmax()?.map(|(min, _)| min))
    }

    /// Largest valid value, `None` when no row is valid.
    pub fn max(&self) -> Result<Option<ScalarValue>> {
        Ok(self.minmax()?.map(|(_, max)| max))
    }

    /// Both extremes in one pass.
    pub fn minmax(&self) -> Result<Option<(ScalarValue, ScalarValue)>> {
        self.ensure_live()?;
        let domain = self.reduce_domain()?;
        let mut acc: Option<(i64, i64, u64, u64, f64, f64)> = None;
        for row in 0..self.len() {
            if !self.valid_at(row) {
                continue;
            }
            let (i, u, f) = (self.value_i64(row)?, self.value_u64(row)?, self.value_f64(row)?);
            acc = Some(match acc {
                None => (i, i, u, u, f, f),
                Some((lo_i, hi_i, lo_u, hi_u, lo_f, hi_f)) => (
                    lo_i.min(i),
                    hi_i.max(i),
                    lo_u.min(u),
                    hi_u.max(u),
                    lo_f.min(f),
                    hi_f.max(f),
                ),
            });
        }
        Ok(acc.map(|(lo_i, hi_i, lo_u, hi_u, lo_f, hi_f)| {
            (
                self.wrap_domain_value(domain, lo_i, lo_u, lo_f),
                self.wrap_domain_value(domain, hi_i, hi_u, hi_f),
            )
        }))
    }

    /// Wrapping sum of valid rows in the column's widened domain.
    pub fn sum(&self) -> Result<Option<ScalarValue>> {
        self.ensure_live()?;
        let domain = self.reduce_domain()?;
        let mut any = false;
        let (mut i, mut u, mut f) = (0i64, 0u64, 0f64);
        for row in 0..self.len() {
            if !self.valid_at(row) {
                continue;
            }
            any = true;
            match domain {
                Domain::Int => i = i.wrapping_add(self.value_i64(row)?),
                Domain::Uint => u = u.wrapping_add(self.value_u64(row)?),
                Domain::Float => f += self.value_f64(row)?,
            }
        }
        Ok(any.then(|| match domain {
            Domain::Int => ScalarValue::Int(i),
            Domain::Uint => ScalarValue::Uint(u),
            Domain::Float => ScalarValue::Float(f),
        }))
    }

    /// Wrapping product of valid rows.
    pub fn product(&self) -> Result<Option<ScalarValue>> {
        self.ensure_live()?;
        let domain = self.reduce_domain()?;
        let mut any = false;
        let (mut i, mut u, mut f) = (1i64, 1u64, 1f64);
        for row in 0..self.len() {
            if !self.valid_at(row) {
                continue;
            }
            any = true;
            match domain {
                Domain::Int => i = i.wrapping_mul(self.value_i64(row)?),
                Domain::Uint => u = u.wrapping_mul(self.value_u64(row)?),
                Domain::Float => f *= self.value_f64(row)?,
            }
        }
        Ok(any.then(|| match domain {
            Domain::Int => ScalarValue::Int(i),
            Domain::Uint => ScalarValue::Uint(u),
            Domain::Float => ScalarValue::Float(f),
        }))
    }

    /// Wrapping sum of squares of valid rows.
    pub fn sum_of_squares(&self) -> Result<Option<ScalarValue>> {
        self.ensure_live()?;
        let domain = self.reduce_domain()?;
        let mut any = false;
        let (mut i, mut u, mut f) = (0i64, 0u64, 0f64);
        for row in 0..self.len() {
            if !self.valid_at(row) {
                continue;
            }
            any = true;
            match domain {
                Domain::Int => {
                    let v = self.value_i64(row)?;
                    i = i.wrapping_add(v.wrapping_mul(v));
                }
                Domain::Uint => {
                    let v = self.value_u64(row)?;
                    u = u.wrapping_add(v.wrapping_mul(v));
                }
                Domain::Float => {
                    let v = self.value_f64(row)?;
                    f += v * v;
                }
            }
        }
        Ok(any.then(|| match domain {
            Domain::Int => ScalarValue::Int(i),
            Domain::Uint => ScalarValue::Uint(u),
            Domain::Float => ScalarValue::Float(f),
        }))
    }

    /// Arithmetic mean of valid rows.
    pub fn mean(&self) -> Result<Option<f64>> {
        self.ensure_live()?;
        self.reduce_domain()?;
        let values = self.valid_f64s()?;
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
    }

    /// Median of valid rows, linearly interpolated for even counts.
    pub fn median(&self) -> Result<Option<f64>> {
        self.quantile(0.5, Interpolation::Linear)
    }

    /// Sample variance with `ddof` delta degrees of freedom. Fails with
    /// [`Error::Domain`] when `valid rows - ddof` is not positive.
    pub fn var(&self, ddof: usize) -> Result<Option<f64>> {
        self.ensure_live()?;
        self.reduce_domain()?;
        let values = self.valid_f64s()?;
        if values.is_empty() {
            return Ok(None);
        }
        if values.len() <= ddof {
            return Err(Error::Domain(format!(
                "variance needs more than {} valid rows, got {}",
                ddof,
                values.len()
            )));
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        Ok(Some(ss / (values.len() - ddof) as f64))
    }

    /// Sample standard deviation with `ddof` delta degrees of freedom.
    pub fn std(&self, ddof: usize) -> Result<Option<f64>> {
        Ok(self.var(ddof)?.map(f64::sqrt))
    }

    /// The `q`-quantile of valid rows, `q` in `[0, 1]`.
    pub fn quantile(&self, q: f64, interpolation: Interpolation) -> Result<Option<f64>> {
        self.ensure_live()?;
        self.reduce_domain()?;
        if !(0.0..=1.0).contains(&q) {
            return Err(Error::Range(format!(
                "quantile fraction {} outside [0, 1]",
                q
            )));
        }
        let mut values = self.valid_f64s()?;
        if values.is_empty() {
            return Ok(None);
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let pos = q * (values.len() - 1) as f64;
        let lower = pos.floor() as usize;
        let upper = pos.ceil() as usize;
        Ok(Some(match interpolation {
            Interpolation::Lower => values[lower],
            Interpolation::Higher => values[upper],
            Interpolation::Nearest => values[pos.round() as usize],
            Interpolation::Midpoint => (values[lower] + values[upper]) / 2.0,
            Interpolation::Linear => {
                let weight = pos - lower as f64;
                values[lower] * (1.0 - weight) + values[upper] * weight
            }
        }))
    }

    /// Number of distinct values; when `dropna` is false a present null
    /// counts as one extra distinct value.
    pub fn nunique(&self, dropna: bool) -> Result<usize> {
        self.ensure_live()?;
        let mut seen = HashSet::new();
        for row in 0..self.len() {
            if !self.valid_at(row) {
                continue;
            }
            let key = match self.dtype() {
                DataType::Bool8 => DistinctKey::Bool(self.value_i64(row)? != 0),
                DataType::Utf8 => match self.string_at(row)? {
                    Some(s) => DistinctKey::Str(s.to_string()),
                    None => continue,
                },
                d if d.is_float() => {
                    let v = self.value_f64(row)?;
                    let canonical = if v.is_nan() {
                        f64::NAN
                    } else if v == 0.0 {
                        0.0
                    } else {
                        v
                    };
                    DistinctKey::Float(canonical.to_bits())
                }
                d if d.is_unsigned_integer() => DistinctKey::Uint(self.value_u64(row)?),
                d if d.is_signed_integer() => DistinctKey::Int(self.value_i64(row)?),
                other => {
                    return Err(Error::TypeError(format!(
                        "nunique is not supported for {}",
                        other.name()
                    )))
                }
            };
            seen.insert(key);
        }
        let mut count = seen.len();
        if !dropna && self.has_nulls() {
            count += 1;
        }
        Ok(count)
    }

    /// True when every valid row is truthy. Vacuously true for an empty or
    /// all-null column.
    pub fn all(&self) -> Result<bool> {
        self.ensure_live()?;
        self.reduce_domain()?;
        for row in 0..self.len() {
            if self.valid_at(row) && self.value_f64(row)? == 0.0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// True when any valid row is truthy.
    pub fn any(&self) -> Result<bool> {
        self.ensure_live()?;
        self.reduce_domain()?;
        for row in 0..self.len() {
            if self.valid_at(row) && self.value_f64(row)? != 0.0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn cumulative(&self, op: ScanOp) -> Result<Column> {
        self.ensure_live()?;
        let domain = self.reduce_domain()?;
        let dtype = self.dtype().clone();
        let width = dtype.size_of().unwrap();
        let mut bytes = Vec::with_capacity(self.len() * width);
        let mut validity = ValidityBuilder::new(self.len());

        let mut acc_i: Option<i64> = None;
        let mut acc_u: Option<u64> = None;
        let mut acc_f: Option<f64> = None;
        for row in 0..self.len() {
            // Null rows stay null and do not disturb the running value.
            if !self.valid_at(row) {
                push_i64_as(&mut bytes, &dtype, 0);
                validity.push(false);
                continue;
            }
            match domain {
                Domain::Int => {
                    let v = self.value_i64(row)?;
                    let next = match (acc_i, op) {
                        (None, _) => v,
                        (Some(a), ScanOp::Sum) => a.wrapping_add(v),
                        (Some(a), ScanOp::Product) => a.wrapping_mul(v),
                        (Some(a), ScanOp::Min) => a.min(v),
                        (Some(a), ScanOp::Max) => a.max(v),
                    };
                    acc_i = Some(next);
                    push_i64_as(&mut bytes, &dtype, next);
                }
                Domain::Uint => {
                    let v = self.value_u64(row)?;
                    let next = match (acc_u, op) {
                        (None, _) => v,
                        (Some(a), ScanOp::Sum) => a.wrapping_add(v),
                        (Some(a), ScanOp::Product) => a.wrapping_mul(v),
                        (Some(a), ScanOp::Min) => a.min(v),
                        (Some(a), ScanOp::Max) => a.max(v),
                    };
                    acc_u = Some(next);
                    push_u64_as(&mut bytes, &dtype, next);
                }
                Domain::Float => {
                    let v = self.value_f64(row)?;
                    let next = match (acc_f, op) {
                        (None, _) => v,
                        (Some(a), ScanOp::Sum) => a + v,
                        (Some(a), ScanOp::Product) => a * v,
                        (Some(a), ScanOp::Min) => a.min(v),
                        (Some(a), ScanOp::Max) => a.max(v),
                    };
                    acc_f = Some(next);
                    push_f64_as(&mut bytes, &dtype, next);
                }
            }
            validity.push(true);
        }
        Ok(Column::new_fixed(dtype, bytes, validity.finish(), self.len()))
    }

    /// Running sum; nulls pass through without resetting the accumulator.
    pub fn cumulative_sum(&self) -> Result<Column> {
        self.cumulative(ScanOp::Sum)
    }

    /// Running product; nulls pass through without resetting the accumulator.
    pub fn cumulative_product(&self) -> Result<Column> {
        self.cumulative(ScanOp::Product)
    }

    /// Running minimum; nulls pass through without resetting the accumulator.
    pub fn cumulative_min(&self) -> Result<Column> {
        self.cumulative(ScanOp::Min)
    }

    /// Running maximum; nulls pass through without resetting the accumulator.
    pub fn cumulative_max(&self) -> Result<Column> {
        self.cumulative(ScanOp::Max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(col: &Column) -> Vec<Option<i64>> {
        col.to_host()
            .unwrap()
            .into_iter()
            .map(|v| {
                v.map(|v| match v {
                    ScalarValue::Int(i) => i,
                    other => panic!("unexpected value {:?}", other),
                })
            })
            .collect()
    }

    #[test]
    fn test_min_max_sum() {
        let col = Column::from_options(&[Some(3i32), None, Some(-1), Some(7)]);
        assert_eq!(col.min().unwrap(), Some(ScalarValue::Int(-1)));
        assert_eq!(col.max().unwrap(), Some(ScalarValue::Int(7)));
        assert_eq!(
            col.minmax().unwrap(),
            Some((ScalarValue::Int(-1), ScalarValue::Int(7)))
        );
        assert_eq!(col.sum().unwrap(), Some(ScalarValue::Int(9)));
        assert_eq!(col.product().unwrap(), Some(ScalarValue::Int(-21)));
        assert_eq!(col.sum_of_squares().unwrap(), Some(ScalarValue::Int(59)));
    }

    #[test]
    fn test_all_null_reduces_to_none() {
        let col = Column::from_options::<i32>(&[None, None]);
        assert_eq!(col.min().unwrap(), None);
        assert_eq!(col.sum().unwrap(), None);
        assert_eq!(col.mean().unwrap(), None);
        assert_eq!(col.median().unwrap(), None);
        assert_eq!(col.quantile(0.5, Interpolation::Linear).unwrap(), None);
        let empty = Column::from_slice::<i32>(&[]);
        assert_eq!(empty.max().unwrap(), None);
    }

    #[test]
    fn test_unsigned_domain() {
        let col = Column::from_slice(&[u64::MAX, 1]);
        assert_eq!(col.max().unwrap(), Some(ScalarValue::Uint(u64::MAX)));
        // Wrapping sum in the unsigned domain.
        assert_eq!(col.sum().unwrap(), Some(ScalarValue::Uint(0)));
    }

    #[test]
    fn test_mean_median() {
        let col = Column::from_options(&[Some(1.0f64), Some(2.0), None, Some(6.0)]);
        assert_eq!(col.mean().unwrap(), Some(3.0));
        assert_eq!(col.median().unwrap(), Some(2.0));
        let even = Column::from_slice(&[1.0f64, 2.0, 3.0, 4.0]);
        assert_eq!(even.median().unwrap(), Some(2.5));
    }

    #[test]
    fn test_var_std() {
        let col = Column::from_slice(&[1.0f64, 2.0, 3.0, 4.0]);
        let var1 = col.var(1).unwrap().unwrap();
        assert!((var1 - 5.0 / 3.0).abs() < 1e-12);
        let var0 = col.var(0).unwrap().unwrap();
        assert!((var0 - 1.25).abs() < 1e-12);
        let std0 = col.std(0).unwrap().unwrap();
        assert!((std0 - 1.25f64.sqrt()).abs() < 1e-12);
        // ddof >= valid rows is a domain error.
        let short = Column::from_slice(&[1.0f64]);
        assert!(matches!(short.var(1), Err(Error::Domain(_))));
    }

    #[test]
    fn test_quantile_interpolations() {
        let col = Column::from_slice(&[1.0f64, 2.0, 3.0, 4.0]);
        assert_eq!(col.quantile(0.5, Interpolation::Linear).unwrap(), Some(2.5));
        assert_eq!(col.quantile(0.5, Interpolation::Lower).unwrap(), Some(2.0));
        assert_eq!(col.quantile(0.5, Interpolation::Higher).unwrap(), Some(3.0));
        assert_eq!(col.quantile(0.5, Interpolation::Midpoint).unwrap(), Some(2.5));
        assert_eq!(col.quantile(0.0, Interpolation::Linear).unwrap(), Some(1.0));
        assert_eq!(col.quantile(1.0, Interpolation::Linear).unwrap(), Some(4.0));
        assert!(matches!(
            col.quantile(1.5, Interpolation::Linear),
            Err(Error::Range(_))
        ));
    }

    #[test]
    fn test_nunique() {
        let col = Column::from_options(&[Some(1i32), Some(2), Some(1), None, None]);
        assert_eq!(col.nunique(true).unwrap(), 2);
        assert_eq!(col.nunique(false).unwrap(), 3);

        let strings = Column::from_strings(&["a", "b", "a"]);
        assert_eq!(strings.nunique(true).unwrap(), 2);
    }

    #[test]
    fn test_nunique_float_canonicalization() {
        let col = Column::from_slice(&[0.0f64, -0.0, f64::NAN, f64::NAN]);
        assert_eq!(col.nunique(true).unwrap(), 2);
    }

    #[test]
    fn test_all_any() {
        let col = Column::from_options(&[Some(1i32), None, Some(2)]);
        assert!(col.all().unwrap());
        assert!(col.any().unwrap());
        let with_zero = Column::from_slice(&[1i32, 0]);
        assert!(!with_zero.all().unwrap());
        assert!(with_zero.any().unwrap());
        // Vacuous truth over no valid rows.
        let empty = Column::from_slice::<i32>(&[]);
        assert!(empty.all().unwrap());
        assert!(!empty.any().unwrap());
    }

    #[test]
    fn test_cumulative_sum_skips_nulls() {
        let col = Column::from_options(&[Some(1i32), None, Some(2), Some(3)]);
        let out = col.cumulative_sum().unwrap();
        assert_eq!(ints(&out), vec![Some(1), None, Some(3), Some(6)]);
    }

    #[test]
    fn test_cumulative_min_max_product() {
        let col = Column::from_slice(&[3i32, 1, 4, 1, 5]);
        assert_eq!(
            ints(&col.cumulative_min().unwrap()),
            vec![Some(3), Some(1), Some(1), Some(1), Some(1)]
        );
        assert_eq!(
            ints(&col.cumulative_max().unwrap()),
            vec![Some(3), Some(3), Some(4), Some(4), Some(5)]
        );
        assert_eq!(
            ints(&col.cumulative_product().unwrap()),
            vec![Some(3), Some(3), Some(12), Some(12), Some(60)]
        );
    }

    #[test]
    fn test_reductions_reject_strings() {
        let col = Column::from_strings(&["a"]);
        assert!(col.sum().is_err());
        assert!(col.cumulative_sum().is_err());
        // nunique supports strings, though.
        assert!(col.nunique(true).is_ok());
    }
}
