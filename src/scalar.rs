//! Single typed, nullable values.

use crate::types::DataType;
use crate::{Error, Result};

/// Host representation of a single column element.
///
/// Integer columns surface through 64-bit-safe host integers, floats through
/// `f64`, strings through owned `String`s.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Utf8(String),
}

impl ScalarValue {
    /// Whether this value's representation class matches `dtype`.
    pub fn matches(&self, dtype: &DataType) -> bool {
        match self {
            ScalarValue::Bool(_) => *dtype == DataType::Bool8,
            ScalarValue::Int(_) => dtype.is_signed_integer(),
            ScalarValue::Uint(_) => dtype.is_unsigned_integer(),
            ScalarValue::Float(_) => dtype.is_float(),
            ScalarValue::Utf8(_) => *dtype == DataType::Utf8,
        }
    }
}

/// A single typed, nullable value.
///
/// Immutable, owns its storage, and is not a view. Used as an operand or
/// result in mixed column-scalar operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    dtype: DataType,
    value: Option<ScalarValue>,
}

impl Scalar {
    /// Creates a scalar, validating that the value matches the declared type.
    pub fn new(dtype: DataType, value: Option<ScalarValue>) -> Result<Self> {
        if let Some(ref v) = value {
            if !v.matches(&dtype) {
                return Err(Error::TypeError(format!(
                    "scalar value {:?} does not match type {}",
                    v,
                    dtype.name()
                )));
            }
        }
        Ok(Self { dtype, value })
    }

    /// A null scalar of the given type.
    pub fn null(dtype: DataType) -> Self {
        Self { dtype, value: None }
    }

    pub fn int64(value: i64) -> Self {
        Self {
            dtype: DataType::Int64,
            value: Some(ScalarValue::Int(value)),
        }
    }

    pub fn int32(value: i32) -> Self {
        Self {
            dtype: DataType::Int32,
            value: Some(ScalarValue::Int(value as i64)),
        }
    }

    pub fn uint64(value: u64) -> Self {
        Self {
            dtype: DataType::Uint64,
            value: Some(ScalarValue::Uint(value)),
        }
    }

    pub fn float64(value: f64) -> Self {
        Self {
            dtype: DataType::Float64,
            value: Some(ScalarValue::Float(value)),
        }
    }

    pub fn float32(value: f32) -> Self {
        Self {
            dtype: DataType::Float32,
            value: Some(ScalarValue::Float(value as f64)),
        }
    }

    pub fn bool8(value: bool) -> Self {
        Self {
            dtype: DataType::Bool8,
            value: Some(ScalarValue::Bool(value)),
        }
    }

    pub fn utf8(value: impl Into<String>) -> Self {
        Self {
            dtype: DataType::Utf8,
            value: Some(ScalarValue::Utf8(value.into())),
        }
    }

    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    pub fn value(&self) -> Option<&ScalarValue> {
        self.value.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }
}
