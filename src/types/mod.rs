//! # Type System
//!
//! The closed set of column data types and the promotion ("common type")
//! rules used by every binary operation.
//!
//! ## Promotion rules
//!
//! | Operands | Result |
//! |----------|--------|
//! | identical fixed-width types | that type |
//! | bool × numeric | the numeric type |
//! | integer × integer | wider width; wider operand's signedness; unsigned wins equal-width ties |
//! | integer × float | float of `max(float width, integer width rounded up to 32 or 64)` |
//! | float × float | wider float |
//! | string/list/dictionary × anything | error (string math only via the codec operations) |
//!
//! Host literals are never inferred to a "smallest fitting type": an `i64`
//! literal is always an Int64 operand and an `f64` literal is always a
//! Float64 operand, both promoted normally afterwards. This keeps numeric
//! results stable no matter what value a literal happens to hold.

use crate::{Error, Result};

/// Column element type.
///
/// A closed tag: every operation dispatches over this enum, so type/operation
/// compatibility is exhaustively checkable. Integer types map to 64-bit-safe
/// host integers, floats to `f64`, strings to host `String`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean stored as one byte per row (0 = false, non-zero = true).
    Bool8,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Unsigned 64-bit integer.
    Uint64,
    /// 32-bit IEEE 754 floating-point number.
    Float32,
    /// 64-bit IEEE 754 floating-point number.
    Float64,
    /// Variable-length UTF-8 string (offsets child + characters child).
    Utf8,
    /// Variable-length list of the given element type (offsets child + values child).
    List(Box<DataType>),
    /// Dictionary-encoded column (Int32 indices child + keys child).
    Dictionary(Box<DataType>),
}

impl DataType {
    /// Returns the type name string, including nested parameters.
    pub fn name(&self) -> String {
        match self {
            DataType::Bool8 => "Bool8".to_string(),
            DataType::Int8 => "Int8".to_string(),
            DataType::Int16 => "Int16".to_string(),
            DataType::Int32 => "Int32".to_string(),
            DataType::Int64 => "Int64".to_string(),
            DataType::Uint8 => "Uint8".to_string(),
            DataType::Uint16 => "Uint16".to_string(),
            DataType::Uint32 => "Uint32".to_string(),
            DataType::Uint64 => "Uint64".to_string(),
            DataType::Float32 => "Float32".to_string(),
            DataType::Float64 => "Float64".to_string(),
            DataType::Utf8 => "Utf8".to_string(),
            DataType::List(item) => format!("List({})", item.name()),
            DataType::Dictionary(keys) => format!("Dictionary({})", keys.name()),
        }
    }

    /// Storage size in bytes for fixed-width types.
    ///
    /// Returns `None` for variable-width types (strings, lists, dictionaries),
    /// whose storage lives in child columns.
    pub fn size_of(&self) -> Option<usize> {
        match self {
            DataType::Bool8 | DataType::Int8 | DataType::Uint8 => Some(1),
            DataType::Int16 | DataType::Uint16 => Some(2),
            DataType::Int32 | DataType::Uint32 | DataType::Float32 => Some(4),
            DataType::Int64 | DataType::Uint64 | DataType::Float64 => Some(8),
            DataType::Utf8 | DataType::List(_) | DataType::Dictionary(_) => None,
        }
    }

    /// Bit width of fixed-width numeric/boolean types.
    pub fn bit_width(&self) -> Option<u32> {
        self.size_of().map(|b| b as u32 * 8)
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            DataType::Uint8 | DataType::Uint16 | DataType::Uint32 | DataType::Uint64
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Integer or float. Bool8 is not numeric but promotes against numerics.
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Fixed-width element layout: numerics plus Bool8.
    pub fn is_fixed_width(&self) -> bool {
        self.size_of().is_some()
    }

    /// Creates a List type with the given element type.
    pub fn list(item: DataType) -> Self {
        DataType::List(Box::new(item))
    }

    /// Creates a Dictionary type with the given keys type.
    pub fn dictionary(keys: DataType) -> Self {
        DataType::Dictionary(Box::new(keys))
    }

    fn integer(bits: u32, signed: bool) -> DataType {
        match (bits, signed) {
            (8, true) => DataType::Int8,
            (16, true) => DataType::Int16,
            (32, true) => DataType::Int32,
            (64, true) => DataType::Int64,
            (8, false) => DataType::Uint8,
            (16, false) => DataType::Uint16,
            (32, false) => DataType::Uint32,
            (64, false) => DataType::Uint64,
            _ => unreachable!("invalid integer width {}", bits),
        }
    }

    fn float(bits: u32) -> DataType {
        if bits <= 32 {
            DataType::Float32
        } else {
            DataType::Float64
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Resolve the result type for a mixed-type binary operation.
///
/// Total over the fixed-width domain; `Utf8`, `List` and `Dictionary`
/// operands are never promotable and fail with [`Error::TypeError`].
///
/// When signed and unsigned integers of equal width meet, the unsigned type
/// wins (the behavior of the two's-complement arithmetic the kernels run on).
pub fn common_type(lhs: &DataType, rhs: &DataType) -> Result<DataType> {
    if !lhs.is_fixed_width() || !rhs.is_fixed_width() {
        return Err(Error::TypeError(format!(
            "no common type for {} and {}",
            lhs.name(),
            rhs.name()
        )));
    }

    if lhs == rhs {
        return Ok(lhs.clone());
    }

    // Bool8 defers to the other operand.
    if *lhs == DataType::Bool8 {
        return Ok(rhs.clone());
    }
    if *rhs == DataType::Bool8 {
        return Ok(lhs.clone());
    }

    let (lb, rb) = (lhs.bit_width().unwrap(), rhs.bit_width().unwrap());

    Ok(match (lhs.is_float(), rhs.is_float()) {
        (true, true) => DataType::float(lb.max(rb)),
        (true, false) => DataType::float(lb.max(float_width_for_integer(rb))),
        (false, true) => DataType::float(rb.max(float_width_for_integer(lb))),
        (false, false) => {
            let bits = lb.max(rb);
            let signed = if lb == rb {
                // Equal-width tie: unsigned wins.
                lhs.is_signed_integer() && rhs.is_signed_integer()
            } else if lb > rb {
                lhs.is_signed_integer()
            } else {
                rhs.is_signed_integer()
            };
            DataType::integer(bits, signed)
        }
    })
}

/// Float width required for an integer operand: the integer's bit width
/// rounded up to 32 or 64.
fn float_width_for_integer(int_bits: u32) -> u32 {
    if int_bits <= 32 {
        32
    } else {
        64
    }
}

/// Whether `cast` supports the given source/target pair.
///
/// Only fixed-width numeric/boolean conversions are castable; string
/// conversions must go through the explicit codec operations, and nested or
/// dictionary targets are unsupported.
pub fn cast_supported(from: &DataType, to: &DataType) -> bool {
    from.is_fixed_width() && to.is_fixed_width()
}

/// Maps Rust primitive types to their column [`DataType`].
///
/// Allows type inference in column constructors, so callers never pass a
/// `DataType` alongside a typed slice.
///
/// # Examples
///
/// ```
/// use columnar_engine::types::{DataType, ToDataType};
///
/// assert_eq!(i32::to_dtype(), DataType::Int32);
/// assert_eq!(f64::to_dtype(), DataType::Float64);
/// ```
pub trait ToDataType {
    /// Returns the corresponding column [`DataType`] for this Rust type.
    fn to_dtype() -> DataType;
}

macro_rules! impl_to_dtype {
    ($rust:ty, $dtype:expr) => {
        impl ToDataType for $rust {
            fn to_dtype() -> DataType {
                $dtype
            }
        }
    };
}

impl_to_dtype!(i8, DataType::Int8);
impl_to_dtype!(i16, DataType::Int16);
impl_to_dtype!(i32, DataType::Int32);
impl_to_dtype!(i64, DataType::Int64);
impl_to_dtype!(u8, DataType::Uint8);
impl_to_dtype!(u16, DataType::Uint16);
impl_to_dtype!(u32, DataType::Uint32);
impl_to_dtype!(u64, DataType::Uint64);
impl_to_dtype!(f32, DataType::Float32);
impl_to_dtype!(f64, DataType::Float64);
impl_to_dtype!(bool, DataType::Bool8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(DataType::Int32.name(), "Int32");
        assert_eq!(DataType::list(DataType::Float64).name(), "List(Float64)");
        assert_eq!(
            DataType::dictionary(DataType::Utf8).name(),
            "Dictionary(Utf8)"
        );
    }

    #[test]
    fn test_fixed_width_sizes() {
        assert_eq!(DataType::Bool8.size_of(), Some(1));
        assert_eq!(DataType::Int16.size_of(), Some(2));
        assert_eq!(DataType::Float64.size_of(), Some(8));
        assert_eq!(DataType::Utf8.size_of(), None);
        assert_eq!(DataType::list(DataType::Int8).size_of(), None);
    }

    #[test]
    fn test_common_type_identical() {
        assert_eq!(
            common_type(&DataType::Int32, &DataType::Int32).unwrap(),
            DataType::Int32
        );
    }

    #[test]
    fn test_common_type_integer_widening() {
        assert_eq!(
            common_type(&DataType::Int8, &DataType::Int32).unwrap(),
            DataType::Int32
        );
        assert_eq!(
            common_type(&DataType::Uint16, &DataType::Uint64).unwrap(),
            DataType::Uint64
        );
        // Wider operand's signedness wins.
        assert_eq!(
            common_type(&DataType::Int64, &DataType::Uint32).unwrap(),
            DataType::Int64
        );
        assert_eq!(
            common_type(&DataType::Uint64, &DataType::Int32).unwrap(),
            DataType::Uint64
        );
    }

    #[test]
    fn test_common_type_equal_width_tie_unsigned_wins() {
        assert_eq!(
            common_type(&DataType::Int32, &DataType::Uint32).unwrap(),
            DataType::Uint32
        );
        assert_eq!(
            common_type(&DataType::Uint8, &DataType::Int8).unwrap(),
            DataType::Uint8
        );
        assert_eq!(
            common_type(&DataType::Uint64, &DataType::Int64).unwrap(),
            DataType::Uint64
        );
    }

    #[test]
    fn test_common_type_integer_float() {
        assert_eq!(
            common_type(&DataType::Int16, &DataType::Float32).unwrap(),
            DataType::Float32
        );
        assert_eq!(
            common_type(&DataType::Int32, &DataType::Float32).unwrap(),
            DataType::Float32
        );
        assert_eq!(
            common_type(&DataType::Int64, &DataType::Float32).unwrap(),
            DataType::Float64
        );
        assert_eq!(
            common_type(&DataType::Uint8, &DataType::Float64).unwrap(),
            DataType::Float64
        );
    }

    #[test]
    fn test_common_type_floats() {
        assert_eq!(
            common_type(&DataType::Float32, &DataType::Float64).unwrap(),
            DataType::Float64
        );
    }

    #[test]
    fn test_common_type_bool_defers() {
        assert_eq!(
            common_type(&DataType::Bool8, &DataType::Int16).unwrap(),
            DataType::Int16
        );
        assert_eq!(
            common_type(&DataType::Float32, &DataType::Bool8).unwrap(),
            DataType::Float32
        );
        assert_eq!(
            common_type(&DataType::Bool8, &DataType::Bool8).unwrap(),
            DataType::Bool8
        );
    }

    #[test]
    fn test_common_type_string_not_promotable() {
        assert!(common_type(&DataType::Utf8, &DataType::Int32).is_err());
        assert!(common_type(&DataType::Int32, &DataType::Utf8).is_err());
        assert!(common_type(&DataType::list(DataType::Int32), &DataType::Int32).is_err());
    }

    #[test]
    fn test_common_type_symmetric() {
        let types = [
            DataType::Bool8,
            DataType::Int8,
            DataType::Int64,
            DataType::Uint16,
            DataType::Uint64,
            DataType::Float32,
            DataType::Float64,
        ];
        for a in &types {
            for b in &types {
                assert_eq!(
                    common_type(a, b).unwrap(),
                    common_type(b, a).unwrap(),
                    "asymmetric promotion for {} and {}",
                    a.name(),
                    b.name()
                );
            }
        }
    }

    #[test]
    fn test_cast_supported() {
        assert!(cast_supported(&DataType::Int32, &DataType::Float64));
        assert!(cast_supported(&DataType::Bool8, &DataType::Uint8));
        assert!(!cast_supported(&DataType::Utf8, &DataType::Int32));
        assert!(!cast_supported(&DataType::Int32, &DataType::Utf8));
        assert!(!cast_supported(
            &DataType::Int32,
            &DataType::dictionary(DataType::Int32)
        ));
    }

    #[test]
    fn test_to_dtype() {
        assert_eq!(i8::to_dtype(), DataType::Int8);
        assert_eq!(u64::to_dtype(), DataType::Uint64);
        assert_eq!(f32::to_dtype(), DataType::Float32);
        assert_eq!(bool::to_dtype(), DataType::Bool8);
    }
}
