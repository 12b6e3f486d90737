//! Element-wise binary operations.
//!
//! Operands promote to a common type before evaluation (see
//! [`crate::types::common_type`]); kernels evaluate in one of three widened
//! domains (`i64`, `u64`, `f64`) chosen from that common type and narrow the
//! result back on store, wrapping two's-complement for integers.
//!
//! Division and modulo by zero on integers yield 0 rather than trapping.
//! Comparison results are always non-nullable-typed `Bool8` (nulls still
//! propagate as null rows); `true_div`, `log_base` and `atan2` always produce
//! `Float64`.

use super::{push_f64_as, push_i64_as, push_u64_as, scalar_f64, scalar_i64, scalar_u64, Column};
use crate::mask::ValidityBuilder;
use crate::scalar::Scalar;
use crate::types::{common_type, DataType};
use crate::{Error, Result};
use tracing::debug;

/// Element-wise operator selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    TrueDiv,
    FloorDiv,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    NullEquals,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LogicalAnd,
    LogicalOr,
    ShiftLeft,
    ShiftRight,
    ShiftRightUnsigned,
    LogBase,
    Atan2,
    NullMax,
    NullMin,
}

impl BinaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::TrueDiv => "true_div",
            BinaryOp::FloorDiv => "floor_div",
            BinaryOp::Mod => "mod",
            BinaryOp::Pow => "pow",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::NullEquals => "null_equals",
            BinaryOp::BitwiseAnd => "bitwise_and",
            BinaryOp::BitwiseOr => "bitwise_or",
            BinaryOp::BitwiseXor => "bitwise_xor",
            BinaryOp::LogicalAnd => "logical_and",
            BinaryOp::LogicalOr => "logical_or",
            BinaryOp::ShiftLeft => "shift_left",
            BinaryOp::ShiftRight => "shift_right",
            BinaryOp::ShiftRightUnsigned => "shift_right_unsigned",
            BinaryOp::LogBase => "log_base",
            BinaryOp::Atan2 => "atan2",
            BinaryOp::NullMax => "null_max",
            BinaryOp::NullMin => "null_min",
        }
    }

    /// Operators producing a Bool8 comparison result.
    fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::NullEquals
        )
    }

    /// Operators restricted to integer and boolean operands.
    fn requires_integer_operands(&self) -> bool {
        matches!(
            self,
            BinaryOp::BitwiseAnd
                | BinaryOp::BitwiseOr
                | BinaryOp::BitwiseXor
                | BinaryOp::ShiftLeft
                | BinaryOp::ShiftRight
                | BinaryOp::ShiftRightUnsigned
        )
    }

    /// Operators whose result is always Float64.
    fn forces_float64(&self) -> bool {
        matches!(self, BinaryOp::TrueDiv | BinaryOp::LogBase | BinaryOp::Atan2)
    }
}

/// Right-hand operand of a binary operation.
///
/// Bare host numbers carry a fixed policy: an `i64` participates as an
/// `Int64` operand, an `f64` as a `Float64` operand. Anything narrower must
/// go through a typed [`Scalar`].
pub enum Rhs<'a> {
    Column(&'a Column),
    Scalar(&'a Scalar),
    Int(i64),
    Float(f64),
}

impl<'a> From<&'a Column> for Rhs<'a> {
    fn from(col: &'a Column) -> Self {
        Rhs::Column(col)
    }
}

impl<'a> From<&'a Scalar> for Rhs<'a> {
    fn from(scalar: &'a Scalar) -> Self {
        Rhs::Scalar(scalar)
    }
}

impl From<i64> for Rhs<'_> {
    fn from(v: i64) -> Self {
        Rhs::Int(v)
    }
}

impl From<f64> for Rhs<'_> {
    fn from(v: f64) -> Self {
        Rhs::Float(v)
    }
}

/// Resolved right-hand operand: either a column or a broadcast constant.
struct RhsOperand<'a> {
    dtype: DataType,
    col: Option<&'a Column>,
    konst_valid: bool,
    konst_i: i64,
    konst_u: u64,
    konst_f: f64,
}

impl<'a> RhsOperand<'a> {
    fn resolve(rhs: &Rhs<'a>, lhs_len: usize) -> Result<Self> {
        match rhs {
            Rhs::Column(col) => {
                col.ensure_live()?;
                if col.len() != lhs_len {
                    return Err(Error::ShapeMismatch {
                        expected: lhs_len,
                        actual: col.len(),
                    });
                }
                if !col.dtype().is_fixed_width() {
                    return Err(Error::TypeError(format!(
                        "binary operations do not support {} operands",
                        col.dtype().name()
                    )));
                }
                Ok(Self {
                    dtype: col.dtype().clone(),
                    col: Some(col),
                    konst_valid: false,
                    konst_i: 0,
                    konst_u: 0,
                    konst_f: 0.0,
                })
            }
            Rhs::Scalar(scalar) => {
                if !scalar.dtype().is_fixed_width() {
                    return Err(Error::TypeError(format!(
                        "binary operations do not support {} operands",
                        scalar.dtype().name()
                    )));
                }
                let (valid, i, u, f) = match scalar.value() {
                    None => (false, 0, 0, 0.0),
                    Some(v) => (true, scalar_i64(v), scalar_u64(v), scalar_f64(v)),
                };
                Ok(Self {
                    dtype: scalar.dtype().clone(),
                    col: None,
                    konst_valid: valid,
                    konst_i: i,
                    konst_u: u,
                    konst_f: f,
                })
            }
            Rhs::Int(v) => Ok(Self {
                dtype: DataType::Int64,
                col: None,
                konst_valid: true,
                konst_i: *v,
                konst_u: *v as u64,
                konst_f: *v as f64,
            }),
            Rhs::Float(v) => Ok(Self {
                dtype: DataType::Float64,
                col: None,
                konst_valid: true,
                konst_i: *v as i64,
                konst_u: *v as u64,
                konst_f: *v,
            }),
        }
    }

    fn valid(&self, row: usize) -> bool {
        match self.col {
            Some(col) => col.valid_at(row),
            None => self.konst_valid,
        }
    }

    fn i64(&self, row: usize) -> Result<i64> {
        match self.col {
            Some(col) => col.value_i64(row),
            None => Ok(self.konst_i),
        }
    }

    fn u64(&self, row: usize) -> Result<u64> {
        match self.col {
            Some(col) => col.value_u64(row),
            None => Ok(self.konst_u),
        }
    }

    fn f64(&self, row: usize) -> Result<f64> {
        match self.col {
            Some(col) => col.value_f64(row),
            None => Ok(self.konst_f),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Domain {
    Int,
    Uint,
    Float,
}

fn domain_of(dtype: &DataType) -> Domain {
    if dtype.is_float() {
        Domain::Float
    } else if dtype.is_unsigned_integer() {
        Domain::Uint
    } else {
        Domain::Int
    }
}

fn width_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn eval_i64(op: BinaryOp, a: i64, b: i64, bits: u32) -> i64 {
    match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                0
            } else {
                a.wrapping_div(b)
            }
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                0
            } else {
                let q = a.wrapping_div(b);
                let r = a.wrapping_rem(b);
                if r != 0 && (r < 0) != (b < 0) {
                    q - 1
                } else {
                    q
                }
            }
        }
        BinaryOp::Mod => {
            if b == 0 {
                0
            } else {
                a.wrapping_rem(b)
            }
        }
        BinaryOp::Pow => {
            if b < 0 {
                // Truncate toward zero, as integer division of 1 would.
                match a {
                    1 => 1,
                    -1 if b % 2 != 0 => -1,
                    -1 => 1,
                    _ => 0,
                }
            } else {
                pow_wrapping_i64(a, b as u64)
            }
        }
        BinaryOp::BitwiseAnd => a & b,
        BinaryOp::BitwiseOr => a | b,
        BinaryOp::BitwiseXor => a ^ b,
        BinaryOp::LogicalAnd => (a != 0 && b != 0) as i64,
        BinaryOp::LogicalOr => (a != 0 || b != 0) as i64,
        BinaryOp::ShiftLeft => {
            if (0..bits as i64).contains(&b) {
                a.wrapping_shl(b as u32)
            } else {
                0
            }
        }
        BinaryOp::ShiftRight => {
            if b < 0 {
                0
            } else {
                // Arithmetic shift of the sign-extended value; shifts past
                // the width converge to the sign fill.
                a >> b.min(63)
            }
        }
        BinaryOp::ShiftRightUnsigned => {
            if (0..bits as i64).contains(&b) {
                (((a as u64) & width_mask(bits)) >> b) as i64
            } else {
                0
            }
        }
        BinaryOp::NullMax => a.max(b),
        BinaryOp::NullMin => a.min(b),
        _ => unreachable!("float-only operator dispatched in integer domain"),
    }
}

// Exponentiation by squaring; stays exact in the integer domain and wraps
// like the other integer kernels.
fn pow_wrapping_i64(mut base: i64, mut exp: u64) -> i64 {
    let mut acc: i64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    acc
}

fn pow_wrapping_u64(mut base: u64, mut exp: u64) -> u64 {
    let mut acc: u64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    acc
}

fn eval_u64(op: BinaryOp, a: u64, b: u64, bits: u32) -> u64 {
    match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div | BinaryOp::FloorDiv => {
            if b == 0 {
                0
            } else {
                a / b
            }
        }
        BinaryOp::Mod => {
            if b == 0 {
                0
            } else {
                a % b
            }
        }
        BinaryOp::Pow => pow_wrapping_u64(a, b),
        BinaryOp::BitwiseAnd => a & b,
        BinaryOp::BitwiseOr => a | b,
        BinaryOp::BitwiseXor => a ^ b,
        BinaryOp::LogicalAnd => (a != 0 && b != 0) as u64,
        BinaryOp::LogicalOr => (a != 0 || b != 0) as u64,
        BinaryOp::ShiftLeft => {
            if b < bits as u64 {
                a.wrapping_shl(b as u32)
            } else {
                0
            }
        }
        BinaryOp::ShiftRight | BinaryOp::ShiftRightUnsigned => {
            if b < bits as u64 {
                (a & width_mask(bits)) >> b
            } else {
                0
            }
        }
        BinaryOp::NullMax => a.max(b),
        BinaryOp::NullMin => a.min(b),
        _ => unreachable!("float-only operator dispatched in unsigned domain"),
    }
}

fn eval_f64(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::TrueDiv => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => a % b,
        BinaryOp::Pow => a.powf(b),
        BinaryOp::LogBase => a.ln() / b.ln(),
        BinaryOp::Atan2 => a.atan2(b),
        BinaryOp::LogicalAnd => (a != 0.0 && b != 0.0) as u8 as f64,
        BinaryOp::LogicalOr => (a != 0.0 || b != 0.0) as u8 as f64,
        BinaryOp::NullMax => a.max(b),
        BinaryOp::NullMin => a.min(b),
        _ => unreachable!("integer-only operator dispatched in float domain"),
    }
}

fn eval_cmp_i64(op: BinaryOp, a: i64, b: i64) -> bool {
    match op {
        BinaryOp::Eq | BinaryOp::NullEquals => a == b,
        BinaryOp::Ne => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => unreachable!(),
    }
}

fn eval_cmp_u64(op: BinaryOp, a: u64, b: u64) -> bool {
    match op {
        BinaryOp::Eq | BinaryOp::NullEquals => a == b,
        BinaryOp::Ne => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => unreachable!(),
    }
}

fn eval_cmp_f64(op: BinaryOp, a: f64, b: f64) -> bool {
    match op {
        BinaryOp::Eq | BinaryOp::NullEquals => a == b,
        BinaryOp::Ne => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => unreachable!(),
    }
}

impl Column {
    /// Dispatches an element-wise binary operation against a column, a typed
    /// scalar, or a bare host number.
    pub fn binary_op<'a>(&self, op: BinaryOp, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.ensure_live()?;
        if !self.dtype().is_fixed_width() {
            return Err(Error::TypeError(format!(
                "binary operations do not support {} operands",
                self.dtype().name()
            )));
        }
        let rhs = rhs.into();
        let rhs = RhsOperand::resolve(&rhs, self.len())?;

        if op.requires_integer_operands()
            && (self.dtype().is_float() || rhs.dtype.is_float())
        {
            return Err(Error::TypeError(format!(
                "{} requires integer or boolean operands, got {} and {}",
                op.name(),
                self.dtype().name(),
                rhs.dtype.name()
            )));
        }

        let common = common_type(self.dtype(), &rhs.dtype)?;
        let result_dtype = if op.is_comparison() {
            DataType::Bool8
        } else if op.forces_float64() {
            DataType::Float64
        } else {
            common.clone()
        };
        let domain = if op.forces_float64() {
            Domain::Float
        } else {
            domain_of(&common)
        };
        debug!(
            "binary op {}: {} x {} -> {}",
            op.name(),
            self.dtype().name(),
            rhs.dtype.name(),
            result_dtype.name()
        );

        let bits = common.bit_width().unwrap_or(64);
        let width = result_dtype.size_of().unwrap();
        let mut bytes = Vec::with_capacity(self.len() * width);
        let mut validity = ValidityBuilder::new(self.len());

        for row in 0..self.len() {
            let lv = self.valid_at(row);
            let rv = rhs.valid(row);

            match op {
                BinaryOp::NullEquals => {
                    // Null-aware equality never produces a null row.
                    let equal = match (lv, rv) {
                        (false, false) => true,
                        (true, true) => match domain {
                            Domain::Int => {
                                eval_cmp_i64(op, self.value_i64(row)?, rhs.i64(row)?)
                            }
                            Domain::Uint => {
                                eval_cmp_u64(op, self.value_u64(row)?, rhs.u64(row)?)
                            }
                            Domain::Float => {
                                eval_cmp_f64(op, self.value_f64(row)?, rhs.f64(row)?)
                            }
                        },
                        _ => false,
                    };
                    bytes.push(equal as u8);
                    validity.push(true);
                }
                BinaryOp::NullMax | BinaryOp::NullMin => {
                    // One-sided nulls pass the present value through; both
                    // null stays null.
                    if !lv && !rv {
                        push_i64_as(&mut bytes, &result_dtype, 0);
                        validity.push(false);
                        continue;
                    }
                    match domain {
                        Domain::Int => {
                            let v = match (lv, rv) {
                                (true, true) => {
                                    eval_i64(op, self.value_i64(row)?, rhs.i64(row)?, bits)
                                }
                                (true, false) => self.value_i64(row)?,
                                _ => rhs.i64(row)?,
                            };
                            push_i64_as(&mut bytes, &result_dtype, v);
                        }
                        Domain::Uint => {
                            let v = match (lv, rv) {
                                (true, true) => {
                                    eval_u64(op, self.value_u64(row)?, rhs.u64(row)?, bits)
                                }
                                (true, false) => self.value_u64(row)?,
                                _ => rhs.u64(row)?,
                            };
                            push_u64_as(&mut bytes, &result_dtype, v);
                        }
                        Domain::Float => {
                            let v = match (lv, rv) {
                                (true, true) => {
                                    eval_f64(op, self.value_f64(row)?, rhs.f64(row)?)
                                }
                                (true, false) => self.value_f64(row)?,
                                _ => rhs.f64(row)?,
                            };
                            push_f64_as(&mut bytes, &result_dtype, v);
                        }
                    }
                    validity.push(true);
                }
                _ => {
                    // Standard null propagation: any null operand nulls the
                    // result row.
                    if !(lv && rv) {
                        push_i64_as(&mut bytes, &result_dtype, 0);
                        validity.push(false);
                        continue;
                    }
                    if op.is_comparison() {
                        let v = match domain {
                            Domain::Int => {
                                eval_cmp_i64(op, self.value_i64(row)?, rhs.i64(row)?)
                            }
                            Domain::Uint => {
                                eval_cmp_u64(op, self.value_u64(row)?, rhs.u64(row)?)
                            }
                            Domain::Float => {
                                eval_cmp_f64(op, self.value_f64(row)?, rhs.f64(row)?)
                            }
                        };
                        bytes.push(v as u8);
                    } else {
                        match domain {
                            Domain::Int => {
                                let v =
                                    eval_i64(op, self.value_i64(row)?, rhs.i64(row)?, bits);
                                push_i64_as(&mut bytes, &result_dtype, v);
                            }
                            Domain::Uint => {
                                let v =
                                    eval_u64(op, self.value_u64(row)?, rhs.u64(row)?, bits);
                                push_u64_as(&mut bytes, &result_dtype, v);
                            }
                            Domain::Float => {
                                let v = eval_f64(op, self.value_f64(row)?, rhs.f64(row)?);
                                push_f64_as(&mut bytes, &result_dtype, v);
                            }
                        }
                    }
                    validity.push(true);
                }
            }
        }

        Ok(Column::new_fixed(
            result_dtype,
            bytes,
            validity.finish(),
            self.len(),
        ))
    }

    pub fn add<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Add, rhs)
    }

    pub fn sub<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Sub, rhs)
    }

    pub fn mul<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Mul, rhs)
    }

    /// Division in the operands' common type; integer division by zero
    /// yields 0.
    pub fn div<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Div, rhs)
    }

    /// Division always evaluated and returned as Float64.
    pub fn true_div<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::TrueDiv, rhs)
    }

    /// Division rounded toward negative infinity.
    pub fn floor_div<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::FloorDiv, rhs)
    }

    pub fn modulo<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Mod, rhs)
    }

    pub fn pow<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Pow, rhs)
    }

    pub fn eq<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Eq, rhs)
    }

    pub fn ne<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Ne, rhs)
    }

    pub fn lt<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Lt, rhs)
    }

    pub fn le<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Le, rhs)
    }

    pub fn gt<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Gt, rhs)
    }

    pub fn ge<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Ge, rhs)
    }

    /// Equality where null == null is true; never returns null rows.
    pub fn null_equals<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::NullEquals, rhs)
    }

    pub fn bitwise_and<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::BitwiseAnd, rhs)
    }

    pub fn bitwise_or<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::BitwiseOr, rhs)
    }

    pub fn bitwise_xor<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::BitwiseXor, rhs)
    }

    pub fn logical_and<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::LogicalAnd, rhs)
    }

    pub fn logical_or<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::LogicalOr, rhs)
    }

    pub fn shift_left<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::ShiftLeft, rhs)
    }

    pub fn shift_right<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::ShiftRight, rhs)
    }

    /// Logical (zero-fill) right shift regardless of operand signedness.
    pub fn shift_right_unsigned<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::ShiftRightUnsigned, rhs)
    }

    pub fn log_base<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::LogBase, rhs)
    }

    pub fn atan2<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::Atan2, rhs)
    }

    /// Element-wise maximum where one-sided nulls pass the present value
    /// through.
    pub fn null_max<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::NullMax, rhs)
    }

    /// Element-wise minimum where one-sided nulls pass the present value
    /// through.
    pub fn null_min<'a>(&self, rhs: impl Into<Rhs<'a>>) -> Result<Column> {
        self.binary_op(BinaryOp::NullMin, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarValue;

    fn ints(col: &Column) -> Vec<Option<i64>> {
        col.to_host()
            .unwrap()
            .into_iter()
            .map(|v| {
                v.map(|v| match v {
                    ScalarValue::Int(i) => i,
                    ScalarValue::Uint(u) => u as i64,
                    ScalarValue::Bool(b) => b as i64,
                    other => panic!("unexpected value {:?}", other),
                })
            })
            .collect()
    }

    fn floats(col: &Column) -> Vec<Option<f64>> {
        col.to_host()
            .unwrap()
            .into_iter()
            .map(|v| {
                v.map(|v| match v {
                    ScalarValue::Float(f) => f,
                    other => panic!("unexpected value {:?}", other),
                })
            })
            .collect()
    }

    #[test]
    fn test_add_column_column() {
        let a = Column::from_slice(&[1i32, 2, 3]);
        let b = Column::from_slice(&[10i32, 20, 30]);
        let out = a.add(&b).unwrap();
        assert_eq!(*out.dtype(), DataType::Int32);
        assert_eq!(ints(&out), vec![Some(11), Some(22), Some(33)]);
    }

    #[test]
    fn test_add_promotes_width_and_sign() {
        let a = Column::from_slice(&[1i32, 2]);
        let b = Column::from_slice(&[1i64, 2]);
        assert_eq!(*a.add(&b).unwrap().dtype(), DataType::Int64);

        // Unsigned wins an equal-width signedness tie.
        let c = Column::from_slice(&[1u32, 2]);
        assert_eq!(*a.add(&c).unwrap().dtype(), DataType::Uint32);

        // Int64 x Float32 promotes to Float64.
        let f = Column::from_slice(&[0.5f32, 1.5]);
        let out = b.add(&f).unwrap();
        assert_eq!(*out.dtype(), DataType::Float64);
        assert_eq!(floats(&out), vec![Some(1.5), Some(3.5)]);
    }

    #[test]
    fn test_host_literal_policy() {
        // A bare i64 is an Int64 operand, so Int8 + 1 promotes to Int64.
        let a = Column::from_slice(&[1i8, 2]);
        let out = a.add(1i64).unwrap();
        assert_eq!(*out.dtype(), DataType::Int64);
        assert_eq!(ints(&out), vec![Some(2), Some(3)]);

        // A bare f64 is a Float64 operand.
        let out = a.mul(2.0f64).unwrap();
        assert_eq!(*out.dtype(), DataType::Float64);
        assert_eq!(floats(&out), vec![Some(2.0), Some(4.0)]);
    }

    #[test]
    fn test_scalar_operand_keeps_narrow_type() {
        let a = Column::from_slice(&[1i8, 2]);
        let out = a.add(&Scalar::new(DataType::Int8, Some(ScalarValue::Int(1))).unwrap()).unwrap();
        assert_eq!(*out.dtype(), DataType::Int8);
    }

    #[test]
    fn test_null_propagation() {
        let a = Column::from_options(&[Some(1i32), None, Some(3)]);
        let out = a.add(1i64).unwrap();
        assert_eq!(ints(&out), vec![Some(2), None, Some(4)]);

        let null_scalar = Scalar::null(DataType::Int32);
        let out = a.add(&null_scalar).unwrap();
        assert_eq!(ints(&out), vec![None, None, None]);
    }

    #[test]
    fn test_wrapping_overflow() {
        let a = Column::from_slice(&[i32::MAX]);
        let b = Column::from_slice(&[1i32]);
        let out = a.add(&b).unwrap();
        assert_eq!(ints(&out), vec![Some(i32::MIN as i64)]);

        let a = Column::from_slice(&[255u8]);
        let out = a.add(&Column::from_slice(&[1u8])).unwrap();
        assert_eq!(ints(&out), vec![Some(0)]);
    }

    #[test]
    fn test_integer_division_by_zero_yields_zero() {
        let a = Column::from_slice(&[10i32, 7]);
        let b = Column::from_slice(&[0i32, 2]);
        assert_eq!(ints(&a.div(&b).unwrap()), vec![Some(0), Some(3)]);
        assert_eq!(ints(&a.modulo(&b).unwrap()), vec![Some(0), Some(1)]);
        assert_eq!(ints(&a.floor_div(&b).unwrap()), vec![Some(0), Some(3)]);
    }

    #[test]
    fn test_floor_div_rounds_toward_negative_infinity() {
        let a = Column::from_slice(&[-7i32, 7, -7, 7]);
        let b = Column::from_slice(&[2i32, 2, -2, -2]);
        assert_eq!(
            ints(&a.floor_div(&b).unwrap()),
            vec![Some(-4), Some(3), Some(3), Some(-4)]
        );
        // Plain div truncates toward zero.
        assert_eq!(
            ints(&a.div(&b).unwrap()),
            vec![Some(-3), Some(3), Some(3), Some(-3)]
        );
    }

    #[test]
    fn test_true_div_always_float64() {
        let a = Column::from_slice(&[7i32, 1]);
        let out = a.true_div(2i64).unwrap();
        assert_eq!(*out.dtype(), DataType::Float64);
        assert_eq!(floats(&out), vec![Some(3.5), Some(0.5)]);
        // Float division by zero follows IEEE semantics.
        let z = Column::from_slice(&[1.0f64]).true_div(0.0f64).unwrap();
        assert_eq!(floats(&z), vec![Some(f64::INFINITY)]);
    }

    #[test]
    fn test_comparisons_produce_bool8() {
        let a = Column::from_slice(&[1i32, 2, 3]);
        let out = a.lt(2i64).unwrap();
        assert_eq!(*out.dtype(), DataType::Bool8);
        assert_eq!(ints(&out), vec![Some(1), Some(0), Some(0)]);
    }

    #[test]
    fn test_unsigned_comparison_domain() {
        // In the unsigned domain large values do not compare as negatives.
        let a = Column::from_slice(&[u64::MAX]);
        let out = a.gt(&Column::from_slice(&[1u64])).unwrap();
        assert_eq!(ints(&out), vec![Some(1)]);
    }

    #[test]
    fn test_null_equals() {
        let a = Column::from_options(&[Some(1i32), None, Some(3), None]);
        let b = Column::from_options(&[Some(1i32), None, None, Some(4)]);
        let out = a.null_equals(&b).unwrap();
        assert!(!out.nullable());
        assert_eq!(ints(&out), vec![Some(1), Some(1), Some(0), Some(0)]);
    }

    #[test]
    fn test_null_max_min_pass_through() {
        let a = Column::from_options(&[Some(1i32), None, Some(5), None]);
        let b = Column::from_options(&[Some(3i32), Some(2), None, None]);
        assert_eq!(
            ints(&a.null_max(&b).unwrap()),
            vec![Some(3), Some(2), Some(5), None]
        );
        assert_eq!(
            ints(&a.null_min(&b).unwrap()),
            vec![Some(1), Some(2), Some(5), None]
        );
    }

    #[test]
    fn test_bitwise_rejects_floats() {
        let a = Column::from_slice(&[1.0f32]);
        assert!(a.bitwise_and(&Column::from_slice(&[1.0f32])).is_err());
        let b = Column::from_slice(&[1i32]);
        assert!(b.shift_left(1.5f64).is_err());
    }

    #[test]
    fn test_shifts() {
        let a = Column::from_slice(&[1i32, -8, 1]);
        let s = Column::from_slice(&[3i32, 1, 40]);
        // Out-of-range shift amounts yield 0.
        assert_eq!(
            ints(&a.shift_left(&s).unwrap()),
            vec![Some(8), Some(-16), Some(0)]
        );
        assert_eq!(
            ints(&a.shift_right(&s).unwrap()),
            vec![Some(0), Some(-4), Some(0)]
        );
        // Unsigned shift zero-fills within the operand width.
        let neg = Column::from_slice(&[-8i32]);
        let out = neg.shift_right_unsigned(&Column::from_slice(&[1i32])).unwrap();
        assert_eq!(ints(&out), vec![Some((((-8i32) as u32) >> 1) as i64)]);
    }

    #[test]
    fn test_logical_ops() {
        let a = Column::from_bools(&[true, true, false]);
        let b = Column::from_bools(&[true, false, false]);
        assert_eq!(ints(&a.logical_and(&b).unwrap()), vec![Some(1), Some(0), Some(0)]);
        assert_eq!(ints(&a.logical_or(&b).unwrap()), vec![Some(1), Some(1), Some(0)]);
    }

    #[test]
    fn test_log_base_and_atan2() {
        let a = Column::from_slice(&[8i32]);
        let out = a.log_base(2i64).unwrap();
        assert_eq!(*out.dtype(), DataType::Float64);
        assert!((floats(&out)[0].unwrap() - 3.0).abs() < 1e-12);

        let y = Column::from_slice(&[1.0f64]);
        let out = y.atan2(1.0f64).unwrap();
        assert!((floats(&out)[0].unwrap() - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch() {
        let a = Column::from_slice(&[1i32, 2]);
        let b = Column::from_slice(&[1i32]);
        assert!(matches!(
            a.add(&b),
            Err(Error::ShapeMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_string_operands_rejected() {
        let s = Column::from_strings(&["a"]);
        assert!(s.add(1i64).is_err());
        let a = Column::from_slice(&[1i32]);
        assert!(a.eq(&s).is_err());
    }

    #[test]
    fn test_pow_in_integer_domain() {
        let a = Column::from_slice(&[2i32, 3]);
        let out = a.pow(&Column::from_slice(&[10i32, 2])).unwrap();
        assert_eq!(*out.dtype(), DataType::Int32);
        assert_eq!(ints(&out), vec![Some(1024), Some(9)]);
    }

    #[test]
    fn test_pow_exact_beyond_f64_mantissa() {
        // 3^39 has more significant bits than f64 can carry.
        let a = Column::from_slice(&[3i64]);
        let out = a.pow(&Column::from_slice(&[39i64])).unwrap();
        assert_eq!(ints(&out), vec![Some(4052555153018976267)]);

        let u = Column::from_slice(&[3u64]);
        let out = u.pow(&Column::from_slice(&[40u64])).unwrap();
        assert_eq!(
            out.to_host().unwrap(),
            vec![Some(ScalarValue::Uint(12157665459056928801))]
        );
    }

    #[test]
    fn test_pow_negative_exponent_truncates() {
        let a = Column::from_slice(&[2i64, 1, -1, -1, 0]);
        let e = Column::from_slice(&[-1i64, -5, -3, -4, -2]);
        let out = a.pow(&e).unwrap();
        assert_eq!(
            ints(&out),
            vec![Some(0), Some(1), Some(-1), Some(1), Some(0)]
        );
    }
}
