//! Element-wise unary operations.
//!
//! Math operators evaluate in `f64` and narrow back to the input type, so an
//! integer column keeps its type (`abs`, `floor` and friends are exact,
//! transcendentals truncate on store). `bit_invert` is integer/boolean only,
//! `rint` is float only, and `not` coerces any fixed-width input to Bool8.

use super::{push_f64_as, push_i64_as, Column};
use crate::mask::ValidityBuilder;
use crate::types::DataType;
use crate::{Error, Result};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Exp,
    Log,
    Sqrt,
    Cbrt,
    Ceil,
    Floor,
    Abs,
    Rint,
    BitInvert,
    Not,
}

impl UnaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Asin => "asin",
            UnaryOp::Acos => "acos",
            UnaryOp::Atan => "atan",
            UnaryOp::Sinh => "sinh",
            UnaryOp::Cosh => "cosh",
            UnaryOp::Tanh => "tanh",
            UnaryOp::Asinh => "asinh",
            UnaryOp::Acosh => "acosh",
            UnaryOp::Atanh => "atanh",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Cbrt => "cbrt",
            UnaryOp::Ceil => "ceil",
            UnaryOp::Floor => "floor",
            UnaryOp::Abs => "abs",
            UnaryOp::Rint => "rint",
            UnaryOp::BitInvert => "bit_invert",
            UnaryOp::Not => "not",
        }
    }
}

fn eval_f64(op: UnaryOp, v: f64) -> f64 {
    match op {
        UnaryOp::Sin => v.sin(),
        UnaryOp::Cos => v.cos(),
        UnaryOp::Tan => v.tan(),
        UnaryOp::Asin => v.asin(),
        UnaryOp::Acos => v.acos(),
        UnaryOp::Atan => v.atan(),
        UnaryOp::Sinh => v.sinh(),
        UnaryOp::Cosh => v.cosh(),
        UnaryOp::Tanh => v.tanh(),
        UnaryOp::Asinh => v.asinh(),
        UnaryOp::Acosh => v.acosh(),
        UnaryOp::Atanh => v.atanh(),
        UnaryOp::Exp => v.exp(),
        UnaryOp::Log => v.ln(),
        UnaryOp::Sqrt => v.sqrt(),
        UnaryOp::Cbrt => v.cbrt(),
        UnaryOp::Ceil => v.ceil(),
        UnaryOp::Floor => v.floor(),
        UnaryOp::Abs => v.abs(),
        // Round half to even, matching the IEEE roundTiesToEven mode.
        UnaryOp::Rint => {
            let r = v.round();
            if (v - v.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
                r - v.signum()
            } else {
                r
            }
        }
        UnaryOp::BitInvert | UnaryOp::Not => unreachable!(),
    }
}

impl Column {
    /// Dispatches an element-wise unary operation. Nulls propagate 1:1.
    pub fn unary_op(&self, op: UnaryOp) -> Result<Column> {
        self.ensure_live()?;
        let dtype = self.dtype().clone();
        match op {
            UnaryOp::Rint => {
                if !dtype.is_float() {
                    return Err(Error::TypeError(format!(
                        "rint requires a floating-point column, got {}",
                        dtype.name()
                    )));
                }
            }
            UnaryOp::BitInvert => {
                if !dtype.is_integer() && dtype != DataType::Bool8 {
                    return Err(Error::TypeError(format!(
                        "bit_invert requires an integer or boolean column, got {}",
                        dtype.name()
                    )));
                }
            }
            UnaryOp::Not => {
                if !dtype.is_fixed_width() {
                    return Err(Error::TypeError(format!(
                        "not requires a fixed-width column, got {}",
                        dtype.name()
                    )));
                }
            }
            _ => {
                if !dtype.is_numeric() {
                    return Err(Error::TypeError(format!(
                        "{} requires a numeric column, got {}",
                        op.name(),
                        dtype.name()
                    )));
                }
            }
        }
        debug!("unary op {} on {}", op.name(), dtype.name());

        let result_dtype = if op == UnaryOp::Not {
            DataType::Bool8
        } else {
            dtype.clone()
        };
        let width = result_dtype.size_of().unwrap();
        let mut bytes = Vec::with_capacity(self.len() * width);
        let mut validity = ValidityBuilder::new(self.len());

        for row in 0..self.len() {
            if !self.valid_at(row) {
                push_i64_as(&mut bytes, &result_dtype, 0);
                validity.push(false);
                continue;
            }
            match op {
                UnaryOp::Not => {
                    bytes.push((self.value_f64(row)? == 0.0) as u8);
                }
                UnaryOp::BitInvert => {
                    let v = !self.value_i64(row)?;
                    push_i64_as(&mut bytes, &result_dtype, v);
                }
                UnaryOp::Abs if !dtype.is_float() => {
                    // Exact in the integer domain; no round trip through f64.
                    let v = self.value_i64(row)?.wrapping_abs();
                    push_i64_as(&mut bytes, &result_dtype, v);
                }
                _ => {
                    let v = eval_f64(op, self.value_f64(row)?);
                    push_f64_as(&mut bytes, &result_dtype, v);
                }
            }
            validity.push(true);
        }

        Ok(Column::new_fixed(
            result_dtype,
            bytes,
            validity.finish(),
            self.len(),
        ))
    }

    pub fn sin(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Sin)
    }

    pub fn cos(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Cos)
    }

    pub fn tan(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Tan)
    }

    pub fn asin(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Asin)
    }

    pub fn acos(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Acos)
    }

    pub fn atan(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Atan)
    }

    pub fn sinh(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Sinh)
    }

    pub fn cosh(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Cosh)
    }

    pub fn tanh(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Tanh)
    }

    pub fn asinh(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Asinh)
    }

    pub fn acosh(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Acosh)
    }

    pub fn atanh(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Atanh)
    }

    pub fn exp(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Exp)
    }

    /// Natural logarithm.
    pub fn log(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Log)
    }

    pub fn sqrt(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Sqrt)
    }

    pub fn cbrt(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Cbrt)
    }

    pub fn ceil(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Ceil)
    }

    pub fn floor(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Floor)
    }

    pub fn abs(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Abs)
    }

    /// Round to nearest integer, ties to even. Floating columns only.
    pub fn rint(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Rint)
    }

    /// Bitwise complement. Integer and boolean columns only.
    pub fn bit_invert(&self) -> Result<Column> {
        self.unary_op(UnaryOp::BitInvert)
    }

    /// Logical negation of each row's truthiness, as Bool8.
    pub fn not(&self) -> Result<Column> {
        self.unary_op(UnaryOp::Not)
    }
}
