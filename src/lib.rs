pub mod buffer;
pub mod column;
pub mod error;
pub mod io;
pub mod mask;
pub mod scalar;
pub mod table;
pub mod types;

pub use column::{
    BinaryOp, Column, Interpolation, ReplaceNulls, Replacement, Rhs, UnaryOp,
};
pub use error::{Error, Result};
pub use io::read_text;
pub use scalar::{Scalar, ScalarValue};
pub use table::Table;
pub use types::{common_type, DataType, ToDataType};
