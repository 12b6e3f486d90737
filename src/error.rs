use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("type error: {0}")]
    TypeError(String),

    #[error("shape mismatch: expected length {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("range error: {0}")]
    Range(String),

    #[error("domain error: {0}")]
    Domain(String),

    #[error("unsupported cast from {from} to {to}")]
    UnsupportedCast { from: String, to: String },

    #[error("aliasing error: {0}")]
    Aliasing(String),

    #[error("column used after dispose")]
    UseAfterDispose,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
