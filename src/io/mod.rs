//! File ingestion.

mod text;

pub use text::read_text;
