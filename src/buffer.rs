//! Raw element storage shared between column views.
//!
//! A [`Buffer`] owns a contiguous byte range; columns hold `Arc<Buffer>`
//! handles plus an offset/length, so slicing never copies and storage is
//! freed only when the last holder drops. In-place mutation goes through
//! [`Arc::get_mut`], which succeeds only for an exclusively-owned buffer.

use crate::{Error, Result};
use bytes::{Buf, BufMut};

/// Trait for element types stored as fixed-size little-endian values.
pub trait FixedSize: Sized + Copy + Send + Sync + 'static {
    /// Element width in bytes.
    const WIDTH: usize;

    fn read_from(buffer: &mut &[u8]) -> Result<Self>;
    fn write_to<B: BufMut>(&self, buffer: &mut B);
}

macro_rules! impl_fixed_size {
    ($type:ty, $get:ident, $put:ident) => {
        impl FixedSize for $type {
            const WIDTH: usize = std::mem::size_of::<$type>();

            fn read_from(buffer: &mut &[u8]) -> Result<Self> {
                if buffer.len() < std::mem::size_of::<$type>() {
                    return Err(Error::Range("buffer underflow".to_string()));
                }
                Ok(buffer.$get())
            }

            fn write_to<B: BufMut>(&self, buffer: &mut B) {
                buffer.$put(*self);
            }
        }
    };
}

impl_fixed_size!(u8, get_u8, put_u8);
impl_fixed_size!(u16, get_u16_le, put_u16_le);
impl_fixed_size!(u32, get_u32_le, put_u32_le);
impl_fixed_size!(u64, get_u64_le, put_u64_le);
impl_fixed_size!(i8, get_i8, put_i8);
impl_fixed_size!(i16, get_i16_le, put_i16_le);
impl_fixed_size!(i32, get_i32_le, put_i32_le);
impl_fixed_size!(i64, get_i64_le, put_i64_le);
impl_fixed_size!(f32, get_f32_le, put_f32_le);
impl_fixed_size!(f64, get_f64_le, put_f64_le);

/// Owned heap byte storage for column data and null masks.
#[derive(Debug, Default)]
pub struct Buffer {
    bytes: Vec<u8>,
}

impl Buffer {
    /// Wraps an existing byte vector without copying.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Allocates a zero-filled buffer of `len` bytes.
    pub fn with_len(len: usize) -> Self {
        Self { bytes: vec![0u8; len] }
    }

    /// Builds a buffer from a slice of fixed-size elements.
    pub fn from_elements<T: FixedSize>(values: &[T]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * T::WIDTH);
        for v in values {
            v.write_to(&mut bytes);
        }
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Number of whole `T` elements this buffer holds.
    pub fn element_count<T: FixedSize>(&self) -> usize {
        self.bytes.len() / T::WIDTH
    }

    /// Reads element `index` (element-addressed, not byte-addressed).
    pub fn get<T: FixedSize>(&self, index: usize) -> Result<T> {
        let start = index * T::WIDTH;
        let mut slice = self
            .bytes
            .get(start..start + T::WIDTH)
            .ok_or_else(|| Error::Range(format!("element index {} out of bounds", index)))?;
        T::read_from(&mut slice)
    }

    /// Writes element `index` in place.
    pub fn put<T: FixedSize>(&mut self, index: usize, value: T) -> Result<()> {
        let start = index * T::WIDTH;
        let mut slice = self
            .bytes
            .get_mut(start..start + T::WIDTH)
            .ok_or_else(|| Error::Range(format!("element index {} out of bounds", index)))?;
        value.write_to(&mut slice);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_from_elements() {
        let buf = Buffer::from_elements(&[1i32, -2, 3]);
        assert_eq!(buf.len(), 12);
        assert_eq!(buf.element_count::<i32>(), 3);
        assert_eq!(buf.get::<i32>(0).unwrap(), 1);
        assert_eq!(buf.get::<i32>(1).unwrap(), -2);
        assert_eq!(buf.get::<i32>(2).unwrap(), 3);
    }

    #[test]
    fn test_buffer_put() {
        let mut buf = Buffer::with_len(16);
        buf.put::<f64>(1, 2.5).unwrap();
        assert_eq!(buf.get::<f64>(0).unwrap(), 0.0);
        assert_eq!(buf.get::<f64>(1).unwrap(), 2.5);
    }

    #[test]
    fn test_buffer_out_of_bounds() {
        let buf = Buffer::from_elements(&[1u16, 2]);
        assert!(buf.get::<u16>(2).is_err());
        assert!(buf.get::<u64>(0).is_err());
    }

    #[test]
    fn test_little_endian_layout() {
        let buf = Buffer::from_elements(&[0x0102_0304u32]);
        assert_eq!(buf.as_slice(), &[0x04, 0x03, 0x02, 0x01]);
    }
}
