//! Null-mask bookkeeping.
//!
//! A mask is a bitmask buffer where a set bit marks a valid (non-null) row.
//! Bit addressing is buffer-absolute, not view-relative:
//! `(mask[i / 8] >> (i % 8)) & 1`. A column without a mask has no nulls.

/// Bytes required to hold a mask for `rows` rows.
pub fn mask_len(rows: usize) -> usize {
    rows.div_ceil(8)
}

/// Whether bit `i` is set (row `i` valid).
pub fn bit_is_set(mask: &[u8], i: usize) -> bool {
    (mask[i / 8] >> (i % 8)) & 1 == 1
}

/// Marks row `i` valid.
pub fn set_bit(mask: &mut [u8], i: usize) {
    mask[i / 8] |= 1 << (i % 8);
}

/// Marks row `i` null.
pub fn clear_bit(mask: &mut [u8], i: usize) {
    mask[i / 8] &= !(1 << (i % 8));
}

/// Counts null rows (unset bits) in `[offset, offset + len)`.
pub fn count_unset_bits(mask: &[u8], offset: usize, len: usize) -> usize {
    (offset..offset + len).filter(|&i| !bit_is_set(mask, i)).count()
}

/// Accumulates per-row validity into a packed mask.
///
/// `finish` returns `None` when every row was valid, so callers can skip
/// allocating a mask for an all-valid result.
pub struct ValidityBuilder {
    bits: Vec<u8>,
    len: usize,
    null_count: usize,
}

impl ValidityBuilder {
    pub fn new(rows: usize) -> Self {
        Self {
            bits: vec![0u8; mask_len(rows)],
            len: 0,
            null_count: 0,
        }
    }

    pub fn push(&mut self, valid: bool) {
        if self.len / 8 >= self.bits.len() {
            self.bits.push(0);
        }
        if valid {
            set_bit(&mut self.bits, self.len);
        } else {
            self.null_count += 1;
        }
        self.len += 1;
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    /// Packed mask and null count, or `None` when no row was null.
    pub fn finish(self) -> Option<(Vec<u8>, usize)> {
        if self.null_count == 0 {
            None
        } else {
            Some((self.bits, self.null_count))
        }
    }
}

/// Builds a mask from a slice of per-row validity flags.
pub fn mask_from_bools(validity: &[bool]) -> Option<(Vec<u8>, usize)> {
    let mut builder = ValidityBuilder::new(validity.len());
    for &v in validity {
        builder.push(v);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_len() {
        assert_eq!(mask_len(0), 0);
        assert_eq!(mask_len(1), 1);
        assert_eq!(mask_len(8), 1);
        assert_eq!(mask_len(9), 2);
    }

    #[test]
    fn test_bit_addressing() {
        // Bit i lives at mask[i / 8], position i % 8.
        let mask = [0b0000_0101u8, 0b0000_0001];
        assert!(bit_is_set(&mask, 0));
        assert!(!bit_is_set(&mask, 1));
        assert!(bit_is_set(&mask, 2));
        assert!(bit_is_set(&mask, 8));
        assert!(!bit_is_set(&mask, 9));
    }

    #[test]
    fn test_set_clear() {
        let mut mask = vec![0u8; 2];
        set_bit(&mut mask, 3);
        set_bit(&mut mask, 10);
        assert!(bit_is_set(&mask, 3));
        assert!(bit_is_set(&mask, 10));
        clear_bit(&mut mask, 3);
        assert!(!bit_is_set(&mask, 3));
    }

    #[test]
    fn test_count_unset_windowed() {
        let mut mask = vec![0u8; 2];
        for i in [0, 2, 4, 6, 8] {
            set_bit(&mut mask, i);
        }
        // Rows 0..10: nulls at 1, 3, 5, 7, 9.
        assert_eq!(count_unset_bits(&mask, 0, 10), 5);
        // Window [2, 6): nulls at 3, 5.
        assert_eq!(count_unset_bits(&mask, 2, 4), 2);
    }

    #[test]
    fn test_validity_builder_all_valid() {
        let mut b = ValidityBuilder::new(4);
        for _ in 0..4 {
            b.push(true);
        }
        assert!(b.finish().is_none());
    }

    #[test]
    fn test_validity_builder_with_nulls() {
        let mut b = ValidityBuilder::new(3);
        b.push(true);
        b.push(false);
        b.push(true);
        let (bits, nulls) = b.finish().unwrap();
        assert_eq!(nulls, 1);
        assert!(bit_is_set(&bits, 0));
        assert!(!bit_is_set(&bits, 1));
        assert!(bit_is_set(&bits, 2));
    }

    #[test]
    fn test_mask_from_bools() {
        assert!(mask_from_bools(&[true, true]).is_none());
        let (bits, nulls) = mask_from_bools(&[false, true, false]).unwrap();
        assert_eq!(nulls, 2);
        assert!(!bit_is_set(&bits, 0));
        assert!(bit_is_set(&bits, 1));
    }
}
