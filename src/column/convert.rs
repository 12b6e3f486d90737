//! String codecs: formatting numeric columns as strings, parsing strings
//! back, and validating string shapes.
//!
//! Parsers are best-effort, matching the permissive semantics of the compute
//! kernels: parsing stops at the first character that cannot extend the
//! value, accumulates in 64 bits without overflow checks, and a row with no
//! usable prefix yields 0. Nulls propagate 1:1 through every codec; the
//! `string_is_*` validators instead produce non-nullable Bool8 with `false`
//! for null rows.

use super::strings::Utf8Builder;
use super::{push_i64_as, push_u64_as, Column};
use crate::mask::ValidityBuilder;
use crate::types::DataType;
use crate::{Error, Result};

impl Column {
    fn require_utf8(&self, what: &str) -> Result<()> {
        if *self.dtype() != DataType::Utf8 {
            return Err(Error::TypeError(format!(
                "{} requires a Utf8 column, got {}",
                what,
                self.dtype().name()
            )));
        }
        Ok(())
    }

    fn require_integer(&self, what: &str) -> Result<()> {
        if !self.dtype().is_integer() {
            return Err(Error::TypeError(format!(
                "{} requires an integer column, got {}",
                what,
                self.dtype().name()
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Number formatting
    // ------------------------------------------------------------------

    /// Formats an integer column as decimal strings.
    pub fn strings_from_integers(&self) -> Result<Column> {
        self.ensure_live()?;
        self.require_integer("strings_from_integers")?;
        let mut builder = Utf8Builder::new(self.len());
        for row in 0..self.len() {
            if !self.valid_at(row) {
                builder.append_null();
            } else if self.dtype().is_unsigned_integer() {
                builder.append(&self.value_u64(row)?.to_string());
            } else {
                builder.append(&self.value_i64(row)?.to_string());
            }
        }
        Ok(builder.finish())
    }

    /// Formats a floating column as decimal strings, scientific notation
    /// outside `[1e-5, 1e10)` magnitudes.
    pub fn strings_from_floats(&self) -> Result<Column> {
        self.ensure_live()?;
        if !self.dtype().is_float() {
            return Err(Error::TypeError(format!(
                "strings_from_floats requires a floating-point column, got {}",
                self.dtype().name()
            )));
        }
        let mut builder = Utf8Builder::new(self.len());
        for row in 0..self.len() {
            if self.valid_at(row) {
                builder.append(&format_float(self.value_f64(row)?));
            } else {
                builder.append_null();
            }
        }
        Ok(builder.finish())
    }

    /// Formats a Bool8 column as `"true"`/`"false"` strings.
    pub fn strings_from_booleans(&self) -> Result<Column> {
        self.ensure_live()?;
        if *self.dtype() != DataType::Bool8 {
            return Err(Error::TypeError(format!(
                "strings_from_booleans requires a Bool8 column, got {}",
                self.dtype().name()
            )));
        }
        let mut builder = Utf8Builder::new(self.len());
        for row in 0..self.len() {
            if self.valid_at(row) {
                builder.append(if self.value_i64(row)? != 0 { "true" } else { "false" });
            } else {
                builder.append_null();
            }
        }
        Ok(builder.finish())
    }

    /// Formats an integer column as uppercase hexadecimal byte pairs, the
    /// value masked to the column's width and leading zero bytes dropped.
    pub fn hex_from_integers(&self) -> Result<Column> {
        self.ensure_live()?;
        self.require_integer("hex_from_integers")?;
        let width = self.dtype().size_of().unwrap();
        let mut builder = Utf8Builder::new(self.len());
        for row in 0..self.len() {
            if !self.valid_at(row) {
                builder.append_null();
                continue;
            }
            let v = self.value_u64(row)?;
            let mut s = String::with_capacity(width * 2);
            let mut seen = false;
            for byte_index in (0..width).rev() {
                let byte = (v >> (byte_index * 8)) as u8;
                if byte != 0 || seen || byte_index == 0 {
                    s.push_str(&format!("{:02X}", byte));
                    seen = true;
                }
            }
            builder.append(&s);
        }
        Ok(builder.finish())
    }

    /// Formats an integer column as dotted-quad IPv4 strings from the low 32
    /// bits of each value.
    pub fn ipv4_from_integers(&self) -> Result<Column> {
        self.ensure_live()?;
        self.require_integer("ipv4_from_integers")?;
        let mut builder = Utf8Builder::new(self.len());
        for row in 0..self.len() {
            if !self.valid_at(row) {
                builder.append_null();
                continue;
            }
            let v = self.value_u64(row)? as u32;
            builder.append(&format!(
                "{}.{}.{}.{}",
                v >> 24,
                (v >> 16) & 0xFF,
                (v >> 8) & 0xFF,
                v & 0xFF
            ));
        }
        Ok(builder.finish())
    }

    // ------------------------------------------------------------------
    // String parsing
    // ------------------------------------------------------------------

    /// Parses decimal strings into an integer column of `dtype`.
    pub fn strings_to_integers(&self, dtype: &DataType) -> Result<Column> {
        self.ensure_live()?;
        self.require_utf8("strings_to_integers")?;
        if !dtype.is_integer() {
            return Err(Error::TypeError(format!(
                "strings_to_integers target must be an integer type, got {}",
                dtype.name()
            )));
        }
        self.parse_rows(dtype, |s| parse_int_prefix(s))
    }

    /// Parses decimal strings into a floating column of `dtype`.
    pub fn strings_to_floats(&self, dtype: &DataType) -> Result<Column> {
        self.ensure_live()?;
        self.require_utf8("strings_to_floats")?;
        if !dtype.is_float() {
            return Err(Error::TypeError(format!(
                "strings_to_floats target must be a floating-point type, got {}",
                dtype.name()
            )));
        }
        let width = dtype.size_of().unwrap();
        let mut bytes = Vec::with_capacity(self.len() * width);
        let mut validity = ValidityBuilder::new(self.len());
        for row in 0..self.len() {
            match self.string_at(row)? {
                Some(s) => {
                    super::push_f64_as(&mut bytes, dtype, parse_float_prefix(s));
                    validity.push(true);
                }
                None => {
                    super::push_f64_as(&mut bytes, dtype, 0.0);
                    validity.push(false);
                }
            }
        }
        Ok(Column::new_fixed(dtype.clone(), bytes, validity.finish(), self.len()))
    }

    /// Parses strings into Bool8: a row equal to `true_repr` is true,
    /// anything else is false.
    pub fn strings_to_booleans(&self, true_repr: &str) -> Result<Column> {
        self.ensure_live()?;
        self.require_utf8("strings_to_booleans")?;
        let mut bytes = Vec::with_capacity(self.len());
        let mut validity = ValidityBuilder::new(self.len());
        for row in 0..self.len() {
            match self.string_at(row)? {
                Some(s) => {
                    bytes.push((s == true_repr) as u8);
                    validity.push(true);
                }
                None => {
                    bytes.push(0);
                    validity.push(false);
                }
            }
        }
        Ok(Column::new_fixed(DataType::Bool8, bytes, validity.finish(), self.len()))
    }

    /// Parses hexadecimal strings (optional `0x` prefix) into an integer
    /// column of `dtype`.
    pub fn hex_to_integers(&self, dtype: &DataType) -> Result<Column> {
        self.ensure_live()?;
        self.require_utf8("hex_to_integers")?;
        if !dtype.is_integer() {
            return Err(Error::TypeError(format!(
                "hex_to_integers target must be an integer type, got {}",
                dtype.name()
            )));
        }
        self.parse_rows(dtype, |s| {
            let body = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
            let mut v: u64 = 0;
            for c in body.chars() {
                match c.to_digit(16) {
                    Some(d) => v = (v << 4) | d as u64,
                    None => break,
                }
            }
            v as i64
        })
    }

    /// Parses dotted-quad IPv4 strings into Int64, each octet packed into
    /// the value as `(a << 24) | (b << 16) | (c << 8) | d`. Behavior for
    /// malformed rows is undefined beyond not trapping; validate with
    /// [`Column::string_is_ipv4`] first.
    pub fn ipv4_to_integers(&self) -> Result<Column> {
        self.ensure_live()?;
        self.require_utf8("ipv4_to_integers")?;
        self.parse_rows(&DataType::Int64, |s| {
            let mut packed: i64 = 0;
            let mut octet: i64 = 0;
            for c in s.chars() {
                if let Some(d) = c.to_digit(10) {
                    octet = octet.wrapping_mul(10).wrapping_add(d as i64);
                } else if c == '.' {
                    packed = (packed << 8) | octet;
                    octet = 0;
                } else {
                    break;
                }
            }
            (packed << 8) | octet
        })
    }

    fn parse_rows(&self, dtype: &DataType, parse: impl Fn(&str) -> i64) -> Result<Column> {
        let width = dtype.size_of().unwrap();
        let mut bytes = Vec::with_capacity(self.len() * width);
        let mut validity = ValidityBuilder::new(self.len());
        for row in 0..self.len() {
            match self.string_at(row)? {
                Some(s) => {
                    let v = parse(s);
                    if dtype.is_unsigned_integer() {
                        push_u64_as(&mut bytes, dtype, v as u64);
                    } else {
                        push_i64_as(&mut bytes, dtype, v);
                    }
                    validity.push(true);
                }
                None => {
                    push_i64_as(&mut bytes, dtype, 0);
                    validity.push(false);
                }
            }
        }
        Ok(Column::new_fixed(dtype.clone(), bytes, validity.finish(), self.len()))
    }

    // ------------------------------------------------------------------
    // Validators
    // ------------------------------------------------------------------

    fn validate_rows(&self, check: impl Fn(&str) -> bool) -> Result<Column> {
        let mut bytes = Vec::with_capacity(self.len());
        for row in 0..self.len() {
            bytes.push(match self.string_at(row)? {
                Some(s) => check(s) as u8,
                None => 0,
            });
        }
        Ok(Column::new_fixed(DataType::Bool8, bytes, None, self.len()))
    }

    /// Bool8, true where the whole row is a decimal integer. Null rows are
    /// false; output is non-nullable.
    pub fn string_is_integer(&self) -> Result<Column> {
        self.ensure_live()?;
        self.require_utf8("string_is_integer")?;
        self.validate_rows(is_integer_repr)
    }

    /// Bool8, true where the whole row is a decimal floating-point number.
    pub fn string_is_float(&self) -> Result<Column> {
        self.ensure_live()?;
        self.require_utf8("string_is_float")?;
        self.validate_rows(is_float_repr)
    }

    /// Bool8, true where the whole row is a hexadecimal number, optional
    /// `0x` prefix.
    pub fn string_is_hex(&self) -> Result<Column> {
        self.ensure_live()?;
        self.require_utf8("string_is_hex")?;
        self.validate_rows(|s| {
            let body = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
            !body.is_empty() && body.chars().all(|c| c.is_ascii_hexdigit())
        })
    }

    /// Bool8, true where the whole row is a dotted-quad IPv4 address.
    pub fn string_is_ipv4(&self) -> Result<Column> {
        self.ensure_live()?;
        self.require_utf8("string_is_ipv4")?;
        self.validate_rows(|s| {
            let parts: Vec<&str> = s.split('.').collect();
            parts.len() == 4
                && parts.iter().all(|p| {
                    !p.is_empty()
                        && p.len() <= 3
                        && p.chars().all(|c| c.is_ascii_digit())
                        && p.parse::<u32>().map(|v| v <= 255).unwrap_or(false)
                })
        })
    }
}

/// Decimal formatting for `f64`: NaN and infinities by name, plain decimal
/// with at least one fractional digit in the mid range, `m e+x` scientific
/// notation outside it.
fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }
    if v == 0.0 {
        return "0.0".to_string();
    }
    let magnitude = v.abs();
    if !(1e-5..1e10).contains(&magnitude) {
        // {:e} prints "1.5e30"; normalize to an explicitly signed exponent.
        let s = format!("{:e}", v);
        let (mantissa, exponent) = s.split_once('e').unwrap();
        return if exponent.starts_with('-') {
            format!("{}e{}", mantissa, exponent)
        } else {
            format!("{}e+{}", mantissa, exponent)
        };
    }
    let s = format!("{}", v);
    if s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}

/// Wrapping decimal parse of the longest usable prefix: optional sign, then
/// digits. No digits yields 0.
fn parse_int_prefix(s: &str) -> i64 {
    let mut chars = s.chars().peekable();
    let mut negative = false;
    if let Some(&c) = chars.peek() {
        if c == '+' || c == '-' {
            negative = c == '-';
            chars.next();
        }
    }
    let mut v: i64 = 0;
    for c in chars {
        match c.to_digit(10) {
            Some(d) => v = v.wrapping_mul(10).wrapping_add(d as i64),
            None => break,
        }
    }
    if negative {
        v.wrapping_neg()
    } else {
        v
    }
}

/// Parses the longest prefix that forms a decimal floating-point number
/// (optional sign, digits, fraction, exponent). No usable prefix yields 0.
fn parse_float_prefix(s: &str) -> f64 {
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let mut last_complete = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        last_complete = i;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        if last_complete > 0 {
            last_complete = i;
        }
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            last_complete = i;
        }
    }
    if last_complete > 0 && i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let mut has_exp_digit = false;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
            has_exp_digit = true;
        }
        if has_exp_digit {
            last_complete = j;
        }
    }
    s[..last_complete].parse::<f64>().unwrap_or(0.0)
}

fn is_integer_repr(s: &str) -> bool {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit())
}

fn is_float_repr(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let mut mantissa_digits = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        mantissa_digits += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            mantissa_digits += 1;
        }
    }
    if mantissa_digits == 0 {
        return false;
    }
    if i == bytes.len() {
        return true;
    }
    if bytes[i] != b'e' && bytes[i] != b'E' {
        return false;
    }
    i += 1;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let exp_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i == bytes.len() && i > exp_start
}
