//! Primitive wire field types and their codecs.
//!
//! The protocol has a closed set of field types: fixed-width big-endian
//! unsigned integers (`u8`/`u16`/`u24`/`u32`), length-delimited strings
//! (1-byte length prefix, max 255 bytes) and null-terminated strings.
//! Packet descriptors select from this set by tag; nothing constructs new
//! field types at runtime.
//!
//! Round-trip law: for every representable value `v`,
//! `decode(encode(v)) == (v, encode(v).len())`.

use serde::Deserialize;
use std::fmt;

use crate::error::FieldError;

/// A wire field type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer, big-endian.
    U16,
    /// 24-bit unsigned integer, big-endian.
    U24,
    /// 32-bit unsigned integer, big-endian.
    U32,
    /// Length-delimited string: 1-byte length prefix then that many bytes.
    Lds,
    /// Null-terminated string: bytes followed by a single 0x00.
    Nts,
}

impl FieldType {
    /// Static name of the type, as written in schema files.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::U8 => "u8",
            FieldType::U16 => "u16",
            FieldType::U24 => "u24",
            FieldType::U32 => "u32",
            FieldType::Lds => "lds",
            FieldType::Nts => "nts",
        }
    }

    /// Bit width for integer types, `None` for strings.
    fn bits(self) -> Option<u32> {
        match self {
            FieldType::U8 => Some(8),
            FieldType::U16 => Some(16),
            FieldType::U24 => Some(24),
            FieldType::U32 => Some(32),
            FieldType::Lds | FieldType::Nts => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Value of any fixed-width unsigned integer field.
    Uint(u32),
    /// Value of either string field type.
    Str(String),
}

impl FieldValue {
    /// The integer value, if this is an integer field.
    pub fn as_uint(&self) -> Option<u32> {
        match self {
            FieldValue::Uint(v) => Some(*v),
            FieldValue::Str(_) => None,
        }
    }

    /// The string value, if this is a string field.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            FieldValue::Uint(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Uint(_) => "uint",
            FieldValue::Str(_) => "string",
        }
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Uint(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

/// Encode `value` as `ty`, appending to `out`.
pub fn encode(value: &FieldValue, ty: FieldType, out: &mut Vec<u8>) -> Result<(), FieldError> {
    match ty {
        FieldType::U8 | FieldType::U16 | FieldType::U24 | FieldType::U32 => {
            let v = value.as_uint().ok_or(FieldError::TypeMismatch {
                expected: ty.name(),
                got: value.kind(),
            })?;
            let bits = ty.bits().unwrap_or(32);
            if bits < 32 && u64::from(v) >= 1u64 << bits {
                return Err(FieldError::Overflow { value: v, bits });
            }
            let be = v.to_be_bytes();
            out.extend_from_slice(&be[4 - (bits as usize / 8)..]);
            Ok(())
        }
        FieldType::Lds => {
            let s = value.as_str().ok_or(FieldError::TypeMismatch {
                expected: ty.name(),
                got: value.kind(),
            })?;
            if s.len() > 255 {
                return Err(FieldError::StringTooLong { len: s.len() });
            }
            out.push(s.len() as u8);
            out.extend_from_slice(s.as_bytes());
            Ok(())
        }
        FieldType::Nts => {
            let s = value.as_str().ok_or(FieldError::TypeMismatch {
                expected: ty.name(),
                got: value.kind(),
            })?;
            if let Some(offset) = s.as_bytes().iter().position(|&b| b == 0x00) {
                return Err(FieldError::EmbeddedTerminator { offset });
            }
            out.extend_from_slice(s.as_bytes());
            out.push(0x00);
            Ok(())
        }
    }
}

/// Decode one field of type `ty` from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode(ty: FieldType, buf: &[u8]) -> Result<(FieldValue, usize), FieldError> {
    match ty {
        FieldType::U8 | FieldType::U16 | FieldType::U24 | FieldType::U32 => {
            let width = ty.bits().unwrap_or(32) as usize / 8;
            if buf.len() < width {
                return Err(FieldError::Truncated {
                    needed: width,
                    remaining: buf.len(),
                });
            }
            let mut v: u32 = 0;
            for &b in &buf[..width] {
                v = (v << 8) | u32::from(b);
            }
            Ok((FieldValue::Uint(v), width))
        }
        FieldType::Lds => {
            if buf.is_empty() {
                return Err(FieldError::Truncated {
                    needed: 1,
                    remaining: 0,
                });
            }
            let declared = buf[0] as usize;
            let rest = &buf[1..];
            if rest.len() < declared {
                return Err(FieldError::LengthMismatch {
                    declared,
                    remaining: rest.len(),
                });
            }
            let s = std::str::from_utf8(&rest[..declared])
                .map_err(|e| FieldError::InvalidUtf8(e.to_string()))?;
            Ok((FieldValue::Str(s.to_string()), declared + 1))
        }
        FieldType::Nts => {
            let terminator = buf
                .iter()
                .position(|&b| b == 0x00)
                .ok_or(FieldError::MissingTerminator)?;
            let s = std::str::from_utf8(&buf[..terminator])
                .map_err(|e| FieldError::InvalidUtf8(e.to_string()))?;
            Ok((FieldValue::Str(s.to_string()), terminator + 1))
        }
    }
}
