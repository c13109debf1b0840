//! Typed decoding of a single field's on-disk bytes.

use crate::parser::codec::{read_vec, trim_trailing_spaces, until_nul};
use crate::parser::{ClarionError, FieldDescriptor, FieldType, Result};
use bitflags::bitflags;
use encoding_rs::Encoding;
use serde::Serialize;
use std::fmt;
use std::io::Read;

/// Bit pattern of a `Real` that was never assigned, as stored on disk.
pub const REAL_UNINITIALIZED: [u8; 8] = [0xb0, 0xff, 0xff, 0xff, 0xff, 0xff, 0xef, 0xff];

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Long(i32),
    Real(f64),
    Text(String),
    Byte(u8),
    Short(u16),
    /// Digits with the decimal point already placed, e.g. `"0.50"`.
    Decimal(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Long(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{:.6}", v),
            Value::Text(v) | Value::Decimal(v) => f.write_str(v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
        }
    }
}

/// Converts stored text into UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transcoder {
    encoding: Option<&'static Encoding>,
}

impl Transcoder {
    /// Use the given charset label, or pass bytes through as (lossy) UTF-8.
    pub fn new(charset: Option<&str>) -> Result<Self> {
        let encoding = charset
            .map(|label| {
                Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| ClarionError::UnknownCharset(label.to_string()))
            })
            .transpose()?;
        Ok(Self { encoding })
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self.encoding {
            Some(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

bitflags! {
    /// Record status bits (`rhd`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct RecordStatus: u8 {
        const NEW = 1 << 0;
        const OLD = 1 << 1;
        const REVISED = 1 << 2;
        const DELETED = 1 << 4;
        const HELD = 1 << 6;
    }
}

impl RecordStatus {
    /// Names of all eight bits, in bit order.
    pub const NAMES: [&'static str; 8] = [
        "NEW RECORD",
        "OLD RECORD",
        "REVISED RECORD",
        "*** UNDEFINED (3) ***",
        "DELETED RECORD",
        "*** UNDEFINED (5) ***",
        "RECORD HELD",
        "*** UNDEFINED (7) ***",
    ];
}

/// The 5-byte prefix of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordHeader {
    pub status: RecordStatus,
    /// Head of the memo chain when a memo file exists.
    pub pointer: u32,
}

impl RecordHeader {
    pub const SIZE: usize = 5;

    pub fn from_bytes(data: &[u8; 5]) -> Self {
        Self {
            status: RecordStatus::from_bits_retain(data[0]),
            pointer: u32::from_le_bytes([data[1], data[2], data[3], data[4]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; 5] {
        let [p0, p1, p2, p3] = self.pointer.to_le_bytes();
        [self.status.bits(), p0, p1, p2, p3]
    }

    pub fn is_deleted(&self) -> bool {
        self.status.contains(RecordStatus::DELETED)
    }
}

/// Read one field from a sequential cursor.
///
/// Always consumes exactly `field.length` bytes; `None` means the field holds no value.
pub fn read_field<R: Read>(
    reader: &mut R,
    field: &FieldDescriptor,
    transcoder: &Transcoder,
) -> Result<Option<Value>> {
    let raw = read_vec(reader, field.length as usize)?;
    Ok(decode_value(field, &raw, transcoder))
}

/// Decode a field's raw bytes. Group fields carry no data and decode to `None`.
pub fn decode_value(field: &FieldDescriptor, raw: &[u8], transcoder: &Transcoder) -> Option<Value> {
    match field.field_type {
        FieldType::Long => Some(Value::Long(decode_long(raw))),
        FieldType::Real => decode_real(raw).map(Value::Real),
        FieldType::String | FieldType::PictureString => decode_text(raw, transcoder).map(Value::Text),
        FieldType::Byte => raw.first().map(|&b| Value::Byte(b)),
        FieldType::Short => Some(Value::Short(u16::from_le_bytes(widen(raw)))),
        FieldType::Decimal => decode_decimal(raw, field.digits, field.places).map(Value::Decimal),
        FieldType::Group | FieldType::Unknown(_) => None,
    }
}

/// Copy up to `N` leading bytes into a zero-filled array.
fn widen<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    let n = raw.len().min(N);
    buf[..n].copy_from_slice(&raw[..n]);
    buf
}

/// A set top bit in the high byte is uninitialized storage and is masked off.
pub fn decode_long(raw: &[u8]) -> i32 {
    let mut value = u32::from_le_bytes(widen(raw));
    if value & 0x8000_0000 != 0 {
        value &= 0x00ff_ffff;
    }
    value as i32
}

pub fn decode_real(raw: &[u8]) -> Option<f64> {
    let n = raw.len().min(REAL_UNINITIALIZED.len());
    if raw[..n] == REAL_UNINITIALIZED[..n] {
        return None;
    }
    Some(f64::from_le_bytes(widen(raw)))
}

pub fn decode_text(raw: &[u8], transcoder: &Transcoder) -> Option<String> {
    let text = until_nul(trim_trailing_spaces(raw));
    if text.is_empty() {
        return None;
    }
    Some(transcoder.decode(text))
}

/// Decode packed BCD with `digits` significant digits, `places` of them after the point.
///
/// An odd digit count means the first nibble is padding. Leading zeros are
/// stripped, keeping one before the point.
pub fn decode_decimal(raw: &[u8], digits: u8, places: u8) -> Option<String> {
    let point = digits.checked_sub(places).map(usize::from);

    let mut text = String::with_capacity(raw.len() * 2 + 2);
    let nibbles = raw
        .iter()
        .flat_map(|&b| [b >> 4, b & 0x0f])
        .skip(usize::from(digits % 2));
    for nibble in nibbles {
        if Some(text.len()) == point {
            text.push('.');
        }
        text.push(char::from(b'0' + nibble));
    }

    let stripped = text.trim_start_matches('0');
    if stripped.starts_with('.') {
        Some(format!("0{}", stripped))
    } else if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}
