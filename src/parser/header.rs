//! File header of a Clarion data file.

use super::codec::{fixed_text, read_array, serialize_fixed_text};
use super::error::{ClarionError, Result};
use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use std::io::{self, Read, Write};

bitflags! {
    /// File status/attribute bits (`sfatr`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct FileAttributes: u16 {
        const LOCKED = 1 << 0;
        const OWNED = 1 << 1;
        const RECORDS_ENCRYPTED = 1 << 2;
        const MEMO_EXISTS = 1 << 3;
        const COMPRESSED = 1 << 4;
        const RECLAIM_DELETED = 1 << 5;
        const READ_ONLY = 1 << 6;
        const MAY_BE_CREATED = 1 << 7;
    }
}

impl FileAttributes {
    /// Human-readable names of the low eight bits, in bit order.
    pub const NAMES: [&'static str; 8] = [
        "FILE LOCKED",
        "FILE OWNED",
        "RECORDS ENCRYPTED",
        "MEMO FILE EXISTS",
        "FILE COMPRESSED",
        "RECLAIM DELETED RECORDS",
        "READ ONLY",
        "MAY BE CREATED",
    ];
}

/// Main header structure (85 bytes, packed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    pub signature: u16,
    pub attributes: FileAttributes,
    pub key_count: u8,
    pub record_count: u32,
    pub deleted_count: u32,
    pub field_count: u16,
    pub picture_count: u16,
    pub array_count: u16,
    pub record_length: u16,
    /// Start of the fixed-length record area.
    pub data_offset: u32,
    pub logical_eof: u32,
    pub logical_bof: u32,
    pub free_record: u32,
    #[serde(serialize_with = "serialize_fixed_text")]
    pub record_name: [u8; 12],
    #[serde(serialize_with = "serialize_fixed_text")]
    pub memo_name: [u8; 12],
    #[serde(serialize_with = "serialize_fixed_text")]
    pub file_prefix: [u8; 3],
    #[serde(serialize_with = "serialize_fixed_text")]
    pub record_prefix: [u8; 3],
    pub memo_length: u16,
    pub memo_width: u16,
    /// Doubles as key material when the records are encrypted.
    pub reserved: u32,
    pub change_time: u32,
    pub change_date: u32,
    pub reserved2: u16,
}

impl FileHeader {
    pub const SIZE: usize = 85;
    pub const SIGNATURE: u16 = 0x3343;
    /// Byte offset of the attribute word.
    pub const ATTRIBUTES_OFFSET: usize = 2;
    /// The signature and attribute word are never encrypted.
    pub const PLAIN_PREFIX: usize = 4;

    /// Parse the header from the start of a data file.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let signature = reader.read_u16::<LittleEndian>()?;
        if signature != Self::SIGNATURE {
            return Err(ClarionError::BadSignature {
                expected: Self::SIGNATURE,
                found: signature,
            });
        }

        Ok(Self {
            signature,
            attributes: FileAttributes::from_bits_retain(reader.read_u16::<LittleEndian>()?),
            key_count: reader.read_u8()?,
            record_count: reader.read_u32::<LittleEndian>()?,
            deleted_count: reader.read_u32::<LittleEndian>()?,
            field_count: reader.read_u16::<LittleEndian>()?,
            picture_count: reader.read_u16::<LittleEndian>()?,
            array_count: reader.read_u16::<LittleEndian>()?,
            record_length: reader.read_u16::<LittleEndian>()?,
            data_offset: reader.read_u32::<LittleEndian>()?,
            logical_eof: reader.read_u32::<LittleEndian>()?,
            logical_bof: reader.read_u32::<LittleEndian>()?,
            free_record: reader.read_u32::<LittleEndian>()?,
            record_name: read_array(reader)?,
            memo_name: read_array(reader)?,
            file_prefix: read_array(reader)?,
            record_prefix: read_array(reader)?,
            memo_length: reader.read_u16::<LittleEndian>()?,
            memo_width: reader.read_u16::<LittleEndian>()?,
            reserved: reader.read_u32::<LittleEndian>()?,
            change_time: reader.read_u32::<LittleEndian>()?,
            change_date: reader.read_u32::<LittleEndian>()?,
            reserved2: reader.read_u16::<LittleEndian>()?,
        })
    }

    /// Serialize back into the on-disk layout.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.signature)?;
        writer.write_u16::<LittleEndian>(self.attributes.bits())?;
        writer.write_u8(self.key_count)?;
        writer.write_u32::<LittleEndian>(self.record_count)?;
        writer.write_u32::<LittleEndian>(self.deleted_count)?;
        writer.write_u16::<LittleEndian>(self.field_count)?;
        writer.write_u16::<LittleEndian>(self.picture_count)?;
        writer.write_u16::<LittleEndian>(self.array_count)?;
        writer.write_u16::<LittleEndian>(self.record_length)?;
        writer.write_u32::<LittleEndian>(self.data_offset)?;
        writer.write_u32::<LittleEndian>(self.logical_eof)?;
        writer.write_u32::<LittleEndian>(self.logical_bof)?;
        writer.write_u32::<LittleEndian>(self.free_record)?;
        writer.write_all(&self.record_name)?;
        writer.write_all(&self.memo_name)?;
        writer.write_all(&self.file_prefix)?;
        writer.write_all(&self.record_prefix)?;
        writer.write_u16::<LittleEndian>(self.memo_length)?;
        writer.write_u16::<LittleEndian>(self.memo_width)?;
        writer.write_u32::<LittleEndian>(self.reserved)?;
        writer.write_u32::<LittleEndian>(self.change_time)?;
        writer.write_u32::<LittleEndian>(self.change_date)?;
        writer.write_u16::<LittleEndian>(self.reserved2)
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn is_encrypted(&self) -> bool {
        self.attributes.contains(FileAttributes::RECORDS_ENCRYPTED)
    }

    pub fn has_memo(&self) -> bool {
        self.attributes.contains(FileAttributes::MEMO_EXISTS)
    }

    pub fn record_name(&self) -> String {
        fixed_text(&self.record_name)
    }

    pub fn memo_name(&self) -> String {
        fixed_text(&self.memo_name)
    }

    pub fn file_prefix(&self) -> String {
        fixed_text(&self.file_prefix)
    }

    pub fn record_prefix(&self) -> String {
        fixed_text(&self.record_prefix)
    }

    /// Last change time, or `None` when out of range.
    pub fn change_time(&self) -> Option<NaiveTime> {
        decode_time(self.change_time)
    }

    /// Last change date, or `None` when out of range.
    pub fn change_date(&self) -> Option<NaiveDate> {
        decode_date(self.change_date)
    }
}

/// Clarion time: centiseconds since midnight, plus one.
pub fn decode_time(value: u32) -> Option<NaiveTime> {
    if !(1..=8_640_000).contains(&value) {
        return None;
    }
    let cs = value - 1;
    NaiveTime::from_hms_milli_opt(
        cs / 360_000,
        (cs % 360_000) / 6_000,
        (cs % 6_000) / 100,
        (cs % 100) * 10,
    )
}

/// Clarion date: days since 1800-12-28, valid from 1801-01-01 to 2099-12-31.
pub fn decode_date(value: u32) -> Option<NaiveDate> {
    if !(4..=109_211).contains(&value) {
        return None;
    }
    NaiveDate::from_ymd_opt(1800, 12, 28)?.checked_add_signed(Duration::days(i64::from(value)))
}
