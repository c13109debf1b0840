//! Field, key, picture and array descriptors following the file header.
//!
//! Each section is read in order from the same sequential cursor; the counts
//! that size them come from the header and are trusted as declared.

use super::codec::{fixed_text, read_array, read_vec, serialize_fixed_text, strip_prefix};
use super::error::{ClarionError, Result, Warning};
use super::header::FileHeader;
use super::resolver::IndexResolver;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use serde::{Serialize, Serializer};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Field type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Long,
    Real,
    String,
    PictureString,
    Byte,
    Short,
    /// Pseudo-field grouping the next `length` fields.
    Group,
    Decimal,
    Unknown(u8),
}

impl FieldType {
    pub fn code(self) -> u8 {
        match self {
            FieldType::Long => 1,
            FieldType::Real => 2,
            FieldType::String => 3,
            FieldType::PictureString => 4,
            FieldType::Byte => 5,
            FieldType::Short => 6,
            FieldType::Group => 7,
            FieldType::Decimal => 8,
            FieldType::Unknown(code) => code,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::Long => "LONG",
            FieldType::Real => "REAL",
            FieldType::String => "STRING",
            FieldType::PictureString => "STRING WITH PICTURE TOKEN",
            FieldType::Byte => "BYTE",
            FieldType::Short => "SHORT",
            FieldType::Group => "GROUP",
            FieldType::Decimal => "DECIMAL",
            FieldType::Unknown(_) => "*** UNDEFINED ***",
        }
    }
}

impl From<u8> for FieldType {
    fn from(value: u8) -> Self {
        match value {
            1 => FieldType::Long,
            2 => FieldType::Real,
            3 => FieldType::String,
            4 => FieldType::PictureString,
            5 => FieldType::Byte,
            6 => FieldType::Short,
            7 => FieldType::Group,
            8 => FieldType::Decimal,
            other => FieldType::Unknown(other),
        }
    }
}

/// Field descriptor (27 bytes, packed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub field_type: FieldType,
    #[serde(serialize_with = "serialize_fixed_text")]
    pub name: [u8; 16],
    pub offset: u16,
    pub length: u16,
    /// Significant digits of a decimal.
    pub digits: u8,
    /// Fraction digits of a decimal.
    pub places: u8,
    /// 1-based array descriptor number, 0 for none.
    pub array_index: u16,
    /// 1-based picture descriptor number, 0 for none.
    pub picture_index: u16,
    /// Array descriptors chained to this field; not stored in the descriptor itself.
    pub arrays: Vec<ArrayDescriptor>,
}

impl FieldDescriptor {
    pub const SIZE: usize = 27;

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            field_type: FieldType::from(reader.read_u8()?),
            name: read_array(reader)?,
            offset: reader.read_u16::<LittleEndian>()?,
            length: reader.read_u16::<LittleEndian>()?,
            digits: reader.read_u8()?,
            places: reader.read_u8()?,
            array_index: reader.read_u16::<LittleEndian>()?,
            picture_index: reader.read_u16::<LittleEndian>()?,
            arrays: Vec::new(),
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.field_type.code())?;
        writer.write_all(&self.name)?;
        writer.write_u16::<LittleEndian>(self.offset)?;
        writer.write_u16::<LittleEndian>(self.length)?;
        writer.write_u8(self.digits)?;
        writer.write_u8(self.places)?;
        writer.write_u16::<LittleEndian>(self.array_index)?;
        writer.write_u16::<LittleEndian>(self.picture_index)
    }

    /// Full name, including the file prefix (e.g. `CUS:NAME`).
    pub fn name(&self) -> String {
        fixed_text(&self.name)
    }

    /// Name without the `PRE:` prefix.
    pub fn column_name(&self) -> String {
        strip_prefix(&self.name()).to_string()
    }

    pub fn is_group(&self) -> bool {
        self.field_type == FieldType::Group
    }
}

/// Key type byte read from the companion key file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyType(pub u8);

impl KeyType {
    /// The key file could not be read.
    pub const ERROR: KeyType = KeyType(0xff);
    /// Offset of the key type byte within a key file.
    pub const FILE_OFFSET: u64 = 29;

    const DUPLICATES: u8 = 1 << 4;
    const UPPERCASE: u8 = 1 << 5;
    const PADDED: u8 = 1 << 6;
    const LOCKED: u8 = 1 << 7;

    pub fn is_error(self) -> bool {
        self == Self::ERROR
    }

    pub fn is_index(self) -> bool {
        !self.is_error() && self.0 & 0x0f == 1
    }

    pub fn allows_duplicates(self) -> bool {
        !self.is_error() && self.0 & Self::DUPLICATES != 0
    }

    pub fn uppercase(self) -> bool {
        !self.is_error() && self.0 & Self::UPPERCASE != 0
    }

    pub fn padded(self) -> bool {
        !self.is_error() && self.0 & Self::PADDED != 0
    }

    pub fn locked(self) -> bool {
        !self.is_error() && self.0 & Self::LOCKED != 0
    }
}

impl Serialize for KeyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

/// Key component (6 bytes, packed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyPart {
    pub field_type: FieldType,
    /// 1-based index into the field descriptor table.
    pub field_number: u16,
    pub element_offset: u16,
    pub element_length: u8,
    /// Grouped fields covered by a `Group` part, synthesized from the field table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subparts: Vec<KeyPart>,
}

impl KeyPart {
    pub const SIZE: usize = 6;

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            field_type: FieldType::from(reader.read_u8()?),
            field_number: reader.read_u16::<LittleEndian>()?,
            element_offset: reader.read_u16::<LittleEndian>()?,
            element_length: reader.read_u8()?,
            subparts: Vec::new(),
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.field_type.code())?;
        writer.write_u16::<LittleEndian>(self.field_number)?;
        writer.write_u16::<LittleEndian>(self.element_offset)?;
        writer.write_u8(self.element_length)
    }

    /// The parts this component expands to: its sub-parts for a group, itself otherwise.
    pub fn columns(&self) -> &[KeyPart] {
        if self.field_type == FieldType::Group {
            &self.subparts
        } else {
            std::slice::from_ref(self)
        }
    }
}

/// Key descriptor (19 bytes, packed, followed by its parts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyDescriptor {
    pub component_count: u8,
    #[serde(serialize_with = "serialize_fixed_text")]
    pub name: [u8; 16],
    pub comparison_type: u8,
    pub comparison_length: u8,
    pub key_type: KeyType,
    pub parts: Vec<KeyPart>,
}

impl KeyDescriptor {
    pub const SIZE: usize = 19;

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.component_count)?;
        writer.write_all(&self.name)?;
        writer.write_u8(self.comparison_type)?;
        writer.write_u8(self.comparison_length)?;
        for part in &self.parts {
            part.write_to(writer)?;
        }
        Ok(())
    }

    pub fn name(&self) -> String {
        fixed_text(&self.name)
    }
}

/// Picture descriptor: a length-prefixed format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureDescriptor {
    pub picture: Vec<u8>,
}

impl PictureDescriptor {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.picture).into_owned()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.picture.len() as u16)?;
        writer.write_all(&self.picture)
    }
}

impl Serialize for PictureDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text())
    }
}

/// One dimension of an array descriptor (4 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArrayPart {
    pub max_dimension: u16,
    pub element_length: u16,
}

/// Array descriptor (6 bytes, followed by `total_dimensions` parts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayDescriptor {
    pub dimensions: u16,
    pub total_dimensions: u16,
    pub element_size: u16,
    pub parts: Vec<ArrayPart>,
}

impl ArrayDescriptor {
    pub const HEADER_SIZE: usize = 6;
    pub const PART_SIZE: usize = 4;

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let dimensions = reader.read_u16::<LittleEndian>()?;
        let total_dimensions = reader.read_u16::<LittleEndian>()?;
        let element_size = reader.read_u16::<LittleEndian>()?;

        let mut parts = Vec::with_capacity(total_dimensions as usize);
        for _ in 0..total_dimensions {
            parts.push(ArrayPart {
                max_dimension: reader.read_u16::<LittleEndian>()?,
                element_length: reader.read_u16::<LittleEndian>()?,
            });
        }

        Ok(Self {
            dimensions,
            total_dimensions,
            element_size,
            parts,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.dimensions)?;
        writer.write_u16::<LittleEndian>(self.total_dimensions)?;
        writer.write_u16::<LittleEndian>(self.element_size)?;
        for part in &self.parts {
            writer.write_u16::<LittleEndian>(part.max_dimension)?;
            writer.write_u16::<LittleEndian>(part.element_length)?;
        }
        Ok(())
    }
}

/// Read the field descriptor table.
pub fn read_field_descriptors<R: Read>(
    reader: &mut R,
    header: &FileHeader,
) -> Result<Vec<FieldDescriptor>> {
    let mut fields = Vec::with_capacity(header.field_count as usize);
    for _ in 0..header.field_count {
        fields.push(FieldDescriptor::read(reader)?);
    }
    debug!("read {} field descriptors", fields.len());
    Ok(fields)
}

/// Read the key descriptor table.
///
/// The key type of every key comes from its companion key file; a missing or
/// unreadable file yields [`KeyType::ERROR`] and a warning instead of failing.
pub fn read_key_descriptors<R: Read>(
    reader: &mut R,
    header: &FileHeader,
    fields: &[FieldDescriptor],
    resolver: &dyn IndexResolver,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<KeyDescriptor>> {
    let mut keys = Vec::with_capacity(header.key_count as usize);

    for index in 0..header.key_count as usize {
        let component_count = reader.read_u8()?;
        let name = read_array(reader)?;
        let comparison_type = reader.read_u8()?;
        let comparison_length = reader.read_u8()?;

        let ordinal = index + 1;
        let key_type = match resolver.key_type(ordinal) {
            Ok(byte) => KeyType(byte),
            Err(e) => {
                let warning = Warning::CompanionFile {
                    path: resolver.describe(ordinal),
                    reason: e.to_string(),
                };
                warn!("{}", warning);
                warnings.push(warning);
                KeyType::ERROR
            }
        };

        let mut parts = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            let mut part = KeyPart::read(reader)?;
            if part.field_type == FieldType::Group {
                part.subparts = group_subparts(fields, part.field_number)?;
            }
            parts.push(part);
        }

        keys.push(KeyDescriptor {
            component_count,
            name,
            comparison_type,
            comparison_length,
            key_type,
            parts,
        });
    }

    debug!("read {} key descriptors", keys.len());
    Ok(keys)
}

/// Expand a group field into one key part per grouped field.
fn group_subparts(fields: &[FieldDescriptor], group_number: u16) -> Result<Vec<KeyPart>> {
    let lookup = |number: u16| {
        number
            .checked_sub(1)
            .and_then(|i| fields.get(i as usize))
            .ok_or(ClarionError::FieldOutOfRange {
                field: number,
                count: fields.len(),
            })
    };

    let group = lookup(group_number)?;
    (0..group.length)
        .map(|k| -> Result<KeyPart> {
            let number = group_number.wrapping_add(1).wrapping_add(k);
            let field = lookup(number)?;
            Ok(KeyPart {
                field_type: field.field_type,
                field_number: number,
                element_offset: field.offset,
                element_length: field.length as u8,
                subparts: Vec::new(),
            })
        })
        .collect()
}

/// Read the picture descriptor table.
pub fn read_picture_descriptors<R: Read>(
    reader: &mut R,
    header: &FileHeader,
) -> Result<Vec<PictureDescriptor>> {
    let mut pictures = Vec::with_capacity(header.picture_count as usize);
    for _ in 0..header.picture_count {
        let len = reader.read_u16::<LittleEndian>()?;
        pictures.push(PictureDescriptor {
            picture: read_vec(reader, len as usize)?,
        });
    }
    debug!("read {} picture descriptors", pictures.len());
    Ok(pictures)
}

/// Where an array descriptor chain stands after reading one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayBoundary {
    /// Another descriptor for the same field follows.
    Continue,
    /// The chain for this field is complete.
    EndOfChain,
    /// The cursor reached the record area; no array descriptors remain.
    EndOfSection,
}

/// Decide whether an array descriptor chain continues.
///
/// The format stores no count or terminator: the section ends at the data
/// offset, and a field's chain ends when the next descriptor's dimension and
/// total-dimension counts are equal. `lookahead` is that pair, or `None` at EOF.
pub fn array_boundary(position: u64, data_offset: u32, lookahead: Option<(u16, u16)>) -> ArrayBoundary {
    if position == u64::from(data_offset) {
        return ArrayBoundary::EndOfSection;
    }
    match lookahead {
        Some((dimensions, total)) if dimensions != total => ArrayBoundary::Continue,
        _ => ArrayBoundary::EndOfChain,
    }
}

/// Peek the next descriptor's dimension pair without consuming it.
fn peek_dimensions<R: Read + Seek>(reader: &mut R) -> Result<Option<(u16, u16)>> {
    let start = reader.stream_position()?;
    let mut buf = [0u8; 4];
    let pair = match reader.read_exact(&mut buf) {
        Ok(()) => Some((
            u16::from_le_bytes([buf[0], buf[1]]),
            u16::from_le_bytes([buf[2], buf[3]]),
        )),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(e) => return Err(e.into()),
    };
    reader.seek(SeekFrom::Start(start))?;
    Ok(pair)
}

/// Read array descriptors for every field with a non-zero array index.
pub fn read_array_descriptors<R: Read + Seek>(
    reader: &mut R,
    header: &FileHeader,
    fields: &mut [FieldDescriptor],
) -> Result<()> {
    for field in fields.iter_mut().filter(|f| f.array_index != 0) {
        loop {
            field.arrays.push(ArrayDescriptor::read(reader)?);

            let position = reader.stream_position()?;
            let lookahead = if position == u64::from(header.data_offset) {
                None
            } else {
                peek_dimensions(reader)?
            };

            match array_boundary(position, header.data_offset, lookahead) {
                ArrayBoundary::Continue => continue,
                ArrayBoundary::EndOfChain => break,
                ArrayBoundary::EndOfSection => {
                    debug!("array descriptors end at data offset 0x{:x}", position);
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::resolver::MemoryResolver;
    use std::io::Cursor;

    fn field(field_type: FieldType, name: &str, offset: u16, length: u16) -> FieldDescriptor {
        let mut padded = [b' '; 16];
        padded[..name.len()].copy_from_slice(name.as_bytes());
        FieldDescriptor {
            field_type,
            name: padded,
            offset,
            length,
            digits: 0,
            places: 0,
            array_index: 0,
            picture_index: 0,
            arrays: Vec::new(),
        }
    }

    fn header_with(fields: u16, keys: u8, pictures: u16, data_offset: u32) -> FileHeader {
        FileHeader {
            signature: FileHeader::SIGNATURE,
            attributes: crate::parser::FileAttributes::empty(),
            key_count: keys,
            record_count: 0,
            deleted_count: 0,
            field_count: fields,
            picture_count: pictures,
            array_count: 0,
            record_length: 5,
            data_offset,
            logical_eof: 0,
            logical_bof: 0,
            free_record: 0,
            record_name: [b' '; 12],
            memo_name: [b' '; 12],
            file_prefix: *b"CUS",
            record_prefix: *b"REC",
            memo_length: 0,
            memo_width: 0,
            reserved: 0,
            change_time: 0,
            change_date: 0,
            reserved2: 0,
        }
    }

    #[test]
    fn test_field_descriptor_layout() {
        let mut f = field(FieldType::Decimal, "CUS:BALANCE", 5, 4);
        f.digits = 7;
        f.places = 2;
        f.picture_index = 1;
        let mut bytes = Vec::new();
        f.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), FieldDescriptor::SIZE);

        let header = header_with(1, 0, 0, 0);
        let fields = read_field_descriptors(&mut Cursor::new(&bytes), &header).unwrap();
        assert_eq!(fields, vec![f]);
        assert_eq!(fields[0].column_name(), "BALANCE");
    }

    #[test]
    fn test_zero_counts_read_nothing() {
        let header = header_with(0, 0, 0, 0);
        let mut empty = Cursor::new(Vec::new());
        assert!(read_field_descriptors(&mut empty, &header).unwrap().is_empty());
        assert!(read_picture_descriptors(&mut empty, &header).unwrap().is_empty());
        let resolver = MemoryResolver::default();
        let keys = read_key_descriptors(&mut empty, &header, &[], &resolver, &mut Vec::new()).unwrap();
        assert!(keys.is_empty());
    }

    #[test]
    fn test_group_key_part_expands_to_subparts() {
        let fields = vec![
            field(FieldType::Long, "CUS:ID", 5, 4),
            field(FieldType::Group, "CUS:FULLNAME", 9, 2),
            field(FieldType::String, "CUS:FIRST", 9, 10),
            field(FieldType::String, "CUS:LAST", 19, 12),
        ];
        let key = KeyDescriptor {
            component_count: 1,
            name: *b"CUS:NAMEKEY     ",
            comparison_type: 0,
            comparison_length: 22,
            key_type: KeyType(0x10),
            parts: vec![KeyPart {
                field_type: FieldType::Group,
                field_number: 2,
                element_offset: 9,
                element_length: 22,
                subparts: Vec::new(),
            }],
        };
        let mut bytes = Vec::new();
        key.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), KeyDescriptor::SIZE + KeyPart::SIZE);

        let header = header_with(4, 1, 0, 0);
        let resolver = MemoryResolver::default().with_key_type(1, 0x10);
        let mut warnings = Vec::new();
        let keys =
            read_key_descriptors(&mut Cursor::new(&bytes), &header, &fields, &resolver, &mut warnings)
                .unwrap();

        assert!(warnings.is_empty());
        let part = &keys[0].parts[0];
        assert_eq!(part.subparts.len(), 2);
        assert_eq!(part.subparts[0].field_number, 3);
        assert_eq!(part.subparts[0].element_offset, 9);
        assert_eq!(part.subparts[1].field_number, 4);
        assert_eq!(part.subparts[1].element_length, 12);
        assert_eq!(part.subparts[1].field_type, FieldType::String);
        assert!(keys[0].key_type.allows_duplicates());
        assert_eq!(part.columns().len(), 2);
    }

    #[test]
    fn test_missing_key_file_is_a_warning() {
        let key = KeyDescriptor {
            component_count: 0,
            name: *b"CUS:IDKEY       ",
            comparison_type: 0,
            comparison_length: 4,
            key_type: KeyType::ERROR,
            parts: Vec::new(),
        };
        let mut bytes = Vec::new();
        key.write_to(&mut bytes).unwrap();

        let header = header_with(0, 1, 0, 0);
        let mut warnings = Vec::new();
        let keys = read_key_descriptors(
            &mut Cursor::new(&bytes),
            &header,
            &[],
            &MemoryResolver::default(),
            &mut warnings,
        )
        .unwrap();

        assert_eq!(keys[0].key_type, KeyType::ERROR);
        assert!(!keys[0].key_type.is_index());
        assert!(matches!(warnings[0], Warning::CompanionFile { .. }));
    }

    #[test]
    fn test_group_part_out_of_range() {
        let fields = vec![field(FieldType::Group, "CUS:G", 5, 3)];
        assert!(matches!(
            group_subparts(&fields, 1),
            Err(ClarionError::FieldOutOfRange { field: 2, count: 1 })
        ));
        assert!(matches!(
            group_subparts(&fields, 0),
            Err(ClarionError::FieldOutOfRange { field: 0, .. })
        ));
    }

    #[test]
    fn test_pictures_are_length_prefixed() {
        let mut bytes = Vec::new();
        for text in [&b"@n9.2"[..], &b"@s20"[..]] {
            PictureDescriptor { picture: text.to_vec() }.write_to(&mut bytes).unwrap();
        }
        let header = header_with(0, 0, 2, 0);
        let pictures = read_picture_descriptors(&mut Cursor::new(&bytes), &header).unwrap();
        assert_eq!(pictures[0].text(), "@n9.2");
        assert_eq!(pictures[1].text(), "@s20");
    }

    #[test]
    fn test_array_boundary_predicate() {
        assert_eq!(array_boundary(100, 100, Some((1, 2))), ArrayBoundary::EndOfSection);
        assert_eq!(array_boundary(90, 100, Some((1, 2))), ArrayBoundary::Continue);
        assert_eq!(array_boundary(90, 100, Some((2, 2))), ArrayBoundary::EndOfChain);
        assert_eq!(array_boundary(90, 100, None), ArrayBoundary::EndOfChain);
    }

    fn array(dimensions: u16, total: u16) -> ArrayDescriptor {
        ArrayDescriptor {
            dimensions,
            total_dimensions: total,
            element_size: 4,
            parts: (0..total)
                .map(|i| ArrayPart {
                    max_dimension: 10 + i,
                    element_length: 4,
                })
                .collect(),
        }
    }

    #[test]
    fn test_array_chain_stops_before_equal_pair() {
        // Two chained descriptors, then one whose pair is equal and belongs
        // to the next array field.
        let chain = [array(2, 3), array(1, 2), array(1, 1)];
        let mut bytes = Vec::new();
        for desc in &chain {
            desc.write_to(&mut bytes).unwrap();
        }
        let first_two = (6 + 12) + (6 + 8);
        let mut fields = vec![field(FieldType::Long, "CUS:A", 5, 4)];
        fields[0].array_index = 1;

        let header = header_with(1, 0, 0, 0x1000);
        let mut cursor = Cursor::new(&bytes);
        read_array_descriptors(&mut cursor, &header, &mut fields).unwrap();

        assert_eq!(fields[0].arrays, vec![chain[0].clone(), chain[1].clone()]);
        assert_eq!(cursor.position(), first_two as u64);
    }

    #[test]
    fn test_array_section_ends_at_data_offset() {
        let mut bytes = Vec::new();
        array(2, 3).write_to(&mut bytes).unwrap();
        let end = bytes.len() as u32;
        let mut fields = vec![
            field(FieldType::Long, "CUS:A", 5, 4),
            field(FieldType::Long, "CUS:B", 9, 4),
        ];
        fields[0].array_index = 1;
        fields[1].array_index = 2;

        let header = header_with(2, 0, 0, end);
        read_array_descriptors(&mut Cursor::new(&bytes), &header, &mut fields).unwrap();

        assert_eq!(fields[0].arrays.len(), 1);
        assert!(fields[1].arrays.is_empty());
    }
}
