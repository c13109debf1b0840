//! Human-readable dump of headers, descriptors and records.

use super::flag_names;
use crate::database::{ClarionFile, MemoHeader, Metadata, Record, RecordStatus};
use crate::parser::{
    ArrayDescriptor, FieldDescriptor, FileAttributes, FileHeader, KeyDescriptor, KeyPart, KeyType,
    PictureDescriptor, Result,
};
use chrono::Timelike;
use std::io::{Read, Seek, Write};

fn hex_bytes(data: &[u8]) -> String {
    data.iter().map(|b| format!(" 0x{:02x}", b)).collect()
}

/// Name without the four-character `PRE:` prefix.
fn short_name(name: &str) -> &str {
    name.char_indices().nth(4).map_or("", |(i, _)| &name[i..])
}

fn time_text(header: &FileHeader) -> String {
    match header.change_time() {
        Some(t) => format!(
            "{:02}:{:02}:{:02}.{:02}",
            t.hour(),
            t.minute(),
            t.second(),
            t.nanosecond() / 10_000_000
        ),
        None => "INVALID".to_string(),
    }
}

fn date_text(header: &FileHeader) -> String {
    match header.change_date() {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => "INVALID".to_string(),
    }
}

pub fn write_header<W: Write>(w: &mut W, header: &FileHeader) -> Result<()> {
    writeln!(w, "===== FILE HEADER FOLLOWS =====")?;
    writeln!(w, "filesig  : 0x{:04x}", header.signature)?;
    writeln!(w, "sfatr    : 0x{:04x}", header.attributes.bits())?;
    writeln!(
        w,
        "\tAttributes set:{}",
        flag_names(header.attributes.bits() as u8, &FileAttributes::NAMES)
    )?;
    writeln!(w, "numbkeys : 0x{:02x}", header.key_count)?;
    writeln!(w, "numrecs  : 0x{:08x}", header.record_count)?;
    writeln!(w, "numdels  : 0x{:08x}", header.deleted_count)?;
    writeln!(w, "numflds  : 0x{:04x}", header.field_count)?;
    writeln!(w, "numpics  : 0x{:04x}", header.picture_count)?;
    writeln!(w, "numarrs  : 0x{:04x}", header.array_count)?;
    writeln!(w, "reclen   : 0x{:04x}", header.record_length)?;
    writeln!(w, "offset   : 0x{:08x}", header.data_offset)?;
    writeln!(w, "logeof   : 0x{:08x}", header.logical_eof)?;
    writeln!(w, "logbof   : 0x{:08x}", header.logical_bof)?;
    writeln!(w, "freerec  : 0x{:08x}", header.free_record)?;
    writeln!(w, "recname  : [{}]{}", header.record_name(), hex_bytes(&header.record_name))?;
    writeln!(w, "memnam   : [{}]{}", header.memo_name(), hex_bytes(&header.memo_name))?;
    writeln!(w, "filpre   : [{}]{}", header.file_prefix(), hex_bytes(&header.file_prefix))?;
    writeln!(w, "recpre   : [{}]{}", header.record_prefix(), hex_bytes(&header.record_prefix))?;
    writeln!(w, "memolen  : 0x{:04x}", header.memo_length)?;
    writeln!(w, "memowid  : 0x{:04x}", header.memo_width)?;
    writeln!(w, "reserved : 0x{:08x}", header.reserved)?;
    writeln!(w, "chgtime  : 0x{:08x} [{}]", header.change_time, time_text(header))?;
    writeln!(w, "chgdate  : 0x{:08x} [{}]", header.change_date, date_text(header))?;
    writeln!(w, "reserved2: 0x{:04x}", header.reserved2)?;
    writeln!(w, "===== END OF FILE HEADER =====")?;
    writeln!(w)?;
    Ok(())
}

pub fn write_memo_header<W: Write>(w: &mut W, header: &MemoHeader) -> Result<()> {
    writeln!(w, "===== MEMO FILE HEADER =====")?;
    writeln!(w)?;
    writeln!(w, "memsig   : 0x{:04x}", header.signature)?;
    writeln!(w, "firstdel : 0x{:08x}", header.first_deleted)?;
    writeln!(w, "===== END OF MEMO FILE HEADER =====")?;
    writeln!(w)?;
    Ok(())
}

fn write_arrays<W: Write>(w: &mut W, arrays: &[ArrayDescriptor]) -> Result<()> {
    for (i, array) in arrays.iter().enumerate() {
        writeln!(w, "   === ARRAY DESCRIPTOR {} ===", i + 1)?;
        writeln!(w, "\tnumdim : 0x{:04x}", array.dimensions)?;
        writeln!(w, "\ttotdim : 0x{:04x}", array.total_dimensions)?;
        writeln!(w, "\telmsiz : 0x{:04x}", array.element_size)?;
        for (j, part) in array.parts.iter().enumerate() {
            writeln!(w, "     === ARRAY PART {} ===", j + 1)?;
            writeln!(w, "\tmaxdim : 0x{:04x}", part.max_dimension)?;
            writeln!(w, "\tlendim : 0x{:04x}", part.element_length)?;
        }
    }
    Ok(())
}

fn write_picture<W: Write>(w: &mut W, picture: &PictureDescriptor) -> Result<()> {
    writeln!(w, "  === PICTURE DESCRIPTOR ===")?;
    writeln!(w)?;
    writeln!(w, "\tpiclen : 0x{:04x}", picture.picture.len())?;
    writeln!(w, "\tpicstr : [{}]{}", picture.text(), hex_bytes(&picture.picture))?;
    Ok(())
}

fn write_field<W: Write>(w: &mut W, field: &FieldDescriptor, pictures: &[PictureDescriptor]) -> Result<()> {
    writeln!(w, "fldtype : 0x{:02x} ({})", field.field_type.code(), field.field_type.name())?;
    writeln!(w, "fldname : [{}]{}", field.name(), hex_bytes(&field.name))?;
    writeln!(w, "foffset : 0x{:04x}", field.offset)?;
    writeln!(w, "length  : 0x{:04x}", field.length)?;
    writeln!(w, "decsig  : 0x{:02x}", field.digits)?;
    writeln!(w, "decdec  : 0x{:02x}", field.places)?;
    writeln!(w, "arrnum  : 0x{:04x} ({})", field.array_index, field.arrays.len())?;
    write_arrays(w, &field.arrays)?;
    writeln!(w, "picnum  : 0x{:04x}", field.picture_index)?;

    let picture = (field.picture_index as usize)
        .checked_sub(1)
        .and_then(|i| pictures.get(i));
    if let Some(picture) = picture {
        write_picture(w, picture)?;
    }
    writeln!(w)?;
    Ok(())
}

fn key_type_text(key_type: KeyType) -> String {
    if key_type.is_error() {
        return "[ERROR]".to_string();
    }
    let mut text = String::from(if key_type.is_index() { "[INDEX]" } else { "[KEY]" });
    let flags = [
        (key_type.allows_duplicates(), " [DUPLICATES]"),
        (key_type.uppercase(), " [UPPERCASE]"),
        (key_type.padded(), " [PADDED]"),
        (key_type.locked(), " [LOCKED]"),
    ];
    for (set, name) in flags {
        if set {
            text.push_str(name);
        }
    }
    text
}

fn field_name(fields: &[FieldDescriptor], number: u16) -> String {
    (number as usize)
        .checked_sub(1)
        .and_then(|i| fields.get(i))
        .map_or_else(String::new, FieldDescriptor::name)
}

fn write_key_part<W: Write>(w: &mut W, part: &KeyPart, fields: &[FieldDescriptor], indent: &str) -> Result<()> {
    writeln!(w, "{}fldtype : 0x{:02x} ({})", indent, part.field_type.code(), part.field_type.name())?;
    writeln!(
        w,
        "{}fldnum  : 0x{:04x} ([{}])",
        indent,
        part.field_number,
        field_name(fields, part.field_number)
    )?;
    writeln!(w, "{}elmoff  : 0x{:04x}", indent, part.element_offset)?;
    writeln!(w, "{}elmlen  : 0x{:02x}", indent, part.element_length)?;
    Ok(())
}

fn write_key<W: Write>(w: &mut W, key: &KeyDescriptor, fields: &[FieldDescriptor]) -> Result<()> {
    writeln!(w, "numcomps : 0x{:02x}", key.component_count)?;
    writeln!(w, "keyname  : [{}]{}", key.name(), hex_bytes(&key.name))?;
    writeln!(w, "comptype : 0x{:02x}", key.comparison_type)?;
    writeln!(w, "complen  : 0x{:02x}", key.comparison_length)?;
    writeln!(w, "keytyp   : 0x{:02x} ({})", key.key_type.0, key_type_text(key.key_type))?;

    for (j, part) in key.parts.iter().enumerate() {
        writeln!(w, "   === KEYPART {} ===", j + 1)?;
        write_key_part(w, part, fields, "\t")?;
        for (k, subpart) in part.subparts.iter().enumerate() {
            writeln!(w, "      === SUBPART {} ===", k + 1)?;
            write_key_part(w, subpart, fields, "\t\t")?;
        }
    }
    writeln!(w)?;
    Ok(())
}

/// Field descriptors, with their arrays and pictures, then key descriptors.
pub fn write_schema<W: Write>(w: &mut W, metadata: &Metadata) -> Result<()> {
    writeln!(w, "===== FIELD DESCRIPTORS FOLLOW =====")?;
    writeln!(w)?;
    for field in &metadata.fields {
        write_field(w, field, &metadata.pictures)?;
    }
    writeln!(w, "===== END OF FIELD DESCRIPTORS =====")?;
    writeln!(w)?;

    writeln!(w, "===== KEY DESCRIPTORS FOLLOW =====")?;
    writeln!(w)?;
    for key in &metadata.keys {
        write_key(w, key, &metadata.fields)?;
    }
    writeln!(w, "===== END OF KEY DESCRIPTORS =====")?;
    writeln!(w)?;
    Ok(())
}

/// Record status goes to `diag`, the values to `out`.
pub fn write_record<W: Write, D: Write>(
    out: &mut W,
    diag: &mut D,
    labels: &[String],
    record: &Record,
    with_memo: bool,
) -> Result<()> {
    let status = record.header.status.bits();
    writeln!(diag, "=== RECORD {}:", record.number)?;
    writeln!(diag, "rhd  : 0x{:02x}", status)?;
    writeln!(diag, "\tAttributes set:{}", flag_names(status, &RecordStatus::NAMES))?;
    writeln!(diag, "rptr : 0x{:08x}", record.header.pointer)?;
    writeln!(diag)?;

    writeln!(out, "=== RECORD {}:", record.number)?;
    for (label, value) in labels.iter().zip(&record.values) {
        match value {
            Some(value) => writeln!(out, "{:>8} : {}", label, value)?,
            None => writeln!(out, "{:>8} : ", label)?,
        }
    }
    if with_memo {
        let text = record.memo.as_ref().map_or("", |m| m.text.as_str());
        writeln!(out, "MEMO ENTRY   : {}", text)?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn write_records<R, W, D>(file: &mut ClarionFile<R>, out: &mut W, diag: &mut D, active_only: bool) -> Result<()>
where
    R: Read + Seek,
    W: Write,
    D: Write,
{
    let labels: Vec<String> = file
        .metadata()
        .data_fields()
        .map(|f| short_name(&f.name()).to_string())
        .collect();
    let with_memo = file.has_memo();

    for record in file.records(active_only)? {
        write_record(out, diag, &labels, &record?, with_memo)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{RecordHeader, Value};

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("CUS:NAME"), "NAME");
        assert_eq!(short_name("AB"), "");
    }

    #[test]
    fn test_key_type_text() {
        assert_eq!(key_type_text(KeyType::ERROR), "[ERROR]");
        assert_eq!(key_type_text(KeyType(0x01)), "[INDEX]");
        assert_eq!(key_type_text(KeyType(0x30)), "[KEY] [DUPLICATES] [UPPERCASE]");
    }

    #[test]
    fn test_record_layout() {
        let record = Record {
            number: 3,
            header: RecordHeader {
                status: RecordStatus::NEW | RecordStatus::DELETED,
                pointer: 0,
            },
            values: vec![Some(Value::Long(7)), None],
            memo: None,
        };
        let labels = vec!["ID".to_string(), "NAME".to_string()];
        let mut out = Vec::new();
        let mut diag = Vec::new();
        write_record(&mut out, &mut diag, &labels, &record, true).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out,
            "=== RECORD 3:\n      ID : 7\n    NAME : \nMEMO ENTRY   : \n\n"
        );
        let diag = String::from_utf8(diag).unwrap();
        assert!(diag.contains("rhd  : 0x11"));
        assert!(diag.contains("[NEW RECORD] [DELETED RECORD]"));
    }
}
