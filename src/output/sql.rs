//! SQL output: `CREATE TABLE`, `CREATE INDEX` and `INSERT` statements.

use super::flag_names;
use crate::database::{ClarionFile, Metadata, Record, RecordStatus, Value};
use crate::options::SqlQuote;
use crate::parser::codec::strip_prefix;
use crate::parser::{FieldDescriptor, FieldType, KeyDescriptor, Result};
use log::warn;
use std::io::{Read, Seek, Write};
use std::path::Path;

/// Table name for a data file: its lowercased file stem.
pub fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "table".to_string())
}

fn column_name(field: &FieldDescriptor) -> String {
    field.column_name().to_lowercase()
}

/// Column type for a field, `None` for groups.
pub fn column_type(field: &FieldDescriptor) -> Option<String> {
    let sql = match field.field_type {
        FieldType::Long => "BIGINT".to_string(),
        FieldType::Real => "FLOAT".to_string(),
        FieldType::String | FieldType::PictureString => format!("VARCHAR({})", field.length),
        FieldType::Byte | FieldType::Short => "SMALLINT".to_string(),
        FieldType::Decimal => format!(
            "NUMERIC({},{})",
            u16::from(field.digits) + 2 + u16::from(field.places),
            field.places
        ),
        FieldType::Group => return None,
        FieldType::Unknown(code) => {
            warn!("unknown type {} for field {}, declaring it TEXT", code, field.name());
            "TEXT".to_string()
        }
    };
    Some(sql)
}

/// Quote a string literal, doubling quotes and backslashes.
pub fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Quote memo text; newlines become `\n` and carriage returns are dropped.
pub fn memo_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '\'' => out.push_str("''"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

pub fn value_literal(value: Option<&Value>) -> String {
    match value {
        None => "NULL".to_string(),
        Some(Value::Text(text)) => string_literal(text),
        Some(value) => value.to_string(),
    }
}

/// Write `CREATE TABLE` followed by one `CREATE INDEX` per key.
pub fn write_schema<W: Write>(
    w: &mut W,
    metadata: &Metadata,
    table: &str,
    quote: SqlQuote,
    with_memo: bool,
) -> Result<()> {
    // (is a column, text)
    let mut lines: Vec<(bool, String)> = Vec::new();
    for field in &metadata.fields {
        match column_type(field) {
            Some(sql) => lines.push((true, format!("   {} {}", quote.quote(&column_name(field)), sql))),
            None => lines.push((
                false,
                format!(
                    "-- Next {} columns were part of group named '{}'",
                    field.length,
                    column_name(field)
                ),
            )),
        }
    }
    if with_memo {
        lines.push((true, format!("   {} TEXT", quote.quote("memo"))));
    }

    let last_column = lines.iter().rposition(|(column, _)| *column);
    write!(w, "CREATE TABLE {} (", quote.quote(table))?;
    for (i, (column, text)) in lines.iter().enumerate() {
        let comma = if *column && Some(i) != last_column { "," } else { "" };
        write!(w, "\n{}{}", text, comma)?;
    }
    writeln!(w, "\n);")?;

    writeln!(w)?;
    for key in &metadata.keys {
        write_index(w, key, &metadata.fields, table, quote)?;
    }
    writeln!(w)?;
    Ok(())
}

fn write_index<W: Write>(
    w: &mut W,
    key: &KeyDescriptor,
    fields: &[FieldDescriptor],
    table: &str,
    quote: SqlQuote,
) -> Result<()> {
    let key_name = strip_prefix(&key.name()).to_lowercase();

    let columns: Vec<String> = key
        .parts
        .iter()
        .flat_map(|part| part.columns())
        .filter_map(|part| {
            (part.field_number as usize)
                .checked_sub(1)
                .and_then(|i| fields.get(i))
        })
        .map(|field| quote.quote(&column_name(field)))
        .collect();

    // An unreadable key type says nothing about uniqueness.
    let unique = !key.key_type.is_error() && !key.key_type.allows_duplicates();
    writeln!(
        w,
        "CREATE {}INDEX {} ON {} ({});",
        if unique { "UNIQUE " } else { "" },
        quote.quote(&format!("{}_{}", table, key_name)),
        quote.quote(table),
        columns.join(", ")
    )?;
    Ok(())
}

/// Write one `INSERT`; deleted records are preceded by their status bits.
pub fn write_insert<W: Write>(
    w: &mut W,
    record: &Record,
    table: &str,
    quote: SqlQuote,
    with_memo: bool,
) -> Result<()> {
    if record.header.is_deleted() {
        writeln!(
            w,
            "-- Record attributes:{}",
            flag_names(record.header.status.bits(), &RecordStatus::NAMES)
        )?;
    }

    let mut values: Vec<String> = record.values.iter().map(|v| value_literal(v.as_ref())).collect();
    if with_memo {
        values.push(
            record
                .memo
                .as_ref()
                .map_or_else(|| "NULL".to_string(), |m| memo_literal(&m.text)),
        );
    }
    writeln!(w, "INSERT INTO {} VALUES({});", quote.quote(table), values.join(", "))?;
    Ok(())
}

pub fn write_records<R, W>(
    file: &mut ClarionFile<R>,
    w: &mut W,
    table: &str,
    quote: SqlQuote,
    active_only: bool,
) -> Result<()>
where
    R: Read + Seek,
    W: Write,
{
    let with_memo = file.has_memo();
    for record in file.records(active_only)? {
        write_insert(w, &record?, table, quote, with_memo)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::RecordHeader;

    fn field(field_type: FieldType, name: &str, length: u16) -> FieldDescriptor {
        let mut padded = [b' '; 16];
        padded[..name.len()].copy_from_slice(name.as_bytes());
        FieldDescriptor {
            field_type,
            name: padded,
            offset: 0,
            length,
            digits: 5,
            places: 2,
            array_index: 0,
            picture_index: 0,
            arrays: Vec::new(),
        }
    }

    #[test]
    fn test_table_name() {
        assert_eq!(table_name(Path::new("/data/CUSTOMER.DAT")), "customer");
    }

    #[test]
    fn test_column_types() {
        assert_eq!(column_type(&field(FieldType::Long, "A:ID", 4)).unwrap(), "BIGINT");
        assert_eq!(column_type(&field(FieldType::String, "A:N", 30)).unwrap(), "VARCHAR(30)");
        assert_eq!(column_type(&field(FieldType::Decimal, "A:P", 3)).unwrap(), "NUMERIC(9,2)");
        assert_eq!(column_type(&field(FieldType::Group, "A:G", 2)), None);
    }

    #[test]
    fn test_literals() {
        assert_eq!(string_literal("O'Brien \\ co"), "'O''Brien \\\\ co'");
        assert_eq!(memo_literal("a\r\nb's"), "'a\\nb''s'");
        assert_eq!(value_literal(None), "NULL");
        assert_eq!(value_literal(Some(&Value::Short(9))), "9");
    }

    #[test]
    fn test_schema_commas_with_trailing_group() {
        let metadata = Metadata {
            header: crate::parser::FileHeader {
                signature: crate::parser::FileHeader::SIGNATURE,
                attributes: crate::parser::FileAttributes::empty(),
                key_count: 0,
                record_count: 0,
                deleted_count: 0,
                field_count: 2,
                picture_count: 0,
                array_count: 0,
                record_length: 9,
                data_offset: 0,
                logical_eof: 0,
                logical_bof: 0,
                free_record: 0,
                record_name: [b' '; 12],
                memo_name: [b' '; 12],
                file_prefix: *b"CUS",
                record_prefix: [b' '; 3],
                memo_length: 0,
                memo_width: 0,
                reserved: 0,
                change_time: 0,
                change_date: 0,
                reserved2: 0,
            },
            fields: vec![field(FieldType::Long, "CUS:ID", 4), field(FieldType::Group, "CUS:EMPTY", 0)],
            keys: Vec::new(),
            pictures: Vec::new(),
        };
        let mut out = Vec::new();
        write_schema(&mut out, &metadata, "customer", SqlQuote::Mysql, false).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with(
            "CREATE TABLE `customer` (\n   `id` BIGINT\n-- Next 0 columns were part of group named 'empty'\n);\n"
        ));
    }

    #[test]
    fn test_insert_for_deleted_record() {
        let record = Record {
            number: 1,
            header: RecordHeader {
                status: RecordStatus::DELETED,
                pointer: 0,
            },
            values: vec![Some(Value::Long(1)), Some(Value::Text("it's".into())), None],
            memo: None,
        };
        let mut out = Vec::new();
        write_insert(&mut out, &record, "customer", SqlQuote::Ansi, true).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "-- Record attributes: [DELETED RECORD]\nINSERT INTO \"customer\" VALUES(1, 'it''s', NULL, NULL);\n"
        );
    }
}
