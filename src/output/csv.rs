//! CSV output format.
//!
//! Values are written unquoted, separated by a single configurable character.

use crate::database::{ClarionFile, Metadata, Record};
use crate::parser::Result;
use std::io::{Read, Seek, Write};

/// Write the column line: field names without their prefix, then `MEMO`.
pub fn write_schema<W: Write>(w: &mut W, metadata: &Metadata, separator: char, with_memo: bool) -> Result<()> {
    let mut columns: Vec<String> = metadata.data_fields().map(|f| f.column_name()).collect();
    if with_memo {
        columns.push("MEMO".to_string());
    }
    writeln!(w, "{}", columns.join(&separator.to_string()))?;
    Ok(())
}

/// Write one record; a field without a value is an empty column.
pub fn write_record<W: Write>(w: &mut W, record: &Record, separator: char, with_memo: bool) -> Result<()> {
    let mut columns: Vec<String> = record
        .values
        .iter()
        .map(|v| v.as_ref().map(ToString::to_string).unwrap_or_default())
        .collect();
    if with_memo {
        columns.push(record.memo.as_ref().map(|m| m.text.clone()).unwrap_or_default());
    }
    writeln!(w, "{}", columns.join(&separator.to_string()))?;
    Ok(())
}

pub fn write_records<R, W>(file: &mut ClarionFile<R>, w: &mut W, separator: char, active_only: bool) -> Result<()>
where
    R: Read + Seek,
    W: Write,
{
    let with_memo = file.has_memo();
    for record in file.records(active_only)? {
        write_record(w, &record?, separator, with_memo)?;
    }
    Ok(())
}
