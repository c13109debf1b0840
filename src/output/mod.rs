//! Output format writers.

pub mod csv;
pub mod json;
pub mod sql;
pub mod text;

use crate::database::ClarionFile;
use crate::options::{DumpOptions, OutputFormat};
use crate::parser::Result;
use std::io::{Read, Seek, Write};

/// `" [A] [B]"` for every set bit, or `" NONE"`.
pub(crate) fn flag_names(bits: u8, names: &[&str; 8]) -> String {
    if bits == 0 {
        return " NONE".to_string();
    }
    (0..8)
        .filter(|i| bits >> i & 1 == 1)
        .map(|i| format!(" [{}]", names[i]))
        .collect()
}

/// Dump `file` as requested by `options`.
///
/// Records and CSV/SQL schema go to `out`. Text-format metadata and record
/// status lines go to `diag`.
pub fn dump<R, W, D>(file: &mut ClarionFile<R>, out: &mut W, diag: &mut D, options: &DumpOptions) -> Result<()>
where
    R: Read + Seek,
    W: Write,
    D: Write,
{
    if options.format == OutputFormat::Json {
        json::write_json(file, &mut *out, options)?;
        writeln!(out)?;
        out.flush()?;
        return Ok(());
    }

    if options.meta {
        text::write_header(diag, file.header())?;
        if let Some(memo_header) = file.memo_header() {
            text::write_memo_header(diag, memo_header)?;
        }
    }

    let table = sql::table_name(file.path());
    let with_memo = file.has_memo();

    if options.schema {
        match options.format {
            OutputFormat::Csv => csv::write_schema(out, file.metadata(), options.field_separator, with_memo)?,
            OutputFormat::Sql => sql::write_schema(out, file.metadata(), &table, options.quote, with_memo)?,
            _ => text::write_schema(diag, file.metadata())?,
        }
    }

    if options.dumps_records() {
        match options.format {
            OutputFormat::Csv => csv::write_records(file, out, options.field_separator, options.active_only)?,
            OutputFormat::Sql => sql::write_records(file, out, &table, options.quote, options.active_only)?,
            _ => text::write_records(file, out, diag, options.active_only)?,
        }
    }

    out.flush()?;
    diag.flush()?;
    Ok(())
}
