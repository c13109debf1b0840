//! JSON output format.

use crate::database::{ClarionFile, MemoHeader, Metadata, Record};
use crate::options::DumpOptions;
use crate::parser::Result;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::io::{Read, Seek, Write};

/// One record with its values keyed by column name.
#[derive(Debug, Serialize)]
pub struct JsonRecord {
    pub number: u32,
    pub status: u8,
    pub deleted: bool,
    pub pointer: u32,
    pub values: Map<String, JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl JsonRecord {
    pub fn new(columns: &[String], record: Record) -> Result<Self> {
        let mut values = Map::new();
        for (column, value) in columns.iter().zip(&record.values) {
            values.insert(column.clone(), serde_json::to_value(value)?);
        }
        Ok(Self {
            number: record.number,
            status: record.header.status.bits(),
            deleted: record.header.is_deleted(),
            pointer: record.header.pointer,
            values,
            memo: record.memo.map(|m| m.text),
        })
    }
}

/// Full JSON document.
#[derive(Serialize)]
pub struct JsonOutput<'a> {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo_header: Option<&'a MemoHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<JsonRecord>>,
    pub warnings: Vec<String>,
}

/// Write metadata and records as a single JSON document.
pub fn write_json<R, W>(file: &mut ClarionFile<R>, writer: W, options: &DumpOptions) -> Result<()>
where
    R: Read + Seek,
    W: Write,
{
    let records = if options.dumps_records() {
        let columns: Vec<String> = file.metadata().data_fields().map(|f| f.column_name()).collect();
        let mut records = Vec::new();
        for record in file.records(options.active_only)? {
            records.push(JsonRecord::new(&columns, record?)?);
        }
        Some(records)
    } else {
        None
    };

    let output = JsonOutput {
        file: file.path().display().to_string(),
        metadata: (options.meta || options.schema).then(|| file.metadata()),
        memo_header: if options.meta { file.memo_header() } else { None },
        records,
        warnings: file.warnings().iter().map(ToString::to_string).collect(),
    };

    if options.pretty {
        serde_json::to_writer_pretty(writer, &output)?;
    } else {
        serde_json::to_writer(writer, &output)?;
    }
    Ok(())
}
