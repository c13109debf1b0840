//! Dump settings shared by the CLI and the output writers.

use crate::database::ReadOptions;
use serde::Serialize;

/// Charset assumed when transcoding is requested without naming one.
pub const DEFAULT_CHARSET: &str = "ISO8859-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Human-readable dump; metadata goes to the diagnostic stream.
    #[default]
    Text,
    Csv,
    Sql,
    Json,
}

/// Identifier quoting for SQL output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlQuote {
    #[default]
    Ansi,
    Mysql,
}

impl SqlQuote {
    pub fn quote(self, identifier: &str) -> String {
        match self {
            SqlQuote::Ansi => format!("\"{}\"", identifier),
            SqlQuote::Mysql => format!("`{}`", identifier),
        }
    }
}

/// What to dump, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DumpOptions {
    /// Skip deleted records.
    pub active_only: bool,
    /// Dump records.
    pub data: bool,
    /// Dump the file and memo headers.
    pub meta: bool,
    /// Dump field and key descriptors.
    pub schema: bool,
    /// Include memo entries.
    pub memo: bool,
    pub format: OutputFormat,
    pub field_separator: char,
    pub quote: SqlQuote,
    pub charset: Option<String>,
    pub pretty: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            active_only: false,
            data: true,
            meta: true,
            schema: true,
            memo: true,
            format: OutputFormat::Text,
            field_separator: ';',
            quote: SqlQuote::Ansi,
            charset: None,
            pretty: false,
        }
    }
}

impl DumpOptions {
    /// Whether any records are written.
    pub fn dumps_records(&self) -> bool {
        self.data || self.active_only
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            charset: self.charset.clone(),
            memo: self.memo,
        }
    }
}
