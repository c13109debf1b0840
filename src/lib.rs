//! Clarion Dump Library
//!
//! Reads Clarion data files (with their memo and key files), decrypts them in
//! place, and dumps them to text, CSV, SQL or JSON.

pub mod database;
pub mod options;
pub mod output;
pub mod parser;

pub use database::{decrypt_file, ClarionFile, DecryptReport, Metadata, ReadOptions, Record, Value};
pub use options::{DumpOptions, OutputFormat, SqlQuote};
pub use parser::{ClarionError, KeyLocation, Result, Stage, Warning};
