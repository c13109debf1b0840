//! Errors and non-fatal warnings raised while reading or decrypting a database.

use std::fmt;
use thiserror::Error;

/// The step of the open or decrypt sequence an error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    Header,
    Memo,
    Fields,
    Keys,
    Pictures,
    Arrays,
    Data,
}

impl Stage {
    /// Process exit code reported by the CLI when this stage fails.
    pub fn exit_code(self) -> i32 {
        match self {
            Stage::Open | Stage::Data => 1,
            Stage::Header => 2,
            Stage::Memo => 3,
            Stage::Fields => 4,
            Stage::Keys => 5,
            Stage::Pictures => 6,
            Stage::Arrays => 7,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Open => "data file",
            Stage::Header => "header",
            Stage::Memo => "memo file",
            Stage::Fields => "field descriptors",
            Stage::Keys => "key descriptors",
            Stage::Pictures => "picture descriptors",
            Stage::Arrays => "array descriptors",
            Stage::Data => "data records",
        };
        f.write_str(name)
    }
}

/// Errors that abort reading or decryption.
#[derive(Error, Debug)]
pub enum ClarionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data file: signature 0x{found:04x}, expected 0x{expected:04x}")]
    BadSignature { expected: u16, found: u16 },

    #[error("Invalid memo file: signature 0x{found:04x}, expected 0x{expected:04x}")]
    BadMemoSignature { expected: u16, found: u16 },

    #[error("Key part references field {field}, but only {count} fields are declared")]
    FieldOutOfRange { field: u16, count: usize },

    #[error("Record length {0} is shorter than the 5-byte record header")]
    RecordTooShort(u16),

    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    #[error("{stage} extend to offset {end}, past the end of the file ({size} bytes)")]
    OutOfBounds { stage: Stage, end: u64, size: u64 },

    #[error("Failed to resynchronize after decrypting {stage}: {source}")]
    Sync {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("Starting data decryption past start of data (0x{position:x} / 0x{offset:x})")]
    DataOffsetOverrun { position: u64, offset: u32 },

    #[error("Couldn't read {stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<ClarionError>,
    },

    #[error("Database is encrypted, make backups and re-run with decryption enabled")]
    Encrypted,

    #[error("Database is not encrypted")]
    NotEncrypted,
}

impl ClarionError {
    /// Attach the failing stage to this error.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            err @ ClarionError::Stage { .. } => err,
            err => ClarionError::Stage {
                stage,
                source: Box::new(err),
            },
        }
    }

    /// Exit code the CLI uses for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ClarionError::Stage { stage, .. } => stage.exit_code(),
            _ => 1,
        }
    }
}

/// Conditions that end a pass early or degrade a value without aborting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    #[error("EOF reached in {section} after {processed} complete entries")]
    Truncated {
        section: &'static str,
        processed: u64,
    },

    #[error("Couldn't open key file {path}: {reason}")]
    CompanionFile { path: String, reason: String },

    #[error("Memo entry {block:08x} looping back on its chain")]
    MemoLoop { block: u32 },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClarionError>;
