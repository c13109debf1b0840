//! Companion file naming and key-file lookup.

use super::schema::KeyType;
use byteorder::ReadBytesExt;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Supplies the key type byte for a key, given its 1-based ordinal.
pub trait IndexResolver {
    fn key_type(&self, ordinal: usize) -> io::Result<u8>;

    /// Where the key type for `ordinal` is looked up, for diagnostics.
    fn describe(&self, ordinal: usize) -> String;
}

/// Reads key types from the `.Kxx` files beside the data file.
#[derive(Debug, Clone)]
pub struct KeyFileResolver {
    data_path: PathBuf,
}

impl KeyFileResolver {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
        }
    }
}

impl IndexResolver for KeyFileResolver {
    fn key_type(&self, ordinal: usize) -> io::Result<u8> {
        let mut file = File::open(key_file_path(&self.data_path, ordinal))?;
        file.seek(SeekFrom::Start(KeyType::FILE_OFFSET))?;
        file.read_u8()
    }

    fn describe(&self, ordinal: usize) -> String {
        key_file_path(&self.data_path, ordinal).display().to_string()
    }
}

/// In-memory key types, keyed by ordinal.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    key_types: HashMap<usize, u8>,
}

impl MemoryResolver {
    pub fn with_key_type(mut self, ordinal: usize, key_type: u8) -> Self {
        self.key_types.insert(ordinal, key_type);
        self
    }
}

impl IndexResolver for MemoryResolver {
    fn key_type(&self, ordinal: usize) -> io::Result<u8> {
        self.key_types.get(&ordinal).copied().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no key type for key {}", ordinal))
        })
    }

    fn describe(&self, ordinal: usize) -> String {
        format!("<memory key {}>", ordinal)
    }
}

/// Key file for the key with 1-based `ordinal`: `NAME.DAT` becomes `NAME.K01`.
///
/// The two trailing characters are the ordinal in lowercase hexadecimal.
pub fn key_file_path(data_path: &Path, ordinal: usize) -> PathBuf {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let suffix = [
        'K',
        char::from(DIGITS[(ordinal / 16) % 16]),
        char::from(DIGITS[ordinal % 16]),
    ];
    replace_suffix(data_path, &suffix.iter().collect::<String>())
}

/// Memo file for a data file: `NAME.DAT` becomes `NAME.MEM`.
pub fn memo_file_path(data_path: &Path) -> PathBuf {
    replace_suffix(data_path, "MEM")
}

/// Replace the last three characters of the file name with `suffix`.
fn replace_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let cut = name
        .char_indices()
        .rev()
        .nth(2)
        .map_or(name.len(), |(i, _)| i);

    path.with_file_name(format!("{}{}", &name[..cut], suffix))
}
