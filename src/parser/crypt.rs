//! Record obfuscation: a 2-byte XOR stream keyed from header fields.

use super::header::FileHeader;
use log::trace;
use std::fmt;

/// Which header bytes hide the cipher key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLocation {
    /// High 16 bits of the deleted-record count.
    DeletedHigh = 1,
    /// High 16 bits of the reserved word.
    ReservedHigh = 2,
    /// Low 16 bits of the reserved word.
    ReservedLow = 3,
    /// Bits 8-23 of the reserved word.
    ReservedMiddle = 4,
}

impl TryFrom<u8> for KeyLocation {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(KeyLocation::DeletedHigh),
            2 => Ok(KeyLocation::ReservedHigh),
            3 => Ok(KeyLocation::ReservedLow),
            4 => Ok(KeyLocation::ReservedMiddle),
            other => Err(other),
        }
    }
}

/// The two key bytes applied to alternating positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherKey(pub [u8; 2]);

impl CipherKey {
    /// Derive the key from a header read while the file is still encrypted.
    pub fn derive(header: &FileHeader, location: KeyLocation) -> Self {
        let [b0, b1, b2, b3] = match location {
            KeyLocation::DeletedHigh => header.deleted_count,
            _ => header.reserved,
        }
        .to_le_bytes();

        match location {
            KeyLocation::DeletedHigh | KeyLocation::ReservedHigh => CipherKey([b3, b2]),
            KeyLocation::ReservedLow => CipherKey([b1, b0]),
            KeyLocation::ReservedMiddle => CipherKey([b1, b2]),
        }
    }

    /// XOR `data` in place, two bytes at a time; an odd trailing byte is left as is.
    ///
    /// The transform is its own inverse.
    pub fn apply(&self, data: &mut [u8]) {
        trace!("xor {} bytes with key {}", data.len(), self);
        for pair in data.chunks_exact_mut(2) {
            pair[0] ^= self.0[0];
            pair[1] ^= self.0[1];
        }
    }
}

impl fmt::Display for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}", self.0[0], self.0[1])
    }
}
