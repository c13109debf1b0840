//! Memo file access: chains of fixed-size overflow blocks.

use super::value::{RecordHeader, Transcoder};
use crate::parser::codec::{collapse_spaces, read_array, trim_trailing_spaces, until_nul};
use crate::parser::{ClarionError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

pub const MEMO_SIGNATURE: u16 = 0x334d;
/// Signature plus first-deleted pointer.
pub const MEMO_HEADER_SIZE: u64 = 6;
pub const MEMO_BLOCK_SIZE: u64 = 256;
/// Each block starts with the number of the next block.
pub const MEMO_POINTER_SIZE: usize = 4;
pub const MEMO_PAYLOAD_SIZE: usize = 252;

/// Memo file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoHeader {
    pub signature: u16,
    pub first_deleted: u32,
}

impl MemoHeader {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let signature = reader.read_u16::<LittleEndian>()?;
        if signature != MEMO_SIGNATURE {
            return Err(ClarionError::BadMemoSignature {
                expected: MEMO_SIGNATURE,
                found: signature,
            });
        }
        Ok(Self {
            signature,
            first_deleted: reader.read_u32::<LittleEndian>()?,
        })
    }
}

/// Offset of the block with 0-based number `block`.
pub fn block_offset(block: u32) -> u64 {
    MEMO_HEADER_SIZE + u64::from(block) * MEMO_BLOCK_SIZE
}

/// A decoded memo chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Memo {
    pub text: String,
    /// Block numbers visited, in chain order.
    #[serde(skip)]
    pub blocks: Vec<u32>,
    /// Block whose next pointer led back into the chain.
    #[serde(skip)]
    pub loop_at: Option<u32>,
    /// The chain ran past the end of the memo file.
    #[serde(skip)]
    pub truncated: bool,
}

/// An open memo file.
#[derive(Debug)]
pub struct MemoFile<R> {
    reader: R,
    header: MemoHeader,
}

impl MemoFile<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> MemoFile<R> {
    /// Validate the signature and read the header.
    pub fn from_reader(mut reader: R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let header = MemoHeader::read(&mut reader)?;
        debug!("memo file, first deleted block {}", header.first_deleted);
        Ok(Self { reader, header })
    }

    pub fn header(&self) -> &MemoHeader {
        &self.header
    }

    /// Follow the chain starting at the record's memo pointer.
    ///
    /// Deleted records and a zero pointer have no memo. The record pointer is
    /// 1-based, while the next pointers stored in blocks are 0-based.
    pub fn read_memo(&mut self, record: &RecordHeader, transcoder: &Transcoder) -> Result<Option<Memo>> {
        if record.is_deleted() || record.pointer == 0 {
            return Ok(None);
        }

        let mut raw = Vec::new();
        let mut blocks = Vec::new();
        let mut visited = HashSet::new();
        let mut loop_at = None;
        let mut truncated = false;
        let mut current = record.pointer - 1;

        loop {
            visited.insert(current);
            blocks.push(current);

            self.reader.seek(SeekFrom::Start(block_offset(current)))?;
            let (next, payload) = match self.read_block() {
                Ok(block) => block,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!("memo block {} lies past the end of the memo file", current);
                    truncated = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let text = until_nul(&payload);
            if next == 0 {
                raw.extend_from_slice(trim_trailing_spaces(text));
                break;
            }
            raw.extend_from_slice(text);

            if visited.contains(&next) {
                loop_at = Some(current);
                break;
            }
            current = next;
        }

        Ok(Some(Memo {
            text: transcoder.decode(&collapse_spaces(&raw)),
            blocks,
            loop_at,
            truncated,
        }))
    }

    fn read_block(&mut self) -> io::Result<(u32, [u8; MEMO_PAYLOAD_SIZE])> {
        let next = self.reader.read_u32::<LittleEndian>()?;
        let payload = read_array(&mut self.reader)?;
        Ok((next, payload))
    }
}
