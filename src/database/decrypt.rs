//! In-place decryption of a data file and its memo file.
//!
//! The cipher covers every section after the header's first four bytes, but
//! the sizes of later sections are only known once earlier ones are readable.
//! Each section is therefore decrypted on a writable mapping, flushed, and
//! parsed again before the next one is located.

use super::memo::{MemoHeader, MEMO_BLOCK_SIZE, MEMO_HEADER_SIZE, MEMO_POINTER_SIZE};
use super::value::RecordHeader;
use crate::parser::{
    memo_file_path, read_array_descriptors, read_field_descriptors, read_key_descriptors,
    read_picture_descriptors, ArrayDescriptor, CipherKey, ClarionError, FieldDescriptor,
    FileAttributes, FileHeader, IndexResolver, KeyDescriptor, KeyLocation, KeyPart, Result,
    Stage, Warning,
};
use log::{debug, info, warn};
use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::io::{Cursor, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Outcome of a successful decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptReport {
    pub key: CipherKey,
    /// Records decrypted in the data file.
    pub records: u32,
    /// Memo blocks decrypted, 0 without a memo file.
    pub memo_blocks: u64,
    pub warnings: Vec<Warning>,
}

/// Decrypt the data file at `path`, and its memo file if it has one, in place.
///
/// XOR is its own inverse: running this twice with the same key restores the
/// encrypted bytes, except for the attribute bits cleared on the first run.
pub fn decrypt_file<P: AsRef<Path>>(
    path: P,
    location: KeyLocation,
    resolver: &dyn IndexResolver,
) -> Result<DecryptReport> {
    let mut decryptor = Decryptor::open(path.as_ref(), location, resolver)?;

    let mut stage = Some(Stage::Open);
    while let Some(current) = stage {
        info!("decrypting {}", current);
        stage = decryptor.step(current)?;
    }

    Ok(decryptor.into_report())
}

struct Decryptor<'a> {
    path: PathBuf,
    // Keeps the descriptor open for as long as the mapping lives.
    _file: File,
    map: MmapMut,
    key: CipherKey,
    resolver: &'a dyn IndexResolver,
    /// Sequential read position, resynchronized after every section.
    position: u64,
    header: FileHeader,
    fields: Vec<FieldDescriptor>,
    keys: Vec<KeyDescriptor>,
    records: u32,
    memo_blocks: u64,
    warnings: Vec<Warning>,
}

impl<'a> Decryptor<'a> {
    fn open(path: &Path, location: KeyLocation, resolver: &'a dyn IndexResolver) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| ClarionError::from(e).at(Stage::Open))?;
        // Safety: the file is opened read-write by us and is not resized while mapped.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| ClarionError::from(e).at(Stage::Open))?;

        let header = FileHeader::read(&mut Cursor::new(&map[..])).map_err(|e| e.at(Stage::Header))?;
        if !header.is_encrypted() {
            return Err(ClarionError::NotEncrypted);
        }
        let key = CipherKey::derive(&header, location);
        info!("{}: decrypting with key {} ({:?})", path.display(), key, location);

        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
            map,
            key,
            resolver,
            position: 0,
            header,
            fields: Vec::new(),
            keys: Vec::new(),
            records: 0,
            memo_blocks: 0,
            warnings: Vec::new(),
        })
    }

    /// Run one stage and return the one that follows it.
    fn step(&mut self, stage: Stage) -> Result<Option<Stage>> {
        let next = match stage {
            Stage::Open => {
                self.clear_encryption_flags()?;
                Stage::Header
            }
            Stage::Header => {
                self.decrypt_header()?;
                Stage::Fields
            }
            Stage::Fields => {
                self.decrypt_fields()?;
                Stage::Keys
            }
            Stage::Keys => {
                self.decrypt_keys()?;
                Stage::Pictures
            }
            Stage::Pictures => {
                self.decrypt_pictures()?;
                Stage::Arrays
            }
            Stage::Arrays => {
                self.decrypt_arrays()?;
                Stage::Data
            }
            Stage::Data => {
                self.decrypt_records()?;
                if !self.header.has_memo() {
                    return Ok(None);
                }
                Stage::Memo
            }
            Stage::Memo => {
                self.decrypt_memo()?;
                return Ok(None);
            }
        };
        Ok(Some(next))
    }

    fn into_report(self) -> DecryptReport {
        DecryptReport {
            key: self.key,
            records: self.records,
            memo_blocks: self.memo_blocks,
            warnings: self.warnings,
        }
    }

    fn warn(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// XOR `range` of the mapping after checking it lies inside the file.
    fn xor(&mut self, stage: Stage, range: Range<usize>) -> Result<()> {
        check_bounds(stage, &range, self.map.len())?;
        self.key.apply(&mut self.map[range]);
        Ok(())
    }

    /// Flush `range` to disk and move the read cursor to `position`.
    fn commit(&mut self, stage: Stage, range: Range<usize>, position: u64) -> Result<()> {
        if !range.is_empty() {
            self.map
                .flush_range(range.start, range.len())
                .map_err(|source| ClarionError::Sync { stage, source })?;
        }
        self.position = position;
        Ok(())
    }

    /// A cursor over the mapping at the current read position.
    fn cursor(&self) -> Result<Cursor<&[u8]>> {
        let mut cursor = Cursor::new(&self.map[..]);
        cursor.seek(SeekFrom::Start(self.position))?;
        Ok(cursor)
    }

    fn clear_encryption_flags(&mut self) -> Result<()> {
        let offset = FileHeader::ATTRIBUTES_OFFSET;
        let attributes = self
            .header
            .attributes
            .difference(FileAttributes::OWNED | FileAttributes::RECORDS_ENCRYPTED);
        self.map[offset..offset + 2].copy_from_slice(&attributes.bits().to_le_bytes());
        self.commit(Stage::Open, offset..offset + 2, 0)
    }

    fn decrypt_header(&mut self) -> Result<()> {
        let range = FileHeader::PLAIN_PREFIX..FileHeader::SIZE;
        self.xor(Stage::Header, range.clone())?;
        self.commit(Stage::Header, 0..range.end, 0)?;

        let mut cursor = self.cursor()?;
        let header = FileHeader::read(&mut cursor).map_err(|e| e.at(Stage::Header))?;
        let position = cursor.position();
        debug!(
            "header: {} fields, {} keys, {} pictures, data at 0x{:x}",
            header.field_count, header.key_count, header.picture_count, header.data_offset
        );
        self.header = header;
        self.position = position;
        Ok(())
    }

    fn decrypt_fields(&mut self) -> Result<()> {
        let start = self.position as usize;
        let mut pos = start;
        for _ in 0..self.header.field_count {
            self.xor(Stage::Fields, pos..pos + FieldDescriptor::SIZE)?;
            pos += FieldDescriptor::SIZE;
        }
        self.commit(Stage::Fields, start..pos, start as u64)?;

        let mut cursor = self.cursor()?;
        let fields = read_field_descriptors(&mut cursor, &self.header).map_err(|e| e.at(Stage::Fields))?;
        let position = cursor.position();
        self.fields = fields;
        self.position = position;
        Ok(())
    }

    fn decrypt_keys(&mut self) -> Result<()> {
        let start = self.position as usize;
        let mut pos = start;
        for _ in 0..self.header.key_count {
            self.xor(Stage::Keys, pos..pos + KeyDescriptor::SIZE)?;
            let components = usize::from(self.map[pos]);
            pos += KeyDescriptor::SIZE;
            for _ in 0..components {
                self.xor(Stage::Keys, pos..pos + KeyPart::SIZE)?;
                pos += KeyPart::SIZE;
            }
        }
        self.commit(Stage::Keys, start..pos, start as u64)?;

        let mut warnings = Vec::new();
        let mut cursor = self.cursor()?;
        let keys = read_key_descriptors(&mut cursor, &self.header, &self.fields, self.resolver, &mut warnings)
            .map_err(|e| e.at(Stage::Keys))?;
        let position = cursor.position();
        self.keys = keys;
        self.position = position;
        self.warnings.extend(warnings);
        debug!("{} key descriptors readable", self.keys.len());
        Ok(())
    }

    fn decrypt_pictures(&mut self) -> Result<()> {
        let start = self.position as usize;
        let mut pos = start;
        for _ in 0..self.header.picture_count {
            check_bounds(Stage::Pictures, &(pos..pos + 2), self.map.len())?;
            let len = usize::from(u16::from_le_bytes([self.map[pos], self.map[pos + 1]]));
            pos += 2;
            self.xor(Stage::Pictures, pos..pos + len)?;
            pos += len;
        }
        self.commit(Stage::Pictures, start..pos, start as u64)?;

        let mut cursor = self.cursor()?;
        read_picture_descriptors(&mut cursor, &self.header).map_err(|e| e.at(Stage::Pictures))?;
        self.position = cursor.position();
        Ok(())
    }

    /// Array descriptors run up to the data offset and carry no count, so
    /// everything between the cursor and the record area is decrypted as one chain.
    fn decrypt_arrays(&mut self) -> Result<()> {
        if self.fields.iter().all(|f| f.array_index == 0) {
            return Ok(());
        }

        let start = self.position as usize;
        let end = self.header.data_offset as usize;
        let mut pos = start;
        while pos < end {
            self.xor(Stage::Arrays, pos..pos + ArrayDescriptor::HEADER_SIZE)?;
            let total = usize::from(u16::from_le_bytes([self.map[pos + 2], self.map[pos + 3]]));
            pos += ArrayDescriptor::HEADER_SIZE;
            self.xor(Stage::Arrays, pos..pos + total * ArrayDescriptor::PART_SIZE)?;
            pos += total * ArrayDescriptor::PART_SIZE;
        }
        self.commit(Stage::Arrays, start..pos, start as u64)?;

        let mut fields = std::mem::take(&mut self.fields);
        let mut cursor = self.cursor()?;
        let read = read_array_descriptors(&mut cursor, &self.header, &mut fields);
        let position = cursor.position();
        self.fields = fields;
        read.map_err(|e| e.at(Stage::Arrays))?;
        self.position = position;
        Ok(())
    }

    fn decrypt_records(&mut self) -> Result<()> {
        let offset = self.header.data_offset;
        if self.position > u64::from(offset) {
            return Err(ClarionError::DataOffsetOverrun {
                position: self.position,
                offset,
            });
        }

        let record_length = usize::from(self.header.record_length);
        if record_length < RecordHeader::SIZE {
            return Err(ClarionError::RecordTooShort(self.header.record_length));
        }

        let start = offset as usize;
        let mut pos = start;
        for done in 0..self.header.record_count {
            if pos + record_length > self.map.len() {
                self.warn(Warning::Truncated {
                    section: "data file",
                    processed: u64::from(done),
                });
                break;
            }
            self.xor(Stage::Data, pos + RecordHeader::SIZE..pos + record_length)?;
            pos += record_length;
            self.records += 1;
        }
        self.commit(Stage::Data, start..pos, pos as u64)?;
        info!("decrypted {} records", self.records);
        Ok(())
    }

    /// Flat sweep over every full block; chains are not followed.
    fn decrypt_memo(&mut self) -> Result<()> {
        let memo_path = memo_file_path(&self.path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&memo_path)
            .map_err(|e| ClarionError::from(e).at(Stage::Memo))?;
        // Safety: as for the data file.
        let mut map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| ClarionError::from(e).at(Stage::Memo))?;
        MemoHeader::read(&mut Cursor::new(&map[..])).map_err(|e| e.at(Stage::Memo))?;

        let block = MEMO_BLOCK_SIZE as usize;
        let mut pos = MEMO_HEADER_SIZE as usize;
        while pos < map.len() {
            if pos + block > map.len() {
                self.warn(Warning::Truncated {
                    section: "memo file",
                    processed: self.memo_blocks,
                });
                break;
            }
            self.key.apply(&mut map[pos + MEMO_POINTER_SIZE..pos + block]);
            pos += block;
            self.memo_blocks += 1;
        }

        map.flush()
            .map_err(|source| ClarionError::Sync { stage: Stage::Memo, source })?;
        info!("decrypted {} memo blocks in {}", self.memo_blocks, memo_path.display());
        Ok(())
    }
}

fn check_bounds(stage: Stage, range: &Range<usize>, size: usize) -> Result<()> {
    if range.end > size {
        return Err(ClarionError::OutOfBounds {
            stage,
            end: range.end as u64,
            size: size as u64,
        });
    }
    Ok(())
}
