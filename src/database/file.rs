//! An open data file: metadata, companion memo file and record iteration.

use super::memo::{Memo, MemoFile, MemoHeader};
use super::value::{read_field, RecordHeader, Transcoder, Value};
use crate::parser::codec::read_up_to;
use crate::parser::{
    memo_file_path, read_array_descriptors, read_field_descriptors, read_key_descriptors,
    read_picture_descriptors, ClarionError, FieldDescriptor, FileHeader, IndexResolver,
    KeyDescriptor, KeyFileResolver, PictureDescriptor, Result, Stage, Warning,
};
use log::{debug, info, warn};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Settings that affect how a file is opened and decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadOptions {
    /// Source charset of text fields; `None` passes bytes through as UTF-8.
    pub charset: Option<String>,
    /// Open the memo file when the header says one exists.
    pub memo: bool,
}

/// Everything stored ahead of the record area.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub header: FileHeader,
    pub fields: Vec<FieldDescriptor>,
    pub keys: Vec<KeyDescriptor>,
    pub pictures: Vec<PictureDescriptor>,
}

impl Metadata {
    /// Fields that hold data, in declaration order. Groups are skipped.
    pub fn data_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.is_group())
    }
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// 1-based position in the record area.
    pub number: u32,
    pub header: RecordHeader,
    /// One entry per data field, aligned with [`Metadata::data_fields`].
    pub values: Vec<Option<Value>>,
    pub memo: Option<Memo>,
}

/// A Clarion data file opened for reading.
#[derive(Debug)]
pub struct ClarionFile<R> {
    path: PathBuf,
    reader: R,
    memo: Option<MemoFile<R>>,
    metadata: Metadata,
    transcoder: Transcoder,
    warnings: Vec<Warning>,
}

impl ClarionFile<BufReader<File>> {
    /// Open a data file together with its memo and key files.
    pub fn open<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ClarionError::from(e).at(Stage::Open))?;
        let memo_path = memo_file_path(path);
        let resolver = KeyFileResolver::new(path);

        Self::load(
            path,
            BufReader::new(file),
            || {
                debug!("opening memo file {}", memo_path.display());
                File::open(&memo_path).map(BufReader::new)
            },
            &resolver,
            options,
        )
    }
}

impl ClarionFile<Cursor<Vec<u8>>> {
    /// Open in-memory images of a data file and its memo file.
    pub fn from_bytes(
        data: Vec<u8>,
        memo: Option<Vec<u8>>,
        resolver: &dyn IndexResolver,
        options: &ReadOptions,
    ) -> Result<Self> {
        Self::load(
            "<memory>",
            Cursor::new(data),
            move || {
                memo.map(Cursor::new)
                    .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no memo image"))
            },
            resolver,
            options,
        )
    }
}

impl<R: Read + Seek> ClarionFile<R> {
    /// Read the header and all descriptor sections from `reader`.
    ///
    /// `open_memo` is only called when the header announces a memo file and
    /// memo output is wanted.
    pub fn load<P, F>(
        path: P,
        mut reader: R,
        open_memo: F,
        resolver: &dyn IndexResolver,
        options: &ReadOptions,
    ) -> Result<Self>
    where
        P: Into<PathBuf>,
        F: FnOnce() -> io::Result<R>,
    {
        let path = path.into();
        let transcoder = Transcoder::new(options.charset.as_deref())?;
        let mut warnings = Vec::new();

        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| ClarionError::from(e).at(Stage::Open))?;
        let header = FileHeader::read(&mut reader).map_err(|e| e.at(Stage::Header))?;
        if header.is_encrypted() {
            return Err(ClarionError::Encrypted);
        }
        info!(
            "{}: {} records of {} bytes, {} fields, {} keys",
            path.display(),
            header.record_count,
            header.record_length,
            header.field_count,
            header.key_count
        );

        let memo = if header.has_memo() && options.memo {
            let memo_reader = open_memo().map_err(|e| ClarionError::from(e).at(Stage::Memo))?;
            Some(MemoFile::from_reader(memo_reader).map_err(|e| e.at(Stage::Memo))?)
        } else {
            None
        };

        let mut fields = read_field_descriptors(&mut reader, &header).map_err(|e| e.at(Stage::Fields))?;
        let keys = read_key_descriptors(&mut reader, &header, &fields, resolver, &mut warnings)
            .map_err(|e| e.at(Stage::Keys))?;
        let pictures = read_picture_descriptors(&mut reader, &header).map_err(|e| e.at(Stage::Pictures))?;
        read_array_descriptors(&mut reader, &header, &mut fields).map_err(|e| e.at(Stage::Arrays))?;

        Ok(Self {
            path,
            reader,
            memo,
            metadata: Metadata {
                header,
                fields,
                keys,
                pictures,
            },
            transcoder,
            warnings,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &FileHeader {
        &self.metadata.header
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn memo_header(&self) -> Option<&MemoHeader> {
        self.memo.as_ref().map(MemoFile::header)
    }

    /// Whether records carry a decoded memo entry.
    pub fn has_memo(&self) -> bool {
        self.memo.is_some()
    }

    pub fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }

    /// Non-fatal problems met so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Iterate over the record area, optionally skipping deleted records.
    pub fn records(&mut self, active_only: bool) -> Result<Records<'_, R>> {
        let record_length = self.metadata.header.record_length;
        if (record_length as usize) < RecordHeader::SIZE {
            return Err(ClarionError::RecordTooShort(record_length).at(Stage::Data));
        }
        let offset = u64::from(self.metadata.header.data_offset);
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| ClarionError::from(e).at(Stage::Data))?;
        debug!("records start at 0x{:x}", offset);

        Ok(Records {
            file: self,
            read: 0,
            active_only,
            done: false,
        })
    }
}

/// Iterator over the records of a [`ClarionFile`].
pub struct Records<'a, R> {
    file: &'a mut ClarionFile<R>,
    read: u32,
    active_only: bool,
    done: bool,
}

impl<R: Read + Seek> Records<'_, R> {
    fn warn(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.file.warnings.push(warning);
    }

    fn decode(&mut self, number: u32, header: RecordHeader, body: &[u8]) -> Result<Record> {
        let file = &mut *self.file;
        let mut cursor = Cursor::new(body);
        let values = file
            .metadata
            .data_fields()
            .map(|field| read_field(&mut cursor, field, &file.transcoder))
            .collect::<Result<Vec<_>>>()?;

        let memo = match file.memo.as_mut() {
            Some(memo_file) => memo_file.read_memo(&header, &file.transcoder)?,
            None => None,
        };
        if let Some(memo) = &memo {
            if let Some(block) = memo.loop_at {
                self.warn(Warning::MemoLoop { block });
            }
            if memo.truncated {
                self.warn(Warning::Truncated {
                    section: "memo chain",
                    processed: memo.blocks.len().saturating_sub(1) as u64,
                });
            }
        }

        Ok(Record {
            number,
            header,
            values,
            memo,
        })
    }
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let record_length = self.file.metadata.header.record_length as usize;
        let record_count = self.file.metadata.header.record_count;

        while !self.done && self.read < record_count {
            let mut buf = vec![0u8; record_length];
            let filled = match read_up_to(&mut self.file.reader, &mut buf) {
                Ok(n) => n,
                Err(e) => {
                    self.done = true;
                    return Some(Err(ClarionError::from(e).at(Stage::Data)));
                }
            };
            if filled < record_length {
                self.done = true;
                let processed = u64::from(self.read);
                self.warn(Warning::Truncated {
                    section: "data records",
                    processed,
                });
                return None;
            }

            self.read += 1;
            let mut prefix = [0u8; RecordHeader::SIZE];
            prefix.copy_from_slice(&buf[..RecordHeader::SIZE]);
            let header = RecordHeader::from_bytes(&prefix);
            if self.active_only && header.is_deleted() {
                continue;
            }

            let number = self.read;
            let record = self
                .decode(number, header, &buf[RecordHeader::SIZE..])
                .map_err(|e| e.at(Stage::Data));
            if record.is_err() {
                self.done = true;
            }
            return Some(record);
        }
        None
    }
}
