//! Builds a small CUSTOMER database (data, memo and key file) on disk.

#![allow(dead_code)]

use clarion_dump::database::{RecordHeader, RecordStatus, MEMO_BLOCK_SIZE, MEMO_PAYLOAD_SIZE, MEMO_SIGNATURE};
use clarion_dump::parser::{
    ArrayDescriptor, ArrayPart, CipherKey, FieldDescriptor, FieldType, FileAttributes, FileHeader, KeyDescriptor, KeyPart, KeyType,
    PictureDescriptor,
};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

pub const KEY: CipherKey = CipherKey([0x5a, 0xc3]);

pub struct Fixture {
    pub header: FileHeader,
    pub fields: Vec<FieldDescriptor>,
    pub keys: Vec<KeyDescriptor>,
    pub pictures: Vec<PictureDescriptor>,
    /// The array section, in file order.
    pub arrays: Vec<ArrayDescriptor>,
    /// Full records, status and memo pointer included.
    pub records: Vec<Vec<u8>>,
    /// (0-based next block, payload) per memo block.
    pub memo_blocks: Vec<(u32, Vec<u8>)>,
    /// Key type byte stored in each `.Kxx` file, by key.
    pub key_types: Vec<u8>,
}

fn padded<const N: usize>(text: &str) -> [u8; N] {
    let mut buf = [b' '; N];
    buf[..text.len()].copy_from_slice(text.as_bytes());
    buf
}

fn field(field_type: FieldType, name: &str, offset: u16, length: u16) -> FieldDescriptor {
    FieldDescriptor {
        field_type,
        name: padded(name),
        offset,
        length,
        digits: 0,
        places: 0,
        array_index: 0,
        picture_index: 0,
        arrays: Vec::new(),
    }
}

fn record(status: RecordStatus, pointer: u32, id: i32, name: &str, balance: [u8; 3]) -> Vec<u8> {
    let mut bytes = RecordHeader { status, pointer }.to_bytes().to_vec();
    bytes.extend_from_slice(&id.to_le_bytes());
    bytes.extend_from_slice(&padded::<10>(name));
    bytes.extend_from_slice(&balance);
    bytes
}

fn payload(text: &str, fill: u8) -> Vec<u8> {
    let mut bytes = vec![fill; MEMO_PAYLOAD_SIZE];
    bytes[..text.len()].copy_from_slice(text.as_bytes());
    bytes
}

impl Fixture {
    /// Three customers: Alice with a two-block memo, Bob deleted, Carol with a one-block memo.
    pub fn customer() -> Self {
        let mut balance = field(FieldType::Decimal, "CUS:BALANCE", 14, 3);
        balance.digits = 5;
        balance.places = 2;
        let mut name = field(FieldType::String, "CUS:NAME", 4, 10);
        name.picture_index = 1;
        let fields = vec![field(FieldType::Long, "CUS:ID", 0, 4), name, balance];

        let keys = vec![KeyDescriptor {
            component_count: 1,
            name: padded("CUS:BYID"),
            comparison_type: 0,
            comparison_length: 4,
            key_type: KeyType(0x01),
            parts: vec![KeyPart {
                field_type: FieldType::Long,
                field_number: 1,
                element_offset: 0,
                element_length: 4,
                subparts: Vec::new(),
            }],
        }];
        let pictures = vec![PictureDescriptor {
            picture: b"@s10".to_vec(),
        }];

        let records = vec![
            record(RecordStatus::NEW, 1, 1, "Alice", [0x01, 0x23, 0x45]),
            record(RecordStatus::OLD | RecordStatus::DELETED, 0, 2, "Bob", [0x00, 0x05, 0x00]),
            record(RecordStatus::OLD, 3, 3, "Carol", [0x00, 0x00, 0x00]),
        ];
        let memo_blocks = vec![
            (1, payload("Hello", b' ')),
            (0, payload("world", b' ')),
            (0, payload("Note", 0)),
        ];

        let header = FileHeader {
            signature: FileHeader::SIGNATURE,
            attributes: FileAttributes::MEMO_EXISTS,
            key_count: keys.len() as u8,
            record_count: records.len() as u32,
            deleted_count: 1,
            field_count: fields.len() as u16,
            picture_count: pictures.len() as u16,
            array_count: 0,
            record_length: records[0].len() as u16,
            data_offset: 0,
            logical_eof: 0,
            logical_bof: 0,
            free_record: 0,
            record_name: padded("CUSTOMER"),
            memo_name: padded("NOTES"),
            file_prefix: *b"CUS",
            record_prefix: *b"REC",
            memo_length: 504,
            memo_width: 0,
            reserved: 0,
            change_time: 4_500_001,
            change_date: 76_000,
            reserved2: 0,
        };

        Self {
            header,
            fields,
            keys,
            pictures,
            arrays: Vec::new(),
            records,
            memo_blocks,
            key_types: vec![0x01],
        }
        .with_data_offset()
    }

    /// Two array fields under a group, keyed by the group; no memo file.
    ///
    /// `CUS:A` carries a `(2, 3)` descriptor and `CUS:B` a `(1, 1)` one, so
    /// the first chain ends on the equal pair that starts the second.
    pub fn arrays() -> Self {
        let group = field(FieldType::Group, "CUS:PAIR", 4, 2);
        let mut a = field(FieldType::Short, "CUS:A", 4, 2);
        a.array_index = 1;
        let mut b = field(FieldType::Short, "CUS:B", 6, 2);
        b.array_index = 2;
        let fields = vec![field(FieldType::Long, "CUS:ID", 0, 4), group, a, b];

        let keys = vec![KeyDescriptor {
            component_count: 1,
            name: padded("CUS:BYPAIR"),
            comparison_type: 0,
            comparison_length: 4,
            key_type: KeyType(0x11),
            parts: vec![KeyPart {
                field_type: FieldType::Group,
                field_number: 2,
                element_offset: 4,
                element_length: 4,
                subparts: Vec::new(),
            }],
        }];

        let array = |dimensions: u16, parts: &[(u16, u16)]| ArrayDescriptor {
            dimensions,
            total_dimensions: parts.len() as u16,
            element_size: 2,
            parts: parts
                .iter()
                .map(|&(max_dimension, element_length)| ArrayPart {
                    max_dimension,
                    element_length,
                })
                .collect(),
        };
        let arrays = vec![array(2, &[(4, 2), (3, 2), (2, 2)]), array(1, &[(5, 2)])];

        let records = [(1i32, 10u16, 20u16), (2, 30, 40)]
            .iter()
            .map(|&(id, a, b)| {
                let mut bytes = RecordHeader {
                    status: RecordStatus::NEW,
                    pointer: 0,
                }
                .to_bytes()
                .to_vec();
                bytes.extend_from_slice(&id.to_le_bytes());
                bytes.extend_from_slice(&a.to_le_bytes());
                bytes.extend_from_slice(&b.to_le_bytes());
                bytes
            })
            .collect::<Vec<_>>();

        let header = FileHeader {
            signature: FileHeader::SIGNATURE,
            attributes: FileAttributes::empty(),
            key_count: 1,
            record_count: records.len() as u32,
            deleted_count: 0,
            field_count: fields.len() as u16,
            picture_count: 0,
            array_count: arrays.len() as u16,
            record_length: records[0].len() as u16,
            data_offset: 0,
            logical_eof: 0,
            logical_bof: 0,
            free_record: 0,
            record_name: padded("PAIRS"),
            memo_name: [b' '; 12],
            file_prefix: *b"CUS",
            record_prefix: *b"REC",
            memo_length: 0,
            memo_width: 0,
            reserved: 0,
            change_time: 0,
            change_date: 0,
            reserved2: 0,
        };

        Self {
            header,
            fields,
            keys,
            pictures: Vec::new(),
            arrays,
            records,
            memo_blocks: Vec::new(),
            key_types: vec![0x11],
        }
        .with_data_offset()
    }

    /// Point the header's data offset just past the schema sections.
    fn with_data_offset(mut self) -> Self {
        self.header.data_offset = self.schema_image().0.len() as u32;
        self
    }

    pub fn data_bytes(&self) -> Vec<u8> {
        self.data_image().0
    }

    pub fn memo_bytes(&self) -> Vec<u8> {
        let mut bytes = MEMO_SIGNATURE.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        for (next, payload) in &self.memo_blocks {
            bytes.extend_from_slice(&next.to_le_bytes());
            bytes.extend_from_slice(payload);
        }
        bytes
    }

    /// The data file as the encrypting writer would leave it.
    ///
    /// With `reserved` and the high half of `deleted_count` at zero, every
    /// key location yields `key`.
    pub fn encrypted_data_bytes(&self, key: CipherKey) -> Vec<u8> {
        let (mut bytes, spans) = self.data_image();
        let attributes = self.header.attributes | FileAttributes::OWNED | FileAttributes::RECORDS_ENCRYPTED;
        bytes[2..4].copy_from_slice(&attributes.bits().to_le_bytes());
        for span in spans {
            key.apply(&mut bytes[span]);
        }
        bytes
    }

    pub fn encrypted_memo_bytes(&self, key: CipherKey) -> Vec<u8> {
        let mut bytes = self.memo_bytes();
        let block = MEMO_BLOCK_SIZE as usize;
        for start in (6..bytes.len()).step_by(block) {
            if start + block <= bytes.len() {
                key.apply(&mut bytes[start + 4..start + block]);
            }
        }
        bytes
    }

    /// Plain data file bytes and the spans the cipher covers.
    fn data_image(&self) -> (Vec<u8>, Vec<Range<usize>>) {
        let (mut bytes, mut spans) = self.schema_image();
        assert_eq!(bytes.len(), self.header.data_offset as usize);

        for record in &self.records {
            let start = bytes.len();
            bytes.extend_from_slice(record);
            spans.push(start + RecordHeader::SIZE..bytes.len());
        }
        (bytes, spans)
    }

    /// Header and descriptor sections, with their cipher spans.
    fn schema_image(&self) -> (Vec<u8>, Vec<Range<usize>>) {
        let mut bytes = self.header.to_bytes().unwrap();
        let mut spans = vec![FileHeader::PLAIN_PREFIX..FileHeader::SIZE];

        let mut span = |bytes: &mut Vec<u8>, chunk: Vec<u8>| {
            let start = bytes.len();
            bytes.extend_from_slice(&chunk);
            spans.push(start..bytes.len());
        };
        for field in &self.fields {
            let mut chunk = Vec::new();
            field.write_to(&mut chunk).unwrap();
            span(&mut bytes, chunk);
        }
        for key in &self.keys {
            let mut chunk = vec![key.component_count];
            chunk.extend_from_slice(&key.name);
            chunk.extend_from_slice(&[key.comparison_type, key.comparison_length]);
            span(&mut bytes, chunk);
            for part in &key.parts {
                let mut chunk = Vec::new();
                part.write_to(&mut chunk).unwrap();
                span(&mut bytes, chunk);
            }
        }
        for picture in &self.pictures {
            bytes.extend_from_slice(&(picture.picture.len() as u16).to_le_bytes());
            span(&mut bytes, picture.picture.clone());
        }
        for array in &self.arrays {
            let mut chunk = Vec::new();
            array.write_to(&mut chunk).unwrap();
            let parts = chunk.split_off(ArrayDescriptor::HEADER_SIZE);
            span(&mut bytes, chunk);
            span(&mut bytes, parts);
        }
        (bytes, spans)
    }

    /// Write `CUSTOMER.DAT`, `CUSTOMER.MEM` and the key files into `dir`.
    pub fn write(&self, dir: &Path) -> PathBuf {
        self.write_with(dir, self.data_bytes(), self.memo_bytes())
    }

    pub fn write_encrypted(&self, dir: &Path, key: CipherKey) -> PathBuf {
        self.write_with(dir, self.encrypted_data_bytes(key), self.encrypted_memo_bytes(key))
    }

    pub fn write_with(&self, dir: &Path, data: Vec<u8>, memo: Vec<u8>) -> PathBuf {
        let path = dir.join("CUSTOMER.DAT");
        fs::write(&path, data).unwrap();
        fs::write(dir.join("CUSTOMER.MEM"), memo).unwrap();
        for (i, key_type) in self.key_types.iter().enumerate() {
            let mut key_file = vec![0u8; KeyType::FILE_OFFSET as usize];
            key_file.push(*key_type);
            fs::write(dir.join(format!("CUSTOMER.K{:02x}", i + 1)), key_file).unwrap();
        }
        path
    }
}
