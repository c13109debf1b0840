//! Fixed-width primitives and helpers for space-padded text.
//!
//! Integers are little-endian on disk; `byteorder` normalizes them on any host.

use serde::Serializer;
use std::io::{self, Read};

/// Read exactly `N` bytes.
pub fn read_array<R: Read, const N: usize>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read exactly `len` bytes into a fresh buffer.
pub fn read_vec<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Fill `buf` as far as the reader allows, returning the number of bytes read.
pub fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Bytes before the first NUL, if any.
pub fn until_nul(data: &[u8]) -> &[u8] {
    match data.iter().position(|&b| b == 0) {
        Some(end) => &data[..end],
        None => data,
    }
}

/// Drop trailing 0x20 bytes.
pub fn trim_trailing_spaces(data: &[u8]) -> &[u8] {
    let end = data
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(0, |last| last + 1);
    &data[..end]
}

/// Collapse every run of spaces into a single space.
pub fn collapse_spaces(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &b in data {
        if b == b' ' && out.last() == Some(&b' ') {
            continue;
        }
        out.push(b);
    }
    out
}

/// Text of a fixed-width name field with padding removed.
pub fn fixed_text(data: &[u8]) -> String {
    String::from_utf8_lossy(trim_trailing_spaces(until_nul(data))).into_owned()
}

/// Strip the `PRE:` file prefix from a field or key name.
pub fn strip_prefix(name: &str) -> &str {
    match name.find(':') {
        Some(colon) => &name[colon + 1..],
        None => name,
    }
}

/// Serialize a fixed-width byte field as its trimmed text.
pub fn serialize_fixed_text<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&fixed_text(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_trailing_spaces() {
        assert_eq!(trim_trailing_spaces(b"abc   "), b"abc");
        assert_eq!(trim_trailing_spaces(b"  a b "), b"  a b");
        assert_eq!(trim_trailing_spaces(b"    "), b"");
        assert_eq!(trim_trailing_spaces(b""), b"");
    }

    #[test]
    fn test_collapse_spaces() {
        assert_eq!(collapse_spaces(b"hello     world  "), b"hello world ".to_vec());
        assert_eq!(collapse_spaces(b"   x"), b" x".to_vec());
        assert_eq!(collapse_spaces(b"no-runs"), b"no-runs".to_vec());
    }

    #[test]
    fn test_fixed_text_stops_at_nul() {
        assert_eq!(fixed_text(b"CUS:NAME  \0garbage"), "CUS:NAME");
        assert_eq!(fixed_text(b"CUSTOMER    "), "CUSTOMER");
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_prefix("CUS:NAME"), "NAME");
        assert_eq!(strip_prefix("NAME"), "NAME");
    }

    #[test]
    fn test_read_up_to_short_source() {
        let mut src: &[u8] = b"abc";
        let mut buf = [0u8; 8];
        assert_eq!(read_up_to(&mut src, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }
}
