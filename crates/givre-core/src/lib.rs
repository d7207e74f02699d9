//! givre-core — shared primitives (no_std-ready)
//!
//! Provides:
//! - `Chunk` and friends (const pool, ops, line table, debug payload)
//! - GVBC container constants (`MAGIC_GVBC`, `GVBC_VERSION`) + `SectionTag` (fourcc)
//! - In-memory IO (little-endian): `ByteWriter`, `ByteReader`
//! - `crc32_ieee` (compact, table-free)
//! - `CoreError` + `CoreResult<T>` alias
//!
//! Features:
//! - `std` (default): `std::error::Error` impls & file-level consumers
//! - `serde`: (de)serialization derives on the useful structures

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

/* ─────────────────────────── Imports ─────────────────────────── */

use core::fmt;

#[cfg(feature = "std")]
use std::borrow::Cow;

#[cfg(not(feature = "std"))]
use alloc::{borrow::Cow, vec::Vec};
#[cfg(feature = "std")]
use std::vec::Vec;

#[cfg(not(feature = "std"))]
extern crate alloc;

/* ─────────────────────────── Public modules ─────────────────────────── */

/// Bytecode primitives (chunk, assembler, disassembler, validation).
pub mod bytecode;

/// Re-export: structural validation helpers.
pub use bytecode::validate;
/// Re-export: textual disassembler.
pub use bytecode::disasm;
/// Re-export: minimal assembler.
pub use bytecode::asm;

/* ─────────────────────────── Common result ─────────────────────────── */

/// Result alias shared by the core.
pub type CoreResult<T> = core::result::Result<T, CoreError>;

/* ─────────────────────────── GVBC — constants & tags ─────────────────────────── */

/// Magic of a GVBC container: `b"GVBC\0\0"`.
pub const MAGIC_GVBC: &[u8; 6] = b"GVBC\0\0";

/// Current GVBC container version.
pub const GVBC_VERSION: u16 = 1;

/// Section tags (fourcc) — exactly 4 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SectionTag {
    /// CODE : chunk payload (optionally compressed)
    CODE = u32::from_be_bytes(*b"CODE"),
    /// NAME : labels (debug)
    NAME = u32::from_be_bytes(*b"NAME"),
    /// CRCC : CRC32 trailer (u32 LE)
    CRCC = u32::from_be_bytes(*b"CRCC"),
}

impl SectionTag {
    /// Returns the fourcc as 4 big-endian bytes.
    pub const fn to_be_bytes(self) -> [u8; 4] { (self as u32).to_be_bytes() }
    /// Reads a tag from 4 big-endian bytes.
    pub const fn from_be_bytes(b: [u8; 4]) -> Option<Self> {
        match u32::from_be_bytes(b) {
            x if x == SectionTag::CODE as u32 => Some(SectionTag::CODE),
            x if x == SectionTag::NAME as u32 => Some(SectionTag::NAME),
            x if x == SectionTag::CRCC as u32 => Some(SectionTag::CRCC),
            _ => None,
        }
    }
}

/* ─────────────────────────── CRC32 IEEE ─────────────────────────── */

/// CRC32 (IEEE 802.3) — compact table-free implementation.
pub fn crc32_ieee(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &b in data {
        let mut x = (crc ^ (b as u32)) & 0xFF;
        // 8 bitwise rounds — polynomial 0xEDB88320
        for _ in 0..8 {
            let mask = (x & 1).wrapping_neg() & 0xEDB8_8320;
            x = (x >> 1) ^ mask;
        }
        crc = (crc >> 8) ^ x;
    }
    !crc
}

/* ─────────────────────────── Byte Writer (LE) ─────────────────────────── */

/// Growable write buffer.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    pub fn new() -> Self { Self { buf: Vec::new() } }
    /// Read access to the content.
    pub fn as_slice(&self) -> &[u8] { &self.buf }
    /// Takes the buffer (consumes).
    pub fn into_vec(self) -> Vec<u8> { self.buf }
    /// Appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) { self.buf.extend_from_slice(bytes); }
    /// Writes a tag (fourcc big-endian).
    pub fn write_tag(&mut self, tag: SectionTag) { self.write_bytes(&tag.to_be_bytes()); }
    /// Writes a u16 little-endian.
    pub fn write_u16_le(&mut self, v: u16) { self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Writes a u32 little-endian.
    pub fn write_u32_le(&mut self, v: u32) { self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Writes a u64 little-endian.
    pub fn write_u64_le(&mut self, v: u64) { self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Writes an i64 little-endian.
    pub fn write_i64_le(&mut self, v: i64) { self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Writes an f64 little-endian.
    pub fn write_f64_le(&mut self, v: f64) { self.buf.extend_from_slice(&v.to_le_bytes()); }
}

/* ─────────────────────────── Byte Reader (LE) ─────────────────────────── */

/// Sequential reader over a byte slice (LE helpers).
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    off: usize,
}

impl<'a> ByteReader<'a> {
    /// Builds a reader.
    pub fn new(data: &'a [u8]) -> Self { Self { data, off: 0 } }
    /// Current offset.
    pub fn offset(&self) -> usize { self.off }
    /// Remaining size.
    pub fn remaining(&self) -> usize { self.data.len().saturating_sub(self.off) }

    /// Reads `n` bytes (or errors at EOF).
    pub fn read_bytes(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CoreError::UnexpectedEof { needed: n as u64, at: self.off as u64 });
        }
        let start = self.off;
        self.off += n;
        Ok(&self.data[start..self.off])
    }

    /// Reads a tag (fourcc big-endian).
    pub fn read_tag(&mut self) -> CoreResult<SectionTag> {
        let b = self.read_bytes(4)?;
        let arr = [b[0], b[1], b[2], b[3]];
        SectionTag::from_be_bytes(arr).ok_or(CoreError::InvalidSectionTag { raw: u32::from_be_bytes(arr) })
    }

    /// Reads a u16 LE.
    pub fn read_u16_le(&mut self) -> CoreResult<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Reads a u32 LE.
    pub fn read_u32_le(&mut self) -> CoreResult<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a u64 LE.
    pub fn read_u64_le(&mut self) -> CoreResult<u64> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    /// Reads an i64 LE.
    pub fn read_i64_le(&mut self) -> CoreResult<i64> { Ok(self.read_u64_le()? as i64) }

    /// Reads an f64 LE.
    pub fn read_f64_le(&mut self) -> CoreResult<f64> {
        let bits = self.read_u64_le()?;
        Ok(f64::from_bits(bits))
    }
}

/* ─────────────────────────── Errors ─────────────────────────── */

/// Low-level errors shared across the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid GVBC magic (expected `b"GVBC\0\0"`).
    InvalidMagic,
    /// Unknown section tag.
    InvalidSectionTag { /// Raw tag value.
        raw: u32
    },
    /// Unexpected end of buffer.
    UnexpectedEof { /// Missing byte count.
        needed: u64, /// Offset where the error occurred.
        at: u64
    },
    /// Invalid UTF-8.
    InvalidUtf8,
    /// Corrupted data (CRC / format).
    Corrupted(Cow<'static, str>),
}

impl CoreError {
    /// Builds a "corrupted" error.
    pub fn corrupted(msg: impl Into<Cow<'static, str>>) -> Self { CoreError::Corrupted(msg.into()) }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidMagic => write!(f, "invalid GVBC magic"),
            CoreError::InvalidSectionTag { raw } => write!(f, "invalid section tag: 0x{raw:08X}"),
            CoreError::UnexpectedEof { needed, at } => write!(f, "unexpected EOF: need {needed} bytes at {at}"),
            CoreError::InvalidUtf8 => write!(f, "invalid utf-8"),
            CoreError::Corrupted(msg) => write!(f, "corrupted: {msg}"),
        }
    }
}

/// `std::error::Error` only with the `std` feature.
#[cfg(feature = "std")]
impl std::error::Error for CoreError {}

/* ─────────────────────────── Prelude (useful reexports) ─────────────────────────── */

/// Convenient prelude importing the key types/funcs of the crate.
pub mod prelude {
    /// Useful re-exports for a quick import.
    pub use super::{
        bytecode::{Chunk, ChunkError, ChunkFlags, ConstPool, ConstValue, DebugInfo, LineTable, Op},
        crc32_ieee, ByteReader, ByteWriter, CoreError, CoreResult, SectionTag, GVBC_VERSION,
        MAGIC_GVBC,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_stable() {
        assert_eq!(crc32_ieee(b"hello"), crc32_ieee(b"hello"));
    }

    #[test]
    fn tags_roundtrip() {
        let t = SectionTag::CODE;
        assert_eq!(SectionTag::from_be_bytes(t.to_be_bytes()), Some(t));
    }

    #[test]
    fn unknown_tag_rejected() {
        assert_eq!(SectionTag::from_be_bytes(*b"ZZZZ"), None);
    }

    #[test]
    fn writer_reader_le() -> CoreResult<()> {
        let mut w = ByteWriter::new();
        w.write_u16_le(0xBEEF);
        w.write_u32_le(0xDEAD_BEEF);
        w.write_i64_le(-42);
        w.write_f64_le(3.5);
        w.write_tag(SectionTag::NAME);

        let mut r = ByteReader::new(w.as_slice());
        assert_eq!(r.read_u16_le()?, 0xBEEF);
        assert_eq!(r.read_u32_le()?, 0xDEAD_BEEF);
        assert_eq!(r.read_i64_le()?, -42);
        assert_eq!(r.read_f64_le()?, 3.5);
        assert_eq!(r.read_tag()?, SectionTag::NAME);
        assert_eq!(r.remaining(), 0);
        Ok(())
    }

    #[test]
    fn reader_eof() {
        let mut r = ByteReader::new(&[1, 2]);
        let err = r.read_u32_le().unwrap_err();
        assert_eq!(err, CoreError::UnexpectedEof { needed: 4, at: 0 });
    }
}
