//! givre-marshal — spec & IO of the GVBC binary container
//!
//! Format:
//! ```text
//! Header: "GVBC\0\0" (6 bytes) + version u16 LE
//! [Section*]
//!   section = TAG[4] + len u32 LE + payload
//! Last section: "CRCC" + u32 (CRC32 over everything after the header)
//! ```
//!
//! Supported sections:
//! - "CODE" : chunk payload (optionally zstd-compressed)
//! - "NAME" : labels (len u32 + bytes)*
//!
//! API:
//! - `Image::to_bytes()` / `from_bytes()`
//! - `dumps()` / `loads()` — the serializer/deserializer pair the harness
//!   treats as an opaque host primitive
//! - `write_file()`, `read_file()` (feature std)
//!
//! The format is owned entirely by this crate: a blob only round-trips
//! through a matching `dumps`/`loads` pair, anything else is rejected with a
//! deserialization error.

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
use std::{fs, io::Read, path::Path};

#[cfg(feature = "std")]
use std::{format, string::String, string::ToString, vec, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, string::ToString, vec, vec::Vec};

use givre_core::{
    bytecode::{Chunk, ChunkError},
    crc32_ieee, ByteReader, ByteWriter, CoreError, CoreResult, SectionTag, GVBC_VERSION,
    MAGIC_GVBC,
};

#[cfg(feature = "zstd")]
use zstd::bulk;

/// In-memory representation of a GVBC container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    /// Container format version.
    pub version: u16,
    /// Chunk payload (encoded bytes).
    pub code: Vec<u8>,
    /// Labels (debug).
    pub names: Vec<String>,
    /// Expected CRC32 (computed on write / checked on read).
    pub crc32: u32,
}

impl Image {
    /// Serializes to GVBC binary (with CRC32 trailer).
    pub fn to_bytes(&self, compress_code: bool) -> CoreResult<Vec<u8>> {
        let mut w = ByteWriter::new();

        // Magic + version
        w.write_bytes(MAGIC_GVBC);
        w.write_u16_le(self.version);

        // CODE
        if !self.code.is_empty() {
            w.write_tag(SectionTag::CODE);
            let payload: Vec<u8>;
            #[cfg(feature = "zstd")]
            {
                if compress_code {
                    payload = bulk::compress(&self.code, 3).unwrap_or_else(|_| self.code.clone());
                } else {
                    payload = self.code.clone();
                }
            }
            #[cfg(not(feature = "zstd"))]
            {
                let _ = compress_code;
                payload = self.code.clone();
            }
            w.write_u32_le(payload.len() as u32);
            w.write_bytes(&payload);
        }

        // NAME
        if !self.names.is_empty() {
            w.write_tag(SectionTag::NAME);
            let mut buf = ByteWriter::new();
            for s in &self.names {
                buf.write_u32_le(s.len() as u32);
                buf.write_bytes(s.as_bytes());
            }
            w.write_u32_le(buf.as_slice().len() as u32);
            w.write_bytes(buf.as_slice());
        }

        // CRC32 over everything except magic/version
        let bytes = w.into_vec();
        let crc = crc32_ieee(&bytes[6..]);
        let mut out = bytes;
        out.extend_from_slice(&SectionTag::CRCC.to_be_bytes());
        out.extend_from_slice(&crc.to_le_bytes());

        Ok(out)
    }

    /// Rebuilds an image from GVBC bytes.
    pub fn from_bytes(data: &[u8]) -> CoreResult<Self> {
        let mut r = ByteReader::new(data);
        let magic = r.read_bytes(6)?;
        if magic != MAGIC_GVBC {
            return Err(CoreError::InvalidMagic);
        }
        let version = r.read_u16_le()?;
        if version != GVBC_VERSION {
            return Err(CoreError::corrupted(format!("unsupported GVBC version {version}")));
        }

        let mut image = Image { version, ..Image::default() };
        let mut sealed = false;

        while r.remaining() > 0 {
            let tag = r.read_tag()?;
            if tag == SectionTag::CRCC {
                let expected = r.read_u32_le()?;
                // 6 = magic+version, 8 = CRCC fourcc + u32
                let crc = crc32_ieee(&data[6..data.len() - 8]);
                if expected != crc {
                    return Err(CoreError::corrupted("CRC32 mismatch"));
                }
                image.crc32 = expected;
                sealed = true;
                break;
            }
            let len = r.read_u32_le()? as usize;
            let payload = r.read_bytes(len)?;
            match tag {
                SectionTag::CODE => {
                    #[cfg(feature = "zstd")]
                    {
                        if let Ok(decomp) = bulk::decompress(payload, MAX_CODE_SIZE) {
                            image.code = decomp;
                        } else {
                            image.code = payload.to_vec();
                        }
                    }
                    #[cfg(not(feature = "zstd"))]
                    {
                        image.code = payload.to_vec();
                    }
                }
                SectionTag::NAME => {
                    let mut rr = ByteReader::new(payload);
                    while rr.remaining() > 0 {
                        let l = rr.read_u32_le()? as usize;
                        let s = rr.read_bytes(l)?;
                        image.names.push(
                            core::str::from_utf8(s)
                                .map_err(|_| CoreError::InvalidUtf8)?
                                .to_string(),
                        );
                    }
                }
                SectionTag::CRCC => unreachable!("handled above"),
            }
        }

        if !sealed {
            return Err(CoreError::corrupted("missing CRCC trailer"));
        }

        Ok(image)
    }

    /// Writes to a file (requires std).
    #[cfg(feature = "std")]
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> CoreResult<()> {
        let bytes = self.to_bytes(false)?;
        fs::write(path, bytes).map_err(|e| CoreError::corrupted(format!("io write error: {e}")))
    }

    /// Reads an image from a file (requires std).
    #[cfg(feature = "std")]
    pub fn read_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let mut buf = Vec::new();
        let mut file =
            fs::File::open(path).map_err(|e| CoreError::corrupted(format!("io open error: {e}")))?;
        file.read_to_end(&mut buf)
            .map_err(|e| CoreError::corrupted(format!("io read error: {e}")))?;
        Self::from_bytes(&buf)
    }
}

/// Upper bound for a decompressed CODE section.
#[cfg(feature = "zstd")]
const MAX_CODE_SIZE: usize = 64 << 20;

/// Packs a chunk (labelled `name`) into a GVBC blob.
///
/// This is the fast-path "compile" output: the blob is only meaningful to a
/// matching [`loads`].
pub fn dumps(chunk: &Chunk, name: &str) -> CoreResult<Vec<u8>> {
    let image = Image {
        version: GVBC_VERSION,
        code: chunk.to_bytes(),
        names: vec![name.to_string()],
        crc32: 0,
    };
    image.to_bytes(false)
}

/// Unpacks a GVBC blob back into an executable chunk.
///
/// If the chunk itself carries no source label (stripped debug payload), the
/// first NAME entry of the container is used instead.
pub fn loads(data: &[u8]) -> CoreResult<Chunk> {
    let image = Image::from_bytes(data)?;
    if image.code.is_empty() {
        return Err(CoreError::corrupted("empty CODE section"));
    }
    let mut chunk = Chunk::from_bytes(&image.code).map_err(chunk_to_core)?;
    if chunk.debug.main_file.is_none() {
        chunk.debug.main_file = image.names.first().cloned();
    }
    Ok(chunk)
}

fn chunk_to_core(err: ChunkError) -> CoreError {
    match err {
        ChunkError::Format(msg) => CoreError::corrupted(msg),
        ChunkError::HashMismatch { .. } => CoreError::corrupted("chunk CRC32 mismatch"),
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
