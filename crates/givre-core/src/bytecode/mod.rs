//! Bytecode primitives (chunk structure, validation, asm/disasm).
//!
//! The chunk is the unit the whole workspace revolves around: the assembler
//! produces one, the marshal container carries one, the VM executes one.

/// Chunk representation plus binary roundtrip helpers.
pub mod chunk;
pub mod validate;
pub mod disasm;
pub mod asm;

pub use chunk::{Chunk, ChunkError, ChunkFlags, ConstPool, ConstValue, DebugInfo, LineTable, Op};
