//! Structural validation reused by the harness and tests.

use crate::{bytecode::chunk::{Chunk, Op}, CoreError, CoreResult};

#[cfg(not(feature = "std"))]
use alloc::format;

/// Basic structural validation of a chunk.
///
/// Checks stay lightweight: const indices must be in range and the metadata
/// tables must stay coherent with the op list.
pub fn validate_chunk(chunk: &Chunk) -> CoreResult<()> {
    if chunk.ops.len() != chunk.lines.len() {
        return Err(CoreError::corrupted("line/op length mismatch"));
    }

    let const_count = chunk.consts.len() as u32;
    for (pc, op) in chunk.ops.iter().enumerate() {
        if let Op::LoadConst(ix) = *op {
            if ix >= const_count {
                return Err(CoreError::corrupted(format!(
                    "op {pc} references const {ix} but pool size is {const_count}"
                )));
            }
        }
    }

    for (name, pc) in &chunk.debug.symbols {
        if (*pc as usize) >= chunk.ops.len() {
            return Err(CoreError::corrupted(format!(
                "symbol `{name}` points to invalid pc {pc}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::chunk::{ChunkFlags, ConstValue};

    #[test]
    fn accepts_coherent_chunk() {
        let mut chunk = Chunk::new(ChunkFlags::default());
        let ix = chunk.add_const(ConstValue::Str("ok".into()));
        chunk.push_op(Op::LoadConst(ix), 1);
        chunk.push_op(Op::Pop, 1);
        assert!(validate_chunk(&chunk).is_ok());
    }

    #[test]
    fn rejects_out_of_range_const() {
        let mut chunk = Chunk::new(ChunkFlags::default());
        chunk.push_op(Op::LoadConst(3), 1);
        assert!(validate_chunk(&chunk).is_err());
    }

    #[test]
    fn rejects_dangling_symbol() {
        let mut chunk = Chunk::new(ChunkFlags::default());
        chunk.push_op(Op::Return, 1);
        chunk.debug.symbols.push(("main".into(), 9));
        assert!(validate_chunk(&chunk).is_err());
    }
}
