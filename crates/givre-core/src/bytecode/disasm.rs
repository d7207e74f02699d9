//! Textual disassembly of a [`Chunk`].
//!
//! The listing is a diagnostic side effect only; nothing downstream parses it.

use crate::bytecode::chunk::{Chunk, ConstValue, Op};

#[cfg(not(feature = "std"))]
use alloc::{format, string::String};
#[cfg(feature = "std")]
use std::{format, string::String};

use core::fmt::Write;

/// Produces a multi-line, human readable disassembly with metadata.
pub fn disassemble_full(chunk: &Chunk, title: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "== {title} == (version={}, stripped={}, consts={}, ops={})",
        chunk.version(),
        chunk.flags().stripped,
        chunk.consts.len(),
        chunk.ops.len()
    );

    if let Some(main) = &chunk.debug.main_file {
        let _ = writeln!(out, ";; source: {main}");
    }
    if !chunk.debug.symbols.is_empty() {
        let _ = writeln!(out, ";; symbols: {:?}", chunk.debug.symbols);
    }

    if !chunk.consts.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, ";; constants");
        for (idx, value) in chunk.consts.iter() {
            let _ = writeln!(out, "const[{idx:04}] = {}", show_const(value));
        }
    }

    if !chunk.lines.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, ";; lines");
        for (pcs, line) in chunk.lines.iter_ranges() {
            let _ = writeln!(out, "{:04}..{:04} -> line {line}", pcs.start, pcs.end);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, ";; ops");
    for (pc, op) in chunk.ops.iter().enumerate() {
        let line = chunk.lines.line_for_pc(pc as u32);
        let preview = match *op {
            Op::LoadConst(ix) => chunk.consts.get(ix).map(show_const),
            _ => None,
        };
        match preview {
            Some(p) => {
                let _ = writeln!(out, "{:04} | {:4} | {} ;; {p}", pc, line, mnemonic(op));
            }
            None => {
                let _ = writeln!(out, "{:04} | {:4} | {}", pc, line, mnemonic(op));
            }
        }
    }

    out
}

fn mnemonic(op: &Op) -> String {
    match *op {
        Op::LoadConst(ix) => format!("LOAD_CONST {ix}"),
        Op::Len => "LEN".into(),
        Op::Pop => "POP".into(),
        Op::Print => "PRINT".into(),
        Op::Return => "RETURN".into(),
    }
}

fn show_const(value: &ConstValue) -> String {
    match value {
        ConstValue::Null => "null".into(),
        ConstValue::Bool(b) => format!("{}", b),
        ConstValue::I64(i) => format!("{}", i),
        ConstValue::F64(f) => format!("{}", f),
        ConstValue::Str(s) => {
            if s.len() <= 64 {
                format!("\"{}\"", s)
            } else {
                // Back off to a char boundary so multi-byte chars never split.
                let mut cut = 64;
                while !s.is_char_boundary(cut) {
                    cut -= 1;
                }
                format!("\"{}...\"", &s[..cut])
            }
        }
        ConstValue::Bytes(bytes) => format!("bytes[{}]", bytes.len()),
    }
}
