//! Small line-oriented assembler producing a [`Chunk`].
//!
//! The supported syntax is intentionally tiny:
//!
//! ```text
//! ; the fixed benchmark workload
//! LOAD_CONST "givre"
//! LEN
//! POP
//! RETURN
//! ```
//!
//! Instruction set:
//! - `CONST "foo"` adds a constant without emitting an opcode.
//! - `LOAD_CONST "foo"` adds a constant and emits `LoadConst`.
//! - `LOAD <idx>` loads an explicit constant index.
//! - `LEN`, `POP`, `PRINT`, `RETURN` emit the bare opcode.
//! - Lines beginning with `;` are ignored as comments.
//!
//! Failure is fatal for the caller: a source that does not assemble is a
//! configuration error, never retried.

use crate::bytecode::chunk::{Chunk, ChunkFlags, ConstValue, Op};

#[cfg(not(feature = "std"))]
use alloc::string::{String, ToString};
#[cfg(feature = "std")]
use std::string::{String, ToString};

use core::fmt;

/// Errors produced while assembling source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// The instruction mnemonic is not part of the supported set.
    UnknownInstruction {
        /// 1-based source line.
        line: u32,
        /// Offending text.
        found: String,
    },
    /// A quoted string literal was expected.
    ExpectedString {
        /// 1-based source line.
        line: u32,
    },
    /// A string literal ends inside an escape sequence.
    UnterminatedEscape {
        /// 1-based source line.
        line: u32,
    },
    /// `LOAD` was not followed by a numeric constant index.
    BadIndex {
        /// 1-based source line.
        line: u32,
        /// Offending text.
        found: String,
    },
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmError::UnknownInstruction { line, found } => {
                write!(f, "line {line}: unsupported instruction `{found}`")
            }
            AsmError::ExpectedString { line } => write!(f, "line {line}: string literal expected"),
            AsmError::UnterminatedEscape { line } => {
                write!(f, "line {line}: incomplete escape sequence")
            }
            AsmError::BadIndex { line, found } => {
                write!(f, "line {line}: LOAD expects an index, got `{found}`")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AsmError {}

/// Assembles a source snippet into a [`Chunk`] labelled `name`.
pub fn assemble(name: &str, source: &str) -> Result<Chunk, AsmError> {
    let mut chunk = Chunk::new(ChunkFlags { stripped: false });
    chunk.debug.main_file = Some(name.to_string());

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("CONST ") {
            let value = parse_string_literal(rest.trim(), line_no)?;
            chunk.add_const(ConstValue::Str(value));
            continue;
        }

        if let Some(rest) = line.strip_prefix("LOAD_CONST ") {
            let value = parse_string_literal(rest.trim(), line_no)?;
            let ix = chunk.add_const(ConstValue::Str(value));
            chunk.push_op(Op::LoadConst(ix), line_no);
            continue;
        }

        if let Some(rest) = line.strip_prefix("LOAD ") {
            let ix = rest.trim().parse::<u32>().map_err(|_| AsmError::BadIndex {
                line: line_no,
                found: rest.trim().to_string(),
            })?;
            chunk.push_op(Op::LoadConst(ix), line_no);
            continue;
        }

        match line.to_ascii_uppercase().as_str() {
            "LEN" => chunk.push_op(Op::Len, line_no),
            "POP" => chunk.push_op(Op::Pop, line_no),
            "PRINT" => chunk.push_op(Op::Print, line_no),
            "RETURN" => chunk.push_op(Op::Return, line_no),
            other => {
                return Err(AsmError::UnknownInstruction {
                    line: line_no,
                    found: other.to_string(),
                });
            }
        }
    }

    Ok(chunk)
}

fn parse_string_literal(input: &str, line: u32) -> Result<String, AsmError> {
    let bytes = input.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'"' || bytes[bytes.len() - 1] != b'"' {
        return Err(AsmError::ExpectedString { line });
    }

    // Both quotes are single-byte ASCII, so the inner slice stays valid UTF-8.
    let mut out = String::new();
    let mut escaping = false;
    for c in input[1..input.len() - 1].chars() {
        if escaping {
            out.push(match c {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            escaping = false;
            continue;
        }
        if c == '\\' {
            escaping = true;
        } else {
            out.push(c);
        }
    }

    if escaping {
        return Err(AsmError::UnterminatedEscape { line });
    }

    Ok(out)
}
