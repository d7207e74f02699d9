//! givre-vm — stack interpreter for [`Chunk`] code objects
//!
//! The VM is deliberately small: a value stack, an output sink and a
//! cumulative op counter. A chunk is immutable while it runs; the stack is
//! reset on every [`Vm::run`] so repeated executions are independent, which
//! is what the benchmark harness relies on.
//!
//! - `Vm`      : the interpreter, with an injectable (capturable) output sink
//! - `VmError` : execution failures, surfaced directly, never caught here
//! - `Captured`: a writer that collects output into a `String` for tests

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

use std::fmt::Write as _;
use std::io::{self, Write};

use thiserror::Error;

use givre_core::bytecode::{Chunk, ConstValue, Op};

/* --------------------------------- Errors --------------------------------- */

/// Errors raised while executing a chunk.
#[derive(Debug, Error)]
pub enum VmError {
    /// An op referenced a constant index outside the pool.
    #[error("unknown constant {index} (pool size {pool})")]
    UnknownConst {
        /// Index requested by the op.
        index: u32,
        /// Actual pool size.
        pool: usize,
    },

    /// An op needed more stack values than were present.
    #[error("stack underflow at pc {pc}")]
    StackUnderflow {
        /// Program counter of the faulting op.
        pc: usize,
    },

    /// `Len` was applied to a value with no length.
    #[error("LEN expects a string or bytes value at pc {pc}, got {got}")]
    LenType {
        /// Program counter of the faulting op.
        pc: usize,
        /// Short description of the offending value.
        got: &'static str,
    },

    /// The output sink failed.
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for VM operations.
pub type VmResult<T> = std::result::Result<T, VmError>;

/* ----------------------------------- Vm ----------------------------------- */

/// Stack interpreter over a [`Chunk`].
///
/// The value stack is reused across runs to avoid per-execution allocation;
/// it is cleared at the start of every run.
pub struct Vm {
    stack: Vec<ConstValue>,
    out: Box<dyn Write + Send>,
    executed: u64,
}

impl Default for Vm {
    fn default() -> Self { Self::new() }
}

impl Vm {
    /// Creates a VM writing `Print` output to the real stdout.
    pub fn new() -> Self {
        Self { stack: Vec::new(), out: Box::new(io::stdout()), executed: 0 }
    }

    /// Variant useful in tests: output is captured.
    pub fn with_captured_output() -> (Self, Captured) {
        let cap = Captured::default();
        let vm = Self { stack: Vec::new(), out: Box::new(cap.clone()), executed: 0 };
        (vm, cap)
    }

    /// Injects a custom writer (buffer, file, ...).
    pub fn with_output<W: Write + Send + 'static>(mut self, w: W) -> Self {
        self.out = Box::new(w);
        self
    }

    /// Cumulative number of ops executed over the VM's lifetime.
    pub fn executed_ops(&self) -> u64 { self.executed }

    /// Executes a chunk to completion (`Return` or end of op list).
    ///
    /// All computed values are discarded; the only observable effects are
    /// `Print` output and the op counter.
    pub fn run(&mut self, chunk: &Chunk) -> VmResult<()> {
        #[cfg(feature = "tracing")]
        tracing::trace!(ops = chunk.ops.len(), consts = chunk.consts.len(), "executing chunk");

        self.stack.clear();

        for (pc, op) in chunk.ops.iter().enumerate() {
            self.executed += 1;
            match *op {
                Op::LoadConst(ix) => {
                    let value = chunk.consts.get(ix).ok_or(VmError::UnknownConst {
                        index: ix,
                        pool: chunk.consts.len(),
                    })?;
                    self.stack.push(value.clone());
                }
                Op::Len => {
                    let value = self.stack.pop().ok_or(VmError::StackUnderflow { pc })?;
                    let len = match value {
                        ConstValue::Str(s) => s.len() as i64,
                        ConstValue::Bytes(b) => b.len() as i64,
                        other => {
                            return Err(VmError::LenType { pc, got: describe(&other) });
                        }
                    };
                    self.stack.push(ConstValue::I64(len));
                }
                Op::Pop => {
                    self.stack.pop().ok_or(VmError::StackUnderflow { pc })?;
                }
                Op::Print => {
                    let value = self.stack.pop().ok_or(VmError::StackUnderflow { pc })?;
                    let mut text = format_const(&value);
                    text.push('\n');
                    self.out.write_all(text.as_bytes())?;
                }
                Op::Return => break,
            }
        }

        Ok(())
    }
}

fn describe(value: &ConstValue) -> &'static str {
    match value {
        ConstValue::Null => "null",
        ConstValue::Bool(_) => "bool",
        ConstValue::I64(_) => "i64",
        ConstValue::F64(_) => "f64",
        ConstValue::Str(_) => "str",
        ConstValue::Bytes(_) => "bytes",
    }
}

fn format_const(value: &ConstValue) -> String {
    match value {
        ConstValue::Null => "null".into(),
        ConstValue::Bool(b) => format!("{b}"),
        ConstValue::I64(i) => format!("{i}"),
        ConstValue::F64(f) => format!("{f}"),
        ConstValue::Str(s) => s.clone(),
        ConstValue::Bytes(bytes) => {
            let mut out = String::new();
            let _ = write!(out, "<bytes:{}>", bytes.len());
            out
        }
    }
}

/* --------------------------- Output capture tool --------------------------- */

/// Small writer that captures output into a `String` (useful in tests).
#[derive(Default, Clone)]
pub struct Captured(std::sync::Arc<std::sync::Mutex<String>>);

impl Captured {
    /// Returns the buffer (copy).
    pub fn get(&self) -> String { self.0.lock().map(|s| s.clone()).unwrap_or_default() }
    /// Resets the buffer.
    pub fn clear(&self) {
        if let Ok(mut s) = self.0.lock() {
            s.clear();
        }
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        if let Ok(mut s) = self.0.lock() {
            s.push_str(&text);
        }
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/* --------------------------------- Prelude --------------------------------- */

/// Convenient one-shot import.
pub mod prelude {
    pub use crate::{Captured, Vm, VmError, VmResult};
}

/* ---------------------------------- Tests ---------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use givre_core::bytecode::ChunkFlags;
    use pretty_assertions::assert_eq;

    fn length_workload() -> Chunk {
        let mut chunk = Chunk::new(ChunkFlags::default());
        let ix = chunk.add_const(ConstValue::Str("givre".into()));
        chunk.push_op(Op::LoadConst(ix), 1);
        chunk.push_op(Op::Len, 2);
        chunk.push_op(Op::Pop, 3);
        chunk.push_op(Op::Return, 4);
        chunk
    }

    #[test]
    fn length_workload_never_fails() {
        let mut vm = Vm::new().with_output(std::io::sink());
        for _ in 0..10 {
            vm.run(&length_workload()).unwrap();
        }
        assert_eq!(vm.executed_ops(), 40);
    }

    #[test]
    fn print_goes_to_the_sink() {
        let (mut vm, cap) = Vm::with_captured_output();
        let mut chunk = Chunk::new(ChunkFlags::default());
        let ix = chunk.add_const(ConstValue::Str("hello".into()));
        chunk.push_op(Op::LoadConst(ix), 1);
        chunk.push_op(Op::Print, 1);
        vm.run(&chunk).unwrap();
        assert_eq!(cap.get(), "hello\n");
    }

    #[test]
    fn return_stops_execution() {
        let (mut vm, cap) = Vm::with_captured_output();
        let mut chunk = Chunk::new(ChunkFlags::default());
        let ix = chunk.add_const(ConstValue::Str("after".into()));
        chunk.push_op(Op::Return, 1);
        chunk.push_op(Op::LoadConst(ix), 2);
        chunk.push_op(Op::Print, 2);
        vm.run(&chunk).unwrap();
        assert_eq!(cap.get(), "");
        // Return itself counts as executed.
        assert_eq!(vm.executed_ops(), 1);
    }

    #[test]
    fn stack_underflow_reported() {
        let mut vm = Vm::new().with_output(std::io::sink());
        let mut chunk = Chunk::new(ChunkFlags::default());
        chunk.push_op(Op::Pop, 1);
        let err = vm.run(&chunk).unwrap_err();
        assert!(matches!(err, VmError::StackUnderflow { pc: 0 }));
    }

    #[test]
    fn len_rejects_numbers() {
        let mut vm = Vm::new().with_output(std::io::sink());
        let mut chunk = Chunk::new(ChunkFlags::default());
        let ix = chunk.add_const(ConstValue::I64(42));
        chunk.push_op(Op::LoadConst(ix), 1);
        chunk.push_op(Op::Len, 1);
        let err = vm.run(&chunk).unwrap_err();
        assert!(matches!(err, VmError::LenType { pc: 1, got: "i64" }));
    }

    #[test]
    fn missing_const_reported() {
        let mut vm = Vm::new().with_output(std::io::sink());
        let mut chunk = Chunk::new(ChunkFlags::default());
        chunk.push_op(Op::LoadConst(5), 1);
        let err = vm.run(&chunk).unwrap_err();
        assert!(matches!(err, VmError::UnknownConst { index: 5, pool: 0 }));
    }

    #[test]
    fn runs_are_independent() {
        let (mut vm, cap) = Vm::with_captured_output();
        let mut chunk = Chunk::new(ChunkFlags::default());
        let ix = chunk.add_const(ConstValue::Str("x".into()));
        chunk.push_op(Op::LoadConst(ix), 1);
        chunk.push_op(Op::Print, 1);

        vm.run(&chunk).unwrap();
        vm.run(&chunk).unwrap();
        assert_eq!(cap.get(), "x\nx\n");
    }
}
