//! givre-harness — code-object benchmark harness
//!
//! Measures the cost of bringing a compiled code object to life under two
//! runtime configurations and of executing it repeatedly:
//!
//! - [`RuntimeKind::Alternative`] — the fast path: a host compiler produces a
//!   GVBC blob which is unmarshalled back into a chunk.
//! - [`RuntimeKind::Reference`] — the fallback path: the source is assembled
//!   directly and a disassembly listing is written to a diagnostic sink.
//!
//! Either way the harness ends up holding one immutable [`CodeObject`] which
//! [`Harness::measure`] executes `num` times in a plain sequential loop,
//! discarding results. Timing is the caller's job (see `benchmarks/`): the
//! harness itself has no clocks, no retries and no recovery — a setup failure
//! must abort loudly rather than invalidate the numbers.
//!
//! - `RuntimeKind`   : explicit two-variant configuration, injected once
//! - `CodeObject`    : capability interface over the two acquisition paths
//! - `BlobCompiler`  : port for the host "compile to blob" primitive
//! - `Harness`       : acquire + measure + the default-5 benchmark entry

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use givre_core::asm::{self, AsmError};
use givre_core::bytecode::{Chunk, ChunkError};
use givre_core::{disasm, validate, CoreError};
use givre_vm::{Vm, VmError};

/* ------------------------------- Constants ------------------------------- */

/// Iteration count used by [`Harness::run_benchmark`].
pub const DEFAULT_ITERATIONS: u64 = 5;

/// Label of the fixed sample workload.
pub const SAMPLE_NAME: &str = "bench.gv";

/// The fixed sample workload: computes and discards a string length.
///
/// Nothing in it can fail at execution time, so the measured loop is pure
/// interpreter overhead.
pub const SAMPLE_SOURCE: &str = "\
; computes and discards a string length
LOAD_CONST \"givre\"
LEN
POP
RETURN
";

/* ------------------------------ Runtime kind ------------------------------ */

/// The active runtime configuration, selected once at startup and injected.
///
/// This replaces name-string sniffing: callers that hold an environment name
/// can go through [`FromStr`], everything downstream branches on the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeKind {
    /// Compile the source directly; emit a disassembly listing.
    Reference,
    /// Compile to a GVBC blob, then unmarshal it.
    Alternative,
}

impl RuntimeKind {
    /// True iff the blob/unmarshal path is active.
    pub fn is_alternative(self) -> bool { matches!(self, RuntimeKind::Alternative) }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeKind::Reference => write!(f, "reference"),
            RuntimeKind::Alternative => write!(f, "alternative"),
        }
    }
}

impl FromStr for RuntimeKind {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reference" => Ok(RuntimeKind::Reference),
            "alternative" => Ok(RuntimeKind::Alternative),
            other => Err(HarnessError::UnknownKind(other.into())),
        }
    }
}

/* --------------------------------- Errors --------------------------------- */

/// Errors surfaced by the harness. All fatal; nothing is retried.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Source text failed to assemble (fallback path).
    #[error("compile failed: {0}")]
    Compile(#[from] AsmError),

    /// A GVBC blob or a decoded chunk was rejected.
    #[error("code object rejected: {0}")]
    Code(#[from] CoreError),

    /// The chunk payload inside a blob did not decode.
    #[error("chunk payload rejected: {0}")]
    Chunk(#[from] ChunkError),

    /// The code object failed while executing.
    #[error("execution failed: {0}")]
    Exec(#[from] VmError),

    /// The disassembly sink failed.
    #[error("disassembly sink: {0}")]
    Io(#[from] io::Error),

    /// A runtime name did not match any [`RuntimeKind`].
    #[error("unknown runtime kind `{0}`")]
    UnknownKind(String),
}

/// Result alias for harness operations.
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

/* -------------------------------- CodeObject ------------------------------- */

/// An acquired, immutable code object ready for repeated execution.
///
/// The two implementations differ only in how they came to hold their chunk;
/// execution goes through the same VM either way.
pub trait CodeObject: Send {
    /// Diagnostic label (source name).
    fn label(&self) -> &str;
    /// Executes the code once on the given VM, discarding results.
    fn execute(&self, vm: &mut Vm) -> Result<(), VmError>;
}

/// Code object produced by assembling source text (fallback path).
#[derive(Debug)]
pub struct FreshCode {
    label: String,
    chunk: Chunk,
}

impl FreshCode {
    /// Assembles `source` under `name`, writing a disassembly listing to
    /// `listing` as a diagnostic side effect.
    ///
    /// On failure nothing is written to `listing`.
    pub fn compile(name: &str, source: &str, listing: &mut dyn Write) -> HarnessResult<Self> {
        let chunk = asm::assemble(name, source)?;
        validate::validate_chunk(&chunk)?;
        listing.write_all(disasm::disassemble_full(&chunk, name).as_bytes())?;
        Ok(Self { label: name.to_string(), chunk })
    }
}

impl CodeObject for FreshCode {
    fn label(&self) -> &str { &self.label }
    fn execute(&self, vm: &mut Vm) -> Result<(), VmError> { vm.run(&self.chunk) }
}

/// Code object unmarshalled from a GVBC blob (fast path).
#[derive(Debug)]
pub struct UnmarshalledCode {
    label: String,
    chunk: Chunk,
}

impl UnmarshalledCode {
    /// Unmarshals a blob produced by a matching serializer.
    pub fn from_blob(blob: &[u8]) -> HarnessResult<Self> {
        let chunk = givre_marshal::loads(blob)?;
        validate::validate_chunk(&chunk)?;
        let label = chunk.debug.main_file.clone().unwrap_or_else(|| "<anonymous>".to_string());
        Ok(Self { label, chunk })
    }
}

impl CodeObject for UnmarshalledCode {
    fn label(&self) -> &str { &self.label }
    fn execute(&self, vm: &mut Vm) -> Result<(), VmError> { vm.run(&self.chunk) }
}

/* ------------------------------- BlobCompiler ------------------------------ */

/// Port for the host-provided "compile straight to blob" primitive.
///
/// The harness treats the blob as opaque; it only hands it to
/// [`UnmarshalledCode::from_blob`].
pub trait BlobCompiler {
    /// Compiles `source` under `name` into a serialized code object.
    fn compile_blob(&self, name: &str, source: &str) -> HarnessResult<Vec<u8>>;
}

/// Default implementation: assemble, then pack into a GVBC container.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarshalCompiler;

impl BlobCompiler for MarshalCompiler {
    fn compile_blob(&self, name: &str, source: &str) -> HarnessResult<Vec<u8>> {
        let chunk = asm::assemble(name, source)?;
        Ok(givre_marshal::dumps(&chunk, name)?)
    }
}

/* --------------------------------- Harness --------------------------------- */

/// The benchmark harness: one code object, one VM, a measuring loop.
pub struct Harness {
    kind: RuntimeKind,
    code: Box<dyn CodeObject>,
    vm: Vm,
}

impl Harness {
    /// Acquires a code object for `kind` using the default collaborators:
    /// [`MarshalCompiler`] for blobs, stdout for the disassembly listing.
    pub fn acquire(kind: RuntimeKind, name: &str, source: &str) -> HarnessResult<Self> {
        Self::acquire_with(kind, name, source, &MarshalCompiler, &mut io::stdout())
    }

    /// Acquires a code object with injected collaborators.
    pub fn acquire_with(
        kind: RuntimeKind,
        name: &str,
        source: &str,
        compiler: &dyn BlobCompiler,
        listing: &mut dyn Write,
    ) -> HarnessResult<Self> {
        let code: Box<dyn CodeObject> = if kind.is_alternative() {
            let blob = compiler.compile_blob(name, source)?;
            debug!(%kind, name, blob_len = blob.len(), "acquired code object via unmarshal");
            Box::new(UnmarshalledCode::from_blob(&blob)?)
        } else {
            let fresh = FreshCode::compile(name, source, listing)?;
            debug!(%kind, name, "acquired code object via direct compile");
            Box::new(fresh)
        };

        Ok(Self { kind, code, vm: Vm::new() })
    }

    /// Acquires the fixed sample workload.
    pub fn acquire_sample(kind: RuntimeKind) -> HarnessResult<Self> {
        Self::acquire(kind, SAMPLE_NAME, SAMPLE_SOURCE)
    }

    /// Replaces the VM (e.g. with one whose output is captured).
    pub fn with_vm(mut self, vm: Vm) -> Self {
        self.vm = vm;
        self
    }

    /// Active runtime configuration.
    pub fn kind(&self) -> RuntimeKind { self.kind }

    /// Label of the held code object.
    pub fn label(&self) -> &str { self.code.label() }

    /// Cumulative ops executed by the harness VM (test/diagnostic hook).
    pub fn executed_ops(&self) -> u64 { self.vm.executed_ops() }

    /// Executes the held code object exactly `num` times, sequentially.
    ///
    /// `num = 0` is a no-op. No state accumulates between calls: repeated
    /// invocations with the same `num` perform the same work each time.
    pub fn measure(&mut self, num: u64) -> HarnessResult<()> {
        for _ in 0..num {
            self.code.execute(&mut self.vm)?;
        }
        Ok(())
    }

    /// External benchmark entry point: [`Harness::measure`] with
    /// [`DEFAULT_ITERATIONS`].
    pub fn run_benchmark(&mut self) -> HarnessResult<()> {
        self.measure(DEFAULT_ITERATIONS)
    }
}

/* --------------------------------- Prelude --------------------------------- */

/// Convenient one-shot import.
pub mod prelude {
    pub use crate::{
        BlobCompiler, CodeObject, FreshCode, Harness, HarnessError, HarnessResult,
        MarshalCompiler, RuntimeKind, UnmarshalledCode, DEFAULT_ITERATIONS, SAMPLE_NAME,
        SAMPLE_SOURCE,
    };
}

/* ---------------------------------- Tests ---------------------------------- */
