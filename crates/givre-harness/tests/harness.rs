//! End-to-end coverage of the benchmark harness: acquisition under both
//! runtime configurations, exact iteration counts, repeatability.

use anyhow::Result;
use pretty_assertions::assert_eq;

use givre_harness::prelude::*;
use givre_vm::Vm;

/// Ops in the fixed sample workload (LOAD_CONST, LEN, POP, RETURN).
const SAMPLE_OPS: u64 = 4;

fn init_tracing() {
    // RUST_LOG=givre_harness=debug to see acquisition events.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn quiet_harness(kind: RuntimeKind) -> Result<Harness> {
    init_tracing();
    let harness = Harness::acquire_with(
        kind,
        SAMPLE_NAME,
        SAMPLE_SOURCE,
        &MarshalCompiler,
        &mut std::io::sink(),
    )?;
    Ok(harness.with_vm(Vm::new().with_output(std::io::sink())))
}

#[test]
fn sample_executes_under_both_kinds() -> Result<()> {
    for kind in [RuntimeKind::Reference, RuntimeKind::Alternative] {
        let mut harness = quiet_harness(kind)?;
        harness.measure(5)?;
        assert_eq!(harness.kind(), kind);
        assert_eq!(harness.label(), SAMPLE_NAME);
    }
    Ok(())
}

#[test]
fn measure_runs_exactly_num_times() -> Result<()> {
    let mut harness = quiet_harness(RuntimeKind::Alternative)?;
    harness.measure(3)?;
    assert_eq!(harness.executed_ops(), 3 * SAMPLE_OPS);
    harness.measure(2)?;
    assert_eq!(harness.executed_ops(), 5 * SAMPLE_OPS);
    Ok(())
}

#[test]
fn measure_zero_is_a_noop() -> Result<()> {
    let mut harness = quiet_harness(RuntimeKind::Reference)?;
    harness.measure(0)?;
    assert_eq!(harness.executed_ops(), 0);
    Ok(())
}

#[test]
fn default_entry_runs_five_times() -> Result<()> {
    let mut harness = quiet_harness(RuntimeKind::Alternative)?;
    harness.run_benchmark()?;
    assert_eq!(harness.executed_ops(), DEFAULT_ITERATIONS * SAMPLE_OPS);
    Ok(())
}

#[test]
fn measure_is_repeatable() -> Result<()> {
    let mut harness = quiet_harness(RuntimeKind::Reference)?;

    harness.measure(4)?;
    let first = harness.executed_ops();
    harness.measure(4)?;
    let second = harness.executed_ops() - first;

    // Same work both times: no state accumulates between calls.
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn print_side_effects_count_executions() -> Result<()> {
    // A workload with an observable effect per execution, to cross-check the
    // op counter.
    let source = "LOAD_CONST \"tick\"\nPRINT\nRETURN\n";
    let (vm, cap) = Vm::with_captured_output();

    let mut harness = Harness::acquire_with(
        RuntimeKind::Alternative,
        "tick.gv",
        source,
        &MarshalCompiler,
        &mut std::io::sink(),
    )?
    .with_vm(vm);

    harness.measure(3)?;
    assert_eq!(cap.get(), "tick\ntick\ntick\n");
    Ok(())
}

#[test]
fn reference_path_emits_listing_alternative_does_not() -> Result<()> {
    let mut listing = Vec::new();
    Harness::acquire_with(
        RuntimeKind::Reference,
        SAMPLE_NAME,
        SAMPLE_SOURCE,
        &MarshalCompiler,
        &mut listing,
    )?;
    assert!(!listing.is_empty(), "reference path must write a disassembly listing");

    let mut listing = Vec::new();
    Harness::acquire_with(
        RuntimeKind::Alternative,
        SAMPLE_NAME,
        SAMPLE_SOURCE,
        &MarshalCompiler,
        &mut listing,
    )?;
    assert!(listing.is_empty(), "alternative path must not disassemble");
    Ok(())
}

#[test]
fn long_unicode_constant_compiles_and_runs() -> Result<()> {
    // A 65-byte literal whose 64th byte falls inside a two-byte char: the
    // reference path must still disassemble and execute it.
    let literal: String = std::iter::once('a').chain(std::iter::repeat('é').take(32)).collect();
    let source = format!("LOAD_CONST \"{literal}\"\nLEN\nPOP\nRETURN\n");

    let mut listing = Vec::new();
    let mut harness = Harness::acquire_with(
        RuntimeKind::Reference,
        "wide.gv",
        &source,
        &MarshalCompiler,
        &mut listing,
    )?
    .with_vm(Vm::new().with_output(std::io::sink()));

    assert!(!listing.is_empty());
    harness.measure(2)?;
    Ok(())
}

#[test]
fn invalid_source_fails_under_both_kinds() {
    for kind in [RuntimeKind::Reference, RuntimeKind::Alternative] {
        let mut listing = Vec::new();
        let err = Harness::acquire_with(kind, "bad.gv", "def :", &MarshalCompiler, &mut listing)
            .err()
            .expect("invalid source must be fatal");
        assert!(matches!(err, HarnessError::Compile(_)), "{kind}: {err}");
        assert!(listing.is_empty());
    }
}

#[test]
fn acquire_sample_is_ready_to_run() -> Result<()> {
    // Default collaborators (stdout listing) — only exercised on the
    // alternative path here to keep test output clean.
    let mut harness = Harness::acquire_sample(RuntimeKind::Alternative)?;
    harness.run_benchmark()?;
    Ok(())
}
