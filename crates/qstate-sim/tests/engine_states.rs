//! Exact final states and shot statistics for small reference circuits.

use std::f64::consts::FRAC_1_SQRT_2;

use num_complex::Complex64;
use qstate_ir::{CircuitProgram, ClbitId, GateKind, ProgramBuilder, QubitId};
use qstate_sim::{SimulatorConfig, StatevectorEngine};

fn engine(seed: u64) -> StatevectorEngine {
    StatevectorEngine::new(SimulatorConfig::default().with_seed(seed)).unwrap()
}

fn bell() -> CircuitProgram {
    let mut b = ProgramBuilder::new("bell", 2, 2).unwrap();
    b.h(QubitId(0))
        .unwrap()
        .cx(QubitId(0), QubitId(1))
        .unwrap()
        .measure_all()
        .unwrap();
    b.finalize()
}

fn ghz(n: u32) -> CircuitProgram {
    let mut b = ProgramBuilder::new("ghz", n, n).unwrap();
    b.h(QubitId(0)).unwrap();
    for q in 1..n {
        b.cx(QubitId(q - 1), QubitId(q)).unwrap();
    }
    b.measure_all().unwrap();
    b.finalize()
}

fn assert_amplitudes(actual: &[Complex64], expected: &[Complex64]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).norm() < 1e-10, "amplitude {i}: got {a}, expected {e}");
    }
}

#[test]
fn bell_pair_amplitudes() {
    let sv = engine(1).statevector(&bell()).unwrap();
    let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
    let zero = Complex64::new(0.0, 0.0);
    assert_amplitudes(sv.amplitudes(), &[h, zero, zero, h]);
}

#[test]
fn bell_pair_sampling_is_balanced() {
    let result = engine(2024).run(&bell(), 10_000).unwrap();
    assert_eq!(result.counts.total_shots(), 10_000);
    assert_eq!(result.counts.len(), 2, "only 00 and 11 may appear");

    let p00 = result.probabilities()["00"];
    let p11 = result.probabilities()["11"];
    assert!((p00 - 0.5).abs() <= 0.02, "p(00) = {p00}");
    assert!((p11 - 0.5).abs() <= 0.02, "p(11) = {p11}");
}

#[test]
fn ghz_state_amplitudes_and_counts() {
    let engine = engine(5);
    let sv = engine.statevector(&ghz(3)).unwrap();
    for (i, amp) in sv.amplitudes().iter().enumerate() {
        let expected = if i == 0 || i == 7 { FRAC_1_SQRT_2 } else { 0.0 };
        assert!((amp.re - expected).abs() < 1e-10 && amp.im.abs() < 1e-10);
    }

    let result = engine.run(&ghz(3), 2000).unwrap();
    assert_eq!(result.counts.get("000") + result.counts.get("111"), 2000);
}

#[test]
fn bitstrings_put_bit_zero_first() {
    let mut b = ProgramBuilder::new("x0", 3, 3).unwrap();
    b.x(QubitId(0)).unwrap().measure_all().unwrap();
    let result = engine(3).run(&b.finalize(), 10).unwrap();
    assert_eq!(result.counts.get("100"), 10);
}

#[test]
fn measurement_routes_to_named_clbit() {
    let mut b = ProgramBuilder::new("route", 2, 3).unwrap();
    b.x(QubitId(1)).unwrap();
    b.measure(QubitId(1), ClbitId(2)).unwrap();
    b.measure(QubitId(0), ClbitId(0)).unwrap();
    let result = engine(3).run(&b.finalize(), 10).unwrap();
    assert_eq!(result.counts.get("001"), 10);
}

#[test]
fn program_without_measurements_reports_empty_register() {
    let mut b = ProgramBuilder::new("silent", 1, 0).unwrap();
    b.h(QubitId(0)).unwrap();
    let result = engine(3).run(&b.finalize(), 25).unwrap();
    assert_eq!(result.counts.get(""), 25);
}

#[test]
fn multi_controlled_x_needs_every_control() {
    let mut b = ProgramBuilder::new("mcx", 4, 4).unwrap();
    b.x(QubitId(0)).unwrap().x(QubitId(1)).unwrap().x(QubitId(2)).unwrap();
    b.mcx([QubitId(0), QubitId(1), QubitId(2)], QubitId(3)).unwrap();
    b.measure_all().unwrap();
    let result = engine(3).run(&b.finalize(), 5).unwrap();
    assert_eq!(result.counts.get("1111"), 5);

    let mut b = ProgramBuilder::new("mcx-off", 4, 4).unwrap();
    b.x(QubitId(0)).unwrap().x(QubitId(2)).unwrap();
    b.mcx([QubitId(0), QubitId(1), QubitId(2)], QubitId(3)).unwrap();
    b.measure_all().unwrap();
    let result = engine(3).run(&b.finalize(), 5).unwrap();
    assert_eq!(result.counts.get("1010"), 5);
}

#[test]
fn controlled_swap_and_phase() {
    let mut b = ProgramBuilder::new("fredkin", 3, 3).unwrap();
    b.x(QubitId(0)).unwrap().x(QubitId(1)).unwrap();
    b.cswap(QubitId(0), QubitId(1), QubitId(2)).unwrap();
    b.measure_all().unwrap();
    let result = engine(3).run(&b.finalize(), 5).unwrap();
    assert_eq!(result.counts.get("101"), 5);

    // CP(π) on |11⟩ flips the sign.
    let mut b = ProgramBuilder::new("cp", 2, 0).unwrap();
    b.x(QubitId(0)).unwrap().x(QubitId(1)).unwrap();
    b.cp(std::f64::consts::PI, QubitId(0), QubitId(1)).unwrap();
    let sv = engine(3).statevector(&b.finalize()).unwrap();
    assert!((sv.amplitude(3) - Complex64::new(-1.0, 0.0)).norm() < 1e-10);
}

#[test]
fn rotation_probabilities() {
    let theta = 1.1_f64;
    let mut b = ProgramBuilder::new("ry", 1, 1).unwrap();
    b.add_gate(GateKind::Ry, [QubitId(0)], [], Some(theta)).unwrap();
    let program = b.finalize();
    let sv = engine(3).statevector(&program).unwrap();
    let p1 = sv.probability_of_one(0);
    assert!((p1 - (theta / 2.0).sin().powi(2)).abs() < 1e-12);
}
