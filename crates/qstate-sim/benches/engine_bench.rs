//! Benchmarks for statevector simulation
//!
//! Run with: cargo bench -p qstate-sim

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qstate_ir::{CircuitProgram, GateInstruction, GateKind, ProgramBuilder, QubitId};
use qstate_sim::{EntropyAnalyzer, SimulatorConfig, Statevector, StatevectorEngine};

fn ghz(n: u32) -> CircuitProgram {
    let mut b = ProgramBuilder::new("ghz", n, n).unwrap();
    b.h(QubitId(0)).unwrap();
    for q in 1..n {
        b.cx(QubitId(q - 1), QubitId(q)).unwrap();
    }
    b.measure_all().unwrap();
    b.finalize()
}

/// Benchmark single gates on growing registers
fn bench_gate_application(c: &mut Criterion) {
    let mut group = c.benchmark_group("gate_application");
    let engine = StatevectorEngine::default();

    let gates = [
        ("h", GateInstruction::new(GateKind::H, [QubitId(0)])),
        (
            "cx",
            GateInstruction::new(GateKind::CX, [QubitId(1)]).with_controls([QubitId(0)]),
        ),
        ("swap", GateInstruction::new(GateKind::Swap, [QubitId(0), QubitId(2)])),
        (
            "ccx",
            GateInstruction::new(GateKind::CCX, [QubitId(2)]).with_controls([QubitId(0), QubitId(1)]),
        ),
    ];

    for num_qubits in &[8usize, 12, 16, 20] {
        for (name, gate) in &gates {
            group.bench_with_input(BenchmarkId::new(*name, num_qubits), num_qubits, |b, &n| {
                let mut sv = Statevector::new(n).unwrap();
                b.iter(|| engine.apply_gate(black_box(&mut sv), black_box(gate)).unwrap());
            });
        }
    }

    group.finish();
}

/// Benchmark shot sampling against trajectory replay
fn bench_shots(c: &mut Criterion) {
    let mut group = c.benchmark_group("shots");
    let engine = StatevectorEngine::new(SimulatorConfig::default().with_seed(1)).unwrap();

    for num_qubits in &[4u32, 10, 16] {
        let program = ghz(*num_qubits);
        group.bench_with_input(BenchmarkId::new("sampled", num_qubits), &program, |b, p| {
            b.iter(|| engine.run(black_box(p), 1000).unwrap());
        });
    }

    let mut b = ProgramBuilder::new("feed_forward", 8, 8).unwrap();
    for q in 0..8 {
        b.h(QubitId(q)).unwrap();
        b.measure(QubitId(q), qstate_ir::ClbitId(q)).unwrap();
        b.x(QubitId(q)).unwrap();
    }
    let feed_forward = b.finalize();
    group.bench_function("trajectory_8q", |b| {
        b.iter(|| engine.run(black_box(&feed_forward), 1000).unwrap());
    });

    group.finish();
}

/// Benchmark partial trace plus eigenvalues
fn bench_entropy(c: &mut Criterion) {
    let mut group = c.benchmark_group("entropy");
    let engine = StatevectorEngine::default();
    let analyzer = EntropyAnalyzer::default();

    for half in &[1u32, 3, 5] {
        let program = ghz(2 * half).remove_final_measurements();
        let sv = engine.statevector(&program).unwrap();
        let subset: Vec<QubitId> = (0..*half).map(QubitId).collect();
        group.bench_with_input(BenchmarkId::new("half_register", half), &subset, |b, s| {
            b.iter(|| analyzer.entropy(black_box(&sv), black_box(s)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_gate_application, bench_shots, bench_entropy);
criterion_main!(benches);
