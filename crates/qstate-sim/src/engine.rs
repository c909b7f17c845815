//! Statevector engine: program evolution and multi-shot execution.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use qstate_ir::{CircuitProgram, GateInstruction, GateKind, Instruction, QubitId};

use crate::config::SimulatorConfig;
use crate::counts::{Counts, ExecutionResult};
use crate::error::{SimError, SimResult};
use crate::measurement::{MeasurementMap, MeasurementSampler};
use crate::statevector::Statevector;

/// Cooperative cancellation flag shared with a running execution.
///
/// Checked before every shot; shots already running finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// State left behind by one replay of a program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    /// Quantum state after the last instruction.
    pub statevector: Statevector,
    /// Classical register, index `i` = classical bit `i`.
    pub classical: Vec<bool>,
}

impl Trajectory {
    /// Classical register as a bitstring, position `i` = classical bit `i`.
    pub fn bitstring(&self) -> String {
        self.classical
            .iter()
            .map(|&b| if b { '1' } else { '0' })
            .collect()
    }
}

/// Dense statevector simulator.
pub struct StatevectorEngine {
    config: SimulatorConfig,
    sampler: MeasurementSampler,
    pool: Option<rayon::ThreadPool>,
}

impl fmt::Debug for StatevectorEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatevectorEngine")
            .field("config", &self.config)
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}

impl Default for StatevectorEngine {
    fn default() -> Self {
        let config = SimulatorConfig::default();
        Self {
            sampler: MeasurementSampler::new(config.tolerance),
            config,
            pool: None,
        }
    }
}

/// Per-shot seed derived from the run seed (splitmix64 finalizer).
fn shot_seed(base: u64, shot: u32) -> u64 {
    let mut z = base.wrapping_add((u64::from(shot) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl StatevectorEngine {
    /// Create an engine from a validated configuration.
    pub fn new(config: SimulatorConfig) -> SimResult<Self> {
        config.validate()?;
        let pool = match config.execution.num_threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("qstate-shot-{i}"))
                    .build()
                    .map_err(|e| SimError::Configuration(format!("cannot start worker pool: {e}")))?,
            ),
            None => None,
        };
        Ok(Self {
            sampler: MeasurementSampler::new(config.tolerance),
            config,
            pool,
        })
    }

    /// The engine configuration.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// The sampler used for measurements.
    pub fn sampler(&self) -> &MeasurementSampler {
        &self.sampler
    }

    fn check_budget(&self, program: &CircuitProgram) -> SimResult<()> {
        if program.num_qubits() > self.config.max_qubits {
            return Err(SimError::QubitBudgetExceeded {
                requested: program.num_qubits(),
                max: self.config.max_qubits,
            });
        }
        Ok(())
    }

    fn base_seed(&self) -> u64 {
        self.config.seed.unwrap_or_else(rand::random)
    }

    /// Apply one gate in place.
    ///
    /// Classical conditions are not evaluated here.
    pub fn apply_gate(&self, sv: &mut Statevector, gate: &GateInstruction) -> SimResult<()> {
        gate.validate(sv.num_qubits() as u32)?;
        let targets: Vec<usize> = gate.targets.iter().map(|q| q.index()).collect();
        let controls: Vec<usize> = gate.controls.iter().map(|q| q.index()).collect();

        let matrix = gate.target_matrix()?;
        sv.apply_matrix(&matrix, &targets, &controls);

        if self.config.check_normalization {
            sv.check_normalized(self.config.tolerance, &format!("gate '{}'", gate.name()))?;
        }
        Ok(())
    }

    /// Evolve a program without measurement collapse. Only valid for
    /// programs whose measurements are all terminal.
    fn evolve(&self, program: &CircuitProgram) -> SimResult<Statevector> {
        let mut sv = Statevector::new(program.num_qubits() as usize)?;
        for gate in program.gates() {
            self.apply_gate(&mut sv, gate)?;
        }
        Ok(sv)
    }

    /// Replay a program once; `observe` decides (and applies) every
    /// measurement outcome, resets included.
    fn replay(
        &self,
        program: &CircuitProgram,
        mut observe: impl FnMut(&MeasurementSampler, &mut Statevector, QubitId) -> SimResult<bool>,
    ) -> SimResult<Trajectory> {
        let mut sv = Statevector::new(program.num_qubits() as usize)?;
        let mut classical = vec![false; program.num_clbits() as usize];

        for inst in program.instructions() {
            match inst {
                Instruction::Gate(gate) => {
                    let enabled = gate
                        .condition
                        .as_ref()
                        .is_none_or(|c| c.is_satisfied(&classical));
                    if enabled {
                        self.apply_gate(&mut sv, gate)?;
                    }
                }
                Instruction::Measure { qubit, clbit } => {
                    classical[clbit.index()] = observe(&self.sampler, &mut sv, *qubit)?;
                }
                Instruction::Reset { qubit } => {
                    if observe(&self.sampler, &mut sv, *qubit)? {
                        self.apply_gate(&mut sv, &GateInstruction::new(GateKind::X, [*qubit]))?;
                    }
                }
                Instruction::Barrier { .. } => {}
            }
        }

        Ok(Trajectory {
            statevector: sv,
            classical,
        })
    }

    fn sampled_trajectory(&self, program: &CircuitProgram, seed: u64) -> SimResult<Trajectory> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.replay(program, |sampler, sv, q| sampler.measure(sv, q, &mut rng))
    }

    /// Final statevector of a program.
    ///
    /// Terminal measurements are not applied. Programs that need collapse
    /// mid-circuit run one sampled trajectory.
    #[instrument(skip(self, program), fields(program = program.name(), qubits = program.num_qubits()))]
    pub fn statevector(&self, program: &CircuitProgram) -> SimResult<Statevector> {
        self.check_budget(program)?;
        if program.requires_trajectories() {
            debug!("program needs collapse; sampling one trajectory");
            let seed = shot_seed(self.base_seed(), 0);
            Ok(self.sampled_trajectory(program, seed)?.statevector)
        } else {
            self.evolve(program)
        }
    }

    /// Replay a program with forced outcomes for its measurements and
    /// resets, consumed in program order.
    pub fn run_branch(&self, program: &CircuitProgram, outcomes: &[bool]) -> SimResult<Trajectory> {
        self.check_budget(program)?;
        let mut forced = outcomes.iter().copied();
        self.replay(program, |sampler, sv, q| {
            let outcome = forced.next().ok_or(SimError::BranchExhausted {
                supplied: outcomes.len(),
            })?;
            sampler.collapse(sv, q, outcome)?;
            Ok(outcome)
        })
    }

    /// Run `shots` shots and aggregate classical outcomes.
    pub fn run(&self, program: &CircuitProgram, shots: u32) -> SimResult<ExecutionResult> {
        self.run_with_cancel(program, shots, &CancelToken::new())
    }

    /// Run `shots` shots, stopping early once `cancel` is set.
    #[instrument(skip(self, program, cancel), fields(program = program.name(), qubits = program.num_qubits()))]
    pub fn run_with_cancel(
        &self,
        program: &CircuitProgram,
        shots: u32,
        cancel: &CancelToken,
    ) -> SimResult<ExecutionResult> {
        if shots == 0 {
            return Err(SimError::InvalidShots(shots));
        }
        self.check_budget(program)?;

        let start = Instant::now();
        let seed = self.base_seed();
        debug!(
            "Starting simulation: {} qubits, {} shots",
            program.num_qubits(),
            shots
        );

        let (path, counts, completed) = if program.requires_trajectories() {
            let (counts, completed) = self.run_trajectories(program, shots, seed, cancel)?;
            ("trajectory", counts, completed)
        } else if cancel.is_cancelled() {
            ("sampled", Counts::new(), 0)
        } else {
            let sv = self.evolve(program)?;
            let map = MeasurementMap::from_program(program);
            let mut rng = StdRng::seed_from_u64(seed);
            let counts = self.sampler.sample_shots(&sv, &map, shots, &mut rng)?;
            ("sampled", counts, shots)
        };

        let elapsed = start.elapsed();
        debug!(path, "Simulation completed in {:?}", elapsed);

        let mut result = ExecutionResult::new(counts, shots)
            .with_execution_time(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .with_metadata(serde_json::json!({
                "program": program.name(),
                "qubits": program.num_qubits(),
                "path": path,
                "seed": seed,
            }));
        if completed < shots {
            warn!(completed, requested = shots, "execution cancelled");
            result = result.cancelled_after(completed);
        }
        Ok(result)
    }

    fn run_trajectories(
        &self,
        program: &CircuitProgram,
        shots: u32,
        seed: u64,
        cancel: &CancelToken,
    ) -> SimResult<(Counts, u32)> {
        let run_shot = |shot: u32| -> SimResult<Option<String>> {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let trajectory = self.sampled_trajectory(program, shot_seed(seed, shot))?;
            Ok(Some(trajectory.bitstring()))
        };

        let parallel =
            self.config.execution.parallel && shots >= self.config.execution.parallel_threshold;
        if !parallel {
            let mut counts = Counts::new();
            for shot in 0..shots {
                let Some(bits) = run_shot(shot)? else {
                    return Ok((counts, shot));
                };
                counts.record(bits);
                if shot > 0 && shot % 1000 == 0 {
                    debug!("Completed {} shots", shot);
                }
            }
            return Ok((counts, shots));
        }

        debug!("Running {} trajectories on worker pool", shots);
        let fan_out = || {
            (0..shots)
                .into_par_iter()
                .try_fold(
                    || (Counts::new(), 0u32),
                    |(mut counts, done), shot| match run_shot(shot)? {
                        Some(bits) => {
                            counts.record(bits);
                            Ok((counts, done + 1))
                        }
                        None => Ok((counts, done)),
                    },
                )
                .try_reduce(
                    || (Counts::new(), 0),
                    |(mut a, na), (b, nb)| {
                        a.merge(b);
                        Ok((a, na + nb))
                    },
                )
        };
        match &self.pool {
            Some(pool) => pool.install(fan_out),
            None => fan_out(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qstate_ir::{ClbitId, IrError, ProgramBuilder};

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

    fn seeded() -> StatevectorEngine {
        StatevectorEngine::new(SimulatorConfig::default().with_seed(11)).unwrap()
    }

    #[test]
    fn test_shot_seeds_differ() {
        assert_ne!(shot_seed(1, 0), shot_seed(1, 1));
        assert_ne!(shot_seed(1, 0), shot_seed(2, 0));
        assert_eq!(shot_seed(5, 9), shot_seed(5, 9));
    }

    #[test]
    fn test_simulator_bell_state() {
        let result = seeded().run(&bell(), 1000).unwrap();
        assert_eq!(result.shots, 1000);
        assert_eq!(result.counts.total_shots(), 1000);
        assert_eq!(result.counts.get("01") + result.counts.get("10"), 0);
        assert_eq!(result.metadata["path"], "sampled");
        assert!(!result.cancelled);
    }

    #[test]
    fn test_zero_shots_rejected() {
        assert!(matches!(
            seeded().run(&bell(), 0),
            Err(SimError::InvalidShots(0))
        ));
    }

    #[test]
    fn test_budget_checked_before_allocation() {
        let engine = StatevectorEngine::new(SimulatorConfig::default().with_max_qubits(1)).unwrap();
        assert!(matches!(
            engine.statevector(&bell()),
            Err(SimError::QubitBudgetExceeded { requested: 2, max: 1 })
        ));
        assert!(matches!(
            engine.run(&bell(), 10),
            Err(SimError::QubitBudgetExceeded { .. })
        ));
    }

    #[test]
    fn test_apply_gate_validates_operands() {
        let engine = StatevectorEngine::default();
        let mut sv = Statevector::new(1).unwrap();
        let bad = GateInstruction::new(GateKind::X, [QubitId(3)]);
        assert!(matches!(
            engine.apply_gate(&mut sv, &bad),
            Err(SimError::Ir(IrError::InvalidQubitIndex { .. }))
        ));
        let short_swap = GateInstruction::new(GateKind::Swap, [QubitId(0)]);
        assert!(matches!(
            engine.apply_gate(&mut sv, &short_swap),
            Err(SimError::Ir(IrError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn test_apply_gate_rejects_uncontrolled_cx() {
        let engine = StatevectorEngine::default();
        let mut sv = Statevector::new(2).unwrap();
        engine
            .apply_gate(&mut sv, &GateInstruction::new(GateKind::H, [QubitId(0)]))
            .unwrap();
        let before = sv.clone();

        let bare_cx = GateInstruction::new(GateKind::CX, [QubitId(1)]);
        assert!(matches!(
            engine.apply_gate(&mut sv, &bare_cx),
            Err(SimError::Ir(IrError::DimensionMismatch { .. }))
        ));
        let rz = GateInstruction::new(GateKind::Rz, [QubitId(0)]);
        assert!(matches!(
            engine.apply_gate(&mut sv, &rz),
            Err(SimError::Ir(IrError::DimensionMismatch { .. }))
        ));
        assert_eq!(sv.amplitudes(), before.amplitudes());
    }

    #[test]
    fn test_pre_cancelled_run() {
        let token = CancelToken::new();
        token.cancel();
        let result = seeded().run_with_cancel(&bell(), 50, &token).unwrap();
        assert!(result.cancelled);
        assert_eq!(result.shots, 0);
        assert_eq!(result.requested_shots, 50);
        assert!(result.counts.is_empty());
    }

    #[test]
    fn test_reset_returns_qubit_to_zero() {
        let mut b = ProgramBuilder::new("reset", 1, 1).unwrap();
        b.h(QubitId(0)).unwrap();
        b.reset(QubitId(0)).unwrap();
        b.measure(QubitId(0), ClbitId(0)).unwrap();
        let result = seeded().run(&b.finalize(), 200).unwrap();
        assert_eq!(result.counts.get("0"), 200);
        assert_eq!(result.metadata["path"], "trajectory");
    }

    #[test]
    fn test_branch_exhausted() {
        let mut b = ProgramBuilder::new("two", 1, 2).unwrap();
        b.h(QubitId(0)).unwrap();
        b.measure(QubitId(0), ClbitId(0)).unwrap();
        b.measure(QubitId(0), ClbitId(1)).unwrap();
        let program = b.finalize();
        assert!(matches!(
            seeded().run_branch(&program, &[true]),
            Err(SimError::BranchExhausted { supplied: 1 })
        ));
        let trajectory = seeded().run_branch(&program, &[true, true]).unwrap();
        assert_eq!(trajectory.bitstring(), "11");
    }
}
