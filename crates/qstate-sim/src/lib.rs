//! `qstate-sim` — dense statevector simulation.
//!
//! Runs a validated [`qstate_ir::CircuitProgram`] on an exact `2^n`
//! amplitude buffer:
//!
//! - **Gate contraction**: every gate is its target unitary plus a control
//!   list, applied in place by index grouping
//! - **Measurement**: marginal probabilities, multi-shot sampling and
//!   collapse, with a per-shot trajectory path for mid-circuit measurement,
//!   resets and classically conditioned gates
//! - **Entanglement**: reduced density matrices and von Neumann entropy
//!
//! # Performance
//!
//! | Qubits | Memory | Simulation Speed |
//! |--------|--------|------------------|
//! | 10 | ~16 KB | Instant |
//! | 15 | ~512 KB | Fast |
//! | 20 | ~16 MB | Moderate |
//! | 24 | ~256 MB | Slow (default ceiling) |
//! | 30+ | ~16 GB+ | Not recommended |
//!
//! # Bit ordering
//!
//! Bit `i` of a basis index is qubit `i`. Bitstrings are written with
//! position `i` holding qubit (or classical bit) `i`, so `"10"` means bit 0
//! read `1`.
//!
//! # Quick start
//!
//! ```rust
//! use qstate_ir::{ProgramBuilder, QubitId};
//! use qstate_sim::{EntropyAnalyzer, SimulatorConfig, StatevectorEngine};
//!
//! let mut builder = ProgramBuilder::new("bell", 2, 2).unwrap();
//! builder.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
//! builder.measure_all().unwrap();
//! let program = builder.finalize();
//!
//! let engine = StatevectorEngine::new(SimulatorConfig::default().with_seed(1)).unwrap();
//! let result = engine.run(&program, 1000).unwrap();
//! assert_eq!(result.counts.get("00") + result.counts.get("11"), 1000);
//!
//! let state = engine.statevector(&program).unwrap();
//! let bits = EntropyAnalyzer::default().entropy(&state, &[QubitId(0)]).unwrap();
//! assert!((bits - 1.0).abs() < 1e-9);
//! ```

pub mod config;
pub mod counts;
pub mod engine;
pub mod entropy;
pub mod error;
pub mod measurement;
pub mod statevector;
pub mod telemetry;

pub use config::{ExecutionConfig, HARD_MAX_QUBITS, LoggingConfig, SimulatorConfig};
pub use counts::{Counts, ExecutionResult};
pub use engine::{CancelToken, StatevectorEngine, Trajectory};
pub use entropy::{DensityMatrix, EntropyAnalyzer};
pub use error::{SimError, SimResult};
pub use measurement::{MarginalDistribution, MeasurementMap, MeasurementSampler, ZERO_PROBABILITY};
pub use statevector::Statevector;
pub use telemetry::init_tracing;
