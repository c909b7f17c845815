//! qstate Circuit Programs
//!
//! This crate provides the gate library and the validated program
//! representation consumed by the `qstate-sim` statevector engine.
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`]
//! - **Gates**: [`GateKind`] with arity and parameter rules, and
//!   [`GateLibrary`] for the canonical unitary matrices
//! - **Instructions**: [`Instruction`], a tagged variant over gates,
//!   measurements, resets and barriers; [`GateInstruction`] carries targets,
//!   controls, an optional angle and an optional [`ClassicalCondition`]
//! - **Programs**: [`ProgramBuilder`] validates every operation as it is
//!   added; [`CircuitProgram`] is the immutable result
//!
//! # Bit ordering
//!
//! Bit `i` of a basis-state index is the state of qubit `i`. Gate matrices
//! follow the same rule over their operands.
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use qstate_ir::{ClbitId, ProgramBuilder, QubitId};
//!
//! let mut builder = ProgramBuilder::new("bell_state", 2, 2).unwrap();
//! builder
//!     .h(QubitId(0))
//!     .unwrap()
//!     .cx(QubitId(0), QubitId(1))
//!     .unwrap()
//!     .measure(QubitId(0), ClbitId(0))
//!     .unwrap()
//!     .measure(QubitId(1), ClbitId(1))
//!     .unwrap();
//!
//! let program = builder.finalize();
//! assert_eq!(program.num_qubits(), 2);
//! assert_eq!(program.gate_count(), 2);
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Targets | Controls | Parameter |
//! |------|---------|----------|-----------|
//! | `I`, `X`, `Y`, `Z`, `H` | 1 | any | - |
//! | `S`, `Sdg`, `T`, `Tdg`, `SX`, `SXdg` | 1 | any | - |
//! | `Rx`, `Ry`, `Rz`, `P` | 1 | any | angle |
//! | `Swap` | 2 | any | - |
//! | `CX`, `CY`, `CZ`, `CH` | 1 | 1 | - |
//! | `CP` | 1 | 1 | angle |
//! | `CCX` | 1 | 2 | - |
//! | `CSwap` | 2 | 1 | - |

pub mod error;
pub mod gate;
pub mod instruction;
pub mod library;
pub mod program;
pub mod qubit;

pub use error::{IrError, IrResult};
pub use gate::GateKind;
pub use instruction::{ClassicalCondition, GateInstruction, Instruction};
pub use library::{GateLibrary, GateMatrix};
pub use program::{CircuitProgram, DEFAULT_QUBIT_BUDGET, ProgramBuilder};
pub use qubit::{ClbitId, QubitId};
