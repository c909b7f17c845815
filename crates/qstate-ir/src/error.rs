//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors raised while building or validating a circuit program.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit index outside the declared qubit range.
    #[error(
        "Qubit {qubit} out of range for a {num_qubits}-qubit program{}",
        format_gate_context(.gate_name)
    )]
    InvalidQubitIndex {
        /// The offending qubit.
        qubit: QubitId,
        /// Declared qubit count.
        num_qubits: u32,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit index outside the declared classical range.
    #[error(
        "Classical bit {clbit} out of range for a program with {num_clbits} classical bits{}",
        format_gate_context(.gate_name)
    )]
    InvalidClassicalBitIndex {
        /// The offending classical bit.
        clbit: ClbitId,
        /// Declared classical bit count.
        num_clbits: u32,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// The same qubit appears more than once among targets and controls.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubitReference {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Gate name not known to the gate library.
    #[error("Unsupported gate '{0}'")]
    UnsupportedGate(String),

    /// Operand count or parameter does not fit the gate.
    #[error("Dimension mismatch for gate '{gate_name}': {reason}")]
    DimensionMismatch {
        /// Name of the gate.
        gate_name: String,
        /// What did not fit.
        reason: String,
    },

    /// Requested qubit count exceeds the memory ceiling.
    #[error("Program requests {requested} qubits but the budget is {max}")]
    QubitBudgetExceeded {
        /// Requested qubit count.
        requested: u32,
        /// Configured ceiling.
        max: u32,
    },
}

impl IrError {
    pub(crate) fn dimension(gate_name: impl Into<String>, reason: impl Into<String>) -> Self {
        IrError::DimensionMismatch {
            gate_name: gate_name.into(),
            reason: reason.into(),
        }
    }
}

#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
