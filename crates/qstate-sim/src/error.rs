//! Error types for the sim crate.

use qstate_ir::QubitId;
use thiserror::Error;

/// Errors produced while simulating a program.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// Squared amplitudes or probabilities drifted away from 1.
    ///
    /// Always an internal consistency failure; the run is aborted.
    #[error("Normalization violated during {context}: total {total:.12} deviates beyond {tolerance:e}")]
    Normalization {
        /// Operation that broke the invariant.
        context: String,
        /// Observed total probability.
        total: f64,
        /// Allowed deviation.
        tolerance: f64,
    },

    /// Program needs more qubits than the engine is configured for.
    #[error("Program requests {requested} qubits but the engine allows at most {max}")]
    QubitBudgetExceeded {
        /// Requested qubit count.
        requested: u32,
        /// Configured ceiling.
        max: u32,
    },

    /// Collapse to an outcome that has no support in the state.
    #[error("Outcome {outcome} on {qubit} has zero probability")]
    ZeroProbabilityOutcome {
        /// Measured qubit.
        qubit: QubitId,
        /// Requested outcome.
        outcome: u8,
    },

    /// A forced branch supplied fewer outcomes than the program measures.
    #[error("Branch supplies {supplied} measurement outcomes but the program needs more")]
    BranchExhausted {
        /// Number of outcomes supplied.
        supplied: usize,
    },

    /// shots must be ≥ 1.
    #[error("shots must be at least 1, got {0}")]
    InvalidShots(u32),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Program construction or gate lookup failed.
    #[error("Circuit IR error: {0}")]
    Ir(#[from] qstate_ir::IrError),
}

impl SimError {
    pub(crate) fn normalization(context: impl Into<String>, total: f64, tolerance: f64) -> Self {
        SimError::Normalization {
            context: context.into(),
            total,
            tolerance,
        }
    }
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
