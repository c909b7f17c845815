//! Gate kinds and their arity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{IrError, IrResult};

/// Gate kinds known to the gate library.
///
/// Controlled kinds (`CX`, `CZ`, `CP`, `CCX`, ...) carry an intrinsic control
/// count and are applied as their [`base`](GateKind::base) unitary plus a
/// control list. Base kinds accept any number of additional controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateKind {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Parameterized single-qubit gates
    /// Rotation around X axis.
    Rx,
    /// Rotation around Y axis.
    Ry,
    /// Rotation around Z axis.
    Rz,
    /// Phase gate diag(1, e^{iθ}).
    P,

    // Two-target gates
    /// SWAP gate.
    Swap,

    // Controlled gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// Controlled phase gate.
    CP,
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

impl GateKind {
    /// Every kind in the library.
    pub const ALL: [GateKind; 23] = [
        GateKind::I,
        GateKind::X,
        GateKind::Y,
        GateKind::Z,
        GateKind::H,
        GateKind::S,
        GateKind::Sdg,
        GateKind::T,
        GateKind::Tdg,
        GateKind::SX,
        GateKind::SXdg,
        GateKind::Rx,
        GateKind::Ry,
        GateKind::Rz,
        GateKind::P,
        GateKind::Swap,
        GateKind::CX,
        GateKind::CY,
        GateKind::CZ,
        GateKind::CH,
        GateKind::CP,
        GateKind::CCX,
        GateKind::CSwap,
    ];

    /// Get the name of this gate.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            GateKind::I => "id",
            GateKind::X => "x",
            GateKind::Y => "y",
            GateKind::Z => "z",
            GateKind::H => "h",
            GateKind::S => "s",
            GateKind::Sdg => "sdg",
            GateKind::T => "t",
            GateKind::Tdg => "tdg",
            GateKind::SX => "sx",
            GateKind::SXdg => "sxdg",
            GateKind::Rx => "rx",
            GateKind::Ry => "ry",
            GateKind::Rz => "rz",
            GateKind::P => "p",
            GateKind::Swap => "swap",
            GateKind::CX => "cx",
            GateKind::CY => "cy",
            GateKind::CZ => "cz",
            GateKind::CH => "ch",
            GateKind::CP => "cp",
            GateKind::CCX => "ccx",
            GateKind::CSwap => "cswap",
        }
    }

    /// The uncontrolled kind applied to the targets.
    #[inline]
    pub fn base(self) -> GateKind {
        match self {
            GateKind::CX | GateKind::CCX => GateKind::X,
            GateKind::CY => GateKind::Y,
            GateKind::CZ => GateKind::Z,
            GateKind::CH => GateKind::H,
            GateKind::CP => GateKind::P,
            GateKind::CSwap => GateKind::Swap,
            other => other,
        }
    }

    /// Number of target qubits.
    #[inline]
    pub fn num_targets(self) -> usize {
        match self.base() {
            GateKind::Swap => 2,
            _ => 1,
        }
    }

    /// Number of controls built into the kind.
    #[inline]
    pub fn num_controls(self) -> usize {
        match self {
            GateKind::CX
            | GateKind::CY
            | GateKind::CZ
            | GateKind::CH
            | GateKind::CP
            | GateKind::CSwap => 1,
            GateKind::CCX => 2,
            _ => 0,
        }
    }

    /// Total number of qubits the kind acts on.
    #[inline]
    pub fn num_qubits(self) -> usize {
        self.num_targets() + self.num_controls()
    }

    /// Whether the kind carries intrinsic controls.
    #[inline]
    pub fn is_controlled(self) -> bool {
        self.num_controls() > 0
    }

    /// Whether the kind needs an angle parameter.
    #[inline]
    pub fn requires_param(self) -> bool {
        matches!(
            self,
            GateKind::Rx | GateKind::Ry | GateKind::Rz | GateKind::P | GateKind::CP
        )
    }

    /// The adjoint of `(self, param)`.
    pub fn inverse(self, param: Option<f64>) -> (GateKind, Option<f64>) {
        match self {
            GateKind::S => (GateKind::Sdg, None),
            GateKind::Sdg => (GateKind::S, None),
            GateKind::T => (GateKind::Tdg, None),
            GateKind::Tdg => (GateKind::T, None),
            GateKind::SX => (GateKind::SXdg, None),
            GateKind::SXdg => (GateKind::SX, None),
            GateKind::Rx | GateKind::Ry | GateKind::Rz | GateKind::P | GateKind::CP => {
                (self, param.map(|theta| -theta))
            }
            _ => (self, param),
        }
    }

    /// Check that `param` is present exactly when the kind needs one.
    pub fn check_param(self, param: Option<f64>) -> IrResult<()> {
        match (self.requires_param(), param) {
            (true, None) => Err(IrError::dimension(
                self.name(),
                "missing required angle parameter",
            )),
            (true, Some(theta)) if !theta.is_finite() => Err(IrError::dimension(
                self.name(),
                format!("angle parameter must be finite, got {theta}"),
            )),
            (false, Some(theta)) => Err(IrError::dimension(
                self.name(),
                format!("gate takes no parameter, got {theta}"),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GateKind {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let name = match lower.as_str() {
            "i" => "id",
            "cnot" => "cx",
            "toffoli" => "ccx",
            "fredkin" => "cswap",
            "phase" => "p",
            other => other,
        };
        GateKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| IrError::UnsupportedGate(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_arity() {
        assert_eq!(GateKind::H.num_qubits(), 1);
        assert_eq!(GateKind::CX.num_qubits(), 2);
        assert_eq!(GateKind::Swap.num_qubits(), 2);
        assert_eq!(GateKind::CCX.num_qubits(), 3);
        assert_eq!(GateKind::CSwap.num_qubits(), 3);

        assert_eq!(GateKind::CCX.num_controls(), 2);
        assert_eq!(GateKind::CCX.base(), GateKind::X);
        assert_eq!(GateKind::CSwap.num_targets(), 2);
        assert!(!GateKind::X.is_controlled());
    }

    #[test]
    fn test_parse_names() {
        for kind in GateKind::ALL {
            assert_eq!(kind.name().parse::<GateKind>().unwrap(), kind);
        }
        assert_eq!("CNOT".parse::<GateKind>().unwrap(), GateKind::CX);
        assert_eq!("toffoli".parse::<GateKind>().unwrap(), GateKind::CCX);
        assert!(matches!(
            "mystery".parse::<GateKind>(),
            Err(IrError::UnsupportedGate(name)) if name == "mystery"
        ));
    }

    #[test]
    fn test_check_param() {
        assert!(GateKind::H.check_param(None).is_ok());
        assert!(GateKind::Rx.check_param(Some(0.5)).is_ok());
        assert!(matches!(
            GateKind::CP.check_param(None),
            Err(IrError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            GateKind::X.check_param(Some(1.0)),
            Err(IrError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            GateKind::Ry.check_param(Some(f64::NAN)),
            Err(IrError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_inverse() {
        assert_eq!(GateKind::S.inverse(None), (GateKind::Sdg, None));
        assert_eq!(GateKind::Rz.inverse(Some(0.3)), (GateKind::Rz, Some(-0.3)));
        assert_eq!(GateKind::CX.inverse(None), (GateKind::CX, None));
    }
}
