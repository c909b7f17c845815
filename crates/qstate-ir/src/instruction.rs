//! Program instructions.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::GateKind;
use crate::library::{GateLibrary, GateMatrix};
use crate::qubit::{ClbitId, QubitId};

/// Classical condition on previously measured bits.
///
/// The listed bits are read as a little-endian integer (`clbits[i]` is bit
/// `i`) and compared to `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicalCondition {
    /// Classical bits read by the condition.
    pub clbits: Vec<ClbitId>,
    /// The value to compare against.
    pub value: u64,
}

impl ClassicalCondition {
    /// Condition on a group of classical bits.
    pub fn register(clbits: impl IntoIterator<Item = ClbitId>, value: u64) -> Self {
        Self {
            clbits: clbits.into_iter().collect(),
            value,
        }
    }

    /// Condition on a single classical bit.
    pub fn bit(clbit: ClbitId, value: bool) -> Self {
        Self::register([clbit], u64::from(value))
    }

    /// Evaluate the condition against a classical register.
    ///
    /// Bits outside `register` read as 0.
    pub fn is_satisfied(&self, register: &[bool]) -> bool {
        let observed = self
            .clbits
            .iter()
            .enumerate()
            .filter(|&(_, c)| register.get(c.index()).copied().unwrap_or(false))
            .fold(0u64, |acc, (i, _)| acc | (1 << i));
        observed == self.value
    }
}

/// A gate applied to targets under optional quantum and classical control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateInstruction {
    /// The kind of gate.
    pub kind: GateKind,
    /// Target qubits, in operand order.
    pub targets: Vec<QubitId>,
    /// Control qubits; the gate acts only where all are 1.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<QubitId>,
    /// Angle parameter for rotation and phase kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<f64>,
    /// Optional classical condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

impl GateInstruction {
    /// Create an unconditioned gate instruction.
    pub fn new(kind: GateKind, targets: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind,
            targets: targets.into_iter().collect(),
            controls: vec![],
            param: None,
            condition: None,
        }
    }

    /// Add control qubits.
    #[must_use]
    pub fn with_controls(mut self, controls: impl IntoIterator<Item = QubitId>) -> Self {
        self.controls = controls.into_iter().collect();
        self
    }

    /// Set the angle parameter.
    #[must_use]
    pub fn with_param(mut self, theta: f64) -> Self {
        self.param = Some(theta);
        self
    }

    /// Add a classical condition.
    #[must_use]
    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Get the name of this gate.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Whether execution depends on an earlier measurement.
    pub fn is_conditioned(&self) -> bool {
        self.condition.is_some()
    }

    /// All qubits touched: controls first, then targets.
    pub fn qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        self.controls.iter().chain(self.targets.iter()).copied()
    }

    /// Unitary over the targets.
    pub fn target_matrix(&self) -> IrResult<GateMatrix> {
        GateLibrary::target_matrix(self.kind, self.param)
    }

    /// Check arity, parameter and operands against a `num_qubits` register.
    ///
    /// Controlled kinds need exactly their intrinsic control count; base
    /// kinds accept any number of extra controls. Conditions are not checked
    /// here since they depend on the classical register.
    pub fn validate(&self, num_qubits: u32) -> IrResult<()> {
        let name = self.name();
        self.kind.check_param(self.param)?;

        if self.targets.len() != self.kind.num_targets() {
            return Err(IrError::dimension(
                name,
                format!(
                    "expected {} target qubit(s), got {}",
                    self.kind.num_targets(),
                    self.targets.len()
                ),
            ));
        }
        if self.kind.is_controlled() && self.controls.len() != self.kind.num_controls() {
            return Err(IrError::dimension(
                name,
                format!(
                    "expected {} control qubit(s), got {}",
                    self.kind.num_controls(),
                    self.controls.len()
                ),
            ));
        }

        let mut seen: Vec<QubitId> = Vec::with_capacity(self.targets.len() + self.controls.len());
        for qubit in self.qubits() {
            if qubit.0 >= num_qubits {
                return Err(IrError::InvalidQubitIndex {
                    qubit,
                    num_qubits,
                    gate_name: Some(name.to_string()),
                });
            }
            if seen.contains(&qubit) {
                return Err(IrError::DuplicateQubitReference {
                    qubit,
                    gate_name: Some(name.to_string()),
                });
            }
            seen.push(qubit);
        }
        Ok(())
    }

    /// The adjoint instruction, keeping operands and condition.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let (kind, param) = self.kind.inverse(self.param);
        Self {
            kind,
            param,
            ..self.clone()
        }
    }
}

/// One step of a circuit program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// A quantum gate operation.
    Gate(GateInstruction),
    /// Measure a qubit into a classical bit.
    Measure {
        /// Measured qubit.
        qubit: QubitId,
        /// Destination classical bit.
        clbit: ClbitId,
    },
    /// Reset a qubit to |0⟩.
    Reset {
        /// Qubit to reset.
        qubit: QubitId,
    },
    /// Ordering marker with no effect on the state.
    Barrier {
        /// Qubits spanned by the barrier.
        qubits: Vec<QubitId>,
    },
}

impl Instruction {
    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self, Instruction::Gate(_))
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self, Instruction::Measure { .. })
    }

    /// Get the gate if this is a gate instruction.
    pub fn as_gate(&self) -> Option<&GateInstruction> {
        match self {
            Instruction::Gate(g) => Some(g),
            _ => None,
        }
    }

    /// Qubits whose state this instruction reads or changes.
    ///
    /// Barriers touch nothing.
    pub fn touched_qubits(&self) -> Vec<QubitId> {
        match self {
            Instruction::Gate(g) => g.qubits().collect(),
            Instruction::Measure { qubit, .. } | Instruction::Reset { qubit } => vec![*qubit],
            Instruction::Barrier { .. } => vec![],
        }
    }

    /// Get the name of the instruction.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Gate(g) => g.name(),
            Instruction::Measure { .. } => "measure",
            Instruction::Reset { .. } => "reset",
            Instruction::Barrier { .. } => "barrier",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_instruction() {
        let inst = GateInstruction::new(GateKind::X, [QubitId(2)])
            .with_controls([QubitId(0), QubitId(1)]);
        assert_eq!(inst.name(), "x");
        assert_eq!(
            inst.qubits().collect::<Vec<_>>(),
            vec![QubitId(0), QubitId(1), QubitId(2)]
        );
        assert!(!inst.is_conditioned());
    }

    #[test]
    fn test_validate_operands() {
        let bare_cx = GateInstruction::new(GateKind::CX, [QubitId(1)]);
        assert!(matches!(
            bare_cx.validate(2),
            Err(IrError::DimensionMismatch { .. })
        ));
        let cx = bare_cx.with_controls([QubitId(0)]);
        assert!(cx.validate(2).is_ok());
        assert!(matches!(
            cx.validate(1),
            Err(IrError::InvalidQubitIndex { qubit: QubitId(1), .. })
        ));

        let mcx = GateInstruction::new(GateKind::X, [QubitId(2)]).with_controls([QubitId(0), QubitId(1)]);
        assert!(mcx.validate(3).is_ok());
        let dup = GateInstruction::new(GateKind::Swap, [QubitId(0), QubitId(0)]);
        assert!(matches!(
            dup.validate(2),
            Err(IrError::DuplicateQubitReference { .. })
        ));
        let unangled = GateInstruction::new(GateKind::Rz, [QubitId(0)]);
        assert!(unangled.validate(1).is_err());
    }

    #[test]
    fn test_condition_evaluation() {
        let cond = ClassicalCondition::register([ClbitId(0), ClbitId(2)], 0b10);
        assert!(cond.is_satisfied(&[false, true, true]));
        assert!(!cond.is_satisfied(&[true, false, true]));
        assert!(!cond.is_satisfied(&[false, false, false]));

        let bit = ClassicalCondition::bit(ClbitId(1), true);
        assert!(bit.is_satisfied(&[false, true]));
        assert!(!bit.is_satisfied(&[true, false]));
    }

    #[test]
    fn test_inverse_keeps_operands() {
        let inst = GateInstruction::new(GateKind::P, [QubitId(1)])
            .with_controls([QubitId(0)])
            .with_param(0.25);
        let inv = inst.inverse();
        assert_eq!(inv.param, Some(-0.25));
        assert_eq!(inv.controls, inst.controls);
        assert_eq!(inv.targets, inst.targets);
    }

    #[test]
    fn test_touched_qubits() {
        let measure = Instruction::Measure {
            qubit: QubitId(3),
            clbit: ClbitId(0),
        };
        assert_eq!(measure.touched_qubits(), vec![QubitId(3)]);
        assert!(measure.is_measure());
        let barrier = Instruction::Barrier {
            qubits: vec![QubitId(0)],
        };
        assert!(barrier.touched_qubits().is_empty());
    }
}
