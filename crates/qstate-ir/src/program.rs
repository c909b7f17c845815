//! Validated circuit programs and their builder.

use serde::Serialize;

use crate::error::{IrError, IrResult};
use crate::gate::GateKind;
use crate::instruction::{ClassicalCondition, GateInstruction, Instruction};
use crate::qubit::{ClbitId, QubitId};

/// Default qubit ceiling: a `2^24` buffer of `Complex64` is 256 MiB.
pub const DEFAULT_QUBIT_BUDGET: u32 = 24;

/// Builder for a [`CircuitProgram`].
///
/// Every operation is validated when it is added, so a finalized program is
/// always well formed.
#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    name: String,
    num_qubits: u32,
    num_clbits: u32,
    instructions: Vec<Instruction>,
}

impl ProgramBuilder {
    /// Create a builder under the default qubit budget.
    pub fn new(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> IrResult<Self> {
        Self::with_budget(name, num_qubits, num_clbits, DEFAULT_QUBIT_BUDGET)
    }

    /// Create a builder under an explicit qubit budget.
    pub fn with_budget(
        name: impl Into<String>,
        num_qubits: u32,
        num_clbits: u32,
        max_qubits: u32,
    ) -> IrResult<Self> {
        if num_qubits > max_qubits {
            return Err(IrError::QubitBudgetExceeded {
                requested: num_qubits,
                max: max_qubits,
            });
        }
        Ok(Self {
            name: name.into(),
            num_qubits,
            num_clbits,
            instructions: vec![],
        })
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn check_qubit(&self, qubit: QubitId, gate_name: Option<&str>) -> IrResult<()> {
        if qubit.0 >= self.num_qubits {
            return Err(IrError::InvalidQubitIndex {
                qubit,
                num_qubits: self.num_qubits,
                gate_name: gate_name.map(str::to_string),
            });
        }
        Ok(())
    }

    fn check_clbit(&self, clbit: ClbitId, gate_name: Option<&str>) -> IrResult<()> {
        if clbit.0 >= self.num_clbits {
            return Err(IrError::InvalidClassicalBitIndex {
                clbit,
                num_clbits: self.num_clbits,
                gate_name: gate_name.map(str::to_string),
            });
        }
        Ok(())
    }

    fn check_condition(&self, condition: &ClassicalCondition, gate_name: &str) -> IrResult<()> {
        let width = condition.clbits.len();
        if width == 0 {
            return Err(IrError::dimension(gate_name, "condition reads no classical bits"));
        }
        if width > 64 {
            return Err(IrError::dimension(
                gate_name,
                format!("condition reads {width} classical bits, at most 64 are supported"),
            ));
        }
        if width < 64 && condition.value >> width != 0 {
            return Err(IrError::dimension(
                gate_name,
                format!(
                    "condition value {} does not fit in {width} classical bits",
                    condition.value
                ),
            ));
        }
        for &clbit in &condition.clbits {
            self.check_clbit(clbit, Some(gate_name))?;
        }
        Ok(())
    }

    fn validate_gate(&self, gate: &GateInstruction) -> IrResult<()> {
        gate.validate(self.num_qubits)?;

        if let Some(condition) = &gate.condition {
            self.check_condition(condition, gate.name())?;
        }
        Ok(())
    }

    // =========================================================================
    // Generic operations
    // =========================================================================

    /// Append a prepared gate instruction.
    pub fn push_gate(&mut self, gate: GateInstruction) -> IrResult<&mut Self> {
        self.validate_gate(&gate)?;
        self.instructions.push(Instruction::Gate(gate));
        Ok(self)
    }

    /// Append a gate of `kind` on `targets` under `controls`.
    pub fn add_gate(
        &mut self,
        kind: GateKind,
        targets: impl IntoIterator<Item = QubitId>,
        controls: impl IntoIterator<Item = QubitId>,
        param: Option<f64>,
    ) -> IrResult<&mut Self> {
        let mut gate = GateInstruction::new(kind, targets).with_controls(controls);
        gate.param = param;
        self.push_gate(gate)
    }

    /// Append a gate that runs only when `condition` holds.
    pub fn add_conditioned_gate(
        &mut self,
        kind: GateKind,
        targets: impl IntoIterator<Item = QubitId>,
        controls: impl IntoIterator<Item = QubitId>,
        param: Option<f64>,
        condition: ClassicalCondition,
    ) -> IrResult<&mut Self> {
        let mut gate = GateInstruction::new(kind, targets)
            .with_controls(controls)
            .with_condition(condition);
        gate.param = param;
        self.push_gate(gate)
    }

    /// Measure a qubit into a classical bit.
    pub fn add_measurement(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.check_qubit(qubit, Some("measure"))?;
        self.check_clbit(clbit, Some("measure"))?;
        self.instructions.push(Instruction::Measure { qubit, clbit });
        Ok(self)
    }

    fn single(&mut self, kind: GateKind, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_gate(GateInstruction::new(kind, [qubit]))
    }

    fn rotation(&mut self, kind: GateKind, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_gate(GateInstruction::new(kind, [qubit]).with_param(theta))
    }

    fn controlled(
        &mut self,
        kind: GateKind,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.push_gate(GateInstruction::new(kind, [target]).with_controls([control]))
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(GateKind::H, qubit)
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(GateKind::X, qubit)
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(GateKind::Y, qubit)
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(GateKind::Z, qubit)
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(GateKind::S, qubit)
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(GateKind::Sdg, qubit)
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(GateKind::T, qubit)
    }

    /// Apply T-dagger gate.
    pub fn tdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(GateKind::Tdg, qubit)
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(GateKind::SX, qubit)
    }

    /// Apply Rx rotation gate.
    pub fn rx(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.rotation(GateKind::Rx, theta, qubit)
    }

    /// Apply Ry rotation gate.
    pub fn ry(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.rotation(GateKind::Ry, theta, qubit)
    }

    /// Apply Rz rotation gate.
    pub fn rz(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.rotation(GateKind::Rz, theta, qubit)
    }

    /// Apply phase gate.
    pub fn p(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.rotation(GateKind::P, theta, qubit)
    }

    // =========================================================================
    // Multi-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.controlled(GateKind::CX, control, target)
    }

    /// Apply CY gate.
    pub fn cy(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.controlled(GateKind::CY, control, target)
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.controlled(GateKind::CZ, control, target)
    }

    /// Apply controlled-Hadamard gate.
    pub fn ch(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.controlled(GateKind::CH, control, target)
    }

    /// Apply controlled-phase gate.
    pub fn cp(&mut self, theta: f64, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push_gate(
            GateInstruction::new(GateKind::CP, [target])
                .with_controls([control])
                .with_param(theta),
        )
    }

    /// Apply Toffoli (CCX) gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push_gate(GateInstruction::new(GateKind::CCX, [target]).with_controls([c1, c2]))
    }

    /// Apply X under any number of controls.
    pub fn mcx(
        &mut self,
        controls: impl IntoIterator<Item = QubitId>,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.push_gate(GateInstruction::new(GateKind::X, [target]).with_controls(controls))
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.push_gate(GateInstruction::new(GateKind::Swap, [q1, q2]))
    }

    /// Apply Fredkin (CSWAP) gate.
    pub fn cswap(&mut self, control: QubitId, t1: QubitId, t2: QubitId) -> IrResult<&mut Self> {
        self.push_gate(GateInstruction::new(GateKind::CSwap, [t1, t2]).with_controls([control]))
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.add_measurement(qubit, clbit)
    }

    /// Measure qubit `i` into classical bit `i` for every qubit.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        if self.num_qubits > self.num_clbits {
            return Err(IrError::InvalidClassicalBitIndex {
                clbit: ClbitId(self.num_clbits),
                num_clbits: self.num_clbits,
                gate_name: Some("measure".to_string()),
            });
        }
        for i in 0..self.num_qubits {
            self.add_measurement(QubitId(i), ClbitId(i))?;
        }
        Ok(self)
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.check_qubit(qubit, Some("reset"))?;
        self.instructions.push(Instruction::Reset { qubit });
        Ok(self)
    }

    /// Apply a barrier to specified qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        let qubits: Vec<_> = qubits.into_iter().collect();
        for &qubit in &qubits {
            self.check_qubit(qubit, Some("barrier"))?;
        }
        self.instructions.push(Instruction::Barrier { qubits });
        Ok(self)
    }

    /// Apply a barrier to all qubits.
    pub fn barrier_all(&mut self) -> IrResult<&mut Self> {
        let qubits = (0..self.num_qubits).map(QubitId);
        self.barrier(qubits)
    }

    /// Number of instructions added so far.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether no instruction has been added.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Freeze the builder into an immutable program.
    pub fn finalize(self) -> CircuitProgram {
        CircuitProgram {
            name: self.name,
            num_qubits: self.num_qubits,
            num_clbits: self.num_clbits,
            instructions: self.instructions,
        }
    }
}

/// An immutable, validated sequence of instructions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitProgram {
    name: String,
    num_qubits: u32,
    num_clbits: u32,
    instructions: Vec<Instruction>,
}

impl CircuitProgram {
    /// Get the program name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> u32 {
        self.num_clbits
    }

    /// Instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of gate instructions.
    pub fn gate_count(&self) -> usize {
        self.instructions.iter().filter(|i| i.is_gate()).count()
    }

    /// Gate instructions in program order.
    pub fn gates(&self) -> impl Iterator<Item = &GateInstruction> + '_ {
        self.instructions.iter().filter_map(Instruction::as_gate)
    }

    /// `(qubit, clbit)` pairs of every measurement, in program order.
    pub fn measurements(&self) -> impl Iterator<Item = (QubitId, ClbitId)> + '_ {
        self.instructions.iter().filter_map(|inst| match inst {
            Instruction::Measure { qubit, clbit } => Some((*qubit, *clbit)),
            _ => None,
        })
    }

    /// Final source qubit of every written classical bit, ordered by clbit.
    ///
    /// When several measurements write the same classical bit the last one
    /// wins, matching what a replay would leave in the register.
    pub fn terminal_measurement_map(&self) -> Vec<(QubitId, ClbitId)> {
        let mut sources: Vec<Option<QubitId>> = vec![None; self.num_clbits as usize];
        for (qubit, clbit) in self.measurements() {
            sources[clbit.index()] = Some(qubit);
        }
        sources
            .into_iter()
            .enumerate()
            .filter_map(|(c, q)| q.map(|q| (q, ClbitId(c as u32))))
            .collect()
    }

    /// Whether shots must be replayed one by one with collapse.
    ///
    /// True when a gate is classically conditioned, a reset is present, or an
    /// instruction acts on a qubit that has already been measured.
    pub fn requires_trajectories(&self) -> bool {
        let mut measured = vec![false; self.num_qubits as usize];
        for inst in &self.instructions {
            match inst {
                Instruction::Gate(gate) => {
                    if gate.is_conditioned() || gate.qubits().any(|q| measured[q.index()]) {
                        return true;
                    }
                }
                Instruction::Reset { .. } => return true,
                Instruction::Measure { qubit, .. } => measured[qubit.index()] = true,
                Instruction::Barrier { .. } => {}
            }
        }
        false
    }

    /// Copy of the program without trailing measurements.
    ///
    /// A measurement is trailing when no later instruction touches its qubit
    /// and no later condition reads its classical bit.
    #[must_use]
    pub fn remove_final_measurements(&self) -> Self {
        let mut touched_later = vec![false; self.num_qubits as usize];
        let mut read_later = vec![false; self.num_clbits as usize];
        let mut kept: Vec<Instruction> = Vec::with_capacity(self.instructions.len());

        for inst in self.instructions.iter().rev() {
            match inst {
                Instruction::Measure { qubit, clbit } => {
                    if !touched_later[qubit.index()] && !read_later[clbit.index()] {
                        continue;
                    }
                    touched_later[qubit.index()] = true;
                }
                Instruction::Gate(gate) => {
                    for q in gate.qubits() {
                        touched_later[q.index()] = true;
                    }
                    if let Some(condition) = &gate.condition {
                        for c in &condition.clbits {
                            read_later[c.index()] = true;
                        }
                    }
                }
                Instruction::Reset { qubit } => touched_later[qubit.index()] = true,
                Instruction::Barrier { .. } => {}
            }
            kept.push(inst.clone());
        }
        kept.reverse();

        Self {
            name: self.name.clone(),
            num_qubits: self.num_qubits,
            num_clbits: self.num_clbits,
            instructions: kept,
        }
    }
}
