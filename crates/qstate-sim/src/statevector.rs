//! Dense statevector and in-place gate contraction.
//!
//! Bit `i` of a basis index is the state of qubit `i`.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use qstate_ir::{GateMatrix, IrError, QubitId};

use crate::config::HARD_MAX_QUBITS;
use crate::error::{SimError, SimResult};

/// A statevector representing a quantum state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

/// Spread the bits of `value` around zero bits inserted at `positions`.
///
/// `positions` must be sorted ascending.
#[inline]
pub(crate) fn insert_zero_bits(mut value: usize, positions: &[usize]) -> usize {
    for &pos in positions {
        let low = value & ((1usize << pos) - 1);
        value = ((value >> pos) << (pos + 1)) | low;
    }
    value
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    ///
    /// Allocates `2^num_qubits` amplitudes. Registers wider than
    /// [`HARD_MAX_QUBITS`] are refused before allocating.
    pub fn new(num_qubits: usize) -> SimResult<Self> {
        if num_qubits > HARD_MAX_QUBITS as usize {
            return Err(SimError::QubitBudgetExceeded {
                requested: u32::try_from(num_qubits).unwrap_or(u32::MAX),
                max: HARD_MAX_QUBITS,
            });
        }
        let size = 1usize << num_qubits;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Ok(Self {
            amplitudes,
            num_qubits,
        })
    }

    /// Wrap explicit amplitudes; the length must be a power of two and the
    /// vector normalized within `tolerance`.
    pub fn from_amplitudes(amplitudes: Vec<Complex64>, tolerance: f64) -> SimResult<Self> {
        let len = amplitudes.len();
        if len == 0 || !len.is_power_of_two() {
            return Err(SimError::Configuration(format!(
                "amplitude buffer length {len} is not a power of two"
            )));
        }
        let sv = Self {
            num_qubits: len.trailing_zeros() as usize,
            amplitudes,
        };
        sv.check_normalized(tolerance, "statevector construction")?;
        Ok(sv)
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of amplitudes (`2^n`).
    pub fn dimension(&self) -> usize {
        self.amplitudes.len()
    }

    /// All amplitudes, indexed by basis state.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Amplitude of one basis state.
    pub fn amplitude(&self, index: usize) -> Complex64 {
        self.amplitudes[index]
    }

    /// Sum of squared magnitudes.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    /// Probability of every basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// Fail with [`SimError::Normalization`] if the norm drifted.
    pub fn check_normalized(&self, tolerance: f64, context: &str) -> SimResult<()> {
        let total = self.norm_sqr();
        if (total - 1.0).abs() > tolerance {
            return Err(SimError::normalization(context, total, tolerance));
        }
        Ok(())
    }

    /// ⟨self|other⟩.
    pub fn inner(&self, other: &Statevector) -> Complex64 {
        self.amplitudes
            .iter()
            .zip(&other.amplitudes)
            .map(|(a, b)| a.conj() * b)
            .sum()
    }

    /// |⟨self|other⟩|², insensitive to global phase.
    pub fn fidelity(&self, other: &Statevector) -> f64 {
        if self.num_qubits != other.num_qubits {
            return 0.0;
        }
        self.inner(other).norm_sqr()
    }

    /// Amplitude-wise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &Statevector, tolerance: f64) -> bool {
        self.num_qubits == other.num_qubits
            && self
                .amplitudes
                .iter()
                .zip(&other.amplitudes)
                .all(|(a, b)| (a - b).norm() <= tolerance)
    }

    /// Check that `qubits` are distinct and in range; return their indices.
    pub(crate) fn resolve_qubits(&self, qubits: &[QubitId], context: &str) -> SimResult<Vec<usize>> {
        let mut seen = 0u64;
        qubits
            .iter()
            .map(|&q| {
                if q.index() >= self.num_qubits {
                    return Err(IrError::InvalidQubitIndex {
                        qubit: q,
                        num_qubits: self.num_qubits as u32,
                        gate_name: Some(context.to_string()),
                    }
                    .into());
                }
                if seen & (1 << q.index()) != 0 {
                    return Err(IrError::DuplicateQubitReference {
                        qubit: q,
                        gate_name: Some(context.to_string()),
                    }
                    .into());
                }
                seen |= 1 << q.index();
                Ok(q.index())
            })
            .collect()
    }

    /// Bitstring of a basis index, position `i` = qubit `i`.
    pub fn basis_bitstring(&self, index: usize) -> String {
        (0..self.num_qubits)
            .map(|q| if (index >> q) & 1 == 1 { '1' } else { '0' })
            .collect()
    }

    // =========================================================================
    // Gate contraction
    // =========================================================================

    /// Left-multiply every target sub-block whose controls are all 1 by
    /// `matrix`.
    ///
    /// Operand `j` of `matrix` is `targets[j]`. Operands must be distinct and
    /// in range; the program builder guarantees both.
    pub(crate) fn apply_matrix(&mut self, matrix: &GateMatrix, targets: &[usize], controls: &[usize]) {
        debug_assert_eq!(matrix.nrows(), 1 << targets.len());

        let ctrl_mask = controls.iter().fold(0usize, |m, &c| m | (1 << c));
        let mut fixed: Vec<usize> = targets.iter().chain(controls).copied().collect();
        fixed.sort_unstable();
        let groups = self.amplitudes.len() >> fixed.len();

        if let [target] = targets {
            self.apply_single_target(matrix, *target, ctrl_mask, &fixed, groups);
        } else {
            self.apply_multi_target(matrix, targets, ctrl_mask, &fixed, groups);
        }
    }

    fn apply_single_target(
        &mut self,
        matrix: &GateMatrix,
        target: usize,
        ctrl_mask: usize,
        fixed: &[usize],
        groups: usize,
    ) {
        let (m00, m01, m10, m11) = (
            matrix[[0, 0]],
            matrix[[0, 1]],
            matrix[[1, 0]],
            matrix[[1, 1]],
        );
        let tgt_mask = 1 << target;

        for g in 0..groups {
            let i = insert_zero_bits(g, fixed) | ctrl_mask;
            let j = i | tgt_mask;
            let a = self.amplitudes[i];
            let b = self.amplitudes[j];
            self.amplitudes[i] = m00 * a + m01 * b;
            self.amplitudes[j] = m10 * a + m11 * b;
        }
    }

    fn apply_multi_target(
        &mut self,
        matrix: &GateMatrix,
        targets: &[usize],
        ctrl_mask: usize,
        fixed: &[usize],
        groups: usize,
    ) {
        let block = 1usize << targets.len();
        let offsets: Vec<usize> = (0..block)
            .map(|local| {
                targets
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| (local >> j) & 1 == 1)
                    .fold(0, |acc, (_, &t)| acc | (1 << t))
            })
            .collect();
        let m: Vec<Complex64> = matrix.iter().copied().collect();
        let mut gathered = vec![Complex64::new(0.0, 0.0); block];

        for g in 0..groups {
            let base = insert_zero_bits(g, fixed) | ctrl_mask;
            for (slot, &offset) in gathered.iter_mut().zip(&offsets) {
                *slot = self.amplitudes[base | offset];
            }
            for (row, &offset) in offsets.iter().enumerate() {
                let coeffs = &m[row * block..(row + 1) * block];
                self.amplitudes[base | offset] = coeffs
                    .iter()
                    .zip(&gathered)
                    .map(|(c, a)| c * a)
                    .sum();
            }
        }
    }

    // =========================================================================
    // Projection
    // =========================================================================

    /// Probability that `qubit` reads 1.
    pub fn probability_of_one(&self, qubit: usize) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    /// Probability that `qubit` reads `outcome`, summed over the matching
    /// amplitudes only.
    pub fn probability_of(&self, qubit: usize, outcome: bool) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| (i & mask != 0) == outcome)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    /// Zero every amplitude where `qubit` disagrees with `outcome` and
    /// rescale the rest by `1/sqrt(kept)`.
    ///
    /// `kept` is the probability of `outcome` before projection and must be
    /// positive.
    pub(crate) fn project(&mut self, qubit: usize, outcome: bool, kept: f64) {
        let mask = 1 << qubit;
        let scale = 1.0 / kept.sqrt();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) == outcome {
                *amp *= scale;
            } else {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qstate_ir::{GateKind, GateLibrary};
    use std::f64::consts::FRAC_1_SQRT_2;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    fn matrix(kind: GateKind) -> GateMatrix {
        GateLibrary::target_matrix(kind, None).unwrap()
    }

    #[test]
    fn test_oversized_register_is_refused() {
        assert!(matches!(
            Statevector::new(64),
            Err(SimError::QubitBudgetExceeded { requested: 64, max: 32 })
        ));
        assert!(Statevector::new(usize::MAX).is_err());
    }

    #[test]
    fn test_initial_state() {
        let sv = Statevector::new(2).unwrap();
        assert!(approx_eq(sv.amplitudes[0], Complex64::new(1.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[2], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[3], Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn test_insert_zero_bits() {
        assert_eq!(insert_zero_bits(0b11, &[1]), 0b101);
        assert_eq!(insert_zero_bits(0b111, &[0, 2]), 0b11010);
        assert_eq!(insert_zero_bits(0, &[0, 1, 2]), 0);
    }

    #[test]
    fn test_hadamard() {
        let mut sv = Statevector::new(1).unwrap();
        sv.apply_matrix(&matrix(GateKind::H), &[0], &[]);

        assert!(approx_eq(sv.amplitudes[0], Complex64::new(FRAC_1_SQRT_2, 0.0)));
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(FRAC_1_SQRT_2, 0.0)));
    }

    #[test]
    fn test_bell_state() {
        let mut sv = Statevector::new(2).unwrap();
        sv.apply_matrix(&matrix(GateKind::H), &[0], &[]);
        sv.apply_matrix(&matrix(GateKind::X), &[1], &[0]);

        assert!(approx_eq(sv.amplitudes[0], Complex64::new(FRAC_1_SQRT_2, 0.0)));
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[2], Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitudes[3], Complex64::new(FRAC_1_SQRT_2, 0.0)));
    }

    #[test]
    fn test_x_gate_on_high_qubit() {
        let mut sv = Statevector::new(3).unwrap();
        sv.apply_matrix(&matrix(GateKind::X), &[2], &[]);
        assert!(approx_eq(sv.amplitudes[0b100], Complex64::new(1.0, 0.0)));
        assert_eq!(sv.basis_bitstring(0b100), "001");
    }

    #[test]
    fn test_toffoli_needs_both_controls() {
        let x = matrix(GateKind::X);
        let mut sv = Statevector::new(3).unwrap();
        sv.apply_matrix(&x, &[0], &[]);
        sv.apply_matrix(&x, &[2], &[0, 1]);
        assert!(approx_eq(sv.amplitudes[0b001], Complex64::new(1.0, 0.0)));

        sv.apply_matrix(&x, &[1], &[]);
        sv.apply_matrix(&x, &[2], &[0, 1]);
        assert!(approx_eq(sv.amplitudes[0b111], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_swap_multi_target() {
        let swap = matrix(GateKind::Swap);
        let mut sv = Statevector::new(3).unwrap();
        sv.apply_matrix(&matrix(GateKind::X), &[0], &[]);
        sv.apply_matrix(&swap, &[0, 2], &[]);
        assert!(approx_eq(sv.amplitudes[0b100], Complex64::new(1.0, 0.0)));

        // Controlled swap with the control off leaves the state alone.
        sv.apply_matrix(&swap, &[2, 0], &[1]);
        assert!(approx_eq(sv.amplitudes[0b100], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_multi_target_matches_full_matrix() {
        // CX as a 2-target block (operands [control, target]) equals CX via
        // the control list.
        let full = GateLibrary::matrix_for(GateKind::CX, None).unwrap();
        let mut a = Statevector::new(3).unwrap();
        let mut b = Statevector::new(3).unwrap();
        for sv in [&mut a, &mut b] {
            sv.apply_matrix(&matrix(GateKind::H), &[2], &[]);
            sv.apply_matrix(&matrix(GateKind::H), &[0], &[]);
        }
        a.apply_matrix(&full, &[2, 1], &[]);
        b.apply_matrix(&matrix(GateKind::X), &[1], &[2]);
        assert!(a.approx_eq(&b, 1e-12));
    }

    #[test]
    fn test_projection() {
        let mut sv = Statevector::new(1).unwrap();
        sv.apply_matrix(&matrix(GateKind::H), &[0], &[]);
        let p1 = sv.probability_of_one(0);
        assert!((p1 - 0.5).abs() < 1e-12);
        sv.project(0, true, p1);
        assert!(approx_eq(sv.amplitudes[1], Complex64::new(1.0, 0.0)));
        assert!(sv.check_normalized(1e-9, "test").is_ok());
    }

    #[test]
    fn test_from_amplitudes_validation() {
        let bad_len = vec![Complex64::new(1.0, 0.0); 3];
        assert!(Statevector::from_amplitudes(bad_len, 1e-9).is_err());
        let unnormalized = vec![Complex64::new(1.0, 0.0); 2];
        assert!(matches!(
            Statevector::from_amplitudes(unnormalized, 1e-9),
            Err(SimError::Normalization { .. })
        ));
        let plus = vec![Complex64::new(FRAC_1_SQRT_2, 0.0); 2];
        assert_eq!(Statevector::from_amplitudes(plus, 1e-9).unwrap().num_qubits(), 1);
    }
}
