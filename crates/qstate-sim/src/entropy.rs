//! Reduced density matrices and von Neumann entropy.
//!
//! The reduced state of a subset `A` is `ρ_A = Tr_B |ψ⟩⟨ψ|`, with local bit
//! `j` of a row or column index standing for `subset[j]`. Entropy is
//! `S = -Σ λ log₂ λ` over the eigenvalues of `ρ_A`.
//!
//! Eigenvalues come from a cyclic Jacobi sweep on the real symmetric
//! embedding `[[Re ρ, -Im ρ], [Im ρ, Re ρ]]`, which has every eigenvalue of
//! `ρ` exactly twice.

use ndarray::Array2;
use num_complex::Complex64;
use tracing::trace;

use qstate_ir::QubitId;

use crate::error::SimResult;
use crate::statevector::{Statevector, insert_zero_bits};

/// Hermitian, unit-trace matrix describing a qubit subset.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityMatrix {
    matrix: Array2<Complex64>,
    qubits: Vec<QubitId>,
}

impl DensityMatrix {
    /// Qubits this matrix describes; local bit `j` is `qubits[j]`.
    pub fn qubits(&self) -> &[QubitId] {
        &self.qubits
    }

    /// Matrix dimension (`2^k`).
    pub fn dimension(&self) -> usize {
        self.matrix.nrows()
    }

    /// Element `ρ[row, col]`.
    pub fn get(&self, row: usize, col: usize) -> Option<Complex64> {
        self.matrix.get([row, col]).copied()
    }

    /// Borrow the underlying matrix.
    pub fn as_array(&self) -> &Array2<Complex64> {
        &self.matrix
    }

    /// `Tr ρ`; 1 up to rounding.
    pub fn trace(&self) -> Complex64 {
        self.matrix.diag().sum()
    }

    /// `Tr ρ²`: 1 for a pure reduced state, `1/d` when maximally mixed.
    pub fn purity(&self) -> f64 {
        self.matrix.iter().map(Complex64::norm_sqr).sum()
    }
}

/// Computes partial traces and entanglement entropy.
#[derive(Debug, Clone, Copy)]
pub struct EntropyAnalyzer {
    /// Eigenvalues at or below this contribute nothing.
    pub eigen_tolerance: f64,
    /// Upper bound on Jacobi sweeps.
    pub max_sweeps: usize,
}

impl Default for EntropyAnalyzer {
    fn default() -> Self {
        Self {
            eigen_tolerance: 1e-12,
            max_sweeps: 100,
        }
    }
}

impl EntropyAnalyzer {
    /// Trace out every qubit not in `subset`.
    pub fn reduced_density_matrix(
        &self,
        sv: &Statevector,
        subset: &[QubitId],
    ) -> SimResult<DensityMatrix> {
        let kept = sv.resolve_qubits(subset, "partial_trace")?;
        let mut sorted = kept.clone();
        sorted.sort_unstable();

        let dim = 1usize << kept.len();
        let offsets: Vec<usize> = (0..dim)
            .map(|local| {
                kept.iter()
                    .enumerate()
                    .filter(|&(j, _)| (local >> j) & 1 == 1)
                    .fold(0, |acc, (_, &q)| acc | (1 << q))
            })
            .collect();

        let amps = sv.amplitudes();
        let mut matrix = Array2::<Complex64>::zeros((dim, dim));
        let mut column = vec![Complex64::new(0.0, 0.0); dim];

        for rest in 0..(sv.dimension() >> kept.len()) {
            let base = insert_zero_bits(rest, &sorted);
            for (slot, &offset) in column.iter_mut().zip(&offsets) {
                *slot = amps[base | offset];
            }
            for (i, a) in column.iter().enumerate() {
                if a.norm_sqr() == 0.0 {
                    continue;
                }
                for (j, b) in column.iter().enumerate() {
                    matrix[[i, j]] += a * b.conj();
                }
            }
        }

        Ok(DensityMatrix {
            matrix,
            qubits: subset.to_vec(),
        })
    }

    /// Eigenvalues of `rho`, ascending.
    pub fn eigenvalues(&self, rho: &DensityMatrix) -> Vec<f64> {
        let d = rho.dimension();
        let mut embed = Array2::<f64>::zeros((2 * d, 2 * d));
        for ((i, j), z) in rho.matrix.indexed_iter() {
            embed[[i, j]] = z.re;
            embed[[i + d, j + d]] = z.re;
            embed[[i, j + d]] = -z.im;
            embed[[i + d, j]] = z.im;
        }

        let sweeps = jacobi_diagonalize(&mut embed, self.max_sweeps);
        trace!(dimension = d, sweeps, "diagonalized reduced state");

        // Each eigenvalue appears twice in the embedding.
        let mut values: Vec<f64> = embed.diag().to_vec();
        values.sort_by(f64::total_cmp);
        values.into_iter().step_by(2).collect()
    }

    /// `S(ρ) = -Σ λ log₂ λ` in bits.
    pub fn von_neumann_entropy(&self, rho: &DensityMatrix) -> f64 {
        let entropy: f64 = self
            .eigenvalues(rho)
            .into_iter()
            .filter(|&lambda| lambda > self.eigen_tolerance)
            .map(|lambda| -lambda * lambda.log2())
            .sum();
        entropy.max(0.0)
    }

    /// Entanglement entropy of `subset` with the rest of the register.
    pub fn entropy(&self, sv: &Statevector, subset: &[QubitId]) -> SimResult<f64> {
        let rho = self.reduced_density_matrix(sv, subset)?;
        Ok(self.von_neumann_entropy(&rho))
    }
}

/// Cyclic Jacobi eigenvalue iteration on a real symmetric matrix.
///
/// Leaves the eigenvalues on the diagonal and returns the sweeps used.
fn jacobi_diagonalize(a: &mut Array2<f64>, max_sweeps: usize) -> usize {
    let n = a.nrows();
    for sweep in 0..max_sweeps {
        let off: f64 = a
            .indexed_iter()
            .filter(|((i, j), _)| i != j)
            .map(|(_, v)| v * v)
            .sum();
        if off < 1e-28 {
            return sweep;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() < 1e-300 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
            }
        }
    }
    max_sweeps
}
