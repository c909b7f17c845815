//! Canonical unitary matrices for every [`GateKind`].
//!
//! Matrices use the same little-endian convention as the statevector: for a
//! gate acting on operands `[q_0, q_1, ...]`, bit `j` of a row/column index is
//! the state of operand `j`. [`GateLibrary::matrix_for`] orders operands as
//! `[controls..., targets...]`; [`GateLibrary::target_matrix`] covers the
//! targets only and is what the engine applies under the control list.

use ndarray::{Array2, array};
use num_complex::Complex64;
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

use crate::error::{IrError, IrResult};
use crate::gate::GateKind;

/// Dense row-major unitary matrix.
pub type GateMatrix = Array2<Complex64>;

#[inline]
fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// Gate library lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateLibrary;

impl GateLibrary {
    /// Full `2^k × 2^k` unitary, `k = kind.num_qubits()`, operands ordered
    /// `[controls..., targets...]`.
    pub fn matrix_for(kind: GateKind, param: Option<f64>) -> IrResult<GateMatrix> {
        let base = Self::target_matrix(kind, param)?;
        Ok(Self::controlled(&base, kind.num_controls()))
    }

    /// Unitary over the target qubits only.
    pub fn target_matrix(kind: GateKind, param: Option<f64>) -> IrResult<GateMatrix> {
        kind.check_param(param)?;
        let theta = param.unwrap_or(0.0);
        let zero = c(0.0, 0.0);
        let one = c(1.0, 0.0);

        let matrix = match kind.base() {
            GateKind::I => array![[one, zero], [zero, one]],
            GateKind::X => array![[zero, one], [one, zero]],
            GateKind::Y => array![[zero, c(0.0, -1.0)], [c(0.0, 1.0), zero]],
            GateKind::Z => array![[one, zero], [zero, c(-1.0, 0.0)]],
            GateKind::H => {
                let h = c(FRAC_1_SQRT_2, 0.0);
                array![[h, h], [h, -h]]
            }
            GateKind::S => array![[one, zero], [zero, c(0.0, 1.0)]],
            GateKind::Sdg => array![[one, zero], [zero, c(0.0, -1.0)]],
            GateKind::T => array![[one, zero], [zero, Complex64::from_polar(1.0, FRAC_PI_4)]],
            GateKind::Tdg => array![[one, zero], [zero, Complex64::from_polar(1.0, -FRAC_PI_4)]],
            GateKind::SX => array![[c(0.5, 0.5), c(0.5, -0.5)], [c(0.5, -0.5), c(0.5, 0.5)]],
            GateKind::SXdg => array![[c(0.5, -0.5), c(0.5, 0.5)], [c(0.5, 0.5), c(0.5, -0.5)]],
            GateKind::Rx => {
                let (s, co) = (theta / 2.0).sin_cos();
                array![[c(co, 0.0), c(0.0, -s)], [c(0.0, -s), c(co, 0.0)]]
            }
            GateKind::Ry => {
                let (s, co) = (theta / 2.0).sin_cos();
                array![[c(co, 0.0), c(-s, 0.0)], [c(s, 0.0), c(co, 0.0)]]
            }
            GateKind::Rz => array![
                [Complex64::from_polar(1.0, -theta / 2.0), zero],
                [zero, Complex64::from_polar(1.0, theta / 2.0)]
            ],
            GateKind::P => array![[one, zero], [zero, Complex64::from_polar(1.0, theta)]],
            GateKind::Swap => array![
                [one, zero, zero, zero],
                [zero, zero, one, zero],
                [zero, one, zero, zero],
                [zero, zero, zero, one]
            ],
            other => {
                return Err(IrError::UnsupportedGate(format!(
                    "{} has no base unitary",
                    other.name()
                )));
            }
        };
        Ok(matrix)
    }

    /// Expand `base` with `num_controls` controls in the low operand bits.
    pub fn controlled(base: &GateMatrix, num_controls: usize) -> GateMatrix {
        if num_controls == 0 {
            return base.clone();
        }
        let base_dim = base.nrows();
        let ctrl_mask = (1usize << num_controls) - 1;
        let dim = base_dim << num_controls;

        Array2::from_shape_fn((dim, dim), |(row, col)| {
            let row_active = row & ctrl_mask == ctrl_mask;
            let col_active = col & ctrl_mask == ctrl_mask;
            if row_active && col_active {
                base[[row >> num_controls, col >> num_controls]]
            } else if row == col {
                c(1.0, 0.0)
            } else {
                c(0.0, 0.0)
            }
        })
    }

    /// Check `U†U = I` within `tolerance`.
    pub fn is_unitary(matrix: &GateMatrix, tolerance: f64) -> bool {
        if matrix.nrows() != matrix.ncols() {
            return false;
        }
        let adjoint = matrix.t().mapv(|z| z.conj());
        let product = adjoint.dot(matrix);
        product.indexed_iter().all(|((i, j), z)| {
            let expected = if i == j { 1.0 } else { 0.0 };
            (z - c(expected, 0.0)).norm() <= tolerance
        })
    }
}
