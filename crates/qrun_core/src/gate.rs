//! Quantum gate definitions for QRUN
//!
//! Gantree: L1_Circuit → Gate
//!
//! The fixed gate set of the runtime. Gates are generic over the
//! operand type so the same enum serves register-local indices
//! (`Gate<QubitId>`) and named references from an instruction
//! stream (`Gate<QubitRef>`).

use crate::types::{Amplitude, Angle, QubitId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 2x2 complex matrix, row-major
pub type Matrix2 = [[Amplitude; 2]; 2];

/// Quantum gate enumeration
/// Gantree: Gate<Q> // 게이트 enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Gate<Q = QubitId> {
    // ========================================================================
    // Single-Qubit Gates
    // ========================================================================
    /// Hadamard gate
    /// Gantree: H(Q) // 하다마드
    H(Q),

    /// Pauli-X gate (NOT)
    X(Q),

    /// Pauli-Y gate
    Y(Q),

    /// Pauli-Z gate
    Z(Q),

    /// S gate (sqrt(Z))
    S(Q),

    /// T gate (fourth root of Z)
    T(Q),

    /// Rotation around X-axis
    /// Gantree: Rx(Q, Angle) // X 회전
    Rx(Q, Angle),

    /// Rotation around Y-axis
    Ry(Q, Angle),

    /// Rotation around Z-axis
    Rz(Q, Angle),

    // ========================================================================
    // Multi-Qubit Gates
    // ========================================================================
    /// Controlled-NOT (control, target)
    /// Gantree: Cnot(Q, Q) // ctrl, tgt
    Cnot(Q, Q),

    /// Controlled-Z
    Cz(Q, Q),

    /// SWAP gate
    Swap(Q, Q),

    /// Toffoli (control, control, target)
    /// Gantree: Ccx(Q, Q, Q) // 토폴리
    Ccx(Q, Q, Q),

    // ========================================================================
    // Fused Two-Qubit Patterns
    // ========================================================================
    /// Two-qubit QFT: H q1; CNOT q1,q0; S q0; H q0; SWAP q0,q1
    Qft2(Q, Q),

    /// Two-qubit Grover iteration: H q0; H q1; CNOT q1,q0; Z q0; CNOT q1,q0; H q0; H q1
    Grover2(Q, Q),
}

impl<Q> Gate<Q> {
    // ========================================================================
    // Gate Properties
    // ========================================================================

    /// Get qubits involved in this gate, in operand order
    /// Gantree: qubits(&self) -> Vec<&Q> // 관련 큐비트
    pub fn qubits(&self) -> Vec<&Q> {
        match self {
            Gate::H(q)
            | Gate::X(q)
            | Gate::Y(q)
            | Gate::Z(q)
            | Gate::S(q)
            | Gate::T(q)
            | Gate::Rx(q, _)
            | Gate::Ry(q, _)
            | Gate::Rz(q, _) => vec![q],

            Gate::Cnot(a, b)
            | Gate::Cz(a, b)
            | Gate::Swap(a, b)
            | Gate::Qft2(a, b)
            | Gate::Grover2(a, b) => vec![a, b],

            Gate::Ccx(a, b, c) => vec![a, b, c],
        }
    }

    /// Check if gate is single-qubit
    pub fn is_single_qubit(&self) -> bool {
        self.arity() == 1
    }

    /// Check if gate entangles its operands
    /// Gantree: is_entangling(&self) -> bool // 얽힘 판별
    pub fn is_entangling(&self) -> bool {
        self.arity() > 1
    }

    /// Number of operands
    pub fn arity(&self) -> usize {
        match self {
            Gate::Cnot(..) | Gate::Cz(..) | Gate::Swap(..) | Gate::Qft2(..) | Gate::Grover2(..) => 2,
            Gate::Ccx(..) => 3,
            _ => 1,
        }
    }

    /// Check if gate is a Clifford operation
    pub fn is_clifford(&self) -> bool {
        !matches!(
            self,
            Gate::T(_) | Gate::Rx(..) | Gate::Ry(..) | Gate::Rz(..) | Gate::Ccx(..)
        )
    }

    /// Instruction-stream mnemonic
    pub fn name(&self) -> &'static str {
        match self {
            Gate::H(_) => "H",
            Gate::X(_) => "X",
            Gate::Y(_) => "Y",
            Gate::Z(_) => "Z",
            Gate::S(_) => "S",
            Gate::T(_) => "T",
            Gate::Rx(..) => "RX",
            Gate::Ry(..) => "RY",
            Gate::Rz(..) => "RZ",
            Gate::Cnot(..) => "CNOT",
            Gate::Cz(..) => "CZ",
            Gate::Swap(..) => "SWAP",
            Gate::Ccx(..) => "CCX",
            Gate::Qft2(..) => "QFT2",
            Gate::Grover2(..) => "GROVER2",
        }
    }

    /// Rotation angle, if parameterized
    pub fn angle(&self) -> Option<Angle> {
        match self {
            Gate::Rx(_, a) | Gate::Ry(_, a) | Gate::Rz(_, a) => Some(*a),
            _ => None,
        }
    }

    // ========================================================================
    // Operand Mapping
    // ========================================================================

    /// Rebuild the gate with each operand transformed
    pub fn map_qubits<R>(&self, mut f: impl FnMut(&Q) -> R) -> Gate<R> {
        match self.try_map_qubits(|q| Ok::<R, std::convert::Infallible>(f(q))) {
            Ok(gate) => gate,
            Err(never) => match never {},
        }
    }

    /// Like [`Gate::map_qubits`] but stops at the first failing operand
    pub fn try_map_qubits<R, E>(
        &self,
        mut f: impl FnMut(&Q) -> Result<R, E>,
    ) -> Result<Gate<R>, E> {
        Ok(match self {
            Gate::H(q) => Gate::H(f(q)?),
            Gate::X(q) => Gate::X(f(q)?),
            Gate::Y(q) => Gate::Y(f(q)?),
            Gate::Z(q) => Gate::Z(f(q)?),
            Gate::S(q) => Gate::S(f(q)?),
            Gate::T(q) => Gate::T(f(q)?),
            Gate::Rx(q, a) => Gate::Rx(f(q)?, *a),
            Gate::Ry(q, a) => Gate::Ry(f(q)?, *a),
            Gate::Rz(q, a) => Gate::Rz(f(q)?, *a),
            Gate::Cnot(a, b) => Gate::Cnot(f(a)?, f(b)?),
            Gate::Cz(a, b) => Gate::Cz(f(a)?, f(b)?),
            Gate::Swap(a, b) => Gate::Swap(f(a)?, f(b)?),
            Gate::Ccx(a, b, c) => Gate::Ccx(f(a)?, f(b)?, f(c)?),
            Gate::Qft2(a, b) => Gate::Qft2(f(a)?, f(b)?),
            Gate::Grover2(a, b) => Gate::Grover2(f(a)?, f(b)?),
        })
    }
}

impl<Q: Clone> Gate<Q> {
    /// Expand fused patterns into primitive gates; primitives return themselves
    /// Gantree: decompose(&self) -> Vec<Gate<Q>> // 패턴 전개
    pub fn decompose(&self) -> Vec<Gate<Q>> {
        match self {
            Gate::Qft2(q0, q1) => vec![
                Gate::H(q1.clone()),
                Gate::Cnot(q1.clone(), q0.clone()),
                Gate::S(q0.clone()),
                Gate::H(q0.clone()),
                Gate::Swap(q0.clone(), q1.clone()),
            ],
            Gate::Grover2(q0, q1) => vec![
                Gate::H(q0.clone()),
                Gate::H(q1.clone()),
                Gate::Cnot(q1.clone(), q0.clone()),
                Gate::Z(q0.clone()),
                Gate::Cnot(q1.clone(), q0.clone()),
                Gate::H(q0.clone()),
                Gate::H(q1.clone()),
            ],
            other => vec![other.clone()],
        }
    }
}

impl<Q> Gate<Q> {
    /// Unitary matrix of a single-qubit gate
    /// Gantree: matrix(&self) -> Option<Matrix2> // 2x2 행렬
    pub fn matrix(&self) -> Option<Matrix2> {
        let zero = Amplitude::new(0.0, 0.0);
        let one = Amplitude::new(1.0, 0.0);
        let m = match self {
            Gate::H(_) => {
                let h = Amplitude::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
                [[h, h], [h, -h]]
            }
            Gate::X(_) => [[zero, one], [one, zero]],
            Gate::Y(_) => [
                [zero, Amplitude::new(0.0, -1.0)],
                [Amplitude::new(0.0, 1.0), zero],
            ],
            Gate::Z(_) => [[one, zero], [zero, -one]],
            Gate::S(_) => [[one, zero], [zero, Amplitude::new(0.0, 1.0)]],
            Gate::T(_) => [
                [one, zero],
                [zero, Amplitude::from_polar(1.0, std::f64::consts::FRAC_PI_4)],
            ],
            Gate::Rx(_, theta) => {
                let c = Amplitude::new((theta / 2.0).cos(), 0.0);
                let s = Amplitude::new(0.0, -(theta / 2.0).sin());
                [[c, s], [s, c]]
            }
            Gate::Ry(_, theta) => {
                let c = Amplitude::new((theta / 2.0).cos(), 0.0);
                let s = Amplitude::new((theta / 2.0).sin(), 0.0);
                [[c, -s], [s, c]]
            }
            Gate::Rz(_, theta) => [
                [Amplitude::from_polar(1.0, -theta / 2.0), zero],
                [zero, Amplitude::from_polar(1.0, theta / 2.0)],
            ],
            _ => return None,
        };
        Some(m)
    }
}

/// Product `a * b` of two 2x2 matrices (apply `b` first)
pub fn matmul2(a: &Matrix2, b: &Matrix2) -> Matrix2 {
    let mut out = [[Amplitude::new(0.0, 0.0); 2]; 2];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j];
        }
    }
    out
}

// ============================================================================
// Display
// ============================================================================

impl<Q: fmt::Display> fmt::Display for Gate<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        for q in self.qubits() {
            write!(f, " {}", q)?;
        }
        if let Some(a) = self.angle() {
            write!(f, " {}", a)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
