//! # QRUN Core
//!
//! Foundation types, errors, gates and instruction streams for the
//! QRUN quantum circuit execution runtime.
//!
//! ## Gantree Architecture
//!
//! ```text
//! qrun_core // L0+L1: Foundation + Circuit (완료)
//!     L0_Foundation // 기반 타입/상수/에러 (완료)
//!         CoreTypes // 핵심 타입 (완료)
//!         Constants // 수치/저장 상수 (완료)
//!         Errors // 에러 타입 (완료)
//!     L1_Circuit // 명령어 스트림 (완료)
//!         Gate // 게이트 enum (완료)
//!         Circuit // 파싱 + 분석 (완료)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use qrun_core::prelude::*;
//!
//! let circuit = Circuit::parse("QALLOC a 2\nH a 0\nCNOT a 0 a 1\n").unwrap();
//! assert_eq!(circuit.qubit_count(), 2);
//! assert_eq!(circuit.depth(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Core types (Gantree: L0_Foundation → CoreTypes)
pub mod types;

/// Constants (Gantree: L0_Foundation → Constants)
pub mod constants;

/// Error types (Gantree: L0_Foundation → Errors)
pub mod error;

/// Quantum gates (Gantree: L1_Circuit → Gate)
pub mod gate;

/// Instruction streams (Gantree: L1_Circuit → Circuit)
pub mod circuit;

// ============================================================================
// Re-exports
// ============================================================================

pub use circuit::{Circuit, Condition, Instruction, MeasureStore, TaskBlock};
pub use constants::{defaults, numeric, storage};
pub use error::{QrunError, QrunResult};
pub use gate::{matmul2, Gate, Matrix2};
pub use types::{Amplitude, Angle, ExecHint, ExecTarget, QubitId, QubitRef, RegisterId};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases
    //!
    //! ```rust
    //! use qrun_core::prelude::*;
    //! ```

    pub use crate::circuit::{Circuit, Instruction};
    pub use crate::error::{QrunError, QrunResult};
    pub use crate::gate::Gate;
    pub use crate::types::{Amplitude, ExecHint, ExecTarget, QubitId, QubitRef, RegisterId};
}

// ============================================================================
// Version Info
// ============================================================================

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = "qrun_core";

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_parsed_gates_map_to_local_indices() {
        let circuit = Circuit::parse("QALLOC a 3\nCCX a 0 a 1 a 2\nRY a 1 0.5\n").unwrap();
        let local: Vec<Gate> = circuit.gates().map(|g| g.map_qubits(|q| q.index)).collect();
        assert_eq!(local, vec![Gate::Ccx(0, 1, 2), Gate::Ry(1, 0.5)]);
    }

    #[test]
    fn test_fused_pattern_decomposes_after_parse() {
        let circuit = Circuit::parse("GROVER2 r 0 1").unwrap();
        let gate = circuit.gates().next().unwrap();
        let names: Vec<_> = gate.decompose().iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["H", "H", "CNOT", "Z", "CNOT", "H", "H"]);
    }

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "qrun_core");
    }
}
