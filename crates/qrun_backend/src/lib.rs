//! # QRUN Backend
//!
//! QPU backend contract, textual IR emission and hardware profile
//! validation for the QRUN runtime.
//!
//! ## Gantree Architecture
//!
//! ```text
//! qrun_backend // L5: Backend (완료)
//!     QpuBackend // 백엔드 trait + RecordingBackend (완료)
//!     emit_qir // QIR 텍스트 생성 (완료)
//!     HardwareProfile // JSON 프로파일 + 검증 (완료)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use qrun_backend::prelude::*;
//! use qrun_core::Circuit;
//!
//! let circuit = Circuit::parse("H q 0\nCNOT q 0 q 1\n").unwrap();
//! let profile = HardwareProfile::new("sim").with_max_qubits(2);
//! assert!(profile.check(&circuit).is_ok());
//!
//! let backend = RecordingBackend::new("mock");
//! backend.execute_ir(&emit_qir(&circuit)).unwrap();
//! assert_eq!(backend.calls(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Backend trait and IR emission (Gantree: L5_Backend → QpuBackend)
pub mod execution;

/// Hardware profiles (Gantree: L5_Backend → HardwareProfile)
pub mod profile;

// ============================================================================
// Re-exports
// ============================================================================

pub use execution::{emit_qir, QpuBackend, RecordingBackend};
pub use profile::HardwareProfile;

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases

    pub use crate::execution::{emit_qir, QpuBackend, RecordingBackend};
    pub use crate::profile::HardwareProfile;
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use qrun_core::{Circuit, QrunError};
    use std::sync::Arc;

    #[test]
    fn test_validated_circuit_dispatch() {
        let circuit = Circuit::parse("QALLOC q 2\nH q 0\nCNOT q 0 q 1\nMEASURE q 1\n").unwrap();
        let profile = HardwareProfile::new("dev")
            .with_max_qubits(2)
            .with_gates(["H", "CNOT"]);
        profile.check(&circuit).unwrap();

        let backend: Arc<dyn QpuBackend> = Arc::new(RecordingBackend::new("mock"));
        backend.execute_ir(&emit_qir(&circuit)).unwrap();
        assert_eq!(backend.name(), "mock");
    }

    #[test]
    fn test_rejected_before_dispatch() {
        let circuit = Circuit::parse("CCX q 0 q 1 q 2\n").unwrap();
        let profile = HardwareProfile::new("dev").with_max_qubits(2).with_gates(["H"]);
        let err = profile.check(&circuit).unwrap_err();
        assert!(matches!(&err, QrunError::ProfileViolation(v) if v.len() == 2));
        assert!(err.to_string().contains("; "));
    }
}
