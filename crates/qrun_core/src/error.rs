//! Error types for QRUN
//!
//! Gantree: L0_Foundation → Errors
//!
//! One error enum shared by every runtime crate.

// Error variant fields are self-documenting via error messages
#![allow(missing_docs)]

use thiserror::Error;

/// Main error type for QRUN
/// Gantree: QrunError // enum
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QrunError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Qubit index out of range
    /// Gantree: QubitOutOfRange{{q,max}} // 큐비트 범위
    #[error("Qubit {qubit} out of range: register has {num_qubits} qubits")]
    QubitOutOfRange { qubit: usize, num_qubits: usize },

    /// Basis index out of range
    #[error("Basis index {index} out of range: dimension is {dim}")]
    IndexOutOfRange { index: usize, dim: usize },

    /// Same qubit used twice in one multi-qubit gate
    #[error("Gate operands must be distinct, qubit {0} repeated")]
    DuplicateQubit(usize),

    /// Invalid gate parameter
    #[error("Invalid gate parameter: {0}")]
    InvalidGateParameter(String),

    /// Invalid configuration value
    /// Gantree: InvalidConfig(String) // 설정 검증
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Register Errors
    // ========================================================================
    /// Register handle not live
    /// Gantree: InvalidRegister{{kind,id}} // 핸들 무효
    #[error("Invalid {kind} register id {id}")]
    InvalidRegister { kind: &'static str, id: usize },

    /// Amplitude vector length differs from register dimension
    /// Gantree: ShapeMismatch{{expected,actual}} // 차원 불일치
    #[error("Shape mismatch: expected {expected} amplitudes, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Named snapshot not cached
    #[error("Snapshot '{0}' not found")]
    SnapshotNotFound(String),

    // ========================================================================
    // Circuit Errors
    // ========================================================================
    /// Unparseable instruction line
    #[error("Invalid instruction at line {line}: {reason}")]
    InvalidInstruction { line: usize, reason: String },

    /// Gate spans two separable partitions
    /// Gantree: CrossPartitionGate(String) // 분할 교차
    #[error("Gate '{0}' spans multiple partitions")]
    CrossPartitionGate(String),

    /// Circuit exceeds a hardware profile
    /// Gantree: ProfileViolation(Vec<String>) // 프로파일 위반
    #[error("Hardware profile violated: {}", .0.join("; "))]
    ProfileViolation(Vec<String>),

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// Backend execution error
    /// Gantree: BackendError(String) // 백엔드
    #[error("Backend error: {0}")]
    BackendError(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(String),

    /// File I/O error
    #[error("File error: {0}")]
    FileError(String),

    /// Persisted state is truncated or inconsistent
    #[error("Corrupt state file: {0}")]
    CorruptState(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type alias for QRUN operations
/// Gantree: QrunResult<T> // type alias
pub type QrunResult<T> = Result<T, QrunError>;

// ============================================================================
// Error Conversion Helpers
// ============================================================================

impl From<serde_json::Error> for QrunError {
    fn from(err: serde_json::Error) -> Self {
        QrunError::JsonError(err.to_string())
    }
}

impl From<std::io::Error> for QrunError {
    fn from(err: std::io::Error) -> Self {
        QrunError::FileError(err.to_string())
    }
}

// ============================================================================
// Error Helpers
// ============================================================================

impl QrunError {
    /// Check if the caller can retry or continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            QrunError::SnapshotNotFound(_)
                | QrunError::ShapeMismatch { .. }
                | QrunError::CrossPartitionGate(_)
                | QrunError::BackendError(_)
        )
    }

    /// Check if error is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            QrunError::QubitOutOfRange { .. }
                | QrunError::IndexOutOfRange { .. }
                | QrunError::DuplicateQubit(_)
                | QrunError::InvalidGateParameter(_)
                | QrunError::InvalidConfig(_)
        )
    }

    /// Check if error came from the filesystem or persisted data
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            QrunError::FileError(_) | QrunError::CorruptState(_) | QrunError::JsonError(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qubit_out_of_range() {
        let err = QrunError::QubitOutOfRange {
            qubit: 10,
            num_qubits: 7,
        };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("7"));
    }

    #[test]
    fn test_invalid_register_display() {
        let err = QrunError::InvalidRegister {
            kind: "quantum",
            id: 3,
        };
        assert_eq!(err.to_string(), "Invalid quantum register id 3");
    }

    #[test]
    fn test_profile_violation_joins_diagnostics() {
        let err = QrunError::ProfileViolation(vec!["too many qubits".into(), "gate x".into()]);
        assert!(err.to_string().contains("too many qubits; gate x"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(QrunError::SnapshotNotFound("zone".into()).is_recoverable());
        assert!(!QrunError::InternalError("x".into()).is_recoverable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: QrunError = io.into();
        assert!(err.is_io_error());
        assert!(matches!(err, QrunError::FileError(_)));
    }

    #[test]
    fn test_json_conversion() {
        let err: QrunError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, QrunError::JsonError(_)));
    }
}
