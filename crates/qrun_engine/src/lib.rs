//! # QRUN Engine
//!
//! Runtime assembly for QRUN: configuration, separability partitioning,
//! peephole pattern folding and the `Runtime` service object tying the
//! memory, scheduling and backend layers together.
//!
//! ## Gantree Architecture
//!
//! ```text
//! qrun_engine // L6: Engine (완료)
//!     RuntimeConfig // JSON 설정 + 프리셋 (완료)
//!     Partitioner // 분리 가능 영역 분석 + 분할 실행 (완료)
//!         analyze_separable_regions // union-find (완료)
//!         execute_partitions // 부분 상태 시뮬레이션 + 텐서곱 (완료)
//!     Patterns // QFT2 / GROVER2 치환 (완료)
//!     Runtime // 매니저 + 스케줄러 + 프로파일 (완료)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use qrun_engine::prelude::*;
//!
//! let mut circuit = Circuit::parse("H q 1\nCNOT q 1 q 0\nS q 0\nH q 0\nSWAP q 0 q 1\nX r 0\n").unwrap();
//! assert_eq!(optimize_patterns(&mut circuit), 1);
//!
//! let runtime = Runtime::new(RuntimeConfig::in_memory()).unwrap();
//! let state = runtime.execute_separable(&circuit).unwrap();
//! assert_eq!(state.num_qubits(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Runtime configuration (Gantree: L6_Engine → RuntimeConfig)
pub mod config;

/// Separability partitioner (Gantree: L6_Engine → Partitioner)
pub mod partitioner;

/// Peephole patterns (Gantree: L6_Engine → Patterns)
pub mod patterns;

/// Runtime service (Gantree: L6_Engine → Runtime)
pub mod runtime;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::RuntimeConfig;
pub use partitioner::{
    analyze_separable_regions, execute_components, execute_on_partitions, execute_partitions,
    recombine, tensor_product, CrossPartitionPolicy, Partition,
};
pub use patterns::{apply_grover2, apply_qft2, optimize_patterns};
pub use runtime::Runtime;

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases

    pub use crate::config::RuntimeConfig;
    pub use crate::partitioner::{analyze_separable_regions, execute_partitions, CrossPartitionPolicy};
    pub use crate::patterns::{apply_grover2, apply_qft2, optimize_patterns};
    pub use crate::runtime::Runtime;
    pub use qrun_backend::{HardwareProfile, QpuBackend};
    pub use qrun_memory::{QRegister, RegisterManager};
    pub use qrun_schedule::{Scheduler, Task};
    pub use qrun_state::prelude::*;
}

// ============================================================================
// Integration Tests
// ============================================================================
