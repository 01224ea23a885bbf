//! # QRUN Memory
//!
//! Register lifetime, persistence and checkpointing for the QRUN runtime.
//!
//! ## Gantree Architecture
//!
//! ```text
//! qrun_memory // L3: Memory Management (완료)
//!     Register // QRegister + CRegister (완료)
//!     RegisterManager // 풀, id 재사용, 스냅샷 (완료)
//!     Persist // 바이너리 상태 포맷 (완료)
//!     MemoryTracker // 사용량 기록 (완료)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use qrun_memory::prelude::*;
//!
//! let manager = RegisterManager::new();
//! let id = manager.create_qregister(2).unwrap();
//! manager.with_qreg(id, |r| r.x(0)).unwrap();
//! assert_eq!(manager.with_qreg(id, |r| r.measure(0)).unwrap(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Registers (Gantree: L3_Memory → Register)
pub mod register;

/// Register manager (Gantree: L3_Memory → RegisterManager)
pub mod manager;

/// Persisted state format (Gantree: L3_Memory → Persist)
pub mod persist;

/// Memory tracker (Gantree: L3_Memory → MemoryTracker)
pub mod tracker;

// ============================================================================
// Re-exports
// ============================================================================

pub use manager::{CRegisterHandle, CheckpointPolicy, QRegisterHandle, RegisterManager};
pub use persist::{load_from_path, read_amplitudes, save_to_path, write_amplitudes};
pub use register::{CRegister, QRegister};
pub use tracker::{MemorySample, MemoryTracker};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases

    pub use crate::manager::{CheckpointPolicy, RegisterManager};
    pub use crate::register::{CRegister, QRegister};
    pub use crate::tracker::MemoryTracker;
    pub use qrun_state::prelude::*;
}

// ============================================================================
// Integration Tests
// ============================================================================
