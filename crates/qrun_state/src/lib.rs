//! # QRUN State
//!
//! Quantum state representations for the QRUN runtime.
//!
//! ## Gantree Architecture
//!
//! ```text
//! qrun_state // L2: State Representation (완료)
//!     StateVector // dense / sparse / paged (완료)
//!     Kernels // rayon 병렬 커널 (완료)
//!     DiskPager // 디스크 페이징 (완료)
//!     Rng // 전역 시드 RNG (완료)
//!     Analysis // 저랭크 분해, 주기 탐지 (완료)
//!     DecisionDiagram // QuIDD 압축 (완료)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use qrun_state::prelude::*;
//!
//! let mut state = StateVector::new(2);
//! state.h(0).unwrap();
//! state.cnot(0, 1).unwrap();
//!
//! let dd = DecisionDiagram::from_state(&state).unwrap();
//! assert_eq!(dd.to_vector(), state.to_amplitudes().unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// State vector (Gantree: L2_State → StateVector)
pub mod state;

/// Dense parallel kernels (Gantree: L2_State → Kernels)
pub mod kernels;

/// Disk pager (Gantree: L2_State → DiskPager)
pub mod pager;

/// Seeded random stream (Gantree: L2_State → Rng)
pub mod rng;

/// State analysis (Gantree: L2_State → Analysis)
pub mod analysis;

/// Decision diagrams (Gantree: L2_State → DecisionDiagram)
pub mod decision_diagram;

// ============================================================================
// Re-exports
// ============================================================================

pub use analysis::{detect_periodicity, schmidt_low_rank};
pub use decision_diagram::{DecisionDiagram, Node, NodeId};
pub use pager::{decode_amplitudes, encode_amplitudes, DiskPager};
pub use rng::{seed_rng, with_rng};
pub use state::{Backing, StateConfig, StateVector};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases

    pub use crate::analysis::{detect_periodicity, schmidt_low_rank};
    pub use crate::decision_diagram::DecisionDiagram;
    pub use crate::rng::seed_rng;
    pub use crate::state::{Backing, StateConfig, StateVector};
    pub use qrun_core::prelude::*;
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use super::rng::TEST_SEED_LOCK;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_seeded_measurements_repeat() {
        let _guard = TEST_SEED_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let run = || {
            seed_rng(2024);
            let mut s = StateVector::new(4);
            (0..4).for_each(|q| s.h(q).unwrap());
            (0..4).map(|q| s.measure(q).unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_compressed_state_round_trips_through_diagram() {
        let mut s = StateVector::new(4);
        s.h(3).unwrap();
        s.cnot(3, 0).unwrap();
        s.compress();

        let dd = DecisionDiagram::from_state(&s).unwrap();
        let dense = dd.to_state().unwrap();
        for i in 0..16 {
            let (a, b) = (s.amplitude(i).unwrap(), dense.amplitude(i).unwrap());
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_low_rank_on_paged_state() {
        let config = StateConfig::paged(1).with_page_elems(4096);
        let mut s = StateVector::with_config(16, &config).unwrap();
        assert!(s.uses_disk());
        s.h(0).unwrap();
        assert!(schmidt_low_rank(&mut s, 0, 1e-6).unwrap());
        assert_abs_diff_eq!(s.norm_squared().unwrap(), 1.0, epsilon = 1e-9);
        assert!(s.uses_disk());
    }
}
