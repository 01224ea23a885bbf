//! Constants for QRUN
//!
//! Gantree: L0_Foundation → Constants
//!
//! Numeric tolerances, storage layout sizes and runtime defaults.

// ============================================================================
// Numeric Tolerances
// Gantree: numeric // 수치 허용오차
// ============================================================================

pub mod numeric {
    //! Tolerances used by state kernels and analysis

    /// Squared magnitude at or below which an amplitude is treated as zero
    /// Gantree: AMPLITUDE_EPSILON: f64 = 1e-12
    pub const AMPLITUDE_EPSILON: f64 = 1e-12;

    /// Allowed drift of the total probability from 1
    pub const NORM_TOLERANCE: f64 = 1e-6;

    /// Norm below which an eigenvector is considered degenerate
    pub const DEGENERATE_NORM: f64 = 1e-12;
}

// ============================================================================
// Storage Layout
// Gantree: storage // 저장 레이아웃
// ============================================================================

pub mod storage {
    //! Sizes of the dense, paged and persisted state layouts

    /// Bytes per complex amplitude (two f64)
    pub const AMPLITUDE_BYTES: usize = 16;

    /// Amplitudes per disk page
    /// Gantree: DEFAULT_PAGE_ELEMS: usize = 1024
    pub const DEFAULT_PAGE_ELEMS: usize = 1024;

    /// Bytes in one megabyte for disk-limit comparisons
    pub const BYTES_PER_MB: usize = 1024 * 1024;

    /// Size of the amplitude-count header in persisted files
    pub const HEADER_BYTES: usize = 8;

    /// Largest register a state vector will address
    pub const MAX_QUBITS: usize = 48;
}

// ============================================================================
// Runtime Defaults
// Gantree: defaults // 기본값
// ============================================================================

pub mod defaults {
    //! Default thresholds for analysis and checkpointing

    /// Schmidt low-rank threshold: dominant eigenvalue must reach 1 - this
    pub const LOW_RANK_THRESHOLD: f64 = 1e-6;

    /// Minimum normalised DFT magnitude for periodicity detection
    pub const PERIODICITY_THRESHOLD: f64 = 0.1;

    /// Disk limit in MB; 0 disables paging
    pub const DISK_LIMIT_MB: usize = 0;
}
