//! Runtime configuration for QRUN
//!
//! Gantree: L6_Engine → RuntimeConfig
//!
//! Unified configuration for state backing, checkpointing, randomness
//! and partitioning. Serialized as JSON.

use crate::partitioner::CrossPartitionPolicy;
use qrun_core::storage::DEFAULT_PAGE_ELEMS;
use qrun_core::{QrunError, QrunResult};
use qrun_memory::CheckpointPolicy;
use qrun_state::StateConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Unified runtime configuration
/// Gantree: RuntimeConfig // 런타임 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    // ========================================================================
    // State Backing
    // ========================================================================
    /// Page registers of at least this many MB to disk; 0 disables
    pub disk_limit_mb: usize,

    /// Amplitudes per disk page
    pub page_elems: usize,

    // ========================================================================
    // Checkpointing
    // ========================================================================
    /// Checkpoint after this many operations; 0 disables
    pub checkpoint_ops: u64,

    /// Checkpoint after this many seconds; 0 disables
    pub checkpoint_secs: f64,

    // ========================================================================
    // Execution
    // ========================================================================
    /// Global measurement seed
    pub seed: Option<u64>,

    /// Handling of gates spanning separable partitions
    pub cross_partition: CrossPartitionPolicy,

    /// Record memory usage after every scheduled task
    pub track_memory: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            disk_limit_mb: 0,
            page_elems: DEFAULT_PAGE_ELEMS,
            checkpoint_ops: 0,
            checkpoint_secs: 0.0,
            seed: None,
            cross_partition: CrossPartitionPolicy::Skip,
            track_memory: false,
        }
    }
}

impl RuntimeConfig {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Never page to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Page registers of at least `limit_mb` MB
    pub fn paged(limit_mb: usize) -> Self {
        Self {
            disk_limit_mb: limit_mb,
            ..Self::default()
        }
    }

    /// Fixed seed and strict partitioning for repeatable runs
    pub fn reproducible(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            cross_partition: CrossPartitionPolicy::Reject,
            ..Self::default()
        }
    }

    // ========================================================================
    // Builder Methods
    // ========================================================================

    /// Set disk limit
    pub fn with_disk_limit_mb(mut self, mb: usize) -> Self {
        self.disk_limit_mb = mb;
        self
    }

    /// Set page size
    pub fn with_page_elems(mut self, page_elems: usize) -> Self {
        self.page_elems = page_elems;
        self
    }

    /// Set operation-count checkpoint trigger
    pub fn with_checkpoint_ops(mut self, ops: u64) -> Self {
        self.checkpoint_ops = ops;
        self
    }

    /// Set elapsed-time checkpoint trigger
    pub fn with_checkpoint_secs(mut self, secs: f64) -> Self {
        self.checkpoint_secs = secs;
        self
    }

    /// Set seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set cross-partition policy
    pub fn with_cross_partition(mut self, policy: CrossPartitionPolicy) -> Self {
        self.cross_partition = policy;
        self
    }

    /// Enable memory tracking
    pub fn with_track_memory(mut self, enabled: bool) -> Self {
        self.track_memory = enabled;
        self
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// State-level subset
    pub fn to_state_config(&self) -> StateConfig {
        StateConfig::paged(self.disk_limit_mb).with_page_elems(self.page_elems)
    }

    /// Checkpoint triggers
    pub fn to_checkpoint_policy(&self) -> CheckpointPolicy {
        let mut policy = CheckpointPolicy::never();
        if self.checkpoint_ops > 0 {
            policy = policy.with_max_ops(self.checkpoint_ops);
        }
        if self.checkpoint_secs > 0.0 {
            policy = policy.with_max_elapsed(Duration::from_secs_f64(self.checkpoint_secs));
        }
        policy
    }

    // ========================================================================
    // JSON
    // ========================================================================

    /// Parse from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> QrunResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> QrunResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> QrunResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Validate configuration
    pub fn validate(&self) -> QrunResult<()> {
        if self.page_elems == 0 {
            return Err(QrunError::InvalidConfig("page_elems must be > 0".to_string()));
        }

        if !self.checkpoint_secs.is_finite() || self.checkpoint_secs < 0.0 {
            return Err(QrunError::InvalidConfig(format!(
                "checkpoint_secs must be finite and >= 0, got {}",
                self.checkpoint_secs
            )));
        }

        Ok(())
    }
}

impl fmt::Display for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RuntimeConfig(disk_limit={}MB, checkpoint_ops={}, seed={:?}, cross_partition={:?})",
            self.disk_limit_mb, self.checkpoint_ops, self.seed, self.cross_partition
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
    fn test_default() {
        let config = RuntimeConfig::default();
        assert_eq!(config.disk_limit_mb, 0);
        assert_eq!(config.page_elems, DEFAULT_PAGE_ELEMS);
        assert!(config.validate().is_ok());
        assert_eq!(config.to_checkpoint_policy(), CheckpointPolicy::never());
    }

    #[test]
    fn test_presets() {
        assert_eq!(RuntimeConfig::paged(64).to_state_config().disk_limit_mb, 64);
        let r = RuntimeConfig::reproducible(42);
        assert_eq!(r.seed, Some(42));
        assert_eq!(r.cross_partition, CrossPartitionPolicy::Reject);
    }

    #[test]
    fn test_checkpoint_policy() {
        let policy = RuntimeConfig::default()
            .with_checkpoint_ops(10)
            .with_checkpoint_secs(1.5)
            .to_checkpoint_policy();
        assert_eq!(policy.max_ops, Some(10));
        assert_eq!(policy.max_elapsed, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_validation() {
        assert!(RuntimeConfig::default().with_page_elems(0).validate().is_err());
        assert!(RuntimeConfig::default().with_checkpoint_secs(-1.0).validate().is_err());
        assert!(RuntimeConfig::default()
            .with_checkpoint_secs(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_json() {
        let config = RuntimeConfig::from_json(r#"{"disk_limit_mb": 8, "cross_partition": "reject"}"#).unwrap();
        assert_eq!(config.disk_limit_mb, 8);
        assert_eq!(config.cross_partition, CrossPartitionPolicy::Reject);
        assert_eq!(config.page_elems, DEFAULT_PAGE_ELEMS);

        let back = RuntimeConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);

        assert!(matches!(
            RuntimeConfig::from_json(r#"{"page_elems": 0}"#),
            Err(QrunError::InvalidConfig(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_json("{"),
            Err(QrunError::JsonError(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.json");
        let config = RuntimeConfig::reproducible(7).with_track_memory(true);
        std::fs::write(&path, config.to_json().unwrap()).unwrap();
        assert_eq!(RuntimeConfig::load(&path).unwrap(), config);
    }
}
