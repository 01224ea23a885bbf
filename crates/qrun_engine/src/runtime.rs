//! Runtime service object
//!
//! Gantree: L6_Engine → Runtime
//!
//! Owns the register manager, memory tracker and scheduler built from
//! one `RuntimeConfig`, plus an optional hardware profile used to gate
//! circuits before dispatch.

use crate::config::RuntimeConfig;
use crate::partitioner::{execute_components, recombine};
use qrun_backend::{HardwareProfile, QpuBackend};
use qrun_core::{Circuit, QrunResult, RegisterId};
use qrun_memory::{MemoryTracker, RegisterManager};
use qrun_schedule::{Scheduler, Task};
use qrun_state::{seed_rng, StateVector};
use std::path::Path;
use std::sync::Arc;

/// QRUN runtime
/// Gantree: Runtime // 런타임
pub struct Runtime {
    config: RuntimeConfig,
    memory: Arc<RegisterManager>,
    tracker: Arc<MemoryTracker>,
    scheduler: Scheduler,
    profile: Option<HardwareProfile>,
}

impl Runtime {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Build a runtime from configuration
    /// Gantree: new(config) -> QrunResult<Runtime> // 생성
    pub fn new(config: RuntimeConfig) -> QrunResult<Self> {
        config.validate()?;

        if let Some(seed) = config.seed {
            seed_rng(seed);
        }

        let memory = Arc::new(RegisterManager::with_state_config(config.to_state_config()));
        let tracker = Arc::new(MemoryTracker::new());
        if config.track_memory {
            tracker.start();
        }
        let scheduler = Scheduler::with_memory(Arc::clone(&memory), Arc::clone(&tracker));

        log::info!("Runtime started: {}", config);
        Ok(Self {
            config,
            memory,
            tracker,
            scheduler,
            profile: None,
        })
    }

    /// Attach a hardware profile
    pub fn with_profile(mut self, profile: HardwareProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Shared register manager
    pub fn memory(&self) -> &Arc<RegisterManager> {
        &self.memory
    }

    /// Shared memory tracker
    pub fn tracker(&self) -> &Arc<MemoryTracker> {
        &self.tracker
    }

    /// Scheduler
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Hardware profile, if any
    pub fn profile(&self) -> Option<&HardwareProfile> {
        self.profile.as_ref()
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Check a circuit against the hardware profile; passes without one
    pub fn validate(&self, circuit: &Circuit) -> QrunResult<()> {
        match &self.profile {
            Some(profile) => profile.check(circuit),
            None => Ok(()),
        }
    }

    /// Simulate a circuit partition by partition under this runtime's
    /// state backing and cross-partition policy
    /// Gantree: execute_separable(circuit) -> QrunResult<StateVector> // 분할 실행
    pub fn execute_separable(&self, circuit: &Circuit) -> QrunResult<StateVector> {
        let components = execute_components(
            circuit,
            self.config.cross_partition,
            &self.config.to_state_config(),
        )?;
        log::debug!("Executing {} separable components", components.len());
        let states: Vec<StateVector> = components.into_iter().map(|(_, s)| s).collect();
        recombine(&states)
    }

    /// Checkpoint a register if the configured triggers are due
    pub fn checkpoint_if_needed(&self, id: RegisterId, path: impl AsRef<Path>) -> QrunResult<bool> {
        self.memory
            .checkpoint_if_needed(id, &self.config.to_checkpoint_policy(), path)
    }

    /// Install or clear the QPU backend
    pub fn set_backend(&self, backend: Option<Arc<dyn QpuBackend>>) {
        self.scheduler.set_backend(backend);
    }

    /// Queue a task and make sure the worker is running
    /// Gantree: submit(task) -> QrunResult<()> // 작업 제출
    pub fn submit(&self, task: Task) -> QrunResult<()> {
        self.scheduler.add_task(task);
        self.scheduler.run_async()
    }

    /// Block until every submitted task has run
    pub fn wait(&self) {
        self.scheduler.wait();
    }

    /// Stop the scheduler and memory tracking; safe to call twice
    pub fn shutdown(&self) {
        self.scheduler.stop();
        self.tracker.stop();
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use qrun_backend::RecordingBackend;
    use qrun_core::{ExecTarget, QrunError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_invalid_config_rejected() {
        let config = RuntimeConfig::default().with_page_elems(0);
        assert!(matches!(Runtime::new(config), Err(QrunError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_with_profile() {
        let circuit = Circuit::parse("H q 0\nCCX q 0 q 1 q 2\n").unwrap();
        let rt = Runtime::new(RuntimeConfig::default()).unwrap();
        assert!(rt.validate(&circuit).is_ok());

        let rt = rt.with_profile(HardwareProfile::new("dev").with_max_qubits(2));
        assert!(matches!(rt.validate(&circuit), Err(QrunError::ProfileViolation(_))));
    }

    #[test]
    fn test_execute_separable() {
        let circuit = Circuit::parse("H a 0\nX b 0\n").unwrap();
        let rt = Runtime::new(RuntimeConfig::default()).unwrap();
        let state = rt.execute_separable(&circuit).unwrap();
        assert_eq!(state.num_qubits(), 2);
        // a is the high-order bit: (|0> + |1>)|1>
        let amps = state.to_amplitudes().unwrap();
        assert_abs_diff_eq!(amps[1].re, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
        assert_abs_diff_eq!(amps[3].re, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn test_cross_partition_policy_from_config() {
        // a single entangling gate always lands in one partition
        let circuit = Circuit::parse("H a 0\nCNOT a 0 b 0\n").unwrap();
        let rt = Runtime::new(RuntimeConfig::reproducible(3)).unwrap();
        let state = rt.execute_separable(&circuit).unwrap();
        assert_eq!(state.num_qubits(), 2);
    }

    #[test]
    fn test_checkpoint_uses_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reg.bin");
        let rt = Runtime::new(RuntimeConfig::default().with_checkpoint_ops(2)).unwrap();
        let id = rt.memory().create_qregister(2).unwrap();

        rt.memory().with_qreg(id, |r| r.h(0)).unwrap();
        assert!(!rt.checkpoint_if_needed(id, &path).unwrap());
        rt.memory().with_qreg(id, |r| r.cnot(0, 1)).unwrap();
        assert!(rt.checkpoint_if_needed(id, &path).unwrap());
        assert!(path.exists());
        assert!(!rt.checkpoint_if_needed(id, &path).unwrap());
    }

    #[test]
    fn test_submit_and_dispatch() {
        let rt = Runtime::new(RuntimeConfig::default().with_track_memory(true)).unwrap();
        let backend = Arc::new(RecordingBackend::new("mock"));
        rt.set_backend(Some(backend.clone()));
        let ran = Arc::new(AtomicUsize::new(0));

        let r = Arc::clone(&ran);
        rt.submit(Task::new("cpu", move || {
            r.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();
        let r = Arc::clone(&ran);
        rt.submit(
            Task::new("qpu", move || {
                r.fetch_add(1, Ordering::SeqCst);
            })
            .with_target(ExecTarget::Qpu),
        )
        .unwrap();
        rt.wait();

        assert_eq!(ran.load(Ordering::SeqCst), 2);
        assert_eq!(backend.calls(), 1);
        assert_eq!(rt.tracker().samples().len(), 2);
    }

    #[test]
    fn test_shutdown_idempotent() {
        let rt = Runtime::new(RuntimeConfig::default().with_track_memory(true)).unwrap();
        assert!(rt.tracker().is_enabled());
        rt.shutdown();
        rt.shutdown();
        assert!(!rt.tracker().is_enabled());
    }
}
