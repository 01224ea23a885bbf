//! Register manager
//!
//! Gantree: L3_Memory → RegisterManager
//!
//! Owns every quantum and classical register behind an indexed pool.
//! Released ids are reused LIFO and each reuse bumps the slot's
//! allocation counter. The manager mutex only guards the pools; each
//! register has its own lock, and file I/O is done after the manager
//! lock has been dropped.

use crate::persist;
use crate::register::{CRegister, QRegister};
use qrun_core::storage::AMPLITUDE_BYTES;
use qrun_core::{Amplitude, QrunError, QrunResult, RegisterId};
use qrun_state::StateConfig;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

/// Shared handle to a quantum register
pub type QRegisterHandle = Arc<Mutex<QRegister>>;

/// Shared handle to a classical register
pub type CRegisterHandle = Arc<Mutex<CRegister>>;

/// Lock a mutex, recovering the guard if a holder panicked
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// CheckpointPolicy
// ============================================================================

/// When a register should be checkpointed
/// Gantree: CheckpointPolicy // 체크포인트 정책
///
/// Either trigger may be absent; a zero value also disables it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointPolicy {
    /// Operation count that triggers a checkpoint
    pub max_ops: Option<u64>,
    /// Age that triggers a checkpoint
    pub max_elapsed: Option<Duration>,
}

impl CheckpointPolicy {
    /// Policy that never triggers
    pub fn never() -> Self {
        Self::default()
    }

    /// Trigger after `ops` operations
    pub fn with_max_ops(mut self, ops: u64) -> Self {
        self.max_ops = Some(ops);
        self
    }

    /// Trigger once the register is older than `elapsed`
    pub fn with_max_elapsed(mut self, elapsed: Duration) -> Self {
        self.max_elapsed = Some(elapsed);
        self
    }

    /// Whether the counters have crossed either threshold
    pub fn is_due(&self, ops: u64, elapsed: Duration) -> bool {
        let by_ops = self.max_ops.filter(|&n| n > 0).is_some_and(|n| ops >= n);
        let by_time = self
            .max_elapsed
            .filter(|d| !d.is_zero())
            .is_some_and(|d| elapsed >= d);
        by_ops || by_time
    }
}

// ============================================================================
// Pool
// ============================================================================

struct Pool<T> {
    kind: &'static str,
    slots: Vec<Option<Arc<Mutex<T>>>>,
    allocs: Vec<u64>,
    free: Vec<RegisterId>,
}

impl<T> Pool<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            allocs: Vec::new(),
            free: Vec::new(),
        }
    }

    fn insert(&mut self, value: T) -> RegisterId {
        let handle = Arc::new(Mutex::new(value));
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(handle);
                self.allocs[id] += 1;
                id
            }
            None => {
                self.slots.push(Some(handle));
                self.allocs.push(1);
                self.slots.len() - 1
            }
        }
    }

    fn invalid(&self, id: RegisterId) -> QrunError {
        QrunError::InvalidRegister { kind: self.kind, id }
    }

    fn get(&self, id: RegisterId) -> QrunResult<Arc<Mutex<T>>> {
        self.slots
            .get(id)
            .and_then(Option::clone)
            .ok_or_else(|| self.invalid(id))
    }

    fn is_live(&self, id: RegisterId) -> bool {
        matches!(self.slots.get(id), Some(Some(_)))
    }

    fn remove(&mut self, id: RegisterId) -> QrunResult<()> {
        match self.slots.get_mut(id).and_then(Option::take) {
            Some(_) => {
                self.free.push(id);
                Ok(())
            }
            None => Err(self.invalid(id)),
        }
    }

    /// Remove all ids or none of them
    fn remove_all(&mut self, ids: &[RegisterId]) -> QrunResult<()> {
        let mut seen = HashSet::new();
        if let Some(&bad) = ids.iter().find(|&&id| !self.is_live(id) || !seen.insert(id)) {
            return Err(self.invalid(bad));
        }
        ids.iter().try_for_each(|&id| self.remove(id))
    }

    fn allocs(&self, id: RegisterId) -> QrunResult<u64> {
        self.allocs.get(id).copied().ok_or_else(|| self.invalid(id))
    }

    fn live(&self) -> impl Iterator<Item = &Arc<Mutex<T>>> {
        self.slots.iter().flatten()
    }

    fn len(&self) -> usize {
        self.live().count()
    }
}

struct Pools {
    quantum: Pool<QRegister>,
    classical: Pool<CRegister>,
}

// ============================================================================
// RegisterManager
// ============================================================================

/// Owner of all registers and snapshots
/// Gantree: RegisterManager // 레지스터 관리자
pub struct RegisterManager {
    pools: Mutex<Pools>,
    zones: RwLock<HashMap<String, Vec<Amplitude>>>,
    state_config: StateConfig,
}

impl Default for RegisterManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterManager {
    /// Manager creating in-memory registers
    pub fn new() -> Self {
        Self::with_state_config(StateConfig::default())
    }

    /// Manager creating registers per `config`
    pub fn with_state_config(state_config: StateConfig) -> Self {
        Self {
            pools: Mutex::new(Pools {
                quantum: Pool::new("quantum"),
                classical: Pool::new("classical"),
            }),
            zones: RwLock::new(HashMap::new()),
            state_config,
        }
    }

    /// Configuration used for new quantum registers
    pub fn state_config(&self) -> &StateConfig {
        &self.state_config
    }

    fn pools(&self) -> MutexGuard<'_, Pools> {
        lock(&self.pools)
    }

    // ========================================================================
    // Quantum Registers
    // ========================================================================

    /// Allocate a quantum register of `num_qubits` qubits
    /// Gantree: create_qregister(n) -> QrunResult<RegisterId> // 할당
    pub fn create_qregister(&self, num_qubits: usize) -> QrunResult<RegisterId> {
        // state (and any pager file) is built before taking the lock
        let reg = QRegister::with_config(num_qubits, &self.state_config)?;
        let id = self.pools().quantum.insert(reg);
        log::debug!("Allocated quantum register {} ({} qubits)", id, num_qubits);
        Ok(id)
    }

    /// Allocate several quantum registers; all or nothing
    pub fn create_qregisters(&self, sizes: &[usize]) -> QrunResult<Vec<RegisterId>> {
        let regs = sizes
            .iter()
            .map(|&n| QRegister::with_config(n, &self.state_config))
            .collect::<QrunResult<Vec<_>>>()?;
        let mut pools = self.pools();
        Ok(regs.into_iter().map(|r| pools.quantum.insert(r)).collect())
    }

    /// Release a quantum register; its id becomes reusable
    pub fn release_qregister(&self, id: RegisterId) -> QrunResult<()> {
        self.pools().quantum.remove(id)?;
        log::debug!("Released quantum register {}", id);
        Ok(())
    }

    /// Release several quantum registers; all or nothing
    pub fn release_qregisters(&self, ids: &[RegisterId]) -> QrunResult<()> {
        self.pools().quantum.remove_all(ids)
    }

    /// Handle to a live quantum register
    pub fn qreg(&self, id: RegisterId) -> QrunResult<QRegisterHandle> {
        self.pools().quantum.get(id)
    }

    /// Run `f` with exclusive access to a quantum register
    ///
    /// The manager lock is not held while `f` runs.
    pub fn with_qreg<R>(
        &self,
        id: RegisterId,
        f: impl FnOnce(&mut QRegister) -> QrunResult<R>,
    ) -> QrunResult<R> {
        let handle = self.qreg(id)?;
        let mut reg = lock(&handle);
        f(&mut reg)
    }

    /// Times slot `id` has been allocated
    pub fn qreg_allocs(&self, id: RegisterId) -> QrunResult<u64> {
        self.pools().quantum.allocs(id)
    }

    /// Number of live quantum registers
    pub fn num_qregisters(&self) -> usize {
        self.pools().quantum.len()
    }

    // ========================================================================
    // Classical Registers
    // ========================================================================

    /// Allocate a classical register of `size` bits
    pub fn create_cregister(&self, size: usize) -> RegisterId {
        self.pools().classical.insert(CRegister::new(size))
    }

    /// Allocate several classical registers
    pub fn create_cregisters(&self, sizes: &[usize]) -> Vec<RegisterId> {
        let mut pools = self.pools();
        sizes
            .iter()
            .map(|&n| pools.classical.insert(CRegister::new(n)))
            .collect()
    }

    /// Release a classical register
    pub fn release_cregister(&self, id: RegisterId) -> QrunResult<()> {
        self.pools().classical.remove(id)
    }

    /// Handle to a live classical register
    pub fn creg(&self, id: RegisterId) -> QrunResult<CRegisterHandle> {
        self.pools().classical.get(id)
    }

    /// Run `f` with exclusive access to a classical register
    pub fn with_creg<R>(
        &self,
        id: RegisterId,
        f: impl FnOnce(&mut CRegister) -> QrunResult<R>,
    ) -> QrunResult<R> {
        let handle = self.creg(id)?;
        let mut reg = lock(&handle);
        f(&mut reg)
    }

    /// Times classical slot `id` has been allocated
    pub fn creg_allocs(&self, id: RegisterId) -> QrunResult<u64> {
        self.pools().classical.allocs(id)
    }

    /// Number of live classical registers
    pub fn num_cregisters(&self) -> usize {
        self.pools().classical.len()
    }

    // ========================================================================
    // State Transfer
    // ========================================================================

    /// Copy of a register's amplitudes
    /// Gantree: export_state(id) -> QrunResult<Vec<Amplitude>> // 내보내기
    pub fn export_state(&self, id: RegisterId) -> QrunResult<Vec<Amplitude>> {
        self.with_qreg(id, |r| r.export())
    }

    /// Overwrite a register's amplitudes
    pub fn import_state(&self, id: RegisterId, amps: &[Amplitude]) -> QrunResult<()> {
        self.with_qreg(id, |r| r.import(amps))
    }

    /// Persist a register to `path`
    pub fn save_state_to_file(&self, id: RegisterId, path: impl AsRef<Path>) -> QrunResult<()> {
        let amps = self.export_state(id)?;
        persist::save_to_path(path.as_ref(), &amps)?;
        log::info!("Saved register {} to {}", id, path.as_ref().display());
        Ok(())
    }

    /// Restore a register from `path`
    pub fn load_state_from_file(&self, id: RegisterId, path: impl AsRef<Path>) -> QrunResult<()> {
        // validate the id before touching the file
        let handle = self.qreg(id)?;
        let amps = persist::load_from_path(path.as_ref())?;
        lock(&handle).import(&amps)?;
        log::info!("Loaded register {} from {}", id, path.as_ref().display());
        Ok(())
    }

    // ========================================================================
    // Resonance Zones
    // ========================================================================

    /// Cache a register's amplitudes under `key`, replacing any entry
    /// Gantree: save_resonance_zone(id,key) -> QrunResult<()> // 스냅샷 저장
    pub fn save_resonance_zone(&self, id: RegisterId, key: &str) -> QrunResult<()> {
        let amps = self.export_state(id)?;
        self.zones
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), amps);
        Ok(())
    }

    /// Restore a cached snapshot into a register of the same dimension
    pub fn load_resonance_zone(&self, id: RegisterId, key: &str) -> QrunResult<()> {
        let handle = self.qreg(id)?;
        let zones = self.zones.read().unwrap_or_else(PoisonError::into_inner);
        let amps = zones
            .get(key)
            .ok_or_else(|| QrunError::SnapshotNotFound(key.to_string()))?;
        let mut reg = lock(&handle);
        reg.import(amps)
    }

    /// Forget a snapshot; false if it did not exist
    pub fn drop_resonance_zone(&self, key: &str) -> bool {
        self.zones
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    /// Cached snapshot keys, sorted
    pub fn resonance_zones(&self) -> Vec<String> {
        let zones = self.zones.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = zones.keys().cloned().collect();
        keys.sort();
        keys
    }

    // ========================================================================
    // Accounting
    // ========================================================================

    /// Resident bytes of live registers plus cached snapshots
    /// Gantree: memory_usage() -> usize // 메모리 사용량
    ///
    /// Locks every register in turn, so it must not be called from
    /// inside `with_qreg`/`with_creg`.
    pub fn memory_usage(&self) -> usize {
        let (quantum, classical): (Vec<_>, Vec<_>) = {
            let pools = self.pools();
            (
                pools.quantum.live().cloned().collect(),
                pools.classical.live().cloned().collect(),
            )
        };

        let q: usize = quantum.iter().map(|h| lock(h).resident_bytes()).sum();
        let c: usize = classical.iter().map(|h| lock(h).resident_bytes()).sum();
        let z: usize = self
            .zones
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|v| v.len() * AMPLITUDE_BYTES)
            .sum();
        q + c + z
    }

    // ========================================================================
    // Checkpointing
    // ========================================================================

    /// Write a register to `path` if `policy` says it is due
    /// Gantree: checkpoint_if_needed(id,policy,path) -> QrunResult<bool> // 체크포인트
    ///
    /// On a checkpoint the register's counters are reset, so a second
    /// call without new operations returns false.
    pub fn checkpoint_if_needed(
        &self,
        id: RegisterId,
        policy: &CheckpointPolicy,
        path: impl AsRef<Path>,
    ) -> QrunResult<bool> {
        let handle = self.qreg(id)?;
        let mut reg = lock(&handle);
        if !policy.is_due(reg.ops(), reg.elapsed()) {
            return Ok(false);
        }

        let ops = reg.ops();
        reg.save_to_file(path.as_ref())?;
        reg.reset_counters();
        log::info!(
            "Checkpointed register {} after {} ops to {}",
            id,
            ops,
            path.as_ref().display()
        );
        Ok(true)
    }
}

// ============================================================================
// Tests
// ============================================================================
