//! Quantum and classical registers
//!
//! Gantree: L3_Memory → Register
//!
//! A `QRegister` wraps one state vector together with the activity
//! counters that drive checkpointing. Every gate, measurement and
//! import counts as one operation; counters reset only at
//! `reset`/`reset_counters`.

use crate::persist;
use qrun_core::{Amplitude, Angle, Gate, QrunError, QrunResult, QubitId};
use qrun_state::{StateConfig, StateVector};
use std::path::Path;
use std::time::{Duration, Instant};

// ============================================================================
// QRegister
// ============================================================================

/// Quantum register with activity counters
/// Gantree: QRegister // 양자 레지스터
#[derive(Debug)]
pub struct QRegister {
    state: StateVector,
    ops: u64,
    since: Instant,
}

impl QRegister {
    /// Dense register of `num_qubits` qubits in |0...0>
    pub fn new(num_qubits: usize) -> Self {
        Self::from_state(StateVector::new(num_qubits))
    }

    /// Register whose backing is chosen by `config`
    pub fn with_config(num_qubits: usize, config: &StateConfig) -> QrunResult<Self> {
        Ok(Self::from_state(StateVector::with_config(num_qubits, config)?))
    }

    /// Wrap an existing state with fresh counters
    pub fn from_state(state: StateVector) -> Self {
        Self {
            state,
            ops: 0,
            since: Instant::now(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of qubits
    pub fn num_qubits(&self) -> usize {
        self.state.num_qubits()
    }

    /// Number of amplitudes
    pub fn dim(&self) -> usize {
        self.state.dim()
    }

    /// Underlying state
    pub fn state(&self) -> &StateVector {
        &self.state
    }

    /// Mutable underlying state; changes made here are not counted
    pub fn state_mut(&mut self) -> &mut StateVector {
        &mut self.state
    }

    /// Operations since the last reset
    pub fn ops(&self) -> u64 {
        self.ops
    }

    /// Time since the last reset
    pub fn elapsed(&self) -> Duration {
        self.since.elapsed()
    }

    /// Bytes held in memory by the state
    pub fn resident_bytes(&self) -> usize {
        self.state.resident_bytes()
    }

    // ========================================================================
    // Counters
    // ========================================================================

    /// Zero the operation counter and restart the clock
    /// Gantree: reset_counters() // 카운터 초기화
    pub fn reset_counters(&mut self) {
        self.ops = 0;
        self.since = Instant::now();
    }

    /// Return to |0...0> and reset counters
    pub fn reset(&mut self) -> QrunResult<()> {
        self.state.reset()?;
        self.reset_counters();
        Ok(())
    }

    fn counted<T>(&mut self, result: QrunResult<T>) -> QrunResult<T> {
        if result.is_ok() {
            self.ops += 1;
        }
        result
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Apply any gate
    /// Gantree: apply(gate) -> QrunResult<()> // 게이트 적용 + 카운트
    pub fn apply(&mut self, gate: &Gate) -> QrunResult<()> {
        let r = self.state.apply_gate(gate);
        self.counted(r)
    }

    /// Apply a fused run of single-qubit gates as one operation
    pub fn apply_fused(&mut self, gates: &[Gate], target: QubitId) -> QrunResult<()> {
        let r = self.state.apply_fused(gates, target);
        self.counted(r)
    }

    /// Hadamard
    pub fn h(&mut self, q: QubitId) -> QrunResult<()> {
        self.apply(&Gate::H(q))
    }

    /// Pauli-X
    pub fn x(&mut self, q: QubitId) -> QrunResult<()> {
        self.apply(&Gate::X(q))
    }

    /// Pauli-Y
    pub fn y(&mut self, q: QubitId) -> QrunResult<()> {
        self.apply(&Gate::Y(q))
    }

    /// Pauli-Z
    pub fn z(&mut self, q: QubitId) -> QrunResult<()> {
        self.apply(&Gate::Z(q))
    }

    /// Phase
    pub fn s(&mut self, q: QubitId) -> QrunResult<()> {
        self.apply(&Gate::S(q))
    }

    /// π/8
    pub fn t(&mut self, q: QubitId) -> QrunResult<()> {
        self.apply(&Gate::T(q))
    }

    /// X rotation
    pub fn rx(&mut self, q: QubitId, theta: Angle) -> QrunResult<()> {
        self.apply(&Gate::Rx(q, theta))
    }

    /// Y rotation
    pub fn ry(&mut self, q: QubitId, theta: Angle) -> QrunResult<()> {
        self.apply(&Gate::Ry(q, theta))
    }

    /// Z rotation
    pub fn rz(&mut self, q: QubitId, theta: Angle) -> QrunResult<()> {
        self.apply(&Gate::Rz(q, theta))
    }

    /// Controlled-NOT
    pub fn cnot(&mut self, control: QubitId, target: QubitId) -> QrunResult<()> {
        self.apply(&Gate::Cnot(control, target))
    }

    /// Controlled-Z
    pub fn cz(&mut self, a: QubitId, b: QubitId) -> QrunResult<()> {
        self.apply(&Gate::Cz(a, b))
    }

    /// Swap
    pub fn swap(&mut self, a: QubitId, b: QubitId) -> QrunResult<()> {
        self.apply(&Gate::Swap(a, b))
    }

    /// Toffoli
    pub fn ccnot(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> QrunResult<()> {
        self.apply(&Gate::Ccx(c1, c2, target))
    }

    /// Measure one qubit
    pub fn measure(&mut self, q: QubitId) -> QrunResult<u8> {
        let r = self.state.measure(q);
        self.counted(r)
    }

    /// Jointly measure several qubits
    pub fn measure_many(&mut self, qubits: &[QubitId]) -> QrunResult<usize> {
        let r = self.state.measure_many(qubits);
        self.counted(r)
    }

    // ========================================================================
    // Import / Export
    // ========================================================================

    /// Copy of all amplitudes
    pub fn export(&self) -> QrunResult<Vec<Amplitude>> {
        self.state.to_amplitudes()
    }

    /// Overwrite all amplitudes; length must equal `dim()`
    /// Gantree: import(&[Amplitude]) -> QrunResult<()> // 상태 가져오기
    pub fn import(&mut self, amps: &[Amplitude]) -> QrunResult<()> {
        let r = self.state.load_amplitudes(amps);
        self.counted(r)
    }

    /// Persist the amplitudes to `path`
    pub fn save_to_file(&self, path: &Path) -> QrunResult<()> {
        persist::save_to_path(path, &self.export()?)
    }

    /// Restore amplitudes from `path`
    pub fn load_from_file(&mut self, path: &Path) -> QrunResult<()> {
        let amps = persist::load_from_path(path)?;
        self.import(&amps)
    }
}

// ============================================================================
// CRegister
// ============================================================================

/// Classical register of zero-initialised bits
/// Gantree: CRegister // 고전 레지스터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CRegister {
    bits: Vec<u8>,
}

impl CRegister {
    /// `size` bits, all zero
    pub fn new(size: usize) -> Self {
        Self { bits: vec![0; size] }
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True for a zero-width register
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Read bit `index`
    pub fn get(&self, index: usize) -> QrunResult<u8> {
        self.bits
            .get(index)
            .copied()
            .ok_or(QrunError::IndexOutOfRange {
                index,
                dim: self.bits.len(),
            })
    }

    /// Write bit `index`; any non-zero value stores 1
    pub fn set(&mut self, index: usize, value: u8) -> QrunResult<()> {
        let dim = self.bits.len();
        let bit = self
            .bits
            .get_mut(index)
            .ok_or(QrunError::IndexOutOfRange { index, dim })?;
        *bit = u8::from(value != 0);
        Ok(())
    }

    /// All bits
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Little-endian integer formed by the bits
    pub fn value(&self) -> u64 {
        self.bits
            .iter()
            .take(64)
            .enumerate()
            .fold(0, |acc, (i, &b)| acc | (u64::from(b) << i))
    }

    /// Zero every bit
    pub fn clear(&mut self) {
        self.bits.iter_mut().for_each(|b| *b = 0);
    }

    /// Bytes held by the bits
    pub fn resident_bytes(&self) -> usize {
        self.bits.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
