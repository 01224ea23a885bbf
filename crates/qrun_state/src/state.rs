//! State vector for QRUN
//!
//! Gantree: L2_State → StateVector
//!
//! Amplitudes of an n-qubit register over 2^n basis states, stored
//! densely, sparsely, or paged to disk. The backing is chosen at
//! construction and is invisible to callers except through
//! [`StateVector::backing`].

use crate::kernels;
use crate::pager::DiskPager;
use crate::rng::with_rng;
use qrun_core::numeric::AMPLITUDE_EPSILON;
use qrun_core::storage::{AMPLITUDE_BYTES, BYTES_PER_MB, DEFAULT_PAGE_ELEMS, MAX_QUBITS};
use qrun_core::{matmul2, Amplitude, Angle, Gate, Matrix2, QrunError, QrunResult, QubitId};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::fmt;

// ============================================================================
// StateConfig
// ============================================================================

/// Backing selection for new state vectors
/// Gantree: StateConfig // 저장 방식 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateConfig {
    /// Page to disk when the dense size in whole MB reaches this; 0 disables
    pub disk_limit_mb: usize,
    /// Amplitudes per disk page
    pub page_elems: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            disk_limit_mb: 0,
            page_elems: DEFAULT_PAGE_ELEMS,
        }
    }
}

impl StateConfig {
    /// Never page
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Page states of at least `limit_mb` megabytes
    pub fn paged(limit_mb: usize) -> Self {
        Self {
            disk_limit_mb: limit_mb,
            ..Self::default()
        }
    }

    /// Set page size
    pub fn with_page_elems(mut self, page_elems: usize) -> Self {
        self.page_elems = page_elems;
        self
    }

    /// Whether a state of `num_qubits` would be paged
    pub fn pages(&self, num_qubits: usize) -> bool {
        let bytes = (1usize << num_qubits) * AMPLITUDE_BYTES;
        self.disk_limit_mb > 0 && bytes / BYTES_PER_MB >= self.disk_limit_mb
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Storage form of a state vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
    /// Contiguous amplitude array
    Dense,
    /// Index to amplitude map without negligible entries
    Sparse,
    /// Temporary file with one resident page
    Paged,
}

enum Storage {
    Dense(Vec<Amplitude>),
    Sparse(HashMap<usize, Amplitude>),
    Paged(DiskPager),
}

fn zero() -> Amplitude {
    Amplitude::new(0.0, 0.0)
}

fn one() -> Amplitude {
    Amplitude::new(1.0, 0.0)
}

fn put_sparse(map: &mut HashMap<usize, Amplitude>, idx: usize, value: Amplitude) {
    if value.norm_sqr() > AMPLITUDE_EPSILON {
        map.insert(idx, value);
    } else {
        map.remove(&idx);
    }
}

/// Draw an outcome from a (possibly slightly unnormalised) distribution
fn sample(dist: &[f64]) -> usize {
    let total: f64 = dist.iter().sum();
    let r: f64 = with_rng(|rng| rng.gen::<f64>()) * total;

    let mut cumsum = 0.0;
    for (i, &p) in dist.iter().enumerate() {
        cumsum += p;
        if r < cumsum {
            return i;
        }
    }

    // rounding left r at the top edge
    dist.iter().rposition(|&p| p > 0.0).unwrap_or(0)
}

// ============================================================================
// StateVector
// ============================================================================

/// Quantum state of one register
/// Gantree: StateVector // 상태 벡터
pub struct StateVector {
    num_qubits: usize,
    storage: Storage,
}

impl StateVector {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Dense |0...0> of `num_qubits` qubits
    pub fn new(num_qubits: usize) -> Self {
        let mut amps = vec![zero(); 1usize << num_qubits];
        amps[0] = one();
        Self {
            num_qubits,
            storage: Storage::Dense(amps),
        }
    }

    /// |0...0> with the backing picked by `config`
    /// Gantree: with_config(n,StateConfig) -> QrunResult<Self> // 백엔드 선택
    pub fn with_config(num_qubits: usize, config: &StateConfig) -> QrunResult<Self> {
        Self::check_size(num_qubits)?;
        if !config.pages(num_qubits) {
            return Ok(Self::new(num_qubits));
        }

        let mut pager = DiskPager::new(1usize << num_qubits, config.page_elems)?;
        pager.write(0, one())?;
        Ok(Self {
            num_qubits,
            storage: Storage::Paged(pager),
        })
    }

    /// Sparse |0...0>
    pub fn sparse(num_qubits: usize) -> QrunResult<Self> {
        Self::check_size(num_qubits)?;
        let mut map = HashMap::new();
        map.insert(0, one());
        Ok(Self {
            num_qubits,
            storage: Storage::Sparse(map),
        })
    }

    /// Dense state from raw amplitudes; length must be a power of two
    pub fn from_amplitudes(amps: Vec<Amplitude>) -> QrunResult<Self> {
        if amps.is_empty() || !amps.len().is_power_of_two() {
            return Err(QrunError::ShapeMismatch {
                expected: amps.len().next_power_of_two().max(1),
                actual: amps.len(),
            });
        }
        Ok(Self {
            num_qubits: amps.len().trailing_zeros() as usize,
            storage: Storage::Dense(amps),
        })
    }

    fn check_size(num_qubits: usize) -> QrunResult<()> {
        if num_qubits > MAX_QUBITS {
            return Err(QrunError::InvalidConfig(format!(
                "{} qubits exceeds the addressable maximum of {}",
                num_qubits, MAX_QUBITS
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of qubits
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of basis states (2^n)
    pub fn dim(&self) -> usize {
        1usize << self.num_qubits
    }

    /// Current storage form
    pub fn backing(&self) -> Backing {
        match self.storage {
            Storage::Dense(_) => Backing::Dense,
            Storage::Sparse(_) => Backing::Sparse,
            Storage::Paged(_) => Backing::Paged,
        }
    }

    /// True when stored as a sparse map
    pub fn is_sparse(&self) -> bool {
        self.backing() == Backing::Sparse
    }

    /// True when paged to disk
    pub fn uses_disk(&self) -> bool {
        self.backing() == Backing::Paged
    }

    /// Bytes of amplitude data held in memory
    pub fn resident_bytes(&self) -> usize {
        match &self.storage {
            Storage::Dense(v) => v.len() * AMPLITUDE_BYTES,
            Storage::Sparse(m) => m.len() * (AMPLITUDE_BYTES + std::mem::size_of::<usize>()),
            Storage::Paged(p) => p.resident_bytes(),
        }
    }

    /// Amplitude of basis state `index`
    pub fn amplitude(&self, index: usize) -> QrunResult<Amplitude> {
        if index >= self.dim() {
            return Err(QrunError::IndexOutOfRange {
                index,
                dim: self.dim(),
            });
        }
        match &self.storage {
            Storage::Dense(v) => Ok(v[index]),
            Storage::Sparse(m) => Ok(m.get(&index).copied().unwrap_or_else(zero)),
            Storage::Paged(p) => p.peek(index),
        }
    }

    /// Full amplitude vector
    pub fn to_amplitudes(&self) -> QrunResult<Vec<Amplitude>> {
        match &self.storage {
            Storage::Dense(v) => Ok(v.clone()),
            Storage::Sparse(m) => {
                let mut out = vec![zero(); self.dim()];
                for (&i, &a) in m {
                    out[i] = a;
                }
                Ok(out)
            }
            Storage::Paged(p) => p.snapshot(),
        }
    }

    /// Replace every amplitude; rejected without mutation on length mismatch
    /// Gantree: load_amplitudes(&[Amplitude]) -> QrunResult<()> // 상태 적재
    pub fn load_amplitudes(&mut self, amps: &[Amplitude]) -> QrunResult<()> {
        if amps.len() != self.dim() {
            return Err(QrunError::ShapeMismatch {
                expected: self.dim(),
                actual: amps.len(),
            });
        }
        match &mut self.storage {
            Storage::Dense(v) => v.copy_from_slice(amps),
            Storage::Sparse(m) => {
                m.clear();
                for (i, &a) in amps.iter().enumerate() {
                    put_sparse(m, i, a);
                }
            }
            Storage::Paged(p) => p.store_all(amps)?,
        }
        Ok(())
    }

    /// Sum of |a|^2
    pub fn norm_squared(&self) -> QrunResult<f64> {
        match &self.storage {
            Storage::Dense(v) => Ok(kernels::norm_squared(v)),
            Storage::Sparse(m) => Ok(m.values().map(|a| a.norm_sqr()).sum()),
            Storage::Paged(p) => Ok(kernels::norm_squared(&p.snapshot()?)),
        }
    }

    /// Number of amplitudes with |a|^2 above 1e-12
    pub fn nnz(&self) -> QrunResult<usize> {
        match &self.storage {
            Storage::Dense(v) => Ok(kernels::count_nonzero(v)),
            Storage::Sparse(m) => Ok(m.len()),
            Storage::Paged(p) => Ok(kernels::count_nonzero(&p.snapshot()?)),
        }
    }

    // ========================================================================
    // Storage Conversion
    // ========================================================================

    /// Convert dense storage to sparse; no-op otherwise
    /// Gantree: compress() // 희소 변환
    pub fn compress(&mut self) {
        if let Storage::Dense(v) = &self.storage {
            let map = v
                .iter()
                .enumerate()
                .filter(|(_, a)| a.norm_sqr() > AMPLITUDE_EPSILON)
                .map(|(i, &a)| (i, a))
                .collect();
            self.storage = Storage::Sparse(map);
        }
    }

    /// Convert sparse storage to dense; no-op otherwise
    pub fn decompress(&mut self) {
        if let Storage::Sparse(m) = &self.storage {
            let mut v = vec![zero(); self.dim()];
            for (&i, &a) in m {
                v[i] = a;
            }
            self.storage = Storage::Dense(v);
        }
    }

    /// Back to |0...0>
    pub fn reset(&mut self) -> QrunResult<()> {
        match &mut self.storage {
            Storage::Dense(v) => {
                v.iter_mut().for_each(|a| *a = zero());
                v[0] = one();
            }
            Storage::Sparse(m) => {
                m.clear();
                m.insert(0, one());
            }
            Storage::Paged(p) => {
                p.reset()?;
                p.write(0, one())?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn check_qubit(&self, qubit: QubitId) -> QrunResult<()> {
        if qubit >= self.num_qubits {
            return Err(QrunError::QubitOutOfRange {
                qubit,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    fn check_qubits(&self, qubits: &[QubitId]) -> QrunResult<()> {
        let mut seen = HashSet::with_capacity(qubits.len());
        for &q in qubits {
            self.check_qubit(q)?;
            if !seen.insert(q) {
                return Err(QrunError::DuplicateQubit(q));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Storage-Generic Primitives
    // ========================================================================

    fn pair_op<F>(&mut self, target: usize, controls: usize, f: F) -> QrunResult<()>
    where
        F: Fn(Amplitude, Amplitude) -> (Amplitude, Amplitude) + Sync,
    {
        let tmask = 1usize << target;
        match &mut self.storage {
            Storage::Dense(v) => kernels::apply_pair(v, target, controls, f),
            Storage::Sparse(m) => {
                let bases: HashSet<usize> = m
                    .keys()
                    .filter(|&&k| k & controls == controls)
                    .map(|&k| k & !tmask)
                    .collect();
                for base in bases {
                    let a = m.get(&base).copied().unwrap_or_else(zero);
                    let b = m.get(&(base | tmask)).copied().unwrap_or_else(zero);
                    let (a, b) = f(a, b);
                    put_sparse(m, base, a);
                    put_sparse(m, base | tmask, b);
                }
            }
            Storage::Paged(p) => {
                for base in 0..p.len() {
                    if base & tmask != 0 || base & controls != controls {
                        continue;
                    }
                    let (a, b) = f(p.read(base)?, p.read(base | tmask)?);
                    p.write(base, a)?;
                    p.write(base | tmask, b)?;
                }
            }
        }
        Ok(())
    }

    fn swap_op(&mut self, q1: usize, q2: usize) -> QrunResult<()> {
        let m1 = 1usize << q1;
        let m2 = 1usize << q2;
        match &mut self.storage {
            Storage::Dense(v) => kernels::apply_swap(v, q1, q2),
            Storage::Sparse(m) => {
                let swapped = m
                    .drain()
                    .map(|(i, a)| {
                        let differ = ((i & m1) != 0) != ((i & m2) != 0);
                        (if differ { i ^ m1 ^ m2 } else { i }, a)
                    })
                    .collect();
                *m = swapped;
            }
            Storage::Paged(p) => {
                for i in 0..p.len() {
                    if i & m1 != 0 && i & m2 == 0 {
                        let j = i ^ m1 ^ m2;
                        let (a, b) = (p.read(i)?, p.read(j)?);
                        p.write(i, b)?;
                        p.write(j, a)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn phase_op(&mut self, mask: usize, phase: Amplitude) -> QrunResult<()> {
        match &mut self.storage {
            Storage::Dense(v) => kernels::apply_phase(v, mask, phase),
            Storage::Sparse(m) => m
                .iter_mut()
                .filter(|(i, _)| **i & mask == mask)
                .for_each(|(_, a)| *a *= phase),
            Storage::Paged(p) => {
                for i in 0..p.len() {
                    if i & mask == mask {
                        let a = p.read(i)?;
                        p.write(i, a * phase)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn distribution(&mut self, qubits: &[usize]) -> QrunResult<Vec<f64>> {
        match &mut self.storage {
            Storage::Dense(v) => Ok(kernels::outcome_distribution(v, qubits)),
            Storage::Sparse(m) => {
                let mut dist = vec![0.0; 1usize << qubits.len()];
                for (&i, a) in m.iter() {
                    dist[kernels::outcome_of(i, qubits)] += a.norm_sqr();
                }
                Ok(dist)
            }
            Storage::Paged(p) => {
                let mut dist = vec![0.0; 1usize << qubits.len()];
                for i in 0..p.len() {
                    dist[kernels::outcome_of(i, qubits)] += p.read(i)?.norm_sqr();
                }
                Ok(dist)
            }
        }
    }

    fn collapse(&mut self, qubits: &[usize], outcome: usize, prob: f64) -> QrunResult<()> {
        if prob <= 0.0 {
            return Err(QrunError::InternalError(format!(
                "sampled outcome {} has zero probability",
                outcome
            )));
        }
        let scale = 1.0 / prob.sqrt();
        match &mut self.storage {
            Storage::Dense(v) => kernels::collapse(v, qubits, outcome, scale),
            Storage::Sparse(m) => {
                m.retain(|&i, _| kernels::outcome_of(i, qubits) == outcome);
                m.values_mut().for_each(|a| *a *= scale);
            }
            Storage::Paged(p) => {
                for i in 0..p.len() {
                    let a = p.read(i)?;
                    if kernels::outcome_of(i, qubits) == outcome {
                        p.write(i, a * scale)?;
                    } else if a != zero() {
                        p.write(i, zero())?;
                    }
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Gate Application
    // ========================================================================

    /// Apply any gate of the fixed gate set
    /// Gantree: apply_gate(&Gate) -> QrunResult<()> // 게이트 적용
    pub fn apply_gate(&mut self, gate: &Gate) -> QrunResult<()> {
        let qubits: Vec<usize> = gate.qubits().into_iter().copied().collect();
        self.check_qubits(&qubits)?;

        match *gate {
            Gate::X(q) => self.pair_op(q, 0, |a, b| (b, a)),
            Gate::Z(q) => self.phase_op(1 << q, -one()),
            Gate::Cnot(c, t) => self.pair_op(t, 1 << c, |a, b| (b, a)),
            Gate::Ccx(c1, c2, t) => self.pair_op(t, (1 << c1) | (1 << c2), |a, b| (b, a)),
            Gate::Cz(a, b) => self.phase_op((1 << a) | (1 << b), -one()),
            Gate::Swap(a, b) => self.swap_op(a, b),
            Gate::Qft2(..) | Gate::Grover2(..) => {
                for g in gate.decompose() {
                    self.apply_gate(&g)?;
                }
                Ok(())
            }
            Gate::H(q) | Gate::Y(q) | Gate::S(q) | Gate::T(q) => self.apply_known_matrix(gate, q),
            Gate::Rx(q, _) | Gate::Ry(q, _) | Gate::Rz(q, _) => self.apply_known_matrix(gate, q),
        }
    }

    fn apply_known_matrix(&mut self, gate: &Gate, target: QubitId) -> QrunResult<()> {
        let m = gate.matrix().ok_or_else(|| {
            QrunError::InternalError(format!("{} has no single-qubit matrix", gate.name()))
        })?;
        self.apply_matrix(target, &m)
    }

    /// Apply an arbitrary 2x2 matrix to `target`
    pub fn apply_matrix(&mut self, target: QubitId, m: &Matrix2) -> QrunResult<()> {
        self.check_qubit(target)?;
        if let Storage::Dense(v) = &mut self.storage {
            kernels::apply_matrix(v, target, m);
            return Ok(());
        }
        let m = *m;
        self.pair_op(target, 0, move |a, b| {
            (m[0][0] * a + m[0][1] * b, m[1][0] * a + m[1][1] * b)
        })
    }

    /// Multiply a run of single-qubit gates into one matrix and apply it once
    /// Gantree: apply_fused(&[Gate],q) -> QrunResult<()> // 게이트 융합
    ///
    /// Gates apply in slice order; each must act on `target`.
    pub fn apply_fused(&mut self, gates: &[Gate], target: QubitId) -> QrunResult<()> {
        let mut fused: Matrix2 = [[one(), zero()], [zero(), one()]];

        for gate in gates {
            let m = match (gate.qubits().as_slice(), gate.matrix()) {
                ([q], Some(m)) if **q == target => m,
                _ => {
                    return Err(QrunError::InvalidGateParameter(format!(
                        "cannot fuse {} onto qubit {}",
                        gate, target
                    )))
                }
            };
            fused = matmul2(&m, &fused);
        }
        self.apply_matrix(target, &fused)
    }

    /// Hadamard
    pub fn h(&mut self, q: QubitId) -> QrunResult<()> {
        self.apply_gate(&Gate::H(q))
    }

    /// Pauli-X
    pub fn x(&mut self, q: QubitId) -> QrunResult<()> {
        self.apply_gate(&Gate::X(q))
    }

    /// Pauli-Y
    pub fn y(&mut self, q: QubitId) -> QrunResult<()> {
        self.apply_gate(&Gate::Y(q))
    }

    /// Pauli-Z
    pub fn z(&mut self, q: QubitId) -> QrunResult<()> {
        self.apply_gate(&Gate::Z(q))
    }

    /// Phase gate S
    pub fn s(&mut self, q: QubitId) -> QrunResult<()> {
        self.apply_gate(&Gate::S(q))
    }

    /// T gate
    pub fn t(&mut self, q: QubitId) -> QrunResult<()> {
        self.apply_gate(&Gate::T(q))
    }

    /// X rotation
    pub fn rx(&mut self, q: QubitId, theta: Angle) -> QrunResult<()> {
        self.apply_gate(&Gate::Rx(q, theta))
    }

    /// Y rotation
    pub fn ry(&mut self, q: QubitId, theta: Angle) -> QrunResult<()> {
        self.apply_gate(&Gate::Ry(q, theta))
    }

    /// Z rotation
    pub fn rz(&mut self, q: QubitId, theta: Angle) -> QrunResult<()> {
        self.apply_gate(&Gate::Rz(q, theta))
    }

    /// Controlled-NOT
    pub fn cnot(&mut self, control: QubitId, target: QubitId) -> QrunResult<()> {
        self.apply_gate(&Gate::Cnot(control, target))
    }

    /// Controlled-Z
    pub fn cz(&mut self, a: QubitId, b: QubitId) -> QrunResult<()> {
        self.apply_gate(&Gate::Cz(a, b))
    }

    /// SWAP
    pub fn swap(&mut self, a: QubitId, b: QubitId) -> QrunResult<()> {
        self.apply_gate(&Gate::Swap(a, b))
    }

    /// Toffoli
    pub fn ccnot(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> QrunResult<()> {
        self.apply_gate(&Gate::Ccx(c1, c2, target))
    }

    // ========================================================================
    // Measurement
    // ========================================================================

    /// Measure one qubit, collapsing the state
    /// Gantree: measure(q) -> QrunResult<u8> // 측정 + 붕괴
    pub fn measure(&mut self, qubit: QubitId) -> QrunResult<u8> {
        Ok(self.measure_many(&[qubit])? as u8)
    }

    /// Jointly measure `qubits`; bit j of the result is `qubits[j]`
    pub fn measure_many(&mut self, qubits: &[QubitId]) -> QrunResult<usize> {
        self.check_qubits(qubits)?;
        let dist = self.distribution(qubits)?;
        let outcome = sample(&dist);
        self.collapse(qubits, outcome, dist[outcome])?;
        Ok(outcome)
    }

    /// Probability that `qubit` reads 1, without collapsing
    pub fn probability_of_one(&mut self, qubit: QubitId) -> QrunResult<f64> {
        self.check_qubit(qubit)?;
        Ok(self.distribution(&[qubit])?[1])
    }
}

impl fmt::Debug for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateVector")
            .field("num_qubits", &self.num_qubits)
            .field("backing", &self.backing())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_1_SQRT_2, PI};

    fn assert_states_close(a: &StateVector, b: &StateVector) {
        let (va, vb) = (a.to_amplitudes().unwrap(), b.to_amplitudes().unwrap());
        assert_eq!(va.len(), vb.len());
        for (x, y) in va.iter().zip(&vb) {
            assert_abs_diff_eq!(x.re, y.re, epsilon = 1e-9);
            assert_abs_diff_eq!(x.im, y.im, epsilon = 1e-9);
        }
    }

    fn bell(mut s: StateVector) -> StateVector {
        s.h(0).unwrap();
        s.cnot(0, 1).unwrap();
        s
    }

    #[test]
    fn test_initial_state() {
        let s = StateVector::new(3);
        assert_eq!(s.dim(), 8);
        assert_eq!(s.amplitude(0).unwrap(), one());
        assert_eq!(s.backing(), Backing::Dense);
    }

    #[test]
    fn test_x_flips() {
        let mut s = StateVector::new(1);
        s.x(0).unwrap();
        assert_abs_diff_eq!(s.amplitude(1).unwrap().norm_sqr(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverses() {
        let mut s = StateVector::new(2);
        s.h(0).unwrap();
        s.ry(1, 0.7).unwrap();
        let reference = s.to_amplitudes().unwrap();

        s.h(1).unwrap();
        s.h(1).unwrap();
        s.x(0).unwrap();
        s.x(0).unwrap();
        for _ in 0..4 {
            s.s(0).unwrap();
        }
        let expected = StateVector::from_amplitudes(reference).unwrap();
        assert_states_close(&s, &expected);
    }

    #[test]
    fn test_bell_state() {
        let s = bell(StateVector::new(2));
        assert_abs_diff_eq!(s.amplitude(0).unwrap().re, FRAC_1_SQRT_2, epsilon = 1e-12);
        assert_abs_diff_eq!(s.amplitude(3).unwrap().re, FRAC_1_SQRT_2, epsilon = 1e-12);
        assert_abs_diff_eq!(s.amplitude(1).unwrap().norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unitarity_preserved() {
        let mut s = StateVector::new(3);
        s.h(0).unwrap();
        s.rx(1, 0.3).unwrap();
        s.ccnot(0, 1, 2).unwrap();
        s.t(2).unwrap();
        s.cz(0, 2).unwrap();
        s.swap(0, 1).unwrap();
        s.rz(0, 1.1).unwrap();
        s.y(2).unwrap();
        assert_abs_diff_eq!(s.norm_squared().unwrap(), 1.0, epsilon = 1e-9);
        s.measure(1).unwrap();
        assert_abs_diff_eq!(s.norm_squared().unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotations() {
        let mut s = StateVector::new(1);
        s.rx(0, PI).unwrap();
        assert_abs_diff_eq!(s.amplitude(1).unwrap().im, -1.0, epsilon = 1e-12);

        let mut s = StateVector::new(1);
        s.ry(0, PI).unwrap();
        assert_abs_diff_eq!(s.amplitude(1).unwrap().re, 1.0, epsilon = 1e-12);

        let mut s = StateVector::new(1);
        s.rz(0, PI).unwrap();
        assert_abs_diff_eq!(s.amplitude(0).unwrap().im, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ccnot_needs_both_controls() {
        let mut s = StateVector::new(3);
        s.x(0).unwrap();
        s.ccnot(0, 1, 2).unwrap();
        assert_eq!(s.amplitude(0b001).unwrap(), one());
        s.x(1).unwrap();
        s.ccnot(0, 1, 2).unwrap();
        assert_eq!(s.amplitude(0b111).unwrap(), one());
    }

    #[test]
    fn test_validation_errors() {
        let mut s = StateVector::new(2);
        assert!(matches!(
            s.h(2),
            Err(QrunError::QubitOutOfRange { qubit: 2, num_qubits: 2 })
        ));
        assert!(matches!(s.cnot(1, 1), Err(QrunError::DuplicateQubit(1))));
        assert!(matches!(
            s.amplitude(4),
            Err(QrunError::IndexOutOfRange { index: 4, dim: 4 })
        ));
    }

    #[test]
    fn test_measure_collapses() {
        let mut s = bell(StateVector::new(2));
        let m0 = s.measure(0).unwrap();
        let m1 = s.measure(1).unwrap();
        assert_eq!(m0, m1);
        let idx = if m0 == 1 { 3 } else { 0 };
        assert_abs_diff_eq!(s.amplitude(idx).unwrap().norm_sqr(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_measure_deterministic_basis() {
        let mut s = StateVector::new(3);
        s.x(1).unwrap();
        assert_eq!(s.measure(1).unwrap(), 1);
        assert_eq!(s.measure(0).unwrap(), 0);
        assert_eq!(s.measure_many(&[2, 1]).unwrap(), 0b10);
    }

    #[test]
    fn test_measure_many_bell() {
        let mut s = bell(StateVector::new(2));
        let outcome = s.measure_many(&[0, 1]).unwrap();
        assert!(outcome == 0b00 || outcome == 0b11);
        assert_abs_diff_eq!(s.norm_squared().unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reset() {
        let mut s = bell(StateVector::new(2));
        s.reset().unwrap();
        assert_eq!(s.amplitude(0).unwrap(), one());
        assert_eq!(s.nnz().unwrap(), 1);
    }

    #[test]
    fn test_load_amplitudes_shape() {
        let mut s = StateVector::new(1);
        let err = s.load_amplitudes(&[one(); 3]).unwrap_err();
        assert_eq!(
            err,
            QrunError::ShapeMismatch {
                expected: 2,
                actual: 3
            }
        );
        assert_eq!(s.amplitude(0).unwrap(), one());
    }

    #[test]
    fn test_from_amplitudes_requires_power_of_two() {
        assert!(StateVector::from_amplitudes(vec![one(); 3]).is_err());
        assert!(StateVector::from_amplitudes(Vec::new()).is_err());
        assert_eq!(StateVector::from_amplitudes(vec![one(), zero()]).unwrap().num_qubits(), 1);
    }

    #[test]
    fn test_fused_matches_sequence() {
        let mut a = StateVector::new(1);
        a.h(0).unwrap();
        a.x(0).unwrap();
        a.z(0).unwrap();

        let mut b = StateVector::new(1);
        b.apply_fused(&[Gate::H(0), Gate::X(0), Gate::Z(0)], 0).unwrap();
        assert_states_close(&a, &b);
    }

    #[test]
    fn test_fused_rejects_foreign_gates() {
        let mut s = StateVector::new(2);
        assert!(s.apply_fused(&[Gate::H(1)], 0).is_err());
        assert!(s.apply_fused(&[Gate::Cnot(0, 1)], 0).is_err());
    }

    #[test]
    fn test_fused_patterns() {
        let mut a = StateVector::new(2);
        a.x(0).unwrap();
        a.apply_gate(&Gate::Qft2(0, 1)).unwrap();

        let mut b = StateVector::new(2);
        b.x(0).unwrap();
        b.h(1).unwrap();
        b.cnot(1, 0).unwrap();
        b.s(0).unwrap();
        b.h(0).unwrap();
        b.swap(0, 1).unwrap();
        assert_states_close(&a, &b);
    }

    // ------------------------------------------------------------------------
    // Sparse
    // ------------------------------------------------------------------------

    #[test]
    fn test_sparse_matches_dense() {
        let mut dense = StateVector::new(3);
        let mut sparse = StateVector::sparse(3).unwrap();
        for s in [&mut dense, &mut sparse] {
            s.h(0).unwrap();
            s.cnot(0, 1).unwrap();
            s.t(1).unwrap();
            s.swap(1, 2).unwrap();
            s.cz(0, 2).unwrap();
            s.ry(0, 0.4).unwrap();
        }
        assert!(sparse.is_sparse());
        assert_states_close(&dense, &sparse);
    }

    #[test]
    fn test_sparse_measure() {
        let mut s = bell(StateVector::sparse(2).unwrap());
        let m = s.measure(0).unwrap();
        assert!(m == 0 || m == 1);
        assert_eq!(s.nnz().unwrap(), 1);
    }

    #[test]
    fn test_compress_round_trip() {
        let mut s = bell(StateVector::new(3));
        s.compress();
        assert!(s.is_sparse());
        assert_eq!(s.nnz().unwrap(), 2);
        s.decompress();
        assert_eq!(s.backing(), Backing::Dense);
        assert_eq!(s.nnz().unwrap(), 2);
        assert_abs_diff_eq!(s.amplitude(3).unwrap().re, FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn test_compress_drops_negligible() {
        let mut s = StateVector::new(2);
        s.load_amplitudes(&[one(), Amplitude::new(1e-7, 0.0), zero(), zero()])
            .unwrap();
        s.compress();
        assert_eq!(s.nnz().unwrap(), 1);
    }

    // ------------------------------------------------------------------------
    // Paged
    // ------------------------------------------------------------------------

    #[test]
    fn test_disk_limit_selects_backing() {
        let big = StateVector::with_config(20, &StateConfig::paged(1)).unwrap();
        assert!(big.uses_disk());
        assert_eq!(big.amplitude(0).unwrap(), one());

        let small = StateVector::with_config(5, &StateConfig::paged(64)).unwrap();
        assert!(!small.uses_disk());

        let off = StateVector::with_config(5, &StateConfig::in_memory()).unwrap();
        assert!(!off.uses_disk());
    }

    #[test]
    fn test_paged_matches_dense() {
        // 16 qubits = 1 MB, paged in 64-amplitude pages
        let config = StateConfig::paged(1).with_page_elems(64);
        let mut paged = StateVector::with_config(16, &config).unwrap();
        assert!(paged.uses_disk());
        let mut dense = StateVector::new(16);

        for s in [&mut dense, &mut paged] {
            s.h(0).unwrap();
            s.h(15).unwrap();
            s.cnot(15, 3).unwrap();
            s.swap(0, 10).unwrap();
            s.cz(3, 10).unwrap();
        }
        assert_states_close(&dense, &paged);
        assert!(paged.resident_bytes() < dense.resident_bytes());
    }

    #[test]
    fn test_paged_measure_and_reset() {
        let config = StateConfig::paged(1).with_page_elems(256);
        let mut s = StateVector::with_config(16, &config).unwrap();
        s.x(4).unwrap();
        assert_eq!(s.measure(4).unwrap(), 1);
        s.reset().unwrap();
        assert_eq!(s.amplitude(0).unwrap(), one());
        assert_eq!(s.amplitude(16).unwrap(), zero());
    }

    #[test]
    fn test_too_many_qubits() {
        assert!(matches!(
            StateVector::with_config(MAX_QUBITS + 1, &StateConfig::default()),
            Err(QrunError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_sample_fallback() {
        assert_eq!(sample(&[0.0, 0.0, 1.0, 0.0]), 2);
    }
}
