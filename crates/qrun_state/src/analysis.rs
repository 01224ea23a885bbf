//! State analysis
//!
//! Gantree: L2_State → Analysis
//!
//! Opt-in inspections of a state vector: Schmidt low-rank
//! factorisation of one qubit and periodicity detection over
//! amplitude magnitudes.

use crate::state::StateVector;
use qrun_core::numeric::DEGENERATE_NORM;
use qrun_core::{Amplitude, QrunError, QrunResult, QubitId};
use rayon::prelude::*;
use std::f64::consts::PI;

// ============================================================================
// Schmidt Low-Rank Factorisation
// ============================================================================

/// Index of `idx` with bit `qubit` removed
fn rest_index(idx: usize, qubit: usize) -> usize {
    let low = idx & ((1usize << qubit) - 1);
    let high = (idx >> (qubit + 1)) << qubit;
    low | high
}

/// Replace the state by `u ⊗ rest` if `qubit` is nearly unentangled
/// Gantree: schmidt_low_rank(state,q,threshold) -> QrunResult<bool> // 저랭크 분해
///
/// Builds the 2x2 reduced density matrix of `qubit`. When its dominant
/// eigenvalue is at least `1 - threshold` the state is overwritten by
/// the rank-1 product and `true` is returned. Otherwise the state is
/// left untouched. This is lossy and never applied implicitly.
pub fn schmidt_low_rank(state: &mut StateVector, qubit: QubitId, threshold: f64) -> QrunResult<bool> {
    if qubit >= state.num_qubits() {
        return Err(QrunError::QubitOutOfRange {
            qubit,
            num_qubits: state.num_qubits(),
        });
    }

    let amps = state.to_amplitudes()?;
    let mask = 1usize << qubit;
    let half = amps.len() / 2;
    let zero = Amplitude::new(0.0, 0.0);

    let mut row0 = vec![zero; half];
    let mut row1 = vec![zero; half];
    for (idx, &a) in amps.iter().enumerate() {
        let rest = rest_index(idx, qubit);
        if idx & mask != 0 {
            row1[rest] = a;
        } else {
            row0[rest] = a;
        }
    }

    let n00: f64 = row0.par_iter().map(|a| a.norm_sqr()).sum();
    let n11: f64 = row1.par_iter().map(|a| a.norm_sqr()).sum();
    let n01: Amplitude = row0
        .par_iter()
        .zip(row1.par_iter())
        .map(|(a, b)| a * b.conj())
        .sum();

    let trace = n00 + n11;
    let diff = n00 - n11;
    let lambda = 0.5 * (trace + (diff * diff + 4.0 * n01.norm_sqr()).sqrt());
    if lambda < 1.0 - threshold {
        return Ok(false);
    }

    // dominant eigenvector of [[n00, n01], [n01*, n11]]
    let x1 = n01;
    let x2 = Amplitude::new(lambda - n00, 0.0);
    let norm = (x1.norm_sqr() + x2.norm_sqr()).sqrt();
    let u = if norm < DEGENERATE_NORM {
        if n00 >= n11 {
            [Amplitude::new(1.0, 0.0), zero]
        } else {
            [zero, Amplitude::new(1.0, 0.0)]
        }
    } else {
        [x1 / norm, x2 / norm]
    };

    let scale = 1.0 / lambda.sqrt();
    let right: Vec<Amplitude> = row0
        .iter()
        .zip(&row1)
        .map(|(a, b)| (u[0].conj() * a + u[1].conj() * b) * scale)
        .collect();

    let factored: Vec<Amplitude> = (0..amps.len())
        .map(|idx| {
            let coeff = if idx & mask != 0 { u[1] } else { u[0] };
            coeff * right[rest_index(idx, qubit)]
        })
        .collect();

    state.load_amplitudes(&factored)?;
    Ok(true)
}

// ============================================================================
// Periodicity Detection
// ============================================================================

/// Magnitude of DFT component `k` of `mags`
fn dft_magnitude(mags: &[f64], k: usize) -> f64 {
    let n = mags.len() as f64;
    let sum = mags
        .iter()
        .enumerate()
        .fold(Amplitude::new(0.0, 0.0), |acc, (i, &m)| {
            let angle = -2.0 * PI * (k as f64) * (i as f64) / n;
            acc + Amplitude::from_polar(m, angle)
        });
    sum.norm()
}

/// Dominant period of the amplitude magnitudes, or 0
/// Gantree: detect_periodicity(state,threshold) -> QrunResult<usize> // 주기 탐지
///
/// Scans frequencies `1..=N/2` and picks the strongest (lowest `k` on
/// ties). Reports `N / k` when the normalised magnitude `best / N`
/// reaches `threshold` and the spectrum is not flat; a single basis
/// state has a flat spectrum and reports 0.
pub fn detect_periodicity(state: &StateVector, threshold: f64) -> QrunResult<usize> {
    let n = state.dim();
    if n < 2 {
        return Ok(0);
    }

    let mags: Vec<f64> = state.to_amplitudes()?.iter().map(|a| a.norm()).collect();
    let spectrum: Vec<f64> = (1..=n / 2)
        .into_par_iter()
        .map(|k| dft_magnitude(&mags, k))
        .collect();

    let (best_k, best) = spectrum
        .iter()
        .enumerate()
        .fold((0, 0.0), |(bk, bv), (i, &v)| if v > bv { (i + 1, v) } else { (bk, bv) });
    if best_k == 0 {
        return Ok(0);
    }

    let mean = spectrum.iter().sum::<f64>() / spectrum.len() as f64;
    if best - mean < 1e-9 {
        return Ok(0);
    }

    if best / (n as f64) < threshold {
        return Ok(0);
    }
    Ok(n / best_k)
}

// ============================================================================
// Tests
// ============================================================================
