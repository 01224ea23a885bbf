//! Dense state-vector kernels
//!
//! Gantree: L2_State → Kernels
//!
//! Data-parallel loops over a contiguous amplitude slice. The vector
//! repeats every `2^(k+1)` elements for target qubit `k`: the first
//! half of each block has the bit clear, the second half set, so
//! blocks are independent and run on the rayon pool.

use qrun_core::numeric::AMPLITUDE_EPSILON;
use qrun_core::{Amplitude, Matrix2};
use rayon::prelude::*;

/// Apply `f` to every `(|..0..>, |..1..>)` pair of `target` whose
/// lower index has all `controls` bits set
pub fn apply_pair<F>(state: &mut [Amplitude], target: usize, controls: usize, f: F)
where
    F: Fn(Amplitude, Amplitude) -> (Amplitude, Amplitude) + Sync,
{
    let stride = 1usize << target;
    let block = stride << 1;

    state
        .par_chunks_mut(block)
        .enumerate()
        .for_each(|(b, chunk)| {
            let base = b * block;
            let (lower, upper) = chunk.split_at_mut(stride);
            for i in 0..stride {
                if (base + i) & controls != controls {
                    continue;
                }
                let (a0, a1) = f(lower[i], upper[i]);
                lower[i] = a0;
                upper[i] = a1;
            }
        });
}

/// Apply a 2x2 matrix to `target`
pub fn apply_matrix(state: &mut [Amplitude], target: usize, m: &Matrix2) {
    let m = *m;
    apply_pair(state, target, 0, move |a, b| {
        (m[0][0] * a + m[0][1] * b, m[1][0] * a + m[1][1] * b)
    });
}

/// Exchange the values of qubits `q1` and `q2`
pub fn apply_swap(state: &mut [Amplitude], q1: usize, q2: usize) {
    let (lo, hi) = if q1 < q2 { (q1, q2) } else { (q2, q1) };
    let lo_mask = 1usize << lo;
    let half = 1usize << hi;

    state.par_chunks_mut(half << 1).for_each(|chunk| {
        let (lower, upper) = chunk.split_at_mut(half);
        // lower has hi=0; pair lo=1 there with lo=0 in upper
        for i in 0..half {
            if i & lo_mask != 0 {
                std::mem::swap(&mut lower[i], &mut upper[i ^ lo_mask]);
            }
        }
    });
}

/// Multiply amplitudes whose index has every `mask` bit set by `phase`
pub fn apply_phase(state: &mut [Amplitude], mask: usize, phase: Amplitude) {
    state
        .par_iter_mut()
        .enumerate()
        .filter(|(i, _)| i & mask == mask)
        .for_each(|(_, a)| *a *= phase);
}

// ============================================================================
// Measurement Kernels
// ============================================================================

/// Probability that `qubit` reads 1
pub fn probability_of_one(state: &[Amplitude], qubit: usize) -> f64 {
    let mask = 1usize << qubit;
    state
        .par_iter()
        .enumerate()
        .filter(|(i, _)| i & mask != 0)
        .map(|(_, a)| a.norm_sqr())
        .sum()
}

/// Outcome index for basis index `i`: bit `j` is the value of `qubits[j]`
pub fn outcome_of(i: usize, qubits: &[usize]) -> usize {
    qubits
        .iter()
        .enumerate()
        .fold(0, |acc, (j, &q)| acc | (((i >> q) & 1) << j))
}

/// Probability of each joint outcome of `qubits`
pub fn outcome_distribution(state: &[Amplitude], qubits: &[usize]) -> Vec<f64> {
    let outcomes = 1usize << qubits.len();
    state
        .par_iter()
        .enumerate()
        .fold(
            || vec![0.0; outcomes],
            |mut acc, (i, a)| {
                acc[outcome_of(i, qubits)] += a.norm_sqr();
                acc
            },
        )
        .reduce(
            || vec![0.0; outcomes],
            |mut x, y| {
                for (a, b) in x.iter_mut().zip(y) {
                    *a += b;
                }
                x
            },
        )
}

/// Zero amplitudes inconsistent with `outcome` and rescale the rest
pub fn collapse(state: &mut [Amplitude], qubits: &[usize], outcome: usize, scale: f64) {
    state.par_iter_mut().enumerate().for_each(|(i, a)| {
        if outcome_of(i, qubits) == outcome {
            *a *= scale;
        } else {
            *a = Amplitude::new(0.0, 0.0);
        }
    });
}

/// Total probability
pub fn norm_squared(state: &[Amplitude]) -> f64 {
    state.par_iter().map(|a| a.norm_sqr()).sum()
}

/// Number of amplitudes with `|a|^2 > 1e-12`
pub fn count_nonzero(state: &[Amplitude]) -> usize {
    state
        .par_iter()
        .filter(|a| a.norm_sqr() > AMPLITUDE_EPSILON)
        .count()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use qrun_core::Gate;

    fn basis(n: usize, idx: usize) -> Vec<Amplitude> {
        let mut v = vec![Amplitude::new(0.0, 0.0); 1 << n];
        v[idx] = Amplitude::new(1.0, 0.0);
        v
    }

    #[test]
    fn test_x_via_pair() {
        let mut s = basis(3, 0);
        apply_pair(&mut s, 2, 0, |a, b| (b, a));
        assert_eq!(s[4], Amplitude::new(1.0, 0.0));
    }

    #[test]
    fn test_controlled_pair() {
        // control q0 clear: no flip
        let mut s = basis(2, 0);
        apply_pair(&mut s, 1, 0b01, |a, b| (b, a));
        assert_eq!(s[0], Amplitude::new(1.0, 0.0));

        // control q0 set: flip q1
        let mut s = basis(2, 1);
        apply_pair(&mut s, 1, 0b01, |a, b| (b, a));
        assert_eq!(s[3], Amplitude::new(1.0, 0.0));
    }

    #[test]
    fn test_control_above_target() {
        let mut s = basis(3, 0b100);
        apply_pair(&mut s, 0, 0b100, |a, b| (b, a));
        assert_eq!(s[0b101], Amplitude::new(1.0, 0.0));
    }

    #[test]
    fn test_swap() {
        let mut s = basis(3, 0b001);
        apply_swap(&mut s, 0, 2);
        assert_eq!(s[0b100], Amplitude::new(1.0, 0.0));
        apply_swap(&mut s, 2, 1);
        assert_eq!(s[0b010], Amplitude::new(1.0, 0.0));
    }

    #[test]
    fn test_hadamard_distribution() {
        let mut s = basis(2, 0);
        apply_matrix(&mut s, 0, &Gate::H(0).matrix().unwrap());
        assert_abs_diff_eq!(probability_of_one(&s, 0), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(probability_of_one(&s, 1), 0.0, epsilon = 1e-12);
        let dist = outcome_distribution(&s, &[0, 1]);
        assert_abs_diff_eq!(dist[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(dist[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(norm_squared(&s), 1.0, epsilon = 1e-12);
        assert_eq!(count_nonzero(&s), 2);
    }

    #[test]
    fn test_outcome_of() {
        assert_eq!(outcome_of(0b110, &[1, 2]), 0b11);
        assert_eq!(outcome_of(0b110, &[2, 0]), 0b01);
    }

    #[test]
    fn test_collapse() {
        let h = Amplitude::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
        let mut s = vec![h, h];
        collapse(&mut s, &[0], 1, std::f64::consts::SQRT_2);
        assert_eq!(s[0], Amplitude::new(0.0, 0.0));
        assert_abs_diff_eq!(s[1].re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_phase() {
        let mut s = basis(2, 3);
        apply_phase(&mut s, 0b11, Amplitude::new(-1.0, 0.0));
        assert_eq!(s[3], Amplitude::new(-1.0, 0.0));
    }
}
