//! Peephole gate patterns
//!
//! Gantree: L6_Engine → Patterns
//!
//! Recognises the textbook two-qubit QFT and Grover iteration written
//! out gate by gate on one register and folds each into a single
//! composite instruction.

use qrun_core::{Circuit, Gate, Instruction, QrunResult, QubitId, QubitRef};
use qrun_memory::QRegister;

/// Gates in the expanded QFT2 sequence
const QFT2_LEN: usize = 5;

/// Gates in the expanded GROVER2 sequence
const GROVER2_LEN: usize = 7;

fn same_register(a: &QubitRef, b: &QubitRef) -> bool {
    a.reg == b.reg && a.index != b.index
}

/// `H q1; CNOT q1 q0; S q0; H q0; SWAP q0 q1`
fn match_qft2(window: &[Instruction]) -> Option<Gate<QubitRef>> {
    use Gate::*;
    use Instruction::Gate as G;

    match window {
        [G(H(a)), G(Cnot(b1, b0)), G(S(c)), G(H(d)), G(Swap(e0, e1)), ..]
            if same_register(c, a) && b1 == a && b0 == c && d == c && e0 == c && e1 == a =>
        {
            Some(Qft2(c.clone(), a.clone()))
        }
        _ => None,
    }
}

/// `H q0; H q1; CNOT q1 q0; Z q0; CNOT q1 q0; H q0; H q1`
fn match_grover2(window: &[Instruction]) -> Option<Gate<QubitRef>> {
    use Gate::*;
    use Instruction::Gate as G;

    match window {
        [G(H(a)), G(H(b)), G(Cnot(c1, c0)), G(Z(d)), G(Cnot(e1, e0)), G(H(f)), G(H(g)), ..]
            if same_register(a, b)
                && c1 == b
                && c0 == a
                && d == a
                && e1 == b
                && e0 == a
                && f == a
                && g == b =>
        {
            Some(Grover2(a.clone(), b.clone()))
        }
        _ => None,
    }
}

/// Fold recognised sequences into `QFT2`/`GROVER2`; returns the count
/// Gantree: optimize_patterns(circuit) -> usize // 패턴 치환
pub fn optimize_patterns(circuit: &mut Circuit) -> usize {
    let ops = std::mem::take(circuit.instructions_mut());
    let mut out = Vec::with_capacity(ops.len());
    let mut replaced = 0;
    let mut i = 0;

    while i < ops.len() {
        let window = &ops[i..];
        if let Some(g) = match_qft2(window) {
            out.push(Instruction::Gate(g));
            i += QFT2_LEN;
        } else if let Some(g) = match_grover2(window) {
            out.push(Instruction::Gate(g));
            i += GROVER2_LEN;
        } else {
            out.push(ops[i].clone());
            i += 1;
            continue;
        }
        replaced += 1;
    }

    *circuit.instructions_mut() = out;
    replaced
}

/// Two-qubit QFT on a register
pub fn apply_qft2(reg: &mut QRegister, q0: QubitId, q1: QubitId) -> QrunResult<()> {
    reg.apply(&Gate::Qft2(q0, q1))
}

/// Two-qubit Grover iteration on a register
pub fn apply_grover2(reg: &mut QRegister, q0: QubitId, q1: QubitId) -> QrunResult<()> {
    reg.apply(&Gate::Grover2(q0, q1))
}

// ============================================================================
// Tests
// ============================================================================
