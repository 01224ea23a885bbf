//! QPU backend contract and IR emission
//!
//! Gantree: L5_Backend → QpuBackend
//!
//! A QPU backend receives a textual IR for a task and runs it
//! somewhere outside the process. `emit_qir` renders a circuit in the
//! QIR base-profile call style, one `__quantum__qis__*__body` call per
//! gate with qubits numbered in first-reference order.

use qrun_core::{Circuit, Gate, Instruction, QrunError, QrunResult, QubitRef};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Mutex, PoisonError};

/// Quantum processor backend
/// Gantree: QpuBackend // QPU 백엔드 인터페이스
pub trait QpuBackend: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Submit one IR payload
    /// Gantree: execute_ir(ir) -> QrunResult<()>
    fn execute_ir(&self, ir: &str) -> QrunResult<()>;
}

// ============================================================================
// IR Emission
// ============================================================================

fn qubit_operand(index: usize) -> String {
    format!("%Qubit* inttoptr (i64 {} to %Qubit*)", index)
}

fn result_operand(index: usize) -> String {
    format!("%Result* inttoptr (i64 {} to %Result*)", index)
}

fn gate_call(gate: &Gate<QubitRef>, index: &HashMap<&QubitRef, usize>) -> Vec<String> {
    if matches!(gate, Gate::Qft2(..) | Gate::Grover2(..)) {
        return gate
            .decompose()
            .iter()
            .flat_map(|g| gate_call(g, index))
            .collect();
    }

    let mut args: Vec<String> = gate.angle().map(|a| format!("double {:?}", a)).into_iter().collect();
    args.extend(gate.qubits().into_iter().map(|q| qubit_operand(index[q])));
    vec![format!(
        "call void @__quantum__qis__{}__body({})",
        gate.name().to_lowercase(),
        args.join(", ")
    )]
}

/// Render a circuit as textual QIR
/// Gantree: emit_qir(circuit) -> String // QIR 생성
///
/// Conditional gates are emitted unguarded after a comment naming the
/// condition. Instructions with no QIR form become comments.
pub fn emit_qir(circuit: &Circuit) -> String {
    let qubits = circuit.qubits();
    let index: HashMap<&QubitRef, usize> = qubits.iter().enumerate().map(|(i, q)| (q, i)).collect();
    let mut results = 0usize;
    let mut body = Vec::new();

    for inst in circuit.instructions() {
        match inst {
            Instruction::Gate(g) => body.extend(gate_call(g, &index)),
            Instruction::Conditional {
                condition, negated, gate,
            } => {
                body.push(format!(
                    "; if {}{:?}",
                    if *negated { "not " } else { "" },
                    condition
                ));
                body.extend(gate_call(gate, &index));
            }
            Instruction::Measure { qubit, .. } => {
                body.push(format!(
                    "call void @__quantum__qis__mz__body({}, {})",
                    qubit_operand(index[qubit]),
                    result_operand(results)
                ));
                results += 1;
            }
            Instruction::QAlloc { .. } | Instruction::TaskBegin { .. } | Instruction::TaskEnd => {}
            other => body.push(format!("; {}", other)),
        }
    }

    let mut out = String::new();
    // writing into a String cannot fail
    let _ = writeln!(out, "; ModuleID = 'qrun'");
    let _ = writeln!(out, "; qubits = {}, results = {}", qubits.len(), results);
    let _ = writeln!(out, "define void @main() #0 {{");
    let _ = writeln!(out, "entry:");
    for line in &body {
        let _ = writeln!(out, "  {}", line);
    }
    let _ = writeln!(out, "  ret void");
    let _ = writeln!(out, "}}");
    out
}

// ============================================================================
// RecordingBackend
// ============================================================================

/// In-process backend that records every submission
/// Gantree: RecordingBackend // 제출 기록 백엔드
#[derive(Debug)]
pub struct RecordingBackend {
    name: String,
    failure: Option<String>,
    submissions: Mutex<Vec<String>>,
}

impl RecordingBackend {
    /// Backend accepting every submission
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure: None,
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Backend that records, then rejects every submission with `message`
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(name)
        }
    }

    /// Payloads received so far
    pub fn submissions(&self) -> Vec<String> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of payloads received
    pub fn calls(&self) -> usize {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl QpuBackend for RecordingBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute_ir(&self, ir: &str) -> QrunResult<()> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ir.to_string());
        match &self.failure {
            Some(msg) => Err(QrunError::BackendError(format!("{}: {}", self.name, msg))),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
