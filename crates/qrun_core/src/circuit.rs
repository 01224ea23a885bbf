//! Instruction stream for QRUN
//!
//! Gantree: L1_Circuit → Circuit
//!
//! Line-oriented textual program: one opcode plus space-separated
//! operands per line. Parsed into [`Instruction`]s that name qubits
//! by register and index.

use crate::error::{QrunError, QrunResult};
use crate::gate::Gate;
use crate::types::{Angle, ExecHint, ExecTarget, QubitRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

// ============================================================================
// Instruction
// ============================================================================

/// Where a measurement result is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureStore {
    /// Classical variable
    Var(String),
    /// Bit of a classical register
    Bit {
        /// Classical register name
        creg: String,
        /// Bit index
        index: usize,
    },
}

/// Condition guarding a gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Classical variable is set
    Var(String),
    /// Classical register bit is set
    Bit {
        /// Classical register name
        creg: String,
        /// Bit index
        index: usize,
    },
}

/// One parsed line of an instruction stream
/// Gantree: Instruction // 명령어 enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// `QALLOC name n`
    QAlloc {
        /// Register name
        name: String,
        /// Number of qubits
        size: usize,
    },
    /// `CALLOC name n`
    CAlloc {
        /// Register name
        name: String,
        /// Number of bits
        size: usize,
    },
    /// `VAR name`
    Var(String),
    /// Unconditional gate
    Gate(Gate<QubitRef>),
    /// `MEASURE reg idx [-> VAR name | -> creg idx]`
    Measure {
        /// Measured qubit
        qubit: QubitRef,
        /// Optional destination
        store: Option<MeasureStore>,
    },
    /// `IFVAR`/`IFNVAR`/`IFC`/`IFNC` guarded gate
    Conditional {
        /// Guard
        condition: Condition,
        /// Apply when the guard is false instead
        negated: bool,
        /// Guarded gate
        gate: Gate<QubitRef>,
    },
    /// `TASK name target [hint]`
    TaskBegin {
        /// Task name
        name: String,
        /// Execution target
        target: ExecTarget,
        /// Simulation hint
        hint: ExecHint,
    },
    /// `ENDTASK`
    TaskEnd,
    /// Unrecognised line, kept verbatim
    Other(Vec<String>),
}

impl Instruction {
    /// Gate carried by this instruction, conditional or not
    pub fn gate(&self) -> Option<&Gate<QubitRef>> {
        match self {
            Instruction::Gate(g) | Instruction::Conditional { gate: g, .. } => Some(g),
            _ => None,
        }
    }

    /// Qubits this instruction touches
    pub fn qubits(&self) -> Vec<QubitRef> {
        match self {
            Instruction::QAlloc { name, size } => {
                (0..*size).map(|i| QubitRef::new(name.clone(), i)).collect()
            }
            Instruction::Measure { qubit, .. } => vec![qubit.clone()],
            other => other
                .gate()
                .map(|g| g.qubits().into_iter().cloned().collect())
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::QAlloc { name, size } => write!(f, "QALLOC {} {}", name, size),
            Instruction::CAlloc { name, size } => write!(f, "CALLOC {} {}", name, size),
            Instruction::Var(name) => write!(f, "VAR {}", name),
            Instruction::Gate(g) => f.write_str(&gate_tokens(g).join(" ")),
            Instruction::Measure { qubit, store } => {
                write!(f, "MEASURE {} {}", qubit.reg, qubit.index)?;
                match store {
                    Some(MeasureStore::Var(v)) => write!(f, " -> VAR {}", v),
                    Some(MeasureStore::Bit { creg, index }) => write!(f, " -> {} {}", creg, index),
                    None => Ok(()),
                }
            }
            Instruction::Conditional {
                condition,
                negated,
                gate,
            } => {
                let gate_text = gate_tokens(gate).join(" ");
                match condition {
                    Condition::Var(v) => {
                        let op = if *negated { "IFNVAR" } else { "IFVAR" };
                        write!(f, "{} {} {}", op, v, gate_text)
                    }
                    Condition::Bit { creg, index } => {
                        let op = if *negated { "IFNC" } else { "IFC" };
                        write!(f, "{} {} {} {}", op, creg, index, gate_text)
                    }
                }
            }
            Instruction::TaskBegin { name, target, hint } => {
                write!(f, "TASK {} {}", name, target)?;
                if *hint != ExecHint::None {
                    write!(f, " {}", hint)?;
                }
                Ok(())
            }
            Instruction::TaskEnd => f.write_str("ENDTASK"),
            Instruction::Other(tokens) => f.write_str(&tokens.join(" ")),
        }
    }
}

/// Tokens of a gate as written in the stream
///
/// Single-register two-qubit patterns (`QFT2`, `GROVER2`) use the
/// compact `OP reg q0 q1` form; everything else lists `reg idx` pairs.
fn gate_tokens(gate: &Gate<QubitRef>) -> Vec<String> {
    let mut tokens = vec![gate.name().to_string()];
    match gate {
        Gate::Qft2(a, b) | Gate::Grover2(a, b) => {
            tokens.push(a.reg.clone());
            tokens.push(a.index.to_string());
            tokens.push(b.index.to_string());
        }
        _ => {
            for q in gate.qubits() {
                tokens.push(q.reg.clone());
                tokens.push(q.index.to_string());
            }
        }
    }
    if let Some(a) = gate.angle() {
        tokens.push(a.to_string());
    }
    tokens
}

// ============================================================================
// Parsing
// ============================================================================

struct LineParser<'a> {
    line: usize,
    tokens: &'a [&'a str],
}

impl<'a> LineParser<'a> {
    fn err(&self, reason: impl Into<String>) -> QrunError {
        QrunError::InvalidInstruction {
            line: self.line,
            reason: reason.into(),
        }
    }

    fn token(&self, i: usize) -> QrunResult<&'a str> {
        self.tokens
            .get(i)
            .copied()
            .ok_or_else(|| self.err(format!("missing operand {} of {}", i, self.tokens[0])))
    }

    fn usize_at(&self, i: usize) -> QrunResult<usize> {
        let tok = self.token(i)?;
        tok.parse()
            .map_err(|_| self.err(format!("expected integer, found '{}'", tok)))
    }

    fn angle_at(&self, i: usize) -> QrunResult<Angle> {
        let tok = self.token(i)?;
        let value: Angle = tok
            .parse()
            .map_err(|_| self.err(format!("expected angle, found '{}'", tok)))?;
        if !value.is_finite() {
            return Err(QrunError::InvalidGateParameter(format!(
                "angle {} at line {} is not finite",
                tok, self.line
            )));
        }
        Ok(value)
    }

    fn qubit_at(&self, i: usize) -> QrunResult<QubitRef> {
        Ok(QubitRef::new(self.token(i)?, self.usize_at(i + 1)?))
    }

    /// Parse a gate starting at token `at`; `None` if the opcode is not a gate
    fn gate_at(&self, at: usize) -> QrunResult<Option<Gate<QubitRef>>> {
        let op = self.token(at)?;
        let q = |k: usize| self.qubit_at(at + 1 + 2 * k);
        let gate = match op {
            "H" => Gate::H(q(0)?),
            "X" => Gate::X(q(0)?),
            "Y" => Gate::Y(q(0)?),
            "Z" => Gate::Z(q(0)?),
            "S" => Gate::S(q(0)?),
            "T" => Gate::T(q(0)?),
            "RX" => Gate::Rx(q(0)?, self.angle_at(at + 3)?),
            "RY" => Gate::Ry(q(0)?, self.angle_at(at + 3)?),
            "RZ" => Gate::Rz(q(0)?, self.angle_at(at + 3)?),
            "CNOT" => Gate::Cnot(q(0)?, q(1)?),
            "CZ" => Gate::Cz(q(0)?, q(1)?),
            "SWAP" => Gate::Swap(q(0)?, q(1)?),
            "CCX" => Gate::Ccx(q(0)?, q(1)?, q(2)?),
            "QFT2" | "GROVER2" => {
                let reg = self.token(at + 1)?;
                let a = QubitRef::new(reg, self.usize_at(at + 2)?);
                let b = QubitRef::new(reg, self.usize_at(at + 3)?);
                if op == "QFT2" {
                    Gate::Qft2(a, b)
                } else {
                    Gate::Grover2(a, b)
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(gate))
    }

    fn guarded_gate(&self, at: usize) -> QrunResult<Gate<QubitRef>> {
        self.gate_at(at)?
            .ok_or_else(|| self.err(format!("'{}' is not a gate", self.tokens[at])))
    }

    fn instruction(&self) -> QrunResult<Instruction> {
        let op = self.tokens[0];
        let inst = match op {
            "QALLOC" => Instruction::QAlloc {
                name: self.token(1)?.to_string(),
                size: self.usize_at(2)?,
            },
            "CALLOC" => Instruction::CAlloc {
                name: self.token(1)?.to_string(),
                size: self.usize_at(2)?,
            },
            "VAR" => Instruction::Var(self.token(1)?.to_string()),
            "MEASURE" => {
                let qubit = self.qubit_at(1)?;
                let store = match self.tokens.get(3) {
                    None => None,
                    Some(&"->") if self.tokens.get(4) == Some(&"VAR") => {
                        Some(MeasureStore::Var(self.token(5)?.to_string()))
                    }
                    Some(&"->") => Some(MeasureStore::Bit {
                        creg: self.token(4)?.to_string(),
                        index: self.usize_at(5)?,
                    }),
                    Some(other) => return Err(self.err(format!("unexpected '{}'", other))),
                };
                Instruction::Measure { qubit, store }
            }
            "IFVAR" | "IFNVAR" => Instruction::Conditional {
                condition: Condition::Var(self.token(1)?.to_string()),
                negated: op == "IFNVAR",
                gate: self.guarded_gate(2)?,
            },
            "IFC" | "IFNC" => Instruction::Conditional {
                condition: Condition::Bit {
                    creg: self.token(1)?.to_string(),
                    index: self.usize_at(2)?,
                },
                negated: op == "IFNC",
                gate: self.guarded_gate(3)?,
            },
            "TASK" => Instruction::TaskBegin {
                name: self.token(1)?.to_string(),
                target: self.token(2)?.parse::<ExecTarget>().map_err(|e: String| self.err(e))?,
                hint: match self.tokens.get(3) {
                    Some(h) => h.parse::<ExecHint>().map_err(|e: String| self.err(e))?,
                    None => ExecHint::None,
                },
            },
            "ENDTASK" => Instruction::TaskEnd,
            _ => match self.gate_at(0)? {
                Some(g) => Instruction::Gate(g),
                None => Instruction::Other(self.tokens.iter().map(|t| t.to_string()).collect()),
            },
        };
        Ok(inst)
    }
}

// ============================================================================
// Circuit
// ============================================================================

/// Sub-circuit delimited by `TASK` / `ENDTASK`
#[derive(Debug, Clone, PartialEq)]
pub struct TaskBlock {
    /// Task name
    pub name: String,
    /// Execution target
    pub target: ExecTarget,
    /// Simulation hint
    pub hint: ExecHint,
    /// Instructions between the markers
    pub body: Circuit,
}

/// Ordered instruction sequence
/// Gantree: Circuit // 회로 구조체
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    instructions: Vec<Instruction>,
}

impl Circuit {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create an empty circuit
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing instruction list
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Parse an instruction stream
    /// Gantree: parse(&str) -> QrunResult<Circuit> // 텍스트 파싱
    ///
    /// Blank lines and lines starting with `#` or `//` are skipped.
    pub fn parse(text: &str) -> QrunResult<Self> {
        let mut instructions = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let parser = LineParser {
                line: i + 1,
                tokens: &tokens,
            };
            instructions.push(parser.instruction()?);
        }
        Ok(Self { instructions })
    }

    /// Append an instruction
    pub fn push(&mut self, inst: Instruction) -> &mut Self {
        self.instructions.push(inst);
        self
    }

    /// Append an unconditional gate
    pub fn gate(&mut self, gate: Gate<QubitRef>) -> &mut Self {
        self.push(Instruction::Gate(gate))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// All instructions
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Mutable instruction list
    pub fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True when there are no instructions
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Every gate, conditional or not, in program order
    pub fn gates(&self) -> impl Iterator<Item = &Gate<QubitRef>> {
        self.instructions.iter().filter_map(Instruction::gate)
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    /// Distinct qubits in first-reference order
    /// Gantree: qubits() -> Vec<QubitRef> // 참조 순서
    pub fn qubits(&self) -> Vec<QubitRef> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for inst in &self.instructions {
            for q in inst.qubits() {
                if seen.insert(q.clone()) {
                    out.push(q);
                }
            }
        }
        out
    }

    /// Number of distinct qubits
    pub fn qubit_count(&self) -> usize {
        self.qubits().len()
    }

    /// Circuit depth: longest chain of gates and measurements sharing qubits
    pub fn depth(&self) -> usize {
        let mut qubit_depths: HashMap<QubitRef, usize> = HashMap::new();
        let mut depth = 0;

        for inst in &self.instructions {
            let qubits = match inst {
                Instruction::Gate(_)
                | Instruction::Conditional { .. }
                | Instruction::Measure { .. } => inst.qubits(),
                _ => continue,
            };

            let layer = qubits
                .iter()
                .filter_map(|q| qubit_depths.get(q))
                .max()
                .copied()
                .unwrap_or(0)
                + 1;

            for q in qubits {
                qubit_depths.insert(q, layer);
            }
            depth = depth.max(layer);
        }

        depth
    }

    /// Distinct gate mnemonics used
    pub fn gate_names(&self) -> BTreeSet<&'static str> {
        self.gates().map(|g| g.name()).collect()
    }

    /// Split into `TASK ... ENDTASK` blocks
    ///
    /// Instructions outside any block are ignored. An unterminated
    /// block runs to the end of the stream.
    pub fn task_blocks(&self) -> Vec<TaskBlock> {
        let mut blocks = Vec::new();
        let mut current: Option<TaskBlock> = None;

        for inst in &self.instructions {
            match inst {
                Instruction::TaskBegin { name, target, hint } => {
                    if let Some(done) = current.take() {
                        blocks.push(done);
                    }
                    current = Some(TaskBlock {
                        name: name.clone(),
                        target: *target,
                        hint: *hint,
                        body: Circuit::new(),
                    });
                }
                Instruction::TaskEnd => {
                    if let Some(done) = current.take() {
                        blocks.push(done);
                    }
                }
                other => {
                    if let Some(block) = current.as_mut() {
                        block.body.push(other.clone());
                    }
                }
            }
        }

        if let Some(done) = current {
            blocks.push(done);
        }
        blocks
    }

    /// Render back to the textual stream
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for inst in &self.instructions {
            out.push_str(&inst.to_string());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

// ============================================================================
// Tests
// ============================================================================
