//! Decision-diagram state compression
//!
//! Gantree: L2_State → DecisionDiagram
//!
//! Canonical DAG encoding of an amplitude vector. Nodes live in an
//! arena and are only created through two tables: internal nodes keyed
//! by `(level, low, high)` and terminals keyed by amplitude bits. Equal
//! sub-vectors therefore share one node. Read-only once built.

use crate::state::StateVector;
use qrun_core::{Amplitude, QrunError, QrunResult};
use std::collections::HashMap;

/// Index into the node arena
pub type NodeId = usize;

/// Decision-diagram node
/// Gantree: Node // Terminal | Internal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node {
    /// Leaf holding one amplitude, broadcast over its index range
    Terminal(Amplitude),
    /// Branch on the top qubit of a `2^level` range
    Internal {
        /// Number of qubits spanned
        level: usize,
        /// Child for top bit 0
        low: NodeId,
        /// Child for top bit 1
        high: NodeId,
    },
}

fn terminal_key(v: Amplitude) -> (u64, u64) {
    // fold -0.0 into 0.0 so both share a terminal
    let re = if v.re == 0.0 { 0.0 } else { v.re };
    let im = if v.im == 0.0 { 0.0 } else { v.im };
    (re.to_bits(), im.to_bits())
}

/// Canonical decision diagram over an amplitude vector
/// Gantree: DecisionDiagram // QuIDD
#[derive(Debug, Clone)]
pub struct DecisionDiagram {
    nodes: Vec<Node>,
    unique: HashMap<(usize, NodeId, NodeId), NodeId>,
    terminals: HashMap<(u64, u64), NodeId>,
    root: NodeId,
    num_qubits: usize,
}

impl DecisionDiagram {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Build from raw amplitudes; length must be a non-zero power of two
    /// Gantree: from_amplitudes(&[Amplitude]) -> QrunResult<Self> // 이분 분할
    pub fn from_amplitudes(amps: &[Amplitude]) -> QrunResult<Self> {
        if amps.is_empty() || !amps.len().is_power_of_two() {
            return Err(QrunError::ShapeMismatch {
                expected: amps.len().next_power_of_two().max(1),
                actual: amps.len(),
            });
        }

        let num_qubits = amps.len().trailing_zeros() as usize;
        let mut dd = Self {
            nodes: Vec::new(),
            unique: HashMap::new(),
            terminals: HashMap::new(),
            root: 0,
            num_qubits,
        };
        dd.root = dd.build(amps, num_qubits);
        Ok(dd)
    }

    /// Build from a state vector of any backing
    pub fn from_state(state: &StateVector) -> QrunResult<Self> {
        Self::from_amplitudes(&state.to_amplitudes()?)
    }

    fn build(&mut self, amps: &[Amplitude], level: usize) -> NodeId {
        if level == 0 {
            return self.terminal(amps[0]);
        }
        let (lo, hi) = amps.split_at(amps.len() / 2);
        let low = self.build(lo, level - 1);
        let high = self.build(hi, level - 1);
        if low == high {
            return low;
        }
        self.internal(level, low, high)
    }

    fn terminal(&mut self, value: Amplitude) -> NodeId {
        let nodes = &mut self.nodes;
        *self.terminals.entry(terminal_key(value)).or_insert_with(|| {
            nodes.push(Node::Terminal(value));
            nodes.len() - 1
        })
    }

    fn internal(&mut self, level: usize, low: NodeId, high: NodeId) -> NodeId {
        let nodes = &mut self.nodes;
        *self.unique.entry((level, low, high)).or_insert_with(|| {
            nodes.push(Node::Internal { level, low, high });
            nodes.len() - 1
        })
    }

    // ========================================================================
    // Expansion
    // ========================================================================

    /// Expand back to the full amplitude vector
    /// Gantree: to_vector() -> Vec<Amplitude> // 복원
    pub fn to_vector(&self) -> Vec<Amplitude> {
        let mut out = vec![Amplitude::new(0.0, 0.0); 1usize << self.num_qubits];
        self.fill(self.root, &mut out);
        out
    }

    /// Expand into a dense state vector
    pub fn to_state(&self) -> QrunResult<StateVector> {
        StateVector::from_amplitudes(self.to_vector())
    }

    fn fill(&self, id: NodeId, out: &mut [Amplitude]) {
        match self.nodes[id] {
            Node::Terminal(v) => out.iter_mut().for_each(|a| *a = v),
            Node::Internal { level, low, high } => {
                // a node below the range's level repeats across the skipped bits
                let span = 1usize << level;
                for chunk in out.chunks_mut(span) {
                    let (lo, hi) = chunk.split_at_mut(span / 2);
                    self.fill(low, lo);
                    self.fill(high, hi);
                }
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Number of distinct nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of qubits encoded
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Bytes used by the node arena
    pub fn memory_bytes(&self) -> usize {
        self.nodes.len() * std::mem::size_of::<Node>()
    }
}

// ============================================================================
// Tests
// ============================================================================
