//! Separability partitioner
//!
//! Gantree: L6_Engine → Partitioner
//!
//! Splits a circuit into groups of qubits that never interact through a
//! multi-qubit gate. Each group is simulated on its own state vector and
//! the results are recombined by tensor product, earlier groups taking
//! the high-order bits.

use qrun_core::{Amplitude, Circuit, Gate, Instruction, QrunError, QrunResult, QubitRef};
use qrun_state::{StateConfig, StateVector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Qubits of one separable component, in first-reference order
pub type Partition = Vec<QubitRef>;

/// What to do with a gate whose operands fall in different partitions
/// Gantree: CrossPartitionPolicy // Skip | Reject
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossPartitionPolicy {
    /// Drop the gate with a warning
    #[default]
    Skip,
    /// Fail with `CrossPartitionGate`
    Reject,
}

// ============================================================================
// Disjoint Set
// ============================================================================

/// Union-find with path splitting and union by rank
#[derive(Debug, Default)]
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn add(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        self.rank.push(0);
        id
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            let next = self.parent[x];
            self.parent[x] = self.parent[next];
            x = next;
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (big, small) = if self.rank[ra] >= self.rank[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[small] = big;
        if self.rank[big] == self.rank[small] {
            self.rank[big] += 1;
        }
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Group the circuit's qubits into separable partitions
/// Gantree: analyze_separable_regions(circuit) -> Vec<Partition> // 분리 영역 분석
///
/// Every referenced qubit lands in exactly one partition; `QALLOC`
/// references all of its qubits. Any gate with two or more operands
/// (conditional or not) joins them.
pub fn analyze_separable_regions(circuit: &Circuit) -> Vec<Partition> {
    let mut ids: HashMap<QubitRef, usize> = HashMap::new();
    let mut qubits: Vec<QubitRef> = Vec::new();
    let mut dsu = DisjointSet::default();

    for inst in circuit.instructions() {
        let members: Vec<usize> = inst
            .qubits()
            .into_iter()
            .map(|q| {
                *ids.entry(q.clone()).or_insert_with(|| {
                    qubits.push(q);
                    dsu.add()
                })
            })
            .collect();

        if inst.gate().is_some_and(Gate::is_entangling) {
            for &m in &members[1..] {
                dsu.union(members[0], m);
            }
        }
    }

    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut partitions: Vec<Partition> = Vec::new();
    for (i, q) in qubits.into_iter().enumerate() {
        let root = dsu.find(i);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            partitions.push(Vec::new());
            partitions.len() - 1
        });
        partitions[slot].push(q);
    }
    partitions
}

// ============================================================================
// Execution
// ============================================================================

/// Tensor product of two state vectors, `a` in the high-order bits
pub fn tensor_product(a: &[Amplitude], b: &[Amplitude]) -> Vec<Amplitude> {
    a.iter()
        .flat_map(|&x| b.iter().map(move |&y| x * y))
        .collect()
}

/// Simulate each separable partition on its own state
/// Gantree: execute_components(circuit,policy,config) -> QrunResult<Vec<(Partition,StateVector)>>
pub fn execute_components(
    circuit: &Circuit,
    policy: CrossPartitionPolicy,
    config: &StateConfig,
) -> QrunResult<Vec<(Partition, StateVector)>> {
    execute_on_partitions(circuit, analyze_separable_regions(circuit), policy, config)
}

/// Simulate a circuit over caller-supplied partitions
///
/// Every qubit the circuit's gates touch must belong to exactly one
/// partition. Gates spanning partitions are handled per `policy`.
/// Only unconditional gates are replayed; measurements and guarded
/// gates need classical state and are left to the interpreter.
pub fn execute_on_partitions(
    circuit: &Circuit,
    partitions: Vec<Partition>,
    policy: CrossPartitionPolicy,
    config: &StateConfig,
) -> QrunResult<Vec<(Partition, StateVector)>> {
    let mut location: HashMap<&QubitRef, (usize, usize)> = HashMap::new();
    for (p, part) in partitions.iter().enumerate() {
        for (local, q) in part.iter().enumerate() {
            if location.insert(q, (p, local)).is_some() {
                return Err(QrunError::InvalidConfig(format!(
                    "qubit {} appears in more than one partition",
                    q
                )));
            }
        }
    }

    let mut states = partitions
        .iter()
        .map(|part| StateVector::with_config(part.len(), config))
        .collect::<QrunResult<Vec<_>>>()?;

    for inst in circuit.instructions() {
        let Instruction::Gate(gate) = inst else {
            continue;
        };

        let placed = gate.try_map_qubits(|q| {
            location
                .get(q)
                .copied()
                .ok_or_else(|| QrunError::InvalidConfig(format!("qubit {} is not in any partition", q)))
        })?;

        let owner = placed.qubits()[0].0;
        if placed.qubits().iter().any(|&&(p, _)| p != owner) {
            match policy {
                CrossPartitionPolicy::Skip => {
                    log::warn!("Skipping gate '{}' spanning partitions", gate);
                    continue;
                }
                CrossPartitionPolicy::Reject => {
                    return Err(QrunError::CrossPartitionGate(gate.to_string()));
                }
            }
        }

        states[owner].apply_gate(&placed.map_qubits(|&(_, local)| local))?;
    }

    // location borrows the partitions being moved out below
    drop(location);
    Ok(partitions.into_iter().zip(states).collect())
}

/// Recombine component states into one
pub fn recombine(states: &[StateVector]) -> QrunResult<StateVector> {
    let mut amps = vec![Amplitude::new(1.0, 0.0)];
    for s in states {
        amps = tensor_product(&amps, &s.to_amplitudes()?);
    }
    StateVector::from_amplitudes(amps)
}

/// Simulate a circuit partition by partition and recombine
/// Gantree: execute_partitions(circuit,policy) -> QrunResult<StateVector> // 분할 실행
///
/// The result spans every referenced qubit, ordered partition by
/// partition.
pub fn execute_partitions(circuit: &Circuit, policy: CrossPartitionPolicy) -> QrunResult<StateVector> {
    let components = execute_components(circuit, policy, &StateConfig::in_memory())?;
    let states: Vec<StateVector> = components.into_iter().map(|(_, s)| s).collect();
    recombine(&states)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn q(reg: &str, i: usize) -> QubitRef {
        QubitRef::new(reg, i)
    }

    #[test]
    fn test_independent_registers() {
        let c = Circuit::parse("QALLOC a 1\nQALLOC b 1\nH a 0\nX b 0\n").unwrap();
        let parts = analyze_separable_regions(&c);
        assert_eq!(parts, vec![vec![q("a", 0)], vec![q("b", 0)]]);

        let s = execute_partitions(&c, CrossPartitionPolicy::Skip).unwrap();
        assert_eq!(s.dim(), 4);
        assert_abs_diff_eq!(s.amplitude(1).unwrap().re, FRAC_1_SQRT_2, epsilon = 1e-9);
        assert_abs_diff_eq!(s.amplitude(3).unwrap().re, FRAC_1_SQRT_2, epsilon = 1e-9);
        assert_abs_diff_eq!(s.amplitude(0).unwrap().norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_entangling_gate_joins() {
        let c = Circuit::parse("H a 0\nCNOT a 0 b 0\n").unwrap();
        let parts = analyze_separable_regions(&c);
        assert_eq!(parts, vec![vec![q("a", 0), q("b", 0)]]);

        let s = execute_partitions(&c, CrossPartitionPolicy::Reject).unwrap();
        assert_abs_diff_eq!(s.amplitude(0).unwrap().re, FRAC_1_SQRT_2, epsilon = 1e-9);
        assert_abs_diff_eq!(s.amplitude(3).unwrap().re, FRAC_1_SQRT_2, epsilon = 1e-9);
    }

    #[test]
    fn test_ccx_joins_three_and_order_follows_first_reference() {
        let c = Circuit::parse("X z 0\nQALLOC a 2\nCCX a 0 a 1 z 0\nH b 0\n").unwrap();
        let parts = analyze_separable_regions(&c);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], vec![q("z", 0), q("a", 0), q("a", 1)]);
        assert_eq!(parts[1], vec![q("b", 0)]);
    }

    #[test]
    fn test_measured_only_qubit_is_a_partition() {
        let c = Circuit::parse("H a 0\nMEASURE m 0\n").unwrap();
        assert_eq!(analyze_separable_regions(&c).len(), 2);
    }

    #[test]
    fn test_local_indices() {
        // b[3] is local qubit 0 of its own partition
        let c = Circuit::parse("X b 3\nQALLOC a 1\n").unwrap();
        let comps = execute_components(&c, CrossPartitionPolicy::Skip, &StateConfig::in_memory()).unwrap();
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].1.num_qubits(), 1);
        assert_abs_diff_eq!(comps[0].1.amplitude(1).unwrap().re, 1.0);
    }

    #[test]
    fn test_cross_partition_policy() {
        let c = Circuit::parse("H a 0\nCNOT a 0 b 0\n").unwrap();
        let split = || vec![vec![q("a", 0)], vec![q("b", 0)]];
        let config = StateConfig::in_memory();

        let mut comps = execute_on_partitions(&c, split(), CrossPartitionPolicy::Skip, &config).unwrap();
        assert_abs_diff_eq!(comps[0].1.probability_of_one(0).unwrap(), 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(comps[1].1.amplitude(0).unwrap().re, 1.0);

        assert!(matches!(
            execute_on_partitions(&c, split(), CrossPartitionPolicy::Reject, &config),
            Err(QrunError::CrossPartitionGate(_))
        ));
    }

    #[test]
    fn test_bad_partitions_rejected() {
        let c = Circuit::parse("H a 0\nX b 0\n").unwrap();
        let config = StateConfig::in_memory();
        assert!(matches!(
            execute_on_partitions(&c, vec![vec![q("a", 0)]], CrossPartitionPolicy::Skip, &config),
            Err(QrunError::InvalidConfig(_))
        ));
        let twice = vec![vec![q("a", 0)], vec![q("a", 0), q("b", 0)]];
        assert!(execute_on_partitions(&c, twice, CrossPartitionPolicy::Skip, &config).is_err());
    }

    #[test]
    fn test_disjoint_set() {
        let mut d = DisjointSet::default();
        let ids: Vec<usize> = (0..5).map(|_| d.add()).collect();
        d.union(ids[0], ids[1]);
        d.union(ids[3], ids[4]);
        d.union(ids[1], ids[4]);
        assert_eq!(d.find(0), d.find(3));
        assert_ne!(d.find(2), d.find(0));
    }

    #[test]
    fn test_tensor_product_order() {
        let zero = Amplitude::new(0.0, 0.0);
        let one = Amplitude::new(1.0, 0.0);
        // |1> ⊗ |0> = |10>
        assert_eq!(tensor_product(&[zero, one], &[one, zero]), vec![zero, zero, one, zero]);
    }

    #[test]
    fn test_empty_circuit() {
        let s = execute_partitions(&Circuit::new(), CrossPartitionPolicy::Skip).unwrap();
        assert_eq!(s.num_qubits(), 0);
        assert_eq!(s.dim(), 1);
    }
}
