//! Hardware profile
//!
//! Gantree: L5_Backend → HardwareProfile
//!
//! Device limits loaded from JSON and checked against a circuit before
//! it is sent to a QPU. A zero limit or an empty gate list means the
//! device does not constrain that dimension.

use qrun_core::{Circuit, QrunError, QrunResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Limits of a target device
/// Gantree: HardwareProfile // 하드웨어 프로파일
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareProfile {
    /// Device identifier
    pub device_id: String,
    /// Maximum qubit count
    pub max_qubits: usize,
    /// Maximum circuit depth
    pub max_depth: usize,
    /// Gate mnemonics the device accepts
    pub supported_gates: Vec<String>,
    /// Coherence time in microseconds
    pub coherence_time_us: u64,
}

impl HardwareProfile {
    /// Profile with no limits
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Self::default()
        }
    }

    /// Set maximum qubits
    pub fn with_max_qubits(mut self, n: usize) -> Self {
        self.max_qubits = n;
        self
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set supported gates
    pub fn with_gates<S: Into<String>>(mut self, gates: impl IntoIterator<Item = S>) -> Self {
        self.supported_gates = gates.into_iter().map(Into::into).collect();
        self
    }

    // ========================================================================
    // JSON
    // ========================================================================

    /// Parse from JSON text; missing fields take defaults
    pub fn from_json(json: &str) -> QrunResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    /// Gantree: load(path) -> QrunResult<Self> // 프로파일 로드
    pub fn load(path: impl AsRef<Path>) -> QrunResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> QrunResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Whether the device accepts gate `name` (case-insensitive)
    pub fn supports(&self, name: &str) -> bool {
        self.supported_gates.is_empty()
            || self
                .supported_gates
                .iter()
                .any(|g| g.eq_ignore_ascii_case(name))
    }

    /// One diagnostic per violated limit; empty when the circuit fits
    /// Gantree: validate(circuit) -> Vec<String> // 검증
    pub fn validate(&self, circuit: &Circuit) -> Vec<String> {
        let mut issues = Vec::new();

        let qubits = circuit.qubit_count();
        if self.max_qubits > 0 && qubits > self.max_qubits {
            issues.push(format!(
                "circuit uses {} qubits, device '{}' allows {}",
                qubits, self.device_id, self.max_qubits
            ));
        }

        let depth = circuit.depth();
        if self.max_depth > 0 && depth > self.max_depth {
            issues.push(format!(
                "circuit depth {} exceeds device '{}' limit {}",
                depth, self.device_id, self.max_depth
            ));
        }

        for name in circuit.gate_names() {
            if !self.supports(name) {
                issues.push(format!(
                    "gate {} not supported by device '{}'",
                    name, self.device_id
                ));
            }
        }
        issues
    }

    /// `Err(ProfileViolation)` carrying every diagnostic
    pub fn check(&self, circuit: &Circuit) -> QrunResult<()> {
        let issues = self.validate(circuit);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(QrunError::ProfileViolation(issues))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"{
        "device_id": "ibmq_test",
        "max_qubits": 2,
        "max_depth": 3,
        "supported_gates": ["h", "cnot", "x"],
        "coherence_time_us": 100
    }"#;

    #[test]
    fn test_from_json() {
        let p = HardwareProfile::from_json(PROFILE).unwrap();
        assert_eq!(p.device_id, "ibmq_test");
        assert_eq!(p.max_qubits, 2);
        assert_eq!(p.supported_gates.len(), 3);
        assert_eq!(p.coherence_time_us, 100);
    }

    #[test]
    fn test_missing_fields_default() {
        let p = HardwareProfile::from_json(r#"{"device_id": "sim"}"#).unwrap();
        assert_eq!(p.max_qubits, 0);
        assert!(p.supports("CCX"));
        assert!(HardwareProfile::from_json("not json").is_err());
    }

    #[test]
    fn test_fitting_circuit() {
        let p = HardwareProfile::from_json(PROFILE).unwrap();
        let c = Circuit::parse("H q 0\nCNOT q 0 q 1\n").unwrap();
        assert!(p.validate(&c).is_empty());
        assert!(p.check(&c).is_ok());
    }

    #[test]
    fn test_each_violation_reported() {
        let p = HardwareProfile::from_json(PROFILE).unwrap();
        let c = Circuit::parse("H q 0\nT q 0\nH q 0\nS q 0\nX q 2\n").unwrap();
        let issues = p.validate(&c);
        // two qubits fit; depth 4 and gates T, S do not
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().any(|i| i.contains("depth 4")));
        assert!(issues.iter().any(|i| i.contains("gate T")));
        assert!(issues.iter().any(|i| i.contains("gate S")));

        match p.check(&c) {
            Err(QrunError::ProfileViolation(list)) => assert_eq!(list, issues),
            other => panic!("expected violation, got {:?}", other),
        }
    }

    #[test]
    fn test_too_many_qubits() {
        let p = HardwareProfile::new("small").with_max_qubits(1);
        let c = Circuit::parse("QALLOC q 3\n").unwrap();
        let issues = p.validate(&c);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("3 qubits"));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        let p = HardwareProfile::new("dev").with_max_depth(5).with_gates(["H", "RZ"]);
        std::fs::write(&path, p.to_json().unwrap()).unwrap();
        assert_eq!(HardwareProfile::load(&path).unwrap(), p);
        assert!(HardwareProfile::load(dir.path().join("missing.json")).is_err());
    }
}
