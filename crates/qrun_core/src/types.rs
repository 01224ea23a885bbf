//! Core types for QRUN
//!
//! Gantree: L0_Foundation → CoreTypes
//!
//! Type aliases, qubit references and task targeting enums
//! used throughout the runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// Qubit identifier within one register (0-indexed)
/// Gantree: QubitId // pub type QubitId = usize
pub type QubitId = usize;

/// Rotation angle in radians
pub type Angle = f64;

/// Complex amplitude of one basis state
/// Gantree: Amplitude // Complex64
pub type Amplitude = num_complex::Complex64;

/// Register handle issued by the register manager
pub type RegisterId = usize;

// ============================================================================
// QubitRef
// ============================================================================

/// Qubit addressed by register name and index, as written in an instruction stream
/// Gantree: QubitRef{{reg,index}} // 레지스터 + 인덱스
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QubitRef {
    /// Register name
    pub reg: String,
    /// Index inside the register
    pub index: QubitId,
}

impl QubitRef {
    /// Create a new qubit reference
    pub fn new(reg: impl Into<String>, index: QubitId) -> Self {
        Self {
            reg: reg.into(),
            index,
        }
    }
}

impl fmt::Display for QubitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.reg, self.index)
    }
}

// ============================================================================
// Execution Target
// ============================================================================

/// Where a task should run
/// Gantree: ExecTarget // CPU/QPU/AUTO/MIXED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExecTarget {
    /// Local simulation
    #[default]
    Cpu,
    /// External quantum processor
    Qpu,
    /// Runtime decides
    Auto,
    /// Split between CPU and QPU
    Mixed,
}

impl ExecTarget {
    /// Upper-case keyword used in instruction streams and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecTarget::Cpu => "CPU",
            ExecTarget::Qpu => "QPU",
            ExecTarget::Auto => "AUTO",
            ExecTarget::Mixed => "MIXED",
        }
    }
}

impl fmt::Display for ExecTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CPU" => Ok(ExecTarget::Cpu),
            "QPU" => Ok(ExecTarget::Qpu),
            "AUTO" => Ok(ExecTarget::Auto),
            "MIXED" => Ok(ExecTarget::Mixed),
            other => Err(format!("unknown target '{}'", other)),
        }
    }
}

// ============================================================================
// Execution Hint
// ============================================================================

/// Simulation strategy hint attached to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExecHint {
    /// No preference
    #[default]
    None,
    /// Force a dense state vector
    Dense,
    /// Circuit is Clifford-only
    Clifford,
}

impl ExecHint {
    /// Keyword, empty for `None`
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecHint::None => "",
            ExecHint::Dense => "DENSE",
            ExecHint::Clifford => "CLIFFORD",
        }
    }
}

impl fmt::Display for ExecHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "" | "NONE" => Ok(ExecHint::None),
            "DENSE" => Ok(ExecHint::Dense),
            "CLIFFORD" => Ok(ExecHint::Clifford),
            other => Err(format!("unknown hint '{}'", other)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qubit_ref_display() {
        assert_eq!(QubitRef::new("a", 2).to_string(), "a[2]");
    }

    #[test]
    fn test_qubit_ref_ordering() {
        let a0 = QubitRef::new("a", 0);
        let a1 = QubitRef::new("a", 1);
        let b0 = QubitRef::new("b", 0);
        assert!(a0 < a1);
        assert!(a1 < b0);
    }

    #[test]
    fn test_target_parse() {
        assert_eq!("qpu".parse::<ExecTarget>().unwrap(), ExecTarget::Qpu);
        assert_eq!("MIXED".parse::<ExecTarget>().unwrap(), ExecTarget::Mixed);
        assert!("GPU".parse::<ExecTarget>().is_err());
        assert_eq!(ExecTarget::Auto.to_string(), "AUTO");
    }

    #[test]
    fn test_hint_parse() {
        assert_eq!("Clifford".parse::<ExecHint>().unwrap(), ExecHint::Clifford);
        assert_eq!("".parse::<ExecHint>().unwrap(), ExecHint::None);
        assert_eq!(ExecHint::Dense.to_string(), "DENSE");
    }
}
