//! Harness configuration. Defaults match the simulator's register geometry
//! and the usual fuzzing campaign settings.

use std::{path::PathBuf, time::Duration};

use ooo_isa::{Opcode, DEFAULT_LOGICAL_REGISTERS, DEFAULT_PHYSICAL_REGISTERS};
use ooo_reference::ArithmeticMode;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Register geometry of the simulator under test.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub logical_registers: usize,
    pub physical_registers: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            logical_registers: DEFAULT_LOGICAL_REGISTERS,
            physical_registers: DEFAULT_PHYSICAL_REGISTERS,
        }
    }
}

impl MachineConfig {
    /// Free-list length of a drained machine: every physical register not
    /// holding an architectural value.
    pub fn drained_free_list_len(&self) -> usize {
        self.physical_registers.saturating_sub(self.logical_registers)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub min_instructions: usize,
    pub max_instructions: usize,
    pub opcodes: Vec<Opcode>,
    pub logical_registers: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_instructions: 1,
            max_instructions: 50,
            opcodes: Opcode::iter().collect(),
            logical_registers: DEFAULT_LOGICAL_REGISTERS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub machine: MachineConfig,
    pub generator: GeneratorConfig,
    /// Program files go to `<tests_dir>/test_NNNNN.json`, simulator output
    /// to `<tests_dir>/out/`.
    pub tests_dir: PathBuf,
    pub num_tests: usize,
    /// Base seed; each case derives its own generator from it.
    pub seed: Option<u64>,
    pub jobs: usize,
    pub timeout_ms: u64,
    pub arithmetic: ArithmeticMode,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            machine: MachineConfig::default(),
            generator: GeneratorConfig::default(),
            tests_dir: PathBuf::from("tests"),
            num_tests: 10,
            seed: None,
            jobs: 1,
            timeout_ms: 10_000,
            arithmetic: ArithmeticMode::default(),
        }
    }
}

impl HarnessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
