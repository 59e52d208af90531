use std::ops::Index;

use ooo_isa::LogicalRegister;
use serde::{Deserialize, Serialize};

/// Architectural register file, indexed by logical register number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    values: Vec<u64>,
}

impl RegisterFile {
    pub fn new(num_registers: usize) -> Self {
        Self {
            values: vec![0; num_registers],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, reg: LogicalRegister) -> Option<u64> {
        self.values.get(reg.index()).copied()
    }

    /// Caller must have checked `reg` against [`RegisterFile::len`].
    pub(crate) fn set(&mut self, reg: LogicalRegister, value: u64) {
        self.values[reg.index()] = value;
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }
}

impl Index<usize> for RegisterFile {
    type Output = u64;

    fn index(&self, index: usize) -> &u64 {
        &self.values[index]
    }
}

/// Final architectural state of a reference run: what software can observe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchState {
    pub registers: RegisterFile,
    pub pc: u64,
    /// PC of the faulting instruction, if an exception was raised.
    pub exception_pc: Option<u64>,
}

impl ArchState {
    pub fn exception(&self) -> bool {
        self.exception_pc.is_some()
    }

    /// The simulator reports 0 while no exception has been raised.
    pub fn reported_exception_pc(&self) -> u64 {
        self.exception_pc.unwrap_or(0)
    }
}
