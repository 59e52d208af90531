//! Per-cycle state dump written by the simulator under test.

use ooo_reference::ArchState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::MachineConfig;

/// One entry of `BusyBitTable`. Simulators emit either JSON booleans or 0/1.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BusyBit {
    Flag(bool),
    Bit(u64),
}

impl BusyBit {
    pub fn is_set(self) -> bool {
        match self {
            BusyBit::Flag(flag) => flag,
            BusyBit::Bit(bit) => bit != 0,
        }
    }
}

/// Queue entries are kept as raw JSON: at the end of a run only their
/// absence matters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Snapshot {
    #[serde(rename = "PC")]
    pub pc: u64,
    pub exception: bool,
    #[serde(rename = "ExceptionPC")]
    pub exception_pc: u64,
    pub active_list: Vec<Value>,
    #[serde(rename = "DecodedPCs")]
    pub decoded_pcs: Vec<Value>,
    pub integer_queue: Vec<Value>,
    pub busy_bit_table: Vec<BusyBit>,
    pub free_list: Vec<u64>,
    pub register_map_table: Vec<u64>,
    pub physical_register_file: Vec<u64>,
}

impl Snapshot {
    /// State of a fully drained machine holding `state`, with logical
    /// register `i` mapped to physical register `i`.
    pub fn drained(state: &ArchState, machine: &MachineConfig) -> Self {
        let logical = machine.logical_registers;
        let physical = machine.physical_registers;
        let mut physical_register_file = vec![0; physical];
        for (slot, value) in physical_register_file
            .iter_mut()
            .zip(state.registers.values())
        {
            *slot = *value;
        }
        Self {
            pc: state.pc,
            exception: state.exception(),
            exception_pc: state.reported_exception_pc(),
            active_list: Vec::new(),
            decoded_pcs: Vec::new(),
            integer_queue: Vec::new(),
            busy_bit_table: vec![BusyBit::Flag(false); physical],
            free_list: (logical as u64..physical as u64).collect(),
            register_map_table: (0..logical as u64).collect(),
            physical_register_file,
        }
    }
}
