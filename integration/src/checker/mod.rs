//! Equivalence between the reference interpreter's final state and the last
//! snapshot of the simulator under test.
//!
//! Besides the architectural state, the snapshot has to show a drained
//! machine: empty queues, no busy physical registers and a consistent
//! free list / register map.

use std::{collections::BTreeSet, fmt};

use ooo_reference::ArchState;

use crate::{config::MachineConfig, snapshot::Snapshot};


#[derive(Clone, Debug, PartialEq, Eq, derive_more::Display)]
pub enum Mismatch {
    #[display("PC: expected {expected}, got {actual}")]
    Pc { expected: u64, actual: u64 },
    #[display("Exception: expected {expected}, got {actual}")]
    Exception { expected: bool, actual: bool },
    #[display("ExceptionPC: expected {expected}, got {actual}")]
    ExceptionPc { expected: u64, actual: u64 },
    #[display("{structure}: expected empty, got {len} entries")]
    NotDrained { structure: &'static str, len: usize },
    #[display("BusyBitTable: entry {index} is still set")]
    BusyBit { index: usize },
    #[display("FreeList: expected {expected} entries, got {actual}")]
    FreeListLength { expected: usize, actual: usize },
    #[display("RegisterMapTable: expected {expected} entries, got {actual}")]
    MapTableLength { expected: usize, actual: usize },
    #[display("physical register p{id} is out of range, there are {physical_registers}")]
    PhysicalRegisterOutOfRange { id: u64, physical_registers: usize },
    #[display(
        "RegisterMapTable + FreeList: expected {expected} distinct physical registers, got {actual}"
    )]
    PhysicalRegisterCount { expected: usize, actual: usize },
    #[display("register x{logical} (p{physical}): expected {expected}, got {actual}")]
    Register {
        logical: usize,
        physical: u64,
        expected: u64,
        actual: u64,
    },
    #[display(
        "register x{logical}: mapped to p{physical}, but PhysicalRegisterFile has {len} entries"
    )]
    UnmappedRegister {
        logical: usize,
        physical: u64,
        len: usize,
    },
}

/// Every mismatch found for one case, in check order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub mismatches: Vec<Mismatch>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "all checks passed");
        }
        write!(f, "{} mismatch(es):", self.mismatches.len())?;
        for mismatch in &self.mismatches {
            write!(f, "\n  {mismatch}")?;
        }
        Ok(())
    }
}

pub fn check(reference: &ArchState, snapshot: &Snapshot, machine: &MachineConfig) -> CheckReport {
    let mut mismatches = Vec::new();

    if snapshot.pc != reference.pc {
        mismatches.push(Mismatch::Pc {
            expected: reference.pc,
            actual: snapshot.pc,
        });
    }
    if snapshot.exception != reference.exception() {
        mismatches.push(Mismatch::Exception {
            expected: reference.exception(),
            actual: snapshot.exception,
        });
    }
    if snapshot.exception_pc != reference.reported_exception_pc() {
        mismatches.push(Mismatch::ExceptionPc {
            expected: reference.reported_exception_pc(),
            actual: snapshot.exception_pc,
        });
    }

    check_drained(snapshot, &mut mismatches);
    check_register_accounting(snapshot, machine, &mut mismatches);
    check_register_values(reference, snapshot, machine, &mut mismatches);

    CheckReport { mismatches }
}

fn check_drained(snapshot: &Snapshot, mismatches: &mut Vec<Mismatch>) {
    for (structure, len) in [
        ("ActiveList", snapshot.active_list.len()),
        ("DecodedPCs", snapshot.decoded_pcs.len()),
        ("IntegerQueue", snapshot.integer_queue.len()),
    ] {
        if len != 0 {
            mismatches.push(Mismatch::NotDrained { structure, len });
        }
    }
    mismatches.extend(
        snapshot
            .busy_bit_table
            .iter()
            .enumerate()
            .filter(|(_, bit)| bit.is_set())
            .map(|(index, _)| Mismatch::BusyBit { index }),
    );
}

/// Each physical register is either mapped or free, exactly once.
fn check_register_accounting(
    snapshot: &Snapshot,
    machine: &MachineConfig,
    mismatches: &mut Vec<Mismatch>,
) {
    let expected_free = machine.drained_free_list_len();
    if snapshot.free_list.len() != expected_free {
        mismatches.push(Mismatch::FreeListLength {
            expected: expected_free,
            actual: snapshot.free_list.len(),
        });
    }
    if snapshot.register_map_table.len() != machine.logical_registers {
        mismatches.push(Mismatch::MapTableLength {
            expected: machine.logical_registers,
            actual: snapshot.register_map_table.len(),
        });
    }

    let ids: BTreeSet<u64> = snapshot
        .register_map_table
        .iter()
        .chain(&snapshot.free_list)
        .copied()
        .collect();
    mismatches.extend(
        ids.iter()
            .filter(|&&id| id >= machine.physical_registers as u64)
            .map(|&id| Mismatch::PhysicalRegisterOutOfRange {
                id,
                physical_registers: machine.physical_registers,
            }),
    );
    if ids.len() != machine.physical_registers {
        mismatches.push(Mismatch::PhysicalRegisterCount {
            expected: machine.physical_registers,
            actual: ids.len(),
        });
    }
}

fn check_register_values(
    reference: &ArchState,
    snapshot: &Snapshot,
    machine: &MachineConfig,
    mismatches: &mut Vec<Mismatch>,
) {
    let prf = &snapshot.physical_register_file;
    for (logical, &physical) in snapshot
        .register_map_table
        .iter()
        .enumerate()
        .take(machine.logical_registers)
    {
        let Some(&expected) = reference.registers.values().get(logical) else {
            break;
        };
        match usize::try_from(physical).ok().and_then(|p| prf.get(p)) {
            Some(&actual) if actual == expected => {}
            Some(&actual) => mismatches.push(Mismatch::Register {
                logical,
                physical,
                expected,
                actual,
            }),
            None => mismatches.push(Mismatch::UnmappedRegister {
                logical,
                physical,
                len: prf.len(),
            }),
        }
    }
}
