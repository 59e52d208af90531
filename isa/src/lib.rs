//! Integer instruction set understood by the out-of-order simulator.
//!
//! Programs are exchanged as text, one instruction per line, e.g.
//! `addi x4, x1, -5`. This crate turns such a line into a typed
//! [`Instruction`] and back.

mod decode;
mod opcode;
mod register;

pub use decode::{decode, DecodeError, Instruction, OperandB};
pub use opcode::Opcode;
pub use register::LogicalRegister;

/// Number of architectural registers exposed by the simulator.
pub const DEFAULT_LOGICAL_REGISTERS: usize = 32;

/// Number of physical registers backing the rename stage.
pub const DEFAULT_PHYSICAL_REGISTERS: usize = 64;

/// PC the processor jumps to when an instruction raises an exception.
pub const FAULT_VECTOR: u64 = 0x10000;
