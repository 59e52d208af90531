use ooo_isa::Opcode;
use serde::{Deserialize, Serialize};
use strum::EnumString;

/// How the interpreter treats results that do not fit in 64 bits.
///
/// Results always wrap modulo 2^64, as the simulated ALU does. `Strict`
/// additionally records every wrapping operation as an [`OverflowEvent`].
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, EnumString, strum::Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ArithmeticMode {
    #[default]
    Lenient,
    Strict,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverflowEvent {
    /// PC of the instruction whose result wrapped.
    pub pc: u64,
    pub opcode: Opcode,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AluOutcome {
    Value { value: u64, wrapped: bool },
    DivideByZero,
}

/// Computes `a <op> b` on unsigned 64-bit operands.
///
/// For `addi`, `b` is the immediate reinterpreted as two's complement.
pub fn run_alu(opcode: Opcode, a: u64, b: u64) -> AluOutcome {
    if opcode.is_division() && b == 0 {
        return AluOutcome::DivideByZero;
    }
    let (value, wrapped) = match opcode {
        Opcode::ADD => a.overflowing_add(b),
        Opcode::ADDI => run_addi(a, b as i64),
        Opcode::SUB => a.overflowing_sub(b),
        Opcode::MULU => a.overflowing_mul(b),
        Opcode::DIVU => (a / b, false),
        Opcode::REMU => (a % b, false),
    };
    AluOutcome::Value { value, wrapped }
}

#[inline(always)]
fn run_addi(a: u64, imm: i64) -> (u64, bool) {
    let value = a.wrapping_add(imm as u64);
    // Wrapping is judged on the signed sum: `x - 1` is not an overflow.
    (value, a.checked_add_signed(imm).is_none())
}
