use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString};

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    EnumString,
    strum::Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Opcode {
    ADD,
    ADDI,
    SUB,
    MULU,
    DIVU,
    REMU,
}

impl Opcode {
    /// Whether the last operand is a signed immediate rather than a register.
    pub fn has_immediate(self) -> bool {
        matches!(self, Opcode::ADDI)
    }

    /// Whether the instruction traps on a zero divisor.
    pub fn is_division(self) -> bool {
        matches!(self, Opcode::DIVU | Opcode::REMU)
    }
}
