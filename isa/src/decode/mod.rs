use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{LogicalRegister, Opcode};

#[cfg(test)]
mod tests;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed instruction `{line}`: expected 4 tokens, found {tokens}")]
    MalformedInstruction { line: String, tokens: usize },
    #[error("invalid immediate `{token}`: {source}")]
    InvalidImmediate {
        token: String,
        #[source]
        source: ParseIntError,
    },
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),
    #[error("unknown register `{0}`")]
    UnknownRegister(String),
}

/// Second source operand: a register for every opcode but `addi`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandB {
    Register(LogicalRegister),
    Immediate(i64),
}

impl fmt::Display for OperandB {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandB::Register(reg) => write!(f, "{reg}"),
            OperandB::Immediate(imm) => write!(f, "{imm}"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, derive_new::new)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dest: LogicalRegister,
    pub op_a: LogicalRegister,
    pub op_b: OperandB,
}

impl Instruction {
    /// Every register the instruction names, destination first.
    pub fn registers(&self) -> impl Iterator<Item = LogicalRegister> {
        let op_b = match self.op_b {
            OperandB::Register(reg) => Some(reg),
            OperandB::Immediate(_) => None,
        };
        [self.dest, self.op_a].into_iter().chain(op_b)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}, {}, {}",
            self.opcode, self.dest, self.op_a, self.op_b
        )
    }
}

impl FromStr for Instruction {
    type Err = DecodeError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        decode(line)
    }
}

/// Decodes one textual instruction such as `addi x4, x1, -5`.
///
/// Commas are punctuation only; the line must split into exactly
/// `opcode dest op_a op_b`.
pub fn decode(line: &str) -> Result<Instruction, DecodeError> {
    let cleaned = line.replace(',', "");
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    let [opcode, dest, op_a, op_b] = tokens[..] else {
        return Err(DecodeError::MalformedInstruction {
            line: line.to_string(),
            tokens: tokens.len(),
        });
    };

    let opcode: Opcode = opcode
        .parse()
        .map_err(|_| DecodeError::UnknownOpcode(opcode.to_string()))?;
    let dest = dest.parse()?;
    let op_a = op_a.parse()?;
    let op_b = if opcode.has_immediate() {
        let imm = op_b
            .parse::<i64>()
            .map_err(|source| DecodeError::InvalidImmediate {
                token: op_b.to_string(),
                source,
            })?;
        OperandB::Immediate(imm)
    } else {
        OperandB::Register(op_b.parse()?)
    };

    Ok(Instruction::new(opcode, dest, op_a, op_b))
}
