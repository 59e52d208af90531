use ooo_isa::{Instruction, LogicalRegister, OperandB};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::GeneratorConfig;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("the opcode set is empty")]
    NoOpcodes,
    #[error("minimum length {min} exceeds maximum length {max}")]
    InvalidLengthRange { min: usize, max: usize },
    #[error("programs need at least one logical register")]
    NoRegisters,
}

/// Produces random, always decodable programs.
///
/// Nothing beyond syntax is enforced: operands alias freely and divisors may
/// be zero, which is how the exception path gets exercised.
pub struct ProgramGenerator<R: Rng> {
    config: GeneratorConfig,
    rng: R,
}

impl<R: Rng> ProgramGenerator<R> {
    pub fn new(config: GeneratorConfig, rng: R) -> Result<Self, GeneratorError> {
        if config.opcodes.is_empty() {
            return Err(GeneratorError::NoOpcodes);
        }
        if config.min_instructions > config.max_instructions {
            return Err(GeneratorError::InvalidLengthRange {
                min: config.min_instructions,
                max: config.max_instructions,
            });
        }
        if config.logical_registers == 0 {
            return Err(GeneratorError::NoRegisters);
        }
        Ok(Self { config, rng })
    }

    pub fn generate_instructions(&mut self) -> Vec<Instruction> {
        let len = self
            .rng
            .gen_range(self.config.min_instructions..=self.config.max_instructions);
        (0..len).map(|_| self.instruction()).collect()
    }

    /// A program in its textual wire form.
    pub fn generate(&mut self) -> Vec<String> {
        self.generate_instructions()
            .iter()
            .map(Instruction::to_string)
            .collect()
    }

    fn instruction(&mut self) -> Instruction {
        let opcode = self.config.opcodes[self.rng.gen_range(0..self.config.opcodes.len())];
        let dest = self.register();
        let op_a = self.register();
        let op_b = if opcode.has_immediate() {
            OperandB::Immediate(self.rng.gen::<i64>())
        } else {
            OperandB::Register(self.register())
        };
        Instruction::new(opcode, dest, op_a, op_b)
    }

    fn register(&mut self) -> LogicalRegister {
        LogicalRegister(self.rng.gen_range(0..self.config.logical_registers) as u32)
    }
}

/// Generator RNG for one case, derived from the run seed so that a case can
/// be replayed on its own and does not depend on worker scheduling.
pub fn case_rng(seed: u64, case: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (case as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
