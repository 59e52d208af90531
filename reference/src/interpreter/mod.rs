use ooo_isa::{decode, DecodeError, Instruction, LogicalRegister, OperandB, FAULT_VECTOR};

use crate::{
    alu::{run_alu, AluOutcome, ArithmeticMode, OverflowEvent},
    state::{ArchState, RegisterFile},
    trace::{TraceSink, TraceStep},
};

#[cfg(test)]
mod tests;

/// Harness-level failures. Division by zero is not one of them: it is an
/// architectural exception and is modeled in the interpreter state.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InterpreterError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("register {register} is out of range, the register file has {num_registers} entries")]
    UnknownRegister {
        register: LogicalRegister,
        num_registers: usize,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    /// Terminal: every further instruction is ignored.
    Faulted,
}

#[derive(Clone, Debug)]
pub struct Interpreter {
    registers: RegisterFile,
    pc: u64,
    exception_pc: Option<u64>,
    mode: ArithmeticMode,
    overflows: Vec<OverflowEvent>,
}

impl Interpreter {
    pub fn new(num_registers: usize) -> Self {
        Self {
            registers: RegisterFile::new(num_registers),
            pc: 0,
            exception_pc: None,
            mode: ArithmeticMode::default(),
            overflows: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: ArithmeticMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn status(&self) -> Status {
        if self.exception_pc.is_some() {
            Status::Faulted
        } else {
            Status::Running
        }
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn exception(&self) -> bool {
        self.exception_pc.is_some()
    }

    pub fn exception_pc(&self) -> Option<u64> {
        self.exception_pc
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Wrapping operations seen so far; only collected in strict mode.
    pub fn overflows(&self) -> &[OverflowEvent] {
        &self.overflows
    }

    pub fn arch_state(&self) -> ArchState {
        ArchState {
            registers: self.registers.clone(),
            pc: self.pc,
            exception_pc: self.exception_pc,
        }
    }

    /// Decodes and executes one instruction line.
    pub fn step(&mut self, line: &str) -> Result<(), InterpreterError> {
        if self.status() == Status::Faulted {
            return Ok(());
        }
        let instruction = decode(line)?;
        self.execute(&instruction)
    }

    /// Executes an already decoded instruction.
    pub fn execute(&mut self, instruction: &Instruction) -> Result<(), InterpreterError> {
        if self.status() == Status::Faulted {
            return Ok(());
        }
        for register in instruction.registers() {
            self.check_register(register)?;
        }

        let a = self.read(instruction.op_a);
        let b = match instruction.op_b {
            OperandB::Register(reg) => self.read(reg),
            OperandB::Immediate(imm) => imm as u64,
        };

        let pc = self.pc;
        self.pc += 1;

        match run_alu(instruction.opcode, a, b) {
            AluOutcome::Value { value, wrapped } => {
                if wrapped && self.mode == ArithmeticMode::Strict {
                    tracing::warn!(pc, %instruction, "result wrapped around 2^64");
                    self.overflows.push(OverflowEvent {
                        pc,
                        opcode: instruction.opcode,
                    });
                }
                self.registers.set(instruction.dest, value);
            }
            AluOutcome::DivideByZero => {
                tracing::debug!(pc, %instruction, "division by zero, jumping to fault vector");
                self.exception_pc = Some(pc);
                self.pc = FAULT_VECTOR;
            }
        }
        Ok(())
    }

    /// Steps through every line of `program`.
    pub fn run<S: AsRef<str>>(&mut self, program: &[S]) -> Result<(), InterpreterError> {
        for line in program {
            self.step(line.as_ref())?;
        }
        Ok(())
    }

    /// Like [`Interpreter::run`], recording a snapshot before the first
    /// instruction and after every step into `sink`.
    pub fn run_traced<S: AsRef<str>>(
        &mut self,
        program: &[S],
        sink: &mut impl TraceSink,
    ) -> Result<(), InterpreterError> {
        sink.record(self.snapshot(0, None));
        for (i, line) in program.iter().enumerate() {
            let line = line.as_ref();
            self.step(line)?;
            sink.record(self.snapshot(i + 1, Some(line)));
        }
        Ok(())
    }

    fn snapshot(&self, step: usize, instruction: Option<&str>) -> TraceStep {
        TraceStep {
            step,
            instruction: instruction.map(str::to_string),
            pc: self.pc,
            exception: self.exception(),
            registers: self.registers.values().to_vec(),
        }
    }

    fn check_register(&self, register: LogicalRegister) -> Result<(), InterpreterError> {
        if register.index() < self.registers.len() {
            Ok(())
        } else {
            Err(InterpreterError::UnknownRegister {
                register,
                num_registers: self.registers.len(),
            })
        }
    }

    fn read(&self, register: LogicalRegister) -> u64 {
        self.registers[register.index()]
    }
}
