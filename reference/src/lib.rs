//! Reference model of the simulator's instruction set.
//!
//! The [`Interpreter`] executes one instruction at a time on a plain
//! architectural register file. Its final [`ArchState`] is what the
//! out-of-order simulator must agree with once it has drained.

mod alu;
mod interpreter;
mod state;
mod trace;

pub use alu::{run_alu, AluOutcome, ArithmeticMode, OverflowEvent};
pub use interpreter::{Interpreter, InterpreterError, Status};
pub use state::{ArchState, RegisterFile};
pub use trace::{ExecutionTrace, TraceSink, TraceStep};
