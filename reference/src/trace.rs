use serde::{Deserialize, Serialize};

/// Register-file snapshot taken around one `step`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// 0 for the snapshot taken before the first instruction.
    pub step: usize,
    /// Instruction text that led to this snapshot, `None` for the initial one.
    pub instruction: Option<String>,
    pub pc: u64,
    pub exception: bool,
    pub registers: Vec<u64>,
}

/// Receives snapshots from [`crate::Interpreter::run_traced`].
///
/// Tracing is opt-in: nothing is recorded unless the caller supplies a sink.
pub trait TraceSink {
    fn record(&mut self, step: TraceStep);
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionTrace {
    pub steps: Vec<TraceStep>,
}

impl ExecutionTrace {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&TraceStep> {
        self.steps.last()
    }
}

impl TraceSink for ExecutionTrace {
    fn record(&mut self, step: TraceStep) {
        self.steps.push(step);
    }
}
