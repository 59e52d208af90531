//! Differential testing of an out-of-order processor simulator against the
//! reference interpreter.
//!
//! Random programs from the [`generator`] are executed by
//! [`ooo_reference::Interpreter`] and by the simulator under test, driven
//! through the file protocol in [`adapter`]. The [`checker`] then compares the
//! reference state with the simulator's last [`snapshot`], and [`compare`]
//! diffs two simulators against each other.

pub mod adapter;
pub mod checker;
pub mod compare;
pub mod config;
pub mod generator;
pub mod logging;
pub mod orchestrator;
pub mod snapshot;

pub use logging::setup_tracing_with_log_level;
pub use orchestrator::{CaseOutcome, CaseVerdict, Harness, OrchestratorError, RunSummary};
