//! Drives cases end to end: generate, interpret, run the simulator, compare.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use ooo_reference::{ArchState, ArithmeticMode, ExecutionTrace, Interpreter, InterpreterError};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use crate::{
    adapter::{
        read_snapshots, write_program, AdapterError, CaseFiles, SimulatorAdapter, SimulatorCommand,
        SnapshotLog,
    },
    checker::{check, CheckReport},
    compare::{diff_snapshots, SnapshotDiff},
    config::{HarnessConfig, MachineConfig},
    generator::{case_rng, GeneratorError, ProgramGenerator},
};

/// Subdirectory of the tests directory receiving the simulator under test's
/// output.
pub const OUTPUT_DIR: &str = "out";
/// Subdirectory receiving the reference simulator's output in compare mode.
pub const REFERENCE_OUTPUT_DIR: &str = "ref";

/// Failures that abort a whole run. A failing simulator only fails its case.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("{}: {source}", .program.display())]
    Interpreter {
        program: PathBuf,
        #[source]
        source: InterpreterError,
    },
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error("could not read program {}: {source}", .path.display())]
    ReadProgram {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not a JSON array of instructions: {source}", .path.display())]
    ProgramFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Clone, Debug, PartialEq, Eq, derive_more::Display)]
pub enum CaseVerdict {
    #[display("passed")]
    Passed,
    #[display("{_0}")]
    Mismatch(CheckReport),
    #[display("simulator failed: {_0}")]
    AdapterFailure(String),
    #[display("simulator timed out after {_0:?}")]
    Timeout(Duration),
    #[display("{} difference(s) from the reference simulator", _0.len())]
    Diverged(Vec<SnapshotDiff>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseOutcome {
    pub case: usize,
    pub files: CaseFiles,
    pub verdict: CaseVerdict,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.verdict == CaseVerdict::Passed
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    /// Every case, ordered by case index.
    pub outcomes: Vec<CaseOutcome>,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: Vec<CaseOutcome>) -> Self {
        let passed = outcomes.iter().filter(|o| o.passed()).count();
        Self {
            passed,
            failed: outcomes.len() - passed,
            outcomes,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }
}

pub struct Harness {
    config: HarnessConfig,
    adapter: SimulatorAdapter,
}

impl Harness {
    pub fn new(config: HarnessConfig, command: SimulatorCommand) -> Self {
        let adapter = SimulatorAdapter::new(command, config.timeout());
        Self { config, adapter }
    }

    /// Runs `num_tests` random programs through the reference interpreter and
    /// the simulator.
    pub fn fuzz(&self) -> Result<RunSummary, OrchestratorError> {
        let seed = self.resolve_seed();
        tracing::info!(
            seed,
            num_tests = self.config.num_tests,
            jobs = self.config.jobs,
            simulator = %self.adapter.command(),
            "fuzzing"
        );
        let outcomes = self.pool()?.install(|| {
            (0..self.config.num_tests)
                .into_par_iter()
                .map(|case| self.fuzz_case(seed, case))
                .collect::<Result<Vec<_>, _>>()
        })?;
        Ok(RunSummary::from_outcomes(outcomes))
    }

    /// Checks one existing program. With `skip_run` the simulator is not
    /// invoked and `output` must already hold its snapshots.
    pub fn check(
        &self,
        input: &Path,
        output: &Path,
        skip_run: bool,
    ) -> Result<CaseOutcome, OrchestratorError> {
        let program = read_program(input)?;
        let reference = self.interpret(&program, input)?;
        let files = CaseFiles::new(input.to_path_buf(), output.to_path_buf());
        let result = if skip_run {
            read_snapshots(output)
        } else {
            self.adapter.execute(&files)
        };
        let verdict = self.verdict(&reference, result);
        Ok(self.report(0, files, verdict))
    }

    /// Runs the same random programs through this harness's simulator and
    /// `reference`, comparing their snapshot logs cycle by cycle.
    pub fn compare(&self, reference: &SimulatorAdapter) -> Result<RunSummary, OrchestratorError> {
        let seed = self.resolve_seed();
        tracing::info!(
            seed,
            num_tests = self.config.num_tests,
            candidate = %self.adapter.command(),
            reference = %reference.command(),
            "comparing simulators"
        );
        let outcomes = self.pool()?.install(|| {
            (0..self.config.num_tests)
                .into_par_iter()
                .map(|case| self.compare_case(reference, seed, case))
                .collect::<Result<Vec<_>, _>>()
        })?;
        Ok(RunSummary::from_outcomes(outcomes))
    }

    fn fuzz_case(&self, seed: u64, case: usize) -> Result<CaseOutcome, OrchestratorError> {
        let (program, files) = self.prepare_case(seed, case)?;
        let reference = self.interpret(&program, &files.input)?;
        let verdict = self.verdict(&reference, self.adapter.execute(&files));
        Ok(self.report(case, files, verdict))
    }

    fn compare_case(
        &self,
        reference: &SimulatorAdapter,
        seed: u64,
        case: usize,
    ) -> Result<CaseOutcome, OrchestratorError> {
        let (_, files) = self.prepare_case(seed, case)?;
        let reference_files = CaseFiles::for_case(&self.config.tests_dir, REFERENCE_OUTPUT_DIR, case);

        let verdict = match (
            self.adapter.execute(&files),
            reference.execute(&reference_files),
        ) {
            (Ok(candidate), Ok(expected)) => {
                let diffs = diff_snapshots(candidate.snapshots(), expected.snapshots());
                if diffs.is_empty() {
                    CaseVerdict::Passed
                } else {
                    CaseVerdict::Diverged(diffs)
                }
            }
            (Err(e), _) => adapter_verdict(e),
            (_, Err(e)) => CaseVerdict::AdapterFailure(format!("reference simulator: {e}")),
        };
        Ok(self.report(case, files, verdict))
    }

    /// Generates the program of `case` and writes it to its input file.
    fn prepare_case(
        &self,
        seed: u64,
        case: usize,
    ) -> Result<(Vec<String>, CaseFiles), OrchestratorError> {
        let program =
            ProgramGenerator::new(self.config.generator.clone(), case_rng(seed, case))?.generate();
        let files = CaseFiles::for_case(&self.config.tests_dir, OUTPUT_DIR, case);
        write_program(&program, &files.input)?;
        Ok((program, files))
    }

    fn interpret(&self, program: &[String], path: &Path) -> Result<ArchState, OrchestratorError> {
        interpret(program, &self.config.machine, self.config.arithmetic).map_err(|source| {
            OrchestratorError::Interpreter {
                program: path.to_path_buf(),
                source,
            }
        })
    }

    fn verdict(
        &self,
        reference: &ArchState,
        result: Result<SnapshotLog, AdapterError>,
    ) -> CaseVerdict {
        match result {
            Ok(log) => {
                let report = check(reference, log.final_snapshot(), &self.config.machine);
                if report.passed() {
                    CaseVerdict::Passed
                } else {
                    CaseVerdict::Mismatch(report)
                }
            }
            Err(e) => adapter_verdict(e),
        }
    }

    fn report(&self, case: usize, files: CaseFiles, verdict: CaseVerdict) -> CaseOutcome {
        if verdict == CaseVerdict::Passed {
            tracing::info!(case, "passed");
        } else {
            tracing::warn!(case, input = %files.input.display(), "{verdict}");
        }
        CaseOutcome {
            case,
            files,
            verdict,
        }
    }

    fn resolve_seed(&self) -> u64 {
        self.config.seed.unwrap_or_else(rand::random)
    }

    fn pool(&self) -> Result<ThreadPool, OrchestratorError> {
        Ok(ThreadPoolBuilder::new()
            .num_threads(self.config.jobs.max(1))
            .build()?)
    }
}

fn adapter_verdict(error: AdapterError) -> CaseVerdict {
    match error {
        AdapterError::Timeout { timeout, .. } => CaseVerdict::Timeout(timeout),
        other => CaseVerdict::AdapterFailure(other.to_string()),
    }
}

/// Final architectural state of `program` on a fresh interpreter.
pub fn interpret<S: AsRef<str>>(
    program: &[S],
    machine: &MachineConfig,
    mode: ArithmeticMode,
) -> Result<ArchState, InterpreterError> {
    let mut interpreter = Interpreter::new(machine.logical_registers).with_mode(mode);
    interpreter.run(program)?;
    Ok(interpreter.arch_state())
}

pub fn trace_program<S: AsRef<str>>(
    program: &[S],
    machine: &MachineConfig,
    mode: ArithmeticMode,
) -> Result<ExecutionTrace, InterpreterError> {
    let mut trace = ExecutionTrace::default();
    Interpreter::new(machine.logical_registers)
        .with_mode(mode)
        .run_traced(program, &mut trace)?;
    Ok(trace)
}

pub fn read_program(path: &Path) -> Result<Vec<String>, OrchestratorError> {
    let content = fs::read_to_string(path).map_err(|source| OrchestratorError::ReadProgram {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| OrchestratorError::ProgramFormat {
        path: path.to_path_buf(),
        source,
    })
}
