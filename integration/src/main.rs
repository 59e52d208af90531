use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr};
use ooo_isa::{Opcode, DEFAULT_LOGICAL_REGISTERS, DEFAULT_PHYSICAL_REGISTERS};
use ooo_reference::ArithmeticMode;
use strum::IntoEnumIterator;
use tracing::Level;

use ooo_difftest::{
    adapter::{SimulatorAdapter, SimulatorCommand},
    config::{GeneratorConfig, HarnessConfig, MachineConfig},
    orchestrator::{read_program, trace_program},
    setup_tracing_with_log_level, CaseOutcome, Harness, RunSummary,
};

/// Differential tester for an out-of-order processor simulator.
#[derive(Parser)]
#[command(name = "ooo-difftest", version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Overridden by RUST_LOG.
    #[arg(long, global = true, default_value_t = Level::INFO)]
    log_level: Level,
    #[arg(long, global = true, default_value_t = DEFAULT_LOGICAL_REGISTERS)]
    logical_registers: usize,
    #[arg(long, global = true, default_value_t = DEFAULT_PHYSICAL_REGISTERS)]
    physical_registers: usize,
    /// Per-case limit on a simulator run.
    #[arg(long, global = true, default_value_t = 10_000)]
    timeout_ms: u64,
    /// `strict` logs every wrapping arithmetic result of the reference run.
    #[arg(long, global = true, default_value_t = ArithmeticMode::Lenient)]
    arithmetic: ArithmeticMode,
}

impl GlobalArgs {
    fn machine(&self) -> MachineConfig {
        MachineConfig {
            logical_registers: self.logical_registers,
            physical_registers: self.physical_registers,
        }
    }

    fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            machine: self.machine(),
            generator: GeneratorConfig {
                logical_registers: self.logical_registers,
                ..GeneratorConfig::default()
            },
            timeout_ms: self.timeout_ms,
            arithmetic: self.arithmetic,
            ..HarnessConfig::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check random programs against the simulator.
    Fuzz {
        #[arg(long, default_value = "build/simulate")]
        binary: PathBuf,
        #[command(flatten)]
        cases: CaseArgs,
    },
    /// Check one program file.
    Check {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = "build/simulate")]
        binary: PathBuf,
        /// Check the snapshots already in OUTPUT instead of running the binary.
        #[arg(long)]
        skip_run: bool,
    },
    /// Diff the snapshots of two simulators on random programs.
    Compare {
        #[arg(long, default_value = "build/simulate")]
        binary: PathBuf,
        /// Command line of the reference simulator, with `{input}` and
        /// `{output}` placeholders.
        #[arg(long)]
        reference_cmd: String,
        #[command(flatten)]
        cases: CaseArgs,
    },
    /// Print the reference interpreter's per-step trace of a program as JSON.
    Trace { input: PathBuf },
}

#[derive(Args)]
struct CaseArgs {
    #[arg(long, default_value = "tests")]
    tests_dir: PathBuf,
    #[arg(long, default_value_t = 10)]
    num_tests: usize,
    #[arg(long, default_value_t = 1)]
    min_instructions: usize,
    #[arg(long, default_value_t = 50)]
    max_instructions: usize,
    /// Comma separated opcode allowlist; all opcodes when omitted.
    #[arg(long, value_delimiter = ',')]
    opcodes: Vec<Opcode>,
    /// Random when omitted; the chosen seed is logged.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 1)]
    jobs: usize,
}

impl CaseArgs {
    fn apply(self, mut config: HarnessConfig) -> HarnessConfig {
        config.tests_dir = self.tests_dir;
        config.num_tests = self.num_tests;
        config.seed = self.seed;
        config.jobs = self.jobs;
        config.generator.min_instructions = self.min_instructions;
        config.generator.max_instructions = self.max_instructions;
        config.generator.opcodes = if self.opcodes.is_empty() {
            Opcode::iter().collect()
        } else {
            self.opcodes
        };
        config
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_tracing_with_log_level(cli.global.log_level);
    let config = cli.global.harness_config();

    let passed = match cli.command {
        Commands::Fuzz { binary, cases } => {
            let harness = Harness::new(cases.apply(config), SimulatorCommand::binary(&binary));
            let summary = harness.fuzz().wrap_err("fuzzing aborted")?;
            print_summary(&summary);
            summary.all_passed()
        }
        Commands::Check {
            input,
            output,
            binary,
            skip_run,
        } => {
            let harness = Harness::new(config, SimulatorCommand::binary(&binary));
            let outcome = harness
                .check(&input, &output, skip_run)
                .wrap_err_with(|| format!("could not check {}", input.display()))?;
            print_outcome(&outcome);
            outcome.passed()
        }
        Commands::Compare {
            binary,
            reference_cmd,
            cases,
        } => {
            let reference = SimulatorAdapter::new(
                SimulatorCommand::parse_template(&reference_cmd)?,
                config.timeout(),
            );
            let harness = Harness::new(cases.apply(config), SimulatorCommand::binary(&binary));
            let summary = harness.compare(&reference).wrap_err("comparison aborted")?;
            print_summary(&summary);
            summary.all_passed()
        }
        Commands::Trace { input } => {
            let program = read_program(&input)?;
            let trace = trace_program(&program, &config.machine, config.arithmetic)
                .wrap_err_with(|| format!("could not interpret {}", input.display()))?;
            println!("{}", serde_json::to_string_pretty(&trace)?);
            true
        }
    };

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_outcome(outcome: &CaseOutcome) {
    println!(
        "{}: {}",
        outcome.files.input.display(),
        outcome.verdict
    );
    if let ooo_difftest::CaseVerdict::Diverged(diffs) = &outcome.verdict {
        for diff in diffs {
            println!("  {diff}");
        }
    }
}

fn print_summary(summary: &RunSummary) {
    for outcome in summary.failures() {
        print_outcome(outcome);
    }
    println!("{} passed, {} failed", summary.passed, summary.failed);
}
