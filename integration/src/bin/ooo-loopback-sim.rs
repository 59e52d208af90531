//! A stand-in simulator speaking the harness's file protocol. It executes the
//! program on the reference interpreter and reports an idealized drained
//! machine after every instruction.
//!
//! The fault flags make it misbehave in the ways a real simulator can, so the
//! harness can be tested end to end.

use std::{fs, path::PathBuf, process::ExitCode, thread, time::Duration};

use clap::Parser;
use eyre::{eyre, Result, WrapErr};
use ooo_isa::{DEFAULT_LOGICAL_REGISTERS, DEFAULT_PHYSICAL_REGISTERS};
use ooo_reference::Interpreter;

use ooo_difftest::{config::MachineConfig, orchestrator::read_program, snapshot::Snapshot};

#[derive(Parser)]
#[command(name = "ooo-loopback-sim")]
struct Args {
    input: PathBuf,
    output: PathBuf,
    #[arg(long, default_value_t = DEFAULT_LOGICAL_REGISTERS)]
    logical_registers: usize,
    #[arg(long, default_value_t = DEFAULT_PHYSICAL_REGISTERS)]
    physical_registers: usize,
    /// Add one to this logical register's value in the final snapshot.
    #[arg(long)]
    corrupt_register: Option<usize>,
    /// Sleep before doing anything.
    #[arg(long)]
    hang_ms: Option<u64>,
    /// Exit with this code after writing the output.
    #[arg(long, default_value_t = 0)]
    exit_code: u8,
    #[arg(long)]
    no_output: bool,
    /// Write truncated JSON.
    #[arg(long)]
    garbage: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    if let Some(ms) = args.hang_ms {
        thread::sleep(Duration::from_millis(ms));
    }

    let machine = MachineConfig {
        logical_registers: args.logical_registers,
        physical_registers: args.physical_registers,
    };
    let program = read_program(&args.input)?;
    let mut interpreter = Interpreter::new(machine.logical_registers);
    let mut snapshots = vec![Snapshot::drained(&interpreter.arch_state(), &machine)];
    for line in &program {
        interpreter.step(line)?;
        snapshots.push(Snapshot::drained(&interpreter.arch_state(), &machine));
    }

    if let (Some(register), Some(last)) = (args.corrupt_register, snapshots.last_mut()) {
        let value = last
            .register_map_table
            .get(register)
            .and_then(|&physical| last.physical_register_file.get_mut(physical as usize))
            .ok_or_else(|| eyre!("cannot corrupt x{register}: no such register"))?;
        *value = value.wrapping_add(1);
    }

    if args.garbage {
        fs::write(&args.output, r#"[{"PC": "#).wrap_err("could not write output")?;
    } else if !args.no_output {
        let json = serde_json::to_string_pretty(&snapshots)?;
        fs::write(&args.output, json).wrap_err("could not write output")?;
    }

    if args.exit_code != 0 {
        eprintln!("loopback simulator exiting with code {}", args.exit_code);
    }
    Ok(ExitCode::from(args.exit_code))
}
