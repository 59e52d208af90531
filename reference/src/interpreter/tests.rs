use ooo_isa::{Opcode, DEFAULT_LOGICAL_REGISTERS};
use rand::{rngs::StdRng, Rng, SeedableRng};
use test_case::test_case;

use super::*;
use crate::ExecutionTrace;

fn create_seeded_rng() -> StdRng {
    StdRng::seed_from_u64(0x5EED)
}

fn run(program: &[&str]) -> Interpreter {
    let mut interpreter = Interpreter::new(DEFAULT_LOGICAL_REGISTERS);
    interpreter.run(program).unwrap();
    interpreter
}

/// Loads an arbitrary 64-bit value into `reg` using only `addi`.
fn load(reg: u32, value: u64) -> String {
    format!("addi x{reg}, x0, {}", value as i64)
}

#[test]
fn starts_zeroed_and_running() {
    let interpreter = Interpreter::new(DEFAULT_LOGICAL_REGISTERS);
    assert_eq!(interpreter.pc(), 0);
    assert_eq!(interpreter.status(), Status::Running);
    assert!(!interpreter.exception());
    assert!(interpreter.registers().values().iter().all(|&v| v == 0));
}

#[test]
fn add_wraps_without_fault() {
    let program = [load(1, u64::MAX), "add x2, x1, x1".to_string()];
    let mut interpreter = Interpreter::new(DEFAULT_LOGICAL_REGISTERS);
    interpreter.run(&program).unwrap();
    assert_eq!(interpreter.registers()[2], 0xFFFF_FFFF_FFFF_FFFE);
    assert_eq!(interpreter.pc(), 2);
    assert!(!interpreter.exception());
}

#[test]
fn sub_underflow_wraps() {
    let interpreter = run(&["addi x1, x0, 1", "sub x2, x0, x1"]);
    assert_eq!(interpreter.registers()[2], u64::MAX);
    assert!(!interpreter.exception());
}

#[test]
fn addi_negative_immediate() {
    let interpreter = run(&["addi x1, x0, 10", "addi x1, x1, -15"]);
    assert_eq!(interpreter.registers()[1], (-5i64) as u64);
}

#[test]
fn random_arithmetic_matches_modular_reference() {
    let mut rng = create_seeded_rng();
    for _ in 0..200 {
        let a: u64 = rng.gen();
        let b: u64 = rng.gen();
        for (opcode, expected) in [
            ("add", a.wrapping_add(b)),
            ("sub", a.wrapping_sub(b)),
            ("mulu", a.wrapping_mul(b)),
        ] {
            let program = [load(1, a), load(2, b), format!("{opcode} x3, x1, x2")];
            let mut interpreter = Interpreter::new(DEFAULT_LOGICAL_REGISTERS);
            interpreter.run(&program).unwrap();
            assert_eq!(interpreter.registers()[3], expected, "{opcode} {a} {b}");
        }
    }
}

#[test]
fn division_and_remainder() {
    let interpreter = run(&[
        "addi x1, x0, 100",
        "addi x2, x0, 7",
        "divu x3, x1, x2",
        "remu x4, x1, x2",
    ]);
    assert_eq!(interpreter.registers()[3], 14);
    assert_eq!(interpreter.registers()[4], 2);
    assert_eq!(interpreter.pc(), 4);
}

#[test_case("divu")]
#[test_case("remu")]
fn zero_divisor_raises_precise_exception(opcode: &str) {
    let faulting = format!("{opcode} x3, x1, x2");
    let interpreter = run(&[
        "addi x1, x0, 10",
        "addi x2, x0, 0",
        "addi x3, x0, 77",
        faulting.as_str(),
        "addi x4, x0, 1",
        "add x3, x1, x1",
    ]);
    assert_eq!(interpreter.status(), Status::Faulted);
    assert!(interpreter.exception());
    assert_eq!(interpreter.exception_pc(), Some(3));
    assert_eq!(interpreter.pc(), 65536);
    // The faulting instruction does not write back, later ones are ignored.
    assert_eq!(interpreter.registers()[3], 77);
    assert_eq!(interpreter.registers()[4], 0);
}

#[test]
fn documented_divide_by_zero_scenario() {
    let state = run(&["addi x1, x0, 10", "addi x2, x0, 0", "divu x3, x1, x2"]).arch_state();
    assert!(state.exception());
    assert_eq!(state.exception_pc, Some(2));
    assert_eq!(state.reported_exception_pc(), 2);
    assert_eq!(state.pc, 0x10000);
    assert_eq!(state.registers[3], 0);
    assert_eq!(state.registers[1], 10);
}

#[test]
fn fault_on_first_instruction_reports_pc_zero() {
    let interpreter = run(&["divu x1, x2, x3"]);
    assert_eq!(interpreter.exception_pc(), Some(0));
    assert_eq!(interpreter.pc(), 0x10000);
}

#[test]
fn x0_is_an_ordinary_register() {
    let interpreter = run(&["addi x0, x0, 5", "divu x1, x0, x0"]);
    assert_eq!(interpreter.registers()[0], 5);
    assert_eq!(interpreter.registers()[1], 1);
    assert!(!interpreter.exception());
}

#[test]
fn malformed_input_after_fault_is_ignored() {
    let mut interpreter = Interpreter::new(DEFAULT_LOGICAL_REGISTERS);
    interpreter
        .run(&["divu x1, x0, x0", "this is not an instruction"])
        .unwrap();
    assert!(interpreter.exception());
}

#[test]
fn decode_errors_are_fatal() {
    let mut interpreter = Interpreter::new(DEFAULT_LOGICAL_REGISTERS);
    let err = interpreter.step("nop x1, x2, x3").unwrap_err();
    assert_eq!(
        err,
        InterpreterError::Decode(DecodeError::UnknownOpcode("nop".to_string()))
    );
    assert_eq!(interpreter.pc(), 0);
}

#[test_case("add x32, x1, x2" ; "dest")]
#[test_case("add x1, x32, x2" ; "op_a")]
#[test_case("sub x1, x2, x40" ; "op_b")]
fn out_of_range_register_is_fatal(line: &str) {
    let mut interpreter = Interpreter::new(DEFAULT_LOGICAL_REGISTERS);
    assert!(matches!(
        interpreter.step(line),
        Err(InterpreterError::UnknownRegister {
            num_registers: 32,
            ..
        })
    ));
    assert_eq!(interpreter.pc(), 0);
}

#[test]
fn reruns_are_bit_identical() {
    let mut rng = create_seeded_rng();
    let program: Vec<String> = (0..300)
        .map(|_| {
            let ops = ["add", "sub", "mulu", "divu", "remu"];
            let op = ops[rng.gen_range(0..ops.len())];
            if rng.gen_bool(0.3) {
                format!("addi x{}, x{}, {}", rng.gen_range(0..32), rng.gen_range(0..32), rng.gen::<i64>())
            } else {
                format!(
                    "{op} x{}, x{}, x{}",
                    rng.gen_range(0..32),
                    rng.gen_range(0..32),
                    rng.gen_range(0..32)
                )
            }
        })
        .collect();

    let mut first = Interpreter::new(DEFAULT_LOGICAL_REGISTERS);
    first.run(&program).unwrap();
    let mut second = Interpreter::new(DEFAULT_LOGICAL_REGISTERS);
    second.run(&program).unwrap();
    assert_eq!(first.arch_state(), second.arch_state());
}

#[test]
fn strict_mode_records_wrapping_operations() {
    let program = [
        "addi x1, x0, -1",
        "add x2, x1, x1",
        "addi x3, x0, 4",
        "sub x4, x0, x3",
    ];
    let mut strict = Interpreter::new(DEFAULT_LOGICAL_REGISTERS).with_mode(ArithmeticMode::Strict);
    strict.run(&program).unwrap();
    let mut lenient = Interpreter::new(DEFAULT_LOGICAL_REGISTERS);
    lenient.run(&program).unwrap();

    // `addi x1, x0, -1` goes below zero as well.
    let wrapped: Vec<_> = strict.overflows().iter().map(|e| (e.pc, e.opcode)).collect();
    assert_eq!(
        wrapped,
        [(0, Opcode::ADDI), (1, Opcode::ADD), (3, Opcode::SUB)]
    );
    assert!(lenient.overflows().is_empty());
    assert_eq!(strict.arch_state(), lenient.arch_state());
}

#[test]
fn trace_has_initial_snapshot_and_one_per_step() {
    let program = ["addi x1, x0, 3", "divu x2, x1, x0", "addi x3, x0, 9"];
    let mut interpreter = Interpreter::new(DEFAULT_LOGICAL_REGISTERS);
    let mut trace = ExecutionTrace::default();
    interpreter.run_traced(&program, &mut trace).unwrap();

    assert_eq!(trace.len(), program.len() + 1);
    assert_eq!(trace.steps[0].instruction, None);
    assert_eq!(trace.steps[0].pc, 0);
    assert_eq!(trace.steps[1].registers[1], 3);
    assert!(trace.steps[2].exception);
    assert_eq!(trace.steps[3].instruction.as_deref(), Some("addi x3, x0, 9"));
    assert_eq!(trace.steps[3].registers[3], 0);
    assert_eq!(trace.last().map(|s| s.pc), Some(interpreter.pc()));
}
