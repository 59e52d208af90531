use strum::IntoEnumIterator;
use test_case::test_case;

use super::*;

fn reg(index: u32) -> LogicalRegister {
    LogicalRegister(index)
}

#[test]
fn decodes_register_form() {
    let ins = decode("add x1, x2, x3").unwrap();
    assert_eq!(
        ins,
        Instruction::new(Opcode::ADD, reg(1), reg(2), OperandB::Register(reg(3)))
    );
}

#[test_case("addi x4, x1, -5", -5)]
#[test_case("addi x4, x1, 9223372036854775807", i64::MAX)]
#[test_case("addi x4, x1, -9223372036854775808", i64::MIN)]
fn decodes_immediate_form(line: &str, imm: i64) {
    let ins = decode(line).unwrap();
    assert_eq!(ins.opcode, Opcode::ADDI);
    assert_eq!(ins.op_b, OperandB::Immediate(imm));
}

#[test]
fn commas_are_optional_punctuation() {
    assert_eq!(decode("mulu x1 x2 x3"), decode("mulu x1, x2, x3"));
    assert_eq!(decode("  divu   x5,  x6 , x7 "), decode("divu x5, x6, x7"));
}

#[test]
fn commas_do_not_separate_tokens() {
    // Commas are stripped, not replaced, so `x1,x2,x3` collapses into one token.
    assert!(matches!(
        decode("mulu x1,x2,x3"),
        Err(DecodeError::MalformedInstruction { tokens: 2, .. })
    ));
}

#[test_case("add x1, x2" ; "too few tokens")]
#[test_case("add x1, x2, x3, x4" ; "too many tokens")]
#[test_case("" ; "empty line")]
fn rejects_wrong_token_count(line: &str) {
    assert!(matches!(
        decode(line),
        Err(DecodeError::MalformedInstruction { .. })
    ));
}

#[test]
fn rejects_unknown_opcode() {
    assert_eq!(
        decode("xor x1, x2, x3"),
        Err(DecodeError::UnknownOpcode("xor".to_string()))
    );
    // Opcodes are lowercase on the wire.
    assert!(matches!(
        decode("ADD x1, x2, x3"),
        Err(DecodeError::UnknownOpcode(_))
    ));
}

#[test_case("addi x1, x2, 0x10" ; "hex literal")]
#[test_case("addi x1, x2, 9223372036854775808" ; "above i64 max")]
#[test_case("addi x1, x2, x3" ; "register in immediate slot")]
fn rejects_invalid_immediate(line: &str) {
    assert!(matches!(
        decode(line),
        Err(DecodeError::InvalidImmediate { .. })
    ));
}

#[test_case("add r1, x2, x3" ; "wrong prefix")]
#[test_case("add x1, x, x3" ; "missing index")]
#[test_case("add x1, x2, x-3" ; "negative index")]
#[test_case("sub x1, x2, 5" ; "immediate in register slot")]
#[test_case("add x01, x2, x3" ; "leading zero")]
#[test_case("add x1, x007, x3" ; "several leading zeros")]
fn rejects_bad_register_names(line: &str) {
    assert!(matches!(
        decode(line),
        Err(DecodeError::UnknownRegister(_))
    ));
}

#[test]
fn single_zero_is_register_zero() {
    assert_eq!(decode("add x0, x10, x20").unwrap().dest, reg(0));
}

#[test]
fn register_index_is_not_bounded_at_decode_time() {
    let ins = decode("add x99, x2, x3").unwrap();
    assert_eq!(ins.dest, reg(99));
}

#[test]
fn display_is_canonical_text() {
    for opcode in Opcode::iter() {
        let op_b = if opcode.has_immediate() {
            OperandB::Immediate(-42)
        } else {
            OperandB::Register(reg(31))
        };
        let ins = Instruction::new(opcode, reg(0), reg(17), op_b);
        let text = ins.to_string();
        assert_eq!(decode(&text), Ok(ins), "{text}");
    }
    assert_eq!(
        decode("addi x4, x1, -5").unwrap().to_string(),
        "addi x4, x1, -5"
    );
}

#[test]
fn registers_lists_named_operands() {
    let ins = decode("remu x1, x2, x3").unwrap();
    assert_eq!(ins.registers().collect::<Vec<_>>(), [reg(1), reg(2), reg(3)]);
    let ins = decode("addi x1, x2, 3").unwrap();
    assert_eq!(ins.registers().collect::<Vec<_>>(), [reg(1), reg(2)]);
}
