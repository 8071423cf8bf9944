//! End-to-end fetch/decode conformance through the public step API.

#![allow(clippy::cast_possible_truncation, clippy::missing_const_for_fn)]

use std::cell::RefCell;
use std::rc::Rc;

use cat32_core::{
    Bus, Cpu, Fault, FaultCode, GeneralRegister, InstructionTable, Memory, Operand, SizeClass,
    TraceSink, FLAG_DEBUG,
};
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const RAM_BASE: u32 = 0x0010_0000;
const RAM_SIZE: usize = 0x1000;

fn machine(program: &[u8]) -> (Cpu, Bus) {
    let mut memory = Memory::new(RAM_SIZE);
    memory.load_image(0, program).expect("program fits in RAM");

    let mut bus = Bus::new();
    bus.map(RAM_BASE, RAM_SIZE as u32, Box::new(memory))
        .expect("RAM window is free");

    let mut cpu = Cpu::new();
    cpu.registers_mut().set_pc(RAM_BASE);
    (cpu, bus)
}

const fn head(size: u8, addr1: u8, addr2: u8) -> u8 {
    (size << 6) | (addr1 << 3) | addr2
}

const fn operand_tag(operand: Operand) -> u32 {
    match operand {
        Operand::Constant(_) => 0,
        Operand::Address(_) => 1,
        Operand::Register(_) => 2,
        Operand::None => 3,
    }
}

const fn operand_value(operand: Operand) -> u32 {
    match operand {
        Operand::Constant(value) | Operand::Address(value) => value,
        Operand::Register(name) => name as u32,
        Operand::None => 0,
    }
}

/// Stashes both resolved operands into registers and halts, so tests can
/// assert decode products through the architectural surface.
fn stash_operands(cpu: &mut Cpu, _bus: &mut Bus) -> Result<(), Fault> {
    let [op1, op2] = cpu.execution().operands();
    let regs = cpu.registers_mut();
    regs.set_gpr(GeneralRegister::Re, operand_tag(op1));
    regs.set_gpr(GeneralRegister::Rf, operand_tag(op2));
    regs.set_gpr(GeneralRegister::Rg, operand_value(op1));
    regs.set_gpr(GeneralRegister::Rh, operand_value(op2));
    cpu.halt();
    Ok(())
}

fn stash_table(size: SizeClass, opcode: u32) -> InstructionTable {
    let mut table = InstructionTable::new();
    table.register(size, opcode, stash_operands);
    table
}

#[test]
fn immediate_and_absolute_operands_decode_through_the_pipeline() {
    // mov-like byte instruction: imm 123, abs 0x100.
    let mut program = vec![head(0, 0, 1), 0x2A];
    program.extend_from_slice(&123u32.to_le_bytes());
    program.extend_from_slice(&0x100u32.to_le_bytes());

    let (mut cpu, mut bus) = machine(&program);
    cpu.set_instruction_set(Box::new(stash_table(SizeClass::Byte, 0x2A)));
    cpu.step(&mut bus);

    assert!(cpu.is_halted());
    assert_eq!(cpu.latched_fault(), None);
    assert_eq!(cpu.registers().gpr(GeneralRegister::Re), 0); // Constant
    assert_eq!(cpu.registers().gpr(GeneralRegister::Rg), 123);
    assert_eq!(cpu.registers().gpr(GeneralRegister::Rf), 1); // Address
    assert_eq!(cpu.registers().gpr(GeneralRegister::Rh), 0x100);
}

#[test]
fn pc_relative_operand_is_anchored_past_the_whole_instruction() {
    // Instruction length: 1 head + 1 opcode + 4 offset = 6.
    let mut program = vec![head(0, 2, 7), 0x2A];
    program.extend_from_slice(&(-4i32).to_le_bytes());

    let (mut cpu, mut bus) = machine(&program);
    cpu.set_instruction_set(Box::new(stash_table(SizeClass::Byte, 0x2A)));
    cpu.step(&mut bus);

    assert_eq!(cpu.latched_fault(), None);
    // post-fetch pc = RAM_BASE + 6, minus 4.
    assert_eq!(cpu.registers().gpr(GeneralRegister::Rg), RAM_BASE + 2);
}

#[rstest]
#[case::register_direct(4, vec![0x03], 2, 0x03)]
#[case::register_indirect(4, vec![0x00], 1, 0x42)]
fn register_addressed_operands_resolve_against_the_register_file(
    #[case] _len_hint: u8,
    #[case] operand_bytes: Vec<u8>,
    #[case] expected_tag: u32,
    #[case] expected_value: u32,
) {
    // Direct mode keeps the raw name; indirect reads the register eagerly.
    let mode = if expected_tag == 2 { 3 } else { 4 };
    let mut program = vec![head(0, mode, 7), 0x2A];
    program.extend_from_slice(&operand_bytes);

    let (mut cpu, mut bus) = machine(&program);
    cpu.registers_mut().set_gpr(GeneralRegister::Ra, 0x42);
    cpu.set_instruction_set(Box::new(stash_table(SizeClass::Byte, 0x2A)));
    cpu.step(&mut bus);

    assert_eq!(cpu.latched_fault(), None);
    assert_eq!(cpu.registers().gpr(GeneralRegister::Re), expected_tag);
    assert_eq!(cpu.registers().gpr(GeneralRegister::Rg), expected_value);
}

#[test]
fn indexed_operand_combines_base_index_and_factor() {
    // [ra + rb * 3] with ra=0x10, rb=0x02.
    let mut program = vec![head(0, 6, 7), 0x2A, 0x00, 0x01];
    program.extend_from_slice(&3u16.to_le_bytes());

    let (mut cpu, mut bus) = machine(&program);
    cpu.registers_mut().set_gpr(GeneralRegister::Ra, 0x10);
    cpu.registers_mut().set_gpr(GeneralRegister::Rb, 0x02);
    cpu.set_instruction_set(Box::new(stash_table(SizeClass::Byte, 0x2A)));
    cpu.step(&mut bus);

    assert_eq!(cpu.latched_fault(), None);
    assert_eq!(cpu.registers().gpr(GeneralRegister::Rg), 0x16);
}

#[test]
fn unknown_register_in_an_indirect_operand_is_fatal() {
    let program = [head(0, 4, 7), 0x2A, 0x0B];

    let (mut cpu, mut bus) = machine(&program);
    cpu.set_instruction_set(Box::new(stash_table(SizeClass::Byte, 0x2A)));
    cpu.step(&mut bus);

    assert!(cpu.is_halted());
    let fault = cpu.latched_fault().expect("register 11 is unmapped");
    assert_eq!(fault.code, FaultCode::UnknownRegister);
    assert_eq!(fault.detail, 0x0B);
}

#[test]
fn dispatch_key_ignores_bytes_beyond_the_declared_opcode_width() {
    // Byte-sized opcode 0x2A followed by operand byte 0xFF (register-direct
    // name); a four-byte dispatch read would key on 0xFF2A.... instead.
    let program = [head(0, 3, 7), 0x2A, 0xFF];

    let (mut cpu, mut bus) = machine(&program);
    cpu.set_instruction_set(Box::new(stash_table(SizeClass::Byte, 0x2A)));
    cpu.step(&mut bus);

    assert_eq!(cpu.latched_fault(), None);
    assert_eq!(cpu.execution().opcode(), 0x2A);
    assert_eq!(cpu.registers().gpr(GeneralRegister::Rg), 0xFF);
}

#[test]
fn word_sized_opcodes_key_on_exactly_two_bytes() {
    let program = [head(1, 7, 7), 0x34, 0x12];

    let (mut cpu, mut bus) = machine(&program);
    cpu.set_instruction_set(Box::new(stash_table(SizeClass::Word, 0x1234)));
    cpu.step(&mut bus);

    assert_eq!(cpu.latched_fault(), None);
    assert_eq!(cpu.execution().opcode(), 0x1234);
    assert_eq!(
        cpu.registers().pc(),
        RAM_BASE + 3,
        "fetch advances by 1 head + 2 opcode bytes"
    );
}

#[test]
fn debug_flag_routes_instruction_traces_to_the_sink() {
    #[derive(Clone, Default)]
    struct SharedTrace(Rc<RefCell<Vec<(u32, Vec<u8>)>>>);

    impl TraceSink for SharedTrace {
        fn instruction(&mut self, pc: u32, bytes: &[u8]) {
            self.0.borrow_mut().push((pc, bytes.to_vec()));
        }
    }

    let program = [head(1, 7, 7), 0x34, 0x12];
    let (mut cpu, mut bus) = machine(&program);
    cpu.set_instruction_set(Box::new(stash_table(SizeClass::Word, 0x1234)));

    let trace = SharedTrace::default();
    cpu.set_trace_sink(Box::new(trace.clone()));
    cpu.set_flag(FLAG_DEBUG, true);
    cpu.step(&mut bus);

    let seen = trace.0.borrow();
    assert_eq!(seen.len(), 1);
    let (pc, bytes) = &seen[0];
    assert_eq!(*pc, RAM_BASE + 3, "trace reports the post-fetch pc");
    assert_eq!(bytes.as_slice(), program.as_slice());
}

proptest! {
    #[test]
    fn static_operands_round_trip_types_and_raw_values(
        constant in any::<u32>(),
        address in any::<u32>(),
        opcode in any::<u8>(),
    ) {
        let mut program = vec![head(0, 0, 1), opcode];
        program.extend_from_slice(&constant.to_le_bytes());
        program.extend_from_slice(&address.to_le_bytes());

        let (mut cpu, mut bus) = machine(&program);
        cpu.set_instruction_set(Box::new(stash_table(
            SizeClass::Byte,
            u32::from(opcode),
        )));
        cpu.step(&mut bus);

        prop_assert_eq!(cpu.latched_fault(), None);
        prop_assert_eq!(cpu.registers().gpr(GeneralRegister::Re), 0);
        prop_assert_eq!(cpu.registers().gpr(GeneralRegister::Rg), constant);
        prop_assert_eq!(cpu.registers().gpr(GeneralRegister::Rf), 1);
        prop_assert_eq!(cpu.registers().gpr(GeneralRegister::Rh), address);
    }
}
