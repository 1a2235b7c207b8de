use crate::{
    bus::{Bus, BusError},
    cpu::{
        cpu::{Cpu, CpuError, CpuState, Opcode, STACK_TOP},
        flags::{FLAG_CARRY, FLAG_NEGATIVE, FLAG_ZERO},
    },
};

struct TestBus {
    mem: [u8; 65536],
}

impl TestBus {
    fn new() -> Self {
        Self { mem: [0; 65536] }
    }
}

impl Bus for TestBus {
    fn read(&self, addr: u16) -> Result<u8, BusError> {
        Ok(self.mem[addr as usize])
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), BusError> {
        self.mem[addr as usize] = data;
        Ok(())
    }
}

fn new_cpu(program: &[u8]) -> Cpu<TestBus> {
    let mut bus = TestBus::new();
    bus.mem[..program.len()].copy_from_slice(program);
    Cpu::new(bus)
}

const LDA: u8 = Opcode::Lda as u8;
const ADD: u8 = Opcode::Add as u8;
const CMP: u8 = Opcode::Cmp as u8;
const JMP: u8 = Opcode::Jmp as u8;

#[test]
fn lda_immediate_loads_value() {
    let mut cpu = new_cpu(&[LDA, 0x42]);
    cpu.step().unwrap();

    assert_eq!(cpu.regs[0], 0x42);
    assert_eq!(cpu.pc, 2);
}

#[test]
fn lda_memory_reads_zero_page_address() {
    let mut cpu = new_cpu(&[Opcode::Lda.with_mode(1), 0x10]);
    cpu.bus.mem[0x10] = 0x77;
    cpu.step().unwrap();

    assert_eq!(cpu.regs[0], 0x77);
}

#[test]
fn lda_register_copies_register() {
    let mut cpu = new_cpu(&[Opcode::Lda.with_mode(2), 0x03]);
    cpu.regs[3] = 0x5A;
    cpu.step().unwrap();

    assert_eq!(cpu.regs[0], 0x5A);
    assert_eq!(cpu.pc, 2);
}

#[test]
fn register_mode_rejects_index_past_r7() {
    let mut cpu = new_cpu(&[Opcode::Lda.with_mode(2), 0x08]);

    assert_eq!(
        cpu.step(),
        Err(CpuError::InvalidRegister { pc: 1, index: 8 })
    );
}

#[test]
fn register_pair_rejects_low_index_past_r7() {
    let mut cpu = new_cpu(&[Opcode::Lda.with_mode(5), 0x00, 0x09]);

    assert_eq!(
        cpu.step(),
        Err(CpuError::InvalidRegister { pc: 2, index: 9 })
    );
}

#[test]
fn pop_rejects_destination_past_r7() {
    let mut cpu = new_cpu(&[Opcode::Pop.with_mode(0), 0x08]);

    assert_eq!(
        cpu.step(),
        Err(CpuError::InvalidRegister { pc: 1, index: 8 })
    );
}

#[test]
fn lda_wide_immediate_truncates_to_low_byte() {
    let mut cpu = new_cpu(&[Opcode::Lda.with_mode(3), 0x12, 0x34]);
    cpu.step().unwrap();

    assert_eq!(cpu.regs[0], 0x34);
    assert_eq!(cpu.pc, 3);
}

#[test]
fn lda_wide_memory_reads_full_address() {
    let mut cpu = new_cpu(&[Opcode::Lda.with_mode(4), 0x81, 0x02]);
    cpu.bus.mem[0x8102] = 0x99;
    cpu.step().unwrap();

    assert_eq!(cpu.regs[0], 0x99);
    assert_eq!(cpu.pc, 3);
}

#[test]
fn register_pair_composes_address_for_sam() {
    // SAM @1,2 stores R0 at (R1 << 8) | R2 without reading memory for the address.
    let mut cpu = new_cpu(&[Opcode::Sam.with_mode(5), 0x01, 0x02]);
    cpu.regs[0] = 0xAB;
    cpu.regs[1] = 0x81;
    cpu.regs[2] = 0x40;
    cpu.step().unwrap();

    assert_eq!(cpu.bus.mem[0x8140], 0xAB);
    assert_eq!(cpu.pc, 3);
}

#[test]
fn carry_mode_reads_carry_bit() {
    let mut cpu = new_cpu(&[Opcode::Lda.with_mode(6)]);
    cpu.flags = FLAG_CARRY;
    cpu.step().unwrap();

    assert_eq!(cpu.regs[0], 1);
    assert_eq!(cpu.pc, 1);
}

#[test]
fn pc_mode_reads_instruction_address() {
    let mut cpu = new_cpu(&[0x00, 0x00, 0x00, Opcode::Psh.with_mode(7)]);
    cpu.pc = 3;
    cpu.step().unwrap();

    assert_eq!(cpu.bus.mem[STACK_TOP as usize], 3);
    assert_eq!(cpu.pc, 4);
}

#[test]
fn sam_writes_accumulator_to_memory() {
    let mut cpu = new_cpu(&[LDA, 0x33, Opcode::Sam as u8, 0x80]);
    cpu.step().unwrap();
    cpu.step().unwrap();

    assert_eq!(cpu.bus.mem[0x80], 0x33);
}

#[test]
fn sar_copies_accumulator_to_register() {
    let mut cpu = new_cpu(&[LDA, 0x21, Opcode::Sar as u8, 0x05]);
    cpu.step().unwrap();
    cpu.step().unwrap();

    assert_eq!(cpu.regs[5], 0x21);
}

#[test]
fn sar_rejects_out_of_range_register() {
    let mut cpu = new_cpu(&[Opcode::Sar as u8, 0x09]);

    assert_eq!(
        cpu.step(),
        Err(CpuError::InvalidRegister { pc: 1, index: 9 })
    );
}

#[test]
fn push_and_pop_round_trip_through_stack() {
    let mut cpu = new_cpu(&[Opcode::Psh as u8, 0x44, Opcode::Pop as u8, 0x02]);
    cpu.step().unwrap(); // PSH $44
    assert_eq!(cpu.bus.mem[0xFFFF], 0x44);
    assert_eq!(cpu.sp, 0xFFFE);

    cpu.step().unwrap(); // POP $2
    assert_eq!(cpu.regs[2], 0x44);
    assert_eq!(cpu.sp, 0xFFFF);
    assert_eq!(cpu.pc, 4);
}

#[test]
fn pop_into_pc_resumes_after_popped_address() {
    let mut cpu = new_cpu(&[Opcode::Psh as u8, 0x20, Opcode::Pop.with_mode(7)]);
    cpu.step().unwrap();
    cpu.step().unwrap();

    assert_eq!(cpu.pc, 0x21);
    assert_eq!(cpu.sp, STACK_TOP);
}

#[test]
fn cmp_equal_sets_zero_only() {
    let mut cpu = new_cpu(&[LDA, 7, CMP, 7]);
    cpu.flags = FLAG_CARRY | FLAG_NEGATIVE;
    cpu.step().unwrap();
    cpu.step().unwrap();

    assert_eq!(cpu.flags, FLAG_ZERO | FLAG_CARRY | FLAG_NEGATIVE);
}

#[test]
fn cmp_unequal_clears_zero() {
    let mut cpu = new_cpu(&[LDA, 7, CMP, 8]);
    cpu.flags = FLAG_ZERO | FLAG_CARRY;
    cpu.step().unwrap();
    cpu.step().unwrap();

    assert_eq!(cpu.flags, FLAG_CARRY);
}

#[test]
fn add_sets_carry_when_accumulator_was_zero() {
    let mut cpu = new_cpu(&[ADD, 5]);
    cpu.step().unwrap();

    assert_eq!(cpu.regs[0], 5);
    assert_eq!(cpu.flags & FLAG_ZERO, 0);
    assert_eq!(cpu.flags & FLAG_NEGATIVE, 0);
    assert_ne!(cpu.flags & FLAG_CARRY, 0);
}

#[test]
fn add_overflow_wraps_without_carry() {
    let mut cpu = new_cpu(&[LDA, 0xFF, ADD, 0x01]);
    cpu.step().unwrap();
    cpu.step().unwrap();

    assert_eq!(cpu.regs[0], 0);
    assert_ne!(cpu.flags & FLAG_ZERO, 0);
    assert_eq!(cpu.flags & FLAG_CARRY, 0);
}

#[test]
fn add_sets_negative_from_bit_7() {
    let mut cpu = new_cpu(&[LDA, 0x7F, ADD, 0x01]);
    cpu.step().unwrap();
    cpu.step().unwrap();

    assert_eq!(cpu.regs[0], 0x80);
    assert_ne!(cpu.flags & FLAG_NEGATIVE, 0);
}

#[test]
fn add_wide_operand_keeps_low_byte() {
    let mut cpu = new_cpu(&[LDA, 0x01, Opcode::Add.with_mode(3), 0x01, 0x02]);
    cpu.step().unwrap();
    cpu.step().unwrap();

    assert_eq!(cpu.regs[0], 0x03);
    assert_eq!(cpu.pc, 5);
}

#[test]
fn and_or_not_update_flags() {
    let mut cpu = new_cpu(&[
        LDA,
        0b1100_1100,
        Opcode::And as u8,
        0b0011_0011,
        Opcode::Or as u8,
        0b1000_0001,
        Opcode::Not as u8,
    ]);
    cpu.step().unwrap(); // LDA
    cpu.step().unwrap(); // AND
    assert_eq!(cpu.regs[0], 0);
    assert_ne!(cpu.flags & FLAG_ZERO, 0);

    cpu.step().unwrap(); // OR
    assert_eq!(cpu.regs[0], 0b1000_0001);
    assert_eq!(cpu.flags & FLAG_ZERO, 0);
    assert_ne!(cpu.flags & FLAG_NEGATIVE, 0);

    cpu.step().unwrap(); // NOT
    assert_eq!(cpu.regs[0], 0b0111_1110);
    assert_eq!(cpu.flags & FLAG_NEGATIVE, 0);
    assert_eq!(cpu.pc, 7);
}

#[test]
fn shifts_move_accumulator() {
    let mut cpu = new_cpu(&[LDA, 0b0001_0110, Opcode::Shl as u8, 3, Opcode::Shr as u8, 5]);
    cpu.step().unwrap();
    cpu.step().unwrap();
    assert_eq!(cpu.regs[0], 0b1011_0000);
    assert_ne!(cpu.flags & FLAG_NEGATIVE, 0);

    cpu.step().unwrap();
    assert_eq!(cpu.regs[0], 0b0000_0101);
}

#[test]
fn shift_by_eight_or_more_clears_accumulator() {
    let mut cpu = new_cpu(&[LDA, 0xFF, Opcode::Shr as u8, 8, LDA, 0xFF, Opcode::Shl as u8, 200]);
    cpu.step().unwrap();
    cpu.step().unwrap();
    assert_eq!(cpu.regs[0], 0);
    assert_ne!(cpu.flags & FLAG_ZERO, 0);

    cpu.step().unwrap();
    cpu.step().unwrap();
    assert_eq!(cpu.regs[0], 0);
}

#[test]
fn jmp_always_changes_program_counter() {
    let mut cpu = new_cpu(&[JMP, 0x30]);
    cpu.step().unwrap();

    assert_eq!(cpu.pc, 0x30);
}

#[test]
fn jmp_if_zero_taken() {
    let mut cpu = new_cpu(&[Opcode::Jmp.with_mode(1), 0x10]);
    cpu.flags = FLAG_ZERO;
    cpu.step().unwrap();

    assert_eq!(cpu.pc, 0x10);
}

#[test]
fn jmp_if_zero_not_taken_skips_target() {
    let mut cpu = new_cpu(&[Opcode::Jmp.with_mode(1), 0x10]);
    cpu.step().unwrap();

    assert_eq!(cpu.pc, 2);
}

#[test]
fn jmp_if_not_zero() {
    let mut cpu = new_cpu(&[Opcode::Jmp.with_mode(2), 0x00]);
    cpu.step().unwrap();
    assert_eq!(cpu.pc, 0x00);

    cpu.flags = FLAG_ZERO;
    cpu.step().unwrap();
    assert_eq!(cpu.pc, 2);
}

#[test]
fn jmp_unknown_condition_is_fatal() {
    let mut cpu = new_cpu(&[Opcode::Jmp.with_mode(3), 0x10]);

    assert_eq!(
        cpu.step(),
        Err(CpuError::UnknownJumpCondition { pc: 1, condition: 3 })
    );
}

#[test]
fn unknown_opcode_is_fatal() {
    let mut cpu = new_cpu(&[0x0E]);

    assert_eq!(
        cpu.step(),
        Err(CpuError::UnknownOpcode { pc: 0, byte: 0x0E })
    );
}

#[test]
fn halt_stops_until_acknowledged() {
    let mut cpu = new_cpu(&[LDA, 1, 0xFF, LDA, 2]);
    cpu.step().unwrap();

    assert_eq!(cpu.step(), Ok(CpuState::Halted));
    assert_eq!(cpu.pc, 2);

    for _ in 0..3 {
        assert_eq!(cpu.step(), Ok(CpuState::Halted));
    }
    assert_eq!(cpu.pc, 2);
    assert_eq!(cpu.regs[0], 1);

    cpu.acknowledge();
    assert_eq!(cpu.pc, 3);
    assert_eq!(cpu.step(), Ok(CpuState::Running));
    assert_eq!(cpu.regs[0], 2);
}

#[test]
fn loop_counts_down_until_zero() {
    // 00: LDA $3
    // 02: ADD $FF      ; R0 -= 1
    // 04: JNE 02
    // 06: HALT
    let mut cpu = new_cpu(&[LDA, 3, ADD, 0xFF, Opcode::Jmp.with_mode(2), 0x02, 0xFF]);

    let mut steps = 0;
    while cpu.step().unwrap() == CpuState::Running {
        steps += 1;
    }

    assert_eq!(cpu.regs[0], 0);
    assert_eq!(cpu.pc, 6);
    assert_eq!(steps, 1 + 3 * 2);
}

#[test]
fn pc_trace_follows_instruction_boundaries() {
    // NOOP, LDA $1, LDA #2, LDA $3,4, LDA #5,6, LDA @0,1, LDA @C, NOT, HALT
    let program = [
        Opcode::Noop as u8,
        LDA,
        1,
        Opcode::Lda.with_mode(1),
        2,
        Opcode::Lda.with_mode(3),
        3,
        4,
        Opcode::Lda.with_mode(4),
        5,
        6,
        Opcode::Lda.with_mode(5),
        0,
        1,
        Opcode::Lda.with_mode(6),
        Opcode::Not.with_mode(7),
        0xFF,
    ];
    let mut cpu = new_cpu(&program);

    let mut trace = vec![cpu.pc];
    while cpu.step().unwrap() == CpuState::Running {
        trace.push(cpu.pc);
    }

    assert_eq!(trace, vec![0, 1, 3, 5, 8, 11, 14, 15, 16]);
}

#[test]
fn reset_uses_entrypoint() {
    let mut cpu = new_cpu(&[]);
    cpu.regs[4] = 9;
    cpu.sp = 0x1234;
    cpu.flags = 0xFF;
    cpu.reset(0x0040);

    assert_eq!(cpu.pc, 0x0040);
    assert_eq!(cpu.sp, STACK_TOP);
    assert_eq!(cpu.regs, [0; 8]);
    assert_eq!(cpu.flags, 0);
    assert_eq!(cpu.state, CpuState::Running);
}

#[test]
fn dump_shows_registers_and_memory() {
    let mut cpu = new_cpu(&[LDA, 0x2A, 0xFF]);
    cpu.step().unwrap();
    cpu.step().unwrap();

    let dump = cpu.dump();
    assert!(dump.contains("PC=$0002"));
    assert!(dump.contains("01 2A FF"));
    assert!(dump.contains("2A 00 00 00 00 00 00 00"));
    assert!(dump.contains("42 0 0"));
}

#[test]
fn dump_is_one_line_per_section() {
    let mut cpu = new_cpu(&[0xFF]);
    cpu.sp = 0x00FF;
    cpu.bus.mem[0x0100] = 0x99;
    cpu.step().unwrap();

    let dump = cpu.dump();
    assert_eq!(dump.lines().count(), 5);
    assert!(dump.ends_with('\n'));
    assert!(dump.contains("SP=$00FF TOP=99"));
}
