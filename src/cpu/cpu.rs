
use ansi_term::Colour::{Cyan, Yellow};
use log::{info, log_enabled, trace, Level};
use thiserror::Error;

use crate::{
    bus::{Bus, BusError},
    cpu::flags::{FLAG_CARRY, FLAG_NEGATIVE, FLAG_ZERO},
};

pub const REG_COUNT: usize = 8;
/// Stack grows down from the top of the address space.
pub const STACK_TOP: u16 = 0xFFFF;
pub const HALT: u8 = 0xFF;
pub const OPCODE_MASK: u8 = 0x1F;
pub const MODE_MASK: u8 = 0xE0;
pub const MODE_SHIFT: u8 = 5;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    #[error("PC=${pc:04X}: unknown opcode in ${byte:02X}")]
    UnknownOpcode { pc: u16, byte: u8 },
    #[error("PC=${pc:04X}: unknown addressing mode {mode}")]
    UnknownMode { pc: u16, mode: u8 },
    #[error("PC=${pc:04X}: unknown jump condition {condition}")]
    UnknownJumpCondition { pc: u16, condition: u8 },
    #[error("PC=${pc:04X}: unknown register R{index}")]
    InvalidRegister { pc: u16, index: u16 },
    #[error("PC=${pc:04X}: {source}")]
    Bus {
        pc: u16,
        #[source]
        source: BusError,
    },
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Noop = 0,
    Lda = 1,
    Sam = 2,
    Sar = 3,
    Jmp = 4,
    Psh = 5,
    Pop = 6,
    Cmp = 7,
    Add = 8,
    And = 9,
    Or = 10,
    Not = 11,
    Shr = 12,
    Shl = 13,
}

impl Opcode {
    /// Instruction byte for this opcode with `mode` in the top three bits.
    pub fn with_mode(self, mode: u8) -> u8 {
        (self as u8) | (mode << MODE_SHIFT)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        Ok(match code {
            0 => Opcode::Noop,
            1 => Opcode::Lda,
            2 => Opcode::Sam,
            3 => Opcode::Sar,
            4 => Opcode::Jmp,
            5 => Opcode::Psh,
            6 => Opcode::Pop,
            7 => Opcode::Cmp,
            8 => Opcode::Add,
            9 => Opcode::And,
            10 => Opcode::Or,
            11 => Opcode::Not,
            12 => Opcode::Shr,
            13 => Opcode::Shl,
            _ => return Err(code),
        })
    }
}

/// Operand addressing modes (top three bits of the instruction byte).
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// `$n`: next byte.
    Immediate = 0,
    /// `#n`: byte at the 8-bit address in the next byte.
    Memory = 1,
    /// `@r`: register named by the next byte.
    Register = 2,
    /// `$hi,lo`: next two bytes, high first.
    Immediate16 = 3,
    /// `#hi,lo`: byte at the 16-bit address in the next two bytes.
    Memory16 = 4,
    /// `@rh,rl`: two registers composed into a 16-bit value.
    RegisterPair = 5,
    /// `@C`: the carry bit.
    Carry = 6,
    /// `@PC`: the current program counter.
    ProgramCounter = 7,
}

impl TryFrom<u8> for Mode {
    type Error = u8;

    fn try_from(mode: u8) -> Result<Self, u8> {
        Ok(match mode {
            0 => Mode::Immediate,
            1 => Mode::Memory,
            2 => Mode::Register,
            3 => Mode::Immediate16,
            4 => Mode::Memory16,
            5 => Mode::RegisterPair,
            6 => Mode::Carry,
            7 => Mode::ProgramCounter,
            _ => return Err(mode),
        })
    }
}

/// JMP reuses the mode field as its condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JumpCondition {
    Always,
    Zero,
    NotZero,
}

impl TryFrom<u8> for JumpCondition {
    type Error = u8;

    fn try_from(condition: u8) -> Result<Self, u8> {
        match condition {
            0 => Ok(JumpCondition::Always),
            1 => Ok(JumpCondition::Zero),
            2 => Ok(JumpCondition::NotZero),
            _ => Err(condition),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpuState {
    Running,
    /// Reached `$FF`; nothing executes until [`Cpu::acknowledge`].
    Halted,
}

pub struct Cpu<B: Bus> {
    pub regs: [u8; REG_COUNT],
    pub pc: u16,
    pub sp: u16,
    pub flags: u8,
    pub state: CpuState,
    pub bus: B,
}

impl<B: Bus> Cpu<B> {
    pub fn new(bus: B) -> Self {
        Self {
            regs: [0; REG_COUNT],
            pc: 0,
            sp: STACK_TOP,
            flags: 0,
            state: CpuState::Running,
            bus,
        }
    }

    pub fn reset(&mut self, entrypoint: u16) {
        self.regs = [0; REG_COUNT];
        self.pc = entrypoint;
        self.sp = STACK_TOP;
        self.flags = 0;
        self.state = CpuState::Running;
    }

    /// Execute one instruction.
    ///
    /// Decode, execute, then finalize: PC moves to the byte after the last one consumed,
    /// unless the instruction chose the next PC itself.
    pub fn step(&mut self) -> Result<CpuState, CpuError> {
        if self.state == CpuState::Halted {
            return Ok(CpuState::Halted);
        }

        let pc = self.pc;
        let byte = self.read(pc)?;
        if byte == HALT {
            info!("HALT at ${pc:04X}");
            self.state = CpuState::Halted;
            return Ok(CpuState::Halted);
        }

        self.trace(pc, byte);
        let next_pc = self.execute(byte)?;
        self.pc = match next_pc {
            Some(target) => target,
            None => self.pc.wrapping_add(1),
        };
        Ok(CpuState::Running)
    }

    /// Resume after a halt at the byte following the `$FF`.
    pub fn acknowledge(&mut self) {
        if self.state == CpuState::Halted {
            self.pc = self.pc.wrapping_add(1);
            self.state = CpuState::Running;
        }
    }

    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    fn trace(&self, pc: u16, byte: u8) {
        if !log_enabled!(Level::Trace) {
            return;
        }
        let r = &self.regs;
        trace!(
            "{:04X}  {:02X}  R0:{:02X} R1:{:02X} R2:{:02X} R3:{:02X} R4:{:02X} R5:{:02X} R6:{:02X} R7:{:02X} F:{:02X} SP:{:04X}",
            pc, byte, r[0], r[1], r[2], r[3], r[4], r[5], r[6], r[7], self.flags, self.sp
        );
    }

    fn execute(&mut self, byte: u8) -> Result<Option<u16>, CpuError> {
        let opcode = Opcode::try_from(byte & OPCODE_MASK)
            .map_err(|_| CpuError::UnknownOpcode { pc: self.pc, byte })?;
        let mode = (byte & MODE_MASK) >> MODE_SHIFT;

        match opcode {
            Opcode::Noop => {}
            Opcode::Lda => self.regs[0] = self.fetch_operand(mode)? as u8,
            Opcode::Sam => {
                let addr = self.fetch_operand(mode)?;
                self.write(addr, self.regs[0])?;
            }
            Opcode::Sar => {
                let index = self.fetch_operand(mode)?;
                let value = self.regs[0];
                *self.reg_mut(index)? = value;
            }
            Opcode::Jmp => return self.jump(mode),
            Opcode::Psh => {
                let value = self.fetch_operand(mode)?;
                self.push(value as u8)?;
            }
            Opcode::Pop => {
                self.sp = self.sp.wrapping_add(1);
                let value = self.read(self.sp)?;
                if mode == Mode::ProgramCounter as u8 {
                    // The popped byte becomes PC; the trailing advance still applies.
                    return Ok(Some((value as u16).wrapping_add(1)));
                }
                let index = self.fetch_operand(mode)?;
                *self.reg_mut(index)? = value;
            }
            Opcode::Cmp => {
                let operand = self.fetch_operand(mode)? as u8;
                self.set_flag(FLAG_ZERO, self.regs[0] == operand);
            }
            Opcode::Add => {
                let operand = self.fetch_operand(mode)?;
                // Carry reflects "accumulator was zero", not an arithmetic carry out.
                self.set_flag(FLAG_CARRY, self.regs[0] == 0);
                self.regs[0] = (self.regs[0] as u16).wrapping_add(operand) as u8;
                self.update_zero_and_negative_flags(self.regs[0]);
            }
            Opcode::And => {
                let operand = self.fetch_operand(mode)? as u8;
                self.regs[0] &= operand;
                self.update_zero_and_negative_flags(self.regs[0]);
            }
            Opcode::Or => {
                let operand = self.fetch_operand(mode)? as u8;
                self.regs[0] |= operand;
                self.update_zero_and_negative_flags(self.regs[0]);
            }
            Opcode::Not => {
                self.regs[0] = !self.regs[0];
                self.update_zero_and_negative_flags(self.regs[0]);
            }
            Opcode::Shr => {
                let amount = self.fetch_operand(mode)?;
                self.regs[0] = shift_right(self.regs[0], amount);
                self.update_zero_and_negative_flags(self.regs[0]);
            }
            Opcode::Shl => {
                let amount = self.fetch_operand(mode)?;
                self.regs[0] = shift_left(self.regs[0], amount);
                self.update_zero_and_negative_flags(self.regs[0]);
            }
        }
        Ok(None)
    }

    /// Resolve an operand, consuming 0-2 bytes after the instruction byte.
    fn fetch_operand(&mut self, mode: u8) -> Result<u16, CpuError> {
        let mode =
            Mode::try_from(mode).map_err(|mode| CpuError::UnknownMode { pc: self.pc, mode })?;

        match mode {
            Mode::Immediate => Ok(self.fetch_byte()? as u16),
            Mode::Memory => {
                let addr = self.fetch_byte()? as u16;
                Ok(self.read(addr)? as u16)
            }
            Mode::Register => {
                let index = self.fetch_byte()? as u16;
                Ok(self.reg(index)? as u16)
            }
            Mode::Immediate16 => self.fetch_word(),
            Mode::Memory16 => {
                let addr = self.fetch_word()?;
                Ok(self.read(addr)? as u16)
            }
            Mode::RegisterPair => {
                let hi = self.fetch_byte()? as u16;
                let hi = self.reg(hi)? as u16;
                let lo = self.fetch_byte()? as u16;
                let lo = self.reg(lo)? as u16;
                Ok((hi << 8) | lo)
            }
            Mode::Carry => Ok(((self.flags & FLAG_CARRY) >> 1) as u16),
            Mode::ProgramCounter => Ok(self.pc),
        }
    }

    /// Target is always a single immediate byte, so jumps reach $00-$FF only.
    fn jump(&mut self, condition: u8) -> Result<Option<u16>, CpuError> {
        let target = self.fetch_byte()? as u16;
        let condition = JumpCondition::try_from(condition)
            .map_err(|condition| CpuError::UnknownJumpCondition { pc: self.pc, condition })?;

        let taken = match condition {
            JumpCondition::Always => true,
            JumpCondition::Zero => self.flags & FLAG_ZERO != 0,
            JumpCondition::NotZero => self.flags & FLAG_ZERO == 0,
        };
        Ok(taken.then_some(target))
    }

    fn fetch_byte(&mut self) -> Result<u8, CpuError> {
        self.pc = self.pc.wrapping_add(1);
        self.read(self.pc)
    }

    /// High byte first.
    fn fetch_word(&mut self) -> Result<u16, CpuError> {
        let hi = self.fetch_byte()? as u16;
        let lo = self.fetch_byte()? as u16;
        Ok((hi << 8) | lo)
    }

    fn read(&self, addr: u16) -> Result<u8, CpuError> {
        self.bus
            .read(addr)
            .map_err(|source| CpuError::Bus { pc: self.pc, source })
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), CpuError> {
        let pc = self.pc;
        self.bus
            .write(addr, data)
            .map_err(|source| CpuError::Bus { pc, source })
    }

    fn push(&mut self, value: u8) -> Result<(), CpuError> {
        self.write(self.sp, value)?;
        self.sp = self.sp.wrapping_sub(1);
        Ok(())
    }

    fn reg(&self, index: u16) -> Result<u8, CpuError> {
        self.regs
            .get(index as usize)
            .copied()
            .ok_or(CpuError::InvalidRegister { pc: self.pc, index })
    }

    fn reg_mut(&mut self, index: u16) -> Result<&mut u8, CpuError> {
        let pc = self.pc;
        self.regs
            .get_mut(index as usize)
            .ok_or(CpuError::InvalidRegister { pc, index })
    }

    fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    fn update_zero_and_negative_flags(&mut self, value: u8) {
        self.set_flag(FLAG_ZERO, value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
    }

    /// Registers, flags, top of stack, and the first 20 bytes of memory.
    pub fn dump(&self) -> String {
        let peek = |addr: u16| self.bus.read(addr).ok();
        let top = match peek(self.sp.wrapping_add(1)) {
            Some(b) => format!("{b:02X}"),
            None => "??".to_string(),
        };
        let mut out = format!(
            "{} PC=${:04X} SP=${:04X} TOP={} FLAGS={:03b}\n",
            Yellow.bold().paint("HALT"),
            self.pc,
            self.sp,
            top,
            self.flags
        );

        let bytes: Vec<Option<u8>> = (0..20).map(peek).collect();
        let hex: Vec<String> = bytes
            .iter()
            .map(|b| b.map_or("??".to_string(), |b| format!("{b:02X}")))
            .collect();
        let text: Vec<String> = bytes
            .iter()
            .map(|b| match b {
                Some(b) if b.is_ascii_graphic() => (*b as char).to_string(),
                _ => " ".to_string(),
            })
            .collect();
        out.push_str(&format!("{} {}\n", Cyan.paint("MEM "), hex.join(" ")));
        out.push_str(&format!("     {}\n", text.join("  ")));

        let regs_hex: Vec<String> = self.regs.iter().map(|r| format!("{r:02X}")).collect();
        let regs_dec: Vec<String> = self.regs.iter().map(|r| r.to_string()).collect();
        out.push_str(&format!("{} {}\n", Cyan.paint("REGS"), regs_hex.join(" ")));
        out.push_str(&format!("     {}\n", regs_dec.join(" ")));
        out
    }
}

/// Shift counts of 8 or more clear the accumulator.
fn shift_right(value: u8, amount: u16) -> u8 {
    if amount >= 8 { 0 } else { value >> amount }
}

fn shift_left(value: u8, amount: u16) -> u8 {
    if amount >= 8 { 0 } else { value << amount }
}
