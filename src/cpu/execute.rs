//! CPU execution engine for the 4004.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::decode::{DecodeError, Instruction, OpcodeTable};
use crate::cpu::memory::{MemoryError, Rom};
use crate::cpu::register::{Nibble, RegisterError};
use crate::cpu::registers::{Registers, INDEX_REGISTERS};
use crate::cpu::stack::{ReturnStack, STACK_DEPTH};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, trace};

/// The 4004 CPU.
#[derive(Clone)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Return address stack.
    pub stack: ReturnStack,
    /// Program ROM.
    pub rom: Rom,
    /// Instructions executed since construction or reset.
    pub cycles: u64,
    table: OpcodeTable,
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU with zeroed state.
    ///
    /// # Panics
    /// Panics if the opcode table registers an opcode twice, which is a bug
    /// in the table itself. Use [`Cpu::try_new`] to get the error instead.
    pub fn new() -> Self {
        Self::try_new().unwrap_or_else(|e| panic!("broken opcode table: {}", e))
    }

    /// Create a new CPU, reporting opcode table collisions.
    pub fn try_new() -> Result<Self, CpuError> {
        Ok(Self {
            regs: Registers::new(),
            stack: ReturnStack::new(),
            rom: Rom::new(),
            cycles: 0,
            table: OpcodeTable::mcs4()?,
            last_instr: None,
        })
    }

    /// Reset registers, stack and ROM to their initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.stack.reset();
        self.rom.clear();
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Copy a program image into ROM at `start`.
    pub fn load_image(&mut self, start: usize, image: &[u8]) -> Result<(), CpuError> {
        self.rom.load_image(start, image)?;
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the opcode byte that was executed. When the opcode is unknown
    /// the program counter has already moved past it.
    pub fn step(&mut self) -> Result<u8, CpuError> {
        // Fetch, advancing PC before decode (jumps override it)
        let address = self.regs.advance_pc();
        let opcode = self.rom.read(address);

        // Decode
        let instr = self.table.lookup(opcode).map_err(|e| {
            debug!(address, opcode, "unknown opcode");
            e
        })?;
        trace!(address, opcode, instr = instr.mnemonic(), "step");

        // Execute
        self.execute(instr)?;

        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(opcode)
    }

    /// Run for at most `max_cycles` instructions.
    ///
    /// Returns the number of instructions executed.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        self.run_until(max_cycles, |_| false)
    }

    /// Run until `stop` returns true (checked before every instruction) or
    /// `max_cycles` instructions have executed.
    pub fn run_until<F>(&mut self, max_cycles: u64, mut stop: F) -> Result<u64, CpuError>
    where
        F: FnMut(&Cpu) -> bool,
    {
        let start_cycles = self.cycles;

        while self.cycles - start_cycles < max_cycles && !stop(self) {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Read the byte at PC and move PC past it.
    fn fetch_operand(&mut self) -> u8 {
        let address = self.regs.advance_pc();
        self.rom.read(address)
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) -> Result<(), CpuError> {
        match instr {
            // ==================== Control ====================

            Instruction::Nop => {}

            Instruction::Jcn { cond } => {
                let target = self.fetch_operand();
                let regs = &self.regs;
                if cond.holds(regs.test.get(), regs.carry.get(), regs.acc.get()) {
                    // A JCN in the last two bytes of a page lands in the
                    // next page because PC was already incremented past it.
                    self.regs.jump_in_page(target);
                }
            }

            Instruction::Jin { pair } => {
                let target = self.regs.pair_value(usize::from(pair));
                self.regs.jump_in_page(target);
            }

            Instruction::Jun { page } => {
                let low = self.fetch_operand();
                self.regs.jump(u16::from(page) << 8 | u16::from(low));
            }

            Instruction::Jms { page } => {
                let low = self.fetch_operand();
                self.stack.push(self.regs.pc.get())?;
                self.regs.jump(u16::from(page) << 8 | u16::from(low));
            }

            Instruction::Isz { reg } => {
                let target = self.fetch_operand();
                let reg = self.regs.reg_mut(usize::from(reg));
                increment_wrapping(reg)?;
                if reg.get() != 0 {
                    self.regs.jump_in_page(target);
                }
            }

            Instruction::Bbl { value } => {
                let ret = self.stack.pop();
                self.regs.jump(ret);
                self.regs.acc.set(value)?;
            }

            // ==================== Index registers ====================

            Instruction::Fim { pair } => {
                let value = self.fetch_operand();
                self.regs.pair(usize::from(pair)).set(value)?;
            }

            Instruction::Fin { pair } => {
                let page = self.regs.pc.get() & 0x0F00;
                let address = page | u16::from(self.regs.pair_value(0));
                let value = self.rom.read(address);
                self.regs.pair(usize::from(pair)).set(value)?;
            }

            Instruction::Inc { reg } => {
                increment_wrapping(self.regs.reg_mut(usize::from(reg)))?;
            }

            // ==================== Accumulator / register ====================

            Instruction::Add { reg } => {
                let mut value = self.regs.acc.get();
                value += self.regs.carry.get();
                value += self.regs.reg(usize::from(reg)).get();

                // Carry is only ever set here, never cleared.
                if value > Nibble::MAX {
                    self.regs.carry.set(1)?;
                    value -= 0x10;
                }
                self.regs.acc.set(value)?;
            }

            Instruction::Sub { reg } => {
                // One's complement: ACC + !R + !carry
                let mut value = self.regs.acc.get();
                value += self.regs.reg(usize::from(reg)).get_inverted();
                value += self.regs.carry.get_inverted();

                // Carry set means no borrow.
                if value & 0x10 == 0 {
                    self.regs.carry.set(0)?;
                } else {
                    self.regs.carry.set(1)?;
                    value -= 0x10;
                }
                self.regs.acc.set(value)?;
            }

            Instruction::Ld { reg } => {
                let value = self.regs.reg(usize::from(reg)).get();
                self.regs.acc.set(value)?;
            }

            Instruction::Xch { reg } => {
                let acc = self.regs.acc.get();
                let r = self.regs.reg(usize::from(reg)).get();
                self.regs.reg_mut(usize::from(reg)).set(acc)?;
                self.regs.acc.set(r)?;
            }

            Instruction::Ldm { value } => {
                self.regs.acc.set(value)?;
            }

            // ==================== Accumulator group ====================

            Instruction::Clb => {
                self.regs.carry.set(0)?;
                self.regs.acc.set(0)?;
            }

            Instruction::Clc => {
                self.regs.carry.set(0)?;
            }

            Instruction::Iac => {
                // Unlike INC this does not wrap: IAC at 0xF is an error.
                self.regs.acc.increment()?;
            }

            Instruction::Cmc => {
                let inverted = self.regs.carry.get_inverted();
                self.regs.carry.set(inverted)?;
            }

            Instruction::Cma => {
                let inverted = self.regs.acc.get_inverted();
                self.regs.acc.set(inverted)?;
            }

            Instruction::Ral => {
                let acc = self.regs.acc.get();
                let carry = self.regs.carry.get();
                self.regs.carry.set(acc >> 3)?;
                self.regs.acc.set(((acc << 1) | carry) & Nibble::MAX)?;
            }

            Instruction::Rar => {
                let acc = self.regs.acc.get();
                let carry = self.regs.carry.get();
                self.regs.carry.set(acc & 1)?;
                self.regs.acc.set((acc >> 1) | (carry << 3))?;
            }

            Instruction::Tcc => {
                let carry = self.regs.carry.get();
                self.regs.acc.set(carry)?;
                self.regs.carry.set(0)?;
            }

            Instruction::Dac => {
                let acc = self.regs.acc.get();
                if acc == 0 {
                    // Borrow: carry cleared, ACC wraps to 0xE.
                    self.regs.carry.set(0)?;
                    self.regs.acc.set(0xE)?;
                } else {
                    self.regs.carry.set(1)?;
                    self.regs.acc.set(acc - 1)?;
                }
            }

            Instruction::Tcs => {
                let value = if self.regs.carry.get() == 1 { 9 } else { 10 };
                self.regs.acc.set(value)?;
                self.regs.carry.set(0)?;
            }

            Instruction::Stc => {
                self.regs.carry.set(1)?;
            }

            Instruction::Daa => {
                let acc = self.regs.acc.get();
                if acc > 9 || self.regs.carry.get() == 1 {
                    let mut value = acc + 6;
                    if value > Nibble::MAX {
                        self.regs.carry.set(1)?;
                        value -= 0x10;
                    }
                    self.regs.acc.set(value)?;
                }
            }

            Instruction::Kbp => {
                let value = match self.regs.acc.get() {
                    0b0000 => 0,
                    0b0001 => 1,
                    0b0010 => 2,
                    0b0100 => 3,
                    0b1000 => 4,
                    _ => 0xF,
                };
                self.regs.acc.set(value)?;
            }
        }

        Ok(())
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Capture the architectural state (everything but ROM).
    pub fn snapshot(&self) -> Snapshot {
        let mut index = [0u8; INDEX_REGISTERS];
        for (n, value) in index.iter_mut().enumerate() {
            *value = self.regs.reg(n).get() as u8;
        }

        Snapshot {
            pc: self.regs.pc.get(),
            acc: self.regs.acc.get() as u8,
            carry: self.regs.carry.get() as u8,
            test: self.regs.test.get() as u8,
            dp: self.regs.dp.get() as u8,
            index,
            stack: self.stack.values(),
            stack_cursor: self.stack.cursor(),
            cycles: self.cycles,
            last_instruction: self.last_instr,
        }
    }
}

/// INC/ISZ increment: wraps from 0xF to 0 and leaves carry alone.
fn increment_wrapping(reg: &mut Nibble) -> Result<(), RegisterError> {
    reg.set((reg.get() + 1) & Nibble::MAX)
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("stack", &self.stack)
            .finish()
    }
}

/// Architectural state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub pc: u16,
    pub acc: u8,
    pub carry: u8,
    pub test: u8,
    pub dp: u8,
    pub index: [u8; INDEX_REGISTERS],
    pub stack: [u16; STACK_DEPTH],
    pub stack_cursor: usize,
    pub cycles: u64,
    pub last_instruction: Option<Instruction>,
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("register error: {0}")]
    RegisterError(#[from] RegisterError),

    #[error("memory error: {0}")]
    MemoryError(#[from] MemoryError),

    #[error("decode error: {0}")]
    DecodeError(#[from] DecodeError),
}
