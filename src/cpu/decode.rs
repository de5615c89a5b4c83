//! Instruction decoder for the 4004.
//!
//! Every 4004 instruction starts with one opcode byte. The high nibble
//! selects the instruction (or instruction group) and the low nibble carries
//! a register number, a register pair, a jump condition or an immediate
//! value. Two-byte instructions take their second byte from the following
//! ROM address; the executor fetches it.
//!
//! Decoding goes through an [`OpcodeTable`] built once per CPU, so an opcode
//! byte either maps to exactly one [`Instruction`] or is reported as unknown.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// A decoded 4004 instruction with its opcode operand already bound.
///
/// Register numbers are 0-15, pair numbers 0-7, immediates and conditions
/// 0-15. The table only ever produces in-range operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Control ====================

    /// No operation
    Nop,

    /// Jump conditional within the page (2 bytes)
    Jcn { cond: Condition },

    /// Jump indirect through a register pair, within the page
    Jin { pair: u8 },

    /// Jump unconditional, 12-bit address (2 bytes)
    Jun { page: u8 },

    /// Jump to subroutine, 12-bit address (2 bytes)
    Jms { page: u8 },

    /// Increment register and skip if zero, else jump within the page (2 bytes)
    Isz { reg: u8 },

    /// Return from subroutine and load the accumulator
    Bbl { value: u8 },

    // ==================== Index registers ====================

    /// Fetch immediate byte into a register pair (2 bytes)
    Fim { pair: u8 },

    /// Fetch indirect from ROM, addressed by pair 0, into a register pair
    Fin { pair: u8 },

    /// Increment register (wraps, carry untouched)
    Inc { reg: u8 },

    // ==================== Accumulator / register ====================

    /// ACC := ACC + R + carry
    Add { reg: u8 },

    /// ACC := ACC + !R + !carry
    Sub { reg: u8 },

    /// ACC := R
    Ld { reg: u8 },

    /// Exchange ACC and R
    Xch { reg: u8 },

    /// ACC := immediate
    Ldm { value: u8 },

    // ==================== Accumulator group ====================

    /// Clear accumulator and carry
    Clb,
    /// Clear carry
    Clc,
    /// Increment accumulator
    Iac,
    /// Complement carry
    Cmc,
    /// Complement accumulator
    Cma,
    /// Rotate left through carry
    Ral,
    /// Rotate right through carry
    Rar,
    /// Transfer carry to accumulator and clear carry
    Tcc,
    /// Decrement accumulator
    Dac,
    /// Transfer carry subtract
    Tcs,
    /// Set carry
    Stc,
    /// Decimal adjust accumulator
    Daa,
    /// Keyboard process
    Kbp,
}

impl Instruction {
    /// Number of ROM bytes the instruction occupies.
    pub fn size(&self) -> u16 {
        match self {
            Instruction::Jcn { .. }
            | Instruction::Jun { .. }
            | Instruction::Jms { .. }
            | Instruction::Isz { .. }
            | Instruction::Fim { .. } => 2,
            _ => 1,
        }
    }

    /// Assembler mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Nop => "NOP",
            Instruction::Jcn { .. } => "JCN",
            Instruction::Jin { .. } => "JIN",
            Instruction::Jun { .. } => "JUN",
            Instruction::Jms { .. } => "JMS",
            Instruction::Isz { .. } => "ISZ",
            Instruction::Bbl { .. } => "BBL",
            Instruction::Fim { .. } => "FIM",
            Instruction::Fin { .. } => "FIN",
            Instruction::Inc { .. } => "INC",
            Instruction::Add { .. } => "ADD",
            Instruction::Sub { .. } => "SUB",
            Instruction::Ld { .. } => "LD",
            Instruction::Xch { .. } => "XCH",
            Instruction::Ldm { .. } => "LDM",
            Instruction::Clb => "CLB",
            Instruction::Clc => "CLC",
            Instruction::Iac => "IAC",
            Instruction::Cmc => "CMC",
            Instruction::Cma => "CMA",
            Instruction::Ral => "RAL",
            Instruction::Rar => "RAR",
            Instruction::Tcc => "TCC",
            Instruction::Dac => "DAC",
            Instruction::Tcs => "TCS",
            Instruction::Stc => "STC",
            Instruction::Daa => "DAA",
            Instruction::Kbp => "KBP",
        }
    }
}

/// JCN condition nibble.
///
/// Bit 0 tests TEST = 0, bit 1 tests carry = 1, bit 2 tests ACC = 0 and
/// bit 3 inverts the outcome. The tests are applied in bit order and each
/// one replaces the previous outcome, so only the highest selected test
/// counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition(pub u8);

impl Condition {
    pub const TEST_ZERO: u8 = 0b0001;
    pub const CARRY_ONE: u8 = 0b0010;
    pub const ACC_ZERO: u8 = 0b0100;
    pub const INVERT: u8 = 0b1000;

    /// Evaluate against the current TEST pin, carry and accumulator.
    pub fn holds(self, test: u16, carry: u16, acc: u16) -> bool {
        let mut result = false;
        if self.0 & Self::TEST_ZERO != 0 {
            result = test == 0;
        }
        if self.0 & Self::CARRY_ONE != 0 {
            result = carry == 1;
        }
        if self.0 & Self::ACC_ZERO != 0 {
            result = acc == 0;
        }
        if self.0 & Self::INVERT != 0 {
            result = !result;
        }
        result
    }
}

/// Opcode byte of an instruction.
pub fn encode(instr: &Instruction) -> u8 {
    match *instr {
        Instruction::Nop => 0x00,
        Instruction::Jcn { cond } => 0x10 | cond.0,
        Instruction::Fim { pair } => 0x20 | (pair << 1),
        Instruction::Fin { pair } => 0x30 | (pair << 1),
        Instruction::Jin { pair } => 0x31 | (pair << 1),
        Instruction::Jun { page } => 0x40 | page,
        Instruction::Jms { page } => 0x50 | page,
        Instruction::Inc { reg } => 0x60 | reg,
        Instruction::Isz { reg } => 0x70 | reg,
        Instruction::Add { reg } => 0x80 | reg,
        Instruction::Sub { reg } => 0x90 | reg,
        Instruction::Ld { reg } => 0xA0 | reg,
        Instruction::Xch { reg } => 0xB0 | reg,
        Instruction::Bbl { value } => 0xC0 | value,
        Instruction::Ldm { value } => 0xD0 | value,
        Instruction::Clb => 0xF0,
        Instruction::Clc => 0xF1,
        Instruction::Iac => 0xF2,
        Instruction::Cmc => 0xF3,
        Instruction::Cma => 0xF4,
        Instruction::Ral => 0xF5,
        Instruction::Rar => 0xF6,
        Instruction::Tcc => 0xF7,
        Instruction::Dac => 0xF8,
        Instruction::Tcs => 0xF9,
        Instruction::Stc => 0xFA,
        Instruction::Daa => 0xFB,
        Instruction::Kbp => 0xFC,
    }
}

/// Mapping from opcode byte to instruction.
#[derive(Clone)]
pub struct OpcodeTable {
    entries: [Option<Instruction>; 256],
}

impl OpcodeTable {
    /// A table with nothing registered.
    pub fn empty() -> Self {
        Self { entries: [None; 256] }
    }

    /// The 4004 instruction set.
    pub fn mcs4() -> Result<Self, DecodeError> {
        let mut table = Self::empty();

        table.register(0x00, Instruction::Nop)?;
        for (opcode, instr) in [
            (0xF0, Instruction::Clb),
            (0xF1, Instruction::Clc),
            (0xF2, Instruction::Iac),
            (0xF3, Instruction::Cmc),
            (0xF4, Instruction::Cma),
            (0xF5, Instruction::Ral),
            (0xF6, Instruction::Rar),
            (0xF7, Instruction::Tcc),
            (0xF8, Instruction::Dac),
            (0xF9, Instruction::Tcs),
            (0xFA, Instruction::Stc),
            (0xFB, Instruction::Daa),
            (0xFC, Instruction::Kbp),
        ] {
            table.register(opcode, instr)?;
        }

        // One opcode per index register
        for reg in 0..16u8 {
            table.register(0x60 + reg, Instruction::Inc { reg })?;
            table.register(0x70 + reg, Instruction::Isz { reg })?;
            table.register(0x80 + reg, Instruction::Add { reg })?;
            table.register(0x90 + reg, Instruction::Sub { reg })?;
            table.register(0xA0 + reg, Instruction::Ld { reg })?;
            table.register(0xB0 + reg, Instruction::Xch { reg })?;
        }

        // One opcode per register pair
        for pair in 0..8u8 {
            table.register(0x20 | (pair << 1), Instruction::Fim { pair })?;
            table.register(0x30 | (pair << 1), Instruction::Fin { pair })?;
            table.register(0x31 | (pair << 1), Instruction::Jin { pair })?;
        }

        // Immediate operand in the low nibble
        for value in 0..16u8 {
            table.register(0xC0 + value, Instruction::Bbl { value })?;
            table.register(0xD0 + value, Instruction::Ldm { value })?;
        }

        // Jumps whose second byte follows in ROM. The top encoding of each
        // family (0x1F, 0x4F, 0x5F) is left unregistered.
        for n in 0..15u8 {
            table.register(0x10 + n, Instruction::Jcn { cond: Condition(n) })?;
            table.register(0x40 + n, Instruction::Jun { page: n })?;
            table.register(0x50 + n, Instruction::Jms { page: n })?;
        }

        Ok(table)
    }

    /// Bind `opcode` to `instr`. Fails if the opcode is already bound.
    pub fn register(&mut self, opcode: u8, instr: Instruction) -> Result<(), DecodeError> {
        let slot = &mut self.entries[usize::from(opcode)];
        if slot.is_some() {
            return Err(DecodeError::OpcodeCollision { opcode });
        }
        *slot = Some(instr);
        Ok(())
    }

    /// Decode one opcode byte.
    pub fn lookup(&self, opcode: u8) -> Result<Instruction, DecodeError> {
        self.entries[usize::from(opcode)].ok_or(DecodeError::UnknownOpcode { opcode })
    }

    /// Number of registered opcodes.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered opcodes and their instructions, in opcode order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, Instruction)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(op, e)| e.map(|instr| (op as u8, instr)))
    }
}

impl std::fmt::Debug for OpcodeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcodeTable")
            .field("registered", &self.len())
            .finish()
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("opcode 0x{opcode:02X} is unknown")]
    UnknownOpcode { opcode: u8 },

    #[error("opcode 0x{opcode:02X} registered twice")]
    OpcodeCollision { opcode: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_builds() {
        let table = OpcodeTable::mcs4().unwrap();
        // 1 + 13 fixed, 6 * 16 register, 3 * 8 pair, 2 * 16 immediate, 3 * 15 jump
        assert_eq!(table.len(), 14 + 96 + 24 + 32 + 45);
    }

    #[test]
    fn test_encode_matches_registration() {
        let table = OpcodeTable::mcs4().unwrap();
        for (opcode, instr) in table.iter() {
            assert_eq!(encode(&instr), opcode, "{:?}", instr);
        }
    }

    #[test]
    fn test_lookup() {
        let table = OpcodeTable::mcs4().unwrap();
        assert_eq!(table.lookup(0x00), Ok(Instruction::Nop));
        assert_eq!(table.lookup(0x8E), Ok(Instruction::Add { reg: 14 }));
        assert_eq!(table.lookup(0x24), Ok(Instruction::Fim { pair: 2 }));
        assert_eq!(table.lookup(0x35), Ok(Instruction::Jin { pair: 2 }));
        assert_eq!(table.lookup(0x1C), Ok(Instruction::Jcn { cond: Condition(0xC) }));
    }

    #[test]
    fn test_top_jump_encodings_unknown() {
        let table = OpcodeTable::mcs4().unwrap();
        for opcode in [0x1F, 0x4F, 0x5F] {
            assert_eq!(table.lookup(opcode), Err(DecodeError::UnknownOpcode { opcode }));
        }
    }

    #[test]
    fn test_io_group_unknown() {
        let table = OpcodeTable::mcs4().unwrap();
        for opcode in [0x21, 0xE0, 0xE9, 0xFD, 0xFF] {
            assert!(table.lookup(opcode).is_err());
        }
    }

    #[test]
    fn test_collision() {
        let mut table = OpcodeTable::empty();
        table.register(0x00, Instruction::Nop).unwrap();
        assert_eq!(
            table.register(0x00, Instruction::Clb),
            Err(DecodeError::OpcodeCollision { opcode: 0x00 })
        );
        assert_eq!(table.lookup(0x00), Ok(Instruction::Nop));
    }

    #[test]
    fn test_condition_last_test_wins() {
        // TEST = 0 is true but the carry test replaces it
        assert!(!Condition(0b0011).holds(0, 0, 5));
        assert!(Condition(0b0011).holds(1, 1, 5));
        // Only the accumulator test counts when all three are selected
        assert!(Condition(0b0111).holds(1, 0, 0));
        assert!(!Condition(0b0111).holds(0, 1, 3));
    }

    #[test]
    fn test_condition_invert() {
        assert!(Condition(0b1000).holds(0, 0, 0));
        assert!(!Condition(0b0000).holds(0, 0, 0));
        assert!(Condition(0b1100).holds(0, 0, 1));
        assert!(Condition(0b1001).holds(1, 0, 0));
    }

    #[test]
    fn test_instruction_len() {
        assert_eq!(Instruction::Jun { page: 1 }.size(), 2);
        assert_eq!(Instruction::Jin { pair: 1 }.size(), 1);
        assert_eq!(Instruction::Fim { pair: 0 }.size(), 2);
        assert_eq!(Instruction::Nop.size(), 1);
        assert_eq!(Instruction::Dac.mnemonic(), "DAC");
    }
}
