//! 4004 register file.
//!
//! The 4004 has:
//! - 16 four-bit index registers R0-R15, also addressable as 8 pairs P0-P7
//! - a 4-bit accumulator and a 1-bit carry/link flag
//! - a 12-bit program counter
//! - an 8-bit data pointer
//! - the TEST input pin, modelled as a 1-bit register

use super::register::{Address, Bit, Byte, Nibble, RegisterError};

/// Number of four-bit index registers.
pub const INDEX_REGISTERS: usize = 16;
/// Number of eight-bit register pairs.
pub const REGISTER_PAIRS: usize = 8;

const INDEX_NAMES: [&str; INDEX_REGISTERS] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7",
    "r8", "r9", "r10", "r11", "r12", "r13", "r14", "r15",
];

const PAIR_NAMES: [&str; REGISTER_PAIRS] = ["p0", "p1", "p2", "p3", "p4", "p5", "p6", "p7"];

/// Eight-bit view over two adjacent index registers.
///
/// Pair `n` is R(2n) as the high nibble and R(2n+1) as the low nibble.
/// The view owns no storage.
pub struct RegisterPair<'a> {
    name: &'static str,
    high: &'a mut Nibble,
    low: &'a mut Nibble,
}

impl<'a> RegisterPair<'a> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> u8 {
        ((self.high.get() << 4) | self.low.get()) as u8
    }

    /// Split `value` across the two halves.
    pub fn set<V: Into<i64>>(&mut self, value: V) -> Result<(), RegisterError> {
        let value = value.into();
        if !(0..=0xFF).contains(&value) {
            return Err(RegisterError::OutOfRange { name: self.name, value, max: 0xFF });
        }
        self.high.set(value >> 4)?;
        self.low.set(value & 0x0F)
    }
}

/// The complete register file.
#[derive(Clone, Debug)]
pub struct Registers {
    /// R0-R15
    pub index: [Nibble; INDEX_REGISTERS],
    /// Accumulator
    pub acc: Nibble,
    /// Carry/link flag
    pub carry: Bit,
    /// Program counter
    pub pc: Address,
    /// Data pointer
    pub dp: Byte,
    /// TEST input pin
    pub test: Bit,
}

impl Registers {
    /// Create a register file with every register at zero.
    pub fn new() -> Self {
        Self {
            index: INDEX_NAMES.map(Nibble::new),
            acc: Nibble::new("acc"),
            carry: Bit::new("carry"),
            pc: Address::new("pc"),
            dp: Byte::new("dp"),
            test: Bit::new("test"),
        }
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Index register `n`.
    ///
    /// # Panics
    /// Panics if `n` is not in 0-15.
    #[inline]
    pub fn reg(&self, n: usize) -> &Nibble {
        &self.index[n]
    }

    /// Mutable index register `n`.
    ///
    /// # Panics
    /// Panics if `n` is not in 0-15.
    #[inline]
    pub fn reg_mut(&mut self, n: usize) -> &mut Nibble {
        &mut self.index[n]
    }

    /// Checked variant of [`Registers::reg_mut`].
    pub fn try_reg_mut(&mut self, n: usize) -> Result<&mut Nibble, RegisterError> {
        self.index
            .get_mut(n)
            .ok_or(RegisterError::NoSuchRegister { kind: "index register", index: n })
    }

    /// Value of register pair `p`.
    ///
    /// # Panics
    /// Panics if `p` is not in 0-7.
    pub fn pair_value(&self, p: usize) -> u8 {
        let high = self.index[p * 2].get();
        let low = self.index[p * 2 + 1].get();
        ((high << 4) | low) as u8
    }

    /// Writable view of register pair `p`.
    ///
    /// # Panics
    /// Panics if `p` is not in 0-7.
    pub fn pair(&mut self, p: usize) -> RegisterPair<'_> {
        assert!(p < REGISTER_PAIRS, "register pair {} out of range (0-7)", p);
        let (head, tail) = self.index.split_at_mut(p * 2 + 1);
        RegisterPair {
            name: PAIR_NAMES[p],
            high: &mut head[p * 2],
            low: &mut tail[0],
        }
    }

    /// Checked variant of [`Registers::pair`].
    pub fn try_pair(&mut self, p: usize) -> Result<RegisterPair<'_>, RegisterError> {
        if p >= REGISTER_PAIRS {
            return Err(RegisterError::NoSuchRegister { kind: "register pair", index: p });
        }
        Ok(self.pair(p))
    }

    /// Advance the program counter by one, wrapping at 4096.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc.get();
        self.jump((old + 1) & Address::MAX);
        old
    }

    /// Set the program counter to an absolute address (masked to 12 bits).
    pub fn jump(&mut self, addr: u16) {
        // Masked, so always in range.
        let _ = self.pc.set(addr & Address::MAX);
    }

    /// Replace the low 8 bits of the program counter, keeping the page.
    pub fn jump_in_page(&mut self, low: u8) {
        let page = self.pc.get() & 0x0F00;
        self.jump(page | u16::from(low));
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let regs = Registers::new();
        for n in 0..INDEX_REGISTERS {
            assert_eq!(regs.reg(n).get(), 0);
            assert_eq!(regs.reg(n).name(), INDEX_NAMES[n]);
        }
        for p in 0..REGISTER_PAIRS {
            assert_eq!(regs.pair_value(p), 0);
        }
        assert_eq!(regs.acc.get(), 0);
        assert_eq!(regs.carry.get(), 0);
        assert_eq!(regs.pc.get(), 0);
        assert_eq!(regs.dp.get(), 0);
        assert_eq!(regs.test.get(), 0);
    }

    #[test]
    fn test_pair_splits_into_nibbles() {
        let mut regs = Registers::new();
        regs.reg_mut(0).set(12).unwrap();
        regs.reg_mut(8).set(12).unwrap();
        assert_eq!(regs.reg(0).get(), 12);
        assert_eq!(regs.reg(8).get(), 12);

        regs.pair(1).set(42).unwrap();
        assert_eq!(regs.reg(2).get(), 2);
        assert_eq!(regs.reg(3).get(), 10);
        assert_eq!(regs.pair(1).get(), 42);
        assert_eq!(regs.pair_value(1), 42);
    }

    #[test]
    fn test_pair_rejects_wide_values() {
        let mut regs = Registers::new();
        regs.pair(7).set(0x5A).unwrap();

        let err = regs.pair(7).set(0x100).unwrap_err();
        assert_eq!(err, RegisterError::OutOfRange { name: "p7", value: 0x100, max: 0xFF });
        assert!(regs.pair(7).set(-1).is_err());
        assert_eq!(regs.reg(14).get(), 0x5);
        assert_eq!(regs.reg(15).get(), 0xA);
    }

    #[test]
    fn test_checked_accessors() {
        let mut regs = Registers::new();
        assert!(regs.try_reg_mut(15).is_ok());
        assert_eq!(
            regs.try_reg_mut(16).unwrap_err(),
            RegisterError::NoSuchRegister { kind: "index register", index: 16 }
        );
        assert!(regs.try_pair(7).is_ok());
        assert!(regs.try_pair(8).is_err());
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.pc.set(10).unwrap();
        assert_eq!(regs.advance_pc(), 10);
        assert_eq!(regs.pc.get(), 11);

        regs.pc.set(0xFFF).unwrap();
        regs.advance_pc();
        assert_eq!(regs.pc.get(), 0);
    }

    #[test]
    fn test_jump_in_page() {
        let mut regs = Registers::new();
        regs.pc.set(0x3C4).unwrap();
        regs.jump_in_page(0x12);
        assert_eq!(regs.pc.get(), 0x312);
    }
}
