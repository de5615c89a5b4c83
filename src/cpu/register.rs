//! Fixed-width registers.
//!
//! Every architectural register of the 4004 is a [`Register`] with a bit
//! width fixed at compile time. Writes are range checked against that width
//! and a rejected write leaves the previous value in place.

use thiserror::Error;

/// A register holding an unsigned value of exactly `BITS` bits.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Register<const BITS: u32> {
    name: &'static str,
    value: u16,
}

/// The carry/link flag and the test pin.
pub type Bit = Register<1>;
/// Accumulator and index registers.
pub type Nibble = Register<4>;
/// The data pointer.
pub type Byte = Register<8>;
/// Program counter and return stack slots.
pub type Address = Register<12>;

impl<const BITS: u32> Register<BITS> {
    /// Largest value the register can hold.
    pub const MAX: u16 = ((1u32 << BITS) - 1) as u16;

    /// Create a register holding zero.
    ///
    /// # Panics
    /// Panics if `name` is empty.
    pub fn new(name: &'static str) -> Self {
        assert!(!name.is_empty(), "register name must not be empty");
        Self { name, value: 0 }
    }

    /// Create a register with an explicit initial value.
    pub fn with_value<V: Into<i64>>(name: &'static str, value: V) -> Result<Self, RegisterError> {
        let mut reg = Self::new(name);
        reg.set(value)?;
        Ok(reg)
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub const fn width(&self) -> u32 {
        BITS
    }

    #[inline]
    pub const fn max(&self) -> u16 {
        Self::MAX
    }

    #[inline]
    pub fn get(&self) -> u16 {
        self.value
    }

    /// Write a new value.
    ///
    /// Fails without touching the register if `value` does not fit in
    /// `BITS` bits.
    pub fn set<V: Into<i64>>(&mut self, value: V) -> Result<(), RegisterError> {
        let value = value.into();
        if value < 0 || value > i64::from(Self::MAX) {
            return Err(RegisterError::OutOfRange {
                name: self.name,
                value,
                max: Self::MAX,
            });
        }
        self.value = value as u16;
        Ok(())
    }

    /// `set(get() + 1)`. Fails at the maximum instead of wrapping.
    pub fn increment(&mut self) -> Result<(), RegisterError> {
        self.set(i64::from(self.value) + 1)
    }

    /// `set(get() - 1)`. Fails at zero instead of wrapping.
    pub fn decrement(&mut self) -> Result<(), RegisterError> {
        self.set(i64::from(self.value) - 1)
    }

    /// Bitwise complement over exactly `BITS` bits.
    pub fn get_inverted(&self) -> u16 {
        let mut out = 0u16;
        for bit in 0..BITS {
            if self.value & (1 << bit) == 0 {
                out |= 1 << bit;
            }
        }
        out
    }
}

impl<const BITS: u32> std::fmt::Debug for Register<BITS> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = BITS.div_ceil(4) as usize;
        write!(f, "{}={:0width$X}", self.name, self.value, width = digits)
    }
}

/// Errors raised by register access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("value {value} out of range for register {name} (0-{max})")]
    OutOfRange { name: &'static str, value: i64, max: u16 },

    #[error("no {kind} numbered {index}")]
    NoSuchRegister { kind: &'static str, index: usize },
}
