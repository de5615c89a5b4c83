//! Return address stack.
//!
//! The 4004 keeps subroutine return addresses in three 12-bit registers on
//! the chip. They behave as a ring: a fourth nested call silently overwrites
//! the oldest entry, and popping an empty stack just yields whatever the
//! slot holds.

use super::register::{Address, RegisterError};

/// Number of return address slots.
pub const STACK_DEPTH: usize = 3;

/// Three-slot circular return stack.
#[derive(Clone, Debug)]
pub struct ReturnStack {
    slots: [Address; STACK_DEPTH],
    cursor: usize,
}

impl ReturnStack {
    pub fn new() -> Self {
        Self {
            slots: [
                Address::new("stack0"),
                Address::new("stack1"),
                Address::new("stack2"),
            ],
            cursor: 0,
        }
    }

    /// Write `addr` at the cursor and advance it.
    pub fn push<V: Into<i64>>(&mut self, addr: V) -> Result<(), RegisterError> {
        self.slots[self.cursor].set(addr)?;
        self.cursor = (self.cursor + 1) % STACK_DEPTH;
        Ok(())
    }

    /// Step the cursor back and return the slot it lands on.
    pub fn pop(&mut self) -> u16 {
        self.cursor = (self.cursor + STACK_DEPTH - 1) % STACK_DEPTH;
        self.slots[self.cursor].get()
    }

    /// Index of the slot the next push writes to.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Slot `n`.
    ///
    /// # Panics
    /// Panics if `n` is not in 0-2.
    #[inline]
    pub fn slot(&self, n: usize) -> &Address {
        &self.slots[n]
    }

    /// Mutable slot `n`, for harnesses that preset the stack.
    pub fn slot_mut(&mut self, n: usize) -> Result<&mut Address, RegisterError> {
        self.slots
            .get_mut(n)
            .ok_or(RegisterError::NoSuchRegister { kind: "stack slot", index: n })
    }

    /// All slot values in slot order.
    pub fn values(&self) -> [u16; STACK_DEPTH] {
        self.slots.map(|slot| slot.get())
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for ReturnStack {
    fn default() -> Self {
        Self::new()
    }
}
