//! CPU emulation for the Intel 4004.
//!
//! This module implements the 4004 core:
//! - 4096 bytes of program ROM
//! - 16 four-bit index registers, paired into 8 eight-bit registers
//! - 4-bit accumulator, carry/link flag, 12-bit program counter
//! - 3-level circular return stack

pub mod register;
pub mod registers;
pub mod stack;
pub mod memory;
pub mod decode;
pub mod execute;

pub use register::{Register, RegisterError, Bit, Nibble, Byte, Address};
pub use registers::{Registers, RegisterPair};
pub use stack::ReturnStack;
pub use memory::{Rom, MemoryError};
pub use decode::{Instruction, Condition, OpcodeTable, DecodeError};
pub use execute::{Cpu, CpuError, Snapshot};
