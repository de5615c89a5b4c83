//! # MCS-4 Emulator
//!
//! An instruction-set simulator for the Intel 4004, the 4-bit CPU of the
//! MCS-4 chip family.
//!
//! The emulator executes one instruction per [`Cpu::step`] against a
//! 4096-byte program ROM. Behaviour follows the instruction semantics
//! instruction by instruction; bus cycles, timing and the RAM/ROM I/O ports
//! are not modelled.

pub mod cpu;
pub mod image;
pub mod config;

// Re-export commonly used types
pub use cpu::{Cpu, CpuError, Instruction, Registers, ReturnStack, Rom, Snapshot};
pub use image::{load_image, save_image, parse_image, RomImage, ImageError};
pub use config::{RunConfig, ConfigError};
