//! 4004 instruction store.
//!
//! The CPU addresses 4096 bytes of program ROM through its 12-bit program
//! counter. ROM contents are written once, before execution, by the image
//! loader; instructions only ever read it.

use thiserror::Error;

/// The number of bytes the program counter can address.
pub const ROM_SIZE: usize = 4096;

/// Bytes per ROM page.
pub const PAGE_SIZE: usize = 256;

/// Program ROM: 4096 bytes.
#[derive(Clone)]
pub struct Rom {
    bytes: Vec<u8>,
}

impl Rom {
    /// Create a ROM with every byte zero.
    pub fn new() -> Self {
        Self {
            bytes: vec![0; ROM_SIZE],
        }
    }

    /// Read a byte. The address is taken modulo 4096.
    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[usize::from(addr) % ROM_SIZE]
    }

    /// Copy `image` into ROM starting at `start`.
    ///
    /// Fails without writing anything if the image would run past 0xFFF.
    pub fn load_image(&mut self, start: usize, image: &[u8]) -> Result<(), MemoryError> {
        if start >= ROM_SIZE || image.len() > ROM_SIZE - start {
            return Err(MemoryError::ImageOutOfRange {
                start,
                len: image.len(),
            });
        }
        self.bytes[start..start + image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Clear all ROM to zeros.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Dump a range of ROM (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = start.saturating_add(count).min(ROM_SIZE);
        (start.min(end)..end).map(|i| (i, self.bytes[i])).collect()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Rom {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Rom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.bytes.iter().filter(|&&b| b != 0).count();

        f.debug_struct("Rom")
            .field("non_zero_bytes", &non_zero)
            .field("total_bytes", &ROM_SIZE)
            .finish()
    }
}

/// Errors that can occur during ROM operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("image of {len} bytes at 0x{start:03X} does not fit in ROM")]
    ImageOutOfRange { start: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_and_read() {
        let mut rom = Rom::new();
        rom.load_image(0x0B12, &[0x11, 0x23]).unwrap();
        assert_eq!(rom.read(0x0B12), 0x11);
        assert_eq!(rom.read(0x0B13), 0x23);
        assert_eq!(rom.read(0x0B14), 0x00);
    }

    #[test]
    fn test_load_up_to_last_byte() {
        let mut rom = Rom::new();
        rom.load_image(0xFFE, &[1, 2]).unwrap();
        assert_eq!(rom.read(0xFFF), 2);
    }

    #[test]
    fn test_load_out_of_range_writes_nothing() {
        let mut rom = Rom::new();
        let err = rom.load_image(0xFFE, &[1, 2, 3]).unwrap_err();
        assert_eq!(err, MemoryError::ImageOutOfRange { start: 0xFFE, len: 3 });
        assert_eq!(rom.read(0xFFE), 0);
        assert_eq!(rom.read(0xFFF), 0);

        assert!(rom.load_image(ROM_SIZE, &[]).is_err());
    }

    #[test]
    fn test_dump_and_clear() {
        let mut rom = Rom::new();
        rom.load_image(0, &[0xD5, 0xB2]).unwrap();
        assert_eq!(rom.dump(0, 3), vec![(0, 0xD5), (1, 0xB2), (2, 0)]);
        assert_eq!(rom.dump(0xFFE, 10).len(), 2);

        rom.clear();
        assert!(rom.as_slice().iter().all(|&b| b == 0));
    }
}
