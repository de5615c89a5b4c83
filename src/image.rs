//! ROM image files.
//!
//! Two formats are accepted:
//! - raw binary (`.bin`): the file bytes are the ROM bytes
//! - hex text (anything else): whitespace-separated two-digit hex bytes,
//!   `;` starts a comment that runs to the end of the line

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

/// A loaded ROM image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RomImage {
    /// Image bytes, in address order.
    pub bytes: Vec<u8>,
}

impl RomImage {
    /// Create a new empty image.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Get the number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for RomImage {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

/// Load an image from disk, choosing the format by extension.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RomImage, ImageError> {
    let path = path.as_ref();
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("bin")) {
        let bytes = std::fs::read(path).map_err(|e| ImageError::IoError(e.to_string()))?;
        return Ok(RomImage::from(bytes));
    }

    let file = std::fs::File::open(path).map_err(|e| ImageError::IoError(e.to_string()))?;
    parse_image(BufReader::new(file))
}

/// Parse the hex text format.
pub fn parse_image<R: BufRead>(reader: R) -> Result<RomImage, ImageError> {
    let mut image = RomImage::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| ImageError::IoError(e.to_string()))?;
        let code = line.split(';').next().unwrap_or("");

        for token in code.split_whitespace() {
            let token = token.trim_start_matches("0x").trim_start_matches("0X");
            if token.len() != 2 {
                return Err(ImageError::ParseError {
                    line: line_num + 1,
                    message: format!("expected two hex digits, found '{}'", token),
                });
            }
            let byte = u8::from_str_radix(token, 16).map_err(|e| ImageError::ParseError {
                line: line_num + 1,
                message: format!("'{}': {}", token, e),
            })?;
            image.push(byte);
        }
    }

    Ok(image)
}

/// Save an image in the hex text format, 16 bytes per line.
pub fn save_image<P: AsRef<Path>>(path: P, image: &RomImage) -> Result<(), ImageError> {
    let mut file =
        std::fs::File::create(path.as_ref()).map_err(|e| ImageError::IoError(e.to_string()))?;
    write_image(&mut file, image)
}

/// Write the hex text format to any writer.
pub fn write_image<W: Write>(out: &mut W, image: &RomImage) -> Result<(), ImageError> {
    let io = |e: std::io::Error| ImageError::IoError(e.to_string());

    writeln!(out, "; 4004 ROM image").map_err(io)?;
    writeln!(out, "; {} bytes", image.len()).map_err(io)?;

    for (row, chunk) in image.bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        writeln!(out, "{} ; {:03X}", hex.join(" "), row * 16).map_err(io)?;
    }

    Ok(())
}

/// Errors that can occur while reading or writing images.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}
