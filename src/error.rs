//! Error types for packet, section and descriptor decoding.

use thiserror::Error;

/// Errors raised while decoding transport stream structures.
///
/// None of these are fatal for a scan: the assembler absorbs them by
/// resetting and waiting for the next start packet.
#[derive(Error, Debug)]
pub enum TsError {
    /// First byte of a packet is not 0x47.
    #[error("Invalid sync byte: 0x{0:02X}")]
    InvalidSyncByte(u8),

    /// Buffer ends before the structure does.
    #[error("Insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Unexpected descriptor tag: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedDescriptorTag { expected: u8, actual: u8 },

    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(&'static str),

    #[error("Malformed section: {0}")]
    MalformedSection(&'static str),

    #[error("CRC-32 mismatch: expected 0x{expected:08X}, calculated 0x{actual:08X}")]
    CrcMismatch { expected: u32, actual: u32 },

    /// Raised by the bit reader when it runs past the end of its slice.
    #[error("Bit reader error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, TsError>;

/// Fails with [`TsError::InsufficientData`] unless `buf` holds `expected` bytes.
pub(crate) fn ensure_len(buf: &[u8], expected: usize) -> Result<()> {
    if buf.len() < expected {
        return Err(TsError::InsufficientData {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}
