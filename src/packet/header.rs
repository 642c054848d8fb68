//! Fixed 4-byte transport stream packet header.

use bitstream_io::{BigEndian, BitRead, BitReader};

use crate::constants::{TS_HEADER_SIZE, TS_PACKET_SIZE, TS_SYNC_BYTE};
use crate::error::{ensure_len, Result, TsError};

/// Decoded TS packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    /// Packet identifier (13 bits).
    pub pid: u16,
    pub scrambling_control: u8,
    /// Adaptation field control (2 bits).
    pub adaptation_field_control: u8,
    /// Continuity counter (4 bits).
    pub continuity_counter: u8,
}

impl PacketHeader {
    /// Decodes the header at the start of `packet`.
    ///
    /// Stops at the sync byte when it is not 0x47; no other field is read.
    pub fn decode(packet: &[u8]) -> Result<Self> {
        ensure_len(packet, TS_HEADER_SIZE)?;
        if packet[0] != TS_SYNC_BYTE {
            return Err(TsError::InvalidSyncByte(packet[0]));
        }

        let mut br = BitReader::endian(&packet[1..TS_HEADER_SIZE], BigEndian);
        Ok(Self {
            transport_error: br.read_bit()?,
            payload_unit_start: br.read_bit()?,
            transport_priority: br.read_bit()?,
            pid: br.read::<13, u16>()?,
            scrambling_control: br.read::<2, u8>()?,
            adaptation_field_control: br.read::<2, u8>()?,
            continuity_counter: br.read::<4, u8>()?,
        })
    }

    pub fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control & 0x02 != 0
    }

    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control & 0x01 != 0
    }
}

/// The 184 bytes following the header of a full-size packet.
pub fn payload(packet: &[u8]) -> &[u8] {
    &packet[TS_HEADER_SIZE..TS_PACKET_SIZE]
}
