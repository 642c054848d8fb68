// psi/section.rs
//! NIT section header as it appears in the first packet of an edition, plus
//! loop length and CRC-32 (MPEG-2) checks on the reassembled section.

use bitstream_io::{BigEndian, BitRead, BitReader};
use crc::{Crc, CRC_32_MPEG_2};
use serde::Serialize;

use crate::constants::{CRC32_SIZE, NIT_FIXED_HEADER_SIZE, SECTION_PREFIX_SIZE, TS_PAYLOAD_SIZE};
use crate::error::{ensure_len, Result, TsError};

const CRC_MPEG: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// network_id through last_section_number, plus the loop length field
const LENGTH_COVERED_HEADER: usize = NIT_FIXED_HEADER_SIZE - SECTION_PREFIX_SIZE + 2;

/// Fixed part of a NIT section, decoded from a payload that starts with the
/// pointer field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionHeader {
    pub pointer_field: u8,
    pub table_id: u8,
    pub section_syntax_indicator: bool,
    /// Bytes following the length field, CRC included (12 bits)
    pub section_length: u16,
    pub network_id: u16,
    pub version: u8,
    pub current_next: bool,
    pub section_number: u8,
    pub last_section_number: u8,
    pub network_descriptors_length: u16,
}

impl SectionHeader {
    /// Decodes the header from a packet payload (pointer field first).
    ///
    /// Only the fixed 10 bytes up to network_descriptors_length have to be
    /// present. The network descriptors may run into later packets.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        ensure_len(payload, 1)?;
        let pointer_field = payload[0];
        let start = 1 + pointer_field as usize;
        ensure_len(payload, start + NIT_FIXED_HEADER_SIZE)?;

        let mut br = BitReader::endian(&payload[start..], BigEndian);
        let table_id = br.read::<8, u8>()?;
        let section_syntax_indicator = br.read_bit()?;
        br.skip(3)?; // reserved_future_use + reserved
        let section_length = br.read::<12, u16>()?;
        let network_id = br.read::<16, u16>()?;
        br.skip(2)?;
        let version = br.read::<5, u8>()?;
        let current_next = br.read_bit()?;
        let section_number = br.read::<8, u8>()?;
        let last_section_number = br.read::<8, u8>()?;
        br.skip(4)?;
        let network_descriptors_length = br.read::<12, u16>()?;

        let required = LENGTH_COVERED_HEADER + network_descriptors_length as usize + CRC32_SIZE;
        if (section_length as usize) < required {
            return Err(TsError::MalformedSection("network descriptors overrun section"));
        }

        Ok(Self {
            pointer_field,
            table_id,
            section_syntax_indicator,
            section_length,
            network_id,
            version,
            current_next,
            section_number,
            last_section_number,
            network_descriptors_length,
        })
    }

    /// Reads transport_stream_loop_length from the assembled section.
    ///
    /// Fails when the declared loop would overrun the section's own length.
    pub fn transport_stream_loop_length(&self, payload: &[u8]) -> Result<u16> {
        let at = self.entries_offset() - 2;
        ensure_len(payload, at + 2)?;
        let mut br = BitReader::endian(&payload[at..at + 2], BigEndian);
        br.skip(4)?;
        let loop_length = br.read::<12, u16>()?;

        let required = LENGTH_COVERED_HEADER
            + self.network_descriptors_length as usize
            + loop_length as usize
            + CRC32_SIZE;
        if (self.section_length as usize) < required {
            return Err(TsError::MalformedSection("transport stream loop overruns section"));
        }
        Ok(loop_length)
    }

    /// Offset of table_id inside the first payload.
    pub fn section_offset(&self) -> usize {
        1 + self.pointer_field as usize
    }

    /// Offset of the first transport stream entry in the assembled payload.
    pub fn entries_offset(&self) -> usize {
        self.section_offset()
            + NIT_FIXED_HEADER_SIZE
            + self.network_descriptors_length as usize
            + 2
    }

    /// Offset one past the CRC.
    pub fn section_end(&self) -> usize {
        self.section_offset() + SECTION_PREFIX_SIZE + self.section_length as usize
    }

    /// Packets needed to carry the section, counted from the pointer field.
    pub fn total_packets(&self) -> usize {
        self.section_end().div_ceil(TS_PAYLOAD_SIZE)
    }

    /// Checks the trailing CRC-32 of the section held in `payload`.
    pub fn verify_crc(&self, payload: &[u8]) -> Result<()> {
        let end = self.section_end();
        ensure_len(payload, end)?;

        let crc_at = end - CRC32_SIZE;
        let actual = CRC_MPEG.checksum(&payload[self.section_offset()..crc_at]);
        let expected = u32::from_be_bytes([
            payload[crc_at],
            payload[crc_at + 1],
            payload[crc_at + 2],
            payload[crc_at + 3],
        ]);
        if actual != expected {
            return Err(TsError::CrcMismatch { expected, actual });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use hex_literal::hex;

    // pointer 0, NIT actual, section_length 0x11, network 0x0004, version 3,
    // no network descriptors, one empty 4-byte loop
    const SMALL: [u8; 21] = hex!(
        "00"
        "40 F0 11 00 04 C7 00 00 F0 00 F0 04"
        "40 10 00 04"
        "00 00 00 00"
    );

    #[test]
    fn decodes_fixed_fields() {
        let header = SectionHeader::decode(&SMALL).unwrap();
        assert_eq!(header.table_id, 0x40);
        assert!(header.section_syntax_indicator);
        assert_eq!(header.section_length, 0x11);
        assert_eq!(header.network_id, 0x0004);
        assert_eq!(header.version, 3);
        assert!(header.current_next);
        assert_eq!(header.network_descriptors_length, 0);
        assert_eq!(header.transport_stream_loop_length(&SMALL).unwrap(), 4);
    }

    #[test]
    fn loop_length_may_follow_the_first_packet() {
        // 200 bytes of network descriptors push the loop length past 184
        let mut section = vec![0x00, 0x40, 0xF0, 0xD5, 0x00, 0x04, 0xC7, 0x00, 0x00, 0xF0, 0xC8];
        section.extend(std::iter::repeat_n(0x20, 200));
        section.extend_from_slice(&hex!("F0 00 00 00 00 00"));

        let header = SectionHeader::decode(&section[..TS_PAYLOAD_SIZE]).unwrap();
        assert_eq!(header.entries_offset(), 213);
        assert_eq!(header.total_packets(), 2);
        assert_eq!(header.transport_stream_loop_length(&section).unwrap(), 0);
    }

    #[test]
    fn offsets_follow_pointer_field() {
        let mut shifted = vec![0x02, 0xAA, 0xBB];
        shifted.extend_from_slice(&SMALL[1..]);
        let header = SectionHeader::decode(&shifted).unwrap();
        assert_eq!(header.section_offset(), 3);
        assert_eq!(header.entries_offset(), 15);
        assert_eq!(header.section_end(), 3 + 3 + 0x11);
        assert_eq!(header.total_packets(), 1);
    }

    #[test]
    fn packet_count_includes_pointer_and_crc() {
        let mut header = SectionHeader::decode(&SMALL).unwrap();
        // 1 + 3 + 180 = 184 fits exactly
        header.section_length = 180;
        assert_eq!(header.total_packets(), 1);
        header.section_length = 181;
        assert_eq!(header.total_packets(), 2);
        header.pointer_field = 1;
        header.section_length = 180;
        assert_eq!(header.total_packets(), 2);
    }

    #[test]
    fn loop_length_beyond_section_is_rejected() {
        let mut bad = SMALL;
        bad[12] = 0x10; // loop length 0x10 > section
        let header = SectionHeader::decode(&bad).unwrap();
        assert_matches!(
            header.transport_stream_loop_length(&bad),
            Err(TsError::MalformedSection(_))
        );

        bad[10] = 0x08; // network descriptors alone overrun
        assert_matches!(SectionHeader::decode(&bad), Err(TsError::MalformedSection(_)));
    }

    #[test]
    fn truncated_header_is_insufficient() {
        assert_matches!(
            SectionHeader::decode(&SMALL[..8]),
            Err(TsError::InsufficientData { .. })
        );
        // pointer field pointing past the payload
        assert_matches!(
            SectionHeader::decode(&hex!("B7 40")),
            Err(TsError::InsufficientData { .. })
        );
    }

    #[test]
    fn crc_is_checked_over_section() {
        let mut section = SMALL.to_vec();
        let crc = CRC_MPEG.checksum(&section[1..17]);
        section[17..21].copy_from_slice(&crc.to_be_bytes());
        let header = SectionHeader::decode(&section).unwrap();
        assert!(header.verify_crc(&section).is_ok());

        section[14] ^= 0x01;
        assert_matches!(header.verify_crc(&section), Err(TsError::CrcMismatch { .. }));
    }
}
