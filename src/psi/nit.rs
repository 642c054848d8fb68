// psi/nit.rs
//! Transport stream loop of a reassembled NIT (actual network, tid 0x40)

use bitstream_io::{BigEndian, BitRead, BitReader};

use crate::constants::TS_ENTRY_FIXED_SIZE;
use crate::error::{ensure_len, Result};
use crate::psi::descriptor::{parse_satellite_delivery, parse_service_list};
use crate::psi::section::SectionHeader;
use crate::types::TransportStreamEntry;

/// Walks the transport stream loop of the section held in `payload`.
///
/// `payload` is the assembled buffer starting with the pointer field. Every
/// entry must carry a service list descriptor followed by a satellite
/// delivery system descriptor; one bad entry fails the whole loop.
pub fn parse_entries(payload: &[u8], header: &SectionHeader) -> Result<Vec<TransportStreamEntry>> {
    let start = header.entries_offset();
    let end = start + header.transport_stream_loop_length(payload)? as usize;
    ensure_len(payload, end)?;

    let mut entries = Vec::new();
    let mut pos = start;
    while pos < end {
        let entry = parse_entry(&payload[pos..end])?;
        pos += entry.size();
        entries.push(entry);
    }
    Ok(entries)
}

fn parse_entry(buf: &[u8]) -> Result<TransportStreamEntry> {
    ensure_len(buf, TS_ENTRY_FIXED_SIZE)?;

    let mut br = BitReader::endian(&buf[..TS_ENTRY_FIXED_SIZE], BigEndian);
    let transport_stream_id = br.read::<16, u16>()?;
    let original_network_id = br.read::<16, u16>()?;
    br.skip(4)?;
    let transport_descriptors_length = br.read::<12, u16>()?;

    let descriptors = &buf[TS_ENTRY_FIXED_SIZE..];
    ensure_len(descriptors, transport_descriptors_length as usize)?;
    let descriptors = &descriptors[..transport_descriptors_length as usize];

    let (service_list, used) = parse_service_list(descriptors)?;
    let (delivery_system, _) = parse_satellite_delivery(&descriptors[used..])?;

    Ok(TransportStreamEntry {
        transport_stream_id,
        original_network_id,
        transport_descriptors_length,
        service_list,
        delivery_system,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TsError;
    use assert_matches::assert_matches;
    use hex_literal::hex;

    // BS1 TS0 and BS1 TS1, no network descriptors
    const SECTION: [u8; 65] = hex!(
        "00"
        "40 F0 3D 00 04 C3 00 00 F0 00 F0 30"
        "40 10 00 04 F0 12"
        "41 03 00 65 01"
        "43 0B 01 17 27 48 01 10 88 02 88 60 08"
        "40 11 00 04 F0 12"
        "41 03 00 67 01"
        "43 0B 01 17 27 48 01 10 88 02 88 60 08"
        "00 00 00 00"
    );

    #[test]
    fn walks_every_entry() {
        let header = SectionHeader::decode(&SECTION).unwrap();
        let entries = parse_entries(&SECTION, &header).unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].transport_stream_id, 0x4010);
        assert_eq!(entries[0].original_network_id, 0x0004);
        assert_eq!(entries[0].transport_descriptors_length, 0x12);
        assert_eq!(entries[0].size(), 24);
        assert_eq!(entries[0].service_list.services[0].service_id, 0x0065);
        assert_eq!(entries[0].delivery_system.frequency, 1_172_748);

        assert_eq!(entries[1].transport_stream_id, 0x4011);
        assert_eq!(entries[1].service_list.services[0].service_id, 0x0067);
    }

    #[test]
    fn descriptor_order_is_fixed() {
        let mut swapped = SECTION;
        swapped[19] = 0x43;
        let header = SectionHeader::decode(&swapped).unwrap();
        assert_matches!(
            parse_entries(&swapped, &header),
            Err(TsError::UnexpectedDescriptorTag { expected: 0x41, .. })
        );
    }

    #[test]
    fn descriptors_may_not_cross_entry() {
        // first entry claims 0x11 descriptor bytes, cutting the delivery descriptor
        let mut short = SECTION;
        short[18] = 0x11;
        let header = SectionHeader::decode(&short).unwrap();
        assert_matches!(parse_entries(&short, &header), Err(TsError::InsufficientData { .. }));
    }

    #[test]
    fn empty_loop_yields_nothing() {
        let section = hex!("00 40 F0 0D 00 04 C3 00 00 F0 00 F0 00 00 00 00 00");
        let header = SectionHeader::decode(&section).unwrap();
        assert!(parse_entries(&section, &header).unwrap().is_empty());
    }

    #[test]
    fn overlong_loop_fails_the_section() {
        let mut long = SECTION;
        long[12] = 0x40;
        let header = SectionHeader::decode(&long).unwrap();
        assert_matches!(parse_entries(&long, &header), Err(TsError::MalformedSection(_)));
    }
}
