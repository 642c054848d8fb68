// psi/descriptor.rs
//! Descriptors carried in the NIT transport stream loop.

use crate::constants::{SATELLITE_DELIVERY_DESCRIPTOR_TAG, SERVICE_LIST_DESCRIPTOR_TAG};
use crate::error::{ensure_len, Result, TsError};
use crate::types::{SatelliteDeliverySystem, ServiceListDescriptor, ServiceListEntry};

/// tag + length
const DESCRIPTOR_HEADER_SIZE: usize = 2;
const SERVICE_RECORD_SIZE: usize = 3;
const SATELLITE_DELIVERY_BODY_SIZE: usize = 11;

/// Decodes packed BCD, two digits per byte, high nibble first.
pub fn decode_packed_decimal(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| {
        acc * 100 + ((b >> 4) as u32) * 10 + (b & 0x0F) as u32
    })
}

/// Checks the tag and returns the descriptor body.
fn descriptor_body(buf: &[u8], tag: u8) -> Result<&[u8]> {
    ensure_len(buf, DESCRIPTOR_HEADER_SIZE)?;
    if buf[0] != tag {
        return Err(TsError::UnexpectedDescriptorTag {
            expected: tag,
            actual: buf[0],
        });
    }
    let len = buf[1] as usize;
    ensure_len(buf, DESCRIPTOR_HEADER_SIZE + len)?;
    Ok(&buf[DESCRIPTOR_HEADER_SIZE..DESCRIPTOR_HEADER_SIZE + len])
}

/// Parses a service list descriptor (0x41) at the start of `buf`.
///
/// Returns the descriptor and the number of bytes it occupies.
pub fn parse_service_list(buf: &[u8]) -> Result<(ServiceListDescriptor, usize)> {
    let body = descriptor_body(buf, SERVICE_LIST_DESCRIPTOR_TAG)?;
    if body.len() % SERVICE_RECORD_SIZE != 0 {
        return Err(TsError::MalformedDescriptor(
            "service list length is not a multiple of 3",
        ));
    }

    let services = body
        .chunks_exact(SERVICE_RECORD_SIZE)
        .map(|r| ServiceListEntry {
            service_id: ((r[0] as u16 & 0x0F) << 8) | r[1] as u16,
            service_type: r[2],
        })
        .collect();

    Ok((
        ServiceListDescriptor { services },
        DESCRIPTOR_HEADER_SIZE + body.len(),
    ))
}

/// Parses a satellite delivery system descriptor (0x43) at the start of `buf`.
pub fn parse_satellite_delivery(buf: &[u8]) -> Result<(SatelliteDeliverySystem, usize)> {
    let body = descriptor_body(buf, SATELLITE_DELIVERY_DESCRIPTOR_TAG)?;
    if body.len() < SATELLITE_DELIVERY_BODY_SIZE {
        return Err(TsError::MalformedDescriptor(
            "satellite delivery system descriptor shorter than 11 bytes",
        ));
    }

    let flags = body[6];
    let delivery = SatelliteDeliverySystem {
        frequency: decode_packed_decimal(&body[0..4]),
        orbital_position: decode_packed_decimal(&body[4..6]) as u16,
        west_east_flag: flags & 0x80 != 0,
        polarisation: (flags & 0x60) >> 5,
        modulation: flags & 0x1F,
        // the last nibble is FEC_inner; it is kept in the BCD value as well
        symbol_rate: decode_packed_decimal(&body[7..11]),
        fec_inner: body[10] & 0x0F,
    };

    Ok((delivery, DESCRIPTOR_HEADER_SIZE + body.len()))
}
