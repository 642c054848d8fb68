use std::path::PathBuf;

use serde::Serialize;

use crate::constants::{BS_NETWORK_ID, NIT_ACTUAL_TABLE_ID, NIT_PID, READ_BUFFER_SIZE};
use crate::registry::SortMethod;
use crate::report::Format;

/// One record of a service list descriptor (tag 0x41)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceListEntry {
    /// Only the low 12 bits are carried by the descriptor
    pub service_id: u16,
    pub service_type: u8,
}

/// Service list descriptor (tag 0x41)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceListDescriptor {
    pub services: Vec<ServiceListEntry>,
}

/// Satellite delivery system descriptor (tag 0x43), BCD fields already
/// converted to decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SatelliteDeliverySystem {
    /// 10 kHz units (1172748 → 11.72748 GHz)
    pub frequency: u32,
    /// 0.1 degree units
    pub orbital_position: u16,
    pub west_east_flag: bool,
    pub polarisation: u8,
    pub modulation: u8,
    pub symbol_rate: u32,
    pub fec_inner: u8,
}

/// One iteration of the NIT transport stream loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportStreamEntry {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub transport_descriptors_length: u16,
    pub service_list: ServiceListDescriptor,
    pub delivery_system: SatelliteDeliverySystem,
}

impl TransportStreamEntry {
    /// Bytes occupied by this entry inside the transport stream loop
    pub fn size(&self) -> usize {
        crate::constants::TS_ENTRY_FIXED_SIZE + self.transport_descriptors_length as usize
    }
}

/// Which packets and sections the assembler accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanConfig {
    pub nit_pid: u16,
    pub table_id: u8,
    pub network_id: u16,
    /// Reject completed sections whose CRC-32 does not match
    pub verify_crc: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            nit_pid: NIT_PID,
            table_id: NIT_ACTUAL_TABLE_ID,
            network_id: BS_NETWORK_ID,
            verify_crc: true,
        }
    }
}

/// Configuration options for a scan run
#[derive(Debug, Clone)]
pub struct Options {
    /// `-` reads stdin
    pub input: PathBuf,
    /// `None` picks the format's default file name, `-` writes stdout
    pub output: Option<PathBuf>,
    pub format: Format,
    /// `None` uses the format's default ordering
    pub sort: Option<SortMethod>,
    pub read_buffer_size: usize,
    pub scan: ScanConfig,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            input: PathBuf::from("-"),
            output: None,
            format: Format::Json,
            sort: None,
            read_buffer_size: READ_BUFFER_SIZE,
            scan: ScanConfig::default(),
        }
    }
}
