//! Constants for MPEG-TS packetization and the ISDB-S network information table

/// MPEG-TS packet constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const TS_PAYLOAD_SIZE: usize = TS_PACKET_SIZE - TS_HEADER_SIZE; // 184
pub const TS_SYNC_BYTE: u8 = 0x47;

/// Bytes that must be buffered before the synchronizer scans anything
pub const SYNC_WINDOW: usize = TS_PACKET_SIZE * 2;

/// Default read size for the CLI input loop
pub const READ_BUFFER_SIZE: usize = TS_PACKET_SIZE * 1024;

/// PSI / SI identifiers
pub const NIT_PID: u16 = 0x0010;
pub const NIT_ACTUAL_TABLE_ID: u8 = 0x40;
/// network_id of the BS/CS110 digital network
pub const BS_NETWORK_ID: u16 = 0x0004;

/// Bytes from table_id through network_descriptors_length
pub const NIT_FIXED_HEADER_SIZE: usize = 10;
/// table_id + section_syntax_indicator/section_length
pub const SECTION_PREFIX_SIZE: usize = 3;
pub const CRC32_SIZE: usize = 4;

/// Descriptor tags
pub const SERVICE_LIST_DESCRIPTOR_TAG: u8 = 0x41;
pub const SATELLITE_DELIVERY_DESCRIPTOR_TAG: u8 = 0x43;

/// transport_stream_id, original_network_id, transport_descriptors_length
pub const TS_ENTRY_FIXED_SIZE: usize = 6;

/// Marks an empty relative-TS slot in the channel registry
pub const INVALID_TSID: u16 = 0xFFFF;
pub const RELATIVE_TS_SLOTS: usize = 8;

/// Transponder plan (kHz)
pub const BS_TRANSPONDERS: usize = 12;
pub const CS_TRANSPONDERS: usize = 12;
pub const BS_BASE_FREQUENCY_KHZ: u32 = 11_727_480;
pub const BS_CHANNEL_STEP_KHZ: u32 = 38_360;
pub const CS_BASE_FREQUENCY_KHZ: u32 = 12_291_000;
pub const CS_CHANNEL_STEP_KHZ: u32 = 40_000;
pub const LNB_LOCAL_FREQUENCY_KHZ: u32 = 10_678_000;

/// CS110 transport stream ids that never appear in a BS capture
pub const CS_PRESET_TSIDS: &[u16] = &[
    0x6020, 0x7040, 0x7060, 0x6080, 0x60A0, 0x70C0,
    0x70E0, 0x7100, 0x7120, 0x7140, 0x7160, 0x7180,
];
