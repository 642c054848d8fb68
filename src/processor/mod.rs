//! NIT section reassembly across TS packets

use thiserror::Error;

use crate::constants::{TS_PACKET_SIZE, TS_PAYLOAD_SIZE};
use crate::error::TsError;
use crate::packet::{payload, PacketHeader, PacketSynchronizer};
use crate::psi::{parse_entries, SectionHeader};
use crate::types::{ScanConfig, TransportStreamEntry};

/// Why an edition in progress was thrown away
#[derive(Error, Debug)]
pub enum ProtocolViolation {
    /// Gap, duplicate or reordering on the NIT PID
    #[error("continuity counter {actual} where {expected} was expected")]
    ContinuityMismatch { expected: u8, actual: u8 },

    /// NIT packet that cannot continue a section
    #[error("unexpected packet: {0}")]
    UnexpectedPacket(&'static str),

    /// Completed section failed its CRC or entry parse
    #[error("invalid section")]
    InvalidSection(#[source] TsError),
}

/// An edition being collected
#[derive(Debug, Clone)]
pub struct Accumulation {
    pub header: SectionHeader,
    pub total_packets: usize,
    pub received: usize,
    pub start_cc: u8,
    /// Exactly `total_packets * 184` bytes
    pub payload: Vec<u8>,
    /// Header of the last completed edition
    pub previous: Option<SectionHeader>,
}

impl Accumulation {
    fn expected_cc(&self) -> u8 {
        ((self.start_cc as usize + self.received) % 16) as u8
    }

    fn is_complete(&self) -> bool {
        self.received == self.total_packets
    }
}

/// A parsed edition
#[derive(Debug, Clone)]
pub struct CompletedSection {
    pub header: SectionHeader,
    pub payload: Vec<u8>,
    pub entries: Vec<TransportStreamEntry>,
}

#[derive(Debug, Clone)]
pub enum AssemblerState {
    /// Waiting for a start packet; `settled` is the last completed edition
    Empty { settled: Option<SectionHeader> },
    Accumulating(Accumulation),
    Complete(CompletedSection),
}

impl AssemblerState {
    fn settled(&self) -> Option<&SectionHeader> {
        match self {
            AssemblerState::Empty { settled } => settled.as_ref(),
            AssemblerState::Accumulating(acc) => acc.previous.as_ref(),
            AssemblerState::Complete(section) => Some(&section.header),
        }
    }
}

impl Default for AssemblerState {
    fn default() -> Self {
        AssemblerState::Empty { settled: None }
    }
}

#[derive(Debug)]
pub enum AssemblerEvent {
    /// A new edition was reassembled and parsed
    Completed(Vec<TransportStreamEntry>),
    /// Start packet of the edition already held
    Repeat { version: u8 },
    /// The edition in progress was dropped
    Discarded(ProtocolViolation),
}

type Step = (AssemblerState, Option<AssemblerEvent>);

/// Feeds aligned TS packets through the Empty / Accumulating / Complete
/// state machine.
pub struct SectionAssembler {
    config: ScanConfig,
    state: AssemblerState,
}

impl SectionAssembler {
    pub fn new(config: ScanConfig) -> Self {
        Self::with_state(config, AssemblerState::default())
    }

    pub fn with_state(config: ScanConfig, state: AssemblerState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn state(&self) -> &AssemblerState {
        &self.state
    }

    /// Entries of the edition held in `Complete`, if any.
    pub fn entries(&self) -> Option<&[TransportStreamEntry]> {
        match &self.state {
            AssemblerState::Complete(section) => Some(&section.entries),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = AssemblerState::default();
    }

    /// Process a single 188-byte packet
    pub fn push_packet(&mut self, packet: &[u8]) -> Option<AssemblerEvent> {
        if packet.len() < TS_PACKET_SIZE {
            log::trace!("short packet ({} bytes) skipped", packet.len());
            return None;
        }
        let header = match PacketHeader::decode(packet) {
            Ok(h) => h,
            Err(e) => {
                log::trace!("packet skipped: {e}");
                return None;
            }
        };
        if header.pid != self.config.nit_pid {
            return None;
        }

        let payload = payload(packet);
        let (state, event) = match std::mem::take(&mut self.state) {
            AssemblerState::Accumulating(acc) => match qualify(&self.config, &header, payload) {
                // a new edition starts over whatever was being collected
                Some(next) if next.version != acc.header.version => {
                    log::debug!(
                        "NIT version {} superseded by {} after {}/{} packets",
                        acc.header.version,
                        next.version,
                        acc.received,
                        acc.total_packets
                    );
                    let state = AssemblerState::Empty { settled: acc.previous };
                    start_section(&self.config, state, &header, payload)
                }
                _ => continue_section(&self.config, acc, &header, payload),
            },
            other => start_section(&self.config, other, &header, payload),
        };
        self.state = state;
        event
    }
}

/// Header of a start packet that opens an edition, or `None`.
fn qualify(config: &ScanConfig, header: &PacketHeader, payload: &[u8]) -> Option<SectionHeader> {
    if header.transport_error
        || header.has_adaptation_field()
        || !header.has_payload()
        || !header.payload_unit_start
    {
        return None;
    }
    let section = match SectionHeader::decode(payload) {
        Ok(s) => s,
        Err(e) => {
            log::trace!("NIT start packet without a usable header: {e}");
            return None;
        }
    };
    if section.table_id != config.table_id
        || !section.current_next
        || section.network_id != config.network_id
    {
        log::trace!(
            "NIT section skipped (table 0x{:02X}, network 0x{:04X}, current {})",
            section.table_id,
            section.network_id,
            section.current_next
        );
        return None;
    }
    Some(section)
}

fn start_section(
    config: &ScanConfig,
    state: AssemblerState,
    header: &PacketHeader,
    payload: &[u8],
) -> Step {
    let Some(section) = qualify(config, header, payload) else {
        return (state, None);
    };

    let previous = state.settled().cloned();
    if previous.as_ref().map(|h| h.version) == Some(section.version) {
        log::trace!("NIT version {} repeated", section.version);
        let version = section.version;
        return (state, Some(AssemblerEvent::Repeat { version }));
    }

    let total_packets = section.total_packets();
    log::debug!(
        "NIT version {} started: {} packet(s), cc {}",
        section.version,
        total_packets,
        header.continuity_counter
    );

    let mut buffer = vec![0u8; total_packets * TS_PAYLOAD_SIZE];
    buffer[..TS_PAYLOAD_SIZE].copy_from_slice(payload);
    let acc = Accumulation {
        header: section,
        total_packets,
        received: 1,
        start_cc: header.continuity_counter,
        payload: buffer,
        previous,
    };

    if acc.is_complete() {
        finish(config, acc)
    } else {
        (AssemblerState::Accumulating(acc), None)
    }
}

fn continue_section(
    config: &ScanConfig,
    mut acc: Accumulation,
    header: &PacketHeader,
    payload: &[u8],
) -> Step {
    if header.transport_error {
        return discard(acc, ProtocolViolation::UnexpectedPacket("transport error indicator set"));
    }
    if header.has_adaptation_field() {
        return discard(acc, ProtocolViolation::UnexpectedPacket("adaptation field present"));
    }

    let expected = acc.expected_cc();
    if header.continuity_counter != expected {
        return discard(
            acc,
            ProtocolViolation::ContinuityMismatch {
                expected,
                actual: header.continuity_counter,
            },
        );
    }

    let offset = acc.received * TS_PAYLOAD_SIZE;
    acc.payload[offset..offset + TS_PAYLOAD_SIZE].copy_from_slice(payload);
    acc.received += 1;
    log::trace!(
        "NIT version {}: packet {}/{}",
        acc.header.version,
        acc.received,
        acc.total_packets
    );

    if acc.is_complete() {
        finish(config, acc)
    } else {
        (AssemblerState::Accumulating(acc), None)
    }
}

fn discard(acc: Accumulation, violation: ProtocolViolation) -> Step {
    log::debug!(
        "NIT version {} dropped after {}/{} packets: {violation}",
        acc.header.version,
        acc.received,
        acc.total_packets
    );
    (
        AssemblerState::Empty { settled: acc.previous },
        Some(AssemblerEvent::Discarded(violation)),
    )
}

fn finish(config: &ScanConfig, acc: Accumulation) -> Step {
    let Accumulation { header, payload, .. } = acc;

    if config.verify_crc {
        if let Err(e) = header.verify_crc(&payload) {
            log::warn!("NIT version {}: {e}", header.version);
            return reject(e);
        }
    }

    match parse_entries(&payload, &header) {
        Ok(entries) => {
            log::info!(
                "NIT version {} complete: {} transport stream(s)",
                header.version,
                entries.len()
            );
            let event = AssemblerEvent::Completed(entries.clone());
            let section = CompletedSection { header, payload, entries };
            (AssemblerState::Complete(section), Some(event))
        }
        Err(e) => {
            log::debug!("NIT version {} rejected: {e}", header.version);
            reject(e)
        }
    }
}

// A bad section also invalidates the settled baseline.
fn reject(e: TsError) -> Step {
    (
        AssemblerState::Empty { settled: None },
        Some(AssemblerEvent::Discarded(ProtocolViolation::InvalidSection(e))),
    )
}

/// Byte stream front end: one synchronizer feeding one assembler.
pub struct NitScanner {
    sync: PacketSynchronizer,
    assembler: SectionAssembler,
    packets: u64,
}

impl NitScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            sync: PacketSynchronizer::new(),
            assembler: SectionAssembler::new(config),
            packets: 0,
        }
    }

    /// Pushes an arbitrary chunk of the stream.
    ///
    /// Returns the entries of the newest edition completed within this chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Option<Vec<TransportStreamEntry>> {
        self.sync.sync(chunk);
        self.drain()
    }

    /// Processes what is left in the carry-over at end of input.
    pub fn finish(&mut self) -> Option<Vec<TransportStreamEntry>> {
        self.sync.flush();
        self.drain()
    }

    fn drain(&mut self) -> Option<Vec<TransportStreamEntry>> {
        let mut completed = None;
        for packet in self.sync.packets() {
            self.packets += 1;
            if let Some(AssemblerEvent::Completed(entries)) = self.assembler.push_packet(packet) {
                completed = Some(entries);
            }
        }
        completed
    }

    /// Aligned packets seen so far.
    pub fn packet_count(&self) -> u64 {
        self.packets
    }

    pub fn assembler(&self) -> &SectionAssembler {
        &self.assembler
    }
}
