//! Packet alignment over an unaligned, arbitrarily chunked byte stream.

use bytes::{Buf, BytesMut};
use std::slice::ChunksExact;

use crate::constants::{SYNC_WINDOW, TS_PACKET_SIZE, TS_SYNC_BYTE};

/// Finds 188-byte packet boundaries and keeps unresolved bytes between calls.
///
/// A position is accepted as a packet start only when the byte there and the
/// byte 188 further on are both 0x47, so a stray 0x47 inside a payload cannot
/// produce a false alignment. Rejected positions advance by one byte.
#[derive(Debug, Default)]
pub struct PacketSynchronizer {
    rest: BytesMut,
    synced: Vec<u8>,
}

impl PacketSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and aligns as many packets as can be confirmed.
    ///
    /// Returns the number of aligned bytes produced by this call (a multiple
    /// of 188). Nothing is scanned until two packets' worth of bytes are
    /// buffered.
    pub fn sync(&mut self, chunk: &[u8]) -> usize {
        self.synced.clear();
        if chunk.is_empty() {
            return 0;
        }

        self.rest.extend_from_slice(chunk);
        if self.rest.len() < SYNC_WINDOW {
            return 0;
        }
        self.scan()
    }

    /// Scans whatever is buffered without waiting for a full sync window.
    ///
    /// Meant for end of input: a packet still needs its paired sync byte, so
    /// the final packet of a stream is never emitted.
    pub fn flush(&mut self) -> usize {
        self.synced.clear();
        self.scan()
    }

    fn scan(&mut self) -> usize {
        let buf = &self.rest[..];
        let mut pos = 0;
        let mut skipped = 0;

        while pos + TS_PACKET_SIZE < buf.len() {
            if buf[pos] != TS_SYNC_BYTE || buf[pos + TS_PACKET_SIZE] != TS_SYNC_BYTE {
                pos += 1;
                skipped += 1;
                continue;
            }
            self.synced.extend_from_slice(&buf[pos..pos + TS_PACKET_SIZE]);
            pos += TS_PACKET_SIZE;
        }

        if skipped > 0 {
            log::trace!("resync skipped {skipped} bytes");
        }
        self.rest.advance(pos);
        self.synced.len()
    }

    /// Aligned bytes produced by the last call.
    pub fn buffer(&self) -> &[u8] {
        &self.synced
    }

    /// Packets produced by the last call, 188 bytes each.
    pub fn packets(&self) -> ChunksExact<'_, u8> {
        self.synced.chunks_exact(TS_PACKET_SIZE)
    }

    /// Bytes carried over to the next call.
    pub fn pending(&self) -> usize {
        self.rest.len()
    }

    pub fn clear(&mut self) {
        self.rest.clear();
        self.synced.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn packet(fill: u8) -> Vec<u8> {
        let mut p = vec![fill; TS_PACKET_SIZE];
        p[0] = TS_SYNC_BYTE;
        p
    }

    fn feed_all(chunks: &[&[u8]]) -> Vec<u8> {
        let mut sync = PacketSynchronizer::new();
        let mut out = Vec::new();
        for chunk in chunks {
            sync.sync(chunk);
            out.extend_from_slice(sync.buffer());
        }
        sync.flush();
        out.extend_from_slice(sync.buffer());
        out
    }

    #[test]
    fn waits_for_two_packets() {
        let mut sync = PacketSynchronizer::new();
        let data = [packet(0x00), packet(0x00)].concat();
        assert_eq!(sync.sync(&data[..375]), 0);
        assert_eq!(sync.pending(), 375);
        // 376 bytes: the first packet is confirmed by the second sync byte
        assert_eq!(sync.sync(&data[375..]), TS_PACKET_SIZE);
        assert_eq!(sync.pending(), TS_PACKET_SIZE);
    }

    #[test]
    fn empty_chunk_produces_nothing() {
        let mut sync = PacketSynchronizer::new();
        assert_eq!(sync.sync(&[]), 0);
        assert_eq!(sync.pending(), 0);
    }

    #[test]
    fn skips_leading_garbage() {
        let mut data = vec![0x00, 0x47, 0x12, 0xFF, 0x47];
        for fill in 1..=4 {
            data.extend(packet(fill));
        }
        let mut sync = PacketSynchronizer::new();
        assert_eq!(sync.sync(&data), 3 * TS_PACKET_SIZE);
        let fills: Vec<u8> = sync.packets().map(|p| p[1]).collect();
        assert_eq!(fills, vec![1, 2, 3]);
        // the last packet awaits confirmation
        assert_eq!(sync.pending(), TS_PACKET_SIZE);
    }

    #[test]
    fn lone_sync_byte_is_not_a_packet_start() {
        // 0x47 at offset 10 without a partner 188 bytes later
        let mut data = vec![0x00; 20];
        data[10] = TS_SYNC_BYTE;
        data.extend(packet(0x11));
        data.extend(packet(0x22));
        data.extend(packet(0x33));

        let out = feed_all(&[&data]);
        assert_eq!(out.len(), 2 * TS_PACKET_SIZE);
        assert_eq!(out[1], 0x11);
        assert_eq!(out[TS_PACKET_SIZE + 1], 0x22);
    }

    #[test]
    fn clear_drops_carry_over() {
        let mut sync = PacketSynchronizer::new();
        sync.sync(&packet(0x00));
        assert_eq!(sync.pending(), TS_PACKET_SIZE);
        sync.clear();
        assert_eq!(sync.pending(), 0);
        assert!(sync.buffer().is_empty());
    }

    /// Garbage runs interleaved with well-formed packets.
    fn stream() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(
            prop_oneof![
                prop::collection::vec(any::<u8>(), 0..40),
                prop::collection::vec(any::<u8>(), TS_PACKET_SIZE).prop_map(|mut p| {
                    p[0] = TS_SYNC_BYTE;
                    p
                }),
            ],
            0..12,
        )
        .prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn output_is_double_confirmed(data in stream()) {
            let out = feed_all(&[&data]);
            prop_assert_eq!(out.len() % TS_PACKET_SIZE, 0);

            // every emitted packet maps back to an input offset whose byte and
            // the byte 188 further on are both sync bytes
            let mut from = 0;
            for p in out.chunks_exact(TS_PACKET_SIZE) {
                let offset = (from..data.len())
                    .find(|&i| data[i..].starts_with(p)
                        && data.get(i + TS_PACKET_SIZE) == Some(&TS_SYNC_BYTE));
                prop_assert!(offset.is_some());
                let offset = offset.unwrap();
                prop_assert_eq!(data[offset], TS_SYNC_BYTE);
                from = offset + TS_PACKET_SIZE;
            }
        }

        #[test]
        fn chunk_boundaries_do_not_matter(
            data in stream(),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
        ) {
            let mut points: Vec<usize> = cuts.iter().map(|c| c.index(data.len() + 1)).collect();
            points.sort_unstable();
            let mut chunks: Vec<&[u8]> = Vec::new();
            let mut start = 0;
            for p in points {
                chunks.push(&data[start..p]);
                start = p;
            }
            chunks.push(&data[start..]);

            prop_assert_eq!(feed_all(&chunks), feed_all(&[&data]));
        }
    }
}
