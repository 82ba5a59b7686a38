//! Drives the decode of a whole stream: packets in, bouquet records out.
//!
//! ```
//! # use dvb_bat_reader::reader::BatReader;
//! # use dvb_bat_reader::aggregate::AggregateStore;
//! # let capture: Vec<u8> = vec![];
//! let mut reader = BatReader::new();
//! let mut store = AggregateStore::new();
//! reader.push(&mut store, &capture[..]);
//! for bouquet in store.iter() {
//!     println!("bouquet {} complete={}", bouquet.bouquet_id(), bouquet.is_complete());
//! }
//! ```

use crate::aggregate::{AggregateStore, MergeOutcome};
use crate::packet::{self, Packet};
use crate::psi::bat::{self, BAT_PID, BAT_TABLE_ID};
use crate::psi::{SectionCommonHeader, SectionProcessor, SectionReassembler};
use log::warn;

/// `SectionProcessor` which decodes each complete BAT section and merges it into the
/// `AggregateStore` given as context.
#[derive(Debug, Default)]
pub struct BatProcessor {
    outcomes: Vec<MergeOutcome>,
}

impl BatProcessor {
    /// The outcomes of sections completed since the last call to `clear()`
    pub fn outcomes(&self) -> &[MergeOutcome] {
        &self.outcomes[..]
    }

    /// Forget previously recorded outcomes
    pub fn clear(&mut self) {
        self.outcomes.clear();
    }
}

impl SectionProcessor for BatProcessor {
    type Context = AggregateStore;

    fn section(
        &mut self,
        ctx: &mut Self::Context,
        header: &SectionCommonHeader,
        section_data: &[u8],
    ) {
        match bat::decode_section(section_data) {
            Ok(section) => self.outcomes.push(ctx.merge(section)),
            Err(e) => warn!(
                "dropping BAT section (section_length={}): {:?}",
                header.section_length, e
            ),
        }
    }
}

/// Reads the Bouquet Association Table from a Transport Stream.
///
/// Packets are pushed in by the caller, and the records for each bouquet accumulate in an
/// `AggregateStore` owned by the caller.  Packets for PIDs other than the one being read are
/// ignored.
#[derive(Debug)]
pub struct BatReader {
    pid: packet::Pid,
    reassembler: SectionReassembler<BatProcessor>,
}

impl Default for BatReader {
    fn default() -> Self {
        BatReader::new()
    }
}

impl BatReader {
    /// Create a reader for BAT sections carried on the standard PID, `0x0011`.
    pub fn new() -> BatReader {
        BatReader::with_pid(BAT_PID)
    }

    /// Create a reader for BAT sections carried on some other PID.
    pub fn with_pid(pid: packet::Pid) -> BatReader {
        BatReader {
            pid,
            reassembler: SectionReassembler::new(BAT_TABLE_ID, BatProcessor::default()),
        }
    }

    /// The PID this reader takes sections from
    pub fn pid(&self) -> packet::Pid {
        self.pid
    }

    /// Process a single packet, returning the outcome of merging each section which the packet
    /// completed (usually none, sometimes more than one).
    pub fn consume_packet(&mut self, store: &mut AggregateStore, pk: &[u8]) -> &[MergeOutcome] {
        self.reassembler.processor_mut().clear();
        if let Some(payload) = packet::demux(pk, self.pid) {
            self.reassembler.consume(store, &payload);
        }
        self.reassembler.processor().outcomes()
    }

    /// Process all the packets in the given buffer, which should hold a whole number of
    /// 188-byte packets.  A partial packet at the end of the buffer is dropped.
    pub fn push(&mut self, store: &mut AggregateStore, buf: &[u8]) {
        let mut chunks = buf.chunks_exact(Packet::SIZE);
        for pk in &mut chunks {
            self.consume_packet(store, pk);
        }
        let remainder = chunks.remainder();
        if !remainder.is_empty() {
            warn!(
                "dropping {} trailing bytes, less than a whole packet",
                remainder.len()
            );
        }
    }

    /// Process packets from the given buffer until the section set for `bouquet_id` is
    /// complete, returning the number of bytes consumed.
    ///
    /// If the set is already complete, nothing is consumed.  If it does not become complete,
    /// all whole packets in the buffer are consumed.
    pub fn push_until_complete(
        &mut self,
        store: &mut AggregateStore,
        buf: &[u8],
        bouquet_id: u16,
    ) -> usize {
        let mut consumed = 0;
        for pk in buf.chunks_exact(Packet::SIZE) {
            if store.is_complete(bouquet_id) {
                break;
            }
            self.consume_packet(store, pk);
            consumed += pk.len();
        }
        consumed
    }

    /// Drop any partially reassembled section, for example after a discontinuity in the input.
    pub fn reset(&mut self) {
        self.reassembler.reset();
    }
}

/// Decode a whole sequence of packets, returning the records for all bouquets found.
pub fn decode_packets<'a, I>(packets: I) -> AggregateStore
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut reader = BatReader::new();
    let mut store = AggregateStore::new();
    for pk in packets {
        reader.consume_packet(&mut store, pk);
    }
    store
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::*;

    fn packet(pid: u16, start: bool, payload: &[u8]) -> Vec<u8> {
        let mut pk = vec![0xffu8; Packet::SIZE];
        pk[0] = Packet::SYNC_BYTE;
        pk[1] = (pid >> 8) as u8 | if start { 0b0100_0000 } else { 0 };
        pk[2] = pid as u8;
        pk[3] = 0b0001_0000;
        pk[4..4 + payload.len()].copy_from_slice(payload);
        pk
    }

    fn section() -> [u8; 16] {
        hex!("4af00d 0007 c1 0000 f000 f000 00000000")
    }

    fn bat_packet() -> Vec<u8> {
        let mut payload = vec![0];
        payload.extend_from_slice(&section());
        packet(0x11, true, &payload)
    }

    #[test]
    fn consume_reports_outcome() {
        let mut reader = BatReader::new();
        let mut store = AggregateStore::new();
        let outcomes = reader.consume_packet(&mut store, &bat_packet()).to_vec();
        assert_eq!(
            outcomes,
            vec![MergeOutcome {
                bouquet_id: 7,
                duplicate: false,
                complete: true
            }]
        );
        assert!(reader
            .consume_packet(&mut store, &packet(0x11, false, &[1, 2, 3]))
            .is_empty());
    }

    #[test]
    fn other_pid_ignored() {
        let mut reader = BatReader::with_pid(packet::Pid::new(0x100));
        assert_eq!(reader.pid(), packet::Pid::new(0x100));
        let mut store = AggregateStore::new();
        reader.push(&mut store, &bat_packet());
        assert!(store.is_empty());
    }

    #[test]
    fn push_drops_partial_packet() {
        let mut buf = bat_packet();
        buf.extend_from_slice(&[0x47, 0x00]);
        let mut reader = BatReader::default();
        let mut store = AggregateStore::new();
        reader.push(&mut store, &buf);
        assert!(store.is_complete(7));
    }

    #[test]
    fn push_until_complete_stops() {
        let mut buf = bat_packet();
        buf.extend(bat_packet());
        let mut reader = BatReader::new();
        let mut store = AggregateStore::new();
        assert_eq!(reader.push_until_complete(&mut store, &buf, 7), Packet::SIZE);
        assert_eq!(reader.push_until_complete(&mut store, &buf, 7), 0);
        assert_eq!(
            reader.push_until_complete(&mut store, &buf, 8),
            2 * Packet::SIZE
        );
    }

    #[test]
    fn bad_section_dropped() {
        // section_length too small to hold the BAT header fields
        let pk = packet(0x11, true, &hex!("00 4af002 0007"));
        let store = decode_packets(vec![&pk[..]]);
        assert!(store.is_empty());
    }

    #[test]
    fn reset_drops_partial_section() {
        let mut reader = BatReader::new();
        let mut store = AggregateStore::new();
        let pk = bat_packet();
        let mut partial = pk.clone();
        // section claims more bytes than the packet holds
        partial[7] = 0xf1;
        reader.consume_packet(&mut store, &partial);
        reader.reset();
        reader.consume_packet(&mut store, &packet(0x11, false, &section()));
        assert!(store.is_empty());
        reader.consume_packet(&mut store, &pk);
        assert!(store.is_complete(7));
    }
}
