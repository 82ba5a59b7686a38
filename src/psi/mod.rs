//! Types for processing tables of *Program Specific Information* in a transport stream.
//!
//! # Concepts
//!
//! * There are multiple standard types of Program Specific Information.  This crate decodes the
//!   DVB *Bouquet Association Table*, and can frame sections of the *Network Information Table*.
//! * A PSI *Table* can split into *Sections*
//! * A Section can be split across a small number of individual transport stream *Packets*
//!
//! # Core types
//!
//! * [`SectionReassembler`](struct.SectionReassembler.html) converts *Packet* payloads into
//!   complete *Sections*
//! * [`SectionProcessor`](trait.SectionProcessor.html) is implemented by types that consume those
//!   sections
//!
//! The specific types of table are defined in the submodules, with only the generic functionality
//! in this module.

pub mod bat;
pub mod nit;

use crate::packet::PacketPayload;
use log::{debug, trace, warn};
use std::fmt;

/// Trait for types which process complete PSI sections, as produced by a
/// [`SectionReassembler`](struct.SectionReassembler.html).
///
/// Mutable state which should outlive the reassembler (for example the table data accumulated
/// across many sections) is supplied through the `Context`.
pub trait SectionProcessor {
    /// the application-specific state threaded through calls to `section()`
    type Context;

    /// Note that the first 3 bytes of `section_data` contain the header fields that have also
    /// been supplied to this call in the `header` parameter.  `section_data` is exactly
    /// `SectionCommonHeader::SIZE + header.section_length` bytes long.
    fn section(
        &mut self,
        ctx: &mut Self::Context,
        header: &SectionCommonHeader,
        section_data: &[u8],
    );
}

/// The fields which appear at the start of every PSI section.
#[derive(Debug, PartialEq, Eq)]
pub struct SectionCommonHeader {
    /// identifies the kind of table this is a section of
    pub table_id: u8,
    /// `true` if the section uses the 'section syntax', with a `TableSyntaxHeader` following
    pub section_syntax_indicator: bool,
    /// a flag whose meaning is private to the table in question
    pub private_indicator: bool,
    /// the number of bytes of section data which follow this 3-byte header
    pub section_length: usize,
}

impl SectionCommonHeader {
    /// The size of the header, in bytes
    pub const SIZE: usize = 3;

    /// Panics if the given buffer is not exactly `SectionCommonHeader::SIZE` bytes.
    pub fn new(buf: &[u8]) -> SectionCommonHeader {
        assert_eq!(buf.len(), Self::SIZE);
        SectionCommonHeader {
            table_id: buf[0],
            section_syntax_indicator: buf[1] & 0b1000_0000 != 0,
            private_indicator: buf[1] & 0b0100_0000 != 0,
            section_length: ((u16::from(buf[1] & 0b0000_1111) << 8) | u16::from(buf[2])) as usize,
        }
    }
}

/// Represents the fields that appear within table sections that use the common 'section syntax'.
#[derive(Debug)]
pub struct TableSyntaxHeader<'buf> {
    buf: &'buf [u8],
}

impl<'buf> TableSyntaxHeader<'buf> {
    /// The size of the header, in bytes
    pub const SIZE: usize = 5;

    /// Panics if fewer than `TableSyntaxHeader::SIZE` bytes are given.
    pub fn new(buf: &'buf [u8]) -> TableSyntaxHeader<'buf> {
        assert!(buf.len() >= Self::SIZE);
        TableSyntaxHeader { buf }
    }
    /// The initial 16-bit field within a 'section syntax' PSI table (which immediately follows the
    /// `section_length` field).  Within the _Bouquet Association Table_ this is the
    /// `bouquet_id`, and within the _Network Information Table_ the `network_id`.
    pub fn id(&self) -> u16 {
        u16::from(self.buf[0]) << 8 | u16::from(self.buf[1])
    }
    /// A 5-bit value that can be used to quickly check if this table has changed since the last
    /// time it was periodically inserted within the transport stream being read.
    pub fn version(&self) -> u8 {
        (self.buf[2] >> 1) & 0b0001_1111
    }
    /// Is this table applicable now (`true`), or will it become applicable at some future time.
    pub fn current_next_indicator(&self) -> bool {
        self.buf[2] & 1 != 0
    }
    /// The number of this section, within a potentially multi-section table.
    pub fn section_number(&self) -> u8 {
        self.buf[3]
    }
    /// Indicates the value of `section_number()` that will appear within the last section within
    /// a table.
    pub fn last_section_number(&self) -> u8 {
        self.buf[4]
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum ReassemblyState {
    Idle,
    Collecting { expected_length: usize },
}

/// Buffers Program Specific Information, which may be split across multiple TS packets, and
/// passes each complete section of the chosen table to the given `SectionProcessor`.
///
/// Payloads are supplied by the caller, as extracted by
/// [`packet::demux()`](../packet/fn.demux.html) for the PID carrying the table.  Packets without
/// payload should simply not be passed in.
pub struct SectionReassembler<P>
where
    P: SectionProcessor,
{
    table_id: u8,
    buf: Vec<u8>,
    state: ReassemblyState,
    processor: P,
}

impl<P> SectionReassembler<P>
where
    P: SectionProcessor,
{
    /// The maximum `section_length` the standards allow for the tables handled.  Longer sections
    /// are still collected, but reported with `warn!`.
    pub const SECTION_LIMIT: usize = 1021;

    /// Table id used to fill out the remainder of a packet payload following the last section.
    pub const STUFFING_TABLE_ID: u8 = 0xff;

    /// Create a reassembler for sections with the given `table_id`, passing each complete
    /// section to `processor`.
    pub fn new(table_id: u8, processor: P) -> SectionReassembler<P> {
        SectionReassembler {
            table_id,
            buf: Vec::new(),
            state: ReassemblyState::Idle,
            processor,
        }
    }

    /// The table id whose sections are collected
    pub fn table_id(&self) -> u8 {
        self.table_id
    }

    /// Borrow the `SectionProcessor` receiving complete sections
    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Mutably borrow the `SectionProcessor` receiving complete sections
    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    /// `true` if part of a section has been buffered, and continuation packets are expected.
    pub fn is_collecting(&self) -> bool {
        matches!(self.state, ReassemblyState::Collecting { .. })
    }

    /// Process the payload of the next packet of the PID carrying the table.
    pub fn consume(&mut self, ctx: &mut P::Context, payload: &PacketPayload<'_>) {
        if payload.is_start {
            self.begin_new_section(ctx, payload.data)
        } else {
            // this packet is a continuation of an existing PSI section
            self.append_to_current(ctx, payload.data)
        }
    }

    /// Discard any partially collected section.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = ReassemblyState::Idle;
    }

    fn begin_new_section(&mut self, ctx: &mut P::Context, data: &[u8]) {
        if let ReassemblyState::Collecting { expected_length } = self.state {
            if self.buf.len() >= expected_length {
                self.finalise_current_section(ctx);
            } else {
                warn!(
                    "previous section incomplete with {} of {} bytes when new section started",
                    self.buf.len(),
                    expected_length
                );
                self.reset();
            }
        }
        let (pointer, section_data) = match data.split_first() {
            Some((&pointer, rest)) => (pointer as usize, rest),
            None => {
                warn!("no pointer_field in payload starting a section");
                self.reset();
                return;
            }
        };
        // any bytes ahead of the pointed-to position are the tail of a section which we
        // did not see the start of
        if pointer >= section_data.len() {
            warn!(
                "PSI pointer {} beyond end of packet payload ({} bytes)",
                pointer,
                section_data.len()
            );
            self.reset();
            return;
        }
        self.start_section(ctx, &section_data[pointer..]);
    }

    fn start_section(&mut self, ctx: &mut P::Context, data: &[u8]) {
        if data.len() < SectionCommonHeader::SIZE {
            warn!(
                "only {} bytes remaining in payload, too few to read section header",
                data.len()
            );
            self.reset();
            return;
        }
        let header = SectionCommonHeader::new(&data[..SectionCommonHeader::SIZE]);
        if header.table_id != self.table_id {
            debug!(
                "ignoring section with table_id {:#04x} (expecting {:#04x})",
                header.table_id, self.table_id
            );
            self.reset();
            return;
        }
        if header.section_length > Self::SECTION_LIMIT {
            warn!(
                "section_length {} exceeds the usual limit of {} bytes",
                header.section_length,
                Self::SECTION_LIMIT
            );
        }
        self.buf.clear();
        self.state = ReassemblyState::Collecting {
            expected_length: SectionCommonHeader::SIZE + header.section_length,
        };
        self.append_to_current(ctx, data);
    }

    fn append_to_current(&mut self, ctx: &mut P::Context, data: &[u8]) {
        let expected_length = match self.state {
            ReassemblyState::Idle => {
                trace!("no current section, ignoring section continuation");
                return;
            }
            ReassemblyState::Collecting { expected_length } => expected_length,
        };
        let needed = expected_length.saturating_sub(self.buf.len());
        if data.len() < needed {
            // we are short and will need to accumulate data from a further packet
            self.buf.extend_from_slice(data);
            return;
        }
        let (section_data, rest) = data.split_at(needed);
        self.buf.extend_from_slice(section_data);
        self.finalise_current_section(ctx);
        self.after_section_end(ctx, rest);
    }

    // bytes following the end of a section are either stuffing, or the start of another section
    // packed into the same packet
    fn after_section_end(&mut self, ctx: &mut P::Context, rest: &[u8]) {
        match rest.first() {
            None => (),
            Some(&id) if id == Self::STUFFING_TABLE_ID => {
                if !rest.iter().all(|&b| b == Self::STUFFING_TABLE_ID) {
                    debug!("invalid stuffing bytes after end of PSI section (should all be 0xff)");
                }
            }
            Some(&id) if id == self.table_id => self.start_section(ctx, rest),
            Some(&id) => {
                debug!(
                    "ignoring {} bytes following section end, starting with table_id {:#04x}",
                    rest.len(),
                    id
                );
            }
        }
    }

    fn finalise_current_section(&mut self, ctx: &mut P::Context) {
        let header = SectionCommonHeader::new(&self.buf[..SectionCommonHeader::SIZE]);
        self.processor.section(ctx, &header, &self.buf[..]);
        self.reset();
    }
}

impl<P> fmt::Debug for SectionReassembler<P>
where
    P: SectionProcessor,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionReassembler")
            .field("table_id", &format_args!("{:#04x}", self.table_id))
            .field("state", &self.state)
            .field("buffered", &self.buf.len())
            .finish()
    }
}

/// A `SectionProcessor` which just keeps a copy of each complete section, in the `Vec` given as
/// context.
///
/// Useful for tables which this crate frames but does not decode, such as the NIT.
#[derive(Debug, Default)]
pub struct SectionCollector;

impl SectionProcessor for SectionCollector {
    type Context = Vec<Vec<u8>>;

    fn section(
        &mut self,
        ctx: &mut Self::Context,
        _header: &SectionCommonHeader,
        section_data: &[u8],
    ) {
        ctx.push(section_data.to_vec());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::packet::PacketPayload;
    use hex_literal::*;

    fn start(data: &[u8]) -> PacketPayload<'_> {
        PacketPayload {
            data,
            is_start: true,
        }
    }

    fn cont(data: &[u8]) -> PacketPayload<'_> {
        PacketPayload {
            data,
            is_start: false,
        }
    }

    fn collector() -> SectionReassembler<SectionCollector> {
        SectionReassembler::new(0x4a, SectionCollector)
    }

    #[test]
    fn common_header() {
        let header = SectionCommonHeader::new(&hex!("4af123"));
        assert_eq!(
            header,
            SectionCommonHeader {
                table_id: 0x4a,
                section_syntax_indicator: true,
                private_indicator: true,
                section_length: 0x123,
            }
        );
    }

    #[test]
    fn table_syntax_header() {
        let header = TableSyntaxHeader::new(&hex!("61a8 c5 02 03"));
        assert_eq!(header.id(), 25000);
        assert_eq!(header.version(), 2);
        assert!(header.current_next_indicator());
        assert_eq!(header.section_number(), 2);
        assert_eq!(header.last_section_number(), 3);
    }

    #[test]
    fn continuation_outside_section() {
        let mut sections = vec![];
        let mut r = collector();
        r.consume(&mut sections, &cont(&hex!("4af00501020304 05")));
        assert!(!r.is_collecting());
        assert!(sections.is_empty());
    }

    #[test]
    fn section_in_single_payload() {
        let mut sections = vec![];
        let mut r = collector();
        r.consume(&mut sections, &start(&hex!("00 4af003 aabbcc ffff")));
        assert!(!r.is_collecting());
        assert_eq!(sections, vec![hex!("4af003aabbcc").to_vec()]);
    }

    #[test]
    fn pointer_skips_tail_of_unseen_section() {
        let mut sections = vec![];
        let mut r = collector();
        r.consume(&mut sections, &start(&hex!("02 1122 4af002 aabb ff")));
        assert_eq!(sections, vec![hex!("4af002aabb").to_vec()]);
    }

    #[test]
    fn section_spanning_packets() {
        let mut sections = vec![];
        let mut r = collector();
        r.consume(&mut sections, &start(&hex!("00 4af006 0102")));
        assert!(r.is_collecting());
        r.consume(&mut sections, &cont(&hex!("0304")));
        assert!(r.is_collecting());
        assert!(sections.is_empty());
        r.consume(&mut sections, &cont(&hex!("0506 ffffff")));
        assert!(!r.is_collecting());
        assert_eq!(sections, vec![hex!("4af006010203040506").to_vec()]);
    }

    #[test]
    fn wrong_table_id() {
        let mut sections = vec![];
        let mut r = collector();
        r.consume(&mut sections, &start(&hex!("00 40f006 0102")));
        assert!(!r.is_collecting());
        // continuation of the foreign section is ignored too
        r.consume(&mut sections, &cont(&hex!("03040506")));
        assert!(sections.is_empty());
    }

    #[test]
    fn new_start_drops_incomplete_section() {
        let mut sections = vec![];
        let mut r = collector();
        r.consume(&mut sections, &start(&hex!("00 4af006 0102")));
        r.consume(&mut sections, &start(&hex!("00 4af001 ee")));
        assert_eq!(sections, vec![hex!("4af001ee").to_vec()]);
    }

    #[test]
    fn pointer_beyond_payload() {
        let mut sections = vec![];
        let mut r = collector();
        r.consume(&mut sections, &start(&hex!("00 4af006 0102")));
        r.consume(&mut sections, &start(&hex!("05 4af0")));
        assert!(!r.is_collecting());
        assert!(sections.is_empty());
    }

    #[test]
    fn header_split_from_pointer() {
        let mut sections = vec![];
        let mut r = collector();
        r.consume(&mut sections, &start(&hex!("00 4a")));
        assert!(!r.is_collecting());
        assert!(sections.is_empty());
    }

    #[test]
    fn oversized_section_still_collected() {
        let mut sections = vec![];
        let mut r = collector();
        // section_length of 1100 bytes
        let mut first = hex!("00 4af44c").to_vec();
        first.resize(184, 0xaa);
        r.consume(&mut sections, &start(&first));
        assert!(r.is_collecting());
        let rest = vec![0xbbu8; 1103 - 183];
        for chunk in rest.chunks(184) {
            r.consume(&mut sections, &cont(chunk));
        }
        assert!(!r.is_collecting());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].len(), 1103);
        assert_eq!(sections[0][1103 - 1], 0xbb);
    }

    #[test]
    fn packed_sections() {
        let mut sections = vec![];
        let mut r = collector();
        r.consume(&mut sections, &start(&hex!("00 4af001 aa 4af002 bbcc 4af003 dd")));
        assert_eq!(
            sections,
            vec![hex!("4af001aa").to_vec(), hex!("4af002bbcc").to_vec()]
        );
        // third section continues in the next packet
        assert!(r.is_collecting());
        r.consume(&mut sections, &cont(&hex!("eeff ffff")));
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[2], hex!("4af003ddeeff").to_vec());
    }

    #[test]
    fn empty_start_payload() {
        let mut sections = vec![];
        let mut r = collector();
        r.consume(&mut sections, &start(&[]));
        assert!(!r.is_collecting());
    }
}
