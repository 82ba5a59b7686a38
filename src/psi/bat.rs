//! Types related to the _Bouquet Association Table_, per _ETSI EN 300 468, Section 5.2.2_.
//!
//! A bouquet is a collection of services, possibly spanning several networks, which a
//! broadcaster markets as a single entity.  The BAT lists the transport streams carrying the
//! bouquet's services, and may be split across several sections.

use super::{SectionCommonHeader, TableSyntaxHeader};
use crate::descriptor::{self, Descriptor};
use crate::packet;
use log::warn;
use std::cmp;

/// The identifier of TS Packets containing Bouquet Association Table sections, with value
/// `0x0011` (shared with the SDT).
pub const BAT_PID: packet::Pid = packet::Pid::new(0x0011);

/// The `table_id` value identifying a section as belonging to the Bouquet Association Table
pub const BAT_TABLE_ID: u8 = 0x4a;

/// Some error encountered while decoding a BAT section
#[derive(Debug, PartialEq, Eq)]
pub enum BatError {
    /// The buffer is too small to hold the fixed section header fields
    NotEnoughData {
        /// the name of the field or structure which could not be read
        field: &'static str,
        /// the number of bytes needed
        expected: usize,
        /// the number of bytes available
        actual: usize,
    },
    /// The section is part of some other table
    UnexpectedTableId {
        /// the BAT table id
        expected: u8,
        /// the table id found in the section header
        actual: u8,
    },
    /// The buffer holds fewer bytes than the header's `section_length` declares
    SectionTooShort {
        /// the `section_length` from the section header
        section_length: usize,
        /// the size of the buffer, including the 3-byte common header
        actual: usize,
    },
}

/// Details of a transport stream listed by a BAT section, together with the descriptors the
/// bouquet attaches to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportStream {
    /// identifies the transport stream within its originating network
    pub transport_stream_id: u16,
    /// identifies the network which originated the transport stream
    pub original_network_id: u16,
    /// descriptors from the section's `transport_descriptors` loop for this stream
    pub descriptors: Vec<Descriptor>,
}

impl TransportStream {
    const HEADER_SIZE: usize = 6;

    /// Iterate over the descriptors with the given tag value, for example
    /// [`OTA_LINKAGE_DESCRIPTOR_TAG`](../../descriptor/constant.OTA_LINKAGE_DESCRIPTOR_TAG.html).
    pub fn descriptors_with_tag(&self, tag: u8) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter().filter(move |d| d.tag == tag)
    }
}

/// One decoded section of the Bouquet Association Table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatSection {
    /// identifies the bouquet which this section describes (part of)
    pub bouquet_id: u16,
    /// the 5-bit `version_number` of the table
    pub version_number: u8,
    /// the index of this section within the table for this bouquet
    pub section_number: u8,
    /// the index of the final section within the table for this bouquet
    pub last_section_number: u8,
    /// descriptors applying to the bouquet as a whole
    pub bouquet_descriptors: Vec<Descriptor>,
    /// the transport streams listed by this section
    pub transport_streams: Vec<TransportStream>,
}

impl BatSection {
    /// The size of the common header plus table syntax header, which all BAT sections must hold
    pub const HEADER_SIZE: usize = SectionCommonHeader::SIZE + TableSyntaxHeader::SIZE;

    /// Same as [`decode_section()`](fn.decode_section.html)
    pub fn from_bytes(buf: &[u8]) -> Result<BatSection, BatError> {
        decode_section(buf)
    }
}

fn loop_length(hi: u8, lo: u8) -> usize {
    usize::from(hi & 0b0000_1111) << 8 | usize::from(lo)
}

/// Decode a complete BAT section, starting with the `table_id` byte.
///
/// The buffer must hold at least `3 + section_length` bytes; any bytes beyond that are ignored.
/// Descriptor and transport stream loops whose declared lengths overrun the section are
/// truncated, keeping the entries which do fit.  The trailing CRC is not checked.
pub fn decode_section(buf: &[u8]) -> Result<BatSection, BatError> {
    if buf.len() < BatSection::HEADER_SIZE {
        return Err(BatError::NotEnoughData {
            field: "bouquet_association_section",
            expected: BatSection::HEADER_SIZE,
            actual: buf.len(),
        });
    }
    if buf[0] != BAT_TABLE_ID {
        return Err(BatError::UnexpectedTableId {
            expected: BAT_TABLE_ID,
            actual: buf[0],
        });
    }
    let header = SectionCommonHeader::new(&buf[..SectionCommonHeader::SIZE]);
    let section_end = SectionCommonHeader::SIZE + header.section_length;
    if buf.len() < section_end {
        return Err(BatError::SectionTooShort {
            section_length: header.section_length,
            actual: buf.len(),
        });
    }
    let table_syntax_header = TableSyntaxHeader::new(&buf[SectionCommonHeader::SIZE..]);
    let mut section = BatSection {
        bouquet_id: table_syntax_header.id(),
        version_number: table_syntax_header.version(),
        section_number: table_syntax_header.section_number(),
        last_section_number: table_syntax_header.last_section_number(),
        bouquet_descriptors: vec![],
        transport_streams: vec![],
    };

    let body = if section_end > BatSection::HEADER_SIZE {
        &buf[BatSection::HEADER_SIZE..section_end]
    } else {
        &buf[0..0]
    };
    if body.len() < 2 {
        warn!(
            "BAT section for bouquet {} too short to hold bouquet_descriptors_length",
            section.bouquet_id
        );
        return Ok(section);
    }
    let descriptors_length = loop_length(body[0], body[1]);
    let rest = &body[2..];
    if descriptors_length > rest.len() {
        warn!(
            "bouquet_descriptors_length={} extends beyond end of BAT section ({} bytes remain)",
            descriptors_length,
            rest.len()
        );
    }
    let descriptors_end = cmp::min(descriptors_length, rest.len());
    let (bouquet_descriptors, _) = descriptor::parse_descriptors(&rest[..descriptors_end]);
    section.bouquet_descriptors = bouquet_descriptors;

    let rest = &rest[descriptors_end..];
    if rest.len() < 2 {
        warn!(
            "BAT section for bouquet {} too short to hold transport_stream_loop_length",
            section.bouquet_id
        );
        return Ok(section);
    }
    let transport_stream_loop_length = loop_length(rest[0], rest[1]);
    let rest = &rest[2..];
    if transport_stream_loop_length > rest.len() {
        warn!(
            "transport_stream_loop_length={} extends beyond end of BAT section ({} bytes remain)",
            transport_stream_loop_length,
            rest.len()
        );
    }
    let loop_end = cmp::min(transport_stream_loop_length, rest.len());
    section.transport_streams = TransportStreamIter::new(&rest[..loop_end]).collect();
    Ok(section)
}

/// Iterator over the `TransportStream` entries in a BAT section's transport stream loop.
struct TransportStreamIter<'buf> {
    buf: &'buf [u8],
}
impl<'buf> TransportStreamIter<'buf> {
    fn new(buf: &'buf [u8]) -> TransportStreamIter<'buf> {
        TransportStreamIter { buf }
    }
}
impl<'buf> Iterator for TransportStreamIter<'buf> {
    type Item = TransportStream;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }
        if self.buf.len() < TransportStream::HEADER_SIZE {
            warn!(
                "only {} bytes remaining for transport stream entry, at least {} required",
                self.buf.len(),
                TransportStream::HEADER_SIZE
            );
            return None;
        }
        let descriptors_length = loop_length(self.buf[4], self.buf[5]);
        let entry_end = TransportStream::HEADER_SIZE + descriptors_length;
        if entry_end > self.buf.len() {
            warn!(
                "transport_descriptors_length={} extends beyond end of loop ({} bytes remain)",
                descriptors_length,
                self.buf.len() - TransportStream::HEADER_SIZE
            );
            return None;
        }
        let (descriptors, _) =
            descriptor::parse_descriptors(&self.buf[TransportStream::HEADER_SIZE..entry_end]);
        let result = TransportStream {
            transport_stream_id: u16::from(self.buf[0]) << 8 | u16::from(self.buf[1]),
            original_network_id: u16::from(self.buf[2]) << 8 | u16::from(self.buf[3]),
            descriptors,
        };
        self.buf = &self.buf[entry_end..];
        Some(result)
    }
}
