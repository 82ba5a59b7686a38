//! Framing for the _Network Information Table_, per _ETSI EN 300 468, Section 5.2.1_.
//!
//! NIT sections are only reassembled here, not decoded; each complete section is handed over as
//! raw bytes for the application to interpret.

use super::{SectionCollector, SectionReassembler};
use crate::packet;

/// The identifier of TS Packets containing Network Information Table sections, with value
/// `0x0010`.
pub const NIT_PID: packet::Pid = packet::Pid::new(0x0010);

/// The `table_id` of NIT sections describing the network carrying the transport stream
pub const NIT_TABLE_ID: u8 = 0x40;

/// Create a `SectionReassembler` which will collect complete NIT sections for the actual network
/// into the `Vec<Vec<u8>>` passed as context to
/// [`consume()`](../struct.SectionReassembler.html#method.consume).
pub fn section_collector() -> SectionReassembler<SectionCollector> {
    SectionReassembler::new(NIT_TABLE_ID, SectionCollector)
}
