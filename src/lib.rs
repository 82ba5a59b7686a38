//! Reads the DVB _Bouquet Association Table_ from MPEG2 Transport Stream data, per
//! _ETSI EN 300 468_ and _ISO/IEC 13818-1_.
//!
//! # Design principals
//!
//!  * *Push model*.  The caller reads packets from wherever they come from (a file, the network)
//!    and pushes them in, so the library can sit inside a non-blocking event-loop.
//!  * *Best effort*.  Broadcast data is frequently damaged.  Malformed packets, sections and
//!    descriptor loops are logged (via the `log` crate) and skipped, keeping whatever could be
//!    parsed, rather than failing the whole decode.
//!  * *No globals*.  Everything learned about the bouquets in a stream accumulates in an
//!    [`AggregateStore`](aggregate/struct.AggregateStore.html) owned by the caller.
//!
//! # Data flow
//!
//!  1. [`packet::demux()`](packet/fn.demux.html) extracts the payload of packets on the BAT PID
//!  2. [`psi::SectionReassembler`](psi/struct.SectionReassembler.html) collects payloads into
//!     complete sections
//!  3. [`psi::bat::decode_section()`](psi/bat/fn.decode_section.html) decodes each section
//!  4. [`AggregateStore::merge()`](aggregate/struct.AggregateStore.html#method.merge) folds the
//!     section into the record for its bouquet
//!
//! [`reader::BatReader`](reader/struct.BatReader.html) wires these steps together.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, future_incompatible, missing_docs)]

pub mod aggregate;
pub mod descriptor;
pub mod packet;
pub mod psi;
pub mod reader;
pub mod text;

pub use crate::aggregate::{AggregateStore, BouquetRecord, MergeOutcome};
pub use crate::descriptor::Descriptor;
pub use crate::psi::bat::{BatSection, TransportStream};
pub use crate::reader::{decode_packets, BatReader};
