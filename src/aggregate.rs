//! Merges decoded BAT sections into one growing record per bouquet.
//!
//! A bouquet's table may be split across several sections, numbered `0` to
//! `last_section_number`, which are repeated cyclically within the stream.  The
//! [`AggregateStore`](struct.AggregateStore.html) tracks which section numbers have been seen for
//! each bouquet, so that the caller can tell when a bouquet's full set has been received.

use crate::descriptor::bouquet_name::BouquetNameDescriptor;
use crate::descriptor::Descriptor;
use crate::psi::bat::{BatSection, TransportStream};
use fixedbitset::FixedBitSet;
use log::{debug, warn};
use std::collections::hash_map;
use std::collections::HashMap;

/// The result of merging a single section into an `AggregateStore`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// the bouquet which the section belonged to
    pub bouquet_id: u16,
    /// true if this section number had already been merged, in which case the record was not
    /// modified
    pub duplicate: bool,
    /// true if every section of the bouquet has now been seen
    pub complete: bool,
}

/// Everything learned about one bouquet from the sections seen so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BouquetRecord {
    bouquet_id: u16,
    version_number: u8,
    last_section_number: u8,
    seen_sections: FixedBitSet,
    bouquet_descriptors: Vec<Descriptor>,
    transport_streams: Vec<TransportStream>,
}

impl BouquetRecord {
    fn new(section: &BatSection) -> BouquetRecord {
        let size = usize::from(section.last_section_number.max(section.section_number)) + 1;
        BouquetRecord {
            bouquet_id: section.bouquet_id,
            version_number: section.version_number,
            last_section_number: section.last_section_number,
            seen_sections: FixedBitSet::with_capacity(size),
            bouquet_descriptors: vec![],
            transport_streams: vec![],
        }
    }

    /// identifies the bouquet
    pub fn bouquet_id(&self) -> u16 {
        self.bouquet_id
    }
    /// the `version_number` of the most recently merged section
    pub fn version_number(&self) -> u8 {
        self.version_number
    }
    /// the `last_section_number` of the first section merged for this bouquet
    pub fn last_section_number(&self) -> u8 {
        self.last_section_number
    }
    /// The set of section numbers merged so far
    pub fn seen_sections(&self) -> &FixedBitSet {
        &self.seen_sections
    }
    /// true if the section with the given number has been merged
    pub fn has_section(&self, section_number: u8) -> bool {
        self.seen_sections.contains(usize::from(section_number))
    }
    /// Descriptors from the bouquet descriptor loops of all merged sections, in arrival order
    pub fn bouquet_descriptors(&self) -> &[Descriptor] {
        &self.bouquet_descriptors[..]
    }
    /// Transport streams from all merged sections, each id appearing once
    pub fn transport_streams(&self) -> &[TransportStream] {
        &self.transport_streams[..]
    }
    /// Lookup a transport stream listed by this bouquet
    pub fn transport_stream(&self, transport_stream_id: u16) -> Option<&TransportStream> {
        self.transport_streams
            .iter()
            .find(|ts| ts.transport_stream_id == transport_stream_id)
    }

    /// True once every section number in `0..=last_section_number` has been merged.  Sections
    /// numbered beyond `last_section_number` are recorded, but do not count.
    pub fn is_complete(&self) -> bool {
        (0..=usize::from(self.last_section_number)).all(|n| self.seen_sections.contains(n))
    }

    /// Iterate over the bouquet-level descriptors with the given tag value.
    pub fn descriptors_with_tag(&self, tag: u8) -> impl Iterator<Item = &Descriptor> {
        self.bouquet_descriptors.iter().filter(move |d| d.tag == tag)
    }

    /// The decoded text of the first `bouquet_name_descriptor`, if the bouquet has one.
    pub fn name(&self) -> Option<String> {
        self.descriptors_with_tag(BouquetNameDescriptor::TAG)
            .next()
            .and_then(|d| BouquetNameDescriptor::new(d.tag, &d.data[..]).ok())
            .map(|name| name.name().into_owned())
    }

    fn mark_seen(&mut self, section_number: u8) {
        let n = usize::from(section_number);
        if n >= self.seen_sections.len() {
            self.seen_sections.grow(n + 1);
        }
        self.seen_sections.insert(n);
    }

    fn update_bounds(&mut self, section: &BatSection) {
        if section.version_number != self.version_number {
            debug!(
                "bouquet {} version changed {} -> {}",
                self.bouquet_id, self.version_number, section.version_number
            );
            self.version_number = section.version_number;
        }
        if section.last_section_number != self.last_section_number {
            warn!(
                "bouquet {} section {} has last_section_number {}, keeping {}",
                self.bouquet_id,
                section.section_number,
                section.last_section_number,
                self.last_section_number
            );
        }
        if section.section_number > self.last_section_number {
            warn!(
                "bouquet {} section_number {} beyond last_section_number {}",
                self.bouquet_id, section.section_number, self.last_section_number
            );
        }
    }

    fn absorb(&mut self, section: BatSection) {
        self.mark_seen(section.section_number);
        self.bouquet_descriptors.extend(section.bouquet_descriptors);
        for ts in section.transport_streams {
            match self
                .transport_streams
                .iter_mut()
                .find(|existing| existing.transport_stream_id == ts.transport_stream_id)
            {
                Some(existing) => existing.descriptors.extend(ts.descriptors),
                None => self.transport_streams.push(ts),
            }
        }
    }
}

/// Mapping from `bouquet_id` to the `BouquetRecord` built up for that bouquet.
///
/// Owned by the caller of a decode run, and updated by
/// [`BatReader`](../reader/struct.BatReader.html) as each section completes.
#[derive(Debug, Default, Clone)]
pub struct AggregateStore {
    records: HashMap<u16, BouquetRecord>,
}

impl AggregateStore {
    /// Create an empty store
    pub fn new() -> AggregateStore {
        AggregateStore::default()
    }

    /// Merge the given section into the record for its bouquet, creating the record if this is
    /// the first section seen for the bouquet.
    ///
    /// Sections whose number has already been merged are ignored, so repeated delivery of the
    /// same section leaves the record unchanged.
    pub fn merge(&mut self, section: BatSection) -> MergeOutcome {
        let bouquet_id = section.bouquet_id;
        let record = match self.records.entry(bouquet_id) {
            hash_map::Entry::Vacant(entry) => {
                debug!(
                    "new bouquet {} version {} (section {} of 0..={})",
                    bouquet_id,
                    section.version_number,
                    section.section_number,
                    section.last_section_number
                );
                entry.insert(BouquetRecord::new(&section))
            }
            hash_map::Entry::Occupied(entry) => {
                let record = entry.into_mut();
                if record.has_section(section.section_number) {
                    debug!(
                        "bouquet {} section {} already seen",
                        bouquet_id, section.section_number
                    );
                    return MergeOutcome {
                        bouquet_id,
                        duplicate: true,
                        complete: record.is_complete(),
                    };
                }
                record.update_bounds(&section);
                record
            }
        };
        let was_complete = record.is_complete();
        record.absorb(section);
        let complete = record.is_complete();
        if complete && !was_complete {
            debug!("bouquet {} complete", bouquet_id);
        }
        MergeOutcome {
            bouquet_id,
            duplicate: false,
            complete,
        }
    }

    /// Lookup the record for the given bouquet
    pub fn get(&self, bouquet_id: u16) -> Option<&BouquetRecord> {
        self.records.get(&bouquet_id)
    }

    /// True if a record exists for the given bouquet, and all its sections have been merged
    pub fn is_complete(&self, bouquet_id: u16) -> bool {
        self.get(bouquet_id).map_or(false, BouquetRecord::is_complete)
    }

    /// Iterate over all records, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &BouquetRecord> {
        self.records.values()
    }

    /// The ids of all bouquets seen, in ascending order
    pub fn bouquet_ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.records.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The number of bouquets seen
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no sections have been merged
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
