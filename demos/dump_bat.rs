//! Prints the bouquets found in a transport stream capture.
//!
//! ```text
//! cargo run --example dump_bat -- capture.ts [bouquet_id [transport_stream_id]]
//! ```
//!
//! Given a bouquet id (and optionally a transport stream id), only the OTA linkage descriptors of
//! the matching transport streams are dumped, and reading stops once that bouquet is complete.

use dvb_bat_reader::descriptor::OTA_LINKAGE_DESCRIPTOR_TAG;
use dvb_bat_reader::packet::Packet;
use dvb_bat_reader::{AggregateStore, BatReader, BouquetRecord, Descriptor};
use hex_slice::AsHex;
use std::env;
use std::fs::File;
use std::io::Read;

fn dump_descriptor(indent: &str, desc: &Descriptor) {
    println!(
        "{}tag={:#04x} len={} {:x}",
        indent,
        desc.tag,
        desc.data.len(),
        desc.data.plain_hex(false)
    );
}

fn dump_bouquet(record: &BouquetRecord, transport_stream_id: Option<u16>, ota_only: bool) {
    println!(
        "bouquet {} version={} sections={}/{} complete={} name={:?}",
        record.bouquet_id(),
        record.version_number(),
        record.seen_sections().count_ones(..),
        u16::from(record.last_section_number()) + 1,
        record.is_complete(),
        record.name().unwrap_or_default(),
    );
    if !ota_only {
        for desc in record.bouquet_descriptors() {
            dump_descriptor("  ", desc);
        }
    }
    for ts in record.transport_streams() {
        if transport_stream_id.map_or(false, |id| id != ts.transport_stream_id) {
            continue;
        }
        println!(
            "  transport_stream_id={} original_network_id={}",
            ts.transport_stream_id, ts.original_network_id
        );
        for desc in ts.descriptors.iter() {
            if !ota_only || desc.tag == OTA_LINKAGE_DESCRIPTOR_TAG {
                dump_descriptor("    ", desc);
            }
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // input file, and optional filters, named on command line
    let mut args = env::args().skip(1);
    let name = args.next().expect("usage: dump_bat <file> [bouquet_id [transport_stream_id]]");
    let bouquet_id: Option<u16> = args
        .next()
        .map(|v| v.parse().expect("bouquet_id must be a number"));
    let transport_stream_id: Option<u16> = args
        .next()
        .map(|v| v.parse().expect("transport_stream_id must be a number"));
    let mut f = File::open(&name).unwrap_or_else(|_| panic!("file not found: {}", &name));

    let mut reader = BatReader::new();
    let mut store = AggregateStore::new();

    // consume the input file, holding back any partial packet until the next read
    let mut buf = vec![0u8; Packet::SIZE * 1024];
    let mut pending = 0;
    loop {
        let n = match f.read(&mut buf[pending..]).expect("read failed") {
            0 => break,
            n => pending + n,
        };
        let whole = n - n % Packet::SIZE;
        match bouquet_id {
            Some(id) => {
                reader.push_until_complete(&mut store, &buf[..whole], id);
                if store.is_complete(id) {
                    break;
                }
            }
            None => reader.push(&mut store, &buf[..whole]),
        }
        buf.copy_within(whole..n, 0);
        pending = n - whole;
    }

    match bouquet_id {
        Some(id) => match store.get(id) {
            Some(record) => dump_bouquet(record, transport_stream_id, true),
            None => println!("bouquet {} not found", id),
        },
        None => {
            for id in store.bouquet_ids() {
                if let Some(record) = store.get(id) {
                    dump_bouquet(record, transport_stream_id, false);
                }
            }
        }
    }
}
