use bitstream_io::{BigEndian, BitWrite, BitWriter};
use dvb_bat_reader::descriptor::{BatDescriptors, OTA_LINKAGE_DESCRIPTOR_TAG};
use dvb_bat_reader::packet::Packet;
use dvb_bat_reader::psi::bat::{self, BAT_TABLE_ID};
use dvb_bat_reader::{AggregateStore, BatReader, BatSection, Descriptor, TransportStream};
use std::io;

const BAT_PID: u16 = 0x0011;
const NIT_PID: u16 = 0x0010;
const PAYLOAD_SIZE: usize = Packet::SIZE - 4;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write_descriptors(
    w: &mut BitWriter<Vec<u8>, BigEndian>,
    descs: &[Descriptor],
) -> io::Result<()> {
    let len: usize = descs.iter().map(Descriptor::encoded_len).sum();
    w.write(4, 0b1111u8)?; // reserved_future_use
    w.write(12, len as u16)?;
    for d in descs {
        w.write(8, d.tag)?;
        w.write(8, d.data.len() as u8)?;
        w.write_bytes(&d.data)?;
    }
    Ok(())
}

/// serialise a section, with a dummy CRC
fn encode_section(s: &BatSection) -> io::Result<Vec<u8>> {
    let bouquet_descriptors_len: usize = s
        .bouquet_descriptors
        .iter()
        .map(Descriptor::encoded_len)
        .sum();
    let loop_len: usize = s
        .transport_streams
        .iter()
        .map(|ts| 6 + ts.descriptors.iter().map(Descriptor::encoded_len).sum::<usize>())
        .sum();
    let section_length = 5 + 2 + bouquet_descriptors_len + 2 + loop_len + 4;

    let mut w = BitWriter::endian(Vec::new(), BigEndian);
    w.write(8, BAT_TABLE_ID)?;
    w.write_bit(true)?; // section_syntax_indicator
    w.write_bit(true)?; // reserved_future_use
    w.write(2, 0b11u8)?; // reserved
    w.write(12, section_length as u16)?;
    w.write(16, s.bouquet_id)?;
    w.write(2, 0b11u8)?; // reserved
    w.write(5, s.version_number)?;
    w.write_bit(true)?; // current_next_indicator
    w.write(8, s.section_number)?;
    w.write(8, s.last_section_number)?;
    write_descriptors(&mut w, &s.bouquet_descriptors)?;
    w.write(4, 0b1111u8)?; // reserved_future_use
    w.write(12, loop_len as u16)?;
    for ts in &s.transport_streams {
        w.write(16, ts.transport_stream_id)?;
        w.write(16, ts.original_network_id)?;
        write_descriptors(&mut w, &ts.descriptors)?;
    }
    w.write(32, 0xdead_beefu32)?; // CRC_32, not checked
    Ok(w.into_writer())
}

fn section_bytes(s: &BatSection) -> Vec<u8> {
    encode_section(s).unwrap()
}

/// Split `data` across as many packets as needed, the first carrying the pointer field, with
/// the remainder of the final packet stuffed with `0xff`
fn packetise(pid: u16, data: &[u8]) -> Vec<Vec<u8>> {
    data.chunks(PAYLOAD_SIZE)
        .enumerate()
        .map(|(i, payload)| {
            let mut pk = vec![0xffu8; Packet::SIZE];
            pk[0] = Packet::SYNC_BYTE;
            pk[1] = (pid >> 8) as u8;
            if i == 0 {
                pk[1] |= 0b0100_0000;
            }
            pk[2] = pid as u8;
            pk[3] = 0b0001_0000 | (i as u8 & 0x0f);
            pk[4..4 + payload.len()].copy_from_slice(payload);
            pk
        })
        .collect()
}

/// A payload unit holding the given sections back to back, preceded by a zero pointer field
fn payload_unit(sections: &[Vec<u8>]) -> Vec<u8> {
    let mut data = vec![0];
    for s in sections {
        data.extend_from_slice(s);
    }
    data
}

fn ts(id: u16, descriptors: Vec<Descriptor>) -> TransportStream {
    TransportStream {
        transport_stream_id: id,
        original_network_id: 0x0002,
        descriptors,
    }
}

fn bat(
    bouquet_id: u16,
    number: u8,
    last: u8,
    transport_streams: Vec<TransportStream>,
) -> BatSection {
    BatSection {
        bouquet_id,
        version_number: 5,
        section_number: number,
        last_section_number: last,
        bouquet_descriptors: vec![],
        transport_streams,
    }
}

fn ota_linkage(id: u8) -> Descriptor {
    Descriptor::new(OTA_LINKAGE_DESCRIPTOR_TAG, vec![id, 0x00, 0x01, 0x02])
}

#[test]
fn encoded_section_decodes() {
    let mut s = bat(25000, 0, 0, vec![ts(24682, vec![ota_linkage(1)])]);
    s.bouquet_descriptors = vec![Descriptor::new(0x47, b"Bouquet1".to_vec())];
    let decoded = bat::decode_section(&section_bytes(&s)).unwrap();
    assert_eq!(decoded, s);
}

#[test]
fn section_split_across_three_packets() {
    init_logging();
    let streams = (0..40)
        .map(|i| ts(1000 + i, vec![ota_linkage(i as u8)]))
        .collect();
    let mut s = bat(25000, 0, 0, streams);
    s.bouquet_descriptors = vec![Descriptor::new(0x47, b"Bouquet1".to_vec())];
    let section = section_bytes(&s);

    // the first packet starts with the tail of some earlier section, skipped by the pointer field
    let tail = [0x12u8; 10];
    let mut data = vec![tail.len() as u8];
    data.extend_from_slice(&tail);
    data.extend_from_slice(&section);
    let packets = packetise(BAT_PID, &data);
    assert_eq!(packets.len(), 3);

    let mut reader = BatReader::new();
    let mut store = AggregateStore::new();
    assert!(reader.consume_packet(&mut store, &packets[0]).is_empty());
    assert!(reader.consume_packet(&mut store, &packets[1]).is_empty());
    let outcomes = reader.consume_packet(&mut store, &packets[2]).to_vec();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].complete);

    let record = store.get(25000).unwrap();
    assert!(record.is_complete());
    assert_eq!(record.last_section_number(), 0);
    assert!(record.has_section(0));
    assert_eq!(record.name(), Some("Bouquet1".to_string()));
    assert_eq!(record.transport_streams(), &s.transport_streams[..]);
    assert_eq!(
        record
            .transport_stream(1039)
            .unwrap()
            .descriptors_with_tag(OTA_LINKAGE_DESCRIPTOR_TAG)
            .count(),
        1
    );
}

#[test]
fn section_longer_than_1021_bytes() {
    init_logging();
    let streams = (0..90).map(|i| ts(i, vec![ota_linkage(i as u8)])).collect();
    let section = section_bytes(&bat(31, 0, 0, streams));
    assert_eq!(section.len(), 1096);
    assert!(bat::decode_section(&section).is_ok());

    let mut buf = vec![];
    for pk in packetise(BAT_PID, &payload_unit(&[section])) {
        buf.extend(pk);
    }
    assert_eq!(buf.len(), 6 * Packet::SIZE);
    let mut reader = BatReader::new();
    let mut store = AggregateStore::new();
    reader.push(&mut store, &buf);
    let record = store.get(31).unwrap();
    assert!(record.is_complete());
    assert_eq!(record.transport_streams().len(), 90);
}

#[test]
fn sections_out_of_order() {
    init_logging();
    let second = section_bytes(&bat(7, 1, 1, vec![ts(200, vec![])]));
    let first = section_bytes(&bat(7, 0, 1, vec![ts(100, vec![])]));

    let mut reader = BatReader::new();
    let mut store = AggregateStore::new();
    for pk in packetise(BAT_PID, &payload_unit(&[second])) {
        reader.consume_packet(&mut store, &pk);
    }
    assert!(!store.is_complete(7));
    assert_eq!(store.get(7).unwrap().transport_streams().len(), 1);

    for pk in packetise(BAT_PID, &payload_unit(&[first])) {
        reader.consume_packet(&mut store, &pk);
    }
    let record = store.get(7).unwrap();
    assert!(record.is_complete());
    assert!(record.transport_stream(100).is_some());
    assert!(record.transport_stream(200).is_some());
}

#[test]
fn transport_stream_in_two_sections() {
    init_logging();
    let name = Descriptor::new(0x41, vec![0x13, 0x89, 0x01]);
    let first = section_bytes(&bat(7, 0, 1, vec![ts(100, vec![ota_linkage(1)])]));
    let second = section_bytes(&bat(7, 1, 1, vec![ts(100, vec![name.clone()])]));

    // both sections packed into a single payload unit
    let data = payload_unit(&[first, second]);
    let packets = packetise(BAT_PID, &data);
    assert_eq!(packets.len(), 1);
    let mut store = AggregateStore::new();
    let mut reader = BatReader::new();
    let outcomes = reader.consume_packet(&mut store, &packets[0]).to_vec();
    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].complete);
    assert!(outcomes[1].complete);

    let record = store.get(7).unwrap();
    assert_eq!(record.transport_streams().len(), 1);
    assert_eq!(
        record.transport_stream(100).unwrap().descriptors,
        vec![ota_linkage(1), name]
    );
    let services = record.transport_stream(100).unwrap().descriptors[1]
        .parse::<BatDescriptors<'_>>()
        .unwrap();
    match services {
        BatDescriptors::ServiceList(list) => assert_eq!(list.services().count(), 1),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn repeated_sections_are_idempotent() {
    init_logging();
    let section = section_bytes(&bat(7, 0, 0, vec![ts(100, vec![ota_linkage(1)])]));
    let packets = packetise(BAT_PID, &payload_unit(&[section]));

    let once = dvb_bat_reader::decode_packets(packets.iter().map(|p| &p[..]));
    let thrice = dvb_bat_reader::decode_packets(
        packets
            .iter()
            .chain(packets.iter())
            .chain(packets.iter())
            .map(|p| &p[..]),
    );
    assert_eq!(once.get(7), thrice.get(7));
    assert!(thrice.is_complete(7));
}

#[test]
fn other_pids_and_damaged_packets_ignored() {
    init_logging();
    let section = section_bytes(&bat(9, 0, 0, vec![ts(1, vec![])]));
    let mut buf = vec![];
    // a NIT-looking section on the NIT PID
    for pk in packetise(NIT_PID, &payload_unit(&[section.clone()])) {
        buf.extend(pk);
    }
    // a BAT packet with a corrupted sync byte
    for mut pk in packetise(BAT_PID, &payload_unit(&[section.clone()])) {
        pk[0] = 0x46;
        buf.extend(pk);
    }
    let mut reader = BatReader::new();
    let mut store = AggregateStore::new();
    reader.push(&mut store, &buf);
    assert!(store.is_empty());

    for pk in packetise(BAT_PID, &payload_unit(&[section])) {
        buf.extend(pk);
    }
    let consumed = reader.push_until_complete(&mut store, &buf, 9);
    assert_eq!(consumed, buf.len());
    assert!(store.is_complete(9));
}
