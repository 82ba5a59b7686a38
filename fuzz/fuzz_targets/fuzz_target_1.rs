#![no_main]

use dvb_bat_reader::{AggregateStore, BatReader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = BatReader::new();
    let mut store = AggregateStore::new();
    reader.push(&mut store, data);
    for record in store.iter() {
        let _ = record.is_complete();
        let _ = record.name();
    }
});
