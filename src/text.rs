//! Decoding of the text strings carried in DVB descriptors, per _ETSI EN 300 468, Annex A_.
//!
//! The first byte of a string may select a character table; strings not starting with a
//! selector byte use the default table.

use encoding_rs::Encoding;
use std::borrow::Cow;

// the default table is a profile of ISO/IEC 6937, which encoding_rs does not provide;
// windows-1252 agrees with it for the printable ASCII range that bouquet names mostly use
fn default_table() -> &'static Encoding {
    encoding_rs::WINDOWS_1252
}

fn iso_8859_part(part: u8) -> Option<&'static Encoding> {
    Some(match part {
        1 => encoding_rs::WINDOWS_1252,
        2 => encoding_rs::ISO_8859_2,
        3 => encoding_rs::ISO_8859_3,
        4 => encoding_rs::ISO_8859_4,
        5 => encoding_rs::ISO_8859_5,
        6 => encoding_rs::ISO_8859_6,
        7 => encoding_rs::ISO_8859_7,
        8 => encoding_rs::ISO_8859_8,
        9 => encoding_rs::WINDOWS_1254,
        10 => encoding_rs::ISO_8859_10,
        11 => encoding_rs::WINDOWS_874,
        13 => encoding_rs::ISO_8859_13,
        14 => encoding_rs::ISO_8859_14,
        15 => encoding_rs::ISO_8859_15,
        16 => encoding_rs::ISO_8859_16,
        _ => return None,
    })
}

/// Identify the character table in use, returning the encoding and the text bytes that follow
/// any table selector.
fn select_table(buf: &[u8]) -> (&'static Encoding, &[u8], bool) {
    match buf[0] {
        0x01..=0x0b => match iso_8859_part(buf[0] + 4) {
            Some(enc) => (enc, &buf[1..], true),
            None => (default_table(), &buf[1..], true),
        },
        0x10 if buf.len() >= 3 => match iso_8859_part(buf[2]) {
            Some(enc) if buf[1] == 0 => (enc, &buf[3..], true),
            _ => (default_table(), &buf[3..], true),
        },
        0x11 => (encoding_rs::UTF_16BE, &buf[1..], false),
        0x12 => (encoding_rs::EUC_KR, &buf[1..], false),
        0x13 => (encoding_rs::GBK, &buf[1..], false),
        0x14 => (encoding_rs::BIG5, &buf[1..], false),
        0x15 => (encoding_rs::UTF_8, &buf[1..], false),
        0x00..=0x1f => (default_table(), &buf[1..], true),
        _ => (default_table(), buf, true),
    }
}

/// Decode a DVB text string into Rust's native representation.
///
/// For single-byte character tables, the emphasis control codes `0x86`/`0x87` are removed and the
/// `0x8a` line break becomes `'\n'`.  Invalid sequences decode to the replacement character.
pub fn decode_dvb_text(buf: &[u8]) -> Cow<'_, str> {
    if buf.is_empty() {
        return Cow::Borrowed("");
    }
    let (encoding, text, single_byte) = select_table(buf);
    if !single_byte {
        let (decoded, _had_errors) = encoding.decode_without_bom_handling(text);
        return decoded;
    }
    if !text.iter().any(|&b| (0x80..=0x9f).contains(&b)) {
        let (decoded, _had_errors) = encoding.decode_without_bom_handling(text);
        return decoded;
    }
    let mut result = String::with_capacity(text.len());
    for (i, chunk) in text.split(|&b| b == 0x8a).enumerate() {
        if i > 0 {
            result.push('\n');
        }
        let printable: Vec<u8> = chunk
            .iter()
            .cloned()
            .filter(|b| !(0x80..=0x9f).contains(b))
            .collect();
        let (decoded, _had_errors) = encoding.decode_without_bom_handling(&printable);
        result.push_str(&decoded);
    }
    Cow::Owned(result)
}
