//! Gives the name of the bouquet, as displayed to the viewer.
//!
//! Appears in the first descriptor loop of the _Bouquet Association Table_ (and may also appear in
//! the SDT).

use super::DescriptorError;
use crate::text;
use std::borrow::Cow;
use std::fmt;

/// The name of a bouquet, held as DVB text
pub struct BouquetNameDescriptor<'buf> {
    buf: &'buf [u8],
}
impl<'buf> BouquetNameDescriptor<'buf> {
    /// The descriptor tag value which identifies the descriptor as a `BouquetNameDescriptor`.
    pub const TAG: u8 = 0x47;
    /// Construct a `BouquetNameDescriptor` instance that will parse the data from the given
    /// slice.
    pub fn new(_tag: u8, buf: &'buf [u8]) -> Result<BouquetNameDescriptor<'buf>, DescriptorError> {
        Ok(BouquetNameDescriptor { buf })
    }

    /// The undecoded bytes of the name, including any character table selector
    pub fn raw(&self) -> &'buf [u8] {
        self.buf
    }

    /// The name, decoded per the character table it selects
    pub fn name(&self) -> Cow<'buf, str> {
        text::decode_dvb_text(self.buf)
    }
}

impl fmt::Debug for BouquetNameDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BouquetNameDescriptor")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::super::{BatDescriptors, TypedDescriptor};
    use assert_matches::assert_matches;
    use hex_literal::*;

    #[test]
    fn descriptor() {
        let data = hex!("4708 426f757175657431");
        let desc = BatDescriptors::from_bytes(&data[..]).unwrap();
        assert_matches!(desc, BatDescriptors::BouquetName(bouquet_name) => {
            assert_eq!(bouquet_name.name(), "Bouquet1");
            assert_eq!(bouquet_name.raw().len(), 8);
            assert!(!format!("{:?}", bouquet_name).is_empty());
        });
    }
}
