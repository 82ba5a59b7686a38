//! Descriptors provide metadata about an element of a Transport Stream.
//!
//! Within the _Bouquet Association Table_, descriptors may be attached to the bouquet as a whole
//! (for example giving the bouquet's name), or to each of the transport streams that the bouquet
//! lists (for example giving the services carried, or a link to a software download service).
//!
//! The table decoder keeps descriptors as owned [`Descriptor`](struct.Descriptor.html) values
//! (a tag plus the undecoded payload bytes), since the decoded table outlives the packet data it
//! was read from.  A typed view of a descriptor can be produced on demand,
//!
//! ```
//! # use dvb_bat_reader::descriptor::{BatDescriptors, Descriptor};
//! let desc = Descriptor::new(0x47, b"Sky".to_vec());
//! if let Ok(BatDescriptors::BouquetName(name)) = desc.parse::<BatDescriptors<'_>>() {
//!     assert_eq!(name.name(), "Sky");
//! }
//! ```
//!
//! # Extensions
//!
//! Descriptors are a point of extension, with a range of descriptor types defined by the core
//! standards, and further private descriptor types defined by individual broadcasters.  Calling
//! code that wants to interpret private descriptors can define its own enum with the
//! [`descriptor_enum!()`](../macro.descriptor_enum.html) macro and pass that as the type parameter
//! of [`Descriptor::parse()`](struct.Descriptor.html#method.parse).

pub mod bouquet_name;
pub mod linkage;
pub mod service_list;

use self::bouquet_name::BouquetNameDescriptor;
use self::linkage::LinkageDescriptor;
use self::service_list::ServiceListDescriptor;
use log::warn;
use std::fmt;
use std::marker;

/// Tag of the descriptor carrying the over-the-air software update linkage which receivers
/// typically look for within the BAT.  The library does not parse this descriptor specially; the
/// constant exists so that callers can select matching descriptors.
pub const OTA_LINKAGE_DESCRIPTOR_TAG: u8 = 0x09;

/// Trait implemented by types that provide a typed view onto the payload of a single descriptor.
pub trait TypedDescriptor<'buf>: Sized {
    /// Create an instance from the given buffer, which starts with the 2-byte `descriptor_tag`,
    /// `descriptor_length` header.
    fn from_bytes(buf: &'buf [u8]) -> Result<Self, DescriptorError>;

    /// Create an instance from a tag value and the payload bytes that followed the header.
    fn from_parts(tag: u8, payload: &'buf [u8]) -> Result<Self, DescriptorError>;
}

/// Creates an enum which implements [`TypedDescriptor`](descriptor/trait.TypedDescriptor.html),
/// dispatching to a per-variant type depending on the descriptor tag.
#[macro_export]
macro_rules! descriptor_enum {
    (
        $(#[$outer:meta])*
        $name:ident {
            $(
                $(#[$inner:ident $($args:tt)*])*
                $case_name:ident $($tags:pat_param)|* => $t:ident
            ),*,
        }
    ) => {
        $(#[$outer])*
        pub enum $name<'buf> {
            $(
                $(#[$inner $($args)*])*
                $case_name($t<'buf>),
            )*
        }
        impl<'buf> $crate::descriptor::TypedDescriptor<'buf> for $name<'buf> {
            fn from_bytes(buf: &'buf[u8]) -> Result<Self, $crate::descriptor::DescriptorError> {
                if buf.len() <  2 {
                    return Err($crate::descriptor::DescriptorError::BufferTooShort {
                        buflen: buf.len(),
                    })
                }
                let tag = buf[0];
                let len = buf[1] as usize;
                let tag_end = len + 2;
                if tag_end > buf.len() {
                    return Err($crate::descriptor::DescriptorError::TagTooLongForBuffer {
                        taglen: len,
                        buflen: buf.len(),
                    })
                }
                Self::from_parts(tag, &buf[2..tag_end])
            }

            fn from_parts(
                tag: u8,
                payload: &'buf [u8],
            ) -> Result<Self, $crate::descriptor::DescriptorError> {
                match tag {
                    $( $( $tags )|* => Ok($name::$case_name($t::new(tag, payload)?)), )*
                    #[allow(unreachable_patterns)]
                    _ => Err($crate::descriptor::DescriptorError::UnhandledTagValue(tag)),
                }
            }
        }
    }
}

/// A descriptor, as held within a decoded table: the tag value, and the payload bytes following
/// the `descriptor_length` field.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Descriptor {
    /// the `descriptor_tag` value, identifying the kind of descriptor
    pub tag: u8,
    /// the descriptor payload, excluding the two header bytes
    pub data: Vec<u8>,
}
impl Descriptor {
    /// Panics if `data` is longer than the 255 bytes which the `descriptor_length` field can
    /// express.
    pub fn new(tag: u8, data: Vec<u8>) -> Descriptor {
        assert!(data.len() <= u8::MAX as usize);
        Descriptor { tag, data }
    }

    /// Interpret this descriptor's payload using the given `TypedDescriptor` implementation,
    /// for example [`BatDescriptors`](enum.BatDescriptors.html).
    pub fn parse<'a, Desc: TypedDescriptor<'a>>(&'a self) -> Result<Desc, DescriptorError> {
        Desc::from_parts(self.tag, &self.data[..])
    }

    /// The number of bytes this descriptor occupies within a descriptor loop, including the
    /// header.
    pub fn encoded_len(&self) -> usize {
        2 + self.data.len()
    }
}
impl<'buf> From<UnknownDescriptor<'buf>> for Descriptor {
    fn from(d: UnknownDescriptor<'buf>) -> Self {
        Descriptor {
            tag: d.tag,
            data: d.payload.to_vec(),
        }
    }
}
impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("Descriptor")
            .field("tag", &format_args!("{:#04x}", self.tag))
            .field("data", &format_args!("{:02x?}", self.data))
            .finish()
    }
}

/// Parse the descriptor loop held in `data`, returning the descriptors found and the number of
/// bytes they occupied.
///
/// Parsing stops at the first entry which does not fit in the remaining bytes, or when fewer
/// than 2 bytes remain; any such trailing bytes are not counted as consumed, and the descriptors
/// preceding them are still returned.
pub fn parse_descriptors(data: &[u8]) -> (Vec<Descriptor>, usize) {
    let mut descriptors = vec![];
    let mut consumed = 0;
    for desc in DescriptorIter::<UnknownDescriptor<'_>>::new(data) {
        match desc {
            Ok(desc) => {
                consumed += 2 + desc.payload.len();
                descriptors.push(desc.into());
            }
            Err(e) => {
                warn!(
                    "dropping malformed descriptor at offset {} of {}: {:?}",
                    consumed,
                    data.len(),
                    e
                );
                break;
            }
        }
    }
    (descriptors, consumed)
}

/// A descriptor whose tag is not given any more specific interpretation.
pub struct UnknownDescriptor<'buf> {
    /// the `descriptor_tag` value
    pub tag: u8,
    /// the descriptor payload bytes
    pub payload: &'buf [u8],
}
impl<'buf> UnknownDescriptor<'buf> {
    /// Construct an `UnknownDescriptor`; never fails.
    pub fn new(tag: u8, payload: &'buf [u8]) -> Result<UnknownDescriptor<'buf>, DescriptorError> {
        Ok(UnknownDescriptor { tag, payload })
    }
}
impl<'buf> TypedDescriptor<'buf> for UnknownDescriptor<'buf> {
    fn from_bytes(buf: &'buf [u8]) -> Result<Self, DescriptorError> {
        if buf.len() < 2 {
            return Err(DescriptorError::BufferTooShort { buflen: buf.len() });
        }
        let len = buf[1] as usize;
        if len + 2 > buf.len() {
            return Err(DescriptorError::TagTooLongForBuffer {
                taglen: len,
                buflen: buf.len(),
            });
        }
        UnknownDescriptor::new(buf[0], &buf[2..len + 2])
    }

    fn from_parts(tag: u8, payload: &'buf [u8]) -> Result<Self, DescriptorError> {
        UnknownDescriptor::new(tag, payload)
    }
}
impl<'buf> fmt::Debug for UnknownDescriptor<'buf> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("UnknownDescriptor")
            .field("tag", &self.tag)
            .field("len", &self.payload.len())
            .finish()
    }
}

descriptor_enum! {
    /// The descriptors of interest when reading a _Bouquet Association Table_, per
    /// _ETSI EN 300 468_.
    #[derive(Debug)]
    BatDescriptors {
        /// `service_list_descriptor`
        ServiceList 0x41 => ServiceListDescriptor,
        /// `bouquet_name_descriptor`
        BouquetName 0x47 => BouquetNameDescriptor,
        /// `linkage_descriptor`
        Linkage 0x4a => LinkageDescriptor,
        /// any other tag value
        Unknown 0..=0x40 | 0x42..=0x46 | 0x48 | 0x49 | 0x4b..=0xff => UnknownDescriptor,
    }
}

/// Iterator over the descriptors in a borrowed descriptor loop.
pub struct DescriptorIter<'buf, Desc>
where
    Desc: TypedDescriptor<'buf>,
{
    buf: &'buf [u8],
    phantom: marker::PhantomData<Desc>,
}
impl<'buf, Desc> DescriptorIter<'buf, Desc>
where
    Desc: TypedDescriptor<'buf>,
{
    /// Create an iterator over all the descriptors in the given slice
    pub fn new(buf: &'buf [u8]) -> DescriptorIter<'buf, Desc> {
        DescriptorIter {
            buf,
            phantom: marker::PhantomData,
        }
    }
}
impl<'buf, Desc> Iterator for DescriptorIter<'buf, Desc>
where
    Desc: TypedDescriptor<'buf>,
{
    type Item = Result<Desc, DescriptorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }
        if self.buf.len() < 2 {
            let buflen = self.buf.len();
            self.buf = &self.buf[0..0];
            return Some(Err(DescriptorError::BufferTooShort { buflen }));
        }
        let tag = self.buf[0];
        let len = self.buf[1] as usize;
        let remaining_size = self.buf.len() - 2;
        if len > remaining_size {
            // ensure anther call to next() will yield None,
            self.buf = &self.buf[0..0];
            Some(Err(DescriptorError::NotEnoughData {
                tag,
                actual: remaining_size,
                expected: len,
            }))
        } else {
            let (desc, rest) = self.buf.split_at(len + 2);
            self.buf = rest;
            Some(Desc::from_bytes(desc))
        }
    }
}

/// An error encountered while parsing a descriptor.
#[derive(Debug, PartialEq, Eq)]
pub enum DescriptorError {
    /// There are not enough bytes to hold the descriptor payload, or the fields the payload
    /// should contain.
    NotEnoughData {
        /// the tag of the descriptor in question
        tag: u8,
        /// the number of bytes actually available
        actual: usize,
        /// the number of bytes required
        expected: usize,
    },
    /// The `descriptor_length` field exceeds the size of the buffer given to `from_bytes()`
    TagTooLongForBuffer {
        /// the value of `descriptor_length`
        taglen: usize,
        /// the size of the buffer
        buflen: usize,
    },
    /// Fewer than the 2 bytes needed for a descriptor header remain
    BufferTooShort {
        /// the size of the buffer
        buflen: usize,
    },
    /// The descriptor tag is not one the requested `TypedDescriptor` type handles
    UnhandledTagValue(u8),
}

pub(crate) fn descriptor_len(buf: &[u8], tag: u8, len: usize) -> Result<(), DescriptorError> {
    if buf.len() < len {
        Err(DescriptorError::NotEnoughData {
            tag,
            actual: buf.len(),
            expected: len,
        })
    } else {
        Ok(())
    }
}
