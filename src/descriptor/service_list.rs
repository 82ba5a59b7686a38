//! Lists the services carried by a transport stream, together with their service types.
//!
//! Appears in the transport stream loop of the _Bouquet Association Table_ to tell which of the
//! transport stream's services belong to the bouquet.

use super::DescriptorError;
use std::fmt;

/// The kind of service, per _ETSI EN 300 468, Table 87_.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ServiceType {
    /// `0x01`
    DigitalTelevision,
    /// `0x02`
    DigitalRadioSound,
    /// `0x03`
    Teletext,
    /// `0x0c`
    DataBroadcast,
    /// `0x16`
    AdvancedCodecSdDigitalTelevision,
    /// `0x19`
    AdvancedCodecHdDigitalTelevision,
    /// `0x1f`
    HevcDigitalTelevision,
    /// Any other value, either reserved or user defined
    Other(u8),
}
impl From<u8> for ServiceType {
    fn from(v: u8) -> Self {
        match v {
            0x01 => ServiceType::DigitalTelevision,
            0x02 => ServiceType::DigitalRadioSound,
            0x03 => ServiceType::Teletext,
            0x0c => ServiceType::DataBroadcast,
            0x16 => ServiceType::AdvancedCodecSdDigitalTelevision,
            0x19 => ServiceType::AdvancedCodecHdDigitalTelevision,
            0x1f => ServiceType::HevcDigitalTelevision,
            _ => ServiceType::Other(v),
        }
    }
}

/// One entry of a `ServiceListDescriptor`
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Service {
    /// identifies the service within its transport stream
    pub service_id: u16,
    /// the kind of service
    pub service_type: ServiceType,
}

/// Lists `service_id` / `service_type` pairs
pub struct ServiceListDescriptor<'buf> {
    buf: &'buf [u8],
}
impl<'buf> ServiceListDescriptor<'buf> {
    /// The descriptor tag value which identifies the descriptor as a `ServiceListDescriptor`.
    pub const TAG: u8 = 0x41;
    const ENTRY_SIZE: usize = 3;

    /// Construct a `ServiceListDescriptor` instance that will parse the data from the given
    /// slice.
    pub fn new(tag: u8, buf: &'buf [u8]) -> Result<ServiceListDescriptor<'buf>, DescriptorError> {
        if buf.len() % Self::ENTRY_SIZE != 0 {
            return Err(DescriptorError::NotEnoughData {
                tag,
                actual: buf.len(),
                expected: (buf.len() / Self::ENTRY_SIZE + 1) * Self::ENTRY_SIZE,
            });
        }
        Ok(ServiceListDescriptor { buf })
    }

    /// Iterate over the listed services
    pub fn services(&self) -> impl Iterator<Item = Service> + 'buf {
        self.buf.chunks_exact(Self::ENTRY_SIZE).map(|entry| Service {
            service_id: u16::from(entry[0]) << 8 | u16::from(entry[1]),
            service_type: ServiceType::from(entry[2]),
        })
    }
}

struct ServicesDebug<'buf>(&'buf ServiceListDescriptor<'buf>);
impl<'buf> fmt::Debug for ServicesDebug<'buf> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.services()).finish()
    }
}
impl fmt::Debug for ServiceListDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceListDescriptor")
            .field("services", &ServicesDebug(self))
            .finish()
    }
}
