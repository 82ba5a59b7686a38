//! Identifies a service which can supply extra information about the entity the descriptor is
//! attached to, such as the system software update service receivers use for over-the-air
//! upgrades.

use super::descriptor_len;
use super::DescriptorError;
use std::fmt;

/// The purpose of a linkage, per _ETSI EN 300 468, Table 58_.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LinkageType {
    /// `0x01`
    Information,
    /// `0x02`
    ElectronicProgrammeGuide,
    /// `0x04`
    TsContainingCompleteSi,
    /// `0x05`
    ServiceReplacement,
    /// `0x06`
    DataBroadcast,
    /// `0x09`, the service carrying over-the-air software updates
    SystemSoftwareUpdate,
    /// `0x0a`
    TsContainingSsuBatOrNit,
    /// `0x0b`
    IpMacNotification,
    /// Any other value, either reserved or user defined
    Other(u8),
}
impl From<u8> for LinkageType {
    fn from(v: u8) -> Self {
        match v {
            0x01 => LinkageType::Information,
            0x02 => LinkageType::ElectronicProgrammeGuide,
            0x04 => LinkageType::TsContainingCompleteSi,
            0x05 => LinkageType::ServiceReplacement,
            0x06 => LinkageType::DataBroadcast,
            0x09 => LinkageType::SystemSoftwareUpdate,
            0x0a => LinkageType::TsContainingSsuBatOrNit,
            0x0b => LinkageType::IpMacNotification,
            _ => LinkageType::Other(v),
        }
    }
}

/// Points at a service, by `transport_stream_id`, `original_network_id` and `service_id`.
pub struct LinkageDescriptor<'buf> {
    buf: &'buf [u8],
}
impl<'buf> LinkageDescriptor<'buf> {
    /// The descriptor tag value which identifies the descriptor as a `LinkageDescriptor`.
    pub const TAG: u8 = 0x4a;
    const HEADER_SIZE: usize = 7;

    /// Construct a `LinkageDescriptor` instance that will parse the data from the given slice.
    pub fn new(tag: u8, buf: &'buf [u8]) -> Result<LinkageDescriptor<'buf>, DescriptorError> {
        descriptor_len(buf, tag, Self::HEADER_SIZE)?;
        Ok(LinkageDescriptor { buf })
    }

    /// The transport stream carrying the linked service
    pub fn transport_stream_id(&self) -> u16 {
        u16::from(self.buf[0]) << 8 | u16::from(self.buf[1])
    }
    /// The network which originated the linked transport stream
    pub fn original_network_id(&self) -> u16 {
        u16::from(self.buf[2]) << 8 | u16::from(self.buf[3])
    }
    /// The linked service within its transport stream
    pub fn service_id(&self) -> u16 {
        u16::from(self.buf[4]) << 8 | u16::from(self.buf[5])
    }
    /// Why the service is linked
    pub fn linkage_type(&self) -> LinkageType {
        LinkageType::from(self.buf[6])
    }
    /// Bytes following the fixed fields, whose syntax depends on `linkage_type()`
    pub fn private_data(&self) -> &'buf [u8] {
        &self.buf[Self::HEADER_SIZE..]
    }
}

impl fmt::Debug for LinkageDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkageDescriptor")
            .field("transport_stream_id", &self.transport_stream_id())
            .field("original_network_id", &self.original_network_id())
            .field("service_id", &self.service_id())
            .field("linkage_type", &self.linkage_type())
            .field("private_data", &format!("{:x?}", self.private_data()))
            .finish()
    }
}
