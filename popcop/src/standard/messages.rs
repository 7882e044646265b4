//! Register exchange, device management and bootloader messages.
//!
//! Every message carries the 2-byte little-endian message ID followed by a
//! fixed positional body. Timestamps are microseconds since an
//! endpoint-defined epoch.

use heapless::Vec;

use crate::presentation::{StreamDecoder, StreamEncoder};

use super::register::{RegisterFlags, RegisterName, RegisterValue};
use super::{check_header, write_header, MessageId, MESSAGE_HEADER_SIZE};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum payload of one bootloader image data chunk.
pub const IMAGE_DATA_CAPACITY: usize = 256;

const REGISTER_DATA_REQUEST_MAX: usize =
    MESSAGE_HEADER_SIZE + RegisterName::MAX_ENCODED_SIZE + RegisterValue::MAX_ENCODED_SIZE;
const REGISTER_DATA_RESPONSE_MAX: usize = REGISTER_DATA_REQUEST_MAX + 8 + 1;
const REGISTER_DISCOVERY_REQUEST_SIZE: usize = MESSAGE_HEADER_SIZE + 2;
const REGISTER_DISCOVERY_RESPONSE_MAX: usize =
    MESSAGE_HEADER_SIZE + 2 + RegisterName::MAX_ENCODED_SIZE;
const DEVICE_MANAGEMENT_REQUEST_SIZE: usize = MESSAGE_HEADER_SIZE + 2;
const DEVICE_MANAGEMENT_RESPONSE_SIZE: usize = MESSAGE_HEADER_SIZE + 2 + 1;
const BOOTLOADER_STATUS_REQUEST_SIZE: usize = MESSAGE_HEADER_SIZE + 1;
const BOOTLOADER_STATUS_RESPONSE_SIZE: usize = MESSAGE_HEADER_SIZE + 8 + 8 + 1;
const BOOTLOADER_IMAGE_DATA_MAX: usize = MESSAGE_HEADER_SIZE + 8 + 1 + IMAGE_DATA_CAPACITY;

/// Request for the value of a named register, or a write when a value is
/// attached.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegisterDataRequestMessage {
    pub name: RegisterName,
    pub value: RegisterValue,
}

impl RegisterDataRequestMessage {
    pub const ID: MessageId = MessageId::RegisterDataRequest;
    pub const MIN_ENCODED_SIZE: usize =
        MESSAGE_HEADER_SIZE + RegisterName::MIN_ENCODED_SIZE + RegisterValue::MIN_ENCODED_SIZE;
    pub const MAX_ENCODED_SIZE: usize = REGISTER_DATA_REQUEST_MAX;

    pub fn encode(&self) -> Vec<u8, REGISTER_DATA_REQUEST_MAX> {
        let mut out = Vec::new();
        let mut encoder = StreamEncoder::new(&mut out);
        write_header(&mut encoder, Self::ID);
        self.name.encode(&mut encoder);
        self.value.encode(&mut encoder);
        out
    }

    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::MIN_ENCODED_SIZE || bytes.len() > Self::MAX_ENCODED_SIZE {
            return None;
        }
        let mut decoder = StreamDecoder::new(bytes);
        check_header(&mut decoder, Self::ID)?;
        let name = RegisterName::try_decode(&mut decoder)?;
        let value = RegisterValue::try_decode(&mut decoder)?;
        Some(Self { name, value })
    }
}

/// Register value response with sampling time and access flags.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegisterDataResponseMessage {
    /// Time of sampling, microseconds.
    pub timestamp_usec: u64,
    pub flags: RegisterFlags,
    pub name: RegisterName,
    pub value: RegisterValue,
}

impl RegisterDataResponseMessage {
    pub const ID: MessageId = MessageId::RegisterDataResponse;
    pub const MIN_ENCODED_SIZE: usize = MESSAGE_HEADER_SIZE
        + 8
        + 1
        + RegisterName::MIN_ENCODED_SIZE
        + RegisterValue::MIN_ENCODED_SIZE;
    pub const MAX_ENCODED_SIZE: usize = REGISTER_DATA_RESPONSE_MAX;

    pub fn encode(&self) -> Vec<u8, REGISTER_DATA_RESPONSE_MAX> {
        let mut out = Vec::new();
        let mut encoder = StreamEncoder::new(&mut out);
        write_header(&mut encoder, Self::ID);
        encoder.add_u64(self.timestamp_usec);
        encoder.add_u8(self.flags.value);
        self.name.encode(&mut encoder);
        self.value.encode(&mut encoder);
        out
    }

    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::MIN_ENCODED_SIZE || bytes.len() > Self::MAX_ENCODED_SIZE {
            return None;
        }
        let mut decoder = StreamDecoder::new(bytes);
        check_header(&mut decoder, Self::ID)?;
        let timestamp_usec = decoder.fetch_u64()?;
        let flags = RegisterFlags {
            value: decoder.fetch_u8()?,
        };
        let name = RegisterName::try_decode(&mut decoder)?;
        let value = RegisterValue::try_decode(&mut decoder)?;
        Some(Self {
            timestamp_usec,
            flags,
            name,
            value,
        })
    }
}

/// Request for the name of the register at an index, used to walk the
/// register space of an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegisterDiscoveryRequestMessage {
    pub index: u16,
}

impl RegisterDiscoveryRequestMessage {
    pub const ID: MessageId = MessageId::RegisterDiscoveryRequest;
    pub const MIN_ENCODED_SIZE: usize = REGISTER_DISCOVERY_REQUEST_SIZE;
    pub const MAX_ENCODED_SIZE: usize = REGISTER_DISCOVERY_REQUEST_SIZE;

    pub fn encode(&self) -> Vec<u8, REGISTER_DISCOVERY_REQUEST_SIZE> {
        let mut out = Vec::new();
        let mut encoder = StreamEncoder::new(&mut out);
        write_header(&mut encoder, Self::ID);
        encoder.add_u16(self.index);
        out
    }

    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::MAX_ENCODED_SIZE {
            return None;
        }
        let mut decoder = StreamDecoder::new(bytes);
        check_header(&mut decoder, Self::ID)?;
        Some(Self {
            index: decoder.fetch_u16()?,
        })
    }
}

/// Discovery response; an empty name means the index is past the last
/// register.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegisterDiscoveryResponseMessage {
    pub index: u16,
    pub name: RegisterName,
}

impl RegisterDiscoveryResponseMessage {
    pub const ID: MessageId = MessageId::RegisterDiscoveryResponse;
    pub const MIN_ENCODED_SIZE: usize =
        MESSAGE_HEADER_SIZE + 2 + RegisterName::MIN_ENCODED_SIZE;
    pub const MAX_ENCODED_SIZE: usize = REGISTER_DISCOVERY_RESPONSE_MAX;

    pub fn encode(&self) -> Vec<u8, REGISTER_DISCOVERY_RESPONSE_MAX> {
        let mut out = Vec::new();
        let mut encoder = StreamEncoder::new(&mut out);
        write_header(&mut encoder, Self::ID);
        encoder.add_u16(self.index);
        self.name.encode(&mut encoder);
        out
    }

    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::MIN_ENCODED_SIZE || bytes.len() > Self::MAX_ENCODED_SIZE {
            return None;
        }
        let mut decoder = StreamDecoder::new(bytes);
        check_header(&mut decoder, Self::ID)?;
        let index = decoder.fetch_u16()?;
        let name = RegisterName::try_decode(&mut decoder)?;
        Some(Self { index, name })
    }
}

/// Commands understood by the device management service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeviceManagementCommand {
    #[default]
    Restart,
    PowerOff,
    LaunchBootloader,
    FactoryReset,
}

impl DeviceManagementCommand {
    fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Restart),
            1 => Some(Self::PowerOff),
            2 => Some(Self::LaunchBootloader),
            3 => Some(Self::FactoryReset),
            _ => None,
        }
    }

    fn to_u16(self) -> u16 {
        match self {
            Self::Restart => 0,
            Self::PowerOff => 1,
            Self::LaunchBootloader => 2,
            Self::FactoryReset => 3,
        }
    }
}

/// Outcome of a device management command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeviceManagementStatus {
    #[default]
    Ok,
    BadCommand,
    MaybeLater,
    Rejected,
}

impl DeviceManagementStatus {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::BadCommand),
            2 => Some(Self::MaybeLater),
            3 => Some(Self::Rejected),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::BadCommand => 1,
            Self::MaybeLater => 2,
            Self::Rejected => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceManagementCommandRequestMessage {
    pub command: DeviceManagementCommand,
}

impl DeviceManagementCommandRequestMessage {
    pub const ID: MessageId = MessageId::DeviceManagementCommandRequest;
    pub const MIN_ENCODED_SIZE: usize = DEVICE_MANAGEMENT_REQUEST_SIZE;
    pub const MAX_ENCODED_SIZE: usize = DEVICE_MANAGEMENT_REQUEST_SIZE;

    pub fn encode(&self) -> Vec<u8, DEVICE_MANAGEMENT_REQUEST_SIZE> {
        let mut out = Vec::new();
        let mut encoder = StreamEncoder::new(&mut out);
        write_header(&mut encoder, Self::ID);
        encoder.add_u16(self.command.to_u16());
        out
    }

    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::MAX_ENCODED_SIZE {
            return None;
        }
        let mut decoder = StreamDecoder::new(bytes);
        check_header(&mut decoder, Self::ID)?;
        Some(Self {
            command: DeviceManagementCommand::from_u16(decoder.fetch_u16()?)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceManagementCommandResponseMessage {
    pub command: DeviceManagementCommand,
    pub status: DeviceManagementStatus,
}

impl DeviceManagementCommandResponseMessage {
    pub const ID: MessageId = MessageId::DeviceManagementCommandResponse;
    pub const MIN_ENCODED_SIZE: usize = DEVICE_MANAGEMENT_RESPONSE_SIZE;
    pub const MAX_ENCODED_SIZE: usize = DEVICE_MANAGEMENT_RESPONSE_SIZE;

    pub fn encode(&self) -> Vec<u8, DEVICE_MANAGEMENT_RESPONSE_SIZE> {
        let mut out = Vec::new();
        let mut encoder = StreamEncoder::new(&mut out);
        write_header(&mut encoder, Self::ID);
        encoder.add_u16(self.command.to_u16());
        encoder.add_u8(self.status.to_u8());
        out
    }

    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::MAX_ENCODED_SIZE {
            return None;
        }
        let mut decoder = StreamDecoder::new(bytes);
        check_header(&mut decoder, Self::ID)?;
        let command = DeviceManagementCommand::from_u16(decoder.fetch_u16()?)?;
        let status = DeviceManagementStatus::from_u8(decoder.fetch_u8()?)?;
        Some(Self { command, status })
    }
}

/// States of the bootloader state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BootloaderState {
    #[default]
    NoAppToBoot,
    BootDelay,
    BootCancelled,
    AppUpgradeInProgress,
    ReadyToBoot,
}

impl BootloaderState {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NoAppToBoot),
            1 => Some(Self::BootDelay),
            2 => Some(Self::BootCancelled),
            3 => Some(Self::AppUpgradeInProgress),
            4 => Some(Self::ReadyToBoot),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::NoAppToBoot => 0,
            Self::BootDelay => 1,
            Self::BootCancelled => 2,
            Self::AppUpgradeInProgress => 3,
            Self::ReadyToBoot => 4,
        }
    }
}

/// Status request, optionally steering the bootloader into a new state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BootloaderStatusRequestMessage {
    pub desired_state: BootloaderState,
}

impl BootloaderStatusRequestMessage {
    pub const ID: MessageId = MessageId::BootloaderStatusRequest;
    pub const MIN_ENCODED_SIZE: usize = BOOTLOADER_STATUS_REQUEST_SIZE;
    pub const MAX_ENCODED_SIZE: usize = BOOTLOADER_STATUS_REQUEST_SIZE;

    pub fn encode(&self) -> Vec<u8, BOOTLOADER_STATUS_REQUEST_SIZE> {
        let mut out = Vec::new();
        let mut encoder = StreamEncoder::new(&mut out);
        write_header(&mut encoder, Self::ID);
        encoder.add_u8(self.desired_state.to_u8());
        out
    }

    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::MAX_ENCODED_SIZE {
            return None;
        }
        let mut decoder = StreamDecoder::new(bytes);
        check_header(&mut decoder, Self::ID)?;
        Some(Self {
            desired_state: BootloaderState::from_u8(decoder.fetch_u8()?)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BootloaderStatusResponseMessage {
    pub timestamp_usec: u64,
    pub flags: u64,
    pub state: BootloaderState,
}

impl BootloaderStatusResponseMessage {
    pub const ID: MessageId = MessageId::BootloaderStatusResponse;
    pub const MIN_ENCODED_SIZE: usize = BOOTLOADER_STATUS_RESPONSE_SIZE;
    pub const MAX_ENCODED_SIZE: usize = BOOTLOADER_STATUS_RESPONSE_SIZE;

    pub fn encode(&self) -> Vec<u8, BOOTLOADER_STATUS_RESPONSE_SIZE> {
        let mut out = Vec::new();
        let mut encoder = StreamEncoder::new(&mut out);
        write_header(&mut encoder, Self::ID);
        encoder.add_u64(self.timestamp_usec);
        encoder.add_u64(self.flags);
        encoder.add_u8(self.state.to_u8());
        out
    }

    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::MAX_ENCODED_SIZE {
            return None;
        }
        let mut decoder = StreamDecoder::new(bytes);
        check_header(&mut decoder, Self::ID)?;
        let timestamp_usec = decoder.fetch_u64()?;
        let flags = decoder.fetch_u64()?;
        let state = BootloaderState::from_u8(decoder.fetch_u8()?)?;
        Some(Self {
            timestamp_usec,
            flags,
            state,
        })
    }
}

/// Kind of image transferred through the bootloader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BootloaderImageType {
    #[default]
    Application,
    CertificateOfAuthenticity,
}

impl BootloaderImageType {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Application),
            1 => Some(Self::CertificateOfAuthenticity),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Application => 0,
            Self::CertificateOfAuthenticity => 1,
        }
    }
}

fn encode_image_data(
    id: MessageId,
    image_offset: u64,
    image_type: BootloaderImageType,
    image_data: &[u8],
) -> Vec<u8, BOOTLOADER_IMAGE_DATA_MAX> {
    let mut out = Vec::new();
    let mut encoder = StreamEncoder::new(&mut out);
    write_header(&mut encoder, id);
    encoder.add_u64(image_offset);
    encoder.add_u8(image_type.to_u8());
    encoder.add_bytes(image_data);
    out
}

fn decode_image_data(
    bytes: &[u8],
    id: MessageId,
) -> Option<(u64, BootloaderImageType, Vec<u8, IMAGE_DATA_CAPACITY>)> {
    if bytes.len() < MESSAGE_HEADER_SIZE + 9 || bytes.len() > BOOTLOADER_IMAGE_DATA_MAX {
        return None;
    }
    let mut decoder = StreamDecoder::new(bytes);
    check_header(&mut decoder, id)?;
    let image_offset = decoder.fetch_u64()?;
    let image_type = BootloaderImageType::from_u8(decoder.fetch_u8()?)?;
    let image_data = Vec::from_slice(decoder.fetch_bytes(decoder.remaining())?).ok()?;
    Some((image_offset, image_type, image_data))
}

/// Read request for a chunk of the image at `image_offset`, or a write when
/// data is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BootloaderImageDataRequestMessage {
    pub image_offset: u64,
    pub image_type: BootloaderImageType,
    pub image_data: Vec<u8, IMAGE_DATA_CAPACITY>,
}

impl BootloaderImageDataRequestMessage {
    pub const ID: MessageId = MessageId::BootloaderImageDataRequest;
    pub const MIN_ENCODED_SIZE: usize = MESSAGE_HEADER_SIZE + 9;
    pub const MAX_ENCODED_SIZE: usize = BOOTLOADER_IMAGE_DATA_MAX;

    pub fn encode(&self) -> Vec<u8, BOOTLOADER_IMAGE_DATA_MAX> {
        encode_image_data(Self::ID, self.image_offset, self.image_type, &self.image_data)
    }

    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        let (image_offset, image_type, image_data) = decode_image_data(bytes, Self::ID)?;
        Some(Self {
            image_offset,
            image_type,
            image_data,
        })
    }
}

/// Data chunk carried back from the bootloader; an empty chunk signals the
/// end of the image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BootloaderImageDataResponseMessage {
    pub image_offset: u64,
    pub image_type: BootloaderImageType,
    pub image_data: Vec<u8, IMAGE_DATA_CAPACITY>,
}

impl BootloaderImageDataResponseMessage {
    pub const ID: MessageId = MessageId::BootloaderImageDataResponse;
    pub const MIN_ENCODED_SIZE: usize = MESSAGE_HEADER_SIZE + 9;
    pub const MAX_ENCODED_SIZE: usize = BOOTLOADER_IMAGE_DATA_MAX;

    pub fn encode(&self) -> Vec<u8, BOOTLOADER_IMAGE_DATA_MAX> {
        encode_image_data(Self::ID, self.image_offset, self.image_type, &self.image_data)
    }

    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        let (image_offset, image_type, image_data) = decode_image_data(bytes, Self::ID)?;
        Some(Self {
            image_offset,
            image_type,
            image_data,
        })
    }
}
