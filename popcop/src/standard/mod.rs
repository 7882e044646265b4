//! Standard message catalogue.
//!
//! Messages are identified by a 16-bit little-endian ID in the first two
//! bytes. Decoding follows the same rule everywhere: the ID must match,
//! the total length must fall inside the type's window, and every field
//! must parse; anything else yields `None`.

pub mod endpoint_info;
pub mod messages;
pub mod register;

pub use endpoint_info::{EndpointInfoMessage, HardwareVersion, Mode, SoftwareVersion};
pub use messages::{
    BootloaderImageDataRequestMessage, BootloaderImageDataResponseMessage, BootloaderImageType,
    BootloaderState, BootloaderStatusRequestMessage, BootloaderStatusResponseMessage,
    DeviceManagementCommand, DeviceManagementCommandRequestMessage,
    DeviceManagementCommandResponseMessage, DeviceManagementStatus,
    RegisterDataRequestMessage, RegisterDataResponseMessage, RegisterDiscoveryRequestMessage,
    RegisterDiscoveryResponseMessage,
};
pub use register::{RegisterFlags, RegisterName, RegisterValue};

use crate::presentation::{StreamDecoder, StreamEncoder};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Size of the standard message header: the 16-bit message ID.
pub const MESSAGE_HEADER_SIZE: usize = 2;

/// Size of the legacy node-info header: the ID plus six reserved bytes.
pub const LEGACY_MESSAGE_HEADER_SIZE: usize = 8;

/// Identifiers of the standard messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u16)]
pub enum MessageId {
    EndpointInfo = 0,
    RegisterDataRequest = 1,
    RegisterDataResponse = 2,
    RegisterDiscoveryRequest = 3,
    RegisterDiscoveryResponse = 4,
    DeviceManagementCommandRequest = 5,
    DeviceManagementCommandResponse = 6,
    BootloaderStatusRequest = 7,
    BootloaderStatusResponse = 8,
    BootloaderImageDataRequest = 9,
    BootloaderImageDataResponse = 10,
}

impl MessageId {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::EndpointInfo),
            1 => Some(Self::RegisterDataRequest),
            2 => Some(Self::RegisterDataResponse),
            3 => Some(Self::RegisterDiscoveryRequest),
            4 => Some(Self::RegisterDiscoveryResponse),
            5 => Some(Self::DeviceManagementCommandRequest),
            6 => Some(Self::DeviceManagementCommandResponse),
            7 => Some(Self::BootloaderStatusRequest),
            8 => Some(Self::BootloaderStatusResponse),
            9 => Some(Self::BootloaderImageDataRequest),
            10 => Some(Self::BootloaderImageDataResponse),
            _ => None,
        }
    }
}

pub(crate) fn write_header<const CAP: usize>(encoder: &mut StreamEncoder<'_, CAP>, id: MessageId) {
    encoder.add_u16(id as u16);
}

/// Fetch the header and verify the message ID.
pub(crate) fn check_header(decoder: &mut StreamDecoder<'_>, id: MessageId) -> Option<()> {
    (decoder.fetch_u16()? == id as u16).then_some(())
}

/// Any message of the standard catalogue.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StandardMessage {
    EndpointInfo(EndpointInfoMessage),
    RegisterDataRequest(RegisterDataRequestMessage),
    RegisterDataResponse(RegisterDataResponseMessage),
    RegisterDiscoveryRequest(RegisterDiscoveryRequestMessage),
    RegisterDiscoveryResponse(RegisterDiscoveryResponseMessage),
    DeviceManagementCommandRequest(DeviceManagementCommandRequestMessage),
    DeviceManagementCommandResponse(DeviceManagementCommandResponseMessage),
    BootloaderStatusRequest(BootloaderStatusRequestMessage),
    BootloaderStatusResponse(BootloaderStatusResponseMessage),
    BootloaderImageDataRequest(BootloaderImageDataRequestMessage),
    BootloaderImageDataResponse(BootloaderImageDataResponseMessage),
}

impl StandardMessage {
    /// Decode any standard message, dispatching on the leading message ID.
    ///
    /// This is the receive-path entry point for frame payloads.
    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        let raw_id = u16::from_le_bytes([*bytes.first()?, *bytes.get(1)?]);
        match MessageId::from_u16(raw_id)? {
            MessageId::EndpointInfo => {
                EndpointInfoMessage::try_decode(bytes).map(Self::EndpointInfo)
            }
            MessageId::RegisterDataRequest => {
                RegisterDataRequestMessage::try_decode(bytes).map(Self::RegisterDataRequest)
            }
            MessageId::RegisterDataResponse => {
                RegisterDataResponseMessage::try_decode(bytes).map(Self::RegisterDataResponse)
            }
            MessageId::RegisterDiscoveryRequest => {
                RegisterDiscoveryRequestMessage::try_decode(bytes)
                    .map(Self::RegisterDiscoveryRequest)
            }
            MessageId::RegisterDiscoveryResponse => {
                RegisterDiscoveryResponseMessage::try_decode(bytes)
                    .map(Self::RegisterDiscoveryResponse)
            }
            MessageId::DeviceManagementCommandRequest => {
                DeviceManagementCommandRequestMessage::try_decode(bytes)
                    .map(Self::DeviceManagementCommandRequest)
            }
            MessageId::DeviceManagementCommandResponse => {
                DeviceManagementCommandResponseMessage::try_decode(bytes)
                    .map(Self::DeviceManagementCommandResponse)
            }
            MessageId::BootloaderStatusRequest => {
                BootloaderStatusRequestMessage::try_decode(bytes).map(Self::BootloaderStatusRequest)
            }
            MessageId::BootloaderStatusResponse => {
                BootloaderStatusResponseMessage::try_decode(bytes)
                    .map(Self::BootloaderStatusResponse)
            }
            MessageId::BootloaderImageDataRequest => {
                BootloaderImageDataRequestMessage::try_decode(bytes)
                    .map(Self::BootloaderImageDataRequest)
            }
            MessageId::BootloaderImageDataResponse => {
                BootloaderImageDataResponseMessage::try_decode(bytes)
                    .map(Self::BootloaderImageDataResponse)
            }
        }
    }

    pub fn message_id(&self) -> MessageId {
        match self {
            Self::EndpointInfo(_) => MessageId::EndpointInfo,
            Self::RegisterDataRequest(_) => MessageId::RegisterDataRequest,
            Self::RegisterDataResponse(_) => MessageId::RegisterDataResponse,
            Self::RegisterDiscoveryRequest(_) => MessageId::RegisterDiscoveryRequest,
            Self::RegisterDiscoveryResponse(_) => MessageId::RegisterDiscoveryResponse,
            Self::DeviceManagementCommandRequest(_) => MessageId::DeviceManagementCommandRequest,
            Self::DeviceManagementCommandResponse(_) => MessageId::DeviceManagementCommandResponse,
            Self::BootloaderStatusRequest(_) => MessageId::BootloaderStatusRequest,
            Self::BootloaderStatusResponse(_) => MessageId::BootloaderStatusResponse,
            Self::BootloaderImageDataRequest(_) => MessageId::BootloaderImageDataRequest,
            Self::BootloaderImageDataResponse(_) => MessageId::BootloaderImageDataResponse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_roundtrip() {
        for raw in 0..=10u16 {
            let id = MessageId::from_u16(raw).unwrap();
            assert_eq!(id as u16, raw);
        }
        assert!(MessageId::from_u16(11).is_none());
        assert!(MessageId::from_u16(0xFFFF).is_none());
    }

    #[test]
    fn test_dispatch_by_id() {
        let request = RegisterDiscoveryRequestMessage { index: 7 };
        match StandardMessage::try_decode(&request.encode()) {
            Some(StandardMessage::RegisterDiscoveryRequest(decoded)) => {
                assert_eq!(decoded, request);
            }
            other => panic!("unexpected dispatch result: {:?}", other),
        }

        let status = BootloaderStatusRequestMessage {
            desired_state: BootloaderState::ReadyToBoot,
        };
        let decoded = StandardMessage::try_decode(&status.encode()).unwrap();
        assert_eq!(decoded.message_id(), MessageId::BootloaderStatusRequest);
    }

    #[test]
    fn test_dispatch_rejects_unknown_and_short_input() {
        assert!(StandardMessage::try_decode(&[]).is_none());
        assert!(StandardMessage::try_decode(&[0]).is_none());
        assert!(StandardMessage::try_decode(&[99, 0, 0, 0]).is_none());
        // Known ID, malformed body.
        assert!(StandardMessage::try_decode(&[5, 0, 9, 0]).is_none());
    }
}
