//! Endpoint info message: identity, versioning and mode of an endpoint.
//!
//! A full-length message is a response; anything shorter than the fixed
//! body is a request for the other side's info. The newer 2-byte-header
//! form is primary; the legacy node-info form (six extra reserved header
//! bytes) is kept for interoperability with older firmware.

use heapless::{String, Vec};

use crate::presentation::{StreamDecoder, StreamEncoder};

use super::{check_header, write_header, MessageId, LEGACY_MESSAGE_HEADER_SIZE, MESSAGE_HEADER_SIZE};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed size of the response body, header excluded.
const BODY_SIZE: usize = 360;

/// Capacity of the certificate-of-authenticity tail.
pub const CERTIFICATE_CAPACITY: usize = 222;

/// Capacity of each of the four fixed text slots.
pub const TEXT_CAPACITY: usize = 80;

const MAX_ENCODED: usize = MESSAGE_HEADER_SIZE + BODY_SIZE + CERTIFICATE_CAPACITY;
const LEGACY_MAX_ENCODED: usize = LEGACY_MESSAGE_HEADER_SIZE + BODY_SIZE + CERTIFICATE_CAPACITY;

const FLAG_IMAGE_CRC_VALID: u8 = 1 << 0;
const FLAG_RELEASE_BUILD: u8 = 1 << 1;
const FLAG_DIRTY_BUILD: u8 = 1 << 2;

/// Software version and build identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SoftwareVersion {
    pub major: u8,
    pub minor: u8,
    /// CRC of the software image, when known.
    pub image_crc: Option<u64>,
    pub vcs_commit_id: u32,
    pub build_timestamp_utc: u32,
    pub release_build: bool,
    pub dirty_build: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HardwareVersion {
    pub major: u8,
    pub minor: u8,
}

/// Operating mode reported by an endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    #[default]
    Normal,
    Bootloader,
}

impl Mode {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Mode::Normal),
            1 => Some(Mode::Bootloader),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Mode::Normal => 0,
            Mode::Bootloader => 1,
        }
    }
}

/// Endpoint info message (ID 0).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EndpointInfoMessage {
    pub software_version: SoftwareVersion,
    pub hardware_version: HardwareVersion,
    pub mode: Mode,
    pub globally_unique_id: [u8; 16],
    pub endpoint_name: String<TEXT_CAPACITY>,
    pub endpoint_description: String<TEXT_CAPACITY>,
    pub build_environment_description: String<TEXT_CAPACITY>,
    pub runtime_environment_description: String<TEXT_CAPACITY>,
    pub certificate_of_authenticity: Vec<u8, CERTIFICATE_CAPACITY>,
    request: bool,
}

impl EndpointInfoMessage {
    pub const ID: MessageId = MessageId::EndpointInfo;
    pub const MIN_ENCODED_SIZE: usize = MESSAGE_HEADER_SIZE;
    pub const MAX_ENCODED_SIZE: usize = MAX_ENCODED;

    /// A request for another endpoint's info; carries no body.
    pub fn request() -> Self {
        Self {
            software_version: SoftwareVersion::default(),
            hardware_version: HardwareVersion::default(),
            mode: Mode::default(),
            globally_unique_id: [0; 16],
            endpoint_name: String::new(),
            endpoint_description: String::new(),
            build_environment_description: String::new(),
            runtime_environment_description: String::new(),
            certificate_of_authenticity: Vec::new(),
            request: true,
        }
    }

    /// An info response with all fields at their defaults.
    pub fn response() -> Self {
        Self {
            request: false,
            ..Self::request()
        }
    }

    pub fn is_request(&self) -> bool {
        self.request
    }

    /// Encode with the 2-byte header. A request encodes as the bare header.
    pub fn encode(&self) -> Vec<u8, MAX_ENCODED> {
        let mut out = Vec::new();
        let mut encoder = StreamEncoder::new(&mut out);
        write_header(&mut encoder, Self::ID);
        if !self.request {
            self.encode_body(&mut encoder);
        }
        out
    }

    /// Encode with the legacy 8-byte node-info header.
    pub fn encode_legacy(&self) -> Vec<u8, LEGACY_MAX_ENCODED> {
        let mut out = Vec::new();
        let mut encoder = StreamEncoder::new(&mut out);
        write_header(&mut encoder, Self::ID);
        encoder.fill_up_to_offset(LEGACY_MESSAGE_HEADER_SIZE, 0);
        if !self.request {
            self.encode_body(&mut encoder);
        }
        out
    }

    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::MIN_ENCODED_SIZE || bytes.len() > Self::MAX_ENCODED_SIZE {
            return None;
        }
        let mut decoder = StreamDecoder::new(bytes);
        check_header(&mut decoder, Self::ID)?;
        Self::decode_body(decoder)
    }

    /// Decode accepting either the current or the legacy header length.
    ///
    /// The strict form is tried first; the legacy form requires the six
    /// reserved header bytes to be zero. The two forms' length ranges
    /// overlap, so a legacy message whose misaligned body happens to parse
    /// strictly cannot be told apart; in practice the mode field rejects
    /// such readings.
    pub fn try_decode_compat(bytes: &[u8]) -> Option<Self> {
        if let Some(message) = Self::try_decode(bytes) {
            return Some(message);
        }
        if bytes.len() < LEGACY_MESSAGE_HEADER_SIZE || bytes.len() > LEGACY_MAX_ENCODED {
            return None;
        }
        let mut decoder = StreamDecoder::new(bytes);
        check_header(&mut decoder, Self::ID)?;
        if decoder.fetch_bytes(6)? != [0u8; 6] {
            return None;
        }
        Self::decode_body(decoder)
    }

    fn encode_body<const CAP: usize>(&self, encoder: &mut StreamEncoder<'_, CAP>) {
        let software = &self.software_version;
        encoder.add_u64(software.image_crc.unwrap_or(0));
        encoder.add_u32(software.vcs_commit_id);
        encoder.add_u32(software.build_timestamp_utc);
        encoder.add_u8(software.major);
        encoder.add_u8(software.minor);
        encoder.add_u8(self.hardware_version.major);
        encoder.add_u8(self.hardware_version.minor);

        let mut flags = 0u8;
        if software.image_crc.is_some() {
            flags |= FLAG_IMAGE_CRC_VALID;
        }
        if software.release_build {
            flags |= FLAG_RELEASE_BUILD;
        }
        if software.dirty_build {
            flags |= FLAG_DIRTY_BUILD;
        }
        encoder.add_u8(flags);

        encoder.add_u8(self.mode.to_u8());
        encoder.add_u16(0); // reserved
        encoder.add_bytes(&self.globally_unique_id);

        encode_text(encoder, &self.endpoint_name);
        encode_text(encoder, &self.endpoint_description);
        encode_text(encoder, &self.build_environment_description);
        encode_text(encoder, &self.runtime_environment_description);

        encoder.add_bytes(&self.certificate_of_authenticity);
    }

    fn decode_body(mut decoder: StreamDecoder<'_>) -> Option<Self> {
        if decoder.remaining() < BODY_SIZE {
            // Shorter than a full body: a request. Whatever partial body
            // bytes are present carry no information.
            return Some(Self::request());
        }

        let mut message = Self::response();
        let image_crc = decoder.fetch_u64()?;
        message.software_version.vcs_commit_id = decoder.fetch_u32()?;
        message.software_version.build_timestamp_utc = decoder.fetch_u32()?;
        message.software_version.major = decoder.fetch_u8()?;
        message.software_version.minor = decoder.fetch_u8()?;
        message.hardware_version.major = decoder.fetch_u8()?;
        message.hardware_version.minor = decoder.fetch_u8()?;

        let flags = decoder.fetch_u8()?;
        message.software_version.image_crc =
            (flags & FLAG_IMAGE_CRC_VALID != 0).then_some(image_crc);
        message.software_version.release_build = flags & FLAG_RELEASE_BUILD != 0;
        message.software_version.dirty_build = flags & FLAG_DIRTY_BUILD != 0;

        message.mode = Mode::from_u8(decoder.fetch_u8()?)?;
        decoder.fetch_u16()?; // reserved

        message
            .globally_unique_id
            .copy_from_slice(decoder.fetch_bytes(16)?);

        decode_text(&mut decoder, &mut message.endpoint_name)?;
        decode_text(&mut decoder, &mut message.endpoint_description)?;
        decode_text(&mut decoder, &mut message.build_environment_description)?;
        decode_text(&mut decoder, &mut message.runtime_environment_description)?;

        let certificate = decoder.fetch_bytes(decoder.remaining())?;
        message.certificate_of_authenticity = Vec::from_slice(certificate).ok()?;

        Some(message)
    }
}

impl Default for EndpointInfoMessage {
    fn default() -> Self {
        Self::request()
    }
}

/// Write a nul-padded fixed text slot.
fn encode_text<const CAP: usize>(encoder: &mut StreamEncoder<'_, CAP>, text: &String<TEXT_CAPACITY>) {
    let end = encoder.offset() + TEXT_CAPACITY;
    encoder.add_bytes(text.as_bytes());
    encoder.fill_up_to_offset(end, 0);
}

/// Read a fixed text slot, stripping the nul padding.
fn decode_text(decoder: &mut StreamDecoder<'_>, out: &mut String<TEXT_CAPACITY>) -> Option<()> {
    let end = decoder.offset() + TEXT_CAPACITY;
    decoder.fetch_ascii_string(out);
    decoder.skip_up_to_offset(end)
}
