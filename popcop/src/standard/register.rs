//! Register primitives: names, typed values, access flags.
//!
//! A register is a named, typed, possibly vectorized value exchanged
//! through the register-data messages.

use core::mem::size_of;

use heapless::{String, Vec};

use crate::presentation::{StreamDecoder, StreamEncoder};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum length of a register name.
pub const NAME_CAPACITY: usize = 93;

/// Maximum size of an encoded register value body, tag excluded.
pub const VALUE_CAPACITY: usize = 256;

/// Register name: bounded ASCII, length-prefixed on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegisterName(String<NAME_CAPACITY>);

impl RegisterName {
    pub const MIN_ENCODED_SIZE: usize = 1;
    pub const MAX_ENCODED_SIZE: usize = 1 + NAME_CAPACITY;

    pub fn new() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn encode<const CAP: usize>(&self, encoder: &mut StreamEncoder<'_, CAP>) {
        encoder.add_u8(self.0.len() as u8);
        encoder.add_bytes(self.0.as_bytes());
    }

    pub fn try_decode(decoder: &mut StreamDecoder<'_>) -> Option<Self> {
        let length = decoder.fetch_u8()? as usize;
        if length > NAME_CAPACITY {
            return None;
        }
        let bytes = decoder.fetch_bytes(length)?;
        if !bytes.is_ascii() {
            return None;
        }
        let mut name = String::new();
        name.push_str(core::str::from_utf8(bytes).ok()?).ok()?;
        Some(Self(name))
    }
}

impl core::ops::Deref for RegisterName {
    type Target = str;

    fn deref(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<&str> for RegisterName {
    type Error = ();

    /// Fails when `text` is longer than [`NAME_CAPACITY`] or not ASCII.
    fn try_from(text: &str) -> Result<Self, ()> {
        if !text.is_ascii() {
            return Err(());
        }
        let mut name = String::new();
        name.push_str(text)?;
        Ok(Self(name))
    }
}

/// Access flags attached to a register data response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegisterFlags {
    pub value: u8,
}

impl RegisterFlags {
    const MUTABLE: u8 = 1 << 0;
    const PERSISTENT: u8 = 1 << 1;

    pub fn is_mutable(&self) -> bool {
        self.value & Self::MUTABLE != 0
    }

    pub fn is_persistent(&self) -> bool {
        self.value & Self::PERSISTENT != 0
    }

    pub fn set_mutable(&mut self, mutable: bool) {
        if mutable {
            self.value |= Self::MUTABLE;
        } else {
            self.value &= !Self::MUTABLE;
        }
    }

    pub fn set_persistent(&mut self, persistent: bool) {
        if persistent {
            self.value |= Self::PERSISTENT;
        } else {
            self.value &= !Self::PERSISTENT;
        }
    }
}

/// Typed register value.
///
/// The variant set is closed and each variant owns a stable wire tag:
///
/// | Tag | Variant      | Capacity        |
/// |----:|--------------|-----------------|
/// | 0   | Empty        | -               |
/// | 1   | String       | 256 bytes       |
/// | 2   | Unstructured | 256 bytes       |
/// | 3   | Boolean      | 256 elements    |
/// | 4   | I64          | 32 elements     |
/// | 5   | I32          | 64 elements     |
/// | 6   | I16          | 128 elements    |
/// | 7   | I8           | 256 elements    |
/// | 8   | U64          | 32 elements     |
/// | 9   | U32          | 64 elements     |
/// | 10  | U16          | 128 elements    |
/// | 11  | U8           | 256 elements    |
/// | 12  | F32          | 64 elements     |
/// | 13  | F64          | 32 elements     |
///
/// The value body is self-delimiting only by the remaining stream length:
/// vector variants consume everything left in the stream.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RegisterValue {
    #[default]
    Empty,
    String(String<VALUE_CAPACITY>),
    Unstructured(Vec<u8, VALUE_CAPACITY>),
    Boolean(Vec<bool, VALUE_CAPACITY>),
    I64(Vec<i64, 32>),
    I32(Vec<i32, 64>),
    I16(Vec<i16, 128>),
    I8(Vec<i8, 256>),
    U64(Vec<u64, 32>),
    U32(Vec<u32, 64>),
    U16(Vec<u16, 128>),
    U8(Vec<u8, 256>),
    F32(Vec<f32, 64>),
    F64(Vec<f64, 32>),
}

impl RegisterValue {
    pub const MIN_ENCODED_SIZE: usize = 1;
    pub const MAX_ENCODED_SIZE: usize = 1 + VALUE_CAPACITY;

    /// Wire tag of the current variant.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::String(_) => 1,
            Self::Unstructured(_) => 2,
            Self::Boolean(_) => 3,
            Self::I64(_) => 4,
            Self::I32(_) => 5,
            Self::I16(_) => 6,
            Self::I8(_) => 7,
            Self::U64(_) => 8,
            Self::U32(_) => 9,
            Self::U16(_) => 10,
            Self::U8(_) => 11,
            Self::F32(_) => 12,
            Self::F64(_) => 13,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn encode<const CAP: usize>(&self, encoder: &mut StreamEncoder<'_, CAP>) {
        encoder.add_u8(self.tag());
        match self {
            Self::Empty => {}
            Self::String(text) => encoder.add_bytes(text.as_bytes()),
            Self::Unstructured(bytes) => encoder.add_bytes(bytes),
            Self::Boolean(values) => {
                for &value in values {
                    encoder.add_u8(value as u8);
                }
            }
            Self::I64(values) => {
                for &value in values {
                    encoder.add_i64(value);
                }
            }
            Self::I32(values) => {
                for &value in values {
                    encoder.add_i32(value);
                }
            }
            Self::I16(values) => {
                for &value in values {
                    encoder.add_i16(value);
                }
            }
            Self::I8(values) => {
                for &value in values {
                    encoder.add_i8(value);
                }
            }
            Self::U64(values) => {
                for &value in values {
                    encoder.add_u64(value);
                }
            }
            Self::U32(values) => {
                for &value in values {
                    encoder.add_u32(value);
                }
            }
            Self::U16(values) => {
                for &value in values {
                    encoder.add_u16(value);
                }
            }
            Self::U8(values) => {
                for &value in values {
                    encoder.add_u8(value);
                }
            }
            Self::F32(values) => {
                for &value in values {
                    encoder.add_f32(value);
                }
            }
            Self::F64(values) => {
                for &value in values {
                    encoder.add_f64(value);
                }
            }
        }
    }

    /// Decode a value from everything remaining in the stream.
    ///
    /// An exhausted stream deduces [`Empty`](Self::Empty); an unknown tag
    /// fails; tag 0 ignores any trailing bytes. Vector variants consume
    /// whole elements until the stream runs dry and fail when the stream
    /// holds more elements than the variant's capacity.
    pub fn try_decode(decoder: &mut StreamDecoder<'_>) -> Option<Self> {
        let tag = match decoder.fetch_u8() {
            Some(tag) => tag,
            None => return Some(Self::Empty),
        };
        match tag {
            0 => Some(Self::Empty),
            1 => {
                let bytes = decoder.fetch_bytes(decoder.remaining())?;
                if bytes.len() > VALUE_CAPACITY || !bytes.is_ascii() {
                    return None;
                }
                let mut text = String::new();
                text.push_str(core::str::from_utf8(bytes).ok()?).ok()?;
                Some(Self::String(text))
            }
            2 => {
                let bytes = decoder.fetch_bytes(decoder.remaining())?;
                Some(Self::Unstructured(Vec::from_slice(bytes).ok()?))
            }
            3 => Some(Self::Boolean(decode_vector(decoder, |decoder| {
                decoder.fetch_u8().map(|byte| byte != 0)
            })?)),
            4 => Some(Self::I64(decode_vector(decoder, StreamDecoder::fetch_i64)?)),
            5 => Some(Self::I32(decode_vector(decoder, StreamDecoder::fetch_i32)?)),
            6 => Some(Self::I16(decode_vector(decoder, StreamDecoder::fetch_i16)?)),
            7 => Some(Self::I8(decode_vector(decoder, StreamDecoder::fetch_i8)?)),
            8 => Some(Self::U64(decode_vector(decoder, StreamDecoder::fetch_u64)?)),
            9 => Some(Self::U32(decode_vector(decoder, StreamDecoder::fetch_u32)?)),
            10 => Some(Self::U16(decode_vector(decoder, StreamDecoder::fetch_u16)?)),
            11 => Some(Self::U8(decode_vector(decoder, StreamDecoder::fetch_u8)?)),
            12 => Some(Self::F32(decode_vector(decoder, StreamDecoder::fetch_f32)?)),
            13 => Some(Self::F64(decode_vector(decoder, StreamDecoder::fetch_f64)?)),
            _ => None,
        }
    }
}

/// Consume whole elements until the stream runs dry.
fn decode_vector<'a, T, const N: usize>(
    decoder: &mut StreamDecoder<'a>,
    fetch: impl Fn(&mut StreamDecoder<'a>) -> Option<T>,
) -> Option<Vec<T, N>> {
    let count = decoder.remaining() / size_of::<T>();
    if count > N {
        return None;
    }
    let mut out = Vec::new();
    for _ in 0..count {
        let value = fetch(decoder)?;
        // Cannot overflow, count is bounded by the capacity.
        let _ = out.push(value);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_value(value: &RegisterValue) -> Vec<u8, { RegisterValue::MAX_ENCODED_SIZE }> {
        let mut buf = Vec::new();
        let mut encoder = StreamEncoder::new(&mut buf);
        value.encode(&mut encoder);
        buf
    }

    fn decode_value(bytes: &[u8]) -> Option<RegisterValue> {
        let mut decoder = StreamDecoder::new(bytes);
        RegisterValue::try_decode(&mut decoder)
    }

    fn encode_name(name: &RegisterName) -> Vec<u8, { RegisterName::MAX_ENCODED_SIZE }> {
        let mut buf = Vec::new();
        let mut encoder = StreamEncoder::new(&mut buf);
        name.encode(&mut encoder);
        buf
    }

    fn decode_name(bytes: &[u8]) -> Option<RegisterName> {
        let mut decoder = StreamDecoder::new(bytes);
        RegisterName::try_decode(&mut decoder)
    }

    #[test]
    fn test_name_encoding() {
        let mut name = RegisterName::new();
        assert_eq!(encode_name(&name), [0]);

        name = RegisterName::try_from("123").unwrap();
        assert_eq!(encode_name(&name), [3, 49, 50, 51]);

        let full: String<93> = core::iter::repeat('Z').take(93).collect();
        name = RegisterName::try_from(full.as_str()).unwrap();
        let encoded = encode_name(&name);
        assert_eq!(encoded.len(), 94);
        assert_eq!(encoded[0], 93);
        assert!(encoded[1..].iter().all(|&byte| byte == b'Z'));
    }

    #[test]
    fn test_name_decoding() {
        assert!(decode_name(&[]).is_none()); // no length byte
        assert!(decode_name(&[1]).is_none()); // underflow
        assert!(decode_name(&[94]).is_none()); // length out of range
        assert_eq!(decode_name(&[0]).unwrap().as_str(), "");
        assert_eq!(decode_name(&[1, 49]).unwrap().as_str(), "1");
    }

    #[test]
    fn test_name_too_long() {
        let mut long: heapless::String<94> = heapless::String::new();
        for _ in 0..94 {
            long.push('x').unwrap();
        }
        assert!(RegisterName::try_from(long.as_str()).is_err());
    }

    #[test]
    fn test_flags() {
        let mut flags = RegisterFlags::default();
        assert_eq!(flags.value, 0);
        assert!(!flags.is_mutable());
        assert!(!flags.is_persistent());

        flags.set_mutable(true);
        flags.set_persistent(true);
        assert_eq!(flags.value, 3);

        flags.set_mutable(false);
        assert_eq!(flags.value, 2);
        assert!(flags.is_persistent());
    }

    #[test]
    fn test_value_default_is_empty() {
        let value = RegisterValue::default();
        assert!(value.is_empty());
        assert_eq!(value.tag(), 0);
        assert_eq!(encode_value(&value), [0]);
    }

    #[test]
    fn test_string_value_encoding() {
        let value = RegisterValue::String(String::try_from("1234567").unwrap());
        assert_eq!(encode_value(&value), [1, 49, 50, 51, 52, 53, 54, 55]);
    }

    #[test]
    fn test_u64_value_encoding() {
        let mut values: Vec<u64, 32> = Vec::new();
        for _ in 0..32 {
            values.push(0xDEAD_BEEF_BADC_0FFE).unwrap();
        }
        let value = RegisterValue::U64(values);

        let encoded = encode_value(&value);
        assert_eq!(encoded.len(), 257);
        assert_eq!(encoded[0], 8);
        for chunk in encoded[1..].chunks(8) {
            assert_eq!(chunk, [0xFE, 0x0F, 0xDC, 0xBA, 0xEF, 0xBE, 0xAD, 0xDE]);
        }

        assert_eq!(decode_value(&encoded), Some(value));
    }

    #[test]
    fn test_boolean_value_encoding() {
        let value = RegisterValue::Boolean(Vec::from_slice(&[false, true, false, true]).unwrap());
        assert_eq!(encode_value(&value), [3, 0, 1, 0, 1]);
        assert_eq!(decode_value(&[3, 0, 1, 0, 1]), Some(value));
    }

    #[test]
    fn test_unstructured_value_encoding() {
        let value = RegisterValue::Unstructured(Vec::from_slice(&[1, 2, 3, 4, 5]).unwrap());
        assert_eq!(encode_value(&value), [2, 1, 2, 3, 4, 5]);
        assert_eq!(decode_value(&[2, 1, 2, 3, 4, 5]), Some(value));
    }

    #[test]
    fn test_value_decoding_edges() {
        // Exhausted stream deduces an empty value.
        assert_eq!(decode_value(&[]), Some(RegisterValue::Empty));
        assert_eq!(decode_value(&[0]), Some(RegisterValue::Empty));
        // Trailing bytes after tag 0 are ignored.
        assert_eq!(decode_value(&[0, 1, 2, 3]), Some(RegisterValue::Empty));
        // Unknown tag.
        assert!(decode_value(&[99]).is_none());
        assert_eq!(
            decode_value(&[1, 48]),
            Some(RegisterValue::String(String::try_from("0").unwrap()))
        );
    }

    #[test]
    fn test_vector_capacity_is_enforced() {
        // 33 × 8 bytes overflows the 32-element u64 vector.
        let mut bytes: Vec<u8, 266> = Vec::new();
        bytes.push(8).unwrap();
        for _ in 0..(33 * 8) {
            bytes.push(0).unwrap();
        }
        assert!(decode_value(&bytes).is_none());
    }

    #[test]
    fn test_partial_trailing_element_is_left_unread() {
        // Tag 10 (u16 vector) with three bytes: one element, one byte left.
        let mut decoder = StreamDecoder::new(&[10, 0x34, 0x12, 0xFF]);
        let value = RegisterValue::try_decode(&mut decoder).unwrap();
        assert_eq!(value, RegisterValue::U16(Vec::from_slice(&[0x1234]).unwrap()));
        assert_eq!(decoder.remaining(), 1);
    }

    #[test]
    fn test_float_vector_roundtrip() {
        let value = RegisterValue::F32(Vec::from_slice(&[1.5, -0.25, 1.0e-10]).unwrap());
        let encoded = encode_value(&value);
        assert_eq!(encoded.len(), 13);
        assert_eq!(decode_value(&encoded), Some(value));

        // NaN bit patterns survive the trip even though they compare unequal.
        let nan = RegisterValue::F64(Vec::from_slice(&[f64::NAN]).unwrap());
        match decode_value(&encode_value(&nan)) {
            Some(RegisterValue::F64(values)) => assert!(values[0].is_nan()),
            other => panic!("expected f64 vector, got {:?}", other),
        }
    }
}
