//! Variable Byte Integer encoding
//!
//! Values use 1-4 bytes, seven data bits per byte, least significant group
//! first, with bit 7 set on every byte except the last.

use crate::constants::limits::MAX_VARIABLE_INT_BYTES;
use crate::constants::masks::{CONTINUATION_BIT, VARIABLE_BYTE_VALUE};
use crate::error::{MqttError, Result};
use bytes::{Buf, BufMut};
use std::fmt;
use std::io::{self, Read};

/// Maximum value that can be encoded as a variable byte integer (268,435,455)
pub const VARIABLE_INT_MAX: u32 = crate::constants::limits::MAX_VARIABLE_INT;

/// Variable byte integer as used by MQTT remaining lengths and property lengths
///
/// Encodes values using 1-4 bytes:
/// - 0-127: 1 byte
/// - 128-16,383: 2 bytes
/// - 16,384-2,097,151: 3 bytes
/// - 2,097,152-268,435,455: 4 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableInt {
    value: u32,
}

impl VariableInt {
    /// Creates a new `VariableInt` from a u32 value
    ///
    /// # Errors
    ///
    /// Returns `MqttError::MalformedLength` if the value exceeds the maximum
    pub fn new(value: u32) -> Result<Self> {
        if value > VARIABLE_INT_MAX {
            return Err(MqttError::MalformedLength(format!(
                "value {value} exceeds maximum {VARIABLE_INT_MAX}"
            )));
        }
        Ok(Self { value })
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Returns the number of bytes needed to encode this value
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        match self.value {
            0..=127 => 1,
            128..=16_383 => 2,
            16_384..=2_097_151 => 3,
            _ => 4,
        }
    }

    /// Encodes this variable integer into the provided buffer
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        let mut val = self.value;
        loop {
            // Truncation is the point: only the low seven bits are kept
            #[allow(clippy::cast_possible_truncation)]
            let mut byte = (val % 128) as u8;
            val /= 128;
            if val > 0 {
                byte |= CONTINUATION_BIT;
            }
            buf.put_u8(byte);
            if val == 0 {
                break;
            }
        }
    }

    /// Decodes a variable integer from the buffer
    ///
    /// # Errors
    ///
    /// Returns `MqttError::MalformedLength` if the buffer ends mid-sequence
    /// or a fifth byte would be required
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let mut value = 0u32;

        for position in 0..MAX_VARIABLE_INT_BYTES {
            if !buf.has_remaining() {
                return Err(MqttError::MalformedLength(
                    "input ended inside variable byte integer".to_string(),
                ));
            }
            let byte = buf.get_u8();
            value |= u32::from(byte & VARIABLE_BYTE_VALUE) << (7 * position);
            if byte & CONTINUATION_BIT == 0 {
                return Ok(Self { value });
            }
        }

        Err(MqttError::MalformedLength(
            "variable byte integer exceeds 4 bytes".to_string(),
        ))
    }

    /// Reads a variable integer one byte at a time from a blocking reader
    ///
    /// # Errors
    ///
    /// Returns `MqttError::MalformedLength` if the stream ends mid-sequence or
    /// a fifth byte would be required. Other read failures are returned as
    /// `MqttError::Io`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut value = 0u32;
        let mut byte = [0u8; 1];

        for position in 0..MAX_VARIABLE_INT_BYTES {
            match reader.read_exact(&mut byte) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(MqttError::MalformedLength(
                        "stream ended inside variable byte integer".to_string(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
            value |= u32::from(byte[0] & VARIABLE_BYTE_VALUE) << (7 * position);
            if byte[0] & CONTINUATION_BIT == 0 {
                return Ok(Self { value });
            }
        }

        Err(MqttError::MalformedLength(
            "variable byte integer exceeds 4 bytes".to_string(),
        ))
    }
}

impl fmt::Display for VariableInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<VariableInt> for u32 {
    fn from(v: VariableInt) -> Self {
        v.value
    }
}

impl TryFrom<u32> for VariableInt {
    type Error = MqttError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<usize> for VariableInt {
    type Error = MqttError;

    fn try_from(value: usize) -> Result<Self> {
        let value = u32::try_from(value).map_err(|_| {
            MqttError::MalformedLength(format!("value {value} exceeds maximum {VARIABLE_INT_MAX}"))
        })?;
        Self::new(value)
    }
}

/// Encodes a u32 value as a variable byte integer
///
/// # Errors
///
/// Returns `MqttError::MalformedLength` if the value exceeds the maximum
pub fn encode_variable_int<B: BufMut>(buf: &mut B, value: u32) -> Result<()> {
    VariableInt::new(value)?.encode(buf);
    Ok(())
}

/// Decodes a variable byte integer from the buffer
///
/// # Errors
///
/// Returns `MqttError::MalformedLength` if decoding fails
pub fn decode_variable_int<B: Buf>(buf: &mut B) -> Result<u32> {
    Ok(VariableInt::decode(buf)?.value())
}

/// Reads a variable byte integer from a blocking reader
///
/// # Errors
///
/// Same as [`VariableInt::read_from`]
pub fn read_variable_int<R: Read>(reader: &mut R) -> Result<u32> {
    Ok(VariableInt::read_from(reader)?.value())
}

/// Number of bytes needed to encode a value, saturating at 4
#[must_use]
pub fn variable_int_len(value: u32) -> usize {
    VariableInt {
        value: value.min(VARIABLE_INT_MAX),
    }
    .encoded_size()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use std::io::Cursor;

    #[test]
    fn test_new_valid_values() {
        for value in [0, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152, VARIABLE_INT_MAX] {
            assert!(VariableInt::new(value).is_ok());
        }
    }

    #[test]
    fn test_new_invalid_values() {
        assert!(matches!(
            VariableInt::new(VARIABLE_INT_MAX + 1),
            Err(MqttError::MalformedLength(_))
        ));
        assert!(VariableInt::new(u32::MAX).is_err());

        let mut buf = BytesMut::new();
        assert!(encode_variable_int(&mut buf, 268_435_456).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_boundaries() {
        let cases: [(u32, &[u8]); 8] = [
            (0, &[0x00]),
            (127, &[0x7F]),
            (128, &[0x80, 0x01]),
            (16_383, &[0xFF, 0x7F]),
            (16_384, &[0x80, 0x80, 0x01]),
            (2_097_151, &[0xFF, 0xFF, 0x7F]),
            (2_097_152, &[0x80, 0x80, 0x80, 0x01]),
            (VARIABLE_INT_MAX, &[0xFF, 0xFF, 0xFF, 0x7F]),
        ];

        for (value, expected) in cases {
            let mut buf = BytesMut::new();
            encode_variable_int(&mut buf, value).unwrap();
            assert_eq!(&buf[..], expected, "encoding {value}");
            assert_eq!(variable_int_len(value), expected.len());

            let decoded = decode_variable_int(&mut buf).unwrap();
            assert_eq!(decoded, value);
            assert!(buf.is_empty());

            let streamed = VariableInt::read_from(&mut Cursor::new(expected)).unwrap();
            assert_eq!(streamed.value(), value);
        }
    }

    #[test]
    fn test_mqtt_spec_examples() {
        let mut buf = BytesMut::new();

        VariableInt::new(64).unwrap().encode(&mut buf);
        assert_eq!(&buf[..], &[0x40]);

        buf.clear();
        VariableInt::new(321).unwrap().encode(&mut buf);
        assert_eq!(&buf[..], &[0xC1, 0x02]);
    }

    #[test]
    fn test_decode_insufficient_bytes() {
        let mut buf = BytesMut::new();
        buf.put_u8(0x80);

        let result = VariableInt::decode(&mut buf);
        assert!(matches!(result, Err(MqttError::MalformedLength(_))));

        let result = VariableInt::read_from(&mut Cursor::new([0xFFu8, 0xFF]));
        assert!(matches!(result, Err(MqttError::MalformedLength(_))));
    }

    #[test]
    fn test_decode_too_many_bytes() {
        let bytes = [0x80u8, 0x80, 0x80, 0x80, 0x01];

        let mut buf = &bytes[..];
        let result = VariableInt::decode(&mut buf);
        assert!(matches!(result, Err(MqttError::MalformedLength(_))));

        let mut cursor = Cursor::new(bytes);
        let result = VariableInt::read_from(&mut cursor);
        assert!(matches!(result, Err(MqttError::MalformedLength(_))));
        // The fifth byte is never consumed
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_non_minimal_encoding_is_accepted() {
        // 0x80 0x00 decodes to 0 even though 0x00 alone is minimal
        let mut buf = &[0x80u8, 0x00][..];
        assert_eq!(decode_variable_int(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_conversions() {
        let var_int = VariableInt::new(123).unwrap();
        let value: u32 = var_int.into();
        assert_eq!(value, 123);

        assert_eq!(VariableInt::try_from(456u32).unwrap().value(), 456);
        assert_eq!(VariableInt::try_from(789usize).unwrap().value(), 789);
        assert!(VariableInt::try_from(VARIABLE_INT_MAX + 1).is_err());
        assert_eq!(format!("{var_int}"), "123");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_round_trip(value in 0u32..=VARIABLE_INT_MAX) {
                let mut buf = BytesMut::new();

                let var_int = VariableInt::new(value).unwrap();
                var_int.encode(&mut buf);
                prop_assert_eq!(buf.len(), var_int.encoded_size());

                let streamed = VariableInt::read_from(&mut Cursor::new(buf.to_vec())).unwrap();
                let decoded = VariableInt::decode(&mut buf).unwrap();

                prop_assert_eq!(decoded.value(), value);
                prop_assert_eq!(streamed.value(), value);
            }

            #[test]
            fn prop_invalid_values_rejected(value in (VARIABLE_INT_MAX + 1)..=u32::MAX) {
                prop_assert!(VariableInt::new(value).is_err());
            }
        }
    }
}
