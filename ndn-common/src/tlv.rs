//! TLV (Type-Length-Value) encoding and decoding primitives.
//!
//! This module implements the NDN-TLV number encoding shared by Type and
//! Length fields: a single byte below 253 encodes itself; 253, 254, 255
//! introduce 2, 4, or 8 big-endian bytes. Both the well-known NDN TLV type
//! codes and the generic `TlvElement` wrapper live here; individual packet
//! types (Name, Interest, Data, ...) encode/decode themselves in terms of
//! these primitives.

use crate::error::Error;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// NDN TLV type codes (NDN packet format v0.3).
pub const TLV_INTEREST: u64 = 0x05;
pub const TLV_DATA: u64 = 0x06;
pub const TLV_NAME: u64 = 0x07;
pub const TLV_COMPONENT_GENERIC: u64 = 0x08;
pub const TLV_COMPONENT_IMPLICIT_SHA256_DIGEST: u64 = 0x01;
pub const TLV_COMPONENT_PARAMETERS_SHA256_DIGEST: u64 = 0x02;
pub const TLV_SELECTORS: u64 = 0x09;
pub const TLV_NONCE: u64 = 0x0A;
pub const TLV_INTEREST_LIFETIME: u64 = 0x0C;
pub const TLV_MIN_SUFFIX_COMPONENTS: u64 = 0x0D;
pub const TLV_MAX_SUFFIX_COMPONENTS: u64 = 0x0E;
pub const TLV_PUBLISHER_PUBLIC_KEY_LOCATOR: u64 = 0x0F;
pub const TLV_EXCLUDE: u64 = 0x10;
pub const TLV_CHILD_SELECTOR: u64 = 0x11;
pub const TLV_MUST_BE_FRESH: u64 = 0x12;
pub const TLV_ANY: u64 = 0x13;
pub const TLV_META_INFO: u64 = 0x14;
pub const TLV_CONTENT: u64 = 0x15;
pub const TLV_SIGNATURE_INFO: u64 = 0x16;
pub const TLV_SIGNATURE_VALUE: u64 = 0x17;
pub const TLV_CONTENT_TYPE: u64 = 0x18;
pub const TLV_FRESHNESS_PERIOD: u64 = 0x19;
pub const TLV_FINAL_BLOCK_ID: u64 = 0x1A;
pub const TLV_SIGNATURE_TYPE: u64 = 0x1B;
pub const TLV_KEY_LOCATOR: u64 = 0x1C;
pub const TLV_KEY_DIGEST: u64 = 0x1D;
pub const TLV_FORWARDING_HINT: u64 = 0x1E;
pub const TLV_SELECTED_DELEGATION: u64 = 0x1F;

pub const TLV_VALIDITY_PERIOD: u64 = 0xFD;
pub const TLV_NOT_BEFORE: u64 = 0xFE;
pub const TLV_NOT_AFTER: u64 = 0xFF;

/// ControlParameters (management protocol, spec §4.8) field codes.
/// These live in a disjoint numbering space from packet-format TLVs —
/// they only ever appear inside the Content of a `/localhost/nfd/...`
/// command Interest/response, never inside an Interest or Data itself.
pub const TLV_CONTROL_PARAMETERS: u64 = 0x68;
pub const TLV_CONTROL_RESPONSE: u64 = 0x65;
pub const TLV_FACE_ID: u64 = 0x69;
pub const TLV_URI: u64 = 0x72;
pub const TLV_LOCAL_URI: u64 = 0x81;
pub const TLV_ORIGIN: u64 = 0x6F;
pub const TLV_COST: u64 = 0x6A;
pub const TLV_CAPACITY: u64 = 0x83;
pub const TLV_COUNT: u64 = 0x84;
pub const TLV_FLAGS: u64 = 0x6C;
pub const TLV_MASK: u64 = 0x70;
pub const TLV_STRATEGY: u64 = 0x6B;
pub const TLV_EXPIRATION_PERIOD: u64 = 0x6D;
pub const TLV_STATUS_CODE: u64 = 0x66;
pub const TLV_STATUS_TEXT: u64 = 0x67;

/// NDNLPv2 (spec §4.4) field codes. Distinct numbering space from both
/// of the above — these appear only inside an `LpPacket` envelope.
pub const TLV_LP_PACKET: u64 = 0x64;
pub const TLV_LP_SEQUENCE: u64 = 0x51;
pub const TLV_LP_FRAG_INDEX: u64 = 0x52;
pub const TLV_LP_FRAG_COUNT: u64 = 0x53;
pub const TLV_LP_PIT_TOKEN: u64 = 0x62;
pub const TLV_LP_FRAGMENT: u64 = 0x50;
pub const TLV_LP_NACK: u64 = 0x0320;
pub const TLV_LP_NACK_REASON: u64 = 0x0321;
pub const TLV_LP_NEXT_HOP_FACE_ID: u64 = 0x0330;
pub const TLV_LP_INCOMING_FACE_ID: u64 = 0x0331;
pub const TLV_LP_CACHE_POLICY: u64 = 0x0334;
pub const TLV_LP_CACHE_POLICY_TYPE: u64 = 0x0335;
pub const TLV_LP_CONGESTION_MARK: u64 = 0x0340;
pub const TLV_LP_ACK: u64 = 0x0344;
pub const TLV_LP_TX_SEQUENCE: u64 = 0x0346;
pub const TLV_LP_NON_DISCOVERY: u64 = 0x0350;
pub const TLV_LP_PREFIX_ANNOUNCEMENT: u64 = 0x0352;

/// Encodes a TLV Type or Length as a variable-length number.
///
/// - `< 253`: one byte.
/// - `<= 0xFFFF`: marker byte `253` followed by 2 bytes.
/// - `<= 0xFFFF_FFFF`: marker byte `254` followed by 4 bytes.
/// - otherwise: marker byte `255` followed by 8 bytes.
pub fn encode_varnum(value: u64, buf: &mut BytesMut) {
    if value < 253 {
        buf.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        buf.put_u8(253);
        buf.put_u16(value as u16);
    } else if value <= u32::MAX as u64 {
        buf.put_u8(254);
        buf.put_u32(value as u32);
    } else {
        buf.put_u8(255);
        buf.put_u64(value);
    }
}

/// Number of bytes `encode_varnum` will produce for `value`.
pub fn varnum_size(value: u64) -> usize {
    if value < 253 {
        1
    } else if value <= u16::MAX as u64 {
        3
    } else if value <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/// Decodes a variable-length number (Type or Length field).
pub fn decode_varnum(buf: &mut impl Buf) -> Result<u64, Error> {
    if !buf.has_remaining() {
        return Err(Error::Tlv("buffer underflow decoding TLV number".into()));
    }
    let marker = buf.get_u8();
    match marker {
        0..=252 => Ok(marker as u64),
        253 => {
            if buf.remaining() < 2 {
                return Err(Error::Tlv("buffer underflow decoding 16-bit TLV number".into()));
            }
            Ok(buf.get_u16() as u64)
        }
        254 => {
            if buf.remaining() < 4 {
                return Err(Error::Tlv("buffer underflow decoding 32-bit TLV number".into()));
            }
            Ok(buf.get_u32() as u64)
        }
        _ => {
            if buf.remaining() < 8 {
                return Err(Error::Tlv("buffer underflow decoding 64-bit TLV number".into()));
            }
            Ok(buf.get_u64())
        }
    }
}

/// A generic TLV element: a type, a length (implicit in `value.len()`), and
/// a value. Decoding does not interpret the value; callers re-parse it
/// according to the type they expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvElement {
    pub tlv_type: u64,
    pub value: Bytes,
}

impl TlvElement {
    pub fn new(tlv_type: u64, value: impl Into<Bytes>) -> Self {
        Self {
            tlv_type,
            value: value.into(),
        }
    }

    /// Total encoded length: type + length + value.
    pub fn len(&self) -> usize {
        varnum_size(self.tlv_type) + varnum_size(self.value.len() as u64) + self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        encode_varnum(self.tlv_type, buf);
        encode_varnum(self.value.len() as u64, buf);
        buf.extend_from_slice(&self.value);
    }

    /// Decodes one TLV element from the front of `buf`, advancing it past
    /// the element.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, Error> {
        let tlv_type = decode_varnum(buf)?;
        let length = decode_varnum(buf)? as usize;

        if buf.remaining() < length {
            return Err(Error::Tlv(format!(
                "TLV type {} wants {} value bytes but only {} remain",
                tlv_type,
                length,
                buf.remaining()
            )));
        }

        let mut value = BytesMut::with_capacity(length);
        value.put(buf.take(length));

        Ok(Self {
            tlv_type,
            value: value.freeze(),
        })
    }
}

/// Encodes a non-negative integer as the minimum-width big-endian byte
/// sequence (used by typed Name components: segment, version, sequence
/// number, timestamp, byte offset). Zero encodes as a single zero byte,
/// never as an empty sequence.
pub fn encode_nonnegative_integer(value: u64) -> Bytes {
    if value == 0 {
        return Bytes::from_static(&[0]);
    }
    let bytes = value.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap();
    Bytes::copy_from_slice(&bytes[first_nonzero..])
}

/// Decodes a non-negative integer encoded as a minimum-width big-endian
/// byte sequence, as produced by [`encode_nonnegative_integer`].
pub fn decode_nonnegative_integer(bytes: &[u8]) -> Result<u64, Error> {
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(Error::Tlv(format!(
            "non-negative integer must be 1-8 bytes, got {}",
            bytes.len()
        )));
    }
    let mut buf = [0u8; 8];
    buf[8 - bytes.len()..].copy_from_slice(bytes);
    Ok(u64::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varnum_roundtrip_all_width_classes() {
        for value in [
            0u64,
            1,
            252,
            253,
            300,
            65535,
            65536,
            100_000,
            u32::MAX as u64,
            u32::MAX as u64 + 1,
            u64::MAX,
        ] {
            let mut buf = BytesMut::new();
            encode_varnum(value, &mut buf);
            assert_eq!(buf.len(), varnum_size(value));
            let mut cursor = buf.freeze();
            let decoded = decode_varnum(&mut cursor).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn varnum_width_markers() {
        let mut buf = BytesMut::new();
        encode_varnum(1000, &mut buf);
        assert_eq!(buf[0], 253);

        let mut buf = BytesMut::new();
        encode_varnum(100_000, &mut buf);
        assert_eq!(buf[0], 254);

        let mut buf = BytesMut::new();
        encode_varnum(u64::MAX, &mut buf);
        assert_eq!(buf[0], 255);
    }

    #[test]
    fn tlv_element_roundtrip() {
        let element = TlvElement::new(1, &b"abc"[..]);
        let mut buf = BytesMut::new();
        element.encode(&mut buf);
        assert_eq!(buf.len(), 5);

        let mut cursor = buf.freeze();
        let decoded = TlvElement::decode(&mut cursor).unwrap();
        assert_eq!(decoded, element);
    }

    #[test]
    fn nonnegative_integer_roundtrip() {
        for v in [0u64, 1, 255, 256, 65535, 65536, u32::MAX as u64, u64::MAX] {
            let encoded = encode_nonnegative_integer(v);
            if v == 0 {
                assert_eq!(encoded.len(), 1);
            }
            let decoded = decode_nonnegative_integer(&encoded).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn truncated_element_is_an_error() {
        let mut buf = BytesMut::new();
        buf.put_u8(TLV_NAME as u8);
        buf.put_u8(10); // claims 10 bytes, but none follow
        let mut cursor = buf.freeze();
        assert!(TlvElement::decode(&mut cursor).is_err());
    }
}
