//! NDNLPv2 link-layer framing (spec §3, §4.2).
//!
//! The core does not reassemble fragments: a decoded `LpPacket` with more
//! than one fragment is rejected with `Error::Lp` and the caller drops it.

use crate::error::Error;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, Bytes, BytesMut};

/// Reason codes for a network Nack (mirrors NFD's `NackReason`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NackReason {
    None,
    Congestion,
    Duplicate,
    NoRoute,
    Unknown(u64),
}

impl NackReason {
    fn to_code(self) -> u64 {
        match self {
            NackReason::None => 0,
            NackReason::Congestion => 50,
            NackReason::Duplicate => 100,
            NackReason::NoRoute => 150,
            NackReason::Unknown(code) => code,
        }
    }

    fn from_code(code: u64) -> Self {
        match code {
            0 => NackReason::None,
            50 => NackReason::Congestion,
            100 => NackReason::Duplicate,
            150 => NackReason::NoRoute,
            other => NackReason::Unknown(other),
        }
    }
}

/// Outer NDNLPv2 envelope: optional per-hop header fields plus at most one
/// fragment carrying a whole Interest or Data wire encoding (spec §3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LpPacket {
    pub sequence: Option<u64>,
    pub fragment_index: Option<u64>,
    pub fragment_count: Option<u64>,
    pub pit_token: Option<Bytes>,
    pub nack_reason: Option<NackReason>,
    pub incoming_face_id: Option<u64>,
    pub next_hop_face_id: Option<u64>,
    pub congestion_mark: Option<u64>,
    /// Header fields this decoder doesn't recognize, preserved so
    /// re-encoding doesn't silently drop forwarder-added metadata.
    pub unknown_fields: Vec<TlvElement>,
    pub fragment: Option<Bytes>,
}

impl LpPacket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_nack(&self) -> bool {
        self.nack_reason.is_some()
    }

    pub fn with_fragment(fragment: Bytes) -> Self {
        Self {
            fragment: Some(fragment),
            ..Default::default()
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut value = BytesMut::new();

        if let Some(reason) = self.nack_reason {
            let mut nack = BytesMut::new();
            TlvElement::new(tlv::TLV_LP_NACK_REASON, tlv::encode_nonnegative_integer(reason.to_code()))
                .encode(&mut nack);
            TlvElement::new(tlv::TLV_LP_NACK, nack.freeze()).encode(&mut value);
        }
        if let Some(seq) = self.sequence {
            TlvElement::new(tlv::TLV_LP_SEQUENCE, tlv::encode_nonnegative_integer(seq)).encode(&mut value);
        }
        if let Some(idx) = self.fragment_index {
            TlvElement::new(tlv::TLV_LP_FRAG_INDEX, tlv::encode_nonnegative_integer(idx)).encode(&mut value);
        }
        if let Some(count) = self.fragment_count {
            TlvElement::new(tlv::TLV_LP_FRAG_COUNT, tlv::encode_nonnegative_integer(count)).encode(&mut value);
        }
        if let Some(token) = &self.pit_token {
            TlvElement::new(tlv::TLV_LP_PIT_TOKEN, token.clone()).encode(&mut value);
        }
        if let Some(id) = self.incoming_face_id {
            TlvElement::new(tlv::TLV_LP_INCOMING_FACE_ID, tlv::encode_nonnegative_integer(id))
                .encode(&mut value);
        }
        if let Some(id) = self.next_hop_face_id {
            TlvElement::new(tlv::TLV_LP_NEXT_HOP_FACE_ID, tlv::encode_nonnegative_integer(id))
                .encode(&mut value);
        }
        if let Some(mark) = self.congestion_mark {
            TlvElement::new(tlv::TLV_LP_CONGESTION_MARK, tlv::encode_nonnegative_integer(mark))
                .encode(&mut value);
        }
        for unknown in &self.unknown_fields {
            unknown.encode(&mut value);
        }
        if let Some(fragment) = &self.fragment {
            TlvElement::new(tlv::TLV_LP_FRAGMENT, fragment.clone()).encode(&mut value);
        }

        let mut out = BytesMut::new();
        TlvElement::new(tlv::TLV_LP_PACKET, value.freeze()).encode(&mut out);
        out.freeze()
    }

    /// Decodes an LpPacket. Returns `Error::Lp` if more than one Fragment
    /// field is present (the core does not reassemble).
    pub fn decode(bytes: &Bytes) -> Result<Self, Error> {
        let mut buf = bytes.clone();
        let outer = TlvElement::decode(&mut buf)?;
        if outer.tlv_type != tlv::TLV_LP_PACKET {
            return Err(Error::NdnPacket(format!(
                "expected LpPacket TLV type {}, got {}",
                tlv::TLV_LP_PACKET,
                outer.tlv_type
            )));
        }

        let mut packet = LpPacket::new();
        let mut fragment_count = 0;
        let mut body = outer.value.clone();

        while body.has_remaining() {
            let e = TlvElement::decode(&mut body)?;
            match e.tlv_type {
                t if t == tlv::TLV_LP_NACK => {
                    let mut nbuf = e.value.clone();
                    if nbuf.has_remaining() {
                        let reason_elem = TlvElement::decode(&mut nbuf)?;
                        let code = tlv::decode_nonnegative_integer(&reason_elem.value)?;
                        packet.nack_reason = Some(NackReason::from_code(code));
                    } else {
                        packet.nack_reason = Some(NackReason::None);
                    }
                }
                t if t == tlv::TLV_LP_SEQUENCE => {
                    packet.sequence = Some(tlv::decode_nonnegative_integer(&e.value)?);
                }
                t if t == tlv::TLV_LP_FRAG_INDEX => {
                    packet.fragment_index = Some(tlv::decode_nonnegative_integer(&e.value)?);
                }
                t if t == tlv::TLV_LP_FRAG_COUNT => {
                    packet.fragment_count = Some(tlv::decode_nonnegative_integer(&e.value)?);
                }
                t if t == tlv::TLV_LP_PIT_TOKEN => {
                    packet.pit_token = Some(e.value);
                }
                t if t == tlv::TLV_LP_INCOMING_FACE_ID => {
                    packet.incoming_face_id = Some(tlv::decode_nonnegative_integer(&e.value)?);
                }
                t if t == tlv::TLV_LP_NEXT_HOP_FACE_ID => {
                    packet.next_hop_face_id = Some(tlv::decode_nonnegative_integer(&e.value)?);
                }
                t if t == tlv::TLV_LP_CONGESTION_MARK => {
                    packet.congestion_mark = Some(tlv::decode_nonnegative_integer(&e.value)?);
                }
                t if t == tlv::TLV_LP_FRAGMENT => {
                    fragment_count += 1;
                    packet.fragment = Some(e.value);
                }
                _ => packet.unknown_fields.push(e),
            }
        }

        if fragment_count > 1 {
            return Err(Error::Lp(format!(
                "multi-fragment LpPacket ({fragment_count} fragments) not supported; reassembly is out of scope"
            )));
        }

        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_fragment_and_header_fields() {
        let mut packet = LpPacket::with_fragment(Bytes::from_static(b"fake-interest-bytes"));
        packet.incoming_face_id = Some(42);
        packet.congestion_mark = Some(1);

        let bytes = packet.encode();
        let decoded = LpPacket::decode(&bytes).unwrap();

        assert_eq!(decoded.fragment, packet.fragment);
        assert_eq!(decoded.incoming_face_id, Some(42));
        assert_eq!(decoded.congestion_mark, Some(1));
        assert!(!decoded.is_nack());
    }

    #[test]
    fn nack_round_trips_reason() {
        let mut packet = LpPacket::with_fragment(Bytes::from_static(b"fake-interest-bytes"));
        packet.nack_reason = Some(NackReason::NoRoute);

        let decoded = LpPacket::decode(&packet.encode()).unwrap();
        assert!(decoded.is_nack());
        assert_eq!(decoded.nack_reason, Some(NackReason::NoRoute));
    }

    #[test]
    fn multi_fragment_packet_is_rejected() {
        let mut buf = BytesMut::new();
        TlvElement::new(tlv::TLV_LP_FRAGMENT, &b"a"[..]).encode(&mut buf);
        TlvElement::new(tlv::TLV_LP_FRAGMENT, &b"b"[..]).encode(&mut buf);
        let mut out = BytesMut::new();
        TlvElement::new(tlv::TLV_LP_PACKET, buf.freeze()).encode(&mut out);

        assert!(LpPacket::decode(&out.freeze()).is_err());
    }
}
