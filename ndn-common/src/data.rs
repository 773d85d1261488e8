//! Data packet model, MetaInfo, and wire codec (spec §3, §4.2).

use crate::error::Error;
use crate::name::{Component, Name};
use crate::signature::Signature;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, Bytes, BytesMut};
use sha2::{Digest, Sha256};

pub const CONTENT_TYPE_BLOB: u64 = 0;
pub const CONTENT_TYPE_LINK: u64 = 1;
pub const CONTENT_TYPE_KEY: u64 = 2;
pub const CONTENT_TYPE_NACK: u64 = 3;

/// MetaInfo (spec §3): content type, freshness period, final block id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaInfo {
    pub content_type: Option<u64>,
    pub freshness_period_ms: Option<u64>,
    pub final_block_id: Option<Component>,
}

impl MetaInfo {
    fn to_tlv(&self) -> TlvElement {
        let mut value = BytesMut::new();
        if let Some(ct) = self.content_type {
            TlvElement::new(tlv::TLV_CONTENT_TYPE, tlv::encode_nonnegative_integer(ct))
                .encode(&mut value);
        }
        if let Some(fp) = self.freshness_period_ms {
            TlvElement::new(tlv::TLV_FRESHNESS_PERIOD, tlv::encode_nonnegative_integer(fp))
                .encode(&mut value);
        }
        if let Some(fb) = &self.final_block_id {
            let mut inner = BytesMut::new();
            fb.to_tlv().encode(&mut inner);
            TlvElement::new(tlv::TLV_FINAL_BLOCK_ID, inner.freeze()).encode(&mut value);
        }
        TlvElement::new(tlv::TLV_META_INFO, value.freeze())
    }

    fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        let mut meta = MetaInfo::default();
        let mut buf = element.value.clone();
        while buf.has_remaining() {
            let e = TlvElement::decode(&mut buf)?;
            match e.tlv_type {
                t if t == tlv::TLV_CONTENT_TYPE => {
                    meta.content_type = Some(tlv::decode_nonnegative_integer(&e.value)?);
                }
                t if t == tlv::TLV_FRESHNESS_PERIOD => {
                    meta.freshness_period_ms = Some(tlv::decode_nonnegative_integer(&e.value)?);
                }
                t if t == tlv::TLV_FINAL_BLOCK_ID => {
                    let mut inner = e.value.clone();
                    let comp_elem = TlvElement::decode(&mut inner)?;
                    meta.final_block_id = Some(Component::from_tlv(&comp_elem)?);
                }
                _ => {}
            }
        }
        Ok(meta)
    }
}

/// A Data packet (spec §3). `full_name` is recomputed from the current
/// field values on every call (invariant iii: `getFullName` is idempotent
/// for a given wire encoding) rather than cached, so mutating `name`,
/// `meta_info`, `content`, or `signature` in place can never leave a stale
/// digest behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: Name,
    pub meta_info: MetaInfo,
    pub content: Bytes,
    pub signature: Signature,
}

impl Data {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            meta_info: MetaInfo::default(),
            content: Bytes::new(),
            signature: Signature::DigestSha256 { value: None },
        }
    }

    /// Encodes the Data, returning the wire bytes and the `(start, end)`
    /// byte offsets of the signed portion (Name..SignatureInfo inclusive,
    /// spec §4.2 "Data encoding order").
    pub fn encode(&self) -> (Bytes, (usize, usize)) {
        let mut signed = BytesMut::new();
        self.name.to_tlv().encode(&mut signed);
        self.meta_info.to_tlv().encode(&mut signed);
        TlvElement::new(tlv::TLV_CONTENT, self.content.clone()).encode(&mut signed);
        self.signature.signature_info_to_tlv().encode(&mut signed);
        let signed_len = signed.len();

        let mut value = signed;
        self.signature.signature_value_to_tlv().encode(&mut value);
        let value_len = value.len();

        let outer_header_len = tlv::varnum_size(tlv::TLV_DATA) + tlv::varnum_size(value_len as u64);
        let mut out = BytesMut::with_capacity(outer_header_len + value_len);
        TlvElement::new(tlv::TLV_DATA, value.freeze()).encode(&mut out);

        (out.freeze(), (outer_header_len, outer_header_len + signed_len))
    }

    pub fn decode(bytes: &Bytes) -> Result<(Self, (usize, usize)), Error> {
        let mut buf = bytes.clone();
        let outer = TlvElement::decode(&mut buf)?;
        if outer.tlv_type != tlv::TLV_DATA {
            return Err(Error::NdnPacket(format!(
                "expected Data TLV type {}, got {}",
                tlv::TLV_DATA,
                outer.tlv_type
            )));
        }

        let outer_header_len = bytes.len() - outer.value.len();
        let mut body = outer.value.clone();

        let name_element = TlvElement::decode(&mut body)?;
        let name = Name::from_tlv(&name_element)?;

        let meta_element = TlvElement::decode(&mut body)?;
        let meta_info = MetaInfo::from_tlv(&meta_element)?;

        let content_element = TlvElement::decode(&mut body)?;
        if content_element.tlv_type != tlv::TLV_CONTENT {
            return Err(Error::NdnPacket("expected Content TLV".into()));
        }

        let signature_info_start = outer.value.len() - body.remaining();
        let info_element = TlvElement::decode(&mut body)?;
        let signed_end_in_value = outer.value.len() - body.remaining();

        let value_element = if body.has_remaining() {
            Some(TlvElement::decode(&mut body)?)
        } else {
            None
        };

        let signature = Signature::from_tlv(&info_element, value_element.as_ref())?;
        let _ = signature_info_start;

        let data = Data {
            name,
            meta_info,
            content: content_element.value,
            signature,
        };

        Ok((
            data,
            (outer_header_len, outer_header_len + signed_end_in_value),
        ))
    }

    /// Computes the full name: the Name extended by an implicit-SHA-256-
    /// digest component over the full wire encoding (spec §4.1 "Full-name
    /// computation"). Recomputed on every call, so it always reflects the
    /// Data's current field values.
    pub fn full_name(&self) -> Name {
        let (bytes, _) = self.encode();
        let digest: [u8; 32] = Sha256::digest(&bytes).into();
        self.name.clone().append(Component::from_implicit_digest(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::KeyLocator;

    #[test]
    fn roundtrips_name_content_and_metainfo() {
        let mut data = Data::new(Name::parse("/a").unwrap());
        data.content = Bytes::from_static(&[0x68, 0x69]);
        data.meta_info.freshness_period_ms = Some(1000);

        let (bytes, _) = data.encode();
        let (decoded, _) = Data::decode(&bytes).unwrap();

        assert_eq!(decoded.name, data.name);
        assert_eq!(decoded.content, data.content);
        assert_eq!(decoded.meta_info.freshness_period_ms, Some(1000));
    }

    #[test]
    fn full_name_is_idempotent() {
        let data = Data::new(Name::parse("/a/b").unwrap());
        let first = data.full_name();
        let second = data.full_name();
        assert_eq!(first, second);
        assert_eq!(first.len(), data.name.len() + 1);
        assert!(first.get(-1).unwrap().is_implicit_sha256_digest());
    }

    #[test]
    fn full_name_reflects_in_place_mutation() {
        let mut data = Data::new(Name::parse("/a").unwrap());
        let before = data.full_name();
        data.name = Name::parse("/b").unwrap();
        let after = data.full_name();
        assert_ne!(before, after);
        assert_eq!(after.get(0).unwrap(), data.name.get(0).unwrap());
    }

    #[test]
    fn signed_portion_excludes_signature_value() {
        let mut data = Data::new(Name::parse("/a").unwrap());
        data.signature = Signature::Sha256WithRsa {
            key_locator: KeyLocator::KeyName(Name::parse("/key").unwrap()),
            validity: None,
            value: Some(Bytes::from_static(b"fake-signature-bytes")),
        };
        let (bytes, (start, end)) = data.encode();
        assert!(end <= bytes.len());
        assert!(start < end);
        // Mutating bytes outside [start, end) (the SignatureValue) must not
        // change the signed region's content.
        let signed_slice = bytes.slice(start..end);
        let (bytes2, (start2, end2)) = data.encode();
        assert_eq!(signed_slice, bytes2.slice(start2..end2));
    }
}
