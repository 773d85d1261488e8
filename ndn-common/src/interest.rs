//! Interest packet model and wire codec (spec §3, §4.2).

use crate::error::Error;
use crate::name::Name;
use crate::signature::{Exclude, KeyLocator};
use crate::tlv::{self, TlvElement};
use bytes::{Buf, Bytes, BytesMut};
use rand::RngCore;

/// A single forwarding-hint delegation: a preference and a Name (spec
/// §4.2 "ForwardingHint TLV: a Delegation set").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    pub preference: u64,
    pub name: Name,
}

/// An Interest packet (spec §3). `nonce` is `None` until first encoded, at
/// which point four cryptographically random bytes are generated and
/// retained for the lifetime of the value (spec §4.2, §8 scenario 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub name: Name,
    /// -1 (represented as `None`) means unspecified.
    pub min_suffix_components: Option<i64>,
    pub max_suffix_components: Option<i64>,
    pub key_locator: Option<KeyLocator>,
    pub exclude: Exclude,
    /// -1 (`None`) = no preference, otherwise 0 or 1.
    pub child_selector: Option<i64>,
    pub must_be_fresh: bool,
    /// -1 (`None`) = unspecified (the forwarder default applies).
    pub interest_lifetime_ms: Option<i64>,
    pub nonce: Option<[u8; 4]>,
    pub forwarding_hint: Vec<Delegation>,
    pub selected_delegation: Option<u64>,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            min_suffix_components: None,
            max_suffix_components: None,
            key_locator: None,
            exclude: Exclude::new(),
            child_selector: None,
            must_be_fresh: false,
            interest_lifetime_ms: None,
            nonce: None,
            forwarding_hint: Vec::new(),
            selected_delegation: None,
        }
    }

    /// Fills the nonce with random bytes if unset, matching the codec's
    /// "generate on first encode" rule.
    pub fn ensure_nonce(&mut self) {
        if self.nonce.is_none() {
            let mut bytes = [0u8; 4];
            rand::thread_rng().fill_bytes(&mut bytes);
            self.nonce = Some(bytes);
        }
    }

    fn has_selectors(&self) -> bool {
        self.min_suffix_components.is_some()
            || self.max_suffix_components.is_some()
            || self.key_locator.is_some()
            || !self.exclude.is_empty()
            || self.child_selector.is_some()
            || self.must_be_fresh
    }

    /// Encodes the Interest, returning the wire bytes and the
    /// `(start, end)` byte offsets of the signed portion: the Name minus
    /// its final component when that component is a signature (the
    /// command-Interest convention), otherwise the whole encoded Name.
    pub fn encode(&mut self) -> (Bytes, (usize, usize)) {
        self.ensure_nonce();

        let mut value = BytesMut::new();
        let name_tlv = self.name.to_tlv();
        let name_start = 0;
        name_tlv.encode(&mut value);
        let name_end = value.len();

        if self.has_selectors() {
            let mut selectors = BytesMut::new();
            if let Some(min) = self.min_suffix_components.filter(|v| *v >= 0) {
                TlvElement::new(tlv::TLV_MIN_SUFFIX_COMPONENTS, tlv::encode_nonnegative_integer(min as u64))
                    .encode(&mut selectors);
            }
            if let Some(max) = self.max_suffix_components.filter(|v| *v >= 0) {
                TlvElement::new(tlv::TLV_MAX_SUFFIX_COMPONENTS, tlv::encode_nonnegative_integer(max as u64))
                    .encode(&mut selectors);
            }
            if let Some(kl) = &self.key_locator {
                if let Some(elem) = kl.to_tlv() {
                    TlvElement::new(tlv::TLV_PUBLISHER_PUBLIC_KEY_LOCATOR, {
                        let mut b = BytesMut::new();
                        elem.encode(&mut b);
                        b.freeze()
                    })
                    .encode(&mut selectors);
                }
            }
            if !self.exclude.is_empty() {
                self.exclude.to_tlv().encode(&mut selectors);
            }
            if let Some(cs) = self.child_selector.filter(|v| *v >= 0) {
                TlvElement::new(tlv::TLV_CHILD_SELECTOR, tlv::encode_nonnegative_integer(cs as u64))
                    .encode(&mut selectors);
            }
            if self.must_be_fresh {
                TlvElement::new(tlv::TLV_MUST_BE_FRESH, Bytes::new()).encode(&mut selectors);
            }
            TlvElement::new(tlv::TLV_SELECTORS, selectors.freeze()).encode(&mut value);
        }

        TlvElement::new(tlv::TLV_NONCE, Bytes::copy_from_slice(&self.nonce.unwrap()))
            .encode(&mut value);

        if let Some(lifetime) = self.interest_lifetime_ms.filter(|v| *v >= 0) {
            TlvElement::new(tlv::TLV_INTEREST_LIFETIME, tlv::encode_nonnegative_integer(lifetime as u64))
                .encode(&mut value);
        }

        if !self.forwarding_hint.is_empty() {
            let mut fh = BytesMut::new();
            for d in &self.forwarding_hint {
                let mut entry = BytesMut::new();
                tlv::encode_varnum(d.preference, &mut entry);
                d.name.to_tlv().encode(&mut entry);
                TlvElement::new(tlv::TLV_SELECTED_DELEGATION, entry.freeze()).encode(&mut fh);
            }
            TlvElement::new(tlv::TLV_FORWARDING_HINT, fh.freeze()).encode(&mut value);
        }

        if let Some(selected) = self.selected_delegation {
            TlvElement::new(tlv::TLV_SELECTED_DELEGATION, tlv::encode_nonnegative_integer(selected))
                .encode(&mut value);
        }

        let value_len = value.len();
        let outer_header_len = tlv::varnum_size(tlv::TLV_INTEREST) + tlv::varnum_size(value_len as u64);

        let mut out = BytesMut::with_capacity(outer_header_len + value_len);
        TlvElement::new(tlv::TLV_INTEREST, value.freeze()).encode(&mut out);

        // The signed portion is the Name TLV, relative to `out`: the
        // outer header precedes it directly since Name is always the
        // Interest's first child element.
        let signed_start = outer_header_len + name_start;
        let signed_end = outer_header_len + name_end;

        (out.freeze(), (signed_start, signed_end))
    }

    pub fn decode(bytes: &Bytes) -> Result<(Self, (usize, usize)), Error> {
        let mut buf = bytes.clone();
        let outer = TlvElement::decode(&mut buf)?;
        if outer.tlv_type != tlv::TLV_INTEREST {
            return Err(Error::NdnPacket(format!(
                "expected Interest TLV type {}, got {}",
                tlv::TLV_INTEREST,
                outer.tlv_type
            )));
        }
        let mut body = outer.value.clone();

        let name_element = TlvElement::decode(&mut body)?;
        let name = Name::from_tlv(&name_element)?;

        let mut interest = Interest::new(name);
        let mut saw_nonce = false;

        while body.has_remaining() {
            let element = TlvElement::decode(&mut body)?;
            match element.tlv_type {
                t if t == tlv::TLV_SELECTORS => {
                    let mut sbuf = element.value.clone();
                    while sbuf.has_remaining() {
                        let s = TlvElement::decode(&mut sbuf)?;
                        match s.tlv_type {
                            t if t == tlv::TLV_MIN_SUFFIX_COMPONENTS => {
                                interest.min_suffix_components =
                                    Some(tlv::decode_nonnegative_integer(&s.value)? as i64);
                            }
                            t if t == tlv::TLV_MAX_SUFFIX_COMPONENTS => {
                                interest.max_suffix_components =
                                    Some(tlv::decode_nonnegative_integer(&s.value)? as i64);
                            }
                            t if t == tlv::TLV_PUBLISHER_PUBLIC_KEY_LOCATOR => {
                                let mut inner = s.value.clone();
                                let kl_elem = TlvElement::decode(&mut inner)?;
                                interest.key_locator = Some(KeyLocator::from_tlv(&kl_elem)?);
                            }
                            t if t == tlv::TLV_EXCLUDE => {
                                interest.exclude = Exclude::from_tlv(&s)?;
                            }
                            t if t == tlv::TLV_CHILD_SELECTOR => {
                                interest.child_selector =
                                    Some(tlv::decode_nonnegative_integer(&s.value)? as i64);
                            }
                            t if t == tlv::TLV_MUST_BE_FRESH => {
                                interest.must_be_fresh = true;
                            }
                            _ => {}
                        }
                    }
                }
                t if t == tlv::TLV_NONCE => {
                    if element.value.len() != 4 {
                        return Err(Error::NdnPacket("Nonce must be exactly 4 bytes".into()));
                    }
                    let mut nonce = [0u8; 4];
                    nonce.copy_from_slice(&element.value);
                    interest.nonce = Some(nonce);
                    saw_nonce = true;
                }
                t if t == tlv::TLV_INTEREST_LIFETIME => {
                    interest.interest_lifetime_ms =
                        Some(tlv::decode_nonnegative_integer(&element.value)? as i64);
                }
                t if t == tlv::TLV_FORWARDING_HINT => {
                    let mut fbuf = element.value.clone();
                    while fbuf.has_remaining() {
                        let d = TlvElement::decode(&mut fbuf)?;
                        let mut dbuf = d.value.clone();
                        let preference = tlv::decode_varnum(&mut dbuf)?;
                        let name_elem = TlvElement::decode(&mut dbuf)?;
                        interest.forwarding_hint.push(Delegation {
                            preference,
                            name: Name::from_tlv(&name_elem)?,
                        });
                    }
                }
                t if t == tlv::TLV_SELECTED_DELEGATION => {
                    interest.selected_delegation =
                        Some(tlv::decode_nonnegative_integer(&element.value)?);
                }
                _ => {}
            }
        }

        if !saw_nonce {
            return Err(Error::NdnPacket("Interest missing required Nonce".into()));
        }

        let name_len = name_element.len();
        Ok((interest, (0, name_len)))
    }

    pub fn to_uri(&self) -> String {
        self.name.to_uri()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Component;

    #[test]
    fn roundtrips_with_selectors_and_lifetime() {
        let mut interest = Interest::new(Name::parse("/example/test").unwrap());
        interest.min_suffix_components = Some(1);
        interest.max_suffix_components = Some(3);
        interest.must_be_fresh = true;
        interest.interest_lifetime_ms = Some(4000);
        interest.nonce = Some([0x01, 0x02, 0x03, 0x04]);

        let (bytes, _) = interest.encode();
        let (decoded, _) = Interest::decode(&bytes).unwrap();

        assert_eq!(decoded.name, interest.name);
        assert_eq!(decoded.min_suffix_components, Some(1));
        assert_eq!(decoded.max_suffix_components, Some(3));
        assert!(decoded.must_be_fresh);
        assert_eq!(decoded.interest_lifetime_ms, Some(4000));
        assert_eq!(decoded.nonce, Some([0x01, 0x02, 0x03, 0x04]));
    }

    #[test]
    fn generates_nonce_on_first_encode() {
        let mut a = Interest::new(Name::parse("/x").unwrap());
        let mut b = Interest::new(Name::parse("/x").unwrap());
        let (_, _) = a.encode();
        let (_, _) = b.encode();
        // Overwhelmingly likely to differ; a collision would indicate a
        // broken RNG wiring, not bad luck.
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn exclude_roundtrips_through_selectors() {
        let mut interest = Interest::new(Name::parse("/p").unwrap());
        interest
            .exclude
            .push(crate::signature::ExcludeEntry::Component(Component::new(&b"q"[..])))
            .unwrap();
        let (bytes, _) = interest.encode();
        let (decoded, _) = Interest::decode(&bytes).unwrap();
        assert_eq!(decoded.exclude, interest.exclude);
    }
}
