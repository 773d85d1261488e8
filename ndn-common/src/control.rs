//! Forwarder registration commands: ControlParameters/ControlResponse
//! (spec §4.5 registerPrefix, §6, §9 open question).
//!
//! spec §9 calls for the additional RIB fields beyond Name and
//! ForwardingFlags to be "exposed as an options bag, not hard-coded" — this
//! is the supplemented field set from `original_source/`'s RIB-protocol
//! headers (face ID, origin, cost, expiration period), all optional.

use crate::error::Error;
use crate::name::Name;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, BytesMut};

pub const NFD_LOCAL_REGISTER_PREFIX: &str = "/localhost/nfd/rib/register";
pub const NFD_REMOTE_REGISTER_PREFIX: &str = "/localhop/nfd/rib/register";
pub const NFD_LOCAL_UNREGISTER_PREFIX: &str = "/localhost/nfd/rib/unregister";
pub const NFD_REMOTE_UNREGISTER_PREFIX: &str = "/localhop/nfd/rib/unregister";

pub const CONTROL_RESPONSE_SUCCESS: u64 = 200;

/// childInherit/capture flags carried in ControlParameters (spec §6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardingFlags {
    pub child_inherit: bool,
    pub capture: bool,
}

impl ForwardingFlags {
    fn to_bits(self) -> u64 {
        (self.child_inherit as u64) | ((self.capture as u64) << 1)
    }

    fn from_bits(bits: u64) -> Self {
        Self {
            child_inherit: bits & 0b01 != 0,
            capture: bits & 0b10 != 0,
        }
    }
}

/// The RIB-protocol options bag for `register`/`unregister` commands.
/// Name and ForwardingFlags are the fields spec.md requires; the rest are
/// the supplemented open bag (spec §9).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlParameters {
    pub name: Name,
    pub face_id: Option<u64>,
    pub origin: Option<u64>,
    pub cost: Option<u64>,
    pub flags: Option<ForwardingFlags>,
    pub strategy: Option<Name>,
    pub expiration_period_ms: Option<u64>,
}

impl ControlParameters {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn to_tlv(&self) -> TlvElement {
        let mut value = BytesMut::new();
        self.name.to_tlv().encode(&mut value);
        if let Some(id) = self.face_id {
            TlvElement::new(tlv::TLV_FACE_ID, tlv::encode_nonnegative_integer(id)).encode(&mut value);
        }
        if let Some(origin) = self.origin {
            TlvElement::new(tlv::TLV_ORIGIN, tlv::encode_nonnegative_integer(origin)).encode(&mut value);
        }
        if let Some(cost) = self.cost {
            TlvElement::new(tlv::TLV_COST, tlv::encode_nonnegative_integer(cost)).encode(&mut value);
        }
        if let Some(flags) = self.flags {
            TlvElement::new(tlv::TLV_FLAGS, tlv::encode_nonnegative_integer(flags.to_bits()))
                .encode(&mut value);
        }
        if let Some(strategy) = &self.strategy {
            let mut inner = BytesMut::new();
            strategy.to_tlv().encode(&mut inner);
            TlvElement::new(tlv::TLV_STRATEGY, inner.freeze()).encode(&mut value);
        }
        if let Some(expiration) = self.expiration_period_ms {
            TlvElement::new(tlv::TLV_EXPIRATION_PERIOD, tlv::encode_nonnegative_integer(expiration))
                .encode(&mut value);
        }
        TlvElement::new(tlv::TLV_CONTROL_PARAMETERS, value.freeze())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_CONTROL_PARAMETERS {
            return Err(Error::NdnPacket("expected ControlParameters TLV".into()));
        }
        let mut buf = element.value.clone();
        let name_element = TlvElement::decode(&mut buf)?;
        let mut params = ControlParameters::new(Name::from_tlv(&name_element)?);

        while buf.has_remaining() {
            let e = TlvElement::decode(&mut buf)?;
            match e.tlv_type {
                t if t == tlv::TLV_FACE_ID => params.face_id = Some(tlv::decode_nonnegative_integer(&e.value)?),
                t if t == tlv::TLV_ORIGIN => params.origin = Some(tlv::decode_nonnegative_integer(&e.value)?),
                t if t == tlv::TLV_COST => params.cost = Some(tlv::decode_nonnegative_integer(&e.value)?),
                t if t == tlv::TLV_FLAGS => {
                    params.flags = Some(ForwardingFlags::from_bits(tlv::decode_nonnegative_integer(&e.value)?));
                }
                t if t == tlv::TLV_STRATEGY => {
                    let mut inner = e.value.clone();
                    let name_elem = TlvElement::decode(&mut inner)?;
                    params.strategy = Some(Name::from_tlv(&name_elem)?);
                }
                t if t == tlv::TLV_EXPIRATION_PERIOD => {
                    params.expiration_period_ms = Some(tlv::decode_nonnegative_integer(&e.value)?);
                }
                _ => {}
            }
        }
        Ok(params)
    }
}

/// The forwarder's reply to a registration command: a status code plus
/// message (spec §6: "200 is success").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlResponse {
    pub status_code: u64,
    pub status_text: String,
    pub body: Option<ControlParameters>,
}

impl ControlResponse {
    pub fn is_success(&self) -> bool {
        self.status_code == CONTROL_RESPONSE_SUCCESS
    }

    pub fn to_tlv(&self) -> TlvElement {
        let mut value = BytesMut::new();
        TlvElement::new(tlv::TLV_STATUS_CODE, tlv::encode_nonnegative_integer(self.status_code))
            .encode(&mut value);
        TlvElement::new(tlv::TLV_STATUS_TEXT, self.status_text.as_bytes().to_vec()).encode(&mut value);
        if let Some(body) = &self.body {
            body.to_tlv().encode(&mut value);
        }
        TlvElement::new(tlv::TLV_CONTROL_RESPONSE, value.freeze())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_CONTROL_RESPONSE {
            return Err(Error::NdnPacket("expected ControlResponse TLV".into()));
        }
        let mut buf = element.value.clone();
        let code_element = TlvElement::decode(&mut buf)?;
        let status_code = tlv::decode_nonnegative_integer(&code_element.value)?;
        let text_element = TlvElement::decode(&mut buf)?;
        let status_text = String::from_utf8_lossy(&text_element.value).into_owned();
        let body = if buf.has_remaining() {
            Some(ControlParameters::from_tlv(&TlvElement::decode(&mut buf)?)?)
        } else {
            None
        };
        Ok(Self {
            status_code,
            status_text,
            body,
        })
    }
}

/// Picks the registration command prefix for a transport's locality
/// (spec §6).
pub fn registration_prefix(is_local: bool) -> &'static str {
    if is_local {
        NFD_LOCAL_REGISTER_PREFIX
    } else {
        NFD_REMOTE_REGISTER_PREFIX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_parameters_roundtrip_all_fields() {
        let mut params = ControlParameters::new(Name::parse("/svc").unwrap());
        params.face_id = Some(7);
        params.origin = Some(0);
        params.cost = Some(10);
        params.flags = Some(ForwardingFlags {
            child_inherit: true,
            capture: false,
        });
        params.expiration_period_ms = Some(60_000);

        let tlv = params.to_tlv();
        let decoded = ControlParameters::from_tlv(&tlv).unwrap();
        assert_eq!(decoded, params);
    }

    #[test]
    fn control_response_reports_success() {
        let response = ControlResponse {
            status_code: 200,
            status_text: "Success".into(),
            body: None,
        };
        let decoded = ControlResponse::from_tlv(&response.to_tlv()).unwrap();
        assert!(decoded.is_success());
    }

    #[test]
    fn registration_prefix_depends_on_locality() {
        assert_eq!(registration_prefix(true), NFD_LOCAL_REGISTER_PREFIX);
        assert_eq!(registration_prefix(false), NFD_REMOTE_REGISTER_PREFIX);
    }
}
