//! The NDN Name and Component value model (spec §3, §4.1).
//!
//! Components carry canonical ordering (length first, then lexicographic)
//! and the URI escape rules used by `Name::to_uri`/`Name::parse`. A Name is
//! an immutable, structurally-equal sequence of Components; any mutating
//! operation returns a new value and bumps the owning side's change count
//! rather than mutating shared state (spec §9, "Shared mutable state").

use crate::error::Error;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, Bytes, BytesMut};
use percent_encoding::{percent_decode_str, AsciiSet, CONTROLS};
use std::cmp::Ordering;
use std::fmt;

/// The marker byte that precedes the big-endian integer in every typed
/// component (segment, version, timestamp, sequence number). Per spec
/// §4.1 this is a single shared marker, not a distinct one per kind.
pub const TYPED_COMPONENT_MARKER: u8 = 0x00;

/// Characters left unescaped by `Component::to_uri` (ALPHA, DIGIT, `-`,
/// `.`, `_`, `~`). Everything else is percent-encoded.
const UNRESERVED: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// The typed role a Component plays, if any. Generic components carry no
/// role. This does not change the wire TLV-VALUE, only (for the digest
/// kinds) the TLV-TYPE used to encode it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Generic,
    ImplicitSha256Digest,
    ParametersSha256Digest,
}

/// An immutable NDN name component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    bytes: Bytes,
    kind: ComponentKind,
}

impl Component {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            kind: ComponentKind::Generic,
        }
    }

    pub fn from_implicit_digest(digest: [u8; 32]) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(&digest),
            kind: ComponentKind::ImplicitSha256Digest,
        }
    }

    pub fn from_parameters_digest(digest: [u8; 32]) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(&digest),
            kind: ComponentKind::ParametersSha256Digest,
        }
    }

    /// Encodes a non-negative integer as the minimum-width big-endian byte
    /// string (spec §4.1: "encode 0 as a single zero byte").
    pub fn from_number(value: u64) -> Self {
        Self::new(tlv::encode_nonnegative_integer(value))
    }

    fn from_marked_number(value: u64) -> Self {
        let mut buf = BytesMut::with_capacity(9);
        buf.extend_from_slice(&[TYPED_COMPONENT_MARKER]);
        buf.extend_from_slice(&tlv::encode_nonnegative_integer(value));
        Self::new(buf.freeze())
    }

    pub fn from_segment(segment: u64) -> Self {
        Self::from_marked_number(segment)
    }

    pub fn from_version(version: u64) -> Self {
        Self::from_marked_number(version)
    }

    pub fn from_timestamp_micros(timestamp_us: u64) -> Self {
        Self::from_marked_number(timestamp_us)
    }

    pub fn from_sequence_number(seq: u64) -> Self {
        Self::from_marked_number(seq)
    }

    pub fn from_byte_offset(offset: u64) -> Self {
        Self::from_marked_number(offset)
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn is_generic(&self) -> bool {
        self.kind == ComponentKind::Generic
    }

    pub fn is_implicit_sha256_digest(&self) -> bool {
        self.kind == ComponentKind::ImplicitSha256Digest
    }

    pub fn is_parameters_sha256_digest(&self) -> bool {
        self.kind == ComponentKind::ParametersSha256Digest
    }

    /// True if the component is a marked typed component (segment,
    /// version, timestamp, sequence number, or byte offset). Per spec
    /// §4.1 all of these share one marker byte, so the specific kind
    /// cannot be recovered from the bytes alone — only that it's one of
    /// them.
    pub fn is_typed_number(&self) -> bool {
        self.kind == ComponentKind::Generic
            && self.bytes.first() == Some(&TYPED_COMPONENT_MARKER)
            && self.bytes.len() > 1
    }

    /// Decodes the big-endian integer following the marker byte, if this
    /// component looks like a marked typed component.
    pub fn as_typed_number(&self) -> Option<u64> {
        if !self.is_typed_number() {
            return None;
        }
        tlv::decode_nonnegative_integer(&self.bytes[1..]).ok()
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// URI escaping per spec §4.1: an all-`.` component is prefixed with
    /// three more dots; otherwise bytes outside the unreserved set are
    /// percent-encoded.
    pub fn to_uri(&self) -> String {
        let prefix = match self.kind {
            ComponentKind::Generic => "",
            ComponentKind::ImplicitSha256Digest => "sha256digest=",
            ComponentKind::ParametersSha256Digest => "params-sha256=",
        };

        if matches!(self.kind, ComponentKind::ImplicitSha256Digest | ComponentKind::ParametersSha256Digest) {
            let mut hex = String::with_capacity(prefix.len() + self.bytes.len() * 2);
            hex.push_str(prefix);
            for b in &self.bytes {
                hex.push_str(&format!("{:02x}", b));
            }
            return hex;
        }

        if !self.bytes.is_empty() && self.bytes.iter().all(|&b| b == b'.') {
            let mut escaped = String::from("...");
            escaped.push_str(std::str::from_utf8(&self.bytes).unwrap());
            return escaped;
        }

        percent_encoding::percent_encode(&self.bytes, UNRESERVED).to_string()
    }

    /// Parses a single URI-escaped path segment back into a Component.
    pub fn parse_uri(segment: &str) -> Result<Self, Error> {
        if let Some(hex) = segment.strip_prefix("sha256digest=") {
            return Ok(Self::from_implicit_digest(parse_digest_hex(hex)?));
        }
        if let Some(hex) = segment.strip_prefix("params-sha256=") {
            return Ok(Self::from_parameters_digest(parse_digest_hex(hex)?));
        }

        if segment.chars().all(|c| c == '.') && segment.len() >= 3 {
            let unescaped = &segment[3..];
            return Ok(Self::new(unescaped.as_bytes().to_vec()));
        }

        let decoded = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|e| Error::Name(format!("invalid percent-encoding: {e}")))?;
        Ok(Self::new(decoded.as_bytes().to_vec()))
    }

    pub fn to_tlv(&self) -> TlvElement {
        let tlv_type = match self.kind {
            ComponentKind::Generic => tlv::TLV_COMPONENT_GENERIC,
            ComponentKind::ImplicitSha256Digest => tlv::TLV_COMPONENT_IMPLICIT_SHA256_DIGEST,
            ComponentKind::ParametersSha256Digest => tlv::TLV_COMPONENT_PARAMETERS_SHA256_DIGEST,
        };
        TlvElement::new(tlv_type, self.bytes.clone())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        let kind = match element.tlv_type {
            t if t == tlv::TLV_COMPONENT_GENERIC => ComponentKind::Generic,
            t if t == tlv::TLV_COMPONENT_IMPLICIT_SHA256_DIGEST => ComponentKind::ImplicitSha256Digest,
            t if t == tlv::TLV_COMPONENT_PARAMETERS_SHA256_DIGEST => ComponentKind::ParametersSha256Digest,
            other => {
                return Err(Error::NdnPacket(format!(
                    "unrecognized name component TLV type {other}"
                )))
            }
        };
        if matches!(kind, ComponentKind::ImplicitSha256Digest | ComponentKind::ParametersSha256Digest)
            && element.value.len() != 32
        {
            return Err(Error::NdnPacket(
                "digest component must be exactly 32 bytes".into(),
            ));
        }
        Ok(Self {
            bytes: element.value.clone(),
            kind,
        })
    }
}

fn parse_digest_hex(hex: &str) -> Result<[u8; 32], Error> {
    let bytes = hex::decode(hex).map_err(|e| Error::Name(format!("invalid digest hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| Error::Name("digest must be exactly 32 bytes".into()))
}

/// Canonical NDN component order: shorter components sort first; ties
/// break by byte-lexicographic comparison.
impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes
            .len()
            .cmp(&other.bytes.len())
            .then_with(|| self.bytes.cmp(&other.bytes))
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

/// An ordered sequence of [`Component`]s. Names are immutable value types;
/// `append`/`get_prefix`/etc return a new `Name` rather than mutating in
/// place, per spec §9's change-count redesign note — the "change count"
/// collapses to "construct a new value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    pub fn from_components(components: Vec<Component>) -> Self {
        Self { components }
    }

    /// Parses a URI of the form `/a/b/c` (or a bare `a/b/c`). An empty
    /// name parses from `/` or the empty string.
    pub fn parse(uri: &str) -> Result<Self, Error> {
        let trimmed = uri.strip_prefix('/').unwrap_or(uri);
        if trimmed.is_empty() {
            return Ok(Self::new());
        }
        let components = trimmed
            .split('/')
            .map(Component::parse_uri)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }

    pub fn append(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn append_bytes(self, bytes: impl Into<Bytes>) -> Self {
        self.append(Component::new(bytes))
    }

    pub fn append_uri_segment(self, segment: &str) -> Result<Self, Error> {
        Ok(self.append(Component::parse_uri(segment)?))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Gets the component at `index`; negative indices count from the end
    /// (`-1` is the last component).
    pub fn get(&self, index: i64) -> Option<&Component> {
        let resolved = self.resolve_index(index)?;
        self.components.get(resolved)
    }

    fn resolve_index(&self, index: i64) -> Option<usize> {
        if index >= 0 {
            let i = index as usize;
            (i < self.components.len()).then_some(i)
        } else {
            let from_end = (-index) as usize;
            (from_end <= self.components.len()).then(|| self.components.len() - from_end)
        }
    }

    /// The first `n` components if `n >= 0`, or all but the last `-n` if
    /// `n < 0`.
    pub fn get_prefix(&self, n: i64) -> Self {
        let take = if n >= 0 {
            (n as usize).min(self.components.len())
        } else {
            self.components.len().saturating_sub((-n) as usize)
        };
        Self {
            components: self.components[..take].to_vec(),
        }
    }

    /// A sub-name of `count` components starting at `start` (negative
    /// indices count from the end, as in `get`).
    pub fn get_sub_name(&self, start: i64, count: usize) -> Self {
        let Some(start) = self.resolve_index(start) else {
            return Self::new();
        };
        let end = (start + count).min(self.components.len());
        Self {
            components: self.components[start..end].to_vec(),
        }
    }

    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    /// Equals or is-a-prefix-of `other` (spec §4.1 `match`).
    pub fn matches(&self, other: &Self) -> bool {
        self.is_prefix_of(other)
    }

    /// Total order over Names consistent with Component ordering: compare
    /// components pairwise, and a strict prefix sorts before its
    /// extension.
    pub fn compare(&self, other: &Self) -> Ordering {
        for (a, b) in self.components.iter().zip(other.components.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.components.len().cmp(&other.components.len())
    }

    pub fn to_uri(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for component in &self.components {
            out.push('/');
            out.push_str(&component.to_uri());
        }
        out
    }

    pub fn to_tlv(&self) -> TlvElement {
        let mut buf = BytesMut::new();
        for component in &self.components {
            component.to_tlv().encode(&mut buf);
        }
        TlvElement::new(tlv::TLV_NAME, buf.freeze())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_NAME {
            return Err(Error::NdnPacket(format!(
                "expected Name TLV type {}, got {}",
                tlv::TLV_NAME,
                element.tlv_type
            )));
        }
        let mut components = Vec::new();
        let mut buf = element.value.clone();
        while buf.has_remaining() {
            let e = TlvElement::decode(&mut buf)?;
            components.push(Component::from_tlv(&e)?);
        }
        Ok(Self { components })
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_percent_escapes() {
        let name = Name::parse("/a/b/%00%01").unwrap();
        assert_eq!(name.len(), 3);
        assert_eq!(name.get(0).unwrap().as_bytes().as_ref(), b"a");
        assert_eq!(name.get(1).unwrap().as_bytes().as_ref(), b"b");
        assert_eq!(name.get(2).unwrap().as_bytes().as_ref(), &[0x00, 0x01]);
        assert_eq!(name.to_uri(), "/a/b/%00%01");
    }

    #[test]
    fn component_order_is_length_then_lexicographic() {
        let short = Component::new(&b"zz"[..]);
        let long = Component::new(&b"a"[..]);
        // "a" (1 byte) sorts before "zz" (2 bytes) regardless of lexicographic order.
        assert!(long < short);

        let a = Component::new(&b"aa"[..]);
        let b = Component::new(&b"ab"[..]);
        assert!(a < b);
    }

    #[test]
    fn get_prefix_is_always_a_prefix() {
        let name = Name::parse("/a/b/c/d").unwrap();
        for k in 0..=name.len() {
            assert!(name.get_prefix(k as i64).is_prefix_of(&name));
        }
    }

    #[test]
    fn uri_roundtrip_for_arbitrary_components() {
        for bytes in [&b""[..], b"hello", b"\x00\x01\xff", b"..", b"..."] {
            let c = Component::new(bytes.to_vec());
            let uri = c.to_uri();
            let parsed = Component::parse_uri(&uri).unwrap();
            assert_eq!(c, parsed);
        }
    }

    #[test]
    fn negative_index_counts_from_end() {
        let name = Name::parse("/a/b/c").unwrap();
        assert_eq!(name.get(-1).unwrap().as_bytes().as_ref(), b"c");
        assert_eq!(name.get_prefix(-1), Name::parse("/a/b").unwrap());
    }

    #[test]
    fn compare_is_a_total_order() {
        let a = Name::parse("/a/b").unwrap();
        let b = Name::parse("/a/c").unwrap();
        assert!(a.compare(&b).is_lt());
        assert!(b.compare(&a).is_gt());
        assert!(a.compare(&a).is_eq());
    }

    #[test]
    fn empty_name_renders_as_root() {
        assert_eq!(Name::new().to_uri(), "/");
        assert_eq!(Name::parse("/").unwrap(), Name::new());
    }
}
