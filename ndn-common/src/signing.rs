//! Signing façade (spec §4.7): the narrow interface the Face uses to sign
//! outgoing Data/command-Interests and to verify incoming Data. The
//! identity/key store behind the façade is explicitly out of scope; this
//! module's `InMemorySigner` is a default, in-process implementation
//! suitable for testing and the CLI, not a PIB/TPM replacement.

use crate::data::Data;
use crate::error::Error;
use crate::interest::Interest;
use crate::name::Name;
use crate::signature::{KeyLocator, Signature};
use bytes::Bytes;
use ecdsa::signature::{Signer as EcdsaSigner, Verifier as EcdsaVerifier};
use hmac::{Hmac, Mac};
use p256::ecdsa::{Signature as P256Signature, SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use rsa::pkcs1v15::{Signature as RsaSignature, SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey};
use rsa::signature::{Signer as RsaSignerTrait, Verifier as RsaVerifierTrait};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Selects which key (by the façade's own convention) an outgoing sign
/// operation uses (spec §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningInfo {
    DefaultIdentity,
    IdentityName(Name),
    KeyName(Name),
    CertificateName(Name),
    /// DigestSha256: no key, just a digest over the signed portion.
    Sha256,
}

/// Key material the façade's default implementation can sign with.
pub enum KeyMaterial {
    Rsa(RsaPrivateKey),
    Ecdsa(P256SigningKey),
    Hmac(Vec<u8>),
}

/// The interface the Face consumes (spec §4.7, §6 "Signing interface").
pub trait SigningFacade {
    /// Signs `data` in place: sets its SignatureInfo and SignatureValue.
    fn sign_data(&self, data: &mut Data, info: &SigningInfo) -> Result<(), Error>;

    /// Signs a command Interest by appending two name components
    /// (SignatureInfo encoding, then SignatureValue) and returns the
    /// resulting Interest.
    fn sign_interest(&self, interest: Interest, info: &SigningInfo) -> Result<Interest, Error>;

    /// Verifies `data`'s signature against the given raw public key bytes.
    fn verify_data(&self, data: &Data, public_key_bytes: &[u8]) -> Result<bool, Error>;
}

type HmacSha256 = Hmac<Sha256>;

/// A default, non-persistent signing façade: keys live in process memory,
/// keyed by the Name the caller associates with them via
/// [`InMemorySigner::insert_key`]. Resolving `SigningInfo::DefaultIdentity`
/// uses whichever key was inserted as the default.
#[derive(Default)]
pub struct InMemorySigner {
    keys: HashMap<Name, KeyMaterial>,
    default_identity: Option<Name>,
}

impl InMemorySigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_key(&mut self, name: Name, key: KeyMaterial) {
        if self.default_identity.is_none() {
            self.default_identity = Some(name.clone());
        }
        self.keys.insert(name, key);
    }

    fn resolve<'a>(&'a self, info: &'a SigningInfo) -> Result<Option<(&'a Name, &'a KeyMaterial)>, Error> {
        let name = match info {
            SigningInfo::Sha256 => return Ok(None),
            SigningInfo::DefaultIdentity => self
                .default_identity
                .as_ref()
                .ok_or_else(|| Error::Signing("no default identity configured".into()))?,
            SigningInfo::IdentityName(n) | SigningInfo::KeyName(n) | SigningInfo::CertificateName(n) => n,
        };
        let key = self
            .keys
            .get(name)
            .ok_or_else(|| Error::Signing(format!("no key material for {name}")))?;
        Ok(Some((name, key)))
    }
}

impl SigningFacade for InMemorySigner {
    fn sign_data(&self, data: &mut Data, info: &SigningInfo) -> Result<(), Error> {
        let resolved = self.resolve(info)?;

        data.signature = match &resolved {
            None => Signature::DigestSha256 { value: None },
            Some((name, KeyMaterial::Rsa(_))) => Signature::Sha256WithRsa {
                key_locator: KeyLocator::KeyName((*name).clone()),
                validity: None,
                value: None,
            },
            Some((name, KeyMaterial::Ecdsa(_))) => Signature::Sha256WithEcdsa {
                key_locator: KeyLocator::KeyName((*name).clone()),
                validity: None,
                value: None,
            },
            Some((name, KeyMaterial::Hmac(_))) => Signature::HmacWithSha256 {
                key_locator: KeyLocator::KeyName((*name).clone()),
                value: None,
            },
        };

        let (bytes, (start, end)) = data.encode();
        let signed_portion = &bytes[start..end];
        let signature_bits = self.sign_bytes(signed_portion, resolved.map(|(_, k)| k))?;
        data.signature.set_signature_bits(signature_bits);
        Ok(())
    }

    fn sign_interest(&self, mut interest: Interest, info: &SigningInfo) -> Result<Interest, Error> {
        let resolved = self.resolve(info)?;
        let mut signature = match &resolved {
            None => Signature::DigestSha256 { value: None },
            Some((name, KeyMaterial::Rsa(_))) => Signature::Sha256WithRsa {
                key_locator: KeyLocator::KeyName((*name).clone()),
                validity: None,
                value: None,
            },
            Some((name, KeyMaterial::Ecdsa(_))) => Signature::Sha256WithEcdsa {
                key_locator: KeyLocator::KeyName((*name).clone()),
                validity: None,
                value: None,
            },
            Some((name, KeyMaterial::Hmac(_))) => Signature::HmacWithSha256 {
                key_locator: KeyLocator::KeyName((*name).clone()),
                value: None,
            },
        };

        // The signed portion for a command Interest is its Name; compute
        // the digest/signature over the Name's TLV bytes directly, then
        // append SignatureInfo and SignatureValue as two more components.
        let mut name_bytes = bytes::BytesMut::new();
        interest.name.to_tlv().encode(&mut name_bytes);

        let signature_bits = self.sign_bytes(&name_bytes, resolved.map(|(_, k)| k))?;
        signature.set_signature_bits(signature_bits);

        let mut info_bytes = bytes::BytesMut::new();
        signature.signature_info_to_tlv().encode(&mut info_bytes);
        let mut value_bytes = bytes::BytesMut::new();
        signature.signature_value_to_tlv().encode(&mut value_bytes);

        interest.name = interest
            .name
            .append_bytes(info_bytes.freeze())
            .append_bytes(value_bytes.freeze());

        Ok(interest)
    }

    fn verify_data(&self, data: &Data, public_key_bytes: &[u8]) -> Result<bool, Error> {
        let (bytes, (start, end)) = data.encode();
        let signed_portion = &bytes[start..end];
        let Some(signature_bits) = data.signature.signature_bits() else {
            return Ok(false);
        };

        Ok(match &data.signature {
            Signature::DigestSha256 { .. } => {
                let digest: [u8; 32] = Sha256::digest(signed_portion).into();
                digest.as_slice() == signature_bits.as_ref()
            }
            Signature::Sha256WithRsa { .. } => {
                use rsa::pkcs1::DecodeRsaPublicKey;
                let public_key = RsaPublicKey::from_pkcs1_der(public_key_bytes)
                    .map_err(|e| Error::Signing(format!("invalid RSA public key: {e}")))?;
                let verifying_key = RsaVerifyingKey::<Sha256>::new(public_key);
                let signature = RsaSignature::try_from(signature_bits.as_ref())
                    .map_err(|e| Error::Signing(format!("malformed RSA signature: {e}")))?;
                verifying_key.verify(signed_portion, &signature).is_ok()
            }
            Signature::Sha256WithEcdsa { .. } => {
                let verifying_key = P256VerifyingKey::from_sec1_bytes(public_key_bytes)
                    .map_err(|e| Error::Signing(format!("invalid EC public key: {e}")))?;
                let signature = P256Signature::try_from(signature_bits.as_ref())
                    .map_err(|e| Error::Signing(format!("malformed ECDSA signature: {e}")))?;
                verifying_key.verify(signed_portion, &signature).is_ok()
            }
            Signature::HmacWithSha256 { .. } => {
                let mut mac = HmacSha256::new_from_slice(public_key_bytes)
                    .map_err(|e| Error::Signing(format!("invalid HMAC key: {e}")))?;
                mac.update(signed_portion);
                mac.verify_slice(signature_bits).is_ok()
            }
            Signature::Generic { .. } => false,
        })
    }
}

impl InMemorySigner {
    fn sign_bytes(&self, bytes: &[u8], key: Option<&KeyMaterial>) -> Result<Bytes, Error> {
        match key {
            None => Ok(Bytes::copy_from_slice(Sha256::digest(bytes).as_slice())),
            Some(KeyMaterial::Rsa(private_key)) => {
                let signing_key = RsaSigningKey::<Sha256>::new(private_key.clone());
                let signature = signing_key.sign(bytes);
                Ok(Bytes::copy_from_slice(rsa::signature::SignatureEncoding::to_bytes(&signature).as_ref()))
            }
            Some(KeyMaterial::Ecdsa(signing_key)) => {
                let signature: P256Signature = signing_key.sign(bytes);
                Ok(Bytes::copy_from_slice(
                    ecdsa::signature::SignatureEncoding::to_bytes(&signature).as_ref(),
                ))
            }
            Some(KeyMaterial::Hmac(key)) => {
                let mut mac = HmacSha256::new_from_slice(key)
                    .map_err(|e| Error::Signing(format!("invalid HMAC key: {e}")))?;
                mac.update(bytes);
                Ok(Bytes::copy_from_slice(&mac.finalize().into_bytes()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;
    use rand::thread_rng;
    use rsa::pkcs1::EncodeRsaPublicKey;

    #[test]
    fn digest_sha256_sign_and_verify() {
        let signer = InMemorySigner::new();
        let mut data = Data::new(Name::parse("/a").unwrap());
        data.content = Bytes::from_static(&[0x68, 0x69]);
        signer.sign_data(&mut data, &SigningInfo::Sha256).unwrap();

        assert!(signer.verify_data(&data, &[]).unwrap());
    }

    #[test]
    fn rsa_sign_and_verify_detects_tampering() {
        let mut rng = thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = private_key.to_public_key();
        let public_key_der = public_key.to_pkcs1_der().unwrap().to_vec();

        let mut signer = InMemorySigner::new();
        let key_name = Name::parse("/key/test").unwrap();
        signer.insert_key(key_name.clone(), KeyMaterial::Rsa(private_key));

        let mut data = Data::new(Name::parse("/a").unwrap());
        data.content = Bytes::from_static(&[0x68, 0x69]);
        data.meta_info.freshness_period_ms = Some(1000);
        signer
            .sign_data(&mut data, &SigningInfo::KeyName(key_name))
            .unwrap();

        assert!(signer.verify_data(&data, &public_key_der).unwrap());

        let mut tampered = data.clone();
        let mut bits = tampered.signature.signature_bits().unwrap().to_vec();
        bits[0] ^= 0xFF;
        tampered.signature.set_signature_bits(Bytes::from(bits));
        assert!(!signer.verify_data(&tampered, &public_key_der).unwrap());
    }
}
