//! RSA PKCS#1 v1.5 signatures over SHA-256 message digests
//!
//! A thin layer over the `rsa` crate: the message is hashed with the same
//! digest the miner uses, and the digest is signed with the SHA-256
//! DigestInfo prefix. The scheme is deterministic, so a given key and
//! message always yield the same signature.

use std::fmt;

use rsa::traits::PublicKeyParts;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};

use crate::error::KeyError;
use crate::params::{DIGEST_SIZE, MAX_KEY_BITS, MIN_KEY_BITS};

pub use rsa::{BigUint, RsaPrivateKey as PrivateKey, RsaPublicKey as PublicKey};

/// Raw signature bytes, as long as the signing key's modulus.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(hex_str.trim()).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An RSA key pair held by the caller for a signing session.
#[derive(Clone)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair with a `bits`-bit modulus.
    pub fn generate(bits: usize) -> Result<Self, KeyError> {
        check_key_bits(bits)?;

        let mut rng = rand::thread_rng();
        let private =
            PrivateKey::new(&mut rng, bits).map_err(|e| KeyError::Generation(e.to_string()))?;

        tracing::info!(bits, "generated RSA key pair");
        Ok(Self::from_private_key(private))
    }

    /// Rebuild a key pair from its raw components.
    ///
    /// Components that do not form a consistent RSA key fail with
    /// [`KeyError::Malformed`].
    pub fn from_components(
        n: BigUint,
        e: BigUint,
        d: BigUint,
        primes: Vec<BigUint>,
    ) -> Result<Self, KeyError> {
        let private = PrivateKey::from_components(n, e, d, primes)
            .map_err(|e| KeyError::Malformed(e.to_string()))?;
        check_key_bits(key_bits(&private))?;

        Ok(Self::from_private_key(private))
    }

    pub fn from_private_key(private: PrivateKey) -> Self {
        let public = private.to_public_key();
        Self { private, public }
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        key_bits(&self.public)
    }

    pub fn sign(&self, message: &str) -> Result<Signature, KeyError> {
        sign(message, &self.private)
    }

    pub fn verify(&self, message: &str, signature: &Signature) -> bool {
        verify(message, &self.public, signature)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

fn key_bits(key: &impl PublicKeyParts) -> usize {
    key.size() * 8
}

fn check_key_bits(bits: usize) -> Result<(), KeyError> {
    if (MIN_KEY_BITS..=MAX_KEY_BITS).contains(&bits) {
        Ok(())
    } else {
        Err(KeyError::UnsupportedSize { bits })
    }
}

/// SHA-256 of the UTF-8 bytes of `message`; the value that gets signed.
pub fn message_digest(message: &str) -> [u8; DIGEST_SIZE] {
    Sha256::digest(message.as_bytes()).into()
}

/// Sign `message` with PKCS#1 v1.5 over its SHA-256 digest.
pub fn sign(message: &str, key: &PrivateKey) -> Result<Signature, KeyError> {
    check_key_bits(key_bits(key))?;
    key.validate()
        .map_err(|e| KeyError::Malformed(e.to_string()))?;

    let digest = message_digest(message);
    let bytes = key
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| KeyError::Signing(e.to_string()))?;

    Ok(Signature(bytes))
}

/// Check `signature` against `message` under `key`.
///
/// Any mismatch (altered message, wrong key, corrupted or wrongly sized
/// signature) yields `false`.
pub fn verify(message: &str, key: &PublicKey, signature: &Signature) -> bool {
    let digest = message_digest(message);

    match key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature.as_bytes()) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "signature rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_hex_roundtrip() {
        let signature = Signature::from_bytes(vec![0x00, 0xAB, 0xFF]);
        assert_eq!(signature.to_hex(), "00abff");
        assert_eq!(Signature::from_hex("00abff\n").unwrap(), signature);
        assert!(Signature::from_hex("zz").is_err());
    }

    #[test]
    fn test_key_bits_range() {
        assert!(check_key_bits(MIN_KEY_BITS).is_ok());
        assert!(check_key_bits(2048).is_ok());
        assert!(check_key_bits(MAX_KEY_BITS).is_ok());
        assert_eq!(
            check_key_bits(512),
            Err(KeyError::UnsupportedSize { bits: 512 })
        );
        assert_eq!(
            check_key_bits(8192),
            Err(KeyError::UnsupportedSize { bits: 8192 })
        );
    }

    #[test]
    fn test_generate_rejects_unsupported_size() {
        assert_eq!(
            KeyPair::generate(256).unwrap_err(),
            KeyError::UnsupportedSize { bits: 256 }
        );
    }

    #[test]
    fn test_message_digest_matches_miner_digest() {
        let message = "Alice42";
        assert_eq!(
            hex::encode(message_digest(message)),
            crate::digest_hex(message)
        );
    }
}
