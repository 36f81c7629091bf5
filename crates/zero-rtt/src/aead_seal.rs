//! Encryption-at-rest for persisted tickets, behind an abstract AEAD
//! seam.
//!
//! This crate never implements a novel AEAD construction; it injects one
//! of the two standard constructions the workspace already depends on
//! (AES-256-GCM, ChaCha20-Poly1305) behind [`AeadSeal`], keeping
//! cryptography primitives behind an interface rather than designed here.

use aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;

use crate::error::Error;

/// A symmetric seal/open primitive with associated data, used to encrypt
/// ticket-store contents at rest.
pub trait AeadSeal: Send + Sync {
    /// Encrypt `plaintext` bound to `associated_data`, returning a nonce
    /// prepended to the ciphertext.
    fn seal(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, Error>;

    /// Decrypt a `seal`-produced buffer, verifying `associated_data`.
    fn open(&self, sealed: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, Error>;
}

const NONCE_LEN: usize = 12;

/// AES-256-GCM backed seal.
pub struct AesGcmSeal {
    cipher: Aes256Gcm,
}

impl AesGcmSeal {
    /// Build a seal from a 32-byte key.
    #[must_use]
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }
}

impl AeadSeal for AesGcmSeal {
    fn seal(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, Error> {
        seal_with(&self.cipher, plaintext, associated_data)
    }

    fn open(&self, sealed: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, Error> {
        open_with(&self.cipher, sealed, associated_data)
    }
}

/// ChaCha20-Poly1305 backed seal; an alternative cipher suite to
/// [`AesGcmSeal`] for platforms where AES-NI is unavailable.
pub struct ChaChaSeal {
    cipher: ChaCha20Poly1305,
}

impl ChaChaSeal {
    /// Build a seal from a 32-byte key.
    #[must_use]
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(key.into()),
        }
    }
}

impl AeadSeal for ChaChaSeal {
    fn seal(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, Error> {
        seal_with(&self.cipher, plaintext, associated_data)
    }

    fn open(&self, sealed: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, Error> {
        open_with(&self.cipher, sealed, associated_data)
    }
}

fn seal_with<C>(cipher: &C, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, Error>
where
    C: Aead,
{
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::fill(&mut nonce_bytes);
    let nonce = aead::Nonce::<C>::from_slice(&nonce_bytes);
    let payload = aead::Payload {
        msg: plaintext,
        aad: associated_data,
    };
    let ciphertext = cipher.encrypt(nonce, payload).map_err(|_| Error::DecryptionFailed)?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn open_with<C>(cipher: &C, sealed: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, Error>
where
    C: Aead,
{
    if sealed.len() < NONCE_LEN {
        return Err(Error::DecryptionFailed);
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = aead::Nonce::<C>::from_slice(nonce_bytes);
    let payload = aead::Payload {
        msg: ciphertext,
        aad: associated_data,
    };
    cipher.decrypt(nonce, payload).map_err(|_| Error::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_gcm_round_trip() {
        let seal = AesGcmSeal::new(&[7u8; 32]);
        let ct = seal.seal(b"ticket bytes", b"origin:example.com:443").unwrap();
        let pt = seal.open(&ct, b"origin:example.com:443").unwrap();
        assert_eq!(pt, b"ticket bytes");
    }

    #[test]
    fn aes_gcm_rejects_wrong_associated_data() {
        let seal = AesGcmSeal::new(&[7u8; 32]);
        let ct = seal.seal(b"ticket bytes", b"origin:a").unwrap();
        assert!(seal.open(&ct, b"origin:b").is_err());
    }

    #[test]
    fn chacha_round_trip() {
        let seal = ChaChaSeal::new(&[3u8; 32]);
        let ct = seal.seal(b"another ticket", b"aad").unwrap();
        let pt = seal.open(&ct, b"aad").unwrap();
        assert_eq!(pt, b"another ticket");
    }
}
