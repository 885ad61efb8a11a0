//! ECIES ballot sealing envelope (§4.4, §6): ephemeral X25519 key agreement,
//! HKDF-SHA256 key derivation and AES-256-GCM authenticated encryption.
//!
//! `voting-core` never calls [`seal`] in the production cast path — sealing
//! happens on the voter's device (BallotSealer, a client-side contract per
//! §4). It lives here because the server needs the identical algorithm to
//! exercise the cast path in tests and because `voting-crypto` is the
//! crate that owns every primitive in §6's "Cryptographic parameters"
//! table.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use voting_types::error::CryptoError;

use x25519_dalek::{PublicKey, StaticSecret};

/// `info` string bound in §6's cryptographic parameters table.
const HKDF_INFO: &[u8] = b"ecies-encryption-key";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// The ECIES wire layout of §6, base64-encoded, key-sorted by
/// `voting_types::canonical` whenever it is hashed or signed.
#[derive(Debug, Clone)]
pub struct SealedEnvelope {
    pub ephemeral_public_key_b64: String,
    pub ciphertext_b64: String,
    pub nonce_b64: String,
    pub tag_b64: String,
}

/// Seals `plaintext` under `recipient_public` (the election public key).
/// Not on the server's production cast path — see the module doc comment.
pub fn seal(recipient_public: &PublicKey, plaintext: &[u8]) -> Result<SealedEnvelope, CryptoError> {
    let mut rng = OsRng;
    let ephemeral_secret = StaticSecret::random_from_rng(&mut rng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);

    let shared_secret = ephemeral_secret.diffie_hellman(recipient_public);
    let key_bytes = derive_key(shared_secret.as_bytes())?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(&nonce_bytes);
    let sealed = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad: &[] })
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let (ciphertext, tag) = split_tag(&sealed)?;

    Ok(SealedEnvelope {
        ephemeral_public_key_b64: BASE64.encode(ephemeral_public.as_bytes()),
        ciphertext_b64: BASE64.encode(ciphertext),
        nonce_b64: BASE64.encode(nonce_bytes),
        tag_b64: BASE64.encode(tag),
    })
}

/// Opens a [`SealedEnvelope`] given the election's private scalar. Used by
/// a production threshold-decryption re-implementation (Open Question 1)
/// and by tests; the MVP tally of §4.5 never calls this — it does not
/// actually decrypt ballots.
pub fn unseal(recipient_secret: &StaticSecret, envelope: &SealedEnvelope) -> Result<Vec<u8>, CryptoError> {
    let ephemeral_public_bytes = decode_fixed::<32>(&envelope.ephemeral_public_key_b64, "ephemeral_public_key")?;
    let ephemeral_public = PublicKey::from(ephemeral_public_bytes);

    let nonce_bytes = decode_fixed::<NONCE_LEN>(&envelope.nonce_b64, "nonce")?;
    let tag_bytes = decode_fixed::<TAG_LEN>(&envelope.tag_b64, "tag")?;
    let ciphertext = BASE64
        .decode(&envelope.ciphertext_b64)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("ciphertext: {e}")))?;

    let shared_secret = recipient_secret.diffie_hellman(&ephemeral_public);
    let key_bytes = derive_key(shared_secret.as_bytes())?;

    let mut combined = ciphertext.clone();
    combined.extend_from_slice(&tag_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(&nonce_bytes);
    cipher
        .decrypt(nonce, Payload { msg: &combined, aad: &[] })
        .map_err(|_| CryptoError::Decryption("AEAD tag mismatch".into()))
}

fn derive_key(shared_secret: &[u8]) -> Result<[u8; 32], CryptoError> {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut key = [0u8; 32];
    hkdf.expand(HKDF_INFO, &mut key)
        .map_err(|e| CryptoError::Encryption(format!("HKDF expand failed: {e}")))?;
    Ok(key)
}

fn split_tag(sealed: &[u8]) -> Result<(&[u8], &[u8]), CryptoError> {
    if sealed.len() < TAG_LEN {
        return Err(CryptoError::Encryption("ciphertext shorter than AEAD tag".into()));
    }
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
    Ok((ciphertext, tag))
}

fn decode_fixed<const N: usize>(b64: &str, field: &str) -> Result<[u8; N], CryptoError> {
    let bytes = BASE64
        .decode(b64)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("{field}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| CryptoError::MalformedCiphertext(format!("{field} is not {N} bytes")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_unseal_round_trip() {
        let mut rng = OsRng;
        let secret = StaticSecret::random_from_rng(&mut rng);
        let public = PublicKey::from(&secret);

        let envelope = seal(&public, b"candidate-7").unwrap();
        let plaintext = unseal(&secret, &envelope).unwrap();
        assert_eq!(plaintext, b"candidate-7");
    }

    #[test]
    fn unseal_with_wrong_key_fails() {
        let mut rng = OsRng;
        let secret_a = StaticSecret::random_from_rng(&mut rng);
        let public_a = PublicKey::from(&secret_a);
        let secret_b = StaticSecret::random_from_rng(&mut rng);

        let envelope = seal(&public_a, b"candidate-1").unwrap();
        assert!(unseal(&secret_b, &envelope).is_err());
    }

    #[test]
    fn tampered_tag_fails_to_unseal() {
        let mut rng = OsRng;
        let secret = StaticSecret::random_from_rng(&mut rng);
        let public = PublicKey::from(&secret);

        let mut envelope = seal(&public, b"candidate-2").unwrap();
        let mut tag = BASE64.decode(&envelope.tag_b64).unwrap();
        tag[0] ^= 0xFF;
        envelope.tag_b64 = BASE64.encode(tag);

        assert!(unseal(&secret, &envelope).is_err());
    }
}
