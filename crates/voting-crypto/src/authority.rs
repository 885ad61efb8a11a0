//! The long-lived authority credential store (§4.7): an RSA-2048 blind
//! signing keypair and an Ed25519 bulletin signing keypair, loaded once at
//! startup and never mutated.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use voting_types::error::CryptoError;

const RSA_BITS: usize = 2048;

/// The in-process representation of §4.7's "authority credential store".
/// `voting-server` loads one of these at startup and hands it to every
/// handler by reference; nothing here is global mutable state.
pub struct AuthorityKeys {
    rsa_private: RsaPrivateKey,
    ed25519: SigningKey,
}

impl AuthorityKeys {
    /// Generates a fresh RSA-2048 keypair and Ed25519 keypair. Permitted
    /// only in development mode per §4.7; callers outside `DEBUG=true`
    /// must use [`AuthorityKeys::from_pem`] against persistent storage and
    /// log a `WARN` if they fall back to this path.
    pub fn generate_ephemeral() -> Result<Self, CryptoError> {
        let mut rng = OsRng;
        let rsa_private = RsaPrivateKey::new(&mut rng, RSA_BITS)
            .map_err(|e| CryptoError::MalformedKey(format!("RSA keygen failed: {e}")))?;
        let ed25519 = SigningKey::generate(&mut rng);
        Ok(Self { rsa_private, ed25519 })
    }

    /// Loads the RSA private key from PKCS#8 PEM and the Ed25519 key from
    /// its raw 32-byte seed, as would be read from the secure storage
    /// named in `voting-server`'s configuration.
    pub fn from_pem(rsa_pkcs8_pem: &str, ed25519_seed: &[u8; 32]) -> Result<Self, CryptoError> {
        let rsa_private = RsaPrivateKey::from_pkcs8_pem(rsa_pkcs8_pem)
            .map_err(|e| CryptoError::MalformedKey(format!("invalid RSA PEM: {e}")))?;
        let ed25519 = SigningKey::from_bytes(ed25519_seed);
        Ok(Self { rsa_private, ed25519 })
    }

    pub fn rsa_private(&self) -> &RsaPrivateKey {
        &self.rsa_private
    }

    pub fn rsa_public(&self) -> RsaPublicKey {
        RsaPublicKey::from(&self.rsa_private)
    }

    pub fn ed25519_signing_key(&self) -> &SigningKey {
        &self.ed25519
    }

    /// PKCS#8 PEM encoding of the RSA private key, for persistence. Never
    /// logged; callers write it straight to the configured secure store.
    pub fn rsa_private_pem(&self) -> Result<String, CryptoError> {
        self.rsa_private
            .to_pkcs8_pem(LineEnding::LF)
            .map(|z| z.to_string())
            .map_err(|e| CryptoError::MalformedKey(format!("RSA PEM encode failed: {e}")))
    }

    /// PKCS#1 PEM of the RSA public key, returned to clients as
    /// `server_public_key_pem` at `/token/request-signature` (§6).
    pub fn rsa_public_pem(&self) -> Result<String, CryptoError> {
        use rsa::pkcs1::EncodeRsaPublicKey;
        self.rsa_public()
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| CryptoError::MalformedKey(format!("RSA public PEM encode failed: {e}")))
    }

    pub fn rsa_modulus_bit_length(&self) -> usize {
        self.rsa_public().n().bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_keys_have_expected_rsa_size() {
        let keys = AuthorityKeys::generate_ephemeral().unwrap();
        assert!(keys.rsa_modulus_bit_length() >= 2040);
    }

    #[test]
    fn public_pem_round_trips() {
        let keys = AuthorityKeys::generate_ephemeral().unwrap();
        let pem = keys.rsa_public_pem().unwrap();
        assert!(pem.contains("RSA PUBLIC KEY"));
    }
}
