//! Ed25519 signing and verification of bulletin entry hashes (§4.6's
//! "Authority signature field", supplementing the distilled spec).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

/// Signs `entry_hash` (the hex string, as UTF-8 bytes) with the
/// authority's bulletin signing key, returning base64.
pub fn sign_entry_hash(signing_key: &SigningKey, entry_hash_hex: &str) -> String {
    let signature: Signature = signing_key.sign(entry_hash_hex.as_bytes());
    BASE64.encode(signature.to_bytes())
}

/// Verifies a bulletin entry's authority signature against its stored
/// `entry_hash`. Returns `false` (never panics) on malformed input, since
/// a corrupted signature field is itself tamper evidence.
pub fn verify_entry_signature(
    verifying_key: &VerifyingKey,
    entry_hash_hex: &str,
    signature_b64: &str,
) -> bool {
    let Ok(sig_bytes) = BASE64.decode(signature_b64) else {
        return false;
    };
    let Ok(sig_array): Result<[u8; 64], _> = sig_bytes.try_into() else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_array);
    verifying_key.verify(entry_hash_hex.as_bytes(), &signature).is_ok()
}

pub fn verifying_key_from_signing(signing_key: &SigningKey) -> VerifyingKey {
    signing_key.verifying_key()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn sign_and_verify_round_trip() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = verifying_key_from_signing(&signing_key);

        let sig = sign_entry_hash(&signing_key, "deadbeef");
        assert!(verify_entry_signature(&verifying_key, "deadbeef", &sig));
    }

    #[test]
    fn verify_rejects_tampered_hash() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = verifying_key_from_signing(&signing_key);

        let sig = sign_entry_hash(&signing_key, "deadbeef");
        assert!(!verify_entry_signature(&verifying_key, "cafebabe", &sig));
    }

    #[test]
    fn verify_rejects_malformed_signature() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = verifying_key_from_signing(&signing_key);
        assert!(!verify_entry_signature(&verifying_key, "deadbeef", "not-base64!!"));
    }
}
