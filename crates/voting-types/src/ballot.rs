//! Ballot and its ECIES wire envelope (§3, §4.4).

use crate::canonical::canonical_hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The exact wire layout bound by §6: `{ephemeral_public_key, ciphertext,
/// nonce, tag}`, every field base64. Field order here is irrelevant to the
/// hash (canonicalization key-sorts), but matches the spec's prose order
/// for readability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedVote {
    pub ephemeral_public_key: String,
    pub ciphertext: String,
    pub nonce: String,
    pub tag: String,
}

impl EncryptedVote {
    /// sha256(canonical_json(self)), hex. This is `ballot_hash` before the
    /// caller decides whether it already exists in the election.
    pub fn hash(&self) -> String {
        canonical_hash(self).expect("EncryptedVote always serializes")
    }
}

/// First 12 hex characters of `ballot_hash`, uppercased.
pub fn verification_code(ballot_hash: &str) -> String {
    ballot_hash.chars().take(12).collect::<String>().to_uppercase()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ballot {
    pub id: Uuid,
    pub election_id: Uuid,
    pub encrypted_vote: EncryptedVote,
    pub ballot_hash: String,
    pub verification_code: String,
    /// Accepted and stored verbatim; not cryptographically verified by
    /// this implementation (§4.4 "ZKP proof blob").
    pub proof_blob: serde_json::Value,
    pub token_hash: String,
    /// The raw RSA signature over `sha256(token_hash)`, already verified
    /// against the issuer public key by `ballot_cast::cast` before this
    /// struct is built. Persisted alongside the ballot per §3's data
    /// model so the cast row carries its own proof of token authenticity.
    pub token_signature: Vec<u8>,
    pub cast_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedVote {
        EncryptedVote {
            ephemeral_public_key: "ZXBr".into(),
            ciphertext: "Y3Q=".into(),
            nonce: "bm9uY2U=".into(),
            tag: "dGFn".into(),
        }
    }

    #[test]
    fn hash_is_deterministic_and_field_order_independent() {
        let a = sample();
        let b = EncryptedVote {
            tag: a.tag.clone(),
            nonce: a.nonce.clone(),
            ciphertext: a.ciphertext.clone(),
            ephemeral_public_key: a.ephemeral_public_key.clone(),
        };
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn verification_code_is_upper_first_12() {
        let hash = "ab34cd56ef78ab34cd56ef78";
        assert_eq!(verification_code(hash), "AB34CD56EF78");
    }
}
