//! BallotCast: token verification, single-use enforcement and ballot
//! persistence (§4.4).

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;
use voting_crypto::authority::AuthorityKeys;
use voting_crypto::blind_rsa;
use voting_store::{Store, StoreError};
use voting_types::ballot::verification_code;
use voting_types::canonical::canonical_hash;
use voting_types::error::{CoreError, CoreResult};
use voting_types::{Ballot, EncryptedVote};

pub struct CastOutcome {
    pub ballot_hash: String,
    pub verification_code: String,
    pub vote_hash: String,
}

/// `proof_blob` is accepted, size-bounded by the caller (`voting-server`),
/// and persisted verbatim, but is NOT cryptographically verified here —
/// §4.4's explicit MVP limitation. A production follow-up would verify a
/// Chaum-Pedersen proof over the candidate encoding; this implementation
/// stores the blob under a name that keeps "unverified" visible to readers
/// of the response shape (`proof_blob`, never `verified_proof`).
pub async fn cast(
    store: &dyn Store,
    authority: &AuthorityKeys,
    election_id: Uuid,
    encrypted_vote: EncryptedVote,
    proof_blob: Value,
    token_hash_hex: &str,
    token_signature: &[u8],
) -> CoreResult<CastOutcome> {
    let token = store
        .find_token_by_hash(election_id, token_hash_hex)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?
        .ok_or(CoreError::UnknownToken)?;

    if token.is_used {
        return Err(CoreError::TokenReplay);
    }

    let hash = blind_rsa::hash_token(token_hash_hex);
    if !blind_rsa::verify_raw(&authority.rsa_public(), token_signature, &hash) {
        return Err(CoreError::InvalidTokenSignature);
    }

    let ballot_hash = encrypted_vote.hash();
    if store
        .ballot_hash_exists(election_id, &ballot_hash)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?
    {
        return Err(CoreError::DuplicateBallot);
    }

    let cast_at = Utc::now();
    let ballot = Ballot {
        id: Uuid::new_v4(),
        election_id,
        encrypted_vote,
        ballot_hash: ballot_hash.clone(),
        verification_code: verification_code(&ballot_hash),
        proof_blob,
        token_hash: token_hash_hex.to_string(),
        token_signature: token_signature.to_vec(),
        cast_at,
    };

    match store.cast_ballot(token.id, ballot.clone()).await {
        Ok(_) => {}
        Err(StoreError::Conflict(msg)) if msg.contains("token") => return Err(CoreError::TokenReplay),
        Err(StoreError::Conflict(_)) => return Err(CoreError::DuplicateBallot),
        Err(e) => return Err(CoreError::Store(e.to_string())),
    }

    let vote_hash = canonical_hash(&serde_json::json!({
        "election_id": election_id,
        "ballot_hash": ballot_hash,
        "token_hash": token_hash_hex,
        "timestamp": cast_at.to_rfc3339(),
    }))
    .map_err(|e| CoreError::Validation(e.to_string()))?;

    tracing::info!(election_id = %election_id, ballot_hash = %ballot.verification_code, "ballot cast");

    Ok(CastOutcome {
        ballot_hash,
        verification_code: ballot.verification_code,
        vote_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use voting_crypto::blind_rsa::sign_blinded;
    use voting_store::MemoryStore;
    use voting_types::AnonymousToken;

    fn sample_vote() -> EncryptedVote {
        EncryptedVote {
            ephemeral_public_key: "ZXBr".into(),
            ciphertext: "Y3Q=".into(),
            nonce: "bm9uY2U=".into(),
            tag: "dGFn".into(),
        }
    }

    async fn seeded_token(store: &MemoryStore, authority: &AuthorityKeys, election_id: Uuid) -> (String, Vec<u8>) {
        let token_hash_hex = "deadbeefcafefeed";
        let hash = blind_rsa::hash_token(token_hash_hex);
        let signature = sign_blinded(authority.rsa_private(), &hash).unwrap();
        let token = AnonymousToken::new(election_id, token_hash_hex.to_string(), vec![]);
        store.insert_token_direct(token).await.unwrap();
        (token_hash_hex.to_string(), signature)
    }

    #[tokio::test]
    async fn casts_and_rejects_replay() {
        let election_id = Uuid::new_v4();
        let store = MemoryStore::new();
        let authority = AuthorityKeys::generate_ephemeral().unwrap();
        let (token_hash, signature) = seeded_token(&store, &authority, election_id).await;

        let outcome = cast(&store, &authority, election_id, sample_vote(), serde_json::json!({}), &token_hash, &signature)
            .await
            .unwrap();
        assert_eq!(outcome.verification_code.len(), 12);

        let err = cast(&store, &authority, election_id, sample_vote(), serde_json::json!({}), &token_hash, &signature)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::TokenReplay));
    }

    #[tokio::test]
    async fn rejects_duplicate_ballot_with_a_fresh_token() {
        let election_id = Uuid::new_v4();
        let store = MemoryStore::new();
        let authority = AuthorityKeys::generate_ephemeral().unwrap();
        let (token_hash_a, signature_a) = seeded_token(&store, &authority, election_id).await;

        cast(&store, &authority, election_id, sample_vote(), serde_json::json!({}), &token_hash_a, &signature_a)
            .await
            .unwrap();

        let token_hash_b = "anothertokenhash";
        let hash_b = blind_rsa::hash_token(token_hash_b);
        let signature_b = sign_blinded(authority.rsa_private(), &hash_b).unwrap();
        store
            .insert_token_direct(AnonymousToken::new(election_id, token_hash_b.to_string(), vec![]))
            .await
            .unwrap();

        let err = cast(&store, &authority, election_id, sample_vote(), serde_json::json!({}), token_hash_b, &signature_b)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateBallot));
    }

    #[tokio::test]
    async fn rejects_unknown_token() {
        let election_id = Uuid::new_v4();
        let store = MemoryStore::new();
        let authority = AuthorityKeys::generate_ephemeral().unwrap();

        let err = cast(&store, &authority, election_id, sample_vote(), serde_json::json!({}), "unknown", &[1, 2, 3])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownToken));
    }

    #[tokio::test]
    async fn rejects_invalid_token_signature() {
        let election_id = Uuid::new_v4();
        let store = MemoryStore::new();
        let authority = AuthorityKeys::generate_ephemeral().unwrap();
        let token_hash = "somehash";
        store
            .insert_token_direct(AnonymousToken::new(election_id, token_hash.to_string(), vec![]))
            .await
            .unwrap();

        let err = cast(&store, &authority, election_id, sample_vote(), serde_json::json!({}), token_hash, &[9, 9, 9])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTokenSignature));
    }
}
