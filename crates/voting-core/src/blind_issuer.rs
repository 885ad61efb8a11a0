//! BlindIssuer: anonymous credential issuance via RSA blind signing (§4.3).

use sha2::{Digest, Sha256};
use uuid::Uuid;
use voting_crypto::authority::AuthorityKeys;
use voting_crypto::blind_rsa;
use voting_store::{Store, StoreError};
use voting_types::error::{CoreError, CoreResult};
use voting_types::AnonymousToken;

pub struct SignedToken {
    pub blinded_signature: Vec<u8>,
    pub token_hash_hex: String,
    pub public_key_pem: String,
}

/// §4.3 steps 1-5, persisted atomically by `Store::issue_token`. `direct`
/// bypasses the main-code lookup and signs a caller-supplied token hash
/// directly; it exists only for the MVP fallback issuance path and must
/// never be reachable when `direct_issuance_enabled` is false.
pub async fn sign(
    store: &dyn Store,
    authority: &AuthorityKeys,
    election_id: Uuid,
    main_code: &str,
    blinded_message: &[u8],
) -> CoreResult<SignedToken> {
    let blinded_sig = blind_rsa::sign_blinded(authority.rsa_private(), blinded_message)?;
    let token_hash_hex = hex::encode(Sha256::digest(blinded_message));
    let token = AnonymousToken::new(election_id, token_hash_hex.clone(), blinded_sig.clone());

    match store.issue_token(election_id, main_code, token).await {
        Ok(_) => {}
        Err(StoreError::NotFound(_)) => return Err(CoreError::InvalidCode),
        Err(StoreError::Conflict(_)) => return Err(CoreError::CodeConsumed),
        Err(e) => return Err(CoreError::Store(e.to_string())),
    }

    tracing::info!(election_id = %election_id, "anonymous token issued");

    Ok(SignedToken {
        blinded_signature: blinded_sig,
        token_hash_hex,
        public_key_pem: authority.rsa_public_pem()?,
    })
}

/// The MVP fallback path (§4.3 "Fallback direct issuance"): accepts a
/// client-supplied token hash and signs a placeholder payload without
/// consuming a main code. Callers in `voting-server` must gate this behind
/// `Config::debug` / `direct_issuance_enabled`; this function itself has no
/// opinion on whether it is reachable.
pub async fn sign_direct(
    store: &dyn Store,
    authority: &AuthorityKeys,
    election_id: Uuid,
    token_hash_hex: &str,
) -> CoreResult<SignedToken> {
    if let Some(existing) = store
        .find_token_by_hash(election_id, token_hash_hex)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?
    {
        return Err(CoreError::Validation(format!(
            "token hash {} already issued",
            existing.token_hash
        )));
    }

    let placeholder_signature = vec![0u8; blind_rsa_modulus_len(authority)];
    let token = AnonymousToken::new(election_id, token_hash_hex.to_string(), placeholder_signature.clone());
    store
        .insert_token_direct(token)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;

    tracing::warn!(election_id = %election_id, "direct token issuance used (debug mode only)");
    Ok(SignedToken {
        blinded_signature: placeholder_signature,
        token_hash_hex: token_hash_hex.to_string(),
        public_key_pem: authority.rsa_public_pem()?,
    })
}

fn blind_rsa_modulus_len(authority: &AuthorityKeys) -> usize {
    (authority.rsa_modulus_bit_length() + 7) / 8
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint_dig::BigUint;
    use voting_store::MemoryStore;
    use voting_types::CodeEntry;

    async fn seeded_store(election_id: Uuid, main_code: &str) -> MemoryStore {
        let store = MemoryStore::new();
        let entry = CodeEntry::new(Uuid::new_v4(), election_id, main_code.to_string(), Default::default());
        store.insert_code_entry_if_absent(entry).await.unwrap();
        store
    }

    #[tokio::test]
    async fn signs_and_consumes_main_code_once() {
        let election_id = Uuid::new_v4();
        let store = seeded_store(election_id, "main-code-value").await;
        let authority = AuthorityKeys::generate_ephemeral().unwrap();

        let blinded = BigUint::from(42u32).to_bytes_be();
        let signed = sign(&store, &authority, election_id, "main-code-value", &blinded).await.unwrap();
        assert!(!signed.blinded_signature.is_empty());

        let err = sign(&store, &authority, election_id, "main-code-value", &blinded).await.unwrap_err();
        assert!(matches!(err, CoreError::CodeConsumed));
    }

    #[tokio::test]
    async fn fails_with_unknown_main_code() {
        let election_id = Uuid::new_v4();
        let store = MemoryStore::new();
        let authority = AuthorityKeys::generate_ephemeral().unwrap();

        let err = sign(&store, &authority, election_id, "missing", &[1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidCode));
    }

    #[tokio::test]
    async fn direct_issuance_writes_a_token_without_a_main_code() {
        let election_id = Uuid::new_v4();
        let store = MemoryStore::new();
        let authority = AuthorityKeys::generate_ephemeral().unwrap();

        sign_direct(&store, &authority, election_id, "client-chosen-hash").await.unwrap();
        let stored = store.find_token_by_hash(election_id, "client-chosen-hash").await.unwrap();
        assert!(stored.is_some());

        let err = sign_direct(&store, &authority, election_id, "client-chosen-hash").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
