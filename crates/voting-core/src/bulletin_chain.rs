//! BulletinChain: the append-only, hash-linked event log (§4.6).

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;
use voting_crypto::authority::AuthorityKeys;
use voting_crypto::bulletin_sign;
use voting_types::canonical::canonicalize;
use voting_types::error::{CoreError, CoreResult};
use voting_types::{BulletinEntry, BulletinEventType};

use voting_store::{Store, StoreError};

/// How many times `append` retries after losing a race with another
/// appender on the same election before giving up. Five is generous for
/// a single-process contention window; a sustained string of conflicts
/// past that indicates something other than ordinary concurrency.
const MAX_APPEND_RETRIES: u32 = 5;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub message: String,
    pub total_entries: usize,
}

/// `sha256(canonical_json(payload) || previous_hash)`, hex (§3, §4.6).
fn compute_entry_hash(payload: &Value, previous_hash: &str) -> String {
    let canonical = canonicalize(payload);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.update(previous_hash.as_bytes());
    hex::encode(hasher.finalize())
}

/// Appends one typed event for `election_id`. Builds the entry from a
/// snapshot of the chain tip, then hands it to the store; if a
/// concurrent appender won the race, the store reports `Conflict` and
/// this function re-reads the tip and retries (§5's serialization
/// requirement, implemented here as optimistic retry rather than holding
/// a lock across the whole call).
pub async fn append(
    store: &dyn Store,
    authority: &AuthorityKeys,
    election_id: Uuid,
    entry_type: BulletinEventType,
    payload: Value,
) -> CoreResult<BulletinEntry> {
    for attempt in 0..MAX_APPEND_RETRIES {
        let tip = store
            .latest_bulletin_entry(election_id)
            .await
            .map_err(|e| CoreError::Store(e.to_string()))?;

        let previous_hash = tip.as_ref().map(|e| e.entry_hash.clone()).unwrap_or_default();
        let sequence = tip.as_ref().map(|e| e.sequence + 1).unwrap_or(1);
        let entry_hash = compute_entry_hash(&payload, &previous_hash);
        let authority_signature_b64 = bulletin_sign::sign_entry_hash(authority.ed25519_signing_key(), &entry_hash);

        let entry = BulletinEntry {
            id: Uuid::new_v4(),
            election_id,
            sequence,
            entry_type,
            entry_data: payload.clone(),
            entry_hash,
            previous_hash,
            authority_signature_b64,
            created_at: Utc::now(),
        };

        match store.append_bulletin_entry(entry).await {
            Ok(written) => return Ok(written),
            Err(StoreError::Conflict(_)) => {
                tracing::warn!(election_id = %election_id, attempt, "bulletin append lost race, retrying");
                continue;
            }
            Err(e) => return Err(CoreError::Store(e.to_string())),
        }
    }
    Err(CoreError::Store(format!(
        "bulletin append for election {election_id} did not converge after {MAX_APPEND_RETRIES} attempts"
    )))
}

/// Walks the chain in sequence, checking both hash links and authority
/// signatures; returns the index of the first inconsistency (§4.6
/// Verify).
pub async fn verify(
    store: &dyn Store,
    authority_public: &ed25519_dalek::VerifyingKey,
    election_id: Uuid,
) -> CoreResult<ChainVerification> {
    let entries = store
        .list_bulletin_entries(election_id)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;

    let mut expected_previous = String::new();
    for (index, entry) in entries.iter().enumerate() {
        if entry.previous_hash != expected_previous {
            return Ok(ChainVerification {
                valid: false,
                message: format!("entry {} (sequence {}): previous_hash does not match predecessor", index + 1, entry.sequence),
                total_entries: entries.len(),
            });
        }
        let recomputed = compute_entry_hash(&entry.entry_data, &entry.previous_hash);
        if recomputed != entry.entry_hash {
            return Ok(ChainVerification {
                valid: false,
                message: format!("entry {} (sequence {}): entry_hash does not match recomputed hash", index + 1, entry.sequence),
                total_entries: entries.len(),
            });
        }
        if !bulletin_sign::verify_entry_signature(authority_public, &entry.entry_hash, &entry.authority_signature_b64) {
            return Ok(ChainVerification {
                valid: false,
                message: format!("entry {} (sequence {}): authority signature does not verify", index + 1, entry.sequence),
                total_entries: entries.len(),
            });
        }
        expected_previous = entry.entry_hash.clone();
    }

    Ok(ChainVerification {
        valid: true,
        message: "chain is internally consistent".to_string(),
        total_entries: entries.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use voting_store::MemoryStore;

    fn keys() -> AuthorityKeys {
        AuthorityKeys::generate_ephemeral().unwrap()
    }

    #[tokio::test]
    async fn append_then_verify_three_entries() {
        let store = MemoryStore::new();
        let authority = keys();
        let election_id = Uuid::new_v4();

        append(&store, &authority, election_id, BulletinEventType::ElectionCreated, json!({"a": 1}))
            .await
            .unwrap();
        append(&store, &authority, election_id, BulletinEventType::KeyGenerated, json!({"b": 2}))
            .await
            .unwrap();
        let third = append(&store, &authority, election_id, BulletinEventType::BallotCast, json!({"c": 3}))
            .await
            .unwrap();

        assert_eq!(third.sequence, 3);

        let public = authority.ed25519_signing_key().verifying_key();
        let result = verify(&store, &public, election_id).await.unwrap();
        assert!(result.valid);
        assert_eq!(result.total_entries, 3);
    }

    #[tokio::test]
    async fn tampering_with_entry_data_is_detected() {
        let store = MemoryStore::new();
        let authority = keys();
        let election_id = Uuid::new_v4();

        append(&store, &authority, election_id, BulletinEventType::ElectionCreated, json!({"a": 1}))
            .await
            .unwrap();
        append(&store, &authority, election_id, BulletinEventType::KeyGenerated, json!({"b": 2}))
            .await
            .unwrap();
        append(&store, &authority, election_id, BulletinEventType::BallotCast, json!({"c": 3}))
            .await
            .unwrap();

        // append() never overwrites, so tampering is simulated by replaying
        // the real chain into a fresh store with entry 2's data corrupted —
        // equivalent to an operator editing the database directly.
        let tampered_store = MemoryStore::new();
        let mut original = store.list_bulletin_entries(election_id).await.unwrap();
        original[1].entry_data = json!({"b": 99});
        for entry in original {
            tampered_store.append_bulletin_entry(entry).await.unwrap();
        }

        let public = authority.ed25519_signing_key().verifying_key();
        let result = verify(&tampered_store, &public, election_id).await.unwrap();
        assert!(!result.valid);
        assert!(result.message.contains("entry 2"));
    }
}
