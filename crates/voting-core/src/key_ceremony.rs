//! KeyCeremony: generates the election keypair and splits its private
//! scalar across the registered trustees (§4.1).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use uuid::Uuid;
use voting_crypto::shamir;
use voting_store::Store;
use voting_types::error::{CoreError, CoreResult};
use voting_types::Election;

/// Runs the ceremony for `election_id`: fails `AlreadyCeremonied` if the
/// election already carries a public key, fails `InsufficientTrustees` if
/// fewer than `total_trustees_n` slots are registered, otherwise samples a
/// fresh keypair and persists it together with one share per slot in a
/// single atomic call (`Store::record_key_ceremony`).
pub async fn generate(store: &dyn Store, election_id: Uuid) -> CoreResult<Election> {
    let election = store
        .get_election(election_id)
        .await
        .map_err(|_| CoreError::ElectionNotFound(election_id))?;

    if election.has_public_key() {
        return Err(CoreError::AlreadyCeremonied);
    }

    let slots = store
        .list_trustee_slots(election_id)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
    if slots.len() < election.total_trustees_n as usize {
        return Err(CoreError::InsufficientTrustees {
            needed: election.total_trustees_n,
            have: slots.len() as u32,
        });
    }

    let output = shamir::run_ceremony(election.threshold_t, election.total_trustees_n)?;
    let public_key_b64 = BASE64.encode(output.public_key_bytes);

    store
        .record_key_ceremony(election_id, public_key_b64.clone(), output.shares)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;

    tracing::info!(election_id = %election_id, "key ceremony complete");

    let mut ceremonied = election;
    ceremonied.public_key_b64 = Some(public_key_b64);
    Ok(ceremonied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use voting_store::MemoryStore;
    use voting_types::{ElectionStatus, TrusteeSlot};

    fn draft_election(t: u32, n: u32) -> Election {
        Election {
            id: Uuid::new_v4(),
            title: "Board seat".to_string(),
            description: None,
            start_time: Utc::now(),
            end_time: Utc::now() + Duration::days(1),
            status: ElectionStatus::Draft,
            threshold_t: t,
            total_trustees_n: n,
            public_key_b64: None,
        }
    }

    async fn seed_trustees(store: &MemoryStore, election_id: Uuid, n: u32) {
        for i in 0..n {
            store
                .create_trustee_slot(TrusteeSlot::new(election_id, Uuid::new_v4(), i + 1))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn generates_key_and_shares_once_all_trustees_registered() {
        let store = MemoryStore::new();
        let election = draft_election(3, 5);
        let election_id = election.id;
        store.create_election(election).await.unwrap();
        seed_trustees(&store, election_id, 5).await;

        let result = generate(&store, election_id).await.unwrap();
        assert!(result.has_public_key());

        let slots = store.list_trustee_slots(election_id).await.unwrap();
        assert_eq!(slots.len(), 5);
        assert!(slots.iter().all(|s| s.share.is_some()));
        for slot in &slots {
            let share = slot.share.as_ref().unwrap();
            assert_eq!(share.threshold_t, 3);
            assert_eq!(share.total_trustees_n, 5);
        }
    }

    #[tokio::test]
    async fn fails_when_not_enough_trustees_registered() {
        let store = MemoryStore::new();
        let election = draft_election(3, 5);
        let election_id = election.id;
        store.create_election(election).await.unwrap();
        seed_trustees(&store, election_id, 2).await;

        let err = generate(&store, election_id).await.unwrap_err();
        assert!(matches!(err, CoreError::InsufficientTrustees { needed: 5, have: 2 }));
    }

    #[tokio::test]
    async fn fails_when_already_ceremonied() {
        let store = MemoryStore::new();
        let election = draft_election(2, 3);
        let election_id = election.id;
        store.create_election(election).await.unwrap();
        seed_trustees(&store, election_id, 3).await;

        generate(&store, election_id).await.unwrap();
        let err = generate(&store, election_id).await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyCeremonied));
    }
}
