//! CodeSheet: per-voter main codes and per-candidate codes (§4.2).

use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use uuid::Uuid;
use voting_store::Store;
use voting_types::error::{CoreError, CoreResult};
use voting_types::CodeEntry;

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Generates a `CodeEntry` for every `voter_id` in `eligible_voters` that
/// does not already have one for `election_id`. Eligibility itself (KYC,
/// active flag, admin exclusion) is decided upstream of the core; this
/// component only receives the already-filtered id list (§4.2 "Voter
/// eligibility contract").
pub async fn generate_bulk(
    store: &dyn Store,
    election_id: Uuid,
    eligible_voters: &[Uuid],
) -> CoreResult<Vec<CodeEntry>> {
    let candidates = store
        .list_candidates(election_id)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
    if candidates.is_empty() {
        return Err(CoreError::NoCandidates);
    }
    if eligible_voters.is_empty() {
        return Err(CoreError::NoEligibleVoters);
    }

    let mut entries = Vec::with_capacity(eligible_voters.len());
    for &voter_id in eligible_voters {
        if let Some(existing) = store
            .get_code_entry(voter_id, election_id)
            .await
            .map_err(|e| CoreError::Store(e.to_string()))?
        {
            entries.push(existing);
            continue;
        }

        let main_code = random_hex(16);
        let mut candidate_codes: HashMap<Uuid, String> = HashMap::new();
        for candidate in &candidates {
            candidate_codes.insert(candidate.id, random_hex(4));
        }

        let entry = CodeEntry::new(voter_id, election_id, main_code, candidate_codes);
        let inserted = store
            .insert_code_entry_if_absent(entry)
            .await
            .map_err(|e| CoreError::Store(e.to_string()))?;
        entries.push(inserted);
    }

    tracing::info!(election_id = %election_id, codes_generated = entries.len(), "code sheet generated");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voting_store::MemoryStore;
    use voting_types::Candidate;

    async fn store_with_candidates(election_id: Uuid, n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            store
                .create_candidate(Candidate {
                    id: Uuid::new_v4(),
                    election_id,
                    display_order: i as i32,
                    label: format!("Candidate {i}"),
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn generates_one_entry_per_eligible_voter() {
        let election_id = Uuid::new_v4();
        let store = store_with_candidates(election_id, 3).await;
        let voters = vec![Uuid::new_v4(), Uuid::new_v4()];

        let entries = generate_bulk(&store, election_id, &voters).await.unwrap();
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.candidate_codes.len(), 3);
            assert_eq!(entry.main_code.len(), 32);
        }
    }

    #[tokio::test]
    async fn is_idempotent_for_already_seeded_voters() {
        let election_id = Uuid::new_v4();
        let store = store_with_candidates(election_id, 2).await;
        let voter = Uuid::new_v4();

        let first = generate_bulk(&store, election_id, &[voter]).await.unwrap();
        let second = generate_bulk(&store, election_id, &[voter]).await.unwrap();
        assert_eq!(first[0].main_code, second[0].main_code);
    }

    #[tokio::test]
    async fn fails_without_candidates() {
        let election_id = Uuid::new_v4();
        let store = MemoryStore::new();
        let err = generate_bulk(&store, election_id, &[Uuid::new_v4()]).await.unwrap_err();
        assert!(matches!(err, CoreError::NoCandidates));
    }

    #[tokio::test]
    async fn fails_without_eligible_voters() {
        let election_id = Uuid::new_v4();
        let store = store_with_candidates(election_id, 1).await;
        let err = generate_bulk(&store, election_id, &[]).await.unwrap_err();
        assert!(matches!(err, CoreError::NoEligibleVoters));
    }
}
