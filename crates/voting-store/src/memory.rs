//! In-memory [`Store`] implementation used by the crate's own test suite
//! and by `voting-core`'s integration-style tests (SPEC_FULL.md §10.5).
//! No network or database is required to exercise a full component
//! contract against this implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;
use voting_types::{
    AnonymousToken, Ballot, BulletinEntry, Candidate, CodeEntry, Election, ElectionResult,
    ElectionStatus, SharePackage, TrusteeSlot,
};

use crate::{DecryptionShareBatch, Store, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    elections: HashMap<Uuid, Election>,
    candidates: HashMap<Uuid, Vec<Candidate>>,
    trustee_slots: HashMap<Uuid, Vec<TrusteeSlot>>,
    code_entries: HashMap<Uuid, Vec<CodeEntry>>,
    tokens: HashMap<Uuid, Vec<AnonymousToken>>,
    ballots: HashMap<Uuid, Vec<Ballot>>,
    bulletin: HashMap<Uuid, Vec<BulletinEntry>>,
    results: HashMap<Uuid, Vec<ElectionResult>>,
}

/// A `Mutex`-guarded set of `HashMap`s keyed by election id. Intentionally
/// simple: this store exists to exercise contracts, not to benchmark
/// concurrency, so every operation takes the single lock for its whole
/// body rather than modeling per-election row locks the way `PgStore`'s
/// `SELECT ... FOR UPDATE` does.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(what: &str, id: Uuid) -> StoreError {
    StoreError::NotFound(format!("{what} {id}"))
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_election(&self, election_id: Uuid) -> StoreResult<Election> {
        let inner = self.inner.lock().unwrap();
        inner
            .elections
            .get(&election_id)
            .cloned()
            .ok_or_else(|| not_found("election", election_id))
    }

    async fn create_election(&self, election: Election) -> StoreResult<Election> {
        let mut inner = self.inner.lock().unwrap();
        inner.elections.insert(election.id, election.clone());
        Ok(election)
    }

    async fn set_election_status(&self, election_id: Uuid, status: ElectionStatus) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let election = inner
            .elections
            .get_mut(&election_id)
            .ok_or_else(|| not_found("election", election_id))?;
        election.status = status;
        Ok(())
    }

    async fn list_candidates(&self, election_id: Uuid) -> StoreResult<Vec<Candidate>> {
        let inner = self.inner.lock().unwrap();
        let mut candidates = inner.candidates.get(&election_id).cloned().unwrap_or_default();
        candidates.sort_by_key(|c| c.display_order);
        Ok(candidates)
    }

    async fn create_candidate(&self, candidate: Candidate) -> StoreResult<Candidate> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .candidates
            .entry(candidate.election_id)
            .or_default()
            .push(candidate.clone());
        Ok(candidate)
    }

    async fn list_trustee_slots(&self, election_id: Uuid) -> StoreResult<Vec<TrusteeSlot>> {
        let inner = self.inner.lock().unwrap();
        let mut slots = inner.trustee_slots.get(&election_id).cloned().unwrap_or_default();
        slots.sort_by_key(|s| s.trustee_index);
        Ok(slots)
    }

    async fn create_trustee_slot(&self, slot: TrusteeSlot) -> StoreResult<TrusteeSlot> {
        let mut inner = self.inner.lock().unwrap();
        inner.trustee_slots.entry(slot.election_id).or_default().push(slot.clone());
        Ok(slot)
    }

    async fn record_key_ceremony(&self, election_id: Uuid, public_key_b64: String, shares: Vec<SharePackage>) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();

        {
            let election = inner
                .elections
                .get(&election_id)
                .ok_or_else(|| not_found("election", election_id))?;
            if election.public_key_b64.is_some() {
                return Err(StoreError::Conflict("election already ceremonied".into()));
            }
        }
        {
            let slots = inner
                .trustee_slots
                .get(&election_id)
                .ok_or_else(|| StoreError::Conflict("no trustee slots for election".into()))?;
            for share in &shares {
                if !slots.iter().any(|s| s.trustee_index == share.trustee_index) {
                    return Err(StoreError::Conflict(format!("no trustee slot with index {}", share.trustee_index)));
                }
            }
        }

        let election = inner.elections.get_mut(&election_id).expect("checked above");
        election.public_key_b64 = Some(public_key_b64);
        let slots = inner.trustee_slots.get_mut(&election_id).expect("checked above");
        for share in shares {
            if let Some(slot) = slots.iter_mut().find(|s| s.trustee_index == share.trustee_index) {
                slot.share = Some(share);
            }
        }
        Ok(())
    }

    async fn submit_decryption_shares(&self, election_id: Uuid, batch: DecryptionShareBatch) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let slots = inner
            .trustee_slots
            .get_mut(&election_id)
            .ok_or_else(|| StoreError::Conflict("no trustee slots for election".into()))?;
        let slot = slots
            .iter_mut()
            .find(|s| s.voter_id == batch.trustee_id)
            .ok_or_else(|| not_found("trustee slot for voter", batch.trustee_id))?;
        for (ballot_id, partial_hex) in batch.shares {
            slot.partial_decryptions.insert(
                ballot_id,
                voting_types::trustee::PartialDecryption {
                    trustee_index: slot.trustee_index,
                    ballot_id,
                    partial_hex,
                },
            );
        }
        slot.shares_submitted = true;
        Ok(())
    }

    async fn get_code_entry(&self, voter_id: Uuid, election_id: Uuid) -> StoreResult<Option<CodeEntry>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .code_entries
            .get(&election_id)
            .and_then(|entries| entries.iter().find(|e| e.voter_id == voter_id).cloned()))
    }

    async fn find_code_entry_by_main_code(&self, election_id: Uuid, main_code: &str) -> StoreResult<Option<CodeEntry>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .code_entries
            .get(&election_id)
            .and_then(|entries| entries.iter().find(|e| e.main_code == main_code).cloned()))
    }

    async fn list_code_entries(&self, election_id: Uuid) -> StoreResult<Vec<CodeEntry>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.code_entries.get(&election_id).cloned().unwrap_or_default())
    }

    async fn insert_code_entry_if_absent(&self, entry: CodeEntry) -> StoreResult<CodeEntry> {
        let mut inner = self.inner.lock().unwrap();
        let entries = inner.code_entries.entry(entry.election_id).or_default();
        if let Some(existing) = entries.iter().find(|e| e.voter_id == entry.voter_id) {
            return Ok(existing.clone());
        }
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn issue_token(&self, election_id: Uuid, main_code: &str, token: AnonymousToken) -> StoreResult<AnonymousToken> {
        let mut inner = self.inner.lock().unwrap();
        let entries = inner
            .code_entries
            .get_mut(&election_id)
            .ok_or_else(|| StoreError::NotFound(format!("no code entries for election {election_id}")))?;
        let entry = entries
            .iter_mut()
            .find(|e| e.main_code == main_code)
            .ok_or_else(|| StoreError::NotFound(format!("main code not found for election {election_id}")))?;
        if entry.main_code_used {
            return Err(StoreError::Conflict("main code already consumed".into()));
        }
        entry.main_code_used = true;
        entry.main_code_used_at = Some(chrono::Utc::now());

        inner.tokens.entry(election_id).or_default().push(token.clone());
        Ok(token)
    }

    async fn insert_token_direct(&self, token: AnonymousToken) -> StoreResult<AnonymousToken> {
        let mut inner = self.inner.lock().unwrap();
        inner.tokens.entry(token.election_id).or_default().push(token.clone());
        Ok(token)
    }

    async fn find_token_by_hash(&self, election_id: Uuid, token_hash: &str) -> StoreResult<Option<AnonymousToken>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tokens
            .get(&election_id)
            .and_then(|tokens| tokens.iter().find(|t| t.token_hash == token_hash).cloned()))
    }

    async fn ballot_hash_exists(&self, election_id: Uuid, ballot_hash: &str) -> StoreResult<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .ballots
            .get(&election_id)
            .map(|ballots| ballots.iter().any(|b| b.ballot_hash == ballot_hash))
            .unwrap_or(false))
    }

    async fn cast_ballot(&self, token_id: Uuid, ballot: Ballot) -> StoreResult<Ballot> {
        let mut inner = self.inner.lock().unwrap();

        let already_used = inner
            .tokens
            .get(&ballot.election_id)
            .and_then(|tokens| tokens.iter().find(|t| t.id == token_id))
            .map(|t| t.is_used)
            .ok_or_else(|| not_found("token", token_id))?;
        if already_used {
            return Err(StoreError::Conflict("token already used".into()));
        }

        let duplicate = inner
            .ballots
            .get(&ballot.election_id)
            .map(|ballots| ballots.iter().any(|b| b.ballot_hash == ballot.ballot_hash))
            .unwrap_or(false);
        if duplicate {
            return Err(StoreError::Conflict("duplicate ballot hash".into()));
        }

        if let Some(token) = inner
            .tokens
            .get_mut(&ballot.election_id)
            .and_then(|tokens| tokens.iter_mut().find(|t| t.id == token_id))
        {
            token.is_used = true;
            token.used_at = Some(chrono::Utc::now());
        }

        inner.ballots.entry(ballot.election_id).or_default().push(ballot.clone());
        Ok(ballot)
    }

    async fn list_ballots(&self, election_id: Uuid) -> StoreResult<Vec<Ballot>> {
        let inner = self.inner.lock().unwrap();
        let mut ballots = inner.ballots.get(&election_id).cloned().unwrap_or_default();
        ballots.sort_by_key(|b| b.id);
        Ok(ballots)
    }

    async fn latest_bulletin_entry(&self, election_id: Uuid) -> StoreResult<Option<BulletinEntry>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .bulletin
            .get(&election_id)
            .and_then(|entries| entries.iter().max_by_key(|e| e.sequence).cloned()))
    }

    async fn append_bulletin_entry(&self, entry: BulletinEntry) -> StoreResult<BulletinEntry> {
        let mut inner = self.inner.lock().unwrap();

        // Mirrors PgStore's tip check under its advisory lock: the whole
        // store is guarded by a single mutex here, so re-reading the tip
        // and validating it against the caller's snapshot before pushing
        // gives the same serialization guarantee without a separate lock.
        let current_tip = inner.bulletin.get(&entry.election_id).and_then(|entries| entries.iter().max_by_key(|e| e.sequence));
        let expected_previous_hash = current_tip.map(|e| e.entry_hash.clone()).unwrap_or_default();
        let expected_sequence = current_tip.map(|e| e.sequence + 1).unwrap_or(1);

        if entry.previous_hash != expected_previous_hash || entry.sequence != expected_sequence {
            return Err(StoreError::Conflict(
                "bulletin chain tip advanced since caller's snapshot; retry".into(),
            ));
        }

        inner.bulletin.entry(entry.election_id).or_default().push(entry.clone());
        Ok(entry)
    }

    async fn list_bulletin_entries(&self, election_id: Uuid) -> StoreResult<Vec<BulletinEntry>> {
        let inner = self.inner.lock().unwrap();
        let mut entries = inner.bulletin.get(&election_id).cloned().unwrap_or_default();
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    async fn finalize_tally(&self, election_id: Uuid, results: Vec<ElectionResult>) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        {
            let existing = inner.results.entry(election_id).or_default();
            for result in results {
                if let Some(row) = existing.iter_mut().find(|r| r.candidate_id == result.candidate_id) {
                    *row = result;
                } else {
                    existing.push(result);
                }
            }
        }
        let election = inner
            .elections
            .get_mut(&election_id)
            .ok_or_else(|| not_found("election", election_id))?;
        election.status = ElectionStatus::Tallied;
        Ok(())
    }

    async fn list_results(&self, election_id: Uuid) -> StoreResult<Vec<ElectionResult>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.results.get(&election_id).cloned().unwrap_or_default())
    }
}
