//! Repository abstraction over the election data model (SPEC_FULL.md
//! §10.1). Every stateful core component is generic over `S: Store`, so
//! the exact same code path runs against [`MemoryStore`] in tests and
//! [`PgStore`] in production — there is no component logic duplicated
//! between a "real" and a "fake" implementation.

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;
use voting_types::{
    AnonymousToken, Ballot, BulletinEntry, Candidate, CodeEntry, Election, ElectionResult,
    SharePackage, TrusteeSlot,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A decryption share a trustee submits for one ballot, grouped as a
/// batch per the `/trustee/submit-decryption-share` request body (§6).
/// Named here rather than reusing `PartialDecryption` because the wire
/// shape groups ballot_id -> partial_hex per trustee, while the stored
/// form is one row per (trustee, ballot) pair.
pub struct DecryptionShareBatch {
    pub trustee_id: Uuid,
    pub shares: Vec<(Uuid, String)>,
}

/// The repository surface every core component depends on. `voting-core`
/// never issues SQL directly; it calls through this trait, and
/// `voting-server` wires a concrete [`PgStore`] into it at startup.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Election / Candidate -------------------------------------------------
    async fn get_election(&self, election_id: Uuid) -> StoreResult<Election>;
    async fn create_election(&self, election: Election) -> StoreResult<Election>;
    async fn set_election_status(&self, election_id: Uuid, status: voting_types::ElectionStatus) -> StoreResult<()>;

    async fn list_candidates(&self, election_id: Uuid) -> StoreResult<Vec<Candidate>>;
    async fn create_candidate(&self, candidate: Candidate) -> StoreResult<Candidate>;

    // --- TrusteeSlot -----------------------------------------------------------
    async fn list_trustee_slots(&self, election_id: Uuid) -> StoreResult<Vec<TrusteeSlot>>;
    async fn create_trustee_slot(&self, slot: TrusteeSlot) -> StoreResult<TrusteeSlot>;
    /// §4.1's postcondition in one transaction: the election public key is
    /// written exactly once (`Conflict` if already set) together with one
    /// share per trustee slot, matched by `trustee_index` (`Conflict` if a
    /// slot is missing).
    async fn record_key_ceremony(&self, election_id: Uuid, public_key_b64: String, shares: Vec<SharePackage>) -> StoreResult<()>;
    /// Records a trustee's batch of partial decryptions and marks
    /// `shares_submitted = true` for that trustee.
    async fn submit_decryption_shares(&self, election_id: Uuid, batch: DecryptionShareBatch) -> StoreResult<()>;

    // --- CodeEntry ---------------------------------------------------------
    async fn get_code_entry(&self, voter_id: Uuid, election_id: Uuid) -> StoreResult<Option<CodeEntry>>;
    async fn find_code_entry_by_main_code(&self, election_id: Uuid, main_code: &str) -> StoreResult<Option<CodeEntry>>;
    async fn list_code_entries(&self, election_id: Uuid) -> StoreResult<Vec<CodeEntry>>;
    /// Inserts unless the `(voter_id, election_id)` pair already has an
    /// entry, in which case it is silently skipped and the existing entry
    /// returned (§4.2 idempotency).
    async fn insert_code_entry_if_absent(&self, entry: CodeEntry) -> StoreResult<CodeEntry>;

    /// §4.3 steps 1, 4 and 5 in a single transaction: locates the code
    /// entry by `(election_id, main_code)`, fails `NotFound` if absent or
    /// `Conflict` if already consumed, inserts `token`, and marks the code
    /// used — all atomically, so a failure partway through leaves neither
    /// the token nor the `main_code_used` flag written (§8 property 5,
    /// scenario S5).
    async fn issue_token(&self, election_id: Uuid, main_code: &str, token: AnonymousToken) -> StoreResult<AnonymousToken>;
    /// Inserts `token` without consuming a main code, for §4.3's MVP
    /// "Fallback direct issuance" path. `voting-core` gates whether this is
    /// ever called; the store has no opinion on debug mode.
    async fn insert_token_direct(&self, token: AnonymousToken) -> StoreResult<AnonymousToken>;

    // --- AnonymousToken ------------------------------------------------------
    async fn find_token_by_hash(&self, election_id: Uuid, token_hash: &str) -> StoreResult<Option<AnonymousToken>>;

    // --- Ballot --------------------------------------------------------------
    async fn ballot_hash_exists(&self, election_id: Uuid, ballot_hash: &str) -> StoreResult<bool>;
    /// §4.4's single transaction covering the duplicate-ballot check,
    /// ballot insert and token-used update. `Conflict` indicates a
    /// concurrent cast already consumed `token_id` or claimed
    /// `ballot.ballot_hash` first (§8 properties 4 and 5).
    async fn cast_ballot(&self, token_id: Uuid, ballot: Ballot) -> StoreResult<Ballot>;
    /// Ordered by id, per §4.5's "for each Ballot in id order".
    async fn list_ballots(&self, election_id: Uuid) -> StoreResult<Vec<Ballot>>;

    // --- BulletinEntry ---------------------------------------------------------
    async fn latest_bulletin_entry(&self, election_id: Uuid) -> StoreResult<Option<BulletinEntry>>;
    /// Appends `entry`, which the caller built from a `latest_bulletin_entry`
    /// snapshot. Implementations serialize concurrent appends to the same
    /// election (§5); if another append won the race since the caller's
    /// snapshot, this returns `StoreError::Conflict` and the caller
    /// (`BulletinChain::append`) re-reads the tip and retries.
    async fn append_bulletin_entry(&self, entry: BulletinEntry) -> StoreResult<BulletinEntry>;
    async fn list_bulletin_entries(&self, election_id: Uuid) -> StoreResult<Vec<BulletinEntry>>;

    // --- ElectionResult --------------------------------------------------------
    /// §4.5's single transaction covering every `ElectionResult` upsert
    /// and the `CLOSED -> TALLIED` status transition.
    async fn finalize_tally(&self, election_id: Uuid, results: Vec<ElectionResult>) -> StoreResult<()>;
    async fn list_results(&self, election_id: Uuid) -> StoreResult<Vec<ElectionResult>>;
}
