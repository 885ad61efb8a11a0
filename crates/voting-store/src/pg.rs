//! Postgres-backed [`Store`] via `sqlx`. Every composite/transactional
//! method opens one `sqlx::Transaction` and commits once at the end,
//! matching the boundaries in SPEC_FULL.md §5.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;
use voting_types::{
    AnonymousToken, Ballot, BulletinEntry, BulletinEventType, Candidate, CodeEntry, Election,
    ElectionResult, ElectionStatus, SharePackage, TrusteeSlot,
};

use crate::{DecryptionShareBatch, Store, StoreError, StoreResult};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates every table this store needs if they are not already
    /// present. A real deployment runs migrations out-of-band (out of
    /// scope per §1); this exists so a fresh `DATABASE_URL` is usable
    /// without a separate migration tool during development.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(SCHEMA_DDL).execute(&self.pool).await?;
        Ok(())
    }
}

const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS elections (
    id UUID PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    start_time TIMESTAMPTZ NOT NULL,
    end_time TIMESTAMPTZ NOT NULL,
    status TEXT NOT NULL,
    threshold_t INTEGER NOT NULL,
    total_trustees_n INTEGER NOT NULL,
    public_key_b64 TEXT
);

CREATE TABLE IF NOT EXISTS candidates (
    id UUID PRIMARY KEY,
    election_id UUID NOT NULL REFERENCES elections(id),
    display_order INTEGER NOT NULL,
    label TEXT NOT NULL,
    UNIQUE (election_id, display_order)
);

CREATE TABLE IF NOT EXISTS trustee_slots (
    id UUID PRIMARY KEY,
    election_id UUID NOT NULL REFERENCES elections(id),
    voter_id UUID NOT NULL,
    trustee_index INTEGER NOT NULL,
    share JSONB,
    shares_submitted BOOLEAN NOT NULL DEFAULT FALSE,
    partial_decryptions JSONB NOT NULL DEFAULT '{}',
    UNIQUE (election_id, trustee_index)
);

CREATE TABLE IF NOT EXISTS code_entries (
    id UUID PRIMARY KEY,
    voter_id UUID NOT NULL,
    election_id UUID NOT NULL REFERENCES elections(id),
    main_code TEXT NOT NULL,
    candidate_codes JSONB NOT NULL,
    main_code_used BOOLEAN NOT NULL DEFAULT FALSE,
    main_code_used_at TIMESTAMPTZ,
    UNIQUE (voter_id, election_id)
);

CREATE TABLE IF NOT EXISTS anonymous_tokens (
    id UUID PRIMARY KEY,
    election_id UUID NOT NULL REFERENCES elections(id),
    token_hash TEXT NOT NULL,
    blinded_signature BYTEA NOT NULL,
    is_used BOOLEAN NOT NULL DEFAULT FALSE,
    used_at TIMESTAMPTZ,
    UNIQUE (election_id, token_hash)
);

CREATE TABLE IF NOT EXISTS ballots (
    id UUID PRIMARY KEY,
    election_id UUID NOT NULL REFERENCES elections(id),
    encrypted_vote JSONB NOT NULL,
    ballot_hash TEXT NOT NULL,
    verification_code TEXT NOT NULL,
    proof_blob JSONB NOT NULL,
    token_hash TEXT NOT NULL,
    token_signature BYTEA NOT NULL,
    cast_at TIMESTAMPTZ NOT NULL,
    UNIQUE (election_id, ballot_hash)
);

CREATE TABLE IF NOT EXISTS bulletin_entries (
    id UUID PRIMARY KEY,
    election_id UUID NOT NULL,
    sequence BIGINT NOT NULL,
    entry_type TEXT NOT NULL,
    entry_data JSONB NOT NULL,
    entry_hash TEXT NOT NULL,
    previous_hash TEXT NOT NULL,
    authority_signature_b64 TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    UNIQUE (election_id, sequence)
);

CREATE TABLE IF NOT EXISTS election_results (
    election_id UUID NOT NULL REFERENCES elections(id),
    candidate_id UUID NOT NULL,
    vote_count BIGINT NOT NULL,
    tallied_at TIMESTAMPTZ NOT NULL,
    verified BOOLEAN NOT NULL,
    PRIMARY KEY (election_id, candidate_id)
);
"#;

fn backend_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn status_str(status: ElectionStatus) -> &'static str {
    match status {
        ElectionStatus::Draft => "DRAFT",
        ElectionStatus::Active => "ACTIVE",
        ElectionStatus::Closed => "CLOSED",
        ElectionStatus::Tallied => "TALLIED",
    }
}

fn parse_status(s: &str) -> Result<ElectionStatus, StoreError> {
    match s {
        "DRAFT" => Ok(ElectionStatus::Draft),
        "ACTIVE" => Ok(ElectionStatus::Active),
        "CLOSED" => Ok(ElectionStatus::Closed),
        "TALLIED" => Ok(ElectionStatus::Tallied),
        other => Err(StoreError::Backend(format!("unknown election status {other}"))),
    }
}

fn election_from_row(row: &sqlx::postgres::PgRow) -> Result<Election, StoreError> {
    let status: String = row.try_get("status").map_err(backend_err)?;
    Ok(Election {
        id: row.try_get("id").map_err(backend_err)?,
        title: row.try_get("title").map_err(backend_err)?,
        description: row.try_get("description").map_err(backend_err)?,
        start_time: row.try_get::<DateTime<Utc>, _>("start_time").map_err(backend_err)?,
        end_time: row.try_get::<DateTime<Utc>, _>("end_time").map_err(backend_err)?,
        status: parse_status(&status)?,
        threshold_t: row.try_get::<i32, _>("threshold_t").map_err(backend_err)? as u32,
        total_trustees_n: row.try_get::<i32, _>("total_trustees_n").map_err(backend_err)? as u32,
        public_key_b64: row.try_get("public_key_b64").map_err(backend_err)?,
    })
}

fn candidate_from_row(row: &sqlx::postgres::PgRow) -> Result<Candidate, StoreError> {
    Ok(Candidate {
        id: row.try_get("id").map_err(backend_err)?,
        election_id: row.try_get("election_id").map_err(backend_err)?,
        display_order: row.try_get("display_order").map_err(backend_err)?,
        label: row.try_get("label").map_err(backend_err)?,
    })
}

fn trustee_slot_from_row(row: &sqlx::postgres::PgRow) -> Result<TrusteeSlot, StoreError> {
    let share_json: Option<Json> = row.try_get("share").map_err(backend_err)?;
    let share: Option<SharePackage> = share_json
        .map(|v| serde_json::from_value(v).map_err(|e| StoreError::Backend(e.to_string())))
        .transpose()?;
    let partials_json: Json = row.try_get("partial_decryptions").map_err(backend_err)?;
    let partial_decryptions = serde_json::from_value(partials_json).map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(TrusteeSlot {
        id: row.try_get("id").map_err(backend_err)?,
        election_id: row.try_get("election_id").map_err(backend_err)?,
        voter_id: row.try_get("voter_id").map_err(backend_err)?,
        trustee_index: row.try_get::<i32, _>("trustee_index").map_err(backend_err)? as u32,
        share,
        shares_submitted: row.try_get("shares_submitted").map_err(backend_err)?,
        partial_decryptions,
    })
}

fn code_entry_from_row(row: &sqlx::postgres::PgRow) -> Result<CodeEntry, StoreError> {
    let codes_json: Json = row.try_get("candidate_codes").map_err(backend_err)?;
    Ok(CodeEntry {
        id: row.try_get("id").map_err(backend_err)?,
        voter_id: row.try_get("voter_id").map_err(backend_err)?,
        election_id: row.try_get("election_id").map_err(backend_err)?,
        main_code: row.try_get("main_code").map_err(backend_err)?,
        candidate_codes: serde_json::from_value(codes_json).map_err(|e| StoreError::Backend(e.to_string()))?,
        main_code_used: row.try_get("main_code_used").map_err(backend_err)?,
        main_code_used_at: row.try_get("main_code_used_at").map_err(backend_err)?,
    })
}

fn token_from_row(row: &sqlx::postgres::PgRow) -> Result<AnonymousToken, StoreError> {
    Ok(AnonymousToken {
        id: row.try_get("id").map_err(backend_err)?,
        election_id: row.try_get("election_id").map_err(backend_err)?,
        token_hash: row.try_get("token_hash").map_err(backend_err)?,
        blinded_signature: row.try_get("blinded_signature").map_err(backend_err)?,
        is_used: row.try_get("is_used").map_err(backend_err)?,
        used_at: row.try_get("used_at").map_err(backend_err)?,
    })
}

fn ballot_from_row(row: &sqlx::postgres::PgRow) -> Result<Ballot, StoreError> {
    let vote_json: Json = row.try_get("encrypted_vote").map_err(backend_err)?;
    Ok(Ballot {
        id: row.try_get("id").map_err(backend_err)?,
        election_id: row.try_get("election_id").map_err(backend_err)?,
        encrypted_vote: serde_json::from_value(vote_json).map_err(|e| StoreError::Backend(e.to_string()))?,
        ballot_hash: row.try_get("ballot_hash").map_err(backend_err)?,
        verification_code: row.try_get("verification_code").map_err(backend_err)?,
        proof_blob: row.try_get("proof_blob").map_err(backend_err)?,
        token_hash: row.try_get("token_hash").map_err(backend_err)?,
        token_signature: row.try_get("token_signature").map_err(backend_err)?,
        cast_at: row.try_get("cast_at").map_err(backend_err)?,
    })
}

fn bulletin_entry_from_row(row: &sqlx::postgres::PgRow) -> Result<BulletinEntry, StoreError> {
    let entry_type: String = row.try_get("entry_type").map_err(backend_err)?;
    Ok(BulletinEntry {
        id: row.try_get("id").map_err(backend_err)?,
        election_id: row.try_get("election_id").map_err(backend_err)?,
        sequence: row.try_get::<i64, _>("sequence").map_err(backend_err)? as u64,
        entry_type: parse_event_type(&entry_type)?,
        entry_data: row.try_get("entry_data").map_err(backend_err)?,
        entry_hash: row.try_get("entry_hash").map_err(backend_err)?,
        previous_hash: row.try_get("previous_hash").map_err(backend_err)?,
        authority_signature_b64: row.try_get("authority_signature_b64").map_err(backend_err)?,
        created_at: row.try_get("created_at").map_err(backend_err)?,
    })
}

fn parse_event_type(s: &str) -> Result<BulletinEventType, StoreError> {
    match s {
        "ELECTION_CREATED" => Ok(BulletinEventType::ElectionCreated),
        "KEY_GENERATED" => Ok(BulletinEventType::KeyGenerated),
        "BALLOT_CAST" => Ok(BulletinEventType::BallotCast),
        "ELECTION_CLOSED" => Ok(BulletinEventType::ElectionClosed),
        "TRUSTEE_SHARE" => Ok(BulletinEventType::TrusteeShare),
        "RESULT_PUBLISHED" => Ok(BulletinEventType::ResultPublished),
        other => Err(StoreError::Backend(format!("unknown bulletin event type {other}"))),
    }
}

fn result_from_row(row: &sqlx::postgres::PgRow) -> Result<ElectionResult, StoreError> {
    Ok(ElectionResult {
        election_id: row.try_get("election_id").map_err(backend_err)?,
        candidate_id: row.try_get("candidate_id").map_err(backend_err)?,
        vote_count: row.try_get::<i64, _>("vote_count").map_err(backend_err)? as u64,
        tallied_at: row.try_get("tallied_at").map_err(backend_err)?,
        verified: row.try_get("verified").map_err(backend_err)?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn get_election(&self, election_id: Uuid) -> StoreResult<Election> {
        let row = sqlx::query("SELECT * FROM elections WHERE id = $1")
            .bind(election_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?
            .ok_or_else(|| StoreError::NotFound(format!("election {election_id}")))?;
        election_from_row(&row)
    }

    async fn create_election(&self, election: Election) -> StoreResult<Election> {
        sqlx::query(
            "INSERT INTO elections (id, title, description, start_time, end_time, status, threshold_t, total_trustees_n, public_key_b64)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(election.id)
        .bind(&election.title)
        .bind(&election.description)
        .bind(election.start_time)
        .bind(election.end_time)
        .bind(status_str(election.status))
        .bind(election.threshold_t as i32)
        .bind(election.total_trustees_n as i32)
        .bind(&election.public_key_b64)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(election)
    }

    async fn set_election_status(&self, election_id: Uuid, status: ElectionStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE elections SET status = $1 WHERE id = $2")
            .bind(status_str(status))
            .bind(election_id)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("election {election_id}")));
        }
        Ok(())
    }

    async fn list_candidates(&self, election_id: Uuid) -> StoreResult<Vec<Candidate>> {
        let rows = sqlx::query("SELECT * FROM candidates WHERE election_id = $1 ORDER BY display_order")
            .bind(election_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        rows.iter().map(candidate_from_row).collect()
    }

    async fn create_candidate(&self, candidate: Candidate) -> StoreResult<Candidate> {
        sqlx::query("INSERT INTO candidates (id, election_id, display_order, label) VALUES ($1, $2, $3, $4)")
            .bind(candidate.id)
            .bind(candidate.election_id)
            .bind(candidate.display_order)
            .bind(&candidate.label)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(candidate)
    }

    async fn list_trustee_slots(&self, election_id: Uuid) -> StoreResult<Vec<TrusteeSlot>> {
        let rows = sqlx::query("SELECT * FROM trustee_slots WHERE election_id = $1 ORDER BY trustee_index")
            .bind(election_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        rows.iter().map(trustee_slot_from_row).collect()
    }

    async fn create_trustee_slot(&self, slot: TrusteeSlot) -> StoreResult<TrusteeSlot> {
        sqlx::query(
            "INSERT INTO trustee_slots (id, election_id, voter_id, trustee_index, share, shares_submitted, partial_decryptions)
             VALUES ($1, $2, $3, $4, NULL, FALSE, '{}')",
        )
        .bind(slot.id)
        .bind(slot.election_id)
        .bind(slot.voter_id)
        .bind(slot.trustee_index as i32)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(slot)
    }

    async fn assign_shares(&self, election_id: Uuid, shares: Vec<SharePackage>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend_err)?;
        for share in shares {
            let share_json = serde_json::to_value(&share).map_err(|e| StoreError::Backend(e.to_string()))?;
            let result = sqlx::query(
                "UPDATE trustee_slots SET share = $1 WHERE election_id = $2 AND trustee_index = $3",
            )
            .bind(share_json)
            .bind(election_id)
            .bind(share.trustee_index as i32)
            .execute(&mut *tx)
            .await
            .map_err(backend_err)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Conflict(format!(
                    "no trustee slot with index {} for election {election_id}",
                    share.trustee_index
                )));
            }
        }
        tx.commit().await.map_err(backend_err)?;
        Ok(())
    }

    async fn submit_decryption_shares(&self, election_id: Uuid, batch: DecryptionShareBatch) -> StoreResult<()> {
        let partial_map: std::collections::HashMap<Uuid, voting_types::trustee::PartialDecryption> = {
            let row = sqlx::query(
                "SELECT trustee_index, partial_decryptions FROM trustee_slots WHERE election_id = $1 AND voter_id = $2",
            )
            .bind(election_id)
            .bind(batch.trustee_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?
            .ok_or_else(|| StoreError::NotFound(format!("trustee slot for voter {}", batch.trustee_id)))?;

            let trustee_index: i32 = row.try_get("trustee_index").map_err(backend_err)?;
            let existing_json: Json = row.try_get("partial_decryptions").map_err(backend_err)?;
            let mut existing: std::collections::HashMap<Uuid, voting_types::trustee::PartialDecryption> =
                serde_json::from_value(existing_json).map_err(|e| StoreError::Backend(e.to_string()))?;
            for (ballot_id, partial_hex) in batch.shares {
                existing.insert(
                    ballot_id,
                    voting_types::trustee::PartialDecryption {
                        trustee_index: trustee_index as u32,
                        ballot_id,
                        partial_hex,
                    },
                );
            }
            existing
        };

        let merged_json = serde_json::to_value(&partial_map).map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query(
            "UPDATE trustee_slots SET partial_decryptions = $1, shares_submitted = TRUE WHERE election_id = $2 AND voter_id = $3",
        )
        .bind(merged_json)
        .bind(election_id)
        .bind(batch.trustee_id)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn get_code_entry(&self, voter_id: Uuid, election_id: Uuid) -> StoreResult<Option<CodeEntry>> {
        let row = sqlx::query("SELECT * FROM code_entries WHERE voter_id = $1 AND election_id = $2")
            .bind(voter_id)
            .bind(election_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        row.as_ref().map(code_entry_from_row).transpose()
    }

    async fn find_code_entry_by_main_code(&self, election_id: Uuid, main_code: &str) -> StoreResult<Option<CodeEntry>> {
        let row = sqlx::query("SELECT * FROM code_entries WHERE election_id = $1 AND main_code = $2")
            .bind(election_id)
            .bind(main_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        row.as_ref().map(code_entry_from_row).transpose()
    }

    async fn list_code_entries(&self, election_id: Uuid) -> StoreResult<Vec<CodeEntry>> {
        let rows = sqlx::query("SELECT * FROM code_entries WHERE election_id = $1")
            .bind(election_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        rows.iter().map(code_entry_from_row).collect()
    }

    async fn insert_code_entry_if_absent(&self, entry: CodeEntry) -> StoreResult<CodeEntry> {
        let codes_json = serde_json::to_value(&entry.candidate_codes).map_err(|e| StoreError::Backend(e.to_string()))?;
        let row = sqlx::query(
            "INSERT INTO code_entries (id, voter_id, election_id, main_code, candidate_codes, main_code_used)
             VALUES ($1, $2, $3, $4, $5, FALSE)
             ON CONFLICT (voter_id, election_id) DO UPDATE SET voter_id = code_entries.voter_id
             RETURNING *",
        )
        .bind(entry.id)
        .bind(entry.voter_id)
        .bind(entry.election_id)
        .bind(&entry.main_code)
        .bind(codes_json)
        .fetch_one(&self.pool)
        .await
        .map_err(backend_err)?;
        code_entry_from_row(&row)
    }

    async fn issue_token(&self, election_id: Uuid, main_code: &str, token: AnonymousToken) -> StoreResult<AnonymousToken> {
        let mut tx = self.pool.begin().await.map_err(backend_err)?;

        let code_row = sqlx::query(
            "SELECT id, main_code_used FROM code_entries WHERE election_id = $1 AND main_code = $2 FOR UPDATE",
        )
        .bind(election_id)
        .bind(main_code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend_err)?
        .ok_or_else(|| StoreError::NotFound("main code not found".into()))?;

        let already_used: bool = code_row.try_get("main_code_used").map_err(backend_err)?;
        if already_used {
            return Err(StoreError::Conflict("main code already consumed".into()));
        }
        let code_entry_id: Uuid = code_row.try_get("id").map_err(backend_err)?;

        sqlx::query(
            "INSERT INTO anonymous_tokens (id, election_id, token_hash, blinded_signature, is_used)
             VALUES ($1, $2, $3, $4, FALSE)",
        )
        .bind(token.id)
        .bind(token.election_id)
        .bind(&token.token_hash)
        .bind(&token.blinded_signature)
        .execute(&mut *tx)
        .await
        .map_err(backend_err)?;

        sqlx::query("UPDATE code_entries SET main_code_used = TRUE, main_code_used_at = now() WHERE id = $1")
            .bind(code_entry_id)
            .execute(&mut *tx)
            .await
            .map_err(backend_err)?;

        tx.commit().await.map_err(backend_err)?;
        Ok(token)
    }

    async fn insert_token_direct(&self, token: AnonymousToken) -> StoreResult<AnonymousToken> {
        sqlx::query(
            "INSERT INTO anonymous_tokens (id, election_id, token_hash, blinded_signature, is_used)
             VALUES ($1, $2, $3, $4, FALSE)",
        )
        .bind(token.id)
        .bind(token.election_id)
        .bind(&token.token_hash)
        .bind(&token.blinded_signature)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(token)
    }

    async fn find_token_by_hash(&self, election_id: Uuid, token_hash: &str) -> StoreResult<Option<AnonymousToken>> {
        let row = sqlx::query("SELECT * FROM anonymous_tokens WHERE election_id = $1 AND token_hash = $2")
            .bind(election_id)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        row.as_ref().map(token_from_row).transpose()
    }

    async fn ballot_hash_exists(&self, election_id: Uuid, ballot_hash: &str) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 as present FROM ballots WHERE election_id = $1 AND ballot_hash = $2")
            .bind(election_id)
            .bind(ballot_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(row.is_some())
    }

    async fn cast_ballot(&self, token_id: Uuid, ballot: Ballot) -> StoreResult<Ballot> {
        let mut tx = self.pool.begin().await.map_err(backend_err)?;

        let marked = sqlx::query(
            "UPDATE anonymous_tokens SET is_used = TRUE, used_at = now() WHERE id = $1 AND is_used = FALSE",
        )
        .bind(token_id)
        .execute(&mut *tx)
        .await
        .map_err(backend_err)?;
        if marked.rows_affected() == 0 {
            return Err(StoreError::Conflict("token already used".into()));
        }

        let vote_json = serde_json::to_value(&ballot.encrypted_vote).map_err(|e| StoreError::Backend(e.to_string()))?;
        let insert = sqlx::query(
            "INSERT INTO ballots (id, election_id, encrypted_vote, ballot_hash, verification_code, proof_blob, token_hash, token_signature, cast_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (election_id, ballot_hash) DO NOTHING",
        )
        .bind(ballot.id)
        .bind(ballot.election_id)
        .bind(vote_json)
        .bind(&ballot.ballot_hash)
        .bind(&ballot.verification_code)
        .bind(&ballot.proof_blob)
        .bind(&ballot.token_hash)
        .bind(&ballot.token_signature)
        .bind(ballot.cast_at)
        .execute(&mut *tx)
        .await
        .map_err(backend_err)?;
        if insert.rows_affected() == 0 {
            return Err(StoreError::Conflict("duplicate ballot hash".into()));
        }

        tx.commit().await.map_err(backend_err)?;
        Ok(ballot)
    }

    async fn list_ballots(&self, election_id: Uuid) -> StoreResult<Vec<Ballot>> {
        let rows = sqlx::query("SELECT * FROM ballots WHERE election_id = $1 ORDER BY id")
            .bind(election_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        rows.iter().map(ballot_from_row).collect()
    }

    async fn latest_bulletin_entry(&self, election_id: Uuid) -> StoreResult<Option<BulletinEntry>> {
        let row = sqlx::query("SELECT * FROM bulletin_entries WHERE election_id = $1 ORDER BY sequence DESC LIMIT 1")
            .bind(election_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        row.as_ref().map(bulletin_entry_from_row).transpose()
    }

    async fn append_bulletin_entry(&self, entry: BulletinEntry) -> StoreResult<BulletinEntry> {
        let mut tx = self.pool.begin().await.map_err(backend_err)?;

        // Serializes concurrent appends to the same election: every
        // appender takes the same advisory lock key before re-checking the
        // chain tip, so only one of a racing pair observes a consistent
        // view and commits; the other's INSERT hits the (election_id,
        // sequence) unique constraint and is reported as a conflict.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(entry.election_id)
            .execute(&mut *tx)
            .await
            .map_err(backend_err)?;

        let current_tip = sqlx::query(
            "SELECT sequence, entry_hash FROM bulletin_entries WHERE election_id = $1 ORDER BY sequence DESC LIMIT 1",
        )
        .bind(entry.election_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend_err)?;

        let expected_previous_hash = current_tip
            .as_ref()
            .map(|r| r.try_get::<String, _>("entry_hash"))
            .transpose()
            .map_err(backend_err)?
            .unwrap_or_default();
        let expected_sequence = current_tip
            .as_ref()
            .map(|r| r.try_get::<i64, _>("sequence"))
            .transpose()
            .map_err(backend_err)?
            .map(|s| s as u64 + 1)
            .unwrap_or(1);

        if entry.previous_hash != expected_previous_hash || entry.sequence != expected_sequence {
            return Err(StoreError::Conflict(
                "bulletin chain tip advanced since caller's snapshot; retry".into(),
            ));
        }

        sqlx::query(
            "INSERT INTO bulletin_entries (id, election_id, sequence, entry_type, entry_data, entry_hash, previous_hash, authority_signature_b64, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.id)
        .bind(entry.election_id)
        .bind(entry.sequence as i64)
        .bind(entry.entry_type.to_string())
        .bind(&entry.entry_data)
        .bind(&entry.entry_hash)
        .bind(&entry.previous_hash)
        .bind(&entry.authority_signature_b64)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await
        .map_err(backend_err)?;

        tx.commit().await.map_err(backend_err)?;
        Ok(entry)
    }

    async fn list_bulletin_entries(&self, election_id: Uuid) -> StoreResult<Vec<BulletinEntry>> {
        let rows = sqlx::query("SELECT * FROM bulletin_entries WHERE election_id = $1 ORDER BY sequence")
            .bind(election_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        rows.iter().map(bulletin_entry_from_row).collect()
    }

    async fn finalize_tally(&self, election_id: Uuid, results: Vec<ElectionResult>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend_err)?;
        for result in results {
            sqlx::query(
                "INSERT INTO election_results (election_id, candidate_id, vote_count, tallied_at, verified)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (election_id, candidate_id)
                 DO UPDATE SET vote_count = EXCLUDED.vote_count, tallied_at = EXCLUDED.tallied_at, verified = EXCLUDED.verified",
            )
            .bind(result.election_id)
            .bind(result.candidate_id)
            .bind(result.vote_count as i64)
            .bind(result.tallied_at)
            .bind(result.verified)
            .execute(&mut *tx)
            .await
            .map_err(backend_err)?;
        }
        let updated = sqlx::query("UPDATE elections SET status = 'TALLIED' WHERE id = $1 AND status = 'CLOSED'")
            .bind(election_id)
            .execute(&mut *tx)
            .await
            .map_err(backend_err)?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::Conflict("election is not CLOSED; cannot tally".into()));
        }
        tx.commit().await.map_err(backend_err)?;
        Ok(())
    }

    async fn list_results(&self, election_id: Uuid) -> StoreResult<Vec<ElectionResult>> {
        let rows = sqlx::query("SELECT * FROM election_results WHERE election_id = $1")
            .bind(election_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        rows.iter().map(result_from_row).collect()
    }
}
