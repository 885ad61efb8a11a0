//! BulletinEntry — the hash-linked, append-only event log (§3, §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tagged discriminant for every event the bulletin board records.
/// Replaces the distilled spec's stringly typed `entry_type` with a
/// compile-time enum per the Design Notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulletinEventType {
    ElectionCreated,
    KeyGenerated,
    BallotCast,
    ElectionClosed,
    TrusteeShare,
    ResultPublished,
}

impl std::fmt::Display for BulletinEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BulletinEventType::ElectionCreated => "ELECTION_CREATED",
            BulletinEventType::KeyGenerated => "KEY_GENERATED",
            BulletinEventType::BallotCast => "BALLOT_CAST",
            BulletinEventType::ElectionClosed => "ELECTION_CLOSED",
            BulletinEventType::TrusteeShare => "TRUSTEE_SHARE",
            BulletinEventType::ResultPublished => "RESULT_PUBLISHED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletinEntry {
    pub id: Uuid,
    pub election_id: Uuid,
    /// 1-based, monotone and gap-free within an election.
    pub sequence: u64,
    pub entry_type: BulletinEventType,
    pub entry_data: serde_json::Value,
    /// sha256( canonical_json(entry_data) || previous_hash ), hex.
    pub entry_hash: String,
    /// Entry hash of the immediate predecessor; empty string at sequence 1.
    pub previous_hash: String,
    /// Ed25519 signature over `entry_hash` by the authority's bulletin
    /// signing key, base64. A second, independent tamper-evidence check
    /// beyond the hash chain (§4.6 "Authority signature field").
    pub authority_signature_b64: String,
    pub created_at: DateTime<Utc>,
}
