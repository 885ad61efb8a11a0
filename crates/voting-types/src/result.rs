//! ElectionResult — per (election, candidate) tally output (§3, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionResult {
    pub election_id: Uuid,
    pub candidate_id: Uuid,
    pub vote_count: u64,
    pub tallied_at: DateTime<Utc>,
    pub verified: bool,
}
