//! CodeEntry — per (voter, election) main code and candidate codes (§3, §4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeEntry {
    pub id: Uuid,
    pub voter_id: Uuid,
    pub election_id: Uuid,
    /// 16 random bytes, hex-encoded: the one-shot credential redeemed at
    /// `/token/request-signature`.
    pub main_code: String,
    /// candidate_id -> 4 random bytes, hex-encoded. Lets the voter
    /// recognize which candidate they voted for on a published receipt
    /// without revealing the vote to anyone else.
    pub candidate_codes: HashMap<Uuid, String>,
    pub main_code_used: bool,
    pub main_code_used_at: Option<DateTime<Utc>>,
}

impl CodeEntry {
    pub fn new(voter_id: Uuid, election_id: Uuid, main_code: String, candidate_codes: HashMap<Uuid, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            voter_id,
            election_id,
            main_code,
            candidate_codes,
            main_code_used: false,
            main_code_used_at: None,
        }
    }
}
