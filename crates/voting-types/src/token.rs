//! AnonymousToken — the blind-signed, unlinkable voting credential (§3, §4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymousToken {
    pub id: Uuid,
    pub election_id: Uuid,
    /// sha256(blinded_message), hex. The only identifier the core ever
    /// associates with this token — never the main code or voter id.
    pub token_hash: String,
    /// (blinded_message)^d mod n, big-endian bytes. The client unblinds
    /// this; the server never sees the unblinded signature until a ballot
    /// referencing it is cast.
    pub blinded_signature: Vec<u8>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

impl AnonymousToken {
    pub fn new(election_id: Uuid, token_hash: String, blinded_signature: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            election_id,
            token_hash,
            blinded_signature,
            is_used: false,
            used_at: None,
        }
    }
}
