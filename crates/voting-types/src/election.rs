//! Election and Candidate domain types (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Four-variant election lifecycle. Replaces the distilled spec's stringly
/// typed status with a tagged enum and an explicit transition table, per
/// the Design Notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElectionStatus {
    Draft,
    Active,
    Closed,
    Tallied,
}

impl ElectionStatus {
    /// Monotone transitions only; an administrative reset is not modeled
    /// here because it is out of the core's scope (§1).
    pub fn can_transition_to(self, next: ElectionStatus) -> bool {
        use ElectionStatus::*;
        matches!(
            (self, next),
            (Draft, Active) | (Active, Closed) | (Closed, Tallied)
        )
    }
}

impl std::fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ElectionStatus::Draft => "DRAFT",
            ElectionStatus::Active => "ACTIVE",
            ElectionStatus::Closed => "CLOSED",
            ElectionStatus::Tallied => "TALLIED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Election {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ElectionStatus,
    pub threshold_t: u32,
    pub total_trustees_n: u32,
    /// 32-byte X25519 public key, base64. Written exactly once by the key
    /// ceremony and thereafter immutable.
    pub public_key_b64: Option<String>,
}

impl Election {
    pub fn has_public_key(&self) -> bool {
        self.public_key_b64.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub election_id: Uuid,
    /// Unique within the election.
    pub display_order: i32,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotone() {
        use ElectionStatus::*;
        assert!(Draft.can_transition_to(Active));
        assert!(Active.can_transition_to(Closed));
        assert!(Closed.can_transition_to(Tallied));
        assert!(!Draft.can_transition_to(Closed));
        assert!(!Tallied.can_transition_to(Draft));
        assert!(!Active.can_transition_to(Active));
    }
}
