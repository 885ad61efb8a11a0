//! TrusteeSlot and the Shamir share package it carries (§3, §4.1).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One point (trustee_index, f(trustee_index)) of the degree-(t-1)
/// polynomial, plus the public parameters needed to verify and recombine
/// it. `y` and `prime` are decimal-string encoded big integers: a 2048-bit
/// prime does not fit in any native integer type and serializing it as a
/// JSON number would silently lose precision in any consumer that parses
/// with an f64, as many JSON libraries outside Rust do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePackage {
    pub trustee_index: u32,
    pub x: u32,
    pub y_decimal: String,
    pub prime_decimal: String,
    pub threshold_t: u32,
    pub total_trustees_n: u32,
    pub key_type: String,
    /// First 16 hex chars of sha256(private key bytes); identifies which
    /// ceremony a share belongs to without revealing the key.
    pub key_id: String,
    /// sha256(x || y || prime || t), hex. Lets a trustee spot-check its
    /// own share against a published commitment without exposing `y`.
    pub proof: String,
}

/// A trustee's single decryption contribution for one ballot: 32 bytes,
/// hex-encoded. The distilled spec stores these as a free-form
/// `ballot_id -> hex string` JSON map; the Design Notes call that an
/// accident of the source and ask for a structured (trustee_index,
/// ballot_id, partial) triple instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartialDecryption {
    pub trustee_index: u32,
    pub ballot_id: Uuid,
    pub partial_hex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrusteeSlot {
    pub id: Uuid,
    pub election_id: Uuid,
    pub voter_id: Uuid,
    pub trustee_index: u32,
    pub share: Option<SharePackage>,
    pub shares_submitted: bool,
    /// ballot_id -> partial decryption, one entry written at most once per
    /// ballot by this trustee.
    pub partial_decryptions: HashMap<Uuid, PartialDecryption>,
}

impl TrusteeSlot {
    pub fn new(election_id: Uuid, voter_id: Uuid, trustee_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            election_id,
            voter_id,
            trustee_index,
            share: None,
            shares_submitted: false,
            partial_decryptions: HashMap::new(),
        }
    }
}
