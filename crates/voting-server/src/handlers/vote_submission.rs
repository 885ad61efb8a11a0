//! `/vote-submission/submit` (§4.4, §6): the BallotCast contract.

use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use voting_types::EncryptedVote;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Bounds how large a ZKP proof blob this server will store verbatim. The
/// blob is never verified (§4.4 Open Question 2); a size bound keeps an
/// unverified field from being a free-form storage-exhaustion vector.
const MAX_PROOF_BLOB_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct SubmitVoteRequest {
    pub election_id: Uuid,
    pub encrypted_vote: EncryptedVote,
    /// Accepted and persisted verbatim but NOT cryptographically verified
    /// by this implementation (§4.4). Named `proof` on the wire, matching
    /// the distilled contract, but stored internally as `proof_blob`
    /// (`voting_types::Ballot::proof_blob`) so the "unverified" status
    /// stays visible to anyone reading the stored row.
    pub proof: Value,
    pub token_hash_hex: String,
    pub token_signature_b64: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitVoteResponse {
    pub ballot_hash: String,
    pub verification_code: String,
    pub vote_hash: String,
}

pub async fn submit(State(state): State<AppState>, Json(req): Json<SubmitVoteRequest>) -> ApiResult<Json<SubmitVoteResponse>> {
    let proof_size = serde_json::to_vec(&req.proof).map(|b| b.len()).unwrap_or(usize::MAX);
    if proof_size > MAX_PROOF_BLOB_BYTES {
        return Err(ApiError::BadRequest(format!(
            "proof blob exceeds the {MAX_PROOF_BLOB_BYTES}-byte limit"
        )));
    }

    let token_signature = BASE64
        .decode(&req.token_signature_b64)
        .map_err(|e| ApiError::BadRequest(format!("token_signature_b64 is not valid base64: {e}")))?;

    let outcome = voting_core::cast(
        state.store.as_ref(),
        &state.authority,
        req.election_id,
        req.encrypted_vote,
        req.proof,
        &req.token_hash_hex,
        &token_signature,
    )
    .await?;

    crate::handlers::bulletin::try_append(
        state.store.as_ref(),
        &state.authority,
        req.election_id,
        voting_types::BulletinEventType::BallotCast,
        serde_json::json!({ "ballot_hash": outcome.ballot_hash, "verification_code": outcome.verification_code }),
    )
    .await;

    Ok(Json(SubmitVoteResponse {
        ballot_hash: outcome.ballot_hash,
        verification_code: outcome.verification_code,
        vote_hash: outcome.vote_hash,
    }))
}
