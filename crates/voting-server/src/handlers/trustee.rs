//! `/trustee/*` — key ceremony and decryption share submission (§4.1, §4.5, §6).

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use voting_store::DecryptionShareBatch;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct KeyCeremonyRequest {
    pub election_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct KeyCeremonyResponse {
    pub threshold: u32,
    pub total_trustees: u32,
    pub public_key: String,
    pub trustees_updated: u32,
}

pub async fn key_ceremony(State(state): State<AppState>, Json(req): Json<KeyCeremonyRequest>) -> ApiResult<Json<KeyCeremonyResponse>> {
    let election = voting_core::run_key_ceremony(state.store.as_ref(), req.election_id).await?;

    crate::handlers::bulletin::try_append(
        state.store.as_ref(),
        &state.authority,
        req.election_id,
        voting_types::BulletinEventType::KeyGenerated,
        serde_json::json!({ "public_key": election.public_key_b64.clone() }),
    )
    .await;

    Ok(Json(KeyCeremonyResponse {
        threshold: election.threshold_t,
        total_trustees: election.total_trustees_n,
        public_key: election.public_key_b64.unwrap_or_default(),
        trustees_updated: election.total_trustees_n,
    }))
}

/// The distilled wire contract names only `{trustee_id, decryption_shares}`
/// for this endpoint, but a trustee's `TrusteeSlot` is scoped per election
/// (§3), so there is no way to route a batch without also knowing which
/// election it belongs to. This implementation adds a required
/// `election_id` field rather than guessing it from ballot ids (recorded
/// in DESIGN.md).
#[derive(Debug, Deserialize)]
pub struct SubmitDecryptionShareRequest {
    pub election_id: Uuid,
    pub trustee_id: Uuid,
    pub decryption_shares: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitDecryptionShareResponse {
    pub shares_count: usize,
}

pub async fn submit_decryption_share(
    State(state): State<AppState>,
    Json(req): Json<SubmitDecryptionShareRequest>,
) -> ApiResult<Json<SubmitDecryptionShareResponse>> {
    let mut shares = Vec::with_capacity(req.decryption_shares.len());
    for (ballot_id_str, partial_hex) in &req.decryption_shares {
        let ballot_id = Uuid::parse_str(ballot_id_str)
            .map_err(|_| ApiError::BadRequest(format!("invalid ballot id {ballot_id_str}")))?;
        hex::decode(partial_hex).map_err(|_| ApiError::BadRequest(format!("partial decryption for {ballot_id_str} is not valid hex")))?;
        shares.push((ballot_id, partial_hex.clone()));
    }
    let shares_count = shares.len();

    state
        .store
        .submit_decryption_shares(req.election_id, DecryptionShareBatch { trustee_id: req.trustee_id, shares })
        .await
        .map_err(|e| ApiError::Core(voting_types::error::CoreError::Store(e.to_string())))?;

    crate::handlers::bulletin::try_append(
        state.store.as_ref(),
        &state.authority,
        req.election_id,
        voting_types::BulletinEventType::TrusteeShare,
        serde_json::json!({ "trustee_id": req.trustee_id, "shares_count": shares_count }),
    )
    .await;

    Ok(Json(SubmitDecryptionShareResponse { shares_count }))
}
