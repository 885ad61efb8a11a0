//! `/bulletin/*` (§4.6, §6): manual append, chain listing and verification.
//!
//! [`try_append`] is also used by every other handler that needs to record
//! an event as a side effect of its primary transaction (election created,
//! key generated, ballot cast, ...). Per §7(v), a bulletin append is
//! best-effort: its failure is logged at ERROR but never rolled back or
//! surfaced as a failure of the request that produced the event.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use voting_crypto::AuthorityKeys;
use voting_store::Store;
use voting_types::BulletinEventType;

use crate::error::ApiResult;
use crate::state::AppState;

/// Appends `entry_type`/`payload` for `election_id` and swallows any
/// failure after logging it, so callers never let a bulletin hiccup abort
/// the transaction that already committed.
pub async fn try_append(store: &dyn Store, authority: &AuthorityKeys, election_id: Uuid, entry_type: BulletinEventType, payload: Value) {
    if let Err(err) = voting_core::bulletin_append(store, authority, election_id, entry_type, payload).await {
        tracing::error!(election_id = %election_id, entry_type = %entry_type, error = %err, "bulletin append failed; primary transaction already committed");
    }
}

#[derive(Debug, Deserialize)]
pub struct AppendRequest {
    pub election_id: Uuid,
    pub entry_type: BulletinEventType,
    pub entry_data: Value,
}

#[derive(Debug, Serialize)]
pub struct AppendResponse {
    pub entry_id: Uuid,
    pub entry_hash: String,
    pub previous_hash: String,
}

/// The one handler where an append failure IS the request's outcome: a
/// caller hitting this endpoint directly is asking to append, so unlike
/// [`try_append`]'s internal callers there is no separate primary
/// transaction to protect.
pub async fn append(State(state): State<AppState>, Json(req): Json<AppendRequest>) -> ApiResult<Json<AppendResponse>> {
    let entry = voting_core::bulletin_append(state.store.as_ref(), &state.authority, req.election_id, req.entry_type, req.entry_data).await?;
    Ok(Json(AppendResponse {
        entry_id: entry.id,
        entry_hash: entry.entry_hash,
        previous_hash: entry.previous_hash,
    }))
}

#[derive(Debug, Serialize)]
pub struct ChainRow {
    pub seq: u64,
    #[serde(rename = "type")]
    pub entry_type: BulletinEventType,
    pub hash: String,
    pub prev: String,
    pub data: Value,
    pub time: chrono::DateTime<chrono::Utc>,
}

pub async fn chain(State(state): State<AppState>, Path(election_id): Path<Uuid>) -> ApiResult<Json<Vec<ChainRow>>> {
    let entries = state
        .store
        .list_bulletin_entries(election_id)
        .await
        .map_err(|e| crate::error::ApiError::Core(voting_types::error::CoreError::Store(e.to_string())))?;

    Ok(Json(
        entries
            .into_iter()
            .map(|e| ChainRow {
                seq: e.sequence,
                entry_type: e.entry_type,
                hash: e.entry_hash,
                prev: e.previous_hash,
                data: e.entry_data,
                time: e.created_at,
            })
            .collect(),
    ))
}

pub async fn verify(State(state): State<AppState>, Path(election_id): Path<Uuid>) -> ApiResult<Json<voting_core::ChainVerification>> {
    let verifying_key = voting_crypto::bulletin_sign::verifying_key_from_signing(state.authority.ed25519_signing_key());
    let result = voting_core::bulletin_verify(state.store.as_ref(), &verifying_key, election_id).await?;
    Ok(Json(result))
}
