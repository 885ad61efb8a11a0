//! `/code-sheet/generate-bulk` (§4.2, §6).

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// Eligibility (KYC, active flag, admin exclusion) is decided upstream of
/// the core (§4.2 "Voter eligibility contract"); the wire body therefore
/// carries the already-filtered voter id list rather than the core
/// querying a users table itself.
#[derive(Debug, Deserialize)]
pub struct GenerateBulkRequest {
    pub election_id: Uuid,
    pub eligible_voters: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CodeRow {
    pub voter_id: Uuid,
    pub main_code: String,
    pub candidate_codes: HashMap<Uuid, String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateBulkResponse {
    pub total_voters: usize,
    pub codes_generated: usize,
    pub codes: Vec<CodeRow>,
}

pub async fn generate_bulk(State(state): State<AppState>, Json(req): Json<GenerateBulkRequest>) -> ApiResult<Json<GenerateBulkResponse>> {
    let entries = voting_core::generate_code_sheet(state.store.as_ref(), req.election_id, &req.eligible_voters).await?;

    let codes = entries
        .iter()
        .map(|e| CodeRow { voter_id: e.voter_id, main_code: e.main_code.clone(), candidate_codes: e.candidate_codes.clone() })
        .collect::<Vec<_>>();

    Ok(Json(GenerateBulkResponse {
        total_voters: req.eligible_voters.len(),
        codes_generated: codes.len(),
        codes,
    }))
}
