//! `/election/*` — creation, status transitions, tally and results (§6).
//! Candidate CRUD itself is out of the core's scope (§1); this crate only
//! exposes the lifecycle operations the core contracts name.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use voting_types::{Election, ElectionStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateElectionRequest {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub threshold_t: u32,
    pub total_trustees_n: u32,
}

#[derive(Debug, Serialize)]
pub struct CreateElectionResponse {
    pub election_id: Uuid,
}

/// Creates the election DRAFT row and, because §4.1's key ceremony has a
/// precondition of "exactly N trustee slots, none yet carrying a share",
/// provisions the N empty `TrusteeSlot` rows here too. Real trustee
/// identity assignment is an out-of-scope admin/registration concern; this
/// endpoint seeds placeholder `voter_id`s so the ceremony's precondition
/// is satisfiable without inventing a second "assign trustees" endpoint
/// the distilled wire contract never names.
pub async fn create(State(state): State<AppState>, Json(req): Json<CreateElectionRequest>) -> ApiResult<Json<CreateElectionResponse>> {
    if req.threshold_t == 0 || req.threshold_t > req.total_trustees_n {
        return Err(ApiError::BadRequest(format!(
            "threshold_t must satisfy 1 <= t <= total_trustees_n ({} > {})",
            req.threshold_t, req.total_trustees_n
        )));
    }
    if req.end_time <= req.start_time {
        return Err(ApiError::BadRequest("end_time must be after start_time".into()));
    }

    let election = Election {
        id: Uuid::new_v4(),
        title: req.title.clone(),
        description: req.description.clone(),
        start_time: req.start_time,
        end_time: req.end_time,
        status: ElectionStatus::Draft,
        threshold_t: req.threshold_t,
        total_trustees_n: req.total_trustees_n,
        public_key_b64: None,
    };
    let election = state
        .store
        .create_election(election)
        .await
        .map_err(|e| ApiError::Core(voting_types::error::CoreError::Store(e.to_string())))?;

    for index in 1..=req.total_trustees_n {
        state
            .store
            .create_trustee_slot(voting_types::TrusteeSlot::new(election.id, Uuid::new_v4(), index))
            .await
            .map_err(|e| ApiError::Core(voting_types::error::CoreError::Store(e.to_string())))?;
    }

    crate::handlers::bulletin::try_append(
        state.store.as_ref(),
        &state.authority,
        election.id,
        voting_types::BulletinEventType::ElectionCreated,
        serde_json::json!({
            "title": req.title,
            "threshold_t": req.threshold_t,
            "total_trustees_n": req.total_trustees_n,
        }),
    )
    .await;

    Ok(Json(CreateElectionResponse { election_id: election.id }))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: ElectionStatus,
}

#[derive(Debug, Serialize)]
pub struct SetStatusResponse {
    pub old: ElectionStatus,
    pub new: ElectionStatus,
}

pub async fn set_status(
    State(state): State<AppState>,
    Path(election_id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> ApiResult<Json<SetStatusResponse>> {
    let election = state
        .store
        .get_election(election_id)
        .await
        .map_err(|_| ApiError::NotFound(format!("election {election_id} not found")))?;

    if !election.status.can_transition_to(req.status) {
        return Err(ApiError::BadRequest(format!(
            "cannot transition election from {} to {}",
            election.status, req.status
        )));
    }

    state
        .store
        .set_election_status(election_id, req.status)
        .await
        .map_err(|e| ApiError::Core(voting_types::error::CoreError::Store(e.to_string())))?;

    if req.status == ElectionStatus::Closed {
        crate::handlers::bulletin::try_append(
            state.store.as_ref(),
            &state.authority,
            election_id,
            voting_types::BulletinEventType::ElectionClosed,
            serde_json::json!({ "closed_at": Utc::now().to_rfc3339() }),
        )
        .await;
    }

    Ok(Json(SetStatusResponse { old: election.status, new: req.status }))
}

#[derive(Debug, Serialize)]
pub struct TallyResultRow {
    pub candidate_id: Uuid,
    pub vote_count: u64,
}

#[derive(Debug, Serialize)]
pub struct TallyResponse {
    pub total_ballots: usize,
    pub trustees_submitted: u32,
    pub threshold: u32,
    pub results: Vec<TallyResultRow>,
}

pub async fn tally(State(state): State<AppState>, Path(election_id): Path<Uuid>) -> ApiResult<Json<TallyResponse>> {
    let outcome = voting_core::tally(state.store.as_ref(), election_id).await?;

    let candidates = state
        .store
        .list_candidates(election_id)
        .await
        .map_err(|e| ApiError::Core(voting_types::error::CoreError::Store(e.to_string())))?;
    let election = state
        .store
        .get_election(election_id)
        .await
        .map_err(|e| ApiError::Core(voting_types::error::CoreError::Store(e.to_string())))?;
    let winner_label = voting_core::winner(&election, &outcome.results)
        .and_then(|r| candidates.iter().find(|c| c.id == r.candidate_id))
        .map(|c| c.label.clone())
        .unwrap_or_default();
    let total_votes: u64 = outcome.results.iter().map(|r| r.vote_count).sum();

    crate::handlers::bulletin::try_append(
        state.store.as_ref(),
        &state.authority,
        election_id,
        voting_types::BulletinEventType::ResultPublished,
        serde_json::json!({ "total_votes": total_votes, "winner": winner_label }),
    )
    .await;

    Ok(Json(TallyResponse {
        total_ballots: outcome.total_ballots,
        trustees_submitted: outcome.trustees_submitted,
        threshold: outcome.threshold,
        results: outcome.results.into_iter().map(|r| TallyResultRow { candidate_id: r.candidate_id, vote_count: r.vote_count }).collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ResultRow {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub vote_count: u64,
    pub percentage: f64,
    pub tallied_at: DateTime<Utc>,
    pub verified: bool,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub results: Vec<ResultRow>,
    pub total_votes: u64,
}

pub async fn results(State(state): State<AppState>, Path(election_id): Path<Uuid>) -> ApiResult<Json<ResultsResponse>> {
    let election = state
        .store
        .get_election(election_id)
        .await
        .map_err(|_| ApiError::NotFound(format!("election {election_id} not found")))?;
    if election.status != ElectionStatus::Tallied {
        return Err(ApiError::BadRequest("election has not been tallied yet".into()));
    }

    let candidates = state
        .store
        .list_candidates(election_id)
        .await
        .map_err(|e| ApiError::Core(voting_types::error::CoreError::Store(e.to_string())))?;
    let rows = state
        .store
        .list_results(election_id)
        .await
        .map_err(|e| ApiError::Core(voting_types::error::CoreError::Store(e.to_string())))?;

    let total_votes: u64 = rows.iter().map(|r| r.vote_count).sum();
    let results = rows
        .into_iter()
        .map(|r| {
            let name = candidates.iter().find(|c| c.id == r.candidate_id).map(|c| c.label.clone()).unwrap_or_default();
            let percentage = if total_votes == 0 { 0.0 } else { (r.vote_count as f64 / total_votes as f64) * 100.0 };
            ResultRow {
                candidate_id: r.candidate_id,
                candidate_name: name,
                vote_count: r.vote_count,
                percentage,
                tallied_at: r.tallied_at,
                verified: r.verified,
            }
        })
        .collect();

    Ok(Json(ResultsResponse { results, total_votes }))
}
