//! `/token/request-signature` (§4.3, §6): RSA blind signature issuance.

use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RequestSignatureRequest {
    pub election_id: Uuid,
    pub main_voting_code: String,
    pub blinded_token_b64: String,
    /// MVP fallback path of §4.3 ("Fallback direct issuance"): when
    /// present and `Config::debug` is true, signs `direct_token_hash`
    /// directly instead of looking up `main_voting_code`. Absent in any
    /// production deployment per the spec's "MUST be disabled in
    /// production builds".
    #[serde(default)]
    pub direct_token_hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequestSignatureResponse {
    pub blinded_signature_b64: String,
    pub token_hash_hex: String,
    pub public_key_pem: String,
}

pub async fn request_signature(
    State(state): State<AppState>,
    Json(req): Json<RequestSignatureRequest>,
) -> ApiResult<Json<RequestSignatureResponse>> {
    let signed = if let Some(direct_hash) = req.direct_token_hash {
        if !state.config.debug {
            return Err(ApiError::BadRequest(
                "direct token issuance is disabled outside DEBUG mode".into(),
            ));
        }
        voting_core::sign_direct(state.store.as_ref(), &state.authority, req.election_id, &direct_hash).await?
    } else {
        let blinded_message = BASE64
            .decode(&req.blinded_token_b64)
            .map_err(|e| ApiError::BadRequest(format!("blinded_token_b64 is not valid base64: {e}")))?;
        voting_core::sign(state.store.as_ref(), &state.authority, req.election_id, &req.main_voting_code, &blinded_message).await?
    };

    Ok(Json(RequestSignatureResponse {
        blinded_signature_b64: BASE64.encode(&signed.blinded_signature),
        token_hash_hex: signed.token_hash_hex,
        public_key_pem: signed.public_key_pem,
    }))
}
