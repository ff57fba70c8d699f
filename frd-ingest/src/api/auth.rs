//! Access token endpoint
//!
//! Operational surface over the credential manager. This is the one place a
//! credential failure reaches a caller.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// GET /auth/token
pub async fn get_token(State(state): State<AppState>) -> ApiResult<Json<TokenResponse>> {
    let access_token = state.credentials.get_token().await?;
    Ok(Json(TokenResponse { access_token }))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/token", get(get_token))
}
