//! Token issuance and lookup

use crate::{AppState, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tagbox_core::UserView;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/me", post(me))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeyBody {
    pub key: String,
}

async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<KeyBody>> {
    let Json(request) = payload?;
    let key = state
        .service
        .login(&request.username, &request.password)
        .await?;
    Ok(Json(KeyBody { key }))
}

/// Resolve a key to its user; unknown keys are 404
async fn me(
    State(state): State<AppState>,
    payload: std::result::Result<Json<KeyBody>, JsonRejection>,
) -> Result<Json<UserView>> {
    let Json(body) = payload?;
    let user = state.service.user_for_token(&body.key).await?;
    Ok(Json(UserView::from(&user)))
}
