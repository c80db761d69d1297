use super::ListResponse;
use crate::{AppState, MaybePrincipal, Result};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tagbox_core::{UserCreate, UserId, UserUpdate, UserView};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(register))
        .route("/api/users/{id}", get(get_user).patch(update_user))
}

async fn list_users(
    State(state): State<AppState>,
    principal: MaybePrincipal,
) -> Result<Json<ListResponse<UserView>>> {
    let users = state.service.list_users(principal.principal()).await?;
    Ok(Json(ListResponse::new(users.iter().map(UserView::from).collect())))
}

/// Open registration; never grants the admin flag
async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UserCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<UserView>)> {
    let Json(request) = payload?;
    let user = state.service.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

async fn get_user(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<UserView>> {
    let Path(id) = path?;
    let user = state
        .service
        .get_user(principal.principal(), UserId(id))
        .await?;
    Ok(Json(UserView::from(&user)))
}

async fn update_user(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<UserUpdate>, JsonRejection>,
) -> Result<Json<UserView>> {
    let Path(id) = path?;
    let Json(update) = payload?;
    let user = state
        .service
        .update_user(principal.principal(), UserId(id), update)
        .await?;
    Ok(Json(UserView::from(&user)))
}
