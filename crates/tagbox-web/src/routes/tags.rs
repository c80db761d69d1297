//! Read-only tag endpoints. Other methods fall through to 405.

use super::ListResponse;
use crate::{AppState, Result};
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tagbox_core::TagView;

pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tags", get(list_tags))
        .route("/api/tags/{name}", get(get_tag))
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<ListResponse<TagView>>> {
    let tags = state.service.list_tags().await?;
    Ok(Json(ListResponse::new(tags.iter().map(TagView::from).collect())))
}

async fn get_tag(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<TagView>> {
    let Path(name) = path?;
    let tag = state.service.get_tag(&name).await?;
    Ok(Json(TagView::from(&tag)))
}
