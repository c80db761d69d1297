use super::ListResponse;
use crate::{AppState, MaybePrincipal, Result};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tagbox_core::{
    Combinator, ElementCreate, ElementFilter, ElementId, ElementUpdate, ElementView,
};

pub fn element_routes() -> Router<AppState> {
    Router::new()
        .route("/api/elements", get(list_elements).post(create_element))
        .route(
            "/api/elements/{id}",
            get(get_element).patch(update_element).delete(delete_element),
        )
}

/// `?tags=a,b&any=true&limit=10&search=x`
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    tags: Option<String>,
    #[serde(default)]
    any: bool,
    limit: Option<usize>,
    search: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> ElementFilter {
        let mut filter = ElementFilter::new();
        if let Some(tags) = &self.tags {
            filter = filter.with_tags(tags.split(',').map(str::trim));
        }
        if self.any {
            filter = filter.with_combinator(Combinator::Any);
        }
        if let Some(limit) = self.limit {
            filter = filter.with_limit(limit);
        }
        if let Some(search) = self.search {
            filter = filter.with_search(search);
        }
        filter
    }
}

async fn list_elements(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResponse<ElementView>>> {
    let Query(query) = query?;
    let elements = state.service.list_elements(query.into_filter()).await?;
    Ok(Json(ListResponse::new(
        elements.iter().map(ElementView::from).collect(),
    )))
}

async fn create_element(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    payload: std::result::Result<Json<ElementCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<ElementView>)> {
    let Json(request) = payload?;
    let element = state
        .service
        .create_element(principal.principal(), request)
        .await?;
    Ok((StatusCode::CREATED, Json(ElementView::from(&element))))
}

async fn get_element(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<ElementView>> {
    let Path(id) = path?;
    let element = state.service.get_element(ElementId(id)).await?;
    Ok(Json(ElementView::from(&element)))
}

async fn update_element(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<ElementUpdate>, JsonRejection>,
) -> Result<Json<ElementView>> {
    let Path(id) = path?;
    let Json(update) = payload?;
    let element = state
        .service
        .update_element(principal.principal(), ElementId(id), update)
        .await?;
    Ok(Json(ElementView::from(&element)))
}

async fn delete_element(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<StatusCode> {
    let Path(id) = path?;
    state
        .service
        .delete_element(principal.principal(), ElementId(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
