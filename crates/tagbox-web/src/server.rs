use crate::routes::{auth_routes, element_routes, health_routes, tag_routes, user_routes};
use crate::{AppState, Result, WebError};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::map_response;
use axum::response::Response;
use axum::Router;
use tagbox_config::{AppConfig, ServerConfig, UnauthenticatedStatus};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Assemble the application router
pub fn build_router(
    state: AppState,
    server: &ServerConfig,
    unauthenticated: UnauthenticatedStatus,
) -> Result<Router> {
    let app = Router::new()
        .merge(element_routes())
        .merge(tag_routes())
        .merge(user_routes())
        .merge(auth_routes())
        .with_state(state)
        .merge(health_routes());

    let app = match unauthenticated {
        UnauthenticatedStatus::Unauthorized => app,
        UnauthenticatedStatus::Forbidden => app.layer(map_response(unauthorized_as_forbidden)),
    };

    Ok(app
        .layer(DefaultBodyLimit::max(server.body_limit))
        .layer(cors_layer(&server.cors_origins)?)
        .layer(TraceLayer::new_for_http()))
}

/// Missing or invalid credentials answer 403 without a challenge
async fn unauthorized_as_forbidden(mut response: Response) -> Response {
    if response.status() == StatusCode::UNAUTHORIZED {
        *response.status_mut() = StatusCode::FORBIDDEN;
        response.headers_mut().remove(header::WWW_AUTHENTICATE);
    }
    response
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .map_err(|e| WebError::Config(format!("Invalid CORS origin {origin:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

pub async fn start_server(config: &AppConfig, state: AppState) -> Result<()> {
    let app = build_router(state, &config.server, config.policy.unauthenticated_status)?;
    let addr = config.server.socket_addr();

    tracing::info!("Starting tagbox on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
