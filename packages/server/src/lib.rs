pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod routes;
pub mod state;
pub mod storage;

use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Care CMS Edit Session API",
        version = "1.0.0",
        description = "Unsaved-change guard and upload lifecycle for admin edit forms"
    ),
    tags(
        (name = "Sessions", description = "Edit sessions, uploads and navigation guards"),
    ),
)]
struct ApiDoc;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes(&state.config))
        .split_for_parts();

    let cors = cors_layer(&state.config.server.cors);
    let document = api.clone();

    router
        .route("/media/{*key}", get(handlers::media::get_media))
        .route(
            "/api-docs/openapi.json",
            get(move || std::future::ready(Json(document.clone()))),
        )
        .with_state(state)
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allow_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = config
            .allow_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.max_age))
}
