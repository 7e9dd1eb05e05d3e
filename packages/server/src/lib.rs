pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extract;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod search;
pub mod state;
pub mod store;

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as ScalarServable};

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Blobpad API",
        version = "1.0.0",
        description = "Versioned notes over a content-addressed blob store"
    ),
    paths(
        handlers::notebook::list_notebooks,
        handlers::notebook::create_notebook,
        handlers::note::list_notes,
        handlers::note::create_note,
        handlers::note::get_note,
        handlers::note::update_note,
        handlers::note::get_version,
        handlers::upload::upload_files,
        handlers::attachment::download_note_attachment,
        handlers::attachment::get_attachment,
        handlers::admin::reindex,
    ),
    tags(
        (name = "Notebooks", description = "Notebook management"),
        (name = "Notes", description = "Versioned notes and their body history"),
        (name = "Attachments", description = "File import and attachment download"),
        (name = "Admin", description = "Search index maintenance"),
    ),
)]
struct ApiDoc;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);

    axum::Router::new()
        .nest("/api", routes::api_routes(&state.config))
        .merge(routes::admin_routes())
        .with_state(state)
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .layer(cors)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::IF_NONE_MATCH])
        .max_age(Duration::from_secs(config.max_age))
}
