use axum::Router;
use axum::routing::{get, post};

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .nest("/notebook", notebook_routes())
        .nest("/note", note_routes())
        .nest("/upload", upload_routes(config))
        .route(
            "/attachment/{id}",
            get(handlers::attachment::get_attachment),
        )
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/_reindex", post(handlers::admin::reindex))
}

fn notebook_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::notebook::list_notebooks).post(handlers::notebook::create_notebook),
    )
}

fn note_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::note::list_notes).post(handlers::note::create_note),
        )
        .route("/version/{hash}", get(handlers::note::get_version))
        .route(
            "/{id}",
            get(handlers::note::get_note).put(handlers::note::update_note),
        )
        .route(
            "/{id}/pdf",
            get(handlers::attachment::download_note_attachment),
        )
}

fn upload_routes(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .route("/{notebook}", post(handlers::upload::upload_files))
        .layer(handlers::upload::upload_body_limit(
            config.storage.max_blob_size,
        ))
}
