///! HTTP surface of the gallery
///!
///! | Route                 | Response                                   |
///! |-----------------------|--------------------------------------------|
///! | `GET /?q=`            | full page with the filter applied          |
///! | `GET /api/filter?q=`  | unit and category visibility as JSON       |
///! | `GET /api/units`      | progress counters and every unit           |
///! | `GET /units/{id}/next`| cycle one card, then redirect to the page  |
///! | `GET /health`         | liveness                                   |

use aviary_backend::module::{render_error_page, Gallery};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Either a ready gallery or the reason the catalog could not be loaded
#[derive(Clone)]
pub enum AppState {
    Ready(Arc<Gallery>),
    Unavailable(Arc<str>),
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

pub fn build_router(state: AppState, enable_cors: bool) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/api/filter", get(filter))
        .route("/api/units", get(units))
        .route("/units/{id}/next", get(next_image))
        .route("/health", get(health_check))
        .with_state(state);

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}

fn unavailable_json(reason: &str) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "error": reason })),
    )
        .into_response()
}

async fn index(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    match state {
        AppState::Ready(gallery) => Html(gallery.page_html(&params.q).await).into_response(),
        AppState::Unavailable(reason) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(render_error_page(&reason)),
        )
            .into_response(),
    }
}

async fn filter(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    match state {
        AppState::Ready(gallery) => Json(gallery.visibility(&params.q).await).into_response(),
        AppState::Unavailable(reason) => unavailable_json(&reason),
    }
}

async fn units(State(state): State<AppState>) -> Response {
    match state {
        AppState::Ready(gallery) => {
            let progress = gallery.progress().await;
            let units = gallery.snapshot().await;
            Json(serde_json::json!({
                "progress": progress,
                "last_report": gallery.last_report().await,
                "units": units,
            }))
            .into_response()
        }
        AppState::Unavailable(reason) => unavailable_json(&reason),
    }
}

async fn next_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<SearchParams>,
) -> Response {
    let gallery = match state {
        AppState::Ready(gallery) => gallery,
        AppState::Unavailable(reason) => return unavailable_json(&reason),
    };

    match gallery.advance(&id).await {
        Some(index) => {
            tracing::debug!("Unit {} now showing image {}", id, index + 1);
            let query = params.q.trim();
            let target = if query.is_empty() {
                format!("/#{}", id)
            } else {
                format!("/?q={}#{}", urlencoding::encode(query), id)
            };
            Redirect::to(&target).into_response()
        }
        None => (StatusCode::NOT_FOUND, format!("Unknown bird '{}'", id)).into_response(),
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
