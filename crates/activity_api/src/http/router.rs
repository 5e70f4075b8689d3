use axum::extract::{Path, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use common::domain::{ActivityStore, AppKey};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, instrument};

const NOT_FOUND_MESSAGE: &str = "No such app";

/// JSON body rendered with indentation.
struct PrettyJson<T>(StatusCode, T);

impl<T: Serialize> IntoResponse for PrettyJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_string_pretty(&self.1) {
            Ok(body) => (self.0, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
            Err(e) => {
                error!(error = %e, "failed to encode response body");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub fn activity_router(store: Arc<ActivityStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/apps", get(all_apps))
        .route("/api/apps/{org}", get(org_apps))
        .route("/api/apps/{org}/{space}", get(space_apps))
        .route("/api/apps/{org}/{space}/{app}", get(one_app))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .with_state(store)
}

async fn health(State(store): State<Arc<ActivityStore>>) -> Response {
    let apps = store.len().await;
    PrettyJson(StatusCode::OK, json!({ "status": "ok", "apps": apps })).into_response()
}

#[instrument(skip(store))]
async fn all_apps(State(store): State<Arc<ActivityStore>>) -> Response {
    PrettyJson(StatusCode::OK, store.all_records().await).into_response()
}

#[instrument(skip(store))]
async fn org_apps(State(store): State<Arc<ActivityStore>>, Path(org): Path<String>) -> Response {
    apps_with_prefix(&store, &AppKey::org_prefix(&org)).await
}

#[instrument(skip(store))]
async fn space_apps(
    State(store): State<Arc<ActivityStore>>,
    Path((org, space)): Path<(String, String)>,
) -> Response {
    apps_with_prefix(&store, &AppKey::space_prefix(&org, &space)).await
}

#[instrument(skip(store))]
async fn one_app(
    State(store): State<Arc<ActivityStore>>,
    Path((org, space, app)): Path<(String, String, String)>,
) -> Response {
    match store.record_by_key(&org, &space, &app).await {
        Some(record) => PrettyJson(StatusCode::OK, record).into_response(),
        None => PrettyJson(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response(),
    }
}

async fn apps_with_prefix(store: &ActivityStore, prefix: &str) -> Response {
    let found = store.records_with_key_prefix(prefix).await;
    if found.is_empty() {
        PrettyJson(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response()
    } else {
        PrettyJson(StatusCode::OK, found).into_response()
    }
}
