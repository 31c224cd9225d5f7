use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::extract::{Path, Query, Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use contracts::{ApiError, DataModel, ErrorCode, Narrative};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::textgen::{HttpTextGenerator, TextGenerator};
use crate::{PersistenceError, StudioApi};

const DEFAULT_SQLITE_PATH: &str = "studio_models.sqlite";
const MAX_BATCH_SIZE: usize = 100;

include!("error.rs");
include!("state.rs");
include!("routes/model.rs");
include!("routes/narratives.rs");
include!("routes/decision.rs");

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub sqlite_path: String,
    pub textgen_endpoint: Option<String>,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
            textgen_endpoint: None,
        }
    }
}

pub async fn serve(addr: SocketAddr, options: ServeOptions) -> Result<(), ServerError> {
    let mut api = StudioApi::new();
    api.attach_sqlite_store(&options.sqlite_path)?;
    api.load_from_store()?;

    let textgen = options.textgen_endpoint.map(HttpTextGenerator::new);
    let state = AppState::new(api, textgen);
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/model", get(get_model).put(put_model))
        .route("/api/v1/relation", put(put_relation))
        .route("/api/v1/narratives", post(save_narrative))
        .route("/api/v1/narratives/generate", post(generate_narratives))
        .route("/api/v1/narratives/{narrative_id}", delete(delete_narrative))
        .route(
            "/api/v1/narratives/{narrative_id}/elaborate",
            post(elaborate_narrative),
        )
        .route("/api/v1/decision", get(get_decision))
        .route("/api/v1/risk", get(get_risk))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut axum::http::HeaderMap) {
    headers.insert(
        HeaderName::from_static("access-control-allow-origin"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("GET,POST,OPTIONS,PUT,PATCH,DELETE"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-max-age"),
        HeaderValue::from_static("3600"),
    );
}

fn default_sqlite_path() -> String {
    std::env::var("STUDIO_SQLITE_PATH")
        .ok()
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SQLITE_PATH.to_string())
}

#[cfg(test)]
mod tests;
