//! HTTP trigger surface.
//!
//! Exposes the two handlers as JSON endpoints so that any trigger able to
//! POST a notification (an S3 event relay, a Lex fulfillment hook, a test
//! harness) can invoke them.
//!
//! # Endpoints
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | `POST` | `/ingest` | S3 object-created notification | `"Execution Successful"` |
//! | `POST` | `/query` | Lex fulfillment event | Lex dialog response |
//! | `GET`  | `/health` | — | `{ "status": "ok", "version": … }` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "event has no Records" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `handler_error` (500).

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::ingest::{handle_object_created, SUCCESS_TOKEN};
use crate::models::{DialogResponse, LexEvent, S3Event};
use crate::query::handle_utterance;
use crate::traits::Clients;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    clients: Clients,
}

/// Build the router with all endpoints.
pub fn router(config: Arc<Config>, clients: Clients) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ingest", post(handle_ingest))
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { config, clients })
}

/// Starts the HTTP server on `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config, clients: Clients) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(config.clone()), clients);

    info!("listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// A remote call failed while the handler was running.
fn handler_error(err: anyhow::Error) -> AppError {
    error!("handler failed: {:#}", err);
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "handler_error".to_string(),
        message: format!("{:#}", err),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_not_found(uri: Uri) -> AppError {
    not_found(format!("no route for {}", uri.path()))
}

// ============ POST /ingest ============

async fn handle_ingest(
    State(state): State<AppState>,
    payload: Result<Json<S3Event>, JsonRejection>,
) -> Result<Json<&'static str>, AppError> {
    let Json(event) = payload.map_err(|e| bad_request(e.body_text()))?;
    if event.records.is_empty() {
        return Err(bad_request("event has no Records"));
    }

    handle_object_created(&state.config, &state.clients, &event)
        .await
        .map_err(handler_error)?;

    Ok(Json(SUCCESS_TOKEN))
}

// ============ POST /query ============

async fn handle_query(
    State(state): State<AppState>,
    payload: Result<Json<LexEvent>, JsonRejection>,
) -> Result<Json<DialogResponse>, AppError> {
    let Json(event) = payload.map_err(|e| bad_request(e.body_text()))?;

    let reply = handle_utterance(&state.config, &state.clients, &event)
        .await
        .map_err(handler_error)?;

    Ok(Json(reply))
}
