use std::{convert::Infallible, net::SocketAddr, time::Duration};

use anyhow::Context;
use async_stream::stream;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response, sse::{Event, KeepAlive, Sse}},
    routing::{get, post},
};
use docchat_runner::{ChatError, ChatEvent};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::state::{AppState, IngestError};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct IngestParams {
    /// Rebuild the collection instead of upserting into it.
    #[serde(default)]
    pub full: bool,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/chat/{conversation_id}", post(chat))
        .route("/api/chat/{conversation_id}/messages", get(get_messages).delete(clear_messages))
        .route("/api/ingest", post(ingest))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Build the components, ingest the configured documents and serve until
/// the process is stopped.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config).await?;
    ingest_on_startup(&state, config.reindex).await;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for docchat server")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("docchat listening on http://{}", addr);
    axum::serve(listener, app_router(state)).await?;
    Ok(())
}

/// Open the index, then ingest the configured documents.
///
/// The collection is created before anything is loaded, so chat answers from
/// an empty index when no location is set or ingestion fails. Problems are
/// logged; the server still comes up.
pub async fn ingest_on_startup(state: &AppState, full: bool) {
    if let Err(e) = state.pipeline.create_collection().await {
        error!(error = %e, "could not open the vector index");
    }
    match state.ingest(full).await {
        Ok(report) => info!(
            documents = report.documents,
            segments = report.segments,
            dimensions = report.dimensions,
            "startup ingestion complete"
        ),
        Err(IngestError::NoLocation) => {
            error!("DOCCHAT_DOCS_LOCATION is not set, skipping document ingestion")
        }
        Err(IngestError::Failed(e)) => error!(error = %e, "startup ingestion failed"),
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"docchat"}))
}

fn error_body(code: &str, message: impl ToString) -> Json<serde_json::Value> {
    Json(json!({"code": code, "message": message.to_string()}))
}

fn error_event(error: &ChatError) -> Event {
    Event::default()
        .event("error")
        .data(json!({"code": error.code(), "message": error.to_string()}).to_string())
}

async fn chat(
    Path(conversation_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, error_body("invalid_parameters", "message cannot be empty"))
            .into_response();
    }

    let mut response = match state.orchestrator.chat(&conversation_id, &request.message).await {
        Ok(response) => response,
        Err(e) => return (StatusCode::BAD_REQUEST, error_body(e.code(), e)).into_response(),
    };

    // Dropping this stream on client disconnect drops `response`, which
    // cancels the request.
    let events = stream! {
        while let Some(event) = response.next().await {
            match event {
                ChatEvent::Chunk(text) => yield Ok::<_, Infallible>(Event::default().event("chunk").data(text)),
                ChatEvent::Completed => {
                    yield Ok(Event::default().event("done").data(json!({"status":"completed"}).to_string()));
                    break;
                }
                ChatEvent::Failed(e) => {
                    yield Ok(error_event(&e));
                    break;
                }
            }
        }
    };

    Sse::new(events)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keepalive"))
        .into_response()
}

async fn get_messages(
    Path(conversation_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    Json(state.memory.get(&conversation_id).await)
}

async fn clear_messages(
    Path(conversation_id): Path<String>,
    State(state): State<AppState>,
) -> StatusCode {
    state.memory.clear(&conversation_id).await;
    StatusCode::NO_CONTENT
}

async fn ingest(State(state): State<AppState>, Query(params): Query<IngestParams>) -> Response {
    match state.ingest(params.full).await {
        Ok(report) => Json(report).into_response(),
        Err(IngestError::NoLocation) => {
            (StatusCode::CONFLICT, error_body("no_document_location", IngestError::NoLocation))
                .into_response()
        }
        Err(IngestError::Failed(e)) => {
            warn!(error = %e, "ingestion request failed");
            let status = if e.is_retryable() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, error_body("ingestion_failed", e)).into_response()
        }
    }
}
