//! HTTP + WebSocket surface.
//!
//! Thin transport layer over the engine: JSON endpoints for indexing
//! and synchronous generation, plus a WebSocket that relays
//! [`AgentActivityEvent`]s verbatim while a generation streams. Event
//! field names on the wire are exactly the serialized model fields —
//! the dashboard contract.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /generate` | Synchronous generation |
//! | `GET  /ws/generate` | Streaming generation over WebSocket |
//! | `POST /collections/{name}/items` | Upsert content items |
//! | `POST /collections/{name}/query` | Similarity query |
//! | `GET  /collections/{name}/stats` | Collection statistics |
//! | `GET  /stats` | Coordinator run counters |

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use draftforge_core::error::EngineError;
use draftforge_core::models::{ContentItem, GenerationRequest};

use crate::coordinator::AgentCoordinator;
use crate::index::EmbeddingIndex;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<AgentCoordinator>,
    pub index: Arc<EmbeddingIndex>,
}

/// Build the router with all routes and CORS enabled.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/ws/generate", get(ws_generate))
        .route("/collections/{name}/items", post(upsert_items))
        .route("/collections/{name}/query", post(query_collection))
        .route("/collections/{name}/stats", get(collection_stats))
        .route("/stats", get(coordinator_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until the process is stopped.
pub async fn run_server(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(%bind, "server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn error_response(err: EngineError) -> Response {
    let status = match &err {
        EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::CollectionNotFound(_) | EngineError::ContentNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        EngineError::Cancelled => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({
        "error": { "kind": err.kind(), "message": err.to_string() }
    });
    (status, Json(body)).into_response()
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Response {
    match state.coordinator.generate(request).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => error_response(err),
    }
}

async fn ws_generate(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| stream_generation(socket, state))
}

/// One generation per socket: the client sends a `GenerationRequest`
/// as its first message, events stream back, and the final frame is
/// either the response or an error object.
async fn stream_generation(mut socket: WebSocket, state: AppState) {
    let request: GenerationRequest = loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str(&text) {
                Ok(request) => break request,
                Err(e) => {
                    let _ = socket
                        .send(Message::Text(
                            json!({ "error": { "kind": "validation", "message": e.to_string() } })
                                .to_string()
                                .into(),
                        ))
                        .await;
                    return;
                }
            },
            Some(Ok(Message::Close(_))) | None => return,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!(error = %e, "websocket receive failed");
                return;
            }
        }
    };

    let (mut events, handle) = state.coordinator.generate_streaming(request);

    while let Some(event) = events.recv().await {
        let frame = match serde_json::to_string(&event) {
            Ok(frame) => frame,
            Err(_) => continue,
        };
        if socket.send(Message::Text(frame.into())).await.is_err() {
            // Client went away; dropping the receiver cancels the run.
            drop(events);
            handle.abort();
            return;
        }
    }

    let final_frame = match handle.await {
        Ok(Ok(response)) => serde_json::to_string(&json!({ "response": response }))
            .unwrap_or_else(|_| "{}".to_string()),
        Ok(Err(err)) => {
            json!({ "error": { "kind": err.kind(), "message": err.to_string() } }).to_string()
        }
        Err(join_err) => {
            json!({ "error": { "kind": "internal", "message": join_err.to_string() } }).to_string()
        }
    };
    let _ = socket.send(Message::Text(final_frame.into())).await;
    let _ = socket.send(Message::Close(None)).await;
}

async fn upsert_items(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(items): Json<Vec<ContentItem>>,
) -> Response {
    match state.index.upsert(&name, &items).await {
        Ok(report) => Json(json!({
            "written": report.written,
            "skippedUnchanged": report.skipped_unchanged,
        }))
        .into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody {
    query: String,
    #[serde(default = "default_query_k")]
    k: usize,
    #[serde(default = "default_query_threshold")]
    threshold: f64,
}

fn default_query_k() -> usize {
    5
}
fn default_query_threshold() -> f64 {
    0.7
}

async fn query_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<QueryBody>,
) -> Response {
    match state
        .index
        .query(&name, &body.query, body.k, body.threshold, None)
        .await
    {
        Ok(hits) => {
            let results: Vec<serde_json::Value> = hits
                .iter()
                .map(|hit| {
                    json!({
                        "id": hit.item.id,
                        "title": hit.item.title,
                        "similarityScore": hit.similarity,
                    })
                })
                .collect();
            Json(json!({ "results": results })).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn collection_stats(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.index.stats(&name).await {
        Ok(stats) => Json(stats).into_response(),
        Err(err) => error_response(err),
    }
}

async fn coordinator_stats(State(state): State<AppState>) -> Response {
    Json(state.coordinator.stats()).into_response()
}
