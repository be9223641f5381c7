use std::future::Future;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use rust_embed::Embed;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use super::clients::{ClientId, ClientRegistry};
use super::ingress::handle_frame;
use crate::buffer::FrameSlot;
use crate::config::ServerConfig;
use crate::stats::{PipelineStats, StatsSnapshot};

#[derive(Embed)]
#[folder = "src/assets/"]
struct Assets;

#[derive(Clone)]
pub struct AppState {
    pub slot: Arc<FrameSlot>,
    pub stats: Arc<PipelineStats>,
    pub clients: Arc<ClientRegistry>,
}

impl AppState {
    pub fn new(
        slot: Arc<FrameSlot>,
        stats: Arc<PipelineStats>,
        clients: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            slot,
            stats,
            clients,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct StatsResponse {
    frames: StatsSnapshot,
    pending: bool,
    clients: usize,
}

pub fn router(state: AppState, cors_allow_any: bool) -> Router {
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/assets/{*path}", get(static_handler))
        .route("/ws", get(ws_handler))
        .route("/api/health", get(health_handler))
        .route("/api/stats", get(stats_handler))
        .with_state(state);

    if cors_allow_any {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

pub async fn start_server<F>(
    state: AppState,
    config: &ServerConfig,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state, config.cors_allow_any);

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("starting HTTP server on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn index_handler() -> impl IntoResponse {
    match Assets::get("index.html") {
        Some(content) => Html(content.data.to_vec()).into_response(),
        None => (StatusCode::NOT_FOUND, "index.html not found").into_response(),
    }
}

async fn static_handler(Path(path): Path<String>) -> impl IntoResponse {
    match Assets::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.to_vec(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatsResponse {
        frames: state.stats.snapshot(),
        pending: !state.slot.is_empty(),
        clients: state.clients.len(),
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (client_id, mut outbound) = state.clients.register();
    tracing::info!(
        client = client_id,
        clients = state.clients.len(),
        "client connected"
    );

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let inbound = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(msg @ (Message::Text(_) | Message::Binary(_))) => {
                    ingest(&inbound, client_id, msg).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(client = client_id, error = %e, "websocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.clients.unregister(client_id);
    tracing::info!(
        client = client_id,
        clients = state.clients.len(),
        "client disconnected"
    );
}

/// Decodes one inbound message on the blocking pool. Awaiting it keeps at
/// most one decode in flight per client.
async fn ingest(state: &AppState, client_id: ClientId, message: Message) {
    let slot = Arc::clone(&state.slot);
    let stats = Arc::clone(&state.stats);

    let result = tokio::task::spawn_blocking(move || match message {
        Message::Text(text) => {
            handle_frame(&slot, &stats, text.as_str());
        }
        Message::Binary(data) => match std::str::from_utf8(&data) {
            Ok(text) => {
                handle_frame(&slot, &stats, text);
            }
            Err(_) => {
                tracing::warn!(
                    client = client_id,
                    bytes = data.len(),
                    "ignoring non-utf8 binary message"
                );
            }
        },
        _ => {}
    })
    .await;

    if let Err(e) = result {
        tracing::error!(client = client_id, error = %e, "frame ingest task failed");
    }
}
