//! HTTP server exposing the WebSocket push channel and a one-shot scan route

use crate::broadcast::{Broadcaster, ChannelObserver};
use crate::config::{ScanConfig, ServerConfig};
use crate::scanner::{ScanEngine, ScanSnapshot};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScanEngine>,
    pub broadcaster: Arc<Broadcaster>,
}

impl AppState {
    /// Engine plus a broadcaster scanning through it on the configured interval
    pub fn new(engine: Arc<ScanEngine>) -> Self {
        let interval = engine.config().scan_interval_duration();
        let broadcaster = Arc::new(Broadcaster::new(engine.clone(), interval));
        Self { engine, broadcaster }
    }
}

/// Build the router: `<ws_path>` for pushes, `/api/scan` and `/health`
pub fn create_router(state: AppState, ws_path: &str) -> Router {
    Router::new()
        .route(ws_path, get(ws_handler))
        .route("/api/scan", get(scan_handler))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

/// Run one scan and return the snapshot
async fn scan_handler(State(state): State<AppState>) -> Json<ScanSnapshot> {
    Json(state.engine.run_scan().await)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.broadcaster))
}

/// Bridge one WebSocket to the broadcaster until the client goes away
async fn handle_socket(socket: WebSocket, broadcaster: Arc<Broadcaster>) {
    let (mut sink, mut stream) = socket.split();
    let (observer, mut outbox) = ChannelObserver::channel();

    let writer = tokio::spawn(async move {
        while let Some(payload) = outbox.recv().await {
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    let id = broadcaster.register(Arc::new(observer)).await;

    let initial = {
        let broadcaster = broadcaster.clone();
        tokio::spawn(async move { broadcaster.push_initial(id).await })
    };

    // Client messages carry nothing for us; only watch for the close
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!("WebSocket error on observer {}: {}", id, e);
                break;
            }
        }
    }

    broadcaster.unsubscribe(id).await;
    initial.abort();
    writer.abort();
}

/// A bound listener plus the state its routes share
pub struct Server {
    listener: TcpListener,
    state: AppState,
    ws_path: String,
}

impl Server {
    /// Bind the listener, then build the engine around the port actually bound.
    ///
    /// That port is excluded from scanning so we never list ourselves, which
    /// also covers ephemeral `:0` binds.
    pub async fn bind(scan_config: ScanConfig, server_config: ServerConfig) -> crate::Result<Self> {
        let listener = TcpListener::bind(server_config.bind_address.as_str()).await?;
        let local_addr = listener.local_addr()?;

        let scan_config = scan_config.with_self_port(Some(local_addr.port()));
        let engine = Arc::new(ScanEngine::new(scan_config)?);

        Ok(Self {
            listener,
            state: AppState::new(engine),
            ws_path: server_config.ws_path,
        })
    }

    pub fn local_addr(&self) -> crate::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until `shutdown` is cancelled, ticking the broadcaster meanwhile
    pub async fn run(self, shutdown: CancellationToken) -> crate::Result<()> {
        log::info!("> Ready on http://{}", self.local_addr()?);

        let ticker = tokio::spawn(self.state.broadcaster.clone().run(shutdown.clone()));
        let app = create_router(self.state, &self.ws_path);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        if let Err(e) = ticker.await {
            log::warn!("Broadcaster task failed: {}", e);
        }

        Ok(())
    }
}

/// Bind and serve until `shutdown` is cancelled
pub async fn serve(
    scan_config: ScanConfig,
    server_config: ServerConfig,
    shutdown: CancellationToken,
) -> crate::Result<()> {
    Server::bind(scan_config, server_config).await?.run(shutdown).await
}
