use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State as AxumState,
    },
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::{net::TcpListener, sync::mpsc};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use yieldroom_types::{api::Command, ConnectionId};

pub mod config;
pub mod hub;
pub mod metrics;

pub use config::{Config, ConfigError, ValidatedConfig};
pub use hub::{Actor, Mailbox};
pub use metrics::Metrics;

#[derive(Clone)]
struct AppState {
    mailbox: Mailbox,
    metrics: Arc<Metrics>,
    outbound_buffer: usize,
}

pub struct Api {
    state: AppState,
    public_dir: PathBuf,
}

impl Api {
    pub fn new(
        mailbox: Mailbox,
        metrics: Arc<Metrics>,
        public_dir: PathBuf,
        outbound_buffer: usize,
    ) -> Self {
        Self {
            state: AppState {
                mailbox,
                metrics,
                outbound_buffer,
            },
            public_dir,
        }
    }

    pub fn router(&self) -> Router {
        // Configure CORS
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        let mut router = Router::new()
            .route("/ws", get(session_ws))
            .route("/metrics", get(metrics))
            .route("/health", get(health))
            .fallback_service(ServeDir::new(&self.public_dir))
            .layer(cors);

        // A whole classroom may share one address, so the per-IP limit is generous
        match GovernorConfigBuilder::default()
            .per_millisecond(10)
            .burst_size(1_000)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
        {
            Some(config) => {
                router = router.layer(GovernorLayer {
                    config: Arc::new(config),
                });
            }
            None => tracing::warn!("Invalid rate limit configuration, rate limiting disabled"),
        }

        router.with_state(self.state.clone())
    }
}

/// Serve `router` on `listener` until the server fails.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn metrics(AxumState(state): AxumState<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn session_ws(
    AxumState(state): AxumState<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session_ws(socket, state))
}

async fn handle_session_ws(socket: WebSocket, state: AppState) {
    let connection = ConnectionId::random();
    tracing::info!(%connection, "Session WebSocket connected");
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound) = mpsc::channel(state.outbound_buffer);

    if state.mailbox.connect(connection, outbound_tx).await.is_err() {
        tracing::warn!("Session actor stopped, refusing connection");
        let _ = sender.close().await;
        return;
    }

    loop {
        tokio::select! {
            // Handle incoming WebSocket messages
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let command = match Command::from_json(&text) {
                            Ok(command) => command,
                            Err(e) => {
                                state.metrics.rejected_commands.inc();
                                tracing::warn!(%connection, "Ignoring malformed frame: {}", e);
                                continue;
                            }
                        };
                        if state.mailbox.command(connection, command).await.is_err() {
                            tracing::warn!("Session actor stopped");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(%connection, "Client closed WebSocket connection");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            tracing::warn!("Failed to send pong, client disconnected");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error: {:?}", e);
                        break;
                    }
                    None => {
                        tracing::info!(%connection, "WebSocket stream ended");
                        break;
                    }
                    _ => {} // Ignore other message types
                }
            }
            // Forward events addressed to this connection
            event = outbound.recv() => {
                let Some(text) = event else {
                    break;
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    tracing::warn!("Failed to send event, client disconnected");
                    break;
                }
            }
        }
    }

    if state.mailbox.disconnect(connection).await.is_err() {
        tracing::warn!(%connection, "Session actor stopped before disconnect");
    }
    tracing::info!(%connection, "Session WebSocket handler exiting");
    let _ = sender.close().await;
}
