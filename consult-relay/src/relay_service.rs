use crate::ws_handler;
use axum::Router;
use axum::routing::get;
use consult_core::relay::RelayHub;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Room-scoped broadcast and presence over WebSocket.
///
/// Clients connect to `/relay/{channel}/{key}`; the key is their presence
/// identity within the channel.
#[derive(Clone, Default)]
pub struct RelayService {
    hub: RelayHub,
}

impl RelayService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hub(hub: RelayHub) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &RelayHub {
        &self.hub
    }

    pub fn router(&self) -> Router {
        // Browser peers connect from other origins.
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/relay/{channel}/{key}", get(ws_handler))
            .layer(cors)
            .with_state(self.clone())
    }

    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("Relay listening on ws://{}", addr);
        }
        axum::serve(listener, self.router()).await
    }
}
