//! HTTP server implementation

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::provider::Provider;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Maximum request body size (default: 10MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    /// Enable CORS (default: true)
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8545))
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024
}

fn default_enable_cors() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_body_size: default_max_body_size(),
            enable_cors: default_enable_cors(),
        }
    }
}

impl ServerConfig {
    /// Create a new server config with the given address
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }
}

/// RPC HTTP server
pub struct RpcServer {
    config: ServerConfig,
    provider: Arc<Provider>,
}

impl RpcServer {
    /// Create a new RPC server
    pub fn new(config: ServerConfig, provider: Arc<Provider>) -> Self {
        Self { config, provider }
    }

    /// Build the router
    pub fn build_router(&self) -> Router {
        let mut router = Router::new().route("/", post(handle_rpc)).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(self.config.max_body_size)),
        );

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        router.with_state(Arc::clone(&self.provider))
    }

    /// Run the server until the listener fails
    pub async fn run(self) -> std::io::Result<()> {
        let app = self.build_router();

        let listener = TcpListener::bind(self.config.listen_addr).await?;
        tracing::info!("RPC server listening on {}", self.config.listen_addr);

        axum::serve(listener, app).await
    }

    /// Get the server listen address
    pub fn listen_addr(&self) -> SocketAddr {
        self.config.listen_addr
    }
}

/// Handle JSON-RPC requests, single or batched
async fn handle_rpc(State(provider): State<Arc<Provider>>, Json(body): Json<Value>) -> Json<Value> {
    Json(provider.handle_value(body).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr.port(), 8545);
        assert_eq!(config.max_body_size, 10 * 1024 * 1024);
        assert!(config.enable_cors);
    }

    #[test]
    fn test_server_config_new() {
        let addr: SocketAddr = "127.0.0.1:9545".parse().unwrap();
        let config = ServerConfig::new(addr);
        assert_eq!(config.listen_addr.port(), 9545);
        assert!(config.enable_cors);
    }
}
