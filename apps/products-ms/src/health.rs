//! Health endpoints for K8s probes.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use core_config::server::ServerConfig;
use database::postgres::{DatabaseConnection, check_health_detailed};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::messaging::MessageBroker;
use crate::shutdown::ShutdownCoordinator;

/// Body returned by both probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub database_connected: bool,
    pub nats_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Shared health state, written by [`monitor`] and read by the probe handlers.
#[derive(Clone)]
pub struct HealthState {
    inner: Arc<RwLock<HealthStateInner>>,
}

struct HealthStateInner {
    serving: bool,
    database_connected: bool,
    nats_connected: bool,
    last_error: Option<String>,
}

impl HealthState {
    /// Starts out alive but not ready.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HealthStateInner {
                serving: true,
                database_connected: false,
                nats_connected: false,
                last_error: None,
            })),
        }
    }

    pub async fn set_serving(&self, serving: bool) {
        self.inner.write().await.serving = serving;
    }

    pub async fn set_database(&self, connected: bool, error: Option<String>) {
        let mut inner = self.inner.write().await;
        inner.database_connected = connected;
        if error.is_some() || connected {
            inner.last_error = error;
        }
    }

    pub async fn set_nats_connected(&self, connected: bool) {
        self.inner.write().await.nats_connected = connected;
    }

    /// Liveness ignores dependency state
    pub async fn is_alive(&self) -> bool {
        self.inner.read().await.serving
    }

    pub async fn is_ready(&self) -> bool {
        let inner = self.inner.read().await;
        inner.serving && inner.database_connected && inner.nats_connected
    }

    pub async fn status(&self) -> HealthStatus {
        let inner = self.inner.read().await;
        let ready = inner.serving && inner.database_connected && inner.nats_connected;

        HealthStatus {
            status: if ready { "healthy" } else { "unhealthy" }.to_string(),
            database_connected: inner.database_connected,
            nats_connected: inner.nats_connected,
            last_error: inner.last_error.clone(),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}

/// Serve the probes until shutdown.
pub async fn serve(
    config: &ServerConfig,
    state: HealthState,
    shutdown: ShutdownCoordinator,
) -> Result<(), std::io::Error> {
    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, "Starting health server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

/// Refresh dependency state every `interval` until shutdown.
pub async fn monitor<B: MessageBroker>(
    state: HealthState,
    db: DatabaseConnection,
    broker: Arc<B>,
    interval: Duration,
    shutdown: ShutdownCoordinator,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            _ = ticker.tick() => {
                let db_status = check_health_detailed(&db).await;
                if !db_status.healthy {
                    warn!(error = ?db_status.message, "Database health check failed");
                }
                state.set_database(db_status.healthy, db_status.message).await;

                let nats_connected = broker.is_connected();
                if !nats_connected {
                    warn!("NATS connection is down");
                }
                state.set_nats_connected(nats_connected).await;
            }
        }
    }

    state.set_serving(false).await;
}

async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let code = if state.is_alive().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(state.status().await))
}

async fn ready_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let code = if state.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(state.status().await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt; // For oneshot()

    async fn get(state: &HealthState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_fresh_state_is_alive_not_ready() {
        let state = HealthState::new();

        let (status, _) = get(&state, "/health").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get(&state, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_ready_when_dependencies_up() {
        let state = HealthState::new();
        state.set_database(true, None).await;
        state.set_nats_connected(true).await;

        let (status, body) = get(&state, "/ready").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database_connected"], true);
    }

    #[tokio::test]
    async fn test_database_error_is_reported() {
        let state = HealthState::new();
        state.set_nats_connected(true).await;
        state
            .set_database(false, Some("connection refused".to_string()))
            .await;

        let (status, body) = get(&state, "/ready").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["last_error"], "connection refused");

        // liveness is unaffected
        let (status, _) = get(&state, "/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_alive_after_stop() {
        let state = HealthState::new();
        state.set_serving(false).await;

        let (status, _) = get(&state, "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
