//! Health check endpoint

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serenity::prelude::TypeMapKey;
use tokio::sync::RwLock;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub bot_username: Option<String>,
    pub uptime_secs: u64,
    pub commands_handled: u64,
}

/// Shared application state for health checks
#[derive(Clone)]
pub struct AppState {
    pub start_time: SystemTime,
    pub bot_username: Arc<RwLock<Option<String>>>,
    commands_handled: Arc<AtomicU64>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            start_time: SystemTime::now(),
            bot_username: Arc::new(RwLock::new(None)),
            commands_handled: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn set_bot_username(&self, username: String) {
        let mut guard = self.bot_username.write().await;
        *guard = Some(username);
    }

    pub fn record_command(&self) {
        self.commands_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn commands_handled(&self) -> u64 {
        self.commands_handled.load(Ordering::Relaxed)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeMapKey for AppState {
    type Value = AppState;
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let uptime = state.start_time.elapsed().unwrap_or_default().as_secs();
    let bot_username = state.bot_username.read().await.clone();

    (
        StatusCode::OK,
        Json(HealthStatus {
            status: "ok".to_string(),
            bot_username,
            uptime_secs: uptime,
            commands_handled: state.commands_handled(),
        }),
    )
}

async fn live_handler() -> StatusCode {
    StatusCode::OK
}

/// Create the health check router
pub fn create_health_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/live", get(live_handler))
        .with_state(state)
}

/// Start the health check server
pub async fn start_health_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_health_router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Health check server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
