//! HTTP surface: the inbound email webhook and a health check.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{IntakeError, Result};
use crate::intake::Intake;

/// Webhook route.
pub const WEBHOOK_PATH: &str = "/webhooks/email";
/// Health check route.
pub const HEALTH_PATH: &str = "/health";

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
    pub timestamp: String,
}

/// JSON body returned by the health check.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.is_internal() {
            tracing::error!(error = %self, code = self.code(), "Webhook processing failed");
        } else {
            tracing::warn!(error = %self, code = self.code(), "Webhook request rejected");
        }
        let body = ErrorResponse {
            success: false,
            error: self.code(),
            message: self.public_message(),
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router. `max_body_bytes` caps the raw webhook body.
pub fn router(intake: Arc<Intake>, max_body_bytes: usize) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(receive_email))
        .route(HEALTH_PATH, get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(intake)
}

/// POST /webhooks/email
///
/// Body read failures, including an oversized body, are answered as
/// `invalid_payload` so every failure keeps the JSON error shape.
async fn receive_email(
    State(intake): State<Arc<Intake>>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            return IntakeError::InvalidPayload(rejection.body_text()).into_response();
        }
    };
    match intake.handle(&headers, &body).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /health
async fn health(State(intake): State<Arc<Intake>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: intake.environment().to_string(),
    })
}

/// Bind and serve until Ctrl-C.
pub async fn start_server(config: &ServerConfig, intake: Arc<Intake>) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = router(intake, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| IntakeError::io(&addr, e))?;
    tracing::info!("Webhook listener on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| IntakeError::io(&addr, e))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
