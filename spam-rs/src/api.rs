//! API Server - HTTP surface for the classifier
//!
//! `POST /predict` classifies a message, `GET /` and `GET /health` report
//! whether artifacts are loaded.

use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{Response, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::ServiceStatus;
use crate::service::{ErrorBody, InferenceService};

/// API server
pub struct ApiServer {
    service: Arc<InferenceService>,
    config: ServerConfig,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(service: InferenceService, config: ServerConfig) -> Self {
        Self {
            service: Arc::new(service),
            config,
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        router(self.service.clone(), self.config.max_body_bytes)
    }

    /// Start the API server and run until Ctrl-C
    pub async fn run(&self) -> std::io::Result<()> {
        let router = self.router();

        info!("Starting API server on {}", self.config.listen_addr);
        if let Some(reason) = self.service.state().reason() {
            info!("Serving in degraded mode: {}", reason);
        }

        let listener = tokio::net::TcpListener::bind(&self.config.listen_addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server stopped");
        Ok(())
    }
}

/// Router over a shared inference service
///
/// Bodies above `max_body_bytes` are answered with a JSON 413 by `predict`.
pub fn router(service: Arc<InferenceService>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(cors),
        )
        .with_state(service)
}

/// POST /predict - classify `{"message": "..."}`
///
/// The body is read as raw bytes so a missing or wrong content-type is
/// still parsed as JSON. A body the transport rejects still gets a JSON reply.
async fn predict(
    State(service): State<Arc<InferenceService>>,
    body: Result<Bytes, BytesRejection>,
) -> impl IntoResponse {
    let (status, payload) = match body {
        Ok(body) => service.respond(&body),
        Err(rejection) => service.respond_unreadable(rejection.status(), rejection.body_text()),
    };
    (status, Json(payload))
}

/// GET / - liveness, always 200
async fn status(State(service): State<Arc<InferenceService>>) -> impl IntoResponse {
    Json(ServiceStatus::from_state(service.state()))
}

/// GET /health - readiness, 503 while artifacts are unavailable
async fn health(State(service): State<Arc<InferenceService>>) -> impl IntoResponse {
    let report = ServiceStatus::from_state(service.state());
    let code = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not found")))
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response<Body> {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!("Request handler panicked: {}", details);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::with_details(
            "An internal error occurred during prediction.",
            details,
        )),
    )
        .into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
