//! Axum route handlers.

use crate::mail::{Mailer, OutgoingMail};
use crate::service::runtime::NoteService;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use log::{error, info};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handler state.
pub struct AppState {
    pub mailer: Arc<dyn Mailer>,
    pub service: Arc<Mutex<NoteService>>,
    pub sender_address: String,
    pub recipient: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub watch_root: String,
    pub sender_address: String,
    pub recipient: String,
}

/// Error reply rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                detail: self.detail,
            }),
        )
            .into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/send-email", post(send_email))
        .route("/status", get(status))
        .route("/service/start", post(start_service))
        .route("/service/stop", post(stop_service))
        .with_state(state)
}

// POST /send-email
async fn send_email(
    State(state): State<Arc<AppState>>,
    Json(mail): Json<OutgoingMail>,
) -> Result<Json<MessageResponse>, ApiError> {
    info!(
        "event=http_send_email module=http status=start recipient={}",
        mail.recipient
    );
    let mailer = Arc::clone(&state.mailer);
    match tokio::task::spawn_blocking(move || mailer.send(&mail)).await {
        Ok(Ok(())) => Ok(Json(MessageResponse {
            message: "Email sent successfully".to_string(),
        })),
        Ok(Err(err)) => {
            error!("event=http_send_email module=http status=error error={err}");
            Err(ApiError::internal(err.to_string()))
        }
        Err(err) => {
            error!("event=http_send_email module=http status=error error_code=worker_failed error={err}");
            Err(ApiError::internal(err.to_string()))
        }
    }
}

// GET /status
async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let service = state.service.lock().await;
    Json(status_snapshot(&state, &service))
}

// POST /service/start
async fn start_service(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let mut service = state.service.lock().await;
    service
        .start()
        .map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(Json(status_snapshot(&state, &service)))
}

// POST /service/stop
async fn stop_service(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let mut service = state.service.lock().await;
    service.stop().await;
    Json(status_snapshot(&state, &service))
}

fn status_snapshot(state: &AppState, service: &NoteService) -> StatusResponse {
    StatusResponse {
        running: service.is_running(),
        watch_root: service.watch_root().display().to_string(),
        sender_address: state.sender_address.clone(),
        recipient: state.recipient.clone(),
    }
}
