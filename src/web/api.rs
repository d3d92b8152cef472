//! Defines the Axum API routes and handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::sync::watch;

use crate::transport::{CommandIngress, Egress, SetpointMessage, StatusMessage};
use crate::web::models::{AcceptedResponse, ErrorResponse};

#[derive(Clone)]
pub struct AppState {
    pub ingress: CommandIngress,
    pub setpoint: watch::Receiver<Option<SetpointMessage>>,
    pub status: watch::Receiver<Option<StatusMessage>>,
}

impl AppState {
    pub fn new(ingress: CommandIngress, egress: &Egress) -> Self {
        Self {
            ingress,
            setpoint: egress.latest_setpoint(),
            status: egress.latest_status(),
        }
    }
}

/// Creates the Axum router with all the API endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/cmd", post(post_command))
        .route("/api/v1/setpoint", get(get_setpoint))
        .route("/api/v1/status", get(get_status))
        .with_state(state)
}

/// Queue a command envelope; it replaces any command not yet applied.
async fn post_command(State(state): State<AppState>, body: String) -> Response {
    match state.ingress.deliver(&body) {
        Ok(()) => (StatusCode::ACCEPTED, Json(AcceptedResponse { accepted: true })).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string()))).into_response(),
    }
}

/// Last setpoint emitted by the publish loop.
async fn get_setpoint(State(state): State<AppState>) -> Result<Json<SetpointMessage>, StatusCode> {
    state
        .setpoint
        .borrow()
        .clone()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Last status produced by an applied command.
async fn get_status(State(state): State<AppState>) -> Result<Json<StatusMessage>, StatusCode> {
    state
        .status
        .borrow()
        .clone()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
