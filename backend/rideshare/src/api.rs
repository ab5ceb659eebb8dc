//! Axum REST API handlers.
//!
//! The routes mirror what the form-based front end does: connect a wallet,
//! fill in a ride draft or a ride id, then trigger one of the three actions.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::controller::{ControllerState, RideAction, RideController};
use crate::encoder::RideDraft;
use crate::errors::{Field, WalletError};
use crate::transaction::{FailureReason, SubmissionOutcome, TransactionHash};

pub struct AppState {
    pub controller: Arc<RideController>,
    /// Provider used when a connect request does not name one.
    pub wallet_provider: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", get(get_session))
        .route("/session/connect", post(connect))
        .route("/session/disconnect", post(disconnect))
        .route("/draft", get(get_draft).put(put_draft))
        .route("/ride-id", get(get_ride_id).put(put_ride_id))
        .route("/rides", post(create_ride))
        .route("/rides/book", post(book_ride))
        .route("/rides/complete", post(complete_ride))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct RideIdBody {
    pub ride_id: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub connected: bool,
    pub account: Option<String>,
    /// Abbreviated account for display.
    pub short: Option<String>,
    pub state: ControllerState,
}

#[derive(Serialize)]
pub struct ConfirmedResponse {
    pub status: &'static str,
    pub action: RideAction,
    pub hash: TransactionHash,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct FailedResponse {
    pub status: &'static str,
    pub action: RideAction,
    pub kind: &'static str,
    pub message: &'static str,
    pub reason: String,
    /// Offending input, for encoding failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<Field>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /session`
pub async fn get_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(session_response(&state.controller))
}

/// `POST /session/connect`
pub async fn connect(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ConnectRequest>,
) -> Response {
    let provider = body.provider.unwrap_or_else(|| state.wallet_provider.clone());
    match state.controller.session().connect(&provider).await {
        Ok(_) => (StatusCode::OK, Json(session_response(&state.controller))).into_response(),
        Err(e) => {
            let status = match e {
                WalletError::Http(_) | WalletError::Json(_) => StatusCode::BAD_GATEWAY,
                WalletError::NotConnected | WalletError::Rejected(_) => StatusCode::BAD_REQUEST,
            };
            (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// `POST /session/disconnect`
pub async fn disconnect(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.controller.session().disconnect().await;
    Json(session_response(&state.controller))
}

/// `GET /draft`
pub async fn get_draft(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.controller.draft())
}

/// `PUT /draft`
pub async fn put_draft(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<RideDraft>,
) -> impl IntoResponse {
    state.controller.set_draft(draft);
    Json(state.controller.draft())
}

/// `GET /ride-id`
pub async fn get_ride_id(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(RideIdBody {
        ride_id: state.controller.ride_id(),
    })
}

/// `PUT /ride-id`
pub async fn put_ride_id(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RideIdBody>,
) -> impl IntoResponse {
    state.controller.set_ride_id(&body.ride_id);
    Json(RideIdBody {
        ride_id: state.controller.ride_id(),
    })
}

/// `POST /rides`
///
/// Creates a ride from the stored draft.
pub async fn create_ride(State(state): State<Arc<AppState>>) -> Response {
    outcome_response(RideAction::Create, state.controller.create_ride().await)
}

/// `POST /rides/book`
pub async fn book_ride(State(state): State<Arc<AppState>>) -> Response {
    outcome_response(RideAction::Book, state.controller.book_ride().await)
}

/// `POST /rides/complete`
pub async fn complete_ride(State(state): State<Arc<AppState>>) -> Response {
    outcome_response(RideAction::Complete, state.controller.complete_ride().await)
}

fn session_response(controller: &RideController) -> SessionResponse {
    let account = controller.session().account();
    SessionResponse {
        connected: account.is_some(),
        short: account.as_ref().map(|a| a.short()),
        account: account.map(String::from),
        state: controller.state(),
    }
}

fn failure_status(reason: &FailureReason) -> StatusCode {
    match reason {
        FailureReason::Encoding(_) | FailureReason::SubmissionFailure(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        FailureReason::NotConnected => StatusCode::UNAUTHORIZED,
        FailureReason::Busy => StatusCode::CONFLICT,
        FailureReason::WalletRejection(_) => StatusCode::BAD_REQUEST,
        FailureReason::FinalityTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        FailureReason::FinalityUnknown(_) => StatusCode::BAD_GATEWAY,
    }
}

fn outcome_response(action: RideAction, outcome: SubmissionOutcome) -> Response {
    match outcome {
        SubmissionOutcome::Confirmed(hash) => (
            StatusCode::OK,
            Json(ConfirmedResponse {
                status: "confirmed",
                action,
                hash,
                message: action.success_message(),
            }),
        )
            .into_response(),
        SubmissionOutcome::Failed(reason) => (
            failure_status(&reason),
            Json(FailedResponse {
                status: "failed",
                action,
                kind: reason.kind(),
                message: action.failure_message(),
                field: match &reason {
                    FailureReason::Encoding(e) => Some(e.field),
                    _ => None,
                },
                reason: reason.to_string(),
            }),
        )
            .into_response(),
    }
}
