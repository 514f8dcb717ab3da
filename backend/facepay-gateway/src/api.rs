/*!
 * HTTP API
 *
 * Endpoints:
 * - GET  /health                 - Health check
 * - POST /api/face-auth/session  - Create a Face Liveness session
 * - POST /api/payments           - Verify face-auth token and create a payment intent
 */

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::authorizer::{AuthorizationError, PaymentAuthorizer, PaymentRequest};
use crate::error::GatewayError;
use crate::face_auth::FaceAuthGateway;
use crate::liveness::LivenessSession;
use crate::payments::PaymentIntent;

#[derive(Clone)]
pub struct AppState {
    pub face_auth: Arc<FaceAuthGateway>,
    pub authorizer: Arc<PaymentAuthorizer>,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: String,
    pub data: T,
}

/// JSON `{ message }` error body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(message: String, fallback: &str) -> Self {
        let message = if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        };
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        error!(error = %err, "Face Liveness session creation failed");
        Self::internal(
            err.to_string(),
            "Unknown error while creating the Face Liveness session.",
        )
    }
}

impl From<AuthorizationError> for ApiError {
    fn from(err: AuthorizationError) -> Self {
        match err {
            denied @ AuthorizationError::VerificationDenied => {
                Self::new(StatusCode::UNAUTHORIZED, denied.to_string())
            }
            AuthorizationError::Proxy(inner) => {
                error!(error = %inner, "payment intent creation failed");
                Self::internal(inner.to_string(), "Unknown error while creating the payment")
            }
            other if other.is_validation() => Self::new(StatusCode::BAD_REQUEST, other.to_string()),
            other => Self::internal(other.to_string(), "Unknown error while creating the payment"),
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/face-auth/session", post(start_face_auth_session))
        .route("/api/payments", post(create_payment_intent))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `*` allows any origin; anything else must be a single valid origin.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::exact(HeaderValue::from_str(origin.trim())?)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn start_face_auth_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Envelope<LivenessSession>>), ApiError> {
    info!("Face Liveness session request");

    let session = state.face_auth.create_session().await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope {
            message: "Face Liveness session created.".to_string(),
            data: session,
        }),
    ))
}

async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<PaymentIntent>>), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid payment request body: {}", rejection.body_text()),
        )
    })?;

    info!(user_id = ?request.user_id, "payment request");

    let intent = state.authorizer.authorize(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope {
            message: "Payment intent created".to_string(),
            data: intent,
        }),
    ))
}
