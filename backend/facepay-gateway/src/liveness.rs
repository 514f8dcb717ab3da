/*!
 * Liveness Backends
 * Vendor (Rekognition Face Liveness), stub and disabled variants, chosen once
 * when the gateway is built
 */

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ProviderConfig;
use crate::error::{GatewayError, VendorError};
use crate::events::{EventSink, GatewayEvent};
use crate::rekognition::RekognitionClient;

/// Tokens carrying this prefix are treated as pre-validated by the stub backend.
pub const STUB_TOKEN_PREFIX: &str = "valid-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Succeeded,
    Failed,
    InProgress,
    Unknown,
}

impl VerificationStatus {
    /// Vendor statuses outside the known set (CREATED, EXPIRED, ...) and a
    /// missing status both map to `Unknown`.
    pub fn from_vendor(raw: Option<&str>) -> Self {
        match raw {
            Some("SUCCEEDED") => Self::Succeeded,
            Some("FAILED") => Self::Failed,
            Some("IN_PROGRESS") => Self::InProgress,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub session_id: String,
    pub confidence: f64,
    pub status: VerificationStatus,
}

impl VerificationResult {
    pub fn admits(&self, threshold: f64) -> bool {
        self.status == VerificationStatus::Succeeded && self.confidence >= threshold
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessSession {
    pub session_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateSessionOutput {
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionResultsOutput {
    pub session_id: Option<String>,
    pub status: Option<String>,
    pub confidence: Option<f64>,
}

/// Raw vendor operations. Implemented by [`RekognitionClient`].
#[async_trait]
pub trait LivenessApi: Send + Sync {
    async fn create_face_liveness_session(&self) -> Result<CreateSessionOutput, VendorError>;

    async fn get_face_liveness_session_results(
        &self,
        session_id: &str,
    ) -> Result<SessionResultsOutput, VendorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Vendor,
    Stub,
    Disabled,
}

pub enum LivenessBackend {
    Vendor(Arc<dyn LivenessApi>),
    Stub,
    Disabled { reason: String },
}

impl LivenessBackend {
    /// Stub without a region, vendor when the client builds, disabled otherwise.
    pub fn select(config: &ProviderConfig, events: &dyn EventSink) -> Self {
        if !config.has_region() {
            info!("no AWS region configured; using stub liveness backend");
            return Self::Stub;
        }

        match RekognitionClient::new(config) {
            Ok(client) => {
                info!(region = %config.region, endpoint = %client.endpoint(), "Rekognition Face Liveness enabled");
                Self::Vendor(Arc::new(client))
            }
            Err(err) => {
                let reason = err.to_string();
                events.emit(GatewayEvent::VendorClientUnavailable {
                    reason: reason.clone(),
                });
                Self::Disabled { reason }
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Vendor(_) => BackendKind::Vendor,
            Self::Stub => BackendKind::Stub,
            Self::Disabled { .. } => BackendKind::Disabled,
        }
    }

    pub async fn create_session(&self) -> Result<LivenessSession, GatewayError> {
        match self {
            Self::Vendor(api) => {
                let output = api.create_face_liveness_session().await?;
                match output.session_id.filter(|id| !id.is_empty()) {
                    Some(session_id) => Ok(LivenessSession { session_id }),
                    None => Err(GatewayError::MalformedBackendResponse(
                        "Rekognition did not return a SessionId for the Face Liveness session"
                            .to_string(),
                    )),
                }
            }
            Self::Stub => Err(GatewayError::BackendUnavailable(
                "AWS Rekognition Face Liveness is not configured; set AWS_REGION to create sessions"
                    .to_string(),
            )),
            Self::Disabled { reason } => Err(GatewayError::BackendUnavailable(format!(
                "AWS Rekognition Face Liveness is unavailable: {reason}"
            ))),
        }
    }

    pub async fn fetch_result(&self, token: &str) -> Result<VerificationResult, GatewayError> {
        match self {
            Self::Vendor(api) => {
                let output = api.get_face_liveness_session_results(token).await?;
                Ok(VerificationResult {
                    session_id: token.to_string(),
                    confidence: output.confidence.unwrap_or(0.0),
                    status: VerificationStatus::from_vendor(output.status.as_deref()),
                })
            }
            Self::Stub => {
                let accepted = token.starts_with(STUB_TOKEN_PREFIX);
                Ok(VerificationResult {
                    session_id: token.to_string(),
                    confidence: if accepted { 100.0 } else { 0.0 },
                    status: if accepted {
                        VerificationStatus::Succeeded
                    } else {
                        VerificationStatus::Failed
                    },
                })
            }
            Self::Disabled { reason } => Err(GatewayError::BackendUnavailable(reason.clone())),
        }
    }
}
