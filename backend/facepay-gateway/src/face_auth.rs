/*!
 * Face Auth Gateway
 * Creates liveness sessions and turns a presented token into an admit/deny
 * decision
 */

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::error::GatewayError;
use crate::events::{EventSink, GatewayEvent};
use crate::liveness::{BackendKind, LivenessBackend, LivenessSession};

/// Produces the boolean admission decision for a user and token.
#[async_trait]
pub trait FaceVerifier: Send + Sync {
    async fn verify(&self, user_id: &str, token: &str) -> bool;
}

pub struct FaceAuthGateway {
    backend: LivenessBackend,
    min_confidence: f64,
    events: Arc<dyn EventSink>,
}

impl FaceAuthGateway {
    pub fn new(backend: LivenessBackend, min_confidence: f64, events: Arc<dyn EventSink>) -> Self {
        Self {
            backend,
            min_confidence,
            events,
        }
    }

    /// Picks the backend from the resolved provider config. The choice is
    /// fixed for the lifetime of the gateway.
    pub fn from_config(config: &ProviderConfig, events: Arc<dyn EventSink>) -> Self {
        let backend = LivenessBackend::select(config, events.as_ref());
        Self::new(backend, config.min_confidence, events)
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Only the vendor backend can create sessions.
    pub async fn create_session(&self) -> Result<LivenessSession, GatewayError> {
        let session = self.backend.create_session().await?;
        info!(session_id = %session.session_id, "Face Liveness session created");
        Ok(session)
    }
}

#[async_trait]
impl FaceVerifier for FaceAuthGateway {
    async fn verify(&self, user_id: &str, token: &str) -> bool {
        if user_id.is_empty() || token.is_empty() {
            return false;
        }

        if self.backend.kind() == BackendKind::Stub {
            self.events.emit(GatewayEvent::StubVerification {
                user_id: user_id.to_string(),
            });
        }

        match self.backend.fetch_result(token).await {
            Ok(result) => {
                let admitted = result.admits(self.min_confidence);
                debug!(
                    user_id,
                    status = ?result.status,
                    confidence = result.confidence,
                    threshold = self.min_confidence,
                    admitted,
                    "face-auth decision"
                );
                admitted
            }
            Err(err) => {
                self.events.emit(GatewayEvent::VerificationUnavailable {
                    user_id: user_id.to_string(),
                    reason: err.to_string(),
                });
                false
            }
        }
    }
}
