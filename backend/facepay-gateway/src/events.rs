/*!
 * Gateway Events
 * Degradation signals raised while resolving configuration and verifying faces
 */

use std::sync::Mutex;

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// No AWS region configured; verification runs against the stub backend.
    RegionMissing,
    /// No OpenPayments API key configured; intents will be simulated.
    PaymentsApiKeyMissing,
    /// A region was configured but the Rekognition client could not be built.
    VendorClientUnavailable { reason: String },
    /// A token was verified by the stub backend instead of the vendor.
    StubVerification { user_id: String },
    /// Verification was denied because the backend could not produce a result.
    VerificationUnavailable { user_id: String, reason: String },
}

/// Receives degradation events. Injected into config resolution and the
/// face-auth gateway.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: GatewayEvent);
}

/// Writes every event as a `warn!` line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::RegionMissing => warn!(
                "AWS_REGION is not configured; Rekognition Face Liveness stays in stub mode"
            ),
            GatewayEvent::PaymentsApiKeyMissing => warn!(
                "OPENPAYMENTS_API_KEY is not configured; payment intents will be simulated"
            ),
            GatewayEvent::VendorClientUnavailable { reason } => {
                warn!(%reason, "Rekognition client unavailable; face-auth backend disabled")
            }
            GatewayEvent::StubVerification { user_id } => {
                warn!(%user_id, "face-auth token verified by stub backend, not Rekognition")
            }
            GatewayEvent::VerificationUnavailable { user_id, reason } => {
                warn!(%user_id, %reason, "face-auth verification denied: backend unavailable")
            }
        }
    }
}

/// Keeps events in memory so callers can inspect them.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<GatewayEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GatewayEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn contains(&self, event: &GatewayEvent) -> bool {
        self.events().iter().any(|recorded| recorded == event)
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: GatewayEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
