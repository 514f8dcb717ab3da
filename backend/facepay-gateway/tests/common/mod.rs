//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Map;

use facepay_gateway::api::AppState;
use facepay_gateway::authorizer::PaymentAuthorizer;
use facepay_gateway::error::{ProxyError, VendorError};
use facepay_gateway::events::MemorySink;
use facepay_gateway::face_auth::{FaceAuthGateway, FaceVerifier};
use facepay_gateway::liveness::{
    CreateSessionOutput, LivenessApi, LivenessBackend, SessionResultsOutput,
};
use facepay_gateway::payments::{PaymentIntent, PaymentIntentRequest, PaymentsProxy};

/// Vendor API returning canned responses and counting calls.
#[derive(Default)]
pub struct FakeLivenessApi {
    pub session_id: Option<String>,
    pub status: Option<String>,
    pub confidence: Option<f64>,
    pub fail_with_status: Option<u16>,
    pub create_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl FakeLivenessApi {
    pub fn with_result(status: &str, confidence: f64) -> Self {
        Self {
            status: Some(status.to_string()),
            confidence: Some(confidence),
            ..Self::default()
        }
    }

    pub fn with_session(session_id: &str) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            ..Self::default()
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            fail_with_status: Some(status),
            ..Self::default()
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LivenessApi for FakeLivenessApi {
    async fn create_face_liveness_session(&self) -> Result<CreateSessionOutput, VendorError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.fail_with_status {
            return Err(VendorError::Status {
                status,
                body: "unavailable".to_string(),
            });
        }
        Ok(CreateSessionOutput {
            session_id: self.session_id.clone(),
        })
    }

    async fn get_face_liveness_session_results(
        &self,
        session_id: &str,
    ) -> Result<SessionResultsOutput, VendorError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.fail_with_status {
            return Err(VendorError::Status {
                status,
                body: "unavailable".to_string(),
            });
        }
        Ok(SessionResultsOutput {
            session_id: Some(session_id.to_string()),
            status: self.status.clone(),
            confidence: self.confidence,
        })
    }
}

/// Verifier with a fixed answer that counts calls.
pub struct CountingVerifier {
    pub answer: bool,
    pub calls: AtomicUsize,
}

impl CountingVerifier {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceVerifier for CountingVerifier {
    async fn verify(&self, _user_id: &str, _token: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

/// Payments proxy that records requests and answers with a fixed outcome.
pub struct RecordingProxy {
    pub fail: Option<fn() -> ProxyError>,
    pub requests: Mutex<Vec<PaymentIntentRequest>>,
}

impl RecordingProxy {
    pub fn ok() -> Self {
        Self {
            fail: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(fail: fn() -> ProxyError) -> Self {
        Self {
            fail: Some(fail),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PaymentIntentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentsProxy for RecordingProxy {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, ProxyError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(fail) = self.fail {
            return Err(fail());
        }
        Ok(PaymentIntent {
            intent_id: Some("pi_test".to_string()),
            status: Some("pending".to_string()),
            approval_url: Some("https://pay.example/approve/pi_test".to_string()),
            simulated: false,
            extra: Map::new(),
        })
    }
}

pub fn stub_gateway(sink: Arc<MemorySink>) -> FaceAuthGateway {
    FaceAuthGateway::new(LivenessBackend::Stub, 80.0, sink)
}

pub fn vendor_gateway(
    api: Arc<FakeLivenessApi>,
    threshold: f64,
    sink: Arc<MemorySink>,
) -> FaceAuthGateway {
    FaceAuthGateway::new(LivenessBackend::Vendor(api), threshold, sink)
}

pub fn app_state(face_auth: FaceAuthGateway, payments: Arc<dyn PaymentsProxy>) -> AppState {
    let face_auth = Arc::new(face_auth);
    let authorizer = Arc::new(PaymentAuthorizer::new(face_auth.clone(), payments));
    AppState {
        face_auth,
        authorizer,
    }
}
