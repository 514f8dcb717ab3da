//! Integration tests for the Rekognition and OpenPayments clients against
//! local fake servers

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{future, ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde_json::{json, Value};

use facepay_gateway::config::{PaymentsConfig, ProviderConfig, Settings};
use facepay_gateway::error::{ProxyError, VendorError};
use facepay_gateway::events::MemorySink;
use facepay_gateway::liveness::LivenessApi;
use facepay_gateway::payments::{OpenPaymentsClient, PaymentIntentRequest, PaymentsProxy};
use facepay_gateway::rekognition::RekognitionClient;

#[derive(Clone, Default)]
struct Recorded {
    calls: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

impl Recorded {
    fn push(&self, headers: HeaderMap, body: Value) {
        self.calls.lock().unwrap().push((headers, body));
    }

    fn take(&self) -> Vec<(HeaderMap, Value)> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn fake_rekognition(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let target = headers
        .get("x-amz-target")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    recorded.push(headers, payload.clone());

    match target.as_str() {
        "RekognitionService.CreateFaceLivenessSession" => {
            Json(json!({ "SessionId": "sess-from-aws" })).into_response()
        }
        "RekognitionService.GetFaceLivenessSessionResults" => {
            if payload["SessionId"] == "missing" {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "__type": "SessionNotFoundException" })),
                )
                    .into_response()
            } else {
                Json(json!({
                    "SessionId": payload["SessionId"],
                    "Status": "SUCCEEDED",
                    "Confidence": 92.5
                }))
                .into_response()
            }
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn provider_config(endpoint: String, with_credentials: bool) -> ProviderConfig {
    let mut settings = Settings {
        aws_region: Some("us-east-1".to_string()),
        rekognition_endpoint: Some(endpoint),
        ..Settings::default()
    };
    if with_credentials {
        settings.aws_access_key_id = Some("AKIDEXAMPLE".to_string());
        settings.aws_secret_access_key = Some("secret".to_string());
        settings.aws_session_token = Some("session-token".to_string());
    }
    ProviderConfig::resolve(&settings, &MemorySink::new())
}

#[tokio::test]
async fn rekognition_client_signs_and_parses() {
    let recorded = Recorded::default();
    let addr = serve(
        Router::new()
            .route("/", post(fake_rekognition))
            .with_state(recorded.clone()),
    )
    .await;

    let client = RekognitionClient::new(&provider_config(format!("http://{addr}"), true)).unwrap();

    let created = client.create_face_liveness_session().await.unwrap();
    assert_eq!(created.session_id.as_deref(), Some("sess-from-aws"));

    let results = client
        .get_face_liveness_session_results("sess-from-aws")
        .await
        .unwrap();
    assert_eq!(results.status.as_deref(), Some("SUCCEEDED"));
    assert_eq!(results.confidence, Some(92.5));

    let calls = recorded.take();
    assert_eq!(calls.len(), 2);
    let (headers, body) = &calls[1];
    assert_eq!(body, &json!({ "SessionId": "sess-from-aws" }));
    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/x-amz-json-1.1"
    );
    let authorization = headers.get("authorization").unwrap().to_str().unwrap();
    assert!(authorization.starts_with(
        "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"
    ));
    assert!(authorization.contains("/us-east-1/rekognition/aws4_request"));
    assert!(authorization
        .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target,"));
    assert!(headers.get("x-amz-date").is_some());
    assert_eq!(headers.get("x-amz-security-token").unwrap(), "session-token");
}

#[tokio::test]
async fn rekognition_client_signs_with_provider_credentials() {
    let recorded = Recorded::default();
    let addr = serve(
        Router::new()
            .route("/", post(fake_rekognition))
            .with_state(recorded.clone()),
    )
    .await;

    let provider = SharedCredentialsProvider::new(Credentials::new(
        "AKIDCHAIN",
        "chain-secret",
        Some("chain-token".to_string()),
        None,
        "test-chain",
    ));
    let client = RekognitionClient::with_credentials_provider(
        &provider_config(format!("http://{addr}"), false),
        provider,
    )
    .unwrap();
    client.create_face_liveness_session().await.unwrap();

    let calls = recorded.take();
    let headers = &calls[0].0;
    let authorization = headers.get("authorization").unwrap().to_str().unwrap();
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDCHAIN/"));
    assert!(authorization.contains("x-amz-security-token"));
    assert!(headers.get("x-amz-date").is_some());
    assert_eq!(headers.get("x-amz-security-token").unwrap(), "chain-token");
}

#[derive(Debug)]
struct NoCredentials;

impl ProvideCredentials for NoCredentials {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(Err(CredentialsError::not_loaded(
            "no credentials in this environment",
        )))
    }
}

#[tokio::test]
async fn rekognition_client_fails_without_credentials() {
    let recorded = Recorded::default();
    let addr = serve(
        Router::new()
            .route("/", post(fake_rekognition))
            .with_state(recorded.clone()),
    )
    .await;

    let client = RekognitionClient::with_credentials_provider(
        &provider_config(format!("http://{addr}"), false),
        SharedCredentialsProvider::new(NoCredentials),
    )
    .unwrap();
    let err = client.create_face_liveness_session().await.unwrap_err();

    assert!(matches!(err, VendorError::Credentials(_)));
    assert!(recorded.take().is_empty());
}

#[tokio::test]
async fn rekognition_error_status_is_reported() {
    let addr = serve(
        Router::new()
            .route("/", post(fake_rekognition))
            .with_state(Recorded::default()),
    )
    .await;

    let client = RekognitionClient::new(&provider_config(format!("http://{addr}"), true)).unwrap();
    let err = client
        .get_face_liveness_session_results("missing")
        .await
        .unwrap_err();

    match err {
        VendorError::Status { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("SessionNotFoundException"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

async fn fake_openpayments(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    recorded.push(headers, body);
    (
        StatusCode::CREATED,
        Json(json!({
            "intentId": "pi_live_1",
            "status": "pending",
            "approvalUrl": "https://pay.example/approve/pi_live_1",
            "expiresAt": "2026-01-01T00:00:00Z"
        })),
    )
}

fn payments_config(base_url: String) -> PaymentsConfig {
    let settings = Settings {
        openpayments_base_url: Some(base_url),
        openpayments_api_key: Some("op-key".to_string()),
        upstream_timeout_secs: Some(5),
        ..Settings::default()
    };
    PaymentsConfig::resolve(&settings, &MemorySink::new())
}

fn intent_request() -> PaymentIntentRequest {
    PaymentIntentRequest {
        amount: 50.0,
        currency: "USD".to_string(),
        user_id: "u1".to_string(),
    }
}

#[tokio::test]
async fn openpayments_client_posts_intent() {
    let recorded = Recorded::default();
    let addr = serve(
        Router::new()
            .route("/payments/intents", post(fake_openpayments))
            .with_state(recorded.clone()),
    )
    .await;

    let client = OpenPaymentsClient::new(payments_config(format!("http://{addr}"))).unwrap();
    let intent = client.create_payment_intent(&intent_request()).await.unwrap();

    assert_eq!(intent.intent_id.as_deref(), Some("pi_live_1"));
    assert!(!intent.simulated);
    assert_eq!(intent.extra["expiresAt"], json!("2026-01-01T00:00:00Z"));

    let calls = recorded.take();
    let (headers, body) = &calls[0];
    assert_eq!(headers.get("authorization").unwrap(), "Bearer op-key");
    assert_eq!(
        body,
        &json!({ "amount": 50.0, "currency": "USD", "metadata": { "userId": "u1" } })
    );
}

#[tokio::test]
async fn openpayments_error_status_is_reported() {
    let addr = serve(Router::new().route(
        "/payments/intents",
        post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "currency not supported") }),
    ))
    .await;

    let client = OpenPaymentsClient::new(payments_config(format!("http://{addr}"))).unwrap();
    let err = client.create_payment_intent(&intent_request()).await.unwrap_err();

    assert!(matches!(err, ProxyError::Status { status: 422, .. }));
}

#[tokio::test]
async fn openpayments_unreachable_host_is_configuration_error() {
    // Bind and drop to get a port nothing is listening on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base_url = format!("http://{addr}");
    let client = OpenPaymentsClient::new(payments_config(base_url.clone())).unwrap();
    let err = client.create_payment_intent(&intent_request()).await.unwrap_err();

    assert!(matches!(err, ProxyError::Unreachable { .. }));
    assert!(err.to_string().contains(&base_url));
    assert!(err.to_string().contains("OPENPAYMENTS_BASE_URL"));
}
