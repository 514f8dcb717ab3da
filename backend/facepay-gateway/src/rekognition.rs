/*!
 * Rekognition Face Liveness client
 * Talks to the AWS JSON 1.1 API over HTTPS, signing every request with SigV4.
 * Credentials come from the configured key pair or, without one, from the
 * AWS default provider chain (environment, profile, web identity, IMDS)
 */

use async_trait::async_trait;
use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_config::Region;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::{ProviderConfig, StaticCredentials};
use crate::error::VendorError;
use crate::liveness::{CreateSessionOutput, LivenessApi, SessionResultsOutput};
use crate::sigv4::{self, CanonicalRequest, SigningParams};

const SERVICE: &str = "rekognition";
const CONTENT_TYPE_JSON_1_1: &str = "application/x-amz-json-1.1";

enum CredentialSource {
    Static(StaticCredentials),
    Provider(SharedCredentialsProvider),
    /// Loading the chain is async, so it is built on the first call.
    DefaultChain(OnceCell<SharedCredentialsProvider>),
}

pub struct RekognitionClient {
    region: String,
    endpoint: Url,
    host: String,
    credentials: CredentialSource,
    http: reqwest::Client,
}

impl RekognitionClient {
    /// Fails when the region or endpoint is unusable or the HTTP client
    /// cannot be built. Without a static key pair the default credential
    /// chain is used.
    pub fn new(config: &ProviderConfig) -> Result<Self, VendorError> {
        let credentials = match config.static_credentials() {
            Some(credentials) => CredentialSource::Static(credentials),
            None => CredentialSource::DefaultChain(OnceCell::new()),
        };
        Self::build(config, credentials)
    }

    /// Signs with credentials from `provider` instead of the configured ones.
    pub fn with_credentials_provider(
        config: &ProviderConfig,
        provider: SharedCredentialsProvider,
    ) -> Result<Self, VendorError> {
        Self::build(config, CredentialSource::Provider(provider))
    }

    fn build(config: &ProviderConfig, credentials: CredentialSource) -> Result<Self, VendorError> {
        let region = config.region.trim();
        if !is_valid_region(region) {
            return Err(VendorError::InvalidRegion(config.region.clone()));
        }

        let endpoint_str = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{SERVICE}.{region}.amazonaws.com"));
        let endpoint = Url::parse(&endpoint_str).map_err(|e| VendorError::InvalidEndpoint {
            endpoint: endpoint_str.clone(),
            reason: e.to_string(),
        })?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(VendorError::InvalidEndpoint {
                    endpoint: endpoint_str,
                    reason: "missing host".to_string(),
                })
            }
        };

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(VendorError::Client)?;

        Ok(Self {
            region: region.to_string(),
            endpoint,
            host,
            credentials,
            http,
        })
    }

    async fn resolve_credentials(&self) -> Result<StaticCredentials, VendorError> {
        let provider = match &self.credentials {
            CredentialSource::Static(credentials) => return Ok(credentials.clone()),
            CredentialSource::Provider(provider) => provider,
            CredentialSource::DefaultChain(cell) => {
                cell.get_or_init(|| async {
                    let chain = DefaultCredentialsChain::builder()
                        .region(Region::new(self.region.clone()))
                        .build()
                        .await;
                    SharedCredentialsProvider::new(chain)
                })
                .await
            }
        };

        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| VendorError::Credentials(e.to_string()))?;
        Ok(StaticCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: SecretString::from(credentials.secret_access_key().to_string()),
            session_token: credentials
                .session_token()
                .map(|token| SecretString::from(token.to_string())),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, operation: &str, body: &Value) -> Result<T, VendorError> {
        let payload = serde_json::to_vec(body)?;
        let target = format!("RekognitionService.{operation}");

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON_1_1));
        headers.insert("x-amz-target", header_value(&target)?);

        let credentials = self.resolve_credentials().await?;
        let signed_headers = [
            ("content-type", CONTENT_TYPE_JSON_1_1),
            ("host", self.host.as_str()),
            ("x-amz-target", target.as_str()),
        ];
        let signature = sigv4::sign(
            &SigningParams {
                access_key_id: &credentials.access_key_id,
                secret_access_key: credentials.secret_access_key.expose_secret(),
                session_token: credentials
                    .session_token
                    .as_ref()
                    .map(|token| token.expose_secret()),
                region: &self.region,
                service: SERVICE,
                time: Utc::now(),
            },
            &CanonicalRequest {
                method: "POST",
                path: self.endpoint.path(),
                query: self.endpoint.query().unwrap_or(""),
                headers: &signed_headers,
                payload: &payload,
            },
        );
        headers.insert(AUTHORIZATION, header_value(&signature.authorization)?);
        headers.insert("x-amz-date", header_value(&signature.amz_date)?);
        if let Some(token) = &signature.security_token {
            headers.insert("x-amz-security-token", header_value(token)?);
        }

        debug!(operation, endpoint = %self.endpoint, "calling Rekognition");

        let response = self
            .http
            .post(self.endpoint.clone())
            .headers(headers)
            .body(payload)
            .send()
            .await
            .map_err(VendorError::Transport)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(VendorError::Transport)?;
        if !status.is_success() {
            return Err(VendorError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl LivenessApi for RekognitionClient {
    async fn create_face_liveness_session(&self) -> Result<CreateSessionOutput, VendorError> {
        self.call("CreateFaceLivenessSession", &json!({})).await
    }

    async fn get_face_liveness_session_results(
        &self,
        session_id: &str,
    ) -> Result<SessionResultsOutput, VendorError> {
        self.call(
            "GetFaceLivenessSessionResults",
            &json!({ "SessionId": session_id }),
        )
        .await
    }
}

fn header_value(value: &str) -> Result<HeaderValue, VendorError> {
    HeaderValue::from_str(value).map_err(|e| VendorError::InvalidEndpoint {
        endpoint: value.to_string(),
        reason: e.to_string(),
    })
}

fn is_valid_region(region: &str) -> bool {
    !region.is_empty()
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
