/*!
 * Error types shared by the gateway, the vendor client and the payments proxy
 */

use thiserror::Error;

/// Failures of the vendor liveness transport.
#[derive(Debug, Error)]
pub enum VendorError {
    #[error("invalid AWS region '{0}'")]
    InvalidRegion(String),

    #[error("invalid Rekognition endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to load AWS credentials: {0}")]
    Credentials(String),

    #[error("failed to build Rekognition HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Rekognition request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Rekognition returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode or decode Rekognition payload: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Failures surfaced by face-auth session creation.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    BackendUnavailable(String),

    #[error("{0}")]
    MalformedBackendResponse(String),

    #[error(transparent)]
    Vendor(#[from] VendorError),
}

/// Failures of the payments proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(
        "Unable to reach the OpenPayments host at {base_url}. Check OPENPAYMENTS_BASE_URL and network connectivity."
    )]
    Unreachable { base_url: String },

    #[error("OpenPayments request timed out")]
    Timeout,

    #[error("failed to build OpenPayments HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("OpenPayments request failed: {0}")]
    Request(String),

    #[error("OpenPayments returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("OpenPayments returned an unreadable payment intent: {0}")]
    Decode(String),
}
