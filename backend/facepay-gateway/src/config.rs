/*!
 * Configuration
 * Raw settings come from flags or environment; resolution happens once at startup
 */

use std::time::Duration;

use clap::Args;
use secrecy::{ExposeSecret, SecretString};

use crate::events::{EventSink, GatewayEvent};

pub const DEFAULT_MIN_CONFIDENCE: f64 = 80.0;
pub const DEFAULT_OPENPAYMENTS_BASE_URL: &str = "https://api.openpayments.guide";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Unresolved configuration surface. Every field is optional; defaults are
/// applied by [`ProviderConfig::resolve`] and [`PaymentsConfig::resolve`].
#[derive(Debug, Clone, Default, Args)]
pub struct Settings {
    /// AWS region hosting Rekognition Face Liveness
    #[arg(long, env = "AWS_REGION")]
    pub aws_region: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub aws_access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_access_key: Option<String>,

    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub aws_session_token: Option<String>,

    /// Minimum liveness confidence (0-100) required to admit a payment
    #[arg(long, env = "AWS_REKOGNITION_FACE_LIVENESS_MIN_CONFIDENCE")]
    pub min_confidence: Option<String>,

    /// Override for the Rekognition endpoint (defaults to the regional one)
    #[arg(long, env = "AWS_REKOGNITION_ENDPOINT")]
    pub rekognition_endpoint: Option<String>,

    #[arg(long, env = "OPENPAYMENTS_BASE_URL")]
    pub openpayments_base_url: Option<String>,

    #[arg(long, env = "OPENPAYMENTS_API_KEY", hide_env_values = true)]
    pub openpayments_api_key: Option<String>,

    /// Deadline in seconds for each outbound vendor or payments call
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,
}

/// Parses a confidence threshold the way `parseFloat` would: the longest
/// numeric prefix wins, anything without one falls back. No clamping.
pub fn parse_confidence_threshold(raw: Option<&str>, fallback: f64) -> f64 {
    let Some(raw) = raw else {
        return fallback;
    };
    let prefix = numeric_prefix(raw.trim_start());
    if prefix.is_empty() {
        return fallback;
    }
    match prefix.parse::<f64>() {
        Ok(value) if !value.is_nan() => value,
        _ => fallback,
    }
}

fn numeric_prefix(input: &str) -> &str {
    let bytes = input.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if input[end..].starts_with("Infinity") {
        return &input[..end + "Infinity".len()];
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - (end + 1);
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return "";
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    &input[..end]
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Key pair used to sign Rekognition requests.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
}

/// Resolved liveness provider configuration. Immutable after startup.
#[derive(Debug)]
pub struct ProviderConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<SecretString>,
    pub session_token: Option<SecretString>,
    pub min_confidence: f64,
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn resolve(settings: &Settings, events: &dyn EventSink) -> Self {
        let region = non_empty(&settings.aws_region).unwrap_or_default();
        if region.is_empty() {
            events.emit(GatewayEvent::RegionMissing);
        }

        Self {
            region,
            access_key_id: non_empty(&settings.aws_access_key_id),
            secret_access_key: non_empty(&settings.aws_secret_access_key).map(SecretString::from),
            session_token: non_empty(&settings.aws_session_token).map(SecretString::from),
            min_confidence: parse_confidence_threshold(
                settings.min_confidence.as_deref(),
                DEFAULT_MIN_CONFIDENCE,
            ),
            endpoint: non_empty(&settings.rekognition_endpoint),
            timeout: upstream_timeout(settings),
        }
    }

    pub fn has_region(&self) -> bool {
        !self.region.is_empty()
    }

    /// Static credentials exist only when both halves of the key pair are set.
    /// A session token on its own is ignored.
    pub fn static_credentials(&self) -> Option<StaticCredentials> {
        let access_key_id = self.access_key_id.clone()?;
        let secret = self.secret_access_key.as_ref()?;
        Some(StaticCredentials {
            access_key_id,
            secret_access_key: SecretString::from(secret.expose_secret().to_owned()),
            session_token: self
                .session_token
                .as_ref()
                .map(|token| SecretString::from(token.expose_secret().to_owned())),
        })
    }
}

/// Resolved OpenPayments proxy configuration.
#[derive(Debug)]
pub struct PaymentsConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl PaymentsConfig {
    pub fn resolve(settings: &Settings, events: &dyn EventSink) -> Self {
        let api_key = settings.openpayments_api_key.clone().unwrap_or_default();
        if api_key.trim().is_empty() {
            events.emit(GatewayEvent::PaymentsApiKeyMissing);
        }

        Self {
            base_url: settings
                .openpayments_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENPAYMENTS_BASE_URL.to_string()),
            api_key: SecretString::from(api_key.trim().to_string()),
            timeout: upstream_timeout(settings),
        }
    }

    /// False when either the base URL or the API key is empty.
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.api_key.expose_secret().is_empty()
    }
}

fn upstream_timeout(settings: &Settings) -> Duration {
    Duration::from_secs(
        settings
            .upstream_timeout_secs
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS)
            .max(1),
    )
}
