/*!
 * OpenPayments proxy
 * Forwards payment intents, or simulates them when no API key is configured
 */

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PaymentsConfig;
use crate::error::ProxyError;

pub const SIMULATED_INTENT_PREFIX: &str = "sim_";

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntentRequest {
    pub amount: f64,
    pub currency: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_url: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub simulated: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[async_trait]
pub trait PaymentsProxy: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, ProxyError>;
}

pub struct OpenPaymentsClient {
    config: PaymentsConfig,
    http: reqwest::Client,
}

impl OpenPaymentsClient {
    pub fn new(config: PaymentsConfig) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ProxyError::Client)?;
        Ok(Self { config, http })
    }

    fn intents_url(&self) -> String {
        format!("{}/payments/intents", self.config.base_url.trim_end_matches('/'))
    }

    fn simulate(request: &PaymentIntentRequest) -> PaymentIntent {
        let intent_id = format!("{SIMULATED_INTENT_PREFIX}{}", Uuid::new_v4().simple());
        info!(
            %intent_id,
            amount = request.amount,
            currency = %request.currency,
            "OpenPayments not configured; returning simulated intent"
        );
        PaymentIntent {
            intent_id: Some(intent_id),
            status: Some("simulated".to_string()),
            approval_url: None,
            simulated: true,
            extra: Map::new(),
        }
    }

    fn classify(&self, err: reqwest::Error) -> ProxyError {
        if err.is_connect() {
            ProxyError::Unreachable {
                base_url: self.config.base_url.clone(),
            }
        } else if err.is_timeout() {
            ProxyError::Timeout
        } else {
            ProxyError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl PaymentsProxy for OpenPaymentsClient {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, ProxyError> {
        if !self.config.is_configured() {
            return Ok(Self::simulate(request));
        }

        let body = json!({
            "amount": request.amount,
            "currency": request.currency,
            "metadata": { "userId": request.user_id },
        });

        let response = self
            .http
            .post(self.intents_url())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            warn!(status = status.as_u16(), %body, "OpenPayments rejected payment intent");
            return Err(ProxyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let intent: PaymentIntent =
            serde_json::from_slice(&bytes).map_err(|e| ProxyError::Decode(e.to_string()))?;
        info!(intent_id = ?intent.intent_id, status = ?intent.status, "payment intent created");
        Ok(intent)
    }
}
