/*!
 * Payment Authorizer
 * Structural checks first, then face-auth, then the payments proxy
 */

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::ProxyError;
use crate::face_auth::FaceVerifier;
use crate::payments::{PaymentIntent, PaymentIntentRequest, PaymentsProxy};

/// Incoming payment request. Fields are optional so that missing ones can be
/// reported one at a time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub user_id: Option<String>,
    pub face_auth_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("amount and currency are required")]
    MissingAmountOrCurrency,

    #[error("userId is required to start a payment")]
    MissingUserId,

    #[error("faceAuthToken is missing. It must be validated with the face recognition service.")]
    MissingFaceAuthToken,

    #[error("Biometric validation failed. The payment was not processed.")]
    VerificationDenied,

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

impl AuthorizationError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingAmountOrCurrency | Self::MissingUserId | Self::MissingFaceAuthToken
        )
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub struct PaymentAuthorizer {
    verifier: Arc<dyn FaceVerifier>,
    payments: Arc<dyn PaymentsProxy>,
}

impl PaymentAuthorizer {
    pub fn new(verifier: Arc<dyn FaceVerifier>, payments: Arc<dyn PaymentsProxy>) -> Self {
        Self { verifier, payments }
    }

    pub async fn authorize(&self, request: &PaymentRequest) -> Result<PaymentIntent, AuthorizationError> {
        // A zero amount is as good as no amount.
        let amount = request.amount.filter(|a| *a != 0.0);
        let (Some(amount), Some(currency)) = (amount, present(&request.currency)) else {
            return Err(AuthorizationError::MissingAmountOrCurrency);
        };
        let user_id = present(&request.user_id).ok_or(AuthorizationError::MissingUserId)?;
        let token =
            present(&request.face_auth_token).ok_or(AuthorizationError::MissingFaceAuthToken)?;

        if !self.verifier.verify(user_id, token).await {
            warn!(user_id, "payment refused: face-auth verification failed");
            return Err(AuthorizationError::VerificationDenied);
        }

        info!(user_id, amount, currency, "face-auth verified; creating payment intent");
        let intent = self
            .payments
            .create_payment_intent(&PaymentIntentRequest {
                amount,
                currency: currency.to_string(),
                user_id: user_id.to_string(),
            })
            .await?;
        Ok(intent)
    }
}
