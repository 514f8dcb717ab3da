//! FacePay gateway: admits payments only after a biometric liveness check.
//!
//! Session creation and token verification go through [`face_auth::FaceAuthGateway`],
//! which owns exactly one liveness backend (Rekognition, stub or disabled).
//! [`authorizer::PaymentAuthorizer`] forwards intents to OpenPayments once the
//! gateway admits the token.

pub mod api;
pub mod authorizer;
pub mod config;
pub mod error;
pub mod events;
pub mod face_auth;
pub mod liveness;
pub mod payments;
pub mod rekognition;
mod sigv4;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
