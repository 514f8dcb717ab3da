/*!
 * FacePay Gateway Server
 *
 * Handles:
 * - Face Liveness session creation (Amazon Rekognition)
 * - Face-auth token verification before payments
 * - Payment intent creation (OpenPayments proxy)
 */

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use facepay_gateway::api::{cors_layer, create_router, AppState};
use facepay_gateway::authorizer::PaymentAuthorizer;
use facepay_gateway::config::{PaymentsConfig, ProviderConfig, Settings};
use facepay_gateway::events::{EventSink, TracingSink};
use facepay_gateway::face_auth::FaceAuthGateway;
use facepay_gateway::payments::OpenPaymentsClient;
use facepay_gateway::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "facepay-gateway",
    version = VERSION,
    about = "Payment API gated by a biometric liveness check"
)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Allowed CORS origin (`*` for any)
    #[arg(long, env = "CLIENT_ORIGIN", default_value = "*")]
    client_origin: String,

    #[command(flatten)]
    settings: Settings,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(version = VERSION, "Starting FacePay gateway");

    let events: Arc<dyn EventSink> = Arc::new(TracingSink);
    let provider = ProviderConfig::resolve(&cli.settings, events.as_ref());
    let payments_config = PaymentsConfig::resolve(&cli.settings, events.as_ref());

    let face_auth = Arc::new(FaceAuthGateway::from_config(&provider, events));
    let payments = Arc::new(
        OpenPaymentsClient::new(payments_config).expect("Failed to build OpenPayments client"),
    );
    let authorizer = Arc::new(PaymentAuthorizer::new(face_auth.clone(), payments));

    let state = AppState {
        face_auth,
        authorizer,
    };

    let cors = cors_layer(&cli.client_origin).expect("CLIENT_ORIGIN is not a valid origin");
    let app = create_router(state).layer(cors);

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    info!("FacePay gateway listening on {}", addr);

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
