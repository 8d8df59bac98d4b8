//! # Slotbook API
//!
//! HTTP surface of the Slotbook appointment service. Every write goes through
//! the [`Ledger`], which enforces slot capacity and the one-booking-per-slot
//! rule; this crate only authenticates callers, decodes payloads and maps
//! domain errors onto status codes.
//!
//! ## Architecture
//!
//! - **Routes**: API endpoints and URL structure
//! - **Handlers**: Request decoding and ledger calls
//! - **Middleware**: Bearer-token identity and error mapping
//! - **Config**: Environment-driven settings

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Middleware for authentication and error handling
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use eyre::Result;
use slotbook_core::ledger::Ledger;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    /// The booking ledger, backed by whichever store the binary chose
    pub ledger: Ledger,
    /// HS256 secret for verifying bearer tokens
    pub jwt_secret: String,
}

impl ApiState {
    pub fn new(ledger: Ledger, jwt_secret: impl Into<String>) -> Self {
        Self {
            ledger,
            jwt_secret: jwt_secret.into(),
        }
    }
}

/// Builds the application router with all routes and request tracing.
pub fn app(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Slot management endpoints
        .merge(routes::slots::routes())
        // Booking endpoints
        .merge(routes::appointments::routes())
        // Account management endpoints
        .merge(routes::users::routes())
        .layer(TraceLayer::new_for_http())
        // Attach shared state to all routes
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_origin(origins)
        .allow_credentials(true)
}

/// Starts the API server with the provided configuration and ledger
///
/// Installs the global tracing subscriber, wraps the router in CORS and
/// timeout layers, and serves until the listener fails.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use slotbook_api::{config, start_server};
/// # use slotbook_core::ledger::Ledger;
/// # async fn run() -> eyre::Result<()> {
/// let config = config::ApiConfig::from_env()?;
/// let pool = slotbook_db::create_pool(&config.database_url).await?;
/// let ledger = Ledger::new(Arc::new(slotbook_db::PgStore::new(pool)));
/// start_server(config, ledger).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_server(config: config::ApiConfig, ledger: Ledger) -> Result<()> {
    // Initialize tracing for logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let state = Arc::new(ApiState::new(ledger, config.jwt_secret.clone()));
    let app = app(state);

    // Apply CORS configuration if origins are specified
    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)),
        None => app,
    };

    // Add request timeout middleware
    let app = app.layer(
        ServiceBuilder::new()
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout)))
            .into_inner(),
    );

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
