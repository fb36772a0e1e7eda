//! Documentation of the user monitoring service.
//!
//! Records how readers interact with articles and answers two questions about it:
//! which articles a user has opened, and how long an article has been read.
//!
//!
//!
//! # General Infrastructure
//! - Frontend posts a click when a reader opens an article
//! - While the article stays open, the frontend posts a reading ping every 10 seconds
//! - Every click and ping becomes one row in Postgres, rows are never changed afterwards
//! - Other services read the aggregates back over HTTP
//!
//!
//!
//! # Endpoints
//!
//! | Method | Path | Response |
//! |---|---|---|
//! | POST | `/article/click` | `{"message": "Click logged successfully"}` |
//! | POST | `/article/reading` | `{"message": "Reading time logged successfully"}` |
//! | GET | `/articles/user/{userId}` | `{"articleIds": [...]}` |
//! | GET | `/articles/reading-time/{articleId}` | `{"articleId", "readingTimeSec", "readingTimeMin", "interactionCount"}` |
//! | GET | `/` | plain text greeting |
//! | GET | `/healthz` | `{"status": "ok"}` or 503 |
//!
//! Both POST bodies are `{"userId": "...", "articleId": "..."}`. A missing or empty field is a 400
//! and nothing is stored. Store failures are a 500 with a short message, the driver error only
//! goes to the log.
//!
//!
//!
//! # Notes
//!
//! ## Reading Time
//! Reading time is a proxy, not a measurement. Each ping counts for 10 seconds, so an article
//! with 3 pings reports 30 seconds and 0 minutes. Repeated pings are not deduplicated.
//!
//! ## Article Lists
//! The article list for a user is a set. Opening the same article twice lists it once, and
//! the ids come back sorted so repeated calls return identical bodies.
//!
//! ## CORS
//! Any origin is accepted (mirrored back so credentials stay allowed). Every `OPTIONS`
//! request is answered with an empty 200 before routing.
//!
//! A request without an `Origin` header has nothing to mirror, so its response carries no
//! `Access-Control-Allow-Origin`. Only `Access-Control-Allow-Credentials` and `Vary` are set.
//! Browsers always send `Origin` on cross-origin calls, so this only affects non-browser clients.
//! `Allow-Methods` and `Allow-Headers` are sent on preflight responses only.
//!
//!
//!
//! # Setup
//!
//! Run against a local Postgres.
//! ```sh
//! POSTGRES_PASSWORD=S3cret RUST_LOG=info cargo run -p user-monitor
//! ```
//!
//! Configuration is read from the environment, see [`config`]. The password may also come from
//! `/run/secrets/POSTGRES_PASSWORD`.
//!
//! Run the Postgres tests.
//! ```sh
//! cargo test -p monitor -- --ignored
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{
        Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};

use signal::ctrl_c;
#[cfg(unix)]
use signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod memory;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use config::Config;
use database::PostgresStore;
use error::StartupError;
use routes::{
    click_handler, greeting_handler, health_handler, reading_handler, reading_time_handler,
    user_articles_handler,
};
use state::AppState;

pub async fn start_server() -> Result<(), StartupError> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    run().await.inspect_err(|e| error!("{e}"))
}

async fn run() -> Result<(), StartupError> {
    info!("Loading configuration...");
    let config = Config::load()?;

    info!("Initializing state...");
    let store = PostgresStore::connect(&config.database).await?;
    let state = AppState::new(Arc::new(store.clone()));

    info!("Starting server...");
    let app = app(state, config.request_timeout);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    info!("Server shutting down...");
    store.close().await;

    Ok(())
}

/// The full HTTP surface, independent of how the store was built.
pub fn app(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/article/click", post(click_handler))
        .route("/article/reading", post(reading_handler))
        .route("/articles/user/{user_id}", get(user_articles_handler))
        .route("/articles/reading-time/{article_id}", get(reading_time_handler))
        .route("/healthz", get(health_handler))
        .route("/", get(greeting_handler))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
