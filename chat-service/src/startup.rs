//! Router assembly and server lifecycle.

use crate::config::{ChatConfig, SessionConfig};
use crate::handlers::{
    catalog::{faq_handler, refresh_handler, search_handler},
    chat::{chat_handler, process_image_handler},
    health::{api_not_found, health_check, metrics, readiness_check},
};
use crate::services::{
    Catalog, GatewaySettings, HttpUnderstandingGateway, InMemorySessionStore, JsonCatalog,
    Orchestrator, RetryPolicy, SessionStore, UnderstandingGateway,
};
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

/// Slack between the HTTP client timeout and the orchestrator's own bound.
const CALL_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// How often idle conversations are purged from the session store.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// HTTP-layer settings for [`build_router`].
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub session: SessionConfig,
    pub max_upload_bytes: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            session: SessionConfig {
                expiry_hours: 24,
                secure_cookie: false,
            },
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

pub fn build_router(state: AppState, settings: &RouterSettings) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(settings.session.secure_cookie)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(
            settings.session.expiry_hours.max(1),
        )));

    let api = Router::new()
        .route("/chat", post(chat_handler))
        .route("/process-image", post(process_image_handler))
        .route("/search", get(search_handler))
        .route("/faq", get(faq_handler))
        .route("/refresh", get(refresh_handler).post(refresh_handler))
        .fallback(api_not_found);

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Wire the orchestrator and its collaborators from configuration.
pub async fn build_state(config: &ChatConfig) -> Result<AppState, AppError> {
    let gateway = HttpUnderstandingGateway::new(GatewaySettings {
        base_url: config.understanding.base_url.clone(),
        timeout: config.understanding.timeout,
    })
    .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

    tracing::info!(
        base_url = %gateway.base_url(),
        timeout_secs = config.understanding.timeout.as_secs(),
        max_retries = config.understanding.max_retries,
        "Initialized understanding gateway"
    );

    let catalog =
        JsonCatalog::load(&config.catalog.products_path, &config.catalog.faqs_path).await;

    let gateway: Arc<dyn UnderstandingGateway> = Arc::new(gateway);
    let conversations = Arc::new(InMemorySessionStore::with_ttl(config.session.expiry()));
    InMemorySessionStore::spawn_sweeper(&conversations, SESSION_SWEEP_INTERVAL);
    let sessions: Arc<dyn SessionStore> = conversations;
    let catalog: Arc<dyn Catalog> = Arc::new(catalog);

    let orchestrator = Orchestrator::new(gateway, sessions, catalog)
        .with_retry_policy(RetryPolicy::with_max_retries(
            config.understanding.max_retries,
            config.understanding.retry_backoff,
        ))
        .with_call_timeout(config.understanding.timeout + CALL_TIMEOUT_MARGIN);

    Ok(AppState::new(Arc::new(orchestrator)))
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ChatConfig) -> Result<Self, AppError> {
        let state = build_state(&config).await?;
        let router = build_router(
            state,
            &RouterSettings {
                session: config.session.clone(),
                max_upload_bytes: config.max_upload_bytes,
            },
        );

        // Port 0 = random port for testing
        let address = config.common.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Chat service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT/SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
