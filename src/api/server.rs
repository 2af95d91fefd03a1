use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Router,
};
use opentelemetry::trace::TracerProvider as _; // Import as _ since we only need the trait methods
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    trace::{Sampler, SdkTracerProvider},
    Resource,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::api::error::ApiResult;
use crate::api::handlers::{
    create_share_handler, get_share_handler, get_status_handler, query_status_handler,
    record_status_handler, update_share_handler, verify_artifact_handler, verify_token_handler,
};
use crate::api::state::AppState;
use crate::auth::JwtValidator;
use crate::config::{AppConfig, StoreBackend, TelemetryConfig};
use crate::db::{create_pool, run_migrations, MemoryShareStore, PgShareStore, ShareStore};

/// Room for JSON framing around a base64 artifact
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn init_tracing(telemetry: &TelemetryConfig) {
    let subscriber = tracing_subscriber::registry()
        .with(
            if !telemetry.otel_enabled {
                // Span close events carry durations when there is no exporter
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_span_events(fmt::format::FmtSpan::CLOSE)
            } else {
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_span_events(fmt::format::FmtSpan::NONE)
            },
        )
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn,tower=warn,h2=error")),
        );

    if telemetry.otel_enabled {
        match init_opentelemetry(telemetry) {
            Ok(provider) => {
                opentelemetry::global::set_tracer_provider(provider.clone());

                // global::tracer returns BoxedTracer which doesn't implement PreSampledTracer
                let tracer = provider.tracer(telemetry.service_name.clone());

                subscriber.with(OpenTelemetryLayer::new(tracer)).init();

                info!("OpenTelemetry enabled: {}", telemetry.otel_endpoint);
            }
            Err(e) => {
                subscriber.init();
                tracing::error!("Failed to initialize OpenTelemetry: {}. Continuing with logs only.", e);
            }
        }
    } else {
        subscriber.init();
    }
}

fn init_opentelemetry(
    telemetry: &TelemetryConfig,
) -> Result<SdkTracerProvider, Box<dyn std::error::Error>> {
    let resource = Resource::builder()
        .with_attribute(KeyValue::new("service.name", telemetry.service_name.clone()))
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .with_attribute(KeyValue::new("deployment.environment", telemetry.environment.clone()))
        .build();

    let endpoint = telemetry.otel_endpoint.as_str();
    let exporter = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()?
    } else {
        SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?
    };

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::TraceIdRatioBased(telemetry.sampling_rate))
        .with_batch_exporter(exporter)
        .build();

    info!("OpenTelemetry sampling rate: {}%", telemetry.sampling_rate * 100.0);

    Ok(provider)
}

/// Routes of the sharing service over an already built state
pub fn build_router(state: AppState) -> Router {
    let limit = body_limit(state.settings.max_artifact_bytes);

    Router::new()
        .route("/shares", post(create_share_handler).put(update_share_handler))
        .route("/shares/{id}", get(get_share_handler))
        .route("/shares/status", get(query_status_handler))
        .route(
            "/shares/status/{id}",
            get(get_status_handler).put(record_status_handler),
        )
        // Verification is public
        .route("/verify", post(verify_artifact_handler))
        .route("/verify/{token}", get(verify_token_handler))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Request body cap for an artifact of `max_artifact_bytes` sent as base64
fn body_limit(max_artifact_bytes: usize) -> usize {
    max_artifact_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(BODY_OVERHEAD_BYTES)
}

/// Build the store selected by configuration, then the router
pub async fn create_app(config: &AppConfig) -> anyhow::Result<Router> {
    let store: Arc<dyn ShareStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL or RDS_PROXY_URL must be set"))?;
            let pool = create_pool(database_url, config.db_max_connections).await?;
            if config.run_migrations {
                run_migrations(&pool).await?;
            }
            Arc::new(PgShareStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory share store; data is lost on restart");
            Arc::new(MemoryShareStore::new())
        }
    };

    let state = AppState::new(
        store,
        config.share_settings(),
        JwtValidator::new(&config.jwt_secret),
    );
    Ok(build_router(state))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<&'static str> {
    state.store.health_check().await?;
    Ok("OK")
}

pub async fn run_server() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    init_tracing(&config.telemetry);

    info!("Starting credential sharing server");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down gracefully...");
    };

    let app = create_app(&config).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
