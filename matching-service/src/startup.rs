//! Application startup and lifecycle management.

use crate::config::MatchingConfig;
use crate::handlers;
use crate::services::embeddings::provider_from_config;
use crate::services::vector_index::BruteForceIndex;
use crate::services::{get_metrics, init_metrics, CandidateRetriever, Database, MatchingEngine};
use crate::workers::{ScoringJob, WorkerOrchestrator};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: MatchingConfig,
    pub db: Arc<Database>,
    pub engine: Arc<MatchingEngine>,
    pub job_tx: mpsc::Sender<ScoringJob>,
}

/// State for health check endpoints.
#[derive(Clone)]
struct HealthState {
    db: Arc<Database>,
}

/// Health check endpoint for Docker/K8s liveness probes.
async fn health_check(State(state): State<HealthState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "service": "matching-service",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "matching-service",
                    "error": e.to_string()
                })),
            )
        }
    }
}

/// Readiness check endpoint for K8s readiness probes.
async fn readiness_check(State(state): State<HealthState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => {
            tracing::debug!("Readiness check passed");
            StatusCode::OK
        }
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Metrics endpoint for Prometheus scraping.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = get_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        metrics,
    )
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: MatchingConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this when migrations are already applied by the deployment.
    pub async fn build_without_migrations(config: MatchingConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(
        config: MatchingConfig,
        run_migrations: bool,
    ) -> Result<Self, AppError> {
        // Initialize metrics
        init_metrics();

        // Connect to database
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let db = Arc::new(db);

        // Wire the scoring pipeline
        let index = Arc::new(BruteForceIndex::new(db.clone()));
        let provider = provider_from_config(&config.embedding);
        tracing::info!(provider = provider.name(), model = %config.embedding.model, "Embedding provider configured");

        let retriever = CandidateRetriever::new(db.clone(), index.clone(), config.retrieval.clone());
        let engine = Arc::new(MatchingEngine::new(
            db.clone(),
            index,
            provider,
            retriever,
            config.scoring.clone(),
            config.embedding.clone(),
        ));

        // Start the scoring worker pool
        let (orchestrator, job_tx) = WorkerOrchestrator::new(config.worker.clone(), engine.clone());
        orchestrator.start().await;

        let state = AppState {
            config: config.clone(),
            db,
            engine,
            job_tx,
        };

        // Bind HTTP listener
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Matching service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let health_state = HealthState {
            db: self.state.db.clone(),
        };

        let api_router = Router::new()
            .route("/documents", post(handlers::documents::register_document))
            .route("/documents/:id", get(handlers::documents::get_document))
            .route(
                "/documents/:id/process",
                post(handlers::documents::process_document),
            )
            .route(
                "/documents/:id/archive",
                post(handlers::documents::archive_document),
            )
            .route(
                "/documents/:id/delete",
                post(handlers::documents::delete_document),
            )
            .route(
                "/documents/:id/suggestions",
                get(handlers::suggestions::list_suggestions),
            )
            .route(
                "/documents/:id/confirm",
                post(handlers::suggestions::confirm_suggestion),
            )
            .route(
                "/documents/:id/decline",
                post(handlers::suggestions::decline_suggestion),
            )
            .route(
                "/transactions",
                post(handlers::transactions::register_transaction),
            )
            .route(
                "/transactions/:id",
                get(handlers::transactions::get_transaction),
            )
            .route("/admin/rescore", post(handlers::admin::rescore_tenant))
            .route(
                "/admin/suggestions/expire",
                post(handlers::admin::expire_suggestions),
            )
            .with_state(self.state.clone());

        let health_router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/metrics", get(metrics_handler))
            .with_state(health_state);

        let app = api_router
            .merge(health_router)
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn(metrics_middleware))
            .layer(middleware::from_fn(request_id_middleware));

        tracing::info!(
            service = "matching-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, app).await
    }
}
