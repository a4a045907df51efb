//! Common test utilities for matching-service integration tests.
//!
//! Integration tests need a PostgreSQL instance reachable through
//! TEST_DATABASE_URL; without it each test prints a notice and skips.

#![allow(dead_code)]

use matching_service::config::{
    DatabaseConfig, EmbeddingConfig, MatchingConfig, RetrievalConfig, ScoringConfig, WorkerConfig,
};
use matching_service::dtos::{
    DocumentResponse, SuggestionListResponse, TransactionResponse,
};
use matching_service::services::policy::{DecisionThresholds, SignalWeights};
use matching_service::startup::Application;
use serde_json::Value;
use service_core::config::Config as CommonConfig;
use std::sync::Once;
use std::time::Duration;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,matching_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Test configuration: random port, mock embedding provider, default
/// weights and thresholds.
fn test_config(database_url: String) -> MatchingConfig {
    MatchingConfig {
        common: CommonConfig { port: 0 },
        service_name: "matching-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: database_url,
            max_connections: 5,
            min_connections: 1,
        },
        embedding: EmbeddingConfig {
            provider: "mock".to_string(),
            url: String::new(),
            api_key: None,
            model: "mock-embedding-v1".to_string(),
            dimension: 64,
            timeout_secs: 2,
        },
        retrieval: RetrievalConfig {
            top_k: 20,
            date_window_days: 7,
            candidate_cap: 50,
            index_timeout_secs: 2,
        },
        scoring: ScoringConfig {
            weights: SignalWeights::default(),
            thresholds: DecisionThresholds::default(),
            date_decay_days: 14,
        },
        worker: WorkerConfig {
            enabled: true,
            worker_count: 2,
            queue_size: 64,
        },
    }
}

/// Test application wrapper. Each test gets a unique tenant ID, which is
/// all the isolation the schema needs.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub tenant_id: Uuid,
}

/// Spawn a test application, or None when TEST_DATABASE_URL is not set.
pub async fn spawn_app() -> Option<TestApp> {
    init_tracing();

    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set - skipping integration test");
        return None;
    };

    let app = Application::build(test_config(database_url))
        .await
        .expect("Failed to build test application");

    let port = app.port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    // Wait for the HTTP server to be ready by polling the health endpoint
    let client = reqwest::Client::new();
    let health_url = format!("{}/health", address);
    for _ in 0..50 {
        if client.get(&health_url).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    Some(TestApp {
        address,
        port,
        client,
        tenant_id: Uuid::new_v4(),
    })
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// POST with the standard tenant headers for this app's tenant.
    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.post_as(self.tenant_id, path, body).await
    }

    /// POST with explicit tenant headers.
    pub async fn post_as(&self, tenant_id: Uuid, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("X-Tenant-ID", tenant_id.to_string())
            .header("X-User-ID", "test-user")
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.get_as(self.tenant_id, path).await
    }

    pub async fn get_as(&self, tenant_id: Uuid, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("X-Tenant-ID", tenant_id.to_string())
            .header("X-User-ID", "test-user")
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register a ledger transaction and return it.
    pub async fn register_transaction(
        &self,
        amount: &str,
        currency: &str,
        date: &str,
        counterparty: Option<&str>,
    ) -> TransactionResponse {
        self.register_transaction_as(self.tenant_id, amount, currency, date, counterparty)
            .await
    }

    pub async fn register_transaction_as(
        &self,
        tenant_id: Uuid,
        amount: &str,
        currency: &str,
        date: &str,
        counterparty: Option<&str>,
    ) -> TransactionResponse {
        let body = serde_json::json!({
            "amount": amount,
            "currency": currency,
            "transaction_date": date,
            "counterparty_name": counterparty,
        });
        let response = self.post_as(tenant_id, "/transactions", &body).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        response.json().await.expect("Failed to parse transaction")
    }

    /// Register an inbox document and return it.
    pub async fn register_document(
        &self,
        display_name: &str,
        amount: Option<&str>,
        currency: Option<&str>,
        date: Option<&str>,
        counterparty: Option<&str>,
    ) -> DocumentResponse {
        let body = serde_json::json!({
            "display_name": display_name,
            "amount": amount,
            "currency": currency,
            "document_date": date,
            "counterparty_name": counterparty,
        });
        let response = self.post("/documents", &body).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        response.json().await.expect("Failed to parse document")
    }

    /// Trigger a scoring run for a document.
    pub async fn process_document(&self, document_id: Uuid) -> reqwest::StatusCode {
        let response = self
            .post(&format!("/documents/{}/process", document_id), &Value::Null)
            .await;
        response.status()
    }

    /// Poll the document until its scoring run has settled.
    pub async fn wait_for_scoring(&self, document_id: Uuid) -> DocumentResponse {
        for _ in 0..100 {
            let response = self.get(&format!("/documents/{}", document_id)).await;
            assert_eq!(response.status(), reqwest::StatusCode::OK);
            let document: DocumentResponse =
                response.json().await.expect("Failed to parse document");
            if !matches!(document.status.as_str(), "new" | "processing" | "analyzing") {
                return document;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("Scoring run for document {} did not settle", document_id);
    }

    pub async fn suggestions(&self, document_id: Uuid) -> SuggestionListResponse {
        let response = self
            .get(&format!("/documents/{}/suggestions", document_id))
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.expect("Failed to parse suggestions")
    }
}
