//! Test harnesses for integration testing.
//!
//! `TestHarness` drives the full axum router against the in-memory store.
//! `PostgresHarness` uses a shared testcontainers Postgres: the container and
//! migrations are initialized once on first use, then reused.

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use moderation_core::domains::moderation::automation::DEFAULT_REQUEST_TTL_SECS;
use moderation_core::domains::moderation::store::PostgresStore;
use moderation_core::kernel::ServerDeps;
use moderation_core::server::build_app;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use tower::ServiceExt;

fn init_tracing() {
    // Run tests with: RUST_LOG=debug cargo test -- --nocapture
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// In-memory HTTP harness
// ============================================================================

pub struct TestHarness {
    pub deps: ServerDeps,
    router: Router,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_mode_change_ttl(chrono::Duration::seconds(DEFAULT_REQUEST_TTL_SECS))
    }

    pub fn with_mode_change_ttl(ttl: chrono::Duration) -> Self {
        init_tracing();
        let deps = ServerDeps::in_memory(ttl);
        let router = build_app(deps.clone(), &[]);
        Self { deps, router }
    }

    /// Send a request through the router and decode the JSON response.
    ///
    /// Empty bodies decode to `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        admin: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(admin) = admin {
            builder = builder.header("x-admin-id", admin);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, admin: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, admin, Some(body)).await
    }

    pub async fn put(&self, uri: &str, admin: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, admin, body).await
    }

    /// Submit an entity and return its id.
    pub async fn submit(&self, kind: &str, owner_id: Option<&str>) -> (StatusCode, Value) {
        let mut body = serde_json::json!({ "kind": kind, "payload": { "name": format!("test {}", kind) } });
        if let Some(owner_id) = owner_id {
            body["ownerId"] = Value::String(owner_id.to_string());
        }
        self.post("/api/moderation/entities", None, body).await
    }

    /// Run the two-step switch through the admin UI paths.
    pub async fn switch_mode(&self, path: &str, admin: &str) -> (StatusCode, Value) {
        let (status, request) = self.put(path, Some(admin), None).await;
        assert_eq!(status, StatusCode::ACCEPTED, "request step failed: {}", request);
        let token = request["confirmationToken"].as_str().unwrap().to_string();
        self.put(
            path,
            Some(admin),
            Some(serde_json::json!({ "confirmationToken": token })),
        )
        .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Shared Postgres harness
// ============================================================================

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        init_tracing();

        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        // Run migrations once on the shared database
        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Each test gets a fresh pool against the shared database. Tests must not
/// assume the tables are empty.
pub struct PostgresHarness {
    pub db_pool: PgPool,
    pub store: Arc<PostgresStore>,
}

impl PostgresHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;
        let store = Arc::new(PostgresStore::new(db_pool.clone()));

        Ok(Self { db_pool, store })
    }
}
