use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use certdesk::auth::jwt::JwtService;
use certdesk::config::AppConfig;
use certdesk::db::{self, PgPool};
use certdesk::models::Certificate;
use certdesk::notify::{CertificateMail, Notifier, NotifyError};
use certdesk::routes;
use certdesk::state::AppState;
use certdesk::storage::{CertificateStore, LocalFolderStore};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::Serialize;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tower::util::ServiceExt;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Records deliveries instead of talking to an SMTP relay.
#[derive(Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<CertificateMail>>,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send_certificate(&self, mail: &CertificateMail) -> Result<(), NotifyError> {
        self.sent.lock().await.push(mail.clone());
        Ok(())
    }
}

impl FakeNotifier {
    #[allow(dead_code)]
    pub async fn sent(&self) -> Vec<CertificateMail> {
        self.sent.lock().await.clone()
    }

    /// Delivery runs on a spawned task; poll briefly for it to land.
    #[allow(dead_code)]
    pub async fn wait_for(&self, count: usize) -> Result<Vec<CertificateMail>> {
        for _ in 0..50 {
            let sent = self.sent().await;
            if sent.len() >= count {
                return Ok(sent);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Err(anyhow!("expected {count} notifications"))
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    notifier: Arc<FakeNotifier>,
    certificate_root: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;
        let certificate_root = tempfile::tempdir().context("failed to create certificate root")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            auth_cookie_secure: false,
            cors_allowed_origin: None,
            certificate_root: certificate_root.path().to_path_buf(),
            watermark_path: None,
            mail: None,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let notifier = Arc::new(FakeNotifier::default());
        let notifier_for_state: Arc<dyn Notifier> = notifier.clone();
        let store: Arc<dyn CertificateStore> =
            Arc::new(LocalFolderStore::new(certificate_root.path()));
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool.clone(), config, jwt, store, notifier_for_state);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            notifier,
            certificate_root,
        })
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    #[allow(dead_code)]
    pub fn notifier(&self) -> Arc<FakeNotifier> {
        self.notifier.clone()
    }

    #[allow(dead_code)]
    pub fn certificate_path(&self, folder: &str, file_name: &str) -> PathBuf {
        self.certificate_root.path().join(folder).join(file_name)
    }

    /// Registers a staff user and returns the issued token.
    #[allow(dead_code)]
    pub async fn signup_token(&self, name: &str, email: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct SignupPayload<'a> {
            name: &'a str,
            email: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json(
                "/api/user/signup",
                &SignupPayload {
                    name,
                    email,
                    password,
                },
                None,
            )
            .await?;

        ensure!(
            response.status() == StatusCode::CREATED,
            "signup failed with status {}",
            response.status()
        );

        let body = body_to_vec(response.into_body()).await?;
        #[derive(serde::Deserialize)]
        struct SessionResponse {
            token: String,
        }
        let parsed: SessionResponse = serde_json::from_slice(&body)?;
        Ok(parsed.token)
    }

    #[allow(dead_code)]
    pub async fn staff_token(&self) -> Result<String> {
        self.signup_token("HR Desk", "hr@example.com", "hr-password")
            .await
    }

    #[allow(dead_code)]
    pub async fn find_certificate(&self, kind: &str, email: &str) -> Result<Option<Certificate>> {
        let kind = kind.to_string();
        let email = email.to_string();
        self.with_conn(move |conn| {
            use certdesk::schema::certificates::dsl;
            let found = dsl::certificates
                .filter(dsl::kind.eq(&kind))
                .filter(dsl::email.eq(&email))
                .first::<Certificate>(conn)
                .optional()
                .context("failed to load certificate")?;
            Ok(found)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn count_certificates(&self) -> Result<i64> {
        self.with_conn(|conn| {
            use certdesk::schema::certificates::dsl;
            let count = dsl::certificates
                .count()
                .get_result(conn)
                .context("failed to count certificates")?;
            Ok(count)
        })
        .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        self.post_body(path, body, token).await
    }

    /// Posts `body` verbatim as JSON.
    pub async fn post_body(
        &self,
        path: &str,
        body: impl Into<Body>,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(body.into())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn post_empty(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::POST).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn get_with_cookie(&self, path: &str, cookie: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header("cookie", cookie)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        db::run_migrations(&mut conn)?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute("TRUNCATE TABLE certificates, users RESTART IDENTITY CASCADE;")
        .context("failed to truncate tables")?;
    Ok(())
}
