use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    db::PgPool,
    error::{AppError, AppResult},
    notify::Notifier,
    render::CertificateRenderer,
    storage::CertificateStore,
};

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
    pub renderer: Arc<CertificateRenderer>,
    pub store: Arc<dyn CertificateStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        jwt: JwtService,
        store: Arc<dyn CertificateStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let renderer = CertificateRenderer::new(config.watermark_path.clone());
        Self {
            pool,
            config: Arc::new(config),
            jwt,
            renderer: Arc::new(renderer),
            store,
            notifier,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }
}
