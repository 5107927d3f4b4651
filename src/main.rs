use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tower::make::Shared;

use certdesk::auth::jwt::JwtService;
use certdesk::config::AppConfig;
use certdesk::db;
use certdesk::notify::{LogNotifier, Notifier, SmtpNotifier};
use certdesk::routes;
use certdesk::state::AppState;
use certdesk::storage::{CertificateStore, LocalFolderStore};
use certdesk::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "server",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        server_host = %config.server_host,
        server_port = config.server_port,
        certificate_root = %config.certificate_root.display(),
        watermark = config.watermark_path.is_some(),
        smtp_enabled = config.mail.is_some(),
        "loaded configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    {
        let mut conn = pool.get().context("failed to get database connection")?;
        let applied = db::run_migrations(&mut conn)?;
        tracing::info!(applied, "database migrations up to date");
    }

    let store: Arc<dyn CertificateStore> =
        Arc::new(LocalFolderStore::new(config.certificate_root.clone()));
    let notifier: Arc<dyn Notifier> = match config.mail.clone() {
        Some(mail) => Arc::new(SmtpNotifier::new(mail)?),
        None => Arc::new(LogNotifier),
    };
    let jwt = JwtService::from_config(&config)?;

    let state = AppState::new(pool, config, jwt, store, notifier);
    let listen_addr: SocketAddr = {
        let config = state.config.clone();
        format!("{}:{}", config.server_host, config.server_port).parse()?
    };
    let router = routes::create_router(state);

    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!("listening on {}", listen_addr);

    axum::serve(listener, Shared::new(router)).await?;
    Ok(())
}
