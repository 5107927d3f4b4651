use std::env;

use anyhow::{Context, Result};
use chrono::Utc;

use certdesk::{
    config::AppConfig,
    db::{self, PgPool},
    kind::CertificateKind,
    repository,
    telemetry::init_tracing,
};

const USAGE: &str = "Usage: maintenance expire | maintenance revoke <kind> <email>";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("expire") => expire_certificates()?,
        Some("revoke") => {
            let (Some(kind), Some(email)) = (args.next(), args.next()) else {
                eprintln!("{USAGE}");
                std::process::exit(1);
            };
            let kind: CertificateKind = kind.parse()?;
            revoke_certificate(kind, &email)?;
        }
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn connect() -> Result<PgPool> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        "loaded configuration"
    );
    db::init_pool_with_size(&config.database_url, 1)
}

fn expire_certificates() -> Result<()> {
    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let expired = repository::refresh_statuses(&mut conn, Utc::now().naive_utc())
        .context("failed to refresh certificate statuses")?;

    tracing::info!(component = "maintenance", expired, "expiry sweep finished");
    println!("Marked {expired} certificates as expired.");
    Ok(())
}

fn revoke_certificate(kind: CertificateKind, email: &str) -> Result<()> {
    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let cert = repository::revoke(&mut conn, kind, email, Utc::now().naive_utc())
        .with_context(|| format!("failed to revoke {kind} for {email}"))?;

    println!(
        "Revoked {} {} issued to {}.",
        kind, cert.certificate_number, cert.email
    );
    Ok(())
}
