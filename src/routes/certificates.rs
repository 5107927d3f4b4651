use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    kind::CertificateKind,
    models::{Certificate, CertificateStatus},
    notify::{CertificateMail, Notifier},
    repository::{self, payload_checksum, StoreOutcome},
    state::AppState,
    storage::CertificateStore,
    templates::Template,
    utils::filename::{attachment_content_disposition, certificate_file_name, download_file_name},
    validation::{CertificateRequest, ValidationError},
};

#[derive(Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub message: String,
    pub status: &'static str,
    pub certificate_number: String,
}

impl GenerateResponse {
    fn generated(kind: CertificateKind, cert: &Certificate) -> Self {
        Self {
            message: format!("{} generated successfully", kind.label()),
            status: "generated",
            certificate_number: cert.certificate_number.clone(),
        }
    }

    fn already_generated(kind: CertificateKind, cert: &Certificate) -> Self {
        Self {
            message: format!("{} already generated for {}", kind.label(), cert.email),
            status: "already_generated",
            certificate_number: cert.certificate_number.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeResponse {
    pub message: String,
    pub status: &'static str,
    pub certificate_number: String,
}

pub async fn generate_certificate(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(payload): Json<CertificateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    let kind: CertificateKind = kind.parse()?;
    let validated = payload.validate(kind)?;

    {
        let mut conn = state.db()?;
        if let Some(existing) = repository::find_by_email(&mut conn, kind, &validated.email)? {
            if existing.has_payload() {
                tracing::info!(
                    kind = kind.db_key(),
                    email = %existing.email,
                    "certificate already generated"
                );
                return Ok(Json(GenerateResponse::already_generated(kind, &existing)));
            }
        }
    }

    let issued_at = Utc::now();
    let template = Template::build(kind, &validated.fields, issued_at);
    let certificate_number = template.certificate_number.clone();
    let folder = template.folder;

    let renderer = state.renderer.clone();
    let rendered = tokio::task::spawn_blocking(move || renderer.render(&template))
        .await
        .map_err(|err| AppError::internal(format!("render task failed: {err}")))??;
    let page_count = rendered.page_count;

    let new_cert = repository::new_certificate(&validated, &certificate_number, rendered.bytes);
    let outcome = {
        let mut conn = state.db()?;
        repository::store_payload(&mut conn, new_cert, issued_at.naive_utc())?
    };

    let cert = match outcome {
        StoreOutcome::Stored(cert) => cert,
        StoreOutcome::AlreadyGenerated(cert) => {
            tracing::info!(
                kind = kind.db_key(),
                email = %cert.email,
                "concurrent submission lost; keeping stored certificate"
            );
            return Ok(Json(GenerateResponse::already_generated(kind, &cert)));
        }
    };

    let payload = cert.payload.as_deref().unwrap_or_default();
    let file_name = certificate_file_name(&cert.name, &cert.certificate_number);
    let path = state.store.save(folder, &file_name, payload).await?;

    tracing::info!(
        kind = kind.db_key(),
        email = %cert.email,
        certificate_number = %cert.certificate_number,
        pages = page_count,
        bytes = payload.len(),
        path = %path.display(),
        "certificate generated"
    );

    Ok(Json(GenerateResponse::generated(kind, &cert)))
}

pub async fn download_certificate(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<EmailQuery>,
) -> AppResult<Response> {
    let kind: CertificateKind = kind.parse()?;
    let email = query.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::single("email", "Email is required.").into());
    }

    let cert = {
        let mut conn = state.db()?;
        let cert = repository::find_by_email(&mut conn, kind, &email)?
            .filter(Certificate::has_payload)
            .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, format!("{} not found", kind.label())))?;
        repository::sync_status(&mut conn, cert, Utc::now().naive_utc())?
    };

    if cert.stored_status() == CertificateStatus::Revoked {
        return Err(AppError::gone(format!("{} has been revoked", kind.label())));
    }

    let payload = cert.payload.clone().unwrap_or_default();
    let filename = download_file_name(&cert.name, kind);

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            attachment_content_disposition(&filename),
        )
        .header(header::CONTENT_LENGTH, payload.len());
    if let Some(checksum) = cert.checksum.as_deref() {
        builder = builder.header(header::ETAG, format!("\"{checksum}\""));
    }

    let mail = CertificateMail {
        to: cert.email.clone(),
        name: cert.name.clone(),
        kind,
        payload: payload.clone(),
    };
    let stored_file = StoredFile {
        file_name: certificate_file_name(&cert.name, &cert.certificate_number),
        checksum: cert.checksum.clone(),
    };
    let store = state.store.clone();
    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        deliver(store.as_ref(), notifier.as_ref(), stored_file, mail).await;
    });

    tracing::info!(
        kind = kind.db_key(),
        email = %cert.email,
        status = cert.stored_status().as_str(),
        bytes = payload.len(),
        "certificate downloaded"
    );

    builder
        .body(Body::from(payload))
        .map_err(|err| AppError::internal(format!("failed to build response: {err}")))
}

pub async fn revoke_certificate(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<EmailQuery>,
) -> AppResult<Json<RevokeResponse>> {
    let kind: CertificateKind = kind.parse()?;
    let email = query.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::single("email", "Email is required.").into());
    }

    let mut conn = state.db()?;
    let cert = repository::revoke(&mut conn, kind, &email, Utc::now().naive_utc())?;

    tracing::info!(
        kind = kind.db_key(),
        email = %cert.email,
        certificate_number = %cert.certificate_number,
        "certificate revoked"
    );

    Ok(Json(RevokeResponse {
        message: format!("{} revoked", kind.label()),
        status: CertificateStatus::Revoked.as_str(),
        certificate_number: cert.certificate_number,
    }))
}

/// Where a record's rendered file lives on disk, and the checksum it must match.
struct StoredFile {
    file_name: String,
    checksum: Option<String>,
}

/// Attaches the on-disk copy when it matches the record's checksum, otherwise
/// the stored payload.
async fn deliver(
    store: &dyn CertificateStore,
    notifier: &dyn Notifier,
    stored_file: StoredFile,
    mut mail: CertificateMail,
) {
    match store.load(mail.kind.folder(), &stored_file.file_name).await {
        Ok(bytes) if matches_checksum(stored_file.checksum.as_deref(), &bytes) => {
            mail.payload = bytes;
        }
        Ok(_) => tracing::warn!(
            kind = mail.kind.db_key(),
            to = %mail.to,
            file = %stored_file.file_name,
            "certificate file does not match stored checksum; attaching stored payload"
        ),
        Err(err) => tracing::warn!(
            error = %err,
            kind = mail.kind.db_key(),
            to = %mail.to,
            "certificate file unavailable; attaching stored payload"
        ),
    }

    if let Err(err) = notifier.send_certificate(&mail).await {
        tracing::error!(
            error = %err,
            kind = mail.kind.db_key(),
            to = %mail.to,
            "failed to email certificate"
        );
    }
}

fn matches_checksum(expected: Option<&str>, bytes: &[u8]) -> bool {
    expected.is_some_and(|expected| expected == payload_checksum(bytes))
}
