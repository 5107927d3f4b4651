use chrono::{Months, NaiveDateTime};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::kind::{CertificateKind, ExpiryRule, ALL_KINDS};
use crate::models::{resolve_status, Certificate, CertificateStatus, NewCertificate};
use crate::schema::certificates;
use crate::validation::{check_date_range, ValidatedCertificate, ValidationError};

const PHONE_CONSTRAINT: &str = "certificates_kind_phone_key";
const DATE_RANGE_CONSTRAINT: &str = "certificates_date_range_check";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{field} is already registered for another {kind} record")]
    Conflict {
        kind: CertificateKind,
        field: &'static str,
    },
    #[error("database error: {0}")]
    Database(#[from] DieselError),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result of a conditional payload write.
#[derive(Debug)]
pub enum StoreOutcome {
    /// The payload was written by this call.
    Stored(Certificate),
    /// A record for this email already carried a payload; it is left untouched.
    AlreadyGenerated(Certificate),
}

impl StoreOutcome {
    pub fn certificate(&self) -> &Certificate {
        match self {
            StoreOutcome::Stored(cert) | StoreOutcome::AlreadyGenerated(cert) => cert,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, StoreOutcome::Stored(_))
    }
}

pub fn payload_checksum(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Row for a freshly rendered document.
pub fn new_certificate(
    validated: &ValidatedCertificate,
    certificate_number: &str,
    payload: Vec<u8>,
) -> NewCertificate {
    let optional = |value: &str| (!value.is_empty()).then(|| value.to_string());
    let fields = &validated.fields;

    NewCertificate {
        id: Uuid::new_v4(),
        kind: validated.kind.db_key().to_string(),
        name: fields.name.clone(),
        email: validated.email.clone(),
        phone: validated.phone.clone(),
        post: optional(&fields.post),
        department: optional(&fields.department),
        tenure: optional(&fields.tenure),
        college: optional(&fields.college),
        start_date: validated.start_date,
        end_date: validated.end_date,
        certificate_number: certificate_number.to_string(),
        checksum: Some(payload_checksum(&payload)),
        payload: Some(payload),
        status: CertificateStatus::Active.as_str().to_string(),
    }
}

pub fn find_by_email(
    conn: &mut PgConnection,
    kind: CertificateKind,
    email: &str,
) -> RepositoryResult<Option<Certificate>> {
    let found = certificates::table
        .filter(certificates::kind.eq(kind.db_key()))
        .filter(certificates::email.eq(email.trim().to_lowercase()))
        .first::<Certificate>(conn)
        .optional()?;
    Ok(found)
}

/// Inserts the record, or fills in the payload of an existing record that has
/// none. A record that already carries a payload is never overwritten.
pub fn store_payload(
    conn: &mut PgConnection,
    mut new_cert: NewCertificate,
    now: NaiveDateTime,
) -> RepositoryResult<StoreOutcome> {
    let kind = CertificateKind::from_db_key(&new_cert.kind)
        .ok_or_else(|| ValidationError::single("kind", "Unknown certificate type."))?;

    check_date_range(new_cert.start_date, new_cert.end_date)?;

    new_cert.status = resolve_status(
        CertificateStatus::Active,
        kind.expiry_rule(),
        new_cert.end_date,
        now,
        now,
    )
    .as_str()
    .to_string();

    let inserted = diesel::insert_into(certificates::table)
        .values(&new_cert)
        .on_conflict((certificates::kind, certificates::email))
        .do_nothing()
        .execute(conn)
        .map_err(|err| map_write_error(kind, err))?;

    if inserted == 1 {
        let stored = certificates::table.find(new_cert.id).first(conn)?;
        return Ok(StoreOutcome::Stored(stored));
    }

    let empty: Vec<u8> = Vec::new();
    let filled = diesel::update(
        certificates::table
            .filter(certificates::kind.eq(&new_cert.kind))
            .filter(certificates::email.eq(&new_cert.email))
            .filter(
                certificates::payload
                    .is_null()
                    .or(certificates::payload.eq(empty)),
            ),
    )
    .set((
        certificates::payload.eq(&new_cert.payload),
        certificates::checksum.eq(&new_cert.checksum),
        certificates::certificate_number.eq(&new_cert.certificate_number),
        certificates::updated_at.eq(now),
    ))
    .get_result::<Certificate>(conn)
    .optional()
    .map_err(|err| map_write_error(kind, err))?;

    if let Some(stored) = filled {
        return Ok(StoreOutcome::Stored(stored));
    }

    let existing = certificates::table
        .filter(certificates::kind.eq(&new_cert.kind))
        .filter(certificates::email.eq(&new_cert.email))
        .first::<Certificate>(conn)?;
    Ok(StoreOutcome::AlreadyGenerated(existing))
}

/// Persists the effective status when the stored one has drifted.
pub fn sync_status(
    conn: &mut PgConnection,
    cert: Certificate,
    now: NaiveDateTime,
) -> RepositoryResult<Certificate> {
    let effective = cert.effective_status(now);
    if effective == cert.stored_status() {
        return Ok(cert);
    }

    let updated = diesel::update(certificates::table.find(cert.id))
        .set((
            certificates::status.eq(effective.as_str()),
            certificates::updated_at.eq(now),
        ))
        .get_result::<Certificate>(conn)?;
    Ok(updated)
}

pub fn revoke(
    conn: &mut PgConnection,
    kind: CertificateKind,
    email: &str,
    now: NaiveDateTime,
) -> RepositoryResult<Certificate> {
    let revoked = diesel::update(
        certificates::table
            .filter(certificates::kind.eq(kind.db_key()))
            .filter(certificates::email.eq(email.trim().to_lowercase())),
    )
    .set((
        certificates::status.eq(CertificateStatus::Revoked.as_str()),
        certificates::updated_at.eq(now),
    ))
    .get_result::<Certificate>(conn)?;
    Ok(revoked)
}

/// Marks every active record whose window has closed as expired.
pub fn refresh_statuses(conn: &mut PgConnection, now: NaiveDateTime) -> RepositoryResult<usize> {
    let mut changed = 0;

    for kind in ALL_KINDS {
        let active = certificates::table
            .filter(certificates::kind.eq(kind.db_key()))
            .filter(certificates::status.eq(CertificateStatus::Active.as_str()));

        changed += match kind.expiry_rule() {
            ExpiryRule::Never => 0,
            ExpiryRule::AfterEndDate => diesel::update(
                active.filter(certificates::end_date.lt(now.date())),
            )
            .set((
                certificates::status.eq(CertificateStatus::Expired.as_str()),
                certificates::updated_at.eq(now),
            ))
            .execute(conn)?,
            ExpiryRule::AfterOneYear => {
                let Some(cutoff) = now.checked_sub_months(Months::new(12)) else {
                    continue;
                };
                diesel::update(active.filter(certificates::created_at.lt(cutoff)))
                    .set((
                        certificates::status.eq(CertificateStatus::Expired.as_str()),
                        certificates::updated_at.eq(now),
                    ))
                    .execute(conn)?
            }
        };
    }

    Ok(changed)
}

fn map_write_error(kind: CertificateKind, err: DieselError) -> RepositoryError {
    match &err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            let field = if info.constraint_name() == Some(PHONE_CONSTRAINT) {
                "phone"
            } else {
                "email"
            };
            RepositoryError::Conflict { kind, field }
        }
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info)
            if info.constraint_name() == Some(DATE_RANGE_CONSTRAINT) =>
        {
            RepositoryError::Validation(ValidationError::single(
                "endDate",
                "End date must be after start date.",
            ))
        }
        _ => RepositoryError::Database(err),
    }
}
