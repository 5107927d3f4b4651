use chrono::{Months, NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::kind::{CertificateKind, ExpiryRule};
use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = certificates)]
pub struct Certificate {
    pub id: Uuid,
    pub kind: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub post: Option<String>,
    pub department: Option<String>,
    pub tenure: Option<String>,
    pub college: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub certificate_number: String,
    pub payload: Option<Vec<u8>>,
    pub checksum: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Certificate {
    pub fn has_payload(&self) -> bool {
        self.payload
            .as_ref()
            .is_some_and(|payload| !payload.is_empty())
    }

    pub fn certificate_kind(&self) -> Option<CertificateKind> {
        CertificateKind::from_db_key(&self.kind)
    }

    /// Stored status, falling back to active for values written by hand.
    pub fn stored_status(&self) -> CertificateStatus {
        CertificateStatus::parse(&self.status).unwrap_or(CertificateStatus::Active)
    }

    /// Status as of `now`, applying the kind's expiry rule to the stored one.
    pub fn effective_status(&self, now: NaiveDateTime) -> CertificateStatus {
        let rule = self
            .certificate_kind()
            .map(|kind| kind.expiry_rule())
            .unwrap_or(ExpiryRule::Never);
        resolve_status(
            self.stored_status(),
            rule,
            self.end_date,
            self.created_at,
            now,
        )
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = certificates)]
pub struct NewCertificate {
    pub id: Uuid,
    pub kind: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub post: Option<String>,
    pub department: Option<String>,
    pub tenure: Option<String>,
    pub college: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub certificate_number: String,
    pub payload: Option<Vec<u8>>,
    pub checksum: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateStatus {
    Active,
    Expired,
    Revoked,
}

impl CertificateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CertificateStatus::Active => "active",
            CertificateStatus::Expired => "expired",
            CertificateStatus::Revoked => "revoked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(CertificateStatus::Active),
            "expired" => Some(CertificateStatus::Expired),
            "revoked" => Some(CertificateStatus::Revoked),
            _ => None,
        }
    }
}

/// Revoked is terminal; otherwise the record is expired once `now` passes the
/// window described by `rule`.
pub fn resolve_status(
    current: CertificateStatus,
    rule: ExpiryRule,
    end_date: Option<NaiveDate>,
    created_at: NaiveDateTime,
    now: NaiveDateTime,
) -> CertificateStatus {
    if current == CertificateStatus::Revoked {
        return CertificateStatus::Revoked;
    }

    let expired = match rule {
        ExpiryRule::Never => false,
        ExpiryRule::AfterEndDate => end_date.is_some_and(|end| now.date() > end),
        ExpiryRule::AfterOneYear => created_at
            .checked_add_months(Months::new(12))
            .is_some_and(|limit| now > limit),
    };

    if expired {
        CertificateStatus::Expired
    } else {
        CertificateStatus::Active
    }
}
