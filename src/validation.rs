use std::collections::BTreeMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::kind::CertificateKind;
use crate::templates::CertificateFields;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.+-]+@([\w-]+\.)+[\w-]{2,}$").expect("valid email pattern")
});

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+\d{1,3}[- ]?)?\d{10}$").expect("valid phone pattern"));

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Field-keyed messages, keyed by the JSON field name the form submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("invalid fields: {}", .fields.keys().cloned().collect::<Vec<_>>().join(", "))]
pub struct ValidationError {
    pub fields: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut error = Self::default();
        error.insert(field, message);
        error
    }

    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Body of `POST /api/employee/{kind}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificateRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub post: String,
    pub department: String,
    #[serde(alias = "duration")]
    pub tenure: String,
    pub college: String,
    pub start_date: String,
    pub end_date: String,
}

/// A request that passed validation, normalised for storage and templating.
#[derive(Debug, Clone)]
pub struct ValidatedCertificate {
    pub kind: CertificateKind,
    pub email: String,
    pub phone: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub fields: CertificateFields,
}

#[derive(Clone, Copy)]
enum Field {
    Name,
    Email,
    Phone,
    Post,
    Department,
    Tenure,
    College,
    StartDate,
    EndDate,
}

impl Field {
    fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Post => "post",
            Field::Department => "department",
            Field::Tenure => "tenure",
            Field::College => "college",
            Field::StartDate => "startDate",
            Field::EndDate => "endDate",
        }
    }

    fn label(self, kind: CertificateKind) -> &'static str {
        match self {
            Field::Name => "Full Name",
            Field::Email => "Email",
            Field::Phone => "Phone Number",
            Field::Post => "Post",
            Field::Department => "Department",
            Field::Tenure if kind == CertificateKind::StarIntern => "Duration",
            Field::Tenure => "Tenure",
            Field::College => "College",
            Field::StartDate => "Starting Date",
            Field::EndDate => "Ending Date",
        }
    }

    fn max_len(self) -> usize {
        match self {
            Field::Email => 255,
            Field::Phone => 20,
            Field::College => 150,
            _ => 100,
        }
    }
}

fn required_fields(kind: CertificateKind) -> &'static [Field] {
    match kind {
        CertificateKind::OfferLetter => &[
            Field::Name,
            Field::Email,
            Field::Phone,
            Field::Department,
            Field::Tenure,
            Field::College,
            Field::StartDate,
            Field::EndDate,
        ],
        CertificateKind::Icc => &[
            Field::Name,
            Field::Email,
            Field::Phone,
            Field::Department,
            Field::Tenure,
            Field::StartDate,
            Field::EndDate,
        ],
        CertificateKind::Lor => &[
            Field::Name,
            Field::Email,
            Field::Phone,
            Field::Department,
            Field::Post,
        ],
        CertificateKind::StarIntern => &[
            Field::Name,
            Field::Email,
            Field::Phone,
            Field::Department,
            Field::Post,
            Field::Tenure,
        ],
    }
}

impl CertificateRequest {
    fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Phone => &self.phone,
            Field::Post => &self.post,
            Field::Department => &self.department,
            Field::Tenure => &self.tenure,
            Field::College => &self.college,
            Field::StartDate => &self.start_date,
            Field::EndDate => &self.end_date,
        }
        .trim()
    }

    pub fn validate(&self, kind: CertificateKind) -> Result<ValidatedCertificate, ValidationError> {
        let mut errors = ValidationError::default();

        for field in required_fields(kind) {
            if self.value(*field).is_empty() {
                errors.insert(
                    field.key(),
                    format!("{} is required.", field.label(kind)),
                );
            }
        }

        for field in [
            Field::Name,
            Field::Email,
            Field::Phone,
            Field::Post,
            Field::Department,
            Field::Tenure,
            Field::College,
        ] {
            if self.value(field).chars().count() > field.max_len() {
                errors.insert(
                    field.key(),
                    format!(
                        "{} cannot exceed {} characters.",
                        field.label(kind),
                        field.max_len()
                    ),
                );
            }
        }

        let name = self.value(Field::Name);
        if !name.is_empty() && name.chars().count() < 2 {
            errors.insert("name", "Full Name must be at least 2 characters long.");
        }

        let email = self.value(Field::Email).to_lowercase();
        if !email.is_empty() && !EMAIL_PATTERN.is_match(&email) {
            errors.insert("email", format!("{email} is not a valid email address."));
        }

        let phone = self.value(Field::Phone);
        if !phone.is_empty() && !PHONE_PATTERN.is_match(phone) {
            errors.insert("phone", format!("{phone} is not a valid phone number."));
        }

        let start_date = parse_date(self.value(Field::StartDate), Field::StartDate, kind, &mut errors);
        let end_date = parse_date(self.value(Field::EndDate), Field::EndDate, kind, &mut errors);
        if let Err(range) = check_date_range(start_date, end_date) {
            errors.fields.extend(range.fields);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidatedCertificate {
            kind,
            email,
            phone: phone.to_string(),
            start_date,
            end_date,
            fields: CertificateFields {
                name: name.to_string(),
                post: self.value(Field::Post).to_string(),
                department: self.value(Field::Department).to_string(),
                tenure: self.value(Field::Tenure).to_string(),
                college: self.value(Field::College).to_string(),
                start_date: self.value(Field::StartDate).to_string(),
                end_date: self.value(Field::EndDate).to_string(),
            },
        })
    }
}

fn parse_date(
    raw: &str,
    field: Field,
    kind: CertificateKind,
    errors: &mut ValidationError,
) -> Option<NaiveDate> {
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.insert(
                field.key(),
                format!("{} must be a valid date (YYYY-MM-DD).", field.label(kind)),
            );
            None
        }
    }
}

/// End must come strictly after start when both are present.
pub fn check_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end <= start => Err(ValidationError::single(
            "endDate",
            "End date must be after start date.",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn icc_request() -> CertificateRequest {
        CertificateRequest {
            name: "Asha Rao".to_string(),
            email: " Asha@X.com ".to_string(),
            phone: "9876543210".to_string(),
            post: "Intern".to_string(),
            department: "UI/UX Design".to_string(),
            tenure: "3 months".to_string(),
            college: "Delhi University".to_string(),
            start_date: "2024-01-01".to_string(),
            end_date: "2024-03-31".to_string(),
        }
    }

    #[test]
    fn accepts_complete_icc_form() {
        let validated = icc_request().validate(CertificateKind::Icc).unwrap();
        assert_eq!(validated.email, "asha@x.com");
        assert_eq!(validated.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(validated.fields.name, "Asha Rao");
    }

    #[test]
    fn icc_form_without_college_is_accepted() {
        let json = r#"{"name":"Asha Rao","email":"asha@x.com","phone":"9876543210","post":"Intern","department":"UI/UX Design","tenure":"3 months","startDate":"2024-01-01","endDate":"2024-03-31"}"#;
        let request: CertificateRequest = serde_json::from_str(json).unwrap();
        let validated = request.validate(CertificateKind::Icc).unwrap();
        assert_eq!(validated.fields.college, "");
        assert_eq!(validated.fields.post, "Intern");

        let err = request.validate(CertificateKind::OfferLetter).unwrap_err();
        assert_eq!(err.fields["college"], "College is required.");
    }

    #[test]
    fn reversed_dates_fail_before_rendering() {
        let mut request = icc_request();
        request.start_date = "2024-03-31".to_string();
        request.end_date = "2024-01-01".to_string();
        let err = request.validate(CertificateKind::Icc).unwrap_err();
        assert_eq!(err.fields["endDate"], "End date must be after start date.");
    }

    #[test]
    fn reports_every_missing_required_field() {
        let err = CertificateRequest::default()
            .validate(CertificateKind::OfferLetter)
            .unwrap_err();
        let keys: Vec<&str> = err.fields.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "college",
                "department",
                "email",
                "endDate",
                "name",
                "phone",
                "startDate",
                "tenure"
            ]
        );
        assert_eq!(err.fields["name"], "Full Name is required.");
    }

    #[test]
    fn star_intern_calls_tenure_duration() {
        let json = r#"{"name":"Ravi Kumar","email":"ravi@x.com","phone":"9876500000",
                       "department":"Nursing","post":"intern"}"#;
        let request: CertificateRequest = serde_json::from_str(json).unwrap();
        let err = request.validate(CertificateKind::StarIntern).unwrap_err();
        assert_eq!(err.fields["tenure"], "Duration is required.");

        let json = r#"{"name":"Ravi Kumar","email":"ravi@x.com","phone":"9876500000",
                       "department":"Nursing","post":"intern","duration":"6 months",
                       "certificateName":"starintern"}"#;
        let request: CertificateRequest = serde_json::from_str(json).unwrap();
        let validated = request.validate(CertificateKind::StarIntern).unwrap();
        assert_eq!(validated.fields.tenure, "6 months");
    }

    #[test]
    fn lor_needs_no_dates() {
        let mut request = icc_request();
        request.start_date.clear();
        request.end_date.clear();
        request.college.clear();
        let validated = request.validate(CertificateKind::Lor).unwrap();
        assert_eq!(validated.start_date, None);
        assert_eq!(validated.end_date, None);
    }

    #[test]
    fn rejects_malformed_contact_details() {
        let mut request = icc_request();
        request.email = "not-an-email".to_string();
        request.phone = "12345".to_string();
        let err = request.validate(CertificateKind::Icc).unwrap_err();
        assert!(err.fields.contains_key("email"));
        assert!(err.fields.contains_key("phone"));
    }

    #[test]
    fn accepts_phone_with_country_code() {
        let mut request = icc_request();
        request.phone = "+91 9876543210".to_string();
        assert!(request.validate(CertificateKind::Icc).is_ok());
    }

    #[test]
    fn rejects_unparseable_dates() {
        let mut request = icc_request();
        request.start_date = "01/01/2024".to_string();
        let err = request.validate(CertificateKind::Icc).unwrap_err();
        assert_eq!(
            err.fields["startDate"],
            "Starting Date must be a valid date (YYYY-MM-DD)."
        );
    }

    #[test]
    fn date_range_requires_end_after_start() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 31);
        let end = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(check_date_range(start, end).is_err());
        assert!(check_date_range(start, start).is_err());
        assert!(check_date_range(end, start).is_ok());
        assert!(check_date_range(None, end).is_ok());
    }
}
