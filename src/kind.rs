use std::fmt;
use std::str::FromStr;

/// The four documents the service issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertificateKind {
    OfferLetter,
    Icc,
    Lor,
    StarIntern,
}

/// How a record's status moves from active to expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryRule {
    Never,
    AfterEndDate,
    AfterOneYear,
}

pub const ALL_KINDS: [CertificateKind; 4] = [
    CertificateKind::OfferLetter,
    CertificateKind::Icc,
    CertificateKind::Lor,
    CertificateKind::StarIntern,
];

impl CertificateKind {
    /// Value stored in the `kind` column.
    pub fn db_key(self) -> &'static str {
        match self {
            CertificateKind::OfferLetter => "offer_letter",
            CertificateKind::Icc => "icc",
            CertificateKind::Lor => "lor",
            CertificateKind::StarIntern => "star_intern",
        }
    }

    pub fn from_db_key(value: &str) -> Option<Self> {
        ALL_KINDS.into_iter().find(|kind| kind.db_key() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            CertificateKind::OfferLetter => "Offer letter",
            CertificateKind::Icc => "ICC",
            CertificateKind::Lor => "LOR",
            CertificateKind::StarIntern => "Star intern certificate",
        }
    }

    /// Folder under the certificate root holding rendered files.
    pub fn folder(self) -> &'static str {
        match self {
            CertificateKind::OfferLetter => "offerletter",
            CertificateKind::Icc => "iccCertificate",
            CertificateKind::Lor => "lorCertificate",
            CertificateKind::StarIntern => "starInternCertificate",
        }
    }

    pub fn number_prefix(self) -> &'static str {
        match self {
            CertificateKind::OfferLetter => "OL",
            CertificateKind::Icc => "ICC",
            CertificateKind::Lor => "LOR",
            CertificateKind::StarIntern => "SI",
        }
    }

    pub fn download_suffix(self) -> &'static str {
        match self {
            CertificateKind::OfferLetter => "Offer_Letter",
            CertificateKind::Icc => "Internship_Completion_Certificate",
            CertificateKind::Lor => "Letter_of_Recommendation",
            CertificateKind::StarIntern => "Star_Intern_Certificate",
        }
    }

    pub fn mail_subject(self) -> &'static str {
        match self {
            CertificateKind::OfferLetter => "Your Internship Offer Letter",
            CertificateKind::Icc => "Your Internship Completion Certificate",
            CertificateKind::Lor => "Your Letter of Recommendation",
            CertificateKind::StarIntern => "Your Star Intern Award",
        }
    }

    pub fn expiry_rule(self) -> ExpiryRule {
        match self {
            CertificateKind::OfferLetter | CertificateKind::Icc => ExpiryRule::AfterEndDate,
            CertificateKind::Lor | CertificateKind::StarIntern => ExpiryRule::AfterOneYear,
        }
    }
}

impl fmt::Display for CertificateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown certificate type `{}`", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for CertificateKind {
    type Err = UnknownKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|ch| *ch != '-' && *ch != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "offerletter" => Ok(CertificateKind::OfferLetter),
            "icc" => Ok(CertificateKind::Icc),
            "lor" => Ok(CertificateKind::Lor),
            "starintern" => Ok(CertificateKind::StarIntern),
            _ => Err(UnknownKind(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_route_keys_case_insensitively() {
        assert_eq!(
            "offerLetter".parse::<CertificateKind>(),
            Ok(CertificateKind::OfferLetter)
        );
        assert_eq!(
            "offerletter".parse::<CertificateKind>(),
            Ok(CertificateKind::OfferLetter)
        );
        assert_eq!("ICC".parse::<CertificateKind>(), Ok(CertificateKind::Icc));
        assert_eq!(
            "star-intern".parse::<CertificateKind>(),
            Ok(CertificateKind::StarIntern)
        );
        assert!("diploma".parse::<CertificateKind>().is_err());
    }

    #[test]
    fn db_keys_are_stable() {
        for kind in ALL_KINDS {
            assert_eq!(CertificateKind::from_db_key(kind.db_key()), Some(kind));
        }
        assert_eq!(CertificateKind::from_db_key("offerletter"), None);
    }

    #[test]
    fn dated_kinds_expire_by_end_date() {
        assert_eq!(CertificateKind::OfferLetter.expiry_rule(), ExpiryRule::AfterEndDate);
        assert_eq!(CertificateKind::Icc.expiry_rule(), ExpiryRule::AfterEndDate);
        assert_eq!(CertificateKind::Lor.expiry_rule(), ExpiryRule::AfterOneYear);
        assert_eq!(CertificateKind::StarIntern.expiry_rule(), ExpiryRule::AfterOneYear);
    }
}
