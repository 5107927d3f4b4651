use crate::kind::CertificateKind;

/// Reduces a person's name to something safe for a single path segment.
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.'))
        .collect();
    let stem = stem.trim_start_matches('.');

    if stem.is_empty() {
        "certificate".to_string()
    } else {
        stem.to_string()
    }
}

/// Name of the rendered file inside the type's folder. The certificate number
/// keeps two interns with the same name apart.
pub fn certificate_file_name(name: &str, certificate_number: &str) -> String {
    format!("{}_{}.pdf", file_stem(name), file_stem(certificate_number))
}

pub fn download_file_name(name: &str, kind: CertificateKind) -> String {
    format!("{}_{}.pdf", file_stem(name), kind.download_suffix())
}

pub fn attachment_content_disposition(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            ch if ch.is_ascii() && !ch.is_ascii_control() => ch,
            _ => '_',
        })
        .collect();

    let encoded =
        percent_encoding::utf8_percent_encode(filename, percent_encoding::NON_ALPHANUMERIC);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}
