use chrono::{DateTime, NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};

use crate::kind::CertificateKind;

pub const ORGANIZATION: &str = "Renu Sharma Healthcare Education & Foundation";
pub const TAGLINE: &str = "Nurturing Tomorrow's Healthcare Leaders";
pub const ADDRESS: &str =
    "VPO Baspadmka, Teh Pataudi, Dist Gurugram (HR), Pin 122503";
pub const CONTACT: &str = "9671457366 or Neha.rshefoundation@gmail.com";

/// Submitted form values, already trimmed. Absent fields are empty strings.
#[derive(Debug, Clone, Default)]
pub struct CertificateFields {
    pub name: String,
    pub post: String,
    pub department: String,
    pub tenure: String,
    pub college: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    /// A4 portrait, left aligned, letterhead on top.
    Letter,
    /// A4 landscape, centred.
    Certificate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,
    pub emphasis: bool,
}

impl Paragraph {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: false,
        }
    }

    fn emphasized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Template {
    pub kind: CertificateKind,
    pub layout: PageLayout,
    pub title: String,
    pub subtitle: String,
    pub organization: String,
    pub tagline: String,
    pub subject: String,
    pub salutation: String,
    pub facts: Vec<String>,
    pub body: Vec<Paragraph>,
    pub achievements: Vec<String>,
    pub endorsements: Vec<String>,
    pub signatories: [String; 2],
    pub certificate_number: String,
    pub folder: &'static str,
    pub issued_on: NaiveDate,
}

impl Template {
    /// Resolves `key` to a certificate type, falling back to the offer letter.
    pub fn for_key(key: &str, fields: &CertificateFields, issued_at: DateTime<Utc>) -> Self {
        let kind = key.parse().unwrap_or(CertificateKind::OfferLetter);
        Self::build(kind, fields, issued_at)
    }

    pub fn build(kind: CertificateKind, fields: &CertificateFields, issued_at: DateTime<Utc>) -> Self {
        let certificate_number = generate_certificate_number(kind, issued_at);
        let issued_on = issued_at.date_naive();
        match kind {
            CertificateKind::OfferLetter => offer_letter(fields, certificate_number, issued_on),
            CertificateKind::Icc => completion_certificate(fields, certificate_number, issued_on),
            CertificateKind::Lor => recommendation(fields, certificate_number, issued_on),
            CertificateKind::StarIntern => star_intern(fields, certificate_number, issued_on),
        }
    }
}

fn offer_letter(fields: &CertificateFields, number: String, issued_on: NaiveDate) -> Template {
    let name = &fields.name;
    let post = &fields.post;

    let mut facts = Vec::new();
    if !fields.start_date.is_empty() {
        facts.push(format!("Commencement Date: {}", fields.start_date));
    }
    if !fields.end_date.is_empty() {
        facts.push(format!("Completion Date: {}", fields.end_date));
    }
    if !fields.tenure.is_empty() {
        facts.push(format!("Duration: {}", fields.tenure));
    }

    Template {
        kind: CertificateKind::OfferLetter,
        layout: PageLayout::Letter,
        title: ORGANIZATION.to_string(),
        subtitle: format!("Address: {ADDRESS}"),
        organization: String::new(),
        tagline: String::new(),
        subject: format!("Joining Offer: {post} at {ORGANIZATION}"),
        salutation: format!("Dear {name},"),
        facts,
        body: vec![
            Paragraph::plain(format!(
                "We are delighted to offer you the position of {post} intern at {ORGANIZATION}. \
                 Your exceptional skills and experience make you an ideal fit for our team. \
                 We believe your contributions will significantly impact our organization's growth."
            )),
            Paragraph::plain(format!(
                "To confirm your acceptance, please sign and return this letter within three days. \
                 For queries, contact us at {CONTACT}."
            )),
        ],
        achievements: Vec::new(),
        endorsements: vec![
            "We eagerly await your positive response and look forward to having you on board."
                .to_string(),
            "Warmest congratulations on this exciting opportunity!".to_string(),
        ],
        signatories: ["Authorized Signatory".to_string(), format!("Accepted by {name}")],
        certificate_number: number,
        folder: CertificateKind::OfferLetter.folder(),
        issued_on,
    }
}

fn completion_certificate(
    fields: &CertificateFields,
    number: String,
    issued_on: NaiveDate,
) -> Template {
    Template {
        kind: CertificateKind::Icc,
        layout: PageLayout::Certificate,
        title: "Certificate of Internship Completion".to_string(),
        subtitle: "Excellence in Professional Development".to_string(),
        organization: ORGANIZATION.to_string(),
        tagline: TAGLINE.to_string(),
        subject: String::new(),
        salutation: String::new(),
        facts: Vec::new(),
        body: vec![
            Paragraph::plain("With great pleasure, we hereby certify that"),
            Paragraph::emphasized(fields.name.clone()),
            Paragraph::plain("has successfully completed an intensive internship program as"),
            Paragraph::emphasized(fields.post.clone()),
            Paragraph::plain(format!(
                "at {ORGANIZATION}, demonstrating exceptional proficiency and dedication \
                 throughout their tenure of {}, from {} to {}.",
                fields.tenure, fields.start_date, fields.end_date
            )),
        ],
        achievements: vec![
            "Demonstrated outstanding professional growth and learning aptitude".to_string(),
            "Contributed significantly to organizational objectives".to_string(),
            "Exhibited strong leadership and teamwork qualities".to_string(),
            "Maintained highest standards of professional conduct".to_string(),
        ],
        endorsements: vec![
            "Throughout the internship period, the candidate has shown remarkable initiative, \
             intellectual curiosity, and a commitment to excellence that exemplifies the values \
             of our organization."
                .to_string(),
            "Their contributions have made a lasting positive impact on our projects and team dynamics."
                .to_string(),
            "We are confident that their experience here will serve as a strong foundation for \
             their future professional endeavors."
                .to_string(),
        ],
        signatories: [
            "Program Director".to_string(),
            "Chief Executive Officer".to_string(),
        ],
        certificate_number: number,
        folder: CertificateKind::Icc.folder(),
        issued_on,
    }
}

fn recommendation(fields: &CertificateFields, number: String, issued_on: NaiveDate) -> Template {
    let name = &fields.name;
    let post = &fields.post;

    Template {
        kind: CertificateKind::Lor,
        layout: PageLayout::Letter,
        title: ORGANIZATION.to_string(),
        subtitle: "Gurugram, Haryana - Sector 14 - Pincode: 122503".to_string(),
        organization: String::new(),
        tagline: String::new(),
        subject: "Letter of Recommendation".to_string(),
        salutation: "To whom it may concern,".to_string(),
        facts: Vec::new(),
        body: vec![
            Paragraph::plain(format!(
                "I am writing to highly recommend {name}, who worked as a {post} at {ORGANIZATION}. \
                 Throughout their time with us, {name} has consistently demonstrated exceptional \
                 skills, strong work ethic, and outstanding professional conduct."
            )),
            Paragraph::plain(format!(
                "{name} has proven to be a valuable team member with excellent technical and \
                 interpersonal skills. Their dedication and capability to learn and adapt quickly \
                 make them an asset to any organization."
            )),
        ],
        achievements: Vec::new(),
        endorsements: vec![
            "I confidently recommend them for any future opportunities they may pursue."
                .to_string(),
            "Best wishes for your future endeavors!".to_string(),
        ],
        signatories: [
            "Program Director".to_string(),
            "Chief Executive Officer".to_string(),
        ],
        certificate_number: number,
        folder: CertificateKind::Lor.folder(),
        issued_on,
    }
}

fn star_intern(fields: &CertificateFields, number: String, issued_on: NaiveDate) -> Template {
    Template {
        kind: CertificateKind::StarIntern,
        layout: PageLayout::Certificate,
        title: "Star Intern".to_string(),
        subtitle: "Outstanding Achievement Award".to_string(),
        organization: ORGANIZATION.to_string(),
        tagline: String::new(),
        subject: String::new(),
        salutation: String::new(),
        facts: Vec::new(),
        body: vec![
            Paragraph::plain("This is to certify that"),
            Paragraph::emphasized(fields.name.clone()),
            Paragraph::plain("has demonstrated exceptional performance as"),
            Paragraph::emphasized(title_case(&fields.post)),
            Paragraph::plain(format!(
                "in the {} department for a duration of {}",
                fields.department, fields.tenure
            )),
        ],
        achievements: vec![
            "Demonstrated exceptional proficiency in clinical practices".to_string(),
            "Exhibited outstanding leadership and interpersonal skills".to_string(),
            "Contributed significantly to patient care and team success".to_string(),
        ],
        endorsements: vec![
            "This certificate recognizes outstanding dedication and excellence in healthcare education."
                .to_string(),
        ],
        signatories: [
            "Director of Healthcare Education".to_string(),
            "Chief Executive Officer".to_string(),
        ],
        certificate_number: number,
        folder: CertificateKind::StarIntern.folder(),
        issued_on,
    }
}

/// `PREFIX-<base36 millis>-<4 random>`, e.g. `ICC-LW3K9Z1A-7QX2`.
pub fn generate_certificate_number(kind: CertificateKind, issued_at: DateTime<Utc>) -> String {
    let millis = issued_at.timestamp_millis().max(0) as u64;
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(|byte| (byte as char).to_ascii_uppercase())
        .collect();
    format!("{}-{}-{}", kind.number_prefix(), to_base36(millis), suffix)
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
