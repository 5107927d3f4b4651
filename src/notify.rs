use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::MailConfig;
use crate::kind::CertificateKind;
use crate::templates::ORGANIZATION;
use crate::utils::filename::file_stem;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mail configuration: {0}")]
    Configuration(String),
    #[error("invalid recipient address: {0}")]
    Recipient(String),
    #[error("failed to build email: {0}")]
    Build(String),
    #[error("transient SMTP error: {0}")]
    Transient(String),
    #[error("SMTP error: {0}")]
    Delivery(String),
}

/// One issued document on its way to the recipient.
#[derive(Debug, Clone)]
pub struct CertificateMail {
    pub to: String,
    pub name: String,
    pub kind: CertificateKind,
    pub payload: Vec<u8>,
}

impl CertificateMail {
    pub fn attachment_name(&self) -> String {
        format!("{}.pdf", file_stem(&self.name))
    }
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send_certificate(&self, mail: &CertificateMail) -> Result<(), NotifyError>;
}

/// Used when no SMTP relay is configured; records the delivery it skipped.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_certificate(&self, mail: &CertificateMail) -> Result<(), NotifyError> {
        info!(
            to = %mail.to,
            kind = %mail.kind,
            bytes = mail.payload.len(),
            "SMTP not configured; skipping certificate email"
        );
        Ok(())
    }
}

pub struct SmtpNotifier {
    config: MailConfig,
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("config", &self.config)
            .field("from", &self.from.to_string())
            .field("transport", &"<AsyncSmtpTransport>")
            .finish()
    }
}

impl SmtpNotifier {
    pub fn new(config: MailConfig) -> Result<Self, NotifyError> {
        let from = parse_sender(&config.from)?;
        let transport = build_transport(&config)?;
        Ok(Self {
            config,
            from,
            transport,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_certificate(&self, mail: &CertificateMail) -> Result<(), NotifyError> {
        debug!(to = %mail.to, kind = %mail.kind, "building certificate email");
        let message = build_message(&self.from, mail)?;

        self.transport.send(message).await.map_err(|err| {
            error!(error = %err, to = %mail.to, "SMTP send failed");
            map_smtp_error(&err)
        })?;

        info!(to = %mail.to, kind = %mail.kind, "certificate email sent");
        Ok(())
    }
}

fn parse_sender(raw: &str) -> Result<Mailbox, NotifyError> {
    raw.parse()
        .map_err(|err| NotifyError::Configuration(format!("MAIL_FROM `{raw}`: {err}")))
}

fn build_message(from: &Mailbox, mail: &CertificateMail) -> Result<Message, NotifyError> {
    let to: Mailbox = mail
        .to
        .parse()
        .map_err(|err| NotifyError::Recipient(format!("{}: {err}", mail.to)))?;

    let pdf = ContentType::parse("application/pdf")
        .map_err(|err| NotifyError::Build(err.to_string()))?;

    let body = format!(
        "Dear {},\n\nPlease find your {} attached.\n\nRegards,\n{}\n",
        mail.name,
        mail.kind.label(),
        ORGANIZATION
    );

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(mail.kind.mail_subject())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(body))
                .singlepart(Attachment::new(mail.attachment_name()).body(mail.payload.clone(), pdf)),
        )
        .map_err(|err| NotifyError::Build(err.to_string()))
}

fn build_transport(config: &MailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
    let builder = if config.tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|err| NotifyError::Configuration(format!("SMTP TLS relay error: {err}")))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
    };

    let builder = builder.port(config.port);

    let builder = if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        builder.credentials(Credentials::new(user.clone(), pass.clone()))
    } else {
        builder
    };

    Ok(builder.build())
}

fn map_smtp_error(err: &lettre::transport::smtp::Error) -> NotifyError {
    if err.is_transient() {
        NotifyError::Transient(err.to_string())
    } else {
        NotifyError::Delivery(err.to_string())
    }
}
