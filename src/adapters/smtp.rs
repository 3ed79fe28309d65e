//! SMTP delivery via lettre. Credentials and relay settings come from the
//! EMAIL_* environment variables; the report recipient from
//! REPORT_RECIPIENT.

use lettre::message::header;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::env::EmailSettings;
use crate::domain::ports::Mailer;
use crate::utils::error::Result;

pub struct SmtpMailer {
    settings: EmailSettings,
}

impl SmtpMailer {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }
}

impl Mailer for SmtpMailer {
    fn send_html(&self, subject: &str, html_body: &str) -> Result<String> {
        let email = Message::builder()
            .from(self.settings.from.parse()?)
            .to(self.settings.recipient.parse()?)
            .subject(subject)
            .header(header::ContentType::TEXT_HTML)
            .body(html_body.to_string())?;

        let creds = Credentials::new(
            self.settings.username.clone(),
            self.settings.password.clone(),
        );
        let mailer = SmtpTransport::starttls_relay(&self.settings.smtp_server)?
            .port(self.settings.smtp_port)
            .credentials(creds)
            .build();

        let response = mailer.send(&email)?;
        Ok(format!(
            "sent to {} ({})",
            self.settings.recipient,
            response.code()
        ))
    }
}
