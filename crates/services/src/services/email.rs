use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP configuration error: {0}")]
    Config(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: std::env::var("SMTP_FROM_EMAIL").unwrap_or_default(),
            from_name: std::env::var("SMTP_FROM_NAME")
                .unwrap_or_else(|_| "Confdesk".to_string()),
            use_tls: std::env::var("SMTP_USE_TLS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(true),
        }
    }
}

/// Outbound SMTP mailer for OTPs, invitation links, and decision notices.
#[derive(Debug, Clone)]
pub struct EmailService {
    config: SmtpConfig,
}

impl EmailService {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Result<Self, EmailError> {
        let config = SmtpConfig::default();

        if config.username.is_empty() || config.password.is_empty() {
            return Err(EmailError::Config(
                "SMTP credentials not configured. Set SMTP_USERNAME and SMTP_PASSWORD env vars"
                    .to_string(),
            ));
        }
        if config.from_email.is_empty() {
            return Err(EmailError::Config(
                "SMTP from email not configured. Set SMTP_FROM_EMAIL env var".to_string(),
            ));
        }

        Ok(Self { config })
    }

    pub async fn send_email(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        use lettre::{
            Message, SmtpTransport, Transport,
            message::Mailbox,
            transport::smtp::authentication::Credentials,
        };

        let from_mailbox: Mailbox =
            format!("{} <{}>", self.config.from_name, self.config.from_email)
                .parse()
                .map_err(|e| EmailError::Smtp(format!("Invalid from address: {}", e)))?;

        let mut builder = Message::builder().from(from_mailbox).subject(subject);
        for recipient in recipients {
            builder = builder.to(recipient
                .parse()
                .map_err(|e| EmailError::Smtp(format!("Invalid recipient: {}", e)))?);
        }

        let message = builder
            .body(body.to_string())
            .map_err(|e| EmailError::Smtp(format!("Failed to build message: {}", e)))?;

        let credentials = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );

        let mailer = if self.config.use_tls {
            SmtpTransport::starttls_relay(&self.config.host)
                .map_err(|e| EmailError::Smtp(format!("Failed to create transport: {}", e)))?
                .port(self.config.port)
                .credentials(credentials)
                .build()
        } else {
            SmtpTransport::builder_dangerous(&self.config.host)
                .port(self.config.port)
                .credentials(credentials)
                .build()
        };

        mailer
            .send(&message)
            .map_err(|e| EmailError::Smtp(format!("Failed to send email: {}", e)))?;

        tracing::info!("Email sent to {:?}: {}", recipients, subject);
        Ok(())
    }
}
