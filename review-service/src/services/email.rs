use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use service_core::error::AppError;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::EmailConfig;

const CONFIRMATION_SUBJECT: &str = "Your confirmation code";

/// Outbound mail collaborator. Callers treat delivery as fire-and-forget.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_confirmation_code(&self, to_email: &str, code: &str) -> Result<(), AppError>;
}

fn confirmation_body(code: &str) -> String {
    format!(
        "Your code is: {}\n\n\
         Exchange it together with your email at POST /auth/token/ to obtain an access token. \
         If you didn't request this, please ignore this email.",
        code
    )
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &EmailConfig) -> Result<Self, AppError> {
        let builder = if config.use_tls {
            SmtpTransport::starttls_relay(&config.host)
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e.to_string())))?
        } else {
            SmtpTransport::builder_dangerous(&config.host)
        };

        let mut builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)));

        if !config.host_password.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.host_user.clone(),
                config.host_password.clone(),
            ));
        }

        tracing::info!(host = %config.host, port = config.port, "Email service initialized with SMTP");

        Ok(Self {
            mailer: builder.build(),
            from_email: config.host_user.clone(),
        })
    }

    async fn send_email(&self, to_email: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .to(to_email.parse().map_err(|e: lettre::address::AddressError| {
                AppError::InternalError(e.into())
            })?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        // SmtpTransport is blocking; keep it off the async workers
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_confirmation_code(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        self.send_email(to_email, CONFIRMATION_SUBJECT, &confirmation_body(code))
            .await
    }
}

/// Writes messages to the log instead of delivering them. For local runs.
#[derive(Clone)]
pub struct ConsoleEmailService {
    from_email: String,
}

impl ConsoleEmailService {
    pub fn new(from_email: impl Into<String>) -> Self {
        Self {
            from_email: from_email.into(),
        }
    }
}

#[async_trait]
impl EmailProvider for ConsoleEmailService {
    async fn send_confirmation_code(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        tracing::info!(
            from = %self.from_email,
            to = %to_email,
            subject = CONFIRMATION_SUBJECT,
            body = %confirmation_body(code),
            "Console email backend"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub to: String,
    pub code: String,
}

/// Records every message; optionally fails every send.
#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<Vec<SentEmail>>,
    fail: bool,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.to == email)
            .map(|m| m.code)
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_confirmation_code(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::EmailError("mock transport down".to_string()));
        }
        self.sent
            .lock()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Mock mailbox poisoned: {}", e)))?
            .push(SentEmail {
                to: to_email.to_string(),
                code: code.to_string(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailBackend;

    #[test]
    fn test_email_service_creation() {
        let config = EmailConfig {
            backend: EmailBackend::Smtp,
            host: "smtp.example.com".to_string(),
            port: 587,
            use_tls: true,
            host_user: "noreply@example.com".to_string(),
            host_password: "app-password".to_string(),
        };

        assert!(EmailService::new(&config).is_ok());
    }

    #[test]
    fn body_contains_code() {
        assert!(confirmation_body("abc.def.ghi").contains("Your code is: abc.def.ghi"));
    }

    #[tokio::test]
    async fn mock_records_latest_code_per_recipient() {
        let mock = MockEmailService::new();
        mock.send_confirmation_code("a@x.com", "one").await.unwrap();
        mock.send_confirmation_code("b@x.com", "two").await.unwrap();
        mock.send_confirmation_code("a@x.com", "three").await.unwrap();

        assert_eq!(mock.sent().len(), 3);
        assert_eq!(mock.last_code_for("a@x.com").as_deref(), Some("three"));
        assert_eq!(mock.last_code_for("c@x.com"), None);
    }

    #[tokio::test]
    async fn failing_mock_reports_error() {
        let mock = MockEmailService::failing();
        assert!(mock.send_confirmation_code("a@x.com", "one").await.is_err());
        assert!(mock.sent().is_empty());
    }
}
