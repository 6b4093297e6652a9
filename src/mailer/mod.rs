//! Outbound mail transport gateway.
//!
//! The dispatch orchestrator only sees the `Mailer` trait; the concrete SMTP
//! session handling lives behind it. A no-op sender is provided for
//! development so the pipeline can run without an SMTP server.

mod noop;
mod smtp;

pub use noop::NoopMailer;
pub use smtp::SmtpMailer;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SmtpConfig;

/// Errors that can occur while sending mail.
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("message build failed: {0}")]
    Build(String),

    #[error("transport failed: {0}")]
    Transport(String),
}

/// Outbound mail transport.
///
/// Implementations must be safe for concurrent use; each send is
/// self-contained.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message with a plain-text part and a rendered HTML part.
    async fn send(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), MailerError>;
}

/// Create the mail transport from configuration.
pub fn create_mailer(config: &SmtpConfig) -> Result<Arc<dyn Mailer>, MailerError> {
    match config.backend.as_str() {
        "smtp" => {
            tracing::info!(host = %config.host, port = config.port, "SMTP mailer initialized");
            Ok(Arc::new(SmtpMailer::new(
                &config.host,
                config.port,
                config.from_address.clone(),
            )))
        }
        "noop" => {
            tracing::info!("No-op mailer initialized (emails are logged, not sent)");
            Ok(Arc::new(NoopMailer))
        }
        other => Err(MailerError::Transport(format!(
            "unknown mail backend: {}",
            other
        ))),
    }
}
