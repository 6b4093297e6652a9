//! Mail transport that logs instead of sending.

use async_trait::async_trait;

use super::{Mailer, MailerError};

pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        _text_body: &str,
        html_body: &str,
    ) -> Result<(), MailerError> {
        tracing::info!(
            to = %to,
            subject = %subject,
            html_bytes = html_body.len(),
            "No-op mailer: email not sent"
        );
        Ok(())
    }
}
