//! SMTP mail transport built on lettre's `AsyncSmtpTransport`.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Message, MultiPart, SinglePart},
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};

use super::{Mailer, MailerError};

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a sender for a plain (non-TLS) SMTP relay, e.g. a local
    /// Mailpit instance or an internal relay.
    pub fn new(host: &str, port: u16, from_address: String) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();

        Self {
            transport,
            from_address,
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), MailerError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e| MailerError::Address(format!("from address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| MailerError::Address(format!("recipient address: {}", e)))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| MailerError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpMailer>();
    }
}
