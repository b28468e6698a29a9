use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(String),
}

/// Outbound mail transport. Delivery failures come back as errors; the
/// caller decides whether to surface or suppress them.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Postmark-style HTTP mail client.
pub struct PostmarkMailer {
    http_client: reqwest::Client,
    base_url: String,
    sender: String,
    server_token: String,
}

const POSTMARK_AUTH_HEADER: &str = "X-Postmark-Server-Token";
const MESSAGE_STREAM: &str = "outbound";

#[derive(serde::Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text_body: &'a str,
    message_stream: &'a str,
}

impl PostmarkMailer {
    pub fn new(
        http_client: reqwest::Client,
        base_url: String,
        sender: String,
        server_token: String,
    ) -> Self {
        Self {
            http_client,
            base_url,
            sender,
            server_token,
        }
    }
}

#[async_trait]
impl Mailer for PostmarkMailer {
    #[tracing::instrument(name = "send_email", skip(self, body))]
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let url = format!("{}/email", self.base_url.trim_end_matches('/'));

        let request_body = SendEmailRequest {
            from: &self.sender,
            to,
            subject,
            text_body: body,
            message_stream: MESSAGE_STREAM,
        };

        self.http_client
            .post(url)
            .header(POSTMARK_AUTH_HEADER, &self.server_token)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Development backend: messages go to the log instead of the wire.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        tracing::info!(to, subject, body, "outgoing mail (log backend)");
        Ok(())
    }
}
