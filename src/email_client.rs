/// Outbound email delivery.
///
/// Notification rendering and transport are external collaborators; the
/// credential services only need "send this link to this address", so that
/// is the whole trait surface.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::EmailError;

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send a sign-in/sign-up magic link.
    async fn send_magic_link(&self, recipient: &str, link: &str) -> Result<(), EmailError>;

    /// Send a reviewer invitation link.
    async fn send_reviewer_invite(&self, recipient: &str, link: &str) -> Result<(), EmailError>;
}

#[derive(Serialize)]
struct SendEmailRequest {
    to: String,
    #[serde(rename = "Html")]
    html: String,
    #[serde(rename = "Subject")]
    subject: String,
}

/// Email delivery over the platform's HTTP mail relay.
#[derive(Clone)]
pub struct HttpEmailSender {
    http_client: reqwest::Client,
    base_url: String,
    sender: String,
}

impl HttpEmailSender {
    pub fn new(base_url: String, sender: String, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            base_url,
            sender,
        }
    }

    async fn send(&self, recipient: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let url = format!("{}/email", self.base_url);
        let request = SendEmailRequest {
            to: recipient.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        };

        self.http_client
            .post(&url)
            .header("X-Sender", &self.sender)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send email: {}", e);
                EmailError::ServiceUnavailable(e.to_string())
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!("Email service returned error: {}", e);
                EmailError::SendFailed(e.to_string())
            })?;

        Ok(())
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send_magic_link(&self, recipient: &str, link: &str) -> Result<(), EmailError> {
        let html = format!(
            r#"
            <h1>Sign in to PeerGate</h1>
            <p>Click the link below to continue. It expires in 5 minutes.</p>
            <a href="{}">Sign in</a>
            "#,
            link
        );
        self.send(recipient, "Your sign-in link", &html).await
    }

    async fn send_reviewer_invite(&self, recipient: &str, link: &str) -> Result<(), EmailError> {
        let html = format!(
            r#"
            <h1>You have been invited to review an article</h1>
            <p>Open the link below to accept or decline. It expires in 7 days.</p>
            <a href="{}">View invitation</a>
            "#,
            link
        );
        self.send(recipient, "Reviewer invitation", &html).await
    }
}

/// Captured outbound message.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub recipient: String,
    pub link: String,
}

/// Sender that records messages instead of delivering them; used by the
/// test suites to assert on send counts and to extract codes from links.
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: std::sync::Mutex<Vec<OutboundEmail>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<OutboundEmail> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_magic_link(&self, recipient: &str, link: &str) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(OutboundEmail {
            recipient: recipient.to_string(),
            link: link.to_string(),
        });
        Ok(())
    }

    async fn send_reviewer_invite(&self, recipient: &str, link: &str) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(OutboundEmail {
            recipient: recipient.to_string(),
            link: link.to_string(),
        });
        Ok(())
    }
}
