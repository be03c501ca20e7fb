//! Outbound transactional mail interface used by the public forms.
use async_trait::async_trait;
use thiserror::Error;

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    // Falls back to the sender's configured default.
    pub from: Option<String>,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub provider_message_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail sender is not configured: missing {0}")]
    NotConfigured(&'static str),
    #[error("missing to/subject/body")]
    InvalidMessage,
    #[error("mail transport error: {0}")]
    Transport(String),
    #[error("mail provider timed out")]
    Timeout,
    #[error("mail provider rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl From<reqwest::Error> for MailError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    // Provider name (for logging).
    fn name(&self) -> &'static str;

    async fn send(&self, message: EmailMessage) -> Result<SendReceipt, MailError>;
}

impl EmailMessage {
    /// Trimmed copy, or `InvalidMessage` when to/subject/body is blank.
    pub fn normalized(self) -> Result<Self, MailError> {
        let to = self.to.trim().to_string();
        let subject = self.subject.trim().to_string();
        if to.is_empty() || subject.is_empty() || self.text.trim().is_empty() {
            return Err(MailError::InvalidMessage);
        }

        Ok(Self {
            to,
            subject,
            reply_to: self
                .reply_to
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            from: self
                .from
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty()),
            ..self
        })
    }
}
