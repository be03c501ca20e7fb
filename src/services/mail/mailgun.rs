use async_trait::async_trait;
use serde::Deserialize;

use crate::config::MailgunConfig;
use crate::services::mail::client::{EmailMessage, MailError, Mailer, SendReceipt};

/// Mailgun HTTP API sender.
///
/// Configuration gaps are reported per send (not at startup) so the public
/// site keeps serving when mail is not set up.
#[derive(Clone)]
pub struct MailgunMailer {
    client: reqwest::Client,
    api_key: Option<String>,
    domain: Option<String>,
    default_from: Option<String>,
    base_url: &'static str,
}

impl std::fmt::Debug for MailgunMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the api key
        f.debug_struct("MailgunMailer")
            .field("domain", &self.domain)
            .field("default_from", &self.default_from)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl MailgunMailer {
    pub fn new(config: &MailgunConfig) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let default_from = config.from.clone().or_else(|| {
            config
                .domain
                .as_ref()
                .map(|d| format!("BlueWise AI <sales@{}>", d))
        });

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            domain: config.domain.clone(),
            default_from,
            base_url: base_url_for_region(&config.region),
        })
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }
}

/// US: `https://api.mailgun.net`, EU: `https://api.eu.mailgun.net`
fn base_url_for_region(region: &str) -> &'static str {
    if region.eq_ignore_ascii_case("eu") {
        "https://api.eu.mailgun.net"
    } else {
        "https://api.mailgun.net"
    }
}

fn form_fields(message: &EmailMessage, from: &str) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("from", from.to_string()),
        ("to", message.to.clone()),
        ("subject", message.subject.clone()),
        // keep text always for deliverability
        ("text", message.text.clone()),
    ];
    if let Some(html) = &message.html {
        form.push(("html", html.clone()));
    }
    if let Some(reply_to) = &message.reply_to {
        form.push(("h:Reply-To", reply_to.clone()));
    }
    form
}

#[async_trait]
impl Mailer for MailgunMailer {
    fn name(&self) -> &'static str {
        "mailgun"
    }

    async fn send(&self, message: EmailMessage) -> Result<SendReceipt, MailError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(MailError::NotConfigured("MAILGUN_API_KEY"))?;
        let domain = self
            .domain
            .as_deref()
            .ok_or(MailError::NotConfigured("MAILGUN_DOMAIN"))?;

        let message = message.normalized()?;
        let from = message
            .from
            .clone()
            .or_else(|| self.default_from.clone())
            .ok_or(MailError::NotConfigured("MAILGUN_FROM"))?;

        let resp = self
            .client
            .post(format!("{}/v3/{}/messages", self.base_url, domain))
            .basic_auth("api", Some(api_key))
            .form(&form_fields(&message, &from))
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        let parsed: Option<MailgunResponse> = serde_json::from_str(&raw).ok();

        if !status.is_success() {
            let message = parsed
                .and_then(|p| p.message.or(p.error))
                .unwrap_or_else(|| format!("Mailgun error ({})", status.as_u16()));
            return Err(MailError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let provider_message_id = parsed.and_then(|p| p.id);
        tracing::debug!(
            to = %message.to,
            id = ?provider_message_id,
            "mailgun accepted message"
        );

        Ok(SendReceipt {
            provider_message_id,
        })
    }
}
