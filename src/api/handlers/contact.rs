/*
 * Responsibility
 * - POST /api/contact (公開エンドポイント、gate の例外)
 * - 社内通知メール → 送信者への確認メール (FR/EN) の順に送る
 */
use axum::{Json, extract::State};

use crate::{
    api::dto::contact::{ContactRequest, ContactResponse},
    error::AppError,
    services::mail::EmailMessage,
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    English,
    French,
}

impl Language {
    // Accented Latin letters, or a handful of common French words.
    fn detect(message: &str) -> Self {
        let accented = message
            .chars()
            .any(|c| ('\u{00C0}'..='\u{017F}').contains(&c));
        let french_word = message
            .split(|c: char| !c.is_alphanumeric())
            .any(|w| {
                matches!(
                    w.to_lowercase().as_str(),
                    "bonjour" | "merci" | "sujet" | "message"
                )
            });

        if accented || french_word {
            Self::French
        } else {
            Self::English
        }
    }
}

pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<ContactResponse>, AppError> {
    req.validate()
        .map_err(|m| AppError::bad_request("INVALID_CONTACT", m))?;

    let inbox = state.contact_inbox.as_deref().ok_or_else(|| {
        tracing::error!("MAILGUN_TO is not configured; cannot deliver contact form");
        AppError::MailDelivery
    })?;

    let name = req.name.trim();
    let email = req.email.trim();
    let message = req.message.trim();
    let domain = state.mail_domain.as_deref();

    let receipt = state
        .mailer
        .send(notification(inbox, domain, name, email, message))
        .await?;
    tracing::debug!(
        mailer = state.mailer.name(),
        id = ?receipt.provider_message_id,
        "contact notification queued"
    );

    let language = Language::detect(message);
    state
        .mailer
        .send(confirmation(language, domain, name, email, message))
        .await?;

    tracing::info!(?language, "contact form delivered");

    Ok(Json(ContactResponse { success: true }))
}

fn notification(
    inbox: &str,
    domain: Option<&str>,
    name: &str,
    email: &str,
    message: &str,
) -> EmailMessage {
    EmailMessage {
        to: inbox.to_string(),
        subject: format!("New message from {}", name),
        text: message.to_string(),
        html: None,
        from: domain.map(|d| format!("BlueWise AI Contact <postmaster@{}>", d)),
        reply_to: Some(email.to_string()),
    }
}

fn confirmation(
    language: Language,
    domain: Option<&str>,
    name: &str,
    email: &str,
    message: &str,
) -> EmailMessage {
    let (subject, text) = match language {
        Language::French => (
            "Merci pour votre message !",
            format!(
                "Bonjour {name},\n\n\
                 Merci d'avoir contacté BlueWise AI. Nous avons bien reçu votre message \
                 et nous vous répondrons sous peu.\n\n\
                 Votre message :\n\"{message}\"\n\n\
                 À bientôt,\nL'équipe BlueWise AI"
            ),
        ),
        Language::English => (
            "Thank you for your message!",
            format!(
                "Hi {name},\n\n\
                 Thank you for contacting BlueWise AI. We've received your message \
                 and will get back to you shortly.\n\n\
                 Your message:\n\"{message}\"\n\n\
                 Talk soon,\nThe BlueWise AI Team"
            ),
        ),
    };

    EmailMessage {
        to: email.to_string(),
        subject: subject.to_string(),
        text,
        html: None,
        from: domain.map(|d| format!("BlueWise AI <hello@{}>", d)),
        reply_to: None,
    }
}
