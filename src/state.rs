/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - gate: Gate, identity: IdentityProvider, mailer: Mailer など
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - 起動後は read-only (リクエストごとに設定を読み直さない)
 */
use std::sync::Arc;

use crate::services::{gate::Gate, identity::IdentityProvider, mail::Mailer};

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<Gate>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub mailer: Arc<dyn Mailer>,
    // Internal inbox for contact-form notifications.
    pub contact_inbox: Option<Arc<str>>,
    // Mailgun sending domain, used for the From addresses of form mail.
    pub mail_domain: Option<Arc<str>>,
    // Add `Secure` to cookies we write.
    pub secure_cookies: bool,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gate", &self.gate)
            .field("identity", &self.identity.as_ref().map(|p| p.name()))
            .field("mailer", &self.mailer.name())
            .field("contact_inbox", &self.contact_inbox)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}
