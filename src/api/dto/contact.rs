/*
 * Responsibility
 * - Contact form の request/response DTO
 * - validate() で必須項目チェック
 */
use serde::{Deserialize, Serialize};

const MAX_FIELD_CHARS: usize = 256;
const MAX_MESSAGE_CHARS: usize = 10_000;

#[derive(Debug, Default, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl ContactRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.message.trim().is_empty()
        {
            return Err("Please fill out all fields.");
        }
        if self.name.chars().count() > MAX_FIELD_CHARS
            || self.email.chars().count() > MAX_FIELD_CHARS
        {
            return Err("name and email must be <= 256 chars");
        }
        if self.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err("message is too long");
        }
        // Reply-To header material: one address, no header injection.
        let email = self.email.trim();
        if !email.contains('@') || email.contains(['\r', '\n', ',', ';']) {
            return Err("email is invalid");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
}
