/*
 * Responsibility
 * - Session bridge (client tokens → HttpOnly cookies) の request/response DTO
 */
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct SetSessionRequest {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

impl std::fmt::Debug for SetSessionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print tokens
        f.debug_struct("SetSessionRequest").finish_non_exhaustive()
    }
}

impl SetSessionRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.access_token.trim().is_empty() || self.refresh_token.trim().is_empty() {
            return Err("Missing tokens");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSessionResponse {
    pub ok: bool,
    pub user_id: Option<Uuid>,
}
