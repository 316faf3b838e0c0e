//! Verification of HS256 session tokens issued by the external auth service.

use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::VerifyWithKey;
use potion::HtmlError;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::schema::{Id, UserRole};

use super::permissions::ActionType;

#[derive(Clone)]
pub struct SessionKey {
    key: Hmac<Sha256>,
}

impl SessionKey {
    pub fn new(secret: &[u8]) -> Self {
        // HMAC accepts keys of any length
        let key = Hmac::new_from_slice(secret).unwrap_or_else(|_| unreachable!());
        Self { key }
    }

    pub fn hmac(&self) -> &Hmac<Sha256> {
        &self.key
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn new(user_id: Id, username: String, role: UserRole) -> Self {
        Self {
            is_admin: role == UserRole::Admin,
            user_id,
            username,
            role,
        }
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), potion::Error> {
        if !action.authenticate(self) {
            return Err(
                HtmlError::Unauthorized.new("You don't have permission to perform this action")
            );
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData::new(value.user_id, value.username, value.role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid session; Invalid token")]
    InvalidToken,
    #[error("Invalid session; Token expired")]
    Expired,
}

impl From<SessionError> for potion::Error {
    fn from(value: SessionError) -> Self {
        HtmlError::InvalidSession.new(&value.to_string())
    }
}

pub fn verify_jwt_session(token: &str, key: &SessionKey) -> Result<JwtSessionData, SessionError> {
    let session: JwtSessionData = token
        .verify_with_key(key.hmac())
        .map_err(|_| SessionError::InvalidToken)?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        log::debug!("rejected expired session for user {}", session.user_id);
        return Err(SessionError::Expired);
    }

    Ok(session)
}

/// Strips the `Bearer` scheme from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
