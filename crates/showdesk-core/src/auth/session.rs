use std::fmt;

use base64::prelude::*;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::identity::{AuthTokens, AwsCredentials};
use super::AuthError;

/// Buffer before access token expiry at which the session is refreshed (60 seconds)
pub const TOKEN_REFRESH_BUFFER_SECS: i64 = 60;

/// An authenticated identity and the tokens that prove it.
///
/// Token values never show up in `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub claims: Map<String, Value>,
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The user behind a session, as shown to the rest of the app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub username: String,
    pub attributes: Map<String, Value>,
}

impl Session {
    /// Build a session from freshly issued tokens.
    ///
    /// The refresh flow does not hand out a new refresh token, so the previous
    /// one is carried over when `tokens.refresh_token` is empty.
    pub fn from_tokens(
        tokens: AuthTokens,
        fallback_username: &str,
        previous_refresh_token: Option<&str>,
    ) -> Result<Self, AuthError> {
        let claims = decode_claims(&tokens.id_token)?;

        let user_id = claims
            .get("sub")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AuthError::ServiceError("ID token has no sub claim".to_string()))?;

        let username = claims
            .get("cognito:username")
            .or_else(|| claims.get("username"))
            .and_then(Value::as_str)
            .unwrap_or(fallback_username)
            .to_string();

        let refresh_token = tokens
            .refresh_token
            .or_else(|| previous_refresh_token.map(str::to_string))
            .ok_or_else(|| AuthError::ServiceError("No refresh token issued".to_string()))?;

        let issued_at = Utc::now();
        Ok(Self {
            user_id,
            username,
            claims,
            access_token: tokens.access_token,
            id_token: tokens.id_token,
            refresh_token,
            issued_at,
            expires_at: issued_at + Duration::seconds(tokens.expires_in.max(0)),
        })
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Check if the access token will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        Utc::now() + Duration::seconds(TOKEN_REFRESH_BUFFER_SECS) >= self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    pub fn user(&self) -> UserIdentity {
        UserIdentity {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            attributes: self.claims.clone(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("access_token", &"<redacted>")
            .field("id_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AwsCredentials {
    /// Check if the credentials will expire soon and should be re-fetched
    pub fn needs_refresh(&self) -> bool {
        Utc::now() + Duration::seconds(TOKEN_REFRESH_BUFFER_SECS) >= self.expiration
    }
}

/// Decode the payload segment of a JWT without verifying it.
///
/// Verification is the identity service's business; the client only reads
/// the claims it was handed over TLS.
fn decode_claims(jwt: &str) -> Result<Map<String, Value>, AuthError> {
    let payload = jwt
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::ServiceError("Malformed ID token".to_string()))?;

    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::ServiceError(format!("Malformed ID token payload: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::ServiceError(format!("Malformed ID token claims: {}", e)))
}
