use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Tokens handed out by the identity service on sign-in or refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access_token: String,
    pub id_token: String,
    /// Absent on refresh; the existing refresh token stays valid.
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Temporary AWS credentials used to sign requests.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub expiration: DateTime<Utc>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// The hosted identity service, as seen by the credential provider.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Exchange a username and password for tokens.
    async fn initiate_auth(&self, username: &str, password: &str) -> Result<AuthTokens, AuthError>;

    /// Obtain a new access token with a refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;

    /// Invalidate the tokens issued to the user behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Exchange an ID token for temporary AWS credentials.
    async fn identity_credentials(&self, id_token: &str) -> Result<AwsCredentials, AuthError>;
}
