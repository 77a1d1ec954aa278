//! HTTP client for the Cognito user pool and identity pool JSON APIs.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::identity::{AuthTokens, AwsCredentials, IdentityService};
use super::error::truncate_body;
use super::AuthError;
use crate::config::Config;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const AMZ_JSON: &str = "application/x-amz-json-1.1";
const AMZ_TARGET: &str = "X-Amz-Target";

const USER_POOL_SERVICE: &str = "AWSCognitoIdentityProviderService";
const IDENTITY_POOL_SERVICE: &str = "AWSCognitoIdentityService";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    id_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetIdResponse {
    identity_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetCredentialsResponse {
    credentials: IdentityPoolCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IdentityPoolCredentials {
    access_key_id: String,
    secret_key: String,
    session_token: String,
    /// Seconds since the epoch
    expiration: f64,
}

impl From<AuthenticationResult> for AuthTokens {
    fn from(result: AuthenticationResult) -> Self {
        AuthTokens {
            access_token: result.access_token,
            id_token: result.id_token,
            refresh_token: result.refresh_token,
            expires_in: result.expires_in,
        }
    }
}

impl TryFrom<IdentityPoolCredentials> for AwsCredentials {
    type Error = AuthError;

    fn try_from(creds: IdentityPoolCredentials) -> Result<Self, AuthError> {
        let expiration = DateTime::from_timestamp(creds.expiration as i64, 0).ok_or_else(|| {
            AuthError::ServiceError(format!("Invalid credential expiration: {}", creds.expiration))
        })?;
        Ok(AwsCredentials {
            access_key_id: creds.access_key_id,
            secret_access_key: creds.secret_key,
            session_token: Some(creds.session_token),
            expiration,
        })
    }
}

/// Cognito client. Clone is cheap - reqwest::Client shares its connection pool.
#[derive(Clone)]
pub struct CognitoClient {
    client: Client,
    user_pool_endpoint: String,
    identity_pool_endpoint: String,
    client_id: Option<String>,
    identity_pool_id: Option<String>,
    login_provider: Option<String>,
}

impl CognitoClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            user_pool_endpoint: config.identity_endpoint(),
            identity_pool_endpoint: config.identity_pool_endpoint(),
            client_id: config.user_pool_client_id.clone(),
            identity_pool_id: config.identity_pool_id.clone(),
            login_provider: config.login_provider(),
        })
    }

    fn client_id(&self) -> Result<&str, AuthError> {
        self.client_id
            .as_deref()
            .ok_or_else(|| AuthError::ServiceError("No user pool client id configured".to_string()))
    }

    /// POST one JSON-1.1 action and decode its response.
    async fn call<B, T>(&self, endpoint: &str, target: &str, body: &B) -> Result<T, AuthError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| AuthError::ServiceError(format!("Failed to encode request: {}", e)))?;

        let response = self
            .client
            .post(endpoint)
            .header(header::CONTENT_TYPE, AMZ_JSON)
            .header(AMZ_TARGET, target)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(target_action = target, status = %status, "Identity service response received");

        if !status.is_success() {
            return Err(AuthError::from_service_response(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            AuthError::ServiceError(format!(
                "Failed to parse {} response: {} ({})",
                target,
                e,
                truncate_body(&text)
            ))
        })
    }

    async fn user_pool_auth(&self, flow: &str, parameters: serde_json::Value) -> Result<AuthTokens, AuthError> {
        let body = json!({
            "AuthFlow": flow,
            "ClientId": self.client_id()?,
            "AuthParameters": parameters,
        });
        let target = format!("{}.InitiateAuth", USER_POOL_SERVICE);
        let response: InitiateAuthResponse =
            self.call(&self.user_pool_endpoint, &target, &body).await?;

        match (response.authentication_result, response.challenge_name) {
            (Some(result), _) => Ok(result.into()),
            (None, Some(challenge)) => Err(AuthError::ServiceError(format!(
                "Unsupported authentication challenge: {}",
                challenge
            ))),
            (None, None) => Err(AuthError::ServiceError(
                "Authentication response carried no tokens".to_string(),
            )),
        }
    }
}

#[async_trait]
impl IdentityService for CognitoClient {
    async fn initiate_auth(&self, username: &str, password: &str) -> Result<AuthTokens, AuthError> {
        self.user_pool_auth(
            "USER_PASSWORD_AUTH",
            json!({ "USERNAME": username, "PASSWORD": password }),
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        self.user_pool_auth("REFRESH_TOKEN_AUTH", json!({ "REFRESH_TOKEN": refresh_token }))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let target = format!("{}.GlobalSignOut", USER_POOL_SERVICE);
        let _: serde_json::Value = self
            .call(&self.user_pool_endpoint, &target, &json!({ "AccessToken": access_token }))
            .await?;
        Ok(())
    }

    async fn identity_credentials(&self, id_token: &str) -> Result<AwsCredentials, AuthError> {
        let pool_id = self.identity_pool_id.as_deref().ok_or_else(|| {
            AuthError::ServiceError("No identity pool configured".to_string())
        })?;
        let provider = self.login_provider.as_deref().ok_or_else(|| {
            AuthError::ServiceError("No user pool configured for identity pool logins".to_string())
        })?;

        let mut logins = serde_json::Map::new();
        logins.insert(provider.to_string(), json!(id_token));

        let target = format!("{}.GetId", IDENTITY_POOL_SERVICE);
        let identity: GetIdResponse = self
            .call(
                &self.identity_pool_endpoint,
                &target,
                &json!({ "IdentityPoolId": pool_id, "Logins": logins }),
            )
            .await?;

        let target = format!("{}.GetCredentialsForIdentity", IDENTITY_POOL_SERVICE);
        let response: GetCredentialsResponse = self
            .call(
                &self.identity_pool_endpoint,
                &target,
                &json!({ "IdentityId": identity.identity_id, "Logins": logins }),
            )
            .await?;

        response.credentials.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_initiate_auth_response() {
        let json = r#"{"AuthenticationResult":{"AccessToken":"a","ExpiresIn":3600,"IdToken":"i","RefreshToken":"r","TokenType":"Bearer"},"ChallengeParameters":{}}"#;
        let response: InitiateAuthResponse = serde_json::from_str(json).unwrap();
        let tokens: AuthTokens = response.authentication_result.unwrap().into();
        assert_eq!(tokens.access_token, "a");
        assert_eq!(tokens.refresh_token.as_deref(), Some("r"));
        assert_eq!(tokens.expires_in, 3600);
    }

    #[test]
    fn test_parse_challenge_response() {
        let json = r#"{"ChallengeName":"NEW_PASSWORD_REQUIRED","Session":"xyz","ChallengeParameters":{}}"#;
        let response: InitiateAuthResponse = serde_json::from_str(json).unwrap();
        assert!(response.authentication_result.is_none());
        assert_eq!(response.challenge_name.as_deref(), Some("NEW_PASSWORD_REQUIRED"));
    }

    #[test]
    fn test_parse_identity_pool_credentials() {
        let json = r#"{"Credentials":{"AccessKeyId":"ASIA123","Expiration":1.7000036E9,"SecretKey":"secret","SessionToken":"token"},"IdentityId":"eu-central-1:abc"}"#;
        let response: GetCredentialsResponse = serde_json::from_str(json).unwrap();
        let creds: AwsCredentials = response.credentials.try_into().unwrap();
        assert_eq!(creds.access_key_id, "ASIA123");
        assert_eq!(creds.session_token.as_deref(), Some("token"));
        assert_eq!(creds.expiration.timestamp(), 1_700_003_600);
    }
}
