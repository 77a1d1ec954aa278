use async_trait::async_trait;

use crate::auth::{AuthError, AwsCredentials, CredentialProvider};

/// Where the GraphQL client gets the values it authorizes requests with.
///
/// Implementors may refresh tokens; the client only reads.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// A valid access token for bearer-token mode.
    async fn access_token(&self) -> Result<String, AuthError>;

    /// Temporary credentials for signed-request mode.
    async fn signing_credentials(&self) -> Result<AwsCredentials, AuthError>;
}

#[async_trait]
impl CredentialSource for CredentialProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.current_session().await?.access_token)
    }

    async fn signing_credentials(&self) -> Result<AwsCredentials, AuthError> {
        self.aws_credentials().await
    }
}
