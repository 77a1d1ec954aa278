use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::cognito::CognitoClient;
use super::identity::{AwsCredentials, IdentityService};
use super::session::{Session, UserIdentity};
use super::AuthError;
use crate::config::Config;

#[derive(Default)]
struct SessionState {
    session: Option<Session>,
    /// Identity pool credentials derived from `session`; dropped with it
    aws: Option<AwsCredentials>,
}

/// Owns the current session and everything derived from it.
///
/// The session is only ever written here. The lock is held across a refresh
/// so a concurrent reader sees either the old session or the replacement,
/// never a half-updated one.
pub struct CredentialProvider {
    config: Arc<Config>,
    identity: Arc<dyn IdentityService>,
    state: Mutex<SessionState>,
}

impl CredentialProvider {
    /// Create a provider talking to the configured Cognito endpoints.
    pub fn configure(config: Arc<Config>) -> anyhow::Result<Self> {
        let identity = CognitoClient::new(&config)?;
        Ok(Self::with_identity_service(config, Arc::new(identity)))
    }

    pub fn with_identity_service(config: Arc<Config>, identity: Arc<dyn IdentityService>) -> Self {
        Self {
            config,
            identity,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Check whether a session is held, without refreshing it
    pub async fn is_signed_in(&self) -> bool {
        self.state.lock().await.session.is_some()
    }

    /// Authenticate and replace any prior session.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let tokens = self.identity.initiate_auth(username, password).await?;
        let session = Session::from_tokens(tokens, username, None)?;

        let mut state = self.state.lock().await;
        state.session = Some(session.clone());
        state.aws = None;

        info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    /// Drop the local session, then revoke it remotely on a best-effort basis.
    ///
    /// Local state is gone even when this returns an error.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let session = {
            let mut state = self.state.lock().await;
            state.aws = None;
            state.session.take()
        };

        let Some(session) = session else {
            debug!("Sign-out requested without a session");
            return Ok(());
        };

        match self.identity.sign_out(&session.access_token).await {
            Ok(()) => {
                info!(user_id = %session.user_id, "Signed out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, user_id = %session.user_id, "Remote sign-out failed, local session cleared");
                Err(e)
            }
        }
    }

    /// Return the session, refreshing its access token first if it is about to expire.
    ///
    /// A failed refresh ends the session.
    pub async fn current_session(&self) -> Result<Session, AuthError> {
        let mut state = self.state.lock().await;
        let Some(session) = state.session.as_ref() else {
            return Err(AuthError::NotSignedIn);
        };

        if !session.needs_refresh() {
            return Ok(session.clone());
        }

        debug!(user_id = %session.user_id, "Access token expiring, refreshing session");
        let refresh_token = session.refresh_token.clone();
        let username = session.username.clone();

        let refreshed = match self.identity.refresh(&refresh_token).await {
            Ok(tokens) => Session::from_tokens(tokens, &username, Some(&refresh_token)),
            Err(e) => Err(e),
        };

        match refreshed {
            Ok(session) => {
                debug!(user_id = %session.user_id, expires_at = %session.expires_at, "Session refreshed");
                state.session = Some(session.clone());
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed, clearing session");
                state.session = None;
                state.aws = None;
                Err(AuthError::NotSignedIn)
            }
        }
    }

    pub async fn current_user(&self) -> Result<UserIdentity, AuthError> {
        Ok(self.current_session().await?.user())
    }

    /// Temporary AWS credentials for the signed-in user, fetched from the
    /// identity pool and cached until they near expiry.
    pub async fn aws_credentials(&self) -> Result<AwsCredentials, AuthError> {
        let session = self.current_session().await?;

        {
            let state = self.state.lock().await;
            if let Some(ref creds) = state.aws {
                if !creds.needs_refresh() {
                    return Ok(creds.clone());
                }
            }
        }

        debug!(user_id = %session.user_id, "Fetching identity pool credentials");
        let creds = self.identity.identity_credentials(&session.id_token).await?;

        let mut state = self.state.lock().await;
        // A sign-out or a different sign-in may have happened while we were waiting.
        let same_user = state
            .session
            .as_ref()
            .is_some_and(|s| s.user_id == session.user_id);
        if same_user {
            state.aws = Some(creds.clone());
        }
        Ok(creds)
    }
}
