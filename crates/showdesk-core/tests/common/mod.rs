//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::*;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use showdesk_core::auth::{AuthError, AuthTokens, AwsCredentials, IdentityService};
use showdesk_core::graphql::CredentialSource;
use showdesk_core::{AuthorizationMode, Config};

pub const USERNAME: &str = "test@test.de";
pub const PASSWORD: &str = "testpw";
pub const USER_ID: &str = "8f0c6a2e-1111-2222-3333-444455556666";

/// An unsigned JWT carrying the given claims.
pub fn fake_jwt(claims: Value) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"test"}"#);
    let payload = BASE64_URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

pub fn id_token() -> String {
    fake_jwt(json!({
        "sub": USER_ID,
        "cognito:username": USERNAME,
        "email": USERNAME,
        "token_use": "id"
    }))
}

pub fn config(graphql_endpoint: &str, mode: AuthorizationMode) -> Config {
    Config {
        identity_endpoint: None,
        region: "eu-central-1".to_string(),
        user_pool_id: Some("eu-central-1_pool".to_string()),
        user_pool_client_id: Some("client-id".to_string()),
        identity_pool_id: Some("eu-central-1:identity-pool".to_string()),
        identity_pool_endpoint: None,
        graphql_endpoint: graphql_endpoint.to_string(),
        authorization_mode: mode,
        api_key: Some("da2-test-key".to_string()),
    }
}

/// A URL nothing is listening on.
pub fn refused_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}{}", port, path)
}

/// In-process identity service with call counters and switchable failures.
pub struct MockIdentity {
    pub sign_in_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub credential_calls: AtomicUsize,
    /// Lifetime of access tokens issued on sign-in
    pub sign_in_expires_in: AtomicI64,
    pub fail_refresh: AtomicBool,
    pub fail_sign_out: AtomicBool,
}

impl MockIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sign_in_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            credential_calls: AtomicUsize::new(0),
            sign_in_expires_in: AtomicI64::new(3600),
            fail_refresh: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
        })
    }

    /// Sign-in hands out tokens that are already expired.
    pub fn with_expired_sign_in() -> Arc<Self> {
        let mock = Self::new();
        mock.sign_in_expires_in.store(0, Ordering::SeqCst);
        mock
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityService for MockIdentity {
    async fn initiate_auth(&self, username: &str, password: &str) -> Result<AuthTokens, AuthError> {
        let n = self.sign_in_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if username != USERNAME || password != PASSWORD {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(AuthTokens {
            access_token: format!("access-signin-{}", n),
            id_token: id_token(),
            refresh_token: Some("refresh-token".to_string()),
            expires_in: self.sign_in_expires_in.load(Ordering::SeqCst),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        // Give concurrent callers a chance to pile up behind the refresh.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        if self.fail_refresh.load(Ordering::SeqCst) || refresh_token != "refresh-token" {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(AuthTokens {
            access_token: format!("access-refresh-{}", n),
            id_token: id_token(),
            refresh_token: None,
            expires_in: 3600,
        })
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::NetworkFailure("connection reset".to_string()));
        }
        Ok(())
    }

    async fn identity_credentials(&self, _id_token: &str) -> Result<AwsCredentials, AuthError> {
        let n = self.credential_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AwsCredentials {
            access_key_id: format!("ASIAMOCK{}", n),
            secret_access_key: "mock-secret".to_string(),
            session_token: Some("mock-session-token".to_string()),
            expiration: Utc::now() + Duration::hours(1),
        })
    }
}

/// Credential source that counts how often the client asks it for anything.
pub struct CountingSource {
    pub calls: AtomicUsize,
    pub signed_in: bool,
}

impl CountingSource {
    pub fn signed_in() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            signed_in: true,
        })
    }

    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            signed_in: false,
        })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSource for CountingSource {
    async fn access_token(&self) -> Result<String, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.signed_in {
            Ok("access-token-abc".to_string())
        } else {
            Err(AuthError::NotSignedIn)
        }
    }

    async fn signing_credentials(&self) -> Result<AwsCredentials, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.signed_in {
            return Err(AuthError::NotSignedIn);
        }
        Ok(AwsCredentials {
            access_key_id: "ASIATEST".to_string(),
            secret_access_key: "test-secret".to_string(),
            session_token: Some("test-session-token".to_string()),
            expiration: Utc::now() + Duration::hours(1),
        })
    }
}
