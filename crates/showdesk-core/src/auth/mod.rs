//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `CredentialProvider`: sign-in, sign-out and transparent token refresh
//! - `Session`: the tokens and claims of the signed-in user
//! - `IdentityService`: the hosted identity service, implemented over HTTP by
//!   `CognitoClient`
//!
//! Sessions live in memory only and are refreshed 60 seconds before expiry.

pub mod cognito;
pub mod error;
pub mod identity;
pub mod provider;
pub mod session;

pub use cognito::CognitoClient;
pub use error::AuthError;
pub use identity::{AuthTokens, AwsCredentials, IdentityService};
pub use provider::CredentialProvider;
pub use session::{Session, UserIdentity};
