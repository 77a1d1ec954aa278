//! Showdesk core - identity session, request signing and the authenticated
//! GraphQL client behind the show screen.
//!
//! `CredentialProvider` signs the user in and keeps the session fresh,
//! `GraphQlClient` attaches the configured authorization to every request,
//! and `Screen` is the boundary the UI layer drives.

pub mod auth;
pub mod config;
pub mod graphql;
pub mod screen;
pub mod shows;
pub mod signing;

pub use auth::{AuthError, CredentialProvider, Session, UserIdentity};
pub use config::{AuthorizationMode, Config};
pub use graphql::{ClientError, GraphQlClient, GraphQlRequest, GraphQlResponse, OperationKind};
pub use screen::{ActionResult, LoginForm, Screen};
