//! Authenticated GraphQL client.
//!
//! `GraphQlClient` sends documents to the configured endpoint, authorized by
//! API key, by the session's access token, or by a SigV4 signature made with
//! identity pool credentials. Credentials come from a `CredentialSource`,
//! normally the `CredentialProvider`.

pub mod client;
pub mod credentials;
pub mod error;
pub mod request;
pub mod response;

pub use client::GraphQlClient;
pub use credentials::CredentialSource;
pub use error::ClientError;
pub use request::{GraphQlRequest, OperationKind};
pub use response::{GraphQlError, GraphQlResponse, Location, PathSegment};
