use serde::Deserialize;
use thiserror::Error;

use super::GraphQlError;
use crate::auth::error::truncate_body;
use crate::auth::AuthError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not authenticated: {0}")]
    Unauthenticated(#[source] AuthError),

    #[error("GraphQL errors: {}", join_messages(.0))]
    GraphQl(Vec<GraphQlError>),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Deserialize)]
struct StatusBody {
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ClientError {
    /// Any non-2xx answer is a transport failure. An `errors` body (how the
    /// endpoint rejects authorization) is kept as its messages.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = match serde_json::from_str::<StatusBody>(body) {
            Ok(parsed) if !parsed.errors.is_empty() => {
                let types = parsed
                    .errors
                    .iter()
                    .filter_map(|e| e.error_type.as_deref())
                    .collect::<Vec<_>>()
                    .join(", ");
                if types.is_empty() {
                    join_messages(&parsed.errors)
                } else {
                    format!("{} ({})", join_messages(&parsed.errors), types)
                }
            }
            _ => truncate_body(body),
        };
        ClientError::Transport(format!("Status {}: {}", status, detail))
    }

    /// Whether the caller should send the user back to the sign-in form.
    pub fn requires_sign_in(&self) -> bool {
        match self {
            ClientError::Unauthenticated(_) => true,
            ClientError::GraphQl(errors) => errors.iter().any(|e| {
                e.error_type
                    .as_deref()
                    .is_some_and(|t| t.contains("Unauthorized"))
            }),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
