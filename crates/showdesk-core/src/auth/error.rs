use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Identity service error: {0}")]
    ServiceError(String),

    #[error("Not signed in")]
    NotSignedIn,
}

/// Maximum length for error response bodies in error messages
pub(crate) const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error types the identity service uses for rejected credentials.
const CREDENTIAL_REJECTIONS: &[&str] = &["NotAuthorizedException", "UserNotFoundException"];

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Truncate a response body to avoid logging excessive data
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }
}

impl AuthError {
    /// Classify a non-success identity service response.
    ///
    /// The service reports the error kind in `__type`, sometimes prefixed with
    /// a namespace (`com.amazonaws...#NotAuthorizedException`).
    pub fn from_service_response(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed: Option<ServiceErrorBody> = serde_json::from_str(body).ok();
        let kind = parsed
            .as_ref()
            .and_then(|b| b.kind.as_deref())
            .map(|k| k.rsplit('#').next().unwrap_or(k).to_string());

        if let Some(ref kind) = kind {
            if CREDENTIAL_REJECTIONS.contains(&kind.as_str()) {
                return AuthError::InvalidCredentials;
            }
        }

        let message = parsed
            .and_then(|b| b.message)
            .unwrap_or_else(|| truncate_body(body));
        match kind {
            Some(kind) => AuthError::ServiceError(format!("{} ({}): {}", kind, status, message)),
            None => AuthError::ServiceError(format!("Status {}: {}", status, message)),
        }
    }

    /// Whether the caller should send the user back to the sign-in form.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, AuthError::NotSignedIn | AuthError::InvalidCredentials)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AuthError::ServiceError(format!("Malformed identity service response: {}", err))
        } else {
            AuthError::NetworkFailure(err.to_string())
        }
    }
}
