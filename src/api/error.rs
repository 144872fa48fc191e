use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Credentials rejected at login. Recoverable; the caller shows a
    /// form error and the existing session, if any, is untouched.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Refresh token rejected. Terminal: the session has been cleared
    /// and the caller should redirect to an unauthenticated entry point.
    #[error("Session expired - please log in again")]
    SessionExpired,

    /// A 401 with no recovery path (no refresh token, or the retry
    /// after a successful refresh failed again).
    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    /// The server returned a token payload missing one of the two
    /// tokens; the partial pair was rejected rather than persisted.
    #[error("Invalid session response - incomplete token pair")]
    InvalidSessionResponse,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// True when the caller should redirect to an unauthenticated
    /// entry point instead of showing a transient-error message.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::SessionExpired | ApiError::Unauthorized)
    }
}
