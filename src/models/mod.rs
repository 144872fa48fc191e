//! Wire-level records exchanged with the authentication backend.
//!
//! Response bodies are deserialized into explicit records and validated
//! at the boundary; partial or malformed payloads are rejected before
//! they can reach session state.

use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Login form data sent to the authentication endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// A complete access/refresh token pair.
///
/// The two tokens travel together everywhere: session state, durable
/// storage, and the refresh exchange. There is deliberately no way to
/// construct or persist half a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Raw token response as the server sends it. Fields are optional so a
/// partial payload parses and can then be rejected with a precise error
/// instead of a generic deserialization failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionTokens {
    /// Validate that both tokens are present and non-empty.
    pub fn into_pair(self) -> Result<TokenPair, ApiError> {
        match (self.access_token, self.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Ok(TokenPair {
                    access_token: access,
                    refresh_token: refresh,
                })
            }
            _ => Err(ApiError::InvalidSessionResponse),
        }
    }
}

/// Body of the refresh exchange.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Authenticated user profile returned by the current-user endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_pair_validates() {
        let tokens: SessionTokens =
            serde_json::from_str(r#"{"accessToken":"a1","refreshToken":"r1"}"#)
                .expect("Failed to parse token response");
        let pair = tokens.into_pair().expect("Complete pair should validate");
        assert_eq!(pair.access_token, "a1");
        assert_eq!(pair.refresh_token, "r1");
    }

    #[test]
    fn test_partial_pair_rejected() {
        let missing_refresh: SessionTokens =
            serde_json::from_str(r#"{"accessToken":"a1"}"#).unwrap();
        assert!(matches!(
            missing_refresh.into_pair(),
            Err(ApiError::InvalidSessionResponse)
        ));

        let missing_access: SessionTokens =
            serde_json::from_str(r#"{"refreshToken":"r1"}"#).unwrap();
        assert!(matches!(
            missing_access.into_pair(),
            Err(ApiError::InvalidSessionResponse)
        ));

        let empty: SessionTokens =
            serde_json::from_str(r#"{"accessToken":"","refreshToken":"r1"}"#).unwrap();
        assert!(matches!(
            empty.into_pair(),
            Err(ApiError::InvalidSessionResponse)
        ));
    }

    #[test]
    fn test_user_tolerates_extra_fields() {
        let user: User = serde_json::from_str(
            r#"{"id":1,"name":"x","email":"x@example.com","createdAt":"2024-01-01"}"#,
        )
        .expect("Failed to parse user");
        assert_eq!(user.id, 1);
        assert_eq!(user.name, "x");
        assert_eq!(user.email.as_deref(), Some("x@example.com"));
        assert!(user.role.is_none());
    }
}
