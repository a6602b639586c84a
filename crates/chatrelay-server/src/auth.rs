//! Session authentication
//!
//! Sessions come from a provider trait so deployments can plug in a real
//! identity backend; the static token provider covers single-tenant and
//! test setups. Token comparison is constant-time.

use crate::config::TokenConfig;
use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use chatrelay_session::UserType;
use subtle::ConstantTimeEq;

/// Authenticated caller of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub user_type: UserType,
}

/// Token-based session source
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolve a bearer token to a session
    async fn authenticate(&self, token: &str) -> Option<Session>;
}

/// Provider over a fixed token list
#[derive(Default)]
pub struct StaticTokenProvider {
    tokens: Vec<(String, Session)>,
}

impl StaticTokenProvider {
    /// Build from configuration entries
    pub fn from_config(entries: &[TokenConfig]) -> Self {
        Self {
            tokens: entries
                .iter()
                .map(|entry| {
                    (
                        entry.token.clone(),
                        Session {
                            user_id: entry.user_id.clone(),
                            user_type: entry.user_type,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl SessionProvider for StaticTokenProvider {
    async fn authenticate(&self, token: &str) -> Option<Session> {
        self.tokens
            .iter()
            .find(|(known, _)| {
                known.len() == token.len()
                    && known.as_bytes().ct_eq(token.as_bytes()).into()
            })
            .map(|(_, session)| session.clone())
    }
}

/// Extract the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn provider() -> StaticTokenProvider {
        StaticTokenProvider::from_config(&[TokenConfig {
            token: "secret-token".into(),
            user_id: "u1".into(),
            user_type: UserType::Regular,
        }])
    }

    #[tokio::test]
    async fn test_known_token_resolves() {
        let session = provider().authenticate("secret-token").await.unwrap();
        assert_eq!(session.user_id, "u1");
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        assert!(provider().authenticate("wrong").await.is_none());
        assert!(provider().authenticate("secret-token2").await.is_none());
    }

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.remove(AUTHORIZATION);
        assert_eq!(bearer_token(&headers), None);
    }
}
