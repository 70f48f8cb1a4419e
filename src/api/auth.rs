//! Bearer credential verification for the request path.
//!
//! Tokens are HS256 JWTs carrying `{id, role, exp}`. The `id` claim is the
//! caller's user id; `role == "admin"` grants the privileged role.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::GatewayError;
use crate::service::Caller;

/// Role claim value that grants the privileged role.
pub const ADMIN_ROLE: &str = "admin";

/// JWT claims carried by bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id of the token holder.
    pub id: String,
    /// Optional role; `"admin"` is privileged.
    #[serde(default)]
    pub role: Option<String>,
    /// Expiry as seconds since the Unix epoch.
    pub exp: usize,
}

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: String,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Creates a verifier for `secret`.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Signs a token for `user_id` valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if encoding fails.
    pub fn issue(
        &self,
        user_id: UserId,
        privileged: bool,
        ttl: Duration,
    ) -> Result<String, GatewayError> {
        let exp = usize::try_from((Utc::now() + ttl).timestamp()).unwrap_or(0);
        let claims = Claims {
            id: user_id.to_string(),
            role: privileged.then(|| ADMIN_ROLE.to_string()),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| GatewayError::Internal(format!("token encoding failed: {e}")))
    }

    /// Verifies `token` and returns the caller it identifies.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] if the signature or expiry
    /// check fails, or the `id` claim is not a valid user id.
    pub fn verify(&self, token: &str) -> Result<Caller, GatewayError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            GatewayError::Unauthorized("invalid or expired token".to_string())
        })?
        .claims;

        let user_id = claims.id.parse::<UserId>().map_err(|_| {
            GatewayError::Unauthorized("token carries a malformed user id".to_string())
        })?;

        Ok(Caller {
            user_id,
            privileged: claims.role.as_deref() == Some(ADMIN_ROLE),
        })
    }
}

/// Extractor for routes that require a bearer credential.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Caller);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| GatewayError::Unauthorized("missing authorization header".to_string()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            GatewayError::Unauthorized("expected a Bearer token".to_string())
        })?;

        state.verifier.verify(token.trim()).map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies() {
        let verifier = TokenVerifier::new("secret");
        let user = UserId::generate();
        let Ok(token) = verifier.issue(user, false, Duration::hours(1)) else {
            panic!("issue failed");
        };
        let Ok(caller) = verifier.verify(&token) else {
            panic!("verify failed");
        };
        assert_eq!(caller.user_id, user);
        assert!(!caller.privileged);
    }

    #[test]
    fn admin_role_is_privileged() {
        let verifier = TokenVerifier::new("secret");
        let Ok(token) = verifier.issue(UserId::generate(), true, Duration::hours(1)) else {
            panic!("issue failed");
        };
        let Ok(caller) = verifier.verify(&token) else {
            panic!("verify failed");
        };
        assert!(caller.privileged);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let Ok(token) =
            TokenVerifier::new("one").issue(UserId::generate(), false, Duration::hours(1))
        else {
            panic!("issue failed");
        };
        let result = TokenVerifier::new("two").verify(&token);
        assert!(matches!(result, Err(GatewayError::Unauthorized(_))));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let verifier = TokenVerifier::new("secret");
        let Ok(token) = verifier.issue(UserId::generate(), false, Duration::hours(-2)) else {
            panic!("issue failed");
        };
        assert!(matches!(
            verifier.verify(&token),
            Err(GatewayError::Unauthorized(_))
        ));
    }

    #[test]
    fn malformed_subject_is_unauthorized() {
        let verifier = TokenVerifier::new("secret");
        let claims = Claims {
            id: "not-an-id".to_string(),
            role: None,
            exp: usize::try_from((Utc::now() + Duration::hours(1)).timestamp()).unwrap_or(0),
        };
        let Ok(token) = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        ) else {
            panic!("encode failed");
        };
        assert!(matches!(
            verifier.verify(&token),
            Err(GatewayError::Unauthorized(_))
        ));
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", TokenVerifier::new("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
