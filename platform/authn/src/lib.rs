//! Platform authentication helpers.
//!
//! Sessions travel as HS256 tokens, either in an `Authorization: Bearer`
//! header or in the [`SESSION_COOKIE`] cookie. Login flows live with the
//! identity provider; this crate only mints and verifies tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "dealer_session";

#[derive(Debug, Error)]
pub enum AuthnError {
    #[error("invalid session token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("failed to sign session token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("session lifetime of {0} minutes is out of range")]
    TtlOutOfRange(i64),
}

#[derive(Clone)]
pub struct AuthConfig {
    secret: Vec<u8>,
    pub session_ttl_minutes: i64,
}

impl AuthConfig {
    pub fn new(secret: impl Into<Vec<u8>>, session_ttl_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            session_ttl_minutes,
        }
    }

    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret)
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret)
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("session_ttl_minutes", &self.session_ttl_minutes)
            .finish()
    }
}

/// The caller as seen by route guards. `role` is carried verbatim; the
/// resolver decides what an unrecognized role may do (nothing).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

impl From<SessionClaims> for Session {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

pub fn issue_token(session: &Session, config: &AuthConfig) -> Result<String, AuthnError> {
    let now = Utc::now();
    let ttl = config.session_ttl_minutes;
    let exp = Duration::try_minutes(ttl)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or(AuthnError::TtlOutOfRange(ttl))?
        .timestamp() as usize;
    let claims = SessionClaims {
        sub: session.id,
        email: session.email.clone(),
        role: session.role.clone(),
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
        .map_err(AuthnError::Signing)
}

pub fn decode_token(token: &str, config: &AuthConfig) -> Result<Session, AuthnError> {
    jsonwebtoken::decode::<SessionClaims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims.into())
        .map_err(AuthnError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new(b"0123456789abcdef0123456789abcdef".to_vec(), 30)
    }

    fn session(role: &str) -> Session {
        Session {
            id: Uuid::new_v4(),
            email: "lot@dealer.test".into(),
            role: role.into(),
        }
    }

    #[test]
    fn issued_token_decodes_to_same_session() {
        let original = session("sales_agent");
        let token = issue_token(&original, &config()).unwrap();
        assert_eq!(decode_token(&token, &config()).unwrap(), original);
    }

    #[test]
    fn unknown_roles_survive_the_round_trip() {
        let original = session("regional_director");
        let token = issue_token(&original, &config()).unwrap();
        assert_eq!(decode_token(&token, &config()).unwrap().role, "regional_director");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(&session("viewer"), &config()).unwrap();
        let other = AuthConfig::new(b"another-secret-another-secret-xx".to_vec(), 30);
        assert!(matches!(
            decode_token(&token, &other),
            Err(AuthnError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired = AuthConfig::new(b"0123456789abcdef0123456789abcdef".to_vec(), -120);
        let token = issue_token(&session("viewer"), &expired).unwrap();
        assert!(decode_token(&token, &config()).is_err());
    }

    #[test]
    fn oversized_ttl_is_an_error() {
        let secret = b"0123456789abcdef0123456789abcdef".to_vec();
        for ttl in [i64::MAX, i64::MAX / 2, i64::MIN] {
            let config = AuthConfig::new(secret.clone(), ttl);
            assert!(matches!(
                issue_token(&session("viewer"), &config),
                Err(AuthnError::TtlOutOfRange(value)) if value == ttl
            ));
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_token("not-a-token", &config()).is_err());
        assert!(decode_token("", &config()).is_err());
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("0123456789"));
    }
}
