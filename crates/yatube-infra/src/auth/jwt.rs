//! Login sessions as HS256-signed JWTs.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use yatube_core::ports::{AuthError, TokenClaims, TokenService};

const INSECURE_SECRET: &str = "change-me-in-production";

/// Signing settings for session tokens.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub lifetime: TimeDelta,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: INSECURE_SECRET.to_string(),
            lifetime: TimeDelta::weeks(2),
            issuer: "yatube".to_string(),
        }
    }
}

impl JwtConfig {
    /// Read `JWT_SECRET`, `JWT_EXPIRATION_HOURS` and `JWT_ISSUER`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secret = std::env::var("JWT_SECRET").unwrap_or(defaults.secret);

        if secret == INSECURE_SECRET {
            let production = std::env::var("RUST_ENV")
                .is_ok_and(|env| env == "production" || env == "prod");
            if production {
                tracing::error!("SECURITY: sessions are signed with the default secret. Set JWT_SECRET.");
            } else {
                tracing::warn!("Sessions are signed with the default secret. Set JWT_SECRET for production use.");
            }
        }

        let lifetime = std::env::var("JWT_EXPIRATION_HOURS")
            .ok()
            .and_then(|hours| hours.parse().ok())
            .map(TimeDelta::hours)
            .unwrap_or(defaults.lifetime);

        Self {
            secret,
            lifetime,
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
        }
    }
}

/// Registered claims plus the numeric user id.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    /// Username of the session owner.
    sub: String,
    uid: i32,
    iat: i64,
    exp: i64,
    iss: String,
}

/// Issues and checks session tokens.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::default();
        validation.set_issuer(&[&config.issuer]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(JwtConfig::from_env())
    }
}

impl TokenService for JwtTokenService {
    fn generate_token(&self, user_id: i32, username: &str) -> Result<String, AuthError> {
        let issued_at = Utc::now();
        let claims = SessionClaims {
            sub: username.to_string(),
            uid: user_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.config.lifetime).timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        Ok(TokenClaims {
            user_id: data.claims.uid,
            username: data.claims.sub,
            exp: data.claims.exp,
        })
    }

    fn expiration_seconds(&self) -> i64 {
        self.config.lifetime.num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str, issuer: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            lifetime: TimeDelta::hours(1),
            issuer: issuer.to_string(),
        }
    }

    #[test]
    fn test_session_keeps_user_id_and_username() {
        let service = JwtTokenService::new(config("test-secret", "yatube-test"));

        let token = service.generate_token(42, "Kir").unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.username, "Kir");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let service = JwtTokenService::new(config("test-secret", "yatube-test"));
        assert!(matches!(
            service.validate_token("not.a.token"),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_token_from_other_issuer_is_rejected() {
        let ours = JwtTokenService::new(config("shared-secret", "yatube"));
        let theirs = JwtTokenService::new(config("shared-secret", "elsewhere"));

        let token = theirs.generate_token(1, "auth").unwrap();
        assert!(ours.validate_token(&token).is_err());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let ours = JwtTokenService::new(config("test-secret", "yatube"));
        let forged = JwtTokenService::new(config("another-secret", "yatube"));

        let token = forged.generate_token(1, "auth").unwrap();
        assert!(ours.validate_token(&token).is_err());
    }

    #[test]
    fn test_stale_session_is_reported_as_expired() {
        let service = JwtTokenService::new(JwtConfig {
            lifetime: TimeDelta::hours(-2),
            ..config("test-secret", "yatube")
        });

        let token = service.generate_token(1, "auth").unwrap();
        assert!(matches!(
            service.validate_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_default_lifetime_is_two_weeks() {
        let service = JwtTokenService::new(JwtConfig::default());
        assert_eq!(service.expiration_seconds(), 14 * 24 * 3600);
    }
}
