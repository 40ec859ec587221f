use actix_web::{HttpMessage, HttpResponse, dev::ServiceRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    env_config::JwtConfig,
    error::{AppError, Res},
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub plan_id: String,
    pub iat: usize,
    pub exp: usize,
}

pub struct ClaimsSpec {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub plan_id: String,
}

/// Outcome of checking a session token. Bad tokens are an expected
/// occurrence, so they are reported here instead of as an error.
#[derive(Debug, Clone)]
pub struct Verification {
    pub valid: bool,
    pub payload: Option<SessionClaims>,
}

impl Verification {
    fn invalid() -> Self {
        Verification {
            valid: false,
            payload: None,
        }
    }
}

/// Mints and validates signed session tokens. Holds no state besides the key.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        Self::with_ttl(&config.secret, Duration::hours(config.expiration_hours))
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        TokenIssuer {
            secret: secret.to_string(),
            ttl,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Generates a signed token for the given identity.
    pub fn issue(&self, spec: ClaimsSpec) -> Res<String> {
        if !self.is_configured() {
            return Err(AppError::Configuration(
                "JWT_SECRET is not set, cannot sign session tokens".to_string(),
            ));
        }

        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Configuration("session lifetime out of range".to_string()))?;

        let claims = SessionClaims {
            user_id: spec.user_id,
            email: spec.email,
            display_name: spec.display_name,
            plan_id: spec.plan_id,
            iat: now.timestamp().max(0) as usize,
            exp: expiration.timestamp().max(0) as usize,
        };

        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(AppError::from)
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> Verification {
        if !self.is_configured() {
            return Verification::invalid();
        }

        let mut validation = Validation::default();
        validation.leeway = 0;

        match jsonwebtoken::decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(data) => Verification {
                valid: true,
                payload: Some(data.claims),
            },
            Err(error) => {
                log::debug!("Rejected session token: {}", error);
                Verification::invalid()
            }
        }
    }
}

pub fn get_session_claims_or_error(req: &ServiceRequest) -> Result<SessionClaims, HttpResponse> {
    match req.extensions().get::<Verification>() {
        Some(Verification {
            valid: true,
            payload: Some(claims),
        }) => Ok(claims.clone()),
        Some(_) => {
            Err(AppError::Unauthorized("Invalid or expired token".to_string()).to_http_response())
        }
        None => Err(
            AppError::Unauthorized("No authorization token provided".to_string())
                .to_http_response(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ClaimsSpec {
        ClaimsSpec {
            user_id: Uuid::new_v4(),
            email: "ana@x.com".to_string(),
            display_name: "Ana".to_string(),
            plan_id: "free".to_string(),
        }
    }

    #[test]
    fn issued_token_verifies_with_same_claims() {
        let issuer = TokenIssuer::with_ttl("s3cret", Duration::hours(24));
        let spec = spec();
        let user_id = spec.user_id;

        let token = issuer.issue(spec).unwrap();
        let verification = issuer.verify(&token);

        assert!(verification.valid);
        let claims = verification.payload.unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.email, "ana@x.com");
        assert_eq!(claims.display_name, "Ana");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn claims_serialize_in_camel_case() {
        let issuer = TokenIssuer::with_ttl("s3cret", Duration::hours(1));
        let token = issuer.issue(spec()).unwrap();
        let claims = issuer.verify(&token).payload.unwrap();
        let json = serde_json::to_value(&claims).unwrap();

        for key in ["userId", "email", "displayName", "planId", "iat", "exp"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn tampered_token_is_invalid() {
        let issuer = TokenIssuer::with_ttl("s3cret", Duration::hours(1));
        let token = issuer.issue(spec()).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[2] = parts[2].chars().rev().collect();
        let tampered = parts.join(".");

        let verification = issuer.verify(&tampered);
        assert!(!verification.valid);
        assert!(verification.payload.is_none());
    }

    #[test]
    fn token_from_other_secret_is_invalid() {
        let token = TokenIssuer::with_ttl("one", Duration::hours(1))
            .issue(spec())
            .unwrap();
        assert!(!TokenIssuer::with_ttl("two", Duration::hours(1)).verify(&token).valid);
    }

    #[test]
    fn expired_token_is_invalid() {
        let issuer = TokenIssuer::with_ttl("s3cret", Duration::hours(-1));
        let token = issuer.issue(spec()).unwrap();
        assert!(!issuer.verify(&token).valid);
    }

    #[test]
    fn malformed_token_is_invalid() {
        let issuer = TokenIssuer::with_ttl("s3cret", Duration::hours(1));
        assert!(!issuer.verify("not-a-jwt").valid);
        assert!(!issuer.verify("").valid);
    }

    #[test]
    fn missing_secret_is_a_configuration_error() {
        let issuer = TokenIssuer::with_ttl("", Duration::hours(1));
        assert!(matches!(
            issuer.issue(spec()),
            Err(AppError::Configuration(_))
        ));
        assert!(!issuer.verify("a.b.c").valid);
    }
}
