//! HS256 access token signer.
//!
//! Serializes [`AccessTokenClaims`] into a compact JWT with repeated role
//! and permission claims, signed with a shared secret resolved by the
//! composition root.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scolaris_application::{AccessTokenClaims, AccessTokenSigner};
use scolaris_core::{AppError, AppResult};
use scolaris_domain::UserId;

/// HS256 signer for access tokens.
pub struct JwtAccessTokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtAccessTokenSigner {
    /// Creates a signer from the shared signing secret.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }
}

/// Wire shape of the signed token.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: Uuid,
    email: String,
    jti: Uuid,
    roles: Vec<String>,
    permissions: Vec<String>,
    iat: i64,
    exp: i64,
}

impl AccessTokenSigner for JwtAccessTokenSigner {
    fn sign(&self, claims: &AccessTokenClaims) -> AppResult<String> {
        let wire = WireClaims {
            sub: claims.subject.as_uuid(),
            email: claims.email.clone(),
            jti: claims.token_id,
            roles: claims.roles.clone(),
            permissions: claims.permissions.clone(),
            iat: claims.issued_at.timestamp(),
            exp: claims.expires_at.timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &wire, &self.encoding_key)
            .map_err(|error| AppError::Internal(format!("failed to sign access token: {error}")))
    }

    fn verify(&self, token: &str) -> AppResult<AccessTokenClaims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<WireClaims>(token, &self.decoding_key, &validation)
            .map_err(|error| {
                AppError::Unauthorized(format!("access token rejected: {error}"))
            })?;

        let wire = data.claims;
        Ok(AccessTokenClaims {
            subject: UserId::from_uuid(wire.sub),
            email: wire.email,
            token_id: wire.jti,
            roles: wire.roles,
            permissions: wire.permissions,
            issued_at: timestamp_to_datetime(wire.iat)?,
            expires_at: timestamp_to_datetime(wire.exp)?,
        })
    }
}

fn timestamp_to_datetime(timestamp: i64) -> AppResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| AppError::Internal(format!("invalid token timestamp {timestamp}")))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use scolaris_application::{AccessTokenClaims, AccessTokenSigner};
    use scolaris_domain::UserId;

    use super::JwtAccessTokenSigner;

    fn sample_claims() -> AccessTokenClaims {
        let now = Utc::now();
        AccessTokenClaims {
            subject: UserId::new(),
            email: "mira@example.org".to_owned(),
            token_id: Uuid::new_v4(),
            roles: vec!["Teacher".to_owned()],
            permissions: vec!["students.read".to_owned()],
            issued_at: now,
            expires_at: now + Duration::minutes(30),
        }
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let signer = JwtAccessTokenSigner::new(b"test-secret");
        let claims = sample_claims();

        let token = signer.sign(&claims).unwrap_or_else(|_| panic!("sign"));
        let verified = signer.verify(&token).unwrap_or_else(|_| panic!("verify"));

        assert_eq!(verified.subject, claims.subject);
        assert_eq!(verified.email, claims.email);
        assert_eq!(verified.token_id, claims.token_id);
        assert_eq!(verified.roles, claims.roles);
        assert_eq!(verified.permissions, claims.permissions);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let signer = JwtAccessTokenSigner::new(b"test-secret");
        let token = signer
            .sign(&sample_claims())
            .unwrap_or_else(|_| panic!("sign"));

        let other = JwtAccessTokenSigner::new(b"other-secret");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = JwtAccessTokenSigner::new(b"test-secret");
        let mut claims = sample_claims();
        claims.issued_at = Utc::now() - Duration::hours(2);
        claims.expires_at = Utc::now() - Duration::hours(1);

        let token = signer.sign(&claims).unwrap_or_else(|_| panic!("sign"));
        assert!(signer.verify(&token).is_err());
    }
}
