//! Bearer token verification.
//!
//! DeviceGate consumes tokens issued by an external identity provider; it
//! never mints them. Verification covers signature, expiry (with configured
//! leeway), issuer, and audience.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use devicegate_core::config::AuthConfig;
use devicegate_core::error::AppError;

/// Claims extracted from an identity-provider access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the opaque account identifier.
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Display name, if the provider includes one.
    #[serde(default)]
    pub name: Option<String>,
}

/// Validates identity-provider bearer tokens.
#[derive(Clone)]
pub struct IdentityVerifier {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for IdentityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl IdentityVerifier {
    /// Creates a new verifier from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a bearer token, returning its claims.
    ///
    /// The subject claim must be non-empty: it becomes the account identifier
    /// every session operation is scoped to.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::unauthorized("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::unauthorized("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::unauthorized("Invalid token signature")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                        AppError::unauthorized("Invalid token issuer")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                        AppError::unauthorized("Invalid token audience")
                    }
                    _ => AppError::unauthorized(format!("Token validation failed: {e}")),
                }
            })?;

        if token_data.claims.sub.is_empty() {
            return Err(AppError::unauthorized("Token has an empty subject"));
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicegate_core::error::ErrorKind;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            issuer: "https://identity.test/".to_string(),
            audience: "devicegate-api".to_string(),
            leeway_seconds: 5,
        }
    }

    fn mint(config: &AuthConfig, sub: &str, exp_offset: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            exp: chrono::Utc::now().timestamp() + exp_offset,
            name: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let config = test_config();
        let verifier = IdentityVerifier::new(&config);
        let token = mint(&config, "auth0|user1", 3600);

        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, "auth0|user1");
    }

    #[test]
    fn test_verify_expired_token() {
        let config = test_config();
        let verifier = IdentityVerifier::new(&config);
        let token = mint(&config, "auth0|user1", -3600);

        let err = verifier.verify(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn test_verify_wrong_secret() {
        let config = test_config();
        let verifier = IdentityVerifier::new(&config);

        let mut other = test_config();
        other.jwt_secret = "other-secret".to_string();
        let token = mint(&other, "auth0|user1", 3600);

        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_verify_garbage() {
        let verifier = IdentityVerifier::new(&test_config());
        assert!(verifier.verify("not-a-jwt").is_err());
    }
}
