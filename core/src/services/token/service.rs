//! Main token service implementation

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::entities::token::{Claims, TokenType};
use crate::domain::entities::user::User;
use crate::errors::{DomainError, TokenError};

use super::config::TokenServiceConfig;

/// Length of the opaque rotation value embedded in refresh tokens
const ROTATION_VALUE_LEN: usize = 32;

/// Service for issuing and verifying JWT access and refresh tokens
///
/// Purely functional over its secret material: no storage, no clocks beyond
/// claim timestamps. The refresh secret is distinct from the access secret,
/// and the `token_type` claim is checked after signature verification as a
/// second line of defense against cross-use.
pub struct TokenService {
    config: TokenServiceConfig,
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Creates a new token service instance
    pub fn new(config: TokenServiceConfig) -> Self {
        let access_encoding_key = EncodingKey::from_secret(config.access_secret.as_bytes());
        let access_decoding_key = DecodingKey::from_secret(config.access_secret.as_bytes());
        let refresh_encoding_key = EncodingKey::from_secret(config.refresh_secret.as_bytes());
        let refresh_decoding_key = DecodingKey::from_secret(config.refresh_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        Self {
            config,
            access_encoding_key,
            access_decoding_key,
            refresh_encoding_key,
            refresh_decoding_key,
            validation,
        }
    }

    /// Issues an access token for a user
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The signed access token
    /// * `Err(DomainError)` - Token generation failed
    pub fn issue_access(&self, user: &User) -> Result<String, DomainError> {
        let mut claims = Claims::new_access_token(
            user.id,
            user.email.clone(),
            user.role.to_string(),
            user.tenant_id,
        );
        claims.exp = claims.iat + self.config.access_token_expiry_minutes * 60;
        claims.iss = self.config.issuer.clone();
        claims.aud = self.config.audience.clone();

        self.encode_jwt(&claims, &self.access_encoding_key)
    }

    /// Issues a refresh token carrying a family id and an opaque rotation value
    ///
    /// # Arguments
    ///
    /// * `subject_id` - The user's UUID
    /// * `family_id` - Token family the refresh token belongs to
    /// * `value` - Rotation value; the session store keeps only its hash
    pub fn issue_refresh(
        &self,
        subject_id: Uuid,
        family_id: Uuid,
        value: String,
    ) -> Result<String, DomainError> {
        let mut claims = Claims::new_refresh_token(subject_id, family_id, value);
        claims.exp = claims.iat + self.config.refresh_token_expiry_days * 24 * 60 * 60;
        claims.iss = self.config.issuer.clone();
        claims.aud = self.config.audience.clone();

        self.encode_jwt(&claims, &self.refresh_encoding_key)
    }

    /// Verifies an access token and returns its claims
    ///
    /// # Returns
    ///
    /// * `Ok(Claims)` - The decoded claims if valid
    /// * `Err(DomainError)` - `TokenExpired`, `TokenNotYetValid`,
    ///   `InvalidTokenFormat`, or `WrongTokenType`
    pub fn verify_access(&self, token: &str) -> Result<Claims, DomainError> {
        let claims = self.decode_jwt(token, &self.access_decoding_key)?;
        if claims.token_type != TokenType::Access {
            return Err(DomainError::Token(TokenError::WrongTokenType));
        }
        Ok(claims)
    }

    /// Verifies a refresh token and returns its claims
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, DomainError> {
        let claims = self.decode_jwt(token, &self.refresh_decoding_key)?;
        if claims.token_type != TokenType::Refresh {
            return Err(DomainError::Token(TokenError::WrongTokenType));
        }
        Ok(claims)
    }

    /// Generates a fresh random rotation value
    pub fn new_rotation_value() -> String {
        let mut rng = rand::thread_rng();
        (0..ROTATION_VALUE_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..62);
                match idx {
                    0..10 => (b'0' + idx) as char,
                    10..36 => (b'a' + idx - 10) as char,
                    36..62 => (b'A' + idx - 36) as char,
                    _ => unreachable!(),
                }
            })
            .collect()
    }

    /// Hashes a rotation value for storage
    pub fn hash_value(value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Encodes claims into a JWT
    fn encode_jwt(&self, claims: &Claims, key: &EncodingKey) -> Result<String, DomainError> {
        let header = Header::new(Algorithm::HS256);
        encode(&header, claims, key)
            .map_err(|_| DomainError::Token(TokenError::TokenGenerationFailed))
    }

    /// Decodes and validates a JWT, mapping library errors to typed outcomes
    fn decode_jwt(&self, token: &str, key: &DecodingKey) -> Result<Claims, DomainError> {
        let token_data = decode::<Claims>(token, key, &self.validation).map_err(|e| {
            if e.kind() == &jsonwebtoken::errors::ErrorKind::ExpiredSignature {
                DomainError::Token(TokenError::TokenExpired)
            } else if e.kind() == &jsonwebtoken::errors::ErrorKind::ImmatureSignature {
                DomainError::Token(TokenError::TokenNotYetValid)
            } else {
                DomainError::Token(TokenError::InvalidTokenFormat)
            }
        })?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::user::UserRole;

    fn service() -> TokenService {
        TokenService::new(TokenServiceConfig::default())
    }

    fn user() -> User {
        User::new("a@b.com".to_string(), UserRole::Student, None)
    }

    #[test]
    fn test_access_round_trip() {
        let service = service();
        let user = user();

        let token = service.issue_access(&user).unwrap();
        let claims = service.verify_access(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(claims.email.as_deref(), Some("a@b.com"));
        assert_eq!(claims.role.as_deref(), Some("student"));
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_refresh_round_trip() {
        let service = service();
        let subject = Uuid::new_v4();
        let family = Uuid::new_v4();
        let value = TokenService::new_rotation_value();

        let token = service
            .issue_refresh(subject, family, value.clone())
            .unwrap();
        let claims = service.verify_refresh(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), subject);
        assert_eq!(claims.family_id(), Some(family));
        assert_eq!(claims.rtv.as_deref(), Some(value.as_str()));
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn test_cross_verification_rejected() {
        let service = service();
        let user = user();

        let access = service.issue_access(&user).unwrap();
        let refresh = service
            .issue_refresh(user.id, Uuid::new_v4(), "v".to_string())
            .unwrap();

        // Different secrets: each token fails the other verifier's signature
        // check before the type tag is even consulted.
        assert!(matches!(
            service.verify_refresh(&access),
            Err(DomainError::Token(TokenError::InvalidTokenFormat))
        ));
        assert!(matches!(
            service.verify_access(&refresh),
            Err(DomainError::Token(TokenError::InvalidTokenFormat))
        ));
    }

    #[test]
    fn test_type_tag_checked_with_shared_secret() {
        // With identical secrets the signature passes and the type tag is
        // the only remaining defense.
        let config = TokenServiceConfig::new("same-secret", "same-secret");
        let service = TokenService::new(config);
        let user = user();

        let access = service.issue_access(&user).unwrap();
        assert!(matches!(
            service.verify_refresh(&access),
            Err(DomainError::Token(TokenError::WrongTokenType))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut config = TokenServiceConfig::default();
        // Well past the verifier's default leeway.
        config.access_token_expiry_minutes = -5;
        let service = TokenService::new(config);

        let token = service.issue_access(&user()).unwrap();
        assert!(matches!(
            service.verify_access(&token),
            Err(DomainError::Token(TokenError::TokenExpired))
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = service();
        assert!(matches!(
            service.verify_access("not.a.jwt"),
            Err(DomainError::Token(TokenError::InvalidTokenFormat))
        ));
    }

    #[test]
    fn test_rotation_value_properties() {
        let v1 = TokenService::new_rotation_value();
        let v2 = TokenService::new_rotation_value();

        assert_eq!(v1.len(), ROTATION_VALUE_LEN);
        assert!(v1.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(v1, v2);

        assert_eq!(TokenService::hash_value(&v1), TokenService::hash_value(&v1));
        assert_ne!(TokenService::hash_value(&v1), TokenService::hash_value(&v2));
        assert_eq!(TokenService::hash_value(&v1).len(), 64);
    }
}
