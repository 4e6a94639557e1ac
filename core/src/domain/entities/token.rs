//! Token entities for JWT-based authentication and refresh-token rotation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access token expiration time (15 minutes)
pub const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;

/// Refresh token expiration time (7 days)
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

/// One-time token expiration time (1 hour)
pub const ONE_TIME_TOKEN_EXPIRY_MINUTES: i64 = 60;

/// JWT issuer
pub const JWT_ISSUER: &str = "coursehub";

/// JWT audience
pub const JWT_AUDIENCE: &str = "coursehub-api";

/// Discriminator carried inside every signed token.
///
/// Access and refresh tokens are signed with different secrets, so one can
/// never verify as the other; the tag is a second, independent line of
/// defense checked after signature verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims structure for JWT payload
///
/// One struct covers both token types; the optional fields are populated
/// according to `token_type`. Access tokens carry the identity fields
/// (`email`, `role`, `tenant_id`), refresh tokens carry the rotation fields
/// (`family_id`, `rtv`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Not before timestamp
    pub nbf: i64,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// JWT ID (unique identifier for the token)
    pub jti: String,

    /// Token type discriminator
    pub token_type: TokenType,

    /// User email (access tokens)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// User role (access tokens)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Tenant the user belongs to, if any (access tokens)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Token family the refresh token belongs to (refresh tokens)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,

    /// Opaque rotation value; the store only ever sees its hash (refresh tokens)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtv: Option<String>,
}

impl Claims {
    /// Creates new claims for an access token
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user's UUID
    /// * `email` - The user's email address
    /// * `role` - The user's role string
    /// * `tenant_id` - Tenant the user belongs to, if any
    pub fn new_access_token(
        user_id: Uuid,
        email: String,
        role: String,
        tenant_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        let expiry = now + Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES);

        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
            nbf: now.timestamp(),
            iss: JWT_ISSUER.to_string(),
            aud: JWT_AUDIENCE.to_string(),
            jti: Uuid::new_v4().to_string(),
            token_type: TokenType::Access,
            email: Some(email),
            role: Some(role),
            tenant_id: tenant_id.map(|t| t.to_string()),
            family_id: None,
            rtv: None,
        }
    }

    /// Creates new claims for a refresh token
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user's UUID
    /// * `family_id` - Token family the refresh token belongs to
    /// * `value` - Opaque rotation value carried in the token
    pub fn new_refresh_token(user_id: Uuid, family_id: Uuid, value: String) -> Self {
        let now = Utc::now();
        let expiry = now + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);

        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
            nbf: now.timestamp(),
            iss: JWT_ISSUER.to_string(),
            aud: JWT_AUDIENCE.to_string(),
            jti: Uuid::new_v4().to_string(),
            token_type: TokenType::Refresh,
            email: None,
            role: None,
            tenant_id: None,
            family_id: Some(family_id.to_string()),
            rtv: Some(value),
        }
    }

    /// Checks if the claims have expired
    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp();
        now >= self.exp
    }

    /// Checks if the claims are valid (not expired and past nbf)
    pub fn is_valid(&self) -> bool {
        let now = Utc::now().timestamp();
        now >= self.nbf && now < self.exp
    }

    /// Gets the user ID from the claims
    ///
    /// # Returns
    ///
    /// `Ok(Uuid)` if the subject can be parsed as a UUID, `Err` otherwise
    pub fn user_id(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sub)
    }

    /// Gets the token family ID from refresh-token claims
    pub fn family_id(&self) -> Option<Uuid> {
        self.family_id
            .as_deref()
            .and_then(|f| Uuid::parse_str(f).ok())
    }

    /// Gets the tenant ID from access-token claims
    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
            .as_deref()
            .and_then(|t| Uuid::parse_str(t).ok())
    }
}

/// Token family record persisted in the session store
///
/// A family is the lineage of refresh tokens descended from one login.
/// The family id is stable across rotations; only the current value hash
/// changes. Exactly one value is valid per family at any time, which is
/// what makes presentation of a superseded value detectable as theft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFamily {
    /// Stable identifier that survives rotation
    pub family_id: Uuid,

    /// Subject this family belongs to
    pub subject_id: Uuid,

    /// SHA-256 hex of the currently valid rotation value
    pub current_value_hash: String,

    /// Timestamp when the family was created (login time)
    pub issued_at: DateTime<Utc>,

    /// Timestamp of the most recent rotation
    pub last_rotated_at: DateTime<Utc>,
}

impl TokenFamily {
    /// Creates a new token family at login time
    pub fn new(subject_id: Uuid, value_hash: String) -> Self {
        let now = Utc::now();
        Self {
            family_id: Uuid::new_v4(),
            subject_id,
            current_value_hash: value_hash,
            issued_at: now,
            last_rotated_at: now,
        }
    }

    /// Replaces the current value hash, keeping the family id
    pub fn rotate(&mut self, value_hash: String) {
        self.current_value_hash = value_hash;
        self.last_rotated_at = Utc::now();
    }

    /// Checks whether a presented value hash matches the current one
    pub fn matches(&self, value_hash: &str) -> bool {
        self.current_value_hash == value_hash
    }
}

/// Purpose of a one-time token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OneTimePurpose {
    PasswordReset,
    EmailVerification,
}

impl std::fmt::Display for OneTimePurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OneTimePurpose::PasswordReset => write!(f, "password_reset"),
            OneTimePurpose::EmailVerification => write!(f, "email_verification"),
        }
    }
}

/// Payload stored behind a one-time token (password reset, email verification)
///
/// Single retrieval: the store deletes the entry in the same operation that
/// reads it, so two concurrent consumers can never both succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimeToken {
    /// Subject the token was issued for
    pub subject_id: Uuid,

    /// What the token may be used for
    pub purpose: OneTimePurpose,

    /// Timestamp when the token was issued
    pub issued_at: DateTime<Utc>,
}

impl OneTimeToken {
    /// Creates a new one-time payload for a subject and purpose
    pub fn new(subject_id: Uuid, purpose: OneTimePurpose) -> Self {
        Self {
            subject_id,
            purpose,
            issued_at: Utc::now(),
        }
    }
}

/// Token pair returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// JWT access token
    pub access_token: String,

    /// JWT refresh token
    pub refresh_token: String,

    /// Access token expiry time in seconds
    pub access_expires_in: i64,

    /// Refresh token expiry time in seconds
    pub refresh_expires_in: i64,
}

impl TokenPair {
    /// Creates a new token pair with the default expiry times
    pub fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            access_expires_in: ACCESS_TOKEN_EXPIRY_MINUTES * 60,
            refresh_expires_in: REFRESH_TOKEN_EXPIRY_DAYS * 24 * 60 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new_access_token(
            user_id,
            "a@b.com".to_string(),
            "student".to_string(),
            None,
        );

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.iss, JWT_ISSUER);
        assert_eq!(claims.aud, JWT_AUDIENCE);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.email.as_deref(), Some("a@b.com"));
        assert_eq!(claims.role.as_deref(), Some("student"));
        assert!(claims.family_id.is_none());
        assert!(claims.is_valid());
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_refresh_token_claims() {
        let user_id = Uuid::new_v4();
        let family_id = Uuid::new_v4();
        let claims = Claims::new_refresh_token(user_id, family_id, "opaque".to_string());

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.family_id(), Some(family_id));
        assert_eq!(claims.rtv.as_deref(), Some("opaque"));
        assert!(claims.email.is_none());
        assert!(claims.is_valid());
    }

    #[test]
    fn test_claims_user_id_parsing() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new_access_token(
            user_id,
            "a@b.com".to_string(),
            "student".to_string(),
            None,
        );

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_claims_expiration() {
        let user_id = Uuid::new_v4();
        let mut claims = Claims::new_access_token(
            user_id,
            "a@b.com".to_string(),
            "student".to_string(),
            None,
        );

        claims.exp = Utc::now().timestamp() - 1;

        assert!(claims.is_expired());
        assert!(!claims.is_valid());
    }

    #[test]
    fn test_token_type_serialization() {
        let json = serde_json::to_string(&TokenType::Refresh).unwrap();
        assert_eq!(json, "\"refresh\"");
        let parsed: TokenType = serde_json::from_str("\"access\"").unwrap();
        assert_eq!(parsed, TokenType::Access);
    }

    #[test]
    fn test_token_family_rotation_keeps_id() {
        let subject = Uuid::new_v4();
        let mut family = TokenFamily::new(subject, "hash_v1".to_string());
        let family_id = family.family_id;

        assert!(family.matches("hash_v1"));

        family.rotate("hash_v2".to_string());

        assert_eq!(family.family_id, family_id);
        assert!(!family.matches("hash_v1"));
        assert!(family.matches("hash_v2"));
        assert!(family.last_rotated_at >= family.issued_at);
    }

    #[test]
    fn test_one_time_token_payload() {
        let subject = Uuid::new_v4();
        let payload = OneTimeToken::new(subject, OneTimePurpose::PasswordReset);

        assert_eq!(payload.subject_id, subject);
        assert_eq!(payload.purpose, OneTimePurpose::PasswordReset);

        let json = serde_json::to_string(&payload).unwrap();
        let parsed: OneTimeToken = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, parsed);
    }

    #[test]
    fn test_token_pair_creation() {
        let pair = TokenPair::new("access".to_string(), "refresh".to_string());

        assert_eq!(pair.access_expires_in, ACCESS_TOKEN_EXPIRY_MINUTES * 60);
        assert_eq!(
            pair.refresh_expires_in,
            REFRESH_TOKEN_EXPIRY_DAYS * 24 * 60 * 60
        );
    }

    #[test]
    fn test_claims_serialization() {
        let claims = Claims::new_refresh_token(Uuid::new_v4(), Uuid::new_v4(), "v1".to_string());

        let json = serde_json::to_string(&claims).unwrap();
        // Access-only fields must not leak into refresh payloads.
        assert!(!json.contains("email"));
        let deserialized: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(claims, deserialized);
    }
}
