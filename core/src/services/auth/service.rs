//! Main authentication service implementation

use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::entities::token::{
    Claims, OneTimePurpose, OneTimeToken, TokenFamily, TokenPair,
};
use crate::domain::entities::user::User;
use crate::domain::value_objects::AuthSession;
use crate::errors::{AuthError, DomainError, DomainResult, TokenError};
use crate::repositories::{SessionStore, TenantDirectory, UserDirectory};
use crate::services::email::EmailDispatcher;
use crate::services::token::TokenService;

use super::config::AuthServiceConfig;

/// Authentication service orchestrating the token rotation protocol
///
/// Owns no state of its own: every mutable record (families, revocation
/// markers, one-time tokens) lives behind the injected `SessionStore`, and
/// the directories are consumed read-only. All store failures on the refresh
/// path fail closed; incorrectly honoring a forged refresh is a security
/// defect, incorrectly rejecting a legitimate one is merely an inconvenience.
pub struct AuthService<S, U, T, E>
where
    S: SessionStore,
    U: UserDirectory,
    T: TenantDirectory,
    E: EmailDispatcher,
{
    /// Session store owning families, revocation markers, one-time tokens
    session_store: Arc<S>,
    /// Read-only user directory
    user_directory: Arc<U>,
    /// Read-only tenant directory
    tenant_directory: Arc<T>,
    /// Downstream email dispatcher for one-time-token URLs
    email_dispatcher: Arc<E>,
    /// Stateless JWT signer/verifier
    token_service: Arc<TokenService>,
    /// Service configuration
    config: AuthServiceConfig,
}

impl<S, U, T, E> AuthService<S, U, T, E>
where
    S: SessionStore,
    U: UserDirectory,
    T: TenantDirectory,
    E: EmailDispatcher,
{
    /// Create a new authentication service
    ///
    /// # Arguments
    ///
    /// * `session_store` - Store for families, markers, and one-time tokens
    /// * `user_directory` - Read-only user lookups and credential checks
    /// * `tenant_directory` - Read-only tenant lookups
    /// * `email_dispatcher` - Delivery seam for one-time-token URLs
    /// * `token_service` - JWT signing and verification
    /// * `config` - Service configuration
    pub fn new(
        session_store: Arc<S>,
        user_directory: Arc<U>,
        tenant_directory: Arc<T>,
        email_dispatcher: Arc<E>,
        token_service: Arc<TokenService>,
        config: AuthServiceConfig,
    ) -> Self {
        Self {
            session_store,
            user_directory,
            tenant_directory,
            email_dispatcher,
            token_service,
            config,
        }
    }

    /// Authenticate with email and password and open a new session
    ///
    /// Creates a fresh token family; the returned refresh token carries the
    /// family's first rotation value.
    ///
    /// # Returns
    ///
    /// * `Ok(AuthSession)` - token pair plus the authenticated user
    /// * `Err(DomainError)` - `AuthenticationFailed` on bad credentials,
    ///   `UserInvalid` if the account or its tenant is not active
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<AuthSession> {
        let user = self
            .user_directory
            .verify_credentials(email, password)
            .await?
            .ok_or(DomainError::Auth(AuthError::AuthenticationFailed))?;

        self.ensure_user_valid(&user).await?;

        info!(user_id = %user.id, "login succeeded");
        self.open_session(user).await
    }

    /// Open a session for an identity already verified by an external
    /// provider (SSO callback)
    ///
    /// The provider protocol is not this core's concern; by the time this is
    /// called the identity is trusted, so the flow is just another login.
    pub async fn login_verified(&self, email: &str, provider_id: &str) -> DomainResult<AuthSession> {
        let user = self
            .user_directory
            .find_by_email(email)
            .await?
            .ok_or(DomainError::Auth(AuthError::UserInvalid))?;

        self.ensure_user_valid(&user).await?;

        info!(user_id = %user.id, provider_id, "external login succeeded");
        self.open_session(user).await
    }

    /// Rotate a refresh token, returning a fresh token pair
    ///
    /// The state machine: verify signature and expiry, load the live family
    /// record, compare the presented rotation value against the current one.
    /// A mismatch is theft evidence, never a benign retry of stale state:
    /// every session of the subject is revoked and the call fails with
    /// `TokenReuse`. On a match the family's value is overwritten and its
    /// TTL reset. Two concurrent calls presenting the same still-current
    /// value are a benign double-submit; last write wins.
    pub async fn refresh(&self, presented: &str) -> DomainResult<AuthSession> {
        // Step 1: signature/expiry, and the claims the rotation needs.
        let claims = self.token_service.verify_refresh(presented).map_err(|e| {
            debug!(error = %e, "refresh token failed verification");
            DomainError::Token(TokenError::InvalidRefreshToken)
        })?;

        let family_id = claims
            .family_id()
            .ok_or(DomainError::Token(TokenError::InvalidRefreshToken))?;
        let subject_id = claims
            .user_id()
            .map_err(|_| DomainError::Token(TokenError::InvalidRefreshToken))?;
        let presented_value = claims
            .rtv
            .as_deref()
            .ok_or(DomainError::Token(TokenError::InvalidRefreshToken))?;

        // Step 2: the live family record. A missing family means it was
        // already revoked or never existed; a store failure fails closed.
        let family = self
            .session_store
            .get_family(family_id)
            .await
            .map_err(|e| {
                warn!(%family_id, error = %e, "session store unreachable during refresh");
                DomainError::Token(TokenError::InvalidRefreshToken)
            })?
            .ok_or(DomainError::Token(TokenError::InvalidRefreshToken))?;

        // Step 3: compare against the current value. The comparison is
        // against the live record, so a superseded value is always caught.
        if !family.matches(&TokenService::hash_value(presented_value)) {
            return Err(self.handle_reuse(&family).await);
        }

        // Step 4: the subject must still be welcome.
        let user = self
            .user_directory
            .find_by_id(subject_id)
            .await?
            .ok_or(DomainError::Auth(AuthError::UserInvalid))?;
        self.ensure_user_valid(&user).await?;

        // Steps 5-6: mint the new pair, then overwrite the family. If the
        // write fails the old value stays canonical and the whole call
        // fails; no partial state is ever observable as success.
        let new_value = TokenService::new_rotation_value();
        let access_token = self.token_service.issue_access(&user)?;
        let refresh_token =
            self.token_service
                .issue_refresh(user.id, family.family_id, new_value.clone())?;

        let mut rotated = family;
        rotated.rotate(TokenService::hash_value(&new_value));
        self.session_store.put_family(&rotated).await?;

        debug!(user_id = %user.id, family_id = %rotated.family_id, "refresh token rotated");
        Ok(AuthSession::new(
            TokenPair::new(access_token, refresh_token),
            user,
        ))
    }

    /// Verify an access token against signature, expiry, and the subject's
    /// revocation marker
    ///
    /// A store failure during the marker check fails closed: better to
    /// reject a legitimate request than to honor a revoked token.
    pub async fn authenticate(&self, access_token: &str) -> DomainResult<Claims> {
        let claims = self.token_service.verify_access(access_token)?;
        let subject_id = claims
            .user_id()
            .map_err(|_| DomainError::Token(TokenError::InvalidTokenFormat))?;

        if self
            .session_store
            .is_revoked_since(subject_id, claims.iat)
            .await?
        {
            return Err(DomainError::Token(TokenError::TokenRevoked));
        }

        Ok(claims)
    }

    /// Close the single session behind a refresh token (best effort)
    ///
    /// An already-invalid token is ignored: the caller clears its cookies
    /// regardless, and there is nothing useful to report to a client that
    /// is leaving anyway.
    pub async fn logout(&self, refresh_token: &str) -> DomainResult<()> {
        if let Ok(claims) = self.token_service.verify_refresh(refresh_token) {
            if let Some(family_id) = claims.family_id() {
                match self.session_store.drop_family(family_id).await {
                    Ok(dropped) => {
                        debug!(%family_id, dropped, "logout dropped family");
                    }
                    Err(e) => {
                        warn!(%family_id, error = %e, "logout could not drop family");
                    }
                }
            }
        }
        Ok(())
    }

    /// Revoke every session of a subject
    ///
    /// Drops all token families (no further refreshes) and writes a fresh
    /// revocation marker (already-issued access tokens die immediately,
    /// without touching them individually). Used for logout-all, password
    /// change, and the reuse-detection cascade.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - number of families dropped
    pub async fn logout_all(&self, subject_id: Uuid) -> DomainResult<usize> {
        let dropped = self.session_store.drop_all_families(subject_id).await?;
        self.session_store
            .mark_revoked(subject_id, Utc::now())
            .await?;

        warn!(%subject_id, dropped, "all sessions revoked for subject");
        Ok(dropped)
    }

    /// Issue a password-reset token and hand its URL to the dispatcher
    ///
    /// Always returns Ok for unknown emails so the endpoint cannot be used
    /// to probe which accounts exist.
    pub async fn request_password_reset(&self, email: &str) -> DomainResult<()> {
        let Some(user) = self.user_directory.find_by_email(email).await? else {
            debug!("password reset requested for unknown email");
            return Ok(());
        };

        let url = self
            .issue_one_time(
                user.id,
                OneTimePurpose::PasswordReset,
                &self.config.password_reset_url,
            )
            .await?;

        if let Err(e) = self.email_dispatcher.send_password_reset(&user.email, &url).await {
            error!(user_id = %user.id, error = %e, "password reset email dispatch failed");
        }
        Ok(())
    }

    /// Issue an email-verification token and hand its URL to the dispatcher
    pub async fn request_email_verification(&self, subject_id: Uuid) -> DomainResult<()> {
        let user = self
            .user_directory
            .find_by_id(subject_id)
            .await?
            .ok_or(DomainError::Auth(AuthError::UserInvalid))?;

        let url = self
            .issue_one_time(
                user.id,
                OneTimePurpose::EmailVerification,
                &self.config.email_verify_url,
            )
            .await?;

        if let Err(e) = self
            .email_dispatcher
            .send_email_verification(&user.email, &url)
            .await
        {
            error!(user_id = %user.id, error = %e, "verification email dispatch failed");
        }
        Ok(())
    }

    /// Consume a one-time token, returning the subject it was issued for
    ///
    /// Consumption is atomic in the store: of two concurrent consumers, at
    /// most one receives the payload. A purpose mismatch consumes the token
    /// and still fails; a reset token must not verify an email.
    pub async fn consume_one_time(
        &self,
        token: &str,
        purpose: OneTimePurpose,
    ) -> DomainResult<Uuid> {
        let payload = self
            .session_store
            .take_one_time(token)
            .await?
            .ok_or(DomainError::Token(TokenError::InvalidTokenFormat))?;

        if payload.purpose != purpose {
            warn!(
                expected = %purpose,
                actual = %payload.purpose,
                subject_id = %payload.subject_id,
                "one-time token presented for the wrong purpose"
            );
            return Err(DomainError::Token(TokenError::WrongTokenType));
        }

        Ok(payload.subject_id)
    }

    /// Revoke everything after a password change
    ///
    /// The marker alone invalidates already-issued access tokens; dropping
    /// the families prevents further refreshes.
    pub async fn on_password_changed(&self, subject_id: Uuid) -> DomainResult<()> {
        self.logout_all(subject_id).await.map(|_| ())
    }

    /// Mint a token family and pair for an already-validated user
    async fn open_session(&self, user: User) -> DomainResult<AuthSession> {
        let value = TokenService::new_rotation_value();
        let family = TokenFamily::new(user.id, TokenService::hash_value(&value));

        let access_token = self.token_service.issue_access(&user)?;
        let refresh_token = self
            .token_service
            .issue_refresh(user.id, family.family_id, value)?;

        self.session_store.put_family(&family).await?;

        Ok(AuthSession::new(
            TokenPair::new(access_token, refresh_token),
            user,
        ))
    }

    /// Reuse cascade: revoke every session of the subject, then report theft
    ///
    /// Store failures during the cascade are logged but do not change the
    /// outcome; the caller is rejected either way.
    async fn handle_reuse(&self, family: &TokenFamily) -> DomainError {
        error!(
            subject_id = %family.subject_id,
            family_id = %family.family_id,
            "refresh token reuse detected, revoking all sessions"
        );

        if let Err(e) = self
            .session_store
            .drop_all_families(family.subject_id)
            .await
        {
            error!(subject_id = %family.subject_id, error = %e, "reuse cascade: dropping families failed");
        }
        if let Err(e) = self
            .session_store
            .mark_revoked(family.subject_id, Utc::now())
            .await
        {
            error!(subject_id = %family.subject_id, error = %e, "reuse cascade: writing revocation marker failed");
        }

        DomainError::Token(TokenError::TokenReuse)
    }

    /// Check account and tenant status before issuing anything
    async fn ensure_user_valid(&self, user: &User) -> DomainResult<()> {
        if !user.is_active() {
            return Err(DomainError::Auth(AuthError::UserInvalid));
        }

        if let Some(tenant_id) = user.tenant_id {
            let tenant = self
                .tenant_directory
                .find_tenant(tenant_id)
                .await?
                .ok_or(DomainError::Auth(AuthError::UserInvalid))?;
            if !tenant.is_active() {
                return Err(DomainError::Auth(AuthError::UserInvalid));
            }
        }

        Ok(())
    }

    /// Store a one-time payload under a fresh random token and build its URL
    async fn issue_one_time(
        &self,
        subject_id: Uuid,
        purpose: OneTimePurpose,
        base_url: &str,
    ) -> DomainResult<String> {
        let token = TokenService::new_rotation_value();
        let payload = OneTimeToken::new(subject_id, purpose);

        self.session_store
            .put_one_time(&token, &payload, self.config.one_time_token_ttl)
            .await?;

        Ok(format!("{base_url}?token={token}"))
    }
}
