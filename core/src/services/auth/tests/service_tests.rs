//! Unit tests for authentication service

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::token::{OneTimePurpose, OneTimeToken, TokenFamily};
use crate::domain::entities::user::{Tenant, TenantPlan, TenantStatus, User, UserRole, UserStatus};
use crate::errors::{AuthError, DomainError, StoreError, TokenError};
use crate::repositories::{
    MockSessionStore, MockTenantDirectory, MockUserDirectory, SessionStore,
};
use crate::services::auth::{AuthService, AuthServiceConfig};
use crate::services::email::MockEmailDispatcher;
use crate::services::token::{TokenService, TokenServiceConfig};

/// Session store whose every operation fails, for fail-closed tests
struct DownSessionStore;

#[async_trait]
impl SessionStore for DownSessionStore {
    async fn put_family(&self, _family: &TokenFamily) -> Result<(), StoreError> {
        Err(StoreError::unavailable("down"))
    }

    async fn get_family(&self, _family_id: Uuid) -> Result<Option<TokenFamily>, StoreError> {
        Err(StoreError::unavailable("down"))
    }

    async fn drop_family(&self, _family_id: Uuid) -> Result<bool, StoreError> {
        Err(StoreError::unavailable("down"))
    }

    async fn drop_all_families(&self, _subject_id: Uuid) -> Result<usize, StoreError> {
        Err(StoreError::unavailable("down"))
    }

    async fn mark_revoked(&self, _subject_id: Uuid, _at: DateTime<Utc>) -> Result<(), StoreError> {
        Err(StoreError::unavailable("down"))
    }

    async fn is_revoked_since(&self, _subject_id: Uuid, _issued_at: i64) -> Result<bool, StoreError> {
        Err(StoreError::unavailable("down"))
    }

    async fn put_one_time(
        &self,
        _token: &str,
        _payload: &OneTimeToken,
        _ttl: Duration,
    ) -> Result<(), StoreError> {
        Err(StoreError::unavailable("down"))
    }

    async fn take_one_time(&self, _token: &str) -> Result<Option<OneTimeToken>, StoreError> {
        Err(StoreError::unavailable("down"))
    }
}

struct Harness {
    service: AuthService<MockSessionStore, MockUserDirectory, MockTenantDirectory, MockEmailDispatcher>,
    store: MockSessionStore,
    users: MockUserDirectory,
    tenants: MockTenantDirectory,
    emails: MockEmailDispatcher,
    tokens: Arc<TokenService>,
    user: User,
}

async fn setup() -> Harness {
    let store = MockSessionStore::new();
    let users = MockUserDirectory::new();
    let tenants = MockTenantDirectory::new();
    let emails = MockEmailDispatcher::new();
    let tokens = Arc::new(TokenService::new(TokenServiceConfig::new(
        "access-secret-for-tests".to_string(),
        "refresh-secret-for-tests".to_string(),
    )));

    let user = User::new("alice@example.com".to_string(), UserRole::Student, None);
    users.add_user(user.clone(), "Correct-Horse-9").await;

    let service = AuthService::new(
        Arc::new(store.clone()),
        Arc::new(users.clone()),
        Arc::new(tenants.clone()),
        Arc::new(emails.clone()),
        tokens.clone(),
        AuthServiceConfig::default(),
    );

    Harness {
        service,
        store,
        users,
        tenants,
        emails,
        tokens,
        user,
    }
}

fn assert_token_err(result: Result<impl std::fmt::Debug, DomainError>, expected: TokenError) {
    match result {
        Err(DomainError::Token(e)) => assert_eq!(e, expected),
        other => panic!("expected {expected:?}, got {other:?}"),
    }
}

fn assert_auth_err(result: Result<impl std::fmt::Debug, DomainError>, expected: AuthError) {
    match result {
        Err(DomainError::Auth(e)) => assert_eq!(e, expected),
        other => panic!("expected {expected:?}, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_issues_working_pair_and_one_family() {
    let h = setup().await;

    let session = h
        .service
        .login("alice@example.com", "Correct-Horse-9")
        .await
        .unwrap();

    assert_eq!(session.user.id, h.user.id);
    assert_eq!(h.store.family_count(h.user.id).await, 1);

    // Both halves of the pair verify against their own secret and type.
    let access = h.tokens.verify_access(&session.tokens.access_token).unwrap();
    assert_eq!(access.user_id().unwrap(), h.user.id);
    let refresh = h.tokens.verify_refresh(&session.tokens.refresh_token).unwrap();
    assert!(refresh.family_id().is_some());
    assert!(refresh.rtv.is_some());
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let h = setup().await;

    let result = h.service.login("alice@example.com", "wrong").await;
    assert_auth_err(result, AuthError::AuthenticationFailed);

    let result = h.service.login("nobody@example.com", "Correct-Horse-9").await;
    assert_auth_err(result, AuthError::AuthenticationFailed);

    assert_eq!(h.store.family_count(h.user.id).await, 0);
}

#[tokio::test]
async fn test_login_rejects_suspended_user() {
    let h = setup().await;

    let mut user = h.user.clone();
    user.status = UserStatus::Suspended;
    h.users.update_user(user).await;

    let result = h.service.login("alice@example.com", "Correct-Horse-9").await;
    assert_auth_err(result, AuthError::UserInvalid);
}

#[tokio::test]
async fn test_login_rejects_suspended_tenant() {
    let h = setup().await;

    let mut tenant = Tenant::new(TenantPlan::Standard, 25);
    tenant.status = TenantStatus::Suspended;
    h.tenants.add_tenant(tenant.clone()).await;

    let mut user = h.user.clone();
    user.tenant_id = Some(tenant.id);
    h.users.update_user(user).await;

    let result = h.service.login("alice@example.com", "Correct-Horse-9").await;
    assert_auth_err(result, AuthError::UserInvalid);
}

#[tokio::test]
async fn test_login_verified_requires_known_email() {
    let h = setup().await;

    let session = h
        .service
        .login_verified("alice@example.com", "provider-123")
        .await
        .unwrap();
    assert_eq!(session.user.id, h.user.id);

    let result = h.service.login_verified("ghost@example.com", "provider-123").await;
    assert_auth_err(result, AuthError::UserInvalid);
}

#[tokio::test]
async fn test_refresh_rotates_within_the_same_family() {
    let h = setup().await;

    let session = h
        .service
        .login("alice@example.com", "Correct-Horse-9")
        .await
        .unwrap();
    let first_refresh = session.tokens.refresh_token.clone();
    let first_family = h.tokens.verify_refresh(&first_refresh).unwrap().family_id();

    let rotated = h.service.refresh(&first_refresh).await.unwrap();

    // Same family, different rotation value, still exactly one live family.
    let second = h.tokens.verify_refresh(&rotated.tokens.refresh_token).unwrap();
    assert_eq!(second.family_id(), first_family);
    assert_ne!(rotated.tokens.refresh_token, first_refresh);
    assert_eq!(h.store.family_count(h.user.id).await, 1);

    // The new token is usable; at most one value per family is live.
    h.service.refresh(&rotated.tokens.refresh_token).await.unwrap();
}

#[tokio::test]
async fn test_superseded_refresh_token_triggers_reuse_cascade() {
    let h = setup().await;

    let session = h
        .service
        .login("alice@example.com", "Correct-Horse-9")
        .await
        .unwrap();
    // A second device, to prove the cascade crosses family boundaries.
    let other_session = h
        .service
        .login("alice@example.com", "Correct-Horse-9")
        .await
        .unwrap();
    assert_eq!(h.store.family_count(h.user.id).await, 2);

    let stolen = session.tokens.refresh_token.clone();
    let rotated = h.service.refresh(&stolen).await.unwrap();

    // The attacker (or victim, order is indistinguishable) replays the
    // superseded token.
    let result = h.service.refresh(&stolen).await;
    assert_token_err(result, TokenError::TokenReuse);

    // Every family is gone, including the other device's.
    assert_eq!(h.store.family_count(h.user.id).await, 0);
    let result = h.service.refresh(&rotated.tokens.refresh_token).await;
    assert_token_err(result, TokenError::InvalidRefreshToken);
    let result = h.service.refresh(&other_session.tokens.refresh_token).await;
    assert_token_err(result, TokenError::InvalidRefreshToken);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let h = setup().await;
    let access = h.tokens.issue_access(&h.user).unwrap();

    let result = h.service.refresh(&access).await;
    assert_token_err(result, TokenError::InvalidRefreshToken);
}

#[tokio::test]
async fn test_refresh_rejects_garbage() {
    let h = setup().await;

    let result = h.service.refresh("not-a-jwt").await;
    assert_token_err(result, TokenError::InvalidRefreshToken);
}

#[tokio::test]
async fn test_refresh_rejects_deleted_subject() {
    let h = setup().await;

    let session = h
        .service
        .login("alice@example.com", "Correct-Horse-9")
        .await
        .unwrap();

    let mut user = h.user.clone();
    user.status = UserStatus::Deleted;
    h.users.update_user(user).await;

    let result = h.service.refresh(&session.tokens.refresh_token).await;
    assert_auth_err(result, AuthError::UserInvalid);
}

#[tokio::test]
async fn test_authenticate_accepts_live_access_token() {
    let h = setup().await;

    let session = h
        .service
        .login("alice@example.com", "Correct-Horse-9")
        .await
        .unwrap();

    let claims = h.service.authenticate(&session.tokens.access_token).await.unwrap();
    assert_eq!(claims.user_id().unwrap(), h.user.id);
}

#[tokio::test]
async fn test_authenticate_rejects_after_logout_all() {
    let h = setup().await;

    let session = h
        .service
        .login("alice@example.com", "Correct-Horse-9")
        .await
        .unwrap();

    // The revocation marker has second granularity; tokens issued in the
    // same second as the marker survive it, so put a second between them.
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let dropped = h.service.logout_all(h.user.id).await.unwrap();
    assert_eq!(dropped, 1);

    let result = h.service.authenticate(&session.tokens.access_token).await;
    assert_token_err(result, TokenError::TokenRevoked);

    // A fresh login works and its tokens are not caught by the old marker.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let session = h
        .service
        .login("alice@example.com", "Correct-Horse-9")
        .await
        .unwrap();
    h.service.authenticate(&session.tokens.access_token).await.unwrap();
}

#[tokio::test]
async fn test_logout_is_best_effort() {
    let h = setup().await;

    let session = h
        .service
        .login("alice@example.com", "Correct-Horse-9")
        .await
        .unwrap();

    h.service.logout(&session.tokens.refresh_token).await.unwrap();
    assert_eq!(h.store.family_count(h.user.id).await, 0);

    let result = h.service.refresh(&session.tokens.refresh_token).await;
    assert_token_err(result, TokenError::InvalidRefreshToken);

    // Garbage and replays are swallowed.
    h.service.logout("not-a-jwt").await.unwrap();
    h.service.logout(&session.tokens.refresh_token).await.unwrap();
}

#[tokio::test]
async fn test_password_reset_round_trip() {
    let h = setup().await;

    h.service.request_password_reset("alice@example.com").await.unwrap();

    let sent = h.emails.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "alice@example.com");

    let token = sent[0]
        .1
        .split("token=")
        .nth(1)
        .expect("url carries a token")
        .to_string();

    let subject = h
        .service
        .consume_one_time(&token, OneTimePurpose::PasswordReset)
        .await
        .unwrap();
    assert_eq!(subject, h.user.id);

    // Second consumption fails; the token is gone.
    let result = h
        .service
        .consume_one_time(&token, OneTimePurpose::PasswordReset)
        .await;
    assert_token_err(result, TokenError::InvalidTokenFormat);
}

#[tokio::test]
async fn test_password_reset_hides_unknown_emails() {
    let h = setup().await;

    h.service.request_password_reset("ghost@example.com").await.unwrap();
    assert!(h.emails.sent().await.is_empty());
}

#[tokio::test]
async fn test_one_time_purpose_mismatch_consumes_the_token() {
    let h = setup().await;

    h.service.request_email_verification(h.user.id).await.unwrap();
    let sent = h.emails.sent().await;
    let token = sent[0]
        .1
        .split("token=")
        .nth(1)
        .expect("url carries a token")
        .to_string();

    let result = h
        .service
        .consume_one_time(&token, OneTimePurpose::PasswordReset)
        .await;
    assert_token_err(result, TokenError::WrongTokenType);

    // Burned by the mismatch; the right purpose no longer helps.
    let result = h
        .service
        .consume_one_time(&token, OneTimePurpose::EmailVerification)
        .await;
    assert_token_err(result, TokenError::InvalidTokenFormat);
}

#[tokio::test]
async fn test_refresh_fails_closed_when_store_is_down() {
    let store = MockSessionStore::new();
    let users = MockUserDirectory::new();
    let tokens = Arc::new(TokenService::new(TokenServiceConfig::new(
        "access-secret-for-tests".to_string(),
        "refresh-secret-for-tests".to_string(),
    )));
    let user = User::new("alice@example.com".to_string(), UserRole::Student, None);
    users.add_user(user.clone(), "Correct-Horse-9").await;

    // Open a real session, then swap in a store that answers nothing.
    let healthy = AuthService::new(
        Arc::new(store),
        Arc::new(users.clone()),
        Arc::new(MockTenantDirectory::new()),
        Arc::new(MockEmailDispatcher::new()),
        tokens.clone(),
        AuthServiceConfig::default(),
    );
    let session = healthy
        .login("alice@example.com", "Correct-Horse-9")
        .await
        .unwrap();

    let degraded = AuthService::new(
        Arc::new(DownSessionStore),
        Arc::new(users),
        Arc::new(MockTenantDirectory::new()),
        Arc::new(MockEmailDispatcher::new()),
        tokens,
        AuthServiceConfig::default(),
    );

    let result = degraded.refresh(&session.tokens.refresh_token).await;
    assert_token_err(result, TokenError::InvalidRefreshToken);

    let result = degraded.authenticate(&session.tokens.access_token).await;
    assert!(matches!(result, Err(DomainError::Store(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_interleavings_leave_at_most_one_live_value_per_family() {
    let h = setup().await;
    let service = Arc::new(h.service);

    // Two devices; the first gets hammered with concurrent refreshes while
    // the second is logged out and a logout-all races all of it.
    let first = service
        .login("alice@example.com", "Correct-Horse-9")
        .await
        .unwrap();
    let second = service
        .login("alice@example.com", "Correct-Horse-9")
        .await
        .unwrap();

    let minted = Arc::new(tokio::sync::Mutex::new(vec![
        first.tokens.refresh_token.clone(),
        second.tokens.refresh_token.clone(),
    ]));

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let service = service.clone();
        let minted = minted.clone();
        let presented = first.tokens.refresh_token.clone();
        tasks.push(tokio::spawn(async move {
            if let Ok(session) = service.refresh(&presented).await {
                minted.lock().await.push(session.tokens.refresh_token);
            }
        }));
    }
    {
        let service = service.clone();
        let presented = second.tokens.refresh_token.clone();
        tasks.push(tokio::spawn(async move {
            let _ = service.logout(&presented).await;
        }));
    }
    {
        let service = service.clone();
        let subject = h.user.id;
        tasks.push(tokio::spawn(async move {
            let _ = service.logout_all(subject).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Whatever interleaving won, no family may end up with more than one
    // of the tokens ever handed out still matching its stored value.
    let minted = minted.lock().await.clone();
    let mut live_per_family: HashMap<Uuid, usize> = HashMap::new();
    for token in &minted {
        let Ok(claims) = h.tokens.verify_refresh(token) else {
            continue;
        };
        let (Some(family_id), Some(value)) = (claims.family_id(), claims.rtv.as_deref()) else {
            continue;
        };
        let Some(family) = h.store.get_family(family_id).await.unwrap() else {
            continue;
        };
        if family.matches(&TokenService::hash_value(value)) {
            *live_per_family.entry(family_id).or_insert(0) += 1;
        }
    }
    for (family_id, live) in live_per_family {
        assert!(live <= 1, "family {family_id} holds {live} live values");
    }
}
