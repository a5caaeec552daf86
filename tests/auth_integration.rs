use std::sync::Arc;

use chrono::{Duration, Utc};
use session_auth::auth::{
    AuthService, Clock, CredentialStore, InMemoryRefreshTokenStore, ManualClock, Principal,
    RefreshTokenStore, TokenSigner,
};
use session_auth::configuration::JwtSettings;
use session_auth::error::{AppError, AuthError, ConfigError};

pub struct TestApp {
    pub service: AuthService,
    pub store: Arc<InMemoryRefreshTokenStore>,
    pub clock: Arc<ManualClock>,
}

fn jwt_settings() -> JwtSettings {
    JwtSettings {
        issuer: "session-auth-tests".to_string(),
        audience: "catalog-api".to_string(),
        secret: "integration-test-signing-key-of-decent-length".to_string(),
        access_token_minutes: 30,
        refresh_token_days: 7,
    }
}

fn spawn_app_with(principals: Vec<Principal>, store: Arc<InMemoryRefreshTokenStore>) -> TestApp {
    let settings = jwt_settings();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let service = AuthService::new(
        Arc::new(CredentialStore::new(principals)),
        TokenSigner::new(&settings).expect("Failed to build signer"),
        store.clone(),
        settings.refresh_token_lifetime().expect("Invalid refresh lifetime"),
    )
    .with_clock(clock.clone());

    TestApp {
        service,
        store,
        clock,
    }
}

fn spawn_app() -> TestApp {
    spawn_app_with(
        vec![
            Principal::new("alice", "pw1", &["admin"]),
            Principal::new("bob", "pw2", &["viewer"]),
        ],
        Arc::new(InMemoryRefreshTokenStore::new()),
    )
}

fn invalid_refresh() -> AppError {
    AppError::Auth(AuthError::InvalidOrExpiredRefreshToken)
}

// --- Login ---

#[tokio::test]
async fn login_is_case_insensitive_on_username() {
    let app = spawn_app();

    assert!(app.service.login("Alice", "pw1").await.is_ok());
    assert!(app.service.login("alice", "pw1").await.is_ok());
}

#[tokio::test]
async fn login_is_case_sensitive_on_secret() {
    let app = spawn_app();

    let result = app.service.login("alice", "PW1").await;
    assert_eq!(result.unwrap_err(), AppError::Auth(AuthError::InvalidCredentials));
}

#[tokio::test]
async fn login_does_not_reveal_which_field_was_wrong() {
    let app = spawn_app();

    let unknown_user = app.service.login("mallory", "pw1").await.unwrap_err();
    let wrong_secret = app.service.login("alice", "nope").await.unwrap_err();

    assert_eq!(unknown_user, wrong_secret);
    assert_eq!(unknown_user.to_string(), wrong_secret.to_string());
}

#[tokio::test]
async fn login_with_no_principals_always_fails() {
    let app = spawn_app_with(vec![], Arc::new(InMemoryRefreshTokenStore::new()));

    assert!(app.service.login("alice", "pw1").await.is_err());
    assert!(app.store.is_empty().unwrap());
}

#[tokio::test]
async fn access_token_carries_identity_and_roles() {
    let app = spawn_app();
    let now = app.clock.now();

    let pair = app.service.login("ALICE", "pw1").await.unwrap();
    let claims = app
        .service
        .signer()
        .validate_access_token(&pair.access_token)
        .expect("Access token should verify");

    assert_eq!(claims.sub, "alice");
    assert!(claims.has_role("admin"));
    assert!(!claims.has_role("viewer"));
    assert_eq!(claims.aud, "catalog-api");
    assert_eq!(pair.expires_at, now + Duration::minutes(30));
}

#[tokio::test]
async fn access_token_from_another_key_is_rejected() {
    let app = spawn_app();
    let pair = app.service.login("alice", "pw1").await.unwrap();

    let mut other = jwt_settings();
    other.secret = "a-different-deployment-signing-key-value".to_string();
    let other = TokenSigner::new(&other).unwrap();

    assert_eq!(
        other.validate_access_token(&pair.access_token).unwrap_err(),
        AppError::Auth(AuthError::TokenInvalid)
    );
}

// --- Refresh ---

#[tokio::test]
async fn end_to_end_rotation_scenario() {
    let app = spawn_app();

    let (a1, r1, exp1) = {
        let pair = app.service.login("alice", "pw1").await.unwrap();
        (pair.access_token, pair.refresh_token, pair.expires_at)
    };

    app.clock.advance(Duration::seconds(5));
    let second = app.service.refresh(&r1).await.unwrap();
    assert_ne!(second.refresh_token, r1);
    assert_ne!(second.access_token, a1);
    assert_eq!(second.expires_at, exp1 + Duration::seconds(5));

    assert_eq!(app.service.refresh(&r1).await.unwrap_err(), invalid_refresh());

    assert!(app.service.revoke(&second.refresh_token).await.is_ok());
    assert_eq!(
        app.service.refresh(&second.refresh_token).await.unwrap_err(),
        invalid_refresh()
    );
}

#[tokio::test]
async fn consumed_token_never_redeems_again() {
    let app = spawn_app();
    let mut current = app.service.login("bob", "pw2").await.unwrap().refresh_token;
    let mut retired = Vec::new();

    for _ in 0..5 {
        let next = app.service.refresh(&current).await.unwrap().refresh_token;
        retired.push(std::mem::replace(&mut current, next));
    }

    for token in &retired {
        assert_eq!(app.service.refresh(token).await.unwrap_err(), invalid_refresh());
    }
    // Only the latest token of the chain is live
    assert_eq!(app.store.len().unwrap(), 1);
    assert!(app.service.refresh(&current).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_double_submit_yields_one_success() {
    for _ in 0..20 {
        let app = spawn_app();
        let token = app.service.login("alice", "pw1").await.unwrap().refresh_token;

        let first = {
            let service = app.service.clone();
            let token = token.clone();
            tokio::spawn(async move { service.refresh(&token).await })
        };
        let second = {
            let service = app.service.clone();
            let token = token.clone();
            tokio::spawn(async move { service.refresh(&token).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        for result in results.iter().filter(|r| r.is_err()) {
            assert_eq!(result.as_ref().unwrap_err(), &invalid_refresh());
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_redemptions_yield_one_success() {
    let app = spawn_app();
    let token = app.service.login("alice", "pw1").await.unwrap().refresh_token;

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let service = app.service.clone();
            let token = token.clone();
            tokio::spawn(async move { service.refresh(&token).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(app.store.len().unwrap(), 1);
}

#[tokio::test]
async fn refresh_expiry_boundary() {
    let app = spawn_app();
    let now = app.clock.now();

    app.store.store("exactly-now", "alice", now).await.unwrap();
    app.store
        .store("one-micro-before", "alice", now - Duration::microseconds(1))
        .await
        .unwrap();
    app.store
        .store("one-micro-after", "alice", now + Duration::microseconds(1))
        .await
        .unwrap();

    assert_eq!(app.service.refresh("exactly-now").await.unwrap_err(), invalid_refresh());
    assert_eq!(
        app.service.refresh("one-micro-before").await.unwrap_err(),
        invalid_refresh()
    );
    assert!(app.service.refresh("one-micro-after").await.is_ok());
}

#[tokio::test]
async fn unknown_refresh_token_is_rejected() {
    let app = spawn_app();

    assert_eq!(app.service.refresh("not-a-token").await.unwrap_err(), invalid_refresh());
    assert_eq!(app.service.refresh("").await.unwrap_err(), invalid_refresh());
}

#[tokio::test]
async fn refresh_for_vanished_principal_is_a_server_fault() {
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let before = spawn_app_with(vec![Principal::new("alice", "pw1", &["admin"])], store.clone());
    let token = before.service.login("alice", "pw1").await.unwrap().refresh_token;

    // Same token table, credential list changed underneath the session
    let after = spawn_app_with(vec![Principal::new("bob", "pw2", &[])], store);

    assert_eq!(
        after.service.refresh(&token).await.unwrap_err(),
        AppError::Config(ConfigError::PrincipalMissing("alice".to_string()))
    );
}

// --- Revoke ---

#[tokio::test]
async fn revoke_is_idempotent() {
    let app = spawn_app();
    let token = app.service.login("alice", "pw1").await.unwrap().refresh_token;

    assert!(app.service.revoke(&token).await.is_ok());
    assert!(app.service.revoke(&token).await.is_ok());
    assert_eq!(app.service.refresh(&token).await.unwrap_err(), invalid_refresh());
}

#[tokio::test]
async fn revoke_leaves_other_chains_alive() {
    let app = spawn_app();
    let laptop = app.service.login("alice", "pw1").await.unwrap().refresh_token;
    let phone = app.service.login("alice", "pw1").await.unwrap().refresh_token;

    app.service.revoke(&laptop).await.unwrap();

    assert!(app.service.refresh(&laptop).await.is_err());
    assert!(app.service.refresh(&phone).await.is_ok());
}
