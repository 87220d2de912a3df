//! Integration tests for registration, login and session checks.
//!
//! Runs against the in-memory store so no database is needed.

use chrono::{Duration, Utc};
use community_hub::{
    ErrorKind,
    auth::{
        AuthError, AuthManager, GoogleIdentity, LoginRequest, PepperedHasher, RegisterRequest,
        TokenCodec, TokenError,
    },
    db::{MemoryStore, UserRepository},
    mail::LogMailer,
};
use std::sync::Arc;

const SECRET: &str = "integration-signing-secret-32-chars-min";

struct Harness {
    auth: AuthManager,
    store: Arc<MemoryStore>,
    mailer: Arc<LogMailer>,
}

fn setup() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(LogMailer::new());
    let auth = AuthManager::new(
        store.clone(),
        PepperedHasher::new("integration-pepper"),
        TokenCodec::new(SECRET).expect("codec"),
        mailer.clone(),
    );
    Harness {
        auth,
        store,
        mailer,
    }
}

fn register_request(name: &str, email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_register_then_login() {
    let h = setup();

    let registered = h
        .auth
        .register(register_request("Ann", "ann@x.com", "pw123"))
        .await
        .expect("register");
    assert_eq!(h.auth.authenticate(Some(&registered.token)).unwrap(), registered.user.id);

    let logged_in = h
        .auth
        .login(LoginRequest {
            email: "ann@x.com".to_string(),
            password: "pw123".to_string(),
        })
        .await
        .expect("login");
    assert_eq!(logged_in.user.id, registered.user.id);
    assert_eq!(h.auth.authenticate(Some(&logged_in.token)).unwrap(), registered.user.id);

    let me = h.auth.current_user(registered.user.id).await.unwrap();
    assert_eq!(me.email, "ann@x.com");
    assert_eq!(me.name, "Ann");
}

#[tokio::test]
async fn test_duplicate_registration_is_conflict() {
    let h = setup();
    h.auth
        .register(register_request("Ann", "ann@x.com", "pw123"))
        .await
        .unwrap();

    let err = h
        .auth
        .register(register_request("Other", "ann@x.com", "different"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailTaken));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.store.list_users().await.unwrap().len(), 1);
    // Only the successful registration is welcomed
    assert_eq!(h.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_concurrent_registration_yields_one_account() {
    let h = setup();

    let (first, second) = tokio::join!(
        h.auth.register(register_request("A", "race@x.com", "pw1")),
        h.auth.register(register_request("B", "race@x.com", "pw2")),
    );

    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);

    let failure = first.err().or(second.err()).expect("one registration fails");
    assert!(matches!(failure, AuthError::EmailTaken));
    assert_eq!(h.store.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let h = setup();
    for request in [
        register_request("", "a@x.com", "pw"),
        register_request("A", "  ", "pw"),
        register_request("A", "a@x.com", ""),
    ] {
        let err = h.auth.register(request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert!(h.store.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_login_failures() {
    let h = setup();
    h.auth
        .register(register_request("Ann", "ann@x.com", "pw123"))
        .await
        .unwrap();

    let unknown = h
        .auth
        .login(LoginRequest {
            email: "nobody@x.com".to_string(),
            password: "pw123".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(unknown.client_message(), "User doesn't exist");
    assert_eq!(unknown.kind(), ErrorKind::Unauthorized);

    let wrong = h
        .auth
        .login(LoginRequest {
            email: "ann@x.com".to_string(),
            password: "pw124".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(wrong.client_message(), "Invalid credentials");
    assert_eq!(wrong.kind(), ErrorKind::Unauthorized);

    let missing = h
        .auth
        .login(LoginRequest {
            email: "ann@x.com".to_string(),
            password: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_google_login_is_find_or_create() {
    let h = setup();
    let identity = GoogleIdentity {
        email: "g@x.com".to_string(),
        name: "Gee".to_string(),
        photo: "https://photos/g.png".to_string(),
    };

    let first = h.auth.google_login(identity.clone()).await.unwrap();
    let second = h.auth.google_login(identity).await.unwrap();
    assert_eq!(first.user.id, second.user.id);
    assert_eq!(first.user.avatar, "https://photos/g.png");
    assert_eq!(h.store.list_users().await.unwrap().len(), 1);

    // The generated password is never handed out, so password login fails
    let err = h
        .auth
        .login(LoginRequest {
            email: "g@x.com".to_string(),
            password: String::from("guess"),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidPassword));
}

#[tokio::test]
async fn test_google_login_links_registered_account() {
    let h = setup();
    let registered = h
        .auth
        .register(register_request("Ann", "ann@x.com", "pw123"))
        .await
        .unwrap();

    let session = h
        .auth
        .google_login(GoogleIdentity {
            email: "ann@x.com".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(session.user.id, registered.user.id);
}

#[tokio::test]
async fn test_google_login_requires_email() {
    let h = setup();
    let err = h
        .auth
        .google_login(GoogleIdentity::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_tokens_from_another_secret_are_rejected() {
    let h = setup();
    let session = h
        .auth
        .register(register_request("Ann", "ann@x.com", "pw123"))
        .await
        .unwrap();

    let foreign = TokenCodec::new("some-other-secret-that-is-also-long")
        .unwrap()
        .issue(session.user.id)
        .unwrap();
    assert!(matches!(
        h.auth.authenticate(Some(&foreign)),
        Err(AuthError::InvalidCredential(TokenError::InvalidSignature))
    ));

    let expired = h
        .auth
        .tokens()
        .issue_at(session.user.id, Utc::now() - Duration::days(7) - Duration::seconds(1))
        .unwrap();
    let err = h.auth.authenticate(Some(&expired)).unwrap_err();
    assert!(matches!(
        err,
        AuthError::InvalidCredential(TokenError::Expired)
    ));
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}
