mod common;

use common::{ctx, harness, register_request};
use identity_core::models::NewIdentity;
use identity_core::services::CredentialStore;
use identity_core::AuthError;

#[tokio::test]
async fn register_creates_exactly_one_tenant_and_identity() {
    let h = harness();

    let outcome = h
        .engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .expect("registration failed");

    assert_eq!(h.store.tenant_count(), 1);
    assert_eq!(h.store.identity_count(), 1);
    assert_eq!(outcome.identity.email, "a@x.com");
    assert_eq!(outcome.identity.phone, "0600000000");
    assert_eq!(outcome.tenant.name, "Acme");
    assert_eq!(outcome.tenant.country, "FR");
}

#[tokio::test]
async fn duplicate_email_is_rejected_without_orphan_tenant() {
    let h = harness();

    h.engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .expect("first registration failed");

    let second = h
        .engine
        .register(register_request("a@x.com", "0611111111"), &ctx())
        .await;

    assert!(matches!(second, Err(AuthError::DuplicateCredential)));
    // Both-or-neither: the failed registration left no tenant behind.
    assert_eq!(h.store.tenant_count(), 1);
    assert_eq!(h.store.identity_count(), 1);
}

#[tokio::test]
async fn duplicate_phone_is_rejected_too() {
    let h = harness();

    h.engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();

    let second = h
        .engine
        .register(register_request("b@x.com", "0600000000"), &ctx())
        .await;

    assert!(matches!(second, Err(AuthError::DuplicateCredential)));
}

#[tokio::test]
async fn malformed_email_or_phone_fails_validation() {
    let h = harness();

    let bad_email = h
        .engine
        .register(register_request("not-an-email", "0600000000"), &ctx())
        .await;
    assert!(matches!(bad_email, Err(AuthError::Validation(_))));

    let bad_phone = h
        .engine
        .register(register_request("a@x.com", "12345"), &ctx())
        .await;
    assert!(matches!(bad_phone, Err(AuthError::Validation(_))));

    assert_eq!(h.store.tenant_count(), 0);
}

#[tokio::test]
async fn registered_user_can_login_with_case_insensitive_email() {
    let h = harness();

    h.engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();

    let outcome = h
        .engine
        .login("A@X.COM", "Secr3t!@", &ctx())
        .await
        .expect("login failed");

    assert_eq!(outcome.tokens.token_type, "Bearer");
    assert!(!outcome.tokens.access_token.is_empty());
    assert!(!outcome.tokens.refresh_token.is_empty());
    assert_eq!(
        outcome.tenant.as_ref().map(|t| t.name.as_str()),
        Some("Acme")
    );
}

#[tokio::test]
async fn further_identities_can_join_an_existing_tenant() {
    let h = harness();

    let registered = h
        .engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();

    let colleague = NewIdentity {
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: "g@x.com".to_string(),
        phone: "0611111111".to_string(),
        password_hash: "$argon2id$stub".to_string(),
        tenant_id: Some(registered.tenant.id),
        is_superadmin: false,
    };
    let created = h.store.create_identity(colleague.clone()).await.unwrap();
    assert_eq!(created.tenant_id, Some(registered.tenant.id));
    assert_eq!(h.store.tenant_count(), 1);
    assert_eq!(h.store.identity_count(), 2);

    // A dangling tenant reference is a typed failure, not a new tenant.
    let dangling = NewIdentity {
        email: "h@x.com".to_string(),
        phone: "0622222222".to_string(),
        tenant_id: Some(uuid::Uuid::new_v4()),
        ..colleague
    };
    assert!(matches!(
        h.store.create_identity(dangling).await,
        Err(AuthError::TenantMissing)
    ));
}

#[tokio::test]
async fn registration_emits_audit_event() {
    let h = harness();

    h.engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();

    let events = h.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action.as_str(), "user_registered");
    assert_eq!(events[0].ip_address.as_deref(), Some("203.0.113.7"));
    assert!(events[0].tenant_id.is_some());
}
