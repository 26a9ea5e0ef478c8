mod common;

use common::{ctx, harness, register_request};
use identity_core::models::RefreshToken;
use identity_core::services::RefreshTokenStore;
use identity_core::{AuthError, LogoutScope};

#[tokio::test]
async fn rotation_consumes_the_presented_token() {
    let h = harness();

    h.engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();
    let login = h.engine.login("a@x.com", "Secr3t!@", &ctx()).await.unwrap();

    let rotated = h
        .engine
        .refresh(&login.tokens.refresh_token, &ctx())
        .await
        .expect("first rotation failed");
    assert_ne!(rotated.refresh_token, login.tokens.refresh_token);
    assert_eq!(rotated.token_type, "Bearer");

    // The old value is single-use: a second rotation with it must fail.
    let replayed = h.engine.refresh(&login.tokens.refresh_token, &ctx()).await;
    assert!(matches!(replayed, Err(AuthError::InvalidOrExpiredToken)));

    // The fresh value still works.
    h.engine
        .refresh(&rotated.refresh_token, &ctx())
        .await
        .expect("rotation of the fresh token failed");
}

#[tokio::test]
async fn unknown_refresh_token_is_rejected() {
    let h = harness();

    let outcome = h.engine.refresh("completely-unknown", &ctx()).await;
    assert!(matches!(outcome, Err(AuthError::InvalidOrExpiredToken)));
}

#[tokio::test]
async fn expired_refresh_token_is_rejected_even_if_stored() {
    let h = harness();

    let registered = h
        .engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();

    let stale_value = "stale-token-value";
    let stale = RefreshToken::new(registered.identity.id, stale_value, -1);
    h.store.insert(&stale).await.unwrap();

    let outcome = h.engine.refresh(stale_value, &ctx()).await;
    assert!(matches!(outcome, Err(AuthError::InvalidOrExpiredToken)));
}

#[tokio::test]
async fn global_logout_spares_other_identities() {
    let h = harness();

    let first = h
        .engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();
    let second = h
        .engine
        .register(register_request("b@x.com", "0611111111"), &ctx())
        .await
        .unwrap();

    // Two devices each.
    for _ in 0..2 {
        h.engine.login("a@x.com", "Secr3t!@", &ctx()).await.unwrap();
        h.engine.login("b@x.com", "Secr3t!@", &ctx()).await.unwrap();
    }
    assert_eq!(h.store.refresh_token_count_for(first.identity.id), 2);
    assert_eq!(h.store.refresh_token_count_for(second.identity.id), 2);

    h.engine
        .logout(LogoutScope::AllDevices(first.identity.id), &ctx())
        .await
        .unwrap();

    assert_eq!(h.store.refresh_token_count_for(first.identity.id), 0);
    assert_eq!(h.store.refresh_token_count_for(second.identity.id), 2);
}

#[tokio::test]
async fn current_device_logout_revokes_only_that_token() {
    let h = harness();

    let registered = h
        .engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();
    let first_device = h.engine.login("a@x.com", "Secr3t!@", &ctx()).await.unwrap();
    let _second_device = h.engine.login("a@x.com", "Secr3t!@", &ctx()).await.unwrap();

    h.engine
        .logout(
            LogoutScope::CurrentDevice(first_device.tokens.refresh_token.clone()),
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(h.store.refresh_token_count_for(registered.identity.id), 1);
    let replayed = h
        .engine
        .refresh(&first_device.tokens.refresh_token, &ctx())
        .await;
    assert!(matches!(replayed, Err(AuthError::InvalidOrExpiredToken)));
}

#[tokio::test]
async fn logout_of_unknown_token_is_a_noop() {
    let h = harness();

    h.engine
        .logout(LogoutScope::CurrentDevice("never-issued".to_string()), &ctx())
        .await
        .expect("revoking an absent token must not error");
}

#[tokio::test]
async fn sweep_deletes_expired_tokens() {
    let h = harness();

    let registered = h
        .engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();

    h.store
        .insert(&RefreshToken::new(registered.identity.id, "stale", -1))
        .await
        .unwrap();
    h.engine.login("a@x.com", "Secr3t!@", &ctx()).await.unwrap();

    let (_codes, tokens) = h.engine.sweep_expired().await.unwrap();
    assert_eq!(tokens, 1);
    assert_eq!(h.store.refresh_token_count_for(registered.identity.id), 1);
}
