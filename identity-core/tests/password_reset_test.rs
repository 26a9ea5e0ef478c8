mod common;

use chrono::{Duration, Utc};
use common::{ctx, failing_delivery_harness, harness, register_request, RESET_CODE_VALIDITY_MINUTES};
use identity_core::models::ResetCode;
use identity_core::services::{CodeChannel, ResetCodeRepo};
use identity_core::AuthError;

#[tokio::test]
async fn full_reset_flow_rotates_the_password_and_kills_sessions() {
    let h = harness();

    h.engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();
    let login = h.engine.login("a@x.com", "Secr3t!@", &ctx()).await.unwrap();

    h.engine
        .request_password_reset("a@x.com", &ctx())
        .await
        .unwrap();
    let code = h.sender.last_code().expect("no code delivered");
    assert_eq!(code.len(), 8);

    h.engine
        .reset_password("a@x.com", &code, "N3wPass!@", &ctx())
        .await
        .expect("reset failed");

    // Old password dead, new one live.
    assert!(matches!(
        h.engine.login("a@x.com", "Secr3t!@", &ctx()).await,
        Err(AuthError::AuthenticationFailed)
    ));
    h.engine
        .login("a@x.com", "N3wPass!@", &ctx())
        .await
        .expect("login with new password failed");

    // Pre-reset sessions were revoked.
    assert!(matches!(
        h.engine.refresh(&login.tokens.refresh_token, &ctx()).await,
        Err(AuthError::InvalidOrExpiredToken)
    ));
}

#[tokio::test]
async fn a_code_is_accepted_exactly_once() {
    let h = harness();

    h.engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();
    h.engine
        .request_password_reset("a@x.com", &ctx())
        .await
        .unwrap();
    let code = h.sender.last_code().unwrap();

    h.engine
        .reset_password("a@x.com", &code, "N3wPass!@", &ctx())
        .await
        .unwrap();

    let replay = h
        .engine
        .reset_password("a@x.com", &code, "0therPass!@", &ctx())
        .await;
    assert!(matches!(replay, Err(AuthError::InvalidOrExpiredCode)));
}

#[tokio::test]
async fn wrong_code_fails_but_does_not_burn_the_pending_one() {
    let h = harness();

    h.engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();
    h.engine
        .request_password_reset("a@x.com", &ctx())
        .await
        .unwrap();
    let code = h.sender.last_code().unwrap();

    let wrong = if code == "00000000" { "00000001" } else { "00000000" };
    let attempt = h
        .engine
        .reset_password("a@x.com", wrong, "N3wPass!@", &ctx())
        .await;
    assert!(matches!(attempt, Err(AuthError::InvalidOrExpiredCode)));

    // The real code still works after a bad guess.
    h.engine
        .reset_password("a@x.com", &code, "N3wPass!@", &ctx())
        .await
        .expect("correct code rejected after a wrong guess");
}

#[tokio::test]
async fn expired_code_is_rejected_even_when_it_matches() {
    let h = harness();

    h.engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();

    // Plant a matching code issued past the validity window.
    let mut stale = ResetCode::new("a@x.com", ResetCode::hash_code("12345678"));
    stale.issued_utc = Utc::now() - Duration::minutes(RESET_CODE_VALIDITY_MINUTES + 1);
    h.store.upsert(&stale).await.unwrap();

    let attempt = h
        .engine
        .reset_password("a@x.com", "12345678", "N3wPass!@", &ctx())
        .await;
    assert!(matches!(attempt, Err(AuthError::InvalidOrExpiredCode)));

    // The expired row was discarded by the check itself.
    assert!(h.store.find("a@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn a_new_request_overwrites_the_pending_code() {
    let h = harness();

    h.engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();

    h.engine
        .request_password_reset("a@x.com", &ctx())
        .await
        .unwrap();
    let first = h.sender.last_code().unwrap();
    h.engine
        .request_password_reset("a@x.com", &ctx())
        .await
        .unwrap();
    let second = h.sender.last_code().unwrap();

    if first != second {
        // Single-pending-per-credential: the first code is void.
        let stale = h
            .engine
            .reset_password("a@x.com", &first, "N3wPass!@", &ctx())
            .await;
        assert!(matches!(stale, Err(AuthError::InvalidOrExpiredCode)));
    }

    h.engine
        .reset_password("a@x.com", &second, "N3wPass!@", &ctx())
        .await
        .expect("latest code rejected");
}

#[tokio::test]
async fn unknown_credential_reports_success_and_sends_nothing() {
    let h = harness();

    h.engine
        .request_password_reset("ghost@x.com", &ctx())
        .await
        .expect("unknown credential must not error");
    h.engine
        .request_password_reset("%%%", &ctx())
        .await
        .expect("unclassifiable credential must not error");

    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn phone_credential_routes_the_code_over_sms() {
    let h = harness();

    h.engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();
    h.engine
        .request_password_reset("06 00 00 00 00", &ctx())
        .await
        .unwrap();

    let sent = h.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].2, CodeChannel::Sms);

    // Reset completion works with the phone credential too.
    let code = h.sender.last_code().unwrap();
    h.engine
        .reset_password("0600000000", &code, "N3wPass!@", &ctx())
        .await
        .expect("reset via phone credential failed");
}

#[tokio::test]
async fn delivery_failure_is_swallowed() {
    let h = failing_delivery_harness();

    h.engine
        .register(register_request("a@x.com", "0600000000"), &ctx())
        .await
        .unwrap();

    h.engine
        .request_password_reset("a@x.com", &ctx())
        .await
        .expect("a broken sender must not fail the request flow");
}

#[tokio::test]
async fn sweep_removes_stale_codes() {
    let h = harness();

    let mut stale = ResetCode::new("a@x.com", ResetCode::hash_code("12345678"));
    stale.issued_utc = Utc::now() - Duration::minutes(RESET_CODE_VALIDITY_MINUTES + 1);
    h.store.upsert(&stale).await.unwrap();
    h.store
        .upsert(&ResetCode::new("b@x.com", ResetCode::hash_code("87654321")))
        .await
        .unwrap();

    let (codes, _tokens) = h.engine.sweep_expired().await.unwrap();
    assert_eq!(codes, 1);
    assert!(h.store.find("a@x.com").await.unwrap().is_none());
    assert!(h.store.find("b@x.com").await.unwrap().is_some());
}
