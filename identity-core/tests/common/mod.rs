#![allow(dead_code)]

use std::sync::Arc;

use identity_core::config::TokenConfig;
use identity_core::services::{
    AuthEngine, JwtSigner, MemoryAuditSink, MemoryStore, MockCodeSender, ResetCodeService,
    TokenIssuer,
};
use identity_core::{RegisterRequest, RequestContext};

pub const RESET_CODE_VALIDITY_MINUTES: i64 = 15;

pub struct TestHarness {
    pub engine: AuthEngine,
    pub store: Arc<MemoryStore>,
    pub sender: Arc<MockCodeSender>,
    pub audit: Arc<MemoryAuditSink>,
}

/// Engine wired to in-memory stores and a capturing code sender.
pub fn harness() -> TestHarness {
    harness_with_sender(Arc::new(MockCodeSender::new()))
}

/// Same harness, but delivery fails on every send.
pub fn failing_delivery_harness() -> TestHarness {
    harness_with_sender(Arc::new(MockCodeSender::failing()))
}

fn harness_with_sender(sender: Arc<MockCodeSender>) -> TestHarness {
    identity_core::telemetry::try_init("info");

    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(MemoryAuditSink::new());

    let token_config = TokenConfig {
        secret: "integration-test-secret".to_string(),
        access_token_expiry_minutes: 15,
        refresh_token_expiry_days: 30,
    };

    let engine = AuthEngine::new(
        store.clone(),
        ResetCodeService::new(store.clone(), RESET_CODE_VALIDITY_MINUTES),
        TokenIssuer::new(
            JwtSigner::new(&token_config),
            store.clone(),
            store.clone(),
            token_config.refresh_token_expiry_days,
        ),
        sender.clone(),
        audit.clone(),
    );

    TestHarness {
        engine,
        store,
        sender,
        audit,
    }
}

pub fn ctx() -> RequestContext {
    RequestContext {
        ip_address: Some("203.0.113.7".to_string()),
    }
}

pub fn register_request(email: &str, phone: &str) -> RegisterRequest {
    RegisterRequest {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        password: "Secr3t!@".to_string(),
        company_name: "Acme".to_string(),
        company_type: "SARL".to_string(),
        company_sector: "retail".to_string(),
        company_employees_number: Some("10-50".to_string()),
        company_address: None,
        company_city: None,
        company_zipcode: None,
        company_country: "FR".to_string(),
    }
}
