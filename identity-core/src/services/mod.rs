//! Services layer: storage backends, token issuance, reset codes, code
//! delivery, audit emission and the flow engine composing them.

pub mod audit;
pub mod database;
pub mod delivery;
pub mod engine;
pub mod jwt;
pub mod memory;
pub mod reset;
pub mod store;
pub mod token;

pub use audit::{AuditSink, MemoryAuditSink, TracingAuditSink};
pub use database::{connect_pool, Database};
pub use delivery::{CodeChannel, CodeSender, MockCodeSender, SmtpCodeSender};
pub use engine::{
    AuthEngine, LoginOutcome, LogoutScope, ProfileView, RegisterRequest, RegistrationOutcome,
    RequestContext,
};
pub use jwt::{AccessTokenClaims, JwtSigner};
pub use memory::MemoryStore;
pub use reset::ResetCodeService;
pub use store::{CredentialStore, RefreshTokenStore, ResetCodeRepo};
pub use token::{TokenIssuer, TokenPair};
