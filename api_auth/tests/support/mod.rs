//! Shared fixtures for the api_auth integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use api_auth::{
    dtos::{auth::RegisterRequest, profile::ValidatedProfile},
    services::{
        auth::AuthService,
        bank::BankAccountProvisioner,
        mailer::Mailer,
        password::PasswordHasher,
        profile::ProfileGate,
    },
};
use async_trait::async_trait;
use chrono::Duration;
use common::{
    env_config::AuthConfig,
    error::{AppError, Res},
    jwt::TokenIssuer,
};
use db::{
    models::user::User,
    store::{CredentialStore, InMemoryCredentialStore},
};

pub const SECRET: &str = "test-secret";
pub const PASSWORD: &str = "Secr3t!23";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    Verification,
    PasswordReset,
}

/// Mailer that records every code instead of sending it.
#[derive(Default, Clone)]
pub struct CapturingMailer {
    pub sent: Arc<RwLock<Vec<(String, MailKind, String)>>>,
}

impl CapturingMailer {
    /// Most recent code of `kind` sent to `email`.
    pub fn last_code(&self, email: &str, kind: MailKind) -> Option<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, k, _)| e == email && *k == kind)
            .map(|(_, _, c)| c.clone())
    }

    pub fn count(&self, kind: MailKind) -> usize {
        self.sent
            .read()
            .unwrap()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }
}

impl Mailer for CapturingMailer {
    fn send_verification_code(&self, email: &str, _name: &str, code: &str) -> Res<()> {
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), MailKind::Verification, code.to_string()));
        Ok(())
    }

    fn send_password_reset_code(&self, email: &str, _name: &str, code: &str) -> Res<()> {
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), MailKind::PasswordReset, code.to_string()));
        Ok(())
    }
}

/// Provisioner that counts calls and can be told to fail or to yield
/// before answering.
#[derive(Default)]
pub struct CountingProvisioner {
    calls: AtomicUsize,
    fail: AtomicBool,
    yielding: AtomicBool,
}

impl CountingProvisioner {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_yielding(&self, yielding: bool) {
        self.yielding.store(yielding, Ordering::SeqCst);
    }
}

#[async_trait]
impl BankAccountProvisioner for CountingProvisioner {
    async fn provision(&self, user: &User, _profile: &ValidatedProfile) -> Res<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.yielding.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::ProfileCompletion("provider is down".to_string()));
        }
        Ok(format!("acct_test_{}_{}", user.id.simple(), n))
    }
}

pub struct TestContext {
    pub store: Arc<InMemoryCredentialStore>,
    pub auth: AuthService,
    pub profile: ProfileGate,
    pub mailer: CapturingMailer,
    pub provisioner: Arc<CountingProvisioner>,
    pub issuer: TokenIssuer,
}

/// Fast argon2 settings so tests do not spend seconds hashing.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        argon2_memory_kib: 8,
        argon2_iterations: 1,
        argon2_parallelism: 1,
        ..AuthConfig::default()
    }
}

pub fn context() -> TestContext {
    context_with(test_auth_config())
}

pub fn context_with(config: AuthConfig) -> TestContext {
    let store = Arc::new(InMemoryCredentialStore::new());
    let dyn_store: Arc<dyn CredentialStore> = store.clone();
    let mailer = CapturingMailer::default();
    let provisioner = Arc::new(CountingProvisioner::default());
    let issuer = TokenIssuer::with_ttl(SECRET, Duration::hours(24));

    let auth = AuthService::new(
        dyn_store.clone(),
        issuer.clone(),
        Arc::new(mailer.clone()),
        PasswordHasher::new(&config).unwrap(),
        config,
    );
    let profile = ProfileGate::new(dyn_store, provisioner.clone());

    TestContext {
        store,
        auth,
        profile,
        mailer,
        provisioner,
        issuer,
    }
}

pub fn register_request(name: &str, email: &str) -> RegisterRequest {
    RegisterRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
    }
}

/// Registers and verifies a user, returning the verified record.
pub async fn verified_user(ctx: &TestContext, name: &str, email: &str) -> User {
    ctx.auth.register(register_request(name, email)).await.unwrap();
    let code = ctx.mailer.last_code(email, MailKind::Verification).unwrap();
    ctx.auth.verify_email(email, &code).await.unwrap().user
}

/// A six-digit code that differs from `code`.
pub fn other_code(code: &str) -> String {
    if code == "100000" {
        "100001".to_string()
    } else {
        "100000".to_string()
    }
}
