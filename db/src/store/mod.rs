//! Credential storage seam shared by the auth flows and the profile gate.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use common::error::Res;
use uuid::Uuid;

use crate::{
    dtos::{
        token::TokenCreateRequest,
        user::{PasswordUpdate, ProfileUpdate, UserCreateRequest},
    },
    models::{
        token::{AuthToken, TokenKind},
        user::{AuthCredentials, User},
    },
};

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Sole owner of user and one-time token records.
///
/// Emails passed in are expected to be normalized already.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Res<Option<User>>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Res<Option<User>>;

    /// User plus password hash, for login.
    async fn find_credentials(&self, email: &str) -> Res<Option<(User, AuthCredentials)>>;

    /// Inserts the user and its credentials together.
    /// Fails with `DuplicateEmail` if the email is taken.
    async fn create_user(&self, data: UserCreateRequest) -> Res<User>;

    async fn update_profile(&self, user_id: Uuid, data: ProfileUpdate) -> Res<User>;

    /// Stores `account_id` unless the user already has a bank account.
    /// Returns the user as stored, so a lost race yields the earlier id.
    async fn claim_bank_account(&self, user_id: Uuid, account_id: &str) -> Res<User>;

    async fn update_last_access(&self, user_id: Uuid) -> Res<User>;

    /// Stores a new code. Older unused codes of the same kind for the
    /// same user are expired in the same step.
    async fn create_token(&self, data: TokenCreateRequest) -> Res<AuthToken>;

    /// Every token of `kind` carrying `code`, newest first, used or not.
    async fn find_tokens(&self, code: &str, kind: TokenKind) -> Res<Vec<AuthToken>>;

    /// Flips `used` from false to true. Returns false if it was already used.
    async fn mark_token_used(&self, token_id: Uuid) -> Res<bool>;

    /// Marks the token used and sets `email_verified` atomically.
    /// Fails with `CodeAlreadyUsed` if the token was consumed concurrently.
    async fn consume_email_verification(&self, token_id: Uuid, user_id: Uuid) -> Res<User>;

    /// Marks the token used and stores the new hash atomically.
    /// Fails with `CodeAlreadyUsed` if the token was consumed concurrently.
    async fn consume_password_reset(&self, token_id: Uuid, update: PasswordUpdate) -> Res<()>;

    /// Removes tokens past their expiry. Returns how many were removed.
    async fn delete_expired_tokens(&self) -> Res<u64>;
}
