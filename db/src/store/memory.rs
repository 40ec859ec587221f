//! In-memory storage implementation, for local runs and tests.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use common::error::{AppError, Res};
use uuid::Uuid;

use super::CredentialStore;
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

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    emails: HashMap<String, Uuid>,
    credentials: HashMap<Uuid, String>,
    tokens: HashMap<Uuid, AuthToken>,
}

impl State {
    fn user_mut(&mut self, user_id: Uuid) -> Res<&mut User> {
        self.users.get_mut(&user_id).ok_or(AppError::UserNotFound)
    }

    fn mark_used(&mut self, token_id: Uuid) -> bool {
        match self.tokens.get_mut(&token_id) {
            Some(token) if !token.used => {
                token.used = true;
                true
            }
            _ => false,
        }
    }
}

/// Every operation holds a single lock, so multi-step writes are atomic.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    state: RwLock<State>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the `active` flag, the way an admin action would.
    pub fn set_active(&self, user_id: Uuid, active: bool) -> Res<()> {
        let mut state = self.write()?;
        let user = state.user_mut(user_id)?;
        user.active = active;
        user.updated_at = Utc::now();
        Ok(())
    }

    /// Number of stored tokens, expired or not.
    pub fn token_count(&self) -> Res<usize> {
        Ok(self.read()?.tokens.len())
    }

    fn read(&self) -> Res<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| AppError::Internal("credential store lock poisoned".to_string()))
    }

    fn write(&self) -> Res<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| AppError::Internal("credential store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> Res<Option<User>> {
        let state = self.read()?;
        Ok(state
            .emails
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Res<Option<User>> {
        Ok(self.read()?.users.get(&user_id).cloned())
    }

    async fn find_credentials(&self, email: &str) -> Res<Option<(User, AuthCredentials)>> {
        let state = self.read()?;
        let Some(user) = state.emails.get(email).and_then(|id| state.users.get(id)) else {
            return Ok(None);
        };
        Ok(state.credentials.get(&user.id).map(|hash| {
            (
                user.clone(),
                AuthCredentials {
                    user_id: user.id,
                    password_hash: hash.clone(),
                },
            )
        }))
    }

    async fn create_user(&self, data: UserCreateRequest) -> Res<User> {
        let mut state = self.write()?;
        if state.emails.contains_key(&data.email) {
            return Err(AppError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            name: data.name,
            plan_id: data.plan_id,
            email_verified: false,
            active: true,
            phone: None,
            tax_id: None,
            monthly_revenue: None,
            address: None,
            neighborhood: None,
            postal_code: None,
            person_type: None,
            profile_complete: false,
            bank_account_id: None,
            created_at: now,
            updated_at: now,
            last_access_at: None,
        };

        state.emails.insert(user.email.clone(), user.id);
        state.credentials.insert(user.id, data.password_hash);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_profile(&self, user_id: Uuid, data: ProfileUpdate) -> Res<User> {
        let mut state = self.write()?;
        let user = state.user_mut(user_id)?;
        user.phone = data.phone;
        user.tax_id = data.tax_id;
        user.monthly_revenue = data.monthly_revenue;
        user.address = data.address;
        user.neighborhood = data.neighborhood;
        user.postal_code = data.postal_code;
        user.person_type = data.person_type;
        user.profile_complete = data.profile_complete;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn claim_bank_account(&self, user_id: Uuid, account_id: &str) -> Res<User> {
        let mut state = self.write()?;
        let user = state.user_mut(user_id)?;
        if user.bank_account_id.is_none() {
            user.bank_account_id = Some(account_id.to_string());
            user.updated_at = Utc::now();
        }
        Ok(user.clone())
    }

    async fn update_last_access(&self, user_id: Uuid) -> Res<User> {
        let mut state = self.write()?;
        let user = state.user_mut(user_id)?;
        let now = Utc::now();
        user.last_access_at = Some(now);
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn create_token(&self, data: TokenCreateRequest) -> Res<AuthToken> {
        let mut state = self.write()?;
        let now = Utc::now();

        for token in state.tokens.values_mut() {
            if token.user_id == data.user_id
                && token.kind == data.kind
                && !token.used
                && !token.is_expired_at(now)
            {
                token.expires_at = now;
            }
        }

        let token = AuthToken {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            code: data.code,
            kind: data.kind,
            expires_at: data.expires_at,
            used: false,
            created_at: now,
        };
        state.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_tokens(&self, code: &str, kind: TokenKind) -> Res<Vec<AuthToken>> {
        let state = self.read()?;
        let mut tokens: Vec<AuthToken> = state
            .tokens
            .values()
            .filter(|t| t.code == code && t.kind == kind)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tokens)
    }

    async fn mark_token_used(&self, token_id: Uuid) -> Res<bool> {
        Ok(self.write()?.mark_used(token_id))
    }

    async fn consume_email_verification(&self, token_id: Uuid, user_id: Uuid) -> Res<User> {
        let mut state = self.write()?;
        // check the user first so a failed consume leaves the token intact
        state.user_mut(user_id)?;
        if !state.mark_used(token_id) {
            return Err(AppError::CodeAlreadyUsed);
        }
        let user = state.user_mut(user_id)?;
        user.email_verified = true;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn consume_password_reset(&self, token_id: Uuid, update: PasswordUpdate) -> Res<()> {
        let mut state = self.write()?;
        if !state.credentials.contains_key(&update.user_id) {
            return Err(AppError::UserNotFound);
        }
        if !state.mark_used(token_id) {
            return Err(AppError::CodeAlreadyUsed);
        }
        state
            .credentials
            .insert(update.user_id, update.password_hash);
        Ok(())
    }

    async fn delete_expired_tokens(&self) -> Res<u64> {
        let mut state = self.write()?;
        let now = Utc::now();
        let before = state.tokens.len();
        state.tokens.retain(|_, token| !token.is_expired_at(now));
        Ok((before - state.tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn new_user(email: &str) -> UserCreateRequest {
        UserCreateRequest {
            email: email.to_string(),
            name: "Ana".to_string(),
            plan_id: "free".to_string(),
            password_hash: "hash".to_string(),
        }
    }

    fn new_token(user_id: Uuid, code: &str, ttl: Duration) -> TokenCreateRequest {
        TokenCreateRequest {
            user_id,
            code: code.to_string(),
            kind: TokenKind::EmailVerification,
            expires_at: Utc::now() + ttl,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryCredentialStore::new();
        store.create_user(new_user("ana@x.com")).await.unwrap();

        let result = store.create_user(new_user("ana@x.com")).await;
        assert!(matches!(result, Err(AppError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn new_user_starts_unverified_and_active() {
        let store = InMemoryCredentialStore::new();
        let user = store.create_user(new_user("ana@x.com")).await.unwrap();

        assert!(!user.email_verified);
        assert!(user.active);
        assert!(!user.profile_complete);
        assert!(user.last_access_at.is_none());
    }

    #[tokio::test]
    async fn token_is_marked_used_at_most_once() {
        let store = InMemoryCredentialStore::new();
        let user = store.create_user(new_user("ana@x.com")).await.unwrap();
        let token = store
            .create_token(new_token(user.id, "123456", Duration::minutes(15)))
            .await
            .unwrap();

        assert!(store.mark_token_used(token.id).await.unwrap());
        assert!(!store.mark_token_used(token.id).await.unwrap());
    }

    #[tokio::test]
    async fn new_token_supersedes_previous_one() {
        let store = InMemoryCredentialStore::new();
        let user = store.create_user(new_user("ana@x.com")).await.unwrap();
        store
            .create_token(new_token(user.id, "111111", Duration::minutes(15)))
            .await
            .unwrap();
        store
            .create_token(new_token(user.id, "222222", Duration::minutes(15)))
            .await
            .unwrap();

        let now = Utc::now();
        let old = store
            .find_tokens("111111", TokenKind::EmailVerification)
            .await
            .unwrap();
        let fresh = store
            .find_tokens("222222", TokenKind::EmailVerification)
            .await
            .unwrap();
        assert!(old[0].is_expired_at(now));
        assert!(!fresh[0].is_expired_at(now));
    }

    #[tokio::test]
    async fn find_tokens_filters_by_kind() {
        let store = InMemoryCredentialStore::new();
        let user = store.create_user(new_user("ana@x.com")).await.unwrap();
        store
            .create_token(new_token(user.id, "123456", Duration::minutes(15)))
            .await
            .unwrap();

        let resets = store
            .find_tokens("123456", TokenKind::PasswordReset)
            .await
            .unwrap();
        assert!(resets.is_empty());
    }

    #[tokio::test]
    async fn consumed_verification_sets_flag_and_rejects_second_use() {
        let store = InMemoryCredentialStore::new();
        let user = store.create_user(new_user("ana@x.com")).await.unwrap();
        let token = store
            .create_token(new_token(user.id, "123456", Duration::minutes(15)))
            .await
            .unwrap();

        let verified = store
            .consume_email_verification(token.id, user.id)
            .await
            .unwrap();
        assert!(verified.email_verified);

        let again = store.consume_email_verification(token.id, user.id).await;
        assert!(matches!(again, Err(AppError::CodeAlreadyUsed)));
    }

    #[tokio::test]
    async fn bank_account_claim_keeps_first_id() {
        let store = InMemoryCredentialStore::new();
        let user = store.create_user(new_user("ana@x.com")).await.unwrap();

        let first = store.claim_bank_account(user.id, "acct_1").await.unwrap();
        let second = store.claim_bank_account(user.id, "acct_2").await.unwrap();

        assert_eq!(first.bank_account_id.as_deref(), Some("acct_1"));
        assert_eq!(second.bank_account_id.as_deref(), Some("acct_1"));
    }

    #[tokio::test]
    async fn profile_update_leaves_bank_account_alone() {
        let store = InMemoryCredentialStore::new();
        let user = store.create_user(new_user("ana@x.com")).await.unwrap();
        store.claim_bank_account(user.id, "acct_1").await.unwrap();

        let updated = store
            .update_profile(user.id, ProfileUpdate::default())
            .await
            .unwrap();
        assert_eq!(updated.bank_account_id.as_deref(), Some("acct_1"));
    }

    #[tokio::test]
    async fn password_reset_for_unknown_user_keeps_token_unused() {
        let store = InMemoryCredentialStore::new();
        let user = store.create_user(new_user("ana@x.com")).await.unwrap();
        let token = store
            .create_token(new_token(user.id, "123456", Duration::minutes(15)))
            .await
            .unwrap();

        let update = PasswordUpdate {
            user_id: Uuid::new_v4(),
            password_hash: "new-hash".to_string(),
        };
        let result = store.consume_password_reset(token.id, update).await;

        assert!(matches!(result, Err(AppError::UserNotFound)));
        assert!(store.mark_token_used(token.id).await.unwrap());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_tokens() {
        let store = InMemoryCredentialStore::new();
        let user = store.create_user(new_user("ana@x.com")).await.unwrap();
        let other = store.create_user(new_user("bia@x.com")).await.unwrap();
        store
            .create_token(new_token(user.id, "111111", Duration::minutes(-1)))
            .await
            .unwrap();
        store
            .create_token(new_token(other.id, "222222", Duration::minutes(15)))
            .await
            .unwrap();

        assert_eq!(store.delete_expired_tokens().await.unwrap(), 1);
        assert_eq!(store.token_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_sweeps_on_empty_set_both_succeed() {
        let store = InMemoryCredentialStore::new();

        let (a, b) = tokio::join!(store.delete_expired_tokens(), store.delete_expired_tokens());

        assert_eq!(a.unwrap(), 0);
        assert_eq!(b.unwrap(), 0);
    }
}
