use std::sync::Arc;

use async_trait::async_trait;
use common::error::{AppError, Res};
use sqlx::PgPool;
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

/// Postgres-backed store. Multi-statement writes run in one transaction.
pub struct PgCredentialStore {
    pool: Arc<PgPool>,
}

impl PgCredentialStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn user_missing(user_id: Uuid) -> AppError {
    log::warn!("User {} vanished during update", user_id);
    AppError::UserNotFound
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> Res<Option<User>> {
        crate::user::get_user_by_email(&*self.pool, email).await
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Res<Option<User>> {
        crate::user::get_user_by_id(&*self.pool, user_id).await
    }

    async fn find_credentials(&self, email: &str) -> Res<Option<(User, AuthCredentials)>> {
        crate::user::get_user_with_password_hash(&*self.pool, email).await
    }

    async fn create_user(&self, data: UserCreateRequest) -> Res<User> {
        let mut tx = self.pool.begin().await?;

        let user = crate::user::insert_user(&mut *tx, &data).await?;
        crate::user::insert_user_with_credentials(
            &mut *tx,
            AuthCredentials {
                user_id: user.id,
                password_hash: data.password_hash,
            },
        )
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn update_profile(&self, user_id: Uuid, data: ProfileUpdate) -> Res<User> {
        crate::user::update_profile(&*self.pool, user_id, data)
            .await?
            .ok_or_else(|| user_missing(user_id))
    }

    async fn claim_bank_account(&self, user_id: Uuid, account_id: &str) -> Res<User> {
        if let Some(user) =
            crate::user::set_bank_account_if_empty(&*self.pool, user_id, account_id).await?
        {
            return Ok(user);
        }
        crate::user::get_user_by_id(&*self.pool, user_id)
            .await?
            .ok_or_else(|| user_missing(user_id))
    }

    async fn update_last_access(&self, user_id: Uuid) -> Res<User> {
        crate::user::update_last_access(&*self.pool, user_id)
            .await?
            .ok_or_else(|| user_missing(user_id))
    }

    async fn create_token(&self, data: TokenCreateRequest) -> Res<AuthToken> {
        let mut tx = self.pool.begin().await?;

        let superseded = crate::token::supersede_tokens(&mut *tx, data.user_id, data.kind).await?;
        if superseded > 0 {
            log::debug!(
                "Superseded {} {} token(s) for user {}",
                superseded,
                data.kind,
                data.user_id
            );
        }
        let token = crate::token::insert_token(&mut *tx, &data).await?;

        tx.commit().await?;
        Ok(token)
    }

    async fn find_tokens(&self, code: &str, kind: TokenKind) -> Res<Vec<AuthToken>> {
        crate::token::get_tokens_by_code(&*self.pool, code, kind).await
    }

    async fn mark_token_used(&self, token_id: Uuid) -> Res<bool> {
        crate::token::mark_token_used(&*self.pool, token_id).await
    }

    async fn consume_email_verification(&self, token_id: Uuid, user_id: Uuid) -> Res<User> {
        let mut tx = self.pool.begin().await?;

        if !crate::token::mark_token_used(&mut *tx, token_id).await? {
            return Err(AppError::CodeAlreadyUsed);
        }
        let user = crate::user::set_email_verified(&mut *tx, user_id)
            .await?
            .ok_or_else(|| user_missing(user_id))?;

        tx.commit().await?;
        Ok(user)
    }

    async fn consume_password_reset(&self, token_id: Uuid, update: PasswordUpdate) -> Res<()> {
        let mut tx = self.pool.begin().await?;

        if !crate::token::mark_token_used(&mut *tx, token_id).await? {
            return Err(AppError::CodeAlreadyUsed);
        }
        if !crate::user::update_password_hash(&mut *tx, &update).await? {
            return Err(user_missing(update.user_id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_expired_tokens(&self) -> Res<u64> {
        crate::token::delete_expired_tokens(&*self.pool).await
    }
}
