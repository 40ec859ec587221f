use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::token::TokenCreateRequest,
    models::token::{AuthToken, AuthTokenRow, TokenKind},
};

pub async fn insert_token<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: &TokenCreateRequest,
) -> Res<AuthToken> {
    sqlx::query_as::<_, AuthTokenRow>(
        r#"
        INSERT INTO auth_tokens (user_id, code, kind, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(&data.code)
    .bind(data.kind.as_str())
    .bind(data.expires_at)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
    .and_then(AuthToken::try_from)
}

/// Expires every still-valid token of `kind` held by the user.
pub async fn supersede_tokens<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    kind: TokenKind,
) -> Res<u64> {
    sqlx::query(
        r#"
        UPDATE auth_tokens SET expires_at = now()
        WHERE user_id = $1 AND kind = $2 AND used = false AND expires_at > now()
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .execute(executor)
    .await
    .map(|result| result.rows_affected())
    .map_err(AppError::from)
}

pub async fn get_tokens_by_code<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    code: &str,
    kind: TokenKind,
) -> Res<Vec<AuthToken>> {
    sqlx::query_as::<_, AuthTokenRow>(
        "SELECT * FROM auth_tokens WHERE code = $1 AND kind = $2 ORDER BY created_at DESC",
    )
    .bind(code)
    .bind(kind.as_str())
    .fetch_all(executor)
    .await?
    .into_iter()
    .map(AuthToken::try_from)
    .collect()
}

pub async fn mark_token_used<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    token_id: Uuid,
) -> Res<bool> {
    sqlx::query("UPDATE auth_tokens SET used = true WHERE id = $1 AND used = false")
        .bind(token_id)
        .execute(executor)
        .await
        .map(|result| result.rows_affected() == 1)
        .map_err(AppError::from)
}

pub async fn delete_expired_tokens<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
) -> Res<u64> {
    sqlx::query("DELETE FROM auth_tokens WHERE expires_at <= now()")
        .execute(executor)
        .await
        .map(|result| result.rows_affected())
        .map_err(AppError::from)
}
