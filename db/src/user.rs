use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::user::{PasswordUpdate, ProfileUpdate, UserCreateRequest},
    models::user::{AuthCredentials, User, UserRow},
};

pub async fn get_user_by_email<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    email: &str,
) -> Res<Option<User>> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(executor)
        .await
        .map(|row| row.map(User::from))
        .map_err(AppError::from)
}

pub async fn get_user_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<User>> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map(|row| row.map(User::from))
        .map_err(AppError::from)
}

pub async fn insert_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: &UserCreateRequest,
) -> Res<User> {
    sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (email, name, plan_id, email_verified, active)
        VALUES ($1, $2, $3, false, true)
        RETURNING *
        "#,
    )
    .bind(&data.email)
    .bind(&data.name)
    .bind(&data.plan_id)
    .fetch_one(executor)
    .await
    .map(User::from)
    .map_err(map_unique_email)
}

pub async fn insert_user_with_credentials<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: AuthCredentials,
) -> Res<()> {
    sqlx::query(
        r#"
        INSERT INTO auth_credentials (user_id, password_hash)
        VALUES ($1, $2)
        "#,
    )
    .bind(data.user_id)
    .bind(data.password_hash)
    .execute(executor)
    .await?;
    Ok(())
}

/// Returns false when the user has no credentials row.
pub async fn update_password_hash<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: &PasswordUpdate,
) -> Res<bool> {
    let result = sqlx::query(
        r#"
        UPDATE auth_credentials SET password_hash = $2, updated_at = now()
        WHERE user_id = $1
        "#,
    )
    .bind(data.user_id)
    .bind(&data.password_hash)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn get_user_with_password_hash<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    email: &str,
) -> Res<Option<(User, AuthCredentials)>> {
    #[derive(sqlx::FromRow)]
    struct Record {
        #[sqlx(flatten)]
        user: UserRow,
        password_hash: String,
    }

    sqlx::query_as::<_, Record>(
        r#"
        SELECT u.*, ac.password_hash
        FROM users u
        JOIN auth_credentials ac ON u.id = ac.user_id
        WHERE u.email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(executor)
    .await
    .map(|record| {
        record.map(|record| {
            let user = User::from(record.user);
            let credentials = AuthCredentials {
                user_id: user.id,
                password_hash: record.password_hash,
            };
            (user, credentials)
        })
    })
    .map_err(AppError::from)
}

pub async fn update_profile<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    data: ProfileUpdate,
) -> Res<Option<User>> {
    sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users SET
            phone = $2,
            tax_id = $3,
            monthly_revenue = $4,
            address = $5,
            neighborhood = $6,
            postal_code = $7,
            person_type = $8,
            profile_complete = $9,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(data.phone)
    .bind(data.tax_id)
    .bind(data.monthly_revenue)
    .bind(data.address)
    .bind(data.neighborhood)
    .bind(data.postal_code)
    .bind(data.person_type.map(|p| p.as_str()))
    .bind(data.profile_complete)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(User::from))
    .map_err(AppError::from)
}

/// Sets the bank account id only while it is still empty. Returns `None`
/// when the user is missing or already has one.
pub async fn set_bank_account_if_empty<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    account_id: &str,
) -> Res<Option<User>> {
    sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users SET bank_account_id = $2, updated_at = now()
        WHERE id = $1 AND bank_account_id IS NULL
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(account_id)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(User::from))
    .map_err(AppError::from)
}

pub async fn update_last_access<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<User>> {
    sqlx::query_as::<_, UserRow>(
        "UPDATE users SET last_access_at = now(), updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(User::from))
    .map_err(AppError::from)
}

pub async fn set_email_verified<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<User>> {
    sqlx::query_as::<_, UserRow>(
        "UPDATE users SET email_verified = true, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(User::from))
    .map_err(AppError::from)
}

fn map_unique_email(error: sqlx::Error) -> AppError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            AppError::DuplicateEmail
        }
        _ => AppError::from(error),
    }
}
