use std::{str::FromStr, sync::Arc, time::Duration};

use common::error::{AppError, Res};
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
};

pub mod store;
pub mod token;
pub mod user;

pub mod models {
    pub mod token;
    pub mod user;
}

pub mod dtos {
    pub mod token;
    pub mod user;
}

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

fn connect_options(database_url: &str, require_ssl: bool) -> Res<PgConnectOptions> {
    let options = PgConnectOptions::from_str(database_url)?;
    Ok(if require_ssl {
        options.ssl_mode(PgSslMode::Require)
    } else {
        options
    })
}

/// Creates the target database through the `postgres` maintenance database
/// when it does not exist yet.
async fn ensure_database(database_url: &str, require_ssl: bool) -> Res<()> {
    let url = url::Url::parse(database_url)
        .map_err(|e| AppError::Configuration(format!("Invalid DATABASE_URL: {}", e)))?;
    let db_name = url.path().trim_start_matches('/').to_string();
    if db_name.is_empty() {
        return Err(AppError::Configuration(
            "DATABASE_URL must name a database".to_string(),
        ));
    }

    let mut admin_url = url.clone();
    admin_url.set_path("/postgres");
    let admin_pool = PgPool::connect_with(connect_options(admin_url.as_str(), require_ssl)?).await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&admin_pool)
            .await?;

    if !exists {
        log::info!("Creating database {}", db_name);
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name.replace('"', "\"\"")))
            .execute(&admin_pool)
            .await?;
    }

    admin_pool.close().await;
    Ok(())
}

/// Connects to Postgres, creating the database if needed, and applies
/// the pending migrations.
pub async fn setup(database_url: &str, require_ssl: bool) -> Res<Arc<PgPool>> {
    ensure_database(database_url, require_ssl).await?;

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(connect_options(database_url, require_ssl)?)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to run migrations: {}", e)))?;
    log::info!("Database migrations applied");

    Ok(Arc::new(pool))
}
