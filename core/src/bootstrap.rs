use std::sync::Arc;

use actix_web::web;
use api_auth::services::{
    auth::AuthService, bank, mailer::LogMailer, password::PasswordHasher, profile::ProfileGate,
};
use common::{
    env_config::{Config, StoreBackend},
    error::{AppError, Res},
    jwt::TokenIssuer,
};
use db::store::{CredentialStore, InMemoryCredentialStore, PgCredentialStore};

/// Everything the HTTP layer shares across workers.
#[derive(Clone)]
pub struct Services {
    pub auth: web::Data<AuthService>,
    pub profile: web::Data<ProfileGate>,
    pub issuer: web::Data<TokenIssuer>,
}

async fn open_store(config: &Config) -> Res<Arc<dyn CredentialStore>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config.database_url.as_deref().ok_or_else(|| {
                AppError::Configuration("DATABASE_URL must be set for postgres".to_string())
            })?;
            let pool = db::setup(database_url, config.is_production()).await?;
            log::info!("Using postgres credential store");
            Ok(Arc::new(PgCredentialStore::new(pool)))
        }
        StoreBackend::Memory => {
            log::warn!("Using in-memory credential store, data is lost on restart");
            Ok(Arc::new(InMemoryCredentialStore::new()))
        }
    }
}

/// Wires the store, issuer, mailer and provisioner into the services.
pub async fn bootstrap(config: &Config) -> Res<Services> {
    let store = open_store(config).await?;

    let issuer = TokenIssuer::new(&config.jwt_config);
    if !issuer.is_configured() {
        log::warn!("JWT_SECRET is not set, verification and login will fail");
    }

    let hasher = PasswordHasher::new(&config.auth_config)?;
    let provisioner = bank::from_config(&config.bank_config);

    let auth = AuthService::new(
        store.clone(),
        issuer.clone(),
        Arc::new(LogMailer::new()),
        hasher,
        config.auth_config.clone(),
    );
    let profile = ProfileGate::new(store, provisioner);

    Ok(Services {
        auth: web::Data::new(auth),
        profile: web::Data::new(profile),
        issuer: web::Data::new(issuer),
    })
}
