use std::sync::Arc;

use async_trait::async_trait;
use common::{
    env_config::BankConfig,
    error::{AppError, Res},
};
use db::models::user::User;
use serde::Deserialize;
use uuid::Uuid;

use crate::dtos::profile::ValidatedProfile;

/// Creates the bank account linked to a user once onboarding completes.
#[async_trait]
pub trait BankAccountProvisioner: Send + Sync {
    /// Returns the provider's account identifier.
    async fn provision(&self, user: &User, profile: &ValidatedProfile) -> Res<String>;
}

/// Used when no provider is configured; mints local identifiers.
#[derive(Default)]
pub struct LocalBankAccountProvisioner;

#[async_trait]
impl BankAccountProvisioner for LocalBankAccountProvisioner {
    async fn provision(&self, user: &User, _profile: &ValidatedProfile) -> Res<String> {
        let account_id = format!("acct_{}", Uuid::new_v4().simple());
        log::info!("Provisioned local bank account {} for user {}", account_id, user.id);
        Ok(account_id)
    }
}

pub struct HttpBankAccountProvisioner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ProvisionResponse {
    id: String,
}

impl HttpBankAccountProvisioner {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl BankAccountProvisioner for HttpBankAccountProvisioner {
    async fn provision(&self, user: &User, profile: &ValidatedProfile) -> Res<String> {
        let response = self
            .client
            .post(format!("{}/accounts", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "externalId": user.id,
                "name": user.name,
                "email": user.email,
                "profile": profile,
            }))
            .send()
            .await
            .map_err(|e| {
                AppError::ProfileCompletion(format!("Bank provider unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ProfileCompletion(format!(
                "Bank provider returned error status: {}",
                response.status()
            )));
        }

        let body: ProvisionResponse = response.json().await.map_err(|e| {
            AppError::ProfileCompletion(format!("Failed to parse bank provider response: {}", e))
        })?;
        Ok(body.id)
    }
}

/// Picks the HTTP provisioner when a provider URL is configured.
pub fn from_config(config: &BankConfig) -> Arc<dyn BankAccountProvisioner> {
    match &config.provider_url {
        Some(url) => Arc::new(HttpBankAccountProvisioner::new(url, &config.api_key)),
        None => {
            log::warn!("BANK_PROVIDER_URL is not set, using local bank account provisioner");
            Arc::new(LocalBankAccountProvisioner)
        }
    }
}
