use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Individual vs. business classification, decides which profile fields are mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonType {
    Individual,
    Business,
}

impl PersonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonType::Individual => "individual",
            PersonType::Business => "business",
        }
    }
}

impl FromStr for PersonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(PersonType::Individual),
            "business" => Ok(PersonType::Business),
            other => Err(format!("Invalid person type: {}", other)),
        }
    }
}

impl fmt::Display for PersonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub plan_id: String,
    pub email_verified: bool,
    pub active: bool,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    pub monthly_revenue: Option<f64>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub postal_code: Option<String>,
    pub person_type: Option<PersonType>,
    pub profile_complete: bool,
    pub bank_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_access_at: Option<DateTime<Utc>>,
}

/// Row shape of the `users` table; discriminators are stored as text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub plan_id: String,
    pub email_verified: bool,
    pub active: bool,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    pub monthly_revenue: Option<f64>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub postal_code: Option<String>,
    pub person_type: Option<String>,
    pub profile_complete: bool,
    pub bank_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_access_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let person_type = row.person_type.as_deref().and_then(|value| {
            value
                .parse()
                .map_err(|e: String| log::warn!("user {}: {}", row.id, e))
                .ok()
        });

        User {
            id: row.id,
            email: row.email,
            name: row.name,
            plan_id: row.plan_id,
            email_verified: row.email_verified,
            active: row.active,
            phone: row.phone,
            tax_id: row.tax_id,
            monthly_revenue: row.monthly_revenue,
            address: row.address,
            neighborhood: row.neighborhood,
            postal_code: row.postal_code,
            person_type,
            profile_complete: row.profile_complete,
            bank_account_id: row.bank_account_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_access_at: row.last_access_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthCredentials {
    pub user_id: Uuid,
    pub password_hash: String,
}
