use db::models::user::PersonType;
use serde::{Deserialize, Serialize};

/// Profile payload. Every field is optional on the wire so that missing
/// ones can be reported by name instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    #[serde(alias = "person_type")]
    pub person_type: Option<PersonType>,
    pub phone: Option<String>,
    #[serde(alias = "tax_id")]
    pub tax_id: Option<String>,
    #[serde(alias = "monthly_revenue")]
    pub monthly_revenue: Option<f64>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    #[serde(alias = "postal_code")]
    pub postal_code: Option<String>,
}

/// Profile that passed every format check, in normalized form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedProfile {
    pub person_type: PersonType,
    pub phone: String,
    pub tax_id: String,
    pub monthly_revenue: Option<f64>,
    pub address: String,
    pub neighborhood: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStatus {
    pub is_complete: bool,
    pub missing_fields: Vec<String>,
}
