use uuid::Uuid;

use crate::models::user::PersonType;

pub struct UserCreateRequest {
    pub email: String,
    pub name: String,
    pub plan_id: String,
    pub password_hash: String,
}

/// Full replacement of a user's profile columns. The bank account id is
/// only ever set through `CredentialStore::claim_bank_account`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    pub monthly_revenue: Option<f64>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub postal_code: Option<String>,
    pub person_type: Option<PersonType>,
    pub profile_complete: bool,
}

pub struct PasswordUpdate {
    pub user_id: Uuid,
    pub password_hash: String,
}
