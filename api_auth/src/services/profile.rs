use std::sync::Arc;

use common::error::{AppError, FieldError, Res};
use db::{
    dtos::user::ProfileUpdate,
    models::user::{PersonType, User},
    store::CredentialStore,
};
use uuid::Uuid;

use crate::{
    dtos::profile::{ProfileData, ProfileStatus, ValidatedProfile},
    misc::profile_rules::{
        self, ADDRESS_MAX_LENGTH, NEIGHBORHOOD_MAX_LENGTH, ProfileField,
    },
    services::bank::BankAccountProvisioner,
};

/// Decides when a user's onboarding profile is complete and provisions
/// their bank account the first time it is.
pub struct ProfileGate {
    store: Arc<dyn CredentialStore>,
    provisioner: Arc<dyn BankAccountProvisioner>,
}

impl ProfileGate {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        provisioner: Arc<dyn BankAccountProvisioner>,
    ) -> Self {
        Self { store, provisioner }
    }

    /// Reports completeness from the stored record. Never writes.
    pub async fn check(&self, user_id: Uuid) -> Res<ProfileStatus> {
        let user = self.load(user_id).await?;
        let missing = profile_rules::missing_fields(&user);
        Ok(ProfileStatus {
            is_complete: profile_rules::is_complete(&user),
            missing_fields: missing.iter().map(|f| f.as_str().to_string()).collect(),
        })
    }

    /// Validates a full profile, provisions a bank account if the user has
    /// none yet, and stores the profile as complete.
    ///
    /// Nothing is persisted when validation or provisioning fails. The
    /// account id is claimed in the store, so overlapping calls keep
    /// whichever id was stored first.
    pub async fn complete(&self, user_id: Uuid, data: ProfileData) -> Res<User> {
        let user = self.load(user_id).await?;
        let profile = validate_full(&data)?;

        if user.bank_account_id.is_none() {
            let account_id = self.provisioner.provision(&user, &profile).await?;
            let claimed = self.store.claim_bank_account(user_id, &account_id).await?;
            if claimed.bank_account_id.as_deref() == Some(account_id.as_str()) {
                log::info!("Bank account provisioned for user {}", user.id);
            } else {
                log::warn!(
                    "Bank account {} for user {} lost to a concurrent completion",
                    account_id,
                    user.id
                );
            }
        }

        let update = ProfileUpdate {
            phone: Some(profile.phone),
            tax_id: Some(profile.tax_id),
            monthly_revenue: profile.monthly_revenue,
            address: Some(profile.address),
            neighborhood: Some(profile.neighborhood),
            postal_code: Some(profile.postal_code),
            person_type: Some(profile.person_type),
            profile_complete: true,
        };
        let user = self.store.update_profile(user_id, update).await?;
        log::info!("Profile completed for user {}", user.id);
        Ok(user)
    }

    /// Applies the supplied fields over the stored profile. Completeness is
    /// recomputed but a bank account is never provisioned or changed here.
    pub async fn update(&self, user_id: Uuid, data: ProfileData) -> Res<User> {
        let user = self.load(user_id).await?;
        let mut errors = Vec::new();

        let person_type = data.person_type.or(user.person_type);
        let mut update = ProfileUpdate {
            phone: user.phone.clone(),
            tax_id: user.tax_id.clone(),
            monthly_revenue: user.monthly_revenue,
            address: user.address.clone(),
            neighborhood: user.neighborhood.clone(),
            postal_code: user.postal_code.clone(),
            person_type,
            profile_complete: false,
        };

        if let Some(phone) = &data.phone {
            if let Some(v) = collect(profile_rules::normalize_phone(phone), &mut errors) {
                update.phone = Some(v);
            }
        }
        // a changed person type revalidates the stored tax id as well
        let tax_id = data.tax_id.as_ref().or(if data.person_type.is_some() {
            user.tax_id.as_ref()
        } else {
            None
        });
        if let Some(tax_id) = tax_id {
            match person_type {
                Some(kind) => {
                    if let Some(v) =
                        collect(profile_rules::normalize_tax_id(tax_id, kind), &mut errors)
                    {
                        update.tax_id = Some(v);
                    }
                }
                None => errors.push(FieldError::new(
                    ProfileField::PersonType.as_str(),
                    "is required to validate tax_id",
                )),
            }
        }
        if let Some(revenue) = data.monthly_revenue {
            if let Some(v) = collect(profile_rules::validate_monthly_revenue(revenue), &mut errors) {
                update.monthly_revenue = Some(v);
            }
        }
        if let Some(address) = &data.address {
            let result =
                profile_rules::normalize_text(ProfileField::Address, address, ADDRESS_MAX_LENGTH);
            if let Some(v) = collect(result, &mut errors) {
                update.address = Some(v);
            }
        }
        if let Some(neighborhood) = &data.neighborhood {
            let result = profile_rules::normalize_text(
                ProfileField::Neighborhood,
                neighborhood,
                NEIGHBORHOOD_MAX_LENGTH,
            );
            if let Some(v) = collect(result, &mut errors) {
                update.neighborhood = Some(v);
            }
        }
        if let Some(postal_code) = &data.postal_code {
            if let Some(v) = collect(profile_rules::normalize_postal_code(postal_code), &mut errors) {
                update.postal_code = Some(v);
            }
        }

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let merged = User {
            phone: update.phone.clone(),
            tax_id: update.tax_id.clone(),
            monthly_revenue: update.monthly_revenue,
            address: update.address.clone(),
            neighborhood: update.neighborhood.clone(),
            postal_code: update.postal_code.clone(),
            person_type: update.person_type,
            ..user
        };
        update.profile_complete = profile_rules::is_complete(&merged);

        let user = self.store.update_profile(user_id, update).await?;
        log::debug!("Profile updated for user {}", user.id);
        Ok(user)
    }

    async fn load(&self, user_id: Uuid) -> Res<User> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }
}

fn collect<T>(result: Result<T, FieldError>, errors: &mut Vec<FieldError>) -> Option<T> {
    result.map_err(|e| errors.push(e)).ok()
}

/// Checks every required field of `data`, reporting all problems at once.
fn validate_full(data: &ProfileData) -> Res<ValidatedProfile> {
    let mut errors = Vec::new();
    let required = |field: ProfileField| FieldError::new(field.as_str(), "is required");

    let person_type = data.person_type;
    if person_type.is_none() {
        errors.push(required(ProfileField::PersonType));
    }

    let phone = match data.phone.as_deref() {
        Some(phone) => collect(profile_rules::normalize_phone(phone), &mut errors),
        None => {
            errors.push(required(ProfileField::Phone));
            None
        }
    };

    let tax_id = match (data.tax_id.as_deref(), person_type) {
        (Some(tax_id), Some(kind)) => {
            collect(profile_rules::normalize_tax_id(tax_id, kind), &mut errors)
        }
        (Some(_), None) => None,
        (None, _) => {
            errors.push(required(ProfileField::TaxId));
            None
        }
    };

    let monthly_revenue = match (data.monthly_revenue, person_type) {
        (Some(revenue), _) => {
            collect(profile_rules::validate_monthly_revenue(revenue), &mut errors)
        }
        (None, Some(PersonType::Business)) => {
            errors.push(required(ProfileField::MonthlyRevenue));
            None
        }
        (None, _) => None,
    };

    let address = text_field(data.address.as_deref(), ProfileField::Address, ADDRESS_MAX_LENGTH, &mut errors);
    let neighborhood = text_field(
        data.neighborhood.as_deref(),
        ProfileField::Neighborhood,
        NEIGHBORHOOD_MAX_LENGTH,
        &mut errors,
    );

    let postal_code = match data.postal_code.as_deref() {
        Some(postal_code) => collect(profile_rules::normalize_postal_code(postal_code), &mut errors),
        None => {
            errors.push(required(ProfileField::PostalCode));
            None
        }
    };

    match (person_type, phone, tax_id, address, neighborhood, postal_code) {
        (Some(person_type), Some(phone), Some(tax_id), Some(address), Some(neighborhood), Some(postal_code))
            if errors.is_empty() =>
        {
            Ok(ValidatedProfile {
                person_type,
                phone,
                tax_id,
                monthly_revenue,
                address,
                neighborhood,
                postal_code,
            })
        }
        _ => Err(AppError::Validation(errors)),
    }
}

fn text_field(
    value: Option<&str>,
    field: ProfileField,
    max: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        Some(value) => collect(profile_rules::normalize_text(field, value, max), errors),
        None => {
            errors.push(FieldError::new(field.as_str(), "is required"));
            None
        }
    }
}
