//! Which profile fields onboarding needs, per person type, and their formats.

use std::fmt;

use common::error::FieldError;
use db::models::user::{PersonType, User};
use once_cell::sync::Lazy;
use regex::Regex;

static POSTAL_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{5})-?([0-9]{3})$").expect("valid postal code regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9()\-\s]+$").expect("valid phone regex"));

pub const ADDRESS_MAX_LENGTH: usize = 255;
pub const NEIGHBORHOOD_MAX_LENGTH: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    PersonType,
    Phone,
    TaxId,
    MonthlyRevenue,
    Address,
    Neighborhood,
    PostalCode,
}

impl ProfileField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::PersonType => "person_type",
            ProfileField::Phone => "phone",
            ProfileField::TaxId => "tax_id",
            ProfileField::MonthlyRevenue => "monthly_revenue",
            ProfileField::Address => "address",
            ProfileField::Neighborhood => "neighborhood",
            ProfileField::PostalCode => "postal_code",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Always,
    Only(PersonType),
}

impl Requirement {
    /// An unknown person type only counts the unconditional rows.
    pub fn applies_to(&self, person_type: Option<PersonType>) -> bool {
        match (self, person_type) {
            (Requirement::Always, _) => true,
            (Requirement::Only(required), Some(actual)) => *required == actual,
            (Requirement::Only(_), None) => false,
        }
    }
}

/// Field requirement table, in the order fields are reported.
pub const REQUIREMENTS: [(ProfileField, Requirement); 7] = [
    (ProfileField::PersonType, Requirement::Always),
    (ProfileField::Phone, Requirement::Always),
    (ProfileField::TaxId, Requirement::Always),
    (
        ProfileField::MonthlyRevenue,
        Requirement::Only(PersonType::Business),
    ),
    (ProfileField::Address, Requirement::Always),
    (ProfileField::Neighborhood, Requirement::Always),
    (ProfileField::PostalCode, Requirement::Always),
];

pub fn required_fields(person_type: Option<PersonType>) -> impl Iterator<Item = ProfileField> {
    REQUIREMENTS
        .into_iter()
        .filter(move |(_, requirement)| requirement.applies_to(person_type))
        .map(|(field, _)| field)
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// Whether a stored user has a value for the field.
pub fn is_present(user: &User, field: ProfileField) -> bool {
    match field {
        ProfileField::PersonType => user.person_type.is_some(),
        ProfileField::Phone => !is_blank(&user.phone),
        ProfileField::TaxId => !is_blank(&user.tax_id),
        ProfileField::MonthlyRevenue => user.monthly_revenue.is_some(),
        ProfileField::Address => !is_blank(&user.address),
        ProfileField::Neighborhood => !is_blank(&user.neighborhood),
        ProfileField::PostalCode => !is_blank(&user.postal_code),
    }
}

pub fn missing_fields(user: &User) -> Vec<ProfileField> {
    required_fields(user.person_type)
        .filter(|field| !is_present(user, *field))
        .collect()
}

/// Backs both `ProfileStatus::is_complete` and the stored `profile_complete`.
pub fn is_complete(user: &User) -> bool {
    required_fields(user.person_type).all(|field| is_present(user, field))
}

fn digits(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Returns the phone with surrounding whitespace removed.
pub fn normalize_phone(phone: &str) -> Result<String, FieldError> {
    let phone = phone.trim();
    let count = digits(phone).len();
    if !PHONE_RE.is_match(phone) || !(10..=13).contains(&count) {
        return Err(FieldError::new(
            ProfileField::Phone.as_str(),
            "must contain 10 to 13 digits",
        ));
    }
    Ok(phone.to_string())
}

/// Returns the postal code as `NNNNN-NNN`.
pub fn normalize_postal_code(postal_code: &str) -> Result<String, FieldError> {
    POSTAL_CODE_RE
        .captures(postal_code.trim())
        .map(|caps| format!("{}-{}", &caps[1], &caps[2]))
        .ok_or_else(|| {
            FieldError::new(
                ProfileField::PostalCode.as_str(),
                "must be in the format 00000-000",
            )
        })
}

/// Returns the tax id as bare digits after checking length and check digits.
pub fn normalize_tax_id(tax_id: &str, person_type: PersonType) -> Result<String, FieldError> {
    let trimmed = tax_id.trim();
    let allowed = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '/'));
    let numbers = digits(trimmed);

    let valid = allowed
        && match person_type {
            PersonType::Individual => is_valid_cpf(&numbers),
            PersonType::Business => is_valid_cnpj(&numbers),
        };

    if !valid {
        let message = match person_type {
            PersonType::Individual => "must be a valid CPF",
            PersonType::Business => "must be a valid CNPJ",
        };
        return Err(FieldError::new(ProfileField::TaxId.as_str(), message));
    }
    Ok(numbers.iter().map(|d| d.to_string()).collect())
}

pub fn validate_monthly_revenue(value: f64) -> Result<f64, FieldError> {
    if !value.is_finite() || value < 0.0 {
        return Err(FieldError::new(
            ProfileField::MonthlyRevenue.as_str(),
            "must be a non-negative amount",
        ));
    }
    Ok(value)
}

pub fn normalize_text(field: ProfileField, value: &str, max: usize) -> Result<String, FieldError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FieldError::new(field.as_str(), "is required"));
    }
    if value.chars().count() > max {
        return Err(FieldError::new(
            field.as_str(),
            format!("must be at most {} characters", max),
        ));
    }
    Ok(value.to_string())
}

fn all_same(numbers: &[u32]) -> bool {
    numbers.windows(2).all(|w| w[0] == w[1])
}

fn is_valid_cpf(numbers: &[u32]) -> bool {
    if numbers.len() != 11 || all_same(numbers) {
        return false;
    }
    let check = |len: usize| {
        let sum: u32 = numbers[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        let rest = (sum * 10) % 11;
        if rest == 10 { 0 } else { rest }
    };
    check(9) == numbers[9] && check(10) == numbers[10]
}

fn is_valid_cnpj(numbers: &[u32]) -> bool {
    const FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    if numbers.len() != 14 || all_same(numbers) {
        return false;
    }
    let check = |weights: &[u32]| {
        let sum: u32 = numbers.iter().zip(weights).map(|(d, w)| d * w).sum();
        let rest = sum % 11;
        if rest < 2 { 0 } else { 11 - rest }
    };
    check(&FIRST) == numbers[12] && check(&SECOND) == numbers[13]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_revenue_only_required_for_business() {
        let individual: Vec<_> = required_fields(Some(PersonType::Individual)).collect();
        let business: Vec<_> = required_fields(Some(PersonType::Business)).collect();

        assert!(!individual.contains(&ProfileField::MonthlyRevenue));
        assert!(business.contains(&ProfileField::MonthlyRevenue));
        assert_eq!(individual.len(), 6);
        assert_eq!(business.len(), 7);
    }

    #[test]
    fn unknown_person_type_counts_unconditional_fields() {
        let fields: Vec<_> = required_fields(None).collect();
        assert!(fields.contains(&ProfileField::PersonType));
        assert!(!fields.contains(&ProfileField::MonthlyRevenue));
    }

    #[test]
    fn cpf_check_digits() {
        assert_eq!(
            normalize_tax_id("529.982.247-25", PersonType::Individual).unwrap(),
            "52998224725"
        );
        assert!(normalize_tax_id("529.982.247-24", PersonType::Individual).is_err());
        assert!(normalize_tax_id("111.111.111-11", PersonType::Individual).is_err());
        assert!(normalize_tax_id("5299822472", PersonType::Individual).is_err());
    }

    #[test]
    fn cnpj_check_digits() {
        assert_eq!(
            normalize_tax_id("11.222.333/0001-81", PersonType::Business).unwrap(),
            "11222333000181"
        );
        assert!(normalize_tax_id("11.222.333/0001-82", PersonType::Business).is_err());
        assert!(normalize_tax_id("529.982.247-25", PersonType::Business).is_err());
    }

    #[test]
    fn tax_id_rejects_letters() {
        assert!(normalize_tax_id("529.982.247-2a5", PersonType::Individual).is_err());
    }

    #[test]
    fn postal_code_is_normalized_with_dash() {
        assert_eq!(normalize_postal_code("01310100").unwrap(), "01310-100");
        assert_eq!(normalize_postal_code(" 01310-100 ").unwrap(), "01310-100");
        assert!(normalize_postal_code("0131-0100").is_err());
        assert!(normalize_postal_code("ABCDE-FGH").is_err());
        // Arabic-Indic digits
        assert!(normalize_postal_code("٠١٣٠٥٠٠٠").is_err());
        assert!(normalize_postal_code("٠١٣٠٥-٠٠٠").is_err());
    }

    #[test]
    fn phone_digit_count() {
        assert!(normalize_phone("(11) 98765-4321").is_ok());
        assert!(normalize_phone("+55 11 98765-4321").is_ok());
        assert!(normalize_phone("98765-4321").is_err());
        assert!(normalize_phone("11 9876x-4321").is_err());
    }

    #[test]
    fn revenue_must_be_non_negative() {
        assert!(validate_monthly_revenue(0.0).is_ok());
        assert!(validate_monthly_revenue(-1.0).is_err());
        assert!(validate_monthly_revenue(f64::NAN).is_err());
    }
}
