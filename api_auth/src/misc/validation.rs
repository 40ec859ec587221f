use common::error::FieldError;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

pub const NAME_MAX_LENGTH: usize = 120;
pub const PASSWORD_MAX_LENGTH: usize = 128;
pub const CODE_LENGTH: usize = 6;

pub fn validate_email(email: &str, errors: &mut Vec<FieldError>) {
    if email.trim().is_empty() {
        errors.push(FieldError::new("email", "is required"));
    } else if !EMAIL_RE.is_match(email.trim()) {
        errors.push(FieldError::new("email", "is not a valid email address"));
    }
}

pub fn validate_name(name: &str, errors: &mut Vec<FieldError>) {
    let name = name.trim();
    if name.is_empty() {
        errors.push(FieldError::new("name", "is required"));
    } else if name.chars().count() > NAME_MAX_LENGTH {
        errors.push(FieldError::new(
            "name",
            format!("must be at most {} characters", NAME_MAX_LENGTH),
        ));
    }
}

pub fn validate_password(
    field: &str,
    password: &str,
    min_length: usize,
    errors: &mut Vec<FieldError>,
) {
    let length = password.chars().count();
    if length < min_length {
        errors.push(FieldError::new(
            field,
            format!("must be at least {} characters", min_length),
        ));
    } else if length > PASSWORD_MAX_LENGTH {
        errors.push(FieldError::new(
            field,
            format!("must be at most {} characters", PASSWORD_MAX_LENGTH),
        ));
    }
}

pub fn validate_code(code: &str, errors: &mut Vec<FieldError>) {
    if code.len() != CODE_LENGTH || !code.bytes().all(|b| b.is_ascii_digit()) {
        errors.push(FieldError::new(
            "code",
            format!("must be a {}-digit number", CODE_LENGTH),
        ));
    }
}
