use rand::{Rng, rngs::OsRng};

/// Inclusive bounds of the one-time code space.
pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX: u32 = 999_999;

/// Draws a 6-digit one-time code from the OS CSPRNG.
pub fn generate_numeric_code() -> String {
    OsRng.gen_range(CODE_MIN..=CODE_MAX).to_string()
}

/// Emails compare case-insensitively, so they are stored in this form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
