use actix_web::{Responder, post, web};
use common::error::{AppError, Res};
use common::http::Success;

use crate::dtos::auth::{
    EmailRequest, LoginRequest, MessageResponse, RegisterRequest, RegisterResponse,
    ResetCodeRequest, ResetCodeValidity, ResetPasswordRequest, VerifyEmailRequest,
};
use crate::services::auth::AuthService;

/// Registers a new user with email and password authentication.
///
/// The account starts unverified; a six-digit code is mailed to the
/// address and must be confirmed through `/verify-email` before login.
///
/// # Input
/// - `req`: JSON payload containing name, email and password
/// - `auth`: The authentication service
///
/// # Output
/// - Success: Returns the created user with 201 Created status
/// - Error: Returns 400 Bad Request listing invalid fields, or 409 Conflict if the email is taken
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/auth/register', {
///   method: 'POST',
///   headers: {
///     'Content-Type': 'application/json'
///   },
///   body: JSON.stringify({
///     name: 'Ana Souza',
///     email: 'ana@x.com',
///     password: 'Secr3t!23'
///   })
/// });
///
/// if (response.status === 201) {
///   const { message, user } = await response.json();
///   // prompt the user for the code sent by email
/// }
/// ```
#[post("/register")]
pub async fn post_register(
    req: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Res<impl Responder> {
    let user = auth.register(req.into_inner()).await?;
    Success::created(RegisterResponse {
        message: "Verification code sent".to_string(),
        user,
    })
}

/// Confirms the email with the code that was sent to it and returns a session.
///
/// # Input
/// - `req`: JSON payload with `email` and `code`
///
/// # Output
/// - Success: Returns `{ token, user }`
/// - Error: 400 with code `CODE_NOT_FOUND`, `CODE_EXPIRED`, `CODE_ALREADY_USED`
///   or `EMAIL_MISMATCH`
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/auth/verify-email', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ email: 'ana@x.com', code: '482913' })
/// });
///
/// if (response.ok) {
///   const authData = await response.json();
///   localStorage.setItem('authToken', authData.token);
/// }
/// ```
#[post("/verify-email")]
pub async fn post_verify_email(
    req: web::Json<VerifyEmailRequest>,
    auth: web::Data<AuthService>,
) -> Res<impl Responder> {
    let response = auth.verify_email(&req.email, &req.code).await?;
    Success::ok(response)
}

/// Sends a new verification code. The previous one stops working.
/// Responds the same way whether or not the account exists.
#[post("/resend-verification")]
pub async fn post_resend_verification(
    req: web::Json<EmailRequest>,
    auth: web::Data<AuthService>,
) -> Res<impl Responder> {
    auth.resend_verification(&req.email).await?;
    Success::ok(MessageResponse::new(
        "If the account exists and is not verified, a new code was sent",
    ))
}

/// Authenticates a user with email and password.
///
/// # Input
/// - `login_data`: JSON payload containing email and password
/// - `auth`: The authentication service
///
/// # Output
/// - Success: Returns an auth response with a session token and user details
/// - Error: 404 unknown email, 403 unverified or inactive, 401 wrong password.
///   With `AUTH_HIDE_LOGIN_FAILURE_REASON` all of them become 401 "Invalid credentials".
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/auth/login', {
///   method: 'POST',
///   headers: {
///     'Content-Type': 'application/json'
///   },
///   body: JSON.stringify({
///     email: 'ana@x.com',
///     password: 'Secr3t!23'
///   })
/// });
///
/// if (response.ok) {
///   const authData = await response.json();
///   // Store token for authenticated requests
///   localStorage.setItem('authToken', authData.token);
/// }
/// ```
#[post("/login")]
pub async fn post_login(
    login_data: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Res<impl Responder> {
    let response = auth
        .login(&login_data)
        .await
        .map_err(|error| hide_login_failure(error, auth.config().hide_login_failure_reason))?;
    Success::ok(response)
}

fn hide_login_failure(error: AppError, hide: bool) -> AppError {
    match error {
        AppError::UserNotFound
        | AppError::EmailNotVerified
        | AppError::AccountInactive
        | AppError::InvalidPassword
            if hide =>
        {
            AppError::Unauthorized("Invalid credentials".to_string())
        }
        other => other,
    }
}

/// Starts a password reset. Always answers with the same message so the
/// endpoint cannot be used to probe for accounts.
///
/// # Frontend Example
/// ```javascript
/// await fetch('/api/auth/password-reset/request', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ email: 'ana@x.com' })
/// });
/// ```
#[post("/password-reset/request")]
pub async fn post_password_reset_request(
    req: web::Json<EmailRequest>,
    auth: web::Data<AuthService>,
) -> Res<impl Responder> {
    auth.request_password_reset(&req.email).await?;
    Success::ok(MessageResponse::new(
        "If the account exists, a reset code was sent",
    ))
}

/// Tells whether a reset code is currently usable, without consuming it.
#[post("/password-reset/validate")]
pub async fn post_password_reset_validate(
    req: web::Json<ResetCodeRequest>,
    auth: web::Data<AuthService>,
) -> Res<impl Responder> {
    let valid = auth.validate_reset_code(&req.email, &req.code).await?;
    Success::ok(ResetCodeValidity { valid })
}

/// Sets a new password using a reset code.
///
/// # Input
/// - `req`: JSON payload with `email`, `code` and `newPassword`
///
/// # Output
/// - Success: Returns a confirmation message
/// - Error: Same code errors as `/verify-email`, or 400 for a weak password
#[post("/password-reset")]
pub async fn post_password_reset(
    req: web::Json<ResetPasswordRequest>,
    auth: web::Data<AuthService>,
) -> Res<impl Responder> {
    auth.reset_password(&req).await?;
    Success::ok(MessageResponse::new("Password updated"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_failures_collapse_only_when_hidden() {
        let hidden = hide_login_failure(AppError::EmailNotVerified, true);
        assert!(matches!(hidden, AppError::Unauthorized(ref m) if m == "Invalid credentials"));

        let shown = hide_login_failure(AppError::EmailNotVerified, false);
        assert!(matches!(shown, AppError::EmailNotVerified));

        let unrelated = hide_login_failure(AppError::Internal("db".to_string()), true);
        assert!(matches!(unrelated, AppError::Internal(_)));
    }
}
