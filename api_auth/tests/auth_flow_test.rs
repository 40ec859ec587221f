//! Registration, email verification and login flows.

mod support;

use common::{env_config::AuthConfig, error::AppError};
use api_auth::dtos::auth::LoginRequest;
use support::{
    MailKind, PASSWORD, context, context_with, other_code, register_request, test_auth_config,
    verified_user,
};

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_ana_registers_verifies_and_logs_in() {
    let ctx = context();

    let user = ctx
        .auth
        .register(register_request("Ana", "ana@x.com"))
        .await
        .unwrap();
    assert!(!user.email_verified);
    assert!(user.active);
    assert_eq!(user.plan_id, "free");

    let code = ctx
        .mailer
        .last_code("ana@x.com", MailKind::Verification)
        .unwrap();
    assert_eq!(code.len(), 6);

    // a code nobody was sent
    let wrong = ctx.auth.verify_email("ana@x.com", &other_code(&code)).await;
    assert!(matches!(wrong, Err(AppError::CodeNotFound)));

    let verified = ctx.auth.verify_email("ana@x.com", &code).await.unwrap();
    assert!(verified.user.email_verified);
    let claims = ctx.issuer.verify(&verified.token).payload.unwrap();
    assert_eq!(claims.user_id, user.id);
    assert_eq!(claims.display_name, "Ana");

    let session = ctx
        .auth
        .login(&login("ana@x.com", PASSWORD))
        .await
        .unwrap();
    assert!(session.user.last_access_at.is_some());
    assert!(ctx.issuer.verify(&session.token).valid);
}

#[tokio::test]
async fn test_login_before_verification_is_refused() {
    let ctx = context();
    ctx.auth
        .register(register_request("Ana", "ana@x.com"))
        .await
        .unwrap();

    let result = ctx.auth.login(&login("ana@x.com", PASSWORD)).await;
    assert!(matches!(result, Err(AppError::EmailNotVerified)));
}

#[tokio::test]
async fn test_login_normalizes_email() {
    let ctx = context();
    verified_user(&ctx, "Ana", "ana@x.com").await;

    let result = ctx.auth.login(&login("  ANA@X.com ", PASSWORD)).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_login_with_unknown_email() {
    let ctx = context();
    let result = ctx.auth.login(&login("nobody@x.com", PASSWORD)).await;
    assert!(matches!(result, Err(AppError::UserNotFound)));
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let ctx = context();
    verified_user(&ctx, "Ana", "ana@x.com").await;

    let result = ctx.auth.login(&login("ana@x.com", "not-the-password")).await;
    assert!(matches!(result, Err(AppError::InvalidPassword)));
}

#[tokio::test]
async fn test_inactive_account_cannot_log_in() {
    let ctx = context();
    let user = verified_user(&ctx, "Ana", "ana@x.com").await;
    ctx.store.set_active(user.id, false).unwrap();

    let result = ctx.auth.login(&login("ana@x.com", PASSWORD)).await;
    assert!(matches!(result, Err(AppError::AccountInactive)));
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let ctx = context();
    ctx.auth
        .register(register_request("Ana", "ana@x.com"))
        .await
        .unwrap();

    let again = ctx
        .auth
        .register(register_request("Ana Again", "ANA@x.com"))
        .await;
    assert!(matches!(again, Err(AppError::DuplicateEmail)));
}

#[tokio::test]
async fn test_registration_reports_every_invalid_field() {
    let ctx = context();
    let mut req = register_request("", "not-an-email");
    req.password = "short".to_string();

    let Err(AppError::Validation(errors)) = ctx.auth.register(req).await else {
        panic!("expected validation error");
    };
    let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["name", "email", "password"]);
    assert_eq!(ctx.mailer.count(MailKind::Verification), 0);
}

#[tokio::test]
async fn test_code_of_another_user_is_an_email_mismatch() {
    let ctx = context();
    ctx.auth
        .register(register_request("Ana", "ana@x.com"))
        .await
        .unwrap();
    ctx.auth
        .register(register_request("Bia", "bia@x.com"))
        .await
        .unwrap();
    let ana_code = ctx
        .mailer
        .last_code("ana@x.com", MailKind::Verification)
        .unwrap();

    let result = ctx.auth.verify_email("bia@x.com", &ana_code).await;
    // both users may have drawn the same code, then bia's own token matches
    if ctx.mailer.last_code("bia@x.com", MailKind::Verification) != Some(ana_code.clone()) {
        assert!(matches!(result, Err(AppError::EmailMismatch)));
    }

    // ana's token is untouched
    assert!(ctx.auth.verify_email("ana@x.com", &ana_code).await.is_ok());
}

#[tokio::test]
async fn test_code_cannot_be_used_twice() {
    let ctx = context();
    ctx.auth
        .register(register_request("Ana", "ana@x.com"))
        .await
        .unwrap();
    let code = ctx
        .mailer
        .last_code("ana@x.com", MailKind::Verification)
        .unwrap();

    ctx.auth.verify_email("ana@x.com", &code).await.unwrap();
    let again = ctx.auth.verify_email("ana@x.com", &code).await;
    assert!(matches!(again, Err(AppError::CodeAlreadyUsed)));
}

#[tokio::test]
async fn test_resend_supersedes_previous_code() {
    let ctx = context();
    ctx.auth
        .register(register_request("Ana", "ana@x.com"))
        .await
        .unwrap();
    let first = ctx
        .mailer
        .last_code("ana@x.com", MailKind::Verification)
        .unwrap();

    ctx.auth.resend_verification("ana@x.com").await.unwrap();
    let second = ctx
        .mailer
        .last_code("ana@x.com", MailKind::Verification)
        .unwrap();
    assert_eq!(ctx.mailer.count(MailKind::Verification), 2);

    if first != second {
        let stale = ctx.auth.verify_email("ana@x.com", &first).await;
        assert!(matches!(stale, Err(AppError::CodeExpired)));
    }
    assert!(ctx.auth.verify_email("ana@x.com", &second).await.is_ok());
}

#[tokio::test]
async fn test_resend_is_silent_for_unknown_or_verified_accounts() {
    let ctx = context();
    verified_user(&ctx, "Ana", "ana@x.com").await;

    assert!(ctx.auth.resend_verification("ana@x.com").await.is_ok());
    assert!(ctx.auth.resend_verification("nobody@x.com").await.is_ok());
    assert_eq!(ctx.mailer.count(MailKind::Verification), 1);
}

#[tokio::test]
async fn test_expired_code_is_rejected() {
    let ctx = context_with(AuthConfig {
        verification_code_ttl_minutes: 0,
        ..test_auth_config()
    });
    ctx.auth
        .register(register_request("Ana", "ana@x.com"))
        .await
        .unwrap();
    let code = ctx
        .mailer
        .last_code("ana@x.com", MailKind::Verification)
        .unwrap();

    let result = ctx.auth.verify_email("ana@x.com", &code).await;
    assert!(matches!(result, Err(AppError::CodeExpired)));
}

#[tokio::test]
async fn test_malformed_code_is_a_validation_error() {
    let ctx = context();
    let result = ctx.auth.verify_email("ana@x.com", "12ab").await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_sweep_removes_expired_codes() {
    let ctx = context_with(AuthConfig {
        verification_code_ttl_minutes: 0,
        ..test_auth_config()
    });
    ctx.auth
        .register(register_request("Ana", "ana@x.com"))
        .await
        .unwrap();

    assert_eq!(ctx.auth.sweep_expired_tokens().await.unwrap(), 1);
    assert_eq!(ctx.store.token_count().unwrap(), 0);
}

#[tokio::test]
async fn test_current_user_reads_fresh_record() {
    let ctx = context();
    let user = verified_user(&ctx, "Ana", "ana@x.com").await;

    let current = ctx.auth.current_user(user.id).await.unwrap();
    assert_eq!(current.email, "ana@x.com");
    assert!(current.email_verified);
}
