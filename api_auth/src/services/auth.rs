use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{
    env_config::AuthConfig,
    error::{AppError, FieldError, Res},
    jwt::{ClaimsSpec, TokenIssuer},
    misc::{generate_numeric_code, normalize_email},
};
use db::{
    dtos::{
        token::TokenCreateRequest,
        user::{PasswordUpdate, UserCreateRequest},
    },
    models::{
        token::{AuthToken, TokenKind},
        user::User,
    },
    store::CredentialStore,
};
use uuid::Uuid;

use crate::{
    dtos::auth::{AuthResponse, LoginRequest, RegisterRequest, ResetPasswordRequest},
    misc::validation,
    services::{mailer::Mailer, password::PasswordHasher},
};

/// Registration, verification, login and password reset over a credential store.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
    mailer: Arc<dyn Mailer>,
    hasher: PasswordHasher,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        issuer: TokenIssuer,
        mailer: Arc<dyn Mailer>,
        hasher: PasswordHasher,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            issuer,
            mailer,
            hasher,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Creates an unverified account and sends it a verification code.
    /// No session token is issued until the email is verified.
    pub async fn register(&self, req: RegisterRequest) -> Res<User> {
        let mut errors = Vec::new();
        validation::validate_name(&req.name, &mut errors);
        validation::validate_email(&req.email, &mut errors);
        validation::validate_password(
            "password",
            &req.password,
            self.config.password_min_length,
            &mut errors,
        );
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let email = normalize_email(&req.email);
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash(&req.password)?;
        let user = self
            .store
            .create_user(UserCreateRequest {
                email,
                name: req.name.trim().to_string(),
                plan_id: self.config.default_plan_id.clone(),
                password_hash,
            })
            .await?;
        log::info!("Registered user {}", user.id);

        self.send_code(&user, TokenKind::EmailVerification).await?;
        Ok(user)
    }

    /// Issues a fresh verification code if the account is still unverified.
    /// Succeeds regardless of whether the account exists.
    pub async fn resend_verification(&self, email: &str) -> Res<()> {
        let email = normalize_email(email);
        match self.store.find_user_by_email(&email).await? {
            Some(user) if !user.email_verified => {
                self.send_code(&user, TokenKind::EmailVerification).await
            }
            Some(user) => {
                log::debug!("Verification resend skipped, user {} already verified", user.id);
                Ok(())
            }
            None => {
                log::debug!("Verification resend skipped, no such account");
                Ok(())
            }
        }
    }

    /// Consumes a verification code and returns a session for the now verified user.
    pub async fn verify_email(&self, email: &str, code: &str) -> Res<AuthResponse> {
        let (user, token) = self
            .resolve_code(email, code, TokenKind::EmailVerification)
            .await?;

        let user = self
            .store
            .consume_email_verification(token.id, user.id)
            .await?;
        log::info!("Verified email for user {}", user.id);

        let token = self.issue_session(&user)?;
        Ok(AuthResponse { token, user })
    }

    /// Authenticates by email and password. Each failing check is reported
    /// by its own error, in order: existence, verification, activation, password.
    pub async fn login(&self, req: &LoginRequest) -> Res<AuthResponse> {
        let email = normalize_email(&req.email);
        let (user, credentials) = self
            .store
            .find_credentials(&email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !user.email_verified {
            return Err(AppError::EmailNotVerified);
        }
        if !user.active {
            return Err(AppError::AccountInactive);
        }
        if !self
            .hasher
            .verify(&req.password, &credentials.password_hash)?
        {
            log::debug!("Wrong password for user {}", user.id);
            return Err(AppError::InvalidPassword);
        }

        let user = self.store.update_last_access(user.id).await?;
        let token = self.issue_session(&user)?;
        log::info!("User {} logged in", user.id);
        Ok(AuthResponse { token, user })
    }

    /// Sends a reset code to an active account. The outcome is the same
    /// whether or not the account exists.
    pub async fn request_password_reset(&self, email: &str) -> Res<()> {
        let email = normalize_email(email);
        match self.store.find_user_by_email(&email).await? {
            Some(user) if user.active => self.send_code(&user, TokenKind::PasswordReset).await,
            Some(user) => {
                log::debug!("Password reset skipped, user {} is inactive", user.id);
                Ok(())
            }
            None => {
                log::debug!("Password reset requested for unknown account");
                Ok(())
            }
        }
    }

    /// Reports whether a reset code would currently be accepted, without consuming it.
    pub async fn validate_reset_code(&self, email: &str, code: &str) -> Res<bool> {
        match self.resolve_code(email, code, TokenKind::PasswordReset).await {
            Ok(_) => Ok(true),
            Err(
                AppError::Validation(_)
                | AppError::CodeNotFound
                | AppError::CodeExpired
                | AppError::CodeAlreadyUsed
                | AppError::EmailMismatch,
            ) => Ok(false),
            Err(error) => Err(error),
        }
    }

    pub async fn reset_password(&self, req: &ResetPasswordRequest) -> Res<()> {
        let mut errors = Vec::new();
        validation::validate_password(
            "new_password",
            &req.new_password,
            self.config.password_min_length,
            &mut errors,
        );
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let (user, token) = self
            .resolve_code(&req.email, &req.code, TokenKind::PasswordReset)
            .await?;

        let password_hash = self.hasher.hash(&req.new_password)?;
        self.store
            .consume_password_reset(
                token.id,
                PasswordUpdate {
                    user_id: user.id,
                    password_hash,
                },
            )
            .await?;
        log::info!("Password reset for user {}", user.id);
        Ok(())
    }

    pub async fn current_user(&self, user_id: Uuid) -> Res<User> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// Deletes expired one-time codes. Safe to run concurrently.
    pub async fn sweep_expired_tokens(&self) -> Res<u64> {
        let removed = self.store.delete_expired_tokens().await?;
        if removed > 0 {
            log::info!("Swept {} expired auth token(s)", removed);
        }
        Ok(removed)
    }

    fn issue_session(&self, user: &User) -> Res<String> {
        self.issuer.issue(ClaimsSpec {
            user_id: user.id,
            email: user.email.clone(),
            display_name: user.name.clone(),
            plan_id: user.plan_id.clone(),
        })
    }

    fn code_ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::EmailVerification => {
                Duration::minutes(self.config.verification_code_ttl_minutes)
            }
            TokenKind::PasswordReset => Duration::minutes(self.config.reset_code_ttl_minutes),
        }
    }

    async fn send_code(&self, user: &User, kind: TokenKind) -> Res<()> {
        let token = self
            .store
            .create_token(TokenCreateRequest {
                user_id: user.id,
                code: generate_numeric_code(),
                kind,
                expires_at: Utc::now() + self.code_ttl(kind),
            })
            .await?;

        let delivery = match kind {
            TokenKind::EmailVerification => {
                self.mailer
                    .send_verification_code(&user.email, &user.name, &token.code)
            }
            TokenKind::PasswordReset => {
                self.mailer
                    .send_password_reset_code(&user.email, &user.name, &token.code)
            }
        };
        if let Err(error) = delivery {
            log::error!("Failed to deliver {} code to user {}: {}", kind, user.id, error);
        }
        Ok(())
    }

    /// Finds the token of `kind` with `code` that belongs to `email`, and
    /// checks that it is still usable.
    async fn resolve_code(
        &self,
        email: &str,
        code: &str,
        kind: TokenKind,
    ) -> Res<(User, AuthToken)> {
        let code = code.trim();
        let mut errors: Vec<FieldError> = Vec::new();
        validation::validate_code(code, &mut errors);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let candidates = self.store.find_tokens(code, kind).await?;
        if candidates.is_empty() {
            return Err(AppError::CodeNotFound);
        }

        let email = normalize_email(email);
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(AppError::EmailMismatch)?;
        let token = candidates
            .into_iter()
            .find(|token| token.user_id == user.id)
            .ok_or(AppError::EmailMismatch)?;

        if token.used {
            return Err(AppError::CodeAlreadyUsed);
        }
        if token.is_expired_at(Utc::now()) {
            return Err(AppError::CodeExpired);
        }
        Ok((user, token))
    }
}
