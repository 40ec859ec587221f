use actix_web::web;
use middleware::auth::AuthMiddleware;

pub mod routes {
    pub mod auth;
    pub mod profile;
    pub mod user;
}
pub mod middleware {
    pub mod auth;
}
pub mod services {
    pub mod auth;
    pub mod bank;
    pub mod mailer;
    pub mod password;
    pub mod profile;
}
pub mod misc {
    pub mod profile_rules;
    pub mod validation;
}
pub mod dtos {
    pub mod auth;
    pub mod profile;
}

pub fn mount_auth() -> actix_web::Scope {
    web::scope("/auth")
        .service(routes::auth::post_register)
        .service(routes::auth::post_verify_email)
        .service(routes::auth::post_resend_verification)
        .service(routes::auth::post_login)
        .service(routes::auth::post_password_reset_request)
        .service(routes::auth::post_password_reset_validate)
        .service(routes::auth::post_password_reset)
}

/// Routes behind a session token. Wrap with [`auth_middleware`].
pub fn mount_dashboard() -> actix_web::Scope {
    web::scope("/dashboard")
        .service(routes::user::get_me)
        .service(
            web::scope("/profile")
                .service(routes::profile::get_status)
                .service(routes::profile::post_complete)
                .service(routes::profile::patch_profile),
        )
}

// Auth middleware
pub fn auth_middleware() -> AuthMiddleware {
    AuthMiddleware::new()
}
