use common::error::Res;

/// Out-of-band delivery of one-time codes.
pub trait Mailer: Send + Sync {
    fn send_verification_code(&self, email: &str, name: &str, code: &str) -> Res<()>;

    fn send_password_reset_code(&self, email: &str, name: &str, code: &str) -> Res<()>;
}

/// Writes messages to the log instead of sending them.
#[derive(Default, Clone)]
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

impl Mailer for LogMailer {
    fn send_verification_code(&self, email: &str, name: &str, code: &str) -> Res<()> {
        log::info!(
            "[mail] to={} subject=\"Confirme seu e-mail\" body=\"Olá {}, seu código de verificação é {}. Ele expira em breve.\"",
            email,
            name,
            code
        );
        Ok(())
    }

    fn send_password_reset_code(&self, email: &str, name: &str, code: &str) -> Res<()> {
        log::info!(
            "[mail] to={} subject=\"Redefinição de senha\" body=\"Olá {}, use o código {} para redefinir sua senha.\"",
            email,
            name,
            code
        );
        Ok(())
    }
}
