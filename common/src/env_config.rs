use std::{env, str::FromStr, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server.
/// It includes the credential store backend, JWT configuration,
/// server host and port, number of worker threads, CORS settings,
/// logging preferences, authentication policy and the bank-account
/// provider used when a profile is completed.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// Which credential store backs the service.
    pub store_backend: StoreBackend,
    /// The URL of the database to connect to.
    pub database_url: Option<String>,
    /// Configuration for JWT (JSON Web Token) authentication.
    pub jwt_config: JwtConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Minimum level passed to the logger.
    pub log_level: String,
    /// File the logger mirrors console output to.
    pub log_file: String,
    /// Registration, verification and reset policy.
    pub auth_config: AuthConfig,
    /// Bank-account provider settings.
    pub bank_config: BankConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("Unknown store backend: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
/// Configuration for JSON Web Token (JWT) authentication.
///
/// This struct contains the secret key used to sign JWTs and
/// the expiration time in hours for issued tokens.
pub struct JwtConfig {
    /// The secret key used to sign and verify JWTs. Empty means unset.
    pub secret: String,
    /// The expiration time for JWTs in hours.
    pub expiration_hours: i64,
}

impl JwtConfig {
    /// Creates a new `JwtConfig` instance from environment variables.
    ///
    /// - `JWT_SECRET`: The secret key for JWT signing. Left empty when unset,
    ///   in which case issuing a token reports a configuration error.
    /// - `JWT_EXPIRATION_HOURS`: Optional. Defaults to 24 hours if not provided.
    ///
    /// # Panics
    ///
    /// This function will panic if `JWT_EXPIRATION_HOURS` is set but cannot
    /// be parsed as a valid number.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        JwtConfig {
            secret: env::var("JWT_SECRET").unwrap_or_default(),
            expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a valid number"),
        }
    }
}

#[derive(Clone, Debug)]
/// Policy knobs for the authentication flows.
pub struct AuthConfig {
    /// Lifetime of an email verification code.
    pub verification_code_ttl_minutes: i64,
    /// Lifetime of a password reset code.
    pub reset_code_ttl_minutes: i64,
    /// Minimum accepted password length.
    pub password_min_length: usize,
    /// Collapse login failures into a single "Invalid credentials" response.
    pub hide_login_failure_reason: bool,
    /// How often the background task deletes expired codes.
    pub token_sweep_interval_secs: u64,
    /// Plan assigned to newly registered users.
    pub default_plan_id: String,
    /// Argon2 memory cost in KiB.
    pub argon2_memory_kib: u32,
    /// Argon2 iteration count.
    pub argon2_iterations: u32,
    /// Argon2 degree of parallelism.
    pub argon2_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            verification_code_ttl_minutes: 15,
            reset_code_ttl_minutes: 15,
            password_min_length: 8,
            hide_login_failure_reason: false,
            token_sweep_interval_secs: 3600,
            default_plan_id: "free".to_string(),
            argon2_memory_kib: 19 * 1024,
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

impl AuthConfig {
    /// Reads `AUTH_*` and `ARGON2_*` variables, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = AuthConfig::default();

        AuthConfig {
            verification_code_ttl_minutes: parse_var(
                "AUTH_VERIFICATION_CODE_TTL_MINUTES",
                defaults.verification_code_ttl_minutes,
            ),
            reset_code_ttl_minutes: parse_var(
                "AUTH_RESET_CODE_TTL_MINUTES",
                defaults.reset_code_ttl_minutes,
            ),
            password_min_length: parse_var(
                "AUTH_PASSWORD_MIN_LENGTH",
                defaults.password_min_length,
            ),
            hide_login_failure_reason: env::var("AUTH_HIDE_LOGIN_FAILURE_REASON")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(defaults.hide_login_failure_reason),
            token_sweep_interval_secs: parse_var(
                "AUTH_TOKEN_SWEEP_INTERVAL_SECS",
                defaults.token_sweep_interval_secs,
            ),
            default_plan_id: env::var("AUTH_DEFAULT_PLAN_ID").unwrap_or(defaults.default_plan_id),
            argon2_memory_kib: parse_var("ARGON2_MEMORY_KIB", defaults.argon2_memory_kib),
            argon2_iterations: parse_var("ARGON2_ITERATIONS", defaults.argon2_iterations),
            argon2_parallelism: parse_var("ARGON2_PARALLELISM", defaults.argon2_parallelism),
        }
    }
}

#[derive(Clone, Debug, Default)]
/// Where bank accounts are provisioned when a profile completes.
pub struct BankConfig {
    /// Base URL of the provider. `None` selects the local provisioner.
    pub provider_url: Option<String>,
    /// Bearer key sent to the provider.
    pub api_key: String,
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// Loads all configuration values from environment variables with sensible defaults
    /// for most optional settings.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `DATABASE_URL`: Connection string for the database (postgres backend only)
    ///
    /// Optional (with defaults):
    /// - `ENVIRONMENT`: "development" or "production" (default: "development")
    /// - `STORE_BACKEND`: "postgres" or "memory" (default: "postgres")
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `LOG_LEVEL` / `LOG_FILE`: logger settings (default: "debug" / "atlas.log")
    /// - `BANK_PROVIDER_URL` / `BANK_PROVIDER_API_KEY`: bank-account provider
    /// - `AUTH_*`, `ARGON2_*`: see [`AuthConfig::from_env`]
    ///
    /// # Panics
    ///
    /// This function will panic if `STORE_BACKEND` is unknown or if the
    /// postgres backend is selected without `DATABASE_URL`.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        let store_backend: StoreBackend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()
            .expect("STORE_BACKEND must be either 'postgres' or 'memory'");
        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            panic!("DATABASE_URL must be set when STORE_BACKEND is postgres");
        }

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            store_backend,
            database_url,
            jwt_config: JwtConfig::from_env(),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "atlas.log".to_string()),
            auth_config: AuthConfig::from_env(),
            bank_config: BankConfig {
                provider_url: env::var("BANK_PROVIDER_URL").ok().filter(|v| !v.is_empty()),
                api_key: env::var("BANK_PROVIDER_API_KEY").unwrap_or_default(),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
