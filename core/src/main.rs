mod bootstrap;
mod cors;

use std::time::Duration;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use common::env_config::Config;

use crate::bootstrap::{Services, bootstrap};

/// Periodically deletes expired one-time codes.
fn spawn_token_sweeper(services: &Services, every_secs: u64) {
    let auth = services.auth.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(every_secs.max(1)));
        loop {
            interval.tick().await;
            if let Err(e) = auth.sweep_expired_tokens().await {
                log::error!("Expired token sweep failed: {}", e);
            }
        }
    });
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup(&config.log_level, &config.log_file).expect("Failed to set up logger");
    }

    // init store and services
    let services = bootstrap(&config)
        .await
        .map_err(|e| std::io::Error::other(format!("Startup failed: {}", e)))?;

    spawn_token_sweeper(&services, config.auth_config.token_sweep_interval_secs);

    log::info!(
        "Listening on {}:{} ({})",
        config.server_host,
        config.server_port,
        config.environment
    );

    HttpServer::new(move || {
        App::new()
            .app_data(services.auth.clone())
            .app_data(services.profile.clone())
            .app_data(services.issuer.clone())
            .wrap(logger::middleware()) // 3rd
            .wrap(extractor::middleware()) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_auth::mount_auth())
                    .service(api_auth::mount_dashboard().wrap(api_auth::auth_middleware())),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
