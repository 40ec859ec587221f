use std::str::FromStr;

use colored::Colorize;
use middleware::logger::LoggerMiddleware;

pub mod middleware {
    pub mod logger;
}

/// Installs the global logger: colored console output mirrored to `log_file`.
/// Unknown levels fall back to `debug`.
pub fn setup(level: &str, log_file: &str) -> Result<(), fern::InitError> {
    let level = log::LevelFilter::from_str(level).unwrap_or(log::LevelFilter::Debug);

    fern::Dispatch::new()
        .format(|out, message, record| {
            let level = record.level().to_string();
            let level = match record.level() {
                log::Level::Error => level.red().bold(),
                log::Level::Warn => level.yellow(),
                log::Level::Info => level.green(),
                log::Level::Debug => level.magenta(),
                log::Level::Trace => level.bright_black(),
            };
            out.finish(format_args!(
                "{} {:<5} {} {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                level,
                record.target().bright_black(),
                message
            ))
        })
        .level(level)
        .level_for("sqlx", log::LevelFilter::Warn)
        .level_for("hyper", log::LevelFilter::Off)
        .level_for("reqwest", log::LevelFilter::Warn)
        .chain(std::io::stdout())
        .chain(fern::log_file(log_file)?)
        .apply()?;
    Ok(())
}

pub fn middleware() -> LoggerMiddleware {
    LoggerMiddleware::new()
}
