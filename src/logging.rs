//! Tracing subscriber setup
//!
//! Money-safety escalations are emitted on the `ALERT` target and stay
//! enabled whatever `log_level` says.

use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn rotation_of(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        _ => Rotation::NEVER,
    }
}

fn filter_of(config: &AppConfig) -> EnvFilter {
    // RUST_LOG wins over the config file
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},ALERT=error", config.log_level)))
}

/// Install the global subscriber
///
/// Text mode writes to the log file and to stdout; JSON mode writes only the
/// file. Keep the returned guard alive until exit or buffered lines are lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let appender = RollingFileAppender::new(
        rotation_of(&config.rotation),
        &config.log_dir,
        &config.log_file,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let registry = tracing_subscriber::registry().with(filter_of(config));

    if config.use_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(writer).with_ansi(false))
            .with(fmt::layer().with_target(false))
            .init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_rotation_never_rolls() {
        assert_eq!(rotation_of("hourly"), Rotation::HOURLY);
        assert_eq!(rotation_of("daily"), Rotation::DAILY);
        assert_eq!(rotation_of("weekly"), Rotation::NEVER);
    }
}
