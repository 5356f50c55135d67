//! Structured Logger
//!
//! Wraps `tracing` with console output (plain or JSON), an optional NDJSON rolling file, and
//! environment-based level control (`RUST_LOG` wins over the configured level).

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global structured logger.
///
/// When `log_dir` is set, events are also written as NDJSON to `veriforge.log.YYYY-MM-DD`
/// inside it. Calling this more than once keeps the first subscriber.
pub fn init_logger<P: AsRef<Path>>(log_dir: Option<P>, level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_plain = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
    });
    let console_json = json.then(|| fmt::layer().json().with_writer(std::io::stdout));

    let file_layer = log_dir.map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir.as_ref(), "veriforge.log");
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_plain)
        .with(console_json)
        .with(file_layer)
        .try_init();
}
