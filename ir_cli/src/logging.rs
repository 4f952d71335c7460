//! Tracing subscriber setup: console layer plus optional rolling file layer.

use std::path::Path;

use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::FILE_GUARD;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level`. Console output goes to stderr so stdout
/// stays free for telemetry and command output.
pub fn init(level: &str, json: bool, logging: &ir_config::Logging) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let pretty_layer = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });
    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let (dir, name) = split_log_path(Path::new(file))?;
            let rotation = logging
                .rotation
                .as_deref()
                .unwrap_or("never")
                .to_ascii_lowercase();
            let appender = match rotation.as_str() {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;

    if let Some(file) = logging.file.as_deref() {
        tracing::info!(file, "logging to file");
    }
    Ok(())
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr)> {
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((dir, name))
}
