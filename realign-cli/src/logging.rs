//! Logging setup for the `realign` binary.
//!
//! # Environment Variables
//!
//! - `REALIGN_DEBUG=true` - Enable debug logging
//! - `REALIGN_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `REALIGN_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! Logs go to stderr so scripts written to stdout stay clean.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `REALIGN_DEBUG`.
///
/// Returns `true` if it is set to "true", "1", or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("REALIGN_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `REALIGN_LOG_LEVEL`.
///
/// Defaults to "debug" if `REALIGN_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("REALIGN_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Get the configured log format from `REALIGN_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    env::var("REALIGN_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Install the subscriber once; a no-op unless logging was requested.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("REALIGN_LOG_LEVEL").is_err() {
            return;
        }

        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let level = get_log_level();
        let filter = EnvFilter::try_new(format!(
            "realign={level},realign_cli={level},realign_model={level},realign_script={level}"
        ))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

        match get_log_format() {
            "json" => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init(),
            "compact" => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init(),
            _ => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init(),
        }

        tracing::info!(level, format = get_log_format(), "realign logging initialized");
    });
}
