//! Structured logging configuration.
//!
//! Engine code logs through the `log` facade; the subscriber installed here
//! bridges those records into `tracing` alongside the server's own spans.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use bracket_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log an API operation the engine refused
///
/// Client-side failures are logged at `info`, storage failures at `error`.
pub fn log_rejected_operation(operation: &str, status_code: u16, message: &str) {
    if status_code >= 500 {
        tracing::error!(
            operation = operation,
            http_status = status_code,
            "Operation failed: {}",
            message
        );
    } else {
        tracing::info!(
            operation = operation,
            http_status = status_code,
            "Operation rejected: {}",
            message
        );
    }
}

/// Log a tournament lifecycle transition triggered over HTTP
pub fn log_tournament_event(event: &str, tournament_id: i64, detail: &str) {
    tracing::info!(
        event = event,
        tournament_id = tournament_id,
        "Tournament {}: {}",
        event,
        detail
    );
}
