use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, as set by the host for its
/// plugins
pub const LOG_FILTER_ENV: &str = "TF_LOG_PROVIDER";

const DEFAULT_FILTER: &str = "info";

/// Install a JSON logger on stderr
///
/// Stdout belongs to the host handshake, so logs never go there. The filter is
/// read from [`LOG_FILTER_ENV`] and falls back to `info` when it is unset or
/// not a valid filter.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn try_init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .json()
        // Keep the message and fields at the top level of each line.
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .try_init()
}
