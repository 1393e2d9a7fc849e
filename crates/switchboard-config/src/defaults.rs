use camino::Utf8PathBuf;

use crate::listen::ListenEndpoint;

/// Default host the daemon binds.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default TCP port the daemon binds.
pub const DEFAULT_PORT: u16 = 50042;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default service name reported by `service.describe`.
pub const DEFAULT_SERVICE_NAME: &str = "switchboard";

/// Default log filter expression used by the daemon.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the daemon.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default listen endpoint for the daemon.
#[must_use]
pub fn default_listen_endpoint() -> ListenEndpoint {
    ListenEndpoint::new(DEFAULT_HOST, DEFAULT_PORT)
}

/// Default service name as an owned value.
#[must_use]
pub fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_owned()
}

/// Default directory for logs written by remote clients.
#[must_use]
pub fn default_log_directory() -> Utf8PathBuf {
    Utf8PathBuf::from("logs")
}
