//! Engine configuration: call-level defaults, the SSRF deny-list, explicit
//! proxy settings, and the environment-variable source.

use crate::proxy::{EnvironmentProvider, ProxyConfiguration, SystemEnvironment};
use crate::security::UrlBlocklist;
use crate::{DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct HttpClientConfig {
    /// Fallback connection timeout when the request sets none.
    pub connection_timeout: Duration,
    /// Fallback read timeout when the request sets none.
    pub read_timeout: Duration,
    pub blocklist: UrlBlocklist,
    pub proxy: ProxyConfiguration,
    pub environment: Arc<dyn EnvironmentProvider>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connection_timeout: default_connection_timeout(),
            read_timeout: default_read_timeout(),
            blocklist: UrlBlocklist::default(),
            proxy: ProxyConfiguration::default(),
            environment: Arc::new(SystemEnvironment),
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the production configuration, reading optional overrides:
    ///
    /// - `CONNECTOR_HTTP_CONNECTION_TIMEOUT_SECONDS`
    /// - `CONNECTOR_HTTP_READ_TIMEOUT_SECONDS`
    /// - `CONNECTOR_HTTP_BLOCKED_HOSTS` (pipe-separated glob patterns)
    /// - `CONNECTOR_HTTP_BLOCKED_NETWORKS` (pipe-separated CIDR ranges)
    ///
    /// Unparsable entries are skipped with a warning rather than failing
    /// startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let environment = SystemEnvironment;

        if let Some(seconds) = read_seconds(&environment, "CONNECTOR_HTTP_CONNECTION_TIMEOUT_SECONDS")
        {
            config.connection_timeout = seconds;
        }
        if let Some(seconds) = read_seconds(&environment, "CONNECTOR_HTTP_READ_TIMEOUT_SECONDS") {
            config.read_timeout = seconds;
        }

        if let Some(patterns) = environment.var("CONNECTOR_HTTP_BLOCKED_HOSTS") {
            for pattern in patterns.split('|').map(str::trim).filter(|p| !p.is_empty()) {
                match config.blocklist.clone().with_blocked_host(pattern) {
                    Ok(blocklist) => config.blocklist = blocklist,
                    Err(e) => tracing::warn!(pattern, error = %e, "skipping blocked host pattern"),
                }
            }
        }
        if let Some(networks) = environment.var("CONNECTOR_HTTP_BLOCKED_NETWORKS") {
            for network in networks.split('|').map(str::trim).filter(|n| !n.is_empty()) {
                match config.blocklist.clone().with_blocked_network(network) {
                    Ok(blocklist) => config.blocklist = blocklist,
                    Err(e) => tracing::warn!(network, error = %e, "skipping blocked network"),
                }
            }
        }

        config
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_blocklist(mut self, blocklist: UrlBlocklist) -> Self {
        self.blocklist = blocklist;
        self
    }

    pub fn with_proxy_configuration(mut self, proxy: ProxyConfiguration) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_environment_provider(
        mut self,
        environment: Arc<dyn EnvironmentProvider>,
    ) -> Self {
        self.environment = environment;
        self
    }
}

impl fmt::Debug for HttpClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientConfig")
            .field("connection_timeout", &self.connection_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("blocklist", &self.blocklist)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

fn read_seconds(environment: &dyn EnvironmentProvider, name: &str) -> Option<Duration> {
    let value = environment.var(name)?;
    match value.parse::<u64>() {
        Ok(seconds) => Some(Duration::from_secs(seconds)),
        Err(_) => {
            tracing::warn!(variable = name, value, "ignoring unparsable timeout override");
            None
        }
    }
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HttpClientConfig::default();
        assert_eq!(config.connection_timeout, Duration::from_secs(20));
        assert_eq!(config.read_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_builder_methods() {
        let config = HttpClientConfig::new()
            .with_connection_timeout(Duration::from_secs(5))
            .with_read_timeout(Duration::from_secs(7))
            .with_blocklist(UrlBlocklist::permissive());
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(7));
    }
}
