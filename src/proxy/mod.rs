//! Per-call proxy resolution. The decision is rebuilt on every call
//! because proxy settings can change between calls (e.g. a dynamic
//! environment). Precedence, independently per scheme:
//!
//! 1. Explicit process-level [`ProxyConfiguration`]
//! 2. `CONNECTOR_HTTP(S)_PROXY_*` environment variables, suppressed when
//!    the target host matches the scheme's non-proxy-host patterns
//! 3. Direct connection
//!
//! Environment access goes through [`EnvironmentProvider`] so the resolver
//! is testable without mutating the process environment.

use crate::errors::{HttpClientError, HttpClientResult};
use secrecy::Secret;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Read access to environment variables.
pub trait EnvironmentProvider: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Production provider backed by the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Explicit proxy settings for one scheme.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<Secret<String>>,
    /// Pipe-separated glob patterns excluded from proxying, e.g.
    /// `*.internal.com|localhost`.
    #[serde(default)]
    pub non_proxy_hosts: Option<String>,
}

/// Process-level proxy configuration, per scheme.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfiguration {
    #[serde(default)]
    pub http: Option<ProxySettings>,
    #[serde(default)]
    pub https: Option<ProxySettings>,
}

impl ProxyConfiguration {
    fn for_scheme(&self, scheme: &str) -> Option<&ProxySettings> {
        match scheme {
            "http" => self.http.as_ref(),
            "https" => self.https.as_ref(),
            _ => None,
        }
    }
}

/// Credentials scoped to a resolved proxy.
#[derive(Clone)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: Secret<String>,
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// The routing decision for one call.
#[derive(Debug, Clone)]
pub enum ProxyDecision {
    Direct,
    Proxy {
        /// Proxy endpoint, e.g. `http://proxy.example.com:3128`.
        url: String,
        credentials: Option<ProxyCredentials>,
    },
}

impl ProxyDecision {
    pub fn is_direct(&self) -> bool {
        matches!(self, ProxyDecision::Direct)
    }
}

/// Resolves the proxy route for a scheme/host pair.
#[derive(Clone)]
pub struct ProxyResolver {
    configuration: ProxyConfiguration,
    environment: Arc<dyn EnvironmentProvider>,
}

impl ProxyResolver {
    pub fn new(
        configuration: ProxyConfiguration,
        environment: Arc<dyn EnvironmentProvider>,
    ) -> Self {
        Self {
            configuration,
            environment,
        }
    }

    pub fn resolve(&self, scheme: &str, target_host: &str) -> HttpClientResult<ProxyDecision> {
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Ok(ProxyDecision::Direct);
        }

        // 1. Explicit process-level settings win.
        if let Some(settings) = self.configuration.for_scheme(&scheme) {
            if let Some(patterns) = &settings.non_proxy_hosts {
                if matches_non_proxy_hosts(patterns, target_host) {
                    return Ok(ProxyDecision::Direct);
                }
            }
            if settings.port == 0 {
                return Err(HttpClientError::InvalidProxyConfig(format!(
                    "Invalid proxy port 0 for scheme '{scheme}'"
                )));
            }
            let credentials = match (&settings.username, &settings.password) {
                (Some(username), Some(password)) => Some(ProxyCredentials {
                    username: username.clone(),
                    password: password.clone(),
                }),
                _ => None,
            };
            return Ok(ProxyDecision::Proxy {
                url: format!("http://{}:{}", settings.host, settings.port),
                credentials,
            });
        }

        // 2. Scheme-scoped environment variables.
        let prefix = format!("CONNECTOR_{}_PROXY", scheme.to_ascii_uppercase());
        let host = self
            .environment
            .var(&format!("{prefix}_HOST"))
            .filter(|host| !host.is_empty());
        let Some(host) = host else {
            return Ok(ProxyDecision::Direct);
        };

        let non_proxy_variable = format!(
            "CONNECTOR_{}_NON_PROXY_HOSTS",
            scheme.to_ascii_uppercase()
        );
        if let Some(patterns) = self.environment.var(&non_proxy_variable) {
            if matches_non_proxy_hosts(&patterns, target_host) {
                return Ok(ProxyDecision::Direct);
            }
        }

        let port_variable = format!("{prefix}_PORT");
        let port = self.environment.var(&port_variable).ok_or_else(|| {
            HttpClientError::InvalidProxyConfig(format!(
                "{prefix}_HOST is set but {port_variable} is missing"
            ))
        })?;
        let port: u16 = port.parse().map_err(|_| {
            HttpClientError::InvalidProxyConfig(format!(
                "Invalid proxy port '{port}' in {port_variable}"
            ))
        })?;

        let credentials = match (
            self.environment.var(&format!("{prefix}_USER")),
            self.environment.var(&format!("{prefix}_PASSWORD")),
        ) {
            (Some(username), Some(password)) => Some(ProxyCredentials {
                username,
                password: Secret::new(password),
            }),
            _ => None,
        };

        Ok(ProxyDecision::Proxy {
            url: format!("http://{host}:{port}"),
            credentials,
        })
    }
}

impl fmt::Debug for ProxyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyResolver")
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}

/// Matches a host against a pipe-separated glob pattern list. Unparsable
/// patterns are skipped.
fn matches_non_proxy_hosts(patterns: &str, host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    patterns
        .split('|')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .filter_map(|pattern| glob::Pattern::new(&pattern.to_ascii_lowercase()).ok())
        .any(|pattern| pattern.matches(&host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::StaticEnvironment;
    use secrecy::ExposeSecret;
    use test_case::test_case;

    fn resolver_with_env(vars: &[(&str, &str)]) -> ProxyResolver {
        ProxyResolver::new(
            ProxyConfiguration::default(),
            Arc::new(StaticEnvironment::from_pairs(vars)),
        )
    }

    #[test]
    fn test_direct_when_nothing_configured() {
        let resolver = resolver_with_env(&[]);
        assert!(resolver.resolve("http", "example.com").unwrap().is_direct());
        assert!(resolver.resolve("https", "example.com").unwrap().is_direct());
    }

    #[test]
    fn test_resolves_proxy_from_environment() {
        let resolver = resolver_with_env(&[
            ("CONNECTOR_HTTP_PROXY_HOST", "proxy.example.com"),
            ("CONNECTOR_HTTP_PROXY_PORT", "8080"),
        ]);
        match resolver.resolve("http", "target.com").unwrap() {
            ProxyDecision::Proxy { url, credentials } => {
                assert_eq!(url, "http://proxy.example.com:8080");
                assert!(credentials.is_none());
            }
            decision => panic!("unexpected decision: {decision:?}"),
        }
    }

    #[test]
    fn test_schemes_are_independent() {
        let resolver = resolver_with_env(&[
            ("CONNECTOR_HTTPS_PROXY_HOST", "secure-proxy.example.com"),
            ("CONNECTOR_HTTPS_PROXY_PORT", "3128"),
        ]);
        assert!(resolver.resolve("http", "target.com").unwrap().is_direct());
        match resolver.resolve("https", "target.com").unwrap() {
            ProxyDecision::Proxy { url, .. } => {
                assert_eq!(url, "http://secure-proxy.example.com:3128");
            }
            decision => panic!("unexpected decision: {decision:?}"),
        }
    }

    #[test]
    fn test_environment_credentials_are_scoped_to_proxy() {
        let resolver = resolver_with_env(&[
            ("CONNECTOR_HTTP_PROXY_HOST", "proxy.example.com"),
            ("CONNECTOR_HTTP_PROXY_PORT", "8080"),
            ("CONNECTOR_HTTP_PROXY_USER", "my-user"),
            ("CONNECTOR_HTTP_PROXY_PASSWORD", "demo"),
        ]);
        match resolver.resolve("http", "target.com").unwrap() {
            ProxyDecision::Proxy {
                credentials: Some(credentials),
                ..
            } => {
                assert_eq!(credentials.username, "my-user");
                assert_eq!(credentials.password.expose_secret(), "demo");
            }
            decision => panic!("unexpected decision: {decision:?}"),
        }
    }

    #[test]
    fn test_explicit_configuration_wins_over_environment() {
        let configuration = ProxyConfiguration {
            https: Some(ProxySettings {
                host: "corporate-proxy".to_string(),
                port: 9000,
                username: None,
                password: None,
                non_proxy_hosts: None,
            }),
            ..Default::default()
        };
        let resolver = ProxyResolver::new(
            configuration,
            Arc::new(StaticEnvironment::from_pairs(&[
                ("CONNECTOR_HTTPS_PROXY_HOST", "env-proxy"),
                ("CONNECTOR_HTTPS_PROXY_PORT", "8080"),
            ])),
        );
        match resolver.resolve("https", "target.com").unwrap() {
            ProxyDecision::Proxy { url, .. } => assert_eq!(url, "http://corporate-proxy:9000"),
            decision => panic!("unexpected decision: {decision:?}"),
        }
    }

    #[test]
    fn test_invalid_port_fails() {
        let resolver = resolver_with_env(&[
            ("CONNECTOR_HTTP_PROXY_HOST", "proxy.example.com"),
            ("CONNECTOR_HTTP_PROXY_PORT", "not-a-port"),
        ]);
        let error = resolver.resolve("http", "target.com").unwrap_err();
        assert!(matches!(error, HttpClientError::InvalidProxyConfig(_)));
        assert_eq!(error.error_code(), "INVALID_PROXY_CONFIG");
    }

    #[test]
    fn test_missing_port_fails() {
        let resolver = resolver_with_env(&[("CONNECTOR_HTTP_PROXY_HOST", "proxy.example.com")]);
        let error = resolver.resolve("http", "target.com").unwrap_err();
        assert!(matches!(error, HttpClientError::InvalidProxyConfig(_)));
    }

    #[test]
    fn test_non_proxy_host_suppresses_environment_proxy() {
        let resolver = resolver_with_env(&[
            ("CONNECTOR_HTTP_PROXY_HOST", "proxy.example.com"),
            ("CONNECTOR_HTTP_PROXY_PORT", "8080"),
            ("CONNECTOR_HTTP_NON_PROXY_HOSTS", "*.internal.com|localhost"),
        ]);
        assert!(resolver
            .resolve("http", "api.internal.com")
            .unwrap()
            .is_direct());
        assert!(resolver.resolve("http", "localhost").unwrap().is_direct());
        assert!(!resolver.resolve("http", "external.com").unwrap().is_direct());
    }

    #[test]
    fn test_non_proxy_host_suppresses_explicit_proxy() {
        let configuration = ProxyConfiguration {
            http: Some(ProxySettings {
                host: "proxy".to_string(),
                port: 8080,
                username: None,
                password: None,
                non_proxy_hosts: Some("*.internal.com".to_string()),
            }),
            ..Default::default()
        };
        let resolver = ProxyResolver::new(configuration, Arc::new(SystemEnvironment));
        assert!(resolver
            .resolve("http", "api.internal.com")
            .unwrap()
            .is_direct());
        assert!(!resolver.resolve("http", "external.com").unwrap().is_direct());
    }

    #[test_case("*.example.de", "api.example.de", true)]
    #[test_case("*.example.de", "www.example.de", true)]
    #[test_case("*.example.de", "example.de", false)]
    #[test_case("*.example.de|*.partner.io", "sub.example.de", true)]
    #[test_case("*.example.de|*.partner.io", "api.partner.io", true)]
    #[test_case("*.example.de|*.partner.io", "www.google.com", false)]
    fn test_non_proxy_host_patterns(patterns: &str, host: &str, skipped: bool) {
        assert_eq!(matches_non_proxy_hosts(patterns, host), skipped);
    }

    #[test]
    fn test_unknown_scheme_is_direct() {
        let resolver = resolver_with_env(&[
            ("CONNECTOR_HTTP_PROXY_HOST", "proxy.example.com"),
            ("CONNECTOR_HTTP_PROXY_PORT", "8080"),
        ]);
        assert!(resolver.resolve("ftp", "target.com").unwrap().is_direct());
    }
}
