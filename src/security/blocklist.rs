//! SSRF guard: validates a target URL against a deny-list before any
//! network I/O. The host is resolved once and every resolved address is
//! checked, so a hostname cannot smuggle in an internal address; the
//! resolved addresses are handed back to the engine, which pins them for
//! the actual connection.

use crate::errors::{HttpClientError, HttpClientResult};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use url::{Host, Url};

/// Deny-list of addresses the engine must never call.
///
/// The default configuration blocks loopback, link-local, private, and
/// unspecified addresses. Additional hostname patterns (glob) and CIDR
/// ranges can be configured; [`UrlBlocklist::permissive`] disables the
/// built-in ranges for deployments that legitimately talk to local
/// services.
#[derive(Debug, Clone)]
pub struct UrlBlocklist {
    block_internal_ranges: bool,
    blocked_host_patterns: Vec<glob::Pattern>,
    blocked_networks: Vec<IpNetwork>,
}

impl Default for UrlBlocklist {
    fn default() -> Self {
        Self {
            block_internal_ranges: true,
            blocked_host_patterns: Vec::new(),
            blocked_networks: Vec::new(),
        }
    }
}

impl UrlBlocklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// A blocklist that only enforces explicitly configured entries.
    pub fn permissive() -> Self {
        Self {
            block_internal_ranges: false,
            blocked_host_patterns: Vec::new(),
            blocked_networks: Vec::new(),
        }
    }

    /// Adds a hostname pattern, e.g. `metadata.internal` or `*.corp.local`.
    pub fn with_blocked_host(mut self, pattern: &str) -> HttpClientResult<Self> {
        let pattern = glob::Pattern::new(&pattern.to_ascii_lowercase()).map_err(|e| {
            HttpClientError::InvalidRequest(format!("Invalid blocked host pattern '{pattern}': {e}"))
        })?;
        self.blocked_host_patterns.push(pattern);
        Ok(self)
    }

    /// Adds a CIDR range, e.g. `100.64.0.0/10` or `2001:db8::/32`.
    pub fn with_blocked_network(mut self, cidr: &str) -> HttpClientResult<Self> {
        let network = IpNetwork::parse(cidr).ok_or_else(|| {
            HttpClientError::InvalidRequest(format!("Invalid blocked network '{cidr}'"))
        })?;
        self.blocked_networks.push(network);
        Ok(self)
    }

    /// Validates the URL, resolving DNS once. Returns the resolved socket
    /// addresses so the caller can pin them for the connection.
    pub async fn validate(&self, url: &Url) -> HttpClientResult<Vec<SocketAddr>> {
        let host = url.host().ok_or_else(|| {
            HttpClientError::InvalidRequest(format!("The URL '{url}' has no host"))
        })?;
        let port = url.port_or_known_default().unwrap_or(80);

        let addresses = match host {
            Host::Ipv4(ip) => vec![SocketAddr::new(IpAddr::V4(ip), port)],
            Host::Ipv6(ip) => vec![SocketAddr::new(IpAddr::V6(ip), port)],
            Host::Domain(domain) => {
                self.check_host_name(url, domain)?;
                resolve(url, domain, port).await?
            }
        };

        for address in &addresses {
            if let Some(reason) = self.blocked_reason(address.ip()) {
                return Err(HttpClientError::BlockedUrl {
                    url: url.to_string(),
                    reason,
                });
            }
        }
        Ok(addresses)
    }

    fn check_host_name(&self, url: &Url, domain: &str) -> HttpClientResult<()> {
        let candidate = domain.to_ascii_lowercase();
        for pattern in &self.blocked_host_patterns {
            if pattern.matches(&candidate) {
                return Err(HttpClientError::BlockedUrl {
                    url: url.to_string(),
                    reason: format!("host matches blocked pattern '{pattern}'"),
                });
            }
        }
        Ok(())
    }

    fn blocked_reason(&self, ip: IpAddr) -> Option<String> {
        for network in &self.blocked_networks {
            if network.contains(ip) {
                return Some(format!("address {ip} is in blocked range {network}"));
            }
        }
        if self.block_internal_ranges {
            if let Some(range) = internal_range(ip) {
                return Some(format!("address {ip} is a {range} address"));
            }
        }
        None
    }
}

async fn resolve(url: &Url, domain: &str, port: u16) -> HttpClientResult<Vec<SocketAddr>> {
    let addresses: Vec<SocketAddr> = tokio::net::lookup_host((domain, port))
        .await
        .map_err(|e| HttpClientError::Protocol {
            message: format!("Failed to resolve host '{domain}' for URL '{url}'"),
            source: Some(Box::new(e)),
        })?
        .collect();
    if addresses.is_empty() {
        return Err(HttpClientError::Protocol {
            message: format!("Host '{domain}' did not resolve to any address"),
            source: None,
        });
    }
    Ok(addresses)
}

/// Names the internal range an address falls in, if any.
fn internal_range(ip: IpAddr) -> Option<&'static str> {
    match ip {
        IpAddr::V4(v4) => internal_range_v4(v4),
        IpAddr::V6(v6) => {
            // ::ffff:a.b.c.d carries the embedded v4 semantics.
            if let Some(range) = v6.to_ipv4().and_then(internal_range_v4) {
                return Some(range);
            }
            if v6.is_loopback() {
                Some("loopback")
            } else if v6.is_unspecified() {
                Some("unspecified")
            } else if (v6.segments()[0] & 0xffc0) == 0xfe80 {
                Some("link-local")
            } else if (v6.segments()[0] & 0xfe00) == 0xfc00 {
                Some("unique-local")
            } else {
                None
            }
        }
    }
}

fn internal_range_v4(ip: Ipv4Addr) -> Option<&'static str> {
    if ip.is_loopback() {
        Some("loopback")
    } else if ip.is_unspecified() {
        Some("unspecified")
    } else if ip.is_link_local() {
        Some("link-local")
    } else if ip.is_private() {
        Some("private")
    } else {
        None
    }
}

/// A CIDR range. Small local helper; covers exactly what the deny-list
/// needs.
#[derive(Debug, Clone, Copy)]
struct IpNetwork {
    address: IpAddr,
    prefix: u8,
}

impl IpNetwork {
    fn parse(input: &str) -> Option<Self> {
        let (address, prefix): (IpAddr, Option<u8>) = match input.split_once('/') {
            Some((address, prefix)) => (address.parse().ok()?, Some(prefix.parse().ok()?)),
            None => (input.parse().ok()?, None),
        };
        let max = match address {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        let prefix = prefix.unwrap_or(max);
        (prefix <= max).then_some(Self { address, prefix })
    }

    fn contains(&self, ip: IpAddr) -> bool {
        match (self.address, ip) {
            (IpAddr::V4(network), IpAddr::V4(candidate)) => {
                if self.prefix == 0 {
                    return true;
                }
                let shift = 32 - u32::from(self.prefix);
                (u32::from(network) >> shift) == (u32::from(candidate) >> shift)
            }
            (IpAddr::V6(network), IpAddr::V6(candidate)) => {
                if self.prefix == 0 {
                    return true;
                }
                let shift = 128 - u32::from(self.prefix);
                (u128::from(network) >> shift) == (u128::from(candidate) >> shift)
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn url(input: &str) -> Url {
        Url::parse(input).unwrap()
    }

    #[test_case("http://127.0.0.1/path"; "ipv4 loopback")]
    #[test_case("http://127.8.9.10/path"; "ipv4 loopback subnet")]
    #[test_case("http://[::1]/path"; "ipv6 loopback")]
    #[test_case("http://10.0.0.5/path"; "private ten range")]
    #[test_case("http://172.16.0.1/path"; "private 172 range")]
    #[test_case("http://192.168.1.1/path"; "private 192 range")]
    #[test_case("http://169.254.169.254/path"; "link local metadata")]
    #[test_case("http://[fe80::1]/path"; "ipv6 link local")]
    #[test_case("http://[fd12:3456::1]/path"; "ipv6 unique local")]
    #[test_case("http://[::ffff:127.0.0.1]/path"; "v4 mapped loopback")]
    #[test_case("http://0.0.0.0/path"; "unspecified")]
    #[tokio::test]
    async fn test_blocks_internal_addresses(input: &str) {
        let blocklist = UrlBlocklist::default();
        let error = blocklist.validate(&url(input)).await.unwrap_err();
        assert!(matches!(error, HttpClientError::BlockedUrl { .. }), "{error}");
        assert_eq!(error.error_code(), "BLOCKED_URL");
    }

    #[tokio::test]
    async fn test_allows_public_address() {
        let blocklist = UrlBlocklist::default();
        let addresses = blocklist
            .validate(&url("https://93.184.216.34/data"))
            .await
            .unwrap();
        assert_eq!(addresses, vec!["93.184.216.34:443".parse().unwrap()]);
    }

    #[tokio::test]
    async fn test_blocks_resolved_loopback_hostname() {
        // "localhost" resolves to loopback; the check must apply to the
        // resolved address, not the literal name.
        let blocklist = UrlBlocklist::default();
        let error = blocklist
            .validate(&url("http://localhost:8080/path"))
            .await
            .unwrap_err();
        assert!(matches!(error, HttpClientError::BlockedUrl { .. }), "{error}");
    }

    #[tokio::test]
    async fn test_permissive_allows_loopback() {
        let blocklist = UrlBlocklist::permissive();
        let addresses = blocklist.validate(&url("http://127.0.0.1:9999/")).await.unwrap();
        assert_eq!(addresses, vec!["127.0.0.1:9999".parse().unwrap()]);
    }

    #[tokio::test]
    async fn test_blocks_configured_host_pattern() {
        let blocklist = UrlBlocklist::permissive()
            .with_blocked_host("*.internal.corp")
            .unwrap();
        let error = blocklist
            .validate(&url("https://api.internal.corp/secrets"))
            .await
            .unwrap_err();
        assert!(matches!(error, HttpClientError::BlockedUrl { .. }), "{error}");
    }

    #[tokio::test]
    async fn test_blocks_configured_network() {
        let blocklist = UrlBlocklist::permissive()
            .with_blocked_network("100.64.0.0/10")
            .unwrap();
        let error = blocklist
            .validate(&url("http://100.64.3.4/"))
            .await
            .unwrap_err();
        assert!(matches!(error, HttpClientError::BlockedUrl { .. }), "{error}");

        blocklist.validate(&url("http://100.128.0.1/")).await.unwrap();
    }

    #[test]
    fn test_invalid_network_is_rejected() {
        let error = UrlBlocklist::permissive()
            .with_blocked_network("not-a-cidr")
            .unwrap_err();
        assert!(matches!(error, HttpClientError::InvalidRequest(_)));
    }

    #[test]
    fn test_network_containment() {
        let network = IpNetwork::parse("10.0.0.0/8").unwrap();
        assert!(network.contains("10.255.0.1".parse().unwrap()));
        assert!(!network.contains("11.0.0.1".parse().unwrap()));

        let single = IpNetwork::parse("203.0.113.7").unwrap();
        assert!(single.contains("203.0.113.7".parse().unwrap()));
        assert!(!single.contains("203.0.113.8".parse().unwrap()));

        let all = IpNetwork::parse("0.0.0.0/0").unwrap();
        assert!(all.contains("8.8.8.8".parse().unwrap()));
    }
}
