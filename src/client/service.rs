//! The execution engine: guard, proxy resolution, TLS material, request
//! translation, the network call, and response mapping, with a fresh and
//! fully released client per call.

use crate::client::HttpClientConfig;
use crate::environment::ExecutionEnvironment;
use crate::errors::{HttpClientError, HttpClientResult};
use crate::proxy::{ProxyDecision, ProxyResolver};
use crate::tls::{build_tls_material, TlsMaterial};
use crate::transport::{RequestBuilder, ResponseParser};
use crate::types::{Authentication, HttpClientRequest, HttpClientResponse, HttpMethod};
use crate::MAX_REDIRECTS;
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// Stateless engine for outbound calls. Cheap to share behind an `Arc`;
/// concurrent calls share nothing but the read-only configuration.
#[derive(Debug, Clone, Default)]
pub struct HttpClientService {
    config: HttpClientConfig,
}

impl HttpClientService {
    pub fn new(config: HttpClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Executes the request under the given environment's response policy.
    ///
    /// Automatic redirects are disabled on the transport; the engine
    /// follows them itself so the blocklist guard and the proxy resolver
    /// run on every hop.
    pub async fn execute(
        &self,
        request: &HttpClientRequest,
        environment: &ExecutionEnvironment,
    ) -> HttpClientResult<HttpClientResponse> {
        let mut url = parse_target_url(&request.url)?;
        if let Some(parameters) = &request.query_parameters {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in parameters {
                pairs.append_pair(name, value);
            }
        }

        let connect_timeout = request
            .connection_timeout_in_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.config.connection_timeout);
        let read_timeout = request
            .read_timeout_in_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.config.read_timeout);

        let tls = match &request.authentication {
            Authentication::Certificate(certificate) => Some(build_tls_material(certificate)?),
            _ => None,
        };
        let resolver = ProxyResolver::new(
            self.config.proxy.clone(),
            self.config.environment.clone(),
        );

        let mut method = request.method;
        let mut body_allowed = true;

        for _ in 0..=MAX_REDIRECTS {
            let addresses = self.config.blocklist.validate(&url).await?;
            let decision = if request.use_proxy {
                resolver.resolve(url.scheme(), url.host_str().unwrap_or_default())?
            } else {
                ProxyDecision::Direct
            };
            tracing::debug!(
                method = ?method,
                url = %url,
                direct = decision.is_direct(),
                "executing outbound call"
            );

            let client = self.build_client(
                &decision,
                tls.as_ref(),
                connect_timeout,
                read_timeout,
                &url,
                &addresses,
            )?;
            let wire_request =
                RequestBuilder::build(&client, url.clone(), request, method, body_allowed).await?;
            let response = client
                .execute(wire_request)
                .await
                .map_err(|e| HttpClientError::from_transport(e, "request execution"))?;

            if response.status().is_redirection() {
                let location = response
                    .headers()
                    .get(http::header::LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                if let Some(location) = location {
                    let next = url.join(&location).map_err(|e| HttpClientError::Protocol {
                        message: format!("Invalid redirect location '{location}'"),
                        source: Some(Box::new(e)),
                    })?;
                    if !matches!(response.status().as_u16(), 307 | 308)
                        && !matches!(method, HttpMethod::Get | HttpMethod::Head)
                    {
                        method = HttpMethod::Get;
                        body_allowed = false;
                    }
                    tracing::debug!(to = %next, status = response.status().as_u16(), "following redirect");
                    url = next;
                    continue;
                }
            }

            return ResponseParser::map(response, request.store_response, environment).await;
        }

        Err(HttpClientError::Protocol {
            message: format!("Stopped after {MAX_REDIRECTS} redirects"),
            source: None,
        })
    }

    fn build_client(
        &self,
        decision: &ProxyDecision,
        tls: Option<&TlsMaterial>,
        connect_timeout: Duration,
        read_timeout: Duration,
        url: &Url,
        addresses: &[SocketAddr],
    ) -> HttpClientResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .user_agent(user_agent())
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .redirect(reqwest::redirect::Policy::none());

        match decision {
            ProxyDecision::Direct => {
                builder = builder.no_proxy();
                // Pin the guarded resolution so the connection cannot be
                // rebound to a different address than the one validated.
                let is_domain = matches!(url.host(), Some(url::Host::Domain(_)));
                if is_domain && !addresses.is_empty() {
                    if let Some(host) = url.host_str() {
                        builder = builder.resolve_to_addrs(host, addresses);
                    }
                }
            }
            ProxyDecision::Proxy {
                url: proxy_url,
                credentials,
            } => {
                let mut proxy = reqwest::Proxy::all(proxy_url.as_str()).map_err(|e| {
                    HttpClientError::InvalidProxyConfig(format!(
                        "Invalid proxy URL '{proxy_url}': {e}"
                    ))
                })?;
                if let Some(credentials) = credentials {
                    proxy = proxy
                        .basic_auth(&credentials.username, credentials.password.expose_secret());
                }
                builder = builder.proxy(proxy);
            }
        }

        if let Some(material) = tls {
            builder = builder.identity(material.identity.clone());
            if material.replaces_built_in_roots() {
                builder = builder.tls_built_in_root_certs(false);
            }
            for root in &material.trusted_roots {
                builder = builder.add_root_certificate(root.clone());
            }
        }

        builder.build().map_err(|e| HttpClientError::Protocol {
            message: format!("Cannot initialize the HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

fn parse_target_url(raw: &str) -> HttpClientResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| HttpClientError::InvalidRequest(format!("Invalid URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(HttpClientError::InvalidRequest(format!(
            "Unsupported URL scheme '{scheme}' in '{raw}'"
        ))),
    }
}

fn user_agent() -> String {
    format!("integrations-http-client/{}", env!("CARGO_PKG_VERSION"))
}
