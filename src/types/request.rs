use crate::types::auth::Authentication;
use serde::Deserialize;
use std::collections::HashMap;

/// HTTP methods supported by the engine. Only POST, PUT, and PATCH carry a
/// request body; a body configured on any other method is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn supports_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    pub(crate) fn as_reqwest(&self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Declarative description of an outbound call, built by a connector's
/// input model from user-authored JSON configuration. Immutable once
/// constructed.
///
/// A header entry with a `null` value is sent with an empty value, except
/// `Content-Type`, where `null` falls back to the default content
/// semantics of the body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpClientRequest {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, Option<String>>>,
    #[serde(default)]
    pub query_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    #[serde(default)]
    pub connection_timeout_in_seconds: Option<u64>,
    #[serde(default)]
    pub read_timeout_in_seconds: Option<u64>,
    #[serde(default)]
    pub authentication: Authentication,
    /// Store the response body as a document instead of decoding it,
    /// honored only in environments that support document storage.
    #[serde(default)]
    pub store_response: bool,
    /// Route the call through configured proxies. Enabled by default.
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,
}

fn default_use_proxy() -> bool {
    true
}

impl HttpClientRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: None,
            query_parameters: None,
            body: None,
            connection_timeout_in_seconds: None,
            read_timeout_in_seconds: None,
            authentication: Authentication::None,
            store_response: false,
            use_proxy: true,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), Some(value.into()));
        self
    }

    pub fn with_query_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.query_parameters
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = authentication;
        self
    }

    pub fn with_store_response(mut self, store_response: bool) -> Self {
        self.store_response = store_response;
        self
    }

    pub fn with_read_timeout(mut self, seconds: u64) -> Self {
        self.read_timeout_in_seconds = Some(seconds);
        self
    }

    pub fn with_connection_timeout(mut self, seconds: u64) -> Self {
        self.connection_timeout_in_seconds = Some(seconds);
        self
    }

    /// Case-insensitive lookup of a configured header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref().and_then(|headers| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .and_then(|(_, value)| value.as_deref())
        })
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(http::header::CONTENT_TYPE.as_str())
    }
}
