use crate::types::HeaderValues;
use std::collections::HashMap;
use thiserror::Error;

pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// Placeholder used when a response carries no reason phrase.
pub(crate) const NO_REASON: &str = "[no reason]";

#[derive(Error, Debug)]
pub enum HttpClientError {
    /// The target URL resolved to a blocked address. Never retried.
    #[error("The URL '{url}' is blocked: {reason}")]
    BlockedUrl { url: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid proxy configuration: {0}")]
    InvalidProxyConfig(String),

    /// TLS material (keystore/truststore) could not be read or interpreted.
    #[error("mTLS configuration error: {0}")]
    MtlsConfig(String),

    /// Every supported keystore format was tried and failed. The message
    /// enumerates each attempt.
    #[error("Failed to load client keystore: {0}")]
    MtlsKeystore(String),

    /// Malformed or aborted wire exchange.
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection or read deadline exceeded.
    #[error("The request timed out. Please try increasing the read and connection timeouts.")]
    Timeout {
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote endpoint answered with an error-range status. The decoded
    /// error body is preserved when one was sent.
    #[error("{}", remote_message(.reason, .body))]
    Remote {
        status: u16,
        reason: Option<String>,
        headers: HashMap<String, HeaderValues>,
        body: Option<serde_json::Value>,
    },

    /// A structured error relayed verbatim from the remote side of a split
    /// cloud-function deployment.
    #[error("{message}")]
    Relayed {
        code: String,
        message: String,
        variables: Option<serde_json::Value>,
    },

    #[error("Document storage error: {0}")]
    DocumentStorage(String),
}

impl HttpClientError {
    /// Stable error code surfaced to the hosting runtime. HTTP-derived for
    /// remote failures, a fixed sentinel otherwise.
    pub fn error_code(&self) -> String {
        match self {
            HttpClientError::BlockedUrl { .. } => "BLOCKED_URL".to_string(),
            HttpClientError::InvalidRequest(_) => "INVALID_REQUEST".to_string(),
            HttpClientError::InvalidProxyConfig(_) => "INVALID_PROXY_CONFIG".to_string(),
            HttpClientError::MtlsConfig(_) => "MTLS_CONFIG_ERROR".to_string(),
            HttpClientError::MtlsKeystore(_) => "MTLS_KEYSTORE_ERROR".to_string(),
            HttpClientError::Protocol { .. } => "PROTOCOL_ERROR".to_string(),
            HttpClientError::Timeout { .. } => "408".to_string(),
            HttpClientError::Remote { status, .. } => status.to_string(),
            HttpClientError::Relayed { code, .. } => code.clone(),
            HttpClientError::DocumentStorage(_) => "DOCUMENT_STORE_ERROR".to_string(),
        }
    }

    /// Converts a transport failure, logging it at the point of capture so
    /// the raw transport error never crosses the engine boundary unseen.
    pub(crate) fn from_transport(err: reqwest::Error, context: &str) -> Self {
        tracing::warn!(error = %err, context, "transport failure");
        HttpClientError::from(err)
    }
}

impl From<reqwest::Error> for HttpClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpClientError::Timeout {
                source: Some(Box::new(err)),
            }
        } else if err.is_connect() {
            HttpClientError::Protocol {
                message: "Failed to establish a connection".to_string(),
                source: Some(Box::new(err)),
            }
        } else {
            HttpClientError::Protocol {
                message: "The HTTP exchange failed".to_string(),
                source: Some(Box::new(err)),
            }
        }
    }
}

impl From<url::ParseError> for HttpClientError {
    fn from(err: url::ParseError) -> Self {
        HttpClientError::InvalidRequest(err.to_string())
    }
}

fn remote_message(reason: &Option<String>, body: &Option<serde_json::Value>) -> String {
    let reason = reason.as_deref().unwrap_or(NO_REASON);
    match body {
        Some(serde_json::Value::String(text)) if !text.is_empty() => {
            format!("{reason}: {text}")
        }
        Some(serde_json::Value::Null) | None => reason.to_string(),
        Some(value) => format!("{reason}: {value}"),
    }
}
