//! Outbound HTTP execution engine shared by integration connectors.
//!
//! Connectors describe a call declaratively ([`HttpClientRequest`]) and hand
//! it to the [`HttpClientService`], which enforces network policy before any
//! I/O happens and turns the raw wire response back into a typed
//! [`HttpClientResponse`] or a structured [`HttpClientError`]:
//!
//! - SSRF guarding against loopback/link-local/private and explicitly
//!   blocked addresses, re-checked on every redirect hop
//! - per-call proxy resolution from explicit settings or `CONNECTOR_*`
//!   environment variables, with non-proxy-host exclusions
//! - mutual TLS from PKCS#12 or PEM keystores
//! - response mapping into decoded bodies or document references, depending
//!   on the [`ExecutionEnvironment`] the host runtime selects
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use integrations_http_client::{
//!     ExecutionEnvironment, HttpClientConfig, HttpClientRequest, HttpClientService, HttpMethod,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = HttpClientService::new(HttpClientConfig::from_env());
//!     let request = HttpClientRequest::new(HttpMethod::Get, "https://api.example.com/items");
//!
//!     let environment = ExecutionEnvironment::CloudFunctionCaller {
//!         store_response_selected: false,
//!     };
//!     let result = service.execute(&request, &environment).await?;
//!     println!("status: {}", result.status);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod auth;
pub mod client;
pub mod environment;
pub mod errors;
pub mod proxy;
pub mod security;
pub mod tls;
pub mod transport;
pub mod types;

// Testing utilities
pub mod mocks;

// Re-exports for convenience
pub use client::{HttpClientConfig, HttpClientService};
pub use environment::{
    DocumentCreationRequest, DocumentReference, DocumentStore, ExecutionEnvironment,
};
pub use errors::{HttpClientError, HttpClientResult};
pub use types::{Authentication, HeaderValues, HttpClientRequest, HttpClientResponse, HttpMethod};

/// Default connection timeout in seconds when a request does not set one.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 20;

/// Default read timeout in seconds when a request does not set one.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 20;

/// Maximum number of redirects the engine follows before giving up.
pub const MAX_REDIRECTS: usize = 10;
