pub mod auth;
pub mod request;
pub mod response;

pub use auth::{
    ApiKeyLocation, Authentication, CertificateAuthentication, OAuthAuthentication,
    OAuthCredentialsLocation,
};
pub use request::{HttpClientRequest, HttpMethod};
pub use response::{HeaderValues, HttpClientResponse};
